//! The raw tensor type the tracing core boxes (spec.md §3's `V`).
//!
//! Kept as its own module rather than a top-level alias so that a future
//! backend swap (a different array crate) only touches this one line plus
//! `backend.rs`.

/// A raw, un-boxed multi-dimensional array. `D` is the element scalar type
/// (`f32`/`f64`, see [`crate::Floating`]).
pub type TensorData<T = f32> = ndarray::ArrayD<T>;
