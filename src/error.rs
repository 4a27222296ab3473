//! Error taxonomy for the tracing and backward-pass machinery.
//!
//! `DeadOutput` from the specification (the case where a traced function's
//! output does not depend on its input) is not an error: it is represented by
//! `vjp` returning `Ok(zeros_like(x))`, never by a variant here.

use thiserror::Error;

/// Errors that can surface from [`crate::trace`], [`crate::make_vjp`] or the
/// [`crate::vjp::VjpClosure`] it returns.
#[derive(Debug, Error)]
pub enum ChainruleError {
    /// A raw value's type has no registered box representation.
    ///
    /// In this crate's static-typing translation of the specification,
    /// every `Value<D>` is constructible by construction (see
    /// `REDESIGN FLAGS` in `SPEC_FULL.md`), so this variant is reachable only
    /// through [`crate::value::register_box`], kept for interface parity with
    /// the spec's external surface.
    #[error("unsupported value type: {0}")]
    UnsupportedType(&'static str),

    /// The backward pass needed a VJP rule at `(primitive, argnum)` that was
    /// never registered via `defvjp`.
    #[error("no vjp rule registered for primitive `{primitive}` at argnum {argnum}")]
    MissingVjp {
        primitive: &'static str,
        argnum: usize,
    },

    /// A backend or VJP-rule shape computation failed (broadcast
    /// incompatibility, rank mismatch, non-square matmul, …).
    #[error("shape mismatch in `{op}`: {detail}")]
    ShapeMismatch {
        op: &'static str,
        detail: String,
    },
}

pub type Result<T> = std::result::Result<T, ChainruleError>;
