//! Box/value representation (spec.md §3, §4.2).
//!
//! In a dynamically-typed host, boxing is a runtime `type(value) -> box_type`
//! table lookup so that any differentiable raw type can be wrapped. Rust's
//! static typing collapses that table into a tagged union: a `Value<D>` is
//! either a raw tensor or a traced box wrapping *another* `Value<D>` — which
//! is how a single tensor ends up simultaneously boxed at several nesting
//! depths (innermost highest trace id) during higher-order differentiation.

use std::rc::Rc;

use crate::{
    Floating,
    error::ChainruleError,
    graph::Graph,
    identity::Id,
    trace_stack::TraceId,
    tracing::TensorData,
};

/// A box: `(value, trace_id, node)` per spec.md §3, plus the arena its node
/// lives in.
#[derive(Clone)]
pub struct TracedBox<D: Floating> {
    pub value: Rc<Value<D>>,
    pub trace_id: TraceId,
    pub graph: Rc<std::cell::RefCell<Graph<D>>>,
    pub node: Id,
}

/// Either a raw tensor or a value boxed at some trace depth. `Value` is the
/// sole carrier of graph identity during forward execution: ordinary
/// arithmetic on `Value<D>` (see `ops/`) routes through the registered
/// primitives instead of operating on `TensorData<D>` directly.
#[derive(Clone)]
pub enum Value<D: Floating> {
    Tensor(TensorData<D>),
    Boxed(TracedBox<D>),
}

impl<D: Floating> Value<D> {
    pub fn new_box(
        value: Value<D>,
        trace_id: TraceId,
        graph: Rc<std::cell::RefCell<Graph<D>>>,
        node: Id,
    ) -> Value<D> {
        Value::Boxed(TracedBox {
            value: Rc::new(value),
            trace_id,
            graph,
            node,
        })
    }

    /// `isbox(x)`: true iff `x` is a registered box type. Constant-time by
    /// construction — no table lookup needed.
    pub fn isbox(&self) -> bool {
        matches!(self, Value::Boxed(_))
    }

    pub fn trace_id(&self) -> Option<TraceId> {
        match self {
            Value::Boxed(b) => Some(b.trace_id),
            Value::Tensor(_) => None,
        }
    }

    /// `getval(x)`: recursively unwrap until a non-box is reached. Iterative
    /// per spec.md §9's "bounded stack usage" design note.
    pub fn getval(&self) -> &TensorData<D> {
        let mut cur = self;
        loop {
            match cur {
                Value::Tensor(t) => return t,
                Value::Boxed(b) => cur = &b.value,
            }
        }
    }

    pub fn into_tensor(self) -> TensorData<D> {
        match self {
            Value::Tensor(t) => t,
            Value::Boxed(b) => Rc::unwrap_or_clone(b.value).into_tensor(),
        }
    }
}

impl<D: Floating> From<TensorData<D>> for Value<D> {
    fn from(t: TensorData<D>) -> Self {
        Value::Tensor(t)
    }
}

/// Equality and `Debug` compare by underlying value only — two `Value`s
/// that hold the same tensor are equal whether or not one of them is
/// boxed, mirroring the dynamic host where `getval` is what a caller
/// actually inspects. Graph/trace-id identity is plumbing, not content.
impl<D: Floating> core::fmt::Debug for Value<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Value").field(self.getval()).finish()
    }
}

impl<D: Floating> PartialEq for Value<D> {
    fn eq(&self, other: &Self) -> bool {
        self.getval() == other.getval()
    }
}

impl<D: Floating> PartialEq<TensorData<D>> for Value<D> {
    fn eq(&self, other: &TensorData<D>) -> bool {
        self.getval() == other
    }
}

/// Marker trait standing in for spec.md §4.2's `box_of: raw_type ->
/// box_type` registry: in this static-typing translation, any type that can
/// be converted `Into<Value<D>>` is already "registered". Kept as a real,
/// callable entry point for interface parity with spec.md §6's external
/// surface (see `SPEC_FULL.md` REDESIGN FLAGS); new raw types are registered
/// by implementing `Into<Value<D>>`, a compile-time decision rather than a
/// mutable runtime table insert.
pub fn register_box<D, T>() -> crate::error::Result<()>
where
    D: Floating,
    T: Into<Value<D>>,
{
    Ok(())
}

pub fn unsupported_type(name: &'static str) -> ChainruleError {
    ChainruleError::UnsupportedType(name)
}
