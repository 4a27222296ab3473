//! Elementwise negation (spec.md §5).

use std::any::Any;
use std::sync::Arc;

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

#[derive(Debug, Clone, Copy)]
pub struct Neg;

impl<D: Floating + 'static> primitive::Primitive<D> for Neg {
    fn name(&self) -> &'static str {
        "neg"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        -args[0].clone()
    }
}

pub fn neg<D: Floating + 'static>(x: Value<D>) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&Neg, vec![x])
}

pub(crate) fn register<D: Floating + 'static>() {
    defvjp::<D, Neg>(
        0,
        Arc::new(|g, _ans, _args: &[Value<D>], _cfg: &dyn Any| -g),
    );
}
