//! Rectified linear unit (spec.md §5).

use std::any::Any;
use std::sync::Arc;

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

#[derive(Debug, Clone, Copy)]
pub struct Relu;

impl<D: Floating + 'static> primitive::Primitive<D> for Relu {
    fn name(&self) -> &'static str {
        "relu"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        args[0].mapv(|a| if a > D::zero() { a } else { D::zero() })
    }
}

pub fn relu<D: Floating + 'static>(x: Value<D>) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&Relu, vec![x])
}

pub(crate) fn register<D: Floating + 'static>() {
    // grad = g * 1[x>0]; the indicator is computed with `apply_notrace`
    // since its own derivative is zero almost everywhere (spec.md §5).
    defvjp::<D, Relu>(
        0,
        Arc::new(|g, _ans, args: &[Value<D>], _cfg: &dyn Any| {
            let mask = primitive::apply_notrace(&args[0..1], |raw| {
                raw[0].mapv(|a| if a > D::zero() { D::one() } else { D::zero() })
            });
            g * Value::Tensor(mask)
        }),
    );
}
