//! Elementwise natural logarithm (spec.md §5).

use std::any::Any;
use std::sync::Arc;

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

#[derive(Debug, Clone, Copy)]
pub struct Log;

impl<D: Floating + 'static> primitive::Primitive<D> for Log {
    fn name(&self) -> &'static str {
        "log"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        args[0].mapv(|a| a.ln())
    }
}

pub fn log<D: Floating + 'static>(x: Value<D>) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&Log, vec![x])
}

pub(crate) fn register<D: Floating + 'static>() {
    // d/dx ln(x) = g / x
    defvjp::<D, Log>(
        0,
        Arc::new(|g, _ans, args: &[Value<D>], _cfg: &dyn Any| g / args[0].clone()),
    );
}

#[cfg(test)]
mod tests {
    use ndarray::arr1;

    use crate::{grad, value::Value};

    #[test]
    fn gradient_of_log_is_reciprocal() {
        let x = arr1(&[1.0f32, 2.0, 4.0]).into_dyn();
        let gx = grad(|a: Value<f32>| super::log(a), x.clone()).expect("grad succeeds");
        assert_eq!(gx, x.mapv(|v: f32| 1.0 / v));
    }
}
