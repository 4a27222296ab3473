//! Elementwise exponential (spec.md §5).

use std::any::Any;
use std::sync::Arc;

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

#[derive(Debug, Clone, Copy)]
pub struct Exp;

impl<D: Floating + 'static> primitive::Primitive<D> for Exp {
    fn name(&self) -> &'static str {
        "exp"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        args[0].mapv(|a| a.exp())
    }
}

pub fn exp<D: Floating + 'static>(x: Value<D>) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&Exp, vec![x])
}

pub(crate) fn register<D: Floating + 'static>() {
    // d/dx exp(x) = exp(x) = ans
    defvjp::<D, Exp>(
        0,
        Arc::new(|g, ans, _args: &[Value<D>], _cfg: &dyn Any| g * ans.clone()),
    );
}

#[cfg(test)]
mod tests {
    use ndarray::arr1;

    use crate::{grad, value::Value};

    #[test]
    fn gradient_of_exp_is_exp() {
        let x = arr1(&[1.0f32, 2.0, 3.0]).into_dyn();
        let gx = grad(|a: Value<f32>| super::exp(a), x.clone()).expect("grad succeeds");
        assert_eq!(gx, x.mapv(f32::exp));
    }

    #[test]
    fn gradient_matches_finite_difference() {
        use ndarray::arr0;

        use crate::ops::testutil::assert_matches_numerical_gradient;

        let x = arr0(0.7f32).into_dyn();
        assert_matches_numerical_gradient(|a: Value<f32>| super::exp(a), x, 1e-2);
    }
}
