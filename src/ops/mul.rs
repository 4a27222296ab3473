//! Elementwise multiplication (spec.md §5).

use std::any::Any;
use std::sync::Arc;

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

#[derive(Debug, Clone, Copy)]
pub struct Mul;

impl<D: Floating + 'static> primitive::Primitive<D> for Mul {
    fn name(&self) -> &'static str {
        "mul"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        crate::backend::mul(&args[0], &args[1]).expect("mul: incompatible shapes")
    }
}

pub fn mul<D: Floating + 'static>(x: Value<D>, y: Value<D>) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&Mul, vec![x, y])
}

pub(crate) fn register<D: Floating + 'static>() {
    defvjp::<D, Mul>(
        0,
        Arc::new(|g, _ans, args: &[Value<D>], _cfg: &dyn Any| {
            let x_shape = args[0].getval().shape().to_vec();
            ops::unbroadcast_like(g * args[1].clone(), &x_shape)
        }),
    );
    defvjp::<D, Mul>(
        1,
        Arc::new(|g, _ans, args: &[Value<D>], _cfg: &dyn Any| {
            let y_shape = args[1].getval().shape().to_vec();
            ops::unbroadcast_like(g * args[0].clone(), &y_shape)
        }),
    );
}

#[cfg(test)]
mod tests {
    use ndarray::arr1;

    use crate::{grad, value::Value};

    #[test]
    fn gradient_of_square_is_two_x() {
        let x = arr1(&[3.0f32, 5.0]).into_dyn();
        let gx = grad(move |a: Value<f32>| a.clone() * a, x.clone()).expect("grad succeeds");
        assert_eq!(gx, &x * 2.0);
    }
}
