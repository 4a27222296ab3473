//! Elementwise power, broadcasting like `add`/`mul` (spec.md §5, bonus op
//! grounded in `original_source/autograd/numpy/numpy_vjps.py`'s `power`).

use std::any::Any;
use std::sync::Arc;

use ndarray::arr0;

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

#[derive(Debug, Clone, Copy)]
pub struct Pow;

impl<D: Floating + 'static> primitive::Primitive<D> for Pow {
    fn name(&self) -> &'static str {
        "pow"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        crate::backend::pow(&args[0], &args[1]).expect("pow: incompatible shapes")
    }
}

pub fn pow<D: Floating + 'static>(x: Value<D>, y: Value<D>) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&Pow, vec![x, y])
}

pub(crate) fn register<D: Floating + 'static>() {
    // d/dx (x^y) = g * y * x^(y-1)
    defvjp::<D, Pow>(
        0,
        Arc::new(|g, _ans, args: &[Value<D>], _cfg: &dyn Any| {
            let x_shape = args[0].getval().shape().to_vec();
            let one = Value::Tensor(arr0(D::one()).into_dyn());
            let exponent_minus_one = args[1].clone() - one;
            let x_pow = pow(args[0].clone(), exponent_minus_one);
            let contribution = g * args[1].clone() * x_pow;
            ops::unbroadcast_like(contribution, &x_shape)
        }),
    );
    // d/dy (x^y) = g * ln(x) * x^y
    defvjp::<D, Pow>(
        1,
        Arc::new(|g, ans, args: &[Value<D>], _cfg: &dyn Any| {
            let y_shape = args[1].getval().shape().to_vec();
            let ln_x = super::log::log(args[0].clone());
            let contribution = g * ln_x * ans.clone();
            ops::unbroadcast_like(contribution, &y_shape)
        }),
    );
}

#[cfg(test)]
mod tests {
    use ndarray::arr1;

    use crate::{grad, value::Value};

    #[test]
    fn gradient_of_cube_is_three_x_squared() {
        let x = arr1(&[1.0f32, 2.0, 3.0]).into_dyn();
        let gx = grad(
            move |a: Value<f32>| super::pow(a, Value::Tensor(ndarray::arr0(3.0f32).into_dyn())),
            x.clone(),
        )
        .expect("grad succeeds");
        assert_eq!(gx, &x.mapv(|v: f32| 3.0 * v * v));
    }
}
