//! Elementwise division (spec.md §5).

use std::any::Any;
use std::sync::Arc;

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

#[derive(Debug, Clone, Copy)]
pub struct Div;

impl<D: Floating + 'static> primitive::Primitive<D> for Div {
    fn name(&self) -> &'static str {
        "div"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        crate::backend::div(&args[0], &args[1]).expect("div: incompatible shapes")
    }
}

pub fn div<D: Floating + 'static>(x: Value<D>, y: Value<D>) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&Div, vec![x, y])
}

pub(crate) fn register<D: Floating + 'static>() {
    // d/dx (x/y) = g / y
    defvjp::<D, Div>(
        0,
        Arc::new(|g, _ans, args: &[Value<D>], _cfg: &dyn Any| {
            let x_shape = args[0].getval().shape().to_vec();
            ops::unbroadcast_like(g / args[1].clone(), &x_shape)
        }),
    );
    // d/dy (x/y) = -g * x / y^2
    defvjp::<D, Div>(
        1,
        Arc::new(|g, _ans, args: &[Value<D>], _cfg: &dyn Any| {
            let y_shape = args[1].getval().shape().to_vec();
            let y2 = args[1].clone() * args[1].clone();
            let contribution = -(g * args[0].clone()) / y2;
            ops::unbroadcast_like(contribution, &y_shape)
        }),
    );
}

#[cfg(test)]
mod tests {
    use ndarray::arr1;

    use crate::{grad, value::Value};

    #[test]
    fn gradient_matches_quotient_rule() {
        let x = arr1(&[10.0f32, 20.0]).into_dyn();
        let y = arr1(&[2.0f32, 5.0]).into_dyn();
        let gx = grad(
            move |a: Value<f32>| a / Value::Tensor(y.clone()),
            x.clone(),
        )
        .expect("grad succeeds");
        assert_eq!(gx, arr1(&[0.5, 0.2]).into_dyn());
    }
}
