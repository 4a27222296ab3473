//! Elementwise subtraction (spec.md §5).

use std::any::Any;
use std::sync::Arc;

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

#[derive(Debug, Clone, Copy)]
pub struct Sub;

impl<D: Floating + 'static> primitive::Primitive<D> for Sub {
    fn name(&self) -> &'static str {
        "sub"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        crate::backend::sub(&args[0], &args[1]).expect("sub: incompatible shapes")
    }
}

pub fn sub<D: Floating + 'static>(x: Value<D>, y: Value<D>) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&Sub, vec![x, y])
}

pub(crate) fn register<D: Floating + 'static>() {
    defvjp::<D, Sub>(
        0,
        Arc::new(|g, _ans, args: &[Value<D>], _cfg: &dyn Any| {
            let x_shape = args[0].getval().shape().to_vec();
            ops::unbroadcast_like(g, &x_shape)
        }),
    );
    defvjp::<D, Sub>(
        1,
        Arc::new(|g, _ans, args: &[Value<D>], _cfg: &dyn Any| {
            let y_shape = args[1].getval().shape().to_vec();
            ops::unbroadcast_like(-g, &y_shape)
        }),
    );
}

#[cfg(test)]
mod tests {
    use ndarray::arr1;

    use crate::{grad, value::Value};

    #[test]
    fn gradient_is_one_and_minus_one() {
        let x = arr1(&[5.0f32, 6.0]).into_dyn();
        let y = arr1(&[2.0f32, 3.0]).into_dyn();
        let gx = grad(
            move |a: Value<f32>| a - Value::Tensor(y.clone()),
            x.clone(),
        )
        .expect("grad succeeds");
        assert_eq!(gx, crate::backend::ones_like(&x));
    }
}
