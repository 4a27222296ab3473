//! Broadcast to an explicit target shape (spec.md §5).

use std::any::Any;
use std::sync::Arc;

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

#[derive(Debug, Clone)]
pub struct Broadcast {
    pub target_shape: Vec<usize>,
}

impl<D: Floating + 'static> primitive::Primitive<D> for Broadcast {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        args[0]
            .broadcast(self.target_shape.clone())
            .expect("broadcast: incompatible shapes")
            .to_owned()
    }
}

pub fn broadcast<D: Floating + 'static>(x: Value<D>, target_shape: Vec<usize>) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&Broadcast { target_shape }, vec![x])
}

pub(crate) fn register<D: Floating + 'static>() {
    // d/dx broadcast(x -> target) = unbroadcast(og, like=x)
    defvjp::<D, Broadcast>(
        0,
        Arc::new(|g, _ans, args: &[Value<D>], _cfg: &dyn Any| {
            let x_shape = args[0].getval().shape().to_vec();
            ops::unbroadcast_like(g, &x_shape)
        }),
    );
}

#[cfg(test)]
mod tests {
    use ndarray::{arr1, arr2};

    use crate::{grad, value::Value};

    #[test]
    fn gradient_of_broadcast_sums_over_added_axis() {
        let x = arr1(&[1.0f32, 2.0, 3.0]).into_dyn();
        let gx = grad(|a: Value<f32>| super::broadcast(a, vec![2, 3]), x.clone())
            .expect("grad succeeds");
        assert_eq!(gx, (arr2(&[[1.0f32, 1.0, 1.0], [1.0, 1.0, 1.0]])).sum_axis(ndarray::Axis(0)).into_dyn());
    }
}
