//! Swap the last two axes (spec.md §5) — the transpose `matmul`'s vjp rule
//! needs, and the only shape `Transpose` supports since the crate has no
//! surface that asks for an arbitrary-axis permutation.

use std::any::Any;
use std::sync::Arc;

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

#[derive(Debug, Clone, Copy)]
pub struct Transpose;

impl<D: Floating + 'static> primitive::Primitive<D> for Transpose {
    fn name(&self) -> &'static str {
        "transpose"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        let mut t = args[0].clone();
        let rank = t.ndim();
        if rank > 1 {
            t.swap_axes(rank - 2, rank - 1);
        }
        t
    }
}

pub fn transpose<D: Floating + 'static>(x: Value<D>) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&Transpose, vec![x])
}

pub(crate) fn register<D: Floating + 'static>() {
    // transpose is self-inverse: grad = transpose(g)
    defvjp::<D, Transpose>(
        0,
        Arc::new(|g, _ans, _args: &[Value<D>], _cfg: &dyn Any| transpose(g)),
    );
}

#[cfg(test)]
mod tests {
    use ndarray::arr2;

    use crate::{grad, value::Value};

    #[test]
    fn gradient_of_transpose_sum_is_ones() {
        let x = arr2(&[[1., 2., 3.], [4., 5., 6.]]).into_dyn();
        let gx = grad(
            |a: Value<f32>| super::super::sum::sum(super::transpose(a), vec![], false),
            x.clone(),
        )
        .expect("grad succeeds");
        assert_eq!(gx, crate::backend::ones_like(&x));
    }
}
