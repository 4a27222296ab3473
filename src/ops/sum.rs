//! Reduce by summing along a set of axes (spec.md §5).

use std::any::Any;
use std::sync::Arc;

use ndarray::Axis;

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

#[derive(Debug, Clone)]
pub struct Sum {
    pub axes: Vec<usize>,
    pub keep_dims: bool,
}

impl Sum {
    pub fn new(axes: impl Into<Vec<usize>>, keep_dims: bool) -> Self {
        let mut axes = axes.into();
        // reduce higher axes first so earlier indices stay valid as dims shrink
        axes.sort_unstable_by(|a, b| b.cmp(a));
        Self { axes, keep_dims }
    }
}

impl<D: Floating + 'static> primitive::Primitive<D> for Sum {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        if self.axes.is_empty() {
            return ndarray::arr0(args[0].sum()).into_dyn();
        }
        let mut t = args[0].clone();
        for &axis in &self.axes {
            let a = Axis(axis);
            t = if self.keep_dims {
                t.sum_axis(a).insert_axis(a)
            } else {
                t.sum_axis(a)
            };
        }
        t
    }
}

pub fn sum<D: Floating + 'static>(x: Value<D>, axes: impl Into<Vec<usize>>, keep_dims: bool) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&Sum::new(axes, keep_dims), vec![x])
}

/// Undo a non-`keep_dims` reduction by re-inserting the size-1 axes the sum
/// dropped, so the result broadcasts back against the original input.
pub(crate) fn reshape_for_broadcast<D: Floating + 'static>(
    g: Value<D>,
    axes: &[usize],
    keep_dims: bool,
) -> Value<D> {
    if keep_dims || axes.is_empty() {
        return g;
    }
    let mut intermediate = g.getval().shape().to_vec();
    let mut sorted_axes = axes.to_vec();
    sorted_axes.sort_unstable();
    for &axis in &sorted_axes {
        intermediate.insert(axis, 1);
    }
    super::reshape::reshape(g, intermediate)
}

pub(crate) fn register<D: Floating + 'static>() {
    defvjp::<D, Sum>(
        0,
        Arc::new(|g, _ans, args: &[Value<D>], cfg: &dyn Any| {
            let sum_cfg = cfg
                .downcast_ref::<Sum>()
                .expect("Sum vjp rule always receives a Sum config");
            let x_shape = args[0].getval().shape().to_vec();
            let reshaped = reshape_for_broadcast(g, &sum_cfg.axes, sum_cfg.keep_dims);
            super::broadcast::broadcast(reshaped, x_shape)
        }),
    );
}

#[cfg(test)]
mod tests {
    use ndarray::arr2;

    use crate::{grad, value::Value};

    #[test]
    fn gradient_of_full_sum_is_ones() {
        let x = arr2(&[[1., 2., 3.], [4., 5., 6.]]).into_dyn();
        let gx = grad(|a: Value<f32>| super::sum(a, vec![], false), x.clone())
            .expect("grad succeeds");
        assert_eq!(gx, crate::backend::ones_like(&x));
    }

    #[test]
    fn gradient_of_axis_sum_is_ones() {
        let x = arr2(&[[1., 2., 3.], [4., 5., 6.]]).into_dyn();
        let gx = grad(
            |a: Value<f32>| super::sum(super::sum(a, vec![1], false), vec![], false),
            x.clone(),
        )
        .expect("grad succeeds");
        assert_eq!(gx, crate::backend::ones_like(&x));
    }
}
