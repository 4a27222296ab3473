//! Reduce by averaging along a set of axes (spec.md §5).

use std::any::Any;
use std::sync::Arc;

use ndarray::Axis;

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

#[derive(Debug, Clone)]
pub struct Mean {
    pub axes: Vec<usize>,
    pub keep_dims: bool,
}

impl Mean {
    pub fn new(axes: impl Into<Vec<usize>>, keep_dims: bool) -> Self {
        let mut axes = axes.into();
        axes.sort_unstable_by(|a, b| b.cmp(a));
        Self { axes, keep_dims }
    }
}

impl<D: Floating + 'static> primitive::Primitive<D> for Mean {
    fn name(&self) -> &'static str {
        "mean"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        let x = &args[0];
        if self.axes.is_empty() {
            let denom = D::from_f64(x.len() as f64);
            return ndarray::arr0(x.sum() / denom).into_dyn();
        }

        let shape = x.shape().to_vec();
        let mut t = x.clone();
        for &axis in &self.axes {
            let a = Axis(axis);
            t = if self.keep_dims {
                t.sum_axis(a).insert_axis(a)
            } else {
                t.sum_axis(a)
            };
        }

        let mut denom = D::one();
        for &axis in &self.axes {
            denom = denom * D::from_f64(shape[axis] as f64);
        }
        t.mapv(|v| v / denom)
    }
}

pub fn mean<D: Floating + 'static>(x: Value<D>, axes: impl Into<Vec<usize>>, keep_dims: bool) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&Mean::new(axes, keep_dims), vec![x])
}

pub(crate) fn register<D: Floating + 'static>() {
    defvjp::<D, Mean>(
        0,
        Arc::new(|g, _ans, args: &[Value<D>], cfg: &dyn Any| {
            let mean_cfg = cfg
                .downcast_ref::<Mean>()
                .expect("Mean vjp rule always receives a Mean config");
            let x_shape = args[0].getval().shape().to_vec();

            // counts = how many input elements contributed to each output element
            let ones_like_x = Value::Tensor(crate::backend::ones_like(&args[0].getval()));
            let counts = super::sum::sum(ones_like_x, mean_cfg.axes.clone(), mean_cfg.keep_dims);

            let scaled = g / counts;
            let reshaped = super::sum::reshape_for_broadcast(scaled, &mean_cfg.axes, mean_cfg.keep_dims);
            super::broadcast::broadcast(reshaped, x_shape)
        }),
    );
}

#[cfg(test)]
mod tests {
    use ndarray::arr2;

    use crate::{grad, value::Value};

    #[test]
    fn full_mean_reduces_to_scalar_average() {
        let x = arr2(&[[1., 2., 3.], [4., 5., 6.]]).into_dyn();
        let (_, ans) = crate::make_vjp(|a: Value<f32>| super::mean(a, vec![], false), x);
        assert_eq!(ans, ndarray::arr0(3.5f32).into_dyn());
    }

    #[test]
    fn gradient_of_full_mean_sums_to_one() {
        let x = arr2(&[[1., 2., 3.], [4., 5., 6.]]).into_dyn();
        let gx = grad(|a: Value<f32>| super::mean(a, vec![], false), x.clone())
            .expect("grad succeeds");
        let total: f32 = gx.getval().iter().sum();
        approx::assert_relative_eq!(total, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn gradient_of_axis_mean_is_uniform() {
        let x = arr2(&[[1., 2., 3.], [4., 5., 6.]]).into_dyn();
        let gx = grad(|a: Value<f32>| super::mean(a, vec![1], false), x.clone())
            .expect("grad succeeds");
        assert_eq!(gx, crate::backend::ones_like(&x).mapv(|_: f32| 1.0 / 3.0));
    }
}
