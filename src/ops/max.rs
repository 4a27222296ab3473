//! Reduce by maximum along a set of axes (spec.md §5).

use std::any::Any;
use std::sync::Arc;

use ndarray::Axis;

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

#[derive(Debug, Clone)]
pub struct Max {
    pub axes: Vec<usize>,
    pub keep_dims: bool,
}

impl Max {
    pub fn new(axes: impl Into<Vec<usize>>, keep_dims: bool) -> Self {
        let mut axes = axes.into();
        axes.sort_unstable_by(|a, b| b.cmp(a));
        Self { axes, keep_dims }
    }
}

impl<D: Floating + 'static> primitive::Primitive<D> for Max {
    fn name(&self) -> &'static str {
        "max"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        let mut t = args[0].clone();
        for &axis in &self.axes {
            let a = Axis(axis);
            let reduced = t.fold_axis(a, D::neg_infinity(), |&acc, &x| if acc > x { acc } else { x });
            t = if self.keep_dims {
                reduced.insert_axis(a)
            } else {
                reduced
            };
        }
        t
    }
}

pub fn max<D: Floating + 'static>(x: Value<D>, axes: impl Into<Vec<usize>>, keep_dims: bool) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&Max::new(axes, keep_dims), vec![x])
}

pub(crate) fn register<D: Floating + 'static>() {
    // grad wrt x: broadcast `ans` back to x's shape, build an indicator mask
    // of which elements attained the max, split the incoming gradient evenly
    // across ties (count = how many elements in each reduced lane tied).
    defvjp::<D, Max>(
        0,
        Arc::new(|g, ans, args: &[Value<D>], cfg: &dyn Any| {
            let max_cfg = cfg
                .downcast_ref::<Max>()
                .expect("Max vjp rule always receives a Max config");
            let x_shape = args[0].getval().shape().to_vec();

            let reshaped_ans = super::sum::reshape_for_broadcast(ans.clone(), &max_cfg.axes, max_cfg.keep_dims);
            let y_bc = super::broadcast::broadcast(reshaped_ans, x_shape.clone());

            let mask = primitive::apply_notrace(&[args[0].clone(), y_bc], |raw| {
                ndarray::Zip::from(&raw[0])
                    .and(&raw[1])
                    .map_collect(|&a, &b| if a == b { D::one() } else { D::zero() })
            });
            let mask = Value::Tensor(mask);

            let counts = super::sum::sum(mask.clone(), max_cfg.axes.clone(), max_cfg.keep_dims);
            let reshaped_g = super::sum::reshape_for_broadcast(g, &max_cfg.axes, max_cfg.keep_dims);
            let reshaped_counts = super::sum::reshape_for_broadcast(counts, &max_cfg.axes, max_cfg.keep_dims);

            let g_bc = super::broadcast::broadcast(reshaped_g, x_shape.clone());
            let counts_bc = super::broadcast::broadcast(reshaped_counts, x_shape);

            (g_bc * mask) / counts_bc
        }),
    );
}

#[cfg(test)]
mod tests {
    use ndarray::arr1;

    use crate::{grad, value::Value};

    #[test]
    fn gradient_of_max_picks_winner() {
        let x = arr1(&[1.0f32, 3.0, 2.0]).into_dyn();
        let gx = grad(|a: Value<f32>| super::max(a, vec![0], false), x.clone())
            .expect("grad succeeds");
        assert_eq!(gx, arr1(&[0.0, 1.0, 0.0]).into_dyn());
    }

    #[test]
    fn gradient_splits_evenly_across_ties() {
        let x = arr1(&[3.0f32, 1.0, 3.0]).into_dyn();
        let gx = grad(|a: Value<f32>| super::max(a, vec![0], false), x.clone())
            .expect("grad succeeds");
        assert_eq!(gx, arr1(&[0.5, 0.0, 0.5]).into_dyn());
    }
}
