//! Differentiable primitives (spec.md §5) and the `Value<D>` operator
//! overloads that route ordinary arithmetic through them.
//!
//! Every op here follows the same shape: a small `Clone` marker struct
//! implementing [`crate::primitive::Primitive`], a free function that wraps
//! it in [`crate::primitive::apply`], and a `register` function installing
//! its [`crate::vjp::defvjp`] rule(s). `ensure_registered` runs every op's
//! `register` exactly once per scalar type before any primitive is applied.

pub mod add;
pub mod broadcast;
pub mod div;
pub mod exp;
pub mod log;
pub mod matmul;
pub mod max;
pub mod mean;
pub mod mul;
pub mod neg;
pub mod pow;
pub mod relu;
pub mod reshape;
pub mod sub;
pub mod sum;
pub mod transpose;

use std::any::TypeId;
use std::collections::HashSet;
use std::ops;
use std::sync::{Mutex, OnceLock};

pub use add::Add;
pub use broadcast::Broadcast;
pub use div::Div;
pub use exp::Exp;
pub use log::Log;
pub use matmul::MatMul;
pub use max::Max;
pub use mean::Mean;
pub use mul::Mul;
pub use neg::Neg;
pub use pow::Pow;
pub use relu::Relu;
pub use reshape::Reshape;
pub use sub::Sub;
pub use sum::Sum;
pub use transpose::Transpose;

use crate::{Floating, value::Value};

pub(crate) fn broadcast_shapes(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    let n = a.len().max(b.len());
    let mut result = Vec::with_capacity(n);

    for i in 0..n {
        let dim_a = *a.get(a.len().wrapping_sub(i + 1)).unwrap_or(&1);
        let dim_b = *b.get(b.len().wrapping_sub(i + 1)).unwrap_or(&1);

        if dim_a == dim_b || dim_a == 1 {
            result.push(dim_b);
        } else if dim_b == 1 {
            result.push(dim_a);
        } else {
            return None;
        }
    }

    result.reverse();
    Some(result)
}

fn registered_types() -> &'static Mutex<HashSet<TypeId>> {
    static SET: OnceLock<Mutex<HashSet<TypeId>>> = OnceLock::new();
    SET.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Installs every shipped primitive's vjp rule(s) for `D`, exactly once per
/// scalar type. Called lazily from each op's free function so nothing has
/// to run before a user starts differentiating.
pub(crate) fn ensure_registered<D: Floating + 'static>() {
    let mut seen = registered_types()
        .lock()
        .expect("registered-types mutex poisoned");
    if !seen.insert(TypeId::of::<D>()) {
        return;
    }
    add::register::<D>();
    sub::register::<D>();
    mul::register::<D>();
    div::register::<D>();
    neg::register::<D>();
    exp::register::<D>();
    log::register::<D>();
    relu::register::<D>();
    matmul::register::<D>();
    sum::register::<D>();
    mean::register::<D>();
    max::register::<D>();
    transpose::register::<D>();
    reshape::register::<D>();
    broadcast::register::<D>();
    pow::register::<D>();
}

/// Value-level addition, used both by the `+` operator below and by
/// `backward::backward_pass` to accumulate cotangents. Routing cotangent
/// accumulation through the traced `Add` primitive (rather than a raw
/// tensor add) is what lets a second backward pass retrace through the
/// accumulation itself during higher-order differentiation.
pub(crate) fn add_values<D: Floating + 'static>(a: Value<D>, b: Value<D>) -> Value<D> {
    add::add(a, b)
}

/// Sums away the leading/broadcast axes of `g` so the result matches
/// `target_shape` exactly — the `Value`-level analogue of
/// `backend::unbroadcast`, implemented with the traced `Sum`/`Reshape`
/// primitives (ported from `autograd.numpy.numpy_vjps.unbroadcast`) so a
/// vjp rule that calls this retraces correctly under an outer trace.
pub(crate) fn unbroadcast_like<D: Floating + 'static>(
    g: Value<D>,
    target_shape: &[usize],
) -> Value<D> {
    let g_shape = g.getval().shape().to_vec();
    if g_shape == target_shape {
        return g;
    }

    let ndim_diff = g_shape.len().saturating_sub(target_shape.len());
    let mut axes: Vec<usize> = (0..ndim_diff).collect();
    for (i, &target_dim) in target_shape.iter().enumerate() {
        let g_dim = g_shape[ndim_diff + i];
        if target_dim == 1 && g_dim != 1 {
            axes.push(ndim_diff + i);
        }
    }

    let summed = sum::sum(g, axes, true);
    if ndim_diff > 0 {
        reshape::reshape(summed, target_shape.to_vec())
    } else {
        summed
    }
}

impl<D: Floating + 'static> ops::Add for Value<D> {
    type Output = Value<D>;
    fn add(self, rhs: Value<D>) -> Value<D> {
        add::add(self, rhs)
    }
}

impl<D: Floating + 'static> ops::Sub for Value<D> {
    type Output = Value<D>;
    fn sub(self, rhs: Value<D>) -> Value<D> {
        sub::sub(self, rhs)
    }
}

impl<D: Floating + 'static> ops::Mul for Value<D> {
    type Output = Value<D>;
    fn mul(self, rhs: Value<D>) -> Value<D> {
        mul::mul(self, rhs)
    }
}

impl<D: Floating + 'static> ops::Div for Value<D> {
    type Output = Value<D>;
    fn div(self, rhs: Value<D>) -> Value<D> {
        div::div(self, rhs)
    }
}

impl<D: Floating + 'static> ops::Neg for Value<D> {
    type Output = Value<D>;
    fn neg(self) -> Value<D> {
        neg::neg(self)
    }
}

/// Central-difference gradient checker (spec.md §8 Invariant 1), shared by
/// the per-op test modules: `grad(fun)(x)` must agree with the finite
/// difference to within `backend` precision at the perturbation scale below.
#[cfg(test)]
pub(crate) mod testutil {
    use crate::Value;
    use crate::tracing::TensorData;

    pub fn numerical_gradient<F>(fun: F, x: &TensorData<f32>, eps: f32) -> TensorData<f32>
    where
        F: Fn(&TensorData<f32>) -> f32,
    {
        let mut grad = TensorData::<f32>::zeros(x.raw_dim());
        let indices: Vec<_> = x.indexed_iter().map(|(idx, _)| idx).collect();
        for idx in indices {
            let mut plus = x.clone();
            plus[idx.clone()] += eps;
            let mut minus = x.clone();
            minus[idx.clone()] -= eps;
            grad[idx.clone()] = (fun(&plus) - fun(&minus)) / (2.0 * eps);
        }
        grad
    }

    pub fn assert_matches_numerical_gradient<F>(fun: F, x: TensorData<f32>, tol: f32)
    where
        F: Fn(Value<f32>) -> Value<f32>,
    {
        let analytic = crate::grad(&fun, x.clone()).expect("grad succeeds");
        let numerical = numerical_gradient(|t| fun(Value::Tensor(t.clone())).getval()[[]], &x, 1e-3);
        approx::assert_abs_diff_eq!(
            analytic.getval().clone(),
            numerical,
            epsilon = tol
        );
    }
}
