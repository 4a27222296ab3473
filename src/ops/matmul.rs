//! Matrix multiplication, generalized to vectors, scalars and batched
//! higher-rank tensors (spec.md §5).

use std::any::Any;
use std::sync::Arc;

use ndarray::{Array, ArrayD, ArrayView1, Ix1, Ix2, IxDyn, linalg::{general_mat_mul, general_mat_vec_mul}};

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

fn batched_matmul<D: Floating + 'static>(a: &ArrayD<D>, b: &ArrayD<D>) -> ArrayD<D> {
    let shape_a = a.shape();
    let shape_b = b.shape();

    assert!(
        shape_a.len() >= 2 && shape_b.len() >= 2,
        "inputs for batched matrix mul should have rank > 2"
    );

    let (m, k1) = (shape_a[shape_a.len() - 2], shape_a[shape_a.len() - 1]);
    let (k2, n) = (shape_b[shape_b.len() - 2], shape_b[shape_b.len() - 1]);
    assert_eq!(
        k1, k2,
        "inner matrix dimensions should match for matrix mul: lhs contracted dim is {k1}, rhs is {k2}"
    );

    let batch_a = &shape_a[..shape_a.len() - 2];
    let batch_b = &shape_b[..shape_b.len() - 2];
    let batch_shape = super::broadcast_shapes(batch_a, batch_b)
        .expect("batch dimensions should be broadcast-compatible");

    let bc_shape_a: Vec<usize> = batch_shape.iter().copied().chain([m, k1]).collect();
    let bc_shape_b: Vec<usize> = batch_shape.iter().copied().chain([k2, n]).collect();

    let a_bc = a
        .broadcast(IxDyn(&bc_shape_a))
        .expect("broadcasting to a derived valid shape should be infallible ");
    let b_bc = b
        .broadcast(IxDyn(&bc_shape_b))
        .expect("broadcasting to a derived valid shape should be infallible ");

    let result_shape: Vec<usize> = batch_shape.iter().copied().chain([m, n]).collect();
    let mut result = ArrayD::zeros(IxDyn(&result_shape));

    let batch_elems: usize = batch_shape.iter().product();
    let a_reshaped = a_bc
        .to_shape((batch_elems, m, k1))
        .expect("reshape should succeed because the number of elements is preserved");
    let b_reshaped = b_bc
        .to_shape((batch_elems, k2, n))
        .expect("reshape should succeed because the number of elements is preserved");
    let binding = result.view_mut();
    let mut r_reshaped = binding
        .to_shape((batch_elems, m, n))
        .expect("reshape should succeed because the number of elements is preserved");

    ndarray::Zip::from(a_reshaped.outer_iter())
        .and(b_reshaped.outer_iter())
        .and(r_reshaped.outer_iter_mut())
        .for_each(|ai, bi, mut ri| {
            general_mat_mul(D::one(), &ai, &bi, D::zero(), &mut ri);
        });

    result
}

fn matmul_tensors<D: Floating + 'static>(a: &TensorData<D>, b: &TensorData<D>) -> TensorData<D> {
    match (a.ndim(), b.ndim()) {
        // scalar
        (0, _) | (_, 0) => a * b,

        // vector dot product
        (1, 1) => {
            assert_eq!(
                a.len(),
                b.len(),
                "vectors in dot-product should have same length"
            );
            let a1: ArrayView1<D> = a
                .view()
                .into_dimensionality::<Ix1>()
                .expect("an ndim=1 tensor should be convertible to a 1D view");
            let b1: ArrayView1<D> = b
                .view()
                .into_dimensionality::<Ix1>()
                .expect("an ndim=1 tensor should be convertible to a 1D view");
            TensorData::from_elem(vec![], a1.dot(&b1))
        }

        // vector @ matrix -> vector (1D)
        (1, 2) => {
            let n = a.len();
            assert_eq!(
                n,
                b.shape()[0],
                "vector length should match matrix's outer dimension for vec @ mat"
            );
            let m = b.shape()[1];
            let a1 = a
                .view()
                .into_dimensionality::<Ix1>()
                .expect("an ndim=1 tensor should be convertible to a 1D view");
            let b2 = b
                .view()
                .into_dimensionality::<Ix2>()
                .expect("an ndim=2 tensor should be convertible to a 2D view");

            let mut result = Array::zeros(m);
            general_mat_vec_mul(D::one(), &b2.t(), &a1, D::zero(), &mut result);
            result.into_dyn()
        }

        // matrix @ vector -> vector (1D)
        (2, 1) => {
            let n = b.len();
            assert_eq!(
                n,
                a.shape()[1],
                "vector length should match matrix's inner dimension for mat @ vec"
            );
            let m = a.shape()[0];
            let a2 = a
                .view()
                .into_dimensionality::<Ix2>()
                .expect("an ndim=2 tensor should be convertible to a 2D view");
            let b1 = b
                .view()
                .into_dimensionality::<Ix1>()
                .expect("an ndim=2 tensor should be convertible to a 1D view");

            let mut result = Array::zeros(m);
            general_mat_vec_mul(D::one(), &a2, &b1, D::zero(), &mut result);
            result.into_dyn()
        }

        // matrix @ matrix -> matrix
        (2, 2) => {
            let (m, k1) = (a.shape()[0], a.shape()[1]);
            let (k2, n) = (b.shape()[0], b.shape()[1]);
            assert_eq!(
                k1, k2,
                "inner dimension for matrix mul should be equal but lhs({k1}) != rhs({k2})"
            );

            let a2 = a
                .view()
                .into_dimensionality::<Ix2>()
                .expect("an ndim=2 tensor should be convertible to a 2D view");
            let b2 = b
                .view()
                .into_dimensionality::<Ix2>()
                .expect("an ndim=2 tensor should be convertible to a 2D view");

            let mut result = Array::zeros((m, n));
            general_mat_mul(D::one(), &a2, &b2, D::zero(), &mut result);
            result.into_dyn()
        }

        _ => batched_matmul(a, b),
    }
}

pub fn infer_matmul_shape(lhs: &[usize], rhs: &[usize]) -> Vec<usize> {
    match (lhs.len(), rhs.len()) {
        (0, _) => rhs.to_vec(),
        (_, 0) => lhs.to_vec(),
        (1, 1) => vec![],
        (1, 2) => vec![rhs[1]],
        (2, 1) => vec![lhs[0]],
        (2, 2) => vec![lhs[0], rhs[1]],
        _ => {
            let batch_a = &lhs[..lhs.len() - 2];
            let batch_b = &rhs[..rhs.len() - 2];
            let batch_shape = super::broadcast_shapes(batch_a, batch_b)
                .expect("batch dims broadcastable for matmul");

            let m = lhs[lhs.len() - 2];
            let n = rhs[rhs.len() - 1];
            let mut result = batch_shape;
            result.push(m);
            result.push(n);
            result
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MatMul;

impl<D: Floating + 'static> primitive::Primitive<D> for MatMul {
    fn name(&self) -> &'static str {
        "matmul"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        matmul_tensors(&args[0], &args[1])
    }
}

pub fn matmul<D: Floating + 'static>(a: Value<D>, b: Value<D>) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&MatMul, vec![a, b])
}

// Ported from `_dot_vjp_0`/`_dot_vjp_1` in numpy_vjps.py, which special-cases
// each ndim combination up to rank 2 rather than relying on a single
// transpose-based formula — `transpose` only swaps the last two axes, so it
// is a no-op on the rank-0/1 operands the (2,2) formula below assumes.
// Batched (ndim > 2) operands fall through to that (2,2) formula too: it
// only touches the trailing matrix axes, which is exactly what batched
// matmul contracts over.
fn vjp_lhs<D: Floating + 'static>(g: Value<D>, args: &[Value<D>]) -> Value<D> {
    let lhs_shape = args[0].getval().shape().to_vec();
    let rhs = args[1].clone();
    let ndim_lhs = args[0].getval().ndim();
    let ndim_rhs = args[1].getval().ndim();

    let result = match (ndim_lhs, ndim_rhs) {
        (0, _) => super::sum::sum(rhs * g, vec![], false),
        (1, 1) => g * rhs,
        // mat @ vec -> vec; d/dmat = outer(g, vec)
        (2, 1) => {
            let m = g.getval().shape()[0];
            super::reshape::reshape(g, vec![m, 1]) * rhs
        }
        // vec @ mat -> vec; d/dvec = mat @ g
        (1, 2) => matmul(rhs, g),
        _ => matmul(g, super::transpose::transpose(rhs)),
    };
    ops::unbroadcast_like(result, &lhs_shape)
}

fn vjp_rhs<D: Floating + 'static>(g: Value<D>, args: &[Value<D>]) -> Value<D> {
    let lhs = args[0].clone();
    let rhs_shape = args[1].getval().shape().to_vec();
    let ndim_lhs = args[0].getval().ndim();
    let ndim_rhs = args[1].getval().ndim();

    let result = match (ndim_lhs, ndim_rhs) {
        (_, 0) => super::sum::sum(lhs * g, vec![], false),
        (1, 1) => g * lhs,
        // mat @ vec -> vec; d/dvec = g @ mat
        (2, 1) => matmul(g, lhs),
        // vec @ mat -> vec; d/dmat = outer(vec, g)
        (1, 2) => {
            let n = lhs.getval().shape()[0];
            super::reshape::reshape(lhs, vec![n, 1]) * g
        }
        _ => matmul(super::transpose::transpose(lhs), g),
    };
    ops::unbroadcast_like(result, &rhs_shape)
}

pub(crate) fn register<D: Floating + 'static>() {
    defvjp::<D, MatMul>(
        0,
        Arc::new(|g, _ans, args: &[Value<D>], _cfg: &dyn Any| vjp_lhs(g, args)),
    );
    defvjp::<D, MatMul>(
        1,
        Arc::new(|g, _ans, args: &[Value<D>], _cfg: &dyn Any| vjp_rhs(g, args)),
    );
}

#[cfg(test)]
mod tests {
    use ndarray::arr2;

    use crate::{grad2, value::Value};

    #[test]
    fn matmul_gradients_are_transposed_products() {
        let x = arr2(&[[1.0f32, 2.0], [3.0, 4.0]]).into_dyn();
        let w = arr2(&[[5.0f32, 6.0], [7.0, 8.0]]).into_dyn();

        let (gx, gw) = grad2(
            |a: Value<f32>, b: Value<f32>| super::super::sum::sum(super::matmul(a, b), vec![], false),
            x.clone(),
            w.clone(),
        )
        .expect("grad2 succeeds");

        // d/dX sum(X@W) = ones(m,n) @ W^T ; d/dW sum(X@W) = X^T @ ones(m,n)
        let expected_gx = arr2(&[[11.0f32, 15.0], [11.0, 15.0]]).into_dyn();
        let expected_gw = arr2(&[[4.0f32, 4.0], [6.0, 6.0]]).into_dyn();
        assert_eq!(gx, expected_gx);
        assert_eq!(gw, expected_gw);
    }

    #[test]
    fn matmul_gradients_for_matrix_times_vector() {
        use ndarray::arr1;

        let a = arr2(&[[1.0f32, 2.0], [3.0, 4.0]]).into_dyn();
        let v = arr1(&[5.0f32, 6.0]).into_dyn();

        let (ga, gv) = grad2(
            |x: Value<f32>, y: Value<f32>| super::super::sum::sum(super::matmul(x, y), vec![], false),
            a.clone(),
            v.clone(),
        )
        .expect("grad2 succeeds");

        // d/dA sum(A@v) = outer(ones(2), v); d/dv sum(A@v) = colsum(A)
        let expected_ga = arr2(&[[5.0f32, 6.0], [5.0, 6.0]]).into_dyn();
        let expected_gv = arr1(&[4.0f32, 6.0]).into_dyn();
        assert_eq!(ga, expected_ga);
        assert_eq!(gv, expected_gv);
    }

    #[test]
    fn matmul_gradients_for_vector_times_matrix() {
        use ndarray::arr1;

        let v = arr1(&[1.0f32, 2.0]).into_dyn();
        let a = arr2(&[[3.0f32, 4.0], [5.0, 6.0]]).into_dyn();

        let (gv, ga) = grad2(
            |x: Value<f32>, y: Value<f32>| super::super::sum::sum(super::matmul(x, y), vec![], false),
            v.clone(),
            a.clone(),
        )
        .expect("grad2 succeeds");

        // d/dv sum(v@A) = rowsum(A); d/dA sum(v@A) = outer(v, ones(2))
        let expected_gv = arr1(&[7.0f32, 11.0]).into_dyn();
        let expected_ga = arr2(&[[1.0f32, 1.0], [2.0, 2.0]]).into_dyn();
        assert_eq!(gv, expected_gv);
        assert_eq!(ga, expected_ga);
    }
}
