//! Array backend adapter (spec.md §4.1).
//!
//! A thin facade over `ndarray` presenting exactly the operations the
//! tracing core needs: zero/one construction and broadcasting-aware
//! elementwise arithmetic. The one reduction every binary op's VJP rule
//! actually needs — summing away broadcast axes — is `ops::unbroadcast_like`,
//! the traced `Value<D>`-level counterpart to `numpy_vjps.py`'s
//! `unbroadcast`; this module stays at the raw-tensor level.

use ndarray::IxDyn;

use crate::{Floating, error::ChainruleError, tracing::TensorData};

pub fn zeros_like<D: Floating>(v: &TensorData<D>) -> TensorData<D> {
    TensorData::zeros(v.raw_dim())
}

pub fn ones_like<D: Floating>(v: &TensorData<D>) -> TensorData<D> {
    TensorData::from_elem(v.raw_dim(), D::one())
}

/// Broadcasting-correct elementwise add, used by the backward pass to
/// accumulate multiple incoming cotangents onto the same node.
pub fn add<D: Floating>(a: &TensorData<D>, b: &TensorData<D>) -> crate::error::Result<TensorData<D>> {
    if a.shape() == b.shape() {
        return Ok(a + b);
    }
    let shape = crate::ops::broadcast_shapes(a.shape(), b.shape()).ok_or_else(|| {
        ChainruleError::ShapeMismatch {
            op: "add_outgrads",
            detail: format!("cannot broadcast {:?} and {:?}", a.shape(), b.shape()),
        }
    })?;
    let a_bc = a
        .broadcast(IxDyn(&shape))
        .expect("shape was derived to be broadcast-compatible with a");
    let b_bc = b
        .broadcast(IxDyn(&shape))
        .expect("shape was derived to be broadcast-compatible with b");
    Ok(&a_bc + &b_bc)
}

/// Broadcasting-correct elementwise subtract.
pub fn sub<D: Floating>(a: &TensorData<D>, b: &TensorData<D>) -> crate::error::Result<TensorData<D>> {
    if a.shape() == b.shape() {
        return Ok(a - b);
    }
    let shape = crate::ops::broadcast_shapes(a.shape(), b.shape()).ok_or_else(|| {
        ChainruleError::ShapeMismatch {
            op: "sub",
            detail: format!("cannot broadcast {:?} and {:?}", a.shape(), b.shape()),
        }
    })?;
    let a_bc = a
        .broadcast(IxDyn(&shape))
        .expect("shape was derived to be broadcast-compatible with a");
    let b_bc = b
        .broadcast(IxDyn(&shape))
        .expect("shape was derived to be broadcast-compatible with b");
    Ok(&a_bc - &b_bc)
}

/// Broadcasting-correct elementwise multiply.
pub fn mul<D: Floating>(a: &TensorData<D>, b: &TensorData<D>) -> crate::error::Result<TensorData<D>> {
    if a.shape() == b.shape() {
        return Ok(a * b);
    }
    let shape = crate::ops::broadcast_shapes(a.shape(), b.shape()).ok_or_else(|| {
        ChainruleError::ShapeMismatch {
            op: "mul",
            detail: format!("cannot broadcast {:?} and {:?}", a.shape(), b.shape()),
        }
    })?;
    let a_bc = a
        .broadcast(IxDyn(&shape))
        .expect("shape was derived to be broadcast-compatible with a");
    let b_bc = b
        .broadcast(IxDyn(&shape))
        .expect("shape was derived to be broadcast-compatible with b");
    Ok(&a_bc * &b_bc)
}

/// Broadcasting-correct elementwise divide.
pub fn div<D: Floating>(a: &TensorData<D>, b: &TensorData<D>) -> crate::error::Result<TensorData<D>> {
    if a.shape() == b.shape() {
        return Ok(a / b);
    }
    let shape = crate::ops::broadcast_shapes(a.shape(), b.shape()).ok_or_else(|| {
        ChainruleError::ShapeMismatch {
            op: "div",
            detail: format!("cannot broadcast {:?} and {:?}", a.shape(), b.shape()),
        }
    })?;
    let a_bc = a
        .broadcast(IxDyn(&shape))
        .expect("shape was derived to be broadcast-compatible with a");
    let b_bc = b
        .broadcast(IxDyn(&shape))
        .expect("shape was derived to be broadcast-compatible with b");
    Ok(&a_bc / &b_bc)
}

/// Broadcasting-correct elementwise power.
pub fn pow<D: Floating>(a: &TensorData<D>, b: &TensorData<D>) -> crate::error::Result<TensorData<D>> {
    if a.shape() == b.shape() {
        return Ok(ndarray::Zip::from(a).and(b).map_collect(|&base, &exp| base.powf(exp)));
    }
    let shape = crate::ops::broadcast_shapes(a.shape(), b.shape()).ok_or_else(|| {
        ChainruleError::ShapeMismatch {
            op: "pow",
            detail: format!("cannot broadcast {:?} and {:?}", a.shape(), b.shape()),
        }
    })?;
    let a_bc = a
        .broadcast(IxDyn(&shape))
        .expect("shape was derived to be broadcast-compatible with a");
    let b_bc = b
        .broadcast(IxDyn(&shape))
        .expect("shape was derived to be broadcast-compatible with b");
    Ok(ndarray::Zip::from(&a_bc).and(&b_bc).map_collect(|&base, &exp| base.powf(exp)))
}
