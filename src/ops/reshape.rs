//! Reshape to an explicit target shape (spec.md §5), the number of elements
//! preserved by construction — callers are responsible for that invariant.

use std::any::Any;
use std::sync::Arc;

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

#[derive(Debug, Clone)]
pub struct Reshape {
    pub target_shape: Vec<usize>,
}

impl<D: Floating + 'static> primitive::Primitive<D> for Reshape {
    fn name(&self) -> &'static str {
        "reshape"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        args[0]
            .to_shape(self.target_shape.clone())
            .expect("reshape: element count must be preserved")
            .to_owned()
    }
}

pub fn reshape<D: Floating + 'static>(x: Value<D>, target_shape: Vec<usize>) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&Reshape { target_shape }, vec![x])
}

pub(crate) fn register<D: Floating + 'static>() {
    defvjp::<D, Reshape>(
        0,
        Arc::new(|g, _ans, args: &[Value<D>], _cfg: &dyn Any| {
            let original_shape = args[0].getval().shape().to_vec();
            reshape(g, original_shape)
        }),
    );
}
