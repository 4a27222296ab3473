//! Elementwise addition (spec.md §5), broadcasting like `ndarray`'s own `+`.

use std::any::Any;
use std::sync::Arc;

use crate::{Floating, ops, primitive, tracing::TensorData, value::Value, vjp::defvjp};

#[derive(Debug, Clone, Copy)]
pub struct Add;

impl<D: Floating + 'static> primitive::Primitive<D> for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    fn forward(&self, args: &[TensorData<D>]) -> TensorData<D> {
        crate::backend::add(&args[0], &args[1]).expect("add: incompatible shapes")
    }
}

pub fn add<D: Floating + 'static>(x: Value<D>, y: Value<D>) -> Value<D> {
    ops::ensure_registered::<D>();
    primitive::apply(&Add, vec![x, y])
}

pub(crate) fn register<D: Floating + 'static>() {
    defvjp::<D, Add>(
        0,
        Arc::new(|g, _ans, args: &[Value<D>], _cfg: &dyn Any| {
            let x_shape = args[0].getval().shape().to_vec();
            ops::unbroadcast_like(g, &x_shape)
        }),
    );
    defvjp::<D, Add>(
        1,
        Arc::new(|g, _ans, args: &[Value<D>], _cfg: &dyn Any| {
            let y_shape = args[1].getval().shape().to_vec();
            ops::unbroadcast_like(g, &y_shape)
        }),
    );
}
