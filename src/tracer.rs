//! Top-level tracing entry points (spec.md §4.4, §4.8): `trace`, `make_vjp`,
//! and the `grad`/`grad2` convenience wrappers built on top of them.
//!
//! Grounded in `original_source/autograd/core.py`'s `trace`/`make_vjp` and
//! `original_source/autograd/util.py`'s `unary_to_nary` (here specialized to
//! the one- and two-argument cases this crate exposes, rather than the
//! fully generic `argnum`-indexed version).
//!
//! `x` is accepted as `impl Into<Value<D>>` rather than a raw `TensorData<D>`
//! so these functions compose: a `grad` call made *inside* an outer traced
//! closure receives an already-boxed `Value<D>` as its seed (the outer
//! box), and `Value<D>: Into<Value<D>>` passes it straight through to a
//! fresh, deeper box. This — not anything special in `backward_pass` — is
//! what makes `grad(grad(f))` differentiate correctly (spec.md §8,
//! invariant 5).

use std::cell::RefCell;
use std::rc::Rc;

use crate::{
    Floating,
    backward::backward_pass,
    error::Result,
    graph::Graph,
    identity::Id,
    trace_stack::new_trace,
    value::Value,
};

/// `trace(start_node, fun, x)` (spec.md §4.4): box `x` at a fresh trace
/// depth, call `fun`, and hand back the (possibly still-boxed) result, the
/// end node's id if the result is boxed at *this* trace's depth, and the
/// graph the trace recorded into.
pub fn trace<D, F>(
    fun: F,
    x: impl Into<Value<D>>,
) -> (Value<D>, Option<Id>, Rc<RefCell<Graph<D>>>)
where
    D: Floating + 'static,
    F: FnOnce(Value<D>) -> Value<D>,
{
    let guard = new_trace();
    let graph = Rc::new(RefCell::new(Graph::new()));
    let start_node = graph.borrow_mut().push_root();
    let start_box = Value::new_box(x.into(), guard.id(), graph.clone(), start_node);

    let end_value = fun(start_box);

    let end_node = match &end_value {
        Value::Boxed(b) if b.trace_id == guard.id() => Some(b.node),
        _ => None,
    };

    (end_value, end_node, graph)
}

/// `make_vjp(fun, x)` (spec.md §4.4, §4.8): trace `fun` at `x`, returning the
/// forward value and a closure computing the vector-Jacobian product for any
/// cotangent `g`. A dead output (the traced result never touched `x`) yields
/// a vjp that returns `zeros_like(x)` without invoking a single rule,
/// matching `original_source/autograd/core.py`'s `make_vjp` (spec.md §9's
/// resolved Open Question: zeros take `x`'s shape, not `g`'s).
pub fn make_vjp<D, F>(
    fun: F,
    x: impl Into<Value<D>>,
) -> (impl Fn(Value<D>) -> Result<Value<D>>, Value<D>)
where
    D: Floating + 'static,
    F: FnOnce(Value<D>) -> Value<D>,
{
    let x_value = x.into();
    let zeros_shape = x_value.getval().clone();
    let (end_value, end_node, graph) = trace(fun, x_value);
    let ans = end_value.clone();

    let vjp = move |g: Value<D>| -> Result<Value<D>> {
        match end_node {
            None => Ok(Value::Tensor(crate::backend::zeros_like(&zeros_shape))),
            Some(end_node) => backward_pass(&graph.borrow(), g, end_node),
        }
    };

    (vjp, ans)
}

/// `grad(fun)(x)` (spec.md §4.8): the one-argument convenience built from
/// `make_vjp`, seeding the backward pass with `ones_like(ans)`.
pub fn grad<D, F>(fun: F, x: impl Into<Value<D>>) -> Result<Value<D>>
where
    D: Floating + 'static,
    F: FnOnce(Value<D>) -> Value<D>,
{
    let (vjp, ans) = make_vjp(fun, x);
    let ones = Value::Tensor(crate::backend::ones_like(ans.getval()));
    vjp(ones)
}

/// Two-argument specialization of `unary_to_nary` (spec.md §4.8): differentiate
/// `fun` with respect to each argument in turn, holding the other fixed as a
/// constant.
pub fn grad2<D, F>(
    fun: F,
    x: impl Into<Value<D>>,
    y: impl Into<Value<D>>,
) -> Result<(Value<D>, Value<D>)>
where
    D: Floating + 'static,
    F: Fn(Value<D>, Value<D>) -> Value<D>,
{
    let x_value = x.into();
    let y_value = y.into();
    let fun_ref = &fun;
    let gx = grad(
        |a: Value<D>| fun_ref(a, y_value.clone()),
        x_value.clone(),
    )?;
    let gy = grad(|b: Value<D>| fun_ref(x_value.clone(), b), y_value)?;
    Ok((gx, gy))
}
