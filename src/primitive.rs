//! Primitive wrapper and dispatch (spec.md §4.5).
//!
//! A primitive is a small struct (one per math operation, mirroring the
//! teacher's per-op-struct style) implementing [`Primitive`]. `apply` is the
//! one, arity-generic implementation of the decorator described in spec.md
//! §4.5: it scans the argument list for the deepest active trace, and either
//! calls straight through to `forward` (no boxed args at all) or records a
//! [`crate::graph::Node`] and recurses so that any *lower*-depth boxes still
//! present get recorded by their own (outer) trace too.
//!
//! Crucially, `Recipe::out_value` and `Recipe::arg_values` keep whatever
//! boxing the recursive call left in place — they are *not* collapsed to raw
//! tensors. A VJP rule (see `vjp.rs`, `ops/`) is itself written as ordinary
//! `Value<D>` arithmetic, so when the backward pass runs while an outer trace
//! is still active, evaluating a rule retraces its arithmetic into the outer
//! graph. That retracing — not anything special in the backward pass itself
//! — is what makes `grad(grad(f))` differentiate correctly.

use std::any::TypeId;
use std::rc::Rc;

use crate::{Floating, graph::Recipe, value::Value};

/// A registered primitive. `name()` is used for diagnostics and error
/// messages; the primitive's *type* (via `TypeId`) is its registry identity
/// — see `vjp.rs`. Primitives that carry per-call configuration (axes,
/// target shapes, …) are cloned into the recorded [`Recipe`] so their vjp
/// rule can recover that configuration during the backward pass.
pub trait Primitive<D: Floating>: Clone + 'static {
    fn name(&self) -> &'static str;
    fn forward(&self, args: &[crate::tracing::TensorData<D>]) -> crate::tracing::TensorData<D>;
}

/// `find_top_boxed_args`: the largest trace id among boxed positional
/// arguments, and every argument tied for that maximum.
fn find_top_boxed_args<D: Floating>(
    args: &[Value<D>],
) -> (Vec<usize>, Option<crate::trace_stack::TraceId>) {
    let mut top_id: Option<crate::trace_stack::TraceId> = None;
    let mut top: Vec<usize> = Vec::new();
    for (argnum, arg) in args.iter().enumerate() {
        if let Some(id) = arg.trace_id() {
            match top_id {
                None => {
                    top_id = Some(id);
                    top = vec![argnum];
                }
                Some(cur) if id.depth() > cur.depth() => {
                    top_id = Some(id);
                    top = vec![argnum];
                }
                Some(cur) if id.depth() == cur.depth() => {
                    top.push(argnum);
                }
                _ => {}
            }
        }
    }
    (top, top_id)
}

/// The recording decorator: `primitive(f)` in spec.md §4.5/§6.
pub fn apply<D, P>(op: &P, args: Vec<Value<D>>) -> Value<D>
where
    D: Floating + 'static,
    P: Primitive<D>,
{
    let (top_argnums, top_id) = find_top_boxed_args(&args);

    let Some(top_id) = top_id else {
        let raw: Vec<_> = args.iter().map(|a| a.getval().clone()).collect();
        return Value::Tensor(op.forward(&raw));
    };

    // The boxes tied for the top trace id; they share one graph (one per
    // trace), so grab it from the first.
    let top_boxes: Vec<_> = top_argnums
        .iter()
        .map(|&argnum| match &args[argnum] {
            Value::Boxed(b) => (argnum, b.clone()),
            Value::Tensor(_) => unreachable!("argnum was selected because it is boxed"),
        })
        .collect();
    let graph = top_boxes[0].1.graph.clone();
    let parents: Vec<_> = top_boxes.iter().map(|(_, b)| b.node).collect();

    // argvals: unwrap only the top-boxed positions, one level. A non-top
    // position keeps its original `Value` (boxed at a lower depth, or raw);
    // a top position is replaced by its box's inner `Value`, which may
    // itself still be `Value::Boxed` at a lower depth.
    let mut argvals = args;
    for &argnum in &top_argnums {
        let Value::Boxed(b) = &argvals[argnum] else {
            unreachable!()
        };
        argvals[argnum] = (*b.value).clone();
    }

    tracing::trace!(
        primitive = op.name(),
        trace_id = top_id.depth(),
        "recording primitive"
    );

    // Recurse on `f_wrapped`, not `f_raw`: any remaining lower-depth boxes
    // in `argvals` get recorded into their own trace's graph here.
    let ans = apply(op, argvals.clone());

    let recipe = Recipe {
        primitive: TypeId::of::<P>(),
        primitive_name: op.name(),
        out_value: ans.clone(),
        arg_values: argvals,
        parent_argnums: top_argnums,
        config: Rc::new(op.clone()),
    };
    let node_id = graph.borrow_mut().push(parents, recipe);

    Value::new_box(ans, top_id, graph, node_id)
}

/// `notrace_primitive(f)` (spec.md §4.5): every argument is replaced with
/// its deepest raw value and the raw result returned, never recording —
/// the mechanism non-differentiable primitives (shape queries, comparisons,
/// …) use to safely accept boxed inputs at any nesting depth.
pub fn apply_notrace<D, F>(args: &[Value<D>], f: F) -> crate::tracing::TensorData<D>
where
    D: Floating,
    F: FnOnce(&[crate::tracing::TensorData<D>]) -> crate::tracing::TensorData<D>,
{
    let raw: Vec<_> = args.iter().map(|a| a.getval().clone()).collect();
    f(&raw)
}
