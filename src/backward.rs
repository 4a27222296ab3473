//! Reverse topological traversal and cotangent accumulation (spec.md §4.7).

use std::collections::HashMap;

use crate::{
    Floating,
    error::{ChainruleError, Result},
    graph::Graph,
    identity::Id,
    value::Value,
    vjp,
};

/// Two-phase child-count toposort (spec.md §4.7): a DFS from `end_node`
/// counts in-edges per node, then nodes whose remaining count drops to zero
/// consumers are emitted and their parents' counts decremented. Any node
/// reachable from `end_node` is visited strictly after every one of its
/// consumers.
pub fn toposort<D: Floating>(graph: &Graph<D>, end_node: Id) -> Vec<Id> {
    let mut child_counts: HashMap<Id, usize> = HashMap::new();
    let mut stack = vec![end_node];
    while let Some(node) = stack.pop() {
        let count = child_counts.entry(node).or_insert(0);
        *count += 1;
        if *count == 1 {
            stack.extend(graph.get(node).parents.iter().copied());
        }
    }

    let mut order = Vec::with_capacity(child_counts.len());
    let mut ready = vec![end_node];
    while let Some(node) = ready.pop() {
        order.push(node);
        for &parent in &graph.get(node).parents {
            let remaining = child_counts
                .get_mut(&parent)
                .expect("every parent was counted during the DFS phase");
            if *remaining == 1 {
                ready.push(parent);
            } else {
                *remaining -= 1;
            }
        }
    }
    order
}

/// `backward_pass(g, end_node) -> cotangent_of_root` (spec.md §4.7).
pub fn backward_pass<D: Floating + 'static>(
    graph: &Graph<D>,
    g: Value<D>,
    end_node: Id,
) -> Result<Value<D>> {
    let mut outgrads: HashMap<Id, Value<D>> = HashMap::new();
    outgrads.insert(end_node, g);

    let mut root_outgrad: Option<Value<D>> = None;
    for node_id in toposort(graph, end_node) {
        let outgrad = outgrads
            .remove(&node_id)
            .expect("toposort only yields nodes reachable from end_node, which all accumulate an outgrad before being visited");
        let node = graph.get(node_id);

        if let Some(recipe) = &node.recipe {
            for (argnum, &parent) in recipe.parent_argnums.iter().copied().zip(node.parents.iter()) {
                let rule = vjp::lookup_by_type_id::<D>(recipe.primitive, argnum).ok_or(
                    ChainruleError::MissingVjp {
                        primitive: recipe.primitive_name,
                        argnum,
                    },
                )?;
                tracing::trace!(
                    primitive = recipe.primitive_name,
                    argnum,
                    "applying vjp rule"
                );
                let contribution = rule(
                    outgrad.clone(),
                    &recipe.out_value,
                    &recipe.arg_values,
                    recipe.config.as_ref(),
                );
                let accumulated = match outgrads.remove(&parent) {
                    None => contribution,
                    Some(prev) => crate::ops::add_values(prev, contribution),
                };
                outgrads.insert(parent, accumulated);
            }
        }

        root_outgrad = Some(outgrad);
    }

    Ok(root_outgrad.expect("end_node is always visited by toposort, so the loop runs at least once"))
}
