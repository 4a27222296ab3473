//! VJP registry (spec.md §4.6).
//!
//! `vjps: primitive -> argnum -> rule` in a dynamically-typed host is a
//! dict keyed by a function object; Rust has no single concrete type that
//! can stand for "any primitive", so the registry key is `(TypeId of the
//! primitive struct, argnum)` — the struct's type is exactly the "stable
//! identity suitable as a map key" spec.md §9 asks for. The registry itself
//! is a type-erased `HashMap` (the `Any` + `OnceLock` pattern common in the
//! Rust ecosystem for global any-typed registries), so one table serves
//! every scalar type `D` the crate is instantiated with.
//!
//! The registry is a `static`, so its contents must be `Send + Sync`: rules
//! are stateless closures (they capture nothing, reading everything they
//! need from their arguments), so requiring `Send + Sync` on the trait
//! object costs nothing and lets the table live behind a plain `Mutex`
//! rather than being confined to one thread.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{Arc, Mutex, OnceLock},
};

use crate::{Floating, value::Value};

/// `rule(g, ans, *args, **kwargs) -> V` (spec.md §4.6). `g` is the incoming
/// cotangent, `ans` the recorded forward output, `args` the recorded
/// (possibly still-boxed) forward inputs, `kwargs` the primitive instance
/// that produced this recipe (see `graph::Recipe::config`) downcast by the
/// rule to its concrete primitive type.
pub type VjpRule<D> = Arc<
    dyn Fn(Value<D>, &Value<D>, &[Value<D>], &dyn Any) -> Value<D> + Send + Sync,
>;

type ErasedRule = Box<dyn Any + Send + Sync>;

// Keyed on (primitive type, scalar type, argnum): the same primitive struct
// (e.g. `ops::Add`) implements `Primitive<D>` for every `D`, so the scalar
// type must be part of the key or an `f64` registration would silently
// clobber an `f32` one at the same `(primitive, argnum)` slot.
fn registry() -> &'static Mutex<HashMap<(TypeId, TypeId, usize), ErasedRule>> {
    static REGISTRY: OnceLock<Mutex<HashMap<(TypeId, TypeId, usize), ErasedRule>>> =
        OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// `defvjp(primitive, *rules, argnums=...)`. Each call here installs one
/// `(primitive, argnum)` rule; the shipped ops call this once per
/// differentiable argument, passing `None` nowhere (a missing argnum simply
/// has no entry, which is indistinguishable from spec.md's documentation-only
/// `None` slot — both surface as `MissingVjp` if the backward pass asks).
pub fn defvjp<D, P>(argnum: usize, rule: VjpRule<D>)
where
    D: Floating + 'static,
    P: 'static,
{
    registry().lock().expect("vjp registry mutex poisoned").insert(
        (TypeId::of::<P>(), TypeId::of::<D>(), argnum),
        Box::new(rule),
    );
}

pub fn lookup<D, P>(argnum: usize) -> Option<VjpRule<D>>
where
    D: Floating + 'static,
    P: 'static,
{
    lookup_by_type_id::<D>(TypeId::of::<P>(), argnum)
}

pub fn lookup_by_type_id<D: Floating + 'static>(
    primitive: TypeId,
    argnum: usize,
) -> Option<VjpRule<D>> {
    registry()
        .lock()
        .expect("vjp registry mutex poisoned")
        .get(&(primitive, TypeId::of::<D>(), argnum))
        .and_then(|erased| erased.downcast_ref::<VjpRule<D>>().cloned())
}
