//! Process-wide (thread-local) trace stack (spec.md §4.3).
//!
//! `trace_id` is a nesting *depth*, not a unique session id: two sibling
//! differentiations at the same depth cannot coexist, because they are
//! serialized by ordinary control flow. Cross-thread differentiation is not
//! supported — each thread gets its own independent counter, per the
//! "process-wide trace stack → thread-local state" translation in spec.md
//! §9's design notes.

use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TraceId(i64);

thread_local! {
    static DEPTH: Cell<i64> = const { Cell::new(-1) };
}

/// RAII scoped-acquisition guard: depth is released on every exit path,
/// including unwinding panics, because `Drop::drop` still runs during a
/// normal (non-`abort`) unwind. This is what guarantees spec.md §8
/// invariant 4 — trace-stack depth after `make_vjp` equals the depth before
/// it, even when the traced function panics.
pub struct TraceGuard {
    id: TraceId,
}

impl TraceGuard {
    pub fn id(&self) -> TraceId {
        self.id
    }
}

impl Drop for TraceGuard {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get() - 1));
        tracing::trace!(trace_id = self.id.0, "trace released");
    }
}

/// Acquire a fresh, deeper trace id. Scoped: the returned guard must be held
/// for the duration of the trace and releases the depth when dropped.
pub fn new_trace() -> TraceGuard {
    let id = DEPTH.with(|d| {
        let next = d.get() + 1;
        d.set(next);
        next
    });
    tracing::trace!(trace_id = id, "trace acquired");
    TraceGuard { id: TraceId(id) }
}

/// Current depth, for diagnostics and tests verifying invariant 4.
pub fn current_depth() -> i64 {
    DEPTH.with(|d| d.get())
}

impl TraceId {
    pub fn depth(&self) -> i64 {
        self.0
    }
}
