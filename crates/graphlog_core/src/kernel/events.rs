//! Kernel event handlers and their notification order.

use super::health::{ErrorState, PanicCause};
use crate::error::{CoreError, CoreResult};
use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// How a handler wants to be ordered relative to another handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionOrder {
    /// Run before the other handler.
    Before,
    /// Run after the other handler.
    After,
    /// No preference.
    #[default]
    DoesNotMatter,
}

/// Receives kernel lifecycle events.
///
/// Handlers are invoked synchronously on the thread that triggered the
/// event. A handler that panics is logged and skipped; it never prevents
/// the remaining handlers from running.
pub trait KernelEventHandler: Send + Sync {
    /// Called once, when the kernel panics.
    fn kernel_panic(&self, error: ErrorState, cause: &PanicCause);

    /// Called before the kernel shuts down.
    fn before_shutdown(&self) {}

    /// Name of the resource this handler guards, for diagnostics.
    fn resource(&self) -> Option<&str> {
        None
    }

    /// Ordering preference relative to `other`.
    ///
    /// Evaluated without any lock on the handler set held.
    fn order_compared_to(&self, other: &dyn KernelEventHandler) -> ExecutionOrder {
        let _ = other;
        ExecutionOrder::DoesNotMatter
    }
}

struct Registered {
    seq: u64,
    handler: Arc<dyn KernelEventHandler>,
}

#[derive(Default)]
struct Registry {
    entries: Vec<Registered>,
    next_seq: u64,
    /// Bumped on every membership change.
    generation: u64,
    /// Notification order, recomputed lazily after membership changes.
    order: Option<Arc<[Arc<dyn KernelEventHandler>]>>,
}

/// The set of registered kernel event handlers.
///
/// Notification order honours the pairwise preferences handlers declare
/// through [`KernelEventHandler::order_compared_to`]. Handlers without a
/// constraint between them run in registration order. Two handlers that
/// contradict each other are treated as unconstrained. A cycle is broken by
/// letting its earliest registered handler go first, once nothing outside
/// the cycle still has to run before it.
#[derive(Default)]
pub struct KernelEventHandlers {
    inner: RwLock<Registry>,
}

impl KernelEventHandlers {
    /// Creates an empty handler set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::HandlerAlreadyRegistered`] if this exact
    /// instance is already registered.
    pub fn register(&self, handler: Arc<dyn KernelEventHandler>) -> CoreResult<()> {
        let mut registry = self.inner.write();
        if registry
            .entries
            .iter()
            .any(|entry| same_handler(&entry.handler, &handler))
        {
            return Err(CoreError::HandlerAlreadyRegistered);
        }

        let seq = registry.next_seq;
        registry.next_seq += 1;
        debug!(seq, resource = ?handler.resource(), "registered kernel event handler");
        registry.entries.push(Registered { seq, handler });
        registry.generation += 1;
        registry.order = None;
        Ok(())
    }

    /// Removes a handler. Returns `true` if it was registered.
    pub fn unregister(&self, handler: &Arc<dyn KernelEventHandler>) -> bool {
        let mut registry = self.inner.write();
        let before = registry.entries.len();
        registry
            .entries
            .retain(|entry| !same_handler(&entry.handler, handler));
        let removed = registry.entries.len() != before;
        if removed {
            registry.generation += 1;
            registry.order = None;
        }
        removed
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Returns `true` if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Returns the handlers in notification order.
    #[must_use]
    pub fn ordered(&self) -> Vec<Arc<dyn KernelEventHandler>> {
        self.snapshot().to_vec()
    }

    /// Notifies every handler of a kernel panic.
    pub(crate) fn notify_kernel_panic(&self, cause: &PanicCause) {
        let error = cause.error_state();
        for handler in self.snapshot().iter() {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler.kernel_panic(error, cause)));
            if outcome.is_err() {
                warn!(
                    resource = ?handler.resource(),
                    "kernel event handler panicked during kernel panic notification"
                );
            }
        }
    }

    /// Notifies every handler that the kernel is shutting down.
    pub fn notify_before_shutdown(&self) {
        for handler in self.snapshot().iter() {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler.before_shutdown()));
            if outcome.is_err() {
                warn!(
                    resource = ?handler.resource(),
                    "kernel event handler panicked during shutdown notification"
                );
            }
        }
    }

    /// Returns the cached order, computing it if membership changed.
    ///
    /// The order is resolved and handlers are called with no lock held, so
    /// a handler may itself use this handler set.
    fn snapshot(&self) -> Arc<[Arc<dyn KernelEventHandler>]> {
        let (generation, handlers) = {
            let registry = self.inner.read();
            if let Some(order) = &registry.order {
                return Arc::clone(order);
            }
            let handlers: Vec<_> = registry
                .entries
                .iter()
                .map(|entry| Arc::clone(&entry.handler))
                .collect();
            (registry.generation, handlers)
        };

        let order: Arc<[Arc<dyn KernelEventHandler>]> = resolve_order(&handlers).into();

        let mut registry = self.inner.write();
        if registry.generation == generation {
            registry.order = Some(Arc::clone(&order));
        }
        order
    }
}

impl fmt::Debug for KernelEventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.read();
        let resources: Vec<_> = registry
            .entries
            .iter()
            .map(|entry| (entry.seq, entry.handler.resource().map(str::to_owned)))
            .collect();
        f.debug_struct("KernelEventHandlers")
            .field("handlers", &resources)
            .finish()
    }
}

fn same_handler(a: &Arc<dyn KernelEventHandler>, b: &Arc<dyn KernelEventHandler>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Topologically sorts handlers by their pairwise preferences.
///
/// `handlers` is in registration order. Among handlers that are free to
/// run, the earliest registered goes first. When every remaining handler
/// still waits on another, one cycle has to give way: the earliest
/// registered handler that sits on a cycle no other remaining handler leads
/// into is emitted.
fn resolve_order(handlers: &[Arc<dyn KernelEventHandler>]) -> Vec<Arc<dyn KernelEventHandler>> {
    let n = handlers.len();
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut waiting_on = vec![0usize; n];

    for i in 0..n {
        for j in (i + 1)..n {
            let a = handlers[i].as_ref();
            let b = handlers[j].as_ref();
            let a_vs_b = a.order_compared_to(b);
            let b_vs_a = b.order_compared_to(a);

            let a_first = a_vs_b == ExecutionOrder::Before || b_vs_a == ExecutionOrder::After;
            let b_first = a_vs_b == ExecutionOrder::After || b_vs_a == ExecutionOrder::Before;
            match (a_first, b_first) {
                (true, false) => {
                    successors[i].push(j);
                    predecessors[j].push(i);
                    waiting_on[j] += 1;
                }
                (false, true) => {
                    successors[j].push(i);
                    predecessors[i].push(j);
                    waiting_on[i] += 1;
                }
                // no preference, or the two contradict each other
                _ => {}
            }
        }
    }

    let mut emitted = vec![false; n];
    let mut order = Vec::with_capacity(n);
    while order.len() < n {
        let next = (0..n)
            .find(|&i| !emitted[i] && waiting_on[i] == 0)
            .or_else(|| {
                (0..n).find(|&i| {
                    !emitted[i] && heads_cycle(i, &successors, &predecessors, &emitted)
                })
            })
            .or_else(|| (0..n).find(|&i| !emitted[i]));
        let Some(next) = next else { break };

        emitted[next] = true;
        for &succ in &successors[next] {
            waiting_on[succ] = waiting_on[succ].saturating_sub(1);
        }
        order.push(Arc::clone(&handlers[next]));
    }
    order
}

/// Returns `true` if every remaining handler that must run before `start`
/// is itself reachable from `start`, i.e. `start` sits in a cycle with no
/// remaining handler outside it leading in.
fn heads_cycle(
    start: usize,
    successors: &[Vec<usize>],
    predecessors: &[Vec<usize>],
    emitted: &[bool],
) -> bool {
    let downstream = reachable(start, successors, emitted);
    let upstream = reachable(start, predecessors, emitted);
    upstream
        .iter()
        .enumerate()
        .all(|(i, &up)| !up || downstream[i])
}

fn reachable(start: usize, edges: &[Vec<usize>], emitted: &[bool]) -> Vec<bool> {
    let mut seen = vec![false; edges.len()];
    let mut stack = vec![start];
    while let Some(node) = stack.pop() {
        for &next in &edges[node] {
            if !emitted[next] && !seen[next] {
                seen[next] = true;
                stack.push(next);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Named {
        name: &'static str,
        runs_before: Vec<&'static str>,
        runs_after: Vec<&'static str>,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl KernelEventHandler for Named {
        fn kernel_panic(&self, _error: ErrorState, _cause: &PanicCause) {
            self.log.lock().push(self.name);
        }

        fn before_shutdown(&self) {
            self.log.lock().push(self.name);
        }

        fn resource(&self) -> Option<&str> {
            Some(self.name)
        }

        fn order_compared_to(&self, other: &dyn KernelEventHandler) -> ExecutionOrder {
            match other.resource() {
                Some(name) if self.runs_before.iter().any(|n| *n == name) => ExecutionOrder::Before,
                Some(name) if self.runs_after.iter().any(|n| *n == name) => ExecutionOrder::After,
                _ => ExecutionOrder::DoesNotMatter,
            }
        }
    }

    fn named(
        name: &'static str,
        runs_before: Vec<&'static str>,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<dyn KernelEventHandler> {
        Arc::new(Named {
            name,
            runs_before,
            runs_after: Vec::new(),
            log: Arc::clone(log),
        })
    }

    fn named_after(
        name: &'static str,
        runs_after: Vec<&'static str>,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<dyn KernelEventHandler> {
        Arc::new(Named {
            name,
            runs_before: Vec::new(),
            runs_after,
            log: Arc::clone(log),
        })
    }

    fn names(handlers: &KernelEventHandlers) -> Vec<String> {
        handlers
            .ordered()
            .iter()
            .map(|h| h.resource().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn registration_order_without_preferences() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = KernelEventHandlers::new();
        handlers.register(named("a", vec![], &log)).unwrap();
        handlers.register(named("b", vec![], &log)).unwrap();
        handlers.register(named("c", vec![], &log)).unwrap();
        assert_eq!(names(&handlers), ["a", "b", "c"]);
    }

    #[test]
    fn before_preference_is_honoured() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = KernelEventHandlers::new();
        handlers.register(named("a", vec![], &log)).unwrap();
        handlers.register(named("b", vec![], &log)).unwrap();
        handlers.register(named("c", vec!["a"], &log)).unwrap();
        // b is free first; a has to wait for c
        assert_eq!(names(&handlers), ["b", "c", "a"]);
    }

    #[test]
    fn cycle_is_broken_by_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = KernelEventHandlers::new();
        handlers.register(named("a", vec!["b"], &log)).unwrap();
        handlers.register(named("b", vec!["c"], &log)).unwrap();
        handlers.register(named("c", vec!["a"], &log)).unwrap();
        // a is the earliest registered member of the cycle
        assert_eq!(names(&handlers), ["a", "b", "c"]);
    }

    #[test]
    fn cycle_does_not_override_preference_outside_it() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = KernelEventHandlers::new();
        handlers.register(named_after("x", vec!["b"], &log)).unwrap();
        handlers.register(named("b", vec!["c"], &log)).unwrap();
        handlers.register(named("c", vec!["d"], &log)).unwrap();
        handlers.register(named("d", vec!["b"], &log)).unwrap();

        let order = names(&handlers);
        let position = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(position("b") < position("x"), "x ran before b: {order:?}");
        assert!(position("b") < position("c"));
        assert!(position("c") < position("d"));
        assert_eq!(order, ["b", "x", "c", "d"]);
    }

    #[test]
    fn cycle_fed_by_another_cycle() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = KernelEventHandlers::new();
        // the c-d-e cycle has to wait for the a-b-f cycle
        handlers.register(named("c", vec!["d"], &log)).unwrap();
        handlers.register(named("d", vec!["e"], &log)).unwrap();
        handlers.register(named("e", vec!["c"], &log)).unwrap();
        handlers.register(named("a", vec!["b", "c"], &log)).unwrap();
        handlers.register(named("b", vec!["f"], &log)).unwrap();
        handlers.register(named("f", vec!["a"], &log)).unwrap();
        assert_eq!(names(&handlers), ["a", "b", "f", "c", "d", "e"]);
    }

    #[test]
    fn order_is_resolved_without_holding_the_lock() {
        struct Curious {
            handlers: std::sync::Weak<KernelEventHandlers>,
        }

        impl KernelEventHandler for Curious {
            fn kernel_panic(&self, _error: ErrorState, _cause: &PanicCause) {}

            fn order_compared_to(&self, _other: &dyn KernelEventHandler) -> ExecutionOrder {
                if let Some(handlers) = self.handlers.upgrade() {
                    assert_eq!(handlers.len(), 2);
                }
                ExecutionOrder::DoesNotMatter
            }
        }

        let handlers = Arc::new(KernelEventHandlers::new());
        for _ in 0..2 {
            handlers
                .register(Arc::new(Curious {
                    handlers: Arc::downgrade(&handlers),
                }))
                .unwrap();
        }
        assert_eq!(handlers.ordered().len(), 2);
    }

    #[test]
    fn duplicate_registration_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = KernelEventHandlers::new();
        let handler = named("a", vec![], &log);
        handlers.register(Arc::clone(&handler)).unwrap();
        assert!(matches!(
            handlers.register(Arc::clone(&handler)),
            Err(CoreError::HandlerAlreadyRegistered)
        ));
        assert_eq!(handlers.len(), 1);
    }

    #[test]
    fn unregister() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = KernelEventHandlers::new();
        let a = named("a", vec![], &log);
        let b = named("b", vec![], &log);
        handlers.register(Arc::clone(&a)).unwrap();
        handlers.register(Arc::clone(&b)).unwrap();
        assert_eq!(names(&handlers), ["a", "b"]);

        assert!(handlers.unregister(&a));
        assert!(!handlers.unregister(&a));
        assert_eq!(names(&handlers), ["b"]);
    }

    #[test]
    fn panicking_handler_does_not_stop_others() {
        struct Exploding;
        impl KernelEventHandler for Exploding {
            fn kernel_panic(&self, _error: ErrorState, _cause: &PanicCause) {
                panic!("handler failure");
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = KernelEventHandlers::new();
        handlers.register(Arc::new(Exploding)).unwrap();
        handlers.register(named("after", vec![], &log)).unwrap();

        handlers.notify_kernel_panic(&PanicCause::new(ErrorState::Unknown, "boom"));
        assert_eq!(*log.lock(), ["after"]);
    }

    #[test]
    fn shutdown_notification_follows_order_and_survives_failures() {
        struct ExplodingOnShutdown;
        impl KernelEventHandler for ExplodingOnShutdown {
            fn kernel_panic(&self, _error: ErrorState, _cause: &PanicCause) {}

            fn before_shutdown(&self) {
                panic!("shutdown failure");
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = KernelEventHandlers::new();
        handlers.register(named("a", vec![], &log)).unwrap();
        handlers.register(Arc::new(ExplodingOnShutdown)).unwrap();
        handlers.register(named("c", vec!["a"], &log)).unwrap();

        handlers.notify_before_shutdown();
        assert_eq!(*log.lock(), ["c", "a"]);

        // a second shutdown pass uses the same cached order
        handlers.notify_before_shutdown();
        assert_eq!(*log.lock(), ["c", "a", "c", "a"]);
    }
}
