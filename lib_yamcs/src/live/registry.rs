//! Per-parameter listener sets.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::model::TelemetryPoint;

/// A listener callback. Invoked on the socket task, so it must not block.
pub type Callback = Arc<dyn Fn(TelemetryPoint) + Send + Sync>;

struct Listener {
    id: u64,
    callback: Callback,
}

/// What a removal did to the interest set for a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Nothing matched; the handle was already cancelled.
    NotPresent,
    /// Removed; `last` is true on the one-to-zero transition.
    Removed { last: bool },
}

/// Mapping from parameter name to its listeners, insertion order preserved
/// (insertion order is delivery order).
///
/// Invariant: a name present in the map has a non-empty listener list; the
/// moment a list empties, the entry is deleted and the caller is told so it
/// can send the unsubscribe control frame. Mutations are guarded by a plain
/// mutex because every operation is short and synchronous. Transition hooks
/// run under that same lock, so commands enqueued from a hook are ordered
/// exactly like the transitions that caused them.
#[derive(Default)]
pub struct ListenerRegistry {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    listeners: HashMap<String, Vec<Listener>>,
    next_id: u64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a callback for `name` and returns the listener id. On the
    /// zero-to-one transition `on_first` runs while the lock is still held,
    /// so a racing removal on the same name cannot slip its command in
    /// between the transition and its enqueue. The hook must not block.
    pub fn add(&self, name: &str, callback: Callback, on_first: impl FnOnce()) -> u64 {
        let mut inner = self.inner.lock().expect("Registry lock poisoned");
        inner.next_id += 1;
        let id = inner.next_id;
        let listeners = inner.listeners.entry(name.to_string()).or_default();
        let first = listeners.is_empty();
        listeners.push(Listener { id, callback });
        if first {
            on_first();
        }
        id
    }

    /// Removes the listener with `id` from `name`, running `on_last` under
    /// the lock on the one-to-zero transition. Removal is by identity, so a
    /// second call for the same id finds nothing and is harmless.
    pub fn remove(&self, name: &str, id: u64, on_last: impl FnOnce()) -> Removal {
        let mut inner = self.inner.lock().expect("Registry lock poisoned");
        let Some(listeners) = inner.listeners.get_mut(name) else {
            return Removal::NotPresent;
        };
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        if listeners.len() == before {
            return Removal::NotPresent;
        }
        let last = listeners.is_empty();
        if last {
            inner.listeners.remove(name);
            on_last();
        }
        Removal::Removed { last }
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner
            .lock()
            .expect("Registry lock poisoned")
            .listeners
            .contains_key(name)
    }

    /// Names with at least one listener. Used for the reconnect repair path.
    pub fn active_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("Registry lock poisoned")
            .listeners
            .keys()
            .cloned()
            .collect()
    }

    /// Delivers a point to every listener for `name`, in registration
    /// order. Callbacks run outside the lock. Returns the delivery count.
    pub fn dispatch(&self, name: &str, point: &TelemetryPoint) -> usize {
        let callbacks: Vec<Callback> = {
            let inner = self.inner.lock().expect("Registry lock poisoned");
            match inner.listeners.get(name) {
                Some(listeners) => listeners.iter().map(|l| Arc::clone(&l.callback)).collect(),
                None => Vec::new(),
            }
        };
        for callback in &callbacks {
            callback(point.clone());
        }
        callbacks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn recorder() -> (Callback, mpsc::Receiver<TelemetryPoint>) {
        let (tx, rx) = mpsc::channel();
        let callback: Callback = Arc::new(move |point| {
            let _ = tx.send(point);
        });
        (callback, rx)
    }

    #[test]
    fn add_fires_the_hook_only_on_the_zero_to_one_transition() {
        let registry = ListenerRegistry::new();
        let (cb1, _rx1) = recorder();
        let (cb2, _rx2) = recorder();
        let mut transitions = 0;
        registry.add("A", cb1, || transitions += 1);
        assert_eq!(transitions, 1);
        registry.add("A", cb2, || transitions += 1);
        assert_eq!(transitions, 1);
    }

    #[test]
    fn remove_fires_the_hook_on_the_one_to_zero_transition_and_drops_the_entry() {
        let registry = ListenerRegistry::new();
        let (cb1, _rx1) = recorder();
        let (cb2, _rx2) = recorder();
        let id1 = registry.add("A", cb1, || {});
        let id2 = registry.add("A", cb2, || {});

        let mut unsubscribes = 0;
        assert_eq!(
            registry.remove("A", id1, || unsubscribes += 1),
            Removal::Removed { last: false }
        );
        assert_eq!(unsubscribes, 0);
        assert!(registry.has("A"));
        assert_eq!(
            registry.remove("A", id2, || unsubscribes += 1),
            Removal::Removed { last: true }
        );
        assert_eq!(unsubscribes, 1);
        assert!(!registry.has("A"));
        assert!(registry.active_names().is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = ListenerRegistry::new();
        let (cb, _rx) = recorder();
        let id = registry.add("A", cb, || {});
        assert_eq!(registry.remove("A", id, || {}), Removal::Removed { last: true });
        assert_eq!(registry.remove("A", id, || {}), Removal::NotPresent);
        assert_eq!(registry.remove("B", 99, || {}), Removal::NotPresent);
    }

    #[test]
    fn dispatch_reaches_every_listener_in_subscribe_order() {
        let registry = ListenerRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let order = Arc::clone(&order);
            let callback: Callback = Arc::new(move |point: TelemetryPoint| {
                order.lock().unwrap().push((tag, point.id.clone()));
            });
            registry.add("A", callback, || {});
        }

        let delivered = registry.dispatch("A", &TelemetryPoint::tick("A"));
        assert_eq!(delivered, 2);
        assert_eq!(
            *order.lock().unwrap(),
            vec![("first", "A".to_string()), ("second", "A".to_string())]
        );
        assert_eq!(registry.dispatch("B", &TelemetryPoint::tick("B")), 0);
    }

    #[test]
    fn removing_one_listener_leaves_the_other_receiving() {
        let registry = ListenerRegistry::new();
        let (cb1, rx1) = recorder();
        let (cb2, rx2) = recorder();
        let id1 = registry.add("A", cb1, || {});
        registry.add("A", cb2, || {});

        registry.remove("A", id1, || {});
        registry.dispatch("A", &TelemetryPoint::tick("A"));
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }
}
