//! The public dispatch surface.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use switchboard_events::{Event, EventId, EventKey};

use crate::error::DispatchError;
use crate::kind::KindListeners;
use crate::listener::{CallbackResult, Listener, ListenerCallback};

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Synchronous event dispatcher over caller-supplied key types: event kind
/// `K`, event value `V`, listener identity `L`.
///
/// Cloning is cheap and shares the listener table, so a clone can be handed
/// to producers and consumers independently. A callback that needs to
/// re-enter its own dispatcher should capture a [`WeakDispatcher`] (see
/// [`Dispatcher::downgrade`]); capturing a strong clone works too but keeps
/// the table alive for as long as the listener is registered.
///
/// Listener identities are scoped per registration point: the same `L` may be
/// reused across kinds, across values, and between the kind tier and value
/// tier of one kind.
#[derive(Clone)]
pub struct Dispatcher<K, V, L> {
    shared: Rc<Shared<K, V, L>>,
}

struct Shared<K, V, L> {
    kinds: RefCell<HashMap<K, Rc<KindListeners<K, V, L>>>>,
    /// Count of in-progress (possibly nested) dispatch calls anywhere on the
    /// stack; guards `clear`.
    dispatching: Cell<u32>,
}

impl<K: EventKey, V: EventKey, L: EventKey> Dispatcher<K, V, L> {
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                kinds: RefCell::new(HashMap::new()),
                dispatching: Cell::new(0),
            }),
        }
    }

    /// Register a listener for every event of `kind`. Returns false when the
    /// identity is already registered at that kind's kind tier.
    ///
    /// Panics if `kind` is mid-dispatch (registering into a walk in progress
    /// is a programming error, distinct from the duplicate-identity false).
    pub fn add_kind_listener(
        &self,
        kind: K,
        listener_id: L,
        callback: impl Fn(&Event<K, V>) -> CallbackResult + 'static,
    ) -> bool {
        self.register_kind(kind, listener_id, Rc::new(callback), false)
    }

    /// Like [`Dispatcher::add_kind_listener`], but the listener is removed
    /// after its first invocation.
    pub fn add_kind_listener_once(
        &self,
        kind: K,
        listener_id: L,
        callback: impl Fn(&Event<K, V>) -> CallbackResult + 'static,
    ) -> bool {
        self.register_kind(kind, listener_id, Rc::new(callback), true)
    }

    /// Register a listener for events matching `id` exactly. Returns false
    /// when the identity is already registered for that exact kind+value.
    ///
    /// Panics if the kind is mid-dispatch.
    pub fn add_value_listener(
        &self,
        id: EventId<K, V>,
        listener_id: L,
        callback: impl Fn(&Event<K, V>) -> CallbackResult + 'static,
    ) -> bool {
        self.register_value(id, listener_id, Rc::new(callback), false)
    }

    /// Like [`Dispatcher::add_value_listener`], but the listener is removed
    /// after its first invocation.
    pub fn add_value_listener_once(
        &self,
        id: EventId<K, V>,
        listener_id: L,
        callback: impl Fn(&Event<K, V>) -> CallbackResult + 'static,
    ) -> bool {
        self.register_value(id, listener_id, Rc::new(callback), true)
    }

    /// Remove a kind-tier listener. Returns false when absent. Safe to call
    /// from inside a callback: removal is deferred until the dispatch that is
    /// walking the listener unwinds.
    pub fn remove_kind_listener(&self, kind: &K, listener_id: &L) -> bool {
        let Some(listeners) = self.shared.kinds.borrow().get(kind).cloned() else {
            return false;
        };
        let removed = listeners.remove_kind(listener_id);
        if listeners.is_empty() {
            self.shared.kinds.borrow_mut().remove(kind);
        }
        if removed {
            debug!(kind = ?kind, listener = ?listener_id, "kind listener removed");
        }
        removed
    }

    /// Remove a value-tier listener. Returns false when absent. Safe to call
    /// from inside a callback.
    pub fn remove_value_listener(&self, id: &EventId<K, V>, listener_id: &L) -> bool {
        let Some(listeners) = self.shared.kinds.borrow().get(&id.kind).cloned() else {
            return false;
        };
        let removed = listeners.remove_value(&id.value, listener_id);
        if listeners.is_empty() {
            self.shared.kinds.borrow_mut().remove(&id.kind);
        }
        if removed {
            debug!(id = ?id, listener = ?listener_id, "value listener removed");
        }
        removed
    }

    /// Dispatch an event to every listener in scope: the kind tier of its
    /// kind first, then the value tier matching its exact value.
    ///
    /// No listeners for the kind is a no-op `Ok(())`. Every listener in scope
    /// runs exactly once regardless of earlier failures; collected failures
    /// come back as one [`DispatchError`].
    pub fn dispatch(&self, event: Event<K, V>) -> Result<(), DispatchError<K, V>> {
        let Some(listeners) = self.shared.kinds.borrow().get(&event.id().kind).cloned() else {
            return Ok(());
        };

        trace!(id = ?event.id(), "dispatching");
        self.shared.dispatching.set(self.shared.dispatching.get() + 1);
        let result = listeners.dispatch(&event);
        if listeners.is_empty() {
            self.shared.kinds.borrow_mut().remove(&event.id().kind);
        }
        self.shared
            .dispatching
            .set(self.shared.dispatching.get().saturating_sub(1));
        result
    }

    /// Drop every listener for every kind. No-op while any dispatch is in
    /// progress on the stack, including when called from inside a callback.
    pub fn clear(&self) {
        if self.shared.dispatching.get() > 0 {
            return;
        }
        let drained: Vec<_> = std::mem::take(&mut *self.shared.kinds.borrow_mut())
            .into_values()
            .collect();
        for listeners in drained {
            listeners.clear();
        }
    }

    /// True when no listener of any tier is registered for any kind.
    pub fn is_empty(&self) -> bool {
        self.shared.kinds.borrow().is_empty()
    }

    /// Number of kind-tier listeners registered for `kind`, counting any
    /// whose removal is deferred behind an in-progress dispatch.
    pub fn kind_listener_count(&self, kind: &K) -> usize {
        self.shared
            .kinds
            .borrow()
            .get(kind)
            .map_or(0, |listeners| listeners.kind_len())
    }

    /// Number of value-tier listeners registered for the exact `id`.
    pub fn value_listener_count(&self, id: &EventId<K, V>) -> usize {
        self.shared
            .kinds
            .borrow()
            .get(&id.kind)
            .map_or(0, |listeners| listeners.value_len(&id.value))
    }

    /// A handle that does not keep the listener table alive. The way for a
    /// callback to re-enter its own dispatcher without creating a cycle.
    pub fn downgrade(&self) -> WeakDispatcher<K, V, L> {
        WeakDispatcher {
            shared: Rc::downgrade(&self.shared),
        }
    }

    fn register_kind(
        &self,
        kind: K,
        listener_id: L,
        callback: ListenerCallback<K, V>,
        once: bool,
    ) -> bool {
        let listeners = self.kind_entry(kind.clone());
        let added = listeners.add_kind(Rc::new(Listener::new(listener_id.clone(), callback, once)));
        if added {
            debug!(kind = ?kind, listener = ?listener_id, once, "kind listener registered");
        }
        added
    }

    fn register_value(
        &self,
        id: EventId<K, V>,
        listener_id: L,
        callback: ListenerCallback<K, V>,
        once: bool,
    ) -> bool {
        let listeners = self.kind_entry(id.kind.clone());
        let added = listeners.add_value(
            id.value.clone(),
            Rc::new(Listener::new(listener_id.clone(), callback, once)),
        );
        if added {
            debug!(id = ?id, listener = ?listener_id, once, "value listener registered");
        }
        added
    }

    /// The per-kind table, created on first use.
    fn kind_entry(&self, kind: K) -> Rc<KindListeners<K, V, L>> {
        let mut kinds = self.shared.kinds.borrow_mut();
        Rc::clone(
            kinds
                .entry(kind)
                .or_insert_with(|| Rc::new(KindListeners::new())),
        )
    }
}

impl<K: EventKey, V: EventKey, L: EventKey> Default for Dispatcher<K, V, L> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// WeakDispatcher
// ---------------------------------------------------------------------------

/// Non-owning handle to a [`Dispatcher`].
pub struct WeakDispatcher<K, V, L> {
    shared: Weak<Shared<K, V, L>>,
}

impl<K, V, L> Clone for WeakDispatcher<K, V, L> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<K: EventKey, V: EventKey, L: EventKey> WeakDispatcher<K, V, L> {
    /// The dispatcher, if any strong handle to it still exists.
    pub fn upgrade(&self) -> Option<Dispatcher<K, V, L>> {
        self.shared
            .upgrade()
            .map(|shared| Dispatcher { shared })
    }
}
