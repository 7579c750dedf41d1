//! One listener registration: identity, callback, lifecycle flags.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use switchboard_events::{Event, EventKey};

/// What a listener wants done with itself once its callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Stay registered.
    Keep,
    /// Remove this listener once the current dispatch finishes.
    ///
    /// A control signal, not a failure; it never appears in the aggregated
    /// dispatch error.
    Unsubscribe,
}

/// Outcome of one callback invocation. `Err` marks a genuine failure; it is
/// collected into the dispatch error and the walk continues with the next
/// listener.
pub type CallbackResult = Result<Disposition, anyhow::Error>;

/// A listener callback. Shared `Fn` so an invocation borrows no engine state
/// and the callback is free to re-enter the dispatcher that invoked it.
pub type ListenerCallback<K, V> = Rc<dyn Fn(&Event<K, V>) -> CallbackResult>;

/// One registration record. Owned by exactly one listener set, which shares it
/// between its order list and its identity index.
pub(crate) struct Listener<K, V, L> {
    id: L,
    /// Cleared at physical removal so captured references drop promptly.
    callback: RefCell<Option<ListenerCallback<K, V>>>,
    once: bool,
    /// Marked dead but not yet detached: a dispatch is still unwinding.
    pending_removal: Cell<bool>,
}

impl<K: EventKey, V: EventKey, L: EventKey> Listener<K, V, L> {
    pub(crate) fn new(id: L, callback: ListenerCallback<K, V>, once: bool) -> Self {
        Self {
            id,
            callback: RefCell::new(Some(callback)),
            once,
            pending_removal: Cell::new(false),
        }
    }

    pub(crate) fn id(&self) -> &L {
        &self.id
    }

    pub(crate) fn once(&self) -> bool {
        self.once
    }

    pub(crate) fn is_pending_removal(&self) -> bool {
        self.pending_removal.get()
    }

    pub(crate) fn mark_pending_removal(&self) {
        self.pending_removal.set(true);
    }

    /// Clone the callback out; no borrow is held while it runs.
    pub(crate) fn callback(&self) -> Option<ListenerCallback<K, V>> {
        self.callback.borrow().clone()
    }

    /// Drop the callback, releasing whatever it captured.
    pub(crate) fn release(&self) {
        self.callback.borrow_mut().take();
    }
}
