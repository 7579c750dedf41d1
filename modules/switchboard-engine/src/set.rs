//! Insertion-ordered listener collection with reentrancy-safe removal.
//!
//! The same structure backs the kind tier and every value-tier entry. The
//! walk in [`ListenerSet::dispatch`] holds no borrow while a callback runs,
//! so callbacks may re-enter this set: dispatch nested events, remove
//! themselves or a peer. Removal during a walk is two-phase: mark now,
//! detach when the outermost dispatch on this set unwinds.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use switchboard_events::{Event, EventKey};

use crate::error::CallbackErrors;
use crate::listener::{Disposition, Listener};

pub(crate) struct ListenerSet<K, V, L> {
    /// Insertion order; stable for the duration of any walk.
    entries: RefCell<Vec<Rc<Listener<K, V, L>>>>,
    /// Identity lookup for add/remove.
    index: RefCell<HashMap<L, Rc<Listener<K, V, L>>>>,
    /// Listeners awaiting physical detachment; populated only mid-dispatch.
    pending: RefCell<Vec<Rc<Listener<K, V, L>>>>,
    /// Count of in-progress (possibly nested) dispatches on this set.
    dispatching: Cell<u32>,
}

impl<K: EventKey, V: EventKey, L: EventKey> ListenerSet<K, V, L> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            index: RefCell::new(HashMap::new()),
            pending: RefCell::new(Vec::new()),
            dispatching: Cell::new(0),
        }
    }

    /// Register a listener. Returns false (no mutation) when the identity is
    /// already present.
    ///
    /// Panics if this set is mid-dispatch: insertion would leave the walk's
    /// order and indexing undefined. Removal is the only mutation a callback
    /// may request on its own set.
    pub(crate) fn add(&self, listener: Rc<Listener<K, V, L>>) -> bool {
        if self.dispatching.get() > 0 {
            panic!("listener added while its listener set is mid-dispatch");
        }
        let mut index = self.index.borrow_mut();
        if index.contains_key(listener.id()) {
            return false;
        }
        index.insert(listener.id().clone(), Rc::clone(&listener));
        self.entries.borrow_mut().push(listener);
        true
    }

    /// Remove a listener by identity. Returns false when absent.
    ///
    /// At rest this detaches immediately; mid-dispatch it marks the listener
    /// dead and queues it for the flush that runs when the walk unwinds.
    pub(crate) fn remove(&self, id: &L) -> bool {
        let Some(listener) = self.index.borrow().get(id).cloned() else {
            return false;
        };
        if self.dispatching.get() > 0 {
            self.defer_removal(&listener);
        } else {
            self.detach(&listener);
        }
        true
    }

    /// Walk every listener in registration order, invoking callbacks.
    ///
    /// Listeners already marked for removal are skipped. One-shot listeners
    /// and those returning [`Disposition::Unsubscribe`] are queued for
    /// deferred removal. Genuine errors are collected; they never stop the
    /// walk.
    pub(crate) fn dispatch(&self, event: &Event<K, V>) -> Result<(), CallbackErrors> {
        self.dispatching.set(self.dispatching.get() + 1);

        let mut failures = Vec::new();
        let mut cursor = 0;
        loop {
            // Fresh borrow per step; nothing is held while the callback runs.
            let Some(listener) = self.entries.borrow().get(cursor).cloned() else {
                break;
            };
            cursor += 1;

            if listener.is_pending_removal() {
                continue;
            }
            let Some(callback) = listener.callback() else {
                continue;
            };

            let mut unsubscribe = listener.once();
            match callback(event) {
                Ok(Disposition::Keep) => {}
                Ok(Disposition::Unsubscribe) => unsubscribe = true,
                Err(err) => failures.push(err),
            }
            if unsubscribe {
                self.defer_removal(&listener);
            }
        }

        let depth = self.dispatching.get().saturating_sub(1);
        self.dispatching.set(depth);
        if depth == 0 {
            self.flush_pending();
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CallbackErrors::new(failures))
        }
    }

    /// Drop every listener. No-op mid-dispatch: a suspended walk may still
    /// reference this set.
    pub(crate) fn clear(&self) {
        if self.dispatching.get() > 0 {
            return;
        }
        for listener in self.entries.borrow_mut().drain(..) {
            listener.release();
        }
        self.index.borrow_mut().clear();
        self.pending.borrow_mut().clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Registered listeners, including any whose removal is deferred behind
    /// an in-progress dispatch.
    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Mark a listener dead and queue it for the flush. Idempotent.
    fn defer_removal(&self, listener: &Rc<Listener<K, V, L>>) {
        if listener.is_pending_removal() {
            return;
        }
        listener.mark_pending_removal();
        self.pending.borrow_mut().push(Rc::clone(listener));
    }

    /// Physically remove a listener from order list and index, and release
    /// its callback. Only valid at rest (no walk in progress).
    fn detach(&self, listener: &Rc<Listener<K, V, L>>) {
        self.index.borrow_mut().remove(listener.id());
        self.entries
            .borrow_mut()
            .retain(|entry| !Rc::ptr_eq(entry, listener));
        listener.release();
    }

    fn flush_pending(&self) {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        for listener in pending {
            self.detach(&listener);
        }
    }
}
