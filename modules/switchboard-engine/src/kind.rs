//! Per-kind listener table: one kind-tier set plus a value-tier map.
//!
//! Both tiers are created lazily on first registration and pruned the moment
//! they empty, so a kind with no listeners costs nothing and is itself
//! dropped from the dispatcher.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use switchboard_events::{Event, EventKey};

use crate::error::{DispatchError, Tier, TierError};
use crate::listener::Listener;
use crate::set::ListenerSet;

pub(crate) struct KindListeners<K, V, L> {
    /// Listeners for every event of this kind. `None` means empty.
    kind_tier: RefCell<Option<Rc<ListenerSet<K, V, L>>>>,
    /// Listeners keyed by exact event value. Never holds an empty set.
    value_tier: RefCell<HashMap<V, Rc<ListenerSet<K, V, L>>>>,
    /// Count of in-progress (possibly nested) dispatches through this table.
    dispatching: Cell<u32>,
}

impl<K: EventKey, V: EventKey, L: EventKey> KindListeners<K, V, L> {
    pub(crate) fn new() -> Self {
        Self {
            kind_tier: RefCell::new(None),
            value_tier: RefCell::new(HashMap::new()),
            dispatching: Cell::new(0),
        }
    }

    pub(crate) fn add_kind(&self, listener: Rc<Listener<K, V, L>>) -> bool {
        self.assert_not_dispatching();
        let set = {
            let mut tier = self.kind_tier.borrow_mut();
            Rc::clone(tier.get_or_insert_with(|| Rc::new(ListenerSet::new())))
        };
        set.add(listener)
    }

    pub(crate) fn remove_kind(&self, id: &L) -> bool {
        let Some(set) = self.kind_tier.borrow().clone() else {
            return false;
        };
        let removed = set.remove(id);
        if set.is_empty() {
            *self.kind_tier.borrow_mut() = None;
        }
        removed
    }

    pub(crate) fn add_value(&self, value: V, listener: Rc<Listener<K, V, L>>) -> bool {
        self.assert_not_dispatching();
        let set = {
            let mut tier = self.value_tier.borrow_mut();
            Rc::clone(
                tier.entry(value)
                    .or_insert_with(|| Rc::new(ListenerSet::new())),
            )
        };
        set.add(listener)
    }

    pub(crate) fn remove_value(&self, value: &V, id: &L) -> bool {
        let Some(set) = self.value_tier.borrow().get(value).cloned() else {
            return false;
        };
        let removed = set.remove(id);
        if set.is_empty() {
            self.prune_value(value);
        }
        removed
    }

    /// Dispatch in two fixed phases: the kind tier first, so coarse observers
    /// see an event before fine-grained ones act on it, then the value-tier
    /// set exactly matching the event's value. A missing set in either phase
    /// is a silent no-op.
    pub(crate) fn dispatch(&self, event: &Event<K, V>) -> Result<(), DispatchError<K, V>> {
        self.dispatching.set(self.dispatching.get() + 1);
        let mut tiers = Vec::new();

        let kind_set = self.kind_tier.borrow().clone();
        if let Some(set) = kind_set {
            if let Err(errors) = set.dispatch(event) {
                tiers.push(TierError::new(Tier::Kind, event.id().clone(), errors));
            }
            if set.is_empty() {
                *self.kind_tier.borrow_mut() = None;
            }
        }

        let value_set = self.value_tier.borrow().get(&event.id().value).cloned();
        if let Some(set) = value_set {
            if let Err(errors) = set.dispatch(event) {
                tiers.push(TierError::new(Tier::Value, event.id().clone(), errors));
            }
            if set.is_empty() {
                self.prune_value(&event.id().value);
            }
        }

        self.dispatching
            .set(self.dispatching.get().saturating_sub(1));

        if tiers.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::new(tiers))
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.kind_tier.borrow().is_none() && self.value_tier.borrow().is_empty()
    }

    /// Drop both tiers. No-op mid-dispatch.
    pub(crate) fn clear(&self) {
        if self.dispatching.get() > 0 {
            return;
        }
        if let Some(set) = self.kind_tier.borrow_mut().take() {
            set.clear();
        }
        let sets: Vec<_> = std::mem::take(&mut *self.value_tier.borrow_mut())
            .into_values()
            .collect();
        for set in sets {
            set.clear();
        }
    }

    pub(crate) fn kind_len(&self) -> usize {
        self.kind_tier.borrow().as_ref().map_or(0, |set| set.len())
    }

    pub(crate) fn value_len(&self, value: &V) -> usize {
        self.value_tier
            .borrow()
            .get(value)
            .map_or(0, |set| set.len())
    }

    /// Drop an emptied value set; swap in a fresh map once the tier is empty
    /// so the bucket allocation goes too.
    fn prune_value(&self, value: &V) {
        let mut tier = self.value_tier.borrow_mut();
        tier.remove(value);
        if tier.is_empty() {
            *tier = HashMap::new();
        }
    }

    fn assert_not_dispatching(&self) {
        if self.dispatching.get() > 0 {
            panic!("listener added while its kind is mid-dispatch");
        }
    }
}
