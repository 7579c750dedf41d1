//! Typed errors for dispatch operations.
//!
//! Callback failures are collected, never thrown past the walk: every
//! listener in scope still runs, and the producer gets one aggregate back.
//! The aggregate keeps its provenance (which tier failed, for which event)
//! and exposes enough structure to flatten into (tier, event id, cause)
//! tuples without losing order.

use std::fmt;

use thiserror::Error;

use switchboard_events::{EventId, EventKey};

/// Which tier of a kind's listener table produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Listeners registered for every event of the kind.
    Kind,
    /// Listeners registered for one exact kind+value pair.
    Value,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Kind => write!(f, "kind"),
            Tier::Value => write!(f, "value"),
        }
    }
}

/// Every genuine failure from one walk over a listener set, in invocation
/// (= registration) order.
#[derive(Debug)]
pub struct CallbackErrors {
    errors: Vec<anyhow::Error>,
}

impl CallbackErrors {
    pub(crate) fn new(errors: Vec<anyhow::Error>) -> Self {
        Self { errors }
    }

    pub fn iter(&self) -> impl Iterator<Item = &anyhow::Error> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for CallbackErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{err}")?;
        }
        write!(f, "]")
    }
}

impl std::error::Error for CallbackErrors {}

/// One tier's failures, tagged with where they came from.
#[derive(Debug, Error)]
#[error("{tier} listeners for {event_id:?}: {errors}")]
pub struct TierError<K: EventKey, V: EventKey> {
    tier: Tier,
    event_id: EventId<K, V>,
    #[source]
    errors: CallbackErrors,
}

impl<K: EventKey, V: EventKey> TierError<K, V> {
    pub(crate) fn new(tier: Tier, event_id: EventId<K, V>, errors: CallbackErrors) -> Self {
        Self {
            tier,
            event_id,
            errors,
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn event_id(&self) -> &EventId<K, V> {
        &self.event_id
    }

    pub fn errors(&self) -> &CallbackErrors {
        &self.errors
    }
}

/// The aggregated outcome of one failed dispatch call.
///
/// Tier errors appear in dispatch order: the kind tier before the value tier.
#[derive(Debug)]
pub struct DispatchError<K: EventKey, V: EventKey> {
    tiers: Vec<TierError<K, V>>,
}

impl<K: EventKey, V: EventKey> DispatchError<K, V> {
    pub(crate) fn new(tiers: Vec<TierError<K, V>>) -> Self {
        Self { tiers }
    }

    pub fn tiers(&self) -> &[TierError<K, V>] {
        &self.tiers
    }

    /// Flatten to (tier, event id, cause) tuples, preserving order.
    pub fn causes(&self) -> impl Iterator<Item = (Tier, &EventId<K, V>, &anyhow::Error)> {
        self.tiers.iter().flat_map(|tier_error| {
            tier_error
                .errors()
                .iter()
                .map(move |cause| (tier_error.tier(), tier_error.event_id(), cause))
        })
    }
}

impl<K: EventKey, V: EventKey> fmt::Display for DispatchError<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dispatch failed: [")?;
        for (i, tier_error) in self.tiers.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{tier_error}")?;
        }
        write!(f, "]")
    }
}

impl<K: EventKey, V: EventKey> std::error::Error for DispatchError<K, V> {}
