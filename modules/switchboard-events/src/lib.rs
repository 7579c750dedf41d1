//! Generic, domain-agnostic event identity types.
//!
//! An occurrence is identified by an [`EventId`], a (kind, value) pair over
//! caller-supplied key types. An [`Event`] is one occurrence in flight: the id
//! plus an opaque payload and an opaque reference to whatever produced it.
//! Zero knowledge of listeners, routing, or any domain concept.
//!
//! Consumers provide their own key types; anything `Clone + Eq + Hash + Debug`
//! qualifies (see [`EventKey`]).

pub mod key;
pub mod types;

pub use key::EventKey;
pub use types::{Event, EventId};
