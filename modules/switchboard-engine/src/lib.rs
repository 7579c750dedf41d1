//! Synchronous, reentrancy-safe event dispatch.
//!
//! A [`Dispatcher`] routes events identified by a (kind, value) pair to
//! listeners at two granularities: every event of a kind, or one exact
//! kind+value pair. Kind-tier listeners always run before value-tier
//! listeners; within a tier, registration order holds.
//!
//! Everything runs synchronously on the caller's thread. A callback may
//! re-enter the dispatcher it is registered on (dispatching further events,
//! removing itself or a peer, calling [`Dispatcher::clear`]) and the engine
//! defers the structural bookkeeping until the outermost dispatch unwinds.
//! The shared state is `Rc`-based, so the dispatcher is `!Send`/`!Sync`:
//! cross-thread use is a compile error, not a runtime hazard.
//!
//! Containers are created lazily on first registration and pruned as soon as
//! they empty, so an idle dispatcher holds no per-kind or per-value state.

mod dispatcher;
mod error;
mod kind;
mod listener;
mod set;


pub use dispatcher::{Dispatcher, WeakDispatcher};
pub use error::{CallbackErrors, DispatchError, Tier, TierError};
pub use listener::{CallbackResult, Disposition, ListenerCallback};

// Re-export the identity types; registration and dispatch are in terms of them.
pub use switchboard_events::{Event, EventId, EventKey};
