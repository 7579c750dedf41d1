//! The bounds contract for caller-supplied key types.

use std::fmt::Debug;
use std::hash::Hash;

/// Marker for the key positions of the event model: the event kind, the event
/// value, and listener identities.
///
/// Keys only need equality and hashability to participate in routing; `Debug`
/// is required so errors can name the event that produced them, and `'static`
/// because keys outlive any single dispatch. Implemented automatically for
/// every qualifying type: enums, small integers, strings, uuids.
pub trait EventKey: Clone + Eq + Hash + Debug + 'static {}

impl<T: Clone + Eq + Hash + Debug + 'static> EventKey for T {}
