//! Core types for event identity. Domain-agnostic.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::key::EventKey;

/// Identifies what happened: a (kind, value) pair.
///
/// The kind is the coarse category, the value the fine-grained instance
/// within it. Listeners subscribe to either the whole kind or one exact pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId<K, V> {
    pub kind: K,
    pub value: V,
}

impl<K: EventKey, V: EventKey> EventId<K, V> {
    pub fn new(kind: K, value: V) -> Self {
        Self { kind, value }
    }
}

/// One occurrence in flight. The caller builds this; the dispatcher hands it
/// to every listener in scope, then drops it.
///
/// `param` and `generator` are opaque to the engine: the payload of the
/// occurrence and a reference identifying its producer, both for listener
/// introspection only. Cloning is cheap (`Rc` bumps).
#[derive(Clone)]
pub struct Event<K, V> {
    id: EventId<K, V>,
    param: Option<Rc<dyn Any>>,
    generator: Option<Rc<dyn Any>>,
}

impl<K: EventKey, V: EventKey> Event<K, V> {
    /// Create an event with no payload and no generator.
    pub fn new(id: EventId<K, V>) -> Self {
        Self {
            id,
            param: None,
            generator: None,
        }
    }

    /// Attach an opaque payload.
    pub fn with_param(mut self, param: impl Any) -> Self {
        self.param = Some(Rc::new(param));
        self
    }

    /// Attach an opaque reference to the producer.
    pub fn with_generator(mut self, generator: impl Any) -> Self {
        self.generator = Some(Rc::new(generator));
        self
    }

    pub fn id(&self) -> &EventId<K, V> {
        &self.id
    }

    pub fn param(&self) -> Option<&dyn Any> {
        self.param.as_deref()
    }

    pub fn generator(&self) -> Option<&dyn Any> {
        self.generator.as_deref()
    }

    /// The payload downcast to a concrete type, if present and of that type.
    pub fn param_as<T: Any>(&self) -> Option<&T> {
        self.param.as_deref().and_then(|p| p.downcast_ref())
    }

    /// The producer reference downcast to a concrete type.
    pub fn generator_as<T: Any>(&self) -> Option<&T> {
        self.generator.as_deref().and_then(|g| g.downcast_ref())
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Event<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("param", &self.param.as_ref().map(|_| ".."))
            .field("generator", &self.generator.as_ref().map(|_| ".."))
            .finish()
    }
}
