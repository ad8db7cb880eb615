//! Endpoint behaviors keyed by concrete type

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::types::{BridgeError, Result};

/// An endpoint behavior attached to a channel factory
pub trait EndpointBehavior: Any + Send + Sync {
    /// Check the endpoint before the factory is frozen for use
    fn validate(&self, _address: &str) -> Result<()> {
        Ok(())
    }

    /// Cast to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

struct Entry {
    type_id: TypeId,
    type_name: &'static str,
    behavior: Arc<dyn EndpointBehavior>,
}

/// Ordered collection holding at most one behavior per concrete type
#[derive(Default)]
pub struct Behaviors {
    entries: Vec<Entry>,
}

impl Behaviors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a behavior; a second behavior of the same type is rejected
    pub fn add<B: EndpointBehavior>(&mut self, behavior: B) -> Result<()> {
        let type_id = TypeId::of::<B>();
        let type_name = std::any::type_name::<B>();
        if self.position(type_id).is_some() {
            return Err(BridgeError::DuplicateBehavior(type_name));
        }
        self.entries.push(Entry {
            type_id,
            type_name,
            behavior: Arc::new(behavior),
        });
        Ok(())
    }

    /// Find the behavior of type `B`
    pub fn find<B: EndpointBehavior>(&self) -> Option<&B> {
        let index = self.position(TypeId::of::<B>())?;
        self.entries[index].behavior.as_any().downcast_ref::<B>()
    }

    pub fn contains<B: EndpointBehavior>(&self) -> bool {
        self.position(TypeId::of::<B>()).is_some()
    }

    /// Remove the behavior of type `B`, keeping the order of the rest
    pub fn remove<B: EndpointBehavior>(&mut self) -> bool {
        match self.position(TypeId::of::<B>()) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Behaviors in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &dyn EndpointBehavior> + '_ {
        self.entries.iter().map(|e| e.behavior.as_ref())
    }

    /// Type names in insertion order
    pub fn type_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.type_name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, type_id: TypeId) -> Option<usize> {
        self.entries.iter().position(|e| e.type_id == type_id)
    }
}
