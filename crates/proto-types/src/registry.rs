//! Per-instance schema registry.
//!
//! The registry holds every message and enum descriptor built from one
//! root schema file and its transitive imports, keyed by fully-qualified
//! name. Each agent owns its own registry rather than registering types
//! in a process-wide pool, so two agents loading differently-versioned
//! schemas with colliding type names cannot observe each other's
//! descriptors.

use crate::descriptor::{EnumDescriptor, MessageDescriptor};
use std::collections::HashMap;

/// Registry of message and enum descriptors for one loaded schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    messages: HashMap<String, MessageDescriptor>,
    enums: HashMap<String, EnumDescriptor>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a message descriptor under its fully-qualified name.
    pub fn insert_message(&mut self, descriptor: MessageDescriptor) {
        self.messages.insert(descriptor.name.clone(), descriptor);
    }

    /// Register an enum descriptor under its fully-qualified name.
    pub fn insert_enum(&mut self, descriptor: EnumDescriptor) {
        self.enums.insert(descriptor.name.clone(), descriptor);
    }

    /// Look up a message descriptor by fully-qualified name.
    ///
    /// Lookup is an exact, case-sensitive string match; absence is a
    /// `None` so callers can produce a diagnostic naming the missing
    /// type instead of failing hard.
    pub fn message(&self, name: &str) -> Option<&MessageDescriptor> {
        self.messages.get(name)
    }

    /// Look up an enum descriptor by fully-qualified name.
    pub fn enum_type(&self, name: &str) -> Option<&EnumDescriptor> {
        self.enums.get(name)
    }

    /// List all message type names in the registry, sorted.
    pub fn message_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.messages.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered message types.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}
