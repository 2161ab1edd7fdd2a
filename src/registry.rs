//! Capture-once bookkeeping shared by the wrap and injection engines.
//!
//! Both engines key their records by [`CallableIdentity`]. A record is
//! created the first time an identity is touched and is never overwritten by
//! later captures; it disappears only when the mutation is reverted, which
//! lets the next patch or injection capture afresh.

use crate::inject::ModuleId;
use crate::runtime::{Callable, Namespace, NamespaceId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// The container half of an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContainerKey {
    /// A runtime class or module.
    Namespace(NamespaceId),
    /// Free functions of a source module.
    Module { module: ModuleId },
    /// An `impl` block for `type_name` inside a source module.
    Type { module: ModuleId, type_name: String },
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKey::Namespace(id) => write!(f, "{id}"),
            ContainerKey::Module { module } => write!(f, "{module}"),
            ContainerKey::Type { module, type_name } => write!(f, "{module}::{type_name}"),
        }
    }
}

/// `(container, name)`: one mutable callable slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallableIdentity {
    pub container: ContainerKey,
    pub name: String,
}

impl CallableIdentity {
    pub fn new(container: ContainerKey, name: impl Into<String>) -> Self {
        Self {
            container,
            name: name.into(),
        }
    }

    /// Identity of a slot in a runtime namespace.
    pub fn runtime(namespace: &Namespace, name: impl Into<String>) -> Self {
        Self::new(ContainerKey::Namespace(namespace.id()), name)
    }

    /// Identity of a free function in a source module.
    pub fn function(module: ModuleId, name: impl Into<String>) -> Self {
        Self::new(ContainerKey::Module { module }, name)
    }

    /// Identity of a method in an `impl` block of a source module.
    pub fn method(module: ModuleId, type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(
            ContainerKey::Type {
                module,
                type_name: type_name.into(),
            },
            name,
        )
    }
}

impl fmt::Display for CallableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.container, self.name)
    }
}

/// Table of records keyed by identity with capture-once semantics.
#[derive(Debug)]
pub struct Registry<R> {
    records: HashMap<CallableIdentity, R>,
}

impl<R> Default for Registry<R> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
        }
    }
}

impl<R> Registry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the record for `identity`, creating it with `capture` only if
    /// none exists. The flag is `true` when this call created the record.
    pub fn capture_with(
        &mut self,
        identity: CallableIdentity,
        capture: impl FnOnce() -> R,
    ) -> (&mut R, bool) {
        match self.records.entry(identity) {
            Entry::Occupied(entry) => (entry.into_mut(), false),
            Entry::Vacant(entry) => (entry.insert(capture()), true),
        }
    }

    pub fn get(&self, identity: &CallableIdentity) -> Option<&R> {
        self.records.get(identity)
    }

    pub fn get_mut(&mut self, identity: &CallableIdentity) -> Option<&mut R> {
        self.records.get_mut(identity)
    }

    pub fn contains(&self, identity: &CallableIdentity) -> bool {
        self.records.contains_key(identity)
    }

    /// Remove and return the record, re-enabling a fresh capture.
    pub fn release(&mut self, identity: &CallableIdentity) -> Option<R> {
        self.records.remove(identity)
    }

    /// Remove every record.
    pub fn drain(&mut self) -> impl Iterator<Item = (CallableIdentity, R)> + '_ {
        self.records.drain()
    }

    pub fn identities(&self) -> impl Iterator<Item = &CallableIdentity> {
        self.records.keys()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Original callable captured by the first patch of an identity.
#[derive(Debug, Clone)]
pub struct PatchRecord {
    target: Weak<Namespace>,
    pub original: Callable,
    /// Dispatchers installed on top of `original` since capture.
    pub layers: usize,
}

impl PatchRecord {
    pub fn new(target: &Rc<Namespace>, original: Callable) -> Self {
        Self {
            target: Rc::downgrade(target),
            original,
            layers: 0,
        }
    }

    /// The patched namespace, if it is still alive.
    pub fn target(&self) -> Option<Rc<Namespace>> {
        self.target.upgrade()
    }
}

/// Source text of a function item before its first injection and after its
/// most recent one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionRecord {
    pub before: String,
    pub after: String,
    /// Number of injections applied since capture.
    pub injections: usize,
}

impl InjectionRecord {
    pub fn new(before: impl Into<String>) -> Self {
        let before = before.into();
        Self {
            after: before.clone(),
            before,
            injections: 0,
        }
    }
}
