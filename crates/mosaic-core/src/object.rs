//! Shared member tables with delegation
//!
//! An [`ObjectRef`] is a reference-counted table of named members plus an
//! optional parent it delegates lookups to. Objects are shared by every
//! composite type and instance that references them; mutation through one
//! handle is visible through all of them.
//!
//! Locks are never held while user procedures run: getters, setters and
//! invoked methods see a consistent snapshot and may freely touch the same
//! object again.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::descriptor::{DescriptorKind, PropertyDescriptor};
use crate::errors::{ComposeError, Result};
use crate::value::Value;

struct ObjectData {
    proto: Option<ObjectRef>,
    members: IndexMap<String, PropertyDescriptor>,
}

/// Handle to a member table
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<ObjectData>>);

impl Default for ObjectRef {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRef {
    fn from_data(proto: Option<ObjectRef>) -> Self {
        Self(Arc::new(RwLock::new(ObjectData {
            proto,
            members: IndexMap::new(),
        })))
    }

    /// Empty object without a parent
    pub fn new() -> Self {
        Self::from_data(None)
    }

    /// Empty object delegating to `proto`
    pub fn with_proto(proto: &ObjectRef) -> Self {
        Self::from_data(Some(proto.clone()))
    }

    /// Object holding the given data members, in order
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let object = Self::new();
        for (name, value) in entries {
            object.insert(name, value);
        }
        object
    }

    /// Parent this object delegates to
    pub fn proto(&self) -> Option<ObjectRef> {
        self.0.read().proto.clone()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address-derived key for identity sets; stable while this object is alive
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Descriptor of an owned member
    pub fn own_descriptor(&self, name: &str) -> Option<PropertyDescriptor> {
        self.0.read().members.get(name).cloned()
    }

    /// Whether `name` is owned by this object
    pub fn has_own(&self, name: &str) -> bool {
        self.0.read().members.contains_key(name)
    }

    /// Whether `name` resolves on this object or any ancestor
    pub fn has(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// All owned names in definition order
    pub fn own_names(&self) -> Vec<String> {
        self.0.read().members.keys().cloned().collect()
    }

    /// Owned enumerable names in definition order
    pub fn keys(&self) -> Vec<String> {
        self.0
            .read()
            .members
            .iter()
            .filter(|(_, d)| d.enumerable)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Enumerable names visible through the whole ancestry, nearest first.
    ///
    /// A name shadowed by a non-enumerable nearer definition is not listed.
    pub fn enumerable_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        let mut current = Some(self.clone());
        while let Some(level) = current {
            let next = {
                let data = level.0.read();
                for (name, descriptor) in &data.members {
                    if seen.insert(name.clone()) && descriptor.enumerable {
                        names.push(name.clone());
                    }
                }
                data.proto.clone()
            };
            current = next;
        }
        names
    }

    /// Nearest level owning `name`, with its descriptor
    pub fn lookup(&self, name: &str) -> Option<(ObjectRef, PropertyDescriptor)> {
        let mut current = Some(self.clone());
        while let Some(level) = current {
            let next = {
                let data = level.0.read();
                if let Some(descriptor) = data.members.get(name) {
                    let descriptor = descriptor.clone();
                    drop(data);
                    return Some((level, descriptor));
                }
                data.proto.clone()
            };
            current = next;
        }
        None
    }

    /// Stored value of the nearest definition of `name` if it is a data member.
    /// Never runs a getter.
    pub fn data_value(&self, name: &str) -> Option<Value> {
        self.lookup(name)
            .and_then(|(_, descriptor)| descriptor.value().cloned())
    }

    /// Read a member; accessors run their getter with this object as receiver.
    ///
    /// Missing members read as `Undefined`.
    pub fn get(&self, name: &str) -> Result<Value> {
        match self.lookup(name) {
            None => Ok(Value::Undefined),
            Some((_, descriptor)) => match descriptor.kind {
                DescriptorKind::Data { value, .. } => Ok(value),
                DescriptorKind::Accessor { get: Some(get), .. } => get
                    .call(&Value::Object(self.clone()), &[])
                    .map_err(|e| e.with_member(name)),
                DescriptorKind::Accessor { get: None, .. } => Ok(Value::Undefined),
            },
        }
    }

    /// Assign a member.
    ///
    /// Owned writable data is updated in place; inherited writable data is
    /// shadowed by a new owned member; accessors run their setter.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match self.lookup(name) {
            None => {
                self.insert(name, value);
                Ok(())
            }
            Some((owner, descriptor)) => match descriptor.kind {
                DescriptorKind::Accessor { set: Some(set), .. } => set
                    .call(&Value::Object(self.clone()), &[value])
                    .map(|_| ())
                    .map_err(|e| e.with_member(name)),
                DescriptorKind::Accessor { set: None, .. }
                | DescriptorKind::Data {
                    writable: false, ..
                } => Err(ComposeError::ReadOnlyMember {
                    member: name.to_string(),
                }),
                DescriptorKind::Data { writable: true, .. } => {
                    if owner.ptr_eq(self) {
                        let mut data = self.0.write();
                        if let Some(PropertyDescriptor {
                            kind: DescriptorKind::Data { value: slot, .. },
                            ..
                        }) = data.members.get_mut(name)
                        {
                            *slot = value;
                            return Ok(());
                        }
                        drop(data);
                    }
                    self.insert(name, value);
                    Ok(())
                }
            },
        }
    }

    /// Define or replace an owned writable, enumerable, configurable data member
    /// without consulting any existing definition.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.0
            .write()
            .members
            .insert(name.into(), PropertyDescriptor::data(value));
    }

    /// Raw definition of an owned member.
    ///
    /// Redefining a non-configurable member fails unless the new descriptor
    /// only changes the value (or clears `writable`) of a writable data member.
    pub fn define_own_property(&self, name: &str, descriptor: PropertyDescriptor) -> Result<()> {
        let mut data = self.0.write();
        if let Some(existing) = data.members.get(name) {
            if !existing.configurable && !redefinable(existing, &descriptor) {
                return Err(ComposeError::NotConfigurable {
                    member: name.to_string(),
                });
            }
        }
        data.members.insert(name.to_string(), descriptor);
        Ok(())
    }

    /// Delete an owned configurable member; returns whether one was removed
    pub fn delete_own(&self, name: &str) -> bool {
        let mut data = self.0.write();
        match data.members.get(name) {
            Some(descriptor) if descriptor.configurable => {
                data.members.shift_remove(name);
                true
            }
            _ => false,
        }
    }

    /// Call the procedure stored under `name` with this object as receiver
    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<Value> {
        match self.get(name)? {
            Value::Function(function) => function
                .call(&Value::Object(self.clone()), args)
                .map_err(|e| e.with_member(name)),
            _ => Err(ComposeError::NotCallable {
                member: name.to_string(),
            }),
        }
    }

    /// Whether this object appears in the ancestry of `other`
    pub fn is_prototype_of(&self, other: &ObjectRef) -> bool {
        let mut current = other.proto();
        while let Some(level) = current {
            if level.ptr_eq(self) {
                return true;
            }
            current = level.proto();
        }
        false
    }
}

fn redefinable(existing: &PropertyDescriptor, incoming: &PropertyDescriptor) -> bool {
    if existing == incoming {
        return true;
    }
    match (&existing.kind, &incoming.kind) {
        (DescriptorKind::Data { writable: true, .. }, DescriptorKind::Data { .. }) => {
            existing.enumerable == incoming.enumerable && !incoming.configurable
        }
        _ => false,
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // try_read: Debug may run while a writer on this thread holds the lock
        match self.0.try_read() {
            Some(data) => write!(
                f,
                "Object@{:p}{{{}}}",
                Arc::as_ptr(&self.0),
                data.members.keys().cloned().collect::<Vec<_>>().join(", ")
            ),
            None => write!(f, "Object@{:p}{{<locked>}}", Arc::as_ptr(&self.0)),
        }
    }
}
