//! Property descriptors and descriptor utilities
//!
//! A member is either a data member (`value` + `writable`) or an accessor
//! (`get`/`set`), plus `enumerable` and `configurable` flags. Descriptors can
//! be turned into plain descriptor objects and back so that decorators and
//! custom definers can treat them as ordinary member tables.

use crate::errors::{ComposeError, Result};
use crate::function::Function;
use crate::object::ObjectRef;
use crate::value::Value;

/// Shape of a member
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorKind {
    /// Stored value
    Data {
        /// Current value
        value: Value,
        /// Whether assignment is allowed
        writable: bool,
    },
    /// Computed member
    Accessor {
        /// Getter, invoked with the receiver as `this`
        get: Option<Function>,
        /// Setter, invoked with the receiver as `this` and the new value
        set: Option<Function>,
    },
}

/// Full attribute set of a member
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    /// Data or accessor shape
    pub kind: DescriptorKind,
    /// Visible to enumeration
    pub enumerable: bool,
    /// Redefinable and deletable
    pub configurable: bool,
}

impl PropertyDescriptor {
    /// Writable, enumerable, configurable data member
    pub fn data(value: impl Into<Value>) -> Self {
        Self {
            kind: DescriptorKind::Data {
                value: value.into(),
                writable: true,
            },
            enumerable: true,
            configurable: true,
        }
    }

    /// Enumerable, configurable accessor member
    pub fn accessor(get: Option<Function>, set: Option<Function>) -> Self {
        Self {
            kind: DescriptorKind::Accessor { get, set },
            enumerable: true,
            configurable: true,
        }
    }

    /// Set `enumerable`
    pub fn with_enumerable(mut self, enumerable: bool) -> Self {
        self.enumerable = enumerable;
        self
    }

    /// Set `configurable`
    pub fn with_configurable(mut self, configurable: bool) -> Self {
        self.configurable = configurable;
        self
    }

    /// Set `writable`; no effect on accessors
    pub fn with_writable(mut self, writable: bool) -> Self {
        if let DescriptorKind::Data { writable: w, .. } = &mut self.kind {
            *w = writable;
        }
        self
    }

    /// Whether this is an accessor member
    pub fn is_accessor(&self) -> bool {
        matches!(self.kind, DescriptorKind::Accessor { .. })
    }

    /// Whether this is a data member
    pub fn is_data(&self) -> bool {
        matches!(self.kind, DescriptorKind::Data { .. })
    }

    /// Stored value of a data member
    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            DescriptorKind::Data { value, .. } => Some(value),
            DescriptorKind::Accessor { .. } => None,
        }
    }

    /// Stored procedure of a data member
    pub fn method(&self) -> Option<&Function> {
        self.value().and_then(Value::as_function)
    }

    /// Getter of an accessor member
    pub fn getter(&self) -> Option<&Function> {
        match &self.kind {
            DescriptorKind::Accessor { get, .. } => get.as_ref(),
            DescriptorKind::Data { .. } => None,
        }
    }

    /// Setter of an accessor member
    pub fn setter(&self) -> Option<&Function> {
        match &self.kind {
            DescriptorKind::Accessor { set, .. } => set.as_ref(),
            DescriptorKind::Data { .. } => None,
        }
    }

    /// Express this descriptor as a descriptor object
    pub fn to_object(&self) -> ObjectRef {
        let object = ObjectRef::new();
        match &self.kind {
            DescriptorKind::Data { value, writable } => {
                object.insert("value", value.clone());
                object.insert("writable", Value::Bool(*writable));
            }
            DescriptorKind::Accessor { get, set } => {
                object.insert("get", Value::from(get.clone()));
                object.insert("set", Value::from(set.clone()));
            }
        }
        object.insert("enumerable", Value::Bool(self.enumerable));
        object.insert("configurable", Value::Bool(self.configurable));
        object
    }

    /// Read a descriptor object; absent fields default to `false`/`Undefined`
    pub fn from_object(member: &str, object: &ObjectRef) -> Result<Self> {
        let field = |key: &str| -> Result<Option<Value>> {
            if object.has(key) {
                object.get(key).map(Some)
            } else {
                Ok(None)
            }
        };
        let flag = |key: &str| -> Result<Option<bool>> {
            Ok(field(key)?.map(|v| v.is_truthy()))
        };
        let accessor_fn = |key: &str| -> Result<Option<Option<Function>>> {
            match field(key)? {
                None => Ok(None),
                Some(Value::Undefined) => Ok(Some(None)),
                Some(Value::Function(f)) => Ok(Some(Some(f))),
                Some(other) => Err(ComposeError::invalid_descriptor(
                    member,
                    format!("`{key}` must be a function, found {}", other.type_name()),
                )),
            }
        };

        let value = field("value")?;
        let writable = flag("writable")?;
        let get = accessor_fn("get")?;
        let set = accessor_fn("set")?;

        let kind = if get.is_some() || set.is_some() {
            if value.is_some() || writable.is_some() {
                return Err(ComposeError::invalid_descriptor(
                    member,
                    "cannot both specify accessors and a value or writable attribute",
                ));
            }
            DescriptorKind::Accessor {
                get: get.flatten(),
                set: set.flatten(),
            }
        } else {
            DescriptorKind::Data {
                value: value.unwrap_or_default(),
                writable: writable.unwrap_or(false),
            }
        };

        Ok(Self {
            kind,
            enumerable: flag("enumerable")?.unwrap_or(false),
            configurable: flag("configurable")?.unwrap_or(false),
        })
    }
}

/// Partial descriptor; only the fields that are set take part in a merge.
#[derive(Debug, Clone, Default)]
pub struct DescriptorPatch {
    /// Stored value
    pub value: Option<Value>,
    /// Assignment allowed
    pub writable: Option<bool>,
    /// Getter (may itself be a decorator)
    pub get: Option<Function>,
    /// Setter (may itself be a decorator)
    pub set: Option<Function>,
    /// Enumeration visibility
    pub enumerable: Option<bool>,
    /// Redefinition allowed
    pub configurable: Option<bool>,
}

impl DescriptorPatch {
    /// Empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stored value
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set `writable`
    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = Some(writable);
        self
    }

    /// Set the getter
    pub fn get(mut self, get: Function) -> Self {
        self.get = Some(get);
        self
    }

    /// Set the setter
    pub fn set(mut self, set: Function) -> Self {
        self.set = Some(set);
        self
    }

    /// Set `enumerable`
    pub fn enumerable(mut self, enumerable: bool) -> Self {
        self.enumerable = Some(enumerable);
        self
    }

    /// Set `configurable`
    pub fn configurable(mut self, configurable: bool) -> Self {
        self.configurable = Some(configurable);
        self
    }

    /// Descriptor object holding only the fields present in this patch
    pub fn to_object(&self) -> ObjectRef {
        let object = ObjectRef::new();
        if let Some(value) = &self.value {
            object.insert("value", value.clone());
        }
        if let Some(writable) = self.writable {
            object.insert("writable", Value::Bool(writable));
        }
        if let Some(get) = &self.get {
            object.insert("get", Value::Function(get.clone()));
        }
        if let Some(set) = &self.set {
            object.insert("set", Value::Function(set.clone()));
        }
        if let Some(enumerable) = self.enumerable {
            object.insert("enumerable", Value::Bool(enumerable));
        }
        if let Some(configurable) = self.configurable {
            object.insert("configurable", Value::Bool(configurable));
        }
        object
    }

    /// Complete descriptor with absent fields defaulted
    pub fn to_descriptor(&self, member: &str) -> Result<PropertyDescriptor> {
        PropertyDescriptor::from_object(member, &self.to_object())
    }
}

/// Find the descriptor of `name` on `object` or its nearest ancestor owning it.
pub fn get_descriptor(object: &ObjectRef, name: &str) -> Option<PropertyDescriptor> {
    object.lookup(name).map(|(_, descriptor)| descriptor)
}

/// Delete the owned definition of `name` at every ancestry level.
///
/// Returns the number of levels a definition was removed from.
pub fn remove(object: &ObjectRef, name: &str) -> usize {
    let mut removed = 0;
    let mut current = Some(object.clone());
    while let Some(level) = current {
        if level.delete_own(name) {
            removed += 1;
        }
        current = level.proto();
    }
    removed
}

/// Whether `descriptor` describes an accessor member
pub fn is_accessor_descriptor(descriptor: Option<&PropertyDescriptor>) -> bool {
    descriptor.is_some_and(PropertyDescriptor::is_accessor)
}

/// Whether `descriptor` describes a data member
pub fn is_data_descriptor(descriptor: Option<&PropertyDescriptor>) -> bool {
    descriptor.is_some_and(PropertyDescriptor::is_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_descriptor_walks_ancestry() {
        let base = ObjectRef::new();
        base.insert("foo", Value::from("bar"));
        let child = ObjectRef::with_proto(&base);
        let grandchild = ObjectRef::with_proto(&child);

        let found = get_descriptor(&grandchild, "foo").unwrap();
        assert_eq!(found.value(), Some(&Value::from("bar")));
        assert!(get_descriptor(&grandchild, "missing").is_none());
    }

    #[test]
    fn test_remove_erases_shadowed_members() {
        let base = ObjectRef::new();
        base.insert("foo", Value::from(1));
        let child = ObjectRef::with_proto(&base);
        child.insert("foo", Value::from(2));

        assert_eq!(remove(&child, "foo"), 2);
        assert!(!child.has("foo"));
        assert!(!base.has("foo"));
    }

    #[test]
    fn test_classification() {
        let data = PropertyDescriptor::data(1);
        let accessor = PropertyDescriptor::accessor(None, None);
        assert!(is_data_descriptor(Some(&data)));
        assert!(!is_accessor_descriptor(Some(&data)));
        assert!(is_accessor_descriptor(Some(&accessor)));
        assert!(!is_accessor_descriptor(None));
    }

    #[test]
    fn test_descriptor_object_roundtrip_preserves_shape() {
        let getter = Function::new(|_, _| Ok(Value::from("g")));
        let original = PropertyDescriptor::accessor(Some(getter), None).with_enumerable(false);
        let back = PropertyDescriptor::from_object("x", &original.to_object()).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_patch_defaults_absent_fields() {
        let descriptor = DescriptorPatch::new()
            .value("bar")
            .enumerable(true)
            .to_descriptor("foo")
            .unwrap();
        assert_eq!(descriptor.value(), Some(&Value::from("bar")));
        assert!(descriptor.enumerable);
        assert!(!descriptor.configurable);
        assert!(matches!(
            descriptor.kind,
            DescriptorKind::Data { writable: false, .. }
        ));
    }

    #[test]
    fn test_mixed_descriptor_rejected() {
        let object = ObjectRef::new();
        object.insert("value", Value::from(1));
        object.insert("get", Value::Function(Function::new(|_, _| Ok(Value::Undefined))));
        let err = PropertyDescriptor::from_object("foo", &object).unwrap_err();
        assert!(matches!(err, ComposeError::InvalidDescriptor { .. }));
    }
}
