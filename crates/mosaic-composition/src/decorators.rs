//! Decorator primitives
//!
//! A decorator is a procedure value carrying an install hook. The merge step
//! runs the hook instead of copying the value, letting the decorator decide
//! what ends up under the member name.

use mosaic_core::{
    get_descriptor, ComposeError, DescriptorPatch, Function, Install, InstallHook, ObjectRef,
    PropertyDescriptor, Result, Value,
};

use crate::merge::{mixin, Definer};

/// The Required Marker: a member that a later source must implement.
pub fn required() -> Function {
    Function::required()
}

/// Generic decorator builder.
///
/// Called directly, the decorator runs `direct` when given and otherwise fails
/// with [`ComposeError::DecoratorNotApplied`].
pub fn decorator<F>(install: F, direct: Option<Function>) -> Function
where
    F: for<'a> Fn(&Install<'a>) -> Result<()> + Send + Sync + 'static,
{
    Function::decorator(InstallHook::new(install), direct)
}

/// Define an accessor or data member, patching whatever definition the
/// destination already inherits for the name.
///
/// Only the fields present in `patch` change. A `get` or `set` field may
/// itself be advice (for example [`crate::after`]), which then wraps the
/// inherited getter or setter.
pub fn property(patch: DescriptorPatch) -> Function {
    decorator(
        move |install| {
            let name = install.name();
            let target = install.target();
            let descriptor = match get_descriptor(target, name) {
                Some(inherited) => patch_descriptor(name, &inherited, &patch)?,
                None => patch.to_descriptor(name)?,
            };
            tracing::debug!(member = name, accessor = descriptor.is_accessor(), "defining property");
            target.define_own_property(name, descriptor)
        },
        None,
    )
}

fn patch_descriptor(
    name: &str,
    inherited: &PropertyDescriptor,
    patch: &DescriptorPatch,
) -> Result<PropertyDescriptor> {
    let merged = inherited.to_object();
    mixin(&merged, &[Value::Object(patch.to_object())], &Definer::Raw)?;
    PropertyDescriptor::from_object(name, &merged)
}

/// Where an alias reads its member from
#[derive(Debug, Clone)]
pub enum AliasSource {
    /// A trait: a composite type, a procedure's prototype, or a bare table
    Trait(Value),
    /// A member already resolvable on the destination
    Member(String),
}

impl AliasSource {
    fn table(&self) -> Option<ObjectRef> {
        match self {
            Self::Trait(Value::Function(function)) => Some(function.prototype()),
            Self::Trait(Value::Object(object)) => Some(object.clone()),
            Self::Trait(_) | Self::Member(_) => None,
        }
    }
}

impl From<&str> for AliasSource {
    fn from(member: &str) -> Self {
        Self::Member(member.to_string())
    }
}

impl From<String> for AliasSource {
    fn from(member: String) -> Self {
        Self::Member(member)
    }
}

impl From<Function> for AliasSource {
    fn from(function: Function) -> Self {
        Self::Trait(Value::Function(function))
    }
}

impl From<ObjectRef> for AliasSource {
    fn from(object: ObjectRef) -> Self {
        Self::Trait(Value::Object(object))
    }
}

impl From<&crate::CompositeType> for AliasSource {
    fn from(composite: &crate::CompositeType) -> Self {
        Self::Trait(Value::Function(composite.function().clone()))
    }
}

/// Alias a member from another trait, or from the destination itself.
///
/// With a trait source, `member` names the member to copy (captured
/// immediately); without one, the member with the install name is used.
/// With a member-name source, the destination's current definition of that
/// member is copied.
pub fn from(source: impl Into<AliasSource>, member: Option<&str>) -> Function {
    let source = source.into();
    let member = member.map(str::to_string);
    let captured = match (&member, source.table()) {
        (Some(member), Some(table)) => get_descriptor(&table, member),
        _ => None,
    };

    decorator(
        move |install| {
            let name = install.name();
            let target = install.target();
            let (source_member, descriptor) = match &source {
                AliasSource::Member(source_member) => {
                    (source_member.as_str(), get_descriptor(target, source_member))
                }
                AliasSource::Trait(_) => {
                    let source_member = member.as_deref().unwrap_or(name);
                    let descriptor = captured.clone().or_else(|| {
                        source
                            .table()
                            .and_then(|table| get_descriptor(&table, source_member))
                    });
                    (source_member, descriptor)
                }
            };
            match descriptor {
                Some(descriptor) => {
                    tracing::debug!(member = name, source = source_member, "aliasing member");
                    target.define_own_property(name, descriptor)
                }
                None => Err(ComposeError::AliasResolutionFailure {
                    source_member: source_member.to_string(),
                    target: name.to_string(),
                }),
            }
        },
        None,
    )
}
