//! Procedures with identity
//!
//! A [`Function`] is the engine's procedure value. Two functions are the same
//! member only if they are the same allocation, which is what conflict
//! detection and override-chain lookups compare.
//!
//! Any function may carry an [`InstallHook`]. A function carrying one is a
//! decorator: when it is found as the value of a member during a merge, the
//! merge runs the hook instead of copying the value.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};

use crate::errors::{ComposeError, Result};
use crate::object::ObjectRef;
use crate::value::Value;

/// Signature of a native procedure body: `(this, args) -> result`.
pub type NativeFn = dyn Fn(&Value, &[Value]) -> Result<Value> + Send + Sync;

/// Signature of a decorator install hook.
pub type InstallFn = dyn for<'a> Fn(&Install<'a>) -> Result<()> + Send + Sync;

/// Behaviour of a constructible type produced by composition.
///
/// Implemented by composite types so that they can travel through the engine
/// as plain [`Function`] values while still exposing their pre-flattened bases.
pub trait Constructible: Send + Sync {
    /// Run the construction protocol with `this` as the candidate instance.
    fn construct(&self, this: &Value, args: &[Value]) -> Result<Value>;

    /// Shared member store of instances.
    fn prototype(&self) -> &ObjectRef;

    /// Flattened bases, spliced in when this type is reused as an ingredient.
    fn bases(&self) -> &FlattenedBases;

    /// Custom raw-definition hook, if one was installed.
    fn definer(&self) -> Option<Function> {
        None
    }
}

/// Deduplicated, first-seen ordered bases of a composite type.
#[derive(Debug, Clone, Default)]
pub struct FlattenedBases {
    /// Constructors in instantiation order
    pub constructors: Vec<Function>,
    /// Member tables in merge order
    pub prototypes: Vec<ObjectRef>,
}

#[derive(Clone)]
enum Body {
    Native(Arc<NativeFn>),
    Required,
    Unapplied { direct: Option<Function> },
    Constructor(Arc<dyn Constructible>),
}

struct FunctionInner {
    name: Option<String>,
    body: Body,
    install: Option<InstallHook>,
    meta: Option<Arc<dyn Any + Send + Sync>>,
    prototype: OnceCell<ObjectRef>,
}

/// Reference-counted procedure value compared by identity.
#[derive(Clone)]
pub struct Function(Arc<FunctionInner>);

static REQUIRED: Lazy<Function> = Lazy::new(|| Function::from_body(Some("required"), Body::Required));

impl Function {
    fn from_body(name: Option<&str>, body: Body) -> Self {
        Self(Arc::new(FunctionInner {
            name: name.map(str::to_string),
            body,
            install: None,
            meta: None,
            prototype: OnceCell::new(),
        }))
    }

    /// Create a procedure from a native closure
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self::from_body(None, Body::Native(Arc::new(body)))
    }

    /// Create a named procedure from a native closure
    pub fn named<F>(name: &str, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self::from_body(Some(name), Body::Native(Arc::new(body)))
    }

    /// The Required Marker.
    ///
    /// Always the same allocation; invoking it fails with
    /// [`ComposeError::UnfulfilledRequirement`].
    pub fn required() -> Self {
        REQUIRED.clone()
    }

    /// A decorator that has not been installed.
    ///
    /// Calling it runs `direct` when present, otherwise fails with
    /// [`ComposeError::DecoratorNotApplied`].
    pub fn decorator(install: InstallHook, direct: Option<Function>) -> Self {
        Self::from_body(Some("decorator"), Body::Unapplied { direct }).with_install(install)
    }

    /// Wrap a constructible type.
    pub fn constructor(behavior: Arc<dyn Constructible>) -> Self {
        Self::from_body(Some("composite"), Body::Constructor(behavior))
    }

    fn derive(&self, install: Option<InstallHook>, meta: Option<Arc<dyn Any + Send + Sync>>) -> Self {
        Self(Arc::new(FunctionInner {
            name: self.0.name.clone(),
            body: self.0.body.clone(),
            install,
            meta,
            prototype: OnceCell::new(),
        }))
    }

    /// Re-tag this procedure with an install hook.
    ///
    /// The result shares the body but is a distinct identity.
    pub fn with_install(&self, install: InstallHook) -> Self {
        self.derive(Some(install), self.0.meta.clone())
    }

    /// Attach opaque metadata. The result is a distinct identity.
    pub fn with_meta(&self, meta: Arc<dyn Any + Send + Sync>) -> Self {
        self.derive(self.0.install.clone(), Some(meta))
    }

    /// Metadata of type `T`, if attached
    pub fn meta<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.meta.as_deref().and_then(|m| m.downcast_ref::<T>())
    }

    /// Diagnostic label
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address-derived key for identity sets; stable while this value is alive
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Whether this is the Required Marker
    pub fn is_required(&self) -> bool {
        matches!(self.0.body, Body::Required)
    }

    /// Whether this procedure carries an install hook
    pub fn is_decorator(&self) -> bool {
        self.0.install.is_some()
    }

    /// Install hook, if this is a decorator
    pub fn install_hook(&self) -> Option<&InstallHook> {
        self.0.install.as_ref()
    }

    /// Constructible behaviour, if this is a composite type
    pub fn constructible(&self) -> Option<&Arc<dyn Constructible>> {
        match &self.0.body {
            Body::Constructor(behavior) => Some(behavior),
            _ => None,
        }
    }

    /// Pre-flattened bases, if this is a composite type
    pub fn bases(&self) -> Option<&FlattenedBases> {
        self.constructible().map(|c| c.bases())
    }

    /// Member table consulted when this procedure is used as a composition source.
    ///
    /// Plain procedures get an empty table on first use.
    pub fn prototype(&self) -> ObjectRef {
        match &self.0.body {
            Body::Constructor(behavior) => behavior.prototype().clone(),
            _ => self.0.prototype.get_or_init(ObjectRef::new).clone(),
        }
    }

    /// Invoke with an explicit receiver
    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
        match &self.0.body {
            Body::Native(body) => body(this, args),
            Body::Required => Err(ComposeError::UnfulfilledRequirement { member: None }),
            Body::Unapplied { direct: Some(direct) } => direct.call(this, args),
            Body::Unapplied { direct: None } => {
                Err(ComposeError::DecoratorNotApplied { member: None })
            }
            Body::Constructor(behavior) => behavior.construct(this, args),
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Function({}@{:p}{})",
            self.name().unwrap_or("anonymous"),
            Arc::as_ptr(&self.0),
            if self.is_decorator() { ", decorator" } else { "" }
        )
    }
}

/// Install hook carried by a decorator.
#[derive(Clone)]
pub struct InstallHook(Arc<InstallFn>);

impl InstallHook {
    /// Wrap an install closure
    pub fn new<F>(hook: F) -> Self
    where
        F: for<'a> Fn(&Install<'a>) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    /// Run the hook against `target`, installing under `name`
    pub fn run(&self, target: &ObjectRef, name: &str) -> Result<()> {
        tracing::debug!(member = name, "installing decorator");
        (self.0)(&Install {
            target,
            name,
            hook: self,
        })
    }
}

impl fmt::Debug for InstallHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstallHook({:p})", Arc::as_ptr(&self.0))
    }
}

/// Context handed to a running install hook.
pub struct Install<'a> {
    target: &'a ObjectRef,
    name: &'a str,
    hook: &'a InstallHook,
}

impl<'a> Install<'a> {
    /// Destination being built
    pub fn target(&self) -> &'a ObjectRef {
        self.target
    }

    /// Member name the decorator was bound to
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// The hook currently running
    pub fn hook(&self) -> &'a InstallHook {
        self.hook
    }

    /// Tag `function` with the running hook so later composition layers can
    /// install it again.
    pub fn retag(&self, function: &Function) -> Function {
        function.with_install(self.hook.clone())
    }
}
