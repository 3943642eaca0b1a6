//! Composite types
//!
//! A [`Composer`] turns a list of sources into a [`CompositeType`]: one merged
//! prototype shared by every instance, plus the flattened constructor list
//! run (each constructor once) whenever an instance is built.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use mosaic_core::{
    get_descriptor, ComposeConfig, ComposeError, Conflict, ConflictObserver, ConflictPolicy,
    Constructible, FlattenedBases, Function, ObjectRef, PropertyDescriptor, Result,
    TracingObserver, Value,
};

use crate::bases::{self, delegate};
use crate::merge::{mixin, Definer};

/// Composition entry point carrying configuration and the conflict observer
#[derive(Clone)]
pub struct Composer {
    config: ComposeConfig,
    observer: Arc<dyn ConflictObserver>,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(ComposeConfig::default())
    }
}

impl fmt::Debug for Composer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Composer {
    /// Composer reporting conflicts through `tracing`
    pub fn new(config: ComposeConfig) -> Self {
        Self {
            config,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the conflict observer
    pub fn with_observer(mut self, observer: Arc<dyn ConflictObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    fn report(&self, conflicts: Vec<Conflict>) -> Result<()> {
        for conflict in &conflicts {
            self.observer.on_conflict(conflict);
        }
        match (self.config.conflict_policy, conflicts.first()) {
            (ConflictPolicy::Fail, Some(first)) => Err(ComposeError::UnresolvedMemberConflict {
                member: first.member.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Build a composite type from `sources`.
    ///
    /// The first source is the base the merged prototype delegates to; the
    /// rest are merged into it left to right. A single bare table becomes the
    /// prototype as-is.
    pub fn compose(&self, sources: &[Value]) -> Result<CompositeType> {
        bases::validate(sources, 0)?;
        let base = &sources[0];

        let prototype = match base {
            Value::Object(table) if sources.len() == 1 => table.clone(),
            _ => {
                let dest = delegate(base)?;
                let conflicts = mixin(&dest, &sources[1..], &Definer::for_value(base)?)?;
                self.report(conflicts)?;
                dest
            }
        };

        let constructors = bases::constructors(sources);
        let mut chain_sources = sources.to_vec();
        // a trailing table is represented by the merged prototype
        if let Some(last) = chain_sources.last_mut() {
            if matches!(last, Value::Object(_)) {
                *last = Value::Object(prototype.clone());
            }
        }
        let mut prototypes = bases::prototypes(&chain_sources);
        if !prototypes.iter().any(|p| p.ptr_eq(&prototype)) {
            prototypes.push(prototype.clone());
        }

        tracing::debug!(
            sources = sources.len(),
            constructors = constructors.len(),
            prototypes = prototypes.len(),
            "composed type"
        );

        Ok(CompositeType::new(
            prototype,
            FlattenedBases {
                constructors,
                prototypes,
            },
            self.clone(),
        ))
    }

    /// Build one instance directly from `base` and `sources`.
    ///
    /// Members are merged onto a fresh object delegating to `base`, then
    /// every procedure among `base` and `sources` runs once with the instance
    /// as receiver; an object it returns becomes the instance.
    pub fn create(&self, base: &Value, sources: &[Value]) -> Result<ObjectRef> {
        bases::validate(std::slice::from_ref(base), 0)?;
        bases::validate(sources, 1)?;

        let mut instance = delegate(base)?;
        let conflicts = mixin(&instance, sources, &Definer::for_value(base)?)?;
        self.report(conflicts)?;

        for source in std::iter::once(base).chain(sources) {
            if let Value::Function(initializer) = source {
                if let Value::Object(replacement) =
                    initializer.call(&Value::Object(instance.clone()), &[])?
                {
                    instance = replacement;
                }
            }
        }
        Ok(instance)
    }

    /// Merge `sources` into an existing object through its definer
    pub fn mixin_into(&self, target: &ObjectRef, sources: &[Value]) -> Result<ObjectRef> {
        bases::validate(sources, 1)?;
        let definer = Definer::for_value(&Value::Object(target.clone()))?;
        let conflicts = mixin(target, sources, &definer)?;
        self.report(conflicts)?;
        Ok(target.clone())
    }
}

/// [`Composer::compose`] with the default composer
pub fn compose(sources: &[Value]) -> Result<CompositeType> {
    Composer::default().compose(sources)
}

/// [`Composer::create`] with the default composer
pub fn create(base: &Value, sources: &[Value]) -> Result<ObjectRef> {
    Composer::default().create(base, sources)
}

/// [`Composer::mixin_into`] with the default composer
pub fn mixin_into(target: &ObjectRef, sources: &[Value]) -> Result<ObjectRef> {
    Composer::default().mixin_into(target, sources)
}

struct CompositeInner {
    prototype: ObjectRef,
    bases: FlattenedBases,
    composer: Composer,
    definer: RwLock<Option<Function>>,
}

impl CompositeInner {
    fn definer(&self) -> Definer {
        self.definer
            .read()
            .clone()
            .map_or(Definer::Raw, Definer::Custom)
    }

    fn instantiate(&self, this: &Value, args: &[Value]) -> Result<ObjectRef> {
        let mut instance = match this {
            Value::Object(candidate) if self.prototype.is_prototype_of(candidate) => {
                candidate.clone()
            }
            _ => ObjectRef::with_proto(&self.prototype),
        };

        for constructor in &self.bases.constructors {
            let result = constructor.call(&Value::Object(instance.clone()), args)?;
            if let Value::Object(returned) = result {
                if self.prototype.is_prototype_of(&returned) {
                    instance = returned;
                } else {
                    absorb(&instance, &returned)?;
                }
            }
        }

        if self.composer.config.materialize_accessors {
            materialize_accessors(&instance)?;
        }

        tracing::debug!(
            constructors = self.bases.constructors.len(),
            "constructed composite instance"
        );
        Ok(instance)
    }
}

/// Copy the own enumerable members of a constructor's returned object.
fn absorb(instance: &ObjectRef, returned: &ObjectRef) -> Result<()> {
    let definer = Definer::for_value(&Value::Object(instance.clone()))?;
    for key in returned.keys() {
        if instance.has(&key) {
            instance.set(&key, returned.get(&key)?)?;
        } else if let Some(descriptor) = returned.own_descriptor(&key) {
            definer.define(instance, &key, descriptor)?;
        }
    }
    Ok(())
}

/// Redefine every inherited enumerable accessor as owned by `instance`.
fn materialize_accessors(instance: &ObjectRef) -> Result<()> {
    let definer = Definer::for_value(&Value::Object(instance.clone()))?;
    for name in instance.enumerable_names() {
        if instance.has_own(&name) {
            continue;
        }
        if let Some(descriptor) = get_descriptor(instance, &name).filter(|d| d.is_accessor()) {
            definer.define(instance, &name, descriptor)?;
        }
    }
    Ok(())
}

impl Constructible for CompositeInner {
    fn construct(&self, this: &Value, args: &[Value]) -> Result<Value> {
        self.instantiate(this, args).map(Value::Object)
    }

    fn prototype(&self) -> &ObjectRef {
        &self.prototype
    }

    fn bases(&self) -> &FlattenedBases {
        &self.bases
    }

    fn definer(&self) -> Option<Function> {
        self.definer.read().clone()
    }
}

/// Constructible type produced by composition
#[derive(Clone)]
pub struct CompositeType {
    function: Function,
    inner: Arc<CompositeInner>,
}

impl CompositeType {
    fn new(prototype: ObjectRef, bases: FlattenedBases, composer: Composer) -> Self {
        let inner = Arc::new(CompositeInner {
            prototype,
            bases,
            composer,
            definer: RwLock::new(None),
        });
        let function = Function::constructor(inner.clone());
        Self { function, inner }
    }

    /// Build an instance
    pub fn construct(&self, args: &[Value]) -> Result<ObjectRef> {
        self.inner.instantiate(&Value::Undefined, args)
    }

    /// `compose(self, sources...)`; the original type is left untouched
    pub fn extend(&self, sources: &[Value]) -> Result<CompositeType> {
        let mut all = Vec::with_capacity(sources.len() + 1);
        all.push(Value::Function(self.function.clone()));
        all.extend_from_slice(sources);
        self.inner.composer.compose(&all)
    }

    /// Define `name` on `target` through this type's definer
    pub fn define_own_property(
        &self,
        target: &ObjectRef,
        name: &str,
        descriptor: PropertyDescriptor,
    ) -> Result<()> {
        self.inner.definer().define(target, name, descriptor)
    }

    /// Route raw definitions made on behalf of this type through `definer`
    pub fn set_definer(&self, definer: Function) {
        *self.inner.definer.write() = Some(definer);
    }

    /// Shared member table of instances
    pub fn prototype(&self) -> &ObjectRef {
        &self.inner.prototype
    }

    /// Flattened constructors, in the order they run
    pub fn constructors(&self) -> &[Function] {
        &self.inner.bases.constructors
    }

    /// Flattened member tables, in merge order
    pub fn prototypes(&self) -> &[ObjectRef] {
        &self.inner.bases.prototypes
    }

    /// Whether `object` was built by this type (or delegates to its prototype)
    pub fn is_instance(&self, object: &ObjectRef) -> bool {
        self.inner.prototype.is_prototype_of(object)
    }

    /// Procedure value of this type, for use as a composition source
    pub fn function(&self) -> &Function {
        &self.function
    }
}

impl fmt::Debug for CompositeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeType")
            .field("prototype", &self.inner.prototype)
            .field("constructors", &self.inner.bases.constructors.len())
            .field("prototypes", &self.inner.bases.prototypes.len())
            .finish()
    }
}

impl From<CompositeType> for Value {
    fn from(composite: CompositeType) -> Self {
        Value::Function(composite.function)
    }
}

impl From<&CompositeType> for Value {
    fn from(composite: &CompositeType) -> Self {
        Value::Function(composite.function.clone())
    }
}
