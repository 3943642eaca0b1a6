//! Member merging
//!
//! Merges a sequence of sources, left to right, into one destination table.
//! Procedures contribute their prototype and are subject to override-chain
//! analysis; bare member tables are copied with only decorator and
//! requirement handling. Conflicts found along the way are held back until the
//! whole sequence is merged, so that a later bare table (the final composer)
//! can resolve them by defining the member explicitly.

use indexmap::IndexMap;

use mosaic_core::{
    ComposeError, Conflict, Function, ObjectRef, PropertyDescriptor, Result, Value,
};

use crate::bases::{is_in_method_chain, is_inherited_by, prototypes};

/// Name of the member an object may expose to intercept raw definitions.
pub const DEFINE_OWN_PROPERTY: &str = "defineOwnProperty";

/// How new members are defined on a destination
#[derive(Debug, Clone, Default)]
pub enum Definer {
    /// Direct raw definition
    #[default]
    Raw,
    /// Custom definer called with the destination as `this` and
    /// `(name, descriptor object)` as arguments
    Custom(Function),
}

impl Definer {
    /// Definer exposed by `value`.
    ///
    /// An object exposes one through a callable `defineOwnProperty` member;
    /// a composite type through [`crate::CompositeType::set_definer`].
    pub fn for_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(object) => match object.get(DEFINE_OWN_PROPERTY)? {
                Value::Function(definer) => Ok(Self::Custom(definer)),
                _ => Ok(Self::Raw),
            },
            Value::Function(function) => Ok(function
                .constructible()
                .and_then(|c| c.definer())
                .map_or(Self::Raw, Self::Custom)),
            _ => Ok(Self::Raw),
        }
    }

    /// Define `name` on `target`
    pub fn define(
        &self,
        target: &ObjectRef,
        name: &str,
        descriptor: PropertyDescriptor,
    ) -> Result<()> {
        match self {
            Self::Raw => target.define_own_property(name, descriptor),
            Self::Custom(definer) => definer
                .call(
                    &Value::Object(target.clone()),
                    &[Value::from(name), Value::Object(descriptor.to_object())],
                )
                .map(|_| ())
                .map_err(|e| e.with_member(name)),
        }
    }
}

/// Merge `sources` into `dest`, returning the conflicts nobody resolved.
pub fn mixin(dest: &ObjectRef, sources: &[Value], definer: &Definer) -> Result<Vec<Conflict>> {
    let mut merger = Merger {
        dest,
        definer,
        sources,
        pending: IndexMap::new(),
    };
    for (index, source) in sources.iter().enumerate() {
        match source {
            Value::Function(function) => merger.mixin_prototype(index, function)?,
            Value::Object(table) => merger.mixin_object(table)?,
            other => return Err(ComposeError::invalid_input(index, other.type_name())),
        }
    }
    Ok(merger.pending.into_values().collect())
}

struct Merger<'a> {
    dest: &'a ObjectRef,
    definer: &'a Definer,
    sources: &'a [Value],
    pending: IndexMap<String, Conflict>,
}

/// Outcome of override-chain analysis for one procedure member
enum Resolution {
    /// Copy the incoming member
    Incoming,
    /// Keep (and own) what the destination already resolves to
    KeepDestination,
    /// Copy the incoming member and report unless resolved later
    Conflict(Function),
}

impl Merger<'_> {
    /// Either assign (destination already owns a data member) or define.
    fn set(&self, name: &str, descriptor: PropertyDescriptor) -> Result<()> {
        match descriptor.value() {
            Some(value) if self.dest.has_own(name) => self.dest.set(name, value.clone()),
            _ => self.definer.define(self.dest, name, descriptor),
        }
    }

    fn resolve(&mut self, name: &str) {
        if self.pending.shift_remove(name).is_some() {
            tracing::debug!(member = name, "conflict resolved by later source");
        }
    }

    fn mixin_prototype(&mut self, index: usize, source: &Function) -> Result<()> {
        let proto = source.prototype();
        let own_chain = prototypes(std::slice::from_ref(&Value::Function(source.clone())));

        for name in proto.enumerable_names() {
            let Some((owner, descriptor)) = proto.lookup(&name) else {
                continue;
            };
            let own = owner.ptr_eq(&proto);
            let value = descriptor.value().cloned();
            let current = self.dest.data_value(&name);

            if let Some(Value::Function(incoming)) = &value {
                if let Some(hook) = incoming.install_hook() {
                    if own && !is_in_method_chain(current.as_ref(), &name, &own_chain) {
                        hook.run(self.dest, &name)?;
                        self.resolve(&name);
                        continue;
                    }
                }

                let resolution = match &current {
                    Some(Value::Function(existing)) if !existing.ptr_eq(incoming) => {
                        self.analyze(index, &name, own, incoming, existing, &own_chain)
                    }
                    _ => Resolution::Incoming,
                };

                match resolution {
                    Resolution::KeepDestination => {
                        if let Some(kept) = mosaic_core::get_descriptor(self.dest, &name) {
                            self.set(&name, kept)?;
                        }
                        continue;
                    }
                    Resolution::Conflict(existing) => {
                        tracing::debug!(member = %name, "unrelated definitions of member");
                        self.pending.insert(
                            name.clone(),
                            Conflict {
                                member: name.clone(),
                                existing,
                                incoming: incoming.clone(),
                            },
                        );
                    }
                    Resolution::Incoming => {}
                }
            }

            tracing::trace!(member = %name, own, "merged member");
            self.set(&name, descriptor)?;
        }
        Ok(())
    }

    fn analyze(
        &self,
        index: usize,
        name: &str,
        own: bool,
        incoming: &Function,
        existing: &Function,
        own_chain: &[ObjectRef],
    ) -> Resolution {
        if incoming.is_required() {
            return Resolution::KeepDestination;
        }
        if existing.is_required() {
            return Resolution::Incoming;
        }
        let existing_value = Value::Function(existing.clone());
        let incoming_value = Value::Function(incoming.clone());
        if own {
            if is_in_method_chain(Some(&existing_value), name, own_chain) {
                Resolution::Incoming
            } else if self.overridden(index, name, &incoming_value) {
                Resolution::KeepDestination
            } else {
                Resolution::Conflict(existing.clone())
            }
        } else {
            let merged_chain = prototypes(&self.sources[..=index]);
            if is_in_method_chain(Some(&incoming_value), name, &merged_chain) {
                Resolution::KeepDestination
            } else if !is_in_method_chain(Some(&existing_value), name, own_chain) {
                Resolution::Conflict(existing.clone())
            } else {
                Resolution::Incoming
            }
        }
    }

    /// Whether the destination already carries an override of `method`: it is
    /// inherited by the destination or held by an earlier source.
    fn overridden(&self, index: usize, name: &str, method: &Value) -> bool {
        is_inherited_by(method, name, self.dest)
            || is_in_method_chain(Some(method), name, &prototypes(&self.sources[..index]))
    }

    fn mixin_object(&mut self, table: &ObjectRef) -> Result<()> {
        for name in table.enumerable_names() {
            let Some((owner, descriptor)) = table.lookup(&name) else {
                continue;
            };
            let own = owner.ptr_eq(table);

            if let Some(function) = descriptor.method() {
                if let Some(hook) = function.install_hook() {
                    hook.run(self.dest, &name)?;
                    self.resolve(&name);
                    continue;
                }
                if function.is_required() && self.dest.has(&name) {
                    continue;
                }
            }

            tracing::trace!(member = %name, own, "merged member");
            self.set(&name, descriptor)?;
            if own {
                self.resolve(&name);
            }
        }
        Ok(())
    }
}
