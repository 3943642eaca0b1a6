//! Base resolution
//!
//! Flattens composition inputs into the two ordered, duplicate-free views the
//! engine needs: constructors in instantiation order and member tables in
//! merge order. A composite type reused as an input contributes its own
//! pre-flattened lists instead of being expanded again, which is what keeps a
//! shared ancestor from running twice in a diamond.

use std::collections::HashSet;

use mosaic_core::{ComposeError, Function, ObjectRef, Result, Value};

/// Reject any input that is not a procedure or an object.
///
/// `offset` is added to reported positions so callers can validate a slice
/// of a longer argument list.
pub fn validate(sources: &[Value], offset: usize) -> Result<()> {
    if sources.is_empty() && offset == 0 {
        return Err(ComposeError::invalid_input(0, "nothing"));
    }
    for (i, source) in sources.iter().enumerate() {
        match source {
            Value::Function(_) | Value::Object(_) => {}
            other => return Err(ComposeError::invalid_input(offset + i, other.type_name())),
        }
    }
    Ok(())
}

/// Constructors of `sources`, first-seen order, each identity once.
///
/// Bare member tables are skipped.
pub fn constructors(sources: &[Value]) -> Vec<Function> {
    let mut seen = HashSet::new();
    let mut flattened = Vec::new();
    for source in sources {
        let Value::Function(function) = source else {
            continue;
        };
        match function.bases() {
            Some(bases) => {
                for constructor in &bases.constructors {
                    if seen.insert(constructor.identity()) {
                        flattened.push(constructor.clone());
                    }
                }
            }
            None => {
                if seen.insert(function.identity()) {
                    flattened.push(function.clone());
                }
            }
        }
    }
    tracing::trace!(count = flattened.len(), "flattened constructors");
    flattened
}

/// Member tables of `sources`, first-seen order, each identity once.
///
/// A procedure contributes its prototype, an object contributes itself.
pub fn prototypes(sources: &[Value]) -> Vec<ObjectRef> {
    let mut seen = HashSet::new();
    let mut flattened = Vec::new();
    let mut push = |table: ObjectRef| {
        if seen.insert(table.identity()) {
            flattened.push(table);
        }
    };
    for source in sources {
        match source {
            Value::Function(function) => match function.bases() {
                Some(bases) => bases.prototypes.iter().cloned().for_each(&mut push),
                None => push(function.prototype()),
            },
            Value::Object(object) => push(object.clone()),
            _ => {}
        }
    }
    tracing::trace!(count = flattened.len(), "flattened prototypes");
    flattened
}

/// Whether `method` is what some table in `chain` holds under `name`.
pub fn is_in_method_chain(method: Option<&Value>, name: &str, chain: &[ObjectRef]) -> bool {
    let Some(method) = method else {
        return false;
    };
    chain
        .iter()
        .any(|table| table.data_value(name).is_some_and(|value| value.same(method)))
}

/// Whether a strict ancestor of `object` owns `method` under `name`.
pub fn is_inherited_by(method: &Value, name: &str, object: &ObjectRef) -> bool {
    let mut current = object.proto();
    while let Some(level) = current {
        if level
            .own_descriptor(name)
            .and_then(|d| d.value().cloned())
            .is_some_and(|value| value.same(method))
        {
            return true;
        }
        current = level.proto();
    }
    false
}

/// Fresh object delegating to `base`: the object itself, or a procedure's
/// prototype.
pub fn delegate(base: &Value) -> Result<ObjectRef> {
    match base {
        Value::Object(object) => Ok(ObjectRef::with_proto(object)),
        Value::Function(function) => Ok(ObjectRef::with_proto(&function.prototype())),
        other => Err(ComposeError::invalid_input(0, other.type_name())),
    }
}
