//! Diamond-safe construction and flattening.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;

use mosaic_composition::{after, compose, CompositeType};
use mosaic_core::{Function, ObjectRef, Value};
use mosaic_testkit::strategies::{arb_trait_dag, TraitDag};
use mosaic_testkit::Recorder;
use proptest::prelude::*;

fn table<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::from(ObjectRef::from_entries(entries))
}

fn counting_advice(recorder: &Recorder, entry: &'static str) -> Function {
    let recorder = recorder.clone();
    after(move |_, _| {
        recorder.push(entry);
        Ok(Value::Undefined)
    })
}

#[test]
fn test_diamond_inheritance() {
    let recorder = Recorder::new();
    let base = compose(&[
        recorder.pusher("base ctor").into(),
        table([("foo", recorder.pusher("base foo").into())]),
    ])
    .unwrap();
    let sub1 = compose(&[
        (&base).into(),
        recorder.pusher("sub1 ctor").into(),
        table([("foo", counting_advice(&recorder, "sub1 foo").into())]),
    ])
    .unwrap();
    let sub2 = compose(&[
        (&base).into(),
        recorder.pusher("sub2 ctor").into(),
        table([("foo", counting_advice(&recorder, "sub2 foo").into())]),
    ])
    .unwrap();

    let combined = sub1.extend(&[(&sub2).into()]).unwrap();
    let instance = combined.construct(&[]).unwrap();
    assert_eq!(recorder.count("base ctor"), 1);
    assert_eq!(recorder.count("sub1 ctor"), 1);
    assert_eq!(recorder.count("sub2 ctor"), 1);

    instance.invoke("foo", &[]).unwrap();
    assert_eq!(recorder.count("base foo"), 1);
    assert_eq!(recorder.count("sub1 foo"), 1);
    assert_eq!(recorder.count("sub2 foo"), 1);
}

#[test]
fn test_diamond_order_independent() {
    let recorder = Recorder::new();
    let a = compose(&[recorder.pusher("a").into()]).unwrap();
    let b = compose(&[(&a).into(), recorder.pusher("b").into()]).unwrap();
    let c = compose(&[(&a).into(), recorder.pusher("c").into()]).unwrap();

    for d in [
        compose(&[(&b).into(), (&c).into(), recorder.pusher("d").into()]).unwrap(),
        compose(&[(&c).into(), (&b).into(), recorder.pusher("d").into()]).unwrap(),
    ] {
        recorder.clear();
        d.construct(&[]).unwrap();
        for entry in ["a", "b", "c", "d"] {
            assert_eq!(recorder.count(entry), 1, "{entry} ran once");
        }
        assert_eq!(d.constructors().len(), 4);
    }
}

#[test]
fn test_constructor_result_replaces_instance() {
    let recorder = Recorder::new();
    let log = recorder.clone();
    let composite = compose(&[
        Function::new(|this, _| {
            let current = this.as_object().cloned().unwrap_or_default();
            let replacement = ObjectRef::with_proto(&current.proto().unwrap_or_default());
            replacement.set("replaced", true)?;
            Ok(Value::from(replacement))
        })
        .into(),
        Function::new(move |this, _| {
            let current = this.as_object().cloned().unwrap_or_default();
            log.push(current.get("replaced")?);
            Ok(Value::Undefined)
        })
        .into(),
    ])
    .unwrap();

    let instance = composite.construct(&[]).unwrap();
    assert!(composite.is_instance(&instance));
    assert_eq!(instance.get("replaced").unwrap(), Value::from(true));
    // later constructors see the replacement as their receiver
    assert_eq!(recorder.snapshot(), vec![Value::from(true)]);
}

#[test]
fn test_foreign_constructor_result_absorbed() {
    let foreign = ObjectRef::from_entries([("kind", "foreign")]);
    let returned = foreign.clone();
    let composite = compose(&[
        Function::new(move |_, _| Ok(Value::from(returned.clone()))).into(),
        table([("kind", Value::from("own"))]),
    ])
    .unwrap();

    let instance = composite.construct(&[]).unwrap();
    assert!(!instance.ptr_eq(&foreign));
    assert!(composite.is_instance(&instance));
    assert_eq!(instance.get("kind").unwrap(), Value::from("foreign"));
    assert_eq!(composite.prototype().get("kind").unwrap(), Value::from("own"));
}

/// Composite types built from a trait graph; every trait contributes a
/// recording constructor and recording advice on `visit`.
fn build(dag: &TraitDag, recorder: &Recorder) -> Vec<CompositeType> {
    let root = compose(&[table([("visit", recorder.pusher("root").into())])]).unwrap();
    let mut built: Vec<CompositeType> = Vec::with_capacity(dag.len());
    for (node, parents) in dag.parents.iter().enumerate() {
        let mut sources: Vec<Value> = if parents.is_empty() {
            vec![(&root).into()]
        } else {
            parents.iter().map(|p| (&built[*p]).into()).collect()
        };
        let label = node as i32;
        sources.push(recorder.pusher(label).into());
        let advice_log = recorder.clone();
        sources.push(table([(
            "visit",
            after(move |_, _| {
                advice_log.push(-1 - label);
                Ok(Value::Undefined)
            })
            .into(),
        )]));
        built.push(compose(&sources).unwrap());
    }
    built
}

proptest! {
    #[test]
    fn prop_constructors_run_once(dag in arb_trait_dag(7)) {
        let recorder = Recorder::new();
        let built = build(&dag, &recorder);
        let last = dag.len() - 1;

        built[last].construct(&[]).unwrap();
        let ancestry = dag.ancestry(last);
        for node in 0..dag.len() {
            let expected = usize::from(ancestry.contains(&node));
            prop_assert_eq!(recorder.count(node as i32), expected);
        }
    }

    #[test]
    fn prop_flattening_is_duplicate_free(dag in arb_trait_dag(7)) {
        let recorder = Recorder::new();
        let built = build(&dag, &recorder);
        for (node, composite) in built.iter().enumerate() {
            let constructors = composite.constructors();
            let unique: HashSet<usize> = constructors.iter().map(Function::identity).collect();
            prop_assert_eq!(unique.len(), constructors.len());
            prop_assert_eq!(constructors.len(), dag.ancestry(node).len());

            let prototypes = composite.prototypes();
            let unique: HashSet<usize> = prototypes.iter().map(ObjectRef::identity).collect();
            prop_assert_eq!(unique.len(), prototypes.len());
        }
    }

    #[test]
    fn prop_advice_runs_once(dag in arb_trait_dag(7)) {
        let recorder = Recorder::new();
        let built = build(&dag, &recorder);
        let last = dag.len() - 1;

        let instance = built[last].construct(&[]).unwrap();
        recorder.clear();
        instance.invoke("visit", &[]).unwrap();

        prop_assert_eq!(recorder.count("root"), 1);
        let ancestry = dag.ancestry(last);
        for node in 0..dag.len() {
            let expected = usize::from(ancestry.contains(&node));
            prop_assert_eq!(recorder.count(-1 - node as i32), expected);
        }
    }
}
