//! Advice ordering across composition layers.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use mosaic_composition::{
    after, around, before, compose, BeforeOutcome, Composer, CompositeType,
};
use mosaic_core::{ComposeConfig, Function, ObjectRef, Value};
use mosaic_testkit::{init_test_tracing, CollectingObserver, Recorder};

fn table<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::from(ObjectRef::from_entries(entries))
}

fn noop() -> Function {
    Function::new(|_, _| Ok(Value::Undefined))
}

fn push_after(recorder: &Recorder, entry: i32) -> Function {
    let recorder = recorder.clone();
    after(move |_, _| {
        recorder.push(entry);
        Ok(Value::Undefined)
    })
}

fn push_around(recorder: &Recorder, entry: i32) -> Function {
    let recorder = recorder.clone();
    around(move |base| {
        let recorder = recorder.clone();
        Function::new(move |this, args| {
            if let Some(base) = &base {
                base.call(this, args)?;
            }
            recorder.push(entry);
            Ok(Value::Undefined)
        })
    })
}

fn advised(recorder: &Recorder) -> CompositeType {
    let log = recorder.clone();
    let target = table([(
        "foo",
        Function::new(move |_, args| {
            log.push(args[0].clone());
            Ok(Value::from(6))
        })
        .into(),
    )]);

    let log = recorder.clone();
    let wrapped = compose(&[
        target,
        table([(
            "foo",
            around(move |base| {
                let log = log.clone();
                Function::new(move |this, args| {
                    log.push(2);
                    let result = match &base {
                        Some(base) => base.call(this, args),
                        None => Ok(Value::Undefined),
                    };
                    log.push(4);
                    result
                })
            })
            .into(),
        )]),
    ])
    .unwrap();

    let log = recorder.clone();
    let wrapped = wrapped
        .extend(&[table([(
            "foo",
            after(move |_, _| {
                log.push(5);
                Ok(Value::Undefined)
            })
            .into(),
        )])])
        .unwrap();

    let log = recorder.clone();
    wrapped
        .extend(&[table([(
            "foo",
            before(move |_, args| {
                log.push(args[0].clone());
                Ok(BeforeOutcome::ReplaceArgs(vec![Value::from(3)]))
            })
            .into(),
        )])])
        .unwrap()
}

#[test]
fn test_advice_order() {
    init_test_tracing();
    let recorder = Recorder::new();
    let advised = advised(&recorder);

    let result = advised
        .construct(&[])
        .unwrap()
        .invoke("foo", &[Value::from(1)])
        .unwrap();
    recorder.push(result);
    assert_eq!(recorder.numbers(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn test_before_stop_short_circuits() {
    let recorder = Recorder::new();
    let advised = advised(&recorder);
    let log = recorder.clone();
    let stopped = advised
        .extend(&[table([(
            "foo",
            before(move |_, _| {
                log.push(0);
                Ok(BeforeOutcome::Stop)
            })
            .into(),
        )])])
        .unwrap();

    let result = stopped
        .construct(&[])
        .unwrap()
        .invoke("foo", &[Value::from(1)])
        .unwrap();
    assert_eq!(result, Value::Undefined);
    assert_eq!(recorder.numbers(), vec![0.0]);
}

#[test]
fn test_complex_hierarchy() {
    let recorder = Recorder::new();

    let widget = compose(&[
        Value::from(Function::new(|this, args| {
            let id = args
                .first()
                .and_then(Value::as_object)
                .map(|a| a.get("id"))
                .transpose()?
                .unwrap_or_default();
            if let Some(instance) = this.as_object() {
                instance.set("id", id)?;
            }
            Ok(Value::Undefined)
        })),
        table([("render", recorder.pusher(1).into())]),
    ])
    .unwrap();
    let sub_mixin1 = compose(&[table([("render", push_after(&recorder, 2).into())])]).unwrap();
    let sub_mixin2 = compose(&[
        noop().into(),
        table([("render", push_after(&recorder, 3).into())]),
    ])
    .unwrap();
    let mixin = compose(&[
        (&sub_mixin1).into(),
        (&sub_mixin2).into(),
        table([("render", push_after(&recorder, 4).into())]),
    ])
    .unwrap();
    let mixin2 = compose(&[table([("render", push_around(&recorder, 5).into())])]).unwrap();
    let button = compose(&[
        (&widget).into(),
        (&mixin).into(),
        (&mixin2).into(),
        noop().into(),
        table([("render", push_around(&recorder, 6).into())]),
    ])
    .unwrap();

    let button_instance = button
        .construct(&[table([("id", Value::from("myId"))])])
        .unwrap();
    assert_eq!(button_instance.get("id").unwrap(), Value::from("myId"));

    button_instance.invoke("render", &[]).unwrap();
    assert_eq!(recorder.numbers(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn test_advice_without_base() {
    let recorder = Recorder::new();
    let log = recorder.clone();
    let base = compose(&[table([(
        "foo",
        after(move |_, _| {
            log.push("foo");
            Ok(Value::Undefined)
        })
        .into(),
    )])])
    .unwrap();
    let log = recorder.clone();
    let sub = compose(&[
        (&base).into(),
        table([(
            "bar",
            after(move |_, _| {
                log.push("bar");
                Ok(Value::Undefined)
            })
            .into(),
        )]),
    ])
    .unwrap();

    let instance = sub.construct(&[]).unwrap();
    instance.invoke("foo", &[]).unwrap();
    instance.invoke("bar", &[]).unwrap();
    assert_eq!(recorder.count("foo"), 1);
    assert_eq!(recorder.count("bar"), 1);
}

#[test]
fn test_chain_aware_after_advice() {
    let recorder = Recorder::new();
    let base = compose(&[table([("foo", recorder.pusher("base").into())])]).unwrap();
    let sub1 = compose(&[
        (&base).into(),
        table([("foo", after(sub_advice(&recorder, "sub1")).into())]),
    ])
    .unwrap();
    let sub2 = compose(&[
        (&base).into(),
        table([("foo", after(sub_advice(&recorder, "sub2")).into())]),
    ])
    .unwrap();

    let combined = compose(&[(&base).into(), (&sub1).into(), (&sub2).into()]).unwrap();
    combined.construct(&[]).unwrap().invoke("foo", &[]).unwrap();
    assert_eq!(
        recorder.snapshot(),
        vec![Value::from("base"), Value::from("sub1"), Value::from("sub2")]
    );
}

fn sub_advice(
    recorder: &Recorder,
    entry: &'static str,
) -> impl Fn(&Value, &[Value]) -> mosaic_core::Result<Value> + Send + Sync + 'static {
    let recorder = recorder.clone();
    move |_, _| {
        recorder.push(entry);
        Ok(Value::Undefined)
    }
}

#[test]
fn test_around_controls_base() {
    let recorder = Recorder::new();
    let base = compose(&[table([("foo", recorder.pusher("base").into())])]).unwrap();
    let skipping = compose(&[
        (&base).into(),
        table([(
            "foo",
            around(|_base| Function::new(|_, _| Ok(Value::from("skipped")))).into(),
        )]),
    ])
    .unwrap();
    let result = skipping.construct(&[]).unwrap().invoke("foo", &[]).unwrap();
    assert_eq!(result, Value::from("skipped"));
    assert!(recorder.snapshot().is_empty());
}

#[test]
fn test_advice_wraps_unrelated_destination_member() {
    init_test_tracing();
    let recorder = Recorder::new();
    let other = compose(&[
        recorder.pusher("other").into(),
        table([("foo", recorder.pusher("h").into())]),
    ])
    .unwrap();
    let base = compose(&[table([("foo", recorder.pusher("f").into())])]).unwrap();
    let log = recorder.clone();
    let sub = compose(&[
        (&base).into(),
        table([(
            "foo",
            after(move |_, _| {
                log.push("a");
                Ok(Value::Undefined)
            })
            .into(),
        )]),
    ])
    .unwrap();

    let observer = Arc::new(CollectingObserver::new());
    let composer = Composer::new(ComposeConfig::strict()).with_observer(observer.clone());
    let combined = composer.compose(&[(&other).into(), (&sub).into()]).unwrap();
    assert!(observer.is_empty());

    let instance = combined.construct(&[]).unwrap();
    recorder.clear();
    instance.invoke("foo", &[]).unwrap();
    assert_eq!(
        recorder.snapshot(),
        vec![Value::from("h"), Value::from("a")]
    );
}
