//! Execution context state seen through the scripting functions

mod common;

use common::*;
#[allow(unused_imports)]
use common::{assert_eq, assert_ne};
use quill_runtime::{ActionContext, CancellationToken, Services, Value};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_store_and_retrieve() {
    let mut ctx = context();
    eval(&mut ctx, "store", &[Value::from("k"), Value::from("v")]);
    eval(&mut ctx, "upper", &[Value::from("unrelated")]);
    assert_eq!(eval(&mut ctx, "retrieve", &[Value::from("k")]), Value::from("v"));

    eval(&mut ctx, "store", &[Value::from("k"), Value::Null]);
    assert_eq!(eval(&mut ctx, "retrieve", &[Value::from("k")]), Value::Null);
    assert_eq!(ctx.stored_keys().count(), 0);
}

#[test]
fn test_counters() {
    let mut ctx = context();
    eval(&mut ctx, "inc_counter", &[Value::Integer(1)]);
    eval(&mut ctx, "inc_counter", &[Value::Integer(1)]);
    assert_eq!(eval(&mut ctx, "get_counter", &[Value::Integer(1)]), Value::Integer(2));

    eval(&mut ctx, "inc_counter", &[Value::Integer(3)]);
    eval(&mut ctx, "inc_counter", &[Value::Integer(1), Value::Bool(true)]);
    assert_eq!(eval(&mut ctx, "get_counter", &[Value::Integer(1)]), Value::Integer(3));
    assert_eq!(eval(&mut ctx, "get_counter", &[Value::Integer(3)]), Value::Integer(0));
}

#[test]
fn test_failures_leave_state_intact() {
    let mut ctx = context();
    eval(&mut ctx, "store", &[Value::from("k"), Value::Integer(1)]);
    eval(&mut ctx, "inc_counter", &[Value::Integer(0)]);
    eval(&mut ctx, "set_locale", &[Value::from("de_DE")]);

    eval(&mut ctx, "add", &[Value::from("x")]);
    eval(&mut ctx, "quot", &[Value::Integer(1), Value::Integer(0)]);
    eval(&mut ctx, "inc_counter", &[Value::Integer(42)]);
    eval(&mut ctx, "regex_replace", &[Value::from("a"), Value::from("["), Value::from("b")]);

    assert_eq!(eval(&mut ctx, "retrieve", &[Value::from("k")]), Value::Integer(1));
    assert_eq!(eval(&mut ctx, "get_counter", &[Value::Integer(0)]), Value::Integer(1));
    assert_eq!(eval(&mut ctx, "get_locale", &[]), Value::from("de_DE"));
}

#[test]
fn test_contexts_are_independent() {
    let registry = registry();
    let services = Arc::new(Services::default());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let services = Arc::clone(&services);
            thread::spawn(move || {
                let mut ctx = ActionContext::new(registry, services);
                for _ in 0..=i {
                    eval(&mut ctx, "inc_counter", &[Value::Integer(0)]);
                }
                eval(&mut ctx, "store", &[Value::from("id"), Value::Integer(i)]);
                (
                    eval(&mut ctx, "get_counter", &[Value::Integer(0)]),
                    eval(&mut ctx, "retrieve", &[Value::from("id")]),
                )
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let (counter, stored) = handle.join().unwrap();
        assert_eq!(counter, Value::Integer(i as i64 + 1));
        assert_eq!(stored, Value::Integer(i as i64));
    }
}

#[test]
fn test_assert_stops_the_evaluation() {
    let mut ctx = context();
    let result = call(
        &mut ctx,
        "assert",
        &[Value::Bool(false), Value::Integer(403), Value::from("not allowed")],
    );
    assert!(result.is_err());
    assert!(ctx.transaction().is_rollback_only());
    assert_eq!(ctx.errors()[0].status, 403);

    let passed = call(
        &mut ctx,
        "assert",
        &[Value::Bool(true), Value::Integer(403), Value::from("fine")],
    );
    assert_eq!(passed, Ok(Value::Null));
}

#[test]
fn test_sleep_cancellation() {
    let mut ctx = context();
    let token = CancellationToken::new();
    ctx.set_cancellation(token.clone());

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        token.cancel();
    });

    let started = Instant::now();
    assert_eq!(eval(&mut ctx, "sleep", &[Value::Integer(120_000)]), Value::Null);
    assert!(started.elapsed() < Duration::from_secs(60));
    canceller.join().unwrap();
}
