//! End-to-end scenarios through the public engine API.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gse_eval::{
    ClassSpec, Engine, ErrorCode, EvalError, EvalErrorKind, HostId, HostWrite, Mutability,
    SetterHook, Value,
};
use gse_ir::build::*;
use gse_ir::Operator;
use pretty_assertions::assert_eq;

const SOURCE: &str = "x = 1\ny = x + 2";

#[test]
fn module_bindings_and_source_lines() {
    let engine = Engine::default();
    let ctx = engine
        .with_runtime(|rt| rt.create_global_context("scripts/main.js", SOURCE))
        .unwrap();
    let (_, module) = engine
        .execute_module(
            ctx,
            &program(vec![
                statement_at("scripts/main.js", 1, assign(var("x"), int(1))),
                statement_at(
                    "scripts/main.js",
                    2,
                    assign(var("y"), binary(Operator::Add, var("x"), int(2))),
                ),
            ]),
        )
        .unwrap();

    engine
        .with_runtime(|rt| {
            let space = rt.space();
            assert_eq!(space.source_line(ctx, 2), Some("y = x + 2"));
            assert_eq!(space.script_info(ctx).file, "main.js");
            assert_eq!(space.script_info(ctx).directory, "scripts");
            assert_eq!(space.context_lookup(module, "x"), Some(Value::Int(1)));
            assert_eq!(space.context_lookup(module, "y"), Some(Value::Int(3)));
        })
        .unwrap();
}

#[test]
fn errors_are_described_with_their_source_line() {
    let engine = Engine::default();
    let ctx = engine
        .with_runtime(|rt| rt.create_global_context("main.js", "let a = 1\nlet b = a + c"))
        .unwrap();
    let err = engine
        .execute(
            ctx,
            &program(vec![
                statement_at("main.js", 1, let_("a", int(1))),
                statement_at("main.js", 2, let_("b", binary(Operator::Add, var("a"), var("c")))),
            ]),
        )
        .unwrap_err();
    let described = engine
        .with_runtime(|rt| rt.space().describe_error(ctx, &err))
        .unwrap();
    assert_eq!(
        described,
        "ReferenceError: unresolved variable: c\n  at main.js:2\n  | let b = a + c"
    );
}

#[test]
fn class_registration_and_inheritance() {
    let engine = Engine::default();
    engine
        .with_runtime(|rt| {
            rt.register_class(
                "Widget",
                ClassSpec::new()
                    .property("visible", Value::Bool(true))
                    .with_triggers(),
            )
            .unwrap();

            let err = rt.register_class("Widget", ClassSpec::new()).unwrap_err();
            assert_eq!(err.code(), ErrorCode::ReferenceError);
            assert_eq!(err.message, "class already exists: Widget");

            rt.register_class(
                "Button",
                ClassSpec::new()
                    .parent("Widget")
                    .property("label", Value::from("ok")),
            )
            .unwrap();
            let button = rt.wrap("Button", HostId(2), Vec::new()).unwrap();
            let space = rt.space();
            assert_eq!(space.object_class(&button), Some("Button"));
            assert_eq!(space.object_get(&button, "visible"), Some(Value::Bool(true)));
            assert_eq!(space.object_get(&button, "label"), Some(Value::from("ok")));
            assert!(space.object_get(&button, "on").is_some());
        })
        .unwrap();
}

#[test]
fn setter_hook_runs_once_per_script_write() {
    let engine = Engine::default();
    let writes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&writes);
    let hook: SetterHook = Arc::new(move |write: &HostWrite<'_>| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Some(write.value.clone()))
    });

    let (ctx, slider) = engine
        .with_runtime(|rt| {
            rt.register_class("Slider", ClassSpec::new().setter(hook))?;
            let ctx = rt.create_global_context("ui.js", "");
            let slider = rt.wrap("Slider", HostId(4), Vec::new())?;
            rt.space_mut()
                .context_define(ctx, "slider", slider.clone(), Mutability::Mutable);
            Ok::<_, EvalError>((ctx, slider))
        })
        .unwrap()
        .unwrap();

    engine
        .execute(
            ctx,
            &program(vec![
                for_in(
                    "v",
                    array(vec![int(1), int(2), int(3)]),
                    vec![statement(assign(child(var("slider"), "value"), var("v")))],
                ),
                statement(let_("read", child(var("slider"), "value"))),
            ]),
        )
        .unwrap();

    assert_eq!(writes.load(Ordering::SeqCst), 3);
    let value = engine
        .with_runtime(|rt| rt.space().object_get(&slider, "value"))
        .unwrap();
    assert_eq!(value, Some(Value::Int(3)));
}

#[test]
fn return_from_conditional_inside_loop() {
    let engine = Engine::default();
    let ctx = engine
        .with_runtime(|rt| rt.create_global_context("main.js", ""))
        .unwrap();
    let value = engine
        .execute(
            ctx,
            &program(vec![
                statement(let_("i", int(0))),
                while_(
                    boolean(true),
                    vec![
                        statement(postfix(Operator::Inc, var("i"))),
                        conditional_control(if_(
                            binary(Operator::Gte, var("i"), int(5)),
                            vec![statement(ret(Some(var("i"))))],
                            None,
                        )),
                    ],
                ),
                statement(ret(Some(int(-1)))),
            ]),
        )
        .unwrap();
    assert_eq!(value, Value::Int(5));
}

#[test]
fn arity_mismatch_runs_nothing() {
    let engine = Engine::default();
    let ctx = engine
        .with_runtime(|rt| rt.create_global_context("main.js", ""))
        .unwrap();
    let err = engine
        .execute(
            ctx,
            &program(vec![
                statement(let_(
                    "pair",
                    function(
                        &["a", "b"],
                        vec![statement(assign(var("ran"), boolean(true)))],
                    ),
                )),
                statement(let_("ran", boolean(false))),
                statement(call(var("pair"), vec![int(1)])),
            ]),
        )
        .unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::ArityMismatch {
            name: "pair".to_string(),
            expected: 2,
            got: 1
        }
    );
    assert_eq!(err.code(), ErrorCode::InvalidCall);
}

#[test]
fn backtrace_lists_innermost_call_first() {
    let engine = Engine::default();
    let ctx = engine
        .with_runtime(|rt| rt.create_global_context("main.js", ""))
        .unwrap();
    let err = engine
        .execute(
            ctx,
            &program(vec![
                statement(let_(
                    "inner",
                    function(&[], vec![statement(prefix(Operator::Throw, string("deep")))]),
                )),
                statement(let_(
                    "outer",
                    function(&[], vec![statement(call(var("inner"), vec![]))]),
                )),
                statement_at("main.js", 9, call(var("outer"), vec![])),
            ]),
        )
        .unwrap_err();
    assert_eq!(err.message, "deep");
    let backtrace = err.backtrace.unwrap();
    let names: Vec<_> = backtrace.frames().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["inner", "outer"]);
    assert_eq!(backtrace.frames()[1].source_info.line(), 9);
}

#[test]
fn define_resolve_and_shadow_across_executions() {
    let engine = Engine::default();
    let ctx = engine
        .with_runtime(|rt| {
            let ctx = rt.create_global_context("main.js", "");
            rt.space_mut()
                .context_define(ctx, "shared", Value::Int(1), Mutability::Mutable);
            ctx
        })
        .unwrap();

    let shadowed = engine
        .execute(
            ctx,
            &program(vec![
                statement(let_("shared", int(2))),
                statement(ret(Some(var("shared")))),
            ]),
        )
        .unwrap();
    assert_eq!(shadowed, Value::Int(2));

    let updated = engine
        .execute(
            ctx,
            &program(vec![
                statement(binary(Operator::IncBy, var("shared"), int(10))),
                statement(ret(Some(var("shared")))),
            ]),
        )
        .unwrap();
    assert_eq!(updated, Value::Int(11));

    let global = engine
        .with_runtime(|rt| rt.space().context_local(ctx, "shared").cloned())
        .unwrap();
    assert_eq!(global, Some(Value::Int(11)));
}
