use super::*;
use crate::errors::{ErrorCode, EvalErrorKind};
use pretty_assertions::assert_eq;

fn global(space: &mut Space, source: &str) -> ContextRef {
    space.new_global_context("scripts/ui/main.js", source, '/')
}

#[test]
fn script_info_splits_path() {
    let info = ScriptInfo::from_path("scripts/ui/main.js", '/');
    assert_eq!(info.file, "main.js");
    assert_eq!(info.directory, "scripts/ui");
    assert_eq!(info.path, "scripts/ui/main.js");

    let bare = ScriptInfo::from_path("main.js", '/');
    assert_eq!(bare.file, "main.js");
    assert_eq!(bare.directory, "");

    let windows = ScriptInfo::from_path(r"c:\game\boot.js", '\\');
    assert_eq!(windows.file, "boot.js");
    assert_eq!(windows.directory, r"c:\game");
}

#[test]
fn source_lines_are_one_based() {
    let mut space = Space::new();
    let ctx = global(&mut space, "x = 1\ny = x + 2");
    assert_eq!(space.source_line(ctx, 0), Some(""));
    assert_eq!(space.source_line(ctx, 1), Some("x = 1"));
    assert_eq!(space.source_line(ctx, 2), Some("y = x + 2"));
    assert_eq!(space.source_line(ctx, 3), None);
    assert_eq!(space.source_line_count(ctx), 2);
}

#[test]
fn empty_source_has_no_lines() {
    let mut space = Space::new();
    let ctx = global(&mut space, "");
    assert_eq!(space.source_line_count(ctx), 0);
    assert_eq!(space.source_line(ctx, 1), None);
}

#[test]
fn added_lines_append_and_prologue_prepends() {
    let mut space = Space::new();
    let ctx = global(&mut space, "body");
    space.add_source_line(ctx, "tail");
    space.add_source_lines(ctx, &["pro1", "pro2"]);
    let lines: Vec<_> = (1..=4)
        .map(|n| space.source_line(ctx, n).unwrap().to_string())
        .collect();
    assert_eq!(lines, vec!["pro1", "pro2", "body", "tail"]);
}

#[test]
fn source_lines_are_reachable_from_children() {
    let mut space = Space::new();
    let ctx = global(&mut space, "a\nb");
    let child = space.fork_context(ctx, SourceInfo::at("main.js", 2, 1));
    let grandchild = space.fork_context(child, SourceInfo::empty());
    assert_eq!(space.source_line(grandchild, 2), Some("b"));
    assert_eq!(space.script_info(grandchild).file, "main.js");
    assert_eq!(space.global_of(grandchild), ctx);
    assert!(space.is_global_context(ctx));
    assert!(!space.is_global_context(child));
    assert_eq!(space.context_source_info(child).line(), 2);
    assert!(space.context_source_info(ctx).is_empty());
}

#[test]
fn define_only_touches_current_context() {
    let mut space = Space::new();
    let ctx = global(&mut space, "");
    let child = space.fork_context(ctx, SourceInfo::empty());
    space.context_define(child, "x", Value::Int(1), Mutability::Mutable);
    assert_eq!(space.context_local(child, "x"), Some(&Value::Int(1)));
    assert_eq!(space.context_local(ctx, "x"), None);
    assert_eq!(space.context_lookup(ctx, "x"), None);
}

#[test]
fn resolution_walks_outward_and_inner_shadows() {
    let mut space = Space::new();
    let ctx = global(&mut space, "");
    let child = space.fork_context(ctx, SourceInfo::empty());
    space.context_define(ctx, "x", Value::Int(1), Mutability::Mutable);
    space.context_define(ctx, "y", Value::Int(2), Mutability::Mutable);
    space.context_define(child, "x", Value::Int(10), Mutability::Mutable);

    assert_eq!(space.context_resolve(child, "x").unwrap(), Value::Int(10));
    assert_eq!(space.context_resolve(child, "y").unwrap(), Value::Int(2));
    assert_eq!(space.context_resolve(ctx, "x").unwrap(), Value::Int(1));
    assert_eq!(space.context_binding_owner(child, "y"), Some(ctx));
}

#[test]
fn unresolved_name_is_a_reference_error() {
    let mut space = Space::new();
    let ctx = global(&mut space, "");
    let err = space.context_resolve(ctx, "missing").unwrap_err();
    assert_eq!(err.code(), ErrorCode::ReferenceError);
    assert_eq!(
        err.kind,
        EvalErrorKind::UnresolvedVariable {
            name: "missing".to_string()
        }
    );
}

#[test]
fn assign_updates_nearest_binding() {
    let mut space = Space::new();
    let ctx = global(&mut space, "");
    let child = space.fork_context(ctx, SourceInfo::empty());
    space.context_define(ctx, "x", Value::Int(1), Mutability::Mutable);

    space.context_assign(child, "x", Value::Int(5)).unwrap();
    assert_eq!(space.context_local(ctx, "x"), Some(&Value::Int(5)));
    assert_eq!(space.context_local(child, "x"), None);

    assert_eq!(
        space.context_assign(child, "nope", Value::Null),
        Err(AssignError::Undefined)
    );
}

#[test]
fn const_bindings_reject_assignment() {
    let mut space = Space::new();
    let ctx = global(&mut space, "");
    space.context_define(ctx, "k", Value::Int(1), Mutability::Immutable);
    assert_eq!(
        space.context_assign(ctx, "k", Value::Int(2)),
        Err(AssignError::Immutable)
    );
    assert_eq!(space.context_local(ctx, "k"), Some(&Value::Int(1)));
}

#[test]
fn bindings_are_listed_sorted() {
    let mut space = Space::new();
    let ctx = global(&mut space, "");
    space.context_define(ctx, "b", Value::Int(2), Mutability::Mutable);
    space.context_define(ctx, "a", Value::Int(1), Mutability::Mutable);
    assert_eq!(
        space.context_bindings(ctx),
        vec![
            ("a".to_string(), Value::Int(1)),
            ("b".to_string(), Value::Int(2)),
        ]
    );
}

#[test]
fn global_contexts_survive_until_released() {
    let mut space = Space::new();
    let ctx = global(&mut space, "");
    let held = space.alloc_array(vec![]);
    space.context_define(ctx, "held", held.clone(), Mutability::Mutable);
    let orphan = space.fork_context(ctx, SourceInfo::empty());

    let stats = space.collect(&[]);
    assert_eq!(stats.freed, 1);
    assert!(!space.contains(orphan.gc_ref()));
    assert!(space.contains(held.as_gc_ref().unwrap()));

    space.release_global_context(ctx);
    assert_eq!(space.collect(&[]).freed, 2);
}

#[test]
fn child_context_keeps_chain_alive() {
    let mut space = Space::new();
    let ctx = global(&mut space, "");
    let child = space.fork_context(ctx, SourceInfo::empty());
    space.release_global_context(ctx);
    let stats = space.collect(&[&child]);
    assert_eq!(stats.freed, 0);
    assert!(space.contains(ctx.gc_ref()));
}

#[test]
fn describe_error_quotes_the_source_line() {
    let mut space = Space::new();
    let ctx = global(&mut space, "x = 1\ny = z + 2");
    let err = unresolved_variable("z").with_source_info(SourceInfo::at("main.js", 2, 5));
    assert_eq!(
        space.describe_error(ctx, &err),
        "ReferenceError: unresolved variable: z\n  at scripts/ui/main.js:2\n  | y = z + 2"
    );
}

#[test]
fn load_global_context_with_empty_path() {
    let mut space = Space::new();
    let ctx = space.load_global_context("", '/').unwrap();
    assert_eq!(space.source_line_count(ctx), 0);
    assert!(space.load_global_context("/nonexistent/dir/file.js", '/').is_err());
}

#[test]
fn source_line_bounds() {
    let mut space = Space::new();
    let ctx = global(&mut space, "only");
    assert_eq!(space.source_line(ctx, 0), Some(""));
    assert_eq!(space.source_line(ctx, 1), Some("only"));
    assert_eq!(space.source_line(ctx, u32::MAX), None);
    assert_eq!(ScriptInfo::from_path("/boot.js", '/').directory, "");
}
