use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::errors::{write_rejected, ErrorCode, EvalErrorKind};
use pretty_assertions::assert_eq;

fn counting_hook(counter: Arc<AtomicUsize>) -> SetterHook {
    Arc::new(move |write: &HostWrite<'_>| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Some(write.value.clone()))
    })
}

#[test]
fn plain_set_and_get() {
    let mut space = Space::new();
    let object = space.alloc_object(ObjectData::new());
    space
        .object_set(&object, "a", Value::Int(1), &SourceInfo::empty())
        .unwrap();
    assert_eq!(space.object_get(&object, "a"), Some(Value::Int(1)));
    assert_eq!(space.object_get(&object, "b"), None);
    assert_eq!(space.object_keys(&object), vec!["a".to_string()]);
    assert_eq!(space.object_remove(&object, "a"), Some(Value::Int(1)));
    assert!(space.object_keys(&object).is_empty());
}

#[test]
fn assign_reports_change() {
    let mut space = Space::new();
    let object = space.alloc_object(ObjectData::new());
    assert!(space.object_assign(&object, "a", Value::Int(1)));
    assert!(!space.object_assign(&object, "a", Value::Int(1)));
    assert!(!space.object_assign(&object, "a", Value::Float(1.0)));
    assert!(space.object_assign(&object, "a", Value::Int(2)));
}

#[test]
fn setter_hook_sees_every_script_write() {
    let mut space = Space::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let object = space.alloc_object(ObjectData::new());
    space.wrap_object(&object, HostId(1), Some(counting_hook(Arc::clone(&counter))));

    let si = SourceInfo::at("ui.js", 3, 1);
    space.object_set(&object, "x", Value::Int(1), &si).unwrap();
    space.object_set(&object, "x", Value::Int(2), &si).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    // Internal writes bypass the hook.
    space.object_assign(&object, "y", Value::Int(3));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(space.object_get(&object, "x"), Some(Value::Int(2)));
}

#[test]
fn setter_hook_can_absorb_transform_or_reject() {
    let mut space = Space::new();
    let hook: SetterHook = Arc::new(|write: &HostWrite<'_>| match write.key {
        "absorbed" => Ok(None),
        "doubled" => Ok(write.value.as_int().map(|n| Value::Int(n.saturating_mul(2)))),
        "locked" => Err(write_rejected(write.key, "read-only")),
        _ => Ok(Some(write.value.clone())),
    });
    let object = space.alloc_object(ObjectData::new());
    space.wrap_object(&object, HostId(9), Some(hook));
    let si = SourceInfo::at("ui.js", 7, 1);

    space.object_set(&object, "absorbed", Value::Int(1), &si).unwrap();
    assert_eq!(space.object_get(&object, "absorbed"), None);

    space.object_set(&object, "doubled", Value::Int(4), &si).unwrap();
    assert_eq!(space.object_get(&object, "doubled"), Some(Value::Int(8)));

    let err = space
        .object_set(&object, "locked", Value::Int(1), &si)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidAssignment);
    assert_eq!(err.line(), 7);
    assert_eq!(space.object_get(&object, "locked"), None);
}

#[test]
fn hook_receives_host_and_site() {
    let mut space = Space::new();
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let hook: SetterHook = Arc::new(move |write: &HostWrite<'_>| {
        sink.lock()
            .push((write.host, write.key.to_string(), write.source_info.line()));
        Ok(Some(write.value.clone()))
    });
    let object = space.alloc_object(ObjectData::new());
    space.wrap_object(&object, HostId(42), Some(hook));
    space
        .object_set(&object, "w", Value::Int(1), &SourceInfo::at("a.js", 5, 2))
        .unwrap();
    assert_eq!(*seen.lock(), vec![(HostId(42), "w".to_string(), 5)]);
}

#[test]
fn unlink_leaves_a_plain_object() {
    let mut space = Space::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let object = space.alloc_object(ObjectData::new());
    space.wrap_object(&object, HostId(3), Some(counting_hook(Arc::clone(&counter))));

    assert_eq!(space.object_unlink(&object), Some(HostId(3)));
    assert_eq!(space.wrapped_host(&object), None);
    assert_eq!(space.object_unlink(&object), None);

    space
        .object_set(&object, "k", Value::Int(1), &SourceInfo::empty())
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(space.object_get(&object, "k"), Some(Value::Int(1)));
}

#[test]
#[should_panic(expected = "already wrapped")]
fn wrapping_twice_is_fatal() {
    let mut space = Space::new();
    let object = space.alloc_object(ObjectData::new());
    space.wrap_object(&object, HostId(1), None);
    space.wrap_object(&object, HostId(2), None);
}

#[test]
fn duplicate_class_is_rejected() {
    let mut classes = ClassRegistry::new();
    classes.register("Widget", ClassSpec::new()).unwrap();
    let err = classes.register("Widget", ClassSpec::new()).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::ClassAlreadyExists {
            name: "Widget".to_string()
        }
    );
    assert_eq!(classes.len(), 1);
}

#[test]
fn unknown_parent_is_rejected() {
    let mut classes = ClassRegistry::new();
    let err = classes
        .register("Button", ClassSpec::new().parent("Widget"))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ReferenceError);
    assert!(!classes.contains("Button"));
}

#[test]
fn child_classes_inherit_and_override() {
    let mut classes = ClassRegistry::new();
    classes
        .register(
            "Widget",
            ClassSpec::new()
                .property("visible", Value::Bool(true))
                .property("width", Value::Int(10))
                .with_triggers(),
        )
        .unwrap();
    classes
        .register(
            "Button",
            ClassSpec::new()
                .parent("Widget")
                .property("width", Value::Int(20))
                .property("label", Value::from("ok")),
        )
        .unwrap();

    let button = classes.get("Button").unwrap();
    assert_eq!(button.parent.as_deref(), Some("Widget"));
    assert!(button.triggers);
    assert_eq!(
        button.properties.keys().cloned().collect::<Vec<_>>(),
        vec!["label", "visible", "width"]
    );
    assert_eq!(button.properties["width"], Value::Int(20));
}

#[test]
fn wrap_instance_builds_class_object() {
    let mut space = Space::new();
    let mut classes = ClassRegistry::new();
    classes
        .register(
            "Label",
            ClassSpec::new().property("text", Value::from("")),
        )
        .unwrap();
    let object = wrap_instance(
        &mut space,
        &classes,
        "Label",
        HostId(5),
        vec![("text".to_string(), Value::from("hello"))],
    )
    .unwrap();

    assert_eq!(space.object_class(&object), Some("Label"));
    assert_eq!(space.wrapped_host(&object), Some(HostId(5)));
    assert_eq!(space.object_get(&object, "text"), Some(Value::from("hello")));
    assert_eq!(space.object_get(&object, "on"), None);

    let err = wrap_instance(&mut space, &classes, "Missing", HostId(6), Vec::new()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ReferenceError);
}

#[test]
fn classes_with_triggers_get_event_methods() {
    let mut space = Space::new();
    let mut classes = ClassRegistry::new();
    classes
        .register("Panel", ClassSpec::new().with_triggers())
        .unwrap();
    let object = wrap_instance(&mut space, &classes, "Panel", HostId(1), Vec::new()).unwrap();
    for method in ["on", "off", "trigger"] {
        let value = space.object_get(&object, method).unwrap();
        assert!(matches!(value, Value::Callable(_)), "{method} is not callable");
    }
    assert_eq!(space.callable_arity(&space.object_get(&object, "on").unwrap()), Some(2));
}

#[test]
fn listeners_keep_registration_order() {
    let mut space = Space::new();
    let object = space.alloc_object(ObjectData::new());
    space.add_listener(&object, "click", Value::Int(1));
    space.add_listener(&object, "click", Value::Int(2));
    space.add_listener(&object, "hover", Value::Int(3));
    assert_eq!(
        space.listeners(&object, "click"),
        vec![Value::Int(1), Value::Int(2)]
    );
    assert_eq!(space.remove_listeners(&object, "click"), 2);
    assert!(space.listeners(&object, "click").is_empty());
    assert_eq!(space.remove_listeners(&object, "missing"), 0);
}

#[test]
fn wrapped_objects_and_listeners_are_traced() {
    let mut space = Space::new();
    let object = space.alloc_object(ObjectData::new());
    let callback = space.alloc_array(vec![]);
    space.add_listener(&object, "e", callback.clone());
    space.pin_value(&object);
    assert_eq!(space.collect(&[]).freed, 0);
    assert!(space.contains(callback.as_gc_ref().unwrap()));
}

fn palette_hook() -> SetterHook {
    Arc::new(|write: &HostWrite<'_>| {
        let Some(Value::Array(allowed)) = write.captures.first() else {
            return Ok(None);
        };
        if write.space.array(*allowed).contains(write.value) {
            Ok(Some(write.value.clone()))
        } else {
            Err(write_rejected(write.key, "not in palette"))
        }
    })
}

#[test]
fn setter_captures_are_traced_through_the_class() {
    let mut space = Space::new();
    let mut classes = ClassRegistry::new();
    let palette = space.alloc_array(vec![Value::from("red"), Value::from("blue")]);
    classes
        .register(
            "Swatch",
            ClassSpec::new()
                .setter(palette_hook())
                .setter_captures(vec![palette.clone()]),
        )
        .unwrap();
    classes
        .register("Chip", ClassSpec::new().parent("Swatch"))
        .unwrap();
    let chip = wrap_instance(&mut space, &classes, "Chip", HostId(5), Vec::new()).unwrap();
    space.pin_value(&chip);

    assert_eq!(space.collect(&[&classes]).freed, 0);
    assert!(space.contains(palette.as_gc_ref().unwrap()));

    let si = SourceInfo::empty();
    space
        .object_set(&chip, "color", Value::from("blue"), &si)
        .unwrap();
    let err = space
        .object_set(&chip, "color", Value::from("green"), &si)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidAssignment);
    assert_eq!(space.object_get(&chip, "color"), Some(Value::from("blue")));
}

#[test]
fn wrap_captures_live_as_long_as_the_object() {
    let mut space = Space::new();
    let palette = space.alloc_array(vec![Value::from("red")]);
    let object = space.alloc_object(ObjectData::new());
    space.wrap_object_with_captures(
        &object,
        HostId(6),
        Some(palette_hook()),
        vec![palette.clone()],
    );
    space.pin_value(&object);

    assert_eq!(space.collect(&[]).freed, 0);
    space
        .object_set(&object, "color", Value::from("red"), &SourceInfo::empty())
        .unwrap();

    space.unpin_value(&object);
    assert_eq!(space.collect(&[]).freed, 2);
    assert!(!space.contains(palette.as_gc_ref().unwrap()));
}
