use super::*;
use crate::object::ObjectData;
use pretty_assertions::assert_eq;

#[test]
fn truthiness() {
    assert!(!Value::Undefined.is_truthy());
    assert!(!Value::Null.is_truthy());
    assert!(!Value::Bool(false).is_truthy());
    assert!(!Value::Int(0).is_truthy());
    assert!(!Value::Float(0.0).is_truthy());
    assert!(!Value::from("").is_truthy());
    assert!(Value::Int(-1).is_truthy());
    assert!(Value::from("x").is_truthy());

    let mut space = Space::new();
    assert!(space.alloc_array(Vec::new()).is_truthy());
}

#[test]
fn type_names() {
    let mut space = Space::new();
    assert_eq!(Value::Undefined.type_name(), "Undefined");
    assert_eq!(Value::Float(1.0).type_name(), "Float");
    assert_eq!(space.alloc_array(vec![]).type_name(), "Array");
    assert_eq!(space.alloc_object(ObjectData::new()).type_name(), "Object");
}

#[test]
fn numeric_equality_crosses_int_and_float() {
    let space = Space::new();
    assert!(space.values_equal(&Value::Int(2), &Value::Float(2.0)));
    assert!(!space.values_equal(&Value::Int(2), &Value::Float(2.5)));
    assert!(!space.values_equal(&Value::Int(1), &Value::from("1")));
}

#[test]
fn arrays_compare_structurally() {
    let mut space = Space::new();
    let a = space.alloc_array(vec![Value::Int(1), Value::from("x")]);
    let b = space.alloc_array(vec![Value::Int(1), Value::from("x")]);
    let c = space.alloc_array(vec![Value::Int(1)]);
    assert_ne!(a, b);
    assert!(space.values_equal(&a, &b));
    assert!(!space.values_equal(&a, &c));
}

#[test]
fn objects_compare_structurally() {
    let mut space = Space::new();
    let a = space.alloc_object(ObjectData::with_properties([("k", Value::Int(1))]));
    let b = space.alloc_object(ObjectData::with_properties([("k", Value::Int(1))]));
    let c = space.alloc_object(ObjectData::with_properties([("k", Value::Int(2))]));
    assert!(space.values_equal(&a, &b));
    assert!(!space.values_equal(&a, &c));
}

#[test]
fn cyclic_arrays_terminate() {
    let mut space = Space::new();
    let a = space.alloc_array(vec![]);
    let b = space.alloc_array(vec![]);
    let (Value::Array(ra), Value::Array(rb)) = (&a, &b) else {
        panic!("expected arrays");
    };
    space.array_mut(*ra).push(a.clone());
    space.array_mut(*rb).push(b.clone());
    assert!(space.values_equal(&a, &b));
    assert_eq!(space.to_display_string(&a), "[ <cycle> ]");
}

#[test]
fn display_conversion() {
    let mut space = Space::new();
    let inner = space.alloc_array(vec![Value::Int(1), Value::from("two")]);
    let object = space.alloc_object(ObjectData::with_properties([
        ("a", inner),
        ("b", Value::Bool(true)),
    ]));
    assert_eq!(
        space.to_display_string(&object),
        r#"{ a: [ 1, "two" ], b: true }"#
    );
    assert_eq!(space.to_display_string(&Value::from("plain")), "plain");
    assert_eq!(space.to_display_string(&Value::Null), "null");
    let empty = space.alloc_array(vec![]);
    assert_eq!(space.to_display_string(&empty), "[]");
}
