//! Event listeners of objects whose class has triggers.
//!
//! Listeners of one event on one object fire in registration order. No
//! order is defined between different objects handling the same host
//! event; that is up to whoever dispatches it.

use crate::callable::{expect_args, expect_string, NativeFunction};
use crate::errors::type_mismatch;
use crate::gc::Space;
use crate::value::Value;

impl Space {
    pub fn add_listener(&mut self, object: &Value, event: &str, callback: Value) {
        self.object_data_mut(super::object_handle(object))
            .listeners
            .entry(event.to_string())
            .or_default()
            .push(callback);
    }

    /// Remove every listener of `event`. Returns how many were removed.
    pub fn remove_listeners(&mut self, object: &Value, event: &str) -> usize {
        self.object_data_mut(super::object_handle(object))
            .listeners
            .remove(event)
            .map_or(0, |l| l.len())
    }

    /// Snapshot of the listeners of `event`.
    pub fn listeners(&self, object: &Value, event: &str) -> Vec<Value> {
        self.object_data(super::object_handle(object))
            .listeners
            .get(event)
            .cloned()
            .unwrap_or_default()
    }
}

/// `on(event, callback)`, `off(event)` and `trigger(event, data)` bound to
/// `object`.
pub(crate) fn trigger_methods(space: &mut Space, object: &Value) -> Vec<(String, Value)> {
    let on = NativeFunction::new("on", |call, args| {
        let [event, callback] = expect_args::<2>("on", args)?;
        let event = expect_string(&event)?;
        if !matches!(callback, Value::Callable(_)) {
            return Err(type_mismatch("Callable", callback.type_name()));
        }
        let this = call.capture(0);
        call.space().add_listener(&this, &event, callback);
        Ok(this)
    })
    .with_arity(2);

    let off = NativeFunction::new("off", |call, args| {
        let [event] = expect_args::<1>("off", args)?;
        let event = expect_string(&event)?;
        let this = call.capture(0);
        call.space().remove_listeners(&this, &event);
        Ok(this)
    })
    .with_arity(1);

    let trigger = NativeFunction::new("trigger", |call, args| {
        let [event, data] = expect_args::<2>("trigger", args)?;
        let event = expect_string(&event)?;
        let this = call.capture(0);
        let source_info = call.source_info.clone();
        call.interpreter
            .trigger_event(call.ep, &this, &event, data, &source_info)?;
        Ok(Value::Undefined)
    })
    .with_arity(2);

    [on, off, trigger]
        .into_iter()
        .map(|native| {
            let name = native.name.clone();
            let value = space.alloc_native(native.with_captures(vec![object.clone()]));
            (name, value)
        })
        .collect()
}
