//! Objects and the host wrapping bridge.
//!
//! An object is an ordered property map plus optional metadata: a class
//! name, the context it owns (object literals bind `this` there), the
//! site that created it and event listeners.
//!
//! A host object is associated with its script object through the wrap
//! table of the space, keyed by the object's handle. The association holds
//! the host's id and an optional setter hook. Script writes go through
//! [`Space::object_set`], which runs the hook; host bootstrapping uses
//! [`Space::object_assign`], which does not. Unlinking removes the table
//! entry and leaves a plain object behind.

mod class;
mod events;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use gse_ir::SourceInfo;

use crate::context::ContextRef;
use crate::errors::{invariant_violation, EvalError};
use crate::gc::{Space, Traceable};
use crate::value::{GcRef, Value};

pub use class::{wrap_instance, ClassDef, ClassRegistry, ClassSpec, Wrappable};
pub(crate) use events::trigger_methods;

/// Payload of an object slot.
#[derive(Clone, Debug, Default)]
pub struct ObjectData {
    pub properties: BTreeMap<String, Value>,
    pub class: Option<String>,
    pub context: Option<ContextRef>,
    pub source_info: SourceInfo,
    pub(crate) listeners: BTreeMap<String, Vec<Value>>,
}

impl ObjectData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_properties<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        ObjectData {
            properties: properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    #[must_use]
    pub fn source_info(mut self, source_info: SourceInfo) -> Self {
        self.source_info = source_info;
        self
    }
}

impl Traceable for ObjectData {
    fn collect_references(&self, out: &mut Vec<GcRef>) {
        for value in self.properties.values() {
            value.collect_references(out);
        }
        if let Some(ctx) = self.context {
            ctx.collect_references(out);
        }
        for callbacks in self.listeners.values() {
            callbacks.collect_references(out);
        }
    }
}

/// Identity of a host object behind a wrapped script object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(pub u64);

/// A script-side write offered to a setter hook.
pub struct HostWrite<'a> {
    pub host: HostId,
    /// The wrapped object being written.
    pub object: Value,
    pub key: &'a str,
    pub value: &'a Value,
    /// Location of the assignment.
    pub source_info: &'a SourceInfo,
    /// Read access to the space, e.g. to inspect array contents.
    pub space: &'a Space,
    /// Values registered with the hook.
    pub captures: &'a [Value],
}

/// Setter hook of a wrapped object.
///
/// `Ok(Some(v))` stores `v` (the written value or a transformed one),
/// `Ok(None)` absorbs the write and `Err` rejects it.
///
/// The closure itself is opaque to the collector. Script values a hook
/// needs (e.g. a callback to forward writes to) go in the captures passed
/// alongside it and reach the hook through [`HostWrite::captures`].
pub type SetterHook =
    Arc<dyn Fn(&HostWrite<'_>) -> Result<Option<Value>, EvalError> + Send + Sync>;

/// Entry of the wrap table.
#[derive(Clone)]
pub struct Wrapping {
    pub host: HostId,
    pub setter: Option<SetterHook>,
    /// Traced while the wrapped object is live.
    pub captures: Vec<Value>,
}

impl fmt::Debug for Wrapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapping")
            .field("host", &self.host)
            .field("setter", &self.setter.is_some())
            .field("captures", &self.captures)
            .finish()
    }
}

fn object_handle(object: &Value) -> GcRef {
    match object {
        Value::Object(r) => *r,
        other => invariant_violation(&format!(
            "object operation on {}",
            other.type_name()
        )),
    }
}

impl Space {
    /// Property `key` of `object`, if set.
    pub fn object_get(&self, object: &Value, key: &str) -> Option<Value> {
        self.object_data(object_handle(object))
            .properties
            .get(key)
            .cloned()
    }

    /// Script-side write. Runs the setter hook of a wrapped object.
    pub fn object_set(
        &mut self,
        object: &Value,
        key: &str,
        value: Value,
        source_info: &SourceInfo,
    ) -> Result<(), EvalError> {
        let r = object_handle(object);
        let hook = self
            .wraps
            .get(&r)
            .and_then(|w| {
                w.setter
                    .clone()
                    .map(|setter| (w.host, setter, w.captures.clone()))
            });
        let stored = match hook {
            Some((host, setter, captures)) => {
                let write = HostWrite {
                    host,
                    object: object.clone(),
                    key,
                    value: &value,
                    source_info,
                    space: &*self,
                    captures: &captures,
                };
                setter(&write).map_err(|e| e.with_source_info_if_missing(source_info))?
            }
            None => Some(value),
        };
        if let Some(v) = stored {
            self.object_data_mut(r).properties.insert(key.to_string(), v);
        }
        Ok(())
    }

    /// Internal write that bypasses the setter hook. Returns whether the
    /// stored value changed.
    pub fn object_assign(&mut self, object: &Value, key: &str, value: Value) -> bool {
        let r = object_handle(object);
        let changed = match self.object_data(r).properties.get(key) {
            Some(old) => !self.values_equal(old, &value),
            None => true,
        };
        if changed {
            self.object_data_mut(r).properties.insert(key.to_string(), value);
        }
        changed
    }

    pub fn object_remove(&mut self, object: &Value, key: &str) -> Option<Value> {
        self.object_data_mut(object_handle(object))
            .properties
            .remove(key)
    }

    pub fn object_keys(&self, object: &Value) -> Vec<String> {
        self.object_data(object_handle(object))
            .properties
            .keys()
            .cloned()
            .collect()
    }

    pub fn object_context(&self, object: &Value) -> Option<ContextRef> {
        self.object_data(object_handle(object)).context
    }

    pub fn object_class(&self, object: &Value) -> Option<&str> {
        self.object_data(object_handle(object)).class.as_deref()
    }

    /// Associate `object` with a host object. Wrapping twice is fatal.
    pub fn wrap_object(&mut self, object: &Value, host: HostId, setter: Option<SetterHook>) {
        self.wrap_object_with_captures(object, host, setter, Vec::new());
    }

    /// [`wrap_object`](Self::wrap_object) with values the hook closes over.
    pub fn wrap_object_with_captures(
        &mut self,
        object: &Value,
        host: HostId,
        setter: Option<SetterHook>,
        captures: Vec<Value>,
    ) {
        let r = object_handle(object);
        if let Some(existing) = self.wraps.get(&r) {
            invariant_violation(&format!(
                "object #{} is already wrapped by host {:?}",
                r.index(),
                existing.host
            ));
        }
        self.wraps.insert(
            r,
            Wrapping {
                host,
                setter,
                captures,
            },
        );
    }

    /// Host behind `object`, if it is still linked.
    pub fn wrapped_host(&self, object: &Value) -> Option<HostId> {
        let r = object.as_gc_ref()?;
        self.wraps.get(&r).map(|w| w.host)
    }

    /// Sever the host association; the object stays as a plain container.
    pub fn object_unlink(&mut self, object: &Value) -> Option<HostId> {
        self.wraps.remove(&object_handle(object)).map(|w| w.host)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap to panic on unexpected state")]
mod tests;
