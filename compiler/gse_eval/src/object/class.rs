//! Host classes and wrapped instances.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;

use super::{trigger_methods, HostId, ObjectData, SetterHook};
use crate::errors::{class_already_exists, unknown_class, EvalError};
use crate::gc::{Space, Traceable};
use crate::value::{GcRef, Value};

/// Registration request for a host class.
#[derive(Clone, Default)]
pub struct ClassSpec {
    pub parent: Option<String>,
    pub properties: Vec<(String, Value)>,
    pub setter: Option<SetterHook>,
    /// Script values the setter hook uses; traced with the class.
    pub setter_captures: Vec<Value>,
    /// Give instances `on` / `off` / `trigger` methods.
    pub triggers: bool,
}

impl ClassSpec {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn parent(mut self, name: impl Into<String>) -> Self {
        self.parent = Some(name.into());
        self
    }

    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.push((key.into(), value));
        self
    }

    #[must_use]
    pub fn setter(mut self, hook: SetterHook) -> Self {
        self.setter = Some(hook);
        self
    }

    #[must_use]
    pub fn setter_captures(mut self, captures: Vec<Value>) -> Self {
        self.setter_captures = captures;
        self
    }

    #[must_use]
    pub fn with_triggers(mut self) -> Self {
        self.triggers = true;
        self
    }
}

impl fmt::Debug for ClassSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassSpec")
            .field("parent", &self.parent)
            .field("properties", &self.properties)
            .field("setter", &self.setter.is_some())
            .field("setter_captures", &self.setter_captures)
            .field("triggers", &self.triggers)
            .finish()
    }
}

/// A registered class with its parent chain already flattened in.
#[derive(Clone)]
pub struct ClassDef {
    pub name: String,
    pub parent: Option<String>,
    pub properties: BTreeMap<String, Value>,
    pub setter: Option<SetterHook>,
    pub setter_captures: Vec<Value>,
    pub triggers: bool,
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("properties", &self.properties)
            .field("setter", &self.setter.is_some())
            .field("setter_captures", &self.setter_captures)
            .field("triggers", &self.triggers)
            .finish()
    }
}

/// Registry of host classes.
///
/// Inheritance is resolved once, at registration: later changes to a
/// parent are not seen by classes already derived from it.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: FxHashMap<String, ClassDef>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[tracing::instrument(level = "debug", skip(self, spec), fields(parent = ?spec.parent))]
    pub fn register(&mut self, name: &str, spec: ClassSpec) -> Result<(), EvalError> {
        if self.classes.contains_key(name) {
            return Err(class_already_exists(name));
        }
        let mut def = ClassDef {
            name: name.to_string(),
            parent: spec.parent.clone(),
            properties: BTreeMap::new(),
            setter: spec.setter,
            setter_captures: spec.setter_captures,
            triggers: spec.triggers,
        };
        if let Some(parent_name) = &spec.parent {
            let parent = self
                .classes
                .get(parent_name)
                .ok_or_else(|| unknown_class(parent_name))?;
            def.properties = parent.properties.clone();
            if def.setter.is_none() {
                def.setter = parent.setter.clone();
                def.setter_captures = parent.setter_captures.clone();
            }
            def.triggers |= parent.triggers;
        }
        def.properties.extend(spec.properties);
        self.classes.insert(name.to_string(), def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Traceable for ClassRegistry {
    fn collect_references(&self, out: &mut Vec<GcRef>) {
        for def in self.classes.values() {
            for value in def.properties.values() {
                value.collect_references(out);
            }
            def.setter_captures.collect_references(out);
        }
    }
}

/// A host object that can be exposed to scripts.
///
/// Implementors report the values they keep on the host side through
/// [`Traceable`], so registering them as root providers keeps those
/// values alive.
pub trait Wrappable: Traceable {
    /// Registered class the instance belongs to.
    fn wrap_class(&self) -> &str;

    fn host_id(&self) -> HostId;

    /// Per-instance properties on top of the class properties.
    fn wrap_properties(&self) -> Vec<(String, Value)> {
        Vec::new()
    }
}

/// Allocate a wrapped instance of `class` for `host`.
///
/// The object gets the class properties, then `extra` on top, then the
/// event methods for classes with triggers. It is linked to `host` with
/// the class setter hook.
pub fn wrap_instance(
    space: &mut Space,
    classes: &ClassRegistry,
    class: &str,
    host: HostId,
    extra: Vec<(String, Value)>,
) -> Result<Value, EvalError> {
    let def = classes.get(class).ok_or_else(|| unknown_class(class))?;
    let mut data = ObjectData::new().class(class);
    data.properties = def.properties.clone();
    data.properties.extend(extra);
    let object = space.alloc_object(data);
    if def.triggers {
        for (key, method) in trigger_methods(space, &object) {
            space.object_assign(&object, &key, method);
        }
    }
    space.wrap_object_with_captures(
        &object,
        host,
        def.setter.clone(),
        def.setter_captures.clone(),
    );
    Ok(object)
}
