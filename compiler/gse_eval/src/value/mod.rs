//! Runtime values.
//!
//! Primitives are stored inline. Arrays, objects and callables are
//! [`GcRef`] handles into the [`Space`](crate::Space), which is the only
//! owner of their payload. A value never changes its tag: mutating an
//! array or object mutates the slot the handle points to.
//!
//! Structural equality and display need the space, so they live on
//! `Space` (`values_equal`, `to_display_string`). The derived
//! `PartialEq` compares container handles by identity.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::gc::{GcObject, Space, Traceable};

/// Handle to a slot of the GC space.
///
/// The generation changes every time the slot is reclaimed, so a handle
/// kept past the collection of its object is detected as stale instead of
/// aliasing whatever reuses the slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GcRef {
    index: u32,
    generation: u32,
}

impl GcRef {
    #[inline]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        GcRef { index, generation }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// Runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// The "no value" singleton.
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Arc<str>),
    Array(GcRef),
    Object(GcRef),
    Callable(GcRef),
}

/// Type tag of a value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Undefined,
    Null,
    Bool,
    Int,
    Float,
    String,
    Array,
    Object,
    Callable,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Undefined => "Undefined",
            ValueType::Null => "Null",
            ValueType::Bool => "Bool",
            ValueType::Int => "Int",
            ValueType::Float => "Float",
            ValueType::String => "String",
            ValueType::Array => "Array",
            ValueType::Object => "Object",
            ValueType::Callable => "Callable",
        }
    }
}

impl Value {
    #[inline]
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Undefined => ValueType::Undefined,
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
            Value::Callable(_) => ValueType::Callable,
        }
    }

    /// Type name for diagnostics and `catch` objects.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.value_type().name()
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Callable(_) => true,
        }
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// The handle of a container value.
    pub fn as_gc_ref(&self) -> Option<GcRef> {
        match self {
            Value::Array(r) | Value::Object(r) | Value::Callable(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl Traceable for Value {
    fn collect_references(&self, out: &mut Vec<GcRef>) {
        if let Some(r) = self.as_gc_ref() {
            out.push(r);
        }
    }
}

/// Space-free rendering. Containers show their handle only; use
/// [`Space::to_display_string`] for their contents.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Array(r) => write!(f, "<array #{}>", r.index()),
            Value::Object(r) => write!(f, "<object #{}>", r.index()),
            Value::Callable(r) => write!(f, "<callable #{}>", r.index()),
        }
    }
}

#[allow(
    clippy::cast_precision_loss,
    reason = "mixed int/float comparison follows float semantics"
)]
fn numeric_eq(a: &Value, b: &Value) -> Option<bool> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x == y),
        (Value::Float(x), Value::Float(y)) => Some(x == y),
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => {
            Some(*x as f64 == *y)
        }
        _ => None,
    }
}

impl Space {
    /// Structural equality.
    ///
    /// Arrays and objects compare element-wise, callables by identity.
    /// Pairs already under comparison are assumed equal, so cyclic
    /// structures terminate.
    pub fn values_equal(&self, a: &Value, b: &Value) -> bool {
        let mut visiting = FxHashSet::default();
        self.values_equal_inner(a, b, &mut visiting)
    }

    fn values_equal_inner(
        &self,
        a: &Value,
        b: &Value,
        visiting: &mut FxHashSet<(GcRef, GcRef)>,
    ) -> bool {
        if let Some(eq) = numeric_eq(a, b) {
            return eq;
        }
        match (a, b) {
            (Value::Array(x), Value::Array(y)) => {
                if x == y || !visiting.insert((*x, *y)) {
                    return true;
                }
                let (xs, ys) = (self.array(*x), self.array(*y));
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .zip(ys.iter())
                        .all(|(l, r)| self.values_equal_inner(l, r, visiting))
            }
            (Value::Object(x), Value::Object(y)) => {
                if x == y || !visiting.insert((*x, *y)) {
                    return true;
                }
                let (xs, ys) = (&self.object_data(*x).properties, &self.object_data(*y).properties);
                xs.len() == ys.len()
                    && xs.iter().zip(ys.iter()).all(|((lk, lv), (rk, rv))| {
                        lk == rk && self.values_equal_inner(lv, rv, visiting)
                    })
            }
            _ => a == b,
        }
    }

    /// Render a value for output: `[ a, b ]`, `{ k: v }`, strings unquoted
    /// at top level and quoted inside containers.
    pub fn to_display_string(&self, value: &Value) -> String {
        let mut out = String::new();
        let mut visiting = Vec::new();
        self.write_display(value, false, &mut out, &mut visiting);
        out
    }

    fn write_display(&self, value: &Value, nested: bool, out: &mut String, visiting: &mut Vec<GcRef>) {
        use std::fmt::Write as _;

        match value {
            Value::String(s) if nested => {
                let _ = write!(out, "{s:?}");
            }
            Value::Array(r) | Value::Object(r) if visiting.contains(r) => out.push_str("<cycle>"),
            Value::Array(r) => {
                let items = self.array(*r);
                if items.is_empty() {
                    out.push_str("[]");
                    return;
                }
                visiting.push(*r);
                out.push_str("[ ");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_display(item, true, out, visiting);
                }
                out.push_str(" ]");
                visiting.pop();
            }
            Value::Object(r) => {
                let props = &self.object_data(*r).properties;
                if props.is_empty() {
                    out.push_str("{}");
                    return;
                }
                visiting.push(*r);
                out.push_str("{ ");
                for (i, (k, v)) in props.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{k}: ");
                    self.write_display(v, true, out, visiting);
                }
                out.push_str(" }");
                visiting.pop();
            }
            Value::Callable(r) => match self.get(*r) {
                GcObject::Function(f) => {
                    let _ = write!(out, "<function {}>", f.name.as_deref().unwrap_or("<anonymous>"));
                }
                GcObject::Native(n) => {
                    let _ = write!(out, "<native {}>", n.name);
                }
                other => crate::errors::invariant_violation(&format!(
                    "callable handle points at {}",
                    other.kind_name()
                )),
            },
            other => {
                let _ = write!(out, "{other}");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap to panic on unexpected state")]
mod tests;
