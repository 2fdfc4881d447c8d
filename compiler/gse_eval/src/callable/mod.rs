//! Callable payloads: script closures and native functions.

use std::fmt;
use std::sync::Arc;

use gse_ir::{Program, SourceInfo};

use crate::context::ContextRef;
use crate::errors::{invariant_violation, type_mismatch, wrong_argument_count, EvalError};
use crate::execution_pointer::ExecutionPointer;
use crate::gc::{GcObject, Space, Traceable};
use crate::interpreter::Interpreter;
use crate::value::{GcRef, Value};

/// A closure: the defining context, parameter names and the shared body.
#[derive(Clone, Debug)]
pub struct FunctionData {
    pub context: ContextRef,
    pub parameters: Vec<String>,
    pub body: Arc<Program>,
    /// Name of the binding or property the closure was first stored in.
    pub name: Option<String>,
}

impl FunctionData {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

impl Traceable for FunctionData {
    fn collect_references(&self, out: &mut Vec<GcRef>) {
        self.context.collect_references(out);
    }
}

/// Signature of a native function body.
pub type NativeFn =
    dyn Fn(&mut NativeCall<'_, '_>, Vec<Value>) -> Result<Value, EvalError> + Send + Sync;

/// A host function callable from scripts.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    /// Exact argument count, checked before the body runs.
    pub arity: Option<usize>,
    /// Values the function closes over; traced by the collector.
    pub captures: Vec<Value>,
    pub func: Arc<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut NativeCall<'_, '_>, Vec<Value>) -> Result<Value, EvalError>
            + Send
            + Sync
            + 'static,
    {
        NativeFunction {
            name: name.into(),
            arity: None,
            captures: Vec::new(),
            func: Arc::new(func),
        }
    }

    #[must_use]
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    #[must_use]
    pub fn with_captures(mut self, captures: Vec<Value>) -> Self {
        self.captures = captures;
        self
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("captures", &self.captures)
            .finish_non_exhaustive()
    }
}

impl Traceable for NativeFunction {
    fn collect_references(&self, out: &mut Vec<GcRef>) {
        self.captures.collect_references(out);
    }
}

/// What a callable handle resolves to, detached from the space.
#[derive(Clone, Debug)]
pub(crate) enum CallTarget {
    Function(FunctionData),
    Native(NativeFunction),
}

impl Space {
    pub(crate) fn call_target(&self, r: GcRef) -> CallTarget {
        match self.get(r) {
            GcObject::Function(f) => CallTarget::Function(f.clone()),
            GcObject::Native(n) => CallTarget::Native(n.clone()),
            other => invariant_violation(&format!(
                "callable handle points at {}",
                other.kind_name()
            )),
        }
    }

    /// Declared parameter count of a callable, if it has a fixed one.
    pub fn callable_arity(&self, callable: &Value) -> Option<usize> {
        let Value::Callable(r) = callable else {
            return None;
        };
        match self.get(*r) {
            GcObject::Function(f) => Some(f.parameters.len()),
            GcObject::Native(n) => n.arity,
            _ => None,
        }
    }

    /// Give an anonymous closure the name it is first stored under.
    pub(crate) fn name_function(&mut self, value: &Value, name: &str) {
        if let Value::Callable(r) = value {
            if let GcObject::Function(f) = self.get_mut(*r) {
                if f.name.is_none() {
                    f.name = Some(name.to_string());
                }
            }
        }
    }
}

/// Everything a native function body can reach.
pub struct NativeCall<'a, 'rt> {
    pub interpreter: &'a mut Interpreter<'rt>,
    pub ep: &'a mut ExecutionPointer,
    /// Call site.
    pub source_info: &'a SourceInfo,
    pub captures: &'a [Value],
}

impl NativeCall<'_, '_> {
    pub fn space(&mut self) -> &mut Space {
        self.interpreter.space()
    }

    /// Capture `index`. A missing capture is a registration bug.
    pub fn capture(&self, index: usize) -> Value {
        match self.captures.get(index) {
            Some(v) => v.clone(),
            None => invariant_violation(&format!("native function has no capture {index}")),
        }
    }

    /// Call back into script code.
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
        self.interpreter
            .call_value(self.ep, callee, args, self.source_info)
    }
}

/// Destructure exactly `N` arguments.
pub fn expect_args<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], EvalError> {
    let got = args.len();
    <[Value; N]>::try_from(args).map_err(|_| wrong_argument_count(name, N, got))
}

/// String argument or a type error.
pub fn expect_string(value: &Value) -> Result<Arc<str>, EvalError> {
    match value {
        Value::String(s) => Ok(Arc::clone(s)),
        other => Err(type_mismatch("String", other.type_name())),
    }
}
