//! The single-threaded runtime: space, classes and configuration.

use gse_ir::{Program, SourceInfo};

use super::EngineConfig;
use crate::callable::NativeFunction;
use crate::context::{ContextRef, Mutability};
use crate::errors::EvalError;
use crate::execution_pointer::ExecutionPointer;
use crate::gc::{CollectStats, Space, Traceable};
use crate::interpreter::Interpreter;
use crate::object::{wrap_instance, ClassRegistry, ClassSpec, HostId, Wrappable};
use crate::value::Value;

/// Everything an execution touches.
///
/// `Runtime` has no locking of its own; [`Engine`](super::Engine) wraps it
/// for hosts that call in from callbacks or other threads.
#[derive(Default)]
pub struct Runtime {
    pub(crate) space: Space,
    pub(crate) classes: ClassRegistry,
    pub(crate) config: EngineConfig,
}

impl Runtime {
    pub fn new(config: EngineConfig) -> Self {
        Runtime {
            space: Space::new(),
            classes: ClassRegistry::new(),
            config,
        }
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    pub fn space_mut(&mut self) -> &mut Space {
        &mut self.space
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn interpreter(&mut self) -> Interpreter<'_> {
        Interpreter::new(&mut self.space, &self.classes)
    }

    /// Fresh execution pointer with the configured depth limit.
    pub fn execution_pointer(&self) -> ExecutionPointer {
        ExecutionPointer::new(self.config.max_call_depth)
    }

    // Contexts

    pub fn create_global_context(&mut self, path: &str, source: &str) -> ContextRef {
        self.space
            .new_global_context(path, source, self.config.path_separator)
    }

    pub fn load_global_context(&mut self, path: &str) -> std::io::Result<ContextRef> {
        self.space
            .load_global_context(path, self.config.path_separator)
    }

    /// Bind a native function as a `const` in `ctx`.
    pub fn define_native(&mut self, ctx: ContextRef, native: NativeFunction) -> Value {
        let name = native.name.clone();
        let value = self.space.alloc_native(native);
        self.space
            .context_define(ctx, &name, value.clone(), Mutability::Immutable);
        value
    }

    // Classes and wrapping

    pub fn register_class(&mut self, name: &str, spec: ClassSpec) -> Result<(), EvalError> {
        self.classes.register(name, spec)
    }

    /// Wrapped instance of `class` for `host`, with `extra` on top of the
    /// class properties.
    pub fn wrap(
        &mut self,
        class: &str,
        host: HostId,
        extra: Vec<(String, Value)>,
    ) -> Result<Value, EvalError> {
        wrap_instance(&mut self.space, &self.classes, class, host, extra)
    }

    pub fn wrap_host(&mut self, host: &dyn Wrappable) -> Result<Value, EvalError> {
        self.wrap(host.wrap_class(), host.host_id(), host.wrap_properties())
    }

    // Execution

    pub fn execute(&mut self, ctx: ContextRef, program: &Program) -> Result<Value, EvalError> {
        let mut ep = self.execution_pointer();
        self.interpreter().execute(ctx, &mut ep, program)
    }

    pub fn execute_module(
        &mut self,
        ctx: ContextRef,
        program: &Program,
    ) -> Result<(Value, ContextRef), EvalError> {
        let mut ep = self.execution_pointer();
        self.interpreter().execute_module(ctx, &mut ep, program)
    }

    /// Call a script callable from the host.
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
        let mut ep = self.execution_pointer();
        self.interpreter()
            .call_value(&mut ep, callee, args, &SourceInfo::empty())
    }

    /// Fire `event` on a wrapped object with triggers.
    pub fn trigger(&mut self, object: &Value, event: &str, data: Value) -> Result<(), EvalError> {
        let mut ep = self.execution_pointer();
        self.interpreter()
            .trigger_event(&mut ep, object, event, data, &SourceInfo::empty())
    }

    // Collection

    /// Collect with the class registry and `extra` as additional roots.
    pub fn collect(&mut self, extra: &[&dyn Traceable]) -> CollectStats {
        let mut roots: Vec<&dyn Traceable> = Vec::with_capacity(extra.len().saturating_add(1));
        roots.push(&self.classes);
        roots.extend_from_slice(extra);
        self.space.collect(&roots)
    }

    /// Collect if the allocation threshold has been reached or a
    /// collection was deferred by the last execution.
    pub fn maybe_collect(&mut self, extra: &[&dyn Traceable]) -> Option<CollectStats> {
        let threshold = self.config.gc_threshold;
        let due = threshold != 0 && self.space.allocations_since_collect() >= threshold;
        if !due && !self.space.collection_pending() {
            return None;
        }
        Some(self.collect(extra))
    }
}
