//! The context chain.
//!
//! A global context is the root of a chain: it owns the script's file
//! identity and source lines and has no parent. Child contexts hold local
//! bindings and one parent handle. Resolution walks outward from the
//! innermost context; definition only ever touches the current context.
//!
//! Contexts are GC slots like any other object, so closures and objects
//! that capture a context keep the whole chain above it alive. Global
//! contexts are pinned until released.

use std::path::Path;

use gse_ir::SourceInfo;
use rustc_hash::FxHashMap;

use crate::errors::{unresolved_variable, EvalError};
use crate::gc::{GcObject, Space, Traceable};
use crate::value::{GcRef, Value};

/// Handle to a context slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContextRef(pub(crate) GcRef);

impl ContextRef {
    #[inline]
    pub fn gc_ref(self) -> GcRef {
        self.0
    }
}

impl Traceable for ContextRef {
    fn collect_references(&self, out: &mut Vec<GcRef>) {
        out.push(self.0);
    }
}

/// Mutability of a binding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mutability {
    /// `let`, or an implicit definition by assignment.
    Mutable,
    /// `const`.
    Immutable,
}

impl Mutability {
    #[inline]
    pub fn is_mutable(self) -> bool {
        matches!(self, Mutability::Mutable)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Binding {
    pub(crate) value: Value,
    pub(crate) mutability: Mutability,
}

/// Why an assignment through the chain failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssignError {
    /// The nearest binding is `const`.
    Immutable,
    /// No context in the chain binds the name.
    Undefined,
}

/// File identity of a script.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptInfo {
    /// Path as given by the host.
    pub path: String,
    /// Last path component.
    pub file: String,
    /// Everything before the last separator, empty for bare file names.
    pub directory: String,
}

impl ScriptInfo {
    pub fn from_path(path: &str, separator: char) -> Self {
        let (directory, file) = path.rsplit_once(separator).unwrap_or(("", path));
        ScriptInfo {
            path: path.to_string(),
            file: file.to_string(),
            directory: directory.to_string(),
        }
    }
}

#[derive(Debug)]
pub(crate) enum ContextKind {
    Global {
        script: ScriptInfo,
        source_lines: Vec<String>,
    },
    Child {
        parent: ContextRef,
        source_info: SourceInfo,
    },
}

/// Payload of a context slot.
#[derive(Debug)]
pub struct ContextData {
    pub(crate) kind: ContextKind,
    pub(crate) bindings: FxHashMap<String, Binding>,
}

impl Traceable for ContextData {
    fn collect_references(&self, out: &mut Vec<GcRef>) {
        if let ContextKind::Child { parent, .. } = &self.kind {
            out.push(parent.0);
        }
        for binding in self.bindings.values() {
            binding.value.collect_references(out);
        }
    }
}

fn split_lines(source: &str) -> Vec<String> {
    if source.is_empty() {
        return Vec::new();
    }
    source.split('\n').map(ToString::to_string).collect()
}

impl Space {
    fn alloc_context(&mut self, kind: ContextKind) -> ContextRef {
        ContextRef(self.allocate(GcObject::Context(ContextData {
            kind,
            bindings: FxHashMap::default(),
        })))
    }

    /// Create a pinned global context for a script at `path` with the given
    /// source text.
    pub fn new_global_context(&mut self, path: &str, source: &str, separator: char) -> ContextRef {
        let ctx = self.alloc_context(ContextKind::Global {
            script: ScriptInfo::from_path(path, separator),
            source_lines: split_lines(source),
        });
        self.pin(ctx.0);
        ctx
    }

    /// Read the script at `path` and create a pinned global context for it.
    /// An empty path yields a context with no source lines.
    pub fn load_global_context(
        &mut self,
        path: &str,
        separator: char,
    ) -> std::io::Result<ContextRef> {
        let source = if path.is_empty() {
            String::new()
        } else {
            std::fs::read_to_string(Path::new(path))?
        };
        Ok(self.new_global_context(path, &source, separator))
    }

    /// Drop the pin taken by `new_global_context`.
    pub fn release_global_context(&mut self, ctx: ContextRef) {
        self.unpin(ctx.0);
    }

    /// Create a child context of `parent`. `source_info` is the site that
    /// opened it (call site, scope start).
    pub fn fork_context(&mut self, parent: ContextRef, source_info: SourceInfo) -> ContextRef {
        self.alloc_context(ContextKind::Child {
            parent,
            source_info,
        })
    }

    /// Insert or overwrite a binding in `ctx` itself.
    pub fn context_define(
        &mut self,
        ctx: ContextRef,
        name: &str,
        value: Value,
        mutability: Mutability,
    ) {
        self.context_data_mut(ctx.0)
            .bindings
            .insert(name.to_string(), Binding { value, mutability });
    }

    /// Local binding of `ctx`, without walking the chain.
    pub fn context_local(&self, ctx: ContextRef, name: &str) -> Option<&Value> {
        self.context_data(ctx.0).bindings.get(name).map(|b| &b.value)
    }

    /// Every local binding of `ctx`, sorted by name.
    pub fn context_bindings(&self, ctx: ContextRef) -> Vec<(String, Value)> {
        let mut out: Vec<_> = self
            .context_data(ctx.0)
            .bindings
            .iter()
            .map(|(k, b)| (k.clone(), b.value.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// The nearest context in the chain that binds `name`.
    pub fn context_binding_owner(&self, ctx: ContextRef, name: &str) -> Option<ContextRef> {
        let mut current = Some(ctx);
        while let Some(c) = current {
            let data = self.context_data(c.0);
            if data.bindings.contains_key(name) {
                return Some(c);
            }
            current = match &data.kind {
                ContextKind::Child { parent, .. } => Some(*parent),
                ContextKind::Global { .. } => None,
            };
        }
        None
    }

    pub fn context_lookup(&self, ctx: ContextRef, name: &str) -> Option<Value> {
        let owner = self.context_binding_owner(ctx, name)?;
        self.context_local(owner, name).cloned()
    }

    /// Like [`context_lookup`](Self::context_lookup), failing with an
    /// unresolved-variable error.
    pub fn context_resolve(&self, ctx: ContextRef, name: &str) -> Result<Value, EvalError> {
        self.context_lookup(ctx, name)
            .ok_or_else(|| unresolved_variable(name))
    }

    /// Assign to the nearest existing binding of `name`.
    pub fn context_assign(
        &mut self,
        ctx: ContextRef,
        name: &str,
        value: Value,
    ) -> Result<(), AssignError> {
        let owner = self
            .context_binding_owner(ctx, name)
            .ok_or(AssignError::Undefined)?;
        let Some(binding) = self.context_data_mut(owner.0).bindings.get_mut(name) else {
            return Err(AssignError::Undefined);
        };
        if !binding.mutability.is_mutable() {
            return Err(AssignError::Immutable);
        }
        binding.value = value;
        Ok(())
    }

    pub fn context_parent(&self, ctx: ContextRef) -> Option<ContextRef> {
        match &self.context_data(ctx.0).kind {
            ContextKind::Child { parent, .. } => Some(*parent),
            ContextKind::Global { .. } => None,
        }
    }

    pub fn is_global_context(&self, ctx: ContextRef) -> bool {
        self.context_parent(ctx).is_none()
    }

    /// Root of the chain `ctx` belongs to.
    pub fn global_of(&self, ctx: ContextRef) -> ContextRef {
        let mut current = ctx;
        while let Some(parent) = self.context_parent(current) {
            current = parent;
        }
        current
    }

    fn global_parts(&self, ctx: ContextRef) -> (&ScriptInfo, &Vec<String>) {
        let global = self.global_of(ctx);
        match &self.context_data(global.0).kind {
            ContextKind::Global {
                script,
                source_lines,
            } => (script, source_lines),
            ContextKind::Child { .. } => {
                crate::errors::invariant_violation("context chain does not end in a global context")
            }
        }
    }

    fn global_lines_mut(&mut self, ctx: ContextRef) -> &mut Vec<String> {
        let global = self.global_of(ctx);
        match &mut self.context_data_mut(global.0).kind {
            ContextKind::Global { source_lines, .. } => source_lines,
            ContextKind::Child { .. } => {
                crate::errors::invariant_violation("context chain does not end in a global context")
            }
        }
    }

    pub fn script_info(&self, ctx: ContextRef) -> &ScriptInfo {
        self.global_parts(ctx).0
    }

    /// Source line `n` (1-based) of the chain's script. Line 0 is the empty
    /// line; lines past the end are `None`.
    pub fn source_line(&self, ctx: ContextRef, n: u32) -> Option<&str> {
        let Some(index) = usize::try_from(n).ok()?.checked_sub(1) else {
            return Some("");
        };
        self.global_parts(ctx).1.get(index).map(String::as_str)
    }

    pub fn source_line_count(&self, ctx: ContextRef) -> usize {
        self.global_parts(ctx).1.len()
    }

    /// Append a line to the script source.
    pub fn add_source_line(&mut self, ctx: ContextRef, line: &str) {
        self.global_lines_mut(ctx).push(line.to_string());
    }

    /// Prepend lines to the script source (prologue before user text).
    pub fn add_source_lines(&mut self, ctx: ContextRef, lines: &[&str]) {
        let existing = self.global_lines_mut(ctx);
        existing.splice(0..0, lines.iter().map(ToString::to_string));
    }

    /// Site that opened `ctx`. Empty for global contexts.
    pub fn context_source_info(&self, ctx: ContextRef) -> SourceInfo {
        match &self.context_data(ctx.0).kind {
            ContextKind::Child { source_info, .. } => source_info.clone(),
            ContextKind::Global { .. } => SourceInfo::empty(),
        }
    }

    /// Render `err` with its location and the offending source line of
    /// the chain's script.
    pub fn describe_error(&self, ctx: ContextRef, err: &EvalError) -> String {
        let script = self.script_info(ctx);
        let mut out = format!("{}: {}", err.code(), err.message);
        let line = err.line();
        if line > 0 {
            out.push_str(&format!("\n  at {}:{line}", script.path));
            if let Some(text) = self.source_line(ctx, line) {
                out.push_str(&format!("\n  | {}", text.trim_end()));
            }
        }
        if let Some(backtrace) = &err.backtrace {
            if !backtrace.is_empty() {
                out.push('\n');
                out.push_str(backtrace.to_string().trim_end());
            }
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap to panic on unexpected state")]
mod tests;
