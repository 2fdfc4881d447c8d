#![deny(clippy::arithmetic_side_effects)]
//! Embedded scripting engine runtime.
//!
//! The crate runs already-parsed programs (`gse_ir`) against a chain of
//! contexts, with every container value owned by a mark-and-sweep GC
//! space:
//!
//! - [`value`]: runtime values and GC handles
//! - [`gc`]: the space, roots and collection
//! - [`context`]: global and child contexts, source lines for diagnostics
//! - [`object`]: objects, host classes and the wrapping bridge
//! - [`callable`]: closures and native functions
//! - [`interpreter`]: the tree-walking evaluator
//! - [`execution_pointer`]: per-execution call frames and backtraces
//! - [`engine`]: the locked runtime and the accumulation queue
//!
//! ```ignore
//! use gse_ir::build::*;
//! let engine = gse_eval::Engine::default();
//! let ctx = engine.with_runtime(|rt| rt.create_global_context("main.js", "x = 1"))?;
//! engine.execute(ctx, &program(vec![statement(assign(var("x"), int(1)))]))?;
//! ```

pub mod callable;
pub mod context;
pub mod engine;
pub mod errors;
pub mod execution_pointer;
pub mod gc;
pub mod interpreter;
pub mod object;
mod stack;
pub mod value;

use std::sync::Once;

pub use callable::{expect_args, expect_string, FunctionData, NativeCall, NativeFunction};
pub use context::{AssignError, ContextRef, Mutability, ScriptInfo};
pub use engine::{Accumulated, Engine, EngineBuilder, EngineConfig, Runtime, Task};
pub use errors::{
    Backtrace, ControlAction, ErrorCategory, ErrorCode, EvalError, EvalErrorKind, EvalResult,
    TraceFrame,
};
pub use execution_pointer::ExecutionPointer;
pub use gc::{CollectStats, GcObject, Space, Traceable};
pub use interpreter::{check_break_condition, validate_range, BreakCondition, Interpreter, Place};
pub use object::{
    ClassDef, ClassRegistry, ClassSpec, HostId, HostWrite, ObjectData, SetterHook, Wrappable,
    Wrapping,
};
pub use stack::ensure_sufficient_stack;
pub use value::{GcRef, Value, ValueType};

static TRACING_INIT: Once = Once::new();

/// Install a tracing subscriber filtered by `RUST_LOG`.
///
/// Does nothing unless `RUST_LOG` is set. Safe to call more than once.
/// Enable with `RUST_LOG=gse_eval=debug` or `RUST_LOG=gse_eval=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
