//! GSE IR - program tree types for the GSE script engine.
//!
//! This crate contains the data structures a parser hands to the
//! interpreter:
//! - `SourceInfo` for diagnostics (file, line/column range)
//! - `Program`, `Scope`, `Control`, `Statement`, `Conditional`
//! - `Expression`, `Operand`, `Variable`, `Literal`, `Operator`
//! - `build`, constructors for hosts that synthesize programs
//!
//! The tree is immutable once built. Function bodies are held behind `Arc`
//! so that closures created at runtime can outlive the tree they came from.

pub mod build;
mod program;
mod source_info;

pub use program::{
    CatchHandler, Conditional, ConditionalKind, Control, Expression, FunctionDef, Literal,
    LoopControl, Operand, OperandKind, Operator, Program, Scope, Statement, Variable,
    VariableHint,
};
pub use source_info::{Position, SourceInfo};
