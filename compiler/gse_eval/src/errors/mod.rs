//! Runtime error types and centralized error constructors.
//!
//! Script-level failures are `EvalError`s: a structured `EvalErrorKind`,
//! the rendered message, the source info of the node that triggered it and,
//! once it crosses a function boundary, a backtrace of the execution
//! pointer.
//!
//! Broken host/runtime contracts are not errors. They go through
//! [`invariant_violation`], which logs and panics.
//!
//! # Usage
//!
//! ```ignore
//! use gse_eval::errors::{unresolved_variable, invalid_range};
//! ```

use std::fmt;

use gse_ir::SourceInfo;

use crate::value::Value;

/// Result of evaluating a program node.
///
/// The error channel also carries control-flow signals, so a `return`
/// or `break` skips the rest of every enclosing scope without being
/// mistaken for a value.
pub type EvalResult = Result<Value, ControlAction>;

/// Out-of-band signals raised while evaluating a node.
#[derive(Clone, Debug)]
pub enum ControlAction {
    /// `break` heading for the nearest loop.
    Break,
    /// `continue` heading for the nearest loop.
    Continue,
    /// `return` heading for the nearest function boundary.
    Return(Value),
    /// A runtime error unwinding to whoever can report it.
    Error(Box<EvalError>),
}

impl ControlAction {
    /// Attach source info to an error that does not have one yet.
    ///
    /// Signals pass through untouched; empty source info is ignored so the
    /// innermost located node wins.
    #[must_use]
    pub fn with_source_info_if_error(self, source_info: &SourceInfo) -> Self {
        match self {
            ControlAction::Error(err) => {
                ControlAction::Error(Box::new(err.with_source_info_if_missing(source_info)))
            }
            other => other,
        }
    }
}

impl From<EvalError> for ControlAction {
    fn from(err: EvalError) -> Self {
        ControlAction::Error(Box::new(err))
    }
}

/// Error category, as exposed to scripts (`catch (TypeError e)`) and hosts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ReferenceError,
    TypeError,
    InvalidCall,
    InvalidAssignment,
    OperationNotSupported,
    RangeError,
    StackOverflow,
    EngineError,
    /// Code chosen by a script `throw`.
    Custom(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::ReferenceError => "ReferenceError",
            ErrorCode::TypeError => "TypeError",
            ErrorCode::InvalidCall => "InvalidCall",
            ErrorCode::InvalidAssignment => "InvalidAssignment",
            ErrorCode::OperationNotSupported => "OperationNotSupported",
            ErrorCode::RangeError => "RangeError",
            ErrorCode::StackOverflow => "StackOverflow",
            ErrorCode::EngineError => "EngineError",
            ErrorCode::Custom(code) => code,
        }
    }

    /// Map a code name back to a code; unknown names become `Custom`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "ReferenceError" => ErrorCode::ReferenceError,
            "TypeError" => ErrorCode::TypeError,
            "InvalidCall" => ErrorCode::InvalidCall,
            "InvalidAssignment" => ErrorCode::InvalidAssignment,
            "OperationNotSupported" => ErrorCode::OperationNotSupported,
            "RangeError" => ErrorCode::RangeError,
            "StackOverflow" => ErrorCode::StackOverflow,
            "EngineError" => ErrorCode::EngineError,
            other => ErrorCode::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse grouping of recoverable errors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Unresolved variable, duplicate or unknown class.
    Resolution,
    /// Operand of the wrong kind, wrong argument count or type.
    Type,
    /// Invalid array index or range bounds.
    Range,
    /// Everything else a script can raise (throw, arithmetic, engine state).
    Runtime,
}

/// Structured error kind.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EvalErrorKind {
    // Resolution
    #[error("unresolved variable: {name}")]
    UnresolvedVariable { name: String },
    #[error("class already exists: {name}")]
    ClassAlreadyExists { name: String },
    #[error("unknown class: {name}")]
    UnknownClass { name: String },

    // Assignment
    #[error("cannot assign to const: {name}")]
    ImmutableBinding { name: String },
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("write to `{key}` rejected: {reason}")]
    WriteRejected { key: String, reason: String },

    // Type
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },
    #[error("operator `{op}` cannot be applied to {left} and {right}")]
    InvalidOperands {
        op: &'static str,
        left: String,
        right: String,
    },
    #[error("{type_name} is not callable")]
    NotCallable { type_name: String },
    #[error("{name} expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    // Range
    #[error("invalid range [{from}:{to}] for array of length {len}")]
    InvalidRange { from: i64, to: i64, len: usize },
    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    // Runtime
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in {operation}")]
    IntegerOverflow { operation: &'static str },
    #[error("{keyword} outside of loop")]
    LoopControlOutsideLoop { keyword: &'static str },
    #[error("maximum call depth exceeded (limit: {depth})")]
    StackOverflow { depth: usize },
    #[error("engine is already executing on this thread")]
    EngineBusy,
    #[error("{reason}")]
    Thrown { code: String, reason: String },
}

impl EvalErrorKind {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnresolvedVariable { .. }
            | Self::ClassAlreadyExists { .. }
            | Self::UnknownClass { .. } => ErrorCode::ReferenceError,
            Self::ImmutableBinding { .. }
            | Self::InvalidAssignmentTarget
            | Self::WriteRejected { .. } => ErrorCode::InvalidAssignment,
            Self::TypeMismatch { .. } | Self::InvalidOperands { .. } => ErrorCode::TypeError,
            Self::NotCallable { .. } | Self::ArityMismatch { .. } => ErrorCode::InvalidCall,
            Self::InvalidRange { .. } | Self::IndexOutOfBounds { .. } => ErrorCode::RangeError,
            Self::DivisionByZero
            | Self::IntegerOverflow { .. }
            | Self::LoopControlOutsideLoop { .. } => ErrorCode::OperationNotSupported,
            Self::StackOverflow { .. } => ErrorCode::StackOverflow,
            Self::EngineBusy => ErrorCode::EngineError,
            Self::Thrown { code, .. } => ErrorCode::from_name(code),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnresolvedVariable { .. }
            | Self::ClassAlreadyExists { .. }
            | Self::UnknownClass { .. } => ErrorCategory::Resolution,
            Self::TypeMismatch { .. }
            | Self::InvalidOperands { .. }
            | Self::NotCallable { .. }
            | Self::ArityMismatch { .. } => ErrorCategory::Type,
            Self::InvalidRange { .. } | Self::IndexOutOfBounds { .. } => ErrorCategory::Range,
            _ => ErrorCategory::Runtime,
        }
    }
}

/// A single frame of a captured backtrace.
#[derive(Clone, Debug, PartialEq)]
pub struct TraceFrame {
    /// Function name, or `<anonymous>`.
    pub name: String,
    /// Call site.
    pub source_info: SourceInfo,
}

/// Snapshot of the execution pointer at an error site, innermost call first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Backtrace {
    frames: Vec<TraceFrame>,
}

impl Backtrace {
    pub fn new(frames: Vec<TraceFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[TraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Display for Backtrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return Ok(());
        }
        writeln!(f, "stack backtrace:")?;
        for (i, frame) in self.frames.iter().enumerate() {
            writeln!(f, "  {i}: {} at {}", frame.name, frame.source_info)?;
        }
        Ok(())
    }
}

/// A recoverable script-level failure.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Rendered message; equals `kind.to_string()`.
    pub message: String,
    /// Node that raised the error, if known.
    pub source_info: Option<SourceInfo>,
    /// Call chain at the error site, captured at the innermost function boundary.
    pub backtrace: Option<Backtrace>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            source_info: None,
            backtrace: None,
        }
    }

    #[inline]
    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    #[inline]
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Line the error was raised at, 0 when unknown.
    pub fn line(&self) -> u32 {
        self.source_info.as_ref().map_or(0, SourceInfo::line)
    }

    #[must_use]
    pub fn with_source_info(mut self, source_info: SourceInfo) -> Self {
        self.source_info = Some(source_info);
        self
    }

    /// Attach `source_info` unless one is already set or it is empty.
    #[must_use]
    pub fn with_source_info_if_missing(mut self, source_info: &SourceInfo) -> Self {
        if self.source_info.is_none() && !source_info.is_empty() {
            self.source_info = Some(source_info.clone());
        }
        self
    }

    #[must_use]
    pub fn with_backtrace(mut self, backtrace: Backtrace) -> Self {
        self.backtrace = Some(backtrace);
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message)?;
        if let Some(si) = &self.source_info {
            write!(f, " at {si}")?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

/// Abort on a broken runtime or embedding contract.
///
/// Stale handles, handles of the wrong kind and double wrapping are bugs
/// in the engine or the host, not script conditions.
#[cold]
#[track_caller]
pub fn invariant_violation(message: &str) -> ! {
    tracing::error!(message, "runtime invariant violated");
    panic!("runtime invariant violated: {message}");
}

// Resolution Errors

#[cold]
pub fn unresolved_variable(name: &str) -> EvalError {
    EvalError::new(EvalErrorKind::UnresolvedVariable {
        name: name.to_string(),
    })
}

#[cold]
pub fn class_already_exists(name: &str) -> EvalError {
    EvalError::new(EvalErrorKind::ClassAlreadyExists {
        name: name.to_string(),
    })
}

#[cold]
pub fn unknown_class(name: &str) -> EvalError {
    EvalError::new(EvalErrorKind::UnknownClass {
        name: name.to_string(),
    })
}

// Assignment Errors

#[cold]
pub fn cannot_assign_const(name: &str) -> EvalError {
    EvalError::new(EvalErrorKind::ImmutableBinding {
        name: name.to_string(),
    })
}

#[cold]
pub fn invalid_assignment_target() -> EvalError {
    EvalError::new(EvalErrorKind::InvalidAssignmentTarget)
}

/// A setter hook refused a script-side write.
#[cold]
pub fn write_rejected(key: &str, reason: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::WriteRejected {
        key: key.to_string(),
        reason: reason.into(),
    })
}

// Type Errors

#[cold]
pub fn type_mismatch(expected: &str, got: &str) -> EvalError {
    EvalError::new(EvalErrorKind::TypeMismatch {
        expected: expected.to_string(),
        got: got.to_string(),
    })
}

#[cold]
pub fn invalid_operands(op: &'static str, left: &str, right: &str) -> EvalError {
    EvalError::new(EvalErrorKind::InvalidOperands {
        op,
        left: left.to_string(),
        right: right.to_string(),
    })
}

#[cold]
pub fn not_callable(type_name: &str) -> EvalError {
    EvalError::new(EvalErrorKind::NotCallable {
        type_name: type_name.to_string(),
    })
}

#[cold]
pub fn wrong_argument_count(name: &str, expected: usize, got: usize) -> EvalError {
    EvalError::new(EvalErrorKind::ArityMismatch {
        name: name.to_string(),
        expected,
        got,
    })
}

// Range Errors

#[cold]
pub fn invalid_range(from: i64, to: i64, len: usize) -> EvalError {
    EvalError::new(EvalErrorKind::InvalidRange { from, to, len })
}

#[cold]
pub fn index_out_of_bounds(index: i64, len: usize) -> EvalError {
    EvalError::new(EvalErrorKind::IndexOutOfBounds { index, len })
}

// Runtime Errors

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::new(EvalErrorKind::DivisionByZero)
}

#[cold]
pub fn integer_overflow(operation: &'static str) -> EvalError {
    EvalError::new(EvalErrorKind::IntegerOverflow { operation })
}

#[cold]
pub fn loop_control_outside_loop(keyword: &'static str) -> EvalError {
    EvalError::new(EvalErrorKind::LoopControlOutsideLoop { keyword })
}

#[cold]
pub fn stack_overflow(depth: usize) -> EvalError {
    EvalError::new(EvalErrorKind::StackOverflow { depth })
}

#[cold]
pub fn engine_busy() -> EvalError {
    EvalError::new(EvalErrorKind::EngineBusy)
}

/// Error raised by a script `throw`.
#[cold]
pub fn thrown(code: &str, reason: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::Thrown {
        code: code.to_string(),
        reason: reason.into(),
    })
}
