//! Execution pointer: the call chain of one logical script thread.
//!
//! Every evaluation call receives the pointer of the execution it belongs
//! to. Calls push a frame and pop it on return; an error leaving a call
//! takes a snapshot as its backtrace. The host creates one pointer per
//! top-level execution or accumulated task, so independent executions
//! never share frames.
//!
//! ```ignore
//! let mut ep = ExecutionPointer::new(Some(1024));
//! ep.push(TraceFrame { name, source_info })?;
//! // ... evaluate the body ...
//! ep.pop();
//! ```

use gse_ir::SourceInfo;

use crate::errors::{stack_overflow, Backtrace, EvalError, TraceFrame};

#[derive(Clone, Debug, Default)]
pub struct ExecutionPointer {
    frames: Vec<TraceFrame>,
    max_depth: Option<usize>,
}

impl ExecutionPointer {
    /// `max_depth` of `None` leaves call depth unbounded.
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Push a call frame. Fails with a stack overflow error, without
    /// pushing, once the depth limit is reached.
    pub fn push(&mut self, frame: TraceFrame) -> Result<(), EvalError> {
        if let Some(max) = self.max_depth {
            if self.frames.len() >= max {
                return Err(stack_overflow(max));
            }
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) {
        debug_assert!(
            !self.frames.is_empty(),
            "ExecutionPointer::pop() called with no frames"
        );
        self.frames.pop();
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Call site of the innermost frame.
    pub fn current_site(&self) -> Option<&SourceInfo> {
        self.frames.last().map(|f| &f.source_info)
    }

    /// Snapshot of the frames, innermost first.
    pub fn capture(&self) -> Backtrace {
        Backtrace::new(self.frames.iter().rev().cloned().collect())
    }

    /// Attach a snapshot to `err` unless it already carries one.
    pub fn attach_backtrace(&self, err: EvalError) -> EvalError {
        if self.frames.is_empty() || err.backtrace.is_some() {
            return err;
        }
        err.with_backtrace(self.capture())
    }
}
