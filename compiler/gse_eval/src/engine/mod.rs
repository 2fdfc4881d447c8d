//! Engine facade: execution lock and accumulation queue.
//!
//! The engine owns one [`Runtime`] behind a reentrant lock. Only one
//! execution runs at a time; the model is a single-threaded event loop in
//! which whoever holds the runtime also drains the task queue.
//!
//! Host callbacks (input events, timers) do not call into scripts
//! directly. They [`accumulate`](Engine::accumulate) a task instead:
//!
//! - if the runtime is idle the task runs right away;
//! - otherwise it is queued, and the current holder runs it after its own
//!   work, before releasing the lock.
//!
//! Tasks run in the order they were accumulated and never overlap a
//! collection. Collection only happens at top-level entry points, when no
//! interpreter frames exist.
//!
//! A nested entry from the same thread while the runtime is borrowed
//! (a native function calling `Engine::execute`) is reported as an
//! engine-busy error instead of deadlocking.
//!
//! Values handed back to the host stay valid until the next collection
//! unless pinned (`Space::pin_value`) or reachable from a root.

mod config;
mod runtime;

use std::cell::RefCell;
use std::collections::VecDeque;

use gse_ir::Program;
use parking_lot::{Mutex, ReentrantMutex};

use crate::context::ContextRef;
use crate::errors::{engine_busy, EvalError};
use crate::gc::CollectStats;
use crate::value::Value;

pub use config::{EngineBuilder, EngineConfig, DEFAULT_GC_THRESHOLD, DEFAULT_MAX_CALL_DEPTH};
pub use runtime::Runtime;

/// Work scheduled through [`Engine::accumulate`].
pub type Task = Box<dyn FnOnce(&mut Runtime) -> Result<(), EvalError> + Send>;

/// What `accumulate` did with a task.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Accumulated {
    /// Ran to completion before `accumulate` returned.
    Ran,
    /// Queued behind the execution in progress.
    Queued,
}

pub struct Engine {
    state: ReentrantMutex<RefCell<Runtime>>,
    queue: Mutex<VecDeque<Task>>,
    task_errors: Mutex<Vec<EvalError>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            state: ReentrantMutex::new(RefCell::new(Runtime::new(config))),
            queue: Mutex::new(VecDeque::new()),
            task_errors: Mutex::new(Vec::new()),
        }
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Exclusive access to the runtime. Queued tasks run after `f`, before
    /// the lock is released.
    pub fn with_runtime<R>(&self, f: impl FnOnce(&mut Runtime) -> R) -> Result<R, EvalError> {
        let guard = self.state.lock();
        let result = {
            let Ok(mut runtime) = guard.try_borrow_mut() else {
                return Err(engine_busy());
            };
            let result = f(&mut runtime);
            self.drain(&mut runtime);
            result
        };
        drop(guard);
        self.kick();
        Ok(result)
    }

    /// Run `program` in a child of `ctx`.
    ///
    /// If enough allocations piled up since the last collection, one runs
    /// first, with `ctx` as an extra root.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn execute(&self, ctx: ContextRef, program: &Program) -> Result<Value, EvalError> {
        self.with_runtime(|runtime| {
            runtime.maybe_collect(&[&ctx]);
            runtime.execute(ctx, program)
        })?
    }

    /// Like [`execute`](Self::execute), also returning the context holding
    /// the top-level bindings.
    pub fn execute_module(
        &self,
        ctx: ContextRef,
        program: &Program,
    ) -> Result<(Value, ContextRef), EvalError> {
        self.with_runtime(|runtime| {
            runtime.maybe_collect(&[&ctx]);
            runtime.execute_module(ctx, program)
        })?
    }

    /// Run `task` now if the runtime is idle, otherwise queue it behind the
    /// current holder. Failures are logged and kept for
    /// [`take_task_errors`](Self::take_task_errors).
    pub fn accumulate<F>(&self, task: F) -> Accumulated
    where
        F: FnOnce(&mut Runtime) -> Result<(), EvalError> + Send + 'static,
    {
        let task: Task = Box::new(task);
        let Some(guard) = self.state.try_lock() else {
            self.enqueue(task);
            self.kick();
            return Accumulated::Queued;
        };
        let Ok(mut runtime) = guard.try_borrow_mut() else {
            // Same thread, inside an execution: the holder drains it.
            self.enqueue(task);
            return Accumulated::Queued;
        };
        // Earlier tasks go first.
        self.drain(&mut runtime);
        self.run_task(&mut runtime, task);
        self.drain(&mut runtime);
        drop(runtime);
        drop(guard);
        self.kick();
        Accumulated::Ran
    }

    /// Force a collection. Queued tasks are drained first.
    pub fn collect(&self) -> Result<CollectStats, EvalError> {
        self.with_runtime(|runtime| {
            self.drain(runtime);
            runtime.collect(&[])
        })
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.lock().len()
    }

    /// Errors of accumulated tasks since the last call.
    pub fn take_task_errors(&self) -> Vec<EvalError> {
        std::mem::take(&mut *self.task_errors.lock())
    }

    fn enqueue(&self, task: Task) {
        let mut queue = self.queue.lock();
        queue.push_back(task);
        tracing::debug!(pending = queue.len(), "task queued");
    }

    fn run_task(&self, runtime: &mut Runtime, task: Task) {
        if let Err(err) = task(runtime) {
            tracing::error!(%err, "accumulated task failed");
            self.task_errors.lock().push(err);
        }
    }

    fn drain(&self, runtime: &mut Runtime) {
        loop {
            let next = self.queue.lock().pop_front();
            let Some(task) = next else {
                break;
            };
            self.run_task(runtime, task);
        }
    }

    /// Drain tasks queued by other threads after the holder released the
    /// lock. Gives up as soon as another thread holds the runtime; that
    /// holder kicks again on release.
    fn kick(&self) {
        while self.pending_tasks() > 0 {
            let Some(guard) = self.state.try_lock() else {
                return;
            };
            let Ok(mut runtime) = guard.try_borrow_mut() else {
                return;
            };
            self.drain(&mut runtime);
        }
    }
}
