//! Conditionals, loops and `try`.

use gse_ir::{CatchHandler, Conditional, ConditionalKind, Expression, Scope, Variable, VariableHint};

use super::Interpreter;
use crate::context::{ContextRef, Mutability};
use crate::errors::{type_mismatch, ControlAction, EvalResult};
use crate::execution_pointer::ExecutionPointer;
use crate::value::Value;

/// What a loop does with the result of one body evaluation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BreakCondition {
    /// Stop iterating.
    pub need_break: bool,
    /// The signal belongs to this loop and must not propagate.
    pub need_clear: bool,
}

/// Classify a loop body result.
///
/// `break` stops the loop and is consumed, `continue` is consumed without
/// stopping, `return` and errors stop the loop and keep propagating.
pub fn check_break_condition(result: &EvalResult) -> BreakCondition {
    let (need_break, need_clear) = match result {
        Ok(_) => (false, false),
        Err(ControlAction::Break) => (true, true),
        Err(ControlAction::Continue) => (false, true),
        Err(ControlAction::Return(_) | ControlAction::Error(_)) => (true, false),
    };
    BreakCondition {
        need_break,
        need_clear,
    }
}

/// `Some(result)` when the loop must stop and evaluate to `result`.
fn loop_exit(result: EvalResult) -> Option<EvalResult> {
    let condition = check_break_condition(&result);
    if !condition.need_break {
        return None;
    }
    Some(if condition.need_clear {
        Ok(Value::Undefined)
    } else {
        result
    })
}

impl Interpreter<'_> {
    pub(crate) fn evaluate_conditional(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        conditional: &Conditional,
    ) -> EvalResult {
        let result = match &conditional.kind {
            ConditionalKind::If {
                condition,
                body,
                otherwise,
            } => {
                if self.evaluate_bool(ctx, ep, condition)? {
                    self.evaluate_scope(ctx, ep, body)
                } else if let Some(otherwise) = otherwise {
                    self.evaluate_conditional(ctx, ep, otherwise)
                } else {
                    Ok(Value::Undefined)
                }
            }
            ConditionalKind::Else { body } => self.evaluate_scope(ctx, ep, body),
            ConditionalKind::While { condition, body } => {
                self.evaluate_while(ctx, ep, condition, body)
            }
            ConditionalKind::ForIn {
                variable,
                iterable,
                body,
            } => self.evaluate_for_in(ctx, ep, variable, iterable, body),
            ConditionalKind::Try { body, handlers } => self.evaluate_try(ctx, ep, body, handlers),
        };
        result.map_err(|action| action.with_source_info_if_error(&conditional.source_info))
    }

    fn evaluate_bool(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        condition: &Expression,
    ) -> Result<bool, ControlAction> {
        Ok(self.evaluate_expression(ctx, ep, condition)?.is_truthy())
    }

    fn evaluate_while(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        condition: &Expression,
        body: &Scope,
    ) -> EvalResult {
        while self.evaluate_bool(ctx, ep, condition)? {
            let result = self.evaluate_scope(ctx, ep, body);
            if let Some(exit) = loop_exit(result) {
                return exit;
            }
        }
        Ok(Value::Undefined)
    }

    /// `for (x in iterable)`: array values or object keys, over a snapshot
    /// taken before the first iteration.
    fn evaluate_for_in(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        variable: &Variable,
        iterable: &Expression,
        body: &Scope,
    ) -> EvalResult {
        let items: Vec<Value> = match self.evaluate_expression(ctx, ep, iterable)? {
            Value::Array(r) => self.space.array(r).clone(),
            Value::Object(r) => self
                .space
                .object_data(r)
                .properties
                .keys()
                .map(|k| Value::string(k.as_str()))
                .collect(),
            other => return Err(type_mismatch("Array or Object", other.type_name()).into()),
        };
        let mutability = if variable.hint == VariableHint::Const {
            Mutability::Immutable
        } else {
            Mutability::Mutable
        };
        for item in items {
            let iteration_ctx = self.space.fork_context(ctx, body.source_info.clone());
            self.space
                .context_define(iteration_ctx, &variable.name, item, mutability);
            let result = self.evaluate_scope_in(iteration_ctx, ep, body);
            if let Some(exit) = loop_exit(result) {
                return exit;
            }
        }
        Ok(Value::Undefined)
    }

    /// `try { body } catch ...`: the first handler whose code matches the
    /// error (or that has no code) runs; unmatched errors propagate.
    fn evaluate_try(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        body: &Scope,
        handlers: &[CatchHandler],
    ) -> EvalResult {
        let err = match self.evaluate_scope(ctx, ep, body) {
            Err(ControlAction::Error(err)) => err,
            other => return other,
        };
        let code = err.code();
        let handler = handlers.iter().find(|h| match &h.code {
            None => true,
            Some(c) => c == code.as_str(),
        });
        let Some(handler) = handler else {
            return Err(ControlAction::Error(err));
        };
        tracing::trace!(code = %code, "error caught");
        let handler_ctx = self.space.fork_context(ctx, handler.source_info.clone());
        if let Some(parameter) = &handler.parameter {
            let error = self.error_object(&err);
            self.space
                .context_define(handler_ctx, parameter, error, Mutability::Mutable);
        }
        self.evaluate_scope_in(handler_ctx, ep, &handler.body)
    }
}
