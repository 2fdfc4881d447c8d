//! Tree-walking interpreter.
//!
//! `Interpreter` borrows the GC space and the class registry for the
//! duration of one execution. Evaluation functions return [`EvalResult`];
//! `break`, `continue`, `return` and errors travel in the error channel as
//! [`ControlAction`]s so they skip the rest of every enclosing scope until
//! a loop or function boundary consumes them.
//!
//! Every scope runs in its own child context. Function bodies and the
//! top-level program run directly in the context created for the call.
//!
//! # Modules
//!
//! - `control`: if / while / for-in / try and the break-condition check
//! - `reference`: places (assignable references), deref and write-back,
//!   range validation
//! - `call`: calling closures and native functions
//! - `operators`: binary operators

mod call;
mod control;
mod operators;
mod reference;

use std::sync::Arc;

use gse_ir::{
    Control, Expression, Literal, LoopControl, Operand, OperandKind, Operator, Program, Scope,
    SourceInfo, Statement, Variable, VariableHint,
};

use crate::callable::FunctionData;
use crate::context::{ContextRef, Mutability};
use crate::errors::{
    invariant_violation, loop_control_outside_loop, thrown, type_mismatch, ControlAction,
    EvalError, EvalResult,
};
use crate::execution_pointer::ExecutionPointer;
use crate::gc::Space;
use crate::object::{ClassRegistry, ObjectData};
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

pub use control::{check_break_condition, BreakCondition};
pub use reference::{validate_index, validate_range, Place};

/// Code given to values thrown without an explicit `type`.
pub const DEFAULT_THROW_CODE: &str = "Error";

pub struct Interpreter<'rt> {
    pub(crate) space: &'rt mut Space,
    pub(crate) classes: &'rt ClassRegistry,
}

impl<'rt> Interpreter<'rt> {
    pub fn new(space: &'rt mut Space, classes: &'rt ClassRegistry) -> Self {
        Interpreter { space, classes }
    }

    pub fn space(&mut self) -> &mut Space {
        &mut *self.space
    }

    pub fn classes(&self) -> &ClassRegistry {
        self.classes
    }

    /// Run `program` in a fresh child of `ctx`.
    ///
    /// The result is the value of a top-level `return`, otherwise
    /// `Undefined`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn execute(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        program: &Program,
    ) -> Result<Value, EvalError> {
        self.execute_module(ctx, ep, program).map(|(value, _)| value)
    }

    /// Like [`execute`](Self::execute), also returning the context that
    /// received the top-level bindings.
    pub fn execute_module(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        program: &Program,
    ) -> Result<(Value, ContextRef), EvalError> {
        self.executing(|this| {
            let module_ctx = this.space.fork_context(ctx, program.source_info.clone());
            let result = this.evaluate_scope_in(module_ctx, ep, &program.body);
            let value = finish_body(result, ep)?;
            Ok((value, module_ctx))
        })
    }

    /// Run `f` with the space marked as executing. Collections requested
    /// meanwhile are deferred.
    pub(crate) fn executing<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.space.enter_execution();
        let result = f(self);
        self.space.exit_execution();
        result
    }

    // Scopes and statements

    /// Evaluate `scope` in a new child of `ctx`.
    pub(crate) fn evaluate_scope(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        scope: &Scope,
    ) -> EvalResult {
        let scope_ctx = self.space.fork_context(ctx, scope.source_info.clone());
        self.evaluate_scope_in(scope_ctx, ep, scope)
    }

    /// Evaluate the controls of `scope` directly in `ctx`.
    pub(crate) fn evaluate_scope_in(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        scope: &Scope,
    ) -> EvalResult {
        for control in &scope.body {
            match control {
                Control::Statement(statement) => {
                    self.evaluate_statement(ctx, ep, statement)?;
                }
                Control::Conditional(conditional) => {
                    self.evaluate_conditional(ctx, ep, conditional)?;
                }
            }
        }
        Ok(Value::Undefined)
    }

    pub(crate) fn evaluate_statement(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        statement: &Statement,
    ) -> EvalResult {
        self.evaluate_expression(ctx, ep, &statement.body)
            .map_err(|action| action.with_source_info_if_error(&statement.source_info))
    }

    // Expressions

    pub(crate) fn evaluate_expression(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        expression: &Expression,
    ) -> EvalResult {
        ensure_sufficient_stack(|| self.evaluate_expression_inner(ctx, ep, expression))
            .map_err(|action| action.with_source_info_if_error(&expression.source_info))
    }

    fn evaluate_expression_inner(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        expression: &Expression,
    ) -> EvalResult {
        let op = expression.op;
        let a = expression.a.as_deref();
        let b = expression.b.as_deref();
        match op {
            Operator::Nop => match a {
                Some(a) => self.evaluate_operand(ctx, ep, a),
                None => Ok(Value::Undefined),
            },
            Operator::Assign => self.evaluate_assign(ctx, ep, expression),
            Operator::Return => {
                let value = match b {
                    Some(b) => self.evaluate_operand(ctx, ep, b)?,
                    None => Value::Undefined,
                };
                Err(ControlAction::Return(value))
            }
            Operator::Throw => {
                let value = self.evaluate_operand(ctx, ep, required(b, op))?;
                Err(self.throw_value(&value).into())
            }
            Operator::Not => {
                let value = self.evaluate_operand(ctx, ep, required(b, op))?;
                Ok(Value::Bool(!value.is_truthy()))
            }
            Operator::And => {
                let left = self.evaluate_operand(ctx, ep, required(a, op))?;
                if !left.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                let right = self.evaluate_operand(ctx, ep, required(b, op))?;
                Ok(Value::Bool(right.is_truthy()))
            }
            Operator::Or => {
                let left = self.evaluate_operand(ctx, ep, required(a, op))?;
                if left.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                let right = self.evaluate_operand(ctx, ep, required(b, op))?;
                Ok(Value::Bool(right.is_truthy()))
            }
            Operator::Eq
            | Operator::Ne
            | Operator::Lt
            | Operator::Lte
            | Operator::Gt
            | Operator::Gte
            | Operator::Add
            | Operator::Sub
            | Operator::Mult
            | Operator::Div
            | Operator::Mod => {
                let left = self.evaluate_operand(ctx, ep, required(a, op))?;
                let right = self.evaluate_operand(ctx, ep, required(b, op))?;
                self.evaluate_binary(op, &left, &right)
                    .map_err(ControlAction::from)
            }
            Operator::Inc | Operator::Dec => {
                let base = if op == Operator::Inc {
                    Operator::Add
                } else {
                    Operator::Sub
                };
                let place = self.evaluate_place(ctx, ep, required(a, op))?;
                let current = self.deref(&place)?;
                let updated = self.evaluate_binary(base, &current, &Value::Int(1))?;
                self.write_by_ref(&place, updated.clone(), &expression.source_info)?;
                Ok(updated)
            }
            Operator::IncBy
            | Operator::DecBy
            | Operator::MultBy
            | Operator::DivBy
            | Operator::ModBy => {
                let Some(base) = op.compound_base() else {
                    invariant_violation("compound assignment without base operator");
                };
                let place = self.evaluate_place(ctx, ep, required(a, op))?;
                let current = self.deref(&place)?;
                let right = self.evaluate_operand(ctx, ep, required(b, op))?;
                let updated = self.evaluate_binary(base, &current, &right)?;
                self.write_by_ref(&place, updated.clone(), &expression.source_info)?;
                Ok(updated)
            }
            Operator::Child => {
                let object = self.evaluate_operand(ctx, ep, required(a, op))?;
                let key = operand_name(required(b, op));
                self.read_property(&object, key).map_err(ControlAction::from)
            }
            Operator::At => {
                let place = self.evaluate_at_place(ctx, ep, expression)?;
                self.deref(&place).map_err(ControlAction::from)
            }
            Operator::Append => {
                let target = self.evaluate_operand(ctx, ep, required(a, op))?;
                let value = self.evaluate_operand(ctx, ep, required(b, op))?;
                let Value::Array(array) = &target else {
                    return Err(type_mismatch("Array", target.type_name()).into());
                };
                self.space.array_mut(*array).push(value);
                Ok(target)
            }
        }
    }

    /// `object.key`. Arrays and strings expose `length`.
    fn read_property(&self, object: &Value, key: &str) -> Result<Value, EvalError> {
        match object {
            Value::Object(_) => Ok(self.space.object_get(object, key).unwrap_or(Value::Undefined)),
            Value::Array(r) if key == "length" => Ok(Value::Int(length(self.space.array(*r).len()))),
            Value::String(s) if key == "length" => Ok(Value::Int(length(s.chars().count()))),
            other => Err(type_mismatch("Object", other.type_name())),
        }
    }

    // Operands

    pub(crate) fn evaluate_operand(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        operand: &Operand,
    ) -> EvalResult {
        self.evaluate_operand_inner(ctx, ep, operand)
            .map_err(|action| action.with_source_info_if_error(&operand.source_info))
    }

    fn evaluate_operand_inner(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        operand: &Operand,
    ) -> EvalResult {
        match &operand.kind {
            OperandKind::Literal(literal) => Ok(literal_value(literal)),
            OperandKind::Variable(variable) => self.evaluate_variable_value(ctx, variable),
            OperandKind::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.evaluate_expression(ctx, ep, element)?);
                }
                Ok(self.space.alloc_array(items))
            }
            OperandKind::Object(properties) => {
                self.evaluate_object_literal(ctx, ep, properties, &operand.source_info)
            }
            OperandKind::Expression(expression) => self.evaluate_expression(ctx, ep, expression),
            OperandKind::Function(def) => Ok(self.space.alloc_function(FunctionData {
                context: ctx,
                parameters: def.parameters.clone(),
                body: Arc::clone(&def.body),
                name: None,
            })),
            OperandKind::Call {
                callable,
                arguments,
            } => self.evaluate_call(ctx, ep, callable, arguments, &operand.source_info),
            OperandKind::LoopControl(LoopControl::Break) => Err(ControlAction::Break),
            OperandKind::LoopControl(LoopControl::Continue) => Err(ControlAction::Continue),
            OperandKind::Range { .. } => {
                invariant_violation("range selector outside of an index expression")
            }
        }
    }

    fn evaluate_variable_value(&mut self, ctx: ContextRef, variable: &Variable) -> EvalResult {
        let mutability = match variable.hint {
            VariableHint::None => {
                return self
                    .space
                    .context_resolve(ctx, &variable.name)
                    .map_err(|e| e.with_source_info_if_missing(&variable.source_info).into());
            }
            VariableHint::Let => Mutability::Mutable,
            VariableHint::Const => Mutability::Immutable,
        };
        // Bare declaration without initializer.
        self.space
            .context_define(ctx, &variable.name, Value::Undefined, mutability);
        Ok(Value::Undefined)
    }

    /// Object literal. Properties are evaluated in a child context that binds
    /// `this`; the object owns that context.
    fn evaluate_object_literal(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        properties: &[(String, Expression)],
        source_info: &SourceInfo,
    ) -> EvalResult {
        let object_ctx = self.space.fork_context(ctx, source_info.clone());
        let mut data = ObjectData::new().source_info(source_info.clone());
        data.context = Some(object_ctx);
        let object = self.space.alloc_object(data);
        self.space
            .context_define(object_ctx, "this", object.clone(), Mutability::Immutable);
        for (key, expression) in properties {
            let value = self.evaluate_expression(object_ctx, ep, expression)?;
            self.space.name_function(&value, key);
            self.space.object_assign(&object, key, value);
        }
        Ok(object)
    }

    /// Error raised by `throw value`.
    ///
    /// Objects supply `type` and `reason`; anything else becomes the reason
    /// of an error with the default code.
    fn throw_value(&self, value: &Value) -> EvalError {
        match value {
            Value::Object(_) => {
                let code = self
                    .space
                    .object_get(value, "type")
                    .and_then(|v| v.as_str().map(ToString::to_string))
                    .unwrap_or_else(|| DEFAULT_THROW_CODE.to_string());
                let reason = self
                    .space
                    .object_get(value, "reason")
                    .map_or_else(|| self.space.to_display_string(value), |r| {
                        self.space.to_display_string(&r)
                    });
                thrown(&code, reason)
            }
            other => thrown(DEFAULT_THROW_CODE, self.space.to_display_string(other)),
        }
    }

    /// `{ type, reason, line }` object handed to a `catch` parameter.
    pub(crate) fn error_object(&mut self, err: &EvalError) -> Value {
        let data = ObjectData::with_properties([
            ("type", Value::string(err.code().as_str())),
            ("reason", Value::string(err.message.as_str())),
            ("line", Value::Int(i64::from(err.line()))),
        ]);
        self.space.alloc_object(data)
    }

    /// Call every listener of `event` on `object` with `data`, in
    /// registration order. Listeners declaring no parameters get no
    /// arguments.
    #[tracing::instrument(level = "debug", skip(self, ep, object, data, source_info))]
    pub fn trigger_event(
        &mut self,
        ep: &mut ExecutionPointer,
        object: &Value,
        event: &str,
        data: Value,
        source_info: &SourceInfo,
    ) -> Result<(), EvalError> {
        self.executing(|this| {
            for callback in this.space.listeners(object, event) {
                let args = if this.space.callable_arity(&callback) == Some(0) {
                    Vec::new()
                } else {
                    vec![data.clone()]
                };
                this.call_value(ep, &callback, args, source_info)?;
            }
            Ok(())
        })
    }
}

/// Map the result of a function or program body to its value, turning
/// signals that escaped their loop into errors.
pub(crate) fn finish_body(result: EvalResult, ep: &ExecutionPointer) -> Result<Value, EvalError> {
    match result {
        Ok(value) | Err(ControlAction::Return(value)) => Ok(value),
        Err(ControlAction::Break) => Err(ep.attach_backtrace(loop_control_outside_loop("break"))),
        Err(ControlAction::Continue) => {
            Err(ep.attach_backtrace(loop_control_outside_loop("continue")))
        }
        Err(ControlAction::Error(err)) => Err(ep.attach_backtrace(*err)),
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Undefined => Value::Undefined,
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::string(s.as_str()),
    }
}

/// Operand an operator cannot do without. Its absence means the tree
/// was not built by a valid parser.
fn required(operand: Option<&Operand>, op: Operator) -> &Operand {
    match operand {
        Some(operand) => operand,
        None => invariant_violation(&format!(
            "operator `{}` is missing an operand",
            op.as_symbol()
        )),
    }
}

/// Property name on the right of `.`.
fn operand_name(operand: &Operand) -> &str {
    match &operand.kind {
        OperandKind::Variable(variable) => &variable.name,
        OperandKind::Literal(Literal::String(s)) => s,
        _ => invariant_violation("property access with a non-name key"),
    }
}

fn length(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}
