//! Calling closures and native functions.

use gse_ir::{Expression, SourceInfo};

use super::{finish_body, Interpreter};
use crate::callable::{CallTarget, FunctionData, NativeCall, NativeFunction};
use crate::context::{ContextRef, Mutability};
use crate::errors::{
    not_callable, wrong_argument_count, ControlAction, EvalError, EvalResult, TraceFrame,
};
use crate::execution_pointer::ExecutionPointer;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

impl Interpreter<'_> {
    pub(super) fn evaluate_call(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        callable: &Expression,
        arguments: &[Expression],
        source_info: &SourceInfo,
    ) -> EvalResult {
        let callee = self.evaluate_expression(ctx, ep, callable)?;
        let mut args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.evaluate_expression(ctx, ep, argument)?);
        }
        let site = if source_info.is_empty() {
            &callable.source_info
        } else {
            source_info
        };
        self.call_value(ep, &callee, args, site)
            .map_err(ControlAction::from)
    }

    /// Call `callee` with evaluated arguments. `source_info` is the call site.
    pub fn call_value(
        &mut self,
        ep: &mut ExecutionPointer,
        callee: &Value,
        args: Vec<Value>,
        source_info: &SourceInfo,
    ) -> Result<Value, EvalError> {
        let Value::Callable(r) = callee else {
            return Err(not_callable(callee.type_name()).with_source_info_if_missing(source_info));
        };
        let target = self.space.call_target(*r);
        self.executing(|this| match target {
            CallTarget::Function(function) => this.call_function(ep, &function, args, source_info),
            CallTarget::Native(native) => this.call_native(ep, &native, args, source_info),
        })
    }

    /// Bind arguments in a child of the captured context and run the body.
    /// Arity is checked before anything is bound.
    #[tracing::instrument(level = "trace", skip_all, fields(name = function.display_name()))]
    fn call_function(
        &mut self,
        ep: &mut ExecutionPointer,
        function: &FunctionData,
        args: Vec<Value>,
        source_info: &SourceInfo,
    ) -> Result<Value, EvalError> {
        let name = function.display_name();
        if args.len() != function.parameters.len() {
            return Err(
                wrong_argument_count(name, function.parameters.len(), args.len())
                    .with_source_info_if_missing(source_info),
            );
        }
        ep.push(TraceFrame {
            name: name.to_string(),
            source_info: source_info.clone(),
        })
        .map_err(|e| e.with_source_info_if_missing(source_info))?;

        let call_ctx = self.space.fork_context(function.context, source_info.clone());
        for (parameter, argument) in function.parameters.iter().zip(args) {
            self.space
                .context_define(call_ctx, parameter, argument, Mutability::Mutable);
        }
        let result =
            ensure_sufficient_stack(|| self.evaluate_scope_in(call_ctx, ep, &function.body.body));
        let result = match result {
            Ok(_) => Ok(Value::Undefined),
            other => finish_body(other, ep),
        };
        ep.pop();
        result
    }

    #[tracing::instrument(level = "trace", skip_all, fields(name = %native.name))]
    fn call_native(
        &mut self,
        ep: &mut ExecutionPointer,
        native: &NativeFunction,
        args: Vec<Value>,
        source_info: &SourceInfo,
    ) -> Result<Value, EvalError> {
        if let Some(arity) = native.arity {
            if args.len() != arity {
                return Err(wrong_argument_count(&native.name, arity, args.len())
                    .with_source_info_if_missing(source_info));
            }
        }
        ep.push(TraceFrame {
            name: native.name.clone(),
            source_info: source_info.clone(),
        })
        .map_err(|e| e.with_source_info_if_missing(source_info))?;

        let result = {
            let mut call = NativeCall {
                interpreter: &mut *self,
                ep: &mut *ep,
                source_info,
                captures: &native.captures,
            };
            (native.func)(&mut call, args)
        };
        let result =
            result.map_err(|e| ep.attach_backtrace(e.with_source_info_if_missing(source_info)));
        ep.pop();
        result
    }
}
