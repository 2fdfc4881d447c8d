//! Assignable references.
//!
//! A [`Place`] is what the left side of an assignment resolves to: a
//! binding in a specific context, an object property, an array element or
//! an array range. It is resolved once, then read with `deref` and written
//! with `write_by_ref`, so `a[i()] += 1` evaluates `i()` a single time.

use gse_ir::{Expression, Operand, OperandKind, Operator, SourceInfo, Variable, VariableHint};

use super::{operand_name, required, Interpreter};
use crate::context::{AssignError, ContextRef, Mutability};
use crate::errors::{
    cannot_assign_const, index_out_of_bounds, invalid_assignment_target, invalid_operands,
    invalid_range, type_mismatch, unresolved_variable, ControlAction, EvalError, EvalResult,
};
use crate::execution_pointer::ExecutionPointer;
use crate::value::{GcRef, Value};

#[derive(Clone, Debug, PartialEq)]
pub enum Place {
    /// Binding `name` of `context`. When `declared` is false no context
    /// binds the name yet and `context` is where a write defines it.
    Variable {
        context: ContextRef,
        name: String,
        declared: bool,
    },
    Property {
        object: Value,
        key: String,
    },
    Index {
        array: GcRef,
        index: usize,
    },
    /// Elements `from..to`.
    Range {
        array: GcRef,
        from: usize,
        to: usize,
    },
}

/// Accept `from..to` over an array of `len` elements iff
/// `0 <= from <= to <= len`.
pub fn validate_range(len: usize, from: i64, to: i64) -> Result<(usize, usize), EvalError> {
    match (usize::try_from(from), usize::try_from(to)) {
        (Ok(start), Ok(end)) if start <= end && end <= len => Ok((start, end)),
        _ => Err(invalid_range(from, to, len)),
    }
}

/// Accept `index` iff `0 <= index < len`.
pub fn validate_index(len: usize, index: i64) -> Result<usize, EvalError> {
    match usize::try_from(index) {
        Ok(i) if i < len => Ok(i),
        _ => Err(index_out_of_bounds(index, len)),
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl Interpreter<'_> {
    /// `a = b`, `let a = b`, `const a = b`.
    pub(super) fn evaluate_assign(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        expression: &Expression,
    ) -> EvalResult {
        let target = required(expression.a.as_deref(), Operator::Assign);
        let source = required(expression.b.as_deref(), Operator::Assign);

        if let OperandKind::Variable(variable) = &target.kind {
            let mutability = match variable.hint {
                VariableHint::Let => Some(Mutability::Mutable),
                VariableHint::Const => Some(Mutability::Immutable),
                VariableHint::None => None,
            };
            if let Some(mutability) = mutability {
                let value = self.evaluate_operand(ctx, ep, source)?;
                self.space.name_function(&value, &variable.name);
                self.space
                    .context_define(ctx, &variable.name, value.clone(), mutability);
                return Ok(value);
            }
        }

        let place = self.evaluate_place(ctx, ep, target)?;
        let value = self.evaluate_operand(ctx, ep, source)?;
        self.write_by_ref(&place, value.clone(), &expression.source_info)?;
        Ok(value)
    }

    /// Resolve a variable to the context that declares it.
    pub(crate) fn evaluate_variable(&self, ctx: ContextRef, variable: &Variable) -> Place {
        match self.space.context_binding_owner(ctx, &variable.name) {
            Some(owner) => Place::Variable {
                context: owner,
                name: variable.name.clone(),
                declared: true,
            },
            None => Place::Variable {
                context: ctx,
                name: variable.name.clone(),
                declared: false,
            },
        }
    }

    pub(crate) fn evaluate_place(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        operand: &Operand,
    ) -> Result<Place, ControlAction> {
        let place = match &operand.kind {
            OperandKind::Variable(variable) => Ok(self.evaluate_variable(ctx, variable)),
            OperandKind::Expression(expression) => self.evaluate_expression_place(ctx, ep, expression),
            _ => Err(invalid_assignment_target().into()),
        };
        place.map_err(|action| action.with_source_info_if_error(&operand.source_info))
    }

    fn evaluate_expression_place(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        expression: &Expression,
    ) -> Result<Place, ControlAction> {
        let place = match expression.op {
            Operator::Nop => match expression.a.as_deref() {
                Some(inner) => self.evaluate_place(ctx, ep, inner),
                None => Err(invalid_assignment_target().into()),
            },
            Operator::Child => {
                let object =
                    self.evaluate_operand(ctx, ep, required(expression.a.as_deref(), Operator::Child))?;
                let key = operand_name(required(expression.b.as_deref(), Operator::Child));
                match object {
                    Value::Object(_) => Ok(Place::Property {
                        object,
                        key: key.to_string(),
                    }),
                    other => Err(type_mismatch("Object", other.type_name()).into()),
                }
            }
            Operator::At => self.evaluate_at_place(ctx, ep, expression),
            _ => Err(invalid_assignment_target().into()),
        };
        place.map_err(|action| action.with_source_info_if_error(&expression.source_info))
    }

    /// `target[index]`, `target[from:to]` or `object["key"]`.
    pub(super) fn evaluate_at_place(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        expression: &Expression,
    ) -> Result<Place, ControlAction> {
        let target = self.evaluate_operand(ctx, ep, required(expression.a.as_deref(), Operator::At))?;
        let selector = required(expression.b.as_deref(), Operator::At);

        if let OperandKind::Range { from, to } = &selector.kind {
            let Value::Array(array) = &target else {
                return Err(type_mismatch("Array", target.type_name()).into());
            };
            let array = *array;
            let from = match from {
                Some(e) => self.evaluate_int(ctx, ep, e)?,
                None => 0,
            };
            let to = match to {
                Some(e) => Some(self.evaluate_int(ctx, ep, e)?),
                None => None,
            };
            let len = self.space.array(array).len();
            let (from, to) = validate_range(len, from, to.unwrap_or_else(|| to_i64(len)))?;
            return Ok(Place::Range { array, from, to });
        }

        let key = self.evaluate_operand(ctx, ep, selector)?;
        match (&target, &key) {
            (Value::Array(array), Value::Int(index)) => {
                let len = self.space.array(*array).len();
                Ok(Place::Index {
                    array: *array,
                    index: validate_index(len, *index)?,
                })
            }
            (Value::Object(_), Value::String(k)) => Ok(Place::Property {
                object: target.clone(),
                key: k.to_string(),
            }),
            _ => Err(invalid_operands(
                Operator::At.as_symbol(),
                target.type_name(),
                key.type_name(),
            )
            .into()),
        }
    }

    fn evaluate_int(
        &mut self,
        ctx: ContextRef,
        ep: &mut ExecutionPointer,
        expression: &Expression,
    ) -> Result<i64, ControlAction> {
        match self.evaluate_expression(ctx, ep, expression)? {
            Value::Int(n) => Ok(n),
            other => Err(type_mismatch("Int", other.type_name()).into()),
        }
    }

    /// Current value behind a place. Range reads copy into a new array.
    pub(crate) fn deref(&mut self, place: &Place) -> Result<Value, EvalError> {
        match place {
            Place::Variable {
                context,
                name,
                declared,
            } => {
                if *declared {
                    self.space.context_resolve(*context, name)
                } else {
                    Err(unresolved_variable(name))
                }
            }
            Place::Property { object, key } => {
                Ok(self.space.object_get(object, key).unwrap_or(Value::Undefined))
            }
            Place::Index { array, index } => {
                let items = self.space.array(*array);
                items
                    .get(*index)
                    .cloned()
                    .ok_or_else(|| index_out_of_bounds(to_i64(*index), items.len()))
            }
            Place::Range { array, from, to } => {
                let items = self.space.array(*array);
                let slice = items
                    .get(*from..*to)
                    .map(<[Value]>::to_vec)
                    .ok_or_else(|| invalid_range(to_i64(*from), to_i64(*to), items.len()))?;
                Ok(self.space.alloc_array(slice))
            }
        }
    }

    /// Write through a place. Property writes run the setter hook of wrapped
    /// objects; range writes splice in the elements of an array.
    pub(crate) fn write_by_ref(
        &mut self,
        place: &Place,
        value: Value,
        source_info: &SourceInfo,
    ) -> Result<(), EvalError> {
        match place {
            Place::Variable { context, name, .. } => {
                self.space.name_function(&value, name);
                match self.space.context_assign(*context, name, value.clone()) {
                    Ok(()) => Ok(()),
                    Err(AssignError::Undefined) => {
                        self.space
                            .context_define(*context, name, value, Mutability::Mutable);
                        Ok(())
                    }
                    Err(AssignError::Immutable) => Err(cannot_assign_const(name)),
                }
            }
            Place::Property { object, key } => {
                self.space.name_function(&value, key);
                self.space.object_set(object, key, value, source_info)
            }
            Place::Index { array, index } => {
                let items = self.space.array_mut(*array);
                let len = items.len();
                match items.get_mut(*index) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(index_out_of_bounds(to_i64(*index), len)),
                }
            }
            Place::Range { array, from, to } => {
                let Value::Array(source) = &value else {
                    return Err(type_mismatch("Array", value.type_name()));
                };
                let replacement = self.space.array(*source).clone();
                let items = self.space.array_mut(*array);
                if *to > items.len() {
                    return Err(invalid_range(to_i64(*from), to_i64(*to), items.len()));
                }
                let tail = items.split_off(*to);
                items.truncate(*from);
                items.extend(replacement);
                items.extend(tail);
                Ok(())
            }
        }
    }
}
