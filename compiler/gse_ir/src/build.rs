//! Node constructors.
//!
//! Hosts that synthesize scripts (prologues, generated handlers) and the
//! test suites build trees through these helpers instead of spelling out
//! every struct. All nodes get empty source info unless attached with
//! `Expression::with_source_info` or [`statement_at`].
//!
//! ```text
//! use gse_ir::build::*;
//! let p = program(vec![
//!     statement(let_("x", int(1))),
//!     statement(let_("y", binary(Operator::Add, var("x"), int(2)))),
//! ]);
//! ```

use std::sync::Arc;

use crate::{
    CatchHandler, Conditional, ConditionalKind, Control, Expression, FunctionDef, Literal,
    LoopControl, Operand, OperandKind, Operator, Program, Scope, SourceInfo, Statement, Variable,
    VariableHint,
};

fn operand(kind: OperandKind) -> Operand {
    Operand {
        source_info: SourceInfo::empty(),
        kind,
    }
}

/// Wrap an expression as an operand, unwrapping plain `Nop` expressions.
pub fn into_operand(expr: Expression) -> Operand {
    match expr {
        Expression {
            op: Operator::Nop,
            a: Some(a),
            b: None,
            ..
        } => *a,
        other => Operand {
            source_info: other.source_info.clone(),
            kind: OperandKind::Expression(other),
        },
    }
}

fn expr(op: Operator, a: Option<Operand>, b: Option<Operand>) -> Expression {
    Expression {
        source_info: SourceInfo::empty(),
        op,
        a: a.map(Box::new),
        b: b.map(Box::new),
    }
}

/// A plain operand expression.
pub fn operand_expr(op: Operand) -> Expression {
    expr(Operator::Nop, Some(op), None)
}

fn literal(lit: Literal) -> Expression {
    operand_expr(operand(OperandKind::Literal(lit)))
}

pub fn undefined() -> Expression {
    literal(Literal::Undefined)
}

pub fn null() -> Expression {
    literal(Literal::Null)
}

pub fn boolean(v: bool) -> Expression {
    literal(Literal::Bool(v))
}

pub fn int(v: i64) -> Expression {
    literal(Literal::Int(v))
}

pub fn float(v: f64) -> Expression {
    literal(Literal::Float(v))
}

pub fn string(v: impl Into<String>) -> Expression {
    literal(Literal::String(v.into()))
}

fn variable(name: &str, hint: VariableHint) -> Operand {
    operand(OperandKind::Variable(Variable {
        source_info: SourceInfo::empty(),
        name: name.to_string(),
        hint,
    }))
}

/// Reference to a variable.
pub fn var(name: &str) -> Expression {
    operand_expr(variable(name, VariableHint::None))
}

/// `let name = value`
pub fn let_(name: &str, value: Expression) -> Expression {
    expr(
        Operator::Assign,
        Some(variable(name, VariableHint::Let)),
        Some(into_operand(value)),
    )
}

/// `const name = value`
pub fn const_(name: &str, value: Expression) -> Expression {
    expr(
        Operator::Assign,
        Some(variable(name, VariableHint::Const)),
        Some(into_operand(value)),
    )
}

/// `target = value`
pub fn assign(target: Expression, value: Expression) -> Expression {
    binary(Operator::Assign, target, value)
}

pub fn binary(op: Operator, a: Expression, b: Expression) -> Expression {
    expr(op, Some(into_operand(a)), Some(into_operand(b)))
}

/// Operator with only a left operand (`x++`, `x--`).
pub fn postfix(op: Operator, a: Expression) -> Expression {
    expr(op, Some(into_operand(a)), None)
}

/// Operator with only a right operand (`!x`, `return x`, `throw x`).
pub fn prefix(op: Operator, b: Expression) -> Expression {
    expr(op, None, Some(into_operand(b)))
}

/// `return value` or a bare `return`.
pub fn ret(value: Option<Expression>) -> Expression {
    expr(Operator::Return, None, value.map(into_operand))
}

pub fn brk() -> Expression {
    operand_expr(operand(OperandKind::LoopControl(LoopControl::Break)))
}

pub fn cont() -> Expression {
    operand_expr(operand(OperandKind::LoopControl(LoopControl::Continue)))
}

/// `object.key`
pub fn child(object: Expression, key: &str) -> Expression {
    expr(
        Operator::Child,
        Some(into_operand(object)),
        Some(variable(key, VariableHint::None)),
    )
}

/// `target[index]`
pub fn at(target: Expression, index: Expression) -> Expression {
    binary(Operator::At, target, index)
}

/// `target[from:to]`
pub fn range(target: Expression, from: Option<Expression>, to: Option<Expression>) -> Expression {
    expr(
        Operator::At,
        Some(into_operand(target)),
        Some(operand(OperandKind::Range {
            from: from.map(Box::new),
            to: to.map(Box::new),
        })),
    )
}

/// `target []= value`
pub fn append(target: Expression, value: Expression) -> Expression {
    binary(Operator::Append, target, value)
}

pub fn array(elements: Vec<Expression>) -> Expression {
    operand_expr(operand(OperandKind::Array(elements)))
}

pub fn object(properties: Vec<(&str, Expression)>) -> Expression {
    operand_expr(operand(OperandKind::Object(
        properties
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )))
}

/// `(a, b) => { body }`
pub fn function(parameters: &[&str], body: Vec<Control>) -> Expression {
    operand_expr(operand(OperandKind::Function(FunctionDef {
        parameters: parameters.iter().map(ToString::to_string).collect(),
        body: Arc::new(program(body)),
    })))
}

pub fn call(callable: Expression, arguments: Vec<Expression>) -> Expression {
    operand_expr(operand(OperandKind::Call {
        callable: Box::new(callable),
        arguments,
    }))
}

pub fn statement(body: Expression) -> Control {
    Control::Statement(Statement {
        source_info: body.source_info.clone(),
        body,
    })
}

/// Statement located at `line` of `file`. The expression, and the operand
/// of a plain operand expression, get the same info.
pub fn statement_at(file: &str, line: u32, mut body: Expression) -> Control {
    let source_info = SourceInfo::at(file, line, 1);
    if body.op == Operator::Nop {
        if let Some(a) = body.a.as_deref_mut() {
            a.source_info = source_info.clone();
        }
    }
    statement(body.with_source_info(source_info))
}

pub fn scope(body: Vec<Control>) -> Scope {
    Scope {
        source_info: SourceInfo::empty(),
        body,
    }
}

fn conditional(kind: ConditionalKind) -> Conditional {
    Conditional {
        source_info: SourceInfo::empty(),
        kind,
    }
}

/// `if (condition) { body } [otherwise]`
pub fn if_(condition: Expression, body: Vec<Control>, otherwise: Option<Conditional>) -> Conditional {
    conditional(ConditionalKind::If {
        condition,
        body: scope(body),
        otherwise: otherwise.map(Box::new),
    })
}

pub fn else_(body: Vec<Control>) -> Conditional {
    conditional(ConditionalKind::Else { body: scope(body) })
}

pub fn while_(condition: Expression, body: Vec<Control>) -> Control {
    Control::Conditional(conditional(ConditionalKind::While {
        condition,
        body: scope(body),
    }))
}

pub fn for_in(name: &str, iterable: Expression, body: Vec<Control>) -> Control {
    Control::Conditional(conditional(ConditionalKind::ForIn {
        variable: Variable {
            source_info: SourceInfo::empty(),
            name: name.to_string(),
            hint: VariableHint::Let,
        },
        iterable,
        body: scope(body),
    }))
}

/// `catch` arm; `code: None` catches everything.
pub fn catch(code: Option<&str>, parameter: Option<&str>, body: Vec<Control>) -> CatchHandler {
    CatchHandler {
        source_info: SourceInfo::empty(),
        code: code.map(ToString::to_string),
        parameter: parameter.map(ToString::to_string),
        body: scope(body),
    }
}

pub fn try_(body: Vec<Control>, handlers: Vec<CatchHandler>) -> Control {
    Control::Conditional(conditional(ConditionalKind::Try {
        body: scope(body),
        handlers,
    }))
}

pub fn conditional_control(c: Conditional) -> Control {
    Control::Conditional(c)
}

pub fn program(body: Vec<Control>) -> Program {
    Program {
        source_info: SourceInfo::empty(),
        body: scope(body),
    }
}
