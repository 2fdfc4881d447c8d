//! Program tree nodes.
//!
//! The shape follows the evaluation contract of the interpreter: a
//! `Program` owns a `Scope`, a scope is a sequence of `Control` nodes,
//! and every computation is an `Expression` of the form `a op b` where
//! either side may be absent.

use std::sync::Arc;

use crate::SourceInfo;

/// A complete program, or the body of a function.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub source_info: SourceInfo,
    pub body: Scope,
}

/// Ordered sequence of controls evaluated in their own child context.
#[derive(Clone, Debug, PartialEq)]
pub struct Scope {
    pub source_info: SourceInfo,
    pub body: Vec<Control>,
}

/// One entry of a scope body.
#[derive(Clone, Debug, PartialEq)]
pub enum Control {
    Statement(Statement),
    Conditional(Conditional),
}

impl Control {
    pub fn source_info(&self) -> &SourceInfo {
        match self {
            Control::Statement(s) => &s.source_info,
            Control::Conditional(c) => &c.source_info,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub source_info: SourceInfo,
    pub body: Expression,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Conditional {
    pub source_info: SourceInfo,
    pub kind: ConditionalKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConditionalKind {
    /// `if (cond) { body }`, optionally chained to an `elseif` / `else`.
    If {
        condition: Expression,
        body: Scope,
        otherwise: Option<Box<Conditional>>,
    },
    Else {
        body: Scope,
    },
    While {
        condition: Expression,
        body: Scope,
    },
    /// `for (x in iterable) { body }`, over array values or object keys.
    ForIn {
        variable: Variable,
        iterable: Expression,
        body: Scope,
    },
    Try {
        body: Scope,
        handlers: Vec<CatchHandler>,
    },
}

/// `catch` arm. `code: None` catches every error.
#[derive(Clone, Debug, PartialEq)]
pub struct CatchHandler {
    pub source_info: SourceInfo,
    pub code: Option<String>,
    pub parameter: Option<String>,
    pub body: Scope,
}

/// `a op b`. `Operator::Nop` with only `a` is a plain operand.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    pub source_info: SourceInfo,
    pub op: Operator,
    pub a: Option<Box<Operand>>,
    pub b: Option<Box<Operand>>,
}

impl Expression {
    /// Attach source info to this expression.
    #[must_use]
    pub fn with_source_info(mut self, source_info: SourceInfo) -> Self {
        self.source_info = source_info;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Operand {
    pub source_info: SourceInfo,
    pub kind: OperandKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OperandKind {
    Literal(Literal),
    Variable(Variable),
    Array(Vec<Expression>),
    /// Object literal; properties keep their declaration order.
    Object(Vec<(String, Expression)>),
    Expression(Expression),
    Function(FunctionDef),
    Call {
        callable: Box<Expression>,
        arguments: Vec<Expression>,
    },
    LoopControl(LoopControl),
    /// `[from:to]` range selector used on the right of `Operator::At`.
    Range {
        from: Option<Box<Expression>>,
        to: Option<Box<Expression>>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VariableHint {
    None,
    Let,
    Const,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub source_info: SourceInfo,
    pub name: String,
    pub hint: VariableHint,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LoopControl {
    Break,
    Continue,
}

/// Function literal. The body is shared with every closure created from it.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub parameters: Vec<String>,
    pub body: Arc<Program>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Nop,
    Assign,
    Return,
    Throw,
    Not,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    Inc,
    Dec,
    IncBy,
    DecBy,
    MultBy,
    DivBy,
    ModBy,
    Child,
    At,
    Append,
}

impl Operator {
    /// Surface syntax of the operator, for diagnostics.
    pub fn as_symbol(self) -> &'static str {
        match self {
            Operator::Nop => "",
            Operator::Assign => "=",
            Operator::Return => "return",
            Operator::Throw => "throw",
            Operator::Not => "!",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mult => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Inc => "++",
            Operator::Dec => "--",
            Operator::IncBy => "+=",
            Operator::DecBy => "-=",
            Operator::MultBy => "*=",
            Operator::DivBy => "/=",
            Operator::ModBy => "%=",
            Operator::Child => ".",
            Operator::At => "[]",
            Operator::Append => "[]=",
        }
    }

    /// The arithmetic operator a compound assignment applies.
    pub fn compound_base(self) -> Option<Operator> {
        match self {
            Operator::IncBy => Some(Operator::Add),
            Operator::DecBy => Some(Operator::Sub),
            Operator::MultBy => Some(Operator::Mult),
            Operator::DivBy => Some(Operator::Div),
            Operator::ModBy => Some(Operator::Mod),
            _ => None,
        }
    }
}
