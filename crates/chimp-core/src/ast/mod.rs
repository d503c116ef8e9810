// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Abstract Syntax Tree (AST) definitions for Chimp.
//!
//! Every node kind is a closed enum variant so the compiler can match
//! exhaustively. `Display` renders nodes back into canonical source text.

use std::fmt;

/// A complete Chimp program (or one REPL input).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    /// The statements in the program
    pub body: Vec<Statement>,
}

/// An identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    /// The name of the identifier
    pub name: String,
}

impl Identifier {
    /// Creates an identifier from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A Chimp statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let name = value;`
    Let(LetStatement),
    /// Expression statement
    Expression(Expression),
    /// `return value;`
    Return(Option<Expression>),
    /// Block statement { ... }
    Block(BlockStatement),
    /// If statement
    If(IfStatement),
    /// While statement
    While(WhileStatement),
    /// Do-while statement
    DoWhile(DoWhileStatement),
    /// For statement
    For(ForStatement),
    /// Break statement
    Break,
    /// Continue statement
    Continue,
}

/// A `let` binding.
#[derive(Debug, Clone, PartialEq)]
pub struct LetStatement {
    /// The bound name
    pub name: Identifier,
    /// Initial value; `None` binds null
    pub value: Option<Expression>,
}

/// A block of statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockStatement {
    /// The statements in the block
    pub body: Vec<Statement>,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// The condition
    pub condition: Expression,
    /// Statement run when the condition is truthy
    pub consequence: Box<Statement>,
    /// Statement run otherwise
    pub alternative: Option<Box<Statement>>,
}

/// A while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    /// The loop condition
    pub condition: Expression,
    /// The loop body
    pub body: Box<Statement>,
}

/// A do-while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileStatement {
    /// The loop body
    pub body: Box<Statement>,
    /// The loop condition, checked after each iteration
    pub condition: Expression,
}

/// A for statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    /// Initializer (let or expression statement)
    pub init: Option<Box<Statement>>,
    /// Loop condition; absent means loop forever
    pub condition: Option<Expression>,
    /// Update expression, run after each iteration
    pub update: Option<Expression>,
    /// The loop body
    pub body: Box<Statement>,
}

/// A Chimp expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Identifier reference
    Identifier(Identifier),
    /// Integer literal
    Integer(i64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// `null`
    Null,
    /// Prefix operation (-x, !x)
    Prefix(PrefixExpression),
    /// Arithmetic or comparison operation
    Infix(InfixExpression),
    /// Short-circuit `&&` / `||`
    Logical(LogicalExpression),
    /// Assignment (`=`, `+=`, ...)
    Assign(AssignExpression),
    /// Array literal
    Array(Vec<Expression>),
    /// Hash literal, pairs in source order
    Hash(Vec<(Expression, Expression)>),
    /// Index expression `left[index]`
    Index(IndexExpression),
    /// Function literal
    Function(FunctionLiteral),
    /// Call expression
    Call(CallExpression),
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    /// -
    Minus,
    /// !
    Bang,
}

/// Arithmetic and comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    /// +
    Add,
    /// -
    Sub,
    /// *
    Mul,
    /// /
    Div,
    /// %
    Mod,
    /// ==
    Equal,
    /// !=
    NotEqual,
    /// <
    LessThan,
    /// <=
    LessEqual,
    /// >
    GreaterThan,
    /// >=
    GreaterEqual,
}

impl InfixOperator {
    /// Source text of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            InfixOperator::Add => "+",
            InfixOperator::Sub => "-",
            InfixOperator::Mul => "*",
            InfixOperator::Div => "/",
            InfixOperator::Mod => "%",
            InfixOperator::Equal => "==",
            InfixOperator::NotEqual => "!=",
            InfixOperator::LessThan => "<",
            InfixOperator::LessEqual => "<=",
            InfixOperator::GreaterThan => ">",
            InfixOperator::GreaterEqual => ">=",
        }
    }
}

/// Short-circuit operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// &&
    And,
    /// ||
    Or,
}

/// A prefix expression.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixExpression {
    /// The operator
    pub operator: PrefixOperator,
    /// The operand
    pub right: Box<Expression>,
}

/// An infix expression.
#[derive(Debug, Clone, PartialEq)]
pub struct InfixExpression {
    /// The operator
    pub operator: InfixOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand
    pub right: Box<Expression>,
}

/// A logical expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    /// The operator
    pub operator: LogicalOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand, evaluated only when needed
    pub right: Box<Expression>,
}

/// An assignment expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignExpression {
    /// `None` for plain `=`, otherwise the compound operator
    pub operator: Option<InfixOperator>,
    /// Assignment target; only identifiers are valid
    pub target: Box<Expression>,
    /// Assigned value
    pub value: Box<Expression>,
}

/// An index expression.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpression {
    /// The indexed collection
    pub left: Box<Expression>,
    /// The index
    pub index: Box<Expression>,
}

/// A function literal.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLiteral {
    /// Name used for self-reference inside the body
    pub name: Option<String>,
    /// Parameter names
    pub parameters: Vec<Identifier>,
    /// Function body
    pub body: BlockStatement,
}

/// A call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The callee
    pub function: Box<Expression>,
    /// Call arguments
    pub arguments: Vec<Expression>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stmt) in self.body.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{stmt}")?;
        }
        Ok(())
    }
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for stmt in &self.body {
            write!(f, " {stmt}")?;
        }
        f.write_str(" }")
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let(stmt) => match &stmt.value {
                Some(value) => write!(f, "let {} = {value};", stmt.name.name),
                None => write!(f, "let {};", stmt.name.name),
            },
            Statement::Expression(expr) => write!(f, "{expr};"),
            Statement::Return(Some(value)) => write!(f, "return {value};"),
            Statement::Return(None) => f.write_str("return;"),
            Statement::Block(block) => write!(f, "{block}"),
            Statement::If(stmt) => {
                write!(f, "if ({}) {}", stmt.condition, stmt.consequence)?;
                if let Some(alt) = &stmt.alternative {
                    write!(f, " else {alt}")?;
                }
                Ok(())
            }
            Statement::While(stmt) => write!(f, "while ({}) {}", stmt.condition, stmt.body),
            Statement::DoWhile(stmt) => {
                write!(f, "do {} while ({});", stmt.body, stmt.condition)
            }
            Statement::For(stmt) => {
                f.write_str("for (")?;
                match &stmt.init {
                    Some(init) => write!(f, "{init}")?,
                    None => f.write_str(";")?,
                }
                if let Some(cond) = &stmt.condition {
                    write!(f, " {cond}")?;
                }
                f.write_str(";")?;
                if let Some(update) = &stmt.update {
                    write!(f, " {update}")?;
                }
                write!(f, ") {}", stmt.body)
            }
            Statement::Break => f.write_str("break;"),
            Statement::Continue => f.write_str("continue;"),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(id) => write!(f, "{id}"),
            Expression::Integer(n) => write!(f, "{n}"),
            Expression::String(s) => write!(f, "{s:?}"),
            Expression::Boolean(b) => write!(f, "{b}"),
            Expression::Null => f.write_str("null"),
            Expression::Prefix(expr) => {
                let op = match expr.operator {
                    PrefixOperator::Minus => "-",
                    PrefixOperator::Bang => "!",
                };
                write!(f, "({op}{})", expr.right)
            }
            Expression::Infix(expr) => {
                write!(f, "({} {} {})", expr.left, expr.operator.as_str(), expr.right)
            }
            Expression::Logical(expr) => {
                let op = match expr.operator {
                    LogicalOperator::And => "&&",
                    LogicalOperator::Or => "||",
                };
                write!(f, "({} {op} {})", expr.left, expr.right)
            }
            Expression::Assign(expr) => {
                let op = expr.operator.map(|op| op.as_str()).unwrap_or("");
                write!(f, "{} {op}= {}", expr.target, expr.value)
            }
            Expression::Array(elements) => {
                f.write_str("[")?;
                write_list(f, elements)?;
                f.write_str("]")
            }
            Expression::Hash(pairs) => {
                f.write_str("{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Expression::Index(expr) => write!(f, "({}[{}])", expr.left, expr.index),
            Expression::Function(func) => {
                f.write_str("func")?;
                if let Some(name) = &func.name {
                    write!(f, " {name}")?;
                }
                f.write_str("(")?;
                write_list(f, &func.parameters)?;
                write!(f, ") {}", func.body)
            }
            Expression::Call(call) => {
                write!(f, "{}(", call.function)?;
                write_list(f, &call.arguments)?;
                f.write_str(")")
            }
        }
    }
}
