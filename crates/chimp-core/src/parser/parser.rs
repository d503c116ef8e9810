// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The main parser implementation.

use crate::ast::*;
use crate::error::Error;
use crate::lexer::{Scanner, Span, Token, TokenKind};

/// A recursive descent parser for Chimp.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Token,
    previous: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self {
            scanner,
            current,
            previous: Token::new(TokenKind::Eof, Span::new(0, 0)),
        }
    }

    /// Parses the source code into a Program AST node.
    pub fn parse_program(&mut self) -> Result<Program, Error> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        Ok(Program { body })
    }

    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Result<Statement, Error> {
        match &self.current.kind {
            TokenKind::Let => {
                let stmt = self.parse_let_binding()?;
                self.skip_semicolon();
                Ok(Statement::Let(stmt))
            }
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Break => {
                self.advance();
                self.skip_semicolon();
                Ok(Statement::Break)
            }
            TokenKind::Continue => {
                self.advance();
                self.skip_semicolon();
                Ok(Statement::Continue)
            }
            TokenKind::LeftBrace => Ok(Statement::Block(self.parse_block_body()?)),
            _ => self.parse_expression_statement(),
        }
    }

    /// Parses `let name [= value]` without the trailing semicolon.
    fn parse_let_binding(&mut self) -> Result<LetStatement, Error> {
        self.advance(); // consume 'let'
        let name = self.expect_identifier()?;

        let value = if self.check(&TokenKind::Equal) {
            self.advance();
            let mut value = self.parse_expression()?;
            name_function_literal(&mut value, &name);
            Some(value)
        } else {
            None
        };

        Ok(LetStatement { name, value })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'return'

        let value = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RightBrace)
            || self.is_at_end()
        {
            None
        } else {
            Some(self.parse_expression()?)
        };

        self.skip_semicolon();
        Ok(Statement::Return(value))
    }

    fn parse_if_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'if'
        let condition = self.parse_parenthesized()?;
        let consequence = Box::new(self.parse_statement()?);

        let alternative = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::If(IfStatement {
            condition,
            consequence,
            alternative,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'while'
        let condition = self.parse_parenthesized()?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While(WhileStatement { condition, body }))
    }

    fn parse_do_while_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'do'
        let body = Box::new(self.parse_statement()?);
        self.expect(&TokenKind::While)?;
        let condition = self.parse_parenthesized()?;
        self.skip_semicolon();
        Ok(Statement::DoWhile(DoWhileStatement { body, condition }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'for'
        self.expect(&TokenKind::LeftParen)?;

        let init = match &self.current.kind {
            TokenKind::Semicolon => None,
            TokenKind::Let => Some(Box::new(Statement::Let(self.parse_let_binding()?))),
            _ => Some(Box::new(Statement::Expression(self.parse_expression()?))),
        };
        self.expect(&TokenKind::Semicolon)?;

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RightParen)?;

        let body = Box::new(self.parse_statement()?);

        Ok(Statement::For(ForStatement {
            init,
            condition,
            update,
            body,
        }))
    }

    fn parse_block_body(&mut self) -> Result<BlockStatement, Error> {
        self.expect(&TokenKind::LeftBrace)?;
        let mut body = Vec::new();

        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        self.expect(&TokenKind::RightBrace)?;
        Ok(BlockStatement { body })
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, Error> {
        let expr = self.parse_expression()?;
        self.skip_semicolon();
        Ok(Statement::Expression(expr))
    }

    fn parse_parenthesized(&mut self) -> Result<Expression, Error> {
        self.expect(&TokenKind::LeftParen)?;
        let expr = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        Ok(expr)
    }

    /// Parses an expression.
    pub fn parse_expression(&mut self) -> Result<Expression, Error> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expression, Error> {
        let target = self.parse_logical_or()?;

        let operator = match &self.current.kind {
            TokenKind::Equal => None,
            TokenKind::PlusEqual => Some(InfixOperator::Add),
            TokenKind::MinusEqual => Some(InfixOperator::Sub),
            TokenKind::StarEqual => Some(InfixOperator::Mul),
            TokenKind::SlashEqual => Some(InfixOperator::Div),
            TokenKind::PercentEqual => Some(InfixOperator::Mod),
            _ => return Ok(target),
        };
        self.advance();

        let mut value = self.parse_assignment()?;
        if let (None, Expression::Identifier(name)) = (operator, &target) {
            name_function_literal(&mut value, name);
        }

        Ok(Expression::Assign(AssignExpression {
            operator,
            target: Box::new(target),
            value: Box::new(value),
        }))
    }

    fn parse_logical_or(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_logical_and()?;

        while self.check(&TokenKind::PipePipe) {
            self.advance();
            let right = self.parse_logical_and()?;
            left = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::Or,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_equality()?;

        while self.check(&TokenKind::AmpersandAmpersand) {
            self.advance();
            let right = self.parse_equality()?;
            left = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::And,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_comparison()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::EqualEqual => InfixOperator::Equal,
                TokenKind::NotEqual => InfixOperator::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = infix(operator, left, right);
        }

        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_additive()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::LessThan => InfixOperator::LessThan,
                TokenKind::LessThanEqual => InfixOperator::LessEqual,
                TokenKind::GreaterThan => InfixOperator::GreaterThan,
                TokenKind::GreaterThanEqual => InfixOperator::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = infix(operator, left, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::Plus => InfixOperator::Add,
                TokenKind::Minus => InfixOperator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = infix(operator, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_unary()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::Star => InfixOperator::Mul,
                TokenKind::Slash => InfixOperator::Div,
                TokenKind::Percent => InfixOperator::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = infix(operator, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, Error> {
        let operator = match &self.current.kind {
            TokenKind::Bang => PrefixOperator::Bang,
            TokenKind::Minus => PrefixOperator::Minus,
            _ => return self.parse_call(),
        };
        self.advance();

        let right = self.parse_unary()?;
        Ok(Expression::Prefix(PrefixExpression {
            operator,
            right: Box::new(right),
        }))
    }

    fn parse_call(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(&TokenKind::LeftParen) {
                self.advance();
                let arguments = self.parse_list(&TokenKind::RightParen)?;
                expr = Expression::Call(CallExpression {
                    function: Box::new(expr),
                    arguments,
                });
            } else if self.check(&TokenKind::LeftBracket) {
                self.advance();
                let index = self.parse_expression()?;
                self.expect(&TokenKind::RightBracket)?;
                expr = Expression::Index(IndexExpression {
                    left: Box::new(expr),
                    index: Box::new(index),
                });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parses comma-separated expressions up to and including `end`.
    fn parse_list(&mut self, end: &TokenKind) -> Result<Vec<Expression>, Error> {
        let mut items = Vec::new();

        while !self.check(end) && !self.is_at_end() {
            items.push(self.parse_expression()?);
            if !self.check(end) {
                self.expect(&TokenKind::Comma)?;
            }
        }

        self.expect(end)?;
        Ok(items)
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        let expr = match &self.current.kind {
            TokenKind::Integer(n) => Expression::Integer(*n),
            TokenKind::String(s) => Expression::String(s.clone()),
            TokenKind::True => Expression::Boolean(true),
            TokenKind::False => Expression::Boolean(false),
            TokenKind::Null => Expression::Null,
            TokenKind::Identifier(name) => Expression::Identifier(Identifier::new(name.clone())),
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                return Ok(expr);
            }
            TokenKind::LeftBracket => {
                self.advance();
                return Ok(Expression::Array(self.parse_list(&TokenKind::RightBracket)?));
            }
            TokenKind::LeftBrace => return self.parse_hash_literal(),
            TokenKind::Func => return self.parse_function_literal(),
            TokenKind::Invalid => {
                let text = &self.scanner.source()[self.current.span.start..self.current.span.end];
                return Err(self.error(format!("invalid token '{text}'")));
            }
            other => return Err(self.error(format!("unexpected token '{other}'"))),
        };

        self.advance();
        Ok(expr)
    }

    fn parse_hash_literal(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume '{'
        let mut pairs = Vec::new();

        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            let key = self.parse_expression()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expression()?;
            pairs.push((key, value));

            if !self.check(&TokenKind::RightBrace) {
                self.expect(&TokenKind::Comma)?;
            }
        }

        self.expect(&TokenKind::RightBrace)?;
        Ok(Expression::Hash(pairs))
    }

    fn parse_function_literal(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume 'func'

        let name = if let TokenKind::Identifier(name) = &self.current.kind {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            None
        };

        self.expect(&TokenKind::LeftParen)?;
        let mut parameters = Vec::new();
        while !self.check(&TokenKind::RightParen) && !self.is_at_end() {
            parameters.push(self.expect_identifier()?);
            if !self.check(&TokenKind::RightParen) {
                self.expect(&TokenKind::Comma)?;
            }
        }
        self.expect(&TokenKind::RightParen)?;

        let body = self.parse_block_body()?;

        Ok(Expression::Function(FunctionLiteral {
            name,
            parameters,
            body,
        }))
    }

    // Helper methods

    fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.scanner.next_token());
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn skip_semicolon(&mut self) {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), Error> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected '{kind}', found '{}'", self.current.kind)))
        }
    }

    fn expect_identifier(&mut self) -> Result<Identifier, Error> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let id = Identifier::new(name.clone());
            self.advance();
            Ok(id)
        } else {
            Err(self.error(format!("expected identifier, found '{}'", self.current.kind)))
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    fn error(&self, message: String) -> Error {
        let (line, column) = self.current.span.location(self.scanner.source());
        Error::Syntax {
            message,
            line,
            column,
        }
    }
}

fn infix(operator: InfixOperator, left: Expression, right: Expression) -> Expression {
    Expression::Infix(InfixExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// Gives an anonymous function literal the name it is being bound to.
fn name_function_literal(value: &mut Expression, name: &Identifier) {
    if let Expression::Function(func) = value {
        if func.name.is_none() {
            func.name = Some(name.name.clone());
        }
    }
}
