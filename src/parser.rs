use crate::{
    ast::{BinaryOp, BlockStatement, Expression, Program, Statement, UnaryOp},
    error::{Error, ParseError, Result},
    tokenizer::{Lexer, Token, TokenType},
};
use log::debug;
use std::{mem, rc::Rc};

type ParseResult<T> = std::result::Result<T, ParseError>;

/// Binding power ladder, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

fn get_precedence(token_type: TokenType) -> Precedence {
    match token_type {
        TokenType::EqualEqual | TokenType::BangEqual => Precedence::Equals,
        TokenType::Less | TokenType::Greater => Precedence::LessGreater,
        TokenType::Plus | TokenType::Minus => Precedence::Sum,
        TokenType::Star | TokenType::Slash => Precedence::Product,
        TokenType::LeftParen => Precedence::Call,
        TokenType::LeftSquare => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

fn binary_op(token_type: TokenType) -> Option<BinaryOp> {
    match token_type {
        TokenType::Plus => Some(BinaryOp::Add),
        TokenType::Minus => Some(BinaryOp::Subtract),
        TokenType::Star => Some(BinaryOp::Multiply),
        TokenType::Slash => Some(BinaryOp::Divide),
        TokenType::EqualEqual => Some(BinaryOp::Equal),
        TokenType::BangEqual => Some(BinaryOp::NotEqual),
        TokenType::Less => Some(BinaryOp::Less),
        TokenType::Greater => Some(BinaryOp::Greater),
        _ => None,
    }
}

fn describe(token_type: TokenType) -> String {
    match token_type {
        TokenType::Identifier => "identifier".to_string(),
        _ => format!("'{}'", token_type),
    }
}

/// Pratt parser over a lexer with one token of lookahead.
///
/// Malformed top-level statements are left out of the resulting [`Program`]
/// and recorded as diagnostics, retrievable through [`Parser::errors`].
pub struct Parser {
    lexer: Lexer,
    current: Token,
    peek: Token,
    errors: Vec<ParseError>,
    // Braces opened and not yet closed, up to and including `current`.
    depth: usize,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        let current = lexer.next_token();
        let peek = lexer.next_token();

        let mut parser = Self {
            lexer,
            current,
            peek,
            errors: Vec::new(),
            depth: 0,
        };
        parser.track_depth();
        parser
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    fn advance(&mut self) {
        let next = self.lexer.next_token();
        self.current = mem::replace(&mut self.peek, next);
        self.track_depth();
    }

    fn track_depth(&mut self) {
        match self.current.token_type {
            TokenType::LeftBrace => self.depth += 1,
            TokenType::RightBrace => self.depth = self.depth.saturating_sub(1),
            _ => (),
        }
    }

    fn current_is(&self, token_type: TokenType) -> bool {
        self.current.token_type == token_type
    }

    fn peek_is(&self, token_type: TokenType) -> bool {
        self.peek.token_type == token_type
    }

    fn expect_peek(&mut self, token_type: TokenType) -> ParseResult<()> {
        if self.peek_is(token_type) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(describe(token_type), &self.peek))
        }
    }

    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();

        while !self.current_is(TokenType::EOF) {
            match self.parse_statement() {
                Ok(statement) => program.statements.push(statement),
                Err(err) => {
                    debug!("dropping statement: {}", err);
                    self.errors.push(err);
                    self.synchronize();
                }
            }
            self.advance();
        }

        program
    }

    // Skip the rest of a broken top-level statement: up to a `;` outside any
    // braces, or the `}` closing its outermost block (and a `;` right after).
    fn synchronize(&mut self) {
        loop {
            match self.current.token_type {
                TokenType::EOF => return,
                TokenType::Semicolon if self.depth == 0 => return,
                TokenType::RightBrace if self.depth == 0 => {
                    self.skip_semicolon();
                    return;
                }
                _ => self.advance(),
            }
        }
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.current.token_type {
            TokenType::Let => self.parse_let(),
            TokenType::Return => self.parse_return(),
            _ => self.parse_expression_statement(),
        }
    }

    fn skip_semicolon(&mut self) {
        if self.peek_is(TokenType::Semicolon) {
            self.advance();
        }
    }

    fn parse_let(&mut self) -> ParseResult<Statement> {
        self.expect_peek(TokenType::Identifier)?;
        let name = self.current.literal.clone();

        self.expect_peek(TokenType::Equal)?;
        self.advance();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Ok(Statement::Let { name, value })
    }

    fn parse_return(&mut self) -> ParseResult<Statement> {
        self.advance();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Ok(Statement::Return(value))
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Statement> {
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Ok(Statement::Expression(expr))
    }

    pub fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expression> {
        let mut left = self.parse_prefix()?;

        while !self.peek_is(TokenType::Semicolon)
            && precedence < get_precedence(self.peek.token_type)
        {
            left = match self.peek.token_type {
                TokenType::LeftParen => {
                    self.advance();
                    self.parse_call(left)?
                }
                TokenType::LeftSquare => {
                    self.advance();
                    self.parse_index(left)?
                }
                token_type => match binary_op(token_type) {
                    Some(operator) => {
                        self.advance();
                        self.parse_infix(left, operator)?
                    }
                    None => return Ok(left),
                },
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expression> {
        match self.current.token_type {
            TokenType::Identifier => Ok(Expression::Identifier(self.current.literal.clone())),
            TokenType::Integer => self
                .current
                .literal
                .parse::<i64>()
                .map(Expression::Integer)
                .map_err(|_| ParseError::new("64-bit integer", &self.current)),
            TokenType::String => Ok(Expression::String(self.current.literal.clone())),
            TokenType::True => Ok(Expression::Boolean(true)),
            TokenType::False => Ok(Expression::Boolean(false)),
            TokenType::Bang | TokenType::Minus => {
                let operator = match self.current.token_type {
                    TokenType::Bang => UnaryOp::Not,
                    _ => UnaryOp::Negate,
                };
                self.advance();

                let right = self.parse_expression(Precedence::Prefix)?;
                Ok(Expression::Prefix {
                    operator,
                    right: Box::new(right),
                })
            }
            TokenType::LeftParen => {
                self.advance();
                let expr = self.parse_expression(Precedence::Lowest)?;
                self.expect_peek(TokenType::RightParen)?;
                Ok(expr)
            }
            TokenType::If => self.parse_if(),
            TokenType::Fn => self.parse_function(),
            TokenType::LeftSquare => Ok(Expression::Array(
                self.parse_expression_list(TokenType::RightSquare)?,
            )),
            TokenType::LeftBrace => self.parse_hash(),
            _ => Err(ParseError::new("expression", &self.current)),
        }
    }

    fn parse_infix(&mut self, left: Expression, operator: BinaryOp) -> ParseResult<Expression> {
        let precedence = get_precedence(self.current.token_type);
        self.advance();

        let right = self.parse_expression(precedence)?;
        Ok(Expression::Infix {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    fn parse_call(&mut self, function: Expression) -> ParseResult<Expression> {
        let arguments = self.parse_expression_list(TokenType::RightParen)?;
        Ok(Expression::Call {
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_index(&mut self, left: Expression) -> ParseResult<Expression> {
        self.advance();
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenType::RightSquare)?;

        Ok(Expression::Index {
            left: Box::new(left),
            index: Box::new(index),
        })
    }

    /// Comma separated expressions up to `end`; the current token is the
    /// opening delimiter.
    fn parse_expression_list(&mut self, end: TokenType) -> ParseResult<Vec<Expression>> {
        let mut list = Vec::new();

        if self.peek_is(end) {
            self.advance();
            return Ok(list);
        }

        self.advance();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_is(TokenType::Comma) {
            self.advance();
            self.advance();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(end)?;
        Ok(list)
    }

    fn parse_hash(&mut self) -> ParseResult<Expression> {
        let mut pairs = Vec::new();

        while !self.peek_is(TokenType::RightBrace) {
            self.advance();
            let key = self.parse_expression(Precedence::Lowest)?;

            self.expect_peek(TokenType::Colon)?;
            self.advance();
            let value = self.parse_expression(Precedence::Lowest)?;

            pairs.push((key, value));

            if !self.peek_is(TokenType::RightBrace) {
                self.expect_peek(TokenType::Comma)?;
            }
        }

        self.expect_peek(TokenType::RightBrace)?;
        Ok(Expression::Hash(pairs))
    }

    fn parse_if(&mut self) -> ParseResult<Expression> {
        self.expect_peek(TokenType::LeftParen)?;
        self.advance();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenType::RightParen)?;

        self.expect_peek(TokenType::LeftBrace)?;
        let consequence = self.parse_block()?;

        let alternative = if self.peek_is(TokenType::Else) {
            self.advance();
            self.expect_peek(TokenType::LeftBrace)?;
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_block(&mut self) -> ParseResult<BlockStatement> {
        let mut block = BlockStatement::default();
        self.advance();

        while !self.current_is(TokenType::RightBrace) {
            if self.current_is(TokenType::EOF) {
                return Err(ParseError::new(describe(TokenType::RightBrace), &self.current));
            }
            block.statements.push(self.parse_statement()?);
            self.advance();
        }

        Ok(block)
    }

    fn parse_function(&mut self) -> ParseResult<Expression> {
        self.expect_peek(TokenType::LeftParen)?;
        let parameters = self.parse_parameters()?;

        self.expect_peek(TokenType::LeftBrace)?;
        let body = self.parse_block()?;

        Ok(Expression::Function {
            parameters,
            body: Rc::new(body),
        })
    }

    fn parse_parameters(&mut self) -> ParseResult<Vec<String>> {
        let mut parameters = Vec::new();

        if self.peek_is(TokenType::RightParen) {
            self.advance();
            return Ok(parameters);
        }

        self.expect_peek(TokenType::Identifier)?;
        parameters.push(self.current.literal.clone());

        while self.peek_is(TokenType::Comma) {
            self.advance();
            self.expect_peek(TokenType::Identifier)?;
            parameters.push(self.current.literal.clone());
        }

        self.expect_peek(TokenType::RightParen)?;
        Ok(parameters)
    }
}

/// Parses a whole source text, failing with every diagnostic if any
/// statement was malformed.
pub fn parse(source: &str) -> Result<Program> {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();

    match parser.into_errors() {
        diagnostics if diagnostics.is_empty() => Ok(program),
        diagnostics => Err(Error::Parser { diagnostics }),
    }
}
