// SPDX-License-Identifier: MIT OR Apache-2.0
//! Syntax analysis: token stream to statement list.
//!
//! The grammar is the statement subset the generator emits, plus the forms a
//! user reasonably writes by hand: `const` bindings over call/member/method
//! expressions, object literals, a wrapping `export const main = Fn(() => {})`
//! that is transparently flattened, and `import` declarations (validated but
//! otherwise ignored; imports are reconstructed from the registry on the way
//! back out).

use crate::lexer::{tokenize, SyntaxError, Tok, Token};

/// An expression in program text
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Bare identifier reference
    Ident(String),
    /// Numeric literal; `lexeme` preserves hex spelling
    Number {
        /// Parsed value
        value: f64,
        /// Raw source spelling
        lexeme: String,
    },
    /// String literal
    Str(String),
    /// Function call `f(args...)`
    Call {
        /// Callee name
        callee: String,
        /// Positional arguments
        args: Vec<Expr>,
    },
    /// Method call `obj.f(args...)`
    MethodCall {
        /// Receiver
        object: Box<Expr>,
        /// Method name
        method: String,
        /// Positional arguments
        args: Vec<Expr>,
    },
    /// Member access `obj.field`
    Member {
        /// Receiver
        object: Box<Expr>,
        /// Field name
        field: String,
    },
    /// Object literal `{ key: value, ... }`
    Object(Vec<(String, Expr)>),
}

/// A top-level statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `const name = value;`
    Const {
        /// Bound identifier
        name: String,
        /// Bound expression
        value: Expr,
    },
    /// `return value;`
    Return(Expr),
}

/// Parse program text into statements, or a positioned error list
pub fn parse(text: &str) -> Result<Vec<Stmt>, Vec<SyntaxError>> {
    let tokens = tokenize(text).map_err(|e| vec![e])?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.program().map_err(|e| vec![e])
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn peek_ident(&self) -> Option<&str> {
        match self.peek() {
            Some(Tok::Ident(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn here(&self) -> (u32, u32) {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map_or((1, 1), |t| (t.line, t.col))
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        let (line, col) = self.here();
        SyntaxError::new(line, col, message)
    }

    fn expect(&mut self, tok: &Tok, what: &str) -> Result<(), SyntaxError> {
        if self.peek() == Some(tok) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, SyntaxError> {
        match self.advance().map(|t| t.tok) {
            Some(Tok::Ident(name)) => Ok(name),
            _ => Err(self.error(format!("expected {what}"))),
        }
    }

    fn eat_semi(&mut self) {
        while self.peek() == Some(&Tok::Semi) {
            self.pos += 1;
        }
    }

    fn program(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let mut stmts = Vec::new();
        while self.peek().is_some() {
            match self.peek_ident() {
                Some("import") => self.import_decl()?,
                Some("export") => {
                    self.pos += 1; // `export` prefixes the wrapper binding
                }
                Some("const") => self.const_stmt(&mut stmts)?,
                Some("return") => {
                    self.pos += 1;
                    let value = self.expr()?;
                    self.eat_semi();
                    stmts.push(Stmt::Return(value));
                }
                _ => return Err(self.error("expected statement")),
            }
        }
        Ok(stmts)
    }

    /// `import { a, b } from 'module';` — consumed and discarded
    fn import_decl(&mut self) -> Result<(), SyntaxError> {
        self.pos += 1;
        self.expect(&Tok::LBrace, "'{' after import")?;
        loop {
            self.expect_ident("imported name")?;
            match self.peek() {
                Some(Tok::Comma) => self.pos += 1,
                Some(Tok::RBrace) => break,
                _ => return Err(self.error("expected ',' or '}' in import list")),
            }
        }
        self.expect(&Tok::RBrace, "'}'")?;
        let from = self.expect_ident("'from'")?;
        if from != "from" {
            return Err(self.error("expected 'from'"));
        }
        match self.advance().map(|t| t.tok) {
            Some(Tok::Str(_)) => {}
            _ => return Err(self.error("expected module string")),
        }
        self.eat_semi();
        Ok(())
    }

    /// `const name = expr;` — the `Fn(() => { ... })` wrapper is flattened
    /// into its body statements
    fn const_stmt(&mut self, stmts: &mut Vec<Stmt>) -> Result<(), SyntaxError> {
        self.pos += 1;
        let name = self.expect_ident("binding name")?;
        self.expect(&Tok::Eq, "'='")?;

        if self.peek_ident() == Some("Fn") {
            self.pos += 1;
            self.expect(&Tok::LParen, "'('")?;
            self.expect(&Tok::LParen, "'('")?;
            self.expect(&Tok::RParen, "')'")?;
            self.expect(&Tok::Arrow, "'=>'")?;
            self.expect(&Tok::LBrace, "'{'")?;
            while self.peek() != Some(&Tok::RBrace) {
                match self.peek_ident() {
                    Some("const") => self.const_stmt(stmts)?,
                    Some("return") => {
                        self.pos += 1;
                        let value = self.expr()?;
                        self.eat_semi();
                        stmts.push(Stmt::Return(value));
                    }
                    _ => return Err(self.error("expected statement in function body")),
                }
            }
            self.expect(&Tok::RBrace, "'}'")?;
            self.expect(&Tok::RParen, "')'")?;
            self.eat_semi();
            return Ok(());
        }

        let value = self.expr()?;
        self.eat_semi();
        stmts.push(Stmt::Const { name, value });
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.primary()?;
        // Postfix member/method chain.
        while self.peek() == Some(&Tok::Dot) {
            self.pos += 1;
            let name = self.expect_ident("member name")?;
            if self.peek() == Some(&Tok::LParen) {
                let args = self.call_args()?;
                expr = Expr::MethodCall {
                    object: Box::new(expr),
                    method: name,
                    args,
                };
            } else {
                expr = Expr::Member {
                    object: Box::new(expr),
                    field: name,
                };
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek().cloned() {
            Some(Tok::Minus) => {
                self.pos += 1;
                match self.advance().map(|t| t.tok) {
                    Some(Tok::Number { value, lexeme }) => Ok(Expr::Number {
                        value: -value,
                        lexeme: format!("-{lexeme}"),
                    }),
                    _ => Err(self.error("expected number after '-'")),
                }
            }
            Some(Tok::Number { value, lexeme }) => {
                self.pos += 1;
                Ok(Expr::Number { value, lexeme })
            }
            Some(Tok::Str(s)) => {
                self.pos += 1;
                Ok(Expr::Str(s))
            }
            Some(Tok::Ident(name)) => {
                self.pos += 1;
                if self.peek() == Some(&Tok::LParen) {
                    let args = self.call_args()?;
                    Ok(Expr::Call { callee: name, args })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Some(Tok::LBrace) => self.object_literal(),
            _ => Err(self.error("expected expression")),
        }
    }

    fn call_args(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        self.expect(&Tok::LParen, "'('")?;
        let mut args = Vec::new();
        if self.peek() != Some(&Tok::RParen) {
            loop {
                args.push(self.expr()?);
                match self.peek() {
                    Some(Tok::Comma) => self.pos += 1,
                    _ => break,
                }
            }
        }
        self.expect(&Tok::RParen, "')'")?;
        Ok(args)
    }

    fn object_literal(&mut self) -> Result<Expr, SyntaxError> {
        self.expect(&Tok::LBrace, "'{'")?;
        let mut fields = Vec::new();
        while self.peek() != Some(&Tok::RBrace) {
            let key = self.expect_ident("property name")?;
            self.expect(&Tok::Colon, "':'")?;
            let value = self.expr()?;
            fields.push((key, value));
            match self.peek() {
                Some(Tok::Comma) => self.pos += 1,
                Some(Tok::RBrace) => break,
                _ => return Err(self.error("expected ',' or '}' in object literal")),
            }
        }
        self.expect(&Tok::RBrace, "'}'")?;
        Ok(Expr::Object(fields))
    }
}
