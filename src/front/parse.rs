//! The parser.
//!
//! A straightforward recursive-descent parser over a pre-lexed token
//! vector, one function per PL/0 grammar rule (`block`, `statement`,
//! `condition`, `expression`, `term`, `factor`), following the grammar in
//! the Wikipedia PL/0 grammar the original implementation is
//! itself adapted from.

use std::fmt::Debug;

use derive_more::derive::Display;

use super::ast::*;
use super::lex::*;
use crate::common::Id;

#[derive(Display)]
#[display("Parse error: {}", self.0)]
pub struct ParseError(String);

impl Debug for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl std::error::Error for ParseError {}

fn err<T>(msg: impl Into<String>) -> Result<T, ParseError> {
    Err(ParseError(msg.into()))
}

struct Parser<'src> {
    tokens: Vec<Token<'src>>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn bump(&mut self) -> Option<Token<'src>> {
        let t = self.peek();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn accept(&mut self, kind: TokenKind) -> Option<Token<'src>> {
        if self.peek_kind() == Some(kind) {
            self.bump()
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'src>, ParseError> {
        self.accept(kind).ok_or_else(|| {
            ParseError(format!(
                "expected {:?}, found {}",
                kind,
                self.peek().map(|t| t.text.to_string()).unwrap_or_else(|| "end of input".to_string())
            ))
        })
    }

    fn ident(&mut self) -> Result<Id, ParseError> {
        let tok = self.expect(TokenKind::Ident)?;
        Ok(Id::from(tok.text.to_lowercase()))
    }

    fn number(&mut self) -> Result<i64, ParseError> {
        let tok = self.expect(TokenKind::Number)?;
        tok.text.parse().map_err(|_| ParseError(format!("invalid number literal '{}'", tok.text)))
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        if let Some(tok) = self.accept(TokenKind::Ident) {
            return Ok(Expr::Ident(Id::from(tok.text.to_lowercase())));
        }
        if let Some(tok) = self.accept(TokenKind::Number) {
            let v = tok.text.parse().map_err(|_| ParseError(format!("invalid number literal '{}'", tok.text)))?;
            return Ok(Expr::Const(v));
        }
        if self.accept(TokenKind::LParen).is_some() {
            let e = self.expression()?;
            self.expect(TokenKind::RParen)?;
            return Ok(e);
        }
        err("expected identifier, number, or '('")
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.factor()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Times) => BinOp::Times,
                Some(TokenKind::Slash) => BinOp::Slash,
                _ => break,
            };
            self.bump();
            let rhs = self.factor()?;
            expr = Expr::Bin { op, lhs: Box::new(expr), rhs: Box::new(rhs) };
        }
        Ok(expr)
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        let leading = match self.peek_kind() {
            Some(TokenKind::Plus) => Some(UnOp::Plus),
            Some(TokenKind::Minus) => Some(UnOp::Minus),
            _ => None,
        };
        if leading.is_some() {
            self.bump();
        }
        let mut expr = self.term()?;
        if let Some(op) = leading {
            expr = Expr::Un { op, arg: Box::new(expr) };
        }
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinOp::Plus,
                Some(TokenKind::Minus) => BinOp::Minus,
                _ => break,
            };
            self.bump();
            let rhs = self.term()?;
            expr = Expr::Bin { op, lhs: Box::new(expr), rhs: Box::new(rhs) };
        }
        Ok(expr)
    }

    fn condition(&mut self) -> Result<Expr, ParseError> {
        if self.accept(TokenKind::Odd).is_some() {
            let arg = self.expression()?;
            return Ok(Expr::Un { op: UnOp::Odd, arg: Box::new(arg) });
        }
        let lhs = self.expression()?;
        let op = match self.peek_kind() {
            Some(TokenKind::Eql) => BinOp::Eql,
            Some(TokenKind::Neq) => BinOp::Neq,
            Some(TokenKind::Lss) => BinOp::Lss,
            Some(TokenKind::Leq) => BinOp::Leq,
            Some(TokenKind::Gtr) => BinOp::Gtr,
            Some(TokenKind::Geq) => BinOp::Geq,
            _ => return err("expected a relational operator"),
        };
        self.bump();
        let rhs = self.expression()?;
        Ok(Expr::Bin { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        if let Some(tok) = self.accept(TokenKind::Ident) {
            let target = Id::from(tok.text.to_lowercase());
            self.expect(TokenKind::Becomes)?;
            let expr = self.expression()?;
            return Ok(Stmt::Assign { target, expr });
        }
        if self.accept(TokenKind::Call).is_some() {
            let callee = self.ident()?;
            return Ok(Stmt::Call { callee });
        }
        if self.accept(TokenKind::Begin).is_some() {
            let mut stmts = vec![self.statement()?];
            while self.accept(TokenKind::Semicolon).is_some() {
                stmts.push(self.statement()?);
            }
            self.expect(TokenKind::End)?;
            return Ok(Stmt::Begin(stmts));
        }
        if self.accept(TokenKind::If).is_some() {
            let cond = self.condition()?;
            self.expect(TokenKind::Then)?;
            let then = Box::new(self.statement()?);
            let else_ = if self.accept(TokenKind::Else).is_some() {
                Some(Box::new(self.statement()?))
            } else {
                None
            };
            return Ok(Stmt::If { cond, then, else_ });
        }
        if self.accept(TokenKind::While).is_some() {
            let cond = self.condition()?;
            self.expect(TokenKind::Do)?;
            let body = Box::new(self.statement()?);
            return Ok(Stmt::While { cond, body });
        }
        if self.accept(TokenKind::Print).is_some() {
            let name = self.ident()?;
            return Ok(Stmt::Print(name));
        }
        if self.accept(TokenKind::Input).is_some() {
            let name = self.ident()?;
            return Ok(Stmt::Input(name));
        }
        err("expected a statement")
    }

    fn block(&mut self) -> Result<Block, ParseError> {
        let mut consts = Vec::new();
        if self.accept(TokenKind::Const).is_some() {
            loop {
                let name = self.ident()?;
                self.expect(TokenKind::Eql)?;
                let value = self.number()?;
                consts.push((name, value));
                if self.accept(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect(TokenKind::Semicolon)?;
        }

        let mut vars = Vec::new();
        if self.accept(TokenKind::Var).is_some() {
            loop {
                vars.push(self.ident()?);
                if self.accept(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect(TokenKind::Semicolon)?;
        }

        let mut procs = Vec::new();
        while self.accept(TokenKind::Procedure).is_some() {
            let name = self.ident()?;
            self.expect(TokenKind::Semicolon)?;
            let body = self.block()?;
            self.expect(TokenKind::Semicolon)?;
            procs.push(Procedure { name, body });
        }

        let body = self.statement()?;
        Ok(Block { consts, vars, procs, body })
    }
}

pub fn parse(input: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::new(input).tokenize().map_err(|e| ParseError(e.to_string()))?;
    let mut parser = Parser { tokens, pos: 0 };
    let block = parser.block()?;
    parser.expect(TokenKind::Period)?;
    if parser.pos != parser.tokens.len() {
        return err("unexpected trailing tokens after final '.'");
    }
    Ok(Program { block })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_const_var_and_a_begin_end_body() {
        let program = parse("const max = 10; var x, y; begin x := max; y := x + 1 end.").unwrap();
        let block = &program.block;
        assert_eq!(block.consts, vec![(Id::from("max".to_string()), 10)]);
        assert_eq!(block.vars, vec![Id::from("x".to_string()), Id::from("y".to_string())]);
        assert!(matches!(&block.body, Stmt::Begin(stmts) if stmts.len() == 2));
    }

    #[test]
    fn nested_procedures_parse_into_the_enclosing_blocks_procs_list() {
        let program = parse(
            "var x; procedure sq; var s; begin s := x * x end; begin x := 4; call sq end.",
        )
        .unwrap();
        assert_eq!(program.block.procs.len(), 1);
        assert_eq!(program.block.procs[0].name, Id::from("sq".to_string()));
        assert_eq!(program.block.procs[0].body.vars, vec![Id::from("s".to_string())]);
    }

    #[test]
    fn if_then_else_and_while_do_parse_their_single_statement_bodies() {
        let program = parse("var x; begin if x > 0 then x := 0 else x := 1; while x > 0 do x := x - 1 end.").unwrap();
        let Stmt::Begin(stmts) = &program.block.body else { panic!("expected a begin block") };
        assert!(matches!(&stmts[0], Stmt::If { else_: Some(_), .. }));
        assert!(matches!(&stmts[1], Stmt::While { .. }));
    }

    #[test]
    fn a_missing_terminal_period_is_a_parse_error() {
        assert!(parse("var x; begin x := 1 end").is_err());
    }

    #[test]
    fn a_relational_operator_is_required_in_a_condition() {
        assert!(parse("var x; begin if x then x := 1 end.").is_err());
    }
}
