//! The lexer.
//!
//! PL/0 keywords accept ASCII alternates (`{`/`}` for `begin`/`end`,
//! `!` for `print`, `?` for `input`); identifiers and keywords are
//! matched case-insensitively.

use derive_more::Display;
use regex::Regex;

/// Tokens in the program.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("kind: '{kind}', part of input: '{text}'")]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
}

/// Token classes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display, Debug)]
pub enum TokenKind {
    #[display("ident")]
    Ident,
    #[display("number")]
    Number,
    #[display(":=")]
    Becomes,
    #[display("=")]
    Eql,
    #[display("<>")]
    Neq,
    #[display("<")]
    Lss,
    #[display("<=")]
    Leq,
    #[display(">")]
    Gtr,
    #[display(">=")]
    Geq,
    #[display("+")]
    Plus,
    #[display("-")]
    Minus,
    #[display("*")]
    Times,
    #[display("/")]
    Slash,
    #[display("(")]
    LParen,
    #[display(")")]
    RParen,
    #[display(",")]
    Comma,
    #[display(";")]
    Semicolon,
    #[display(".")]
    Period,
    #[display("const")]
    Const,
    #[display("var")]
    Var,
    #[display("procedure")]
    Procedure,
    #[display("call")]
    Call,
    #[display("begin")]
    Begin,
    #[display("end")]
    End,
    #[display("if")]
    If,
    #[display("then")]
    Then,
    #[display("else")]
    Else,
    #[display("while")]
    While,
    #[display("do")]
    Do,
    #[display("odd")]
    Odd,
    #[display("print")]
    Print,
    #[display("input")]
    Input,
}

pub struct LexError(usize, char);

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lexer error: unexpected character {:?} at {}", self.1, self.0)
    }
}

impl std::fmt::Debug for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lexer error: unexpected character {:?} at {}", self.1, self.0)
    }
}

impl std::error::Error for LexError {}

pub struct Lexer<'input> {
    input: &'input str,
    pos: usize,
    whitespace: Regex,
    matchers: Vec<(Regex, TokenKind)>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        let kw = |word: &str| Regex::new(&format!(r"(?i)\A{word}\b")).unwrap();
        let sym = |pat: &str| Regex::new(&format!(r"\A{pat}")).unwrap();
        Lexer {
            input,
            pos: 0,
            whitespace: Regex::new(r"\A(?:[ \t\f\r\n\v]|(?://.*))*").unwrap(),
            matchers: vec![
                (kw("const"), TokenKind::Const),
                (kw("var"), TokenKind::Var),
                (kw("procedure"), TokenKind::Procedure),
                (kw("call"), TokenKind::Call),
                (kw("begin"), TokenKind::Begin),
                (kw("end"), TokenKind::End),
                (kw("then"), TokenKind::Then),
                (kw("else"), TokenKind::Else),
                (kw("while"), TokenKind::While),
                (kw("do"), TokenKind::Do),
                (kw("odd"), TokenKind::Odd),
                (kw("if"), TokenKind::If),
                (kw("print"), TokenKind::Print),
                (kw("input"), TokenKind::Input),
                (sym(r"\{"), TokenKind::Begin),
                (sym(r"\}"), TokenKind::End),
                (sym(r"!"), TokenKind::Print),
                (sym(r"\?"), TokenKind::Input),
                (sym(r":="), TokenKind::Becomes),
                (sym(r"<="), TokenKind::Leq),
                (sym(r">="), TokenKind::Geq),
                (sym(r"<>"), TokenKind::Neq),
                (sym(r"="), TokenKind::Eql),
                (sym(r"<"), TokenKind::Lss),
                (sym(r">"), TokenKind::Gtr),
                (sym(r"\+"), TokenKind::Plus),
                (sym(r"-"), TokenKind::Minus),
                (sym(r"\*"), TokenKind::Times),
                (sym(r"/"), TokenKind::Slash),
                (sym(r"\("), TokenKind::LParen),
                (sym(r"\)"), TokenKind::RParen),
                (sym(r","), TokenKind::Comma),
                (sym(r";"), TokenKind::Semicolon),
                (sym(r"\."), TokenKind::Period),
                (Regex::new(r"\A[0-9]+").unwrap(), TokenKind::Number),
                (Regex::new(r"\A[A-Za-z][A-Za-z0-9]*").unwrap(), TokenKind::Ident),
            ],
        }
    }

    /// Has the lexer reached the end of input?
    pub fn end_of_input(&self) -> bool {
        self.pos == self.input.len()
    }

    fn skip_whitespace(&mut self) {
        if let Some(m) = self.whitespace.find(&self.input[self.pos..]) {
            self.pos += m.end()
        }
    }

    /// Gets the next token if possible.
    ///
    /// The return type distinguishes between end-of-input and lexer error.
    pub fn next(&mut self) -> Result<Option<Token<'input>>, LexError> {
        self.skip_whitespace();
        if self.end_of_input() {
            return Ok(None);
        }
        let rest = &self.input[self.pos..];
        for (re, kind) in &self.matchers {
            if let Some(m) = re.find(rest) {
                let text = &rest[..m.end()];
                self.pos += m.end();
                return Ok(Some(Token { kind: *kind, text }));
            }
        }
        let bad = rest.chars().next().unwrap();
        Err(LexError(self.pos, bad))
    }

    /// Lexes the whole input into a token vector, for the parser to index.
    pub fn tokenize(mut self) -> Result<Vec<Token<'input>>, LexError> {
        let mut out = Vec::new();
        while let Some(tok) = self.next()? {
            out.push(tok);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).tokenize().expect("lexes cleanly").into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_and_identifiers_are_case_insensitive() {
        assert_eq!(kinds("BEGIN End"), vec![TokenKind::Begin, TokenKind::End]);
        assert_eq!(kinds("VaR x"), vec![TokenKind::Var, TokenKind::Ident]);
    }

    #[test]
    fn ascii_alternates_lex_to_the_same_kinds_as_their_keywords() {
        assert_eq!(kinds("{ x := 1 }"), kinds("begin x := 1 end"));
        assert_eq!(kinds("! x"), kinds("print x"));
        assert_eq!(kinds("? x"), kinds("input x"));
    }

    #[test]
    fn multi_char_operators_are_not_split_into_their_prefixes() {
        assert_eq!(kinds("x <= y"), vec![TokenKind::Ident, TokenKind::Leq, TokenKind::Ident]);
        assert_eq!(kinds("x <> y"), vec![TokenKind::Ident, TokenKind::Neq, TokenKind::Ident]);
        assert_eq!(kinds(":="), vec![TokenKind::Becomes]);
    }

    #[test]
    fn an_unrecognized_character_is_a_lex_error() {
        let err = Lexer::new("x := @").tokenize().unwrap_err();
        assert_eq!(err.1, '@');
    }
}
