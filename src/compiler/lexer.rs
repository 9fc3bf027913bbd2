//! Lexical analysis for Milan source text.
//!
//! Keywords and identifiers are case-insensitive; everything is folded to
//! lower case before keyword lookup. The lexer keeps exactly one character
//! of state, which is enough to split the two-character operators
//! (`:=`, `<=`, `>=`, `!=`) and to tell division from a comment opener.

use std::fmt;
use std::str::Chars;

/// Arithmetic operator kinds carried by `AddOp`/`MulOp` tokens.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ArithOp {
    Plus,
    Minus,
    Multiply,
    Divide,
}

/// Comparison operator kinds carried by `Cmp` tokens.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Token {
    Eof,
    Illegal,
    Identifier(String),
    Number(i64),
    Begin,
    End,
    If,
    Then,
    Else,
    Fi,
    While,
    Do,
    Od,
    Repeat,
    Until,
    Break,
    Continue,
    Write,
    Read,
    Assign,
    AddOp(ArithOp),
    MulOp(ArithOp),
    Cmp(CmpOp),
    LParen,
    RParen,
    Semicolon,
}

impl fmt::Display for Token {
    /// The description used in diagnostics ("X found while Y expected.").
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Token::Eof => "end of file",
            Token::Illegal => "illegal token",
            Token::Identifier(_) => "identifier",
            Token::Number(_) => "number",
            Token::Begin => "'BEGIN'",
            Token::End => "'END'",
            Token::If => "'IF'",
            Token::Then => "'THEN'",
            Token::Else => "'ELSE'",
            Token::Fi => "'FI'",
            Token::While => "'WHILE'",
            Token::Do => "'DO'",
            Token::Od => "'OD'",
            Token::Repeat => "'REPEAT'",
            Token::Until => "'UNTIL'",
            Token::Break => "'BREAK'",
            Token::Continue => "'CONTINUE'",
            Token::Write => "'WRITE'",
            Token::Read => "'READ'",
            Token::Assign => "':='",
            Token::AddOp(_) => "'+' or '-'",
            Token::MulOp(_) => "'*' or '/'",
            Token::Cmp(_) => "comparison operator",
            Token::LParen => "'('",
            Token::RParen => "')'",
            Token::Semicolon => "';'",
        };
        write!(f, "{}", name)
    }
}

/// A classified lexeme together with the line it starts on.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Lexeme {
    pub token: Token,
    pub line: usize,
}

pub struct Lexer<'a> {
    chars: Chars<'a>,
    current: Option<char>,
    line: usize,
    errors: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer {
            chars: source.chars(),
            current: None,
            line: 1,
            errors: 0,
        };
        lexer.next_char();
        lexer
    }

    /// Number of lexical errors reported so far.
    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Advances past whitespace and comments and classifies the next
    /// lexeme. Once the input is exhausted this keeps returning `Eof`.
    pub fn next_lexeme(&mut self) -> Lexeme {
        self.skip_spaces();

        while self.current == Some('/') {
            self.next_char();
            if self.current == Some('*') {
                self.next_char();
                if !self.skip_comment() {
                    return self.make(Token::Eof);
                }
            } else {
                // A slash not followed by '*' is division.
                return self.make(Token::MulOp(ArithOp::Divide));
            }
            self.skip_spaces();
        }

        let c = match self.current {
            Some(c) => c,
            None => return self.make(Token::Eof),
        };

        if c.is_ascii_digit() {
            self.number()
        } else if c.is_ascii_alphabetic() {
            self.word()
        } else {
            self.punctuation(c)
        }
    }

    fn skip_spaces(&mut self) {
        while let Some(c) = self.current {
            if !c.is_whitespace() {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.next_char();
        }
    }

    /// Consumes everything up to and including `*/`. Returns false if the
    /// comment is still open when the input runs out.
    fn skip_comment(&mut self) -> bool {
        let opened_at = self.line;
        loop {
            while let Some(c) = self.current {
                if c == '*' {
                    break;
                }
                if c == '\n' {
                    self.line += 1;
                }
                self.next_char();
            }
            if self.current.is_none() {
                error!("Error at line {}: unterminated comment", opened_at);
                self.errors += 1;
                return false;
            }
            self.next_char();
            if self.current == Some('/') {
                self.next_char();
                return true;
            }
        }
    }

    fn number(&mut self) -> Lexeme {
        let line = self.line;
        let mut value: i64 = 0;
        let mut overflow = false;
        while let Some(c) = self.current {
            if !c.is_ascii_digit() {
                break;
            }
            let digit = i64::from(c as u8 - b'0');
            value = match value.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                Some(v) => v,
                None => {
                    overflow = true;
                    0
                }
            };
            self.next_char();
        }
        if overflow {
            error!("Error at line {}: integer literal too large", line);
            self.errors += 1;
            return self.make(Token::Illegal);
        }
        self.make(Token::Number(value))
    }

    fn word(&mut self) -> Lexeme {
        let mut text = String::new();
        while let Some(c) = self.current {
            // ':' continues an identifier, so enumerated-constant names
            // can look qualified ("state:on").
            if !(c.is_ascii_alphanumeric() || c == ':') {
                break;
            }
            text.push(c.to_ascii_lowercase());
            self.next_char();
        }
        match keyword(&text) {
            Some(token) => self.make(token),
            None => self.make(Token::Identifier(text)),
        }
    }

    fn punctuation(&mut self, c: char) -> Lexeme {
        let token = match c {
            '(' => {
                self.next_char();
                Token::LParen
            }
            ')' => {
                self.next_char();
                Token::RParen
            }
            ';' => {
                self.next_char();
                Token::Semicolon
            }
            ':' => {
                self.next_char();
                if self.current == Some('=') {
                    self.next_char();
                    Token::Assign
                } else {
                    Token::Illegal
                }
            }
            '!' => {
                self.next_char();
                if self.current == Some('=') {
                    self.next_char();
                    Token::Cmp(CmpOp::Ne)
                } else {
                    Token::Illegal
                }
            }
            '<' => {
                self.next_char();
                if self.current == Some('=') {
                    self.next_char();
                    Token::Cmp(CmpOp::Le)
                } else {
                    Token::Cmp(CmpOp::Lt)
                }
            }
            '>' => {
                self.next_char();
                if self.current == Some('=') {
                    self.next_char();
                    Token::Cmp(CmpOp::Ge)
                } else {
                    Token::Cmp(CmpOp::Gt)
                }
            }
            '=' => {
                self.next_char();
                Token::Cmp(CmpOp::Eq)
            }
            '+' => {
                self.next_char();
                Token::AddOp(ArithOp::Plus)
            }
            '-' => {
                self.next_char();
                Token::AddOp(ArithOp::Minus)
            }
            '*' => {
                self.next_char();
                Token::MulOp(ArithOp::Multiply)
            }
            // '/' never reaches here; the comment check handles it.
            _ => {
                self.next_char();
                Token::Illegal
            }
        };
        self.make(token)
    }

    fn next_char(&mut self) {
        self.current = self.chars.next();
    }

    fn make(&self, token: Token) -> Lexeme {
        Lexeme {
            token,
            line: self.line,
        }
    }
}

fn keyword(word: &str) -> Option<Token> {
    let token = match word {
        "begin" => Token::Begin,
        "end" => Token::End,
        "if" => Token::If,
        "then" => Token::Then,
        "else" => Token::Else,
        "fi" => Token::Fi,
        "while" => Token::While,
        "do" => Token::Do,
        "od" => Token::Od,
        "repeat" => Token::Repeat,
        "until" => Token::Until,
        "break" => Token::Break,
        "continue" => Token::Continue,
        "write" => Token::Write,
        "read" => Token::Read,
        _ => return None,
    };
    Some(token)
}
