//! The single-pass translation strategy: each grammar production both
//! recognises its syntax and emits stack machine code as a side effect,
//! with one lexeme of lookahead and no intermediate tree. Forward jumps
//! for `if`/`while` go through the buffer's reserve/patch mechanism.
//!
//! A failed required-token match is reported with its line number and
//! recovered in panic mode: lexemes are discarded until the expected token
//! (consumed if found) or end of input. Translation continues after
//! recovery, but any recorded error withholds the final listing.

use super::codegen::{CodeBuffer, Instruction};
use super::lexer::{ArithOp, Lexeme, Lexer, Token};
use super::symbols::SymbolTable;
use super::CompileError;

pub struct Translator<'a> {
    lexer: Lexer<'a>,
    current: Lexeme,
    code: CodeBuffer,
    vars: SymbolTable,
    errors: usize,
}

impl<'a> Translator<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_lexeme();
        Translator {
            lexer,
            current,
            code: CodeBuffer::new(),
            vars: SymbolTable::new(),
            errors: 0,
        }
    }

    /// Translates the whole program, consuming the session. The buffer is
    /// handed out only when no error was recorded anywhere in the pass.
    pub fn run(mut self) -> Result<CodeBuffer, CompileError> {
        self.program();
        let errors = self.errors + self.lexer.errors();
        if errors > 0 {
            return Err(CompileError { errors });
        }
        debug!(
            "translated {} instructions, {} variable cells",
            self.code.current_address(),
            self.vars.len()
        );
        Ok(self.code)
    }

    /// program := 'begin' statementList 'end'
    fn program(&mut self) {
        self.expect(Token::Begin);
        self.statement_list();
        self.expect(Token::End);
        self.code.emit(Instruction::Stop);
    }

    /// statementList := statement (';' statement)*
    ///
    /// Runs only when the current lexeme is not already a block terminator,
    /// so empty bodies are allowed.
    fn statement_list(&mut self) {
        if self.check(&Token::End)
            || self.check(&Token::Else)
            || self.check(&Token::Od)
            || self.check(&Token::Fi)
        {
            return;
        }
        loop {
            self.statement();
            if !self.accept(&Token::Semicolon) {
                break;
            }
        }
    }

    fn statement(&mut self) {
        if let Token::Identifier(name) = &self.current.token {
            let target = self.vars.address(name);
            self.advance();
            self.expect(Token::Assign);
            self.expression();
            self.code.emit(Instruction::Store(target));
        } else if self.accept(&Token::If) {
            self.relation();
            let false_jump = self.code.reserve();
            self.expect(Token::Then);
            self.statement_list();
            if self.accept(&Token::Else) {
                let end_jump = self.code.reserve();
                // False condition enters the else branch here.
                let else_start = self.code.current_address();
                self.code.patch(false_jump, Instruction::JumpNo(else_start));
                self.statement_list();
                let after_else = self.code.current_address();
                self.code.patch(end_jump, Instruction::Jump(after_else));
            } else {
                let after_then = self.code.current_address();
                self.code.patch(false_jump, Instruction::JumpNo(after_then));
            }
            self.expect(Token::Fi);
        } else if self.accept(&Token::While) {
            let condition = self.code.current_address();
            self.relation();
            let exit_jump = self.code.reserve();
            self.expect(Token::Do);
            self.statement_list();
            self.expect(Token::Od);
            self.code.emit(Instruction::Jump(condition));
            let after_loop = self.code.current_address();
            self.code.patch(exit_jump, Instruction::JumpNo(after_loop));
        } else if self.accept(&Token::Write) {
            self.expect(Token::LParen);
            self.expression();
            self.expect(Token::RParen);
            self.code.emit(Instruction::Print);
        } else {
            self.report_error("Statement expected");
        }
    }

    /// expression := term (('+'|'-') term)*
    fn expression(&mut self) {
        self.term();
        while let Token::AddOp(op) = self.current.token {
            self.advance();
            self.term();
            self.code.emit(if op == ArithOp::Plus {
                Instruction::Add
            } else {
                Instruction::Sub
            });
        }
    }

    /// term := factor (('*'|'/') factor)*
    fn term(&mut self) {
        self.factor();
        while let Token::MulOp(op) = self.current.token {
            self.advance();
            self.factor();
            self.code.emit(if op == ArithOp::Multiply {
                Instruction::Mult
            } else {
                Instruction::Div
            });
        }
    }

    /// factor := number | identifier | '-' factor | '(' expression ')' | 'read'
    fn factor(&mut self) {
        if let Token::Number(value) = self.current.token {
            self.advance();
            self.code.emit(Instruction::Push(value));
        } else if let Token::Identifier(name) = &self.current.token {
            let address = self.vars.address(name);
            self.advance();
            self.code.emit(Instruction::Load(address));
        } else if self.check(&Token::AddOp(ArithOp::Minus)) {
            self.advance();
            self.factor();
            self.code.emit(Instruction::Invert);
        } else if self.accept(&Token::LParen) {
            self.expression();
            self.expect(Token::RParen);
        } else if self.accept(&Token::Read) {
            self.code.emit(Instruction::Input);
        } else {
            self.report_error("Expression expected");
        }
    }

    /// relation := expression cmpOp expression
    fn relation(&mut self) {
        self.expression();
        if let Token::Cmp(op) = self.current.token {
            self.advance();
            self.expression();
            self.code.emit(Instruction::Compare(op));
        } else {
            self.report_error("Comparison operator expected");
        }
    }

    /// True when the current lexeme matches `token`.
    fn check(&self, token: &Token) -> bool {
        self.current.token == *token
    }

    /// Consumes the current lexeme if it matches `token`.
    fn accept(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Requires `token`; on a mismatch reports the error and drops lexemes
    /// until the expected token (consumed if found) or end of input.
    fn expect(&mut self, token: Token) {
        if self.accept(&token) {
            return;
        }
        self.report_error(&format!(
            "{} found while {} expected.",
            self.current.token, token
        ));
        self.recover(&token);
    }

    fn recover(&mut self, token: &Token) {
        while !self.check(token) && !self.check(&Token::Eof) {
            self.advance();
        }
        if self.check(token) {
            self.advance();
        }
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_lexeme();
    }

    fn report_error(&mut self, message: &str) {
        error!("Error at line {}: {}", self.current.line, message);
        self.errors += 1;
    }
}
