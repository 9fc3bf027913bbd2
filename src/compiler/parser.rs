//! The tree-building half of the front end: the same recursive descent
//! grammar as the single-pass translator, but producing [`Node`]s instead
//! of instructions. This is the strategy that accepts the extended
//! statements (`repeat`/`until`, `break`, `continue`), which need loop
//! boundaries to exist as structure before code can be generated for
//! them.
//!
//! Variable references are resolved to data addresses here, in source
//! order, so both strategies allocate identical address maps.

use super::ast::Node;
use super::lexer::{ArithOp, Lexeme, Lexer, Token};
use super::symbols::SymbolTable;
use super::CompileError;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Lexeme,
    vars: SymbolTable,
    errors: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_lexeme();
        Parser {
            lexer,
            current,
            vars: SymbolTable::new(),
            errors: 0,
        }
    }

    /// Parses the whole program, consuming the session. The tree is handed
    /// out only when no error was recorded, so generation never sees the
    /// placeholder nodes produced during recovery.
    pub fn run(mut self) -> Result<Node, CompileError> {
        let root = self.program();
        let errors = self.errors + self.lexer.errors();
        if errors > 0 {
            return Err(CompileError { errors });
        }
        debug!("parsed program with {} variable cells", self.vars.len());
        Ok(root)
    }

    /// program := 'begin' statementList 'end'
    fn program(&mut self) -> Node {
        self.expect(Token::Begin);
        let root = self.statement_list();
        self.expect(Token::End);
        root
    }

    /// statementList := statement (';' statement)*
    ///
    /// `until` joins the terminator set here, so a `repeat` body closes
    /// without a semicolon before it.
    fn statement_list(&mut self) -> Node {
        let mut statements = Vec::new();
        let terminated = self.check(&Token::End)
            || self.check(&Token::Else)
            || self.check(&Token::Od)
            || self.check(&Token::Fi)
            || self.check(&Token::Until);
        if !terminated {
            loop {
                statements.push(self.statement());
                if !self.accept(&Token::Semicolon) {
                    break;
                }
            }
        }
        Node::Block(statements)
    }

    fn statement(&mut self) -> Node {
        if let Token::Identifier(name) = &self.current.token {
            let target = self.vars.address(name);
            self.advance();
            self.expect(Token::Assign);
            let value = self.expression();
            Node::Assign {
                target,
                value: Box::new(value),
            }
        } else if self.accept(&Token::If) {
            let cond = self.relation();
            self.expect(Token::Then);
            let then_branch = self.statement_list();
            let else_branch = if self.accept(&Token::Else) {
                Some(Box::new(self.statement_list()))
            } else {
                None
            };
            self.expect(Token::Fi);
            Node::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch,
            }
        } else if self.accept(&Token::While) {
            let cond = self.relation();
            self.expect(Token::Do);
            let body = self.statement_list();
            self.expect(Token::Od);
            Node::While {
                cond: Box::new(cond),
                body: Box::new(body),
            }
        } else if self.accept(&Token::Repeat) {
            let body = self.statement_list();
            self.expect(Token::Until);
            let cond = self.relation();
            Node::Repeat {
                body: Box::new(body),
                cond: Box::new(cond),
            }
        } else if self.accept(&Token::Break) {
            Node::Break
        } else if self.accept(&Token::Continue) {
            Node::Continue
        } else if self.accept(&Token::Write) {
            self.expect(Token::LParen);
            let value = self.expression();
            self.expect(Token::RParen);
            Node::Write(Box::new(value))
        } else {
            self.report_error("Statement expected");
            // Recovery placeholder; an erroring parse never reaches the
            // generator.
            Node::Block(Vec::new())
        }
    }

    /// expression := term (('+'|'-') term)*
    fn expression(&mut self) -> Node {
        let mut node = self.term();
        while let Token::AddOp(op) = self.current.token {
            self.advance();
            let rhs = self.term();
            node = Node::Arith {
                op,
                lhs: Box::new(node),
                rhs: Box::new(rhs),
            };
        }
        node
    }

    /// term := factor (('*'|'/') factor)*
    fn term(&mut self) -> Node {
        let mut node = self.factor();
        while let Token::MulOp(op) = self.current.token {
            self.advance();
            let rhs = self.factor();
            node = Node::Arith {
                op,
                lhs: Box::new(node),
                rhs: Box::new(rhs),
            };
        }
        node
    }

    /// factor := number | identifier | '-' factor | '(' expression ')' | 'read'
    fn factor(&mut self) -> Node {
        if let Token::Number(value) = self.current.token {
            self.advance();
            Node::Const(value)
        } else if let Token::Identifier(name) = &self.current.token {
            let address = self.vars.address(name);
            self.advance();
            Node::Var(address)
        } else if self.check(&Token::AddOp(ArithOp::Minus)) {
            self.advance();
            Node::Negate(Box::new(self.factor()))
        } else if self.accept(&Token::LParen) {
            let node = self.expression();
            self.expect(Token::RParen);
            node
        } else if self.accept(&Token::Read) {
            Node::Read
        } else {
            self.report_error("Expression expected");
            Node::Const(0)
        }
    }

    /// relation := expression cmpOp expression
    fn relation(&mut self) -> Node {
        let lhs = self.expression();
        if let Token::Cmp(op) = self.current.token {
            self.advance();
            let rhs = self.expression();
            Node::Compare {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }
        } else {
            self.report_error("Comparison operator expected");
            lhs
        }
    }

    fn check(&self, token: &Token) -> bool {
        self.current.token == *token
    }

    fn accept(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Same panic-mode contract as the single-pass translator: report,
    /// then drop lexemes until the expected token (consumed if found) or
    /// end of input.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::CmpOp;

    fn parse(source: &str) -> Result<Node, CompileError> {
        Parser::new(source).run()
    }

    fn parse_ok(source: &str) -> Node {
        parse(source).expect("parse should succeed")
    }

    #[test]
    fn test_straight_line_tree() {
        assert_eq!(
            parse_ok("begin x := 1 + 2; write(x) end"),
            Node::Block(vec![
                Node::Assign {
                    target: 0,
                    value: Box::new(Node::Arith {
                        op: ArithOp::Plus,
                        lhs: Box::new(Node::Const(1)),
                        rhs: Box::new(Node::Const(2)),
                    }),
                },
                Node::Write(Box::new(Node::Var(0))),
            ])
        );
    }

    #[test]
    fn test_empty_program_is_an_empty_block() {
        assert_eq!(parse_ok("begin end"), Node::Block(vec![]));
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        assert_eq!(
            parse_ok("begin x := 2 + 3 * 4 end"),
            Node::Block(vec![Node::Assign {
                target: 0,
                value: Box::new(Node::Arith {
                    op: ArithOp::Plus,
                    lhs: Box::new(Node::Const(2)),
                    rhs: Box::new(Node::Arith {
                        op: ArithOp::Multiply,
                        lhs: Box::new(Node::Const(3)),
                        rhs: Box::new(Node::Const(4)),
                    }),
                }),
            }])
        );
    }

    #[test]
    fn test_operators_associate_left() {
        // 10 - 4 - 3 is (10 - 4) - 3.
        assert_eq!(
            parse_ok("begin x := 10 - 4 - 3 end"),
            Node::Block(vec![Node::Assign {
                target: 0,
                value: Box::new(Node::Arith {
                    op: ArithOp::Minus,
                    lhs: Box::new(Node::Arith {
                        op: ArithOp::Minus,
                        lhs: Box::new(Node::Const(10)),
                        rhs: Box::new(Node::Const(4)),
                    }),
                    rhs: Box::new(Node::Const(3)),
                }),
            }])
        );
    }

    #[test]
    fn test_if_else_branches() {
        let root = parse_ok("begin if x = 1 then y := 1 else y := 2 fi end");
        let statements = match root {
            Node::Block(statements) => statements,
            other => panic!("expected a block, got {:?}", other),
        };
        match &statements[0] {
            Node::If {
                cond,
                then_branch,
                else_branch,
            } => {
                assert_eq!(
                    **cond,
                    Node::Compare {
                        op: CmpOp::Eq,
                        lhs: Box::new(Node::Var(0)),
                        rhs: Box::new(Node::Const(1)),
                    }
                );
                assert_eq!(
                    **then_branch,
                    Node::Block(vec![Node::Assign {
                        target: 1,
                        value: Box::new(Node::Const(1)),
                    }])
                );
                assert_eq!(
                    else_branch.as_deref(),
                    Some(&Node::Block(vec![Node::Assign {
                        target: 1,
                        value: Box::new(Node::Const(2)),
                    }]))
                );
            }
            other => panic!("expected an if, got {:?}", other),
        }
    }

    #[test]
    fn test_if_without_else_has_no_else_branch() {
        let root = parse_ok("begin if x = 1 then y := 1 fi end");
        match root {
            Node::Block(statements) => match &statements[0] {
                Node::If { else_branch, .. } => assert_eq!(*else_branch, None),
                other => panic!("expected an if, got {:?}", other),
            },
            other => panic!("expected a block, got {:?}", other),
        }
    }

    #[test]
    fn test_repeat_until_tree() {
        assert_eq!(
            parse_ok("begin repeat x := x + 1 until x = 10 end"),
            Node::Block(vec![Node::Repeat {
                body: Box::new(Node::Block(vec![Node::Assign {
                    target: 0,
                    value: Box::new(Node::Arith {
                        op: ArithOp::Plus,
                        lhs: Box::new(Node::Var(0)),
                        rhs: Box::new(Node::Const(1)),
                    }),
                }])),
                cond: Box::new(Node::Compare {
                    op: CmpOp::Eq,
                    lhs: Box::new(Node::Var(0)),
                    rhs: Box::new(Node::Const(10)),
                }),
            }])
        );
    }

    #[test]
    fn test_break_and_continue_statements() {
        assert_eq!(
            parse_ok("begin while 1 = 1 do break; continue od end"),
            Node::Block(vec![Node::While {
                cond: Box::new(Node::Compare {
                    op: CmpOp::Eq,
                    lhs: Box::new(Node::Const(1)),
                    rhs: Box::new(Node::Const(1)),
                }),
                body: Box::new(Node::Block(vec![Node::Break, Node::Continue])),
            }])
        );
    }

    #[test]
    fn test_case_folded_variables_share_addresses() {
        assert_eq!(
            parse_ok("begin Step := 1; write(STEP + step) end"),
            Node::Block(vec![
                Node::Assign {
                    target: 0,
                    value: Box::new(Node::Const(1)),
                },
                Node::Write(Box::new(Node::Arith {
                    op: ArithOp::Plus,
                    lhs: Box::new(Node::Var(0)),
                    rhs: Box::new(Node::Var(0)),
                })),
            ])
        );
    }

    #[test]
    fn test_unary_minus_and_read() {
        assert_eq!(
            parse_ok("begin x := -read end"),
            Node::Block(vec![Node::Assign {
                target: 0,
                value: Box::new(Node::Negate(Box::new(Node::Read))),
            }])
        );
    }

    #[test]
    fn test_missing_until_is_an_error() {
        assert!(parse("begin repeat x := 1 end").is_err());
    }

    #[test]
    fn test_missing_semicolon_counts_one_error() {
        // Recovery swallows the second statement and still finds 'end'.
        let err = parse("begin x := 1 y := 2 end").expect_err("parse should fail");
        assert_eq!(err.errors, 1);
    }

    #[test]
    fn test_lexical_errors_withhold_the_tree() {
        assert!(parse("begin x := 1 end /* oops").is_err());
    }
}
