//! Code generation over the syntax tree. Expressions are walked in post
//! order; `if` reuses the reserve-then-patch pattern of the single-pass
//! translator. Loops compile through jump trampolines, so `break` and
//! `continue` always have a fixed, already-allocated address to target
//! even though the loop's exit address is unknown while its body is
//! being generated.
//!
//! The innermost-cycle bookkeeping lives on an explicit stack, pushed
//! when a loop body opens and popped when it closes, which keeps the
//! targets correct for nested loops.

use std::error::Error;
use std::fmt;

use super::ast::Node;
use super::codegen::{CodeBuffer, Instruction};
use super::lexer::ArithOp;

/// A `break` or `continue` outside any loop. There is no address to
/// patch the jump against, so generation aborts.
#[derive(Debug, PartialEq, Eq)]
pub enum GenError {
    BreakOutsideCycle,
    ContinueOutsideCycle,
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GenError::BreakOutsideCycle => write!(f, "BREAK is not in cycle"),
            GenError::ContinueOutsideCycle => write!(f, "CONTINUE is not in cycle"),
        }
    }
}

impl Error for GenError {}

/// The innermost cycle's jump targets: `continue` goes to `start`,
/// `break` to `exit`.
struct Cycle {
    start: usize,
    exit: usize,
}

struct Generator {
    code: CodeBuffer,
    cycles: Vec<Cycle>,
}

/// Generates a complete listing for the program rooted at `root`,
/// closing it with `STOP`.
pub fn generate(root: &Node) -> Result<CodeBuffer, GenError> {
    let mut session = Generator {
        code: CodeBuffer::new(),
        cycles: Vec::new(),
    };
    session.node(root)?;
    session.code.emit(Instruction::Stop);
    debug!("generated {} instructions", session.code.current_address());
    Ok(session.code)
}

impl Generator {
    fn node(&mut self, node: &Node) -> Result<(), GenError> {
        match node {
            Node::Block(statements) => {
                for statement in statements {
                    self.node(statement)?;
                }
            }
            Node::Const(value) => self.code.emit(Instruction::Push(*value)),
            Node::Var(address) => self.code.emit(Instruction::Load(*address)),
            Node::Read => self.code.emit(Instruction::Input),
            Node::Negate(inner) => {
                self.node(inner)?;
                self.code.emit(Instruction::Invert);
            }
            Node::Arith { op, lhs, rhs } => {
                self.node(lhs)?;
                self.node(rhs)?;
                self.code.emit(match op {
                    ArithOp::Plus => Instruction::Add,
                    ArithOp::Minus => Instruction::Sub,
                    ArithOp::Multiply => Instruction::Mult,
                    ArithOp::Divide => Instruction::Div,
                });
            }
            Node::Compare { op, lhs, rhs } => {
                self.node(lhs)?;
                self.node(rhs)?;
                self.code.emit(Instruction::Compare(*op));
            }
            Node::Assign { target, value } => {
                self.node(value)?;
                self.code.emit(Instruction::Store(*target));
            }
            Node::Write(value) => {
                self.node(value)?;
                self.code.emit(Instruction::Print);
            }
            Node::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.node(cond)?;
                let false_jump = self.code.reserve();
                self.node(then_branch)?;
                match else_branch {
                    Some(else_branch) => {
                        let end_jump = self.code.reserve();
                        let else_start = self.code.current_address();
                        self.code.patch(false_jump, Instruction::JumpNo(else_start));
                        self.node(else_branch)?;
                        let after = self.code.current_address();
                        self.code.patch(end_jump, Instruction::Jump(after));
                    }
                    None => {
                        let after = self.code.current_address();
                        self.code.patch(false_jump, Instruction::JumpNo(after));
                    }
                }
            }
            Node::While { cond, body } => {
                let start = self.code.current_address();
                self.node(cond)?;
                // A true condition hops over the exit trampoline.
                let body_entry = self.code.current_address() + 2;
                self.code.emit(Instruction::JumpYes(body_entry));
                let exit = self.code.reserve();
                self.cycles.push(Cycle { start, exit });
                self.node(body)?;
                self.cycles.pop();
                self.code.emit(Instruction::Jump(start));
                let after = self.code.current_address();
                self.code.patch(exit, Instruction::Jump(after));
            }
            Node::Repeat { body, cond } => {
                // Two trampolines sit in front of the body: the first
                // forwards `continue` to the condition, the second
                // forwards `break` past the loop. Neither target is known
                // until the body has been generated.
                let body_entry = self.code.current_address() + 3;
                self.code.emit(Instruction::Jump(body_entry));
                let start = self.code.reserve();
                let exit = self.code.reserve();
                self.cycles.push(Cycle { start, exit });
                self.node(body)?;
                self.cycles.pop();
                let condition = self.code.current_address();
                self.node(cond)?;
                // Loop again while the condition is still false.
                self.code.emit(Instruction::JumpNo(body_entry));
                let after = self.code.current_address();
                self.code.patch(start, Instruction::Jump(condition));
                self.code.patch(exit, Instruction::Jump(after));
            }
            Node::Break => match self.cycles.last() {
                Some(cycle) => self.code.emit(Instruction::Jump(cycle.exit)),
                None => return Err(GenError::BreakOutsideCycle),
            },
            Node::Continue => match self.cycles.last() {
                Some(cycle) => self.code.emit(Instruction::Jump(cycle.start)),
                None => return Err(GenError::ContinueOutsideCycle),
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::codegen::Instruction::*;
    use crate::compiler::lexer::CmpOp;
    use crate::compiler::parser::Parser;

    fn generate_source(source: &str) -> Result<CodeBuffer, GenError> {
        let root = Parser::new(source).run().expect("parse should succeed");
        generate(&root)
    }

    fn instructions(source: &str) -> Vec<Instruction> {
        generate_source(source)
            .expect("generation should succeed")
            .instructions()
            .to_vec()
    }

    #[test]
    fn test_straight_line_program() {
        assert_eq!(
            instructions("begin x := 1 + 2; write(x) end"),
            vec![Push(1), Push(2), Add, Store(0), Load(0), Print, Stop]
        );
    }

    #[test]
    fn test_expressions_are_emitted_post_order() {
        assert_eq!(
            instructions("begin x := read; write(-x * (3 + x)) end"),
            vec![
                Input,
                Store(0),
                Load(0),
                Invert,
                Push(3),
                Load(0),
                Add,
                Mult,
                Print,
                Stop,
            ]
        );
    }

    #[test]
    fn test_if_else_threads_both_branches() {
        assert_eq!(
            instructions("begin if x < 1 then x := 1 else x := 2 fi end"),
            vec![
                Load(0),
                Push(1),
                Compare(CmpOp::Lt),
                JumpNo(7),
                Push(1),
                Store(0),
                Jump(9),
                Push(2),
                Store(0),
                Stop,
            ]
        );
    }

    #[test]
    fn test_while_compiles_through_an_exit_trampoline() {
        assert_eq!(
            instructions("begin while 1 = 1 do break od end"),
            vec![
                Push(1),
                Push(1),
                Compare(CmpOp::Eq),
                JumpYes(5),
                Jump(7),
                Jump(4),
                Jump(0),
                Stop,
            ]
        );
    }

    #[test]
    fn test_continue_returns_to_the_condition() {
        assert_eq!(
            instructions("begin while x < 3 do x := x + 1; continue od end"),
            vec![
                Load(0),
                Push(3),
                Compare(CmpOp::Lt),
                JumpYes(5),
                Jump(11),
                Load(0),
                Push(1),
                Add,
                Store(0),
                Jump(0),
                Jump(0),
                Stop,
            ]
        );
    }

    #[test]
    fn test_repeat_runs_again_while_the_condition_is_false() {
        assert_eq!(
            instructions("begin repeat x := x + 1 until x = 10 end"),
            vec![
                Jump(3),
                Jump(7),
                Jump(11),
                Load(0),
                Push(1),
                Add,
                Store(0),
                Load(0),
                Push(10),
                Compare(CmpOp::Eq),
                JumpNo(3),
                Stop,
            ]
        );
    }

    #[test]
    fn test_repeat_trampolines_forward_break_and_continue() {
        assert_eq!(
            instructions("begin repeat continue; break until x = 1 end"),
            vec![
                Jump(3),
                Jump(5),
                Jump(9),
                Jump(1),
                Jump(2),
                Load(0),
                Push(1),
                Compare(CmpOp::Eq),
                JumpNo(3),
                Stop,
            ]
        );
    }

    #[test]
    fn test_nested_break_binds_to_the_innermost_cycle() {
        assert_eq!(
            instructions("begin while 1 = 1 do repeat break until 1 = 1 od end"),
            vec![
                Push(1),
                Push(1),
                Compare(CmpOp::Eq),
                JumpYes(5),
                Jump(14),
                Jump(8),
                Jump(9),
                Jump(13),
                Jump(7),
                Push(1),
                Push(1),
                Compare(CmpOp::Eq),
                JumpNo(8),
                Jump(0),
                Stop,
            ]
        );
    }

    #[test]
    fn test_no_placeholder_survives_generation() {
        let sources = [
            "begin if x = 1 then write(1) else write(2) fi end",
            "begin while x < 5 do x := x + 1 od end",
            "begin repeat break until x = 1 end",
        ];
        for source in &sources {
            let code = generate_source(source).expect("generation should succeed");
            assert!(
                code.instructions().iter().all(|i| *i != Nop),
                "NOP left in listing for {:?}",
                source
            );
        }
    }

    #[test]
    fn test_break_outside_a_cycle_fails() {
        let err = generate(&Node::Block(vec![Node::Break]))
            .expect_err("break outside a loop should fail");
        assert_eq!(err, GenError::BreakOutsideCycle);
    }

    #[test]
    fn test_continue_outside_a_cycle_fails() {
        let err = generate(&Node::Block(vec![Node::Continue]))
            .expect_err("continue outside a loop should fail");
        assert_eq!(err, GenError::ContinueOutsideCycle);
    }

    #[test]
    fn test_break_after_a_loop_is_outside_it() {
        let err = generate_source("begin while 1 = 1 do x := 1 od; break end")
            .expect_err("break after the loop should fail");
        assert_eq!(err, GenError::BreakOutsideCycle);
    }
}
