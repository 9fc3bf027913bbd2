//! The typed syntax tree built by the parser and walked by the
//! tree-driven generator. Statement sequences are `Block` nodes, and
//! variable references are already resolved to data addresses, so the
//! generator never needs the symbol table.

use super::lexer::{ArithOp, CmpOp};

#[derive(Debug, PartialEq, Eq)]
pub enum Node {
    /// A statement sequence; the program root is one.
    Block(Vec<Node>),
    Const(i64),
    /// A variable read, by data address.
    Var(usize),
    /// One integer from the machine's input.
    Read,
    Arith {
        op: ArithOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Negate(Box<Node>),
    Compare {
        op: CmpOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Assign {
        target: usize,
        value: Box<Node>,
    },
    Write(Box<Node>),
    If {
        cond: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Option<Box<Node>>,
    },
    While {
        cond: Box<Node>,
        body: Box<Node>,
    },
    /// `repeat body until cond`; the body runs at least once.
    Repeat {
        body: Box<Node>,
        cond: Box<Node>,
    },
    Break,
    Continue,
}
