//! The instruction buffer for the abstract stack machine.
//!
//! An instruction's address is its index in the buffer; addresses are
//! stable once assigned and appending never invalidates them. Forward jump
//! targets are resolved by backpatching: `reserve` appends a `Nop`
//! placeholder and returns its address, and `patch` later overwrites that
//! slot in place. A finished buffer is flushed exactly once, in ascending
//! address order.

use std::fmt;
use std::io::{self, Write};

use super::lexer::CmpOp;

/// The stack machine's instruction set.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[allow(dead_code)]
pub enum Instruction {
    /// Reserved-slot placeholder; never survives to a finished listing.
    Nop,
    Stop,
    /// Memory access by cell address.
    Load(usize),
    Store(usize),
    /// Displaced memory access: cell address plus the value at the stack
    /// head. Interpreted by the machine, never emitted by this front end.
    Bload(usize),
    Bstore(usize),
    Push(i64),
    Pop,
    Dup,
    Add,
    Sub,
    Mult,
    Div,
    /// Flips the sign of the stack head.
    Invert,
    /// The operand picks the relation: 0..5 for `= != < > <= >=`.
    Compare(CmpOp),
    Jump(usize),
    /// Conditional jumps consume the boolean at the stack head.
    JumpYes(usize),
    JumpNo(usize),
    Input,
    Print,
}

impl Instruction {
    /// The opcode name as it appears in listings.
    pub fn mnemonic(&self) -> &'static str {
        use Instruction::*;
        match self {
            Nop => "NOP",
            Stop => "STOP",
            Load(_) => "LOAD",
            Store(_) => "STORE",
            Bload(_) => "BLOAD",
            Bstore(_) => "BSTORE",
            Push(_) => "PUSH",
            Pop => "POP",
            Dup => "DUP",
            Add => "ADD",
            Sub => "SUB",
            Mult => "MULT",
            Div => "DIV",
            Invert => "INVERT",
            Compare(_) => "COMPARE",
            Jump(_) => "JUMP",
            JumpYes(_) => "JUMP_YES",
            JumpNo(_) => "JUMP_NO",
            Input => "INPUT",
            Print => "PRINT",
        }
    }

    /// The operand printed after the mnemonic, if the opcode takes one.
    pub fn operand(&self) -> Option<i64> {
        use Instruction::*;
        match self {
            Load(addr) | Store(addr) | Bload(addr) | Bstore(addr) | Jump(addr)
            | JumpYes(addr) | JumpNo(addr) => Some(*addr as i64),
            Push(value) => Some(*value),
            Compare(op) => Some(i64::from(compare_code(*op))),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.operand() {
            Some(arg) => write!(f, "{}\t{}", self.mnemonic(), arg),
            None => write!(f, "{}", self.mnemonic()),
        }
    }
}

/// `COMPARE` operand codes.
fn compare_code(op: CmpOp) -> u8 {
    match op {
        CmpOp::Eq => 0,
        CmpOp::Ne => 1,
        CmpOp::Lt => 2,
        CmpOp::Gt => 3,
        CmpOp::Le => 4,
        CmpOp::Ge => 5,
    }
}

/// An append-only instruction sequence addressed by index.
#[derive(Debug)]
pub struct CodeBuffer {
    code: Vec<Instruction>,
}

impl CodeBuffer {
    pub fn new() -> Self {
        CodeBuffer { code: Vec::new() }
    }

    /// Appends an instruction. Its address is the buffer length before the
    /// call.
    pub fn emit(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    /// Appends a `Nop` placeholder and returns its address, for jumps whose
    /// target is not known yet.
    pub fn reserve(&mut self) -> usize {
        self.emit(Instruction::Nop);
        self.code.len() - 1
    }

    /// Overwrites the instruction at a previously issued address.
    pub fn patch(&mut self, address: usize, instruction: Instruction) {
        assert!(
            address < self.code.len(),
            "patch address {} outside the buffer (length {})",
            address,
            self.code.len()
        );
        self.code[address] = instruction;
    }

    /// The address the next emitted instruction will receive.
    pub fn current_address(&self) -> usize {
        self.code.len()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.code
    }

    /// Writes one `<address>:\t<instruction>` line per instruction, in
    /// ascending address order.
    pub fn flush<W: Write>(&self, output: &mut W) -> io::Result<()> {
        for (address, instruction) in self.code.iter().enumerate() {
            writeln!(output, "{}:\t{}", address, instruction)?;
        }
        output.flush()
    }
}
