/// # vm
///
/// stack evaluator for bytebeat programs. one byte per opcode:
///  0x00-0x0f  push literal nibble
///  0x10       T   push the pitch timebase
///  0x11       U   push the modulation timebase
///  0x12-0x1b  AND OR XOR ADD SUB MUL DIV MOD SHL SHR (pop b, pop a, push a op b)
///  0x1c       SWP swap top two
///  0x1d       DUP duplicate top
///  0x1e       END halt
/// anything else is skipped.
///
/// the evaluator runs in the audio callback so nothing here can fail:
/// underflow leaves the stack alone, overflow drops the push, and division or
/// modulo by zero gives zero.
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// how deep the evaluation stack goes
pub const STACK_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Lit(u8),
    T,
    U,
    And,
    Or,
    Xor,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Swp,
    Dup,
    End,
}

impl Opcode {
    /// every defined opcode, in byte order
    pub const ALL: [Opcode; 31] = [
        Opcode::Lit(0x0),
        Opcode::Lit(0x1),
        Opcode::Lit(0x2),
        Opcode::Lit(0x3),
        Opcode::Lit(0x4),
        Opcode::Lit(0x5),
        Opcode::Lit(0x6),
        Opcode::Lit(0x7),
        Opcode::Lit(0x8),
        Opcode::Lit(0x9),
        Opcode::Lit(0xa),
        Opcode::Lit(0xb),
        Opcode::Lit(0xc),
        Opcode::Lit(0xd),
        Opcode::Lit(0xe),
        Opcode::Lit(0xf),
        Opcode::T,
        Opcode::U,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::Shl,
        Opcode::Shr,
        Opcode::Swp,
        Opcode::Dup,
        Opcode::End,
    ];

    pub const fn to_byte(self) -> u8 {
        match self {
            Opcode::Lit(n) => n & 0x0f,
            Opcode::T => 0x10,
            Opcode::U => 0x11,
            Opcode::And => 0x12,
            Opcode::Or => 0x13,
            Opcode::Xor => 0x14,
            Opcode::Add => 0x15,
            Opcode::Sub => 0x16,
            Opcode::Mul => 0x17,
            Opcode::Div => 0x18,
            Opcode::Mod => 0x19,
            Opcode::Shl => 0x1a,
            Opcode::Shr => 0x1b,
            Opcode::Swp => 0x1c,
            Opcode::Dup => 0x1d,
            Opcode::End => 0x1e,
        }
    }

    /// None for bytes the evaluator skips
    pub const fn from_byte(byte: u8) -> Option<Opcode> {
        match byte {
            0x00..=0x0f => Some(Opcode::Lit(byte)),
            0x10 => Some(Opcode::T),
            0x11 => Some(Opcode::U),
            0x12 => Some(Opcode::And),
            0x13 => Some(Opcode::Or),
            0x14 => Some(Opcode::Xor),
            0x15 => Some(Opcode::Add),
            0x16 => Some(Opcode::Sub),
            0x17 => Some(Opcode::Mul),
            0x18 => Some(Opcode::Div),
            0x19 => Some(Opcode::Mod),
            0x1a => Some(Opcode::Shl),
            0x1b => Some(Opcode::Shr),
            0x1c => Some(Opcode::Swp),
            0x1d => Some(Opcode::Dup),
            0x1e => Some(Opcode::End),
            _ => None,
        }
    }

    fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Lit(_) => "",
            Opcode::T => "t",
            Opcode::U => "u",
            Opcode::And => "&",
            Opcode::Or => "|",
            Opcode::Xor => "^",
            Opcode::Add => "+",
            Opcode::Sub => "-",
            Opcode::Mul => "*",
            Opcode::Div => "/",
            Opcode::Mod => "%",
            Opcode::Shl => "<<",
            Opcode::Shr => ">>",
            Opcode::Swp => "swp",
            Opcode::Dup => "dup",
            Opcode::End => "end",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Lit(n) => write!(f, "{:X}", n),
            op => f.write_str(op.mnemonic()),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown opcode mnemonic {0:?}")]
pub struct ParseOpcodeError(pub String);

impl FromStr for Opcode {
    type Err = ParseOpcodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        if lower.len() == 1 {
            if let Some(n) = lower.chars().next().and_then(|c| c.to_digit(16)) {
                return Ok(Opcode::Lit(n as u8));
            }
        }
        Opcode::ALL
            .iter()
            .skip(16)
            .find(|op| op.mnemonic() == lower)
            .copied()
            .ok_or_else(|| ParseOpcodeError(s.to_string()))
    }
}

/// parse whitespace-separated mnemonics, e.g. "t 5 * t 7 >> &"
pub fn parse_program(text: &str) -> Result<Vec<Opcode>, ParseOpcodeError> {
    text.split_whitespace().map(str::parse).collect()
}

/// fixed-capacity scratch stack; lives for one evaluation
struct Stack {
    values: [u32; STACK_SIZE],
    len: usize,
}

impl Stack {
    fn new() -> Self {
        Stack {
            values: [0; STACK_SIZE],
            len: 0,
        }
    }

    fn push(&mut self, v: u32) {
        // full stack drops the push
        if self.len < STACK_SIZE {
            self.values[self.len] = v;
            self.len += 1;
        }
    }

    fn top(&self) -> Option<u32> {
        self.len.checked_sub(1).map(|i| self.values[i])
    }

    fn binary(&mut self, op: impl Fn(u32, u32) -> u32) {
        if self.len < 2 {
            return;
        }
        let b = self.values[self.len - 1];
        let a = self.values[self.len - 2];
        self.len -= 1;
        self.values[self.len - 1] = op(a, b);
    }

    fn swap(&mut self) {
        if self.len >= 2 {
            self.values.swap(self.len - 1, self.len - 2);
        }
    }

    fn dup(&mut self) {
        if let Some(v) = self.top() {
            self.push(v);
        }
    }
}

/// run `program` from offset 0 until END or the end of the slice and return
/// the low byte of the top of stack (0 if empty)
pub fn evaluate(program: &[u8], t: u32, u: u32) -> u8 {
    let mut stack = Stack::new();
    for &byte in program {
        match Opcode::from_byte(byte) {
            Some(Opcode::Lit(n)) => stack.push(n as u32),
            Some(Opcode::T) => stack.push(t),
            Some(Opcode::U) => stack.push(u),
            Some(Opcode::And) => stack.binary(|a, b| a & b),
            Some(Opcode::Or) => stack.binary(|a, b| a | b),
            Some(Opcode::Xor) => stack.binary(|a, b| a ^ b),
            Some(Opcode::Add) => stack.binary(u32::wrapping_add),
            Some(Opcode::Sub) => stack.binary(u32::wrapping_sub),
            Some(Opcode::Mul) => stack.binary(u32::wrapping_mul),
            Some(Opcode::Div) => stack.binary(|a, b| a.checked_div(b).unwrap_or(0)),
            Some(Opcode::Mod) => stack.binary(|a, b| a.checked_rem(b).unwrap_or(0)),
            Some(Opcode::Shl) => stack.binary(|a, b| a.checked_shl(b).unwrap_or(0)),
            Some(Opcode::Shr) => stack.binary(|a, b| a.checked_shr(b).unwrap_or(0)),
            Some(Opcode::Swp) => stack.swap(),
            Some(Opcode::Dup) => stack.dup(),
            Some(Opcode::End) => break,
            None => {}
        }
    }
    stack.top().unwrap_or(0) as u8
}
