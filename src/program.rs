use crate::vm::Opcode;

/// how many opcode bytes a program can hold
pub const MAX_PROGRAM_LEN: usize = 1024;

/// the first two bytes are reserved and never edited; they evaluate as two
/// pushes of literal zero
pub const PROGRAM_START: usize = 2;

/// Program buffer with its edit cursor and high-water mark
///
///   0x000-0x001  reserved prefix
///   0x002-0x3ff  opcodes
///
/// `PROGRAM_START <= cursor <= high_water_mark <= MAX_PROGRAM_LEN` always holds
pub struct Program {
    bytes: Box<[u8; MAX_PROGRAM_LEN]>,
    cursor: usize,
    high_water_mark: usize,
}

impl Program {
    pub fn new() -> Self {
        Program {
            bytes: Box::new([0u8; MAX_PROGRAM_LEN]),
            cursor: PROGRAM_START,
            high_water_mark: PROGRAM_START,
        }
    }

    /// build a program from a list of opcodes, terminated with END
    pub fn from_opcodes(ops: &[Opcode]) -> Self {
        let mut p = Program::new();
        for op in ops {
            p.append(op.to_byte());
        }
        p.terminate(p.cursor);
        p
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// byte at `addr`, zero outside the buffer
    pub fn get(&self, addr: usize) -> u8 {
        self.bytes.get(addr).copied().unwrap_or(0)
    }

    /// byte under the cursor
    pub fn current(&self) -> u8 {
        self.get(self.cursor)
    }

    /// the part of the buffer the evaluator should run
    pub fn code(&self) -> &[u8] {
        &self.bytes[..self.high_water_mark]
    }

    /// the editable part of the program written so far
    pub fn body(&self) -> &[u8] {
        &self.bytes[PROGRAM_START..self.high_water_mark]
    }

    /// write at the cursor and move it on; full buffers drop the write
    pub fn append(&mut self, byte: u8) {
        if self.cursor >= MAX_PROGRAM_LEN {
            return;
        }
        self.bytes[self.cursor] = byte;
        self.cursor += 1;
        self.high_water_mark = self.high_water_mark.max(self.cursor);
    }

    /// move the cursor one step in the direction of `delta`, staying on a
    /// byte that has been written (or the first editable byte)
    pub fn step_cursor(&mut self, delta: i32) {
        let last = self.high_water_mark.saturating_sub(1).max(PROGRAM_START);
        let next = match delta.signum() {
            1 => self.cursor.saturating_add(1),
            -1 => self.cursor.saturating_sub(1),
            _ => self.cursor,
        };
        self.cursor = next.clamp(PROGRAM_START, last);
    }

    /// write END at `addr` if it's inside the editable region
    pub fn terminate(&mut self, addr: usize) {
        if (PROGRAM_START..MAX_PROGRAM_LEN).contains(&addr) {
            self.bytes[addr] = Opcode::End.to_byte();
            self.high_water_mark = self.high_water_mark.max(addr + 1);
        }
    }
}

impl Default for Program {
    fn default() -> Self {
        Program::new()
    }
}
