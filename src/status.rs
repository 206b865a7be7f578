use crate::program::{Program, MAX_PROGRAM_LEN};
use crate::synth::{ModeTag, Status};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU8, AtomicUsize, Ordering};

/// what the audio callback last reported, readable from the foreground
/// without locking. every field is published separately, so a reader can
/// catch a mix of two consecutive fills; that's fine for a status panel.
pub struct StatusBoard {
    mode: AtomicU8,
    submode: AtomicU8,
    cursor: AtomicUsize,
    high_water_mark: AtomicUsize,
    open: AtomicI32,
    modulation: AtomicI32,
    digits_spoken: AtomicUsize,
    test_slot: AtomicUsize,
    buttons: AtomicU32,
    fills: AtomicU32,
    program: [AtomicU8; MAX_PROGRAM_LEN],
    program_dirty: AtomicBool,
}

/// what the foreground gets back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub mode: ModeTag,
    pub submode: u8,
    pub cursor: usize,
    pub high_water_mark: usize,
    pub open: i32,
    pub modulation: i32,
    pub digits_spoken: usize,
    pub test_slot: usize,
    pub buttons: u32,
    pub fills: u32,
}

impl StatusBoard {
    pub fn new() -> Self {
        StatusBoard {
            mode: AtomicU8::new(ModeTag::Programming as u8),
            submode: AtomicU8::new(0),
            cursor: AtomicUsize::new(0),
            high_water_mark: AtomicUsize::new(0),
            open: AtomicI32::new(0),
            modulation: AtomicI32::new(0),
            digits_spoken: AtomicUsize::new(0),
            test_slot: AtomicUsize::new(0),
            buttons: AtomicU32::new(0),
            fills: AtomicU32::new(0),
            program: std::array::from_fn(|_| AtomicU8::new(0)),
            program_dirty: AtomicBool::new(false),
        }
    }

    /// called from the audio callback after each fill; bounded work, no locks.
    /// program bytes are only copied when the edit position has moved
    pub fn publish(&self, status: &Status, program: &Program) {
        let cursor = self.cursor.swap(status.cursor, Ordering::Relaxed);
        let high_water_mark = self
            .high_water_mark
            .swap(status.high_water_mark, Ordering::Relaxed);
        let mode = self.mode.swap(status.mode as u8, Ordering::Relaxed);
        if cursor != status.cursor
            || high_water_mark != status.high_water_mark
            || mode != status.mode as u8
        {
            for (slot, &byte) in self.program.iter().zip(program.code()) {
                slot.store(byte, Ordering::Relaxed);
            }
            self.program_dirty.store(true, Ordering::Release);
        }
        self.submode.store(status.submode as u8, Ordering::Relaxed);
        self.open.store(status.notes.open, Ordering::Relaxed);
        self.modulation
            .store(status.notes.modulation, Ordering::Relaxed);
        self.digits_spoken
            .store(status.digits_spoken, Ordering::Relaxed);
        self.test_slot.store(status.test_slot, Ordering::Relaxed);
        self.buttons.store(status.buttons.0, Ordering::Relaxed);
        self.fills.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: ModeTag::from_u8(self.mode.load(Ordering::Relaxed)),
            submode: self.submode.load(Ordering::Relaxed),
            cursor: self.cursor.load(Ordering::Relaxed),
            high_water_mark: self.high_water_mark.load(Ordering::Relaxed),
            open: self.open.load(Ordering::Relaxed),
            modulation: self.modulation.load(Ordering::Relaxed),
            digits_spoken: self.digits_spoken.load(Ordering::Relaxed),
            test_slot: self.test_slot.load(Ordering::Relaxed),
            buttons: self.buttons.load(Ordering::Relaxed),
            fills: self.fills.load(Ordering::Relaxed),
        }
    }

    /// copy out the program if it has changed since the last call
    pub fn take_program(&self, out: &mut Vec<u8>) -> bool {
        if !self.program_dirty.swap(false, Ordering::Acquire) {
            return false;
        }
        let len = self.high_water_mark.load(Ordering::Relaxed).min(MAX_PROGRAM_LEN);
        out.clear();
        out.extend(self.program[..len].iter().map(|b| b.load(Ordering::Relaxed)));
        true
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        StatusBoard::new()
    }
}
