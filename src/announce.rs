use crate::clip::{ClipPlayer, ClipTable, SILENCE};

/// buffer fills of silence between spoken digits
pub const DIGIT_GAP_FILLS: u32 = 40;

const PI: [u8; 20] = [3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5, 8, 9, 7, 9, 3, 2, 3, 8, 4];
const E: [u8; 20] = [2, 7, 1, 8, 2, 8, 1, 8, 2, 8, 4, 5, 9, 0, 4, 5, 2, 3, 5, 3];

/// the named digit strings the instrument can recite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitSequence {
    Pi,
    E,
}

impl DigitSequence {
    /// pick a sequence from the low bit of a press count
    pub fn from_presses(presses: u32) -> Self {
        if presses & 1 == 0 {
            DigitSequence::Pi
        } else {
            DigitSequence::E
        }
    }

    pub fn digits(self) -> &'static [u8] {
        match self {
            DigitSequence::Pi => &PI,
            DigitSequence::E => &E,
        }
    }

    /// the named digits, then a hashed stream that never ends
    pub fn digit_at(self, position: usize) -> u8 {
        self.digits()
            .get(position)
            .copied()
            .unwrap_or_else(|| random_digit(position as u32))
    }
}

/// pseudo-random digit keyed by position; integer avalanche hash
pub fn random_digit(position: u32) -> u8 {
    let mut x = position;
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    (x % 10) as u8
}

/// recites a digit sequence one clip at a time, forever
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcer {
    sequence: DigitSequence,
    position: usize,
    gap: u32,
}

impl Announcer {
    pub fn new(sequence: DigitSequence) -> Self {
        Announcer {
            sequence,
            position: 0,
            gap: 0,
        }
    }

    pub fn sequence(&self) -> DigitSequence {
        self.sequence
    }

    /// how many digits have been spoken
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn fill(&mut self, clips: &ClipTable, player: &mut ClipPlayer, buf: &mut [u8]) {
        if self.gap > 0 {
            self.gap -= 1;
            buf.fill(SILENCE);
            return;
        }
        let digit = self.sequence.digit_at(self.position);
        if player.fill(clips, digit as usize, buf) {
            self.position = self.position.wrapping_add(1);
            self.gap = DIGIT_GAP_FILLS;
        }
    }
}
