/// # scheduler
///
/// the output device streams a circular buffer of 2 x BUFFER_SIZE samples and
/// says when it's finished with each half. the vacated half gets refilled
/// straight away, before the device wraps round into it again:
///
///   [ half 0 | half 1 ]
///     ^ playing        -> half 1 refilled when half 0 finishes
///               ^      -> half 0 refilled when half 1 finishes
///
/// a late refill just replays stale samples. the sample rate is only picked up
/// between refills.
use crate::clip::SILENCE;
use crate::input::Controls;
use crate::synth::Synth;

/// samples per half of the circular buffer
pub const BUFFER_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    First,
    Second,
}

/// the circular output buffer and its read position
pub struct DoubleBuffer {
    samples: [u8; BUFFER_SIZE * 2],
    read: usize,
    sample_rate: u32,
}

impl DoubleBuffer {
    pub fn new(sample_rate: u32) -> Self {
        DoubleBuffer {
            samples: [SILENCE; BUFFER_SIZE * 2],
            read: 0,
            sample_rate,
        }
    }

    /// the rate the device should currently run at
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// index of the next sample the device will read
    pub fn position(&self) -> usize {
        self.read
    }

    /// refill one half from the synth
    pub fn refill(&mut self, half: Half, synth: &mut Synth, controls: &mut impl Controls) {
        let range = match half {
            Half::First => 0..BUFFER_SIZE,
            Half::Second => BUFFER_SIZE..BUFFER_SIZE * 2,
        };
        synth.fill(controls, &mut self.samples[range]);
        self.sample_rate = synth.sample_rate();
    }

    /// what the device plays next; crossing a half boundary raises the
    /// "half consumed" notification and refills that half
    pub fn next_sample(&mut self, synth: &mut Synth, controls: &mut impl Controls) -> u8 {
        let s = self.samples[self.read];
        self.read += 1;
        if self.read == BUFFER_SIZE {
            self.refill(Half::First, synth, controls);
        } else if self.read == BUFFER_SIZE * 2 {
            self.read = 0;
            self.refill(Half::Second, synth, controls);
        }
        s
    }
}
