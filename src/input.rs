use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

/// strum / trigger line
pub const STRUM: u32 = 1;
/// fret lines start at this bit
pub const FRETS_OFFSET: u32 = 1;
pub const N_FRETS: u32 = 5;
/// largest number the frets can spell
pub const MAX_FRETS_VALUE: u32 = (1 << N_FRETS) - 1;
pub const FRETS_MASK: u32 = MAX_FRETS_VALUE << FRETS_OFFSET;
/// modulation lever
pub const WHAMMY: u32 = 1 << 6;

/// how many button lines get debounced
const N_BUTTONS: usize = 7;

/// release hysteresis while playing or idle
pub const DEBOUNCE_IDLE: u16 = 10;
/// release hysteresis while editing a program
pub const DEBOUNCE_PROGRAMMING: u16 = 100;

/// debounced state of every button line
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ButtonState(pub u32);

impl ButtonState {
    pub fn strum(&self) -> bool {
        self.0 & STRUM != 0
    }

    pub fn whammy(&self) -> bool {
        self.0 & WHAMMY != 0
    }

    /// the fret lines as a number, bit 0 = first fret
    pub fn frets(&self) -> u32 {
        (self.0 & FRETS_MASK) >> FRETS_OFFSET
    }
}

/// this poll's buttons alongside the last poll's, for edge detection
#[derive(Debug, Default, Clone, Copy)]
pub struct Frame {
    pub buttons: ButtonState,
    pub previous: ButtonState,
}

impl Frame {
    pub fn rising(&self, mask: u32) -> bool {
        self.buttons.0 & mask != 0 && self.previous.0 & mask == 0
    }
}

/// asymmetric debounce: a press registers immediately, a release only after
/// `cycles` quiet polls
pub struct Debouncer {
    counters: [u16; N_BUTTONS],
    cycles: u16,
}

impl Debouncer {
    pub fn new(cycles: u16) -> Self {
        Debouncer {
            counters: [0; N_BUTTONS],
            cycles,
        }
    }

    pub fn set_cycles(&mut self, cycles: u16) {
        self.cycles = cycles;
    }

    pub fn cycles(&self) -> u16 {
        self.cycles
    }

    pub fn poll(&mut self, raw: u32) -> ButtonState {
        let mut state = 0;
        for (bit, counter) in self.counters.iter_mut().enumerate() {
            let pressed = raw & (1 << bit) != 0;
            if pressed {
                *counter = self.cycles;
            }
            if *counter > 0 {
                state |= 1 << bit;
            }
            if !pressed {
                *counter = counter.saturating_sub(1);
            }
        }
        ButtonState(state)
    }
}

/// two-stage settling filter and direction decode for a rotary encoder
#[derive(Default)]
pub struct QuadratureDecoder {
    long_a: u32,
    long_b: u32,
    short_a: u8,
    short_b: u8,
    a: bool,
    b: bool,
}

impl QuadratureDecoder {
    pub fn new() -> Self {
        QuadratureDecoder::default()
    }

    /// feed one sample of each line; +1 or -1 on a settled rising edge of A
    pub fn poll(&mut self, a: bool, b: bool) -> i32 {
        self.long_a = (self.long_a << 1) | a as u32;
        self.long_b = (self.long_b << 1) | b as u32;
        self.short_a = (self.short_a << 1) | a as u8;
        self.short_b = (self.short_b << 1) | b as u8;

        let settled = uniform32(self.long_a)
            && uniform32(self.long_b)
            && uniform8(self.short_a)
            && uniform8(self.short_b);
        if !settled {
            return 0;
        }

        let rising = a && !self.a;
        self.a = a;
        self.b = b;
        match (rising, b) {
            (true, true) => 1,
            (true, false) => -1,
            _ => 0,
        }
    }
}

fn uniform32(history: u32) -> bool {
    history == 0 || history == u32::MAX
}

fn uniform8(history: u8) -> bool {
    history == 0 || history == u8::MAX
}

/// the hardware side of the instrument, as seen from the audio callback
pub trait Controls {
    /// undebounced button lines
    fn raw_buttons(&mut self) -> u32;

    /// accumulated encoder steps since the last call; clears them
    fn take_encoder_delta(&mut self) -> i32;
}

/// signed encoder steps written by the foreground loop and drained by the
/// audio callback
#[derive(Debug, Default)]
pub struct EncoderDelta(AtomicI32);

impl EncoderDelta {
    pub fn accumulate(&self, steps: i32) {
        if steps != 0 {
            self.0.fetch_add(steps, Ordering::Relaxed);
        }
    }

    pub fn drain(&self) -> i32 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// lock-free bridge between the foreground input loop and the producer
#[derive(Debug, Default)]
pub struct SharedControls {
    buttons: AtomicU32,
    encoder: EncoderDelta,
}

impl SharedControls {
    pub fn new() -> Self {
        SharedControls::default()
    }

    pub fn set_buttons(&self, raw: u32) {
        self.buttons.store(raw, Ordering::Relaxed);
    }

    pub fn encoder(&self) -> &EncoderDelta {
        &self.encoder
    }
}

impl Controls for &SharedControls {
    fn raw_buttons(&mut self) -> u32 {
        self.buttons.load(Ordering::Relaxed)
    }

    fn take_encoder_delta(&mut self) -> i32 {
        self.encoder.drain()
    }
}

/// dummy Controls implementation for testing
#[derive(Debug, Default)]
pub struct DummyControls {
    pub buttons: u32,
    pub encoder: i32,
}

impl DummyControls {
    pub fn new(buttons: u32) -> Self {
        DummyControls {
            buttons,
            encoder: 0,
        }
    }
}

impl Controls for DummyControls {
    fn raw_buttons(&mut self) -> u32 {
        self.buttons
    }

    fn take_encoder_delta(&mut self) -> i32 {
        std::mem::take(&mut self.encoder)
    }
}
