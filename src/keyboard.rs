use crate::input::{QuadratureDecoder, SharedControls, FRETS_OFFSET, STRUM, WHAMMY};
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// how long a strum stays down after its key event; terminals don't report
/// key release, and auto-repeat renews it
const STRUM_HOLD: Duration = Duration::from_millis(150);

/// foreground polls each quadrature state is held for
pub const ENCODER_HOLD_POLLS: u32 = 40;

/// one detent clockwise: B leads A
const CLOCKWISE: [(bool, bool); 4] = [(false, true), (true, true), (true, false), (false, false)];
/// one detent anticlockwise: A leads B
const ANTICLOCKWISE: [(bool, bool); 4] =
    [(true, false), (true, true), (false, true), (false, false)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Strum,
    Fret(u32),
    ClearFrets,
    Whammy,
}

/// left hand on the number row for frets, space to strum, w for the lever
const KEYMAP: [(char, Key); 8] = [
    (' ', Key::Strum),
    ('1', Key::Fret(0)),
    ('2', Key::Fret(1)),
    ('3', Key::Fret(2)),
    ('4', Key::Fret(3)),
    ('5', Key::Fret(4)),
    ('0', Key::ClearFrets),
    ('w', Key::Whammy),
];

/// simulated encoder lines, stepped once per foreground poll
#[derive(Default)]
pub struct EncoderLines {
    queue: VecDeque<(bool, bool)>,
    held: u32,
    decoder: QuadratureDecoder,
}

impl EncoderLines {
    /// queue one detent of rotation
    pub fn turn(&mut self, clockwise: bool) {
        let states = if clockwise { CLOCKWISE } else { ANTICLOCKWISE };
        self.queue.extend(states);
    }

    /// advance one poll and decode it
    pub fn poll(&mut self) -> i32 {
        let (a, b) = self.queue.front().copied().unwrap_or((false, false));
        self.held += 1;
        if self.held >= ENCODER_HOLD_POLLS {
            self.held = 0;
            self.queue.pop_front();
        }
        self.decoder.poll(a, b)
    }
}

/// the instrument's controls on a computer keyboard, via crossterm
pub struct KeyboardInput {
    controls: Arc<SharedControls>,
    keymap: HashMap<char, Key>,
    frets: u32,
    whammy: bool,
    strum_until: Option<Instant>,
    encoder: EncoderLines,
}

impl KeyboardInput {
    pub fn new(controls: Arc<SharedControls>) -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(KeyboardInput {
            controls,
            keymap: HashMap::from(KEYMAP),
            frets: 0,
            whammy: false,
            strum_until: None,
            encoder: EncoderLines::default(),
        })
    }

    /// one foreground tick: read pending keys, publish the button lines and
    /// accumulate encoder steps. false once the player asks to quit
    pub fn poll(&mut self) -> Result<bool, io::Error> {
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(KeyEvent { code, modifiers }) => match code {
                    KeyCode::Esc | KeyCode::Char('q') => return Ok(false),
                    KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(false)
                    }
                    KeyCode::Left => self.encoder.turn(false),
                    KeyCode::Right => self.encoder.turn(true),
                    KeyCode::Char(c) => match self.keymap.get(&c.to_ascii_lowercase()) {
                        Some(key) => self.press(*key),
                        None => debug!("unmapped key {:?}", c),
                    },
                    other => debug!("unmapped key {:?}", other),
                },
                Event::Resize(..) => {}
                other => warn!("unexpected terminal event {:?}", other),
            }
        }

        let strum = match self.strum_until {
            Some(until) if Instant::now() < until => STRUM,
            _ => 0,
        };
        let whammy = if self.whammy { WHAMMY } else { 0 };
        self.controls
            .set_buttons(strum | (self.frets << FRETS_OFFSET) | whammy);
        self.controls.encoder().accumulate(self.encoder.poll());
        Ok(true)
    }

    fn press(&mut self, key: Key) {
        match key {
            Key::Strum => self.strum_until = Some(Instant::now() + STRUM_HOLD),
            Key::Fret(n) => self.frets ^= 1 << n,
            Key::ClearFrets => self.frets = 0,
            Key::Whammy => self.whammy = !self.whammy,
        }
    }
}

impl Drop for KeyboardInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("couldn't restore the terminal: {}", e);
        }
    }
}
