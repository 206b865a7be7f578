use crate::clip::SILENCE;
use crate::input::{Frame, STRUM, WHAMMY};
use crate::vm;

/// semitones added by each fret, lowest fret first
pub const FRET_SEMITONES: [i32; 5] = [2, 1, 3, 7, 12];

/// three voices per chord, in semitones above the open note, indexed by the
/// fretting sum
pub const CHORDS: [[i32; 3]; 12] = [
    [0, 4, 7],
    [1, 4, 8],
    [2, 5, 9],
    [3, 7, 10],
    [4, 7, 11],
    [5, 9, 12],
    [6, 9, 12],
    [7, 11, 14],
    [8, 12, 15],
    [9, 12, 16],
    [10, 14, 17],
    [11, 14, 17],
];

pub const DEFAULT_OPEN_NOTE: i32 = 60;
pub const DEFAULT_MOD_NOTE: i32 = 48;

const N_NOTES: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaySubmode {
    #[default]
    MelodyPitch,
    MelodyMod,
    HarmonyPitch,
    HarmonyMod,
}

impl PlaySubmode {
    pub fn next(self) -> Self {
        match self {
            PlaySubmode::MelodyPitch => PlaySubmode::MelodyMod,
            PlaySubmode::MelodyMod => PlaySubmode::HarmonyPitch,
            PlaySubmode::HarmonyPitch => PlaySubmode::HarmonyMod,
            PlaySubmode::HarmonyMod => PlaySubmode::MelodyPitch,
        }
    }

    pub fn is_harmony(self) -> bool {
        matches!(self, PlaySubmode::HarmonyPitch | PlaySubmode::HarmonyMod)
    }

    /// does the encoder move the open note (true) or the mod note (false)
    pub fn adjusts_pitch(self) -> bool {
        matches!(self, PlaySubmode::MelodyPitch | PlaySubmode::HarmonyPitch)
    }
}

/// note numbers the encoder moves, in semitones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteState {
    pub open: i32,
    pub modulation: i32,
}

impl Default for NoteState {
    fn default() -> Self {
        NoteState {
            open: DEFAULT_OPEN_NOTE,
            modulation: DEFAULT_MOD_NOTE,
        }
    }
}

/// equal-tempered frequency of every MIDI note
pub struct FrequencyTable([f32; N_NOTES]);

impl FrequencyTable {
    pub fn new() -> Self {
        FrequencyTable(std::array::from_fn(|n| {
            440.0 * 2f32.powf((n as f32 - 69.0) / 12.0)
        }))
    }

    /// linear interpolation between semitones; out-of-range notes clamp
    pub fn frequency(&self, note: f32) -> f32 {
        let max = (N_NOTES - 1) as f32;
        let note = note.clamp(0.0, max);
        let lower = note.floor() as usize;
        let upper = (lower + 1).min(N_NOTES - 1);
        let frac = note - lower as f32;
        self.0[lower] * (1.0 - frac) + self.0[upper] * frac
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        FrequencyTable::new()
    }
}

/// per-sample phase step in 24.8 fixed point: the exposed timebase advances
/// 256 per cycle of `frequency`
pub fn phase_increment(frequency: f32, sample_rate: u32) -> u64 {
    (65536.0 * frequency as f64 / sample_rate.max(1) as f64).round() as u64
}

fn timebase(phase: u64) -> u32 {
    (phase >> 8) as u32
}

/// sum of the fret offsets for the frets held
pub fn fretting(frets: u32) -> i32 {
    FRET_SEMITONES
        .iter()
        .enumerate()
        .filter(|(i, _)| frets & (1 << *i) != 0)
        .map(|(_, s)| s)
        .sum()
}

/// the three harmony voices for a fretting sum, as offsets from the open note
pub fn chord(fretting: i32) -> [i32; 3] {
    usize::try_from(fretting)
        .ok()
        .and_then(|i| CHORDS.get(i))
        .copied()
        .unwrap_or([fretting; 3])
}

/// melody and harmony voices driven by the committed program
pub struct PlayEngine {
    submode: PlaySubmode,
    notes: NoteState,
    frequencies: FrequencyTable,
    t: u64,
    u: u64,
    voices: [u64; 3],
}

impl PlayEngine {
    pub fn new() -> Self {
        PlayEngine {
            submode: PlaySubmode::default(),
            notes: NoteState::default(),
            frequencies: FrequencyTable::new(),
            t: 0,
            u: 0,
            voices: [0; 3],
        }
    }

    pub fn submode(&self) -> PlaySubmode {
        self.submode
    }

    pub fn notes(&self) -> NoteState {
        self.notes
    }

    /// both notes, clamped to the table
    pub fn set_notes(&mut self, notes: NoteState) {
        let max = N_NOTES as i32 - 1;
        self.notes = NoteState {
            open: notes.open.clamp(0, max),
            modulation: notes.modulation.clamp(0, max),
        };
    }

    pub fn set_submode(&mut self, submode: PlaySubmode) {
        self.submode = submode;
    }

    /// back to the first submode with fresh counters; notes are kept
    pub fn enter(&mut self) {
        self.submode = PlaySubmode::default();
        self.reset_counters();
    }

    fn reset_counters(&mut self) {
        self.t = 0;
        self.u = 0;
        self.voices = [0; 3];
    }

    fn adjust(&mut self, delta: i32) {
        if delta == 0 {
            return;
        }
        let max = N_NOTES as i32 - 1;
        let note = if self.submode.adjusts_pitch() {
            &mut self.notes.open
        } else {
            &mut self.notes.modulation
        };
        *note = note.saturating_add(delta).clamp(0, max);
    }

    fn increment(&self, note: i32, sample_rate: u32) -> u64 {
        phase_increment(self.frequencies.frequency(note as f32), sample_rate)
    }

    pub fn fill(
        &mut self,
        code: &[u8],
        frame: &Frame,
        encoder: i32,
        sample_rate: u32,
        buf: &mut [u8],
    ) {
        if frame.rising(WHAMMY) {
            self.submode = self.submode.next();
        }
        self.adjust(encoder);

        if frame.rising(STRUM) {
            self.reset_counters();
        }
        if !frame.buttons.strum() {
            buf.fill(SILENCE);
            return;
        }

        let fretted = fretting(frame.buttons.frets());
        let u_step = self.increment(self.notes.modulation, sample_rate);

        if self.submode.is_harmony() {
            let intervals = chord(fretted);
            let steps = intervals.map(|i| self.increment(self.notes.open + i, sample_rate));
            for out in buf.iter_mut() {
                let u = timebase(self.u);
                let mix: u32 = self
                    .voices
                    .iter()
                    .map(|&t| vm::evaluate(code, timebase(t), u) as u32)
                    .sum();
                *out = (mix / 3) as u8;
                for (phase, step) in self.voices.iter_mut().zip(steps) {
                    *phase = phase.wrapping_add(step);
                }
                self.u = self.u.wrapping_add(u_step);
            }
        } else {
            let t_step = self.increment(self.notes.open + fretted, sample_rate);
            for out in buf.iter_mut() {
                *out = vm::evaluate(code, timebase(self.t), timebase(self.u));
                self.t = self.t.wrapping_add(t_step);
                self.u = self.u.wrapping_add(u_step);
            }
        }
    }
}

impl Default for PlayEngine {
    fn default() -> Self {
        PlayEngine::new()
    }
}
