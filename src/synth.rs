/// the synth context: every piece of session state the audio callback needs,
/// owned in one place and threaded through each fill

use crate::announce::{Announcer, DigitSequence};
use crate::clip::{ClipPlayer, ClipTable, N_CLIPS};
use crate::editor::{Commit, ProgramEditor};
use crate::input::{
    ButtonState, Controls, Debouncer, Frame, DEBOUNCE_IDLE, DEBOUNCE_PROGRAMMING,
};
use crate::play::{NoteState, PlayEngine, PlaySubmode};
use crate::program::Program;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// fills of beep between committing a program and playing it
pub const DEFAULT_BEEP_FILLS: u32 = 200;

/// square-wave period of the commit beep, in samples
const BEEP_PERIOD: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthConfig {
    pub sample_rate: u32,
    pub debounce_idle: u16,
    pub debounce_programming: u16,
    pub beep_fills: u32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        SynthConfig {
            sample_rate: DEFAULT_SAMPLE_RATE,
            debounce_idle: DEBOUNCE_IDLE,
            debounce_programming: DEBOUNCE_PROGRAMMING,
            beep_fills: DEFAULT_BEEP_FILLS,
        }
    }
}

/// which filler owns the next buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Programming,
    Beep { remaining: u32, phase: u32 },
    Play,
    NumberAnnounce(Announcer),
    Test { slot: usize },
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Programming => "programming",
            Mode::Beep { .. } => "beep",
            Mode::Play => "play",
            Mode::NumberAnnounce(_) => "announce",
            Mode::Test { .. } => "test",
        }
    }
}

/// plain copy of what the foreground wants to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub mode: ModeTag,
    pub submode: PlaySubmode,
    pub cursor: usize,
    pub high_water_mark: usize,
    pub notes: NoteState,
    pub digits_spoken: usize,
    pub sequence: Option<DigitSequence>,
    pub test_slot: usize,
    pub buttons: ButtonState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModeTag {
    Programming = 0,
    Beep = 1,
    Play = 2,
    NumberAnnounce = 3,
    Test = 4,
}

impl ModeTag {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => ModeTag::Beep,
            2 => ModeTag::Play,
            3 => ModeTag::NumberAnnounce,
            4 => ModeTag::Test,
            _ => ModeTag::Programming,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ModeTag::Programming => "programming",
            ModeTag::Beep => "beep",
            ModeTag::Play => "play",
            ModeTag::NumberAnnounce => "announce",
            ModeTag::Test => "test",
        }
    }
}

/// the top-level mode machine
pub struct Synth {
    config: SynthConfig,
    mode: Mode,
    debouncer: Debouncer,
    previous: ButtonState,
    editor: ProgramEditor,
    engine: PlayEngine,
    clips: ClipTable,
    player: ClipPlayer,
    /// rate change waiting for the next fill
    pending_rate: Option<u32>,
}

impl Synth {
    /// a fresh instrument waiting for a program
    pub fn new(config: SynthConfig, clips: ClipTable) -> Self {
        Synth {
            config,
            mode: Mode::Programming,
            debouncer: Debouncer::new(config.debounce_programming),
            previous: ButtonState::default(),
            editor: ProgramEditor::new(),
            engine: PlayEngine::new(),
            clips,
            player: ClipPlayer::new(),
            pending_rate: None,
        }
    }

    /// cycle through every clip slot; diagnostic only
    pub fn self_test(config: SynthConfig, clips: ClipTable) -> Self {
        let mut s = Synth::new(config, clips);
        s.mode = Mode::Test { slot: 0 };
        s.debouncer.set_cycles(config.debounce_idle);
        s
    }

    /// skip editing and go straight to playing `program`
    pub fn with_program(config: SynthConfig, clips: ClipTable, program: Program) -> Self {
        let mut s = Synth::new(config, clips);
        s.editor.replace_program(program);
        s.enter_play();
        s
    }

    /// preset the play engine, e.g. for offline rendering
    pub fn tune(&mut self, notes: NoteState, submode: PlaySubmode) {
        self.engine.set_notes(notes);
        self.engine.set_submode(submode);
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn program(&self) -> &Program {
        self.editor.program()
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// ask for a new output rate. it takes effect at the start of the next
    /// fill, so a half-buffer is never rendered at two rates
    pub fn set_sample_rate(&mut self, rate: u32) {
        self.pending_rate = Some(rate.max(1));
    }

    pub fn debounce_cycles(&self) -> u16 {
        self.debouncer.cycles()
    }

    pub fn status(&self) -> Status {
        let (digits_spoken, sequence) = match &self.mode {
            Mode::NumberAnnounce(a) => (a.position(), Some(a.sequence())),
            _ => (0, None),
        };
        Status {
            mode: self.mode_tag(),
            submode: self.engine.submode(),
            cursor: self.program().cursor(),
            high_water_mark: self.program().high_water_mark(),
            notes: self.engine.notes(),
            digits_spoken,
            sequence,
            test_slot: match self.mode {
                Mode::Test { slot } => slot,
                _ => 0,
            },
            buttons: self.previous,
        }
    }

    pub fn mode_tag(&self) -> ModeTag {
        match self.mode {
            Mode::Programming => ModeTag::Programming,
            Mode::Beep { .. } => ModeTag::Beep,
            Mode::Play => ModeTag::Play,
            Mode::NumberAnnounce(_) => ModeTag::NumberAnnounce,
            Mode::Test { .. } => ModeTag::Test,
        }
    }

    fn enter_play(&mut self) {
        self.debouncer.set_cycles(self.config.debounce_idle);
        self.engine.enter();
        self.mode = Mode::Play;
    }

    /// the single entry point for each half-buffer: poll the buttons, then
    /// hand the whole buffer to exactly one mode
    pub fn fill(&mut self, controls: &mut impl Controls, buf: &mut [u8]) {
        if let Some(rate) = self.pending_rate.take() {
            self.config.sample_rate = rate;
        }
        let frame = Frame {
            buttons: self.debouncer.poll(controls.raw_buttons()),
            previous: self.previous,
        };
        self.previous = frame.buttons;

        match &mut self.mode {
            Mode::Programming => {
                let commit =
                    self.editor
                        .fill(&frame, controls, &self.clips, &mut self.player, buf);
                match commit {
                    Some(Commit::Beep) => {
                        self.debouncer.set_cycles(self.config.debounce_idle);
                        self.mode = Mode::Beep {
                            remaining: self.config.beep_fills,
                            phase: 0,
                        };
                    }
                    Some(Commit::Announce(sequence)) => {
                        self.debouncer.set_cycles(self.config.debounce_idle);
                        self.player.reset();
                        self.mode = Mode::NumberAnnounce(Announcer::new(sequence));
                    }
                    None => {}
                }
            }
            Mode::Beep { remaining, phase } => {
                controls.take_encoder_delta();
                for out in buf.iter_mut() {
                    *out = if *phase % BEEP_PERIOD < BEEP_PERIOD / 2 {
                        0xff
                    } else {
                        0x00
                    };
                    *phase = phase.wrapping_add(1);
                }
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    self.enter_play();
                }
            }
            Mode::Play => {
                let encoder = controls.take_encoder_delta();
                self.engine.fill(
                    self.editor.program().code(),
                    &frame,
                    encoder,
                    self.config.sample_rate,
                    buf,
                );
            }
            Mode::NumberAnnounce(announcer) => {
                controls.take_encoder_delta();
                announcer.fill(&self.clips, &mut self.player, buf);
            }
            Mode::Test { slot } => {
                controls.take_encoder_delta();
                if self.player.fill(&self.clips, *slot, buf) {
                    *slot = (*slot + 1) % N_CLIPS;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::SILENCE;
    use crate::input::{DummyControls, FRETS_OFFSET, STRUM, WHAMMY};
    use crate::play::DEFAULT_OPEN_NOTE;
    use crate::scheduler::BUFFER_SIZE;
    use crate::vm::{self, Opcode};

    fn short_clips() -> ClipTable {
        let mut t = ClipTable::empty();
        for slot in 0..N_CLIPS {
            t.set(slot, vec![0x90; 12]);
        }
        t
    }

    struct Bench {
        synth: Synth,
        controls: DummyControls,
        buf: [u8; BUFFER_SIZE],
    }

    impl Bench {
        fn new(config: SynthConfig) -> Self {
            Bench {
                synth: Synth::new(config, short_clips()),
                controls: DummyControls::default(),
                buf: [0; BUFFER_SIZE],
            }
        }

        fn fill(&mut self, buttons: u32) {
            self.controls.buttons = buttons;
            self.synth.fill(&mut self.controls, &mut self.buf);
        }

        /// press the strum with `frets` held for one poll, then release long
        /// enough for the debounce to let go and the feedback to finish
        fn strum(&mut self, frets: u32, extra: u32) {
            self.fill(STRUM | (frets << FRETS_OFFSET) | extra);
            let quiet = self.synth.debounce_cycles() as usize + 2;
            for _ in 0..quiet {
                if self.synth.mode_tag() != ModeTag::Programming {
                    break;
                }
                self.fill(extra);
            }
        }
    }

    fn reference_body() -> Vec<Opcode> {
        use Opcode::*;
        vec![
            T,
            Lit(5),
            Mul,
            T,
            Lit(7),
            Shr,
            And,
            U,
            Lit(3),
            Mul,
            U,
            Lit(0xa),
            Shr,
            And,
            Or,
        ]
    }

    #[test]
    fn test_starts_programming() {
        let b = Bench::new(SynthConfig::default());
        assert_eq!(b.synth.mode(), &Mode::Programming);
        assert_eq!(b.synth.debounce_cycles(), DEBOUNCE_PROGRAMMING);
        assert_eq!(b.synth.sample_rate(), DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn test_end_to_end_program_then_play() {
        let config = SynthConfig::default();
        let mut b = Bench::new(config);
        for op in reference_body() {
            b.strum(op.to_byte() as u32, 0);
        }
        for _ in 0..3 {
            b.strum(0, 0);
        }
        assert!(matches!(b.synth.mode(), Mode::Beep { .. }));
        assert_eq!(b.synth.debounce_cycles(), DEBOUNCE_IDLE);

        let mut expected: Vec<u8> = vec![0, 0];
        expected.extend(reference_body().iter().map(|op| op.to_byte()));
        expected.push(Opcode::End.to_byte());
        assert_eq!(b.synth.program().code(), &expected[..]);

        let mut fills = 0;
        while b.synth.mode_tag() == ModeTag::Beep {
            b.fill(0);
            fills += 1;
            assert!(fills <= config.beep_fills);
        }
        assert_eq!(b.synth.mode(), &Mode::Play);

        // a strum now plays the program
        b.fill(STRUM);
        let t_step = crate::play::phase_increment(
            crate::play::FrequencyTable::new().frequency(60.0),
            config.sample_rate,
        );
        let u_step = crate::play::phase_increment(
            crate::play::FrequencyTable::new().frequency(48.0),
            config.sample_rate,
        );
        for (i, &s) in b.buf.iter().enumerate() {
            let t = ((t_step * i as u64) >> 8) as u32;
            let u = ((u_step * i as u64) >> 8) as u32;
            assert_eq!(s, vm::evaluate(&expected, t, u));
        }
    }

    #[test]
    fn test_beep_waveform_and_countdown() {
        let config = SynthConfig {
            beep_fills: 3,
            ..SynthConfig::default()
        };
        let mut b = Bench::new(config);
        for _ in 0..3 {
            b.strum(0, 0);
        }
        assert_eq!(b.synth.mode(), &Mode::Beep { remaining: 3, phase: 0 });
        b.fill(0);
        assert_eq!(b.buf[..10], [0xff, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0, 0]);
        b.fill(0);
        assert_eq!(b.synth.mode_tag(), ModeTag::Beep);
        b.fill(0);
        assert_eq!(b.synth.mode(), &Mode::Play);
        // the committing strum was pressed under the long editing debounce
        for _ in 0..DEBOUNCE_PROGRAMMING {
            b.fill(0);
        }
        assert_eq!(b.buf, [SILENCE; BUFFER_SIZE]);
    }

    #[test]
    fn test_commit_with_lever_goes_to_announce() {
        let mut b = Bench::new(SynthConfig::default());
        b.strum(0x12, 0);
        b.strum(0, 0);
        b.strum(0, 0);
        b.strum(0, WHAMMY);
        assert_eq!(b.synth.mode_tag(), ModeTag::NumberAnnounce);
        // the lever went down once while editing
        assert_eq!(b.synth.status().sequence, Some(DigitSequence::E));
        for _ in 0..10_000 {
            b.fill(WHAMMY | STRUM);
        }
        assert_eq!(b.synth.mode_tag(), ModeTag::NumberAnnounce);
        assert!(b.synth.status().digits_spoken > 20);
    }

    #[test]
    fn test_self_test_cycles_slots() {
        let mut s = Synth::self_test(SynthConfig::default(), short_clips());
        let mut controls = DummyControls::default();
        let mut buf = [0u8; BUFFER_SIZE];
        for expected in (0..N_CLIPS).chain(0..2) {
            assert_eq!(s.mode(), &Mode::Test { slot: expected });
            s.fill(&mut controls, &mut buf);
            assert_eq!(buf[..50], [0x90; 50]);
        }
    }

    #[test]
    fn test_with_program_plays() {
        let program = Program::from_opcodes(&[Opcode::Lit(7)]);
        let mut s = Synth::with_program(SynthConfig::default(), short_clips(), program);
        assert_eq!(s.mode(), &Mode::Play);
        assert_eq!(s.debounce_cycles(), DEBOUNCE_IDLE);
        let mut controls = DummyControls::new(STRUM);
        let mut buf = [0u8; BUFFER_SIZE];
        s.fill(&mut controls, &mut buf);
        assert_eq!(buf, [7; BUFFER_SIZE]);
    }

    #[test]
    fn test_play_consumes_encoder() {
        let program = Program::from_opcodes(&[Opcode::T]);
        let mut s = Synth::with_program(SynthConfig::default(), short_clips(), program);
        let mut controls = DummyControls::default();
        controls.encoder = 2;
        let mut buf = [0u8; BUFFER_SIZE];
        s.fill(&mut controls, &mut buf);
        assert_eq!(controls.encoder, 0);
        assert_eq!(s.status().notes.open, 62);
    }

    #[test]
    fn test_encoder_drained_outside_play() {
        let config = SynthConfig {
            beep_fills: 2,
            ..SynthConfig::default()
        };
        let mut b = Bench::new(config);
        for _ in 0..3 {
            b.strum(0, 0);
        }
        assert_eq!(b.synth.mode_tag(), ModeTag::Beep);
        b.controls.encoder = 5;
        b.fill(0);
        assert_eq!(b.controls.encoder, 0);
        b.fill(0);
        assert_eq!(b.synth.mode(), &Mode::Play);
        b.fill(0);
        assert_eq!(b.synth.status().notes.open, DEFAULT_OPEN_NOTE);

        let mut s = Synth::self_test(SynthConfig::default(), short_clips());
        let mut controls = DummyControls::default();
        controls.encoder = -3;
        let mut buf = [0u8; BUFFER_SIZE];
        s.fill(&mut controls, &mut buf);
        assert_eq!(controls.encoder, 0);
    }

    #[test]
    fn test_sample_rate_change_waits_for_fill() {
        let program = Program::from_opcodes(&[Opcode::T]);
        let mut s = Synth::with_program(SynthConfig::default(), short_clips(), program);
        s.set_sample_rate(8000);
        assert_eq!(s.sample_rate(), DEFAULT_SAMPLE_RATE);
        let mut controls = DummyControls::new(STRUM);
        let mut buf = [0u8; BUFFER_SIZE];
        s.fill(&mut controls, &mut buf);
        assert_eq!(s.sample_rate(), 8000);
        s.set_sample_rate(0);
        s.fill(&mut controls, &mut buf);
        assert_eq!(s.sample_rate(), 1);
    }

    #[test]
    fn test_status_snapshot() {
        let mut b = Bench::new(SynthConfig::default());
        b.strum(0x10, 0);
        let st = b.synth.status();
        assert_eq!(st.mode, ModeTag::Programming);
        assert_eq!(st.cursor, 3);
        assert_eq!(st.high_water_mark, 3);
        for tag in [
            ModeTag::Programming,
            ModeTag::Beep,
            ModeTag::Play,
            ModeTag::NumberAnnounce,
            ModeTag::Test,
        ] {
            assert_eq!(ModeTag::from_u8(tag as u8), tag);
        }
    }
}
