use crate::announce::DigitSequence;
use crate::clip::{ClipPlayer, ClipTable, SILENCE};
use crate::input::{Controls, Frame, STRUM, WHAMMY};
use crate::program::Program;

/// consecutive empty strums that commit the program
pub const COMMIT_RUN: usize = 3;

/// where the instrument goes once a program is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    Beep,
    Announce(DigitSequence),
}

/// turns fret, strum and encoder gestures into program edits, speaking each
/// opcode back as it's entered or reviewed
pub struct ProgramEditor {
    program: Program,
    /// clip still being spoken; input waits for it
    pending: Option<usize>,
    zero_run: usize,
    lever_presses: u32,
}

impl ProgramEditor {
    pub fn new() -> Self {
        ProgramEditor {
            program: Program::new(),
            pending: None,
            zero_run: 0,
            lever_presses: 0,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// swap in a finished program, e.g. one loaded from a script
    pub fn replace_program(&mut self, program: Program) {
        self.program = program;
        self.pending = None;
        self.zero_run = 0;
    }

    pub fn is_speaking(&self) -> bool {
        self.pending.is_some()
    }

    pub fn fill(
        &mut self,
        frame: &Frame,
        controls: &mut impl Controls,
        clips: &ClipTable,
        player: &mut ClipPlayer,
        buf: &mut [u8],
    ) -> Option<Commit> {
        if frame.rising(WHAMMY) {
            self.lever_presses = self.lever_presses.wrapping_add(1);
        }

        if self.pending.is_some() {
            self.speak(clips, player, buf);
            return None;
        }

        let delta = controls.take_encoder_delta();
        if delta != 0 {
            self.program.step_cursor(delta);
            self.zero_run = 0;
            self.pending = Some(self.program.current() as usize);
            self.speak(clips, player, buf);
            return None;
        }

        if frame.rising(STRUM) {
            let opcode = frame.buttons.frets() as u8;
            if opcode == 0 {
                // empty strums only count towards a commit
                self.zero_run += 1;
                buf.fill(SILENCE);
                if self.zero_run >= COMMIT_RUN {
                    return Some(self.commit(frame));
                }
                return None;
            }
            self.zero_run = 0;
            self.program.append(opcode);
            self.pending = Some(opcode as usize);
            self.speak(clips, player, buf);
            return None;
        }

        buf.fill(SILENCE);
        None
    }

    fn speak(&mut self, clips: &ClipTable, player: &mut ClipPlayer, buf: &mut [u8]) {
        if let Some(slot) = self.pending {
            if player.fill(clips, slot, buf) {
                self.pending = None;
            }
        }
    }

    /// END goes where the run of empty strums began; nothing moves the
    /// cursor during a run, so that's the cursor itself
    fn commit(&mut self, frame: &Frame) -> Commit {
        self.program.terminate(self.program.cursor());
        self.zero_run = 0;
        if frame.buttons.whammy() {
            Commit::Announce(DigitSequence::from_presses(self.lever_presses))
        } else {
            Commit::Beep
        }
    }
}

impl Default for ProgramEditor {
    fn default() -> Self {
        ProgramEditor::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ButtonState, DummyControls, FRETS_OFFSET, MAX_FRETS_VALUE};
    use crate::program::{MAX_PROGRAM_LEN, PROGRAM_START};
    use crate::vm::Opcode;

    /// every clip three samples long, so feedback lasts five output samples
    fn short_clips() -> ClipTable {
        let mut t = ClipTable::empty();
        for slot in 0..crate::clip::N_CLIPS {
            t.set(slot, vec![0x90, 0x90, 0x90]);
        }
        t
    }

    struct Rig {
        editor: ProgramEditor,
        clips: ClipTable,
        player: ClipPlayer,
        controls: DummyControls,
        previous: ButtonState,
    }

    impl Rig {
        fn new() -> Self {
            Rig {
                editor: ProgramEditor::new(),
                clips: short_clips(),
                player: ClipPlayer::new(),
                controls: DummyControls::default(),
                previous: ButtonState(0),
            }
        }

        fn step(&mut self, buttons: u32) -> (Option<Commit>, [u8; 16]) {
            let frame = Frame {
                buttons: ButtonState(buttons),
                previous: self.previous,
            };
            self.previous = frame.buttons;
            let mut buf = [0u8; 16];
            let commit = self.editor.fill(
                &frame,
                &mut self.controls,
                &self.clips,
                &mut self.player,
                &mut buf,
            );
            (commit, buf)
        }

        /// strum with `frets` held, then let go
        fn strum(&mut self, frets: u32, extra: u32) -> Option<Commit> {
            let (commit, _) = self.step(STRUM | (frets << FRETS_OFFSET) | extra);
            self.step(extra);
            commit
        }

        fn check_invariant(&self) {
            let p = self.editor.program();
            assert!(p.cursor() <= p.high_water_mark());
            assert!(p.high_water_mark() <= MAX_PROGRAM_LEN);
        }
    }

    #[test]
    fn test_strum_writes_opcode() {
        let mut r = Rig::new();
        let (commit, buf) = r.step(STRUM | (0x10 << FRETS_OFFSET));
        assert_eq!(commit, None);
        assert_eq!(r.editor.program().body(), &[0x10]);
        // feedback starts straight away
        assert_eq!(buf[..5], [0x90; 5]);
        assert!(!r.editor.is_speaking());
    }

    #[test]
    fn test_input_waits_for_feedback() {
        let mut r = Rig::new();
        r.clips.set(5, vec![0x90; 20]);
        r.strum(5, 0);
        assert!(r.editor.is_speaking());
        // this strum lands while the clip is still playing
        r.strum(6, 0);
        assert_eq!(r.editor.program().body(), &[5]);
        r.controls.encoder = 1;
        for _ in 0..10 {
            r.step(0);
        }
        assert!(!r.editor.is_speaking());
        assert_eq!(r.controls.encoder, 0);
    }

    #[test]
    fn test_silence_when_idle() {
        let mut r = Rig::new();
        let (_, buf) = r.step(0);
        assert_eq!(buf, [SILENCE; 16]);
    }

    #[test]
    fn test_encoder_reviews_program() {
        let mut r = Rig::new();
        r.clips.set(9, vec![0x11, 0x11, 0x11]);
        for op in [3, 7, 9] {
            r.strum(op, 0);
        }
        // one step per read, whatever the size of the turn
        r.controls.encoder = -4;
        let (_, buf) = r.step(0);
        assert_eq!(r.editor.program().cursor(), PROGRAM_START + 2);
        assert_eq!(r.editor.program().current(), 9);
        assert_eq!(buf[..5], [0x11; 5]);
        assert_eq!(r.controls.encoder, 0);

        r.controls.encoder = -1;
        r.step(0);
        assert_eq!(r.editor.program().current(), 7);

        for _ in 0..2 {
            r.controls.encoder = 9;
            r.step(0);
        }
        assert_eq!(r.editor.program().cursor(), PROGRAM_START + 2);
    }

    #[test]
    fn test_triple_zero_commits() {
        let mut r = Rig::new();
        r.strum(0x17, 0);
        let p = r.editor.program().cursor();
        assert!(p > 0);
        assert_eq!(r.strum(0, 0), None);
        assert_eq!(r.strum(0, 0), None);
        assert_eq!(r.strum(0, 0), Some(Commit::Beep));
        assert_eq!(r.editor.program().get(p), Opcode::End.to_byte());
        assert_eq!(r.editor.program().get(p - 1), 0x17);
    }

    #[test]
    fn test_empty_strum_leaves_program_alone() {
        let mut r = Rig::new();
        r.strum(5, 0);
        let (commit, buf) = r.step(STRUM);
        assert_eq!(commit, None);
        assert_eq!(buf, [SILENCE; 16]);
        r.step(0);
        r.strum(7, 0);
        assert_eq!(r.editor.program().body(), &[5, 7]);
        assert_eq!(r.editor.program().cursor(), PROGRAM_START + 2);
    }

    #[test]
    fn test_commit_after_stray_zero() {
        let mut r = Rig::new();
        r.strum(0x10, 0);
        r.strum(0, 0);
        r.strum(5, 0);
        r.strum(0x17, 0);
        for _ in 0..2 {
            assert_eq!(r.strum(0, 0), None);
        }
        assert_eq!(r.strum(0, 0), Some(Commit::Beep));
        assert_eq!(r.editor.program().body(), &[0x10, 5, 0x17, 0x1e]);
    }

    #[test]
    fn test_interrupted_zero_run() {
        let mut r = Rig::new();
        r.strum(1, 0);
        r.strum(0, 0);
        r.strum(0, 0);
        r.strum(2, 0);
        r.strum(0, 0);
        assert_eq!(r.strum(0, 0), None);
        r.controls.encoder = 1;
        r.step(0);
        assert_eq!(r.strum(0, 0), None);
    }

    #[test]
    fn test_commit_with_lever_announces() {
        let mut r = Rig::new();
        r.strum(4, 0);
        // one lever press while editing
        r.step(WHAMMY);
        r.step(0);
        r.strum(0, 0);
        r.strum(0, 0);
        let commit = r.strum(0, WHAMMY);
        assert_eq!(
            commit,
            Some(Commit::Announce(DigitSequence::from_presses(2)))
        );

        let mut r = Rig::new();
        r.strum(0, WHAMMY);
        r.strum(0, WHAMMY);
        assert_eq!(
            r.strum(0, WHAMMY),
            Some(Commit::Announce(DigitSequence::from_presses(1)))
        );
    }

    #[test]
    fn test_commit_on_empty_program() {
        let mut r = Rig::new();
        r.strum(0, 0);
        r.strum(0, 0);
        assert_eq!(r.strum(0, 0), Some(Commit::Beep));
        assert_eq!(r.editor.program().get(PROGRAM_START), Opcode::End.to_byte());
        assert_eq!(r.editor.program().get(0), 0);
    }

    #[test]
    fn test_invariant_under_random_gestures() {
        let mut r = Rig::new();
        let mut x: u32 = 0xdead_beef;
        for _ in 0..20_000 {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            match x % 4 {
                0 => {
                    r.strum((x >> 4) & MAX_FRETS_VALUE, 0);
                }
                1 => r.controls.encoder = (x >> 8) as i32 % 5,
                _ => {
                    r.step(0);
                }
            }
            r.check_invariant();
        }
    }
}
