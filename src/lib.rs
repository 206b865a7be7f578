/// # bytebeat axe
///
/// a guitar-shaped bytebeat instrument. programs are entered one opcode at a
/// time with the frets and strum bar, committed with three zero strums, and
/// then played: the frets pick the pitch, the encoder moves the open and
/// modulation notes, the lever flips between melody and harmony.
///
/// ## Design
///
/// * everything audible is produced in the audio callback, a half-buffer at
///   a time; nothing in there allocates, locks or logs
/// * the foreground only scans inputs and reads status back; the two sides
///   share nothing but atomics
/// * the instrument talks through audio alone. the terminal panel is a
///   diagnostic aid
/// * abstract controls, sound and display so the core runs identically
///   under test, offline rendering and a real output device
///
/// Model
///
/// Host (main)
///  |-- KeyboardInput --> SharedControls (buttons, encoder delta)
///  |-- Sound(Producer)
///  |    `-- DoubleBuffer
///  |         `-- Synth::fill, once per half
///  |              |-- Debouncer / Frame
///  |              `-- one of: ProgramEditor, beep, PlayEngine, Announcer,
///  |                  clip self-test
///  `-- StatusBoard --> TermDisplay
pub mod announce;
pub mod clip;
pub mod display;
pub mod editor;
pub mod error;
pub mod input;
pub mod keyboard;
pub mod play;
pub mod program;
pub mod scheduler;
pub mod sound;
pub mod status;
pub mod synth;
pub mod vm;
