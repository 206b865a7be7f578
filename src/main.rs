use clap::{crate_version, Parser, Subcommand};
use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bytebeat_axe::clip::ClipTable;
use bytebeat_axe::display::{Display, TermDisplay};
use bytebeat_axe::input::{SharedControls, FRETS_MASK, FRETS_OFFSET, STRUM};
use bytebeat_axe::keyboard::KeyboardInput;
use bytebeat_axe::play::{NoteState, PlaySubmode, DEFAULT_MOD_NOTE, DEFAULT_OPEN_NOTE};
use bytebeat_axe::program::Program;
use bytebeat_axe::sound::{render_wav, CpalSound, Mute, Producer, Sound};
use bytebeat_axe::status::StatusBoard;
use bytebeat_axe::synth::{ModeTag, Synth, SynthConfig, DEFAULT_SAMPLE_RATE};
use bytebeat_axe::vm::parse_program;

/// keyboard scan period of the foreground loop
const FOREGROUND_TICK: Duration = Duration::from_micros(500);

/// redraw the panel every this many ticks
const DRAW_EVERY: u32 = 80;

#[derive(Parser)]
#[clap(
    author,
    version = crate_version!(),
    about = "A live-programmable bytebeat instrument."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the instrument from the keyboard.
    Play {
        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        /// Directory of 00.wav..31.wav voice clips.
        #[arg(long)]
        clips: Option<PathBuf>,

        /// Run without an audio device.
        #[arg(long)]
        mute: bool,

        /// Write logs here instead of discarding them.
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Render a program to an 8-bit WAV file.
    Render {
        /// Whitespace-separated mnemonics, e.g. "t t 8 >> |".
        #[arg(long)]
        program: String,

        /// Open note as a MIDI note number.
        #[arg(long, default_value_t = DEFAULT_OPEN_NOTE)]
        note: i32,

        /// Modulation note as a MIDI note number.
        #[arg(long, default_value_t = DEFAULT_MOD_NOTE)]
        mod_note: i32,

        /// Play a three-voice chord instead of a single voice.
        #[arg(long)]
        harmony: bool,

        /// Fret lines held, lowest fret in bit 0.
        #[arg(long, default_value_t = 0)]
        frets: u32,

        #[arg(long, default_value_t = 5.0)]
        seconds: f32,

        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        #[arg(long)]
        out: PathBuf,
    },
    /// Play every voice clip in turn.
    Test {
        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        #[arg(long)]
        clips: Option<PathBuf>,

        #[arg(long)]
        mute: bool,

        #[arg(long)]
        log_file: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Play {
            sample_rate,
            clips,
            mute,
            log_file,
        } => {
            init_logging(log_file.as_deref(), true)?;
            let config = SynthConfig {
                sample_rate,
                ..SynthConfig::default()
            };
            let synth = Synth::new(config, load_clips(clips.as_deref())?);
            run_interactive(synth, mute)
        }
        Commands::Render {
            program,
            note,
            mod_note,
            harmony,
            frets,
            seconds,
            sample_rate,
            out,
        } => {
            init_logging(None, false)?;
            let ops = parse_program(&program)?;
            let config = SynthConfig {
                sample_rate,
                ..SynthConfig::default()
            };
            let mut synth =
                Synth::with_program(config, ClipTable::default(), Program::from_opcodes(&ops));
            let submode = if harmony {
                PlaySubmode::HarmonyPitch
            } else {
                PlaySubmode::MelodyPitch
            };
            synth.tune(
                NoteState {
                    open: note,
                    modulation: mod_note,
                },
                submode,
            );

            let controls = Arc::new(SharedControls::new());
            controls.set_buttons(STRUM | ((frets << FRETS_OFFSET) & FRETS_MASK));
            let producer = Producer::new(synth, controls, Arc::new(StatusBoard::new()));
            render_wav(producer, seconds, &out)?;
            Ok(())
        }
        Commands::Test {
            sample_rate,
            clips,
            mute,
            log_file,
        } => {
            init_logging(log_file.as_deref(), true)?;
            let config = SynthConfig {
                sample_rate,
                ..SynthConfig::default()
            };
            let synth = Synth::self_test(config, load_clips(clips.as_deref())?);
            run_interactive(synth, mute)
        }
    }
}

/// RUST_LOG wins; otherwise info, or only errors when the terminal belongs
/// to the status panel and there's no log file
fn init_logging(log_file: Option<&Path>, interactive: bool) -> Result<(), Box<dyn Error>> {
    let default = if interactive && log_file.is_none() {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log_file {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .init(),
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn load_clips(dir: Option<&Path>) -> Result<ClipTable, Box<dyn Error>> {
    Ok(match dir {
        Some(dir) => ClipTable::load_dir(dir)?,
        None => ClipTable::synthesized(),
    })
}

fn run_interactive(synth: Synth, mute: bool) -> Result<(), Box<dyn Error>> {
    let controls = Arc::new(SharedControls::new());
    let status = Arc::new(StatusBoard::new());
    let producer = Producer::new(synth, Arc::clone(&controls), Arc::clone(&status));

    let mut sound: Box<dyn Sound> = if mute {
        Box::new(Mute::new())
    } else {
        Box::new(CpalSound::new())
    };
    sound.start(producer)?;

    let mut input = KeyboardInput::new(Arc::clone(&controls))?;
    let mut display = TermDisplay::new()?;
    let mut program = Vec::new();
    let mut last_mode: Option<ModeTag> = None;
    let mut ticks: u32 = 0;

    while input.poll()? {
        if ticks % DRAW_EVERY == 0 {
            let snapshot = status.snapshot();
            status.take_program(&mut program);
            if last_mode != Some(snapshot.mode) {
                info!(
                    mode = snapshot.mode.name(),
                    cursor = snapshot.cursor,
                    length = snapshot.high_water_mark,
                    "mode changed"
                );
                last_mode = Some(snapshot.mode);
            }
            display.draw(&snapshot, &program)?;
        }
        ticks = ticks.wrapping_add(1);
        spin_sleep::sleep(FOREGROUND_TICK);
    }

    if let Err(e) = sound.stop() {
        warn!("stopping output: {}", e);
    }
    drop(input);

    // shove some junk on stdout to stop the cli messing up the last frame
    for _ in 0..12 {
        println!();
    }
    Ok(())
}
