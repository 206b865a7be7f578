use crate::error::Error;
use hound::{SampleFormat, WavReader};
use std::path::Path;
use tracing::{debug, info};

/// number of slots in the clip table
pub const N_CLIPS: usize = 32;

/// output samples per stored clip sample
pub const SCALE: u32 = 5;

/// mid-scale, the output level for "nothing playing"
pub const SILENCE: u8 = 0x80;

/// read-only 8-bit PCM clips, one per opcode identifier; slots 0-9 double as
/// the spoken digits
pub struct ClipTable {
    clips: [Box<[u8]>; N_CLIPS],
}

impl ClipTable {
    /// a table with every slot empty
    pub fn empty() -> Self {
        ClipTable {
            clips: std::array::from_fn(|_| Box::default()),
        }
    }

    /// generated feedback blips, so the instrument talks without recordings.
    /// slots 0-15 sound their value as a count of short pips (zero is one long
    /// low one); operator slots are single tones rising with the slot number
    pub fn synthesized() -> Self {
        let mut table = ClipTable::empty();
        for slot in 0..N_CLIPS {
            let mut data = Vec::new();
            match slot {
                0 => tone(&mut data, 48, 900),
                1..=15 => {
                    for _ in 0..slot {
                        tone(&mut data, 24, 260);
                        rest(&mut data, 200);
                    }
                }
                _ => tone(&mut data, 44 - slot, 700),
            }
            table.clips[slot] = data.into_boxed_slice();
        }
        table
    }

    /// load `NN.wav` (00-31) from `dir` over the synthesized table; missing
    /// files keep their generated clip
    pub fn load_dir(dir: &Path) -> Result<Self, Error> {
        let mut table = ClipTable::synthesized();
        for slot in 0..N_CLIPS {
            let path = dir.join(format!("{:02}.wav", slot));
            if !path.exists() {
                debug!(slot, "no recording, keeping generated clip");
                continue;
            }
            table.set(slot, read_wav(&path, slot)?);
            info!(slot, path = %path.display(), "loaded clip");
        }
        Ok(table)
    }

    /// replace the clip in `slot`; out-of-range slots are ignored
    pub fn set(&mut self, slot: usize, data: impl Into<Box<[u8]>>) {
        if let Some(c) = self.clips.get_mut(slot) {
            *c = data.into();
        }
    }

    pub fn get(&self, slot: usize) -> Option<&[u8]> {
        self.clips.get(slot).map(|c| &c[..])
    }
}

impl Default for ClipTable {
    fn default() -> Self {
        ClipTable::synthesized()
    }
}

/// square-wave blip with a linear decay
fn tone(out: &mut Vec<u8>, period: usize, len: usize) {
    for i in 0..len {
        let level = (0x60 * (len - i) / len) as u8;
        out.push(if i % period < period / 2 {
            SILENCE + level
        } else {
            SILENCE - level
        });
    }
}

fn rest(out: &mut Vec<u8>, len: usize) {
    out.extend(std::iter::repeat(SILENCE).take(len));
}

/// first channel of an integer PCM wav as unsigned 8-bit
fn read_wav(path: &Path, slot: usize) -> Result<Vec<u8>, Error> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    let data = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 8) => reader
            .into_samples::<i8>()
            .step_by(channels)
            .map(|s| s.map(|s| (s as u8) ^ 0x80))
            .collect::<Result<Vec<_>, _>>()?,
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .step_by(channels)
            .map(|s| s.map(|s| ((s >> 8) as u8) ^ 0x80))
            .collect::<Result<Vec<_>, _>>()?,
        (format, bits) => {
            return Err(Error::ClipFormat {
                slot,
                reason: format!("{:?} {}-bit samples", format, bits),
            })
        }
    };
    Ok(data)
}

/// streams one clip at the output rate, interpolating between stored samples
#[derive(Debug, Default)]
pub struct ClipPlayer {
    phase: u32,
    last: u8,
}

impl ClipPlayer {
    pub fn new() -> Self {
        ClipPlayer {
            phase: 0,
            last: SILENCE,
        }
    }

    /// the most recent sample produced
    pub fn last(&self) -> u8 {
        self.last
    }

    /// forget any clip in progress
    pub fn reset(&mut self) {
        self.phase = 0;
        self.last = SILENCE;
    }

    /// fill `buf` from clip `slot`; returns true once the clip has finished,
    /// with the rest of `buf` padded with silence
    pub fn fill(&mut self, clips: &ClipTable, slot: usize, buf: &mut [u8]) -> bool {
        let data = match clips.get(slot) {
            Some(data) => data,
            None => {
                buf.fill(SILENCE);
                return true;
            }
        };
        let end = data.len().saturating_sub(2);
        for i in 0..buf.len() {
            let index = (self.phase / SCALE) as usize;
            if index >= end {
                buf[i..].fill(SILENCE);
                self.reset();
                return true;
            }
            let frac = self.phase % SCALE;
            let a = data[index] as u32;
            let b = data[index + 1] as u32;
            self.last = ((a * (SCALE - frac) + b * frac) / SCALE) as u8;
            buf[i] = self.last;
            self.phase += 1;
        }
        false
    }
}
