use crate::error::Error;
use crate::input::SharedControls;
use crate::scheduler::{DoubleBuffer, BUFFER_SIZE};
use crate::status::StatusBoard;
use crate::synth::Synth;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info};

/// everything that runs in the audio callback: the synth, its double buffer,
/// and the lock-free links back to the foreground
pub struct Producer {
    synth: Synth,
    buffer: DoubleBuffer,
    controls: Arc<SharedControls>,
    status: Arc<StatusBoard>,
}

impl Producer {
    pub fn new(synth: Synth, controls: Arc<SharedControls>, status: Arc<StatusBoard>) -> Self {
        let buffer = DoubleBuffer::new(synth.sample_rate());
        Producer {
            synth,
            buffer,
            controls,
            status,
        }
    }

    /// the synth's own rate, which may only change between half refills
    pub fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate()
    }

    pub fn next_sample(&mut self) -> u8 {
        let mut controls = &*self.controls;
        let s = self.buffer.next_sample(&mut self.synth, &mut controls);
        if self.buffer.position() % BUFFER_SIZE == 0 {
            self.status
                .publish(&self.synth.status(), self.synth.program());
        }
        s
    }
}

/// an audio output device
pub trait Sound {
    /// hand the producer over and start streaming
    fn start(&mut self, producer: Producer) -> Result<(), Error>;

    fn stop(&mut self) -> Result<(), Error>;
}

/// holds each synth sample for as many device frames as it lasts
struct SampleHold {
    device_rate: u32,
    acc: u32,
    current: u8,
}

impl SampleHold {
    fn new(device_rate: u32) -> Self {
        SampleHold {
            device_rate: device_rate.max(1),
            acc: 0,
            current: crate::clip::SILENCE,
        }
    }

    fn next(&mut self, producer: &mut Producer) -> u8 {
        self.acc += producer.sample_rate();
        while self.acc >= self.device_rate {
            self.acc -= self.device_rate;
            self.current = producer.next_sample();
        }
        self.current
    }
}

fn to_f32(s: u8) -> f32 {
    (s as f32 - 128.0) / 128.0
}

fn to_i16(s: u8) -> i16 {
    ((s ^ 0x80) as i8 as i16) << 8
}

/// the default output device through cpal
pub struct CpalSound {
    stream: Option<cpal::Stream>,
}

impl CpalSound {
    pub fn new() -> Self {
        CpalSound { stream: None }
    }
}

impl Sound for CpalSound {
    fn start(&mut self, mut producer: Producer) -> Result<(), Error> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(Error::NoOutputDevice)?;
        let supported = device.default_output_config()?;
        let format = supported.sample_format();
        let config = supported.config();
        let channels = config.channels.max(1) as usize;
        let mut hold = SampleHold::new(config.sample_rate.0);
        info!(
            device = %device.name().unwrap_or_default(),
            rate = config.sample_rate.0,
            channels,
            ?format,
            "opening output"
        );

        let stream = match format {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        frame.fill(to_f32(hold.next(&mut producer)));
                    }
                },
                |err| error!("output stream error: {}", err),
                None,
            )?,
            cpal::SampleFormat::I16 => device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        frame.fill(to_i16(hold.next(&mut producer)));
                    }
                },
                |err| error!("output stream error: {}", err),
                None,
            )?,
            other => return Err(Error::SampleFormat(format!("{:?}", other))),
        };
        stream.play()?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Error> {
        if let Some(stream) = self.stream.take() {
            stream.pause()?;
            info!("output stopped");
        }
        Ok(())
    }
}

impl Default for CpalSound {
    fn default() -> Self {
        CpalSound::new()
    }
}

/// no device: a thread stands in for the timer, refilling at the real
/// half-buffer period and throwing the samples away
pub struct Mute {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Mute {
    pub fn new() -> Self {
        Mute {
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl Default for Mute {
    fn default() -> Self {
        Mute::new()
    }
}

impl Sound for Mute {
    fn start(&mut self, mut producer: Producer) -> Result<(), Error> {
        self.running.store(true, Ordering::Relaxed);
        let running = Arc::clone(&self.running);
        self.handle = Some(thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                for _ in 0..BUFFER_SIZE {
                    producer.next_sample();
                }
                let rate = producer.sample_rate().max(1) as f64;
                spin_sleep::sleep(Duration::from_secs_f64(BUFFER_SIZE as f64 / rate));
            }
        }));
        info!("muted output running");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Error> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| Error::ProducerPanicked)?;
        }
        Ok(())
    }
}

/// run the producer offline for `seconds` and write 8-bit mono PCM to `path`;
/// returns the number of samples written
pub fn render_wav(mut producer: Producer, seconds: f32, path: &Path) -> Result<u64, Error> {
    let rate = producer.sample_rate();
    let spec = WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 8,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    let total = (seconds.max(0.0) as f64 * rate as f64).round() as u64;
    for _ in 0..total {
        writer.write_sample((producer.next_sample() ^ 0x80) as i8)?;
    }
    writer.finalize()?;
    info!(path = %path.display(), samples = total, rate, "rendered");
    Ok(total)
}
