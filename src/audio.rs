use crate::error::{CwError, Result};
use crate::synth::{PcmFormat, SampleBuffer};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Assumed output latency when the host reports no stream timestamps.
pub const FALLBACK_LATENCY: Duration = Duration::from_millis(100);

/// Grace period on top of the buffer duration before a silent device is
/// reported as stalled.
pub const STALL_TIMEOUT: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(2);

pub trait AudioSink {
    /// Plays `buffer` and returns once it has been heard in full.
    fn play(&mut self, buffer: &SampleBuffer) -> Result<()>;
}

#[derive(Default)]
struct PlaybackState {
    position: usize,
    drained_at: Option<Instant>,
    error: Option<String>,
}

pub struct CpalSink {
    device: Device,
    sample_format: SampleFormat,
}

impl CpalSink {
    pub fn open() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| CwError::Playback("No output device found".into()))?;

        let supported_config = device
            .default_output_config()
            .map_err(|e| CwError::Playback(e.to_string()))?;

        check_sample_format(supported_config.sample_format())?;

        if let Ok(name) = device.name() {
            log::info!("Opened output device {} ({:?})", name, supported_config.sample_format());
        }

        Ok(Self {
            device,
            sample_format: supported_config.sample_format(),
        })
    }

    fn build_stream<T>(
        &self,
        config: &StreamConfig,
        samples: Arc<Vec<f32>>,
        state: Arc<Mutex<PlaybackState>>,
    ) -> Result<Stream>
    where
        T: Sample + SizedSample + FromSample<f32>,
    {
        let channels = config.channels as usize;
        let sample_rate = config.sample_rate.0 as f64;
        let err_state = Arc::clone(&state);

        self.device
            .build_output_stream(
                config,
                move |data: &mut [T], info: &cpal::OutputCallbackInfo| {
                    let mut state = match state.lock() {
                        Ok(state) => state,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    let start = state.position;
                    for (i, sample) in data.iter_mut().enumerate() {
                        *sample = match samples.get(start + i) {
                            Some(&s) => T::from_sample(s),
                            None => T::from_sample(0.0f32),
                        };
                    }
                    state.position = (start + data.len()).min(samples.len());

                    if state.drained_at.is_none() && state.position >= samples.len() {
                        let timestamp = info.timestamp();
                        let latency = timestamp.playback.duration_since(&timestamp.callback);
                        let delay = drain_delay(latency, start, samples.len(), channels, sample_rate);
                        state.drained_at = Some(Instant::now() + delay);
                    }
                },
                move |err| {
                    log::error!("Audio output error: {}", err);
                    let mut state = match err_state.lock() {
                        Ok(state) => state,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    state.error = Some(err.to_string());
                },
                None,
            )
            .map_err(|e| CwError::Playback(e.to_string()))
    }
}

impl AudioSink for CpalSink {
    fn play(&mut self, buffer: &SampleBuffer) -> Result<()> {
        let format = buffer.format();
        let config = StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let samples = Arc::new(buffer.to_f32());
        let state = Arc::new(Mutex::new(PlaybackState::default()));

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(&config, samples, Arc::clone(&state))?,
            SampleFormat::I16 => self.build_stream::<i16>(&config, samples, Arc::clone(&state))?,
            SampleFormat::U16 => self.build_stream::<u16>(&config, samples, Arc::clone(&state))?,
            SampleFormat::I8 => self.build_stream::<i8>(&config, samples, Arc::clone(&state))?,
            SampleFormat::I32 => self.build_stream::<i32>(&config, samples, Arc::clone(&state))?,
            SampleFormat::U8 => self.build_stream::<u8>(&config, samples, Arc::clone(&state))?,
            SampleFormat::U32 => self.build_stream::<u32>(&config, samples, Arc::clone(&state))?,
            SampleFormat::I64 => self.build_stream::<i64>(&config, samples, Arc::clone(&state))?,
            SampleFormat::U64 => self.build_stream::<u64>(&config, samples, Arc::clone(&state))?,
            SampleFormat::F64 => self.build_stream::<f64>(&config, samples, Arc::clone(&state))?,
            other => {
                return Err(CwError::Playback(format!(
                    "Unsupported device sample format {:?}",
                    other
                )))
            }
        };

        stream
            .play()
            .map_err(|e| CwError::Playback(e.to_string()))?;

        let deadline = Instant::now() + buffer.duration() + STALL_TIMEOUT;
        let drained_at = wait_for_drain(&state, deadline)?;

        let now = Instant::now();
        if drained_at > now {
            std::thread::sleep(drained_at - now);
        }
        drop(stream);

        Ok(())
    }
}

fn check_sample_format(format: SampleFormat) -> Result<()> {
    match format {
        SampleFormat::I8
        | SampleFormat::I16
        | SampleFormat::I32
        | SampleFormat::I64
        | SampleFormat::U8
        | SampleFormat::U16
        | SampleFormat::U32
        | SampleFormat::U64
        | SampleFormat::F32
        | SampleFormat::F64 => Ok(()),
        other => Err(CwError::Playback(format!(
            "Unsupported device sample format {:?}",
            other
        ))),
    }
}

/// Time from the start of the final callback until its last sample is heard:
/// the reported output latency plus the frames of the buffer still ahead of
/// the end.
fn drain_delay(
    latency: Option<Duration>,
    start: usize,
    len: usize,
    channels: usize,
    sample_rate: f64,
) -> Duration {
    let tail_frames = len.saturating_sub(start) / channels.max(1);
    let tail = Duration::from_nanos((tail_frames as f64 * 1e9 / sample_rate).round() as u64);
    latency.unwrap_or(FALLBACK_LATENCY) + tail
}

fn wait_for_drain(state: &Mutex<PlaybackState>, deadline: Instant) -> Result<Instant> {
    loop {
        std::thread::sleep(POLL_INTERVAL);
        let state = match state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(error) = &state.error {
            return Err(CwError::Playback(error.clone()));
        }
        if let Some(drained_at) = state.drained_at {
            return Ok(drained_at);
        }
        if Instant::now() > deadline {
            return Err(CwError::Playback("Output device stalled".into()));
        }
    }
}

/// Discards audio but takes as long as playing it would.
#[derive(Debug, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&mut self, buffer: &SampleBuffer) -> Result<()> {
        std::thread::sleep(buffer.duration());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    pub played: Vec<(PcmFormat, Vec<u8>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioSink for MemorySink {
    fn play(&mut self, buffer: &SampleBuffer) -> Result<()> {
        self.played.push((buffer.format(), buffer.to_pcm_bytes()?));
        Ok(())
    }
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn play(&mut self, buffer: &SampleBuffer) -> Result<()> {
        (**self).play(buffer)
    }
}

pub fn list_audio_devices() -> Vec<String> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let Ok(name) = device.name() {
                devices.push(name);
            }
        }
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(frames: usize) -> SampleBuffer {
        let format = PcmFormat {
            sample_rate: 1000,
            channels: 2,
            bit_depth_bytes: 2,
        };
        SampleBuffer::new(format, vec![7; frames * 2])
    }

    #[test]
    fn test_null_sink_blocks_for_duration() {
        let mut sink = NullSink;
        let start = Instant::now();
        sink.play(&buffer(50)).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_memory_sink_records_pcm() {
        let mut sink = MemorySink::new();
        sink.play(&buffer(3)).unwrap();
        assert_eq!(sink.played.len(), 1);
        let (format, bytes) = &sink.played[0];
        assert_eq!(format.channels, 2);
        assert_eq!(bytes.len(), 3 * 2 * 2);
    }

    #[test]
    fn test_accepts_every_integer_and_float_format() {
        let formats = [
            SampleFormat::I8,
            SampleFormat::I16,
            SampleFormat::I32,
            SampleFormat::I64,
            SampleFormat::U8,
            SampleFormat::U16,
            SampleFormat::U32,
            SampleFormat::U64,
            SampleFormat::F32,
            SampleFormat::F64,
        ];
        for format in formats {
            assert!(check_sample_format(format).is_ok(), "{:?} rejected", format);
        }
    }

    #[test]
    fn test_drain_delay_mono() {
        // 480 of 1000 samples left at 8 kHz is 60 ms after a 20 ms latency
        let delay = drain_delay(Some(Duration::from_millis(20)), 520, 1000, 1, 8000.0);
        assert_eq!(delay, Duration::from_millis(80));
    }

    #[test]
    fn test_drain_delay_counts_frames_not_samples() {
        let mono = drain_delay(Some(Duration::ZERO), 0, 960, 1, 8000.0);
        let stereo = drain_delay(Some(Duration::ZERO), 0, 960, 2, 8000.0);
        assert_eq!(mono, Duration::from_millis(120));
        assert_eq!(stereo, Duration::from_millis(60));
    }

    #[test]
    fn test_drain_delay_when_last_callback_starts_at_end() {
        let delay = drain_delay(Some(Duration::from_millis(15)), 1000, 1000, 2, 44100.0);
        assert_eq!(delay, Duration::from_millis(15));
        let past_end = drain_delay(Some(Duration::from_millis(15)), 1200, 1000, 2, 44100.0);
        assert_eq!(past_end, Duration::from_millis(15));
    }

    #[test]
    fn test_drain_delay_without_timestamps() {
        let delay = drain_delay(None, 0, 800, 2, 8000.0);
        assert_eq!(delay, FALLBACK_LATENCY + Duration::from_millis(50));
    }

    #[test]
    fn test_wait_for_drain_returns_deadline() {
        let drained_at = Instant::now() + Duration::from_millis(30);
        let state = Mutex::new(PlaybackState {
            drained_at: Some(drained_at),
            ..Default::default()
        });
        let deadline = Instant::now() + Duration::from_secs(1);
        assert_eq!(wait_for_drain(&state, deadline).unwrap(), drained_at);
    }

    #[test]
    fn test_wait_for_drain_reports_stall() {
        let state = Mutex::new(PlaybackState::default());
        let deadline = Instant::now() + Duration::from_millis(10);
        let start = Instant::now();
        match wait_for_drain(&state, deadline) {
            Err(CwError::Playback(msg)) => assert_eq!(msg, "Output device stalled"),
            other => panic!("expected stall, got {:?}", other),
        }
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_wait_for_drain_reports_stream_error() {
        let state = Mutex::new(PlaybackState {
            error: Some("device unplugged".into()),
            ..Default::default()
        });
        let deadline = Instant::now() + Duration::from_secs(1);
        assert!(matches!(wait_for_drain(&state, deadline), Err(CwError::Playback(_))));
    }

    #[test]
    fn test_boxed_sink() {
        let mut sink: Box<dyn AudioSink> = Box::new(MemorySink::new());
        assert!(sink.play(&buffer(1)).is_ok());
    }
}
