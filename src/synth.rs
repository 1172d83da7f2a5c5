use crate::error::Result;
use crate::timing::frames;
use crate::{full_scale, Options, RAMP_MS};
use byteorder::{LittleEndian, WriteBytesExt};
use std::f64::consts::PI;
use std::io::Write;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Element {
    Tone(Duration),
    Silence(Duration),
}

impl Element {
    pub fn duration(&self) -> Duration {
        match *self {
            Element::Tone(d) | Element::Silence(d) => d,
        }
    }

    pub fn is_tone(&self) -> bool {
        matches!(self, Element::Tone(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth_bytes: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    format: PcmFormat,
    samples: Vec<i32>,
}

impl SampleBuffer {
    pub fn new(format: PcmFormat, samples: Vec<i32>) -> Self {
        Self { format, samples }
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn samples(&self) -> &[i32] {
        &self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.format.channels.max(1) as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.format.sample_rate as f64)
    }

    pub fn to_f32(&self) -> Vec<f32> {
        let scale = full_scale(self.format.bit_depth_bytes).unwrap_or(i16::MAX as i32) as f64;
        self.samples.iter().map(|&s| (s as f64 / scale) as f32).collect()
    }

    /// Little-endian PCM: unsigned offset binary for 1 byte, signed otherwise.
    pub fn write_pcm<W: Write>(&self, out: &mut W) -> Result<()> {
        for &sample in &self.samples {
            match self.format.bit_depth_bytes {
                1 => out.write_u8((sample + 128) as u8)?,
                2 => out.write_i16::<LittleEndian>(sample as i16)?,
                _ => out.write_i32::<LittleEndian>(sample)?,
            }
        }
        Ok(())
    }

    pub fn to_pcm_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes =
            Vec::with_capacity(self.samples.len() * self.format.bit_depth_bytes as usize);
        self.write_pcm(&mut bytes)?;
        Ok(bytes)
    }
}

/// Renders tone and silence intervals as PCM with a raised-cosine keying
/// envelope, so every tone starts and ends at zero amplitude.
pub struct ToneSynthesizer {
    options: Options,
    ramp_frames: usize,
}

impl ToneSynthesizer {
    pub fn new(options: &Options) -> Result<Self> {
        options.validate()?;
        let ramp_frames = frames(Duration::from_secs_f64(RAMP_MS / 1000.0), options.sample_rate);
        Ok(Self {
            options: options.clone(),
            ramp_frames,
        })
    }

    pub fn format(&self) -> PcmFormat {
        self.options.format()
    }

    pub fn ramp_frames(&self, total: usize) -> usize {
        self.ramp_frames.min(total / 2)
    }

    pub fn envelope_gain(&self, position: usize, total: usize) -> f64 {
        if position >= total {
            return 0.0;
        }
        let ramp = self.ramp_frames(total);
        let edge = position.min(total - 1 - position);
        if edge >= ramp {
            1.0
        } else {
            0.5 * (1.0 - (PI * edge as f64 / ramp as f64).cos())
        }
    }

    pub fn render(&self, element: Element) -> Vec<i32> {
        let total = frames(element.duration(), self.options.sample_rate);
        self.render_frames(element.is_tone(), total)
    }

    pub fn render_frames(&self, tone_on: bool, total: usize) -> Vec<i32> {
        let mut out = Vec::with_capacity(total * self.options.channels as usize);
        self.render_into(tone_on, total, &mut out);
        out
    }

    pub fn render_into(&self, tone_on: bool, total: usize, out: &mut Vec<i32>) {
        let channels = self.options.channels as usize;
        if !tone_on {
            out.resize(out.len() + total * channels, 0);
            return;
        }

        let max = self.options.max_sample_value;
        let step = 2.0 * PI * self.options.frequency_hz / self.options.sample_rate as f64;
        for i in 0..total {
            let gain = self.envelope_gain(i, total);
            let value = ((step * i as f64).sin() * gain * max as f64).round() as i32;
            let value = value.clamp(-max, max);
            for _ in 0..channels {
                out.push(value);
            }
        }
    }
}
