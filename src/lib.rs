pub mod symbols;
pub mod timing;
pub mod synth;
pub mod sequencer;
pub mod audio;
pub mod error;

pub use symbols::*;
pub use timing::*;
pub use synth::*;
pub use sequencer::*;
pub use audio::*;
pub use error::*;

pub const DEFAULT_WPM: f64 = 25.0;
pub const DEFAULT_FREQUENCY_HZ: f64 = 600.0;
pub const SAMPLE_RATE: u32 = 44100;
pub const CHANNELS: u16 = 2;
pub const BIT_DEPTH_BYTES: u16 = 2;
pub const MAX_SAMPLE_VALUE: i32 = 32767;

/// Rise and fall time of the keying envelope.
pub const RAMP_MS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub wpm: f64,
    pub frequency_hz: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth_bytes: u16,
    pub max_sample_value: i32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            wpm: DEFAULT_WPM,
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS,
            bit_depth_bytes: BIT_DEPTH_BYTES,
            max_sample_value: MAX_SAMPLE_VALUE,
        }
    }
}

impl Options {
    pub fn validate(&self) -> Result<()> {
        if !self.wpm.is_finite() || self.wpm <= 0.0 {
            return Err(CwError::Config(format!("wpm must be positive, got {}", self.wpm)));
        }
        if self.sample_rate == 0 {
            return Err(CwError::Config("sample rate must be positive".into()));
        }
        if !self.frequency_hz.is_finite() || self.frequency_hz <= 0.0 {
            return Err(CwError::Config(format!(
                "frequency must be positive, got {} Hz",
                self.frequency_hz
            )));
        }
        let nyquist = self.sample_rate as f64 / 2.0;
        if self.frequency_hz >= nyquist {
            return Err(CwError::Config(format!(
                "frequency {} Hz is not below the Nyquist frequency {} Hz",
                self.frequency_hz, nyquist
            )));
        }
        if !matches!(self.channels, 1 | 2) {
            return Err(CwError::Config(format!(
                "unsupported channel count {}",
                self.channels
            )));
        }
        let full_scale = full_scale(self.bit_depth_bytes).ok_or_else(|| {
            CwError::Config(format!("unsupported bit depth {} bytes", self.bit_depth_bytes))
        })?;
        if self.max_sample_value <= 0 || self.max_sample_value > full_scale {
            return Err(CwError::Config(format!(
                "max sample value {} outside 1..={} for {}-byte samples",
                self.max_sample_value, full_scale, self.bit_depth_bytes
            )));
        }
        Ok(())
    }

    pub fn format(&self) -> PcmFormat {
        PcmFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bit_depth_bytes: self.bit_depth_bytes,
        }
    }
}

pub fn full_scale(bit_depth_bytes: u16) -> Option<i32> {
    match bit_depth_bytes {
        1 => Some(i8::MAX as i32),
        2 => Some(i16::MAX as i32),
        4 => Some(i32::MAX),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        assert!(Options::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_options() {
        let bad = [
            Options { wpm: 0.0, ..Default::default() },
            Options { wpm: f64::NAN, ..Default::default() },
            Options { frequency_hz: -1.0, ..Default::default() },
            Options { sample_rate: 0, ..Default::default() },
            Options { channels: 3, ..Default::default() },
            Options { bit_depth_bytes: 3, ..Default::default() },
            Options { max_sample_value: 0, ..Default::default() },
            Options { bit_depth_bytes: 1, ..Default::default() },
            Options { frequency_hz: 4000.0, sample_rate: 8000, ..Default::default() },
        ];
        for options in bad {
            assert!(
                matches!(options.validate(), Err(CwError::Config(_))),
                "{:?} should be rejected",
                options
            );
        }
    }

    #[test]
    fn test_narrow_depth_with_matching_scale() {
        let options = Options {
            bit_depth_bytes: 1,
            max_sample_value: 127,
            channels: 1,
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }
}
