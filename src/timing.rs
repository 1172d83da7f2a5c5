use crate::error::{CwError, Result};
use crate::symbols::Symbol;
use std::time::Duration;

/// Element durations for one speed, using the 50-unit "PARIS" word.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub dot: Duration,
    pub dash: Duration,
    pub intra_gap: Duration,
    pub inter_char_gap: Duration,
    pub inter_word_gap: Duration,
}

impl Timing {
    pub fn from_wpm(wpm: f64) -> Result<Self> {
        if !wpm.is_finite() || wpm <= 0.0 {
            return Err(CwError::Config(format!("wpm must be positive, got {}", wpm)));
        }
        let dot = Duration::from_nanos((1.2e9 / wpm).round() as u64);
        Ok(Self {
            dot,
            dash: dot * 3,
            intra_gap: dot,
            inter_char_gap: dot * 3,
            inter_word_gap: dot * 7,
        })
    }

    pub fn symbol(&self, symbol: Symbol) -> Duration {
        match symbol {
            Symbol::Dot => self.dot,
            Symbol::Dash => self.dash,
        }
    }

    pub fn char_gap_remainder(&self) -> Duration {
        self.inter_char_gap - self.intra_gap
    }

    pub fn word_gap_remainder(&self) -> Duration {
        self.inter_word_gap - self.inter_char_gap
    }
}

/// Whole frames covering `duration` at `sample_rate`, rounded to nearest.
pub fn frames(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * sample_rate as f64).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paris_ratios() {
        for wpm in [5.0, 12.5, 20.0, 25.0, 40.0, 60.0] {
            let t = Timing::from_wpm(wpm).unwrap();
            let expected_ms = 1200.0 / wpm;
            assert!((t.dot.as_secs_f64() * 1000.0 - expected_ms).abs() < 1e-6);
            assert_eq!(t.dash, t.dot * 3);
            assert_eq!(t.intra_gap, t.dot);
            assert_eq!(t.inter_char_gap, t.dot * 3);
            assert_eq!(t.inter_word_gap, t.inter_char_gap + t.dot * 4);
            assert_eq!(t.inter_word_gap, t.dot * 7);
        }
    }

    #[test]
    fn test_remainders() {
        let t = Timing::from_wpm(20.0).unwrap();
        assert_eq!(t.char_gap_remainder(), Duration::from_millis(120));
        assert_eq!(t.word_gap_remainder(), Duration::from_millis(240));
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(matches!(Timing::from_wpm(0.0), Err(CwError::Config(_))));
        assert!(matches!(Timing::from_wpm(-3.0), Err(CwError::Config(_))));
        assert!(matches!(Timing::from_wpm(f64::INFINITY), Err(CwError::Config(_))));
    }

    #[test]
    fn test_frames_rounds() {
        assert_eq!(frames(Duration::from_millis(60), 8000), 480);
        assert_eq!(frames(Duration::from_micros(100), 44100), 4);
        assert_eq!(frames(Duration::from_micros(125), 44100), 6);
    }
}
