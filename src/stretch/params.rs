//! Hop arithmetic for independent time-stretch and pitch-shift.
//!
//! The synthesis hop `H` never changes during a session. A pitch shift of
//! `p` semitones resamples every `H`-sample output block to
//! `H · 2^(−p/12)` samples, and a rate `r` advances the input cursor by that
//! resampled length times `r`. Output duration therefore scales by `1/r`
//! while pitch scales by `2^(p/12)`.

use crate::error::{PvocError, Result};

/// Semitones per octave.
const SEMITONES_PER_OCTAVE: f64 = 12.0;

/// Largest resample or analysis hop a plan accepts. Leaves headroom for
/// `cursor + H` and repeated cursor advances in `i64`.
pub const MAX_HOP: f64 = (i64::MAX / 4) as f64;

/// Frequency factor of a pitch shift in semitones.
#[inline]
pub fn pitch_factor(semitones: f64) -> f64 {
    2f64.powf(semitones / SEMITONES_PER_OCTAVE)
}

/// Rate that the legacy command line derives from a pitch shift: the input
/// is stretched by `2^(p/12)` and played back that much faster.
#[inline]
pub fn legacy_rate_for_pitch(semitones: f64) -> f64 {
    1.0 / pitch_factor(semitones)
}

/// The three hop sizes a session works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HopPlan {
    /// Output-buffer advance per step (fixed for the session).
    pub synthesis: usize,
    /// Samples emitted per step after resampling.
    pub resample: usize,
    /// Input cursor advance per step; negative plays backwards.
    pub analysis: i64,
}

impl HopPlan {
    /// Computes the hop sizes for a rate and a pitch shift in semitones.
    ///
    /// # Errors
    /// Returns [`PvocError::InvalidParameter`] for a zero synthesis hop, a
    /// non-finite rate/pitch, or a rate/pitch whose hops exceed [`MAX_HOP`].
    pub fn new(synthesis: usize, rate: f64, pitch: f64) -> Result<Self> {
        if synthesis == 0 {
            return Err(PvocError::InvalidParameter(
                "synthesis hop must be non-zero".into(),
            ));
        }
        if !rate.is_finite() {
            return Err(PvocError::InvalidParameter(format!("rate must be finite, got {rate}")));
        }
        if !pitch.is_finite() {
            return Err(PvocError::InvalidParameter(format!(
                "pitch must be finite, got {pitch}"
            )));
        }
        let resample = (synthesis as f64 / pitch_factor(pitch)).round();
        if resample > MAX_HOP {
            return Err(PvocError::InvalidParameter(format!(
                "pitch {pitch} gives a resample hop of {resample}"
            )));
        }
        let resample = (resample as usize).max(1);
        let analysis = (resample as f64 * rate).round();
        if analysis.abs() > MAX_HOP {
            return Err(PvocError::InvalidParameter(format!(
                "rate {rate} gives an analysis hop of {analysis}"
            )));
        }
        let analysis = analysis as i64;
        Ok(Self {
            synthesis,
            resample,
            analysis,
        })
    }

    /// Returns true when output blocks pass through without resampling.
    #[inline]
    pub fn is_unity_pitch(&self) -> bool {
        self.resample == self.synthesis
    }

    /// Resampling ratio (output samples per synthesized sample).
    #[inline]
    pub fn resample_ratio(&self) -> f64 {
        self.resample as f64 / self.synthesis as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_plan() {
        let plan = HopPlan::new(512, 1.0, 0.0).unwrap();
        assert_eq!(plan.synthesis, 512);
        assert_eq!(plan.resample, 512);
        assert_eq!(plan.analysis, 512);
        assert!(plan.is_unity_pitch());
    }

    #[test]
    fn test_double_rate() {
        let plan = HopPlan::new(512, 2.0, 0.0).unwrap();
        assert_eq!(plan.analysis, 2 * plan.resample as i64);
        assert_eq!(plan.resample, plan.synthesis);
        assert_eq!(plan.analysis, 1024);
    }

    #[test]
    fn test_octave_up_halves_resample_hop() {
        let plan = HopPlan::new(512, 1.0, 12.0).unwrap();
        assert_eq!(plan.resample, 256);
        assert_eq!(plan.analysis, 256);
        assert!((plan.resample_ratio() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_octave_down_doubles_resample_hop() {
        let plan = HopPlan::new(500, 1.0, -12.0).unwrap();
        assert_eq!(plan.resample, 1000);
    }

    #[test]
    fn test_hops_out_of_range_rejected() {
        assert!(matches!(
            HopPlan::new(256, 1e30, 0.0),
            Err(PvocError::InvalidParameter(_))
        ));
        assert!(HopPlan::new(256, -1e30, 0.0).is_err());
        assert!(HopPlan::new(256, 1.0, -1e4).is_err());
        let plan = HopPlan::new(256, 1e12, 0.0).unwrap();
        assert_eq!(plan.analysis, 256_000_000_000_000);
    }

    #[test]
    fn test_small_rate_rounds_to_zero_hop() {
        let plan = HopPlan::new(256, 0.001, 0.0).unwrap();
        assert_eq!(plan.analysis, 0);
    }

    #[test]
    fn test_odd_hop_rounds() {
        // 511 / 2 = 255.5 rounds away from zero.
        let plan = HopPlan::new(511, 1.0, 12.0).unwrap();
        assert_eq!(plan.resample, 256);
    }

    #[test]
    fn test_negative_rate_plays_backwards() {
        let plan = HopPlan::new(256, -1.0, 0.0).unwrap();
        assert_eq!(plan.analysis, -256);
        assert_eq!(plan.resample, 256);
    }

    #[test]
    fn test_zero_rate_freezes() {
        let plan = HopPlan::new(256, 0.0, 3.0).unwrap();
        assert_eq!(plan.analysis, 0);
    }

    #[test]
    fn test_resample_hop_never_zero() {
        let plan = HopPlan::new(4, 1.0, 96.0).unwrap();
        assert_eq!(plan.resample, 1);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(HopPlan::new(0, 1.0, 0.0).is_err());
        assert!(HopPlan::new(512, f64::NAN, 0.0).is_err());
        assert!(HopPlan::new(512, 1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_legacy_rate_for_pitch() {
        assert!((legacy_rate_for_pitch(0.0) - 1.0).abs() < 1e-12);
        assert!((legacy_rate_for_pitch(12.0) - 0.5).abs() < 1e-12);
        assert!((legacy_rate_for_pitch(-12.0) - 2.0).abs() < 1e-12);
    }
}
