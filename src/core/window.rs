//! Window functions for spectral analysis and resynthesis.
//!
//! Provides the six classical tapers selectable from the command line plus a
//! rectangular "no window", and the normalization helpers the overlap-add
//! stage and power-spectrum consumers need.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{PvocError, Result};

/// Headroom applied on top of the worst-case overlap-add window sum so that
/// resynthesized output does not clip when hops do not divide the window.
pub const OLA_SAFETY_MARGIN: f64 = 1.5;

/// Blackman window coefficients.
const BLACKMAN_A0: f64 = 0.42;
const BLACKMAN_A1: f64 = 0.5;
const BLACKMAN_A2: f64 = 0.08;

/// Steeper roll-off window coefficients (three-term cosine, unit peak).
const STEEPER_A0: f64 = 0.375;
const STEEPER_A1: f64 = 0.5;
const STEEPER_A2: f64 = 0.125;

/// Window function types, numbered as on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowType {
    /// Rectangular window (all weights 1).
    None,
    Parzen,
    Welch,
    #[default]
    Hanning,
    Hamming,
    Blackman,
    /// Three-term cosine window with a steeper roll-off than Hanning.
    Steeper,
}

impl WindowType {
    /// All window kinds, in selector order.
    pub const ALL: [WindowType; 7] = [
        WindowType::None,
        WindowType::Parzen,
        WindowType::Welch,
        WindowType::Hanning,
        WindowType::Hamming,
        WindowType::Blackman,
        WindowType::Steeper,
    ];

    /// Maps a numeric selector (0 = none … 6 = steeper) to a window kind.
    pub fn from_index(index: u8) -> Result<Self> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or_else(|| PvocError::InvalidConfig(format!("unknown window selector {index}")))
    }

    /// Numeric selector of this window kind.
    pub fn index(self) -> u8 {
        match self {
            WindowType::None => 0,
            WindowType::Parzen => 1,
            WindowType::Welch => 2,
            WindowType::Hanning => 3,
            WindowType::Hamming => 4,
            WindowType::Blackman => 5,
            WindowType::Steeper => 6,
        }
    }
}

/// Taper weight of sample `i` in a window of length `n`.
///
/// Weights lie in `[0, 1]`. Degenerate lengths (0 or 1) give a weight of 1.
#[inline]
pub fn window_weight(kind: WindowType, i: usize, n: usize) -> f64 {
    if n <= 1 {
        return 1.0;
    }
    let i = i as f64;
    let n = n as f64;
    let w = match kind {
        WindowType::None => 1.0,
        WindowType::Parzen => 1.0 - ((i - 0.5 * (n - 1.0)) / (0.5 * (n + 1.0))).abs(),
        WindowType::Welch => {
            let x = (i - 0.5 * (n - 1.0)) / (0.5 * (n + 1.0));
            1.0 - x * x
        }
        WindowType::Hanning => 0.5 - 0.5 * (2.0 * PI * i / (n - 1.0)).cos(),
        WindowType::Hamming => 0.54 - 0.46 * (2.0 * PI * i / (n - 1.0)).cos(),
        WindowType::Blackman => {
            let x = 2.0 * PI * i / (n - 1.0);
            BLACKMAN_A0 - BLACKMAN_A1 * x.cos() + BLACKMAN_A2 * (2.0 * x).cos()
        }
        WindowType::Steeper => {
            let x = 2.0 * PI * i / (n - 1.0);
            STEEPER_A0 - STEEPER_A1 * x.cos() + STEEPER_A2 * (2.0 * x).cos()
        }
    };
    // Cosine sums can dip a few ulps below zero at the edges.
    w.clamp(0.0, 1.0)
}

/// Generates the weights of a window of the given type and size.
pub fn generate_window(kind: WindowType, size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| window_weight(kind, i, size) as f32)
        .collect()
}

/// Multiplies every sample by its window weight and divides by `scale`.
///
/// Use `scale = 1.0` for analysis and the overlap-add divisor for synthesis.
pub fn apply_window(data: &mut [f32], kind: WindowType, scale: f64) {
    let n = data.len();
    for (i, sample) in data.iter_mut().enumerate() {
        *sample = (*sample as f64 * window_weight(kind, i, n) / scale) as f32;
    }
}

/// Same as [`apply_window`] with weights precomputed by [`generate_window`].
#[inline]
pub fn apply_precomputed_window(data: &mut [f32], weights: &[f32], scale: f32) {
    let inv = 1.0 / scale;
    for (sample, &w) in data.iter_mut().zip(weights.iter()) {
        *sample *= w * inv;
    }
}

/// Energy density of a window: `n × Σ w²`.
///
/// Dividing `|X[k]|²` by this value gives a power spectrum whose response
/// to a constant-amplitude input is flat.
pub fn window_energy_density(n: usize, kind: WindowType) -> f64 {
    let sum_sq: f64 = (0..n)
        .map(|i| {
            let w = window_weight(kind, i, n);
            w * w
        })
        .sum();
    sum_sq * n as f64
}

/// Largest per-phase sum of `weights` sampled every `hop` positions.
fn max_phase_sum(weights: &[f64], hop: usize) -> f64 {
    (0..hop)
        .map(|j| weights.iter().skip(j).step_by(hop).sum::<f64>())
        .fold(0.0, f64::max)
}

/// Overlap-add normalization scale for a window of length `n` and hop `hop`.
///
/// The window is applied to a unit signal and, for every phase in
/// `[0, hop)`, the samples a hop apart are summed. The result is the largest
/// such sum times [`OLA_SAFETY_MARGIN`].
pub fn overlap_add_scale(n: usize, hop: usize, kind: WindowType) -> f64 {
    if n == 0 || hop == 0 {
        return OLA_SAFETY_MARGIN;
    }
    let mut unit = vec![1.0f32; n];
    apply_window(&mut unit, kind, 1.0);
    let weights: Vec<f64> = unit.iter().map(|&w| w as f64).collect();
    max_phase_sum(&weights, hop) * OLA_SAFETY_MARGIN
}

/// Steady-state amplitude gain of analysis × synthesis windowing followed by
/// division by [`overlap_add_scale`].
///
/// For hops that divide the window evenly this is the exact gain a
/// stationary signal sees through the resynthesis path.
pub fn overlap_add_gain(n: usize, hop: usize, kind: WindowType) -> f64 {
    if n == 0 || hop == 0 {
        return 0.0;
    }
    let squared: Vec<f64> = (0..n)
        .map(|i| {
            let w = window_weight(kind, i, n);
            w * w
        })
        .collect();
    max_phase_sum(&squared, hop) / overlap_add_scale(n, hop, kind)
}
