//! Session configuration, persisted as JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::window::WindowType;
use crate::error::{PvocError, Result};
use crate::stretch::strategy::Resynthesis;

/// Default FFT length.
pub const DEFAULT_FFT_SIZE: usize = 2048;

/// Everything a [`PhaseVocoder`](crate::PhaseVocoder) needs at construction.
///
/// ```
/// use pvoc::{VocoderConfig, WindowType};
///
/// let config = VocoderConfig::new(4096)
///     .with_rate(0.5)
///     .with_pitch(-3.0)
///     .with_window(WindowType::Blackman)
///     .with_phase_lock(true);
/// assert_eq!(config.effective_hop(), 1024);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocoderConfig {
    /// FFT length `N`.
    pub fft_size: usize,
    /// Synthesis hop `H`; `None` means `fft_size / 4`.
    pub hop: Option<usize>,
    pub window: WindowType,
    /// Loose phase locking on the spectral memory.
    pub phase_lock: bool,
    pub strategy: Resynthesis,
    /// Time-stretch rate: 1 is unchanged, 2 twice as fast, negative plays
    /// backwards.
    pub rate: f64,
    /// Pitch shift in semitones.
    pub pitch: f64,
}

impl Default for VocoderConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FFT_SIZE)
    }
}

impl VocoderConfig {
    /// Creates a configuration with the given FFT length and defaults for
    /// everything else.
    pub fn new(fft_size: usize) -> Self {
        Self {
            fft_size,
            hop: None,
            window: WindowType::default(),
            phase_lock: false,
            strategy: Resynthesis::default(),
            rate: 1.0,
            pitch: 0.0,
        }
    }

    /// Set the synthesis hop.
    pub fn with_hop(mut self, hop: usize) -> Self {
        self.hop = Some(hop);
        self
    }

    /// Set the window kind.
    pub fn with_window(mut self, window: WindowType) -> Self {
        self.window = window;
        self
    }

    /// Enable or disable loose phase locking.
    pub fn with_phase_lock(mut self, phase_lock: bool) -> Self {
        self.phase_lock = phase_lock;
        self
    }

    /// Set the resynthesis strategy.
    pub fn with_strategy(mut self, strategy: Resynthesis) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the time-stretch rate.
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Set the pitch shift in semitones.
    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = pitch;
        self
    }

    /// Synthesis hop actually used.
    pub fn effective_hop(&self) -> usize {
        self.hop.unwrap_or(self.fft_size / 4)
    }

    /// Checks the configuration for values a session cannot run with.
    ///
    /// # Errors
    /// Returns [`PvocError::InvalidConfig`] when the FFT length is below 2,
    /// the hop is zero or exceeds the FFT length, or rate/pitch are not
    /// finite.
    pub fn validate(&self) -> Result<()> {
        if self.fft_size < 2 {
            return Err(PvocError::InvalidConfig(format!(
                "FFT length must be at least 2, got {}",
                self.fft_size
            )));
        }
        let hop = self.effective_hop();
        if hop == 0 || hop > self.fft_size {
            return Err(PvocError::InvalidConfig(format!(
                "hop must be in 1..={}, got {hop}",
                self.fft_size
            )));
        }
        if !self.rate.is_finite() {
            return Err(PvocError::InvalidConfig(format!(
                "rate must be finite, got {}",
                self.rate
            )));
        }
        if !self.pitch.is_finite() {
            return Err(PvocError::InvalidConfig(format!(
                "pitch must be finite, got {}",
                self.pitch
            )));
        }
        Ok(())
    }

    /// Parses a configuration from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Writes the configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
