//! Error types for the pvoc crate.

use thiserror::Error;

/// Errors that can occur while configuring or running a phase vocoder.
#[derive(Debug, Error)]
pub enum PvocError {
    /// Session parameters are inconsistent (FFT length, hop, window).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A runtime parameter (rate, pitch, seek target) is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Only mono and stereo material is supported.
    #[error("unsupported channel count: {0} (expected 1 or 2)")]
    UnsupportedChannels(u16),
    /// Buffer sizes passed to a spectral routine do not match.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    /// I/O error from a file collaborator.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// WAV encode/decode error.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    /// Configuration file could not be parsed or written.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
    /// The FFT backend rejected its input.
    #[error("FFT error: {0}")]
    Fft(String),
    /// The background feeder thread failed or panicked.
    #[error("feeder error: {0}")]
    Feeder(String),
}

impl From<realfft::FftError> for PvocError {
    fn from(err: realfft::FftError) -> Self {
        PvocError::Fft(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PvocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = PvocError::UnsupportedChannels(6);
        assert!(err.to_string().contains('6'));

        let err = PvocError::LengthMismatch {
            expected: 2048,
            actual: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("2048") && msg.contains("100"));
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.wav");
        let err: PvocError = io.into();
        assert!(matches!(err, PvocError::Io(_)));
        assert!(err.to_string().contains("missing.wav"));
    }
}
