#![forbid(unsafe_code)]
//! Phase-vocoder time stretching and pitch shifting.
//!
//! `pvoc` resynthesizes audio from overlapping FFT frames, carrying every
//! partial's phase from one output frame to the next with the complex
//! recurrence `Y = X_t · normalize(Y_prev / X_s)`. Rate (duration) and pitch
//! (semitones) are independent: rate moves the input cursor, pitch resamples
//! each synthesized hop.
//!
//! # Quick Start
//!
//! ```
//! use pvoc::{AudioBuffer, Channels, VocoderConfig};
//!
//! // 1 second of 440 Hz sine at 44.1 kHz
//! let input: Vec<f32> = (0..44100)
//!     .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
//!     .collect();
//! let buffer = AudioBuffer::new(input, 44100, Channels::Mono);
//!
//! let config = VocoderConfig::new(2048).with_rate(0.5);
//! let output = pvoc::process(&buffer, &config).unwrap();
//! assert!(output.num_frames() > buffer.num_frames()); // ~2x longer
//! ```
//!
//! # Stepping a session
//!
//! Batch conversion, the pull-based [`Player`] and the background feeder
//! all drive the same [`PhaseVocoder::step`]:
//!
//! ```
//! use pvoc::{Channels, MemorySink, MemorySource, PhaseVocoder, StepOutcome, VocoderConfig};
//!
//! let mut source = MemorySource::mono(vec![0.25; 8192], 44100);
//! let mut sink = MemorySink::new();
//! let mut session = PhaseVocoder::new(VocoderConfig::new(1024), Channels::Mono).unwrap();
//! while let StepOutcome::Produced(_) = session.step(&mut source, &mut sink).unwrap() {
//!     // session.set_rate_pitch(rate, pitch) may be called between steps
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod stream;
pub mod stretch;

pub use config::VocoderConfig;
pub use core::types::{AudioBuffer, Channels, Sample};
pub use core::window::WindowType;
pub use error::{PvocError, Result};
pub use io::{AudioSink, AudioSource, MemorySink, MemorySource};
pub use stream::{convert, Player};
pub use stretch::{HopPlan, PhaseVocoder, Resynthesis, StepOutcome};

/// Runs `buffer` through a fresh session and returns the result in the
/// buffer's channel layout and sample rate.
///
/// # Errors
/// Fails for invalid configurations and for a rate of zero.
pub fn process(buffer: &AudioBuffer, config: &VocoderConfig) -> Result<AudioBuffer> {
    let mut source = MemorySource::new(buffer.clone());
    let mut sink = MemorySink::new();
    convert(config, &mut source, &mut sink)?;
    match buffer.channels {
        Channels::Mono => Ok(AudioBuffer::new(sink.left, buffer.sample_rate, Channels::Mono)),
        Channels::Stereo => sink.into_buffer(buffer.sample_rate),
    }
}

/// Changes duration by `1 / rate` without changing pitch.
pub fn time_stretch(buffer: &AudioBuffer, rate: f64) -> Result<AudioBuffer> {
    process(buffer, &VocoderConfig::default().with_rate(rate))
}

/// Shifts pitch by `semitones` without changing duration.
pub fn pitch_shift(buffer: &AudioBuffer, semitones: f64) -> Result<AudioBuffer> {
    process(buffer, &VocoderConfig::default().with_pitch(semitones))
}
