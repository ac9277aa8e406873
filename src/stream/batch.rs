//! Offline conversion: step a session until the source runs out.

use tracing::{debug, info};

use crate::config::VocoderConfig;
use crate::error::{PvocError, Result};
use crate::io::sink::AudioSink;
use crate::io::source::AudioSource;
use crate::stretch::phase_vocoder::{PhaseVocoder, StepOutcome};

/// Summary of a finished conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConvertStats {
    /// Number of steps that produced output.
    pub steps: usize,
    /// Frames handed to the sink.
    pub frames_written: u64,
}

/// Where a batch run starts reading: the beginning for forward rates, the
/// last full step position for backward rates.
pub fn start_cursor(total_frames: u64, fft_size: usize, hop: usize, rate: f64) -> i64 {
    if rate < 0.0 {
        total_frames as i64 - (fft_size + hop) as i64
    } else {
        0
    }
}

/// Converts the whole of `source` into `sink` with a fresh session.
///
/// # Errors
/// A rate whose analysis hop rounds to zero never reaches the end of the
/// input and is rejected with [`PvocError::InvalidParameter`]. Collaborator
/// errors are passed through.
pub fn convert<S, K>(config: &VocoderConfig, source: &mut S, sink: &mut K) -> Result<ConvertStats>
where
    S: AudioSource + ?Sized,
    K: AudioSink + ?Sized,
{
    let mut session = PhaseVocoder::new(config.clone(), source.channels())?;
    session.seek(start_cursor(
        source.num_frames(),
        session.fft_size(),
        session.hops().synthesis,
        config.rate,
    ));
    run_to_end(&mut session, source, sink)
}

/// Steps an existing session until exhaustion and finalizes the sink.
///
/// # Errors
/// Fails with [`PvocError::InvalidParameter`] if the session's analysis hop
/// is zero, since the cursor would never move.
pub fn run_to_end<S, K>(session: &mut PhaseVocoder, source: &mut S, sink: &mut K) -> Result<ConvertStats>
where
    S: AudioSource + ?Sized,
    K: AudioSink + ?Sized,
{
    if session.hops().analysis == 0 {
        return Err(PvocError::InvalidParameter(format!(
            "rate {} freezes the input and cannot be converted offline",
            session.config().rate
        )));
    }
    let mut stats = ConvertStats::default();
    debug!(
        frames = source.num_frames(),
        start = session.cursor(),
        "batch conversion started"
    );
    while let StepOutcome::Produced(frames) = session.step(source, sink)? {
        stats.steps += 1;
        stats.frames_written += frames as u64;
    }
    sink.finalize()?;
    info!(
        steps = stats.steps,
        frames = stats.frames_written,
        "batch conversion finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Channels;
    use crate::io::sink::MemorySink;
    use crate::io::source::MemorySource;

    fn ramp_source(len: usize) -> MemorySource {
        MemorySource::mono((0..len).map(|i| ((i % 100) as f32 / 100.0) - 0.5).collect(), 8000)
    }

    #[test]
    fn test_zero_rate_rejected() {
        let config = VocoderConfig::new(256).with_rate(0.0);
        let mut src = ramp_source(4096);
        let mut sink = MemorySink::new();
        assert!(matches!(
            convert(&config, &mut src, &mut sink),
            Err(PvocError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rate_rounding_to_zero_hop_rejected() {
        let config = VocoderConfig::new(1024).with_rate(0.001);
        let mut src = ramp_source(4096);
        let mut sink = MemorySink::new();
        assert!(matches!(
            convert(&config, &mut src, &mut sink),
            Err(PvocError::InvalidParameter(_))
        ));
        assert_eq!(sink.num_frames(), 0);
    }

    #[test]
    fn test_run_to_end_rejects_frozen_session() {
        let mut session = PhaseVocoder::new(VocoderConfig::new(256), Channels::Mono).unwrap();
        session.set_rate_pitch(0.001, 0.0).unwrap();
        let mut src = ramp_source(4096);
        let mut sink = MemorySink::new();
        assert!(run_to_end(&mut session, &mut src, &mut sink).is_err());
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn test_huge_rate_rejected() {
        let config = VocoderConfig::new(256).with_rate(1e30);
        let mut src = ramp_source(4096);
        let mut sink = MemorySink::new();
        assert!(matches!(
            convert(&config, &mut src, &mut sink),
            Err(PvocError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_large_rate_stops_after_one_step() {
        let config = VocoderConfig::new(256).with_rate(1e15);
        let mut src = ramp_source(4096);
        let mut sink = MemorySink::new();
        let stats = convert(&config, &mut src, &mut sink).unwrap();
        assert_eq!(stats.steps, 1);
        assert_eq!(stats.frames_written, 64);
    }

    #[test]
    fn test_start_cursor() {
        assert_eq!(start_cursor(10_000, 1024, 256, 1.0), 0);
        assert_eq!(start_cursor(10_000, 1024, 256, -0.5), 10_000 - 1280);
        assert!(start_cursor(100, 1024, 256, -1.0) < 0);
    }

    #[test]
    fn test_stats_match_sink() {
        let config = VocoderConfig::new(256).with_rate(1.25);
        let mut src = ramp_source(8000);
        let mut sink = MemorySink::new();
        let stats = convert(&config, &mut src, &mut sink).unwrap();
        assert!(stats.steps > 0);
        assert_eq!(stats.frames_written, sink.num_frames() as u64);
    }

    #[test]
    fn test_backwards_covers_input() {
        let n = 256;
        let len = 8000;
        let forward = {
            let mut sink = MemorySink::new();
            convert(&VocoderConfig::new(n), &mut ramp_source(len), &mut sink).unwrap()
        };
        let backward = {
            let mut sink = MemorySink::new();
            convert(
                &VocoderConfig::new(n).with_rate(-1.0),
                &mut ramp_source(len),
                &mut sink,
            )
            .unwrap()
        };
        assert!((forward.steps as i64 - backward.steps as i64).abs() <= 1);
    }

    #[test]
    fn test_input_shorter_than_frame() {
        let mut src = ramp_source(100);
        let mut sink = MemorySink::new();
        let stats = convert(&VocoderConfig::new(256), &mut src, &mut sink).unwrap();
        assert_eq!(stats, ConvertStats::default());
    }
}
