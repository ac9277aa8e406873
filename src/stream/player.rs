//! Pull-based playback: the caller asks for a stretch of wall-clock time and
//! the player steps the session until that much output exists.

use std::ops::Range;
use tracing::{debug, trace};

use crate::error::{PvocError, Result};
use crate::io::sink::AudioSink;
use crate::io::source::AudioSource;
use crate::stretch::phase_vocoder::{PhaseVocoder, StepOutcome};

/// What one [`Player::play_millis`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayReport {
    /// Frames written to the sink.
    pub frames: usize,
    /// The source ran out and no loop region was set.
    pub finished: bool,
}

/// Drives a session from a source with transport controls on top: loop
/// region and seeking.
pub struct Player<S: AudioSource> {
    session: PhaseVocoder,
    source: S,
    loop_region: Option<Range<i64>>,
}

impl<S: AudioSource> Player<S> {
    /// # Errors
    /// Fails if the source's channel layout differs from the session's.
    pub fn new(session: PhaseVocoder, source: S) -> Result<Self> {
        if session.channels() != source.channels() {
            return Err(PvocError::InvalidParameter(format!(
                "source has {} channels, session expects {}",
                source.channels().count(),
                session.channels().count()
            )));
        }
        Ok(Self {
            session,
            source,
            loop_region: None,
        })
    }

    pub fn session(&self) -> &PhaseVocoder {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut PhaseVocoder {
        &mut self.session
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Input position in frames.
    pub fn position(&self) -> i64 {
        self.session.cursor()
    }

    /// Input position in seconds.
    pub fn position_secs(&self) -> f64 {
        self.position() as f64 / f64::from(self.source.sample_rate().max(1))
    }

    /// Jumps to `frame` and clears spectral memory so the new material does
    /// not inherit phases from the old position.
    pub fn seek(&mut self, frame: i64) {
        debug!(frame, "player seek");
        self.session.seek(frame);
        self.session.reset();
    }

    /// Restricts playback to `region` (input frames). Playing past either
    /// end wraps to the other without resetting spectral memory.
    ///
    /// # Errors
    /// The region must hold at least one full step (`N + H` frames).
    pub fn set_loop(&mut self, region: Range<i64>) -> Result<()> {
        let span = (self.session.fft_size() + self.session.hops().synthesis) as i64;
        if region.start < 0 || region.end - region.start < span {
            return Err(PvocError::InvalidParameter(format!(
                "loop region {region:?} shorter than one step ({span} frames)"
            )));
        }
        debug!(start = region.start, end = region.end, "loop set");
        self.loop_region = Some(region);
        Ok(())
    }

    pub fn clear_loop(&mut self) {
        self.loop_region = None;
    }

    pub fn loop_region(&self) -> Option<&Range<i64>> {
        self.loop_region.as_ref()
    }

    /// Changes rate and pitch between steps.
    pub fn set_rate_pitch(&mut self, rate: f64, pitch: f64) -> Result<()> {
        self.session.set_rate_pitch(rate, pitch)
    }

    /// Output frames in `ms` milliseconds at the source rate.
    fn frames_for_millis(&self, ms: u64) -> usize {
        (ms * u64::from(self.source.sample_rate()) / 1000) as usize
    }

    /// Keeps the cursor inside the loop region before the next step.
    fn wrap_loop(&mut self) {
        let Some(region) = &self.loop_region else {
            return;
        };
        let span = (self.session.fft_size() + self.session.hops().synthesis) as i64;
        let cursor = self.session.cursor();
        let target = if self.session.hops().analysis >= 0 && cursor + span > region.end {
            Some(region.start)
        } else if self.session.hops().analysis < 0 && cursor < region.start {
            Some(region.end - span)
        } else {
            None
        };
        if let Some(target) = target {
            trace!(from = cursor, to = target, "loop wrap");
            self.session.seek(target);
        }
    }

    /// Steps until at least `ms` milliseconds of output have been written,
    /// or the source runs out.
    pub fn play_millis<K: AudioSink + ?Sized>(&mut self, ms: u64, sink: &mut K) -> Result<PlayReport> {
        let wanted = self.frames_for_millis(ms);
        let mut frames = 0;
        while frames < wanted {
            self.wrap_loop();
            match self.session.step(&mut self.source, sink)? {
                StepOutcome::Produced(n) => frames += n,
                StepOutcome::Exhausted => {
                    return Ok(PlayReport {
                        frames,
                        finished: true,
                    })
                }
            }
        }
        Ok(PlayReport {
            frames,
            finished: false,
        })
    }
}
