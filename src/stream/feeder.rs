//! Push-based realtime output.
//!
//! A background thread owns the session and source, steps ahead of
//! playback and pushes interleaved stereo chunks into a lock-free ring. The
//! audio callback side, [`RealtimeFeed`], only pops from the ring; it never
//! steps the session, allocates or blocks.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::types::Sample;
use crate::error::{PvocError, Result};
use crate::io::sink::{check_pair, AudioSink};
use crate::io::source::AudioSource;
use crate::stretch::phase_vocoder::{PhaseVocoder, StepOutcome};

/// Output channels in the ring (always interleaved stereo).
const RING_CHANNELS: usize = 2;

/// Feeder thread back-off while the ring is full.
const FULL_BACKOFF: Duration = Duration::from_millis(1);

/// Ring and chunk sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeederOptions {
    /// Frames per chunk pushed into the ring.
    pub chunk_frames: usize,
    /// Ring capacity in frames.
    pub ring_frames: usize,
}

impl Default for FeederOptions {
    fn default() -> Self {
        Self {
            chunk_frames: 1024,
            ring_frames: 44100,
        }
    }
}

impl FeederOptions {
    fn validate(&self) -> Result<()> {
        if self.chunk_frames == 0 || self.ring_frames < self.chunk_frames {
            return Err(PvocError::InvalidParameter(format!(
                "feeder needs 0 < chunk_frames ({}) <= ring_frames ({})",
                self.chunk_frames, self.ring_frames
            )));
        }
        Ok(())
    }
}

/// Final counts reported by the feeder thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedStats {
    pub steps: usize,
    /// Frames pushed into the ring.
    pub frames_pushed: u64,
    /// The source ran out and every frame reached the ring.
    pub exhausted: bool,
}

/// State shared between the feeder thread and the callback side.
#[derive(Debug, Default)]
struct Shared {
    stop: AtomicBool,
    /// Set once the feeder will push nothing more.
    done: AtomicBool,
    underruns: AtomicUsize,
}

/// Collects step output and hands it to the ring in fixed-size chunks.
struct ChunkSink<'a> {
    producer: &'a mut HeapProd<Sample>,
    shared: &'a Shared,
    pending: Vec<Sample>,
    chunk_samples: usize,
    frames_pushed: u64,
}

impl ChunkSink<'_> {
    /// Pushes one whole chunk, waiting for space. Returns false if asked to
    /// stop while waiting.
    fn push_chunk(&mut self, len: usize) -> bool {
        let mut offset = 0;
        while offset < len {
            if self.shared.stop.load(Ordering::Relaxed) {
                return false;
            }
            let pushed = self.producer.push_slice(&self.pending[offset..len]);
            if pushed == 0 {
                thread::sleep(FULL_BACKOFF);
            }
            offset += pushed;
        }
        self.pending.drain(..len);
        self.frames_pushed += (len / RING_CHANNELS) as u64;
        true
    }

    /// Pushes whatever is left, shorter than a chunk. Returns false if
    /// asked to stop before the tail was delivered.
    fn flush(&mut self) -> bool {
        let len = self.pending.len();
        len == 0 || self.push_chunk(len)
    }
}

impl AudioSink for ChunkSink<'_> {
    fn write(&mut self, left: &[Sample], right: &[Sample]) -> Result<usize> {
        let n = check_pair(left, right)?;
        for (&l, &r) in left.iter().zip(right) {
            self.pending.push(l);
            self.pending.push(r);
        }
        while self.pending.len() >= self.chunk_samples {
            if !self.push_chunk(self.chunk_samples) {
                break;
            }
        }
        Ok(n)
    }
}

/// Controls the feeder thread.
pub struct FeederHandle {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<Result<FeedStats>>>,
}

impl FeederHandle {
    /// Asks the thread to stop after its current step.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Relaxed);
    }

    /// True once the thread has pushed its last chunk.
    pub fn is_done(&self) -> bool {
        self.shared.done.load(Ordering::Acquire)
    }

    /// Waits for the thread and returns its counts.
    ///
    /// # Errors
    /// Returns the session's error if a step failed, or
    /// [`PvocError::Feeder`] if the thread panicked.
    pub fn join(mut self) -> Result<FeedStats> {
        let handle = self
            .thread
            .take()
            .ok_or_else(|| PvocError::Feeder("feeder already joined".into()))?;
        let stats = handle
            .join()
            .map_err(|_| PvocError::Feeder("feeder thread panicked".into()))??;
        let underruns = self.shared.underruns.load(Ordering::Relaxed);
        if underruns > 0 {
            warn!(underruns, "realtime feed ran dry");
        }
        debug!(
            steps = stats.steps,
            frames = stats.frames_pushed,
            exhausted = stats.exhausted,
            "feeder joined"
        );
        Ok(stats)
    }
}

impl Drop for FeederHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Callback-side end of the ring.
pub struct RealtimeFeed {
    consumer: HeapCons<Sample>,
    shared: Arc<Shared>,
}

impl RealtimeFeed {
    /// Fills `out` with interleaved stereo samples. Missing samples are
    /// zero; running short while the feeder is still active counts as an
    /// underrun.
    ///
    /// Returns the number of samples taken from the ring.
    pub fn fill(&mut self, out: &mut [Sample]) -> usize {
        let read = self.consumer.pop_slice(out);
        out[read..].fill(0.0);
        if read < out.len() && !self.shared.done.load(Ordering::Acquire) {
            self.shared.underruns.fetch_add(1, Ordering::Relaxed);
        }
        read
    }

    /// Samples waiting in the ring.
    pub fn available(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Underruns counted so far.
    pub fn underruns(&self) -> usize {
        self.shared.underruns.load(Ordering::Relaxed)
    }

    /// True when the feeder is done and the ring is empty.
    pub fn is_finished(&self) -> bool {
        self.shared.done.load(Ordering::Acquire) && self.consumer.is_empty()
    }
}

/// Moves `session` and `source` onto a feeder thread.
///
/// # Errors
/// Fails on invalid options or a channel-layout mismatch, or if the thread
/// cannot be spawned.
pub fn spawn_feeder<S>(
    mut session: PhaseVocoder,
    mut source: S,
    options: FeederOptions,
) -> Result<(FeederHandle, RealtimeFeed)>
where
    S: AudioSource + Send + 'static,
{
    options.validate()?;
    if session.channels() != source.channels() {
        return Err(PvocError::InvalidParameter(format!(
            "source has {} channels, session expects {}",
            source.channels().count(),
            session.channels().count()
        )));
    }

    let rb = HeapRb::<Sample>::new(options.ring_frames * RING_CHANNELS);
    let (mut producer, consumer) = rb.split();
    let shared = Arc::new(Shared::default());
    let thread_shared = Arc::clone(&shared);
    let chunk_samples = options.chunk_frames * RING_CHANNELS;

    let thread = thread::Builder::new()
        .name("pvoc-feeder".into())
        .spawn(move || {
            let shared = thread_shared;
            let mut sink = ChunkSink {
                producer: &mut producer,
                shared: &shared,
                pending: Vec::with_capacity(chunk_samples * 2),
                chunk_samples,
                frames_pushed: 0,
            };
            let mut stats = FeedStats::default();
            let result = loop {
                if shared.stop.load(Ordering::Relaxed) {
                    break Ok(());
                }
                match session.step(&mut source, &mut sink) {
                    Ok(StepOutcome::Produced(_)) => stats.steps += 1,
                    Ok(StepOutcome::Exhausted) => {
                        stats.exhausted = sink.flush();
                        if !stats.exhausted {
                            debug!(pending = sink.pending.len(), "stopped before the tail was flushed");
                        }
                        break Ok(());
                    }
                    Err(e) => break Err(e),
                }
            };
            stats.frames_pushed = sink.frames_pushed;
            shared.done.store(true, Ordering::Release);
            result.map(|()| stats)
        })?;

    debug!(
        chunk_frames = options.chunk_frames,
        ring_frames = options.ring_frames,
        "feeder spawned"
    );
    Ok((
        FeederHandle {
            shared: Arc::clone(&shared),
            thread: Some(thread),
        },
        RealtimeFeed { consumer, shared },
    ))
}
