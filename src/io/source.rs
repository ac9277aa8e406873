//! Random-access audio input.

use crate::core::types::{AudioBuffer, Channels, Sample};
use crate::error::{PvocError, Result};

/// A random-access, seekable source of split-channel audio.
///
/// The vocoder reads two overlapping frames per step at arbitrary offsets,
/// possibly moving backwards, so sources must support reads at any frame
/// position rather than a forward-only stream.
pub trait AudioSource {
    /// Channel layout of the material.
    fn channels(&self) -> Channels;

    /// Sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Total length in frames.
    fn num_frames(&self) -> u64;

    /// Reads `dest[c].len()` frames of every channel `c` starting at
    /// `frame_offset`.
    ///
    /// Returns how many frames were actually available; the remainder of
    /// each destination is zero-filled. Reads at or beyond the end, and at
    /// negative offsets, are short reads returning 0.
    fn read_at(&mut self, frame_offset: i64, dest: &mut [Vec<Sample>]) -> Result<usize>;
}

/// Returns the readable range `(start, count)` for a request, or `None`
/// when nothing is available.
pub(crate) fn readable_span(frame_offset: i64, wanted: usize, total: u64) -> Option<(u64, usize)> {
    if frame_offset < 0 {
        return None;
    }
    let start = frame_offset as u64;
    if start >= total {
        return None;
    }
    let count = (total - start).min(wanted as u64) as usize;
    Some((start, count))
}

pub(crate) fn check_dest(channels: Channels, dest: &[Vec<Sample>]) -> Result<usize> {
    if dest.len() != channels.count() {
        return Err(PvocError::LengthMismatch {
            expected: channels.count(),
            actual: dest.len(),
        });
    }
    let wanted = dest.first().map_or(0, Vec::len);
    if dest.iter().any(|d| d.len() != wanted) {
        return Err(PvocError::InvalidParameter(
            "destination channels must have equal lengths".into(),
        ));
    }
    Ok(wanted)
}

/// Source over an in-memory interleaved buffer.
#[derive(Debug, Clone)]
pub struct MemorySource {
    buffer: AudioBuffer,
}

impl MemorySource {
    pub fn new(buffer: AudioBuffer) -> Self {
        Self { buffer }
    }

    /// Mono source from raw samples.
    pub fn mono(samples: Vec<Sample>, sample_rate: u32) -> Self {
        Self::new(AudioBuffer::new(samples, sample_rate, Channels::Mono))
    }

    /// Stereo source from separate channels.
    pub fn stereo(left: &[Sample], right: &[Sample], sample_rate: u32) -> Result<Self> {
        let buffer = AudioBuffer::from_channels(&[left.to_vec(), right.to_vec()], sample_rate)?;
        Ok(Self::new(buffer))
    }

    /// The wrapped buffer.
    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }
}

impl AudioSource for MemorySource {
    fn channels(&self) -> Channels {
        self.buffer.channels
    }

    fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate
    }

    fn num_frames(&self) -> u64 {
        self.buffer.num_frames() as u64
    }

    fn read_at(&mut self, frame_offset: i64, dest: &mut [Vec<Sample>]) -> Result<usize> {
        let wanted = check_dest(self.buffer.channels, dest)?;
        let Some((start, count)) = readable_span(frame_offset, wanted, self.num_frames()) else {
            dest.iter_mut().for_each(|d| d.fill(0.0));
            return Ok(0);
        };

        let nc = self.buffer.channels.count();
        let start = start as usize;
        let frames = &self.buffer.data[start * nc..(start + count) * nc];
        for (c, d) in dest.iter_mut().enumerate() {
            for (slot, frame) in d.iter_mut().zip(frames.chunks_exact(nc)) {
                *slot = frame[c];
            }
            d[count..].fill(0.0);
        }
        Ok(count)
    }
}
