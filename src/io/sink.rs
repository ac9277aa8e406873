//! Output sinks for synthesized audio.

use crate::core::types::{AudioBuffer, Sample};
use crate::error::{PvocError, Result};

/// Receives synthesized audio one block at a time.
///
/// Sessions always hand over a left and a right slice of equal length;
/// mono sessions pass the same samples twice.
pub trait AudioSink {
    /// Consumes one block and returns the number of frames accepted.
    fn write(&mut self, left: &[Sample], right: &[Sample]) -> Result<usize>;

    /// Flushes buffered output. Further writes are not expected.
    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: AudioSink + ?Sized> AudioSink for &mut S {
    fn write(&mut self, left: &[Sample], right: &[Sample]) -> Result<usize> {
        (**self).write(left, right)
    }

    fn finalize(&mut self) -> Result<()> {
        (**self).finalize()
    }
}

pub(crate) fn check_pair(left: &[Sample], right: &[Sample]) -> Result<usize> {
    if left.len() != right.len() {
        return Err(PvocError::LengthMismatch {
            expected: left.len(),
            actual: right.len(),
        });
    }
    Ok(left.len())
}

/// Collects output in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub left: Vec<Sample>,
    pub right: Vec<Sample>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames collected so far.
    pub fn num_frames(&self) -> usize {
        self.left.len()
    }

    /// Interleaves the collected frames into a stereo buffer.
    pub fn into_buffer(self, sample_rate: u32) -> Result<AudioBuffer> {
        AudioBuffer::from_channels(&[self.left, self.right], sample_rate)
    }
}

impl AudioSink for MemorySink {
    fn write(&mut self, left: &[Sample], right: &[Sample]) -> Result<usize> {
        let n = check_pair(left, right)?;
        self.left.extend_from_slice(left);
        self.right.extend_from_slice(right);
        Ok(n)
    }
}

/// A PCM output device accepting fixed-size blocks of interleaved 16-bit
/// stereo samples.
pub trait PcmDevice {
    /// Frames per block the device wants.
    fn block_frames(&self) -> usize;

    /// Plays one block of `2 × block_frames()` interleaved samples.
    fn write_block(&mut self, interleaved: &[i16]) -> Result<()>;

    /// Waits for queued blocks to finish playing.
    fn drain(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Converts a float sample to 16-bit PCM.
#[inline]
pub fn to_i16(sample: Sample) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// Adapts a [`PcmDevice`] to [`AudioSink`], regrouping arbitrary write
/// sizes into the device's block size.
pub struct DeviceSink<D: PcmDevice> {
    device: D,
    pending: Vec<i16>,
    block_samples: usize,
}

impl<D: PcmDevice> DeviceSink<D> {
    /// # Errors
    /// Returns [`PvocError::InvalidParameter`] if the device reports a block
    /// size of zero.
    pub fn new(device: D) -> Result<Self> {
        let block_frames = device.block_frames();
        if block_frames == 0 {
            return Err(PvocError::InvalidParameter(
                "device block size must be non-zero".into(),
            ));
        }
        let block_samples = block_frames * 2;
        Ok(Self {
            device,
            pending: Vec::with_capacity(block_samples),
            block_samples,
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Returns the device, dropping any partial block.
    pub fn into_inner(self) -> D {
        self.device
    }
}

impl<D: PcmDevice> AudioSink for DeviceSink<D> {
    fn write(&mut self, left: &[Sample], right: &[Sample]) -> Result<usize> {
        let n = check_pair(left, right)?;
        for (&l, &r) in left.iter().zip(right) {
            self.pending.push(to_i16(l));
            self.pending.push(to_i16(r));
            if self.pending.len() == self.block_samples {
                self.device.write_block(&self.pending)?;
                self.pending.clear();
            }
        }
        Ok(n)
    }

    /// Pads the last partial block with silence and drains the device.
    fn finalize(&mut self) -> Result<()> {
        if !self.pending.is_empty() {
            self.pending.resize(self.block_samples, 0);
            self.device.write_block(&self.pending)?;
            self.pending.clear();
        }
        self.device.drain()
    }
}
