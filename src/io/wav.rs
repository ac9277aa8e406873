//! WAV file collaborators backed by `hound`.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

use crate::core::types::{AudioBuffer, Channels, Sample};
use crate::error::{PvocError, Result};
use crate::io::sink::{check_pair, to_i16, AudioSink};
use crate::io::source::{check_dest, readable_span, AudioSource};

/// Output sample encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WavEncoding {
    /// 16-bit integer PCM.
    #[default]
    Pcm16,
    /// 32-bit IEEE float.
    Float32,
}

impl WavEncoding {
    fn spec(self, channels: Channels, sample_rate: u32) -> WavSpec {
        let (bits_per_sample, sample_format) = match self {
            WavEncoding::Pcm16 => (16, SampleFormat::Int),
            WavEncoding::Float32 => (32, SampleFormat::Float),
        };
        WavSpec {
            channels: channels.count() as u16,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

/// Random-access WAV file source. Every read seeks the underlying file.
pub struct WavSource {
    reader: WavReader<BufReader<File>>,
    spec: WavSpec,
    channels: Channels,
    num_frames: u64,
    /// Interleaved scratch for one read.
    scratch: Vec<Sample>,
}

impl WavSource {
    /// Opens a mono or stereo WAV file.
    ///
    /// # Errors
    /// Fails if the file cannot be opened or parsed, or has more than two
    /// channels.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)?;
        let spec = reader.spec();
        let channels = Channels::from_count(spec.channels)?;
        let num_frames = u64::from(reader.duration());
        debug!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            bits = spec.bits_per_sample,
            frames = num_frames,
            "opened WAV source"
        );
        Ok(Self {
            reader,
            spec,
            channels,
            num_frames,
            scratch: Vec::new(),
        })
    }

    fn read_interleaved(&mut self, samples: usize) -> Result<()> {
        self.scratch.clear();
        match self.spec.sample_format {
            SampleFormat::Float => {
                for s in self.reader.samples::<f32>().take(samples) {
                    self.scratch.push(s?);
                }
            }
            SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (self.spec.bits_per_sample - 1)) as f32;
                for s in self.reader.samples::<i32>().take(samples) {
                    self.scratch.push(s? as f32 * scale);
                }
            }
        }
        Ok(())
    }
}

impl AudioSource for WavSource {
    fn channels(&self) -> Channels {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    fn num_frames(&self) -> u64 {
        self.num_frames
    }

    fn read_at(&mut self, frame_offset: i64, dest: &mut [Vec<Sample>]) -> Result<usize> {
        let wanted = check_dest(self.channels, dest)?;
        let Some((start, count)) = readable_span(frame_offset, wanted, self.num_frames) else {
            dest.iter_mut().for_each(|d| d.fill(0.0));
            return Ok(0);
        };

        let start = u32::try_from(start)
            .map_err(|_| PvocError::InvalidParameter(format!("frame offset {start} too large")))?;
        self.reader.seek(start)?;
        let nc = self.channels.count();
        self.read_interleaved(count * nc)?;

        let got = self.scratch.len() / nc;
        for (c, d) in dest.iter_mut().enumerate() {
            for (slot, frame) in d.iter_mut().zip(self.scratch.chunks_exact(nc)) {
                *slot = frame[c];
            }
            d[got..].fill(0.0);
        }
        Ok(got)
    }
}

/// Streaming WAV file sink.
pub struct WavSink {
    writer: Option<WavWriter<BufWriter<File>>>,
    channels: Channels,
    encoding: WavEncoding,
    frames_written: u64,
}

impl WavSink {
    /// Creates the output file. A mono sink keeps only the left samples of
    /// each write.
    pub fn create(
        path: impl AsRef<Path>,
        sample_rate: u32,
        channels: Channels,
        encoding: WavEncoding,
    ) -> Result<Self> {
        let writer = WavWriter::create(path, encoding.spec(channels, sample_rate))?;
        Ok(Self {
            writer: Some(writer),
            channels,
            encoding,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn put(writer: &mut WavWriter<BufWriter<File>>, encoding: WavEncoding, s: Sample) -> Result<()> {
        match encoding {
            WavEncoding::Pcm16 => writer.write_sample(to_i16(s))?,
            WavEncoding::Float32 => writer.write_sample(s)?,
        }
        Ok(())
    }
}

impl AudioSink for WavSink {
    fn write(&mut self, left: &[Sample], right: &[Sample]) -> Result<usize> {
        let n = check_pair(left, right)?;
        let writer = self.writer.as_mut().ok_or_else(|| {
            PvocError::Io(std::io::Error::other("write after WAV sink was finalized"))
        })?;
        for (&l, &r) in left.iter().zip(right) {
            Self::put(writer, self.encoding, l)?;
            if self.channels == Channels::Stereo {
                Self::put(writer, self.encoding, r)?;
            }
        }
        self.frames_written += n as u64;
        Ok(n)
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            debug!(frames = self.frames_written, "finalized WAV sink");
        }
        Ok(())
    }
}

/// Reads a whole WAV file into memory.
pub fn read_wav_file(path: impl AsRef<Path>) -> Result<AudioBuffer> {
    let mut source = WavSource::open(path)?;
    let frames = source.num_frames as usize;
    let nc = source.channels.count();
    source.reader.seek(0)?;
    source.read_interleaved(frames * nc)?;
    Ok(AudioBuffer::new(
        std::mem::take(&mut source.scratch),
        source.spec.sample_rate,
        source.channels,
    ))
}

/// Writes an interleaved buffer to a WAV file.
pub fn write_wav_file(path: impl AsRef<Path>, buffer: &AudioBuffer, encoding: WavEncoding) -> Result<()> {
    let mut writer = WavWriter::create(path, encoding.spec(buffer.channels, buffer.sample_rate))?;
    for &s in &buffer.data {
        WavSink::put(&mut writer, encoding, s)?;
    }
    writer.finalize()?;
    Ok(())
}
