use crate::error::{PvocError, Result};

/// A single audio sample (32-bit float, range -1.0 to 1.0).
pub type Sample = f32;

/// Channel layout. The vocoder keeps independent spectral memory per
/// channel; only mono and stereo material is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Mono,
    Stereo,
}

impl Channels {
    /// Number of channels.
    #[inline]
    pub fn count(self) -> usize {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }

    /// Parses a raw channel count.
    pub fn from_count(count: u16) -> Result<Self> {
        match count {
            1 => Ok(Channels::Mono),
            2 => Ok(Channels::Stereo),
            n => Err(PvocError::UnsupportedChannels(n)),
        }
    }
}

/// Interleaved audio held in memory.
///
/// For mono audio, samples are stored sequentially: `[s0, s1, s2, ...]`
/// For stereo audio, samples are interleaved: `[L0, R0, L1, R1, ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Raw interleaved sample data.
    pub data: Vec<Sample>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel layout.
    pub channels: Channels,
}

impl AudioBuffer {
    /// Create a new audio buffer.
    pub fn new(data: Vec<Sample>, sample_rate: u32, channels: Channels) -> Self {
        Self {
            data,
            sample_rate,
            channels,
        }
    }

    /// Create a buffer from separate channel vectors.
    ///
    /// # Errors
    /// Returns an error for zero or more than two channels, or channels of
    /// different lengths.
    pub fn from_channels(channels_data: &[Vec<Sample>], sample_rate: u32) -> Result<Self> {
        let channels = Channels::from_count(channels_data.len() as u16)?;
        let num_frames = channels_data[0].len();
        if channels_data.iter().any(|ch| ch.len() != num_frames) {
            return Err(PvocError::InvalidParameter(
                "all channels must have the same number of samples".into(),
            ));
        }
        let data = (0..num_frames)
            .flat_map(|i| channels_data.iter().map(move |ch| ch[i]))
            .collect();
        Ok(Self::new(data, sample_rate, channels))
    }

    /// Number of frames (samples per channel).
    pub fn num_frames(&self) -> usize {
        self.data.len() / self.channels.count()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Returns true if the buffer contains no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copies one channel out of the interleaved data.
    pub fn channel_data(&self, channel: usize) -> Vec<Sample> {
        let nc = self.channels.count();
        if channel >= nc {
            return Vec::new();
        }
        self.data.iter().skip(channel).step_by(nc).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels_count() {
        assert_eq!(Channels::Mono.count(), 1);
        assert_eq!(Channels::Stereo.count(), 2);
        assert_eq!(Channels::from_count(2).unwrap(), Channels::Stereo);
        assert!(matches!(
            Channels::from_count(6),
            Err(PvocError::UnsupportedChannels(6))
        ));
    }

    #[test]
    fn test_audio_buffer_stereo_frames() {
        let buf = AudioBuffer::new(vec![0.1, 0.2, 0.3, 0.4], 44100, Channels::Stereo);
        assert_eq!(buf.num_frames(), 2);
        assert!((buf.duration_secs() - 2.0 / 44100.0).abs() < 1e-12);
    }

    #[test]
    fn test_channel_data_round_trip() {
        let left = vec![0.1, 0.3, 0.5];
        let right = vec![0.2, 0.4, 0.6];
        let buf = AudioBuffer::from_channels(&[left.clone(), right.clone()], 48000).unwrap();
        assert_eq!(buf.data, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(buf.channel_data(0), left);
        assert_eq!(buf.channel_data(1), right);
        assert!(buf.channel_data(2).is_empty());
    }

    #[test]
    fn test_from_channels_mismatched() {
        let res = AudioBuffer::from_channels(&[vec![0.1, 0.3], vec![0.2]], 44100);
        assert!(res.is_err());
        assert!(AudioBuffer::from_channels(&[], 44100).is_err());
    }

    #[test]
    fn test_empty_buffer() {
        let buf = AudioBuffer::new(vec![], 44100, Channels::Mono);
        assert!(buf.is_empty());
        assert_eq!(buf.num_frames(), 0);
    }
}
