//! Sample-rate conversion for hop-sized output blocks.
//!
//! The phase vocoder emits one synthesis hop per step; when pitch is shifted
//! that hop is converted to a different length before reaching the sink.
//! Converting each hop on its own would restart the interpolator at every
//! block boundary, so [`StreamResampler`] keeps its read position and the
//! few samples of history the interpolation kernel needs across calls.

/// 4-point Hermite interpolation between `s1` and `s2`.
#[inline]
fn hermite(s0: f32, s1: f32, s2: f32, s3: f32, frac: f32) -> f32 {
    let c0 = s1;
    let c1 = 0.5 * (s2 - s0);
    let c2 = s0 - 2.5 * s1 + 2.0 * s2 - 0.5 * s3;
    let c3 = 0.5 * (s3 - s0) + 1.5 * (s1 - s2);
    ((c3 * frac + c2) * frac + c1) * frac + c0
}

/// Continuous-phase cubic resampler fed one block at a time.
///
/// `ratio` is output samples per input sample. Over many blocks the output
/// length converges to `ratio × input` length; individual blocks may emit
/// one sample more or less. The interpolator runs two input samples behind
/// the newest sample it was given.
#[derive(Debug, Clone)]
pub struct StreamResampler {
    ratio: f64,
    /// Input samples still needed by the kernel. `history[0]` is the sample
    /// before the current read position.
    history: Vec<f32>,
    /// Read position relative to `history[0]`.
    pos: f64,
}

impl StreamResampler {
    /// Creates a resampler producing `ratio` output samples per input sample.
    pub fn new(ratio: f64) -> Self {
        let mut r = Self {
            ratio: 1.0,
            history: Vec::new(),
            pos: 1.0,
        };
        r.set_ratio(ratio);
        r.reset();
        r
    }

    /// Current conversion ratio (output / input).
    #[inline]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Changes the conversion ratio without discarding history, so the
    /// output stays continuous across the change.
    pub fn set_ratio(&mut self, ratio: f64) {
        if ratio.is_finite() && ratio > 0.0 {
            self.ratio = ratio;
        }
    }

    /// Clears history and read position.
    pub fn reset(&mut self) {
        self.history.clear();
        // Silence before the first sample.
        self.history.push(0.0);
        self.pos = 1.0;
    }

    /// Consumes `input` and appends the converted samples to `out`.
    ///
    /// Returns the number of samples appended.
    pub fn process(&mut self, input: &[f32], out: &mut Vec<f32>) -> usize {
        self.history.extend_from_slice(input);
        let step = 1.0 / self.ratio;
        let start_len = out.len();

        loop {
            let idx = self.pos as usize;
            if idx + 2 >= self.history.len() {
                break;
            }
            let frac = (self.pos - idx as f64) as f32;
            out.push(hermite(
                self.history[idx - 1],
                self.history[idx],
                self.history[idx + 1],
                self.history[idx + 2],
                frac,
            ));
            self.pos += step;
        }

        // Keep one sample before the read position for the kernel.
        let consumed = (self.pos as usize).saturating_sub(1);
        if consumed > 0 {
            let consumed = consumed.min(self.history.len());
            self.history.drain(..consumed);
            self.pos -= consumed as f64;
        }

        out.len() - start_len
    }
}
