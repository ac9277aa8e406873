//! Real FFT producing and consuming the packed spectrum layout.

use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;
use std::sync::Arc;

use crate::core::spectrum::num_bins;
use crate::error::{PvocError, Result};

/// Zero-valued complex number, used for FFT buffer initialization.
pub const COMPLEX_ZERO: Complex<f32> = Complex::new(0.0, 0.0);

/// Forward/inverse real transform pair of a fixed length with reusable
/// scratch buffers.
///
/// The inverse transform is unnormalized: `inverse(forward(x)) == N · x`.
pub struct PackedFft {
    len: usize,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    /// Time-domain scratch (realfft consumes its input).
    time: Vec<f32>,
    /// Half spectrum in realfft's layout.
    freq: Vec<Complex<f32>>,
    scratch_fwd: Vec<Complex<f32>>,
    scratch_inv: Vec<Complex<f32>>,
}

impl PackedFft {
    /// Plans both directions for transforms of length `len`.
    pub fn new(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(PvocError::InvalidConfig("FFT length must be non-zero".into()));
        }
        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);
        let scratch_fwd = forward.make_scratch_vec();
        let scratch_inv = inverse.make_scratch_vec();
        Ok(Self {
            len,
            forward,
            inverse,
            time: vec![0.0; len],
            freq: vec![COMPLEX_ZERO; num_bins(len)],
            scratch_fwd,
            scratch_inv,
        })
    }

    /// Transform length.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; a zero-length plan cannot be constructed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check(&self, buf: &[f32]) -> Result<()> {
        if buf.len() != self.len {
            return Err(PvocError::LengthMismatch {
                expected: self.len,
                actual: buf.len(),
            });
        }
        Ok(())
    }

    /// Forward transform of `input` into the packed layout `out`.
    pub fn forward(&mut self, input: &[f32], out: &mut [f32]) -> Result<()> {
        self.check(input)?;
        self.check(out)?;
        self.time.copy_from_slice(input);
        self.forward
            .process_with_scratch(&mut self.time, &mut self.freq, &mut self.scratch_fwd)?;
        unpack_half(&self.freq, out);
        Ok(())
    }

    /// Inverse transform of the packed spectrum `input` into `out`
    /// (unnormalized).
    pub fn inverse(&mut self, input: &[f32], out: &mut [f32]) -> Result<()> {
        self.check(input)?;
        self.check(out)?;
        pack_half(input, &mut self.freq);
        self.inverse
            .process_with_scratch(&mut self.freq, out, &mut self.scratch_inv)?;
        Ok(())
    }
}

/// Converts realfft's `N/2 + 1` complex bins into the packed layout.
fn unpack_half(freq: &[Complex<f32>], out: &mut [f32]) {
    let n = out.len();
    out[0] = freq[0].re;
    for k in 1..(n + 1) / 2 {
        out[k] = freq[k].re;
        out[n - k] = freq[k].im;
    }
    if n % 2 == 0 && n > 1 {
        out[n / 2] = freq[n / 2].re;
    }
}

/// Converts a packed spectrum into realfft's layout. DC and Nyquist get an
/// exactly zero imaginary part, which the inverse transform requires.
fn pack_half(packed: &[f32], freq: &mut [Complex<f32>]) {
    let n = packed.len();
    freq[0] = Complex::new(packed[0], 0.0);
    for k in 1..(n + 1) / 2 {
        freq[k] = Complex::new(packed[k], packed[n - k]);
    }
    if n % 2 == 0 && n > 1 {
        freq[n / 2] = Complex::new(packed[n / 2], 0.0);
    }
}
