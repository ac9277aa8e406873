//! Arithmetic on packed (half-complex) real spectra.
//!
//! A packed spectrum of length `N` stores the `N/2 + 1` independent
//! coefficients of a real signal's DFT in `N` reals:
//!
//! ```text
//! [ r0, r1, r2, …, r(N/2), …, i2, i1 ]
//! ```
//!
//! Index 0 is the DC term and, for even `N`, index `N/2` is the Nyquist
//! term; both are real. For every other bin `k` the real part lives at `k`
//! and the imaginary part at `N - k`. All routines here read and write that
//! layout directly, touching each bin once.

use rustfft::num_complex::Complex;

/// Number of meaningful complex bins in a packed spectrum of length `n`.
#[inline]
pub fn num_bins(n: usize) -> usize {
    n / 2 + 1
}

/// Returns true when bin `k` of a length-`n` packed spectrum has no
/// imaginary slot (DC, and Nyquist for even `n`).
#[inline]
fn is_real_bin(k: usize, n: usize) -> bool {
    k == 0 || (n % 2 == 0 && k == n / 2)
}

/// Reads bin `k` of a packed spectrum as a complex number.
#[inline]
pub fn get_bin(x: &[f32], k: usize) -> Complex<f32> {
    let n = x.len();
    if is_real_bin(k, n) {
        Complex::new(x[k], 0.0)
    } else {
        Complex::new(x[k], x[n - k])
    }
}

/// Writes bin `k` of a packed spectrum. Real-only bins drop the imaginary
/// part.
#[inline]
pub fn set_bin(z: &mut [f32], k: usize, c: Complex<f32>) {
    let n = z.len();
    z[k] = c.re;
    if !is_real_bin(k, n) {
        z[n - k] = c.im;
    }
}

#[inline]
fn check_len(a: usize, b: usize) {
    debug_assert_eq!(a, b, "packed spectra must have equal length");
}

/// Per-bin magnitude. The result is a packed spectrum with zero imaginary
/// parts, so the real slots double as a magnitude array.
pub fn abs(x: &[f32], z: &mut [f32]) {
    check_len(x.len(), z.len());
    let n = x.len();
    for k in 0..num_bins(n).min(n) {
        let m = get_bin(x, k).norm();
        set_bin(z, k, Complex::new(m, 0.0));
    }
}

/// Per-bin complex product `z = x · y`.
pub fn mul(x: &[f32], y: &[f32], z: &mut [f32]) {
    check_len(x.len(), y.len());
    check_len(x.len(), z.len());
    let n = x.len();
    for k in 0..num_bins(n).min(n) {
        let c = get_bin(x, k) * get_bin(y, k);
        set_bin(z, k, c);
    }
}

/// Per-bin complex quotient `z = x / y`.
///
/// A bin whose denominator has zero magnitude yields zero. Whole silent
/// frames never reach this point (see [`is_silent`]); the clamp only covers
/// isolated zero bins inside otherwise non-silent frames.
pub fn div(x: &[f32], y: &[f32], z: &mut [f32]) {
    check_len(x.len(), y.len());
    check_len(x.len(), z.len());
    let n = x.len();
    for k in 0..num_bins(n).min(n) {
        let num = get_bin(x, k);
        let den = get_bin(y, k);
        let den_sq = den.norm_sqr();
        let c = if den_sq > 0.0 {
            Complex::new(
                (num.re * den.re + num.im * den.im) / den_sq,
                (num.im * den.re - num.re * den.im) / den_sq,
            )
        } else {
            Complex::new(0.0, 0.0)
        };
        set_bin(z, k, c);
    }
}

/// Per-bin unit phasor `z = x / |x|`.
///
/// Zero-magnitude bins map to `1 + 0i`, which hands the bin's phase back to
/// whatever it is multiplied with.
pub fn normalize(x: &[f32], z: &mut [f32]) {
    check_len(x.len(), z.len());
    let n = x.len();
    for k in 0..num_bins(n).min(n) {
        let c = get_bin(x, k);
        let m = c.norm();
        let u = if m > 0.0 {
            c / m
        } else {
            Complex::new(1.0, 0.0)
        };
        set_bin(z, k, u);
    }
}

/// Splits a packed spectrum into per-bin amplitude and phase.
///
/// `amp` and `phase` must hold [`num_bins`]`(x.len())` values.
pub fn to_polar(x: &[f32], amp: &mut [f32], phase: &mut [f32]) {
    let n = x.len();
    let bins = num_bins(n).min(n);
    check_len(amp.len(), bins);
    check_len(phase.len(), bins);
    for k in 0..bins {
        let c = get_bin(x, k);
        amp[k] = c.norm();
        phase[k] = c.arg();
    }
}

/// Builds a packed spectrum from per-bin amplitude and phase.
///
/// When `conjugate` is set every phase is negated. The output layout is
/// taken from `z.len()`, which may exceed the original transform length:
/// bins beyond `amp.len()` are zero, giving the zero-padded spectrum of a
/// time-domain interpolation.
pub fn from_polar(amp: &[f32], phase: &[f32], conjugate: bool, z: &mut [f32]) {
    check_len(amp.len(), phase.len());
    z.iter_mut().for_each(|s| *s = 0.0);
    let n = z.len();
    let bins = num_bins(n).min(n).min(amp.len());
    let sign = if conjugate { -1.0 } else { 1.0 };
    for k in 0..bins {
        set_bin(z, k, Complex::from_polar(amp[k], sign * phase[k]));
    }
}

/// Loose phase-lock smoothing: `z[k] = y[k-1] + y[k] + y[k+1]`.
///
/// Neighbours outside `[0, N/2]` are dropped, so DC and Nyquist sum two bins
/// instead of three. Summing neighbours pulls each bin's phase towards the
/// local trend and reduces phasiness between partials.
pub fn loose_lock_smooth(y: &[f32], z: &mut [f32]) {
    check_len(y.len(), z.len());
    let n = y.len();
    let bins = num_bins(n).min(n);
    if bins == 0 {
        return;
    }
    let mut prev = Complex::new(0.0f32, 0.0);
    let mut cur = get_bin(y, 0);
    for k in 0..bins {
        let next = if k + 1 < bins {
            get_bin(y, k + 1)
        } else {
            Complex::new(0.0, 0.0)
        };
        set_bin(z, k, prev + cur + next);
        prev = cur;
        cur = next;
    }
}

/// Returns true if every sample of `frame` is exactly zero.
#[inline]
pub fn is_silent(frame: &[f32]) -> bool {
    frame.iter().all(|&s| s == 0.0)
}

/// Power spectrum `|X[k]|² / density` for `k` in `0..=N/2`.
///
/// `density` is normally [`window_energy_density`] of the analysis window.
///
/// [`window_energy_density`]: crate::core::window::window_energy_density
pub fn power_spectrum(x: &[f32], density: f64, out: &mut [f32]) {
    let n = x.len();
    let bins = num_bins(n).min(n);
    check_len(out.len(), bins);
    let inv = if density > 0.0 { 1.0 / density } else { 0.0 };
    for (k, p) in out.iter_mut().enumerate().take(bins) {
        *p = (get_bin(x, k).norm_sqr() as f64 * inv) as f32;
    }
}
