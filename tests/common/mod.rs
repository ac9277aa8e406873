#![allow(dead_code)]

use std::f32::consts::PI;

use pvoc::{
    Channels, MemorySink, MemorySource, PhaseVocoder, PvocError, StepOutcome, VocoderConfig,
};

pub const SR: u32 = 44100;

pub fn gen_sine<F>(freq_hz: f32, sr: u32, n: usize, amp_fn: F) -> Vec<f32>
where
    F: Fn(usize) -> f32,
{
    (0..n)
        .map(|i| {
            let phase = 2.0 * PI * freq_hz * i as f32 / sr as f32;
            amp_fn(i) * phase.sin()
        })
        .collect()
}

pub fn gen_two_tone(
    freq_a: f32,
    amp_a: f32,
    freq_b: f32,
    amp_b: f32,
    sr: u32,
    n: usize,
) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let t = i as f32 / sr as f32;
            amp_a * (2.0 * PI * freq_a * t).sin() + amp_b * (2.0 * PI * freq_b * t).sin()
        })
        .collect()
}

pub fn windowed_rms(signal: &[f32], start: usize, len: usize) -> f64 {
    if signal.is_empty() || len == 0 {
        return 0.0;
    }
    let start = start.min(signal.len());
    let end = (start + len).min(signal.len());
    if end <= start {
        return 0.0;
    }
    let sum_sq: f64 = signal[start..end]
        .iter()
        .map(|&s| {
            let v = s as f64;
            v * v
        })
        .sum();
    (sum_sq / (end - start) as f64).sqrt()
}

pub fn count_positive_zero_crossings(signal: &[f32], start: usize, end: usize) -> usize {
    if signal.len() < 2 {
        return 0;
    }
    let start = start.min(signal.len() - 1);
    let end = end.min(signal.len());
    if end <= start + 1 {
        return 0;
    }
    let mut count = 0usize;
    for i in start..(end - 1) {
        if signal[i] <= 0.0 && signal[i + 1] > 0.0 {
            count += 1;
        }
    }
    count
}

pub fn estimate_freq_zero_crossings(signal: &[f32], sr: u32, start: usize, end: usize) -> f64 {
    if end <= start + 1 {
        return 0.0;
    }
    let crossings = count_positive_zero_crossings(signal, start, end) as f64;
    let duration_secs = (end - start) as f64 / sr as f64;
    if duration_secs <= 0.0 {
        0.0
    } else {
        crossings / duration_secs
    }
}

pub fn energy_at_freq(signal: &[f32], sr: u32, freq_hz: f32) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    let mut re = 0.0f64;
    let mut im = 0.0f64;
    for (i, &s) in signal.iter().enumerate() {
        let angle = 2.0 * std::f64::consts::PI * freq_hz as f64 * i as f64 / sr as f64;
        let sv = s as f64;
        re += sv * angle.cos();
        im -= sv * angle.sin();
    }
    (re * re + im * im).sqrt() / signal.len() as f64
}

pub fn assert_finite(samples: &[f32], label: &str) {
    for (i, &s) in samples.iter().enumerate() {
        assert!(s.is_finite(), "{label}: sample {i} is not finite ({s})");
    }
}

/// Runs a mono signal through a fresh session until the input runs out and
/// returns the left output channel.
pub fn run_mono(input: &[f32], config: VocoderConfig) -> Result<Vec<f32>, PvocError> {
    let mut source = MemorySource::mono(input.to_vec(), SR);
    let mut sink = MemorySink::new();
    let mut session = PhaseVocoder::new(config, Channels::Mono)?;
    while let StepOutcome::Produced(_) = session.step(&mut source, &mut sink)? {}
    Ok(sink.left)
}
