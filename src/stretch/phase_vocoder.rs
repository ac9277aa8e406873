//! Phase-vocoder session: the stateful step that turns two overlapping
//! input frames into one synthesis hop of output.
//!
//! Each step reads a frame `X_s` at the cursor and a frame `X_t` one
//! synthesis hop later. The phase advance between them is applied to the
//! previous output spectrum,
//!
//! ```text
//! Y = X_t · normalize(Y_prev / X_s)
//! ```
//!
//! so the output keeps the amplitudes of `X_t` while every partial's phase
//! continues smoothly from the last synthesized frame. Moving the cursor by
//! something other than the synthesis hop stretches time; resampling the
//! emitted hop shifts pitch.

use std::f32::consts::PI;
use tracing::{debug, trace};

use crate::config::VocoderConfig;
use crate::core::fft::PackedFft;
use crate::core::resample::StreamResampler;
use crate::core::spectrum::{
    div, from_polar, is_silent, loose_lock_smooth, mul, normalize, num_bins, to_polar,
};
use crate::core::types::{Channels, Sample};
use crate::core::window::{apply_precomputed_window, generate_window, overlap_add_scale};
use crate::error::{PvocError, Result};
use crate::io::sink::AudioSink;
use crate::io::source::AudioSource;
use crate::stretch::params::HopPlan;
use crate::stretch::strategy::Resynthesis;

const TWO_PI: f32 = 2.0 * PI;

/// Samples of lookahead the streaming resampler holds back.
const RESAMPLER_LOOKAHEAD: usize = 2;

/// Result of one [`PhaseVocoder::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// This many frames were written to the sink.
    Produced(usize),
    /// The source could not supply both frames; nothing changed.
    Exhausted,
}

/// Per-channel spectral memory and output accumulator.
struct ChannelState {
    /// Previous synthesis spectrum (packed), possibly loose-locked.
    y_prev: Vec<f32>,
    initialized: bool,
    /// Overlap-add accumulator of length `H + N`.
    ola: Vec<f32>,
    /// Previous analysis phase (phase-accumulation strategy).
    prev_phase: Vec<f32>,
    /// Running synthesis phase (phase-accumulation strategy).
    phase_accum: Vec<f32>,
    /// Input offset of the frame `prev_phase` was measured on. Silent steps
    /// leave it behind, so the next measured hop spans all of them.
    phase_frame: Option<i64>,
    resampler: StreamResampler,
    /// Emitted samples of the current step.
    out: Vec<Sample>,
}

impl ChannelState {
    fn new(fft_size: usize, hop: usize, ratio: f64) -> Self {
        let bins = num_bins(fft_size);
        Self {
            y_prev: vec![0.0; fft_size],
            initialized: false,
            ola: vec![0.0; hop + fft_size],
            prev_phase: vec![0.0; bins],
            phase_accum: vec![0.0; bins],
            phase_frame: None,
            resampler: StreamResampler::new(ratio),
            out: Vec::with_capacity(hop * 2),
        }
    }

    fn reset(&mut self) {
        self.y_prev.fill(0.0);
        self.initialized = false;
        self.ola.fill(0.0);
        self.prev_phase.fill(0.0);
        self.phase_accum.fill(0.0);
        self.phase_frame = None;
        self.resampler.reset();
        self.out.clear();
    }
}

/// Reusable buffers shared by all channels of a session.
struct Scratch {
    /// Input frames at the cursor, one per channel.
    frames_s: Vec<Vec<Sample>>,
    /// Input frames one synthesis hop after the cursor.
    frames_t: Vec<Vec<Sample>>,
    time: Vec<f32>,
    spec_s: Vec<f32>,
    spec_t: Vec<f32>,
    ratio: Vec<f32>,
    phasor: Vec<f32>,
    synth: Vec<f32>,
    amp: Vec<f32>,
    phase: Vec<f32>,
}

impl Scratch {
    fn new(fft_size: usize, channels: usize) -> Self {
        let bins = num_bins(fft_size);
        Self {
            frames_s: vec![vec![0.0; fft_size]; channels],
            frames_t: vec![vec![0.0; fft_size]; channels],
            time: vec![0.0; fft_size],
            spec_s: vec![0.0; fft_size],
            spec_t: vec![0.0; fft_size],
            ratio: vec![0.0; fft_size],
            phasor: vec![0.0; fft_size],
            synth: vec![0.0; fft_size],
            amp: vec![0.0; bins],
            phase: vec![0.0; bins],
        }
    }
}

/// A phase-vocoder session over one mono or stereo stream.
///
/// The session owns all spectral memory and scratch space. Sources and
/// sinks are borrowed per step, so one session can be driven by a batch
/// loop, a pull-based player or a background feeder.
pub struct PhaseVocoder {
    config: VocoderConfig,
    channels: Channels,
    fft: PackedFft,
    plan: HopPlan,
    window: Vec<f32>,
    /// Divisor applied with the synthesis window.
    synth_divisor: f32,
    /// Expected phase advance per sample for each bin.
    bin_omega: Vec<f32>,
    cursor: i64,
    state: Vec<ChannelState>,
    scratch: Scratch,
}

impl PhaseVocoder {
    /// Creates a session for `channels` of audio.
    ///
    /// # Errors
    /// Returns [`PvocError::InvalidConfig`] when the configuration does not
    /// validate.
    pub fn new(config: VocoderConfig, channels: Channels) -> Result<Self> {
        config.validate()?;
        let fft_size = config.fft_size;
        let hop = config.effective_hop();
        let plan = HopPlan::new(hop, config.rate, config.pitch)?;
        let fft = PackedFft::new(fft_size)?;
        let window = generate_window(config.window, fft_size);
        let ola_scale = overlap_add_scale(fft_size, hop, config.window);
        let synth_divisor = match config.strategy {
            Resynthesis::Passthrough => ola_scale,
            _ => fft_size as f64 * ola_scale,
        } as f32;
        let bin_omega = (0..num_bins(fft_size))
            .map(|k| TWO_PI * k as f32 / fft_size as f32)
            .collect();
        let state = (0..channels.count())
            .map(|_| ChannelState::new(fft_size, hop, plan.resample_ratio()))
            .collect();

        debug!(
            fft_size,
            hop,
            window = ?config.window,
            strategy = %config.strategy,
            phase_lock = config.phase_lock,
            channels = channels.count(),
            resample_hop = plan.resample,
            analysis_hop = plan.analysis,
            "created phase vocoder session"
        );

        Ok(Self {
            config,
            channels,
            fft,
            plan,
            window,
            synth_divisor,
            bin_omega,
            cursor: 0,
            state,
            scratch: Scratch::new(fft_size, channels.count()),
        })
    }

    /// FFT length `N`.
    #[inline]
    pub fn fft_size(&self) -> usize {
        self.fft.len()
    }

    #[inline]
    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// Current hop sizes.
    #[inline]
    pub fn hops(&self) -> HopPlan {
        self.plan
    }

    /// The configuration the session was built from, with the current rate
    /// and pitch.
    pub fn config(&self) -> &VocoderConfig {
        &self.config
    }

    /// Input frame offset of the next step's first frame.
    #[inline]
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Moves the input cursor. Spectral memory is kept, so a seek without
    /// [`reset`](Self::reset) continues the current phase trajectory.
    pub fn seek(&mut self, frame: i64) {
        trace!(from = self.cursor, to = frame, "seek");
        self.cursor = frame;
        for ch in &mut self.state {
            ch.phase_frame = None;
        }
    }

    /// Clears spectral memory, overlap-add buffers and resampler history.
    /// The cursor and rate/pitch are kept.
    pub fn reset(&mut self) {
        self.state.iter_mut().for_each(ChannelState::reset);
    }

    /// Output frames at the start of a session before the overlap-add has
    /// reached full density.
    pub fn latency_frames(&self) -> usize {
        let ramp = (self.fft_size() as f64 * self.plan.resample_ratio()).ceil() as usize;
        if self.plan.is_unity_pitch() {
            ramp
        } else {
            ramp + RESAMPLER_LOOKAHEAD
        }
    }

    /// Changes rate and pitch. Only hop sizes and the resampling ratio
    /// change; spectral memory carries over.
    pub fn set_rate_pitch(&mut self, rate: f64, pitch: f64) -> Result<()> {
        let plan = HopPlan::new(self.plan.synthesis, rate, pitch)?;
        let was_unity = self.plan.is_unity_pitch();
        for ch in &mut self.state {
            if was_unity && !plan.is_unity_pitch() {
                ch.resampler.reset();
            }
            ch.resampler.set_ratio(plan.resample_ratio());
        }
        debug!(
            rate,
            pitch,
            resample_hop = plan.resample,
            analysis_hop = plan.analysis,
            "rate/pitch changed"
        );
        self.plan = plan;
        self.config.rate = rate;
        self.config.pitch = pitch;
        Ok(())
    }

    /// Synthesizes one hop of output and writes it to `sink`.
    ///
    /// Returns [`StepOutcome::Exhausted`] without touching any state when
    /// `source` cannot supply both input frames in full.
    pub fn step<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<StepOutcome>
    where
        S: AudioSource + ?Sized,
        K: AudioSink + ?Sized,
    {
        if source.channels() != self.channels {
            return Err(PvocError::InvalidParameter(format!(
                "source has {} channels, session expects {}",
                source.channels().count(),
                self.channels.count()
            )));
        }

        let n = self.fft_size();
        let h = self.plan.synthesis as i64;
        let Some(target) = self.cursor.checked_add(h) else {
            trace!(cursor = self.cursor, "cursor at the end of the offset range");
            return Ok(StepOutcome::Exhausted);
        };
        let got_s = source.read_at(self.cursor, &mut self.scratch.frames_s)?;
        let got_t = source.read_at(target, &mut self.scratch.frames_t)?;
        if got_s < n || got_t < n {
            trace!(cursor = self.cursor, "source exhausted");
            return Ok(StepOutcome::Exhausted);
        }

        for c in 0..self.channels.count() {
            let silent =
                is_silent(&self.scratch.frames_s[c]) || is_silent(&self.scratch.frames_t[c]);
            if silent {
                trace!(channel = c, cursor = self.cursor, "silent frame, synthesis skipped");
            } else {
                self.synthesize(c)?;
            }
            self.emit(c);
        }

        let produced = self.write_out(sink)?;
        trace!(cursor = self.cursor, produced, "step");
        self.cursor = self.cursor.saturating_add(self.plan.analysis);
        Ok(StepOutcome::Produced(produced))
    }

    /// Windows `frame` and transforms it into `out` with the window centre
    /// rotated to index 0, so the bins of a stationary partial share one
    /// phase.
    fn analyze(
        fft: &mut PackedFft,
        window: &[f32],
        time: &mut [f32],
        frame: &[f32],
        out: &mut [f32],
    ) -> Result<()> {
        time.copy_from_slice(frame);
        apply_precomputed_window(time, window, 1.0);
        time.rotate_left(time.len() / 2);
        fft.forward(time, out)
    }

    /// Inverse of [`analyze`](Self::analyze) minus the window.
    fn resynthesize(fft: &mut PackedFft, spectrum: &[f32], out: &mut [f32]) -> Result<()> {
        fft.inverse(spectrum, out)?;
        out.rotate_right(out.len() / 2);
        Ok(())
    }

    /// Runs the configured strategy for channel `c` and overlap-adds the
    /// result at offset `H`.
    fn synthesize(&mut self, c: usize) -> Result<()> {
        let sc = &mut self.scratch;
        match self.config.strategy {
            Resynthesis::Complex => {
                Self::analyze(&mut self.fft, &self.window, &mut sc.time, &sc.frames_s[c], &mut sc.spec_s)?;
                Self::analyze(&mut self.fft, &self.window, &mut sc.time, &sc.frames_t[c], &mut sc.spec_t)?;
                let ch = &mut self.state[c];
                if !ch.initialized {
                    if self.config.phase_lock {
                        loose_lock_smooth(&sc.spec_s, &mut ch.y_prev);
                    } else {
                        ch.y_prev.copy_from_slice(&sc.spec_s);
                    }
                    ch.initialized = true;
                }
                div(&ch.y_prev, &sc.spec_s, &mut sc.ratio);
                normalize(&sc.ratio, &mut sc.phasor);
                mul(&sc.spec_t, &sc.phasor, &mut sc.spec_s);
                // spec_s now holds Y_new.
                if self.config.phase_lock {
                    loose_lock_smooth(&sc.spec_s, &mut ch.y_prev);
                } else {
                    ch.y_prev.copy_from_slice(&sc.spec_s);
                }
                Self::resynthesize(&mut self.fft, &sc.spec_s, &mut sc.synth)?;
            }
            Resynthesis::PhaseAccumulation => {
                Self::analyze(&mut self.fft, &self.window, &mut sc.time, &sc.frames_t[c], &mut sc.spec_t)?;
                to_polar(&sc.spec_t, &mut sc.amp, &mut sc.phase);
                let ch = &mut self.state[c];
                // Only reached after step() checked `cursor + H`.
                let frame = self.cursor + self.plan.synthesis as i64;
                let hop_analysis = ch.phase_frame.map_or(0, |p| frame - p);
                ch.phase_frame = Some(frame);
                let hop_synthesis = self.plan.synthesis as f32;
                for k in 0..sc.phase.len() {
                    let phase = sc.phase[k];
                    if !ch.initialized {
                        ch.phase_accum[k] = phase;
                    } else {
                        let omega = self.bin_omega[k];
                        let freq = if hop_analysis != 0 {
                            let ha = hop_analysis as f32;
                            let deviation = wrap_phase(phase - ch.prev_phase[k] - omega * ha);
                            omega + deviation / ha
                        } else {
                            omega
                        };
                        ch.phase_accum[k] = wrap_phase(ch.phase_accum[k] + freq * hop_synthesis);
                    }
                    ch.prev_phase[k] = phase;
                }
                ch.initialized = true;

                if self.config.phase_lock {
                    sc.ratio[..sc.amp.len()].fill(1.0);
                    from_polar(&sc.ratio[..sc.amp.len()], &ch.phase_accum, false, &mut sc.phasor);
                    loose_lock_smooth(&sc.phasor, &mut sc.spec_s);
                    to_polar(&sc.spec_s, &mut sc.ratio[..sc.amp.len()], &mut ch.phase_accum);
                }
                from_polar(&sc.amp, &ch.phase_accum, false, &mut sc.spec_s);
                Self::resynthesize(&mut self.fft, &sc.spec_s, &mut sc.synth)?;
            }
            Resynthesis::Passthrough => {
                sc.synth.copy_from_slice(&sc.frames_t[c]);
                apply_precomputed_window(&mut sc.synth, &self.window, 1.0);
                self.state[c].initialized = true;
            }
        }

        apply_precomputed_window(&mut sc.synth, &self.window, self.synth_divisor);
        let h = self.plan.synthesis;
        for (acc, &s) in self.state[c].ola[h..].iter_mut().zip(&sc.synth) {
            *acc += s;
        }
        Ok(())
    }

    /// Moves the first `H` samples of channel `c`'s accumulator to its
    /// output buffer (resampled if pitch is shifted) and shifts the rest.
    fn emit(&mut self, c: usize) {
        let h = self.plan.synthesis;
        let ch = &mut self.state[c];
        ch.out.clear();
        if self.plan.is_unity_pitch() {
            ch.out.extend_from_slice(&ch.ola[..h]);
        } else {
            ch.resampler.process(&ch.ola[..h], &mut ch.out);
        }
        ch.ola.copy_within(h.., 0);
        let len = ch.ola.len();
        ch.ola[len - h..].fill(0.0);
    }

    fn write_out<K: AudioSink + ?Sized>(&mut self, sink: &mut K) -> Result<usize> {
        match self.state.as_slice() {
            [mono] => sink.write(&mono.out, &mono.out),
            [left, right] => {
                let n = left.out.len().min(right.out.len());
                sink.write(&left.out[..n], &right.out[..n])
            }
            _ => Err(PvocError::UnsupportedChannels(self.state.len() as u16)),
        }
    }
}

/// Wraps a phase value to [-PI, PI].
#[inline]
fn wrap_phase(phase: f32) -> f32 {
    let p = phase + PI;
    p - (p / TWO_PI).floor() * TWO_PI - PI
}
