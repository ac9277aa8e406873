use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

use pvoc::io::{AudioSource, WavEncoding, WavSink, WavSource};
use pvoc::stretch::params::{legacy_rate_for_pitch, pitch_factor};
use pvoc::{PvocError, Resynthesis, VocoderConfig, WindowType};

/// Phase-vocoder time stretching and pitch shifting of WAV files.
#[derive(Parser, Debug)]
#[command(name = "pvoc-cli", version, about)]
struct Args {
    /// Input WAV file (mono or stereo).
    input: PathBuf,

    /// Output WAV file.
    output: PathBuf,

    /// FFT length [default: 2048]
    #[arg(short = 'l', long)]
    len: Option<usize>,

    /// Synthesis hop [default: len / 4]
    #[arg(long)]
    hop: Option<usize>,

    /// Window: 0 none, 1 Parzen, 2 Welch, 3 Hanning, 4 Hamming, 5 Blackman,
    /// 6 steeper [default: 3]
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=6))]
    window: Option<u8>,

    /// Loose phase locking.
    #[arg(long)]
    phase_lock: bool,

    /// Playback rate: 2 is twice as fast, negative plays backwards
    /// [default: 1]
    #[arg(short, long, allow_negative_numbers = true, conflicts_with = "legacy_pitch")]
    rate: Option<f64>,

    /// Pitch shift in semitones [default: 0]
    #[arg(short, long, allow_negative_numbers = true)]
    pitch: Option<f64>,

    /// Shift pitch by stretching and writing the result at a scaled sample
    /// rate instead of resampling.
    #[arg(long, allow_negative_numbers = true, value_name = "SEMITONES")]
    legacy_pitch: Option<f64>,

    /// Resynthesis strategy: complex, phase-accumulation or passthrough.
    #[arg(long)]
    strategy: Option<Resynthesis>,

    /// Write 32-bit float samples instead of 16-bit PCM.
    #[arg(long)]
    float: bool,

    /// JSON session configuration; flags override its values.
    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,

    /// Log session details.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn session_config(&self) -> pvoc::Result<VocoderConfig> {
        let mut config = match &self.config {
            Some(path) => VocoderConfig::load(path)?,
            None => VocoderConfig::default(),
        };
        if let Some(len) = self.len {
            config.fft_size = len;
        }
        if let Some(hop) = self.hop {
            config.hop = Some(hop);
        }
        if let Some(w) = self.window {
            config.window = WindowType::from_index(w)?;
        }
        if self.phase_lock {
            config.phase_lock = true;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(rate) = self.rate {
            config.rate = rate;
        }
        if let Some(pitch) = self.pitch {
            config.pitch = pitch;
        }
        if let Some(semitones) = self.legacy_pitch {
            config.rate = legacy_rate_for_pitch(semitones);
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(args: &Args) -> pvoc::Result<()> {
    let config = args.session_config()?;
    let mut source = WavSource::open(&args.input)?;

    eprintln!(
        "Input: {} frames, {} Hz, {:?}, {:.2}s",
        source.num_frames(),
        source.sample_rate(),
        source.channels(),
        source.num_frames() as f64 / f64::from(source.sample_rate().max(1))
    );

    let output_rate = match args.legacy_pitch {
        Some(semitones) => (f64::from(source.sample_rate()) * pitch_factor(semitones)).round() as u32,
        None => source.sample_rate(),
    };
    if output_rate == 0 {
        return Err(PvocError::InvalidParameter(
            "legacy pitch shift gives an output sample rate of 0".into(),
        ));
    }

    if args.verbose {
        eprintln!("Parameters:");
        eprintln!("  FFT length: {}", config.fft_size);
        eprintln!("  Hop: {}", config.effective_hop());
        eprintln!("  Window: {:?}", config.window);
        eprintln!("  Phase lock: {}", config.phase_lock);
        eprintln!("  Strategy: {}", config.strategy);
        eprintln!("  Rate: {:.4}", config.rate);
        eprintln!("  Pitch: {:+.2} semitones", config.pitch);
        if output_rate != source.sample_rate() {
            eprintln!("  Output sample rate: {} Hz", output_rate);
        }
    }

    let encoding = if args.float {
        WavEncoding::Float32
    } else {
        WavEncoding::Pcm16
    };
    let mut sink = WavSink::create(&args.output, output_rate, source.channels(), encoding)?;

    let start = std::time::Instant::now();
    let stats = pvoc::convert(&config, &mut source, &mut sink)?;
    let elapsed = start.elapsed();

    eprintln!(
        "Output: {} frames, {:.2}s (ratio: {:.4})",
        stats.frames_written,
        stats.frames_written as f64 / f64::from(output_rate),
        stats.frames_written as f64 / source.num_frames().max(1) as f64
    );

    if args.verbose {
        let input_secs = source.num_frames() as f64 / f64::from(source.sample_rate().max(1));
        let processing_secs = elapsed.as_secs_f64();
        let realtime_factor = if processing_secs > 0.0 {
            input_secs / processing_secs
        } else {
            f64::INFINITY
        };
        eprintln!(
            "Processing time: {:.3}s ({:.1}x realtime, {} steps)",
            processing_secs, realtime_factor, stats.steps
        );
    }

    eprintln!("Written to {}", args.output.display());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
