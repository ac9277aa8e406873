//! Player and feeder produce exactly what a batch run produces, and device
//! sinks see whole blocks.

mod common;

use common::*;
use pvoc::io::{DeviceSink, PcmDevice};
use pvoc::stream::{spawn_feeder, FeederOptions};
use pvoc::{
    AudioSink, Channels, MemorySink, MemorySource, PhaseVocoder, Player, StepOutcome,
    VocoderConfig,
};
use std::thread;
use std::time::Duration;

const N: usize = 1024;

// ── Helpers ──────────────────────────────────────────────────────

fn stereo_source(len: usize) -> MemorySource {
    let left = gen_sine(440.0, SR, len, |i| 0.3 + 0.2 * (i as f32 / len as f32));
    let right = gen_two_tone(220.0, 0.2, 990.0, 0.2, SR, len);
    MemorySource::stereo(&left, &right, SR).unwrap()
}

fn batch_reference(config: &VocoderConfig, len: usize) -> MemorySink {
    let mut source = stereo_source(len);
    let mut sink = MemorySink::new();
    let mut session = PhaseVocoder::new(config.clone(), Channels::Stereo).unwrap();
    while let StepOutcome::Produced(_) = session.step(&mut source, &mut sink).unwrap() {}
    sink
}

/// Records every block handed to it.
#[derive(Default)]
struct BlockRecorder {
    block_frames: usize,
    blocks: Vec<Vec<i16>>,
    drained: bool,
}

impl PcmDevice for BlockRecorder {
    fn block_frames(&self) -> usize {
        self.block_frames
    }

    fn write_block(&mut self, interleaved: &[i16]) -> pvoc::Result<()> {
        assert_eq!(interleaved.len(), self.block_frames * 2);
        self.blocks.push(interleaved.to_vec());
        Ok(())
    }

    fn drain(&mut self) -> pvoc::Result<()> {
        self.drained = true;
        Ok(())
    }
}

// ── Player ───────────────────────────────────────────────────────

#[test]
fn test_player_matches_batch() {
    let config = VocoderConfig::new(N).with_rate(0.8).with_pitch(3.0);
    let len = SR as usize;
    let reference = batch_reference(&config, len);

    let session = PhaseVocoder::new(config, Channels::Stereo).unwrap();
    let mut player = Player::new(session, stereo_source(len)).unwrap();
    let mut sink = MemorySink::new();
    loop {
        let report = player.play_millis(23, &mut sink).unwrap();
        if report.finished {
            break;
        }
    }
    assert_eq!(sink.left, reference.left);
    assert_eq!(sink.right, reference.right);
}

#[test]
fn test_player_into_device_blocks() {
    let len = SR as usize / 2;
    let session = PhaseVocoder::new(VocoderConfig::new(N), Channels::Stereo).unwrap();
    let mut player = Player::new(session, stereo_source(len)).unwrap();
    let device = BlockRecorder {
        block_frames: 300,
        ..Default::default()
    };
    let mut sink = DeviceSink::new(device).unwrap();

    let mut frames = 0;
    loop {
        let report = player.play_millis(50, &mut sink).unwrap();
        frames += report.frames;
        if report.finished {
            break;
        }
    }
    sink.finalize().unwrap();
    let device = sink.into_inner();

    assert!(device.drained);
    assert_eq!(device.blocks.len(), frames.div_ceil(300));
    let reference = batch_reference(&VocoderConfig::new(N), len);
    let played: Vec<i16> = device.blocks.concat();
    for (i, (&l, &r)) in reference.left.iter().zip(&reference.right).enumerate() {
        assert_eq!(played[2 * i], pvoc::io::sink::to_i16(l), "left frame {i}");
        assert_eq!(played[2 * i + 1], pvoc::io::sink::to_i16(r), "right frame {i}");
    }
    // The final block is padded with silence.
    assert!(played[2 * frames..].iter().all(|&s| s == 0));
}

#[test]
fn test_looping_player_keeps_sounding() {
    let len = SR as usize;
    let session = PhaseVocoder::new(VocoderConfig::new(N), Channels::Stereo).unwrap();
    let mut player = Player::new(session, stereo_source(len)).unwrap();
    player.set_loop(10_000..20_000).unwrap();
    player.seek(10_000);

    let mut sink = MemorySink::new();
    // Four seconds of output from a ten-thousand-frame region.
    for _ in 0..40 {
        let report = player.play_millis(100, &mut sink).unwrap();
        assert!(!report.finished);
        assert!((10_000..20_000).contains(&player.position()));
    }
    assert!(sink.num_frames() >= 4 * SR as usize);
    assert_finite(&sink.left, "looped left");
    let tail = sink.left.len() - 8192;
    assert!(windowed_rms(&sink.left, tail, 8192) > 0.05);
}

// ── Feeder ───────────────────────────────────────────────────────

#[test]
fn test_feeder_matches_batch() {
    let config = VocoderConfig::new(N).with_rate(1.3);
    let len = SR as usize;
    let reference = batch_reference(&config, len);

    let session = PhaseVocoder::new(config, Channels::Stereo).unwrap();
    let options = FeederOptions {
        chunk_frames: 512,
        ring_frames: 4096,
    };
    let (handle, mut feed) = spawn_feeder(session, stereo_source(len), options).unwrap();

    let mut collected = Vec::new();
    let mut block = vec![0.0f32; 2 * 441];
    while !feed.is_finished() {
        let n = feed.fill(&mut block);
        collected.extend_from_slice(&block[..n]);
        if n < block.len() {
            thread::sleep(Duration::from_millis(1));
        }
    }
    let stats = handle.join().unwrap();

    assert!(stats.exhausted);
    assert_eq!(stats.frames_pushed as usize, reference.num_frames());
    assert_eq!(collected.len(), 2 * reference.num_frames());
    for (i, frame) in collected.chunks_exact(2).enumerate() {
        assert_eq!(frame[0], reference.left[i], "left frame {i}");
        assert_eq!(frame[1], reference.right[i], "right frame {i}");
    }
}

#[test]
fn test_feeder_rejects_channel_mismatch() {
    let session = PhaseVocoder::new(VocoderConfig::new(N), Channels::Mono).unwrap();
    let result = spawn_feeder(session, stereo_source(8192), FeederOptions::default());
    assert!(result.is_err());
}
