//! Renders a short phrase to `out/render_wav.wav`.
//!
//! Usage: `render_wav [bank.syx] [voice name or number]`

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use simple_logger::SimpleLogger;

use dx_fm_synth::fm::sysex::Bank;
use dx_fm_synth::{Config, Synth};

const BLOCK_SIZE: usize = dx_fm_synth::config::BLOCK_SIZE;

// (note, start beat, length in beats)
const PHRASE: [(u8, u32, u32); 6] = [
    (48, 0, 4),
    (60, 0, 2),
    (64, 1, 2),
    (67, 2, 2),
    (72, 3, 3),
    (55, 4, 2),
];

const BEAT_SECONDS: f32 = 0.4;
const TAIL_SECONDS: f32 = 2.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init()?;

    let config = Config::default();
    let mut synth = Synth::new(config)?;

    let mut args = std::env::args().skip(1);
    if let Some(path) = args.next() {
        let bank = Bank::from_syx(&std::fs::read(path)?)?;
        let selection = args.next().unwrap_or_else(|| "0".into());

        let patch = match selection.parse::<usize>() {
            Ok(index) => bank.voice(index),
            Err(_) => bank.find(&selection),
        }
        .ok_or_else(|| format!("no voice '{selection}' in bank"))?;

        synth.set_patch(patch.clone())?;
    }

    let controller = synth.controller();
    let samples_per_beat = (BEAT_SECONDS * config.sample_rate as f32) as usize;
    let last_beat = PHRASE.iter().map(|(_, start, len)| start + len).max().unwrap_or(0);
    let total = last_beat as usize * samples_per_beat
        + (TAIL_SECONDS * config.sample_rate as f32) as usize;

    let mut block = vec![0.0; BLOCK_SIZE * config.output_channels];
    let mut samples = Vec::with_capacity(total * config.output_channels);

    for position in (0..total).step_by(BLOCK_SIZE) {
        for &(note, start, length) in &PHRASE {
            let on = start as usize * samples_per_beat;
            let off = (start + length) as usize * samples_per_beat;
            if (position..position + BLOCK_SIZE).contains(&on) {
                controller.assign_key(note, 100)?;
            }
            if (position..position + BLOCK_SIZE).contains(&off) {
                controller.release_key(note, 0)?;
            }
        }

        synth.render_f32(&mut block);
        samples.extend_from_slice(&block);

        while controller.poll_rejection().is_some() {}
    }

    let path = Path::new("out/render_wav.wav");
    std::fs::create_dir_all("out")?;

    let spec = WavSpec {
        channels: config.output_channels as u16,
        sample_rate: config.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    log::info!("Wrote {}", path.display());

    Ok(())
}
