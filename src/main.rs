// src/main.rs
//
// Offline audition of the core: drives the two cadences the way a host
// application would (frame() per 16 ms, render() per block) and writes
// the result to a WAV file.
//
// Usage: solfa-engine [pattern.json] [output.wav]
//
// Without a pattern file, a built-in C-major arpeggio at 100 BPM plays
// over a rain ambience bed.

use std::env;
use std::fs;
use std::process;

use solfa::{AmbienceKind, AudioCore, Pattern, PatternStep, ToneSpec};

const SAMPLE_RATE: f64 = 48_000.0;
const FRAME_SAMPLES: usize = 768; // 16 ms at 48 kHz
const RENDER_SECONDS: f64 = 6.0;

fn demo_pattern() -> Pattern {
    Pattern::new(
        100.0,
        vec![
            PatternStep::tone(ToneSpec::sine(261.63)),
            PatternStep::tone(ToneSpec::sine(329.63)),
            PatternStep::tone(ToneSpec::sine(392.0)),
            PatternStep::chord(vec![
                ToneSpec::sine(523.25),
                ToneSpec::triangle(261.63).with_detune(4.0),
            ]),
        ],
    )
}

fn load_pattern(path: &str) -> Pattern {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            process::exit(1);
        }
    };
    match serde_json::from_str(&content) {
        Ok(pattern) => pattern,
        Err(e) => {
            eprintln!("Error parsing {path}: {e}");
            process::exit(1);
        }
    }
}

fn main() {
    simple_logger::init_with_level(log::Level::Info).expect("logger init");

    let args: Vec<String> = env::args().collect();
    let pattern = match args.get(1) {
        Some(path) => load_pattern(path),
        None => demo_pattern(),
    };
    let output_path = args
        .get(2)
        .cloned()
        .unwrap_or_else(|| "solfa-demo.wav".to_string());

    let mut core = AudioCore::new(SAMPLE_RATE);
    core.on_visual_trigger(|step| log::info!("visual trigger: step {step}"));
    core.resume();

    if let Err(e) = core.set_ambience(AmbienceKind::Rain, 0.15) {
        log::warn!("ambience unavailable: {e}");
    }
    if let Err(e) = core.start_pattern(pattern) {
        eprintln!("Pattern rejected: {e}");
        process::exit(1);
    }

    log::info!("rendering {RENDER_SECONDS} s at {SAMPLE_RATE} Hz");

    let mut samples = Vec::with_capacity((RENDER_SECONDS * SAMPLE_RATE) as usize);
    let mut block = vec![0.0_f32; FRAME_SAMPLES];
    let stop_at = RENDER_SECONDS - 1.0;
    let mut stopped = false;

    while core.device().now() < RENDER_SECONDS {
        core.frame();
        core.render(&mut block);
        samples.extend_from_slice(&block);

        // Leave the last second for release tails.
        if !stopped && core.device().now() >= stop_at {
            core.stop_pattern();
            core.set_ambience(AmbienceKind::Off, 0.0).ok();
            stopped = true;
        }
    }
    core.shutdown();

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE as u32,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = match hound::WavWriter::create(&output_path, spec) {
        Ok(writer) => writer,
        Err(e) => {
            eprintln!("Error creating {output_path}: {e}");
            process::exit(1);
        }
    };
    for sample in &samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        if let Err(e) = writer.write_sample(value) {
            eprintln!("Error writing {output_path}: {e}");
            process::exit(1);
        }
    }
    if let Err(e) = writer.finalize() {
        eprintln!("Error finalizing {output_path}: {e}");
        process::exit(1);
    }

    log::info!("wrote {} samples to {output_path}", samples.len());
}
