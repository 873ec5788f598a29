mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cli::{Cli, Command};
use echomatch::audio::{self, decode::decode_clip};
use echomatch::config::{self, Config};
use echomatch::orchestrator::Orchestrator;
use echomatch::spectral::{self, compare::ComparisonOutcome, SequenceBuilder};
use echomatch::stream::{self, StreamAnalyzer, StreamEvent};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    let cfg = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };
    merge_config(&mut cli.command, &cfg);

    match cli.command {
        Command::Compare {
            first,
            second,
            sample_size,
            time_step,
            workers,
            trim,
            json,
        } => {
            let builder = SequenceBuilder::new(sample_size, workers)?;
            let pb = progress_bar()?;
            let sink = {
                let pb = pb.clone();
                Arc::new(move |fraction: f32, message: &str| {
                    pb.set_position((fraction.clamp(0.0, 1.0) * 1000.0) as u64);
                    pb.set_message(message.to_string());
                })
            };
            let orch = Orchestrator::with_progress(builder, time_step, sink);

            for (number, path) in [(1u8, &first), (2u8, &second)] {
                let clip = decode_clip(path)?;
                if trim {
                    orch.record_clip(number, &clip, cfg.trim.threshold, None)
                        .with_context(|| format!("Clip {} is unusable: {}", number, path.display()))?;
                } else {
                    orch.set_clip(number, clip)?;
                }
            }

            log::info!("Comparing {} with {}", first.display(), second.display());
            let report = orch.compare();
            pb.finish_and_clear();
            let report = report?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.outcome == ComparisonOutcome::NoValidComparisons {
                println!("No valid comparisons: both clips are too quiet. Similarity: 0.00%");
            } else {
                println!(
                    "Similarity: {:.2}% ({} spectra compared, {} skipped)",
                    report.score, report.compared_pairs, report.inconclusive_pairs
                );
            }
        }

        Command::Trim {
            input,
            clip,
            threshold,
            output_dir,
        } => {
            let raw = decode_clip(&input)?;
            let trimmed = raw
                .trimmed(threshold)
                .with_context(|| format!("Recorded audio is completely silent: {}", input.display()))?;
            log::info!(
                "Trimmed {} samples to {}",
                raw.samples.len(),
                trimmed.samples.len()
            );

            let dir = output_dir.unwrap_or_else(|| cfg.output.directory.clone());
            let path = audio::wav::save_recording(&trimmed, &dir, clip)
                .with_context(|| format!("Error saving audio file under {}", dir.display()))?;
            println!("Audio saved: {}", path.display());
        }

        Command::Pitch { input } => {
            let clip = decode_clip(&input)?;
            let mono = clip.mono();
            match spectral::fft::estimate_frequency(&mono, clip.sample_rate)? {
                Some(freq) => println!("Detected frequency: {:.2} Hz", freq),
                None => println!("No speech detected"),
            }
        }

        Command::Listen {
            input,
            block_size,
            interval_ms,
        } => {
            let stream_cfg = config::StreamConfig {
                block_size,
                ..cfg.stream.clone()
            };
            listen(&input, &stream_cfg, interval_ms)?;
        }
    }

    Ok(())
}

/// Config values apply only where the CLI was left at its default.
fn merge_config(command: &mut Command, cfg: &Config) {
    match command {
        Command::Compare {
            sample_size,
            time_step,
            workers,
            ..
        } => {
            if *sample_size == 1024 { *sample_size = cfg.analysis.sample_size; }
            if *time_step == 0.01 { *time_step = cfg.analysis.time_step; }
            if *workers == 0 { *workers = cfg.analysis.workers; }
        }
        Command::Trim { threshold, .. } => {
            if *threshold == 0.01 { *threshold = cfg.trim.threshold; }
        }
        Command::Listen {
            block_size,
            interval_ms,
            ..
        } => {
            if *block_size == 4096 { *block_size = cfg.stream.block_size; }
            if *interval_ms == 100 {
                *interval_ms = (cfg.stream.update_interval * 1000.0) as u64;
            }
        }
        Command::Pitch { .. } => {}
    }
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(1000);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {msg}")?
            .progress_chars("=>-"),
    );
    Ok(pb)
}

fn listen(input: &Path, stream_cfg: &config::StreamConfig, interval_ms: u64) -> Result<()> {
    let clip = decode_clip(input)?;
    let mut analyzer = StreamAnalyzer::new(clip.sample_rate, stream_cfg)?;
    let mono = clip.mono();
    let block_size = stream_cfg.block_size;

    let (tx, rx) = crossbeam_channel::bounded::<Vec<f32>>(8);
    let producer = std::thread::spawn(move || {
        for block in mono.chunks(block_size) {
            if tx.send(block.to_vec()).is_err() {
                break;
            }
            if interval_ms > 0 {
                std::thread::sleep(Duration::from_millis(interval_ms));
            }
        }
    });

    log::info!(
        "Listening to {} in blocks of {} samples",
        input.display(),
        block_size
    );
    stream::run(rx, &mut analyzer, |event| match event {
        StreamEvent::Dominant(r) => log::info!(
            "Dominant frequency: {:.2} Hz (Amplitude: {:.4}, total frequency: {:.2})",
            r.frequency,
            r.amplitude,
            r.energy
        ),
        StreamEvent::Pitch(p) => log::info!("Detected Frequency: {:.2}", p),
        StreamEvent::Frequencies(list) => log::debug!(
            "Detected Frequencies (Hz): {}",
            list.iter().map(|f| format!("{:.2}", f)).collect::<Vec<_>>().join(", ")
        ),
        StreamEvent::Utterance(u) => match u.frequency {
            Some(f) => println!("Utterance of {:.2}s, frequency: {:.2} Hz", u.duration, f),
            None => println!("Utterance of {:.2}s, no frequency", u.duration),
        },
    })?;

    producer
        .join()
        .map_err(|_| anyhow::anyhow!("stream producer panicked"))?;
    Ok(())
}
