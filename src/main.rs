// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use gridslice::config::EngineConfig;
use gridslice::engine::Engine;
use gridslice::events::GridEvent;
use gridslice::sample::SampleBuffer;
use gridslice::script::PressScript;
use gridslice::signal::{peak, rms, sine, to_dbfs};
use gridslice::util::{duration_seconds_millis, duration_to_frames, frames_to_duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// The name the test tone is pooled under.
const TONE: &str = "tone";

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A grid-triggered sample slicer and looper."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validates an engine config and summarizes every strip.
    Check {
        /// The path to the engine config.
        config_path: String,
    },
    /// Renders a test tone through the engine offline and reports the output levels.
    Render {
        /// The path to the engine config.
        config_path: String,
        /// Scripted presses in the form <ROW>:<COLUMN>@<START>[-<END>],...
        /// For example, 0:0@0ms-1s,0:4@500ms.
        presses: Vec<String>,
        /// How long to render.
        #[arg(short, long, default_value = "2s")]
        duration: String,
        /// Frames per block.
        #[arg(short, long, default_value_t = 512)]
        block_size: usize,
        /// Output channels.
        #[arg(short, long, default_value_t = 2)]
        channels: u16,
        /// Frequency of the test tone in Hz.
        #[arg(short, long, default_value_t = 220.0)]
        frequency: f32,
        /// Length of the test tone.
        #[arg(short = 'l', long, default_value = "2s")]
        sample_length: String,
    },
    /// Prints the parameters of one strip as JSON.
    Params {
        /// The path to the engine config.
        config_path: String,
        /// The strip row.
        row: usize,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config_path } => {
            let config = EngineConfig::deserialize(&PathBuf::from(&config_path))?;
            let engine = Engine::from_config(&config)?;

            println!("Engine ({}):", config_path);
            println!("- sample rate: {}Hz", engine.host_sample_rate());
            println!("- tempo: {}bpm", engine.bpm());
            println!("- grid: {} rows of {}", engine.rows(), engine.grid_width());
            println!(
                "- ramp length: {}",
                duration_seconds_millis(config.ramp_length()?)
            );

            println!("\nStrips:");
            for snapshot in engine.snapshots() {
                println!(
                    "- row {}: {} chunks, {:?}, stop {:?}, volume {}{}{}{}",
                    snapshot.row,
                    snapshot.num_chunks,
                    snapshot.play_mode,
                    snapshot.stop_mode,
                    snapshot.volume,
                    if snapshot.latched { ", latched" } else { "" },
                    if snapshot.reversed { ", reversed" } else { "" },
                    if snapshot.speed_locked {
                        ", speed locked"
                    } else {
                        ""
                    },
                );
            }
        }
        Commands::Render {
            config_path,
            presses,
            duration,
            block_size,
            channels,
            frequency,
            sample_length,
        } => {
            let config = EngineConfig::deserialize(&PathBuf::from(&config_path))?;
            let engine = Engine::from_config(&config)?;
            let script = PressScript::parse(&presses)?;
            let duration = parse_duration(duration)?;
            let sample_length = parse_duration(sample_length)?;
            if block_size == 0 {
                return Err("block size must be at least 1".into());
            }

            let rate = engine.host_sample_rate();
            let tone = sine(
                frequency,
                0.5,
                2,
                rate,
                duration_to_frames(sample_length, rate),
            );
            engine.add_sample(TONE, SampleBuffer::from_interleaved(tone, 2, rate));
            for row in 0..engine.rows() {
                engine.assign_sample(row, Some(TONE));
            }

            let events = engine.subscribe();
            let channels = channels.max(1) as usize;
            let total = duration_to_frames(duration, rate);
            let timeline = script.timeline(rate);
            let mut output = vec![0.0; total * channels];
            let mut next = 0;
            let mut frame = 0;

            info!(
                frames = total,
                block_size,
                presses = script.presses().len(),
                "Rendering"
            );
            while frame < total {
                let frames = block_size.min(total - frame);
                let mut block_events: Vec<GridEvent> = Vec::new();
                while let Some((at, event)) = timeline.get(next).copied() {
                    if at >= frame + frames {
                        break;
                    }
                    block_events.push(GridEvent {
                        offset: at.saturating_sub(frame),
                        ..event
                    });
                    next += 1;
                }
                engine.process_block(&mut output, channels, frame, frames, &block_events);
                frame += frames;
            }

            let level = peak(&output);
            let loudness = rms(&output);
            println!(
                "Rendered {}:",
                duration_seconds_millis(frames_to_duration(total, rate))
            );
            println!("- peak: {:.4} ({:.1} dBFS)", level, to_dbfs(level));
            println!("- rms: {:.4} ({:.1} dBFS)", loudness, to_dbfs(loudness));

            println!("\nStrips:");
            for snapshot in engine.snapshots() {
                if snapshot.is_playing {
                    println!(
                        "- row {}: playing at {:.1}%",
                        snapshot.row,
                        snapshot.playback_percentage * 100.0
                    );
                } else {
                    println!("- row {}: stopped", snapshot.row);
                }
            }

            println!("\nEvents:");
            for event in events.try_iter() {
                println!("- {}", serde_json::to_string(&event)?);
            }
        }
        Commands::Params { config_path, row } => {
            let config = EngineConfig::deserialize(&PathBuf::from(&config_path))?;
            let engine = Engine::from_config(&config)?;
            let Some(snapshot) = engine.snapshot(row) else {
                return Err(
                    format!("row {} does not exist, there are {}", row, engine.rows()).into(),
                );
            };
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    Ok(())
}

fn parse_duration(value: String) -> Result<Duration, Box<dyn Error>> {
    DurationString::from_string(value.clone())
        .map(Into::into)
        .map_err(|e| format!("invalid duration {value}: {e}").into())
}
