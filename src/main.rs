//! midigrid - import a MIDI file onto the timeline grid.
//!
//! Prints a JSON summary of the resulting project and can simulate
//! capture-mode playback, logging every note transition.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- song.mid                      # Import and summarize
//! cargo run -- song.mid --play 10            # Also play 10 seconds
//! RUST_LOG=debug cargo run -- song.mid --play 4
//! ```

use midigrid::editor::{InputEvent, Key};
use midigrid::{EditorConfig, EditorContext, FrameInput, HoverTarget, Modifiers, Point, Project, TracingEngine};

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

/// Command-line options for the application.
struct CliOptions {
    /// MIDI file to import.
    input: PathBuf,
    /// Ticks added to every event time; overrides the config value.
    shift: Option<i64>,
    /// JSON editor configuration.
    config: Option<PathBuf>,
    /// Seconds of capture playback to simulate.
    play_seconds: Option<f64>,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `<file.mid>`: The file to import (required)
    /// - `--shift <ticks>` or `-s <ticks>`: Shift every event by a tick count
    /// - `--config <path>` or `-c <path>`: Load an editor configuration
    /// - `--play <seconds>` or `-p <seconds>`: Simulate capture playback
    /// - `--help` or `-h`: Print help and exit
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut input: Option<PathBuf> = None;
        let mut shift: Option<i64> = None;
        let mut config: Option<PathBuf> = None;
        let mut play_seconds: Option<f64> = None;
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--shift" | "-s" => {
                    let value = Self::value_of(&args, &mut i, "--shift")?;
                    shift = Some(
                        value
                            .parse()
                            .with_context(|| format!("Invalid tick shift: {}", value))?,
                    );
                }
                "--config" | "-c" => {
                    config = Some(PathBuf::from(Self::value_of(&args, &mut i, "--config")?));
                }
                "--play" | "-p" => {
                    let value = Self::value_of(&args, &mut i, "--play")?;
                    play_seconds = Some(
                        value
                            .parse()
                            .with_context(|| format!("Invalid playback length: {}", value))?,
                    );
                }
                "--help" | "-h" => {
                    eprintln!("midigrid - MIDI timeline importer");
                    eprintln!();
                    eprintln!(
                        "Usage: {} <FILE.mid> [OPTIONS]",
                        args.first().map(String::as_str).unwrap_or("midigrid")
                    );
                    eprintln!();
                    eprintln!("Options:");
                    eprintln!("  -s, --shift TICKS     Shift every event by TICKS (may be negative)");
                    eprintln!("  -c, --config PATH     Load editor settings from a JSON file");
                    eprintln!("  -p, --play SECONDS    Simulate capture playback for SECONDS");
                    eprintln!("  -h, --help            Print this help message");
                    eprintln!();
                    eprintln!("Set RUST_LOG=debug to see every note transition.");
                    std::process::exit(0);
                }
                other if other.starts_with('-') => {
                    eprintln!("Unknown option: {}", other);
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
                other => {
                    if input.is_some() {
                        eprintln!("Only one input file may be given (extra: {})", other);
                        std::process::exit(1);
                    }
                    input = Some(PathBuf::from(other));
                }
            }
            i += 1;
        }

        let Some(input) = input else {
            eprintln!("Error: no MIDI file given");
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        };

        Ok(Self {
            input,
            shift,
            config,
            play_seconds,
        })
    }

    /// Returns the argument following option `name`, advancing `i`.
    fn value_of<'a>(args: &'a [String], i: &mut usize, name: &str) -> Result<&'a str> {
        *i += 1;
        args.get(*i)
            .map(String::as_str)
            .with_context(|| format!("{} requires a value", name))
    }
}

/// Plays the project from the cursor in capture mode for `seconds`.
fn simulate_playback(project: Project, config: EditorConfig, seconds: f64) {
    let step = config.capture_step_seconds;
    let mut editor = EditorContext::new(project, config);
    let mut engine = TracingEngine::new();

    editor.handle_event(InputEvent::KeyDown(Key::Space), Modifiers::ctrl(), &mut engine);
    let frames = if step > 0.0 { (seconds / step).ceil() as u64 } else { 0 };
    let mut captured = 0u64;
    let mut last_x = 0.0;
    for _ in 0..frames {
        let out = editor.update_frame(
            FrameInput {
                dt: step,
                pointer: Point::ORIGIN,
                pointer_px: Point::ORIGIN,
                hover: HoverTarget::None,
                modifiers: Modifiers::NONE,
            },
            &mut engine,
        );
        if out.capture_frame {
            captured += 1;
        }
        if let Some(x) = out.playhead {
            last_x = x;
        }
    }
    editor.handle_event(InputEvent::KeyDown(Key::Space), Modifiers::NONE, &mut engine);

    info!(
        frames = captured,
        notes_started = engine.notes_started(),
        playhead = last_x,
        "playback finished"
    );
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => EditorConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => EditorConfig::default(),
    };

    let shift = cli.shift.unwrap_or(config.tick_shift);
    let sequence = midigrid::import_file(&cli.input, shift)
        .with_context(|| format!("Failed to import {}", cli.input.display()))?;
    let name = cli
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled".to_string());
    let project = Project::from_import(name, &sequence, &config);

    let summary = serde_json::to_string_pretty(&project.summary()).context("Failed to serialize summary")?;
    println!("{}", summary);

    if let Some(seconds) = cli.play_seconds {
        simulate_playback(project, config, seconds);
    }

    Ok(())
}
