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
use std::sync::Arc;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tabplay::audio::{self, decode::decode_file, AudioEngine, InstrumentLoader};
use tabplay::compiler::{compile, CompileOptions, Sound, ViewMode};
use tabplay::config;
use tabplay::controller::{keyboard, Controller};
use tabplay::notation::Tab;
use tabplay::scheduler::{PlaybackMode, Scheduler, SchedulerOptions};
use tabplay::tuning::Tuning;
use tabplay::util::{duration_minutes_seconds, filename_display};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A guitar tab player."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compiles a tab and prints its playback events.
    Events {
        /// The path to the tab (.json, .yaml or .yml).
        path: PathBuf,
        /// The playback speed multiplier.
        #[arg(short, long, default_value_t = 1.0)]
        speed: f64,
        /// Only compile chord sections.
        #[arg(short, long)]
        chords_only: bool,
        /// Emit events for bar lines.
        #[arg(short, long)]
        measure_lines: bool,
    },
    /// Parses a tuning such as "e2 a2 d3 g3 b3 e4" and prints its strings.
    Tuning {
        /// The tuning to parse.
        tuning: String,
    },
    /// Plays a tab, reading transport commands from the keyboard.
    Play {
        /// The path to the tab (.json, .yaml or .yml).
        path: PathBuf,
        /// The path to the player config.
        #[arg(short, long = "config")]
        config_path: PathBuf,
        /// A recording of the artist to play instead of the tab's own events.
        #[arg(short, long)]
        recording: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Events {
            path,
            speed,
            chords_only,
            measure_lines,
        } => {
            let tab = Tab::load(&path)?;
            let compiled = compile(
                &tab,
                CompileOptions {
                    playback_speed: speed,
                    view_mode: if chords_only {
                        ViewMode::ChordsOnly
                    } else {
                        ViewMode::Full
                    },
                    include_measure_lines: measure_lines,
                },
            );

            if compiled.is_empty() {
                println!("No events found in {}.", filename_display(&path));
                return Ok(());
            }

            println!(
                "Events (count: {}, duration: {}):",
                compiled.len(),
                duration_minutes_seconds(compiled.total_duration())
            );
            for (index, event) in compiled.events().iter().enumerate() {
                println!(
                    "{:>4} {:<10} {:>6.1} bpm {:>6.3}s {}",
                    index,
                    event.location.to_string(),
                    event.bpm,
                    event.duration_seconds(),
                    describe(&event.sound)
                );
            }
        }
        Commands::Tuning { tuning } => {
            let tuning = Tuning::parse(&tuning)?;
            println!("Tuning: {}", tuning);
            for (row, (pitch, label)) in tuning.rows().zip(tuning.row_labels()).enumerate() {
                println!("- row {}: {} (MIDI {}, label {})", row, pitch, pitch.midi(), label);
            }
        }
        Commands::Play {
            path,
            config_path,
            recording,
        } => {
            let config = config::Player::load(&config_path)?;
            let tab = Tab::load(&path)?;
            let compiled = compile(
                &tab,
                CompileOptions {
                    playback_speed: config.playback_speed(),
                    ..Default::default()
                },
            );
            info!(
                tab = filename_display(&path),
                events = compiled.len(),
                duration = duration_minutes_seconds(compiled.total_duration()),
                "Tab compiled."
            );

            let engine = audio::get_engine(&config)?;
            info!(device = config.device(), "Audio engine created.");

            let scheduler =
                Scheduler::new(compiled, engine.clone(), SchedulerOptions::from(&config));
            scheduler.set_volume(config.volume())?;

            if let Some(recording) = recording {
                let sample = tokio::task::spawn_blocking(move || decode_file(&recording)).await??;
                engine.set_recording(Some(Arc::new(sample)));
                scheduler.set_mode(PlaybackMode::ArtistRecording);
            }

            let loader = Arc::new(config.samples().loader()?);
            let click = config.count_in_click(loader.format());
            tokio::spawn(load_sounds(
                loader,
                config.instrument().to_string(),
                click,
                engine.clone(),
            ));
            tokio::spawn(print_status(scheduler.clone()));

            let mut controller =
                Controller::new(scheduler, engine, Arc::new(keyboard::Driver::new()));
            controller.join().await?;
        }
    }

    Ok(())
}

/// Loads the instrument and the count-in click. Failures are logged and playback carries on
/// without the sound.
async fn load_sounds(
    loader: Arc<InstrumentLoader>,
    instrument: String,
    click: String,
    engine: Arc<dyn AudioEngine>,
) {
    let click_loader = loader.clone();
    match tokio::task::spawn_blocking(move || click_loader.load_asset(&click)).await {
        Ok(Ok(sample)) => engine.set_count_in_click(Some(sample)),
        Ok(Err(e)) => warn!(err = %e, "Unable to load the count-in click."),
        Err(e) => error!(err = %e, "Count-in click loading task failed."),
    }

    match loader.load_async(instrument).await {
        Ok(instrument) => engine.set_instrument(Some(instrument)),
        Err(e) => error!(err = %e, "Unable to load the instrument."),
    }
}

/// Prints every transport change. The events are re-read each time since a speed change
/// replaces them.
async fn print_status(scheduler: Arc<Scheduler>) {
    let mut snapshots = scheduler.subscribe();
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        let compiled = scheduler.compiled();
        let elapsed: Duration = compiled
            .events()
            .iter()
            .take(snapshot.index)
            .map(|event| event.duration())
            .sum();
        let location = snapshot
            .metadata
            .location
            .map(|location| location.to_string())
            .unwrap_or_else(|| "-".to_string());
        let loop_range = snapshot
            .loop_range
            .map(|range| format!(" loop {}", range))
            .unwrap_or_default();

        println!(
            "[{:?}] {}/{} at {} ({}/{}) x{}{}{}",
            snapshot.metadata.state,
            snapshot.index,
            snapshot.metadata.event_count,
            location,
            duration_minutes_seconds(elapsed),
            duration_minutes_seconds(compiled.total_duration()),
            snapshot.playback_speed,
            loop_range,
            if snapshot.looping { " (looping)" } else { "" },
        );
    }
}

fn describe(sound: &Sound) -> String {
    match sound {
        Sound::Notes { notes, palm_mute } => {
            let pitches: Vec<String> = notes
                .iter()
                .map(|note| {
                    if note.dead {
                        "x".to_string()
                    } else {
                        note.pitch.to_string()
                    }
                })
                .collect();
            format!(
                "notes {}{}",
                pitches.join(" "),
                if *palm_mute { " (palm muted)" } else { "" }
            )
        }
        Sound::Strum {
            chord,
            stroke,
            accented,
            ..
        } => format!(
            "strum {:?} {}{}",
            stroke,
            chord.as_deref().unwrap_or("-"),
            if *accented { " (accented)" } else { "" }
        ),
        Sound::Rest => "rest".to_string(),
        Sound::Ornament => "|".to_string(),
    }
}
