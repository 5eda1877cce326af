// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Command-line playground for the adaptive controller.

use anyhow::{Context, Result};
use arctl_control::{settings, Controller};
use arctl_core::{ControllerConfig, ManualClock, MetricExtractor, RawMetrics};
use arctl_telemetry::{logging, SinkConfig, StepRecord, TelemetryCollector, TelemetrySink};
use arctl_verification::LexicalMetrics;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Ticks per quiet / rising / high-repetition cycle.
const WAVE_PERIOD: usize = 30;

#[derive(Parser)]
#[command(name = "arctl-sandbox", version, about = "Drive the adaptive sampling controller")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scripted repetition wave on a simulated clock
    Simulate {
        /// Number of ticks to run
        #[arg(long, default_value_t = 90)]
        steps: usize,

        /// Simulated seconds between ticks
        #[arg(long, default_value_t = 0.1)]
        tick: f64,

        /// TOML settings file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Dump every tick as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Read tokens from stdin and steer on their lexical metrics
    Stream {
        /// TOML settings file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            steps,
            tick,
            config,
            json,
        } => simulate(steps, tick, config.as_deref(), json),
        Commands::Stream { config } => stream(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<ControllerConfig> {
    match path {
        Some(path) => settings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Ok(ControllerConfig::default()),
    }
}

/// Raw metrics for tick `t` of the scripted wave.
fn wave(t: usize) -> RawMetrics {
    let phase = t % WAVE_PERIOD;
    let x = t as f64;
    let repetition = match phase {
        0..=9 => 0.2 + 0.1 * x.sin(),
        10..=19 => 0.3 + 0.4 * (phase - 10) as f64 / 10.0,
        _ => 0.7 + 0.2 * x.sin(),
    };
    RawMetrics::clamped(0.8 - 0.5 * repetition, 0.1 * repetition, repetition)
}

fn simulate(steps: usize, tick: f64, config: Option<&Path>, json: bool) -> Result<()> {
    anyhow::ensure!(
        tick.is_finite() && tick > 0.0,
        "--tick must be a positive number of seconds"
    );
    let config = load_config(config)?;
    let clock = ManualClock::new(0.0);
    let mut controller = Controller::with_clock(Arc::new(config), Box::new(clock.clone()))?;
    let mut collector = TelemetryCollector::new();

    for t in 0..steps {
        clock.set((t + 1) as f64 * tick);
        let raw = wave(t);

        let started = Instant::now();
        let status = controller.control(raw);
        collector.record_step(controller.state(), &raw, started.elapsed());

        log::debug!(
            "Sandbox: tick {t} rep={:.2} -> {} T={:.1} E={}",
            raw.repetition(),
            status.mode,
            status.temperature,
            status.energy
        );
        if status.fallback {
            log::warn!("Sandbox: FALLBACK reached at tick {t}, stopping.");
            break;
        }
    }

    if json {
        print!("{}", collector.to_json_lines()?);
    }
    if let Some(report) = collector.report() {
        println!("{report}");
    }
    println!("{}", serde_json::to_string_pretty(&controller.diagnostics())?);
    Ok(())
}

/// Appends the tokens of `line`, keeping only the last `window` tokens the
/// extractor reads.
fn push_tokens(history: &mut Vec<String>, line: &str, window: usize) {
    history.extend(line.split_whitespace().map(str::to_owned));
    let excess = history.len().saturating_sub(window);
    history.drain(..excess);
}

fn stream(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let mut controller = Controller::new(config)?;
    let extractor = LexicalMetrics::default();
    let (mut sink, rx) = TelemetrySink::new(SinkConfig::default());
    sink.start(rx);

    let mut history: Vec<String> = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        push_tokens(&mut history, &line, extractor.window());

        let raw = extractor.extract(&history);
        let started = Instant::now();
        let status = controller.control(raw);
        sink.publish(StepRecord {
            mode: status.mode,
            energy: status.energy,
            temperature: Some(status.temperature),
            latency_secs: started.elapsed().as_secs_f64(),
            entropy: raw.entropy(),
            divergence: raw.divergence(),
            repetition: raw.repetition(),
            step_performed: status.step_performed,
            time_state: status.time_state,
        });

        println!(
            "{} T={:.1} E={} rep={:.2} ent={:.2}",
            status.mode,
            status.temperature,
            status.energy,
            raw.repetition(),
            raw.entropy()
        );
        if !status.context_note.is_empty() {
            println!("{}", status.context_note);
        }
    }

    if let Some(report) = sink.stop().and_then(|collector| collector.report()) {
        println!("{report}");
    }
    Ok(())
}
