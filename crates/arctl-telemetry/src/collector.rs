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

//! Per-tick telemetry records and their summary.

use crate::window::RollingWindow;
use arctl_core::{OperationalMode, RawMetrics, SystemState, TimeState};
use serde::{Deserialize, Serialize};
use std::collections::{vec_deque, VecDeque};
use std::fmt;
use std::time::Duration;

/// Number of recent ticks the rolling statistics cover.
pub const REPORT_WINDOW: usize = 120;

/// Records a collector retains unless built with [`TelemetryCollector::with_limit`].
pub const DEFAULT_RECORD_LIMIT: usize = 10_000;

/// One observed controller tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Mode after the tick.
    pub mode: OperationalMode,
    /// Energy after the tick.
    pub energy: u32,
    /// Temperature in force after the tick: the emitted one, or the last
    /// emitted one for a buffered tick. `None` before any emission.
    pub temperature: Option<f64>,
    /// Time the caller spent producing the tick.
    pub latency_secs: f64,
    /// Raw entropy fed in.
    pub entropy: f64,
    /// Raw divergence fed in.
    pub divergence: f64,
    /// Raw repetition fed in.
    pub repetition: f64,
    /// Whether the tick advanced the logical clock.
    pub step_performed: bool,
    /// Temporal classification after the tick.
    pub time_state: TimeState,
}

/// Summary of a recorded run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryReport {
    /// Mode at the last tick.
    pub final_mode: OperationalMode,
    /// Energy at the last tick.
    pub energy_left: u32,
    /// Temperature in force at the last tick.
    pub temperature: Option<f64>,
    /// Latency of the last tick.
    pub latency_secs: f64,
    /// Number of ticks recorded.
    pub steps: usize,
    /// Whether any tick ended in FALLBACK.
    pub fallback_triggered: bool,
    /// Mean raw repetition over the rolling window.
    pub mean_repetition: f64,
    /// Rising (positive) or falling raw repetition over the window.
    pub repetition_trend: f64,
    /// Spread of raw repetition over the window.
    pub repetition_variance: f64,
}

impl fmt::Display for TelemetryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Adaptive Core Telemetry]")?;
        writeln!(f, "• Steps: {}", self.steps)?;
        writeln!(f, "• Final Mode: {}", self.final_mode)?;
        writeln!(f, "• Energy Left: {}", self.energy_left)?;
        match self.temperature {
            Some(t) => writeln!(f, "• Temperature: {t:.1}")?,
            None => writeln!(f, "• Temperature: -")?,
        }
        writeln!(f, "• Latency: {:.3}s", self.latency_secs)?;
        writeln!(
            f,
            "• Repetition: mean {:.2}, trend {:+.2}, variance {:.3}",
            self.mean_repetition, self.repetition_trend, self.repetition_variance
        )?;
        if self.fallback_triggered {
            write!(f, "FALLBACK TRIGGERED: SYSTEM IN TERMINAL STATE")?;
        }
        Ok(())
    }
}

/// Accumulates [`StepRecord`]s for one lineage.
///
/// Only the most recent records are retained; older ones are evicted once
/// the limit is reached. Counters and the FALLBACK flag cover every record.
#[derive(Debug)]
pub struct TelemetryCollector {
    steps: VecDeque<StepRecord>,
    limit: usize,
    recorded: usize,
    repetition: RollingWindow<REPORT_WINDOW>,
    fallback_triggered: bool,
    last_temperature: Option<f64>,
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::with_limit(DEFAULT_RECORD_LIMIT)
    }
}

impl TelemetryCollector {
    /// Creates an empty collector retaining [`DEFAULT_RECORD_LIMIT`] records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty collector retaining at most `limit` records (at least one).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            steps: VecDeque::new(),
            limit: limit.max(1),
            recorded: 0,
            repetition: RollingWindow::new(),
            fallback_triggered: false,
            last_temperature: None,
        }
    }

    /// Builds the record for a tick without storing it.
    ///
    /// Buffered ticks carry the last temperature this collector saw emitted.
    pub fn snapshot(&self, state: &SystemState, raw: &RawMetrics, latency: Duration) -> StepRecord {
        StepRecord {
            mode: state.mode,
            energy: state.energy,
            temperature: state.temperature().or(self.last_temperature),
            latency_secs: latency.as_secs_f64(),
            entropy: raw.entropy(),
            divergence: raw.divergence(),
            repetition: raw.repetition(),
            step_performed: state.step_performed,
            time_state: state.time_state,
        }
    }

    /// Records the tick that produced `state` from `raw`.
    pub fn record_step(&mut self, state: &SystemState, raw: &RawMetrics, latency: Duration) {
        let record = self.snapshot(state, raw, latency);
        self.record(record);
    }

    /// Stores a prepared record.
    pub fn record(&mut self, record: StepRecord) {
        if record.temperature.is_some() {
            self.last_temperature = record.temperature;
        }
        if record.mode == OperationalMode::Fallback && !self.fallback_triggered {
            log::warn!("Telemetry: FALLBACK observed after {} steps.", self.recorded);
            self.fallback_triggered = true;
        }
        self.repetition.push(record.repetition);
        if self.steps.len() == self.limit {
            self.steps.pop_front();
        }
        self.steps.push_back(record);
        self.recorded += 1;
    }

    /// Retained records, oldest first.
    pub fn steps(&self) -> vec_deque::Iter<'_, StepRecord> {
        self.steps.iter()
    }

    /// Number of records ever stored, including evicted ones.
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    /// Whether any recorded tick ended in FALLBACK.
    pub fn fallback_triggered(&self) -> bool {
        self.fallback_triggered
    }

    /// Summarizes the run, or `None` if nothing was recorded.
    pub fn report(&self) -> Option<TelemetryReport> {
        let last = self.steps.back()?;
        Some(TelemetryReport {
            final_mode: last.mode,
            energy_left: last.energy,
            temperature: last.temperature,
            latency_secs: last.latency_secs,
            steps: self.recorded,
            fallback_triggered: self.fallback_triggered,
            mean_repetition: self.repetition.average(),
            repetition_trend: self.repetition.trend(),
            repetition_variance: self.repetition.variance(),
        })
    }

    /// One JSON document per retained record, newline separated.
    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for record in &self.steps {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }
}
