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

//! Single-lineage controller façade.

use arctl_core::persistence;
use arctl_core::{
    diagnose, step, Clock, ControllerConfig, Diagnostics, MetricExtractor, OperationalMode,
    RawMetrics, Result, SystemClock, SystemState, TimeState,
};
use serde::Serialize;
use std::sync::Arc;

/// What the sampler needs after a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlStatus {
    /// Mode after the tick.
    pub mode: OperationalMode,
    /// Temperature to sample with. For a buffered tick this is the last
    /// emitted directive.
    pub temperature: f64,
    /// Energy after the tick.
    pub energy: u32,
    /// `true` once the lineage is in FALLBACK.
    pub fallback: bool,
    /// Whether the tick advanced the logical clock.
    pub step_performed: bool,
    /// Temporal classification of the tick.
    pub time_state: TimeState,
    /// Synchronization note, empty on SYNC.
    pub context_note: String,
}

/// Drives one generation lineage through the transition kernel.
///
/// The configuration is shared read-only; the state is owned. Hosts running
/// several lineages create one `Controller` per lineage and serialize access
/// to each one themselves.
pub struct Controller {
    config: Arc<ControllerConfig>,
    state: SystemState,
    clock: Box<dyn Clock>,
    last_temperature: f64,
}

impl Controller {
    /// Creates a controller on the system clock.
    pub fn new(config: ControllerConfig) -> Result<Self> {
        Self::with_clock(Arc::new(config), Box::new(SystemClock))
    }

    /// Creates a controller sharing `config` and reading time from `clock`.
    pub fn with_clock(config: Arc<ControllerConfig>, clock: Box<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let state = SystemState::initial_with(clock.now(), &config);
        let last_temperature = resolve_temperature(&state, &config);
        log::debug!(
            "Controller: new lineage at t={:.3}, energy {}.",
            state.last_call_time,
            state.energy
        );
        Ok(Self {
            config,
            state,
            clock,
            last_temperature,
        })
    }

    /// Advances one tick at the clock's current time.
    pub fn control(&mut self, raw: RawMetrics) -> ControlStatus {
        let now = self.clock.now();
        self.control_at(raw, now)
    }

    /// Advances one tick at an explicit wall-clock time.
    pub fn control_at(&mut self, raw: RawMetrics, now: f64) -> ControlStatus {
        let next = step(raw, &self.state, now, &self.config);
        if let Some(t) = next.temperature() {
            self.last_temperature = t;
        }
        self.state = next;
        self.status()
    }

    /// Extracts metrics from `history` and advances one tick.
    pub fn observe(&mut self, extractor: &dyn MetricExtractor, history: &[String]) -> ControlStatus {
        let raw = extractor.extract(history);
        self.control(raw)
    }

    /// Status derived from the current state.
    pub fn status(&self) -> ControlStatus {
        ControlStatus {
            mode: self.state.mode,
            temperature: self.last_temperature,
            energy: self.state.energy,
            fallback: self.state.is_terminal(),
            step_performed: self.state.step_performed,
            time_state: self.state.time_state,
            context_note: self.state.context_note.clone(),
        }
    }

    /// Diagnostics view at the clock's current time.
    pub fn diagnostics(&self) -> Diagnostics {
        diagnose(&self.state, self.clock.now())
    }

    /// The current state.
    pub fn state(&self) -> &SystemState {
        &self.state
    }

    /// The shared configuration.
    pub fn config(&self) -> &Arc<ControllerConfig> {
        &self.config
    }

    /// Serializes the current state as a versioned JSON record.
    pub fn snapshot_json(&self) -> Result<String> {
        persistence::to_json(&self.state)
    }

    /// Replaces the current state with a persisted one.
    ///
    /// The record must satisfy the active configuration's invariants. On
    /// error the current state is left untouched.
    pub fn restore_json(&mut self, json: &str) -> Result<()> {
        let state = persistence::from_json(json)?;
        self.install(state)
    }

    /// Serializes the current state as a compact binary record.
    pub fn snapshot_bytes(&self) -> Result<Vec<u8>> {
        persistence::to_bytes(&self.state)
    }

    /// Binary counterpart of [`restore_json`](Self::restore_json).
    pub fn restore_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let state = persistence::from_bytes(bytes)?;
        self.install(state)
    }

    fn install(&mut self, state: SystemState) -> Result<()> {
        if let Err(e) = state.check(&self.config) {
            log::warn!("Controller: rejected restored state: {e}.");
            return Err(e);
        }
        self.last_temperature = resolve_temperature(&state, &self.config);
        log::info!(
            "Controller: restored lineage in {} with {} energy.",
            state.mode,
            state.energy
        );
        self.state = state;
        Ok(())
    }
}

// A restored or fresh state may carry no directive; fall back to its mode's.
fn resolve_temperature(state: &SystemState, config: &ControllerConfig) -> f64 {
    state
        .temperature()
        .unwrap_or_else(|| config.policy.temperatures.for_mode(state.mode))
}
