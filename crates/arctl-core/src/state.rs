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

//! State record and value types exchanged with the transition kernel.

use crate::config::ControllerConfig;
use crate::error::{ArctlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether [`RawMetrics::new`] performs range checks in this build.
const VALIDATE_METRICS: bool = cfg!(any(feature = "validation", debug_assertions));

/// The controller's operational mode.
///
/// `Fallback` is terminal: no transition rule ever leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OperationalMode {
    /// Normal generation.
    #[default]
    #[serde(rename = "STD")]
    Standard,
    /// Repetition loop detected; hot sampling to escape it.
    #[serde(rename = "EMG")]
    Emergency,
    /// Settling period after an emergency.
    #[serde(rename = "CDN")]
    Cooldown,
    /// Energy exhausted. Absorbing.
    #[serde(rename = "FBK")]
    Fallback,
}

impl OperationalMode {
    /// Short stable code used in persisted records and diagnostics.
    pub fn as_code(self) -> &'static str {
        match self {
            OperationalMode::Standard => "STD",
            OperationalMode::Emergency => "EMG",
            OperationalMode::Cooldown => "CDN",
            OperationalMode::Fallback => "FBK",
        }
    }

    /// Parses a code produced by [`as_code`](Self::as_code).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "STD" => Some(OperationalMode::Standard),
            "EMG" => Some(OperationalMode::Emergency),
            "CDN" => Some(OperationalMode::Cooldown),
            "FBK" => Some(OperationalMode::Fallback),
            _ => None,
        }
    }

    /// Returns `true` for the absorbing `Fallback` mode.
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationalMode::Fallback)
    }
}

impl fmt::Display for OperationalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Classification of the wall-clock gap between two consecutive ticks.
///
/// Recomputed on every accepted tick; carried in the state for context
/// injection and diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeState {
    /// Under a minute: continuous interaction.
    #[default]
    #[serde(rename = "SYNC")]
    Sync,
    /// Between a minute and a day.
    #[serde(rename = "LAG")]
    Lag,
    /// A day or more.
    #[serde(rename = "GAP")]
    Gap,
}

impl TimeState {
    /// Short stable code used in persisted records and diagnostics.
    pub fn as_code(self) -> &'static str {
        match self {
            TimeState::Sync => "SYNC",
            TimeState::Lag => "LAG",
            TimeState::Gap => "GAP",
        }
    }

    /// Parses a code produced by [`as_code`](Self::as_code).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "SYNC" => Some(TimeState::Sync),
            "LAG" => Some(TimeState::Lag),
            "GAP" => Some(TimeState::Gap),
            _ => None,
        }
    }
}

impl fmt::Display for TimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// One tick's worth of quality signals from the generation pipeline.
///
/// Every channel is finite and within `[0, 1]`; this is checked once, here,
/// so the kernel never has to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMetrics {
    entropy: f64,
    divergence: f64,
    repetition: f64,
}

impl RawMetrics {
    /// Builds a sample, rejecting non-finite or out-of-range channels.
    ///
    /// The check is skipped in optimized builds compiled without the
    /// `validation` feature.
    pub fn new(entropy: f64, divergence: f64, repetition: f64) -> Result<Self> {
        if VALIDATE_METRICS {
            check_unit("entropy", entropy)?;
            check_unit("divergence", divergence)?;
            check_unit("repetition", repetition)?;
        }
        Ok(Self {
            entropy,
            divergence,
            repetition,
        })
    }

    /// Builds a sample by forcing each channel into range.
    ///
    /// Non-finite values become `0.0`. Intended for heuristic extractors whose
    /// arithmetic may drift slightly outside `[0, 1]`.
    pub fn clamped(entropy: f64, divergence: f64, repetition: f64) -> Self {
        let fix = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            entropy: fix(entropy),
            divergence: fix(divergence),
            repetition: fix(repetition),
        }
    }

    /// The neutral sample: mid entropy, no divergence, no repetition.
    pub fn neutral() -> Self {
        Self {
            entropy: 0.5,
            divergence: 0.0,
            repetition: 0.0,
        }
    }

    /// Normalized entropy.
    pub fn entropy(&self) -> f64 {
        self.entropy
    }

    /// Normalized semantic divergence.
    pub fn divergence(&self) -> f64 {
        self.divergence
    }

    /// Normalized token repetition.
    pub fn repetition(&self) -> f64 {
        self.repetition
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ArctlError::InputRangeViolation { field, value })
    }
}

/// The directive handed to the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Sampling temperature.
    pub temperature: f64,
}

impl SamplingConfig {
    /// Creates a directive with the given temperature.
    pub fn new(temperature: f64) -> Self {
        Self { temperature }
    }
}

/// Complete controller snapshot for one generation lineage.
///
/// Values are never mutated in place: the kernel always returns a new
/// `SystemState`.
///
/// Invariants for every reachable state:
/// - `logical_time` never decreases across ticks;
/// - `0 <= pending_dt < max_step_interval + min_step_interval`;
/// - `energy <= max_energy`;
/// - `mode_entry_time` changes exactly when `mode` changes;
/// - once `mode` is `Fallback` it stays there with `energy == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    /// Smoothed entropy.
    pub s_entropy: f64,
    /// Smoothed divergence.
    pub s_divergence: f64,
    /// Smoothed repetition.
    pub s_repetition: f64,
    /// Current operational mode.
    pub mode: OperationalMode,
    /// Remaining energy budget.
    pub energy: u32,
    /// Wall-clock time of the previous tick, in seconds.
    pub last_call_time: f64,
    /// Internal clock, advanced only by accepted ticks.
    pub logical_time: f64,
    /// Logical time at which `mode` was entered.
    pub mode_entry_time: f64,
    /// Real time accumulated but not yet applied to the logical clock.
    pub pending_dt: f64,
    /// Whether the one-shot conservative energy recharge has fired.
    #[serde(default)]
    pub reset_used: bool,
    /// Classification of the last accepted tick's wall-clock gap.
    #[serde(default)]
    pub time_state: TimeState,
    /// Synchronization note for the last accepted tick; empty under `Sync`.
    #[serde(default)]
    pub context_note: String,
    /// Directive emitted by this tick, `None` when the tick was buffered.
    pub active_config: Option<SamplingConfig>,
    /// Whether this tick advanced the logical clock.
    pub step_performed: bool,
}

impl SystemState {
    /// Fresh lineage using the default policy.
    pub fn initial(now: f64) -> Self {
        Self::initial_with(now, &ControllerConfig::default())
    }

    /// Fresh lineage: STANDARD mode, full energy, neutral metrics.
    pub fn initial_with(now: f64, cfg: &ControllerConfig) -> Self {
        let neutral = RawMetrics::neutral();
        Self {
            s_entropy: neutral.entropy,
            s_divergence: neutral.divergence,
            s_repetition: neutral.repetition,
            mode: OperationalMode::Standard,
            energy: cfg.policy.max_energy,
            last_call_time: now,
            logical_time: 0.0,
            mode_entry_time: 0.0,
            pending_dt: 0.0,
            reset_used: false,
            time_state: TimeState::Sync,
            context_note: String::new(),
            active_config: Some(SamplingConfig::new(
                cfg.policy.temperatures.for_mode(OperationalMode::Standard),
            )),
            step_performed: true,
        }
    }

    /// Returns `true` once the lineage has reached the absorbing FALLBACK mode.
    pub fn is_terminal(&self) -> bool {
        self.mode.is_terminal()
    }

    /// Temperature emitted this tick, if any.
    pub fn temperature(&self) -> Option<f64> {
        self.active_config.map(|c| c.temperature)
    }

    /// Checks that this state could have been produced under `cfg`.
    ///
    /// The kernel only ever yields states that pass; externally supplied
    /// ones (restored snapshots) must be checked before they are stepped.
    pub fn check(&self, cfg: &ControllerConfig) -> Result<()> {
        let time = &cfg.time;
        if self.energy > cfg.policy.max_energy {
            return invalid(
                "energy",
                format!("{} exceeds max_energy {}", self.energy, cfg.policy.max_energy),
            );
        }
        if self.mode == OperationalMode::Fallback && self.energy != 0 {
            return invalid("energy", format!("FALLBACK holds 0 energy, got {}", self.energy));
        }
        let debt_limit = time.max_step_interval + time.min_step_interval;
        if !(self.pending_dt >= 0.0 && self.pending_dt < debt_limit) {
            return invalid(
                "pending_dt",
                format!("{} is outside [0, {debt_limit})", self.pending_dt),
            );
        }
        if !self.last_call_time.is_finite() {
            return invalid("last_call_time", "must be finite".into());
        }
        if !(self.logical_time.is_finite() && self.logical_time >= 0.0) {
            return invalid("logical_time", "must be finite and non-negative".into());
        }
        if !(self.mode_entry_time >= 0.0 && self.mode_entry_time <= self.logical_time) {
            return invalid("mode_entry_time", "must lie within [0, logical_time]".into());
        }
        for (field, value) in [
            ("s_entropy", self.s_entropy),
            ("s_divergence", self.s_divergence),
            ("s_repetition", self.s_repetition),
        ] {
            if !value.is_finite() {
                return invalid(field, format!("{value} is not finite"));
            }
        }
        if let Some(t) = self.temperature() {
            if !(t.is_finite() && t >= 0.0) {
                return invalid("active_config", format!("temperature {t} is not usable"));
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> Result<()> {
    Err(ArctlError::InvalidState { field, reason })
}
