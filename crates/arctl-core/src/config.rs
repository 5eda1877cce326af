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

//! Immutable parameter bundles for the transition kernel.
//!
//! All durations are expressed in seconds of logical time. Every bundle has
//! documented defaults and can be partially specified in a serialized
//! document; missing fields fall back to [`Default`].

use crate::error::{ArctlError, Result};
use crate::state::OperationalMode;
use serde::{Deserialize, Serialize};

/// Timing parameters of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Anti-stutter threshold: ticks accumulating less real time than this are buffered.
    pub min_step_interval: f64,
    /// Upper bound on the logical time advanced by a single accepted tick.
    pub max_step_interval: f64,
    /// Logical time after which EMERGENCY gives way to COOLDOWN.
    pub deadlock_timeout: f64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            min_step_interval: 0.01,
            max_step_interval: 0.1,
            deadlock_timeout: 5.0,
        }
    }
}

impl TimeConfig {
    /// Checks that every interval is finite and strictly positive, and that
    /// `min_step_interval <= max_step_interval`.
    pub fn validate(&self) -> Result<()> {
        positive_duration("time.min_step_interval", self.min_step_interval)?;
        positive_duration("time.max_step_interval", self.max_step_interval)?;
        positive_duration("time.deadlock_timeout", self.deadlock_timeout)?;
        if self.min_step_interval > self.max_step_interval {
            return Err(ArctlError::ConfigViolation {
                field: "time.min_step_interval",
                reason: format!(
                    "must not exceed max_step_interval ({} > {})",
                    self.min_step_interval, self.max_step_interval
                ),
            });
        }
        Ok(())
    }
}

/// Sampling temperature emitted for each operational mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeTemperatures {
    /// Normal generation.
    pub standard: f64,
    /// Hot sampling used to break out of a repetition loop.
    pub emergency: f64,
    /// Cool sampling while the system settles after an emergency.
    pub cooldown: f64,
    /// Near-deterministic sampling once the energy budget is exhausted.
    pub fallback: f64,
}

impl Default for ModeTemperatures {
    fn default() -> Self {
        Self {
            standard: 0.7,
            emergency: 1.2,
            cooldown: 0.5,
            fallback: 0.1,
        }
    }
}

impl ModeTemperatures {
    /// Returns the configured temperature for `mode`.
    pub fn for_mode(&self, mode: OperationalMode) -> f64 {
        match mode {
            OperationalMode::Standard => self.standard,
            OperationalMode::Emergency => self.emergency,
            OperationalMode::Cooldown => self.cooldown,
            OperationalMode::Fallback => self.fallback,
        }
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("policy.temperatures.standard", self.standard),
            ("policy.temperatures.emergency", self.emergency),
            ("policy.temperatures.cooldown", self.cooldown),
            ("policy.temperatures.fallback", self.fallback),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ArctlError::ConfigViolation {
                    field,
                    reason: format!("temperature must be finite and non-negative, got {value}"),
                });
            }
        }
        Ok(())
    }
}

/// Energy economy and mode-switching policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Size of the energy budget. A fresh lineage starts full.
    pub max_energy: u32,
    /// Energy spent to enter EMERGENCY.
    pub emergency_cost: u32,
    /// Energy restored when COOLDOWN completes.
    pub recharge_on_cooldown: u32,
    /// Energy granted once per lineage when a GAP-sized absence is observed.
    pub reset_recovery_amount: u32,
    /// EMA weight of the newest raw sample, in `[0, 1]`.
    pub smoothing_alpha: f64,
    /// Smoothed repetition strictly above this value triggers escalation.
    pub repetition_threshold: f64,
    /// Logical time spent in COOLDOWN before returning to STANDARD.
    pub cooldown_duration: f64,
    /// Per-mode sampling temperatures.
    pub temperatures: ModeTemperatures,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_energy: 10,
            emergency_cost: 3,
            recharge_on_cooldown: 1,
            reset_recovery_amount: 5,
            smoothing_alpha: 0.3,
            repetition_threshold: 0.6,
            cooldown_duration: 2.0,
            temperatures: ModeTemperatures::default(),
        }
    }
}

impl PolicyConfig {
    /// Checks budget, ratio and duration ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_energy == 0 {
            return Err(ArctlError::ConfigViolation {
                field: "policy.max_energy",
                reason: "must be a positive integer".into(),
            });
        }
        unit_interval("policy.smoothing_alpha", self.smoothing_alpha)?;
        unit_interval("policy.repetition_threshold", self.repetition_threshold)?;
        positive_duration("policy.cooldown_duration", self.cooldown_duration)?;
        self.temperatures.validate()
    }
}

/// The complete, read-only configuration shared by every lineage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Timing parameters.
    pub time: TimeConfig,
    /// Energy and mode policy.
    pub policy: PolicyConfig,
}

impl ControllerConfig {
    /// Validates both bundles.
    pub fn validate(&self) -> Result<()> {
        self.time.validate()?;
        self.policy.validate()
    }

    /// Returns `self` if it passes [`validate`](Self::validate).
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }
}

fn positive_duration(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ArctlError::ConfigViolation {
            field,
            reason: format!("must be a finite positive duration, got {value}"),
        })
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ArctlError::ConfigViolation {
            field,
            reason: format!("must be in [0, 1], got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ControllerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let cfg = ControllerConfig::default();
        assert_eq!(cfg.policy.max_energy, 10);
        assert_eq!(cfg.policy.emergency_cost, 3);
        assert_eq!(cfg.policy.recharge_on_cooldown, 1);
        assert_eq!(cfg.policy.repetition_threshold, 0.6);
        assert_eq!(cfg.time.deadlock_timeout, 5.0);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let cfg = ControllerConfig {
            time: TimeConfig {
                min_step_interval: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ArctlError::ConfigViolation {
                field: "time.min_step_interval",
                ..
            })
        ));
    }

    #[test]
    fn test_min_above_max_rejected() {
        let time = TimeConfig {
            min_step_interval: 0.5,
            max_step_interval: 0.1,
            ..Default::default()
        };
        assert!(time.validate().is_err());
    }

    #[test]
    fn test_alpha_out_of_range_rejected() {
        let policy = PolicyConfig {
            smoothing_alpha: 1.5,
            ..Default::default()
        };
        assert!(policy.validate().is_err());

        let policy = PolicyConfig {
            repetition_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_zero_max_energy_rejected() {
        let policy = PolicyConfig {
            max_energy: 0,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_negative_temperature_rejected() {
        let mut policy = PolicyConfig::default();
        policy.temperatures.cooldown = -0.1;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_temperature_lookup_per_mode() {
        let temps = ModeTemperatures::default();
        assert_eq!(temps.for_mode(OperationalMode::Standard), 0.7);
        assert_eq!(temps.for_mode(OperationalMode::Emergency), 1.2);
        assert_eq!(temps.for_mode(OperationalMode::Cooldown), 0.5);
        assert_eq!(temps.for_mode(OperationalMode::Fallback), 0.1);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let cfg: ControllerConfig =
            serde_json::from_str(r#"{"policy": {"smoothing_alpha": 1.0}}"#).unwrap();
        assert_eq!(cfg.policy.smoothing_alpha, 1.0);
        assert_eq!(cfg.policy.max_energy, 10);
        assert_eq!(cfg.time, TimeConfig::default());
    }
}
