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

//! Read-only monitoring view of a [`SystemState`].

use crate::state::{OperationalMode, SystemState, TimeState};
use serde::Serialize;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Derived snapshot for dashboards and logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Days since the last tick, rounded to two decimals.
    pub days_since_last_interaction: f64,
    /// Remaining energy.
    pub energy_level: u32,
    /// Whether the one-shot recharge has been consumed.
    pub reset_used: bool,
    /// Current mode (serialized as its short code).
    pub current_mode: OperationalMode,
    /// Classification of the last accepted tick.
    pub time_state: TimeState,
    /// Internal logical clock.
    pub logical_time: f64,
    /// Synchronization note of the last accepted tick.
    pub context_note: String,
}

/// Projects `state` as seen at `absolute_now`.
///
/// Pure; a timestamp behind `last_call_time` reads as zero elapsed days.
pub fn diagnose(state: &SystemState, absolute_now: f64) -> Diagnostics {
    let elapsed = absolute_now - state.last_call_time;
    let days = if elapsed > 0.0 {
        (elapsed / SECONDS_PER_DAY * 100.0).round() / 100.0
    } else {
        0.0
    };

    Diagnostics {
        days_since_last_interaction: days,
        energy_level: state.energy,
        reset_used: state.reset_used,
        current_mode: state.mode,
        time_state: state.time_state,
        logical_time: state.logical_time,
        context_note: state.context_note.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnose_fresh_state() {
        let state = SystemState::initial(1_000.0);
        let diag = diagnose(&state, 1_000.0);
        assert_eq!(diag.days_since_last_interaction, 0.0);
        assert_eq!(diag.energy_level, 10);
        assert_eq!(diag.current_mode, OperationalMode::Standard);
        assert_eq!(diag.time_state, TimeState::Sync);
        assert!(!diag.reset_used);
    }

    #[test]
    fn test_days_are_rounded() {
        let state = SystemState::initial(0.0);
        let diag = diagnose(&state, 1.5 * SECONDS_PER_DAY + 100.0);
        assert_eq!(diag.days_since_last_interaction, 1.5);
    }

    #[test]
    fn test_regressed_clock_reads_zero_days() {
        let state = SystemState::initial(500.0);
        assert_eq!(diagnose(&state, 10.0).days_since_last_interaction, 0.0);
        assert_eq!(diagnose(&state, f64::NAN).days_since_last_interaction, 0.0);
    }

    #[test]
    fn test_diagnostics_serialize_with_codes() {
        let state = SystemState {
            mode: OperationalMode::Emergency,
            ..SystemState::initial(0.0)
        };
        let json = serde_json::to_value(diagnose(&state, 0.0)).unwrap();
        assert_eq!(json["current_mode"], "EMG");
        assert_eq!(json["time_state"], "SYNC");
    }
}
