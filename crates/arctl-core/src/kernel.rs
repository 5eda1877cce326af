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

//! The deterministic transition kernel.
//!
//! [`step`] maps `(raw metrics, previous state, wall-clock time, config)` to
//! the next [`SystemState`]. It is total, never fails and reads no ambient
//! state, so any recorded sequence of ticks can be replayed bit for bit. The
//! only side effect is logging.

use crate::chronos;
use crate::config::{ControllerConfig, PolicyConfig, TimeConfig};
use crate::state::{OperationalMode, RawMetrics, SamplingConfig, SystemState, TimeState};

/// Outcome of evaluating the mode table for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ModeTransition {
    mode: OperationalMode,
    energy: u32,
}

/// Advances one lineage by one tick.
///
/// Timestamps that regress behind `prev.last_call_time` are treated as zero
/// elapsed time. Ticks that accumulate less than `min_step_interval` of real
/// time are buffered: only `last_call_time` and `pending_dt` move, and no
/// directive is emitted.
pub fn step(
    raw: RawMetrics,
    prev: &SystemState,
    absolute_now: f64,
    cfg: &ControllerConfig,
) -> SystemState {
    let time = &cfg.time;
    let policy = &cfg.policy;

    // ── 1. Clock Safety Clamp ────────────────────────────────────────
    // Non-finite timestamps (NaN, +inf) are absorbed like a regression.
    let now = if !(absolute_now.is_finite() && absolute_now >= prev.last_call_time) {
        log::warn!(
            "Kernel: clock regression or non-finite time absorbed (now={:.3}, last_call={:.3}).",
            absolute_now,
            prev.last_call_time
        );
        prev.last_call_time
    } else {
        absolute_now
    };

    // ── 2. Time Accumulation ─────────────────────────────────────────
    let delta_real = now - prev.last_call_time;
    let new_pending = prev.pending_dt + delta_real;

    // ── 3. Anti-Stutter Gate ─────────────────────────────────────────
    if new_pending < time.min_step_interval {
        return SystemState {
            last_call_time: now,
            pending_dt: new_pending,
            active_config: None,
            step_performed: false,
            ..prev.clone()
        };
    }

    // ── 4. Logical Clock ─────────────────────────────────────────────
    let (dt, remaining_dt) = split_time_debt(new_pending, time);
    let logical_now = prev.logical_time + dt;

    // ── 5. Temporal Classification ───────────────────────────────────
    let (time_state, context_note) = chronos::classify(prev.last_call_time, now);

    // ── 6. Conservative Energy Reset ─────────────────────────────────
    let mut energy = prev.energy;
    let mut reset_used = prev.reset_used;
    if time_state == TimeState::Gap && !prev.reset_used {
        energy = energy
            .saturating_add(policy.reset_recovery_amount)
            .min(policy.max_energy);
        reset_used = true;
        log::info!(
            "Kernel: GAP detected, one-time recharge {} -> {} energy.",
            prev.energy,
            energy
        );
    }

    // ── 7. Metric Smoothing ──────────────────────────────────────────
    let alpha = policy.smoothing_alpha;
    let s_entropy = ema(prev.s_entropy, raw.entropy(), alpha);
    let s_divergence = ema(prev.s_divergence, raw.divergence(), alpha);
    let s_repetition = ema(prev.s_repetition, raw.repetition(), alpha);

    // ── 8. Terminal Short-Circuit ────────────────────────────────────
    if prev.mode == OperationalMode::Fallback {
        return SystemState {
            s_entropy,
            s_divergence,
            s_repetition,
            mode: OperationalMode::Fallback,
            energy: 0,
            last_call_time: now,
            logical_time: logical_now,
            mode_entry_time: prev.mode_entry_time,
            pending_dt: remaining_dt,
            reset_used,
            time_state,
            context_note,
            active_config: Some(directive(OperationalMode::Fallback, policy)),
            step_performed: true,
        };
    }

    // ── 9. Mode Transition ───────────────────────────────────────────
    let time_in_mode = logical_now - prev.mode_entry_time;
    let (mode, mode_entry_time) =
        match transition(prev.mode, energy, s_repetition, time_in_mode, time, policy) {
            Some(next) => {
                log_transition(prev.mode, next, s_repetition);
                energy = next.energy;
                (next.mode, logical_now)
            }
            None => (prev.mode, prev.mode_entry_time),
        };

    // ── 10. Directive Selection ──────────────────────────────────────
    let active_config = Some(directive(mode, policy));

    // ── 11. Energy Hardening ─────────────────────────────────────────
    let energy = energy.min(policy.max_energy);

    // ── 12. Atomic Return ────────────────────────────────────────────
    SystemState {
        s_entropy,
        s_divergence,
        s_repetition,
        mode,
        energy,
        last_call_time: now,
        logical_time: logical_now,
        mode_entry_time,
        pending_dt: remaining_dt,
        reset_used,
        time_state,
        context_note,
        active_config,
        step_performed: true,
    }
}

/// Splits accumulated real time into the logical step `dt` and the debt
/// carried to the next tick.
///
/// Debt beyond one `max_step_interval` is dropped so a long absence cannot
/// turn into an unbounded catch-up of clamped ticks.
fn split_time_debt(new_pending: f64, time: &TimeConfig) -> (f64, f64) {
    let dt = new_pending.min(time.max_step_interval);
    let carried = new_pending - dt;
    if carried > time.max_step_interval {
        log::debug!(
            "Kernel: discarding {:.3}s of time debt beyond the carry limit.",
            carried - time.max_step_interval
        );
        (dt, time.max_step_interval)
    } else {
        (dt, carried)
    }
}

/// The mode table. Returns `None` when the mode holds for this tick.
///
/// Only one hop is evaluated per tick and every threshold is strict.
/// `Fallback` has no outgoing edge.
fn transition(
    mode: OperationalMode,
    energy: u32,
    s_repetition: f64,
    time_in_mode: f64,
    time: &TimeConfig,
    policy: &PolicyConfig,
) -> Option<ModeTransition> {
    match mode {
        OperationalMode::Emergency if time_in_mode > time.deadlock_timeout => {
            Some(ModeTransition {
                mode: OperationalMode::Cooldown,
                energy,
            })
        }
        OperationalMode::Cooldown if time_in_mode > policy.cooldown_duration => {
            Some(ModeTransition {
                mode: OperationalMode::Standard,
                energy: energy
                    .saturating_add(policy.recharge_on_cooldown)
                    .min(policy.max_energy),
            })
        }
        OperationalMode::Standard if s_repetition > policy.repetition_threshold => {
            if energy >= policy.emergency_cost {
                Some(ModeTransition {
                    mode: OperationalMode::Emergency,
                    energy: energy - policy.emergency_cost,
                })
            } else {
                Some(ModeTransition {
                    mode: OperationalMode::Fallback,
                    energy: 0,
                })
            }
        }
        OperationalMode::Standard | OperationalMode::Emergency | OperationalMode::Cooldown => None,
        OperationalMode::Fallback => None,
    }
}

fn directive(mode: OperationalMode, policy: &PolicyConfig) -> SamplingConfig {
    SamplingConfig::new(policy.temperatures.for_mode(mode))
}

fn ema(prev: f64, raw: f64, alpha: f64) -> f64 {
    (1.0 - alpha) * prev + alpha * raw
}

fn log_transition(from: OperationalMode, to: ModeTransition, s_repetition: f64) {
    if to.mode == OperationalMode::Fallback {
        log::error!(
            "Kernel: {} -> FBK, energy cannot cover an emergency (repetition={:.2}). Lineage is terminal.",
            from,
            s_repetition
        );
    } else {
        log::info!(
            "Kernel: {} -> {} (energy={}, repetition={:.2}).",
            from,
            to.mode,
            to.energy,
            s_repetition
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn metrics(repetition: f64) -> RawMetrics {
        RawMetrics::new(0.5, 0.0, repetition).unwrap()
    }

    fn instant_config() -> ControllerConfig {
        let mut cfg = ControllerConfig::default();
        cfg.policy.smoothing_alpha = 1.0;
        cfg
    }

    #[test]
    fn test_anti_stutter_buffers_tiny_ticks() {
        let cfg = ControllerConfig::default();
        let state = SystemState::initial(0.0);

        let next = step(metrics(0.5), &state, 0.001, &cfg);

        assert!(!next.step_performed);
        assert_eq!(next.active_config, None);
        assert_relative_eq!(next.pending_dt, 0.001);
        assert_eq!(next.last_call_time, 0.001);
        assert_eq!(next.logical_time, state.logical_time);
        assert_eq!(next.s_repetition, state.s_repetition);
        assert_eq!(next.mode, state.mode);
        assert_eq!(next.energy, state.energy);
    }

    #[test]
    fn test_buffered_time_is_applied_later() {
        let cfg = ControllerConfig::default();
        let mut state = SystemState::initial(0.0);
        for i in 1..=3 {
            state = step(metrics(0.1), &state, i as f64 * 0.003, &cfg);
            assert!(!state.step_performed);
        }
        // 0.012s accumulated crosses the 0.01s gate.
        let next = step(metrics(0.1), &state, 0.012, &cfg);
        assert!(next.step_performed);
        assert_relative_eq!(next.logical_time, 0.012, epsilon = 1e-12);
        assert_eq!(next.pending_dt, 0.0);
    }

    #[test]
    fn test_logical_step_is_clamped() {
        let cfg = ControllerConfig::default();
        let state = SystemState::initial(0.0);

        let next = step(metrics(0.1), &state, 0.15, &cfg);

        assert_relative_eq!(next.logical_time, 0.1);
        assert_relative_eq!(next.pending_dt, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_large_debt_is_bounded() {
        let cfg = ControllerConfig::default();
        let state = SystemState::initial(0.0);

        let next = step(metrics(0.1), &state, 10_000.0, &cfg);

        assert_relative_eq!(next.logical_time, cfg.time.max_step_interval);
        assert!(next.pending_dt <= cfg.time.max_step_interval);
        assert_eq!(next.time_state, TimeState::Lag);
    }

    #[test]
    fn test_standard_to_emergency() {
        let cfg = instant_config();
        let state = SystemState::initial(0.0);

        let next = step(metrics(0.9), &state, 1.0, &cfg);

        assert_eq!(next.mode, OperationalMode::Emergency);
        assert_eq!(next.energy, 7);
        assert_eq!(next.s_repetition, 0.9);
        assert_eq!(next.mode_entry_time, next.logical_time);
        assert_eq!(next.temperature(), Some(1.2));
    }

    #[test]
    fn test_threshold_is_strict() {
        let cfg = instant_config();
        let state = SystemState::initial(0.0);

        let next = step(metrics(0.6), &state, 1.0, &cfg);

        assert_eq!(next.mode, OperationalMode::Standard);
        assert_eq!(next.energy, 10);
    }

    #[test]
    fn test_depleted_energy_falls_back() {
        let cfg = instant_config();
        let state = SystemState {
            energy: 2,
            ..SystemState::initial(0.0)
        };

        let next = step(metrics(0.9), &state, 1.0, &cfg);

        assert_eq!(next.mode, OperationalMode::Fallback);
        assert_eq!(next.energy, 0);
        assert_eq!(next.temperature(), Some(0.1));
    }

    #[test]
    fn test_fallback_freezes_energy_but_smooths() {
        let cfg = ControllerConfig::default();
        let state = SystemState {
            mode: OperationalMode::Fallback,
            energy: 0,
            mode_entry_time: 0.0,
            ..SystemState::initial(0.0)
        };

        let raw = RawMetrics::new(0.9, 0.0, 0.8).unwrap();
        let next = step(raw, &state, 1.0, &cfg);

        assert_eq!(next.mode, OperationalMode::Fallback);
        assert_eq!(next.energy, 0);
        assert_eq!(next.mode_entry_time, 0.0);
        assert_relative_eq!(next.s_entropy, 0.7 * 0.5 + 0.3 * 0.9, epsilon = 1e-12);
        assert_relative_eq!(next.s_repetition, 0.3 * 0.8, epsilon = 1e-12);
        assert_eq!(next.temperature(), Some(0.1));
        assert!(next.step_performed);
    }

    #[test]
    fn test_cooldown_recharges_on_exit() {
        let cfg = ControllerConfig::default();
        let mut state = SystemState {
            mode: OperationalMode::Cooldown,
            energy: 7,
            ..SystemState::initial(0.0)
        };

        for i in 1..=25 {
            state = step(metrics(0.1), &state, i as f64 * 0.1, &cfg);
        }

        assert_eq!(state.mode, OperationalMode::Standard);
        assert_eq!(state.energy, 8);
    }

    #[test]
    fn test_one_hop_per_tick() {
        // Cooldown exits into Standard with high repetition: Standard's own
        // escalation must wait for the next tick.
        let cfg = instant_config();
        let state = SystemState {
            mode: OperationalMode::Cooldown,
            energy: 5,
            logical_time: 2.05,
            ..SystemState::initial(0.0)
        };

        let next = step(metrics(0.95), &state, 0.1, &cfg);
        assert_eq!(next.mode, OperationalMode::Standard);
        assert_eq!(next.energy, 6);

        let after = step(metrics(0.95), &next, 0.2, &cfg);
        assert_eq!(after.mode, OperationalMode::Emergency);
        assert_eq!(after.energy, 3);
    }

    #[test]
    fn test_gap_reset_fires_once() {
        let cfg = ControllerConfig::default();
        let state = SystemState {
            energy: 2,
            ..SystemState::initial(0.0)
        };

        let first = step(metrics(0.1), &state, 86_401.0, &cfg);
        assert_eq!(first.time_state, TimeState::Gap);
        assert!(first.reset_used);
        assert_eq!(first.energy, 7);

        let depleted = SystemState {
            energy: 2,
            ..first
        };
        let second = step(metrics(0.1), &depleted, 2.0 * 86_401.0, &cfg);
        assert_eq!(second.time_state, TimeState::Gap);
        assert_eq!(second.energy, 2);
        assert!(second.reset_used);
    }

    #[test]
    fn test_gap_reset_clamped_to_max() {
        let cfg = ControllerConfig::default();
        let state = SystemState {
            energy: 9,
            ..SystemState::initial(0.0)
        };
        let next = step(metrics(0.1), &state, 90_000.0, &cfg);
        assert_eq!(next.energy, 10);
    }

    #[test]
    fn test_clock_regression_is_absorbed() {
        let cfg = ControllerConfig::default();
        let state = step(metrics(0.1), &SystemState::initial(0.0), 5.0, &cfg);

        let next = step(metrics(0.1), &state, 3.0, &cfg);

        assert_eq!(next.last_call_time, 5.0);
        assert!(next.logical_time >= state.logical_time);
        assert!(next.pending_dt >= 0.0);
    }

    #[test]
    fn test_nan_timestamp_is_absorbed() {
        let cfg = ControllerConfig::default();
        let state = SystemState::initial(10.0);

        let next = step(metrics(0.1), &state, f64::NAN, &cfg);

        assert_eq!(next.last_call_time, 10.0);
        assert!(!next.step_performed);
    }

    #[test]
    fn test_infinite_timestamp_is_absorbed() {
        let cfg = ControllerConfig::default();
        let start = 1_700_000_000.0;
        let mut state = step(metrics(0.1), &SystemState::initial(start), f64::INFINITY, &cfg);
        assert_eq!(state.last_call_time, start);
        assert!(!state.step_performed);

        for k in 1..=3 {
            state = step(metrics(0.1), &state, start + 0.001 * k as f64, &cfg);
            assert!(state.pending_dt.is_finite());
            assert!(!state.step_performed);
            assert_eq!(state.time_state, TimeState::Sync);
        }

        let next = step(metrics(0.1), &state, start + 0.05, &cfg);
        assert!(next.step_performed);
        assert!(next.pending_dt < cfg.time.max_step_interval + cfg.time.min_step_interval);
        assert!(next.context_note.is_empty());
    }

    #[test]
    fn test_transition_table_has_no_exit_from_fallback() {
        let cfg = ControllerConfig::default();
        for rep in [0.0, 0.5, 0.99] {
            for t in [0.0, 3.0, 100.0] {
                for energy in [0, 3, 10] {
                    assert_eq!(
                        transition(
                            OperationalMode::Fallback,
                            energy,
                            rep,
                            t,
                            &cfg.time,
                            &cfg.policy
                        ),
                        None
                    );
                }
            }
        }
    }
}
