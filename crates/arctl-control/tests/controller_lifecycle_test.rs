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

use anyhow::Result;
use arctl_control::{inject_context, settings, Controller};
use arctl_core::{ControllerConfig, ManualClock, OperationalMode, RawMetrics, TimeState};
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

const FAST_POLICY: &str = r#"
[time]
deadlock_timeout = 0.25

[policy]
max_energy = 6
emergency_cost = 5
smoothing_alpha = 1.0
cooldown_duration = 0.15
"#;

fn looping() -> RawMetrics {
    RawMetrics::new(0.2, 0.1, 0.9).unwrap()
}

#[test]
fn test_settings_file_drives_full_cycle() -> Result<()> {
    // --- ARRANGE ---
    let dir = tempdir()?;
    let path = dir.path().join("arctl.toml");
    std::fs::write(&path, FAST_POLICY)?;
    let config = settings::load(&path)?;
    let clock = ManualClock::new(0.0);
    let mut controller = Controller::with_clock(Arc::new(config), Box::new(clock.clone()))?;

    // --- ACT ---
    let mut modes = vec![controller.status().mode];
    for _ in 0..50 {
        clock.advance(0.1);
        let status = controller.control(looping());
        if modes.last() != Some(&status.mode) {
            modes.push(status.mode);
        }
        if status.fallback {
            break;
        }
    }

    // --- ASSERT ---
    assert_eq!(
        modes,
        vec![
            OperationalMode::Standard,
            OperationalMode::Emergency,
            OperationalMode::Cooldown,
            OperationalMode::Standard,
            OperationalMode::Fallback,
        ]
    );
    let status = controller.status();
    assert_eq!(status.energy, 0);
    assert_eq!(status.temperature, 0.1);
    Ok(())
}

#[test]
fn test_lineages_on_separate_threads() -> Result<()> {
    // --- ARRANGE ---
    let config = Arc::new(ControllerConfig::default());

    // --- ACT ---
    let handles: Vec<_> = [0.0, 0.3, 0.95]
        .into_iter()
        .map(|repetition| {
            let config = Arc::clone(&config);
            thread::spawn(move || {
                let clock = ManualClock::new(0.0);
                let mut controller =
                    Controller::with_clock(config, Box::new(clock.clone())).unwrap();
                for _ in 0..20 {
                    clock.advance(0.05);
                    controller.control(RawMetrics::new(0.5, 0.0, repetition).unwrap());
                }
                controller.status().mode
            })
        })
        .collect();
    let modes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // --- ASSERT ---
    assert_eq!(
        modes,
        vec![
            OperationalMode::Standard,
            OperationalMode::Standard,
            OperationalMode::Emergency,
        ]
    );
    assert_eq!(Arc::strong_count(&config), 1);
    Ok(())
}

#[test]
fn test_restored_lineage_sees_gap() -> Result<()> {
    // --- ARRANGE ---
    let clock = ManualClock::new(1_000.0);
    let config = Arc::new(ControllerConfig::default());
    let mut first = Controller::with_clock(Arc::clone(&config), Box::new(clock.clone()))?;
    for _ in 0..5 {
        clock.advance(0.1);
        first.control(looping());
    }
    assert_eq!(first.status().mode, OperationalMode::Emergency);
    let snapshot = first.snapshot_json()?;
    drop(first);

    // --- ACT ---
    let mut second = Controller::with_clock(config, Box::new(clock.clone()))?;
    second.restore_json(&snapshot)?;
    clock.advance(2.0 * 86_400.0);
    let status = second.control(RawMetrics::neutral());

    // --- ASSERT ---
    assert_eq!(status.time_state, TimeState::Gap);
    assert_eq!(status.energy, 10);
    assert!(second.state().reset_used);
    let prompt = inject_context(second.state(), "where were we?");
    assert!(prompt.contains("REALITY SHIFT"));
    assert!(prompt.ends_with("User query: where were we?"));
    Ok(())
}
