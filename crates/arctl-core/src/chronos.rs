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

//! Chronos: temporal classification of the gap between two ticks.
//!
//! A generation model has no sense of elapsed real time. Chronos classifies
//! the wall-clock gap since the previous tick and, when the gap is large
//! enough to matter, produces a note that a prompt injector can prepend so the
//! model treats the interval as a discontinuity.
//!
//! | Gap | State | Note |
//! |---|---|---|
//! | `< 60s` | `Sync` | empty |
//! | `60s ..< 86400s` | `Lag` | elapsed minutes + reality anchor |
//! | `>= 86400s` | `Gap` | same, plus a context-reset recommendation |

use crate::state::TimeState;
use chrono::{DateTime, Utc};

/// Gaps shorter than this are continuous interaction.
pub const SYNC_WINDOW_SECS: f64 = 60.0;
/// Gaps at least this long are a reality shift.
pub const GAP_THRESHOLD_SECS: f64 = 86_400.0;

/// Classifies the gap between `prev_ts` and `now_ts` (wall-clock seconds).
///
/// The caller guarantees `now_ts >= prev_ts`; the kernel clamps before
/// calling. The anchor date is rendered in UTC so the note depends only on
/// the inputs.
pub fn classify(prev_ts: f64, now_ts: f64) -> (TimeState, String) {
    let delta = now_ts - prev_ts;

    let state = if delta < SYNC_WINDOW_SECS {
        TimeState::Sync
    } else if delta < GAP_THRESHOLD_SECS {
        TimeState::Lag
    } else {
        TimeState::Gap
    };

    // No note on continuous flow, to keep every tick from injecting noise.
    if state == TimeState::Sync {
        return (state, String::new());
    }

    let anchor = format_anchor(now_ts);
    let minutes = (delta / 60.0).floor() as u64;
    let mut note = format!(
        "[SYSTEM]: TEMPORAL SYNC.\n\
         Previous Interaction: {minutes} min ago.\n\
         Current Reality Anchor: {anchor}.\n\
         NOTE: Treat all documents/events prior to {anchor} as PAST or PRESENT."
    );
    if state == TimeState::Gap {
        note.push_str("\nREALITY SHIFT: over a day has passed. Consider resetting the conversation context.");
    }

    log::debug!("Chronos: {state} after {delta:.1}s.");
    (state, note)
}

fn format_anchor(ts: f64) -> String {
    to_datetime(ts)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| format!("t={ts:.0}s"))
}

fn to_datetime(ts: f64) -> Option<DateTime<Utc>> {
    if !ts.is_finite() {
        return None;
    }
    let secs = ts.floor();
    if secs < i64::MIN as f64 || secs > i64::MAX as f64 {
        return None;
    }
    let nanos = (((ts - secs) * 1e9) as u32).min(999_999_999);
    DateTime::from_timestamp(secs as i64, nanos)
}
