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

//! Seams to the collaborators around the kernel.

use crate::state::RawMetrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Turns a token history into one tick of raw metrics.
///
/// Implementations must return finite values in `[0, 1]`; anything built
/// through [`RawMetrics`]'s constructors already satisfies this.
pub trait MetricExtractor: Send + Sync {
    /// Computes metrics for the current history (oldest token first).
    fn extract(&self, history: &[String]) -> RawMetrics;
}

/// Source of wall-clock time, in seconds.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> f64;
}

/// Reads the operating system clock as seconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs_f64(),
            Err(err) => {
                log::warn!("SystemClock: clock is before the UNIX epoch ({err}).");
                0.0
            }
        }
    }
}

/// A settable clock shared between clones, for tests and replays.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    pub fn new(start: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(start.to_bits())),
        }
    }

    /// Jumps to `t`. Going backwards is allowed.
    pub fn set(&self, t: f64) {
        self.bits.store(t.to_bits(), Ordering::SeqCst);
    }

    /// Moves the clock forward by `dt` seconds.
    pub fn advance(&self, dt: f64) {
        let now = self.now();
        self.set(now + dt);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}
