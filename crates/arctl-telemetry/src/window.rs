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

//! Fixed-size rolling window over recent samples.

/// A circular buffer of the last `N` samples with summary statistics.
#[derive(Debug, Clone)]
pub struct RollingWindow<const N: usize> {
    data: [f64; N],
    index: usize,
    count: usize,
}

impl<const N: usize> Default for RollingWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RollingWindow<N> {
    /// Creates an empty window.
    pub fn new() -> Self {
        Self {
            data: [0.0; N],
            index: 0,
            count: 0,
        }
    }

    /// Pushes a sample, overwriting the oldest once full.
    pub fn push(&mut self, value: f64) {
        if N == 0 {
            return;
        }
        self.data[self.index] = value;
        self.index = (self.index + 1) % N;
        if self.count < N {
            self.count += 1;
        }
    }

    /// Number of samples held.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        let (newer, older) = self.data.split_at(self.index);
        // While filling, the slots past `index` are still unused.
        let older = if self.count < N { &older[..0] } else { older };
        older.iter().chain(newer.iter())
    }

    /// Arithmetic mean, `0.0` when empty.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.iter().sum::<f64>() / self.count as f64
    }

    /// Mean of the newer half minus mean of the older half.
    /// Positive when the signal is rising.
    pub fn trend(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let half = self.count / 2;
        let older: f64 = self.iter().take(half).sum::<f64>() / half as f64;
        let newer: f64 = self.iter().skip(self.count - half).sum::<f64>() / half as f64;
        newer - older
    }

    /// Population variance, `0.0` under two samples.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let avg = self.average();
        self.iter().map(|v| (v - avg) * (v - avg)).sum::<f64>() / self.count as f64
    }
}
