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

//! Detection of hedging and refusal language in model output.

/// Marker phrases and their weights. A refusal outranks a hedge.
const MARKERS: &[(&str, f64)] = &[
    ("maybe", 0.2),
    ("possibly", 0.2),
    ("perhaps", 0.2),
    ("not sure", 0.5),
    ("unclear", 0.4),
    ("i think", 0.3),
    ("it seems", 0.3),
    ("as an ai", 0.9),
    ("i cannot", 0.9),
    ("sorry", 0.8),
];

/// Scores epistemic uncertainty from `0.0` (confident) to `1.0` (refusal).
pub struct UncertaintyScorer;

impl UncertaintyScorer {
    /// Returns the highest marker weight found in `text`, case-insensitively.
    pub fn scan(text: &str) -> f64 {
        let lower = text.to_lowercase();
        MARKERS
            .iter()
            .filter(|(phrase, _)| lower.contains(phrase))
            .map(|&(_, weight)| weight)
            .fold(0.0, f64::max)
    }
}
