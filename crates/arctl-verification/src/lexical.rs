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

//! Lexical proxies for the controller's quality signals.
//!
//! Cheap, model-free estimates computed over the tail of the token history:
//! trigram overlap stands in for repetition, vocabulary diversity for
//! entropy. Divergence needs semantic context and is reported as zero.

use arctl_core::{MetricExtractor, RawMetrics};
use std::collections::HashSet;

/// Default number of trailing tokens inspected.
pub const DEFAULT_WINDOW: usize = 50;
/// N-gram size used for the repetition score.
const NGRAM_SIZE: usize = 3;
/// Diversity is scaled up so ordinary prose sits near the top of the range.
const DIVERSITY_GAIN: f64 = 1.5;

/// Extracts [`RawMetrics`] from a token history.
#[derive(Debug, Clone, Copy)]
pub struct LexicalMetrics {
    window: usize,
}

impl Default for LexicalMetrics {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl LexicalMetrics {
    /// Creates an extractor looking at the last `window` tokens (at least one).
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    /// Size of the trailing window.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Computes metrics for `history`.
    pub fn calculate<S: AsRef<str>>(&self, history: &[S]) -> RawMetrics {
        if history.is_empty() {
            return RawMetrics::neutral();
        }

        let start = history.len().saturating_sub(self.window);
        let recent: Vec<&str> = history[start..].iter().map(AsRef::as_ref).collect();

        let repetition = repetition_score(&recent);

        let vocab: HashSet<&str> = recent.iter().copied().collect();
        let diversity = vocab.len() as f64 / recent.len() as f64;
        let entropy = diversity * DIVERSITY_GAIN;

        log::trace!(
            "Lexical: {} tokens, repetition={:.3}, diversity={:.3}",
            recent.len(),
            repetition,
            diversity
        );
        RawMetrics::clamped(entropy, 0.0, repetition)
    }
}

/// `1 - unique/total` over the window's trigrams; zero under three tokens.
fn repetition_score(tokens: &[&str]) -> f64 {
    if tokens.len() < NGRAM_SIZE {
        return 0.0;
    }
    let ngrams: Vec<&[&str]> = tokens.windows(NGRAM_SIZE).collect();
    let unique: HashSet<&[&str]> = ngrams.iter().copied().collect();
    1.0 - unique.len() as f64 / ngrams.len() as f64
}

impl MetricExtractor for LexicalMetrics {
    fn extract(&self, history: &[String]) -> RawMetrics {
        self.calculate(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tokens(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    #[test]
    fn test_empty_history_is_neutral() {
        let m = LexicalMetrics::default().calculate::<&str>(&[]);
        assert_eq!(m, RawMetrics::neutral());
    }

    #[test]
    fn test_short_history_has_no_repetition() {
        let m = LexicalMetrics::default().calculate(&tokens("hello world"));
        assert_eq!(m.repetition(), 0.0);
        assert_eq!(m.entropy(), 1.0);
    }

    #[test]
    fn test_distinct_tokens_score_zero_repetition() {
        let m = LexicalMetrics::default()
            .calculate(&tokens("the quick brown fox jumps over the lazy dog"));
        assert_eq!(m.repetition(), 0.0);
        assert_eq!(m.divergence(), 0.0);
    }

    #[test]
    fn test_looping_text_scores_high_repetition() {
        let looped = "I am a loop ".repeat(10);
        let m = LexicalMetrics::default().calculate(&tokens(&looped));
        // 40 tokens, 38 trigrams, 4 unique.
        assert_relative_eq!(m.repetition(), 1.0 - 4.0 / 38.0, epsilon = 1e-12);
        assert_relative_eq!(m.entropy(), 4.0 / 40.0 * 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_window_limits_history() {
        let spam = "spam ".repeat(100);
        let mut history = tokens(&spam);
        history.extend(tokens("a b c d e"));
        let m = LexicalMetrics::new(5).calculate(&history);
        assert_eq!(m.repetition(), 0.0);
    }

    #[test]
    fn test_extractor_trait_on_owned_tokens() {
        let history: Vec<String> = "x y x y x y".split(' ').map(String::from).collect();
        let extractor: &dyn MetricExtractor = &LexicalMetrics::default();
        let m = extractor.extract(&history);
        // Trigrams: xyx yxy xyx yxy -> 2 unique of 4.
        assert_relative_eq!(m.repetition(), 0.5, epsilon = 1e-12);
    }
}
