//! Maps free-form category and priority labels from the model onto the fixed
//! taxonomy. Both mappings are total and deterministic.

use strum::IntoEnumIterator;

use crate::models::{AlertCategory, PriorityLevel};

/// Default minimum Jaro-Winkler similarity for a fuzzy match
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Category and priority normalizer
#[derive(Debug, Clone, Copy)]
pub struct CategoryNormalizer {
    threshold: f64,
}

impl Default for CategoryNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl CategoryNormalizer {
    /// `threshold` is clamped to `[0, 1]`; NaN falls back to the default.
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold.is_nan() {
            DEFAULT_SIMILARITY_THRESHOLD
        } else {
            threshold.clamp(0.0, 1.0)
        };
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Exact match on identifier, display name or synonym; else the best fuzzy
    /// match on any of those labels strictly above the threshold; else
    /// `Uncategorized`.
    pub fn normalize_category(&self, raw: &str) -> AlertCategory {
        let key = normalize_key(raw);
        if key.is_empty() {
            return AlertCategory::Uncategorized;
        }

        let exact = AlertCategory::iter().find(|category| {
            normalize_key(category.as_ref()) == key
                || normalize_key(category.display_name()) == key
                || category.synonyms().iter().any(|s| normalize_key(s) == key)
        });
        if let Some(category) = exact {
            return category;
        }

        self.best_fuzzy(&key, AlertCategory::iter().map(|category| {
            let labels = [category.as_ref(), category.display_name()]
                .into_iter()
                .chain(category.synonyms().iter().copied())
                .map(normalize_key)
                .collect();
            (category, labels)
        }))
        .unwrap_or(AlertCategory::Uncategorized)
    }

    /// Same algorithm over priority levels, defaulting to `Medium`.
    pub fn normalize_priority(&self, raw: &str) -> PriorityLevel {
        let key = normalize_key(raw);
        if key.is_empty() {
            return PriorityLevel::default();
        }

        let exact = PriorityLevel::iter().find(|level| {
            normalize_key(level.as_ref()) == key
                || level.synonyms().iter().any(|s| normalize_key(s) == key)
        });
        if let Some(level) = exact {
            return level;
        }

        self.best_fuzzy(
            &key,
            PriorityLevel::iter().map(|level| {
                let labels = std::iter::once(level.as_ref())
                    .chain(level.synonyms().iter().copied())
                    .map(normalize_key)
                    .collect();
                (level, labels)
            }),
        )
        .unwrap_or_default()
    }

    // Ties keep the earlier candidate so the result does not depend on
    // anything but the input.
    fn best_fuzzy<T, I>(&self, key: &str, candidates: I) -> Option<T>
    where
        I: Iterator<Item = (T, Vec<String>)>,
    {
        let mut best: Option<(T, f64)> = None;
        for (value, labels) in candidates {
            let score = labels
                .iter()
                .map(|label| strsim::jaro_winkler(key, label))
                .fold(0.0, f64::max);
            if score > self.threshold && best.as_ref().map_or(true, |(_, s)| score > *s) {
                best = Some((value, score));
            }
        }
        best.map(|(value, _)| value)
    }
}

/// Lowercase, treat `_` and `-` as spaces, collapse whitespace.
fn normalize_key(raw: &str) -> String {
    raw.to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
