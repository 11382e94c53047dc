//! Improvement scoring for candidate prompts.
//!
//! `compute_score` is a pure function: given the weight configuration, a
//! batch of failed calls, the candidate prompt text, the objectives, and
//! before/after metric snapshots, it produces an additive breakdown of
//! independently capped components. Diversity of failure categories is
//! weighted more heavily than raw volume, so a run cannot be inflated by
//! submitting many duplicate failures.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::models::FailedCall;

static NON_ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s]+").expect("static pattern"));

/// Lower-case and strip punctuation for lightweight substring matching.
fn normalize_text(value: &str) -> String {
    let lowered = value.to_lowercase();
    NON_ALNUM_RE.replace_all(&lowered, " ").trim().to_string()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Configuration knobs for the improvement score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoreConfig {
    #[serde(default = "default_base_score")]
    pub base_score: f64,
    #[serde(default = "default_max_total")]
    pub max_total: f64,

    #[serde(default = "default_failure_unique_weight")]
    pub failure_unique_weight: f64,
    #[serde(default = "default_failure_unique_cap")]
    pub failure_unique_cap: f64,
    #[serde(default = "default_failure_volume_weight")]
    pub failure_volume_weight: f64,
    #[serde(default = "default_failure_volume_cap")]
    pub failure_volume_cap: f64,

    #[serde(default = "default_objective_weight")]
    pub objective_weight: f64,
    #[serde(default = "default_prompt_length_cap")]
    pub prompt_length_cap: f64,
    #[serde(default = "default_prompt_length_reference")]
    pub prompt_length_reference: f64,

    #[serde(default = "default_conversion_delta_weight")]
    pub conversion_delta_weight: f64,
    #[serde(default = "default_conversion_delta_cap")]
    pub conversion_delta_cap: f64,

    #[serde(default = "default_true")]
    pub enable_objective_match: bool,
    #[serde(default = "default_true")]
    pub enable_conversion_delta: bool,
}

const fn default_base_score() -> f64 {
    0.08
}
const fn default_max_total() -> f64 {
    0.6
}
const fn default_failure_unique_weight() -> f64 {
    0.04
}
const fn default_failure_unique_cap() -> f64 {
    0.16
}
const fn default_failure_volume_weight() -> f64 {
    0.01
}
const fn default_failure_volume_cap() -> f64 {
    0.06
}
const fn default_objective_weight() -> f64 {
    0.25
}
const fn default_prompt_length_cap() -> f64 {
    0.05
}
const fn default_prompt_length_reference() -> f64 {
    450.0
}
const fn default_conversion_delta_weight() -> f64 {
    0.5
}
const fn default_conversion_delta_cap() -> f64 {
    0.2
}
const fn default_true() -> bool {
    true
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            base_score: default_base_score(),
            max_total: default_max_total(),
            failure_unique_weight: default_failure_unique_weight(),
            failure_unique_cap: default_failure_unique_cap(),
            failure_volume_weight: default_failure_volume_weight(),
            failure_volume_cap: default_failure_volume_cap(),
            objective_weight: default_objective_weight(),
            prompt_length_cap: default_prompt_length_cap(),
            prompt_length_reference: default_prompt_length_reference(),
            conversion_delta_weight: default_conversion_delta_weight(),
            conversion_delta_cap: default_conversion_delta_cap(),
            enable_objective_match: default_true(),
            enable_conversion_delta: default_true(),
        }
    }
}

/// Raw score components. `total()` is unclamped; clamping to
/// `[0, max_total]` happens only when rendering via [`components`].
///
/// [`components`]: ScoreBreakdown::components
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub failure_mix: f64,
    pub objective_alignment: f64,
    pub prompt_quality: f64,
    pub conversion_delta_score: f64,
    pub conversion_delta_rate: f64,
    pub objective_coverage_ratio: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.base
            + self.failure_mix
            + self.objective_alignment
            + self.prompt_quality
            + self.conversion_delta_score
    }

    /// Presentation form: every component rounded to 4 decimal digits,
    /// total clamped to `[0, max_total]`.
    pub fn components(&self, max_total: f64) -> ScoreComponents {
        let total = self.total().clamp(0.0, max_total);
        ScoreComponents {
            base: round4(self.base),
            failure_mix: round4(self.failure_mix),
            objective_alignment: round4(self.objective_alignment),
            prompt_quality: round4(self.prompt_quality),
            conversion_delta_score: round4(self.conversion_delta_score),
            conversion_delta_rate: round4(self.conversion_delta_rate),
            objective_coverage_ratio: round4(self.objective_coverage_ratio),
            total: round4(total),
        }
    }
}

/// Serialized score breakdown as persisted on optimization runs and
/// averaged in store metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoreComponents {
    #[serde(default)]
    pub base: f64,
    #[serde(default)]
    pub failure_mix: f64,
    #[serde(default)]
    pub objective_alignment: f64,
    #[serde(default)]
    pub prompt_quality: f64,
    #[serde(default)]
    pub conversion_delta_score: f64,
    #[serde(default)]
    pub conversion_delta_rate: f64,
    #[serde(default)]
    pub objective_coverage_ratio: f64,
    #[serde(default)]
    pub total: f64,
}

impl ScoreComponents {
    /// Per-component arithmetic mean. Returns the zero breakdown for an
    /// empty input.
    pub fn mean(items: &[ScoreComponents]) -> ScoreComponents {
        if items.is_empty() {
            return ScoreComponents::default();
        }
        #[allow(clippy::cast_precision_loss)]
        let count = items.len() as f64;
        ScoreComponents {
            base: round4(items.iter().map(|c| c.base).sum::<f64>() / count),
            failure_mix: round4(items.iter().map(|c| c.failure_mix).sum::<f64>() / count),
            objective_alignment: round4(
                items.iter().map(|c| c.objective_alignment).sum::<f64>() / count,
            ),
            prompt_quality: round4(items.iter().map(|c| c.prompt_quality).sum::<f64>() / count),
            conversion_delta_score: round4(
                items.iter().map(|c| c.conversion_delta_score).sum::<f64>() / count,
            ),
            conversion_delta_rate: round4(
                items.iter().map(|c| c.conversion_delta_rate).sum::<f64>() / count,
            ),
            objective_coverage_ratio: round4(
                items.iter().map(|c| c.objective_coverage_ratio).sum::<f64>() / count,
            ),
            total: round4(items.iter().map(|c| c.total).sum::<f64>() / count),
        }
    }
}

fn conversion_rate(snapshot: &serde_json::Value) -> f64 {
    snapshot
        .get("conversion_rate")
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(0.0)
}

/// Compute the improvement score breakdown for a candidate prompt.
///
/// Deterministic and side-effect free. Each component respects its
/// configured cap; the conversion delta is the only component that can
/// go negative, penalizing rewrites that coincide with a conversion-rate
/// regression.
#[allow(clippy::cast_precision_loss)]
pub fn compute_score(
    config: &ScoreConfig,
    failed_calls: &[FailedCall],
    prompt_text: &str,
    objectives: &[String],
    current_metrics: Option<&serde_json::Value>,
    previous_metrics: Option<&serde_json::Value>,
) -> ScoreBreakdown {
    let unique_failures: HashSet<&str> = failed_calls
        .iter()
        .filter_map(|call| call.failure_reason.as_deref())
        .filter(|reason| !reason.is_empty())
        .collect();

    let failure_unique_score = (unique_failures.len() as f64 * config.failure_unique_weight)
        .min(config.failure_unique_cap);
    let failure_volume_score =
        (failed_calls.len() as f64 * config.failure_volume_weight).min(config.failure_volume_cap);
    let failure_mix = failure_unique_score + failure_volume_score;

    let prompt_tokens = prompt_text.split_whitespace().count().max(1);
    let length_ratio = prompt_tokens as f64 / config.prompt_length_reference.max(1.0);
    let prompt_quality = length_ratio.min(1.0) * config.prompt_length_cap;

    let mut objective_alignment = 0.0;
    let mut objective_coverage_ratio = 0.0;
    if config.enable_objective_match && !objectives.is_empty() {
        let normalized_prompt = normalize_text(prompt_text);
        let matches = objectives
            .iter()
            .map(|objective| normalize_text(objective))
            .filter(|key| !key.is_empty() && normalized_prompt.contains(key.as_str()))
            .count();
        objective_coverage_ratio = matches as f64 / objectives.len() as f64;
        objective_alignment = objective_coverage_ratio * config.objective_weight;
    }

    let mut conversion_delta_rate = 0.0;
    if config.enable_conversion_delta {
        if let (Some(current), Some(previous)) = (current_metrics, previous_metrics) {
            conversion_delta_rate = conversion_rate(current) - conversion_rate(previous);
        }
    }
    let conversion_delta_score = (conversion_delta_rate * config.conversion_delta_weight)
        .clamp(-config.conversion_delta_cap, config.conversion_delta_cap);

    ScoreBreakdown {
        base: config.base_score,
        failure_mix,
        objective_alignment,
        prompt_quality,
        conversion_delta_score,
        conversion_delta_rate,
        objective_coverage_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(reason: Option<&str>) -> FailedCall {
        FailedCall {
            transcript: "transcript".to_string(),
            customer_id: None,
            summary: None,
            failure_reason: reason.map(str::to_string),
        }
    }

    #[test]
    fn test_empty_inputs_yield_base_score_only() {
        let config = ScoreConfig::default();
        let breakdown = compute_score(&config, &[], "", &[], None, None);

        assert!((breakdown.failure_mix - 0.0).abs() < f64::EPSILON);
        assert!((breakdown.objective_alignment - 0.0).abs() < f64::EPSILON);
        assert!((breakdown.conversion_delta_score - 0.0).abs() < f64::EPSILON);
        assert!((breakdown.conversion_delta_rate - 0.0).abs() < f64::EPSILON);
        // Empty prompt still counts as one token.
        assert!(breakdown.prompt_quality > 0.0);
        assert!((breakdown.base - 0.08).abs() < f64::EPSILON);
    }

    #[test]
    fn test_objective_match_coverage() {
        let config = ScoreConfig::default();
        let breakdown = compute_score(
            &config,
            &[call(Some("no_slots"))],
            "Always apologise and offer a waitlist option if slots are full.",
            &["apologise".to_string(), "waitlist".to_string()],
            None,
            None,
        );

        assert!((breakdown.objective_coverage_ratio - 1.0).abs() < 1e-9);
        assert!((breakdown.objective_alignment - config.objective_weight).abs() < 1e-9);
    }

    #[test]
    fn test_objective_match_is_punctuation_insensitive() {
        let config = ScoreConfig::default();
        let breakdown = compute_score(
            &config,
            &[],
            "Don't forget: offer a call-back!",
            &["call back".to_string()],
            None,
            None,
        );
        assert!((breakdown.objective_coverage_ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_adding_matching_objective_never_lowers_coverage() {
        let config = ScoreConfig::default();
        let prompt = "Apologise, then offer the waitlist.";
        let base = compute_score(
            &config,
            &[],
            prompt,
            &["apologise".to_string()],
            None,
            None,
        );
        let extended = compute_score(
            &config,
            &[],
            prompt,
            &["apologise".to_string(), "waitlist".to_string()],
            None,
            None,
        );
        assert!(extended.objective_coverage_ratio >= base.objective_coverage_ratio);
    }

    #[test]
    fn test_failure_components_respect_caps() {
        let config = ScoreConfig::default();
        let calls: Vec<FailedCall> = (0..50)
            .map(|i| call(Some(["a", "b", "c", "d", "e", "f", "g"][i % 7])))
            .collect();
        let breakdown = compute_score(&config, &calls, "Prompt text", &[], None, None);

        // 7 unique reasons * 0.04 = 0.28, capped at 0.16; 50 calls * 0.01
        // = 0.5, capped at 0.06.
        assert!(
            (breakdown.failure_mix - (config.failure_unique_cap + config.failure_volume_cap))
                .abs()
                < 1e-9
        );
    }

    #[test]
    fn test_duplicate_failure_reasons_count_once() {
        let config = ScoreConfig::default();
        let calls = vec![call(Some("no_slots")), call(Some("no_slots"))];
        let breakdown = compute_score(&config, &calls, "Prompt text", &[], None, None);
        let expected = config.failure_unique_weight + 2.0 * config.failure_volume_weight;
        assert!((breakdown.failure_mix - expected).abs() < 1e-9);
    }

    #[test]
    fn test_positive_conversion_delta() {
        let config = ScoreConfig::default();
        let breakdown = compute_score(
            &config,
            &[call(Some("hang_up"))],
            "Prompt text",
            &[],
            Some(&json!({"conversion_rate": 0.72})),
            Some(&json!({"conversion_rate": 0.55})),
        );
        assert!((breakdown.conversion_delta_rate - 0.17).abs() < 1e-9);
        assert!(breakdown.conversion_delta_score > 0.0);
    }

    #[test]
    fn test_negative_conversion_delta() {
        let config = ScoreConfig::default();
        let breakdown = compute_score(
            &config,
            &[call(Some("hang_up"))],
            "Prompt text",
            &[],
            Some(&json!({"conversion_rate": 0.4})),
            Some(&json!({"conversion_rate": 0.6})),
        );
        assert!((breakdown.conversion_delta_rate - (-0.2)).abs() < 1e-9);
        assert!(breakdown.conversion_delta_score < 0.0);
    }

    #[test]
    fn test_negative_conversion_delta_is_capped() {
        let config = ScoreConfig::default();
        let breakdown = compute_score(
            &config,
            &[call(Some("hang_up"))],
            "Prompt text",
            &[],
            Some(&json!({"conversion_rate": 0.0})),
            Some(&json!({"conversion_rate": 1.0})),
        );
        assert!((breakdown.conversion_delta_rate - (-1.0)).abs() < 1e-9);
        assert!(
            (breakdown.conversion_delta_score - (-config.conversion_delta_cap)).abs() < 1e-9
        );
    }

    #[test]
    fn test_non_numeric_conversion_rate_treated_as_zero() {
        let config = ScoreConfig::default();
        let breakdown = compute_score(
            &config,
            &[],
            "Prompt text",
            &[],
            Some(&json!({"conversion_rate": "broken"})),
            Some(&json!({})),
        );
        assert!((breakdown.conversion_delta_rate - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_conversion_delta_requires_both_snapshots() {
        let config = ScoreConfig::default();
        let breakdown = compute_score(
            &config,
            &[],
            "Prompt text",
            &[],
            Some(&json!({"conversion_rate": 0.9})),
            None,
        );
        assert!((breakdown.conversion_delta_rate - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_prompt_quality_saturates_at_reference_length() {
        let config = ScoreConfig::default();
        let long_prompt = "word ".repeat(1000);
        let breakdown = compute_score(&config, &[], &long_prompt, &[], None, None);
        assert!((breakdown.prompt_quality - config.prompt_length_cap).abs() < 1e-9);
    }

    #[test]
    fn test_total_clamped_at_presentation_time() {
        let config = ScoreConfig {
            base_score: 1.5,
            ..ScoreConfig::default()
        };
        let breakdown = compute_score(&config, &[], "Prompt text", &[], None, None);
        assert!(breakdown.total() > config.max_total);
        let components = breakdown.components(config.max_total);
        assert!((components.total - config.max_total).abs() < 1e-9);
    }

    #[test]
    fn test_components_rounding() {
        let breakdown = ScoreBreakdown {
            base: 0.123_456,
            failure_mix: 0.0,
            objective_alignment: 0.0,
            prompt_quality: 0.0,
            conversion_delta_score: 0.0,
            conversion_delta_rate: 0.0,
            objective_coverage_ratio: 0.0,
        };
        let components = breakdown.components(0.6);
        assert!((components.base - 0.1235).abs() < 1e-9);
        assert!((components.total - 0.1235).abs() < 1e-9);
    }

    #[test]
    fn test_disabled_toggles_zero_out_components() {
        let config = ScoreConfig {
            enable_objective_match: false,
            enable_conversion_delta: false,
            ..ScoreConfig::default()
        };
        let breakdown = compute_score(
            &config,
            &[],
            "apologise",
            &["apologise".to_string()],
            Some(&json!({"conversion_rate": 0.9})),
            Some(&json!({"conversion_rate": 0.1})),
        );
        assert!((breakdown.objective_alignment - 0.0).abs() < f64::EPSILON);
        assert!((breakdown.conversion_delta_score - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mean_of_components() {
        let a = ScoreComponents {
            base: 0.08,
            total: 0.2,
            ..ScoreComponents::default()
        };
        let b = ScoreComponents {
            base: 0.08,
            total: 0.4,
            ..ScoreComponents::default()
        };
        let mean = ScoreComponents::mean(&[a, b]);
        assert!((mean.base - 0.08).abs() < 1e-9);
        assert!((mean.total - 0.3).abs() < 1e-9);

        assert_eq!(ScoreComponents::mean(&[]), ScoreComponents::default());
    }
}
