//! Objective derivation from observed failure categories.
//!
//! The rule table maps failure-reason codes to objective lists and is
//! loaded once at startup; a `general` entry supplies the fallback when
//! no code matches. The table is external data, treated as read-only.

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use crate::domain::models::FailureReason;

/// Objective used when the rule table has no applicable entry at all.
const DEFAULT_OBJECTIVE: &str = "Improve customer experience and clarity";

/// Failure-reason to objectives rule table.
#[derive(Debug, Clone, Default)]
pub struct ObjectiveRules {
    rules: HashMap<String, Vec<String>>,
}

impl ObjectiveRules {
    pub fn new(rules: HashMap<String, Vec<String>>) -> Self {
        Self { rules }
    }

    /// Load the rule table from a JSON file. A missing or unreadable
    /// file yields an empty table; derivation then falls back to the
    /// built-in default objective.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, Vec<String>>>(&raw) {
                Ok(rules) => Self { rules },
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "invalid objective rules file");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Derive objectives for the given failure reasons, deduplicated
    /// while preserving first-seen order. Unmatched input falls back to
    /// the `general` rule entry, then to the built-in default.
    pub fn derive(&self, failure_reasons: &[Option<FailureReason>]) -> Vec<String> {
        let mut collected: Vec<String> = Vec::new();
        for reason in failure_reasons.iter().flatten() {
            if let Some(objectives) = self.rules.get(reason.as_str()) {
                collected.extend(objectives.iter().cloned());
            }
        }
        if collected.is_empty() {
            collected = self
                .rules
                .get("general")
                .cloned()
                .unwrap_or_else(|| vec![DEFAULT_OBJECTIVE.to_string()]);
        }

        let mut seen = std::collections::HashSet::new();
        collected
            .into_iter()
            .filter(|item| seen.insert(item.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ObjectiveRules {
        let mut rules = HashMap::new();
        rules.insert(
            "no_slots".to_string(),
            vec![
                "Offer a waitlist".to_string(),
                "Apologise for the delay".to_string(),
            ],
        );
        rules.insert(
            "customer_disengaged".to_string(),
            vec![
                "Keep responses short".to_string(),
                "Offer a waitlist".to_string(),
            ],
        );
        rules.insert(
            "general".to_string(),
            vec!["Increase booking conversions".to_string()],
        );
        ObjectiveRules::new(rules)
    }

    #[test]
    fn test_derive_collects_per_reason() {
        let objectives = table().derive(&[Some(FailureReason::NoSlots)]);
        assert_eq!(
            objectives,
            vec!["Offer a waitlist", "Apologise for the delay"]
        );
    }

    #[test]
    fn test_derive_dedupes_preserving_order() {
        let objectives = table().derive(&[
            Some(FailureReason::NoSlots),
            Some(FailureReason::CustomerDisengaged),
        ]);
        assert_eq!(
            objectives,
            vec![
                "Offer a waitlist",
                "Apologise for the delay",
                "Keep responses short",
            ]
        );
    }

    #[test]
    fn test_derive_skips_unparsed_reasons() {
        let objectives = table().derive(&[None, Some(FailureReason::NoSlots), None]);
        assert_eq!(
            objectives,
            vec!["Offer a waitlist", "Apologise for the delay"]
        );
    }

    #[test]
    fn test_derive_falls_back_to_general() {
        let objectives = table().derive(&[None, Some(FailureReason::Unknown)]);
        assert_eq!(objectives, vec!["Increase booking conversions"]);
    }

    #[test]
    fn test_empty_table_uses_builtin_default() {
        let objectives = ObjectiveRules::default().derive(&[Some(FailureReason::NoSlots)]);
        assert_eq!(objectives, vec![DEFAULT_OBJECTIVE]);
    }

    #[test]
    fn test_load_missing_file_yields_empty_table() {
        let rules = ObjectiveRules::load("/nonexistent/objective_rules.json");
        assert_eq!(rules.derive(&[]), vec![DEFAULT_OBJECTIVE]);
    }
}
