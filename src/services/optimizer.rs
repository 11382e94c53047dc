//! Optimization cycle orchestration.
//!
//! One `optimize` call is a single synchronous state transition: resolve
//! the active prompt, derive objectives, request a rewrite, score the
//! composed prompt, and persist the new version plus its run record.
//! Generative failures propagate to the caller; nothing is persisted for
//! a failed cycle.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    FailedCall, OptimizationPayload, OptimizationResult, PromptVersion, RunStatus,
};
use crate::domain::ports::{
    GenerationRequest, MetricsSource, NewRun, PromptRepository, TextGenerator,
};
use crate::domain::scoring::{compute_score, ScoreConfig};
use crate::services::objectives::ObjectiveRules;

const DEFAULT_PROMPT: &str = "\
You are Ava, the virtual assistant for a service business. Your responsibilities:
- Diagnose customer intent quickly.
- Confirm account details and preferred appointment slots.
- Offer relevant follow-ups when appropriate.
- Remain polite, concise, and confident.

Always summarize the outcome and confirm next steps before ending the conversation.";

const REWRITE_SYSTEM_PROMPT: &str =
    "You are a prompt engineering expert improving contact-center conversational agents.";

const REWRITE_MAX_TOKENS: u32 = 256;
const REWRITE_TEMPERATURE: f32 = 0.4;

/// How many listed versions are searched for an explicitly requested one.
const VERSION_SEARCH_DEPTH: i64 = 50;

fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

/// Orchestrates prompt optimization cycles.
pub struct PromptOptimizer {
    repository: Arc<dyn PromptRepository>,
    generator: Arc<dyn TextGenerator>,
    metrics_source: Option<Arc<dyn MetricsSource>>,
    objective_rules: ObjectiveRules,
    score_config: ScoreConfig,
}

impl PromptOptimizer {
    pub fn new(
        repository: Arc<dyn PromptRepository>,
        generator: Arc<dyn TextGenerator>,
        metrics_source: Option<Arc<dyn MetricsSource>>,
        objective_rules: ObjectiveRules,
        score_config: ScoreConfig,
    ) -> Self {
        Self {
            repository,
            generator,
            metrics_source,
            objective_rules,
            score_config,
        }
    }

    /// Run one optimization cycle and return its result record.
    #[instrument(skip(self, payload), fields(alert_id = ?payload.alert_id))]
    pub async fn optimize(&self, payload: OptimizationPayload) -> DomainResult<OptimizationResult> {
        payload.validate()?;

        let active_prompt = self.ensure_active_prompt(payload.prompt_version.as_deref()).await?;
        let objectives = self.resolve_objectives(&payload);

        let baseline_metrics = match &self.metrics_source {
            Some(source) => source.fetch_snapshot().await,
            None => None,
        };
        let previous_metrics = self
            .repository
            .recent_runs(1)
            .await?
            .into_iter()
            .next()
            .and_then(|run| run.conversion_snapshot);

        let request = GenerationRequest::new(build_rewrite_request(
            &active_prompt,
            &payload.failed_calls,
            &objectives,
        ))
        .with_system_prompt(REWRITE_SYSTEM_PROMPT)
        .with_max_tokens(REWRITE_MAX_TOKENS)
        .with_temperature(REWRITE_TEMPERATURE);

        let start = Instant::now();
        let generated = self.generator.generate(request).await?;
        let elapsed = start.elapsed().as_secs_f64();

        let new_version = next_version(&active_prompt.version);
        let combined_prompt = compose_prompt(&active_prompt.content, &generated);
        let notes = summarize_notes(&payload.failed_calls, &generated, &objectives);

        let new_prompt = self
            .repository
            .create_prompt(&new_version, &combined_prompt, Some(&notes))
            .await?;

        let breakdown = compute_score(
            &self.score_config,
            &payload.failed_calls,
            &combined_prompt,
            &objectives,
            baseline_metrics.as_ref(),
            previous_metrics.as_ref(),
        );
        let score_components = breakdown.components(self.score_config.max_total);
        let improvement = score_components.total;

        let run = self
            .repository
            .log_run(NewRun {
                prompt_version: new_prompt.version.clone(),
                status: RunStatus::Completed,
                alert_id: payload.alert_id.clone(),
                model: self.generator.model().to_string(),
                previous_version: Some(active_prompt.version.clone()),
                new_version: Some(new_prompt.version.clone()),
                improvement: Some(improvement),
                duration_seconds: Some(elapsed),
                notes: Some(notes),
                score_components: Some(score_components.clone()),
                conversion_snapshot: baseline_metrics,
            })
            .await?;

        info!(
            run_id = run.id,
            previous_version = %active_prompt.version,
            new_version = %new_prompt.version,
            improvement,
            "optimization cycle completed"
        );

        Ok(OptimizationResult {
            alert_id: payload.alert_id,
            run_id: run.id,
            previous_version: Some(active_prompt.version),
            new_version: new_prompt.version,
            improvement,
            duration_seconds: elapsed,
            prompt_preview: truncate_chars(&combined_prompt, 400),
            score_components,
        })
    }

    /// Resolve the prompt version the cycle starts from. Falls back to
    /// seeding the hard-coded "v1" prompt on first run.
    async fn ensure_active_prompt(
        &self,
        requested_version: Option<&str>,
    ) -> DomainResult<PromptVersion> {
        if let Some(active) = self.repository.get_active_prompt().await? {
            match requested_version {
                None => return Ok(active),
                Some(version) if version == active.version => return Ok(active),
                Some(_) => {}
            }
        }
        if let Some(version) = requested_version {
            let listed = self.repository.list_prompts(VERSION_SEARCH_DEPTH).await?;
            if let Some(found) = listed.into_iter().find(|p| p.version == version) {
                return Ok(found);
            }
        }
        self.repository
            .create_prompt("v1", DEFAULT_PROMPT, Some("Seed prompt"))
            .await
    }

    fn resolve_objectives(&self, payload: &OptimizationPayload) -> Vec<String> {
        if payload.objectives.is_empty() {
            let reasons: Vec<_> = payload.failed_calls.iter().map(FailedCall::reason).collect();
            self.objective_rules.derive(&reasons)
        } else {
            payload.objectives.clone()
        }
    }
}

/// Render the rewrite request sent to the generative endpoint.
fn build_rewrite_request(
    active_prompt: &PromptVersion,
    failed_calls: &[FailedCall],
    objectives: &[String],
) -> String {
    let bullet_failures = failed_calls
        .iter()
        .map(|call| {
            let digest = call
                .summary
                .clone()
                .unwrap_or_else(|| truncate_chars(&call.transcript, 120));
            format!("- {digest}")
        })
        .collect::<Vec<_>>()
        .join("\n");

    let objectives_text = if objectives.is_empty() {
        "* Increase successful call resolutions by 10%".to_string()
    } else {
        objectives
            .iter()
            .map(|obj| format!("* {obj}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Current prompt (version {version}):\n```\n{content}\n```\n\n\
         Failed calls (latest {count}):\n{bullet_failures}\n\n\
         Objectives:\n{objectives_text}\n\n\
         Produce an updated prompt that keeps the strengths of the existing one\n\
         while addressing the failures.\n\
         Respond with the full updated prompt text only.",
        version = active_prompt.version,
        content = active_prompt.content,
        count = failed_calls.len(),
    )
}

/// Compose the new prompt body from the generated text. Prefers the
/// first non-empty fenced segment; an empty generation falls back to the
/// existing prompt unchanged.
fn compose_prompt(existing_prompt: &str, generated: &str) -> String {
    if generated.contains("```") {
        let segments: Vec<&str> = generated.split("```").collect();
        if segments.len() >= 3 {
            let chosen = if segments[1].trim().is_empty() {
                segments[2]
            } else {
                segments[1]
            };
            return chosen.trim().to_string();
        }
    }
    let trimmed = generated.trim();
    if trimmed.is_empty() {
        existing_prompt.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Short free-text digest stored in run notes.
fn summarize_notes(failed_calls: &[FailedCall], generated: &str, objectives: &[String]) -> String {
    let snippet = truncate_chars(generated.trim().lines().next().unwrap_or(""), 160);
    let objectives_text = if objectives.is_empty() {
        "n/a".to_string()
    } else {
        objectives.join(", ")
    };
    format!(
        "Updated to address {count} failures.\n\
         Objectives: {objectives_text}\n\
         First line of model response: {snippet}",
        count = failed_calls.len(),
    )
}

/// Next version identifier: increment "v<int>" labels, otherwise fall
/// back to a Unix-timestamp version.
fn next_version(current_version: &str) -> String {
    if current_version.to_lowercase().starts_with('v') {
        if let Ok(number) = current_version[1..].parse::<i64>() {
            return format!("v{}", number + 1);
        }
    }
    format!("v{}", Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_version_increments_numeric_labels() {
        assert_eq!(next_version("v7"), "v8");
        assert_eq!(next_version("v1"), "v2");
        assert_eq!(next_version("V41"), "v42");
    }

    #[test]
    fn test_next_version_falls_back_to_timestamp() {
        let regex = regex::Regex::new(r"^v\d+$").unwrap();
        assert!(regex.is_match(&next_version("custom-label")));
        assert!(regex.is_match(&next_version("vNext")));
        assert!(regex.is_match(&next_version("")));
    }

    #[test]
    fn test_compose_prompt_extracts_fenced_block() {
        let generated = "Here you go:\n```\nNew prompt body\n```\nThanks!";
        assert_eq!(compose_prompt("old", generated), "New prompt body");
    }

    #[test]
    fn test_compose_prompt_skips_empty_first_segment() {
        let generated = "```\n\n```Actual content after the fence";
        assert_eq!(
            compose_prompt("old", generated),
            "Actual content after the fence"
        );
    }

    #[test]
    fn test_compose_prompt_uses_trimmed_plain_text() {
        assert_eq!(compose_prompt("old", "  New prompt  "), "New prompt");
    }

    #[test]
    fn test_compose_prompt_falls_back_to_existing_when_empty() {
        assert_eq!(compose_prompt("old prompt", "   \n "), "old prompt");
    }

    #[test]
    fn test_build_rewrite_request_prefers_summary_over_transcript() {
        let prompt = PromptVersion {
            version: "v3".to_string(),
            content: "Prompt body".to_string(),
            notes: None,
            created_at: Utc::now(),
            is_active: true,
        };
        let calls = vec![
            FailedCall {
                transcript: "x".repeat(500),
                customer_id: None,
                summary: Some("customer hung up".to_string()),
                failure_reason: None,
            },
            FailedCall {
                transcript: "y".repeat(500),
                customer_id: None,
                summary: None,
                failure_reason: None,
            },
        ];
        let request = build_rewrite_request(&prompt, &calls, &["Be concise".to_string()]);

        assert!(request.contains("Current prompt (version v3):"));
        assert!(request.contains("- customer hung up"));
        assert!(request.contains(&format!("- {}", "y".repeat(120))));
        assert!(!request.contains(&"y".repeat(121)));
        assert!(request.contains("* Be concise"));
        assert!(request.contains("Failed calls (latest 2):"));
    }

    #[test]
    fn test_build_rewrite_request_default_objective() {
        let prompt = PromptVersion {
            version: "v1".to_string(),
            content: "Prompt body".to_string(),
            notes: None,
            created_at: Utc::now(),
            is_active: true,
        };
        let calls = vec![FailedCall {
            transcript: "short call".to_string(),
            customer_id: None,
            summary: None,
            failure_reason: None,
        }];
        let request = build_rewrite_request(&prompt, &calls, &[]);
        assert!(request.contains("* Increase successful call resolutions by 10%"));
    }

    #[test]
    fn test_summarize_notes_digest() {
        let calls = vec![
            FailedCall {
                transcript: "a".to_string(),
                customer_id: None,
                summary: None,
                failure_reason: None,
            },
            FailedCall {
                transcript: "b".to_string(),
                customer_id: None,
                summary: None,
                failure_reason: None,
            },
        ];
        let notes = summarize_notes(
            &calls,
            "First line of output\nSecond line",
            &["Be concise".to_string(), "Apologise".to_string()],
        );
        assert!(notes.contains("Updated to address 2 failures."));
        assert!(notes.contains("Objectives: Be concise, Apologise"));
        assert!(notes.contains("First line of model response: First line of output"));
        assert!(!notes.contains("Second line"));
    }

    #[test]
    fn test_summarize_notes_empty_objectives() {
        let notes = summarize_notes(&[], "reply", &[]);
        assert!(notes.contains("Objectives: n/a"));
    }
}
