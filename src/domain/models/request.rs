//! Optimization request and result models.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::scoring::ScoreComponents;

/// Canonical failure categories reported by the conversational agent.
///
/// Parsing is permissive: codes outside the closed set map to `None`
/// rather than erroring, so unrecognized upstream categories are skipped
/// instead of aborting an optimization cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NoSlots,
    CustomerDisengaged,
    AgentConfidenceLow,
    Unknown,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSlots => "no_slots",
            Self::CustomerDisengaged => "customer_disengaged",
            Self::AgentConfidenceLow => "agent_confidence_low",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "no_slots" => Some(Self::NoSlots),
            "customer_disengaged" => Some(Self::CustomerDisengaged),
            "agent_confidence_low" => Some(Self::AgentConfidenceLow),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// One failed interaction submitted for optimization. Transient input:
/// only its serialized form ends up inside run notes and score inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedCall {
    pub transcript: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl FailedCall {
    /// Failure reason parsed into the closed category set.
    pub fn reason(&self) -> Option<FailureReason> {
        self.failure_reason
            .as_deref()
            .and_then(FailureReason::from_code)
    }
}

/// Request body for one optimization cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationPayload {
    #[serde(default)]
    pub alert_id: Option<String>,
    #[serde(default)]
    pub prompt_version: Option<String>,
    pub failed_calls: Vec<FailedCall>,
    #[serde(default)]
    pub objectives: Vec<String>,
}

impl OptimizationPayload {
    /// Reject malformed payloads before any persistence happens.
    pub fn validate(&self) -> DomainResult<()> {
        if self.failed_calls.is_empty() {
            return Err(DomainError::ValidationFailed(
                "failed_calls must be a non-empty list".to_string(),
            ));
        }
        for (index, call) in self.failed_calls.iter().enumerate() {
            if call.transcript.is_empty() {
                return Err(DomainError::ValidationFailed(format!(
                    "failed_calls[{index}].transcript is required"
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON request body.
    pub fn from_json(raw: &str) -> DomainResult<Self> {
        let payload: Self = serde_json::from_str(raw)
            .map_err(|e| DomainError::ValidationFailed(format!("invalid payload: {e}")))?;
        payload.validate()?;
        Ok(payload)
    }
}

/// Result of one completed optimization cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub alert_id: Option<String>,
    pub run_id: i64,
    pub previous_version: Option<String>,
    pub new_version: String,
    pub improvement: f64,
    pub duration_seconds: f64,
    /// First 400 characters of the composed prompt.
    pub prompt_preview: String,
    pub score_components: ScoreComponents,
}
