use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::{SessionOutcome, TimerMode};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    /// The timer ran out on its own.
    Natural,
    /// The user stopped it.
    Manual,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Natural => "Natural",
            EndReason::Manual => "Manual",
        }
    }
}

/// A finished session as persisted to history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub mode: TimerMode,
    pub label: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub completed_cycles: u32,
    pub target_cycles: Option<u32>,
    pub ended_by: EndReason,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn natural(outcome: &SessionOutcome, stopped_at: DateTime<Utc>) -> Self {
        Self::from_outcome(outcome, EndReason::Natural, stopped_at)
    }

    pub fn manual(outcome: &SessionOutcome, stopped_at: DateTime<Utc>) -> Self {
        Self::from_outcome(outcome, EndReason::Manual, stopped_at)
    }

    fn from_outcome(
        outcome: &SessionOutcome,
        ended_by: EndReason,
        stopped_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            mode: outcome.mode,
            label: outcome.label.clone(),
            started_at: outcome.started_at,
            stopped_at,
            duration_ms: outcome.duration_ms,
            completed_cycles: outcome.completed_cycles,
            target_cycles: outcome.target_cycles,
            ended_by,
            created_at: stopped_at,
        }
    }
}
