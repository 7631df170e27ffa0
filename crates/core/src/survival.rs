//! Survival tiers derived from the remaining compute budget.

use crate::agent::AgentState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Budget thresholds in cents. Both bounds are exclusive upper limits.
pub const CRITICAL_THRESHOLD_CENTS: i64 = 10;
pub const LOW_COMPUTE_THRESHOLD_CENTS: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurvivalTier {
    Normal,
    LowCompute,
    Critical,
    Dead,
}

impl SurvivalTier {
    /// Classify a credit balance.
    pub fn classify(credits_cents: i64) -> Self {
        if credits_cents <= 0 {
            Self::Dead
        } else if credits_cents < CRITICAL_THRESHOLD_CENTS {
            Self::Critical
        } else if credits_cents < LOW_COMPUTE_THRESHOLD_CENTS {
            Self::LowCompute
        } else {
            Self::Normal
        }
    }

    /// The agent state this tier maps to.
    pub fn agent_state(&self) -> AgentState {
        match self {
            Self::Normal => AgentState::Running,
            Self::LowCompute => AgentState::LowCompute,
            Self::Critical => AgentState::Critical,
            Self::Dead => AgentState::Dead,
        }
    }

    /// Whether the reasoning backend should be switched to its cheap model.
    pub fn uses_low_compute(&self) -> bool {
        matches!(self, Self::LowCompute | Self::Critical)
    }
}

impl fmt::Display for SurvivalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Normal => "normal",
            Self::LowCompute => "low_compute",
            Self::Critical => "critical",
            Self::Dead => "dead",
        };
        f.write_str(s)
    }
}
