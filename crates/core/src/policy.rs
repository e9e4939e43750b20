//! Policies and the cross-queue match message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use killwatch_rules::RuleGroups;

/// A named set of OR-of-AND rule groups plus the actions to run on match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub rules: RuleGroups,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Policy {
    /// Policies with no rule groups can never match.
    pub fn is_trackable(&self) -> bool {
        !self.paused && !self.rules.is_empty()
    }
}

/// Filter accepted by [`crate::PolicyService::policies`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyFilter {
    pub paused: Option<bool>,
}

impl PolicyFilter {
    pub fn active() -> Self {
        Self {
            paused: Some(false),
        }
    }

    pub fn matches(&self, policy: &Policy) -> bool {
        self.paused.map_or(true, |p| policy.paused == p)
    }
}

/// Minimal message carried from the processor to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatchable {
    #[serde(rename = "policyID")]
    pub policy_id: String,
    pub id: u64,
    pub hash: String,
}

impl Dispatchable {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}
