//! Scored queue trait.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// Which end of the score range `pop` drains from.
///
/// Scores are insertion timestamps, so `Newest` is LIFO and `Oldest` FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopOrder {
    #[default]
    Newest,
    Oldest,
}

impl fmt::Display for PopOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopOrder::Newest => f.write_str("newest"),
            PopOrder::Oldest => f.write_str("oldest"),
        }
    }
}

impl FromStr for PopOrder {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newest" | "lifo" => Ok(PopOrder::Newest),
            "oldest" | "fifo" => Ok(PopOrder::Oldest),
            other => Err(QueueError::Parse(format!(
                "unknown pop order '{other}', expected newest or oldest"
            ))),
        }
    }
}

/// A durable collection of members ordered by numeric score.
///
/// Each instance is bound to a single key. Pushing an existing member
/// replaces its score.
#[async_trait]
pub trait ScoredQueue: Send + Sync {
    /// Key this queue reads and writes.
    fn name(&self) -> &str;

    /// Number of members currently queued.
    async fn count(&self) -> Result<u64, QueueError>;

    /// Remove and return up to `limit` members.
    async fn pop(&self, limit: usize, order: PopOrder) -> Result<Vec<String>, QueueError>;

    async fn push(&self, score: f64, member: &str) -> Result<(), QueueError>;
}
