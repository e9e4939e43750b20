//! Pipeline control flags.

use std::fmt;

use async_trait::async_trait;

use crate::error::QueueError;
use crate::keys::{RESTART_TRACKER_FLAG, STOP_FLAG};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Pauses consumption in both pipelines while set.
    Stop,
    /// Forces a policy tracker rebuild; cleared by the processor.
    RestartTracker,
}

impl Flag {
    pub const ALL: [Flag; 2] = [Flag::Stop, Flag::RestartTracker];

    pub fn key(&self) -> &'static str {
        match self {
            Flag::Stop => STOP_FLAG,
            Flag::RestartTracker => RESTART_TRACKER_FLAG,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Stop => f.write_str("stop"),
            Flag::RestartTracker => f.write_str("restart-tracker"),
        }
    }
}

/// Integer control cells shared by the processor, dispatcher and operators.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Current value; a missing cell is created as 0.
    async fn flag(&self, flag: Flag) -> Result<i64, QueueError>;

    async fn set_flag(&self, flag: Flag, value: i64) -> Result<(), QueueError>;

    /// True when the cell holds 1 or more.
    async fn is_set(&self, flag: Flag) -> Result<bool, QueueError> {
        Ok(self.flag(flag).await? >= 1)
    }
}
