use killwatch_core::CoreError;
use killwatch_queue::QueueError;
use killwatch_rules::RuleError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("policy {policy_id} has invalid rules: {source}")]
    Rules {
        policy_id: String,
        #[source]
        source: RuleError,
    },

    #[error("policy lookup failed: {0}")]
    Policies(#[from] CoreError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
