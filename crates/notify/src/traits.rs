//! Notifier trait definition.

use async_trait::async_trait;

use killwatch_core::{Platform, Policy};

use crate::error::NotifyError;

/// One configured outbound endpoint.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce that `policy` matched killmail `killmail_id`.
    async fn send(
        &self,
        policy: &Policy,
        killmail_id: u64,
        killmail_hash: &str,
    ) -> Result<(), NotifyError>;

    /// Deliver a free-form test message.
    async fn send_test(&self, message: &str) -> Result<(), NotifyError>;

    fn platform(&self) -> Platform;
}
