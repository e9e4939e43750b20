//! Generic JSON-over-HTTP notifier.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use killwatch_core::{Action, Platform, Policy};

use crate::error::NotifyError;
use crate::message::MessageFormat;
use crate::traits::Notifier;

/// Body posted for a match.
#[derive(Debug, Serialize)]
struct MatchPayload<'a> {
    policy_id: &'a str,
    policy_name: &'a str,
    killmail_id: u64,
    killmail_hash: &'a str,
    url: String,
}

#[derive(Debug, Serialize)]
struct TestPayload<'a> {
    message: &'a str,
}

#[derive(Debug)]
pub struct RestNotifier {
    client: reqwest::Client,
    endpoint: String,
    format: MessageFormat,
}

impl RestNotifier {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, format: MessageFormat) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            format,
        }
    }

    pub fn from_action(action: &Action, client: reqwest::Client, format: MessageFormat) -> Self {
        Self::new(client, action.endpoint.clone(), format)
    }
}

#[async_trait]
impl Notifier for RestNotifier {
    async fn send(
        &self,
        policy: &Policy,
        killmail_id: u64,
        killmail_hash: &str,
    ) -> Result<(), NotifyError> {
        let payload = MatchPayload {
            policy_id: &policy.id,
            policy_name: &policy.name,
            killmail_id,
            killmail_hash,
            url: self.format.kill_url(killmail_id),
        };
        let response = self.client.post(&self.endpoint).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::from_response(response).await);
        }
        Ok(())
    }

    /// The endpoint must answer `204 No Content` to pass.
    async fn send_test(&self, message: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&TestPayload { message })
            .send()
            .await?;
        if response.status() != StatusCode::NO_CONTENT {
            return Err(NotifyError::from_response(response).await);
        }
        Ok(())
    }

    fn platform(&self) -> Platform {
        Platform::Rest
    }
}
