//! Slack incoming-webhook notifier.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use killwatch_core::{Action, Platform, Policy};

use crate::error::NotifyError;
use crate::message::MessageFormat;
use crate::traits::Notifier;

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    text: &'a str,
    unfurl_links: bool,
}

#[derive(Debug)]
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook: String,
    format: MessageFormat,
}

impl SlackNotifier {
    pub fn new(client: reqwest::Client, webhook: impl Into<String>, format: MessageFormat) -> Self {
        Self {
            client,
            webhook: webhook.into(),
            format,
        }
    }

    pub fn from_action(action: &Action, client: reqwest::Client, format: MessageFormat) -> Self {
        Self::new(client, action.endpoint.clone(), format)
    }

    async fn post(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.webhook)
            .json(&SlackMessage {
                text,
                unfurl_links: true,
            })
            .send()
            .await?;
        // Slack answers 200 "ok"; anything else is a delivery failure.
        if response.status() != StatusCode::OK {
            return Err(NotifyError::from_response(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(
        &self,
        policy: &Policy,
        killmail_id: u64,
        _killmail_hash: &str,
    ) -> Result<(), NotifyError> {
        self.post(&self.format.match_text(policy, killmail_id)).await
    }

    async fn send_test(&self, message: &str) -> Result<(), NotifyError> {
        self.post(message).await
    }

    fn platform(&self) -> Platform {
        Platform::Slack
    }
}
