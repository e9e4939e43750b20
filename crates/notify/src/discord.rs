//! Discord webhook notifier.
//!
//! Endpoints must have the shape `/api/webhooks/{id}/{token}`.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;
use url::Url;

use killwatch_core::{Action, Platform, Policy};

use crate::error::NotifyError;
use crate::message::MessageFormat;
use crate::traits::Notifier;

const TEST_USERNAME: &str = "killwatch Test";

#[derive(Debug, Serialize)]
struct WebhookParams<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

#[derive(Debug)]
pub struct DiscordNotifier {
    client: reqwest::Client,
    base_url: String,
    id: String,
    token: String,
    format: MessageFormat,
}

impl DiscordNotifier {
    /// Build from an action whose endpoint is a Discord webhook URL.
    pub fn from_action(
        action: &Action,
        client: reqwest::Client,
        format: MessageFormat,
    ) -> Result<Self, NotifyError> {
        if action.platform != Platform::Discord {
            return Err(NotifyError::Config(format!(
                "action {} is not a discord action",
                action.id
            )));
        }
        let uri = Url::parse(&action.endpoint)
            .map_err(|e| NotifyError::Config(format!("failed to parse endpoint: {e}")))?;
        let (id, token) = parse_webhook_path(uri.path())?;
        let base_url = uri[..url::Position::BeforePath].to_string();
        Ok(Self::new(client, base_url, id, token, format))
    }

    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        id: impl Into<String>,
        token: impl Into<String>,
        format: MessageFormat,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            id: id.into(),
            token: token.into(),
            format,
        }
    }

    pub fn webhook_id(&self) -> &str {
        &self.id
    }

    async fn execute(&self, params: &WebhookParams<'_>) -> Result<(), NotifyError> {
        let url = format!(
            "{}/api/webhooks/{}/{}?wait=true",
            self.base_url, self.id, self.token
        );
        debug!(webhook_id = %self.id, "executing discord webhook");
        let response = self.client.post(&url).json(params).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::from_response(response).await);
        }
        Ok(())
    }
}

/// Split `/api/webhooks/{id}/{token}` into its id and token.
fn parse_webhook_path(path: &str) -> Result<(String, String), NotifyError> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() != 5 {
        return Err(NotifyError::Config(format!(
            "expected webhook path /api/webhooks/{{id}}/{{token}}, got {} segments",
            parts.len()
        )));
    }
    if !parts[0].is_empty() || parts[1] != "api" || parts[2] != "webhooks" {
        return Err(NotifyError::Config(format!(
            "expected webhook path /api/webhooks/{{id}}/{{token}}, got {path}"
        )));
    }
    let (id, token) = (parts[3], parts[4]);
    if id.is_empty() || token.is_empty() {
        return Err(NotifyError::Config(
            "webhook id and token must not be empty".to_string(),
        ));
    }
    Ok((id.to_string(), token.to_string()))
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(
        &self,
        policy: &Policy,
        killmail_id: u64,
        _killmail_hash: &str,
    ) -> Result<(), NotifyError> {
        let content = self.format.match_text(policy, killmail_id);
        self.execute(&WebhookParams {
            content: &content,
            username: None,
        })
        .await
    }

    async fn send_test(&self, message: &str) -> Result<(), NotifyError> {
        self.execute(&WebhookParams {
            content: message,
            username: Some(TEST_USERNAME),
        })
        .await
    }

    fn platform(&self) -> Platform {
        Platform::Discord
    }
}
