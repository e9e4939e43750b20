//! Outbound notification targets.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CoreError;

const HOST_SLACK: &str = "hooks.slack.com";
const HOST_DISCORD: &str = "discord.com";
const HOST_DISCORD_APP: &str = "discordapp.com";

const DISCORD_PATH_PREFIX: &str = "/api/webhooks/";
const SLACK_PATH_PREFIX: &str = "/services/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Discord,
    Slack,
    #[default]
    Rest,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Discord => "discord",
            Platform::Slack => "slack",
            Platform::Rest => "rest",
        }
    }

    /// Classify an endpoint host.
    pub fn from_host(host: &str) -> Self {
        match host {
            HOST_SLACK => Platform::Slack,
            HOST_DISCORD | HOST_DISCORD_APP => Platform::Discord,
            _ => Platform::Rest,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discord" => Ok(Platform::Discord),
            "slack" => Ok(Platform::Slack),
            "rest" => Ok(Platform::Rest),
            other => Err(CoreError::Validation(format!("unknown platform '{other}'"))),
        }
    }
}

/// Parse an endpoint and derive its platform.
///
/// The scheme must be http(s). Discord endpoints must live under
/// `/api/webhooks/`, Slack endpoints under `/services/`.
pub fn classify_endpoint(endpoint: &str) -> Result<Platform, CoreError> {
    let uri = Url::parse(endpoint)
        .map_err(|e| CoreError::Validation(format!("malformed endpoint '{endpoint}': {e}")))?;

    if uri.scheme() != "http" && uri.scheme() != "https" {
        return Err(CoreError::Validation(format!(
            "invalid url scheme '{}', use http or https",
            uri.scheme()
        )));
    }

    let platform = Platform::from_host(uri.host_str().unwrap_or_default());
    match platform {
        Platform::Discord if !uri.path().starts_with(DISCORD_PATH_PREFIX) => Err(
            CoreError::Validation("malformed discord webhook".to_string()),
        ),
        Platform::Slack if !uri.path().starts_with(SLACK_PATH_PREFIX) => Err(
            CoreError::Validation("malformed slack webhook".to_string()),
        ),
        _ => Ok(platform),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infraction {
    #[serde(rename = "_id")]
    pub id: String,
    pub message: String,
}

/// A configured webhook target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub label: String,
    /// Derived from the endpoint host by [`Action::validate`].
    #[serde(default)]
    pub platform: Platform,
    pub endpoint: String,
    #[serde(default)]
    pub tested: bool,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub disabled_reason: Option<String>,
    #[serde(default)]
    pub infractions: Vec<Infraction>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Action {
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner_id: String::new(),
            label: String::new(),
            platform: Platform::Rest,
            endpoint: endpoint.into(),
            tested: false,
            is_disabled: false,
            disabled_reason: None,
            infractions: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Validate the endpoint and set `platform` from it.
    pub fn validate(&mut self) -> Result<(), CoreError> {
        self.platform = classify_endpoint(&self.endpoint)?;
        Ok(())
    }
}
