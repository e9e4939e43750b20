use killwatch_core::config::DispatchConfig;
use killwatch_core::{Action, Platform};

use crate::discord::DiscordNotifier;
use crate::error::NotifyError;
use crate::message::MessageFormat;
use crate::rest::RestNotifier;
use crate::slack::SlackNotifier;
use crate::traits::Notifier;

/// Picks the adapter for an action's platform.
pub trait NotifierFactory: Send + Sync {
    fn notifier_for(&self, action: &Action) -> Result<Box<dyn Notifier>, NotifyError>;
}

/// Builds real HTTP adapters sharing one connection pool.
#[derive(Debug, Clone)]
pub struct HttpNotifierFactory {
    client: reqwest::Client,
    format: MessageFormat,
}

impl HttpNotifierFactory {
    pub fn new(client: reqwest::Client, format: MessageFormat) -> Self {
        Self { client, format }
    }

    pub fn from_config(config: &DispatchConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("killwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::new(
            client,
            MessageFormat::new(config.killboard_base_url.as_str()),
        ))
    }
}

impl NotifierFactory for HttpNotifierFactory {
    fn notifier_for(&self, action: &Action) -> Result<Box<dyn Notifier>, NotifyError> {
        let client = self.client.clone();
        let format = self.format.clone();
        let notifier: Box<dyn Notifier> = match action.platform {
            Platform::Discord => Box::new(DiscordNotifier::from_action(action, client, format)?),
            Platform::Slack => Box::new(SlackNotifier::from_action(action, client, format)),
            Platform::Rest => Box::new(RestNotifier::from_action(action, client, format)),
        };
        Ok(notifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(endpoint: &str) -> Action {
        let mut action = Action::new("a", endpoint);
        action.validate().unwrap();
        action
    }

    #[test]
    fn selects_adapter_by_platform() {
        let factory = HttpNotifierFactory::new(reqwest::Client::new(), MessageFormat::default());
        let cases = [
            ("https://discord.com/api/webhooks/1/t", Platform::Discord),
            ("https://hooks.slack.com/services/T/B/X", Platform::Slack),
            ("https://example.com/hook", Platform::Rest),
        ];
        for (endpoint, platform) in cases {
            let notifier = factory.notifier_for(&action(endpoint)).unwrap();
            assert_eq!(notifier.platform(), platform);
        }
    }

    #[test]
    fn malformed_discord_endpoint_fails_construction() {
        let factory = HttpNotifierFactory::new(reqwest::Client::new(), MessageFormat::default());
        let action = action("https://discord.com/api/webhooks/1");
        assert!(factory.notifier_for(&action).is_err());
    }
}
