//! Outbound notification adapters and the dispatch loop.

pub mod discord;
pub mod dispatcher;
pub mod error;
pub mod factory;
pub mod message;
pub mod rest;
pub mod slack;
pub mod traits;

pub use discord::DiscordNotifier;
pub use dispatcher::{
    send_test_message, ActionOutcome, DispatchReport, DispatchService, DispatchSettings,
    DispatchStep, OutcomeStatus,
};
pub use error::NotifyError;
pub use factory::{HttpNotifierFactory, NotifierFactory};
pub use message::MessageFormat;
pub use rest::RestNotifier;
pub use slack::SlackNotifier;
pub use traits::Notifier;
