//! Drains the matched queue and fans each match out to its actions.
//!
//! Every action is attempted independently: a missing action, a bad
//! endpoint or a failed send is logged and the next action still runs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use killwatch_core::config::DispatchConfig;
use killwatch_core::{Action, ActionService, Dispatchable, Platform, PolicyService};
use killwatch_queue::{ControlPlane, Flag, PopOrder, ScoredQueue};

use crate::error::NotifyError;
use crate::factory::NotifierFactory;

// ── Settings ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Pause between consecutive send attempts.
    pub throttle: Duration,
    pub pop_order: PopOrder,
    pub pause_backoff: Duration,
    pub idle_backoff: Duration,
    pub max_error_backoff: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            throttle: Duration::from_secs(1),
            pop_order: PopOrder::Newest,
            pause_backoff: Duration::from_secs(5),
            idle_backoff: Duration::from_secs(2),
            max_error_backoff: Duration::from_secs(30),
        }
    }
}

impl DispatchSettings {
    pub fn from_config(config: &DispatchConfig, pop_order: PopOrder) -> Self {
        Self {
            throttle: config.throttle,
            pop_order,
            ..Default::default()
        }
    }

    fn error_backoff(&self, consecutive_errors: u32) -> Duration {
        let backoff = self.idle_backoff * 2u32.pow(consecutive_errors.min(5));
        backoff.min(self.max_error_backoff)
    }
}

// ── Reports ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Sent,
    /// Action is disabled; nothing was sent.
    Disabled,
    /// Action lookup failed.
    Missing(String),
    /// Adapter construction or delivery failed.
    Failed(String),
}

/// Result of delivering one match to a single action.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub action_id: String,
    pub platform: Option<Platform>,
    pub status: OutcomeStatus,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub policy_id: String,
    pub killmail_id: u64,
    pub outcomes: Vec<ActionOutcome>,
}

impl DispatchReport {
    pub fn sent(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Sent)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Failed(_) | OutcomeStatus::Missing(_)))
            .count()
    }
}

/// Outcome of one loop iteration.
#[derive(Debug)]
pub enum DispatchStep {
    Paused,
    Idle,
    Dispatched(DispatchReport),
    /// Message popped but not deliverable (undecodable or unknown policy).
    Dropped(String),
}

// ── Test messages ───────────────────────────────────────────────────

/// Deliver a free-form message through the adapter `factory` picks for
/// `action`. Needs no queue, so operator tooling can call it directly.
pub async fn send_test_message(
    factory: &dyn NotifierFactory,
    action: &Action,
    message: &str,
) -> Result<(), NotifyError> {
    let notifier = factory.notifier_for(action)?;
    match notifier.send_test(message).await {
        Ok(()) => {
            info!(action_id = %action.id, platform = %action.platform, "test message delivered");
            Ok(())
        }
        Err(e) => {
            error!(action_id = %action.id, error = %e, "failed to send test message");
            Err(e)
        }
    }
}

// ── Dispatch service ────────────────────────────────────────────────

pub struct DispatchService {
    matched: Arc<dyn ScoredQueue>,
    control: Arc<dyn ControlPlane>,
    policies: Arc<dyn PolicyService>,
    actions: Arc<dyn ActionService>,
    factory: Arc<dyn NotifierFactory>,
    settings: DispatchSettings,
}

impl DispatchService {
    pub fn new(
        matched: Arc<dyn ScoredQueue>,
        control: Arc<dyn ControlPlane>,
        policies: Arc<dyn PolicyService>,
        actions: Arc<dyn ActionService>,
        factory: Arc<dyn NotifierFactory>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            matched,
            control,
            policies,
            actions,
            factory,
            settings,
        }
    }

    /// Run one iteration: pop at most one dispatchable and deliver it.
    pub async fn tick(&self) -> Result<DispatchStep, NotifyError> {
        if self.control.is_set(Flag::Stop).await? {
            info!("stop signal set");
            return Ok(DispatchStep::Paused);
        }
        if self.matched.count().await? == 0 {
            return Ok(DispatchStep::Idle);
        }
        let Some(raw) = self
            .matched
            .pop(1, self.settings.pop_order)
            .await?
            .into_iter()
            .next()
        else {
            return Ok(DispatchStep::Idle);
        };

        match self.handle_message(&raw).await {
            Ok(report) => Ok(DispatchStep::Dispatched(report)),
            Err(e) => {
                error!(error = %e, data = %raw, "dropping dispatchable");
                Ok(DispatchStep::Dropped(e.to_string()))
            }
        }
    }

    /// Deliver one encoded dispatchable to every action of its policy.
    ///
    /// Errors only when the message cannot be decoded or its policy cannot
    /// be loaded; per-action failures are recorded in the report.
    pub async fn handle_message(&self, raw: &str) -> Result<DispatchReport, NotifyError> {
        let message = Dispatchable::from_json(raw.as_bytes())?;
        let policy = self.policies.policy(&message.policy_id).await?;

        let mut report = DispatchReport {
            policy_id: policy.id.clone(),
            killmail_id: message.id,
            outcomes: Vec::with_capacity(policy.actions.len()),
        };

        let mut attempted = false;
        for action_id in &policy.actions {
            let action = match self.actions.action(action_id).await {
                Ok(action) => action,
                Err(e) => {
                    error!(policy_id = %policy.id, action_id = %action_id, error = %e, "failed to look up action");
                    report.outcomes.push(ActionOutcome {
                        action_id: action_id.clone(),
                        platform: None,
                        status: OutcomeStatus::Missing(e.to_string()),
                        duration_ms: 0,
                    });
                    continue;
                }
            };

            if action.is_disabled {
                info!(
                    policy_id = %policy.id,
                    action_id = %action.id,
                    reason = action.disabled_reason.as_deref().unwrap_or("unspecified"),
                    "skipping disabled action"
                );
                report.outcomes.push(ActionOutcome {
                    action_id: action.id.clone(),
                    platform: Some(action.platform),
                    status: OutcomeStatus::Disabled,
                    duration_ms: 0,
                });
                continue;
            }

            if attempted && !self.settings.throttle.is_zero() {
                tokio::time::sleep(self.settings.throttle).await;
            }
            attempted = true;

            let start = Instant::now();
            let result = match self.factory.notifier_for(&action) {
                Ok(notifier) => notifier.send(&policy, message.id, &message.hash).await,
                Err(e) => Err(e),
            };
            let duration_ms = start.elapsed().as_millis() as u64;

            let status = match result {
                Ok(()) => {
                    info!(
                        policy_id = %policy.id,
                        action_id = %action.id,
                        platform = %action.platform,
                        killmail_id = message.id,
                        duration_ms,
                        "notification delivered"
                    );
                    OutcomeStatus::Sent
                }
                Err(e) => {
                    warn!(
                        policy_id = %policy.id,
                        action_id = %action.id,
                        platform = %action.platform,
                        error = %e,
                        duration_ms,
                        "notification delivery failed"
                    );
                    OutcomeStatus::Failed(e.to_string())
                }
            };
            report.outcomes.push(ActionOutcome {
                action_id: action.id.clone(),
                platform: Some(action.platform),
                status,
                duration_ms,
            });
        }

        Ok(report)
    }

    /// Send `message` through `action`'s adapter, outside the queue.
    pub async fn send_test_message(&self, action: &Action, message: &str) -> Result<(), NotifyError> {
        send_test_message(self.factory.as_ref(), action, message).await
    }

    fn backoff(&self, step: &DispatchStep) -> Duration {
        match step {
            DispatchStep::Paused => self.settings.pause_backoff,
            DispatchStep::Idle => self.settings.idle_backoff,
            DispatchStep::Dispatched(_) | DispatchStep::Dropped(_) => Duration::ZERO,
        }
    }

    /// Loop until `shutdown` turns true. The current message finishes first.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            throttle_ms = self.settings.throttle.as_millis() as u64,
            pop_order = %self.settings.pop_order,
            "dispatcher started"
        );
        let mut consecutive_errors: u32 = 0;

        while !*shutdown.borrow() {
            let delay = match self.tick().await {
                Ok(step) => {
                    consecutive_errors = 0;
                    if let DispatchStep::Dispatched(report) = &step {
                        debug!(
                            policy_id = %report.policy_id,
                            sent = report.sent(),
                            failed = report.failed(),
                            "dispatch complete"
                        );
                    }
                    self.backoff(&step)
                }
                Err(e) => {
                    consecutive_errors = consecutive_errors.saturating_add(1);
                    warn!(error = %e, consecutive_errors, "dispatcher iteration failed");
                    self.settings.error_backoff(consecutive_errors)
                }
            };

            if !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }
        info!("dispatcher shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: OutcomeStatus) -> ActionOutcome {
        ActionOutcome {
            action_id: "a".to_string(),
            platform: None,
            status,
            duration_ms: 0,
        }
    }

    #[test]
    fn report_counts() {
        let report = DispatchReport {
            policy_id: "p".to_string(),
            killmail_id: 1,
            outcomes: vec![
                outcome(OutcomeStatus::Sent),
                outcome(OutcomeStatus::Failed("boom".to_string())),
                outcome(OutcomeStatus::Missing("gone".to_string())),
                outcome(OutcomeStatus::Disabled),
                outcome(OutcomeStatus::Sent),
            ],
        };
        assert_eq!(report.sent(), 2);
        assert_eq!(report.failed(), 2);
    }

    #[test]
    fn error_backoff_is_capped() {
        let settings = DispatchSettings::default();
        assert_eq!(settings.error_backoff(1), Duration::from_secs(4));
        assert_eq!(settings.error_backoff(3), Duration::from_secs(16));
        assert_eq!(settings.error_backoff(10), Duration::from_secs(30));
    }
}
