//! Main processing loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use killwatch_core::config::ProcessorConfig;
use killwatch_core::{Dispatchable, Killmail, UniverseService};
use killwatch_queue::{now_score, ControlPlane, Flag, PopOrder, QueueError, ScoredQueue};

use crate::error::ProcessorError;
use crate::hydrate::hydrate;
use crate::tracker::PolicyTracker;

// ── Settings ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    /// Maximum events popped per tick.
    pub batch_limit: usize,
    /// Concurrent handlers; 0 handles each event inline.
    pub workers: usize,
    pub pop_order: PopOrder,
    /// Sleep while the stop flag is set.
    pub pause_backoff: Duration,
    /// Sleep after a tracker rebuild.
    pub reload_backoff: Duration,
    /// Sleep when the inbound queue is empty.
    pub idle_backoff: Duration,
    /// Upper bound for the backoff after consecutive errors.
    pub max_error_backoff: Duration,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            batch_limit: 5,
            workers: 8,
            pop_order: PopOrder::Newest,
            pause_backoff: Duration::from_secs(5),
            reload_backoff: Duration::from_secs(5),
            idle_backoff: Duration::from_secs(2),
            max_error_backoff: Duration::from_secs(30),
        }
    }
}

impl ProcessorSettings {
    pub fn from_config(config: &ProcessorConfig) -> Result<Self, QueueError> {
        Ok(Self {
            batch_limit: config.batch_limit.max(1),
            workers: config.workers,
            pop_order: config.pop_order.parse()?,
            ..Default::default()
        })
    }

    fn error_backoff(&self, consecutive_errors: u32) -> Duration {
        let backoff = self.idle_backoff * 2u32.pow(consecutive_errors.min(5));
        backoff.min(self.max_error_backoff)
    }
}

// ── Per-message handling ────────────────────────────────────────────

/// Decodes, hydrates and matches one inbound payload.
pub struct MessageHandler {
    tracker: Arc<PolicyTracker>,
    universe: Arc<dyn UniverseService>,
    matched: Arc<dyn ScoredQueue>,
}

impl MessageHandler {
    pub fn new(
        tracker: Arc<PolicyTracker>,
        universe: Arc<dyn UniverseService>,
        matched: Arc<dyn ScoredQueue>,
    ) -> Self {
        Self {
            tracker,
            universe,
            matched,
        }
    }

    /// Returns the number of dispatchables pushed. Only a decode failure
    /// is an error; push failures are logged per policy.
    pub async fn handle(&self, raw: &str) -> Result<usize, ProcessorError> {
        let mut killmail = Killmail::from_json(raw.as_bytes())?;
        hydrate(&mut killmail, self.universe.as_ref()).await;

        let snapshot = self.tracker.snapshot();
        let mut pushed = 0;
        for policy in snapshot.matches(&killmail) {
            info!(
                policy_id = %policy.id,
                policy_name = %policy.name,
                killmail_id = killmail.id,
                "handling match"
            );
            let payload = Dispatchable {
                policy_id: policy.id.clone(),
                id: killmail.id,
                hash: killmail.hash.clone(),
            };
            let encoded = match payload.to_json() {
                Ok(encoded) => encoded,
                Err(e) => {
                    error!(policy_id = %policy.id, error = %e, "failed to encode dispatchable");
                    continue;
                }
            };
            match self.matched.push(now_score(), &encoded).await {
                Ok(()) => pushed += 1,
                Err(e) => error!(
                    policy_id = %policy.id,
                    killmail_id = killmail.id,
                    error = %e,
                    "unable to push payload to matched queue"
                ),
            }
        }
        Ok(pushed)
    }

    async fn handle_logged(&self, raw: &str) {
        if let Err(e) = self.handle(raw).await {
            warn!(error = %e, "dropping undecodable message");
        }
    }
}

// ── Processor ───────────────────────────────────────────────────────

/// Outcome of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Stop flag set; nothing consumed.
    Paused,
    /// Restart flag observed and the tracker rebuilt.
    Reloaded,
    /// Snapshot had expired and was rebuilt.
    Refreshed,
    /// Inbound queue empty.
    Idle,
    /// This many events were popped and handed to handlers.
    Processed(usize),
}

pub struct Processor {
    inbound: Arc<dyn ScoredQueue>,
    control: Arc<dyn ControlPlane>,
    tracker: Arc<PolicyTracker>,
    handler: Arc<MessageHandler>,
    settings: ProcessorSettings,
    permits: Arc<Semaphore>,
    tasks: JoinSet<()>,
}

impl Processor {
    pub fn new(
        inbound: Arc<dyn ScoredQueue>,
        matched: Arc<dyn ScoredQueue>,
        control: Arc<dyn ControlPlane>,
        tracker: Arc<PolicyTracker>,
        universe: Arc<dyn UniverseService>,
        settings: ProcessorSettings,
    ) -> Self {
        let handler = Arc::new(MessageHandler::new(Arc::clone(&tracker), universe, matched));
        Self {
            inbound,
            control,
            tracker,
            handler,
            permits: Arc::new(Semaphore::new(settings.workers.max(1))),
            settings,
            tasks: JoinSet::new(),
        }
    }

    pub fn tracker(&self) -> &Arc<PolicyTracker> {
        &self.tracker
    }

    /// Run one iteration of the loop without sleeping.
    pub async fn tick(&mut self) -> Result<Step, ProcessorError> {
        self.reap();

        if self.control.is_set(Flag::Stop).await? {
            info!("stop signal set");
            return Ok(Step::Paused);
        }

        if self.control.is_set(Flag::RestartTracker).await? {
            // The flag stays set if the rebuild fails so the next tick retries.
            self.tracker.rebuild().await?;
            self.control.set_flag(Flag::RestartTracker, 0).await?;
            return Ok(Step::Reloaded);
        }

        if self.tracker.is_stale() {
            self.tracker.rebuild().await?;
            return Ok(Step::Refreshed);
        }

        if self.inbound.count().await? == 0 {
            return Ok(Step::Idle);
        }

        let batch = self
            .inbound
            .pop(self.settings.batch_limit, self.settings.pop_order)
            .await?;
        let popped = batch.len();
        debug!(popped, "handling batch");

        for raw in batch {
            self.submit(raw).await;
        }
        Ok(Step::Processed(popped))
    }

    async fn submit(&mut self, raw: String) {
        if self.settings.workers == 0 {
            self.handler.handle_logged(&raw).await;
            return;
        }
        // Waits here when all workers are busy.
        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                self.handler.handle_logged(&raw).await;
                return;
            }
        };
        let handler = Arc::clone(&self.handler);
        self.tasks.spawn(async move {
            let _permit = permit;
            handler.handle_logged(&raw).await;
        });
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                error!(error = %e, "message handler task failed");
            }
        }
    }

    /// Wait for every in-flight handler to finish.
    pub async fn drain(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "message handler task failed");
            }
        }
    }

    fn backoff(&self, step: Step) -> Duration {
        match step {
            Step::Paused => self.settings.pause_backoff,
            Step::Reloaded | Step::Refreshed => self.settings.reload_backoff,
            Step::Idle => self.settings.idle_backoff,
            Step::Processed(_) => Duration::ZERO,
        }
    }

    /// Loop until `shutdown` turns true, then wait for in-flight handlers.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            batch_limit = self.settings.batch_limit,
            workers = self.settings.workers,
            pop_order = %self.settings.pop_order,
            "processor started"
        );
        let mut consecutive_errors: u32 = 0;

        while !*shutdown.borrow() {
            let delay = match self.tick().await {
                Ok(step) => {
                    consecutive_errors = 0;
                    self.backoff(step)
                }
                Err(e) => {
                    consecutive_errors = consecutive_errors.saturating_add(1);
                    warn!(error = %e, consecutive_errors, "processor iteration failed");
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

        info!(in_flight = self.tasks.len(), "processor shutting down");
        self.drain().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_backoff_grows_and_caps() {
        let settings = ProcessorSettings::default();
        assert_eq!(settings.error_backoff(1), Duration::from_secs(4));
        assert_eq!(settings.error_backoff(2), Duration::from_secs(8));
        assert_eq!(settings.error_backoff(10), Duration::from_secs(30));
    }

    #[test]
    fn settings_from_config() {
        let config = ProcessorConfig {
            batch_limit: 0,
            workers: 3,
            pop_order: "oldest".to_string(),
        };
        let settings = ProcessorSettings::from_config(&config).unwrap();
        assert_eq!(settings.batch_limit, 1);
        assert_eq!(settings.workers, 3);
        assert_eq!(settings.pop_order, PopOrder::Oldest);

        let bad = ProcessorConfig {
            pop_order: "sideways".to_string(),
            ..config
        };
        assert!(ProcessorSettings::from_config(&bad).is_err());
    }
}
