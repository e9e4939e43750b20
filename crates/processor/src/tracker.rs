//! Time-boxed snapshot of compiled active policies.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use killwatch_core::{Killmail, Policy, PolicyFilter, PolicyService};
use killwatch_rules::Ruler;

use crate::error::ProcessorError;

pub const SNAPSHOT_TTL_SECS: i64 = 300;

/// A policy paired with its compiled ruler.
#[derive(Debug, Clone)]
pub struct TrackedPolicy {
    pub policy: Policy,
    pub ruler: Ruler,
}

/// Immutable set of tracked policies. Replaced wholesale on rebuild.
#[derive(Debug, Clone)]
pub struct Snapshot {
    built_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    entries: Arc<[TrackedPolicy]>,
}

impl Snapshot {
    /// Compile every trackable policy. Paused policies and policies without
    /// rule groups are left out; invalid rules fail the whole build.
    pub fn build(policies: Vec<Policy>, now: DateTime<Utc>) -> Result<Self, ProcessorError> {
        let mut entries = Vec::with_capacity(policies.len());
        for policy in policies {
            if !policy.is_trackable() {
                continue;
            }
            let ruler =
                Ruler::new(policy.rules.clone()).map_err(|source| ProcessorError::Rules {
                    policy_id: policy.id.clone(),
                    source,
                })?;
            entries.push(TrackedPolicy { policy, ruler });
        }
        Ok(Self {
            built_at: now,
            expires_at: now + Duration::seconds(SNAPSHOT_TTL_SECS),
            entries: entries.into(),
        })
    }

    /// Same entries with a fresh expiry.
    fn renewed(&self, now: DateTime<Utc>) -> Self {
        Self {
            built_at: self.built_at,
            expires_at: now + Duration::seconds(SNAPSHOT_TTL_SECS),
            entries: Arc::clone(&self.entries),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn entries(&self) -> &[TrackedPolicy] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Policies whose rules pass for `killmail`. A rule evaluation error
    /// counts as no match for that policy.
    pub fn matches<'a>(&'a self, killmail: &Killmail) -> Vec<&'a Policy> {
        let mut matched = Vec::new();
        for entry in self.entries.iter() {
            match entry.ruler.test(killmail) {
                Ok(true) => matched.push(&entry.policy),
                Ok(false) => {}
                Err(e) => warn!(
                    policy_id = %entry.policy.id,
                    killmail_id = killmail.id,
                    error = %e,
                    "failed to apply rules to killmail"
                ),
            }
        }
        matched
    }
}

/// Source of the current time for expiry checks and rebuilds.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct PolicyTracker {
    policies: Arc<dyn PolicyService>,
    current: RwLock<Arc<Snapshot>>,
    clock: Clock,
}

impl PolicyTracker {
    /// Build the first snapshot. Errors here are fatal to the caller.
    pub async fn load(policies: Arc<dyn PolicyService>) -> Result<Self, ProcessorError> {
        let snapshot = build_from(policies.as_ref(), Utc::now()).await?;
        info!(policies = snapshot.len(), "policy tracker initialized");
        Ok(Self {
            policies,
            current: RwLock::new(Arc::new(snapshot)),
            clock: Arc::new(Utc::now),
        })
    }

    /// Replace the wall clock used by [`Self::is_stale`] and [`Self::rebuild`].
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current snapshot. Readers keep their handle across a rebuild.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.snapshot().is_expired(now)
    }

    /// Whether the current snapshot has outlived its TTL.
    pub fn is_stale(&self) -> bool {
        self.is_expired((self.clock)())
    }

    /// Replace the snapshot with a freshly built one.
    ///
    /// On failure the previous policies stay in service with a renewed
    /// expiry and the error is returned.
    pub async fn rebuild(&self) -> Result<Arc<Snapshot>, ProcessorError> {
        let now = (self.clock)();
        let next = match build_from(self.policies.as_ref(), now).await {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                let renewed = Arc::new(self.snapshot().renewed(now));
                self.swap(renewed);
                return Err(e);
            }
        };
        self.swap(Arc::clone(&next));
        info!(policies = next.len(), "policy tracker rebuilt");
        Ok(next)
    }

    fn swap(&self, next: Arc<Snapshot>) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = next;
    }
}

async fn build_from(
    service: &dyn PolicyService,
    now: DateTime<Utc>,
) -> Result<Snapshot, ProcessorError> {
    let policies = service.policies(&PolicyFilter::active()).await?;
    Snapshot::build(policies, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use killwatch_rules::{Comparator, Rule, RuleGroups};
    use serde_json::json;

    fn policy(id: &str, groups: Vec<Vec<Rule>>) -> Policy {
        Policy {
            id: id.to_string(),
            name: id.to_string(),
            owner_id: String::new(),
            paused: false,
            rules: RuleGroups::new(groups),
            actions: vec!["a1".to_string()],
            created_at: None,
            updated_at: None,
        }
    }

    fn system_rule(id: u64) -> Vec<Vec<Rule>> {
        vec![vec![Rule::new(Comparator::Eq, "SolarSystemID", vec![json!(id)])]]
    }

    #[test]
    fn expiry_is_five_minutes_after_build() {
        let t0 = Utc::now();
        let snapshot = Snapshot::build(vec![], t0).unwrap();
        assert!(!snapshot.is_expired(t0 + Duration::minutes(4)));
        assert!(snapshot.is_expired(t0 + Duration::minutes(5) + Duration::seconds(1)));
        assert!(snapshot.is_expired(t0 + Duration::minutes(5)));
    }

    #[test]
    fn paused_and_ruleless_policies_skipped() {
        let mut paused = policy("paused", system_rule(1));
        paused.paused = true;
        let empty = policy("empty", vec![]);
        let live = policy("live", system_rule(1));

        let snapshot = Snapshot::build(vec![paused, empty, live], Utc::now()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.entries()[0].policy.id, "live");
    }

    #[test]
    fn invalid_rules_fail_build() {
        let bad = policy(
            "bad",
            vec![vec![Rule::new(
                Comparator::Eq,
                "SolarSystemID",
                vec![json!(1), json!(2)],
            )]],
        );
        let err = Snapshot::build(vec![bad], Utc::now()).unwrap_err();
        assert!(matches!(err, ProcessorError::Rules { ref policy_id, .. } if policy_id == "bad"));
    }

    #[test]
    fn matches_returns_passing_policies() {
        let snapshot = Snapshot::build(
            vec![policy("jita", system_rule(30000142)), policy("amarr", system_rule(30002187))],
            Utc::now(),
        )
        .unwrap();
        let km = Killmail {
            id: 1,
            solar_system_id: 30000142,
            ..Default::default()
        };
        let matched: Vec<_> = snapshot.matches(&km).into_iter().map(|p| p.id.as_str()).collect();
        assert_eq!(matched, vec!["jita"]);
    }

    #[test]
    fn coercion_error_counts_as_no_match() {
        let snapshot = Snapshot::build(
            vec![policy(
                "victim",
                vec![vec![Rule::new(Comparator::Gt, "Victim", vec![json!(1)])]],
            )],
            Utc::now(),
        )
        .unwrap();
        let km = Killmail {
            id: 1,
            victim: Some(Default::default()),
            ..Default::default()
        };
        assert!(snapshot.matches(&km).is_empty());
    }
}
