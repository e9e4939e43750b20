//! In-process queue and control plane.
//!
//! Used by tests and local runs without Redis. Clones share state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::control::{ControlPlane, Flag};
use crate::error::QueueError;
use crate::queue::{PopOrder, ScoredQueue};

#[derive(Clone, Default)]
pub struct MemoryQueue {
    name: String,
    members: Arc<Mutex<Vec<(String, f64)>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Make every call fail with a connection error until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Members in ascending score order, without removing them.
    pub fn members(&self) -> Vec<String> {
        let mut members = self.lock().clone();
        sort_ascending(&mut members);
        members.into_iter().map(|(m, _)| m).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(String, f64)>> {
        self.members.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self) -> Result<(), QueueError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(QueueError::Connection(format!("{} unavailable", self.name)));
        }
        Ok(())
    }
}

// Ties break on member, matching sorted-set ordering.
fn sort_ascending(members: &mut [(String, f64)]) {
    members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
}

#[async_trait]
impl ScoredQueue for MemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn count(&self) -> Result<u64, QueueError> {
        self.check()?;
        Ok(self.lock().len() as u64)
    }

    async fn pop(&self, limit: usize, order: PopOrder) -> Result<Vec<String>, QueueError> {
        self.check()?;
        let mut members = self.lock();
        sort_ascending(&mut members);
        let take = limit.min(members.len());
        let popped: Vec<(String, f64)> = match order {
            PopOrder::Newest => {
                let start = members.len() - take;
                members.drain(start..).rev().collect()
            }
            PopOrder::Oldest => members.drain(..take).collect(),
        };
        Ok(popped.into_iter().map(|(m, _)| m).collect())
    }

    async fn push(&self, score: f64, member: &str) -> Result<(), QueueError> {
        self.check()?;
        let mut members = self.lock();
        match members.iter_mut().find(|(m, _)| m == member) {
            Some(existing) => existing.1 = score,
            None => members.push((member.to_string(), score)),
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryControl {
    cells: Arc<Mutex<HashMap<Flag, i64>>>,
}

impl MemoryControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the cell has been created.
    pub fn exists(&self, flag: Flag) -> bool {
        self.lock().contains_key(&flag)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Flag, i64>> {
        self.cells.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ControlPlane for MemoryControl {
    async fn flag(&self, flag: Flag) -> Result<i64, QueueError> {
        Ok(*self.lock().entry(flag).or_insert(0))
    }

    async fn set_flag(&self, flag: Flag, value: i64) -> Result<(), QueueError> {
        self.lock().insert(flag, value);
        Ok(())
    }
}
