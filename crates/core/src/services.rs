//! Lookup seams consumed by the processor and dispatcher.
//!
//! Implementations live in `killwatch-store` (policies, actions) and
//! `killwatch-universe` (reference data).

use async_trait::async_trait;

use crate::action::Action;
use crate::error::CoreError;
use crate::policy::{Policy, PolicyFilter};
use crate::universe::{Constellation, Item, SolarSystem};

#[async_trait]
pub trait PolicyService: Send + Sync {
    /// All policies accepted by `filter`.
    async fn policies(&self, filter: &PolicyFilter) -> Result<Vec<Policy>, CoreError>;

    /// A single policy; `CoreError::NotFound` when absent.
    async fn policy(&self, id: &str) -> Result<Policy, CoreError>;
}

#[async_trait]
pub trait ActionService: Send + Sync {
    async fn action(&self, id: &str) -> Result<Action, CoreError>;
}

#[async_trait]
pub trait UniverseService: Send + Sync {
    async fn solar_system(&self, id: u64) -> Result<SolarSystem, CoreError>;
    async fn constellation(&self, id: u64) -> Result<Constellation, CoreError>;
    async fn item(&self, id: u64) -> Result<Item, CoreError>;
}
