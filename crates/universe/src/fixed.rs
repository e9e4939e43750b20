use std::collections::HashMap;

use async_trait::async_trait;

use killwatch_core::{Constellation, CoreError, Item, SolarSystem, UniverseService};

/// Fixed in-memory universe for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticUniverse {
    systems: HashMap<u64, SolarSystem>,
    constellations: HashMap<u64, Constellation>,
    items: HashMap<u64, Item>,
}

impl StaticUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system(mut self, id: u64, constellation_id: u64) -> Self {
        self.systems.insert(
            id,
            SolarSystem {
                id,
                name: format!("system-{id}"),
                security_status: 0.0,
                constellation_id,
            },
        );
        self
    }

    pub fn with_constellation(mut self, id: u64, region_id: u64) -> Self {
        self.constellations.insert(
            id,
            Constellation {
                id,
                name: format!("constellation-{id}"),
                region_id,
            },
        );
        self
    }

    pub fn with_item(mut self, id: u64, group_id: u64) -> Self {
        self.items.insert(
            id,
            Item {
                id,
                group_id,
                name: format!("item-{id}"),
                published: true,
            },
        );
        self
    }
}

#[async_trait]
impl UniverseService for StaticUniverse {
    async fn solar_system(&self, id: u64) -> Result<SolarSystem, CoreError> {
        self.systems
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("solar system", id))
    }

    async fn constellation(&self, id: u64) -> Result<Constellation, CoreError> {
        self.constellations
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("constellation", id))
    }

    async fn item(&self, id: u64) -> Result<Item, CoreError> {
        self.items
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("item", id))
    }
}
