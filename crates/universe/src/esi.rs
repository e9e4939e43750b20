//! EVE Swagger Interface client.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use killwatch_core::config::EsiConfig;
use killwatch_core::{Constellation, CoreError, Item, SolarSystem, UniverseService};

use crate::error::UniverseError;

/// Fetches universe records straight from ESI. Wrap in
/// [`crate::CachedUniverse`] for production use.
#[derive(Debug, Clone)]
pub struct EsiClient {
    base_url: String,
    client: reqwest::Client,
}

impl EsiClient {
    pub fn new(config: &EsiConfig) -> Result<Self, UniverseError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        kind: &'static str,
        path: &str,
        id: u64,
    ) -> Result<T, UniverseError> {
        let url = format!("{}/{}/{}/", self.base_url, path, id);
        debug!(url = %url, "esi request");

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(UniverseError::NotFound { kind, id });
        }
        let body = response.error_for_status()?.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| UniverseError::Decode(format!("{kind} {id}: {e}")))
    }

    pub async fn fetch_solar_system(&self, id: u64) -> Result<SolarSystem, UniverseError> {
        self.get("solar system", "universe/systems", id).await
    }

    pub async fn fetch_constellation(&self, id: u64) -> Result<Constellation, UniverseError> {
        self.get("constellation", "universe/constellations", id).await
    }

    pub async fn fetch_item(&self, id: u64) -> Result<Item, UniverseError> {
        self.get("item", "universe/types", id).await
    }
}

#[async_trait]
impl UniverseService for EsiClient {
    async fn solar_system(&self, id: u64) -> Result<SolarSystem, CoreError> {
        Ok(self.fetch_solar_system(id).await?)
    }

    async fn constellation(&self, id: u64) -> Result<Constellation, CoreError> {
        Ok(self.fetch_constellation(id).await?)
    }

    async fn item(&self, id: u64) -> Result<Item, CoreError> {
        Ok(self.fetch_item(id).await?)
    }
}
