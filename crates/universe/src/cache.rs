use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use lru::LruCache;
use tracing::debug;

use killwatch_core::{Constellation, CoreError, Item, SolarSystem, UniverseService};

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Cache-then-origin wrapper with one LRU cache per record kind.
///
/// Misses are not cached, so a record that appears upstream later is
/// picked up on the next lookup.
pub struct CachedUniverse<O> {
    origin: O,
    systems: Mutex<LruCache<u64, SolarSystem>>,
    constellations: Mutex<LruCache<u64, Constellation>>,
    items: Mutex<LruCache<u64, Item>>,
}

impl<O: UniverseService> CachedUniverse<O> {
    /// `capacity` is per kind; 0 falls back to the default.
    pub fn new(origin: O, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        Self {
            origin,
            systems: Mutex::new(LruCache::new(cap)),
            constellations: Mutex::new(LruCache::new(cap)),
            items: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn origin(&self) -> &O {
        &self.origin
    }

    /// Number of cached records across all kinds.
    pub fn len(&self) -> usize {
        lock(&self.systems).len() + lock(&self.constellations).len() + lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn cached<T: Clone>(cache: &Mutex<LruCache<u64, T>>, id: u64) -> Option<T> {
    lock(cache).get(&id).cloned()
}

#[async_trait]
impl<O: UniverseService> UniverseService for CachedUniverse<O> {
    async fn solar_system(&self, id: u64) -> Result<SolarSystem, CoreError> {
        if let Some(hit) = cached(&self.systems, id) {
            return Ok(hit);
        }
        debug!(id, "solar system cache miss");
        let system = self.origin.solar_system(id).await?;
        lock(&self.systems).put(id, system.clone());
        Ok(system)
    }

    async fn constellation(&self, id: u64) -> Result<Constellation, CoreError> {
        if let Some(hit) = cached(&self.constellations, id) {
            return Ok(hit);
        }
        debug!(id, "constellation cache miss");
        let constellation = self.origin.constellation(id).await?;
        lock(&self.constellations).put(id, constellation.clone());
        Ok(constellation)
    }

    async fn item(&self, id: u64) -> Result<Item, CoreError> {
        if let Some(hit) = cached(&self.items, id) {
            return Ok(hit);
        }
        debug!(id, "item cache miss");
        let item = self.origin.item(id).await?;
        lock(&self.items).put(id, item.clone());
        Ok(item)
    }
}
