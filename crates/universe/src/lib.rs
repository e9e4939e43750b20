//! Reference data lookups for killmail hydration.

pub mod cache;
pub mod error;
pub mod esi;
pub mod fixed;

pub use cache::CachedUniverse;
pub use error::UniverseError;
pub use esi::EsiClient;
pub use fixed::StaticUniverse;
