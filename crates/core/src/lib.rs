pub mod action;
pub mod config;
pub mod error;
pub mod killmail;
pub mod paths;
pub mod policy;
pub mod services;
pub mod universe;

pub use action::{classify_endpoint, Action, Infraction, Platform};
pub use config::{load_dotenv, Config};
pub use error::CoreError;
pub use killmail::{Attacker, Killmail, Meta, Victim};
pub use policy::{Dispatchable, Policy, PolicyFilter};
pub use services::{ActionService, PolicyService, UniverseService};
pub use universe::{Constellation, Item, SolarSystem};
