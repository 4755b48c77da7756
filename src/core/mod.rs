

pub mod config;
pub mod error;
pub mod events;
pub mod sources;
pub mod throttle;

pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use events::{Event, EventBus, EventHandler, REFRESH_DATA};
pub use sources::{HarvestedSources, StaticSources};
pub use throttle::{CoalescePolicy, Throttle, ThrottleOutcome};
