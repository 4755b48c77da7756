

pub mod api;
pub mod core;
pub mod filter;
pub mod model;
pub mod utils;

pub use utils::{cache_busted_url, generate_thumbnail_url, humanize_file_size};


pub use api::{CatalogClient, CqlRequest, CqlResponse, QueryTransport};
pub use crate::core::config::CatalogConfig;
pub use crate::core::error::{CatalogError, Result};
pub use crate::core::events::{Event, EventBus, REFRESH_DATA};
pub use crate::core::sources::{HarvestedSources, StaticSources};
pub use crate::core::throttle::{CoalescePolicy, Throttle};
pub use filter::Filter;
pub use model::{LiveQueryResult, Metacard, MetacardAction, QueryResult};


pub const DEFAULT_BASE_URL: &str = "https://localhost:8993/search/catalog/";


pub const DEFAULT_REFRESH_DELAY_MS: u64 = 1000;


pub const DEFAULT_THROTTLE_WINDOW_MS: u64 = 200;
