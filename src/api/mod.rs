

pub mod client;
pub mod models;

pub use client::{CatalogClient, QueryTransport};
pub use models::{CqlRequest, CqlResponse, Properties, PropertyType, PropertyTypes, RawMetacard, RawResult};
