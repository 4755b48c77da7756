

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use catalog_results::{
    CatalogClient, CatalogConfig, EventBus, LiveQueryResult, Metacard, QueryResult,
};
use serde_json::{json, Map};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            EnvFilter::new("warn")
                .add_directive("catalog_results=info".parse().expect("static directive"))
        });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(id), Some(source_id)) = (args.next(), args.next()) else {
        bail!("usage: catalog-refresh <metacard-id> <source-id>");
    };

    let config_path = std::env::var_os("CATALOG_CONFIG").map(PathBuf::from);
    let config = CatalogConfig::load(config_path.as_deref()).context("loading configuration")?;
    let client = CatalogClient::new(&config).context("building catalog client")?;

    let mut properties = Map::new();
    properties.insert("id".to_string(), json!(id));
    properties.insert("source-id".to_string(), json!(source_id));
    let result = QueryResult::new(Metacard::new(properties), Vec::new());

    let live = LiveQueryResult::new(result, Arc::new(client), EventBus::new(), &config);
    info!("Refreshing {} from {}", id, source_id);

    let handle = live
        .refresh_remote()
        .context("no async runtime available")?;
    handle.await.context("refresh task panicked")?;

    let refreshed = live.snapshot();
    println!("{}", serde_json::to_string_pretty(&refreshed)?);
    Ok(())
}
