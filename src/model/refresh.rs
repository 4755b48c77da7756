//! Live wrapper around a [`QueryResult`] that keeps it in sync with the catalog.
//!
//! `refresh_data(Some(properties))` applies a payload the caller already has;
//! `refresh_data(None)` re-queries the catalog after the configured delay. Both
//! go through one throttle per result, and every applied refresh emits a
//! [`REFRESH_DATA`] event.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::query_result::QueryResult;
use crate::api::client::QueryTransport;
use crate::api::models::{CqlResponse, Properties};
use crate::core::config::CatalogConfig;
use crate::core::error::CatalogError;
use crate::core::events::{Event, EventBus, EventHandler, REFRESH_DATA};
use crate::core::throttle::{Throttle, ThrottleOutcome};


struct RefreshContext {
    state: Arc<RwLock<QueryResult>>,
    transport: Arc<dyn QueryTransport>,
    bus: EventBus,
    refresh_delay: Duration,
}

impl RefreshContext {
    fn refresh(self: &Arc<Self>, properties: Option<Properties>) {
        match properties {
            Some(properties) => self.apply_direct(properties),
            None => {
                self.schedule_remote();
            }
        }
    }

    fn apply_direct(&self, properties: Properties) {
        let (id, query_id, cleared) = {
            let mut state = self.state.write();
            let cleared = state.apply_properties(properties);
            (state.id.clone(), state.metacard.query_id.clone(), cleared)
        };
        debug!("Applied direct refresh to {} ({} attributes cleared)", id, cleared.len());
        self.notify(id, query_id, cleared, "direct");
    }

    fn schedule_remote(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("Remote refresh requested outside an async runtime, skipping");
                return None;
            }
        };

        let ctx = Arc::clone(self);
        Some(handle.spawn(async move {
            tokio::time::sleep(ctx.refresh_delay).await;

            let request = ctx.state.read().refresh_request();
            debug!("Refreshing {} from source {}", request.cql, request.src);

            match ctx.transport.query(&request).await {
                Ok(response) => ctx.parse_refresh(response),
                Err(e) => ctx.handle_refresh_error(e),
            }
        }))
    }

    fn parse_refresh(&self, response: CqlResponse) {
        let (query_id, color) = {
            let state = self.state.read();
            (state.metacard.query_id.clone(), state.metacard.color.clone())
        };

        let CqlResponse { results, types } = response;
        let first = results
            .into_iter()
            .map(|raw| QueryResult::from_raw(raw, &types, query_id.as_deref(), color.as_deref()))
            .next();

        let (id, cleared) = {
            let mut state = self.state.write();
            let cleared = match first {
                Some(fresh) => state.replace_with(fresh),
                None => {
                    debug!("Refresh of {} returned no results, keeping current state", state.id);
                    Vec::new()
                }
            };
            (state.id.clone(), cleared)
        };

        info!("Refreshed result {}", id);
        self.notify(id, query_id, cleared, "remote");
    }

    // Failures are not surfaced to observers yet; see DESIGN.md.
    fn handle_refresh_error(&self, error: CatalogError) {
        let id = self.state.read().id.clone();
        warn!("Refresh of {} failed: {}", id, error);
    }

    fn notify(&self, id: String, query_id: Option<String>, cleared: Vec<String>, source: &str) {
        let event = Event::new(
            REFRESH_DATA,
            json!({"id": id, "cleared": cleared, "source": source}),
        )
        .with_query_id(query_id);
        self.bus.emit(event);
    }
}


pub struct LiveQueryResult {
    ctx: Arc<RefreshContext>,
    throttle: Throttle<Option<Properties>>,
}

impl LiveQueryResult {
    
    pub fn new(
        result: QueryResult,
        transport: Arc<dyn QueryTransport>,
        bus: EventBus,
        config: &CatalogConfig,
    ) -> Self {
        let ctx = Arc::new(RefreshContext {
            state: Arc::new(RwLock::new(result)),
            transport,
            bus,
            refresh_delay: config.refresh_delay(),
        });

        let throttled = Arc::clone(&ctx);
        let throttle = Throttle::new(config.throttle_window(), config.coalesce, move |properties| {
            throttled.refresh(properties)
        });

        Self { ctx, throttle }
    }

    /// Applies `properties` now, or re-fetches the record when `None`. Throttled.
    pub fn refresh_data(&self, properties: Option<Properties>) -> ThrottleOutcome {
        self.throttle.call(properties)
    }

    /// Schedules a remote refresh directly, bypassing the throttle.
    pub fn refresh_remote(&self) -> Option<JoinHandle<()>> {
        self.ctx.schedule_remote()
    }

    /// Merges a response obtained elsewhere, as a remote refresh would.
    pub fn parse_refresh(&self, response: CqlResponse) {
        self.ctx.parse_refresh(response);
    }

    pub fn on_refresh(&self, handler: EventHandler) {
        self.ctx.bus.register(REFRESH_DATA, handler);
    }

    pub fn read<R>(&self, f: impl FnOnce(&QueryResult) -> R) -> R {
        f(&self.ctx.state.read())
    }

    pub fn snapshot(&self) -> QueryResult {
        self.ctx.state.read().clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.ctx.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{CqlRequest, RawMetacard, RawResult};
    use crate::core::error::Result;
    use crate::model::{Metacard, MetacardAction};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::Value;
    use tokio::time::Instant;

    struct RecordingTransport {
        calls: Mutex<Vec<(Instant, CqlRequest)>>,
        response: Mutex<Option<CqlResponse>>,
    }

    impl RecordingTransport {
        fn answering(response: Option<CqlResponse>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                response: Mutex::new(response),
            })
        }
    }

    #[async_trait]
    impl QueryTransport for RecordingTransport {
        async fn query(&self, request: &CqlRequest) -> Result<CqlResponse> {
            self.calls.lock().push((Instant::now(), request.clone()));
            self.response
                .lock()
                .clone()
                .ok_or_else(|| CatalogError::Status { status: 500, body: "boom".to_string() })
        }
    }

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    fn initial() -> QueryResult {
        let mut metacard = Metacard::new(props(json!({
            "id": "abc123",
            "title": "Before",
            "source-id": "ddf.distribution",
            "metacard-tags": ["resource"],
            "stale": true
        })));
        metacard.query_id = Some("q-1".to_string());
        metacard.color = Some("#00ff00".to_string());
        QueryResult::new(metacard, vec![MetacardAction::new("a", "Download", "https://h/dl")])
    }

    fn fresh_response() -> CqlResponse {
        CqlResponse {
            results: vec![RawResult {
                metacard: RawMetacard {
                    properties: props(json!({
                        "id": "abc123",
                        "title": "After",
                        "source-id": "ddf.distribution",
                        "metacard-tags": ["resource"],
                        "resource-size": "1048576"
                    })),
                },
                actions: vec![MetacardAction::new("b", "Export as XML", "https://h/xml")],
                has_thumbnail: false,
                is_resource_local: false,
            }],
            types: Default::default(),
        }
    }

    fn live(transport: Arc<RecordingTransport>) -> (LiveQueryResult, Arc<Mutex<Vec<Event>>>) {
        let live = LiveQueryResult::new(initial(), transport, EventBus::new(), &CatalogConfig::default());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        live.on_refresh(Arc::new(move |event: &Event| sink.lock().push(event.clone())));
        (live, events)
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_update_replaces_properties() {
        let transport = RecordingTransport::answering(None);
        let (live, events) = live(Arc::clone(&transport));

        let outcome = live.refresh_data(Some(props(json!({
            "id": "abc123",
            "title": "Edited",
            "source-id": "ddf.distribution"
        }))));
        assert_eq!(outcome, ThrottleOutcome::Ran);

        let result = live.snapshot();
        assert_eq!(result.get_title(), Some("Edited"));
        assert!(result.metacard.get("stale").is_none());
        assert!(result.metacard.get("metacard-tags").is_none());

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["source"], json!("direct"));
        assert_eq!(events[0].payload["cleared"], json!(["metacard-tags", "stale"]));
        assert_eq!(events[0].query_id.as_deref(), Some("q-1"));
        assert!(transport.calls.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_direct_updates_coalesce() {
        let (live, events) = live(RecordingTransport::answering(None));

        live.refresh_data(Some(props(json!({"id": "abc123", "title": "one"}))));
        assert_eq!(
            live.refresh_data(Some(props(json!({"id": "abc123", "title": "two"})))),
            ThrottleOutcome::Scheduled
        );
        live.refresh_data(Some(props(json!({"id": "abc123", "title": "three"}))));

        assert_eq!(live.read(|r| r.get_title().map(str::to_string)), Some("one".to_string()));
        assert_eq!(events.lock().len(), 1);

        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(live.read(|r| r.get_title().map(str::to_string)), Some("three".to_string()));
        assert_eq!(events.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_refresh_posts_once_after_delay() {
        let transport = RecordingTransport::answering(Some(fresh_response()));
        let (live, events) = live(Arc::clone(&transport));
        let started = Instant::now();

        assert_eq!(live.refresh_data(None), ThrottleOutcome::Ran);

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(transport.calls.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(50)).await;
        let calls = transport.calls.lock().clone();
        assert_eq!(calls.len(), 1);

        let (at, request) = &calls[0];
        assert!(at.duration_since(started) >= Duration::from_millis(1000));
        assert_eq!(request.count, 1);
        assert_eq!(request.sort, "modified:desc");
        assert_eq!(request.src, "ddf.distribution");
        assert_eq!(
            request.cql,
            "((\"id\" = 'abc123') OR (\"metacard.deleted.id\" = 'abc123')) AND (\"metacard-tags\" ILIKE '*')"
        );

        let result = live.snapshot();
        assert_eq!(result.get_title(), Some("After"));
        assert!(result.metacard.get("stale").is_none());
        assert_eq!(result.metacard.query_id.as_deref(), Some("q-1"));
        assert_eq!(result.metacard.color.as_deref(), Some("#00ff00"));
        assert_eq!(result.get_resource_size(), Some(&json!("1.0 MB")));
        assert_eq!(result.actions.len(), 1);
        assert_eq!(result.actions.as_slice()[0].query_id.as_deref(), Some("q-1"));

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["source"], json!("remote"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_refresh_failure_is_swallowed() {
        let transport = RecordingTransport::answering(None);
        let (live, events) = live(Arc::clone(&transport));

        live.refresh_remote().unwrap().await.unwrap();

        assert_eq!(transport.calls.lock().len(), 1);
        assert!(events.lock().is_empty());
        assert_eq!(live.snapshot(), initial());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_response_keeps_state_and_notifies() {
        let (live, events) = live(RecordingTransport::answering(None));

        live.parse_refresh(CqlResponse::default());

        assert_eq!(live.snapshot(), initial());
        assert_eq!(events.lock().len(), 1);
    }
}
