

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;


pub const REFRESH_DATA: &str = "refreshdata";


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: Uuid,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    /// Query the originating result belongs to, when known.
    pub query_id: Option<String>,
    pub payload: Value,
}

impl Event {
    
    #[must_use]
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            query_id: None,
            payload,
        }
    }

    
    #[must_use]
    pub fn with_query_id(mut self, query_id: Option<String>) -> Self {
        self.query_id = query_id;
        self
    }
}
