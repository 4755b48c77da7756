

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::MetacardAction;


pub type Properties = Map<String, Value>;


/// Body of `POST /internal/cql`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CqlRequest {
    pub count: u32,
    pub cql: String,
    pub id: String,
    pub sort: String,
    pub src: String,
    pub start: u32,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyType {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub multivalued: bool,
    #[serde(default)]
    pub indexed: bool,
}

impl PropertyType {
    pub fn is_geometry(&self) -> bool {
        self.kind.eq_ignore_ascii_case("GEOMETRY")
    }
}

pub type PropertyTypes = HashMap<String, PropertyType>;


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CqlResponse {
    #[serde(default)]
    pub results: Vec<RawResult>,
    /// Attribute types keyed by metacard type name.
    #[serde(default)]
    pub types: HashMap<String, PropertyTypes>,
}


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetacard {
    #[serde(default)]
    pub properties: Properties,
}


/// One hit as the endpoint returns it. Relevance scores are not kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResult {
    pub metacard: RawMetacard,
    #[serde(default)]
    pub actions: Vec<MetacardAction>,
    #[serde(default)]
    pub has_thumbnail: bool,
    #[serde(default)]
    pub is_resource_local: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_drops_relevance_and_reads_types() {
        let body = json!({
            "results": [{
                "metacard": {"properties": {"id": "abc123", "metacard-type": "ddf.metacard"}},
                "actions": [{"id": "catalog.data.metacard.thumbnail", "title": "Thumbnail", "url": "https://host/t"}],
                "hasThumbnail": true,
                "relevance": 4.2
            }],
            "types": {"ddf.metacard": {"location": {"type": "GEOMETRY", "multivalued": false, "indexed": true}}}
        });

        let response: CqlResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.results.len(), 1);
        assert!(response.results[0].has_thumbnail);
        assert!(!response.results[0].is_resource_local);
        assert!(response.types["ddf.metacard"]["location"].is_geometry());

        let back = serde_json::to_value(&response.results[0]).unwrap();
        assert!(back.get("relevance").is_none());
    }

    #[test]
    fn test_request_serializes_wire_fields() {
        let request = CqlRequest {
            count: 1,
            cql: "(\"id\" = 'a')".to_string(),
            id: "0".to_string(),
            sort: "modified:desc".to_string(),
            src: "ddf.distribution".to_string(),
            start: 1,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["count"], json!(1));
        assert_eq!(value["sort"], json!("modified:desc"));
        assert_eq!(value["src"], json!("ddf.distribution"));
        assert_eq!(value["start"], json!(1));
    }
}
