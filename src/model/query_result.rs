//! One search hit: a metacard, its actions, and the read-side helpers renderers use.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::action::{ActionList, MetacardAction, PREVIEW_ACTION_ID, THUMBNAIL_ACTION_ID};
use super::geometry::Point;
use super::metacard::{self, Metacard};
use crate::api::models::{CqlRequest, Properties, PropertyTypes, RawResult};
use crate::core::error::Result;
use crate::core::sources::HarvestedSources;
use crate::filter::{self, Filter};
use crate::utils::{generate_thumbnail_url, humanize_file_size};


pub const RESULT_TYPE: &str = "query-result";
pub const REFRESH_SORT: &str = "modified:desc";


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Metacard id followed by source id.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub is_resource_local: bool,
    #[serde(default)]
    pub has_thumbnail: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metacard_type: Option<String>,
    #[serde(default)]
    pub property_types: PropertyTypes,
    pub metacard: Metacard,
    #[serde(default)]
    pub actions: ActionList,
}

impl QueryResult {
    
    pub fn new(metacard: Metacard, actions: Vec<MetacardAction>) -> Self {
        let id = composite_id(&metacard);
        Self {
            id,
            is_resource_local: false,
            has_thumbnail: false,
            metacard_type: metacard.get_str(metacard::METACARD_TYPE).map(str::to_string),
            property_types: PropertyTypes::new(),
            metacard,
            actions: ActionList::new(actions),
        }
    }

    /// Builds a result from the query endpoint's payload.
    ///
    /// `query_id` and `color` belong to the local query. Both are carried over onto
    /// the metacard, and `query_id` onto every action as well.
    pub fn from_raw(
        raw: RawResult,
        types: &HashMap<String, PropertyTypes>,
        query_id: Option<&str>,
        color: Option<&str>,
    ) -> Self {
        let RawResult {
            metacard: raw_metacard,
            actions,
            has_thumbnail,
            is_resource_local,
        } = raw;

        let mut metacard = Metacard::new(raw_metacard.properties);
        metacard.query_id = query_id.map(str::to_string);
        metacard.color = color.map(str::to_string);

        let metacard_type = metacard.get_str(metacard::METACARD_TYPE).map(str::to_string);
        let property_types = metacard_type
            .as_deref()
            .and_then(|t| types.get(t))
            .cloned()
            .unwrap_or_default();

        if let Some(size) = metacard.get(metacard::RESOURCE_SIZE).filter(|v| is_truthy(v)) {
            let humanized = humanize_file_size(size);
            metacard.set(metacard::RESOURCE_SIZE, humanized);
        }

        let mut actions = ActionList::new(actions);
        actions.set_query_id(query_id);

        let thumbnail = actions
            .find(THUMBNAIL_ACTION_ID)
            .filter(|_| has_thumbnail)
            .map(|action| generate_thumbnail_url(&action.url));
        match thumbnail {
            Some(url) => metacard.set(metacard::THUMBNAIL, Value::String(url)),
            None => {
                metacard.unset(metacard::THUMBNAIL);
            }
        }

        Self {
            id: composite_id(&metacard),
            is_resource_local,
            has_thumbnail,
            metacard_type,
            property_types,
            metacard,
            actions,
        }
    }

    pub fn result_type(&self) -> &'static str {
        RESULT_TYPE
    }

    pub fn get_title(&self) -> Option<&str> {
        self.metacard.get_str(metacard::TITLE)
    }

    pub fn get_preview(&self) -> Option<&str> {
        self.actions
            .iter()
            .find(|a| a.id == PREVIEW_ACTION_ID)
            .map(|a| a.url.as_str())
    }

    /// True whenever extracted text is present, even if the value is null.
    pub fn has_preview(&self) -> bool {
        self.metacard.properties.contains_key(metacard::EXTRACTED_TEXT)
    }

    pub fn get_thumbnail(&self) -> Option<&str> {
        self.metacard.get_str(metacard::THUMBNAIL)
    }

    pub fn get_resource_size(&self) -> Option<&Value> {
        self.metacard.get(metacard::RESOURCE_SIZE)
    }

    pub fn source_id(&self) -> Option<&str> {
        self.metacard.source_id()
    }

    pub fn matches_filters(&self, filter: &Filter) -> bool {
        filter::matches_filters(&self.metacard.to_json(), filter)
    }

    pub fn matches_cql(&self, cql: &str) -> Result<bool> {
        filter::matches_cql(&self.metacard.to_json(), cql)
    }

    pub fn is_resource(&self) -> bool {
        self.metacard.has_tag("resource")
    }

    pub fn is_revision(&self) -> bool {
        self.metacard.has_tag("revision")
    }

    pub fn is_deleted(&self) -> bool {
        self.metacard.has_tag("deleted")
    }

    /// A result is remote unless its source is harvested into the local index.
    pub fn is_remote(&self, sources: &dyn HarvestedSources) -> bool {
        !self
            .source_id()
            .is_some_and(|source| sources.is_harvested(source))
    }

    pub fn is_local(&self, sources: &dyn HarvestedSources) -> bool {
        !self.is_remote(sources)
    }

    pub fn has_geometry(&self, attribute: Option<&str>) -> bool {
        self.metacard.has_geometry(attribute, &self.property_types)
    }

    pub fn get_points(&self, attribute: Option<&str>) -> Result<Vec<Point>> {
        self.metacard.points(attribute, &self.property_types)
    }

    pub fn get_geometries(&self, attribute: Option<&str>) -> Vec<String> {
        self.metacard.geometries(attribute, &self.property_types)
    }

    pub fn get_map_actions(&self) -> Vec<&MetacardAction> {
        self.actions.iter().filter(|a| a.is_map_action()).collect()
    }

    pub fn has_map_actions(&self) -> bool {
        self.actions.iter().any(MetacardAction::is_map_action)
    }

    pub fn get_export_actions(&self) -> Vec<&MetacardAction> {
        self.actions.iter().filter(|a| a.is_export_action()).collect()
    }

    pub fn has_export_actions(&self) -> bool {
        self.actions.iter().any(MetacardAction::is_export_action)
    }

    pub fn get_other_actions(&self) -> Vec<&MetacardAction> {
        self.actions
            .iter()
            .filter(|a| !a.is_map_action() && !a.is_export_action())
            .collect()
    }

    /// Replaces the metacard's attributes wholesale; returns the keys that were dropped.
    pub fn apply_properties(&mut self, properties: Properties) -> Vec<String> {
        let cleared = self.metacard.replace_properties(properties);
        self.id = composite_id(&self.metacard);
        cleared
    }

    /// Takes on every field of `other`; returns the metacard keys that were dropped.
    pub fn replace_with(&mut self, other: QueryResult) -> Vec<String> {
        let mut cleared: Vec<String> = self
            .metacard
            .properties
            .keys()
            .filter(|k| !other.metacard.properties.contains_key(*k))
            .cloned()
            .collect();
        cleared.sort();
        *self = other;
        cleared
    }

    /// Matches the record by id, or by the id it was deleted under, as long as it
    /// still carries any tag.
    pub fn refresh_filter(&self) -> Filter {
        let id = self.metacard.id.as_str();
        let lookup_id = self.metacard.get_str(metacard::DELETED_ID).unwrap_or(id);
        Filter::and(vec![
            Filter::or(vec![
                Filter::eq(metacard::ID, lookup_id),
                Filter::eq(metacard::DELETED_ID, id),
            ]),
            Filter::ilike(metacard::METACARD_TAGS, "*"),
        ])
    }

    pub fn refresh_request(&self) -> CqlRequest {
        CqlRequest {
            count: 1,
            cql: self.refresh_filter().to_cql(),
            id: "0".to_string(),
            sort: REFRESH_SORT.to_string(),
            src: self.source_id().unwrap_or_default().to_string(),
            start: 1,
        }
    }
}

fn composite_id(metacard: &Metacard) -> String {
    format!("{}{}", metacard.id, metacard.source_id().unwrap_or_default())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{PropertyType, RawMetacard};
    use crate::core::sources::StaticSources;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    fn sample() -> QueryResult {
        let metacard = Metacard::new(props(json!({
            "id": "abc123",
            "title": "Harbor Survey",
            "source-id": "ddf.distribution",
            "metacard-tags": ["resource"],
            "location": "POINT (30 10)"
        })));
        let mut result = QueryResult::new(
            metacard,
            vec![
                MetacardAction::new("catalog.data.metacard.map.overlay.thumbnail", "Export Overlay", "https://h/overlay"),
                MetacardAction::new("catalog.data.metacard.export.xml", "Export as XML", "https://h/xml"),
                MetacardAction::new("catalog.data.metacard.html.preview", "Preview", "https://h/preview"),
                MetacardAction::new("catalog.data.metacard.resource", "download", "https://h/dl"),
            ],
        );
        result.property_types.insert(
            "location".to_string(),
            PropertyType { kind: "GEOMETRY".to_string(), multivalued: false, indexed: true },
        );
        result
    }

    fn ids(actions: Vec<&MetacardAction>) -> Vec<&str> {
        actions.into_iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_composite_id_and_title() {
        let result = sample();
        assert_eq!(result.id, "abc123ddf.distribution");
        assert_eq!(result.get_title(), Some("Harbor Survey"));
        assert_eq!(result.result_type(), "query-result");
        assert!(!result.is_resource_local);
    }

    #[test]
    fn test_preview() {
        let result = sample();
        assert_eq!(result.get_preview(), Some("https://h/preview"));
        assert!(!result.has_preview());

        let mut with_text = sample();
        with_text.metacard.set(metacard::EXTRACTED_TEXT, json!("body"));
        assert!(with_text.has_preview());

        let mut null_text = sample();
        null_text.metacard.set(metacard::EXTRACTED_TEXT, json!(null));
        assert!(null_text.has_preview());
        null_text.metacard.unset(metacard::EXTRACTED_TEXT);
        assert!(!null_text.has_preview());

        let bare = QueryResult::new(Metacard::default(), Vec::new());
        assert_eq!(bare.get_preview(), None);
        assert_eq!(bare.get_title(), None);
    }

    #[test]
    fn test_action_partition() {
        let result = sample();
        assert_eq!(ids(result.get_map_actions()), vec!["catalog.data.metacard.map.overlay.thumbnail"]);
        assert_eq!(ids(result.get_export_actions()), vec!["catalog.data.metacard.export.xml"]);
        assert_eq!(
            ids(result.get_other_actions()),
            vec!["catalog.data.metacard.resource", "catalog.data.metacard.html.preview"]
        );
        assert!(result.has_map_actions());
        assert!(result.has_export_actions());

        let total = result.get_map_actions().len()
            + result.get_export_actions().len()
            + result.get_other_actions().len();
        assert_eq!(total, result.actions.len());
    }

    #[test]
    fn test_tag_classification() {
        let mut result = sample();
        assert!(result.is_resource());
        assert!(!result.is_deleted());

        result.metacard.set(metacard::METACARD_TAGS, json!(["deleted"]));
        assert!(result.is_deleted());
        assert!(!result.is_resource());
        assert!(!result.is_revision());
    }

    #[test]
    fn test_remote_classification() {
        let result = sample();
        let harvested = StaticSources::new(["ddf.distribution"]);
        assert!(!result.is_remote(&harvested));
        assert!(result.is_local(&harvested));
        assert!(result.is_remote(&StaticSources::new(["other"])));

        let sourceless = QueryResult::new(Metacard::default(), Vec::new());
        assert!(sourceless.is_remote(&harvested));
    }

    #[test]
    fn test_geometry_delegation() {
        let result = sample();
        assert!(result.has_geometry(None));
        assert!(!result.has_geometry(Some("title")));
        assert_eq!(result.get_points(Some("location")).unwrap(), vec![[30.0, 10.0]]);
        assert_eq!(result.get_geometries(None), vec!["POINT (30 10)".to_string()]);
    }

    #[test]
    fn test_filter_matching() {
        let result = sample();
        assert!(result.matches_filters(&Filter::eq("title", "Harbor Survey")));
        assert!(result.matches_cql("\"source-id\" = 'ddf.distribution'").unwrap());
        assert!(!result.matches_cql("\"metacard-tags\" = 'deleted'").unwrap());
    }

    #[test]
    fn test_apply_properties_clears_missing_keys() {
        let mut result = sample();
        let cleared = result.apply_properties(props(json!({
            "id": "abc123",
            "title": "Renamed",
            "source-id": "ddf.distribution"
        })));
        assert_eq!(cleared, vec!["location".to_string(), "metacard-tags".to_string()]);
        assert_eq!(result.get_title(), Some("Renamed"));
        assert!(result.metacard.get("location").is_none());
        assert_eq!(result.metacard.properties.len(), 3);
    }

    #[test]
    fn test_refresh_request() {
        let request = sample().refresh_request();
        assert_eq!(request.count, 1);
        assert_eq!(request.id, "0");
        assert_eq!(request.sort, "modified:desc");
        assert_eq!(request.src, "ddf.distribution");
        assert_eq!(request.start, 1);
        assert_eq!(
            request.cql,
            "((\"id\" = 'abc123') OR (\"metacard.deleted.id\" = 'abc123')) AND (\"metacard-tags\" ILIKE '*')"
        );
    }

    #[test]
    fn test_refresh_filter_prefers_deleted_reference() {
        let mut result = sample();
        result.metacard.set(metacard::DELETED_ID, json!("orig9"));
        assert_eq!(
            result.refresh_request().cql,
            "((\"id\" = 'orig9') OR (\"metacard.deleted.id\" = 'abc123')) AND (\"metacard-tags\" ILIKE '*')"
        );
    }

    #[test]
    fn test_from_raw_normalizes_payload() {
        let raw = RawResult {
            metacard: RawMetacard {
                properties: props(json!({
                    "id": "abc123",
                    "source-id": "ddf.distribution",
                    "metacard-type": "ddf.metacard",
                    "resource-size": "1536",
                    "thumbnail": "stale"
                })),
            },
            actions: vec![
                MetacardAction::new(THUMBNAIL_ACTION_ID, "Thumbnail", "https://h/thumb?id=abc123"),
                MetacardAction::new("catalog.data.metacard.resource", "Download", "https://h/dl"),
            ],
            has_thumbnail: true,
            is_resource_local: true,
        };
        let mut types = HashMap::new();
        types.insert(
            "ddf.metacard".to_string(),
            PropertyTypes::from([(
                "location".to_string(),
                PropertyType { kind: "GEOMETRY".to_string(), multivalued: false, indexed: true },
            )]),
        );

        let result = QueryResult::from_raw(raw, &types, Some("q-7"), Some("#ff0000"));

        assert_eq!(result.id, "abc123ddf.distribution");
        assert_eq!(result.metacard.id, "abc123");
        assert_eq!(result.metacard_type.as_deref(), Some("ddf.metacard"));
        assert!(result.property_types.contains_key("location"));
        assert_eq!(result.metacard.query_id.as_deref(), Some("q-7"));
        assert_eq!(result.metacard.color.as_deref(), Some("#ff0000"));
        assert!(result.actions.iter().all(|a| a.query_id.as_deref() == Some("q-7")));
        assert_eq!(result.get_resource_size(), Some(&json!("2 KB")));
        assert!(result.is_resource_local);

        let thumbnail = result.get_thumbnail().unwrap();
        assert!(thumbnail.starts_with("https://h/thumb?id=abc123&_="));
    }

    #[test]
    fn test_from_raw_drops_thumbnail_without_flag() {
        let raw = RawResult {
            metacard: RawMetacard {
                properties: props(json!({"id": "x", "thumbnail": "stale", "resource-size": 0})),
            },
            actions: vec![MetacardAction::new(THUMBNAIL_ACTION_ID, "Thumbnail", "https://h/t")],
            has_thumbnail: false,
            is_resource_local: false,
        };
        let result = QueryResult::from_raw(raw, &HashMap::new(), None, None);
        assert_eq!(result.get_thumbnail(), None);
        assert_eq!(result.get_resource_size(), Some(&json!(0)));
        assert_eq!(result.id, "x");
        assert!(result.property_types.is_empty());
    }
}
