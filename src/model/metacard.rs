

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::geometry::{wkt_points, Point};
use crate::api::models::{Properties, PropertyTypes};
use crate::core::error::Result;


pub const ID: &str = "id";
pub const TITLE: &str = "title";
pub const SOURCE_ID: &str = "source-id";
pub const METACARD_TAGS: &str = "metacard-tags";
pub const METACARD_TYPE: &str = "metacard-type";
pub const RESOURCE_SIZE: &str = "resource-size";
pub const THUMBNAIL: &str = "thumbnail";
pub const EXTRACTED_TEXT: &str = "ext.extracted.text";
pub const DELETED_ID: &str = "metacard.deleted.id";


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metacard {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub properties: Properties,
    /// Correlates the record with the query that produced it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Metacard {
    
    pub fn new(properties: Properties) -> Self {
        let id = properties
            .get(ID)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            id,
            properties,
            query_id: None,
            color: None,
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.properties.get(attribute).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, attribute: &str) -> Option<&str> {
        self.get(attribute).and_then(Value::as_str)
    }

    pub fn set(&mut self, attribute: impl Into<String>, value: Value) {
        self.properties.insert(attribute.into(), value);
    }

    pub fn unset(&mut self, attribute: &str) -> Option<Value> {
        self.properties.remove(attribute)
    }

    pub fn source_id(&self) -> Option<&str> {
        self.get_str(SOURCE_ID)
    }

    /// `metacard-tags` as a list, whether stored as an array or a single string.
    pub fn tags(&self) -> Vec<&str> {
        match self.get(METACARD_TAGS) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(tag)) => vec![tag.as_str()],
            _ => Vec::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().contains(&tag)
    }

    /// Swaps in a new attribute set and returns the keys that disappeared, sorted.
    pub fn replace_properties(&mut self, properties: Properties) -> Vec<String> {
        let mut cleared: Vec<String> = self
            .properties
            .keys()
            .filter(|k| !properties.contains_key(*k))
            .cloned()
            .collect();
        cleared.sort();

        self.properties = properties;
        if let Some(id) = self.properties.get(ID).and_then(Value::as_str) {
            self.id = id.to_string();
        }
        cleared
    }

    /// Plain-data projection used for filter evaluation.
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "properties": self.properties,
            "queryId": self.query_id,
            "color": self.color,
        })
    }

    fn geometry_values<'a>(
        &'a self,
        attribute: Option<&'a str>,
        types: &'a PropertyTypes,
    ) -> impl Iterator<Item = (&'a String, &'a Value)> + 'a {
        self.properties.iter().filter(move |(key, value)| {
            !value.is_null()
                && attribute.is_none_or(|a| a == key.as_str())
                && types.get(key.as_str()).is_some_and(|t| t.is_geometry())
        })
    }

    pub fn has_geometry(&self, attribute: Option<&str>, types: &PropertyTypes) -> bool {
        self.geometry_values(attribute, types).next().is_some()
    }

    /// WKT strings of geometry attributes; multivalued attributes contribute each entry.
    pub fn geometries(&self, attribute: Option<&str>, types: &PropertyTypes) -> Vec<String> {
        self.geometry_values(attribute, types)
            .flat_map(|(_, value)| match value {
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>(),
                Value::String(wkt) => vec![wkt.clone()],
                _ => Vec::new(),
            })
            .collect()
    }

    pub fn points(&self, attribute: Option<&str>, types: &PropertyTypes) -> Result<Vec<Point>> {
        let mut points = Vec::new();
        for wkt in self.geometries(attribute, types) {
            points.extend(wkt_points(&wkt)?);
        }
        Ok(points)
    }
}
