

use serde::{Deserialize, Serialize};


pub const PREVIEW_ACTION_ID: &str = "catalog.data.metacard.html.preview";
pub const THUMBNAIL_ACTION_ID: &str = "catalog.data.metacard.thumbnail";
pub const MAP_ACTION_PREFIX: &str = "catalog.data.metacard.map.";
pub const EXPORT_TITLE_PREFIX: &str = "Export";


/// An operation the catalog offers on a record (download, export, overlay...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetacardAction {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
}

impl MetacardAction {
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            description: None,
            query_id: None,
        }
    }

    pub fn is_map_action(&self) -> bool {
        self.id.starts_with(MAP_ACTION_PREFIX)
    }

    pub fn is_export_action(&self) -> bool {
        self.title.starts_with(EXPORT_TITLE_PREFIX) && !self.is_map_action()
    }

    fn sort_key(&self) -> String {
        self.title.to_lowercase()
    }
}


/// Actions kept in case-insensitive title order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<MetacardAction>", into = "Vec<MetacardAction>")]
pub struct ActionList {
    actions: Vec<MetacardAction>,
}

impl ActionList {
    pub fn new(mut actions: Vec<MetacardAction>) -> Self {
        actions.sort_by_cached_key(MetacardAction::sort_key);
        Self { actions }
    }

    /// Inserts after any actions with an equal sort key.
    pub fn insert(&mut self, action: MetacardAction) {
        let key = action.sort_key();
        let at = self.actions.partition_point(|a| a.sort_key() <= key);
        self.actions.insert(at, action);
    }

    pub fn remove(&mut self, id: &str) -> Option<MetacardAction> {
        let at = self.actions.iter().position(|a| a.id == id)?;
        Some(self.actions.remove(at))
    }

    pub fn find(&self, id: &str) -> Option<&MetacardAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn set_query_id(&mut self, query_id: Option<&str>) {
        for action in &mut self.actions {
            action.query_id = query_id.map(str::to_string);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetacardAction> {
        self.actions.iter()
    }

    pub fn as_slice(&self) -> &[MetacardAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl From<Vec<MetacardAction>> for ActionList {
    fn from(actions: Vec<MetacardAction>) -> Self {
        Self::new(actions)
    }
}

impl From<ActionList> for Vec<MetacardAction> {
    fn from(list: ActionList) -> Self {
        list.actions
    }
}

impl<'a> IntoIterator for &'a ActionList {
    type Item = &'a MetacardAction;
    type IntoIter = std::slice::Iter<'a, MetacardAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}
