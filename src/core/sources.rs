

use std::collections::HashSet;

use parking_lot::RwLock;


/// Knows which catalog sources are harvested into the local index.
///
/// Results from any other source are treated as remote.
pub trait HarvestedSources: Send + Sync {
    fn harvested(&self) -> Vec<String>;

    fn is_harvested(&self, source_id: &str) -> bool {
        self.harvested().iter().any(|s| s == source_id)
    }
}


#[derive(Debug, Default)]
pub struct StaticSources {
    ids: RwLock<HashSet<String>>,
}

impl StaticSources {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: RwLock::new(ids.into_iter().map(Into::into).collect()),
        }
    }

    pub fn insert(&self, source_id: impl Into<String>) {
        self.ids.write().insert(source_id.into());
    }

    pub fn remove(&self, source_id: &str) -> bool {
        self.ids.write().remove(source_id)
    }
}

impl HarvestedSources for StaticSources {
    fn harvested(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ids.read().iter().cloned().collect();
        ids.sort();
        ids
    }

    fn is_harvested(&self, source_id: &str) -> bool {
        self.ids.read().contains(source_id)
    }
}
