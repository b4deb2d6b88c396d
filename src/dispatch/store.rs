use parking_lot::RwLock;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;

use crate::codec::PropertyMap;
use crate::DispatchError;

/// A named, ordered unit of configuration
///
/// Sources with a higher `order` take precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySource {
    pub name: String,
    pub order: i32,
    pub values: PropertyMap,
}

impl PropertySource {
    pub fn new(
        name: impl Into<String>,
        values: PropertyMap,
        order: i32,
    ) -> Self {
        Self {
            name: name.into(),
            order,
            values,
        }
    }
}

/// The application's resolved configuration, as far as the watcher sees it
///
/// Implementations are shared by every path task and must accept concurrent,
/// interleaved calls; each path only ever writes its own source name.
#[cfg_attr(test, automock)]
pub trait PropertySourceStore: Send + Sync + 'static {
    /// Current sources in ascending order
    fn property_sources(&self) -> Vec<PropertySource>;

    /// Adds `source`, replacing any existing source with the same name
    fn add_property_source(
        &self,
        source: PropertySource,
    ) -> std::result::Result<(), DispatchError>;
}

/// Process-local [`PropertySourceStore`]
#[derive(Debug, Default)]
pub struct InMemoryPropertySourceStore {
    sources: RwLock<Vec<PropertySource>>,
}

impl InMemoryPropertySourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<PropertySource> {
        self.sources.read().iter().find(|s| s.name == name).cloned()
    }

    /// Resolves `key` against every source, highest order first
    pub fn get_property(
        &self,
        key: &str,
    ) -> Option<Value> {
        self.sources.read().iter().rev().find_map(|s| s.values.get(key).cloned())
    }
}

impl PropertySourceStore for InMemoryPropertySourceStore {
    fn property_sources(&self) -> Vec<PropertySource> {
        self.sources.read().clone()
    }

    fn add_property_source(
        &self,
        source: PropertySource,
    ) -> std::result::Result<(), DispatchError> {
        let mut sources = self.sources.write();
        sources.retain(|s| s.name != source.name);
        sources.push(source);
        // stable: equal orders keep insertion order
        sources.sort_by_key(|s| s.order);
        Ok(())
    }
}
