use std::collections::BTreeMap;

use serde_json::Value;

use crate::codec::PropertyMap;

/// Keys that differ between two property maps, with their previous value
///
/// `None` marks a key that did not exist before. A key present with an equal
/// value on both sides never appears.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: BTreeMap<String, Option<Value>>,
}

impl ChangeSet {
    /// Diffs `previous` against `next` using structural value equality.
    pub fn between(
        previous: &PropertyMap,
        next: &PropertyMap,
    ) -> Self {
        let mut changes = BTreeMap::new();

        for (key, previous_value) in previous {
            match next.get(key) {
                Some(next_value) if next_value == previous_value => {}
                // updated or deleted
                _ => {
                    changes.insert(key.clone(), Some(previous_value.clone()));
                }
            }
        }

        for key in next.keys().filter(|key| !previous.contains_key(*key)) {
            changes.insert(key.clone(), None);
        }

        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.changes.contains_key(key)
    }

    /// `Some(None)` for an added key, `Some(Some(v))` for an updated or removed one
    pub fn previous_value(
        &self,
        key: &str,
    ) -> Option<Option<&Value>> {
        self.changes.get(key).map(Option::as_ref)
    }

    /// Changed keys in lexical order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn into_inner(self) -> BTreeMap<String, Option<Value>> {
        self.changes
    }
}
