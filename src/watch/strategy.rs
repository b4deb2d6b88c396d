use std::fmt;
use std::sync::Arc;

use config::ConfigError;

use super::Observed;
use crate::codec::read_document;
use crate::codec::read_native;
use crate::codec::reader_for;
use crate::codec::PropertyMap;
use crate::codec::PropertySourceReader;
use crate::kv::are_all_equal;
use crate::kv::are_equal;
use crate::kv::KeyValue;
use crate::ConfigFormat;
use crate::DecodeError;
use crate::Error;
use crate::Result;

/// How a watched path is queried, compared and decoded
#[derive(Clone)]
pub enum WatchStrategy {
    /// Recursive prefix read, one property per entry
    Native,
    /// Single entry holding a whole document in the reader's format
    Document(Arc<dyn PropertySourceReader>),
}

impl fmt::Debug for WatchStrategy {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            WatchStrategy::Native => f.write_str("Native"),
            WatchStrategy::Document(_) => f.write_str("Document"),
        }
    }
}

impl WatchStrategy {
    pub fn for_format(format: ConfigFormat) -> Result<Self> {
        if format == ConfigFormat::Native {
            return Ok(WatchStrategy::Native);
        }
        reader_for(format).map(WatchStrategy::Document).ok_or_else(|| {
            Error::Config(ConfigError::Message(format!(
                "Unhandled configuration format: {format}"
            )))
        })
    }

    pub fn recurse(&self) -> bool {
        matches!(self, WatchStrategy::Native)
    }

    /// Picks the part of a query answer this strategy watches
    ///
    /// `None` when a document path has no entry with exactly its key.
    pub fn select(
        &self,
        path: &str,
        entries: Vec<KeyValue>,
    ) -> Option<Observed> {
        match self {
            WatchStrategy::Native => Some(Observed::Multi(entries)),
            WatchStrategy::Document(_) => {
                let key = path.trim_matches('/');
                entries.into_iter().find(|kv| kv.key == key).map(Observed::Single)
            }
        }
    }

    /// Key and value equality; prefix listings are compared regardless of order
    pub fn are_equal(
        &self,
        left: &Observed,
        right: &Observed,
    ) -> bool {
        match (left, right) {
            (Observed::Single(l), Observed::Single(r)) => are_equal(l, r),
            (Observed::Multi(l), Observed::Multi(r)) => are_all_equal(l, r),
            _ => false,
        }
    }

    pub fn read(
        &self,
        observed: &Observed,
    ) -> std::result::Result<PropertyMap, DecodeError> {
        match (self, observed) {
            (WatchStrategy::Native, Observed::Multi(entries)) => read_native(entries),
            (WatchStrategy::Native, Observed::Single(entry)) => read_native(std::slice::from_ref(entry)),
            (WatchStrategy::Document(reader), Observed::Single(entry)) => read_document(Some(entry), reader.as_ref()),
            (WatchStrategy::Document(reader), Observed::Multi(entries)) => {
                read_document(entries.first(), reader.as_ref())
            }
        }
    }
}
