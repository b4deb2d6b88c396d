//! Turns raw Consul values into property maps.
//!
//! Two shapes exist. The native format stores one property per KV entry under
//! a prefix, so a flat `last path segment -> value` mapping is enough. Every
//! other format stores a whole document in a single entry and delegates to a
//! [`PropertySourceReader`] for that format.

mod json;
mod native;
mod properties;
mod yaml;
pub use json::*;
pub use native::*;
pub use properties::*;
pub use yaml::*;


use std::collections::HashMap;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use serde_json::Value;

use crate::ConfigFormat;
use crate::DecodeError;

/// Flattened configuration: dotted property name to scalar or nested value
pub type PropertyMap = HashMap<String, Value>;

/// Decodes one configuration document into properties
#[cfg_attr(test, automock)]
pub trait PropertySourceReader: Send + Sync + 'static {
    /// `name` is the KV key the bytes came from, used in error messages
    fn read(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> std::result::Result<PropertyMap, DecodeError>;
}

/// Reader for a document format, `None` for formats that are not single documents
pub fn reader_for(format: ConfigFormat) -> Option<Arc<dyn PropertySourceReader>> {
    match format {
        ConfigFormat::Json => Some(Arc::new(JsonPropertySourceReader)),
        ConfigFormat::Yaml => Some(Arc::new(YamlPropertySourceReader)),
        ConfigFormat::Properties => Some(Arc::new(PropertiesPropertySourceReader)),
        ConfigFormat::Native | ConfigFormat::File => None,
    }
}

/// Flattens nested objects into dotted keys; arrays and scalars are kept whole.
pub(crate) fn flatten_document(
    name: &str,
    document: Value,
) -> std::result::Result<PropertyMap, DecodeError> {
    let mut properties = PropertyMap::new();
    match document {
        Value::Null => {}
        Value::Object(root) => {
            for (key, value) in root {
                flatten_into(&key, value, &mut properties);
            }
        }
        _ => return Err(DecodeError::NotAMapping { name: name.to_string() }),
    }
    Ok(properties)
}

fn flatten_into(
    prefix: &str,
    value: Value,
    properties: &mut PropertyMap,
) {
    match value {
        Value::Object(children) if !children.is_empty() => {
            for (key, child) in children {
                flatten_into(&format!("{prefix}.{key}"), child, properties);
            }
        }
        other => {
            properties.insert(prefix.to_string(), other);
        }
    }
}
