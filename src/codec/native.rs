use serde_json::Value;

use super::PropertyMap;
use super::PropertySourceReader;
use crate::constants::CONSUL_PATH_SEPARATOR;
use crate::kv::KeyValue;
use crate::DecodeError;

/// Property name of a native entry: the last segment of its key
///
/// `config/orders/datasource.url` becomes `datasource.url`.
pub fn property_key(key: &str) -> &str {
    key.rsplit(CONSUL_PATH_SEPARATOR).next().unwrap_or(key)
}

/// Reads a prefix listing in the native format, one property per entry.
///
/// Entries without a value (folders, empty keys) are skipped.
pub fn read_native(entries: &[KeyValue]) -> std::result::Result<PropertyMap, DecodeError> {
    let mut properties = PropertyMap::with_capacity(entries.len());
    for entry in entries.iter().filter(|kv| !kv.is_empty()) {
        let Some(raw) = entry.decoded_value()? else {
            continue;
        };
        let value = String::from_utf8(raw).map_err(|source| DecodeError::Utf8 {
            key: entry.key.clone(),
            source,
        })?;
        properties.insert(property_key(&entry.key).to_string(), Value::String(value));
    }
    Ok(properties)
}

/// Reads the single entry of a document format through `reader`.
///
/// A missing or empty entry yields an empty map.
pub fn read_document(
    entry: Option<&KeyValue>,
    reader: &dyn PropertySourceReader,
) -> std::result::Result<PropertyMap, DecodeError> {
    let Some(entry) = entry else {
        return Ok(PropertyMap::new());
    };
    match entry.decoded_value()? {
        Some(raw) => reader.read(&entry.key, &raw),
        None => Ok(PropertyMap::new()),
    }
}
