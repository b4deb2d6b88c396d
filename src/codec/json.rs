use serde_json::Value;

use super::flatten_document;
use super::PropertyMap;
use super::PropertySourceReader;
use crate::DecodeError;

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPropertySourceReader;

impl PropertySourceReader for JsonPropertySourceReader {
    fn read(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> std::result::Result<PropertyMap, DecodeError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(PropertyMap::new());
        }

        let document: Value = serde_json::from_slice(bytes).map_err(|source| DecodeError::Json {
            name: name.to_string(),
            source,
        })?;
        flatten_document(name, document)
    }
}
