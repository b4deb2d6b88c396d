use serde_json::Value;

use super::flatten_document;
use super::PropertyMap;
use super::PropertySourceReader;
use crate::DecodeError;

#[derive(Debug, Default, Clone, Copy)]
pub struct YamlPropertySourceReader;

impl PropertySourceReader for YamlPropertySourceReader {
    fn read(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> std::result::Result<PropertyMap, DecodeError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(PropertyMap::new());
        }

        let yaml: serde_yaml::Value = serde_yaml::from_slice(bytes).map_err(|source| DecodeError::Yaml {
            name: name.to_string(),
            source,
        })?;

        // YAML allows non-string keys; serde_json stringifies scalar ones
        let document: Value = serde_json::to_value(yaml).map_err(|source| DecodeError::Json {
            name: name.to_string(),
            source,
        })?;
        flatten_document(name, document)
    }
}
