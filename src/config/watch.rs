use serde::Deserialize;
use serde::Serialize;

/// Toggle for configuration watching
///
/// Watching is disabled unless explicitly enabled.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct WatchConfig {
    #[serde(default)]
    pub enabled: bool,
}
