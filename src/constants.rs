// -
// Consul layout

/// Name of the configuration shared by every application
pub const DEFAULT_NAME: &str = "application";

/// Base KV path used when none is configured
pub const DEFAULT_PATH: &str = "config/";

pub const CONSUL_PATH_SEPARATOR: char = '/';

/// Separates a configuration name from its profile: `orders,test`
pub const PROFILE_SEPARATOR: char = ',';

/// Prefix of every property source created from Consul
pub const SERVICE_ID: &str = "consul";

// -
// Blocking queries

pub(crate) const PARAMETER_INDEX: &str = "index";
pub(crate) const PARAMETER_WAIT: &str = "wait";
pub(crate) const PARAMETER_RECURSE: &str = "recurse";

/// The client read timeout exceeds the server wait by `max_wait / READ_TIMEOUT_MARGIN_DIVISOR`
pub(crate) const READ_TIMEOUT_MARGIN_DIVISOR: u32 = 16;
