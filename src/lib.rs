//! Watches configuration stored in Consul's KV store and reacts to changes.
//!
//! Every watched path is long-polled with Consul blocking queries. When the
//! content of a path moves, the decoded properties are diffed against the
//! previous ones, the matching property source is replaced and a
//! [`RefreshEvent`](dispatch::RefreshEvent) carrying only the changed keys is
//! published.
//!
//! ```ignore
//! let settings = WatcherSettings::new()?.validate()?;
//! let kv = Arc::new(ConsulKvClient::new(&settings.consul, &settings.blocking_queries)?);
//! let group = WatchFactory::create_watcher(&settings, kv, store, publisher)?;
//! group.start()?;
//! ```

pub mod codec;
mod config;
pub mod constants;
pub mod dispatch;
mod errors;
pub mod kv;
pub mod utils;
pub mod watch;

pub use config::*;
pub use errors::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
