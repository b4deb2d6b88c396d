//! Long-poll watching of configuration paths in Consul KV.
//!
//! A [`WatcherGroup`] owns one background task per watched path. Each task runs
//! the same loop: pause for the configured delay, issue a blocking query with
//! the last seen index, then classify the answer:
//!
//! - first answer: remember it, mark the group ready
//! - same content: keep polling with the old cursor
//! - new content: decode both sides and hand them to the [`ChangeDispatcher`]
//! - read timeout: poll again with the same cursor
//! - not found or any other error: abandon the path for the group's lifetime
//!
//! [`WatchFactory`] derives the watched paths from the settings and picks the
//! [`WatchStrategy`] for the configured format.
//!
//! [`ChangeDispatcher`]: crate::dispatch::ChangeDispatcher

mod factory;
mod group;
mod path_watcher;
mod state;
mod strategy;
pub use factory::*;
pub use group::*;
pub(crate) use path_watcher::*;
pub use state::*;
pub use strategy::*;

#[cfg(test)]
mod path_watcher_test;
