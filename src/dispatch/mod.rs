//! Applies configuration changes detected by the watchers.
//!
//! [`ChangeDispatcher`] diffs the previous and next property maps of a watched
//! path, swaps the matching property source in the [`PropertySourceStore`] and
//! publishes a [`RefreshEvent`] holding only the keys that moved.

mod change_set;
mod dispatcher;
mod publisher;
mod store;
pub use change_set::*;
pub use dispatcher::*;
pub use publisher::*;
pub use store::*;
