//! Configuration management for mangomon
//!
//! Two files are involved:
//! - **store**: the compositor's config, of which only `monitorrule=` lines are edited
//! - **prefs**: the editor's own preferences (grid step), stored as JSON

pub mod prefs;
pub mod store;

pub use prefs::{AppPrefs, GridStep, PrefsStore};
pub use store::ConfigStore;
