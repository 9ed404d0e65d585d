//! Realm directory facade.
//!
//! The engine never reads ambient global state: every stream, user, and
//! realm-setting lookup goes through the [`Directory`] trait injected at
//! [`Filter`](crate::narrow::Filter) construction. This keeps parsing and
//! matching fully testable against an in-memory fixture.
//!
//! - **[`Directory`]**: the lookup seam (streams, users, mutes, realm flags).
//! - **[`memory`]**: [`InMemoryDirectory`] built from a serde-loaded
//!   [`RealmSnapshot`], used by the CLI and tests.

pub mod memory;

pub use memory::{InMemoryDirectory, RealmSnapshot, SnapshotError, UserEntry};

use serde::{Deserialize, Serialize};

/// Stream subscription data, resolved once per filter and never refreshed
/// for the filter's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    pub stream_id: u64,
    pub name: String,
    #[serde(default)]
    pub subscribed: bool,
    #[serde(default)]
    pub invite_only: bool,
    #[serde(default)]
    pub is_web_public: bool,
    /// Counted into the default aggregate view (i.e. not muted).
    #[serde(default = "default_true")]
    pub in_home_view: bool,
}

fn default_true() -> bool {
    true
}

impl Subscription {
    pub fn new(stream_id: u64, name: impl Into<String>) -> Subscription {
        Subscription {
            stream_id,
            name: name.into(),
            subscribed: true,
            invite_only: false,
            is_web_public: false,
            in_home_view: true,
        }
    }
}

/// Stream, user, and realm lookups the engine depends on.
///
/// Stream-name lookups are case-insensitive; implementations return the
/// canonical display name.
pub trait Directory: Send + Sync {
    fn canonical_stream_name(&self, name: &str) -> Option<String>;
    fn stream_id(&self, name: &str) -> Option<u64>;
    fn subscription(&self, name: &str) -> Option<Subscription>;
    fn is_stream_in_home_view(&self, stream_id: u64) -> bool;
    fn is_topic_muted(&self, stream_id: u64, topic: &str) -> bool;

    fn current_user_id(&self) -> u64;
    fn current_user_email(&self) -> String;
    fn user_id_for_email(&self, email: &str) -> Option<u64>;
    fn user_full_name(&self, user_id: u64) -> Option<String>;

    /// Legacy interop mode with relaxed stream/topic name matching.
    fn is_zephyr_mirror_realm(&self) -> bool;
    /// Single-stream override used by embedded deployments; messages to this
    /// stream always count as in the home view.
    fn narrow_stream(&self) -> Option<String>;
}
