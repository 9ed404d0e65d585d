//! In-memory [`Directory`] built from a realm snapshot.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::directory::{Directory, Subscription};

/// Error from loading a realm snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read realm snapshot at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse realm snapshot at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntry {
    pub user_id: u64,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
}

/// Serialized realm state: the streams, users, and per-user mutes the
/// engine needs for canonicalization and matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealmSnapshot {
    pub me: UserEntry,
    #[serde(default)]
    pub streams: Vec<Subscription>,
    #[serde(default)]
    pub users: Vec<UserEntry>,
    /// `(stream_id, topic)` pairs muted by the current user.
    #[serde(default)]
    pub muted_topics: Vec<(u64, String)>,
    #[serde(default)]
    pub zephyr_mirror: bool,
    #[serde(default)]
    pub narrow_stream: Option<String>,
}

#[derive(Debug)]
pub struct InMemoryDirectory {
    streams_by_name: HashMap<String, Subscription>,
    home_view_by_id: HashMap<u64, bool>,
    muted_topics: HashSet<(u64, String)>,
    users_by_email: HashMap<String, UserEntry>,
    users_by_id: HashMap<u64, UserEntry>,
    me: UserEntry,
    zephyr_mirror: bool,
    narrow_stream: Option<String>,
}

impl Default for InMemoryDirectory {
    fn default() -> InMemoryDirectory {
        let me = UserEntry {
            user_id: 1,
            email: "me@localhost".into(),
            full_name: "Anonymous User".into(),
        };
        InMemoryDirectory::from_snapshot(RealmSnapshot {
            me,
            streams: Vec::new(),
            users: Vec::new(),
            muted_topics: Vec::new(),
            zephyr_mirror: false,
            narrow_stream: None,
        })
    }
}

impl InMemoryDirectory {
    pub fn from_snapshot(snapshot: RealmSnapshot) -> InMemoryDirectory {
        let mut dir = InMemoryDirectory {
            streams_by_name: HashMap::new(),
            home_view_by_id: HashMap::new(),
            muted_topics: HashSet::new(),
            users_by_email: HashMap::new(),
            users_by_id: HashMap::new(),
            me: snapshot.me.clone(),
            zephyr_mirror: snapshot.zephyr_mirror,
            narrow_stream: snapshot.narrow_stream,
        };
        dir.insert_user(snapshot.me);
        for user in snapshot.users {
            dir.insert_user(user);
        }
        for stream in snapshot.streams {
            dir.insert_stream(stream);
        }
        for (stream_id, topic) in snapshot.muted_topics {
            dir.muted_topics.insert((stream_id, topic.to_lowercase()));
        }
        dir
    }

    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<InMemoryDirectory, SnapshotError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: RealmSnapshot =
            serde_json::from_str(&raw).map_err(|source| SnapshotError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(
            streams = snapshot.streams.len(),
            users = snapshot.users.len(),
            path = %path.display(),
            "realm_snapshot_loaded"
        );
        Ok(InMemoryDirectory::from_snapshot(snapshot))
    }

    fn insert_user(&mut self, user: UserEntry) {
        self.users_by_email
            .insert(user.email.to_lowercase(), user.clone());
        self.users_by_id.insert(user.user_id, user);
    }

    fn insert_stream(&mut self, stream: Subscription) {
        self.home_view_by_id
            .insert(stream.stream_id, stream.in_home_view);
        self.streams_by_name
            .insert(stream.name.to_lowercase(), stream);
    }

    pub fn with_stream(mut self, stream: Subscription) -> InMemoryDirectory {
        self.insert_stream(stream);
        self
    }

    pub fn with_user(
        mut self,
        user_id: u64,
        email: impl Into<String>,
        full_name: impl Into<String>,
    ) -> InMemoryDirectory {
        self.insert_user(UserEntry {
            user_id,
            email: email.into(),
            full_name: full_name.into(),
        });
        self
    }

    pub fn with_current_user(
        mut self,
        user_id: u64,
        email: impl Into<String>,
        full_name: impl Into<String>,
    ) -> InMemoryDirectory {
        let me = UserEntry {
            user_id,
            email: email.into(),
            full_name: full_name.into(),
        };
        self.me = me.clone();
        self.insert_user(me);
        self
    }

    pub fn with_muted_topic(mut self, stream_id: u64, topic: impl Into<String>) -> InMemoryDirectory {
        self.muted_topics
            .insert((stream_id, topic.into().to_lowercase()));
        self
    }

    pub fn with_zephyr_mirror(mut self, zephyr_mirror: bool) -> InMemoryDirectory {
        self.zephyr_mirror = zephyr_mirror;
        self
    }

    pub fn with_narrow_stream(mut self, name: impl Into<String>) -> InMemoryDirectory {
        self.narrow_stream = Some(name.into());
        self
    }
}

impl Directory for InMemoryDirectory {
    fn canonical_stream_name(&self, name: &str) -> Option<String> {
        self.streams_by_name
            .get(&name.to_lowercase())
            .map(|s| s.name.clone())
    }

    fn stream_id(&self, name: &str) -> Option<u64> {
        self.streams_by_name
            .get(&name.to_lowercase())
            .map(|s| s.stream_id)
    }

    fn subscription(&self, name: &str) -> Option<Subscription> {
        self.streams_by_name.get(&name.to_lowercase()).cloned()
    }

    fn is_stream_in_home_view(&self, stream_id: u64) -> bool {
        self.home_view_by_id.get(&stream_id).copied().unwrap_or(false)
    }

    fn is_topic_muted(&self, stream_id: u64, topic: &str) -> bool {
        self.muted_topics
            .contains(&(stream_id, topic.to_lowercase()))
    }

    fn current_user_id(&self) -> u64 {
        self.me.user_id
    }

    fn current_user_email(&self) -> String {
        self.me.email.clone()
    }

    fn user_id_for_email(&self, email: &str) -> Option<u64> {
        self.users_by_email
            .get(&email.to_lowercase())
            .map(|u| u.user_id)
    }

    fn user_full_name(&self, user_id: u64) -> Option<String> {
        self.users_by_id.get(&user_id).map(|u| u.full_name.clone())
    }

    fn is_zephyr_mirror_realm(&self) -> bool {
        self.zephyr_mirror
    }

    fn narrow_stream(&self) -> Option<String> {
        self.narrow_stream.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_lookups_are_case_insensitive() {
        let dir = InMemoryDirectory::default().with_stream(Subscription::new(3, "Design Team"));
        assert_eq!(
            dir.canonical_stream_name("design team"),
            Some("Design Team".to_string())
        );
        assert_eq!(dir.stream_id("DESIGN TEAM"), Some(3));
        assert_eq!(dir.canonical_stream_name("ops"), None);
    }

    #[test]
    fn unknown_stream_is_not_in_home_view() {
        let dir = InMemoryDirectory::default();
        assert!(!dir.is_stream_in_home_view(42));
    }

    #[test]
    fn topic_mutes_are_case_insensitive() {
        let dir = InMemoryDirectory::default().with_muted_topic(3, "Noisy Topic");
        assert!(dir.is_topic_muted(3, "noisy topic"));
        assert!(!dir.is_topic_muted(4, "noisy topic"));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snapshot = RealmSnapshot {
            me: UserEntry {
                user_id: 7,
                email: "iago@example.com".into(),
                full_name: "Iago".into(),
            },
            streams: vec![Subscription::new(1, "general")],
            users: vec![UserEntry {
                user_id: 8,
                email: "zoe@example.com".into(),
                full_name: "Zoe".into(),
            }],
            muted_topics: vec![(1, "lunch".into())],
            zephyr_mirror: false,
            narrow_stream: None,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let dir = InMemoryDirectory::from_snapshot(serde_json::from_str(&json).unwrap());
        assert_eq!(dir.current_user_email(), "iago@example.com");
        assert_eq!(dir.user_id_for_email("ZOE@example.com"), Some(8));
        assert!(dir.is_topic_muted(1, "Lunch"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = InMemoryDirectory::load(Path::new("/nonexistent/realm.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Read { .. }));
    }
}
