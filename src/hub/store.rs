//! Group store
//!
//! Maps app/stream pairs to their fan-out groups and drives periodic
//! maintenance: every tick, totally-empty groups are disposed and
//! removed, and the survivors get their relay retry pass.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::config::GroupConfig;
use super::group::Group;
use super::hls::HlsMuxerFactory;
use super::relay::RelayDialer;

/// Unique identifier for a stream (app + stream name)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamKey {
    /// Application name (e.g., "live")
    pub app: String,
    /// Stream name
    pub name: String,
}

impl StreamKey {
    pub fn new(app: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.app, self.name)
    }
}

/// All live groups of one server instance
pub struct GroupStore {
    config: GroupConfig,
    dialer: Option<Arc<dyn RelayDialer>>,
    hls_factory: Option<Arc<dyn HlsMuxerFactory>>,
    groups: Mutex<HashMap<StreamKey, Arc<Group>>>,
}

impl GroupStore {
    pub fn new(
        config: GroupConfig,
        dialer: Option<Arc<dyn RelayDialer>>,
        hls_factory: Option<Arc<dyn HlsMuxerFactory>>,
    ) -> Self {
        Self {
            config,
            dialer,
            hls_factory,
            groups: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the group for a stream, creating it on first sight
    pub fn get_or_create(&self, key: &StreamKey) -> Arc<Group> {
        let mut groups = self.groups.lock();
        if let Some(group) = groups.get(key) {
            return Arc::clone(group);
        }
        let group = Group::new(
            key.app.clone(),
            key.name.clone(),
            self.config.clone(),
            self.dialer.clone(),
            self.hls_factory.clone(),
        );
        groups.insert(key.clone(), Arc::clone(&group));
        group
    }

    /// Look up an existing group without creating one
    pub fn get(&self, key: &StreamKey) -> Option<Arc<Group>> {
        self.groups.lock().get(key).map(Arc::clone)
    }

    pub fn group_count(&self) -> usize {
        self.groups.lock().len()
    }

    /// One maintenance pass over every group
    ///
    /// Totally-empty groups are disposed and dropped; the rest get their
    /// relay retries. Call this from a periodic timer task.
    pub fn tick(&self) {
        let mut groups = self.groups.lock();
        groups.retain(|key, group| {
            if group.is_totally_empty() {
                tracing::info!(stream = %key, key = %group.unique_key(), "remove empty group");
                group.dispose();
                false
            } else {
                group.tick();
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::hub::session::{MediaSession, SessionRole};

    use super::*;

    #[tokio::test]
    async fn test_get_or_create_reuses_group() {
        let store = GroupStore::new(GroupConfig::default(), None, None);
        let key = StreamKey::new("live", "stream1");

        let a = store.get_or_create(&key);
        let b = store.get_or_create(&key);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.group_count(), 1);

        let other = store.get_or_create(&StreamKey::new("live", "stream2"));
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(store.group_count(), 2);
    }

    #[tokio::test]
    async fn test_get_does_not_create() {
        let store = GroupStore::new(GroupConfig::default(), None, None);
        assert!(store.get(&StreamKey::new("live", "missing")).is_none());
        assert_eq!(store.group_count(), 0);
    }

    #[tokio::test]
    async fn test_tick_removes_empty_groups() {
        let store = GroupStore::new(GroupConfig::default(), None, None);
        let key = StreamKey::new("live", "stream1");

        let group = store.get_or_create(&key);
        let (pub_session, _rx) = MediaSession::new(SessionRole::Pub);
        assert!(group.add_pub_session(pub_session));

        // a group with a publisher survives the pass
        store.tick();
        assert_eq!(store.group_count(), 1);

        group.del_pub_session();
        store.tick();
        assert_eq!(store.group_count(), 0);
    }

    #[test]
    fn test_stream_key_display() {
        let key = StreamKey::new("live", "abc");
        assert_eq!(key.to_string(), "live/abc");
    }
}
