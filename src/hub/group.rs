//! Per-stream fan-out group
//!
//! A group binds at most one media source (a local publisher or a relay
//! pull) to any number of RTMP subscribers, HTTP-FLV subscribers and
//! relay-push sinks, plus an optional HLS muxer. One GOP cache per
//! egress format gives late joiners an instant key frame.
//!
//! All group state lives behind one mutex that is only ever held across
//! in-memory work, never across I/O or session construction.
//! Within a group, membership changes, cache updates and
//! broadcasts are totally ordered; across groups there is no ordering.
//!
//! The source's transport task calls `on_read` for every reassembled
//! message (the group implements [`MessageObserver`]); session owners
//! report their end via the matching `del_*`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::media::gop::GopCache;
use crate::protocol::message::{make_default_header, MessageHeader};
use crate::unique::gen_unique_key;

use super::config::GroupConfig;
use super::hls::{HlsMuxer, HlsMuxerFactory};
use super::lazy::{LazyChunkDivider, LazyFlvTag};
use super::relay::{MessageObserver, PushTimeouts, RelayDialer};
use super::session::MediaSession;

/// Bookkeeping for one configured push destination
struct PushProxy {
    is_pushing: bool,
    session: Option<Arc<MediaSession>>,
}

struct GroupInner {
    pub_session: Option<Arc<MediaSession>>,
    pull_session: Option<Arc<MediaSession>>,
    is_pulling: bool,
    sub_sessions: HashMap<String, Arc<MediaSession>>,
    httpflv_sub_sessions: HashMap<String, Arc<MediaSession>>,
    url2push_proxy: HashMap<String, PushProxy>,
    hls_muxer: Option<Box<dyn HlsMuxer>>,
    gop_cache: GopCache,
    httpflv_gop_cache: GopCache,
}

/// Counters for the periodic operator log line
#[derive(Debug, Clone)]
pub struct GroupStats {
    pub pub_key: Option<String>,
    pub pull_key: Option<String>,
    pub sub_count: usize,
    pub httpflv_sub_count: usize,
    pub push_count: usize,
}

/// Fan-out hub for one app/stream pair
pub struct Group {
    unique_key: String,
    app_name: String,
    stream_name: String,
    config: GroupConfig,
    dialer: Option<Arc<dyn RelayDialer>>,
    hls_factory: Option<Arc<dyn HlsMuxerFactory>>,
    inner: Mutex<GroupInner>,
}

impl Group {
    pub fn new(
        app_name: impl Into<String>,
        stream_name: impl Into<String>,
        config: GroupConfig,
        dialer: Option<Arc<dyn RelayDialer>>,
        hls_factory: Option<Arc<dyn HlsMuxerFactory>>,
    ) -> Arc<Self> {
        let app_name = app_name.into();
        let stream_name = stream_name.into();
        let unique_key = gen_unique_key("GROUP");
        tracing::info!(
            key = %unique_key,
            app = %app_name,
            stream = %stream_name,
            "lifecycle new group"
        );

        let mut url2push_proxy = HashMap::new();
        if config.relay_push_enabled {
            for addr in &config.relay_push_addr_list {
                let url = format!("rtmp://{}/{}/{}", addr, app_name, stream_name);
                url2push_proxy.insert(
                    url,
                    PushProxy {
                        is_pushing: false,
                        session: None,
                    },
                );
            }
        }

        Arc::new(Self {
            inner: Mutex::new(GroupInner {
                pub_session: None,
                pull_session: None,
                is_pulling: false,
                sub_sessions: HashMap::new(),
                httpflv_sub_sessions: HashMap::new(),
                url2push_proxy,
                hls_muxer: None,
                gop_cache: GopCache::new("rtmp", &unique_key, config.rtmp_gop_num),
                httpflv_gop_cache: GopCache::new("httpflv", &unique_key, config.httpflv_gop_num),
            }),
            unique_key,
            app_name,
            stream_name,
            config,
            dialer,
            hls_factory,
        })
    }

    pub fn unique_key(&self) -> &str {
        &self.unique_key
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Install a local publisher
    ///
    /// Fails (without side effects) when a publisher or an active pull
    /// already fills the source role. The caller must wire the source's
    /// message flow to [`Group::on_read`].
    pub fn add_pub_session(self: &Arc<Self>, session: Arc<MediaSession>) -> bool {
        let mut inner = self.inner.lock();

        if inner.pub_session.is_some() || inner.pull_session.is_some() {
            tracing::error!(
                key = %self.unique_key,
                session = %session.unique_key(),
                "publisher already exists in group"
            );
            return false;
        }
        tracing::debug!(
            key = %self.unique_key,
            session = %session.unique_key(),
            "add pub session"
        );
        inner.pub_session = Some(session);

        self.start_hls_muxer(&mut inner);
        if self.config.relay_push_enabled {
            self.push_if_needed(&mut inner);
        }

        true
    }

    /// Remove the local publisher and drop everything derived from it
    pub fn del_pub_session(&self) {
        let mut inner = self.inner.lock();
        tracing::debug!(key = %self.unique_key, "del pub session");

        inner.pub_session = None;
        self.stop_hls_muxer(&mut inner);

        for proxy in inner.url2push_proxy.values_mut() {
            if let Some(session) = proxy.session.take() {
                session.dispose();
            }
        }

        inner.gop_cache.clear();
        inner.httpflv_gop_cache.clear();
    }

    /// Install an established relay pull as the source
    pub fn add_pull_session(&self, session: Arc<MediaSession>) {
        let mut inner = self.inner.lock();
        tracing::debug!(
            key = %self.unique_key,
            session = %session.unique_key(),
            "add pull session"
        );

        inner.pull_session = Some(session);
        self.start_hls_muxer(&mut inner);
    }

    /// Remove the relay pull (after failure or normal end)
    pub fn del_pull_session(&self) {
        let mut inner = self.inner.lock();
        tracing::debug!(key = %self.unique_key, "del pull session");

        inner.pull_session = None;
        inner.is_pulling = false;
        self.stop_hls_muxer(&mut inner);

        inner.gop_cache.clear();
        inner.httpflv_gop_cache.clear();
    }

    /// Attach an RTMP subscriber; may trigger a relay pull
    pub fn add_sub_session(self: &Arc<Self>, session: Arc<MediaSession>) {
        let mut inner = self.inner.lock();
        tracing::debug!(
            key = %self.unique_key,
            session = %session.unique_key(),
            "add sub session"
        );
        inner
            .sub_sessions
            .insert(session.unique_key().to_string(), session);

        self.pull_if_needed(&mut inner);
    }

    pub fn del_sub_session(&self, session: &MediaSession) {
        let mut inner = self.inner.lock();
        tracing::debug!(
            key = %self.unique_key,
            session = %session.unique_key(),
            "del sub session"
        );
        inner.sub_sessions.remove(session.unique_key());
    }

    /// Attach an HTTP-FLV subscriber; may trigger a relay pull
    pub fn add_httpflv_sub_session(self: &Arc<Self>, session: Arc<MediaSession>) {
        let mut inner = self.inner.lock();
        tracing::debug!(
            key = %self.unique_key,
            session = %session.unique_key(),
            "add httpflv sub session"
        );
        inner
            .httpflv_sub_sessions
            .insert(session.unique_key().to_string(), session);

        self.pull_if_needed(&mut inner);
    }

    pub fn del_httpflv_sub_session(&self, session: &MediaSession) {
        let mut inner = self.inner.lock();
        tracing::debug!(
            key = %self.unique_key,
            session = %session.unique_key(),
            "del httpflv sub session"
        );
        inner.httpflv_sub_sessions.remove(session.unique_key());
    }

    /// Record an established push session for its destination URL
    pub fn add_push_session(&self, url: &str, session: Arc<MediaSession>) {
        let mut inner = self.inner.lock();
        tracing::debug!(
            key = %self.unique_key,
            session = %session.unique_key(),
            url = url,
            "add push session"
        );
        if let Some(proxy) = inner.url2push_proxy.get_mut(url) {
            proxy.session = Some(session);
        }
    }

    /// Clear a push destination after its session ended or failed
    pub fn del_push_session(&self, url: &str) {
        let mut inner = self.inner.lock();
        tracing::debug!(key = %self.unique_key, url = url, "del push session");
        if let Some(proxy) = inner.url2push_proxy.get_mut(url) {
            proxy.session = None;
            proxy.is_pushing = false;
        }
    }

    /// Periodic maintenance, driven by an external timer
    ///
    /// Retries relay activation that previously failed; idempotent.
    pub fn tick(self: &Arc<Self>) {
        let mut inner = self.inner.lock();
        self.pull_if_needed(&mut inner);
        self.push_if_needed(&mut inner);
    }

    /// Whether the group holds no session of any kind and can be dropped
    pub fn is_totally_empty(&self) -> bool {
        let inner = self.inner.lock();

        let has_push_session = inner
            .url2push_proxy
            .values()
            .any(|p| p.is_pushing || p.session.is_some());

        inner.pub_session.is_none()
            && inner.pull_session.is_none()
            && inner.sub_sessions.is_empty()
            && inner.httpflv_sub_sessions.is_empty()
            && inner.hls_muxer.is_none()
            && !has_push_session
    }

    /// Tear down every owned session and cache
    ///
    /// The group must not be used afterwards. Safe to call repeatedly.
    pub fn dispose(&self) {
        tracing::info!(key = %self.unique_key, "lifecycle dispose group");
        let mut inner = self.inner.lock();

        if let Some(session) = inner.pub_session.take() {
            session.dispose();
        }
        if let Some(session) = inner.pull_session.take() {
            session.dispose();
        }
        for (_, session) in inner.sub_sessions.drain() {
            session.dispose();
        }
        for (_, session) in inner.httpflv_sub_sessions.drain() {
            session.dispose();
        }
        for proxy in inner.url2push_proxy.values_mut() {
            if let Some(session) = proxy.session.take() {
                session.dispose();
            }
        }
        self.stop_hls_muxer(&mut inner);

        inner.gop_cache.clear();
        inner.httpflv_gop_cache.clear();
    }

    /// Snapshot of the group's membership for stats logging
    pub fn stats(&self) -> GroupStats {
        let inner = self.inner.lock();
        GroupStats {
            pub_key: inner
                .pub_session
                .as_ref()
                .map(|s| s.unique_key().to_string()),
            pull_key: inner
                .pull_session
                .as_ref()
                .map(|s| s.unique_key().to_string()),
            sub_count: inner.sub_sessions.len(),
            httpflv_sub_count: inner.httpflv_sub_sessions.len(),
            push_count: inner
                .url2push_proxy
                .values()
                .filter(|p| p.session.is_some())
                .count(),
        }
    }

    /// Fan one message out to every sink
    ///
    /// Invoked by the source's transport task for every reassembled
    /// message; the payload is copied where it needs to outlive the
    /// call. Messages leave in exactly the order they arrive here.
    pub fn on_read(&self, header: &MessageHeader, payload: &[u8]) {
        let mut inner = self.inner.lock();

        self.broadcast(&mut inner, header, payload);

        if let Some(muxer) = inner.hls_muxer.as_mut() {
            muxer.feed(header, payload);
        }
    }

    fn broadcast(&self, inner: &mut GroupInner, header: &MessageHeader, payload: &[u8]) {
        let out_header = make_default_header(header, payload.len());
        let mut lcd = LazyChunkDivider::new(&out_header, payload);
        let mut ltag = LazyFlvTag::new(header.msg_type_id, header.timestamp_abs, payload);

        for session in inner.sub_sessions.values() {
            if session.is_fresh() {
                replay_cache(session, &inner.gop_cache);
                session.clear_fresh();
            }
            session.async_write(lcd.get());
        }

        for proxy in inner.url2push_proxy.values() {
            let Some(session) = proxy.session.as_ref() else {
                continue;
            };
            if session.is_fresh() {
                replay_cache(session, &inner.gop_cache);
                session.clear_fresh();
            }
            session.async_write(lcd.get());
        }

        for session in inner.httpflv_sub_sessions.values() {
            if session.is_fresh() {
                replay_cache(session, &inner.httpflv_gop_cache);
                session.clear_fresh();
            }
            session.async_write(ltag.get());
        }

        if self.config.rtmp_enabled {
            inner.gop_cache.feed(header, payload, || lcd.get());
        }
        if self.config.httpflv_enabled {
            inner.httpflv_gop_cache.feed(header, payload, || ltag.get());
        }
    }

    fn start_hls_muxer(&self, inner: &mut GroupInner) {
        if !self.config.hls_enabled {
            return;
        }
        let Some(factory) = self.hls_factory.as_ref() else {
            return;
        };
        let mut muxer = factory.create(&self.stream_name);
        muxer.start();
        inner.hls_muxer = Some(muxer);
    }

    fn stop_hls_muxer(&self, inner: &mut GroupInner) {
        if let Some(mut muxer) = inner.hls_muxer.take() {
            muxer.dispose();
        }
    }

    /// Start one relay pull when subscribers wait for an absent source
    ///
    /// Must be called with the group lock held. At most one pull task is
    /// in flight at any time; the `is_pulling` latch survives until
    /// `del_pull_session`.
    fn pull_if_needed(self: &Arc<Self>, inner: &mut GroupInner) {
        if !self.config.relay_pull_enabled {
            return;
        }
        let Some(dialer) = self.dialer.clone() else {
            return;
        };
        if inner.sub_sessions.is_empty() && inner.httpflv_sub_sessions.is_empty() {
            return;
        }
        if inner.pub_session.is_some() || inner.pull_session.is_some() {
            return;
        }
        if inner.is_pulling {
            return;
        }
        inner.is_pulling = true;

        let url = format!(
            "rtmp://{}/{}/{}",
            self.config.relay_pull_addr, self.app_name, self.stream_name
        );
        tracing::info!(key = %self.unique_key, url = %url, "start relay pull");

        let group = Arc::clone(self);
        tokio::spawn(async move {
            let observer: Arc<dyn MessageObserver> = group.clone();
            match dialer.dial_pull(&url, observer).await {
                Err(e) => {
                    tracing::error!(key = %group.unique_key, error = %e, "relay pull failed");
                    group.del_pull_session();
                }
                Ok(session) => {
                    group.add_pull_session(Arc::clone(&session));
                    session.wait_done().await;
                    tracing::info!(
                        key = %group.unique_key,
                        session = %session.unique_key(),
                        "relay pull done"
                    );
                    group.del_pull_session();
                }
            }
        });
    }

    /// Start a push task for every configured destination not yet pushing
    ///
    /// Must be called with the group lock held.
    fn push_if_needed(self: &Arc<Self>, inner: &mut GroupInner) {
        if !self.config.relay_push_enabled {
            return;
        }
        let Some(dialer) = self.dialer.clone() else {
            return;
        };
        if inner.pub_session.is_none() {
            return;
        }

        let timeouts = PushTimeouts {
            connect_timeout_ms: self.config.relay_push_connect_timeout_ms,
            push_timeout_ms: self.config.relay_push_timeout_ms,
            write_av_timeout_ms: self.config.relay_push_write_av_timeout_ms,
        };

        for (url, proxy) in inner.url2push_proxy.iter_mut() {
            if proxy.is_pushing {
                continue;
            }
            proxy.is_pushing = true;

            tracing::info!(key = %self.unique_key, url = %url, "start relay push");

            let url = url.clone();
            let group = Arc::clone(self);
            let dialer = Arc::clone(&dialer);
            tokio::spawn(async move {
                match dialer.dial_push(&url, timeouts).await {
                    Err(e) => {
                        tracing::error!(
                            key = %group.unique_key,
                            url = %url,
                            error = %e,
                            "relay push failed"
                        );
                        group.del_push_session(&url);
                    }
                    Ok(session) => {
                        group.add_push_session(&url, Arc::clone(&session));
                        session.wait_done().await;
                        tracing::info!(
                            key = %group.unique_key,
                            session = %session.unique_key(),
                            "relay push done"
                        );
                        group.del_push_session(&url);
                    }
                }
            });
        }
    }
}

impl MessageObserver for Group {
    fn on_read(&self, header: &MessageHeader, payload: &[u8]) {
        Group::on_read(self, header, payload);
    }
}

/// Flush the cached stream state to a session that has not seen it yet
fn replay_cache(session: &MediaSession, cache: &GopCache) {
    if let Some(b) = cache.metadata() {
        session.async_write(b.clone());
    }
    if let Some(b) = cache.video_seq_header() {
        session.async_write(b.clone());
    }
    if let Some(b) = cache.aac_seq_header() {
        session.async_write(b.clone());
    }
    for i in 0..cache.gop_count() {
        for item in cache.gop_at(i) {
            session.async_write(item.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use tokio::sync::mpsc;

    use crate::error::Result;
    use crate::hub::session::SessionRole;
    use crate::protocol::constants::{
        LOCAL_CHUNK_SIZE, TYPEID_AUDIO, TYPEID_DATA_MESSAGE_AMF0, TYPEID_VIDEO,
    };
    use crate::protocol::divider::message_to_chunks;

    use super::*;

    fn msg_header(type_id: u8, ts: u32, len: usize) -> MessageHeader {
        MessageHeader {
            csid: 4,
            timestamp: 0,
            timestamp_abs: ts,
            msg_len: len as u32,
            msg_type_id: type_id,
            msg_stream_id: 1,
        }
    }

    /// The chunk bytes a subscriber is expected to receive for a message
    fn chunked(type_id: u8, ts: u32, payload: &[u8]) -> Bytes {
        let inbound = msg_header(type_id, ts, payload.len());
        let out = make_default_header(&inbound, payload.len());
        message_to_chunks(&out, payload, LOCAL_CHUNK_SIZE)
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[derive(Default)]
    struct MockDialer {
        pull_dials: AtomicUsize,
        push_dials: AtomicUsize,
        pull_sessions: Mutex<Vec<Arc<MediaSession>>>,
        push_sessions: Mutex<Vec<(Arc<MediaSession>, mpsc::Receiver<Bytes>)>>,
    }

    #[async_trait]
    impl RelayDialer for MockDialer {
        async fn dial_pull(
            &self,
            _url: &str,
            _observer: Arc<dyn MessageObserver>,
        ) -> Result<Arc<MediaSession>> {
            self.pull_dials.fetch_add(1, Ordering::SeqCst);
            let (session, _rx) = MediaSession::new(SessionRole::Pull);
            self.pull_sessions.lock().push(Arc::clone(&session));
            Ok(session)
        }

        async fn dial_push(
            &self,
            _url: &str,
            _timeouts: PushTimeouts,
        ) -> Result<Arc<MediaSession>> {
            self.push_dials.fetch_add(1, Ordering::SeqCst);
            let (session, rx) = MediaSession::new(SessionRole::Push);
            self.push_sessions.lock().push((Arc::clone(&session), rx));
            Ok(session)
        }
    }

    struct MockHlsMuxer {
        started: Arc<AtomicBool>,
        feeds: Arc<AtomicUsize>,
        disposed: Arc<AtomicBool>,
    }

    impl HlsMuxer for MockHlsMuxer {
        fn start(&mut self) {
            self.started.store(true, Ordering::SeqCst);
        }

        fn feed(&mut self, _header: &MessageHeader, _payload: &[u8]) {
            self.feeds.fetch_add(1, Ordering::SeqCst);
        }

        fn dispose(&mut self) {
            self.disposed.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct MockHlsFactory {
        started: Arc<AtomicBool>,
        feeds: Arc<AtomicUsize>,
        disposed: Arc<AtomicBool>,
    }

    impl HlsMuxerFactory for MockHlsFactory {
        fn create(&self, _stream_name: &str) -> Box<dyn HlsMuxer> {
            Box::new(MockHlsMuxer {
                started: Arc::clone(&self.started),
                feeds: Arc::clone(&self.feeds),
                disposed: Arc::clone(&self.disposed),
            })
        }
    }

    const METADATA: &[u8] = b"onMetaData";
    const VIDEO_SEQ: &[u8] = &[0x17, 0x00, 0x01, 0x64];
    const AAC_SEQ: &[u8] = &[0xAF, 0x00, 0x12, 0x10];
    const KEY1: &[u8] = &[0x17, 0x01, 0x01];
    const INTER1: &[u8] = &[0x27, 0x01, 0x02];
    const INTER2: &[u8] = &[0x27, 0x01, 0x03];
    const KEY2: &[u8] = &[0x17, 0x01, 0x04];
    const INTER3: &[u8] = &[0x27, 0x01, 0x05];

    /// (type id, timestamp, payload) of the canonical warm-up sequence
    fn warmup() -> Vec<(u8, u32, &'static [u8])> {
        vec![
            (TYPEID_DATA_MESSAGE_AMF0, 0, METADATA),
            (TYPEID_VIDEO, 0, VIDEO_SEQ),
            (TYPEID_AUDIO, 0, AAC_SEQ),
            (TYPEID_VIDEO, 0, KEY1),
            (TYPEID_VIDEO, 33, INTER1),
            (TYPEID_VIDEO, 66, INTER2),
            (TYPEID_VIDEO, 100, KEY2),
            (TYPEID_VIDEO, 133, INTER3),
        ]
    }

    fn feed_warmup(group: &Arc<Group>) {
        for (type_id, ts, payload) in warmup() {
            group.on_read(&msg_header(type_id, ts, payload.len()), payload);
        }
    }

    #[tokio::test]
    async fn test_publisher_uniqueness() {
        let group = Group::new("live", "test", GroupConfig::default(), None, None);

        let (pub1, _rx1) = MediaSession::new(SessionRole::Pub);
        let (pub2, _rx2) = MediaSession::new(SessionRole::Pub);

        assert!(group.add_pub_session(pub1));
        assert!(!group.add_pub_session(Arc::clone(&pub2)));

        group.del_pub_session();
        assert!(group.add_pub_session(pub2));
    }

    #[tokio::test]
    async fn test_fresh_subscriber_gets_replay_then_live() {
        let group = Group::new("live", "test", GroupConfig::default(), None, None);
        let (pub_session, _pub_rx) = MediaSession::new(SessionRole::Pub);
        assert!(group.add_pub_session(pub_session));
        feed_warmup(&group);

        let (sub, mut rx) = MediaSession::new(SessionRole::Sub);
        group.add_sub_session(Arc::clone(&sub));

        let live: &[u8] = &[0x27, 0x01, 0x06];
        group.on_read(&msg_header(TYPEID_VIDEO, 166, live.len()), live);

        let mut expected: Vec<Bytes> = warmup()
            .into_iter()
            .map(|(t, ts, p)| chunked(t, ts, p))
            .collect();
        expected.push(chunked(TYPEID_VIDEO, 166, live));

        for (i, want) in expected.iter().enumerate() {
            let got = rx.try_recv().unwrap_or_else(|_| panic!("missing write {}", i));
            assert_eq!(&got, want, "write {} mismatch", i);
        }
        assert!(rx.try_recv().is_err());
        assert!(!sub.is_fresh());
    }

    #[tokio::test]
    async fn test_ring_size_one_replays_only_last_gop() {
        let config = GroupConfig::default().gop_num(1);
        let group = Group::new("live", "test", config, None, None);
        let (pub_session, _pub_rx) = MediaSession::new(SessionRole::Pub);
        assert!(group.add_pub_session(pub_session));
        feed_warmup(&group);

        let (sub, mut rx) = MediaSession::new(SessionRole::Sub);
        group.add_sub_session(Arc::clone(&sub));

        let live: &[u8] = &[0x27, 0x01, 0x06];
        group.on_read(&msg_header(TYPEID_VIDEO, 166, live.len()), live);

        let expected = vec![
            chunked(TYPEID_DATA_MESSAGE_AMF0, 0, METADATA),
            chunked(TYPEID_VIDEO, 0, VIDEO_SEQ),
            chunked(TYPEID_AUDIO, 0, AAC_SEQ),
            chunked(TYPEID_VIDEO, 100, KEY2),
            chunked(TYPEID_VIDEO, 133, INTER3),
            chunked(TYPEID_VIDEO, 166, live),
        ];
        for want in &expected {
            assert_eq!(&rx.try_recv().unwrap(), want);
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_httpflv_subscriber_gets_tags() {
        let group = Group::new("live", "test", GroupConfig::default(), None, None);
        let (pub_session, _pub_rx) = MediaSession::new(SessionRole::Pub);
        assert!(group.add_pub_session(pub_session));
        feed_warmup(&group);

        let (sub, mut rx) = MediaSession::new(SessionRole::HttpflvSub);
        group.add_httpflv_sub_session(Arc::clone(&sub));

        let live: &[u8] = &[0x27, 0x01, 0x06];
        group.on_read(&msg_header(TYPEID_VIDEO, 166, live.len()), live);

        let mut expected: Vec<Bytes> = warmup()
            .into_iter()
            .map(|(t, ts, p)| crate::media::flv::pack_tag(t, ts, p))
            .collect();
        expected.push(crate::media::flv::pack_tag(TYPEID_VIDEO, 166, live));

        for want in &expected {
            assert_eq!(&rx.try_recv().unwrap(), want);
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_pull_triggered_once_for_many_subscribers() {
        let dialer = Arc::new(MockDialer::default());
        let config = GroupConfig::default().relay_pull("origin.example.com:1935");
        let group = Group::new(
            "live",
            "test",
            config,
            Some(dialer.clone() as Arc<dyn RelayDialer>),
            None,
        );

        assert!(group.is_totally_empty());

        let (sub1, _rx1) = MediaSession::new(SessionRole::Sub);
        let (sub2, _rx2) = MediaSession::new(SessionRole::Sub);
        group.add_sub_session(Arc::clone(&sub1));
        group.add_sub_session(Arc::clone(&sub2));

        wait_until(|| group.stats().pull_key.is_some()).await;
        assert_eq!(dialer.pull_dials.load(Ordering::SeqCst), 1);

        // another subscriber while the pull is live: still one task
        let (sub3, _rx3) = MediaSession::new(SessionRole::Sub);
        group.add_sub_session(Arc::clone(&sub3));
        group.tick();
        assert_eq!(dialer.pull_dials.load(Ordering::SeqCst), 1);

        assert!(!group.is_totally_empty());

        // the pull ends; once its removal lands the group can drain
        group.del_sub_session(&sub1);
        group.del_sub_session(&sub2);
        group.del_sub_session(&sub3);
        let pull = dialer.pull_sessions.lock()[0].clone();
        pull.dispose();
        wait_until(|| group.is_totally_empty()).await;
    }

    #[tokio::test]
    async fn test_push_lifecycle() {
        let dialer = Arc::new(MockDialer::default());
        let config = GroupConfig::default().relay_push(vec!["edge.example.com:1935".into()]);
        let group = Group::new(
            "live",
            "test",
            config,
            Some(dialer.clone() as Arc<dyn RelayDialer>),
            None,
        );

        let (pub_session, _pub_rx) = MediaSession::new(SessionRole::Pub);
        assert!(group.add_pub_session(pub_session));

        wait_until(|| group.stats().push_count == 1).await;
        assert_eq!(dialer.push_dials.load(Ordering::SeqCst), 1);

        // a broadcast reaches the push sink
        group.on_read(&msg_header(TYPEID_VIDEO, 0, KEY1.len()), KEY1);
        {
            let mut sessions = dialer.push_sessions.lock();
            let (_, rx) = &mut sessions[0];
            assert!(rx.try_recv().is_ok());
        }

        // repeated ticks while pushing do not redial
        group.tick();
        group.tick();
        assert_eq!(dialer.push_dials.load(Ordering::SeqCst), 1);

        group.del_pub_session();
        wait_until(|| group.is_totally_empty()).await;
        assert_eq!(dialer.push_dials.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hls_cohabitation() {
        let factory = Arc::new(MockHlsFactory::default());
        let started = Arc::clone(&factory.started);
        let feeds = Arc::clone(&factory.feeds);
        let disposed = Arc::clone(&factory.disposed);

        let config = GroupConfig::default().enable_hls();
        let group = Group::new(
            "live",
            "test",
            config,
            None,
            Some(factory as Arc<dyn HlsMuxerFactory>),
        );

        let (pub_session, _pub_rx) = MediaSession::new(SessionRole::Pub);
        assert!(group.add_pub_session(pub_session));
        assert!(started.load(Ordering::SeqCst));

        group.on_read(&msg_header(TYPEID_VIDEO, 0, KEY1.len()), KEY1);
        group.on_read(&msg_header(TYPEID_VIDEO, 33, INTER1.len()), INTER1);
        group.on_read(&msg_header(TYPEID_AUDIO, 40, 3), &[0xAF, 0x01, 0x21]);
        assert_eq!(feeds.load(Ordering::SeqCst), 3);

        group.del_pub_session();
        assert!(disposed.load(Ordering::SeqCst));
        assert!(group.is_totally_empty());
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let group = Group::new("live", "test", GroupConfig::default(), None, None);

        let (pub_session, _pub_rx) = MediaSession::new(SessionRole::Pub);
        let (sub, _sub_rx) = MediaSession::new(SessionRole::Sub);
        assert!(group.add_pub_session(Arc::clone(&pub_session)));
        group.add_sub_session(Arc::clone(&sub));

        group.dispose();
        group.dispose();

        assert!(pub_session.is_disposed());
        assert!(sub.is_disposed());
        assert!(group.is_totally_empty());
    }

    #[tokio::test]
    async fn test_pull_not_installed_while_publisher_active() {
        let dialer = Arc::new(MockDialer::default());
        let config = GroupConfig::default().relay_pull("origin.example.com:1935");
        let group = Group::new(
            "live",
            "test",
            config,
            Some(dialer.clone() as Arc<dyn RelayDialer>),
            None,
        );

        let (pub_session, _pub_rx) = MediaSession::new(SessionRole::Pub);
        assert!(group.add_pub_session(pub_session));

        let (sub, _rx) = MediaSession::new(SessionRole::Sub);
        group.add_sub_session(Arc::clone(&sub));
        group.tick();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(dialer.pull_dials.load(Ordering::SeqCst), 0);
    }
}
