//! Session handles shared between the hub and the transport layer
//!
//! The hub never performs I/O. Each session owns a bounded write queue;
//! the transport task drains it. Writes from the hub are fire-and-forget:
//! when the queue overflows the session disposes itself, which the owner
//! observes as a disconnect and reports back via the group's `del_*`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, Notify};

use crate::unique::gen_unique_key;

/// Write queue depth before a subscriber counts as stalled
pub const WRITE_QUEUE_CAPACITY: usize = 512;

/// Role a session plays within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    Pub,
    Sub,
    HttpflvSub,
    Pull,
    Push,
}

impl SessionRole {
    fn key_prefix(&self) -> &'static str {
        match self {
            SessionRole::Pub => "RTMPPUB",
            SessionRole::Sub => "RTMPSUB",
            SessionRole::HttpflvSub => "FLVSUB",
            SessionRole::Pull => "PULL",
            SessionRole::Push => "PUSH",
        }
    }
}

/// Handle to one publisher/subscriber/relay session
///
/// Shared between the transport task that owns the socket and the group
/// that fans data out. `is_fresh` starts true and is cleared by the
/// group once the cached stream state has been flushed to this session.
pub struct MediaSession {
    unique_key: String,
    role: SessionRole,
    tx: mpsc::Sender<Bytes>,
    fresh: AtomicBool,
    disposed: AtomicBool,
    done: Notify,
}

impl MediaSession {
    /// Create a session handle plus the receiving end of its write queue
    pub fn new(role: SessionRole) -> (Arc<Self>, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        let session = Arc::new(Self {
            unique_key: gen_unique_key(role.key_prefix()),
            role,
            tx,
            fresh: AtomicBool::new(true),
            disposed: AtomicBool::new(false),
            done: Notify::new(),
        });
        (session, rx)
    }

    pub fn unique_key(&self) -> &str {
        &self.unique_key
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    /// Whether this session still awaits the GOP-cache replay prefix
    pub fn is_fresh(&self) -> bool {
        self.fresh.load(Ordering::Relaxed)
    }

    pub(crate) fn clear_fresh(&self) {
        self.fresh.store(false, Ordering::Relaxed);
    }

    /// Enqueue bytes without blocking
    ///
    /// A full or closed queue disposes the session; the write itself is
    /// silently dropped. Per-write errors are invisible to callers.
    pub fn async_write(&self, data: Bytes) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        if self.tx.try_send(data).is_err() {
            tracing::warn!(
                key = %self.unique_key,
                "session write queue overflow, disposing"
            );
            self.dispose();
        }
    }

    /// Tear the session down; safe to call more than once
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            tracing::debug!(key = %self.unique_key, "session disposed");
            self.done.notify_waiters();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Wait until the session is disposed
    pub async fn wait_done(&self) {
        let notified = self.done.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }
}
