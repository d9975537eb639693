//! Unique key generation for log correlation
//!
//! Keys are unique within one process lifetime. The short time suffix
//! makes keys from different runs distinguishable when grepping logs.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a unique key of the form `<PREFIX><counter>-<HHMMSS>`
///
/// ```
/// let a = livehub::unique::gen_unique_key("GROUP");
/// let b = livehub::unique::gen_unique_key("GROUP");
/// assert_ne!(a, b);
/// ```
pub fn gen_unique_key(prefix: &str) -> String {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{}{}-{}", prefix, id, Local::now().format("%H%M%S"))
}
