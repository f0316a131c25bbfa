//! Live safe-state wrapper registry
//!
//! Every `SafeCommand` registers here when created and deregisters when
//! invalidated, so a test can assert at teardown that nothing it acquired is
//! still live. Each record keeps a trail of lifecycle messages to show where
//! a leaked wrapper got to.
//!
//! Only compiled for tests and with the `debug-refs` feature.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one registered wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefId(u64);

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref#{}", self.0)
    }
}

struct Tracked {
    label: String,
    trail: Vec<String>,
}

static NEXT_REF: AtomicU64 = AtomicU64::new(1);

/// Live wrappers (id -> label and trail)
static LIVE: Lazy<Mutex<BTreeMap<RefId, Tracked>>> = Lazy::new(|| Mutex::new(BTreeMap::new()));

/// Record a new live wrapper.
pub fn register(label: impl Into<String>) -> RefId {
    let id = RefId(NEXT_REF.fetch_add(1, Ordering::Relaxed));
    LIVE.lock().insert(
        id,
        Tracked {
            label: label.into(),
            trail: vec!["created".to_string()],
        },
    );
    id
}

/// Append `message` to the trail of `id`, if still live.
pub fn trace(id: RefId, message: impl Into<String>) {
    if let Some(tracked) = LIVE.lock().get_mut(&id) {
        tracked.trail.push(message.into());
    }
}

/// Deregister `id`. Returns false if it was not live.
pub fn release(id: RefId) -> bool {
    LIVE.lock().remove(&id).is_some()
}

/// Check whether `id` is still registered
pub fn is_live(id: RefId) -> bool {
    LIVE.lock().contains_key(&id)
}

/// Every live wrapper with its label
pub fn live_refs() -> Vec<(RefId, String)> {
    LIVE.lock()
        .iter()
        .map(|(id, tracked)| (*id, tracked.label.clone()))
        .collect()
}

/// Lifecycle trail of `id`, if still live
pub fn trail(id: RefId) -> Option<Vec<String>> {
    LIVE.lock().get(&id).map(|tracked| tracked.trail.clone())
}

/// Panic if any of `ids` is still live, listing each leak and its trail.
pub fn assert_released(ids: &[RefId]) {
    let live = LIVE.lock();
    let leaks: Vec<String> = ids
        .iter()
        .filter_map(|id| {
            live.get(id)
                .map(|t| format!("{} ({}): {}", id, t.label, t.trail.join(" -> ")))
        })
        .collect();
    drop(live);
    assert!(
        leaks.is_empty(),
        "{} safe command(s) never invalidated:\n{}",
        leaks.len(),
        leaks.join("\n")
    );
}
