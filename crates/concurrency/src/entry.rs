//! Exclusive-access cache entry
//!
//! A `CacheEntry` holds the authoritative value for one key. Readers that
//! intend to write take it exclusively: `get_exclusive` hands back the value
//! together with an `ExclusiveToken`, and nobody else can take it until the
//! token is passed to `release` (store a new value) or `abandon` (keep the
//! old one).
//!
//! ## Ordering
//!
//! Grants are numbered per entry. Only the outstanding grant can release, so
//! a value computed from an older snapshot can never overwrite a newer one,
//! and the next acquirer always observes the value stored by the previous
//! release (both happen under the same mutex).

use crate::config::AcquirePolicy;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use strand_core::error::{Error, Result};
use tracing::{debug, warn};

/// Distinguishes entries so a token cannot be used on the wrong one
static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Proof of exclusive access to one entry.
///
/// Not `Clone`: exactly one exists per grant.
#[must_use = "an exclusive token must be released or abandoned"]
#[derive(Debug, PartialEq, Eq)]
pub struct ExclusiveToken {
    entry: u64,
    grant: u64,
}

impl ExclusiveToken {
    /// Grant sequence this token was issued under
    pub fn grant(&self) -> u64 {
        self.grant
    }
}

/// Value handed out by [`CacheEntry::get_exclusive`].
#[derive(Debug)]
pub struct Exclusive<V> {
    /// The authoritative value at the time of the grant
    pub value: V,
    /// Token required to release the entry
    pub token: ExclusiveToken,
}

struct EntryState<V> {
    value: V,
    holder: Option<u64>,
    grants: u64,
}

/// Shared holder of the authoritative value for `key`.
pub struct CacheEntry<K, V> {
    id: u64,
    key: K,
    state: Mutex<EntryState<V>>,
    released: Condvar,
}

impl<K: fmt::Debug, V: Clone> CacheEntry<K, V> {
    /// Create an entry holding `value`
    pub fn new(key: K, value: V) -> Self {
        CacheEntry {
            id: NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed),
            key,
            state: Mutex::new(EntryState {
                value,
                holder: None,
                grants: 0,
            }),
            released: Condvar::new(),
        }
    }

    /// The key this entry is cached under
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Take exclusive access, waiting per `policy` if another holder is
    /// outstanding.
    ///
    /// # Errors
    ///
    /// - `Error::EntryBusy` under `AcquirePolicy::FailFast`
    /// - `Error::AcquireTimeout` when a `Timeout` wait runs out
    pub fn get_exclusive(&self, policy: AcquirePolicy) -> Result<Exclusive<V>> {
        let mut state = self.state.lock();
        match policy {
            AcquirePolicy::Block => {
                while state.holder.is_some() {
                    self.released.wait(&mut state);
                }
            }
            AcquirePolicy::FailFast => {
                if let Some(holder) = state.holder {
                    return Err(Error::EntryBusy(format!(
                        "{:?} held by grant {}",
                        self.key, holder
                    )));
                }
            }
            AcquirePolicy::Timeout(wait) => {
                let deadline = Instant::now() + wait;
                while state.holder.is_some() {
                    if self.released.wait_until(&mut state, deadline).timed_out()
                        && state.holder.is_some()
                    {
                        return Err(Error::AcquireTimeout {
                            key: format!("{:?}", self.key),
                            waited: wait,
                        });
                    }
                }
            }
        }

        state.grants += 1;
        let grant = state.grants;
        state.holder = Some(grant);
        debug!(key = ?self.key, grant, "Granted exclusive access");
        Ok(Exclusive {
            value: state.value.clone(),
            token: ExclusiveToken {
                entry: self.id,
                grant,
            },
        })
    }

    /// Store `value` as the authoritative value and release exclusivity.
    ///
    /// # Errors
    ///
    /// `Error::StaleToken` if `token` is not the outstanding grant of this
    /// entry; the stored value is unchanged.
    pub fn release(&self, token: ExclusiveToken, value: V) -> Result<()> {
        let mut state = self.state.lock();
        self.check_token(&state, &token)?;
        state.value = value;
        state.holder = None;
        drop(state);
        self.released.notify_one();
        Ok(())
    }

    /// Release exclusivity without changing the value.
    ///
    /// # Errors
    ///
    /// `Error::StaleToken` as for [`release`](Self::release).
    pub fn abandon(&self, token: ExclusiveToken) -> Result<()> {
        let mut state = self.state.lock();
        self.check_token(&state, &token)?;
        state.holder = None;
        drop(state);
        self.released.notify_one();
        Ok(())
    }

    /// Last released value, without taking exclusivity.
    pub fn peek(&self) -> V {
        self.state.lock().value.clone()
    }

    /// True while a token is outstanding
    pub fn is_held(&self) -> bool {
        self.state.lock().holder.is_some()
    }

    /// Number of grants issued so far
    pub fn grant_sequence(&self) -> u64 {
        self.state.lock().grants
    }

    fn check_token(&self, state: &EntryState<V>, token: &ExclusiveToken) -> Result<()> {
        if token.entry == self.id && state.holder == Some(token.grant) {
            return Ok(());
        }
        warn!(
            key = ?self.key,
            token = token.grant,
            outstanding = ?state.holder,
            "Rejected stale exclusive token"
        );
        Err(Error::StaleToken {
            key: format!("{:?}", self.key),
            token: token.grant,
            outstanding: state.holder,
        })
    }
}

impl<K: fmt::Debug, V> fmt::Debug for CacheEntry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
