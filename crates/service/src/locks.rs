//! Per-(ingredient, location) exclusive locks.
//!
//! Multi-key operations (transfers, multi-line sales) acquire every key they
//! touch in one atomic step, in the fixed global `StockKey` order. There is
//! no hold-and-wait: either the whole key set is free and gets claimed, or
//! nothing is held and the caller backs off and retries. Waits are bounded;
//! exceeding the bound fails with [`LedgerError::Contention`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use stockbook_core::{LedgerError, LedgerResult};
use stockbook_ledger::StockKey;

use crate::policy::RetryPolicy;

/// Registry of currently held stock keys.
#[derive(Debug, Default, Clone)]
pub struct KeyLocks {
    held: Arc<Mutex<HashSet<StockKey>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire exclusive ownership of every key in `keys`, or fail with
    /// `Contention` once `timeout` elapses.
    ///
    /// Keys are deduplicated and claimed in sorted order so concurrent
    /// callers always contend on a consistent global order.
    pub fn acquire(
        &self,
        keys: &[StockKey],
        timeout: Duration,
        backoff: &RetryPolicy,
    ) -> LedgerResult<KeyLockGuard> {
        let mut wanted: Vec<StockKey> = keys.to_vec();
        wanted.sort();
        wanted.dedup();

        let deadline = Instant::now() + timeout;
        let mut attempt: u32 = 0;

        loop {
            {
                let mut held = self
                    .held
                    .lock()
                    .map_err(|_| LedgerError::contention("key lock registry poisoned"))?;
                if wanted.iter().all(|k| !held.contains(k)) {
                    for key in &wanted {
                        held.insert(*key);
                    }
                    return Ok(KeyLockGuard {
                        held: Arc::clone(&self.held),
                        keys: wanted,
                    });
                }
            }

            attempt += 1;
            if Instant::now() >= deadline || !backoff.should_retry(attempt) {
                return Err(LedgerError::contention(format!(
                    "timed out acquiring {} stock key(s) after {attempt} attempt(s)",
                    wanted.len()
                )));
            }

            let delay = backoff.delay_for_attempt(attempt);
            let remaining = deadline.saturating_duration_since(Instant::now());
            std::thread::sleep(delay.min(remaining));
        }
    }
}

/// Owned claim on a set of stock keys; released on drop.
#[derive(Debug)]
pub struct KeyLockGuard {
    held: Arc<Mutex<HashSet<StockKey>>>,
    keys: Vec<StockKey>,
}

impl KeyLockGuard {
    pub fn keys(&self) -> &[StockKey] {
        &self.keys
    }
}

impl Drop for KeyLockGuard {
    fn drop(&mut self) {
        if let Ok(mut held) = self.held.lock() {
            for key in &self.keys {
                held.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockbook_core::{IngredientId, LocationId};

    fn key() -> StockKey {
        StockKey::new(IngredientId::new(), LocationId::new())
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::fixed(u32::MAX, Duration::from_millis(1))
    }

    #[test]
    fn disjoint_key_sets_do_not_block_each_other() {
        let locks = KeyLocks::new();
        let a = key();
        let b = key();

        let _ga = locks
            .acquire(&[a], Duration::from_millis(50), &policy())
            .unwrap();
        let _gb = locks
            .acquire(&[b], Duration::from_millis(50), &policy())
            .unwrap();
    }

    #[test]
    fn overlapping_acquisition_times_out_with_contention() {
        let locks = KeyLocks::new();
        let shared = key();

        let _guard = locks
            .acquire(&[shared], Duration::from_millis(50), &policy())
            .unwrap();

        let err = locks
            .acquire(&[shared, key()], Duration::from_millis(20), &policy())
            .unwrap_err();
        assert!(matches!(err, LedgerError::Contention(_)));
    }

    #[test]
    fn dropping_the_guard_releases_all_keys() {
        let locks = KeyLocks::new();
        let a = key();
        let b = key();

        let guard = locks
            .acquire(&[a, b], Duration::from_millis(50), &policy())
            .unwrap();
        assert_eq!(guard.keys().len(), 2);
        drop(guard);

        let _again = locks
            .acquire(&[a, b], Duration::from_millis(50), &policy())
            .unwrap();
    }

    #[test]
    fn duplicate_keys_are_claimed_once() {
        let locks = KeyLocks::new();
        let a = key();

        let guard = locks
            .acquire(&[a, a], Duration::from_millis(50), &policy())
            .unwrap();
        assert_eq!(guard.keys().len(), 1);
    }

    #[test]
    fn opposing_multi_key_claims_never_deadlock() {
        let locks = KeyLocks::new();
        let a = key();
        let b = key();

        let mut handles = Vec::new();
        for keys in [[a, b], [b, a]] {
            let locks = locks.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    let guard = locks
                        .acquire(&keys, Duration::from_secs(5), &policy())
                        .unwrap();
                    drop(guard);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
