//! Keyed mutex registry.
//!
//! Some resource types map to a singleton backend collection, so concurrent
//! operations on unrelated Terraform instances of that type still race.
//! Handlers for those types take a named lock around their mutations.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// Named mutexes, created on first use and kept for the registry's lifetime.
///
/// Cloning yields a handle to the same registry.
#[derive(Clone, Default)]
pub struct ResourceLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ResourceLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the mutex named `name`, creating it on first use.
    pub async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard lock is released before awaiting.
        let mutex = Arc::clone(
            self.locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        trace!(lock = name, "Waiting for resource lock");
        let guard = mutex.lock_owned().await;
        trace!(lock = name, "Acquired resource lock");
        guard
    }

    /// Number of distinct names ever locked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if no lock has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Returns true if a mutex exists for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.locks.contains_key(name)
    }
}

impl fmt::Debug for ResourceLocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.locks.iter().map(|e| e.key().clone()).collect();
        names.sort();
        f.debug_struct("ResourceLocks")
            .field("names", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_first_use_creates_mutex() {
        let locks = ResourceLocks::new();
        assert!(locks.is_empty());

        drop(locks.lock("dns_filter_profile").await);
        drop(locks.lock("dns_filter_profile").await);
        assert_eq!(locks.len(), 1);
        assert!(locks.contains("dns_filter_profile"));
        assert!(!locks.contains("file_filter_profile"));
    }

    #[tokio::test]
    async fn test_distinct_names_do_not_block() {
        let locks = ResourceLocks::new();
        let _dns = locks.lock("dns_filter_profile").await;
        let _file = locks.lock("file_filter_profile").await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_name_serializes() {
        let locks = ResourceLocks::new();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let locks = locks.clone();
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    let _guard = locks.lock("endpoint_setting_profile").await;
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_isolated_registries() {
        let a = ResourceLocks::new();
        let b = ResourceLocks::new();
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        rt.block_on(async {
            drop(a.lock("x").await);
        });
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
        assert_eq!(format!("{a:?}"), r#"ResourceLocks { names: ["x"] }"#);
    }
}
