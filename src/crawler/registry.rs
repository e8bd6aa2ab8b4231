//! Registry of crawl jobs currently executing
//!
//! Membership is the only admission gate: a job id may be registered once,
//! and never more than `capacity` ids are registered at a time. Every check
//! and mutation happens under one mutex.
//!
//! Admission hands out an [`ActiveSlot`] that releases the id when dropped,
//! so the slot is freed however the owning task exits, including by panic.
//! Each admission gets a ticket; a slot only removes the entry carrying its
//! own ticket, so a stopped-then-readmitted job is not evicted by the stale
//! task of the earlier admission.

use crate::AdmitError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct RegistryInner {
    active: HashMap<String, u64>,
    next_ticket: u64,
}

/// Lock-guarded set of executing job ids
#[derive(Debug)]
pub struct ActiveCrawlRegistry {
    inner: Mutex<RegistryInner>,
    capacity: usize,
}

impl ActiveCrawlRegistry {
    /// Creates an empty registry admitting at most `capacity` jobs
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
            capacity,
        }
    }

    /// Registers `job_id` if it is not already active and capacity remains
    ///
    /// # Errors
    ///
    /// * `AdmitError::AlreadyActive` - the id is already registered
    /// * `AdmitError::CapacityExceeded` - the registry is full
    pub fn try_acquire(self: &Arc<Self>, job_id: &str) -> Result<ActiveSlot, AdmitError> {
        let mut inner = self.lock();

        if inner.active.contains_key(job_id) {
            return Err(AdmitError::AlreadyActive {
                job_id: job_id.to_string(),
            });
        }

        if inner.active.len() >= self.capacity {
            return Err(AdmitError::CapacityExceeded { max: self.capacity });
        }

        let ticket = inner.next_ticket;
        inner.next_ticket += 1;
        inner.active.insert(job_id.to_string(), ticket);

        Ok(ActiveSlot {
            registry: Arc::clone(self),
            job_id: job_id.to_string(),
            ticket,
        })
    }

    /// Unregisters `job_id` regardless of which admission holds it
    ///
    /// Returns false if the id was not registered.
    pub fn remove(&self, job_id: &str) -> bool {
        self.lock().active.remove(job_id).is_some()
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.lock().active.contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.lock().active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self, job_id: &str, ticket: u64) {
        let mut inner = self.lock();
        if inner.active.get(job_id) == Some(&ticket) {
            inner.active.remove(job_id);
        }
    }

    // A panic elsewhere cannot leave the map half-updated, so a poisoned
    // lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof of admission; releases the registry entry on drop
#[derive(Debug)]
pub struct ActiveSlot {
    registry: Arc<ActiveCrawlRegistry>,
    job_id: String,
    ticket: u64,
}

impl ActiveSlot {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.registry.release(&self.job_id, self.ticket);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_acquire_and_release() {
        let registry = Arc::new(ActiveCrawlRegistry::new(2));
        let slot = registry.try_acquire("a").unwrap();
        assert!(registry.contains("a"));
        assert_eq!(registry.len(), 1);

        drop(slot);
        assert!(!registry.contains("a"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_rejected() {
        let registry = Arc::new(ActiveCrawlRegistry::new(5));
        let _slot = registry.try_acquire("a").unwrap();
        assert_eq!(
            registry.try_acquire("a").unwrap_err(),
            AdmitError::AlreadyActive {
                job_id: "a".to_string()
            }
        );
    }

    #[test]
    fn test_capacity_enforced() {
        let registry = Arc::new(ActiveCrawlRegistry::new(2));
        let _a = registry.try_acquire("a").unwrap();
        let b = registry.try_acquire("b").unwrap();
        assert_eq!(
            registry.try_acquire("c").unwrap_err(),
            AdmitError::CapacityExceeded { max: 2 }
        );

        drop(b);
        assert!(registry.try_acquire("c").is_ok());
    }

    #[test]
    fn test_duplicate_checked_before_capacity() {
        let registry = Arc::new(ActiveCrawlRegistry::new(1));
        let _a = registry.try_acquire("a").unwrap();
        assert!(matches!(
            registry.try_acquire("a"),
            Err(AdmitError::AlreadyActive { .. })
        ));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let registry = ActiveCrawlRegistry::new(1);
        assert!(!registry.remove("missing"));
    }

    #[test]
    fn test_stale_slot_does_not_evict_readmission() {
        let registry = Arc::new(ActiveCrawlRegistry::new(2));
        let stale = registry.try_acquire("a").unwrap();

        // stop, then admit again while the first task is still running
        assert!(registry.remove("a"));
        let fresh = registry.try_acquire("a").unwrap();

        drop(stale);
        assert!(registry.contains("a"));

        drop(fresh);
        assert!(!registry.contains("a"));
    }

    #[test]
    fn test_slot_released_on_panic() {
        let registry = Arc::new(ActiveCrawlRegistry::new(1));
        let handle = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let _slot = registry.try_acquire("a").unwrap();
                panic!("pipeline blew up");
            })
        };
        assert!(handle.join().is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_acquire_never_exceeds_capacity() {
        let registry = Arc::new(ActiveCrawlRegistry::new(4));
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let slot = registry.try_acquire(&format!("job-{}", i)).ok();
                    assert!(registry.len() <= 4);
                    slot.is_some()
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert!(admitted >= 4);
        assert!(registry.is_empty());
    }
}
