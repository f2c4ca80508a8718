//! Lock Registry Tests
//!
//! ## Test Scopes
//! - **Creation**: concurrent first access installs exactly one lock per key.
//! - **Exclusion**: exclusive holders exclude everyone; shared holders only exclude writers.
//! - **Reclamation**: entries disappear once no guard or handle references them.
//! - **Churn**: acquire racing eviction on a multi-thread runtime.

#[cfg(test)]
mod tests {
    use crate::lock::registry::{KeyedLockRegistry, LockMode};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const SHORT: Duration = Duration::from_millis(100);

    // ============================================================
    // CREATION
    // ============================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_first_access_creates_one_lock() {
        // ARRANGE
        let registry = KeyedLockRegistry::new();
        let barrier = Arc::new(tokio::sync::Barrier::new(32));

        // ACT: 32 callers race to create the same key
        let mut handles = Vec::new();
        for _ in 0..32 {
            let registry = registry.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                registry.handle("shared.txt")
            }));
        }

        let mut locks = Vec::new();
        for handle in handles {
            locks.push(handle.await.unwrap());
        }

        // ASSERT: all callers saw the same object
        let first = &locks[0];
        assert!(locks.iter().all(|lock| Arc::ptr_eq(first, lock)));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_get_distinct_locks() {
        let registry = KeyedLockRegistry::new();

        let a = registry.handle("a.txt");
        let b = registry.handle("b.txt");

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    // ============================================================
    // EXCLUSION
    // ============================================================

    #[tokio::test]
    async fn test_exclusive_blocks_shared_and_exclusive() {
        let registry = KeyedLockRegistry::new();
        let writer = registry.acquire("report.txt", LockMode::Exclusive).await;

        let shared =
            tokio::time::timeout(SHORT, registry.acquire("report.txt", LockMode::Shared)).await;
        assert!(shared.is_err(), "Reader must wait while a writer holds the key");

        let exclusive =
            tokio::time::timeout(SHORT, registry.acquire("report.txt", LockMode::Exclusive)).await;
        assert!(exclusive.is_err(), "Second writer must wait");

        drop(writer);

        let shared =
            tokio::time::timeout(SHORT, registry.acquire("report.txt", LockMode::Shared)).await;
        assert!(shared.is_ok(), "Reader proceeds after the writer releases");
    }

    #[tokio::test]
    async fn test_shared_does_not_block_shared() {
        let registry = KeyedLockRegistry::new();

        let first = registry.acquire("report.txt", LockMode::Shared).await;
        let second =
            tokio::time::timeout(SHORT, registry.acquire("report.txt", LockMode::Shared)).await;

        assert!(second.is_ok(), "Readers never block each other");
        assert_eq!(first.mode(), LockMode::Shared);
    }

    #[tokio::test]
    async fn test_shared_blocks_exclusive() {
        let registry = KeyedLockRegistry::new();
        let _reader = registry.acquire("report.txt", LockMode::Shared).await;

        let writer =
            tokio::time::timeout(SHORT, registry.acquire("report.txt", LockMode::Exclusive)).await;

        assert!(writer.is_err());
    }

    #[tokio::test]
    async fn test_other_keys_are_independent() {
        let registry = KeyedLockRegistry::new();
        let _writer = registry.acquire("a.txt", LockMode::Exclusive).await;

        let other =
            tokio::time::timeout(SHORT, registry.acquire("b.txt", LockMode::Exclusive)).await;

        assert!(other.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_exclusive_sections_never_overlap() {
        // ARRANGE
        let registry = KeyedLockRegistry::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        // ACT
        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            handles.push(tokio::spawn(async move {
                let _guard = registry.acquire("hot.txt", LockMode::Exclusive).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // ASSERT
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    // ============================================================
    // RECLAMATION
    // ============================================================

    #[tokio::test]
    async fn test_entry_reclaimed_after_last_guard() {
        let registry = KeyedLockRegistry::new();

        let guard = registry.acquire("temp.txt", LockMode::Exclusive).await;
        assert!(registry.contains("temp.txt"));

        drop(guard);

        assert!(!registry.contains("temp.txt"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_entry_kept_while_another_reader_holds_it() {
        let registry = KeyedLockRegistry::new();

        let first = registry.acquire("temp.txt", LockMode::Shared).await;
        let second = registry.acquire("temp.txt", LockMode::Shared).await;

        drop(first);
        assert!(registry.contains("temp.txt"), "Second reader still holds it");

        drop(second);
        assert!(!registry.contains("temp.txt"));
    }

    #[tokio::test]
    async fn test_entry_kept_while_waiter_queued() {
        let registry = KeyedLockRegistry::new();
        let writer = registry.acquire("temp.txt", LockMode::Exclusive).await;

        let waiter_registry = registry.clone();
        let waiter = tokio::spawn(async move {
            let _guard = waiter_registry.acquire("temp.txt", LockMode::Exclusive).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Releasing the first writer must not evict the lock the waiter sits on.
        drop(writer);
        assert!(tokio::time::timeout(Duration::from_secs(1), waiter).await.is_ok());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_prune_idle_removes_unreferenced_entries() {
        let registry = KeyedLockRegistry::new();

        let kept = registry.handle("kept.txt");
        drop(registry.handle("dropped.txt"));

        let pruned = registry.prune_idle();

        assert_eq!(pruned, 1);
        assert!(registry.contains("kept.txt"));
        assert!(!registry.contains("dropped.txt"));
        drop(kept);
    }

    // ============================================================
    // CHURN
    // ============================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_exclusive_holders_never_overlap_under_eviction() {
        // ARRANGE: short critical sections so entries are evicted and
        // recreated constantly while other tasks acquire the same key
        let registry = KeyedLockRegistry::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(tokio::sync::Barrier::new(16));

        // ACT
        let mut handles = Vec::new();
        for task in 0..16 {
            let registry = registry.clone();
            let inside = inside.clone();
            let overlaps = overlaps.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                for round in 0..200 {
                    let guard = registry.acquire("churn.txt", LockMode::Exclusive).await;
                    if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    if (task + round) % 7 == 0 {
                        tokio::task::yield_now().await;
                    }
                    inside.fetch_sub(1, Ordering::SeqCst);
                    drop(guard);
                    if round % 3 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // ASSERT
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert!(registry.is_empty(), "Every entry is reclaimed once the churn stops");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_readers_and_writers_under_eviction() {
        let registry = KeyedLockRegistry::new();
        let writers = Arc::new(AtomicUsize::new(0));
        let readers = Arc::new(AtomicUsize::new(0));
        let violations = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for task in 0..12 {
            let registry = registry.clone();
            let writers = writers.clone();
            let readers = readers.clone();
            let violations = violations.clone();
            handles.push(tokio::spawn(async move {
                for round in 0..150 {
                    if (task + round) % 4 == 0 {
                        let _guard = registry.acquire("mixed.txt", LockMode::Exclusive).await;
                        writers.fetch_add(1, Ordering::SeqCst);
                        let alone = readers.load(Ordering::SeqCst) == 0
                            && writers.load(Ordering::SeqCst) == 1;
                        if !alone {
                            violations.fetch_add(1, Ordering::SeqCst);
                        }
                        tokio::task::yield_now().await;
                        writers.fetch_sub(1, Ordering::SeqCst);
                    } else {
                        let _guard = registry.acquire("mixed.txt", LockMode::Shared).await;
                        readers.fetch_add(1, Ordering::SeqCst);
                        if writers.load(Ordering::SeqCst) != 0 {
                            violations.fetch_add(1, Ordering::SeqCst);
                        }
                        tokio::task::yield_now().await;
                        readers.fetch_sub(1, Ordering::SeqCst);
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(violations.load(Ordering::SeqCst), 0);
        assert!(registry.is_empty());
    }
}
