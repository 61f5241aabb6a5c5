use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::key::SessionKey;

/// Held for the duration of one turn. Dropping it lets the next turn for the
/// same session run.
pub type TurnGuard = OwnedMutexGuard<()>;

/// Per-session turn serialization.
///
/// Turns for the same [`SessionKey`] run one at a time; turns for different
/// keys never wait on each other.
#[derive(Default)]
pub struct TurnLocks {
    locks: Mutex<HashMap<SessionKey, Arc<Mutex<()>>>>,
}

impl TurnLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other turn for `key` is in flight.
    pub async fn acquire(&self, key: &SessionKey) -> TurnGuard {
        let lock = Arc::clone(self.locks.lock().await.entry(key.clone()).or_default());
        lock.lock_owned().await
    }

    /// Drop the lock entries nobody holds or waits on.
    pub async fn prune_idle(&self) -> usize {
        let mut locks = self.locks.lock().await;
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    /// Number of sessions with a lock entry.
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::time::Duration, tokio::time::timeout};

    fn key(id: &str) -> SessionKey {
        SessionKey::for_conversation("test", id)
    }

    #[tokio::test]
    async fn same_key_is_serialized() {
        let locks = TurnLocks::new();
        let held = locks.acquire(&key("a")).await;

        let waiting = timeout(Duration::from_millis(50), locks.acquire(&key("a"))).await;
        assert!(waiting.is_err(), "second turn for the same key must wait");

        drop(held);
        let acquired = timeout(Duration::from_millis(50), locks.acquire(&key("a"))).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn different_keys_do_not_wait() {
        let locks = TurnLocks::new();
        let _alfred = locks.acquire(&key("alfred-conv")).await;
        let batman = timeout(Duration::from_millis(50), locks.acquire(&key("batman-conv"))).await;
        assert!(batman.is_ok());
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let locks = TurnLocks::new();
        let held = locks.acquire(&key("a")).await;
        drop(locks.acquire(&key("b")).await);
        assert_eq!(locks.len().await, 2);

        assert_eq!(locks.prune_idle().await, 1);
        assert_eq!(locks.len().await, 1);

        drop(held);
        assert_eq!(locks.prune_idle().await, 1);
        assert!(locks.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_turns_for_one_key_do_not_interleave() {
        let locks = Arc::new(TurnLocks::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut tasks = Vec::new();
        for turn in 0..8 {
            let locks = Arc::clone(&locks);
            let log = Arc::clone(&log);
            tasks.push(tokio::spawn(async move {
                let _guard = locks.acquire(&key("a")).await;
                log.lock().await.push(("start", turn));
                tokio::task::yield_now().await;
                log.lock().await.push(("end", turn));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let log = log.lock().await;
        for pair in log.chunks(2) {
            assert_eq!(pair[0].0, "start");
            assert_eq!(pair[1].0, "end");
            assert_eq!(pair[0].1, pair[1].1);
        }
    }
}
