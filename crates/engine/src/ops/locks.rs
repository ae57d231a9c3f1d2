use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Idle slots are dropped once the table grows past this size.
const PRUNE_AT: usize = 1024;

type Slot = Arc<AsyncMutex<()>>;

/// Async mutexes keyed by `(owner, category)`.
#[derive(Debug, Default)]
pub(crate) struct KeyedLocks {
    slots: Mutex<HashMap<(String, String), Slot>>,
}

impl KeyedLocks {
    pub(crate) async fn lock(&self, owner: &str, category: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            if slots.len() >= PRUNE_AT {
                // Only the table holds an idle slot.
                slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            slots
                .entry((owner.to_string(), category.to_string()))
                .or_default()
                .clone()
        };
        slot.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::default());
        let guard = locks.lock("u1", "food").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("u1", "food").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = KeyedLocks::default();
        let _food = locks.lock("u1", "food").await;
        let _rent = locks.lock("u1", "rent").await;
        let _other_owner = locks.lock("u2", "food").await;
        assert_eq!(locks.len(), 3);
    }

    #[tokio::test]
    async fn idle_slots_are_pruned() {
        let locks = KeyedLocks::default();
        for i in 0..PRUNE_AT {
            drop(locks.lock("u1", &format!("c{i}")).await);
        }
        let _held = locks.lock("u1", "fresh").await;
        assert_eq!(locks.len(), 1);
    }
}
