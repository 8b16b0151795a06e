//! Per-channel write exclusion
//!
//! Every write intent for a channel, whichever trigger produced it, goes
//! through the lock for that channel's ID. Two triggers that overlap in time
//! (a scheduled batch and a drift repair, say) therefore serialize on the
//! channel instead of racing and losing a write. Different channels never
//! block each other.

use crate::platform::ChannelId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Exclusive hold on one channel, released on drop
#[derive(Debug)]
pub struct ChannelLease {
    channel: ChannelId,
    _guard: OwnedMutexGuard<()>,
}

impl ChannelLease {
    pub fn channel(&self) -> ChannelId {
        self.channel
    }
}

/// Keyed async mutex over channel IDs
#[derive(Debug, Default)]
pub struct ChannelLocks {
    locks: Mutex<HashMap<ChannelId, Arc<AsyncMutex<()>>>>,
}

impl ChannelLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `channel`
    pub async fn acquire(&self, channel: ChannelId) -> ChannelLease {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Entries nobody holds or waits on are only referenced by the map.
            locks.retain(|id, lock| *id == channel || Arc::strong_count(lock) > 1);
            locks
                .entry(channel)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let guard = match lock.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!(channel = %channel, "Waiting for in-flight write on channel");
                lock.lock_owned().await
            }
        };

        ChannelLease {
            channel,
            _guard: guard,
        }
    }

    /// Number of channels with a live lock entry
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_channel_serializes() {
        let locks = Arc::new(ChannelLocks::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let active = active.clone();
            let max_active = max_active.clone();
            handles.push(tokio::spawn(async move {
                let _lease = locks.acquire(ChannelId::new(1)).await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_channels_do_not_block() {
        let locks = ChannelLocks::new();
        let first = locks.acquire(ChannelId::new(1)).await;
        let second = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(ChannelId::new(2)),
        )
        .await
        .expect("second channel should not wait on the first");

        assert_eq!(first.channel(), ChannelId::new(1));
        assert_eq!(second.channel(), ChannelId::new(2));
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let locks = ChannelLocks::new();
        for id in 0..10 {
            let _lease = locks.acquire(ChannelId::new(id)).await;
        }
        let _lease = locks.acquire(ChannelId::new(99)).await;
        assert_eq!(locks.tracked(), 1);
    }
}
