//! Per-equipment serialisation of check-then-write sequences

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per equipment id, created on first use.
///
/// Holders of the guard are the only writers of bookings for that equipment
/// within this process, so a conflict check followed by a write cannot
/// interleave with another one.
#[derive(Clone, Default)]
pub struct EquipmentLocks {
    locks: Arc<DashMap<i32, Arc<Mutex<()>>>>,
}

impl EquipmentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, equipment_id: i32) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(equipment_id).or_default().clone();
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_equipment_is_serialised() {
        let locks = EquipmentLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(1).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_equipment_do_not_block() {
        let locks = EquipmentLocks::new();
        let _first = locks.acquire(1).await;
        let second = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2)).await;
        assert!(second.is_ok());
    }
}
