// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-pane serialization: `send_keys`/`send_enter` pairs must be
//! indivisible from the point of view of other producers writing into the
//! same pane, so every caller that wants to deliver a multi-step sequence
//! acquires this lock for the duration of the sequence.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::PaneId;

/// A registry of one mutex per pane, created lazily on first use.
#[derive(Default)]
pub struct PaneLocks {
    locks: Mutex<HashMap<PaneId, Arc<Mutex<()>>>>,
}

impl PaneLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a pane, blocking until any other in-flight
    /// delivery to the same pane has finished.
    pub async fn acquire(&self, pane: &PaneId) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(pane.clone()).or_insert_with(|| Arc::new(Mutex::new(()))))
        };
        entry.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_pane_serializes() {
        let locks = Arc::new(PaneLocks::new());
        let pane = PaneId::from("%1");
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..5 {
            let locks = Arc::clone(&locks);
            let pane = pane.clone();
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(&pane).await;
                tokio::time::sleep(Duration::from_millis(5)).await;
                order.lock().await.push(i);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(order.lock().await.len(), 5);
    }
}
