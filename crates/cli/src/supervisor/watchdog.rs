// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The watchdog timer: a periodic tick that enqueues onto the agent's own
//! inbound queue (spec §4.5 "Watchdog" — ticks can never bypass a real
//! event; they are ordered the same way). The K/M debounce counting
//! itself lives in [`super::agent::AgentSupervisor`], which is the single
//! consumer of the queue and so the only place that can track "consecutive"
//! correctly.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::AgentMsg;

/// Run until cancelled, sending a [`AgentMsg::Watchdog`] tick every
/// `interval`. Exits quietly (not an error) once the agent's queue is
/// gone, since that only happens after the supervisor has already shut
/// down.
pub async fn run_watchdog_timer(tx: mpsc::Sender<AgentMsg>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                if tx.send(AgentMsg::Watchdog).await.is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stops_when_cancelled() {
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        let handle = tokio::spawn(run_watchdog_timer(tx, Duration::from_millis(5), child));
        assert!(matches!(rx.recv().await, Some(AgentMsg::Watchdog)));
        cancel.cancel();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let cancel = CancellationToken::new();
        run_watchdog_timer(tx, Duration::from_millis(5), cancel).await;
    }
}
