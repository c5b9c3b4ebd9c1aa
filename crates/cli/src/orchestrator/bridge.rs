// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle of the auxiliary web-terminal bridge process: best-effort
//! spawn, upward port scan, and a health probe used on resume. The bridge
//! is optional and independent of correctness (spec §1) — every failure
//! here is logged and swallowed by the caller, never propagated.

use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::store::model::BridgeInfo;

/// Scan upward from `base` for the first port that is free right now.
/// Binds then immediately drops the listener ("probe-then-bind") so the
/// child process can claim the same port moments later; concurrent
/// claimants are safe because each independently retries on bind failure
/// (spec §5 "Ports").
pub async fn claim_port(base: u16, host: &str) -> Option<u16> {
    for port in base..base.saturating_add(200) {
        if TcpListener::bind((host, port)).await.is_ok() {
            return Some(port);
        }
    }
    None
}

/// Best-effort spawn of the bridge binary pointed at a multiplexer pane.
/// Returns `None` (never an error) on any failure — the caller logs and
/// continues without a bridge per the "auxiliary" contract.
pub async fn spawn(bridge_bin: &str, port: u16, mux_session_name: &str) -> Option<BridgeInfo> {
    let mut command = tokio::process::Command::new(bridge_bin);
    command
        .arg("--port")
        .arg(port.to_string())
        .arg("--session")
        .arg(mux_session_name)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());

    match command.spawn() {
        Ok(child) => {
            let pid = child.id().unwrap_or(0);
            // The bridge is a long-lived detached process; orka does not
            // own its lifetime beyond recording where it is.
            std::mem::forget(child);
            debug!(port, pid, "bridge started");
            Some(BridgeInfo { port, pid })
        }
        Err(e) => {
            warn!(error = %e, bridge_bin, "bridge failed to start, continuing without it");
            None
        }
    }
}

/// Probe whether a bridge is still reachable, 2s timeout per spec §5.
pub async fn is_healthy(port: u16) -> bool {
    let addr = format!("127.0.0.1:{port}");
    tokio::time::timeout(Duration::from_secs(2), tokio::net::TcpStream::connect(&addr))
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn claim_port_finds_a_free_port() {
        let port = claim_port(18000, "127.0.0.1").await;
        assert!(port.is_some());
    }

    #[tokio::test]
    async fn claim_port_skips_occupied_port() {
        let held = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let occupied = held.local_addr().unwrap().port();
        let found = claim_port(occupied, "127.0.0.1").await.unwrap();
        assert_ne!(found, occupied);
        drop(held);
    }

    #[tokio::test]
    async fn health_probe_fails_on_unbound_port() {
        let port = claim_port(19500, "127.0.0.1").await.unwrap();
        assert!(!is_healthy(port).await);
    }
}
