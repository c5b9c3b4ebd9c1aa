// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff with jitter, per the retry policy in the design
//! notes: idempotent reads get up to 3 attempts, writes with a pane-visible
//! side effect (`send_keys`/`send_enter`) get exactly 1 — resending a
//! keystroke write could double-deliver it into the pane.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::MuxError;

const BASE_DELAY: Duration = Duration::from_millis(50);

/// Retry an idempotent read up to `max_attempts` times with jittered
/// exponential backoff. Stops immediately on a fatal (`Unavailable`) error.
pub async fn retry_read<T, F, Fut>(max_attempts: u32, mut op: F) -> Result<T, MuxError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MuxError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                attempt += 1;
                if attempt >= max_attempts {
                    return Err(e);
                }
                let backoff = BASE_DELAY * 2u32.pow(attempt - 1);
                let jitter_ms = rand::rng().random_range(0..=backoff.as_millis() as u64 / 2 + 1);
                tokio::time::sleep(backoff + Duration::from_millis(jitter_ms)).await;
            }
        }
    }
}

/// Run a pane-mutating write exactly once — no retry, to avoid double
/// delivering a keystroke if the first attempt actually succeeded but the
/// response was lost.
pub async fn run_write<T, Fut>(op: Fut) -> Result<T, MuxError>
where
    Fut: Future<Output = Result<T, MuxError>>,
{
    op.await
}
