// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbox of pending cart writes to the remote API.
//!
//! Local cart mutations push a job onto an unbounded channel and return
//! immediately. A single background task drains the channel:
//! - Every job carries the full cart state, so only the newest pending job
//!   for a session token matters and older ones for that token are
//!   superseded. Jobs for different tokens are all delivered, in order.
//! - Transient failures (transport, 429, 5xx) are retried with exponential
//!   backoff; anything else is dropped after logging.
//! - Local state is never rolled back.

use crate::error::Result;
use crate::models::CartItem;
use crate::services::cart_api::CartApiClient;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A remote cart write.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOp {
    /// Replace the server cart with these items
    Replace(Vec<CartItem>),
    /// Empty the server cart
    Clear,
}

/// A write together with the session token it must be sent with.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncJob {
    pub token: String,
    pub op: SyncOp,
}

/// Retry schedule for failed deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): base, 2x base, 4x base...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Counters reported when the worker shuts down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboxStats {
    /// Jobs accepted by the server
    pub delivered: u32,
    /// Jobs abandoned after a permanent failure or exhausted retries
    pub dropped: u32,
    /// Jobs skipped because a newer one for the same token was already queued
    pub superseded: u32,
}

/// Sending side of the outbox. Cheap to clone; the worker exits once every
/// handle has been dropped and the queue is drained.
#[derive(Debug, Clone)]
pub struct OutboxHandle {
    tx: mpsc::UnboundedSender<SyncJob>,
}

impl OutboxHandle {
    /// Queue a write. Never blocks. Returns `false` if the worker is gone.
    pub fn enqueue(&self, token: &str, op: SyncOp) -> bool {
        let job = SyncJob {
            token: token.to_string(),
            op,
        };
        match self.tx.send(job) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("Cart sync worker has stopped; dropping write");
                false
            }
        }
    }

    /// Build a handle around a raw channel. The receiving side is left to the
    /// caller, which lets tests observe queued jobs directly.
    pub fn from_sender(tx: mpsc::UnboundedSender<SyncJob>) -> Self {
        Self { tx }
    }
}

/// Background delivery of cart writes.
pub struct SyncOutbox;

impl SyncOutbox {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(
        client: CartApiClient,
        policy: RetryPolicy,
    ) -> (OutboxHandle, JoinHandle<OutboxStats>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(client, policy, rx));
        (OutboxHandle { tx }, worker)
    }
}

async fn run_worker(
    client: CartApiClient,
    policy: RetryPolicy,
    mut rx: mpsc::UnboundedReceiver<SyncJob>,
) -> OutboxStats {
    let mut stats = OutboxStats::default();
    let mut backlog: VecDeque<SyncJob> = VecDeque::new();

    loop {
        let mut job = match backlog.pop_front() {
            Some(job) => job,
            None => match rx.recv().await {
                Some(job) => job,
                None => break,
            },
        };
        collect_pending(&mut rx, &mut backlog, &mut stats);
        supersede(&mut job, &mut backlog, &mut stats);

        let mut attempt = 0;
        loop {
            match deliver(&client, &job).await {
                Ok(()) => {
                    stats.delivered += 1;
                    tracing::debug!(op = op_name(&job.op), "Cart synced to server");
                    break;
                }
                Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                    let delay = policy.delay_for(attempt);
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max_retries = policy.max_retries,
                        error = %e,
                        "Cart sync failed, retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;

                    // A write for the same session queued while we slept
                    // makes this one stale.
                    collect_pending(&mut rx, &mut backlog, &mut stats);
                    if supersede(&mut job, &mut backlog, &mut stats) {
                        attempt = 0;
                    }
                }
                Err(e) if e.is_unauthorized() => {
                    stats.dropped += 1;
                    tracing::warn!(
                        op = op_name(&job.op),
                        "Session token rejected; dropping cart sync, local cart is kept"
                    );
                    break;
                }
                Err(e) => {
                    stats.dropped += 1;
                    tracing::warn!(
                        op = op_name(&job.op),
                        attempts = attempt + 1,
                        error = %e,
                        "Dropping cart sync; local cart is kept"
                    );
                    break;
                }
            }
        }
    }

    tracing::info!(
        delivered = stats.delivered,
        dropped = stats.dropped,
        superseded = stats.superseded,
        "Cart sync worker stopped"
    );
    stats
}

/// Move everything currently queued onto `backlog`. A job replaces the one
/// right before it when both carry the same token; jobs for different
/// tokens are kept in order.
fn collect_pending(
    rx: &mut mpsc::UnboundedReceiver<SyncJob>,
    backlog: &mut VecDeque<SyncJob>,
    stats: &mut OutboxStats,
) {
    while let Ok(job) = rx.try_recv() {
        match backlog.back_mut() {
            Some(last) if last.token == job.token => {
                stats.superseded += 1;
                *last = job;
            }
            _ => backlog.push_back(job),
        }
    }
}

/// Replace `job` with the next backlog entry if that one is for the same
/// session. Returns whether it did.
fn supersede(job: &mut SyncJob, backlog: &mut VecDeque<SyncJob>, stats: &mut OutboxStats) -> bool {
    if backlog.front().is_some_and(|next| next.token == job.token) {
        if let Some(next) = backlog.pop_front() {
            stats.superseded += 1;
            *job = next;
            return true;
        }
    }
    false
}

async fn deliver(client: &CartApiClient, job: &SyncJob) -> Result<()> {
    match &job.op {
        SyncOp::Replace(items) => client.replace_cart(&job.token, items).await,
        SyncOp::Clear => client.clear_cart(&job.token).await,
    }
}

fn op_name(op: &SyncOp) -> &'static str {
    match op {
        SyncOp::Replace(_) => "replace",
        SyncOp::Clear => "clear",
    }
}
