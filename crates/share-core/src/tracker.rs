//! Expiry tracking for records shared with the viewer
//!
//! [`ExpiryBoard`] is the synchronous state machine: it owns the live list,
//! recomputes countdowns on each tick, drops expired records and decides
//! which grants need a revoke. A grant is marked revoke-pending in the same
//! step that removes it, so a revoke is issued at most once per expiry no
//! matter how ticks and in-flight revokes interleave.
//!
//! [`ExpiryTracker`] is the async shell around it: a 1 s ticker task and a
//! revoke worker fed through a queue. The ticker never awaits a revoke.

use crate::countdown::Clock;
use crate::ledger::AccessLedger;
use crate::types::{Address, GrantKey, SharedRecord};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default tick period
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Live countdowns plus revoke bookkeeping
#[derive(Debug, Default)]
pub struct ExpiryBoard {
    records: Vec<SharedRecord>,
    /// Expiry for which a revoke has already been issued, per grant
    revoked: HashMap<GrantKey, i64>,
    /// Revokes issued and not yet completed, with the expiry each one covers
    in_flight: HashMap<GrantKey, i64>,
}

impl ExpiryBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly fetched list
    ///
    /// Returns the grants that must be revoked now: records already past
    /// their expiry whose expiry has not been revoked before. Such records
    /// are never installed. A record is re-admitted only if it carries a
    /// later expiry than the one already revoked (a re-grant).
    pub fn replace(&mut self, records: Vec<SharedRecord>, now: i64) -> Vec<GrantKey> {
        let incoming: HashSet<GrantKey> = records.iter().map(SharedRecord::grant_key).collect();
        // Grants the ledger no longer reports cannot come back with the same expiry
        self.revoked.retain(|key, _| incoming.contains(key));

        let mut revokes = Vec::new();
        self.records.clear();
        for mut record in records {
            let key = record.grant_key();
            if self.already_revoked(&key, record.expiry_time) {
                continue;
            }
            if record.is_expired(now) {
                if self.mark_revoke(key.clone(), record.expiry_time) {
                    revokes.push(key);
                }
                continue;
            }
            record.refresh_countdown(now);
            self.records.push(record);
        }
        revokes
    }

    /// Advance every countdown to `now`
    ///
    /// Expired records are removed and their grants returned for revoke.
    pub fn tick(&mut self, now: i64) -> Vec<GrantKey> {
        let mut revokes = Vec::new();
        let mut live = Vec::with_capacity(self.records.len());
        for mut record in std::mem::take(&mut self.records) {
            if record.is_expired(now) {
                let key = record.grant_key();
                if self.mark_revoke(key.clone(), record.expiry_time) {
                    revokes.push(key);
                }
                continue;
            }
            record.refresh_countdown(now);
            live.push(record);
        }
        self.records = live;
        revokes
    }

    /// Clear the in-flight mark once a revoke finished (either way)
    ///
    /// A mark left by a later expiry of the same grant is kept.
    pub fn complete_revoke(&mut self, key: &GrantKey, expiry_time: i64) {
        if self.in_flight.get(key) == Some(&expiry_time) {
            self.in_flight.remove(key);
        }
    }

    /// Expiry covered by the revoke in flight for `key`
    pub fn in_flight_expiry(&self, key: &GrantKey) -> Option<i64> {
        self.in_flight.get(key).copied()
    }

    /// Forget revokes whose tasks were aborted
    ///
    /// Their expiries stay marked as revoked, so a restart does not issue
    /// them again.
    pub fn abandon_revokes(&mut self) -> usize {
        let dropped = self.in_flight.len();
        self.in_flight.clear();
        dropped
    }

    pub fn records(&self) -> &[SharedRecord] {
        &self.records
    }

    pub fn pending_revokes(&self) -> usize {
        self.in_flight.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.revoked.clear();
        self.in_flight.clear();
    }

    fn already_revoked(&self, key: &GrantKey, expiry_time: i64) -> bool {
        self.revoked
            .get(key)
            .is_some_and(|&revoked_expiry| expiry_time <= revoked_expiry)
    }

    fn mark_revoke(&mut self, key: GrantKey, expiry_time: i64) -> bool {
        if self.already_revoked(&key, expiry_time) {
            return false;
        }
        self.revoked.insert(key.clone(), expiry_time);
        self.in_flight.insert(key, expiry_time);
        true
    }
}

/// Tracker settings
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub tick_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// A grant to revoke and the expiry the revoke covers
type RevokeJob = (GrantKey, i64);

/// State shared between the tracker handle and its tasks
struct Shared {
    clock: Arc<dyn Clock>,
    board: Mutex<ExpiryBoard>,
    snapshots: watch::Sender<Vec<SharedRecord>>,
}

impl Shared {
    fn board(&self) -> MutexGuard<'_, ExpiryBoard> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one mutation and publish the result while still holding the lock
    fn mutate<F>(&self, revokes: &mpsc::UnboundedSender<RevokeJob>, f: F)
    where
        F: FnOnce(&mut ExpiryBoard, i64) -> Vec<GrantKey>,
    {
        let now = self.clock.now();
        let mut board = self.board();
        let expired: Vec<RevokeJob> = f(&mut board, now)
            .into_iter()
            .filter_map(|key| board.in_flight_expiry(&key).map(|expiry| (key, expiry)))
            .collect();
        self.snapshots.send_replace(board.records().to_vec());
        drop(board);

        for (key, expiry) in expired {
            debug!(record = %key.0, grantee = %key.1, expiry, "grant expired; queueing revoke");
            if revokes.send((key, expiry)).is_err() {
                // Worker gone: tracker is shutting down
                break;
            }
        }
    }
}

/// Handles of a running tracker; dropping it tears everything down
struct Running {
    shutdown: watch::Sender<bool>,
    revokes: mpsc::UnboundedSender<RevokeJob>,
    ticker: JoinHandle<()>,
    revoker: JoinHandle<()>,
}

impl Drop for Running {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        self.ticker.abort();
        self.revoker.abort();
    }
}

/// Live countdown over the records shared with one identity
///
/// Without an identity the tracker is inert: `start` spawns nothing and no
/// ledger call is ever made.
pub struct ExpiryTracker<L: AccessLedger> {
    identity: Option<Address>,
    ledger: Arc<L>,
    config: TrackerConfig,
    shared: Arc<Shared>,
    running: Option<Running>,
}

impl<L: AccessLedger> ExpiryTracker<L> {
    pub fn new(
        identity: Option<Address>,
        ledger: Arc<L>,
        clock: Arc<dyn Clock>,
        config: TrackerConfig,
    ) -> Self {
        let (snapshots, _) = watch::channel(Vec::new());
        ExpiryTracker {
            identity,
            ledger,
            config,
            shared: Arc::new(Shared {
                clock,
                board: Mutex::new(ExpiryBoard::new()),
                snapshots,
            }),
            running: None,
        }
    }

    /// Start ticking over `records`
    ///
    /// Returns `false` (and does nothing) when no identity is set. A running
    /// tracker is stopped and restarted with the new list.
    pub fn start(&mut self, records: Vec<SharedRecord>) -> bool {
        let Some(identity) = self.identity else {
            debug!("no authenticated identity; expiry tracking disabled");
            return false;
        };
        self.stop();

        let (shutdown, shutdown_rx) = watch::channel(false);
        let (revokes, revoke_rx) = mpsc::unbounded_channel();

        let count = records.len();
        self.shared
            .mutate(&revokes, |board, now| board.replace(records, now));

        let ticker = tokio::spawn(run_ticker(
            self.shared.clone(),
            revokes.clone(),
            self.config.tick_interval,
            shutdown_rx.clone(),
        ));
        let revoker = tokio::spawn(run_revoker(
            self.ledger.clone(),
            identity,
            self.shared.clone(),
            revoke_rx,
            shutdown_rx,
        ));

        info!(identity = %identity, records = count, "expiry tracking started");
        self.running = Some(Running {
            shutdown,
            revokes,
            ticker,
            revoker,
        });
        true
    }

    /// Replace the tracked list with a fresh fetch
    ///
    /// No-op returning `false` while stopped.
    pub fn update(&mut self, records: Vec<SharedRecord>) -> bool {
        let Some(running) = &self.running else {
            debug!("tracker stopped; ignoring update");
            return false;
        };
        self.shared
            .mutate(&running.revokes, |board, now| board.replace(records, now));
        true
    }

    /// Stop ticking and drop any in-flight revoke
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            drop(running);
            let abandoned = self.shared.board().abandon_revokes();
            info!(abandoned, "expiry tracking stopped");
        }
    }

    /// Change the authenticated identity
    ///
    /// Tracking stops and the board is cleared so nothing is revoked under
    /// an identity that no longer applies.
    pub fn set_identity(&mut self, identity: Option<Address>) {
        if self.identity == identity {
            return;
        }
        self.stop();
        self.identity = identity;
        self.shared.board().clear();
        self.shared.snapshots.send_replace(Vec::new());
    }

    pub fn identity(&self) -> Option<&Address> {
        self.identity.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Consistent copy of the live list
    pub fn snapshot(&self) -> Vec<SharedRecord> {
        self.shared.board().records().to_vec()
    }

    /// Revokes issued and not yet completed
    pub fn pending_revokes(&self) -> usize {
        self.shared.board().pending_revokes()
    }

    /// Receive the live list after every tick or update
    pub fn subscribe(&self) -> watch::Receiver<Vec<SharedRecord>> {
        self.shared.snapshots.subscribe()
    }
}

impl<L: AccessLedger> Drop for ExpiryTracker<L> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_ticker(
    shared: Arc<Shared>,
    revokes: mpsc::UnboundedSender<RevokeJob>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the list was just installed
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = interval.tick() => {
                shared.mutate(&revokes, |board, now| board.tick(now));
            }
        }
    }
}

async fn run_revoker<L: AccessLedger>(
    ledger: Arc<L>,
    identity: Address,
    shared: Arc<Shared>,
    mut queue: mpsc::UnboundedReceiver<RevokeJob>,
    mut shutdown: watch::Receiver<bool>,
) {
    // Dropping the set on shutdown aborts revokes still in flight
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            Some((key, expiry)) = queue.recv() => {
                let ledger = ledger.clone();
                in_flight.spawn(async move {
                    let result = ledger.revoke_access(&identity, &key.0, &key.1).await;
                    (key, expiry, result)
                });
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                match joined {
                    Ok((key, expiry, Ok(receipt))) => {
                        info!(record = %key.0, grantee = %key.1, tx = %receipt.tx_hash, "expired grant revoked");
                        shared.board().complete_revoke(&key, expiry);
                    }
                    Ok((key, expiry, Err(e))) => {
                        warn!(record = %key.0, grantee = %key.1, error = %e, "revoke of expired grant failed");
                        shared.board().complete_revoke(&key, expiry);
                    }
                    Err(e) => warn!(error = %e, "revoke task ended abnormally"),
                }
            }
            else => break,
        }
    }
}
