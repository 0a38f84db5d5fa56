//! Closeness-bucketed peer protection balancing.
//!
//! This crate decides which tracked peers keep their connections protected
//! from resource-pressure eviction, favoring peers close to the local
//! reference identifier.
//!
//! # Architecture
//!
//! The balancer maintains two registries of peer records:
//! - `ordinary`: tracked peers with baseline status
//! - `protected`: peers whose connections are pinned open
//!
//! Both bucket their peers by closeness score and keep each bucket in
//! access order. After every join the balancer runs a bounded rebalance
//! step that promotes ordinary peers until the protected count reaches the
//! configured rate target, or - once a hard cap is saturated - performs at
//! most one swap, displacing the worst-off protected peer when a strictly
//! closer candidate appears. Departures and heartbeats never rebalance.
//!
//! Membership decisions are pushed to a [`ProtectionSink`]; the sink owns
//! enforcement, the balancer owns bookkeeping.
//!
//! # Usage
//!
//! ```ignore
//! use palisade_balancer::{BalancerConfig, NoopSink, ProtectionBalancer};
//!
//! let config = BalancerConfig::default().with_max_protected(64);
//! let balancer = ProtectionBalancer::new(config, NoopSink);
//!
//! // Host event loop feeds the balancer directly.
//! balancer.peer_joined(id, local_id.proximity(&id));
//! balancer.heartbeat(&id);
//! balancer.peer_left(&id);
//! ```

mod config;
mod events;
mod metrics;
mod registry;
mod sink;

pub use config::{
    BalancerConfig, DEFAULT_BASELINE_SCORE, DEFAULT_MAX_PROTECTED, DEFAULT_PROTECTION_RATE,
};
pub use events::{EventEmitter, ProtectionEvent};
pub use registry::{LastActive, ProximityRegistry};
pub use sink::NoopSink;

// Re-export the API surface hosts implement against.
pub use palisade_api::{ProtectionSink, SinkError, SinkResult};
pub use palisade_primitives::{MAX_PROXIMITY, PeerId};

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};
use web_time::Instant;

use crate::metrics::BalancerMetrics;

/// The two registries that partition the tracked peer set.
///
/// Invariant: a peer id appears in exactly one of the two, never both.
#[derive(Debug, Default)]
struct Registries {
    ordinary: ProximityRegistry,
    protected: ProximityRegistry,
}

/// Closeness-bucketed peer protection balancer.
///
/// The host owns one instance per tracked peer set and calls its event
/// methods directly from its event loop. Any number of threads may call
/// concurrently; events serialize through the internal lock, queries take
/// a shared read lock.
pub struct ProtectionBalancer<S> {
    config: BalancerConfig,
    registries: RwLock<Registries>,
    sink: S,
    events: EventEmitter,
    metrics: BalancerMetrics,
}

impl<S> std::fmt::Debug for ProtectionBalancer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registries = self.registries.read();
        f.debug_struct("ProtectionBalancer")
            .field("config", &self.config)
            .field("protected", &registries.protected.total_count())
            .field("ordinary", &registries.ordinary.total_count())
            .finish_non_exhaustive()
    }
}

impl<S: ProtectionSink> ProtectionBalancer<S> {
    /// Create a balancer with the given configuration and sink.
    pub fn new(config: BalancerConfig, sink: S) -> Self {
        Self {
            config,
            registries: RwLock::new(Registries::default()),
            sink,
            events: EventEmitter::default(),
            metrics: BalancerMetrics::default(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    /// Subscribe to membership events.
    pub fn subscribe(&self) -> broadcast::Receiver<ProtectionEvent> {
        self.events.subscribe()
    }

    /// A peer joined the tracked set with the given closeness score.
    ///
    /// The score is assigned once here and stays fixed while the peer is
    /// tracked. The sink sees the peer with baseline status before any
    /// promotion decided by the rebalance step. A join for an id that is
    /// already tracked is ignored.
    pub fn peer_joined(&self, id: PeerId, score: u8) {
        if let Err(err) = self.sink.track(id, self.config.baseline_score) {
            warn!(peer = %id, %err, "sink track failed");
        }

        let mut registries = self.registries.write();
        if registries.ordinary.contains(&id) || registries.protected.contains(&id) {
            trace!(peer = %id, "join ignored, peer already tracked");
            return;
        }

        // Not-yet-active sentinel: position and timestamp are set by the
        // first heartbeat.
        registries.ordinary.insert(score, id, None);
        self.metrics.inc_tracked();
        self.events.peer_tracked(id, score);
        debug!(
            peer = %id,
            score,
            ordinary = registries.ordinary.total_count(),
            protected = registries.protected.total_count(),
            "peer joined"
        );

        self.rebalance(&mut registries);

        debug_assert!(
            !(registries.ordinary.contains(&id) && registries.protected.contains(&id)),
            "peer {id} ended up in both registries"
        );
    }

    /// A peer left the tracked set.
    ///
    /// Returns whether the peer was tracked. Departures never trigger a
    /// rebalance: removing an ordinary peer can only raise the protection
    /// ratio, and restoring the ratio after a protected departure is
    /// deferred to the next join.
    pub fn peer_left(&self, id: &PeerId) -> bool {
        let mut registries = self.registries.write();
        let was_protected = registries.protected.remove(id);
        let removed = was_protected || registries.ordinary.remove(id);
        if removed {
            self.metrics.inc_forgotten();
            self.events.peer_forgotten(*id, was_protected);
            debug!(
                peer = %id,
                was_protected,
                remaining = registries.ordinary.total_count() + registries.protected.total_count(),
                "peer left"
            );
        }
        removed
    }

    /// Refresh a tracked peer's recency.
    ///
    /// Returns whether the peer is tracked, so callers can detect peers
    /// that have been dropped from tracking. Heartbeats never change
    /// membership or bucket totals - only the peer's position in its
    /// bucket, which feeds the rebalance step's recency tie-breaks.
    pub fn heartbeat(&self, id: &PeerId) -> bool {
        let now = Instant::now();
        let mut registries = self.registries.write();
        let updated = registries.protected.touch(id, now) || registries.ordinary.touch(id, now);
        if updated {
            trace!(peer = %id, "heartbeat");
        }
        updated
    }

    /// Read-only snapshot of the membership counts.
    pub fn stats(&self) -> BalancerStats {
        let registries = self.registries.read();
        let protected = registries.protected.total_count();
        let ordinary = registries.ordinary.total_count();
        let total = protected + ordinary;
        BalancerStats {
            protected,
            ordinary,
            ratio: if total == 0 {
                0.0
            } else {
                protected as f64 / total as f64
            },
        }
    }

    /// Check if a peer currently holds protected status.
    pub fn is_protected(&self, id: &PeerId) -> bool {
        self.registries.read().protected.contains(id)
    }

    /// Check if a peer is tracked at all.
    pub fn is_tracked(&self, id: &PeerId) -> bool {
        let registries = self.registries.read();
        registries.protected.contains(id) || registries.ordinary.contains(id)
    }

    /// Number of tracked peers.
    pub fn len(&self) -> usize {
        let registries = self.registries.read();
        registries.protected.total_count() + registries.ordinary.total_count()
    }

    /// Check if no peers are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of currently protected peer ids.
    pub fn protected_peers(&self) -> Vec<PeerId> {
        self.registries.read().protected.ids().copied().collect()
    }

    /// Snapshot of currently ordinary peer ids.
    pub fn ordinary_peers(&self) -> Vec<PeerId> {
        self.registries.read().ordinary.ids().copied().collect()
    }

    /// Log current bucket occupancy at debug level.
    ///
    /// Format: `score:protected/ordinary` for each non-empty score.
    pub fn log_status(&self) {
        let registries = self.registries.read();

        let mut by_score: BTreeMap<u8, (usize, usize)> = BTreeMap::new();
        for (score, len) in registries.protected.bucket_sizes() {
            by_score.entry(score).or_default().0 = len;
        }
        for (score, len) in registries.ordinary.bucket_sizes() {
            by_score.entry(score).or_default().1 = len;
        }

        let mut buckets = String::new();
        for (score, (protected, ordinary)) in by_score {
            if !buckets.is_empty() {
                buckets.push(' ');
            }
            buckets.push_str(&format!("{score}:{protected}/{ordinary}"));
        }
        if buckets.is_empty() {
            buckets = "(empty)".to_string();
        }

        debug!(
            protected = registries.protected.total_count(),
            ordinary = registries.ordinary.total_count(),
            buckets = %buckets,
            "protection balancer"
        );
    }

    /// Restore the ratio/cap invariant after a join.
    ///
    /// While the cap is saturated at most one swap runs per event, which
    /// bounds churn. Below the rate target, enough pure promotions run to
    /// reach it (possibly several after protected departures).
    fn rebalance(&self, registries: &mut Registries) {
        let protected = registries.protected.total_count();
        let ordinary = registries.ordinary.total_count();
        let cap = self.config.max_protected;
        let saturated = cap > 0 && protected >= cap;

        let actions = if saturated {
            1
        } else {
            let total = protected + ordinary;
            let rate = protected as f64 / total as f64;
            if rate >= self.config.protection_rate {
                // Above target; pruning protected peers back down is
                // intentionally not done here.
                return;
            }
            let mut target = (total as f64 * self.config.protection_rate) as usize;
            if cap > 0 && cap < target {
                target = cap;
            }
            target.saturating_sub(protected)
        };

        for _ in 0..actions {
            let Some(best_score) = registries.ordinary.max_score() else {
                return;
            };
            // Most recently active peer of the closest ordinary bucket:
            // among equally close candidates, prefer the one seen last.
            let Some((candidate, candidate_seen)) = registries.ordinary.peek_tail(best_score)
            else {
                return;
            };

            if saturated {
                let Some(worst_score) = registries.protected.min_score() else {
                    return;
                };
                if best_score <= worst_score {
                    // The candidate is no closer than the worst-off
                    // protected peer; an equal-score swap is pure churn.
                    return;
                }
                let Some((victim, victim_seen)) = registries.protected.peek_head(worst_score)
                else {
                    return;
                };

                registries.ordinary.remove(&candidate);
                registries.protected.remove(&victim);
                registries.ordinary.insert(worst_score, victim, victim_seen);
                registries.protected.insert(best_score, candidate, candidate_seen);

                // Unprotect before protect, so a sink that enforces the
                // cap on its own never sees both peers protected at once.
                if let Err(err) = self.sink.unprotect(victim) {
                    warn!(peer = %victim, %err, "sink unprotect failed");
                }
                if let Err(err) = self.sink.track(victim, self.config.baseline_score) {
                    warn!(peer = %victim, %err, "sink track failed");
                }
                if let Err(err) = self.sink.protect(candidate) {
                    warn!(peer = %candidate, %err, "sink protect failed");
                }

                self.metrics.inc_swaps();
                self.metrics.inc_promoted();
                self.metrics.inc_demoted();
                self.events.peer_demoted(victim, worst_score);
                self.events.peer_promoted(candidate, best_score);
                debug!(
                    promoted = %candidate,
                    promoted_score = best_score,
                    demoted = %victim,
                    demoted_score = worst_score,
                    "swapped protection"
                );
            } else {
                registries.ordinary.remove(&candidate);
                registries.protected.insert(best_score, candidate, candidate_seen);

                if let Err(err) = self.sink.protect(candidate) {
                    warn!(peer = %candidate, %err, "sink protect failed");
                }

                self.metrics.inc_promoted();
                self.events.peer_promoted(candidate, best_score);
                debug!(
                    peer = %candidate,
                    score = best_score,
                    protected = registries.protected.total_count(),
                    "promoted peer"
                );
            }
        }
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        let registries = self.registries.read();
        for id in registries.ordinary.ids() {
            assert!(
                !registries.protected.contains(id),
                "peer {id} in both registries"
            );
        }
    }
}

/// Snapshot of the balancer's membership counts.
#[derive(Debug, Clone)]
pub struct BalancerStats {
    /// Number of protected peers.
    pub protected: usize,
    /// Number of ordinary (tracked, unprotected) peers.
    pub ordinary: usize,
    /// Protected fraction of the tracked set (0.0 when empty).
    pub ratio: f64,
}
