//! Protection balancer metrics.

use metrics::Counter;

/// Counters for balancer membership activity.
#[derive(Clone, Debug)]
pub(crate) struct BalancerMetrics {
    /// Number of peers admitted into tracking.
    tracked_total: Counter,
    /// Number of promotions from ordinary to protected.
    promoted_total: Counter,
    /// Number of protected peers displaced back to ordinary.
    demoted_total: Counter,
    /// Number of cap-saturated swaps performed.
    swaps_total: Counter,
    /// Number of peers removed from tracking.
    forgotten_total: Counter,
}

impl Default for BalancerMetrics {
    fn default() -> Self {
        Self {
            tracked_total: metrics::counter!("balancer.peers.tracked_total"),
            promoted_total: metrics::counter!("balancer.peers.promoted_total"),
            demoted_total: metrics::counter!("balancer.peers.demoted_total"),
            swaps_total: metrics::counter!("balancer.peers.swaps_total"),
            forgotten_total: metrics::counter!("balancer.peers.forgotten_total"),
        }
    }
}

impl BalancerMetrics {
    pub(crate) fn inc_tracked(&self) {
        self.tracked_total.increment(1);
    }

    pub(crate) fn inc_promoted(&self) {
        self.promoted_total.increment(1);
    }

    pub(crate) fn inc_demoted(&self) {
        self.demoted_total.increment(1);
    }

    pub(crate) fn inc_swaps(&self) {
        self.swaps_total.increment(1);
    }

    pub(crate) fn inc_forgotten(&self) {
        self.forgotten_total.increment(1);
    }
}
