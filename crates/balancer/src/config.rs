//! Balancer configuration.
//!
//! Two knobs govern how many peers stay protected:
//!
//! - **Protection rate** (`protection_rate`, default 0.5): target fraction
//!   of tracked peers kept protected while no cap constrains it.
//!
//! - **Cap** (`max_protected`, default 0 = unlimited): hard ceiling on the
//!   protected count. Once the cap is saturated, a join can displace an
//!   existing protected peer through at most one swap per event.

/// Default target fraction of tracked peers kept protected.
pub const DEFAULT_PROTECTION_RATE: f64 = 0.5;

/// Default cap on the protected count (0 = unlimited).
pub const DEFAULT_MAX_PROTECTED: usize = 0;

/// Default baseline score reported to the sink when tracking a peer.
pub const DEFAULT_BASELINE_SCORE: usize = 5;

/// Configuration for the protection balancer.
#[derive(Debug, Clone)]
pub struct BalancerConfig {
    /// Target fraction of tracked peers kept protected, in (0, 1].
    /// Overridden by the cap whenever the cap yields a smaller target.
    pub protection_rate: f64,

    /// Hard ceiling on the protected count. 0 means unlimited.
    pub max_protected: usize,

    /// Baseline score reported to the sink when a peer is (re-)tracked.
    pub baseline_score: usize,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            protection_rate: DEFAULT_PROTECTION_RATE,
            max_protected: DEFAULT_MAX_PROTECTED,
            baseline_score: DEFAULT_BASELINE_SCORE,
        }
    }
}

impl BalancerConfig {
    /// Set the target protection rate. Must be in (0, 1].
    pub fn with_protection_rate(mut self, rate: f64) -> Self {
        debug_assert!(
            rate > 0.0 && rate <= 1.0,
            "protection rate must be in (0, 1]"
        );
        self.protection_rate = rate;
        self
    }

    /// Set the cap on protected peers (0 = unlimited).
    pub fn with_max_protected(mut self, cap: usize) -> Self {
        self.max_protected = cap;
        self
    }

    /// Set the baseline score passed to the sink's track call.
    pub fn with_baseline_score(mut self, score: usize) -> Self {
        self.baseline_score = score;
        self
    }

    /// Whether a cap on the protected count is in force.
    pub fn has_cap(&self) -> bool {
        self.max_protected > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BalancerConfig::default();
        assert_eq!(config.protection_rate, DEFAULT_PROTECTION_RATE);
        assert_eq!(config.max_protected, DEFAULT_MAX_PROTECTED);
        assert_eq!(config.baseline_score, DEFAULT_BASELINE_SCORE);
        assert!(!config.has_cap());
    }

    #[test]
    fn test_builders() {
        let config = BalancerConfig::default()
            .with_protection_rate(0.8)
            .with_max_protected(10)
            .with_baseline_score(7);
        assert_eq!(config.protection_rate, 0.8);
        assert_eq!(config.max_protected, 10);
        assert_eq!(config.baseline_score, 7);
        assert!(config.has_cap());
    }
}
