//! The protection sink trait - enforcement boundary for membership decisions.

use palisade_primitives::PeerId;

use crate::SinkResult;

/// Receiver of protection decisions.
///
/// The balancer calls these as fire-and-forget side effects while holding
/// its lock, so implementations must be bounded local work: an adapter
/// wrapping a network call should queue internally rather than block.
///
/// All three operations are idempotent from the caller's perspective:
/// protecting an already-protected peer or unprotecting an untracked one
/// must succeed.
#[auto_impl::auto_impl(&, Arc)]
pub trait ProtectionSink: Send + Sync {
    /// Mark a peer's connection to survive resource-pressure eviction.
    fn protect(&self, id: PeerId) -> SinkResult<()>;

    /// Clear a peer's protected mark.
    fn unprotect(&self, id: PeerId) -> SinkResult<()>;

    /// Register a peer with baseline, unprotected status.
    ///
    /// Called once when a peer enters tracking, and again to re-baseline a
    /// peer demoted by a swap.
    fn track(&self, id: PeerId, baseline: usize) -> SinkResult<()>;
}
