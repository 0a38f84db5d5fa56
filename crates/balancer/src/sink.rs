//! No-op sink that accepts every decision and enforces nothing.

use palisade_api::{ProtectionSink, SinkResult};
use palisade_primitives::PeerId;

/// No-op protection sink (accepts every call, enforces nothing).
///
/// For hosts that want membership bookkeeping without wiring a connection
/// manager, and as the dev/test default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProtectionSink for NoopSink {
    fn protect(&self, _id: PeerId) -> SinkResult<()> {
        Ok(())
    }

    fn unprotect(&self, _id: PeerId) -> SinkResult<()> {
        Ok(())
    }

    fn track(&self, _id: PeerId, _baseline: usize) -> SinkResult<()> {
        Ok(())
    }
}
