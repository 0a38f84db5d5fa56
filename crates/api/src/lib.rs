//! Palisade API - Core abstractions for peer protection.
//!
//! This crate defines the seam between membership decisions and whatever
//! mechanism enforces them. The balancer decides *which* peers are
//! protected; a [`ProtectionSink`] implementation talks to the connection
//! layer that actually pins connections open.
//!
//! # Design Principles
//!
//! - Traits define *what*, implementations define *how*
//! - No transport concepts leak into the API
//! - Sink implementations own idempotency: protecting an already-protected
//!   peer or unprotecting an untracked one must not fail the caller

#![warn(missing_docs)]

mod error;
mod sink;

pub use error::*;
pub use sink::*;

// Re-export identifier types for convenience
pub use palisade_primitives::{MAX_PROXIMITY, PeerId};
