//! Membership events and non-blocking broadcast emitter.

use palisade_primitives::PeerId;
use tokio::sync::broadcast;

/// Membership changes emitted by the balancer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtectionEvent {
    /// A peer entered tracking with ordinary status.
    Tracked {
        /// The admitted peer.
        id: PeerId,
        /// Its closeness score at admission.
        score: u8,
    },
    /// A peer was promoted from ordinary to protected.
    Promoted {
        /// The promoted peer.
        id: PeerId,
        /// Its closeness score.
        score: u8,
    },
    /// A protected peer was displaced back to ordinary by a swap.
    Demoted {
        /// The displaced peer.
        id: PeerId,
        /// Its closeness score.
        score: u8,
    },
    /// A peer left tracking entirely.
    Forgotten {
        /// The departed peer.
        id: PeerId,
        /// Whether it was protected when it left.
        was_protected: bool,
    },
}

impl ProtectionEvent {
    /// The peer this event concerns.
    pub fn peer_id(&self) -> &PeerId {
        match self {
            Self::Tracked { id, .. }
            | Self::Promoted { id, .. }
            | Self::Demoted { id, .. }
            | Self::Forgotten { id, .. } => id,
        }
    }

    /// Whether this event changed a peer's protected/ordinary membership.
    pub fn is_membership_change(&self) -> bool {
        matches!(self, Self::Promoted { .. } | Self::Demoted { .. })
    }
}

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Non-blocking broadcast emitter. Slow subscribers drop events independently.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<ProtectionEvent>,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl EventEmitter {
    /// Create an emitter with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event. Never blocks; dropped if nobody listens.
    pub fn emit(&self, event: ProtectionEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to membership events.
    pub fn subscribe(&self) -> broadcast::Receiver<ProtectionEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventEmitter {
    pub(crate) fn peer_tracked(&self, id: PeerId, score: u8) {
        self.emit(ProtectionEvent::Tracked { id, score });
    }

    pub(crate) fn peer_promoted(&self, id: PeerId, score: u8) {
        self.emit(ProtectionEvent::Promoted { id, score });
    }

    pub(crate) fn peer_demoted(&self, id: PeerId, score: u8) {
        self.emit(ProtectionEvent::Demoted { id, score });
    }

    pub(crate) fn peer_forgotten(&self, id: PeerId, was_protected: bool) {
        self.emit(ProtectionEvent::Forgotten { id, was_protected });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_from_byte(b: u8) -> PeerId {
        PeerId::new([b; 32])
    }

    #[tokio::test]
    async fn test_emitter_basic() {
        let emitter = EventEmitter::default();
        let mut rx = emitter.subscribe();

        emitter.peer_tracked(id_from_byte(1), 4);

        let event = rx.recv().await.unwrap();
        match event {
            ProtectionEvent::Tracked { id, score } => {
                assert_eq!(id, id_from_byte(1));
                assert_eq!(score, 4);
            }
            _ => panic!("unexpected event"),
        }
    }

    #[tokio::test]
    async fn test_emitter_multiple_subscribers() {
        let emitter = EventEmitter::default();
        let mut rx1 = emitter.subscribe();
        let mut rx2 = emitter.subscribe();

        emitter.peer_promoted(id_from_byte(1), 9);

        assert!(rx1.recv().await.unwrap().is_membership_change());
        assert!(rx2.recv().await.unwrap().is_membership_change());
    }

    #[test]
    fn test_emitter_no_subscribers() {
        let emitter = EventEmitter::default();

        // Should not panic with nobody listening.
        emitter.peer_tracked(id_from_byte(1), 0);
        emitter.peer_forgotten(id_from_byte(1), false);
    }

    #[test]
    fn test_event_methods() {
        let event = ProtectionEvent::Promoted {
            id: id_from_byte(3),
            score: 7,
        };
        assert_eq!(*event.peer_id(), id_from_byte(3));
        assert!(event.is_membership_change());

        let event = ProtectionEvent::Forgotten {
            id: id_from_byte(3),
            was_protected: true,
        };
        assert!(!event.is_membership_change());
    }
}
