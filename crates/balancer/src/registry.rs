//! Closeness-bucketed, access-ordered peer storage.
//!
//! Peers are organized into buckets keyed by proximity score. Each bucket
//! preserves access order: inserts append at the tail, a touch moves the
//! entry back to the tail, so the head is always the least-recently-touched
//! peer. The balancer uses head/tail position for its recency tie-breaks.
//!
//! # Implementation
//!
//! Buckets live in a `BTreeMap` so the minimum and maximum non-empty score
//! are ordered-index lookups rather than scans, and a `HashMap` id index
//! gives O(1) removal and membership checks. Empty buckets are pruned on
//! removal to keep the score bounds honest.

use std::collections::{BTreeMap, HashMap};

use hashlink::LinkedHashMap;
use palisade_primitives::PeerId;
use web_time::Instant;

/// A peer's last observed activity. `None` until its first heartbeat.
pub type LastActive = Option<Instant>;

/// Closeness-bucketed peer storage.
///
/// Does not deduplicate across buckets - the caller guarantees an id is
/// inserted at most once (the balancer keeps one id in exactly one bucket
/// of exactly one registry).
#[derive(Debug, Default)]
pub struct ProximityRegistry {
    /// Score to access-ordered bucket (head = least recently touched).
    buckets: BTreeMap<u8, LinkedHashMap<PeerId, LastActive>>,
    /// Id to score index, so removal and lookup avoid bucket scans.
    index: HashMap<PeerId, u8>,
}

impl ProximityRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a peer to the tail of the bucket for `score`.
    pub fn insert(&mut self, score: u8, id: PeerId, last_active: LastActive) {
        debug_assert!(
            !self.index.contains_key(&id),
            "peer {id} inserted twice into the same registry"
        );
        self.index.insert(id, score);
        self.buckets.entry(score).or_default().insert(id, last_active);
    }

    /// Remove a peer wherever it is stored.
    ///
    /// Returns `true` if the peer was present.
    pub fn remove(&mut self, id: &PeerId) -> bool {
        let Some(score) = self.index.remove(id) else {
            return false;
        };
        if let Some(bucket) = self.buckets.get_mut(&score) {
            bucket.remove(id);
            if bucket.is_empty() {
                self.buckets.remove(&score);
            }
        }
        true
    }

    /// Refresh a peer's activity, moving it to the tail of its bucket.
    ///
    /// Returns `true` if the peer was present.
    pub fn touch(&mut self, id: &PeerId, at: Instant) -> bool {
        let Some(score) = self.index.get(id) else {
            return false;
        };
        let Some(bucket) = self.buckets.get_mut(score) else {
            return false;
        };
        // Delete and re-append so the entry lands at the bucket tail.
        if bucket.remove(id).is_none() {
            return false;
        }
        bucket.insert(*id, Some(at));
        true
    }

    /// Total number of peers across all buckets.
    pub fn total_count(&self) -> usize {
        self.index.len()
    }

    /// Check if the registry holds no peers.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Check if a peer is stored here.
    pub fn contains(&self, id: &PeerId) -> bool {
        self.index.contains_key(id)
    }

    /// Get the score a peer was admitted under, if present.
    pub fn score_of(&self, id: &PeerId) -> Option<u8> {
        self.index.get(id).copied()
    }

    /// Smallest score with at least one peer.
    pub fn min_score(&self) -> Option<u8> {
        self.buckets.keys().next().copied()
    }

    /// Largest score with at least one peer.
    pub fn max_score(&self) -> Option<u8> {
        self.buckets.keys().next_back().copied()
    }

    /// The least-recently-touched peer in a bucket, without removing it.
    pub fn peek_head(&self, score: u8) -> Option<(PeerId, LastActive)> {
        self.buckets
            .get(&score)
            .and_then(|bucket| bucket.front())
            .map(|(id, last_active)| (*id, *last_active))
    }

    /// The most-recently-touched peer in a bucket, without removing it.
    pub fn peek_tail(&self, score: u8) -> Option<(PeerId, LastActive)> {
        self.buckets
            .get(&score)
            .and_then(|bucket| bucket.back())
            .map(|(id, last_active)| (*id, *last_active))
    }

    /// Iterate over all stored peer ids.
    pub fn ids(&self) -> impl Iterator<Item = &PeerId> {
        self.index.keys()
    }

    /// Iterate over non-empty buckets as `(score, len)`, ascending by score.
    pub fn bucket_sizes(&self) -> impl Iterator<Item = (u8, usize)> + '_ {
        self.buckets.iter().map(|(score, bucket)| (*score, bucket.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_from_byte(b: u8) -> PeerId {
        PeerId::new([b; 32])
    }

    #[test]
    fn test_insert_remove() {
        let mut registry = ProximityRegistry::new();

        let peer1 = id_from_byte(1);
        let peer2 = id_from_byte(2);

        registry.insert(0, peer1, None);
        registry.insert(1, peer2, None);

        assert_eq!(registry.total_count(), 2);
        assert!(registry.contains(&peer1));
        assert_eq!(registry.score_of(&peer2), Some(1));

        assert!(registry.remove(&peer1));
        assert!(!registry.remove(&peer1)); // Already removed

        assert_eq!(registry.total_count(), 1);
        assert!(!registry.contains(&peer1));
        assert!(registry.contains(&peer2));
    }

    #[test]
    fn test_head_tail_order() {
        let mut registry = ProximityRegistry::new();

        let peer1 = id_from_byte(1);
        let peer2 = id_from_byte(2);
        let peer3 = id_from_byte(3);

        registry.insert(5, peer1, None);
        registry.insert(5, peer2, None);
        registry.insert(5, peer3, None);

        // Head is the oldest insert, tail the newest.
        assert_eq!(registry.peek_head(5).map(|(id, _)| id), Some(peer1));
        assert_eq!(registry.peek_tail(5).map(|(id, _)| id), Some(peer3));
    }

    #[test]
    fn test_touch_moves_to_tail() {
        let mut registry = ProximityRegistry::new();

        let peer1 = id_from_byte(1);
        let peer2 = id_from_byte(2);

        registry.insert(5, peer1, None);
        registry.insert(5, peer2, None);
        assert_eq!(registry.peek_head(5).map(|(id, _)| id), Some(peer1));

        assert!(registry.touch(&peer1, Instant::now()));

        // peer1 moved behind peer2, and its timestamp is now set.
        assert_eq!(registry.peek_head(5).map(|(id, _)| id), Some(peer2));
        let (tail, last_active) = registry.peek_tail(5).unwrap();
        assert_eq!(tail, peer1);
        assert!(last_active.is_some());
    }

    #[test]
    fn test_touch_missing_peer() {
        let mut registry = ProximityRegistry::new();
        assert!(!registry.touch(&id_from_byte(9), Instant::now()));
    }

    #[test]
    fn test_touch_preserves_counts() {
        let mut registry = ProximityRegistry::new();

        let peer = id_from_byte(1);
        registry.insert(3, peer, None);
        registry.touch(&peer, Instant::now());

        assert_eq!(registry.total_count(), 1);
        assert_eq!(registry.score_of(&peer), Some(3));
    }

    #[test]
    fn test_score_bounds() {
        let mut registry = ProximityRegistry::new();

        assert_eq!(registry.min_score(), None);
        assert_eq!(registry.max_score(), None);

        registry.insert(3, id_from_byte(1), None);
        registry.insert(7, id_from_byte(2), None);
        registry.insert(5, id_from_byte(3), None);

        assert_eq!(registry.min_score(), Some(3));
        assert_eq!(registry.max_score(), Some(7));
    }

    #[test]
    fn test_empty_buckets_pruned() {
        let mut registry = ProximityRegistry::new();

        let peer1 = id_from_byte(1);
        let peer2 = id_from_byte(2);

        registry.insert(3, peer1, None);
        registry.insert(7, peer2, None);

        registry.remove(&peer2);
        assert_eq!(registry.max_score(), Some(3));

        registry.remove(&peer1);
        assert_eq!(registry.min_score(), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bucket_sizes() {
        let mut registry = ProximityRegistry::new();

        registry.insert(0, id_from_byte(1), None);
        registry.insert(0, id_from_byte(2), None);
        registry.insert(4, id_from_byte(3), None);

        let sizes: Vec<_> = registry.bucket_sizes().collect();
        assert_eq!(sizes, vec![(0, 2), (4, 1)]);
    }

    #[test]
    fn test_peek_empty_bucket() {
        let registry = ProximityRegistry::new();
        assert_eq!(registry.peek_head(0), None);
        assert_eq!(registry.peek_tail(0), None);
    }
}
