//! Priority queue of active relations.
//!
//! Min-heap on (similarity, insertion sequence) with lazy invalidation:
//! removed or re-scored relations leave stale heap entries behind that are
//! skipped on pop.

use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

use super::super::elements::RelationKey;

/// Heap entry for the merge loop.
///
/// Ordering: (similarity, seq) lexicographic, smaller first. `seq` breaks
/// ties in favour of the relation inserted first.
#[derive(Clone, Debug)]
pub struct QueueEntry {
    pub similarity: OrderedFloat<f64>,
    pub seq: u64,
    pub key: RelationKey,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.similarity == other.similarity && self.seq == other.seq
    }
}
impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse for min-heap: smaller values should be "greater" so they pop first
        other
            .similarity
            .cmp(&self.similarity)
            .then(other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Default)]
pub struct RelationQueue {
    heap: BinaryHeap<QueueEntry>,
    /// Live sequence number per key; heap entries with another seq are stale.
    live: FxHashMap<RelationKey, u64>,
    next_seq: u64,
}

impl RelationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a relation, replacing any previous entry for the same key.
    pub fn push(&mut self, key: RelationKey, similarity: f64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.live.insert(key, seq);
        self.heap.push(QueueEntry {
            similarity: OrderedFloat(similarity),
            seq,
            key,
        });
    }

    /// Forgets a relation. Its heap entry is dropped lazily.
    pub fn remove(&mut self, key: &RelationKey) -> bool {
        self.live.remove(key).is_some()
    }

    /// Pops the live relation with the lowest similarity.
    pub fn pop_min(&mut self) -> Option<(RelationKey, f64)> {
        while let Some(entry) = self.heap.pop() {
            if self.live.get(&entry.key) == Some(&entry.seq) {
                self.live.remove(&entry.key);
                return Some((entry.key, entry.similarity.into_inner()));
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }
}
