//! Redelivery buffer for produced batches.
//!
//! A batch is the only record of the operations it carries: the nodes in it
//! were already marked synchronized, so a lost batch cannot be recomputed by
//! running another cycle. The outbox keeps every batch until the viewer
//! acknowledges it:
//! - FIFO ordering for delivery
//! - In-flight tracking (sent but not yet acknowledged), keyed by cycle
//!
//! Batches must be applied in cycle order, so a caller sends nothing new
//! while an older batch is unacknowledged.

use std::collections::{BTreeMap, VecDeque};

use livekml_types::CycleId;

use crate::batch::OperationBatch;

/// Batches waiting for delivery or acknowledgement.
///
/// Batches flow through the outbox in this order:
/// 1. `enqueue()` - add to the queue
/// 2. `dequeue()` - remove from queue, move to in-flight
/// 3. `ack_through()` / `ack_all()` - delivery confirmed, drop it
///
/// If delivery fails, `nack_all()` moves every in-flight batch back to the
/// front of the queue.
#[derive(Debug)]
pub struct Outbox<F> {
    queue: VecDeque<OperationBatch<F>>,
    in_flight: BTreeMap<CycleId, OperationBatch<F>>,
}

impl<F> Default for Outbox<F> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            in_flight: BTreeMap::new(),
        }
    }
}

impl<F: Clone> Outbox<F> {
    /// Create an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a batch to the back of the queue.
    pub fn enqueue(&mut self, batch: OperationBatch<F>) {
        self.queue.push_back(batch);
    }

    /// Take the next batch for sending. A copy stays in flight until it is
    /// acknowledged.
    pub fn dequeue(&mut self) -> Option<OperationBatch<F>> {
        let batch = self.queue.pop_front()?;
        self.in_flight.insert(batch.cycle(), batch.clone());
        Some(batch)
    }

    /// Acknowledge every in-flight batch up to and including `cycle`.
    ///
    /// Returns the number of batches released.
    pub fn ack_through(&mut self, cycle: CycleId) -> usize {
        let keep = match cycle.value().checked_add(1) {
            Some(next) => self.in_flight.split_off(&CycleId::new(next)),
            None => BTreeMap::new(),
        };
        let released = self.in_flight.len();
        self.in_flight = keep;
        released
    }

    /// Acknowledge every in-flight batch.
    ///
    /// Returns the number of batches released.
    pub fn ack_all(&mut self) -> usize {
        std::mem::take(&mut self.in_flight).len()
    }

    /// Move every in-flight batch back to the queue, oldest first.
    ///
    /// Returns the number of batches requeued.
    pub fn nack_all(&mut self) -> usize {
        let in_flight = std::mem::take(&mut self.in_flight);
        let count = in_flight.len();
        for (_, batch) in in_flight.into_iter().rev() {
            self.queue.push_front(batch);
        }
        count
    }

    /// Check if nothing is queued (in-flight batches aside).
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queued plus in-flight.
    pub fn total_count(&self) -> usize {
        self.queue.len() + self.in_flight.len()
    }

    /// Drop everything, queued and in-flight.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchEntry;
    use livekml_types::{NodeId, OpKind};

    fn batch(cycle: u64) -> OperationBatch<String> {
        let entry = BatchEntry {
            kind: OpKind::Change,
            id: NodeId::new(),
            parent: None,
            fragment: format!("cycle {cycle}"),
        };
        OperationBatch::new(CycleId::new(cycle), vec![entry])
    }

    fn cycles(outbox: &mut Outbox<String>) -> Vec<u64> {
        std::iter::from_fn(|| outbox.dequeue())
            .map(|b| b.cycle().value())
            .collect()
    }

    #[test]
    fn dequeues_in_order() {
        let mut outbox = Outbox::new();
        outbox.enqueue(batch(1));
        outbox.enqueue(batch(2));

        assert_eq!(cycles(&mut outbox), [1, 2]);
        assert_eq!(outbox.total_count(), 2);
        assert!(outbox.is_empty());
    }

    #[test]
    fn ack_through_releases_prefix() {
        let mut outbox = Outbox::new();
        for c in 1..=4 {
            outbox.enqueue(batch(c));
        }
        cycles(&mut outbox);

        assert_eq!(outbox.ack_through(CycleId::new(2)), 2);
        assert_eq!(outbox.total_count(), 2);
        assert_eq!(outbox.nack_all(), 2);
        assert_eq!(cycles(&mut outbox), [3, 4]);

        assert_eq!(outbox.ack_through(CycleId::new(u64::MAX)), 2);
        assert_eq!(outbox.total_count(), 0);
    }

    #[test]
    fn ack_all_releases_everything_in_flight() {
        let mut outbox = Outbox::new();
        outbox.enqueue(batch(1));
        outbox.enqueue(batch(2));
        outbox.dequeue();

        assert_eq!(outbox.ack_all(), 1);
        // queued batches are not in flight and stay
        assert_eq!(outbox.total_count(), 1);
        assert_eq!(outbox.nack_all(), 0);
        assert_eq!(cycles(&mut outbox), [2]);
    }

    #[test]
    fn nack_all_preserves_order() {
        let mut outbox = Outbox::new();
        for c in 1..=3 {
            outbox.enqueue(batch(c));
        }
        outbox.dequeue();
        outbox.dequeue();

        assert_eq!(outbox.nack_all(), 2);
        assert_eq!(cycles(&mut outbox), [1, 2, 3]);
    }

    #[test]
    fn redelivered_batch_is_identical() {
        let mut outbox = Outbox::new();
        outbox.enqueue(batch(7));
        let sent = outbox.dequeue().unwrap();
        outbox.nack_all();
        let resent = outbox.dequeue().unwrap();
        assert_eq!(sent, resent);
    }

    #[test]
    fn unknown_cycles_are_no_ops() {
        let mut outbox: Outbox<String> = Outbox::new();
        assert_eq!(outbox.ack_through(CycleId::new(9)), 0);
        assert_eq!(outbox.ack_all(), 0);
        assert_eq!(outbox.nack_all(), 0);
        assert_eq!(outbox.total_count(), 0);
    }

    #[test]
    fn clear_removes_all() {
        let mut outbox = Outbox::new();
        outbox.enqueue(batch(1));
        outbox.enqueue(batch(2));
        outbox.dequeue();

        outbox.clear();

        assert!(outbox.is_empty());
        assert_eq!(outbox.total_count(), 0);
    }
}
