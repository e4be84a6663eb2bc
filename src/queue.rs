/// Deterministic event queue.
///
/// Uses a `BinaryHeap` with reversed `Ord` on `Event` to act as a
/// min-heap keyed by `(at, event_id)`. Because event IDs are strictly
/// increasing and the heap ordering is total, two runs with the same
/// seed always produce the same dispatch order — events at equal
/// timestamps are served in scheduling order, never arbitrarily.

use std::collections::BinaryHeap;

use crate::event::{Event, EventId, EventIdGen, EventKind};
use crate::time::SimTime;

/// The core deterministic event queue.
///
/// Owns the pending events and the ID generator. All scheduling goes
/// through this struct to ensure monotonic IDs and deterministic
/// ordering.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    /// Min-heap (via reversed Ord on Event).
    heap: BinaryHeap<Event>,

    /// Monotonic event-ID generator.
    id_gen: EventIdGen,
}

impl EventQueue {
    /// Create a new, empty queue.
    pub fn new() -> Self {
        EventQueue {
            heap: BinaryHeap::new(),
            id_gen: EventIdGen::new(),
        }
    }

    /// Schedule a new event at the given virtual time.
    ///
    /// Returns the `EventId` assigned to this event.
    pub fn schedule(&mut self, at: SimTime, kind: EventKind) -> EventId {
        let id = self.id_gen.next_id();
        self.heap.push(Event::new(id, at, kind));
        id
    }

    /// Pop the next event (earliest time, lowest ID).
    ///
    /// Returns `None` when the queue is empty.
    pub fn pop_next(&mut self) -> Option<Event> {
        self.heap.pop()
    }

    /// Peek at the next event without removing it.
    pub fn peek_next(&self) -> Option<&Event> {
        self.heap.peek()
    }

    /// Returns `true` if the event queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns the next event ID that will be assigned.
    pub fn next_event_id(&self) -> EventId {
        self.id_gen.peek()
    }

    /// Drain all events in deterministic order into a `Vec`.
    /// Useful for testing.
    pub fn drain_ordered(&mut self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.heap.len());
        while let Some(e) = self.heap.pop() {
            events.push(e);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ClassId;

    fn arrival(class: usize) -> EventKind {
        EventKind::Arrival {
            population: ClassId::new(class),
        }
    }

    #[test]
    fn test_fifo_at_same_time() {
        let mut q = EventQueue::new();

        q.schedule(SimTime::new(10.0), arrival(0));
        q.schedule(SimTime::new(10.0), arrival(1));
        q.schedule(SimTime::new(10.0), arrival(2));

        let e1 = q.pop_next().unwrap();
        let e2 = q.pop_next().unwrap();
        let e3 = q.pop_next().unwrap();

        // Same time → ordered by ascending event ID (scheduling order).
        assert!(e1.id < e2.id);
        assert!(e2.id < e3.id);
        assert_eq!(e1.kind, arrival(0));
        assert_eq!(e2.kind, arrival(1));
        assert_eq!(e3.kind, arrival(2));
    }

    #[test]
    fn test_time_ordering() {
        let mut q = EventQueue::new();

        q.schedule(SimTime::new(30.0), arrival(0));
        q.schedule(SimTime::new(10.0), arrival(0));
        q.schedule(SimTime::new(20.0), arrival(0));

        let e1 = q.pop_next().unwrap();
        let e2 = q.pop_next().unwrap();
        let e3 = q.pop_next().unwrap();

        assert_eq!(e1.at, SimTime::new(10.0));
        assert_eq!(e2.at, SimTime::new(20.0));
        assert_eq!(e3.at, SimTime::new(30.0));
    }

    #[test]
    fn test_mixed_ordering() {
        let mut q = EventQueue::new();

        // Interleave times to stress the heap.
        q.schedule(SimTime::new(50.0), arrival(0));
        q.schedule(SimTime::new(10.0), arrival(0));
        q.schedule(SimTime::new(10.0), arrival(0));
        q.schedule(SimTime::new(30.0), arrival(0));
        q.schedule(SimTime::new(10.0), arrival(0));

        let events = q.drain_ordered();
        // Must be sorted by (time, id).
        for window in events.windows(2) {
            let (a, b) = (&window[0], &window[1]);
            assert!(
                (a.at, a.id) <= (b.at, b.id),
                "Events out of order: {:?} vs {:?}",
                a,
                b
            );
        }
    }

    #[test]
    fn test_empty_queue() {
        let mut q = EventQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.len(), 0);
        assert!(q.pop_next().is_none());
    }

    #[test]
    fn test_determinism_across_runs() {
        // Two independent queues with the same insertion order must
        // produce the same output order.
        fn build_schedule() -> Vec<Event> {
            let mut q = EventQueue::new();
            q.schedule(SimTime::new(5.0), arrival(0));
            q.schedule(SimTime::new(3.0), arrival(1));
            q.schedule(SimTime::new(5.0), arrival(2));
            q.schedule(SimTime::new(1.0), arrival(3));
            q.schedule(SimTime::new(3.0), arrival(4));
            q.drain_ordered()
        }

        let run1 = build_schedule();
        let run2 = build_schedule();

        assert_eq!(run1.len(), run2.len());
        for (a, b) in run1.iter().zip(run2.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.at, b.at);
            assert_eq!(a.kind, b.kind);
        }
    }
}
