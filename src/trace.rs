//! Dispatch tracing: an append-only record of every event the engine
//! processes, with a deterministic hash for replay verification.
//!
//! Tracing is opt-in per scenario. Two runs of the same scenario with
//! the same seed must produce identical traces; `trace_hash` condenses
//! the whole trace into one u64 so tests can compare runs cheaply.

use crate::event::{Event, EventKind};

// ── Hash utility ──────────────────────────────────────────────────────

/// Combine two u64 hashes deterministically.
pub fn hash_combine(a: u64, b: u64) -> u64 {
    let mut h = a;
    h = h.wrapping_mul(0x517cc1b727220a95);
    h = h.wrapping_add(b);
    h ^= h >> 32;
    h
}

/// Hash a byte slice deterministically (FNV-1a variant).
pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for &b in data {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

// ── Event trace ───────────────────────────────────────────────────────

/// Append-only log of dispatched events.
#[derive(Debug, Clone, Default)]
pub struct EventTrace {
    events: Vec<Event>,
}

impl EventTrace {
    /// Create an empty trace.
    pub fn new() -> Self {
        EventTrace { events: Vec::new() }
    }

    /// Record a dispatched event.
    pub fn record(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Access the recorded events in dispatch order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the trace is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Compute a deterministic hash of the entire trace.
    pub fn trace_hash(&self) -> u64 {
        let mut h: u64 = 0;
        for event in &self.events {
            h = hash_combine(h, event.id.raw());
            h = hash_combine(h, event.at.value().to_bits());
            h = hash_combine(h, kind_hash(&event.kind));
        }
        h
    }
}

/// Compare two traces for identical event ordering and payloads.
pub fn traces_match(a: &EventTrace, b: &EventTrace) -> bool {
    if a.events.len() != b.events.len() {
        return false;
    }
    a.events
        .iter()
        .zip(b.events.iter())
        .all(|(ea, eb)| ea.id == eb.id && ea.at == eb.at && ea.kind == eb.kind)
}

fn kind_hash(kind: &EventKind) -> u64 {
    match kind {
        EventKind::Arrival { population } => hash_combine(1, population.index() as u64),
        EventKind::ServiceStart {
            entity,
            station,
            token,
        } => {
            let mut h = hash_combine(2, entity.raw());
            h = hash_combine(h, station.index() as u64);
            h = hash_combine(h, token.raw());
            h
        }
        EventKind::ServiceEnd {
            entity,
            station,
            token,
        } => {
            let mut h = hash_combine(3, entity.raw());
            h = hash_combine(h, station.index() as u64);
            h = hash_combine(h, token.raw());
            h
        }
        EventKind::GateToggle { station, open } => {
            hash_combine(4, hash_combine(station.index() as u64, *open as u64))
        }
        EventKind::BackupRetry { entity, station } => {
            hash_combine(5, hash_combine(entity.raw(), station.index() as u64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ClassId, EntityId};
    use crate::event::{EventId, ServiceToken};
    use crate::station::StationId;
    use crate::time::SimTime;

    fn sample_trace() -> EventTrace {
        let mut t = EventTrace::new();
        t.record(Event::new(
            EventId::new(0),
            SimTime::ZERO,
            EventKind::Arrival {
                population: ClassId::new(0),
            },
        ));
        t.record(Event::new(
            EventId::new(1),
            SimTime::new(1.5),
            EventKind::ServiceStart {
                entity: EntityId::new(0),
                station: StationId::new(0),
                token: ServiceToken::new(0),
            },
        ));
        t.record(Event::new(
            EventId::new(2),
            SimTime::new(3.0),
            EventKind::ServiceEnd {
                entity: EntityId::new(0),
                station: StationId::new(0),
                token: ServiceToken::new(0),
            },
        ));
        t
    }

    #[test]
    fn test_hash_determinism() {
        let h1 = hash_combine(42, 99);
        let h2 = hash_combine(42, 99);
        assert_eq!(h1, h2);

        // Different inputs → different hashes.
        let h3 = hash_combine(42, 100);
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_identical_traces_hash_equal() {
        let a = sample_trace();
        let b = sample_trace();
        assert_eq!(a.trace_hash(), b.trace_hash());
        assert!(traces_match(&a, &b));
    }

    #[test]
    fn test_diverging_trace_detected() {
        let a = sample_trace();
        let mut b = sample_trace();
        b.record(Event::new(
            EventId::new(3),
            SimTime::new(4.0),
            EventKind::GateToggle {
                station: StationId::new(0),
                open: false,
            },
        ));
        assert_ne!(a.trace_hash(), b.trace_hash());
        assert!(!traces_match(&a, &b));
    }

    #[test]
    fn test_kind_hash_distinguishes_variants() {
        // Same ids, different kinds.
        let start = EventKind::ServiceStart {
            entity: EntityId::new(7),
            station: StationId::new(1),
            token: ServiceToken::new(3),
        };
        let end = EventKind::ServiceEnd {
            entity: EntityId::new(7),
            station: StationId::new(1),
            token: ServiceToken::new(3),
        };
        assert_ne!(kind_hash(&start), kind_hash(&end));
    }
}
