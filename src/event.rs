/// Event records for the deterministic simulation core.
///
/// Every effect in the simulation is modeled as an `Event`. Events are
/// immutable records placed on the event queue and dispatched in
/// deterministic order.

use crate::entity::{ClassId, EntityId};
use crate::station::StationId;
use crate::time::SimTime;
use std::cmp::Ordering;

// ── Event ID ──────────────────────────────────────────────────────────

/// A globally unique, strictly-increasing event identifier.
///
/// The monotonic nature of `EventId` breaks ties in the queue: two events
/// scheduled at the same `SimTime` are ordered by their `EventId`, which
/// corresponds to scheduling order (FIFO tie-break).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw u64 into an `EventId`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event ID Generator ───────────────────────────────────────────────

/// Deterministic, strictly-increasing event-ID generator.
///
/// Each `EventQueue` owns exactly one of these. The simulation is
/// single-threaded with no shared mutable state, so the counter is
/// trivially deterministic.
#[derive(Debug, Clone, Default)]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    /// Create a generator starting at 0.
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    /// Mint the next event ID.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }

    /// Peek at the next ID without consuming it.
    pub fn peek(&self) -> EventId {
        EventId(self.next)
    }
}

// ── Service token ─────────────────────────────────────────────────────

/// Generation token tying a scheduled service event to a live in-service
/// entry at a station.
///
/// Preemption invalidates the entry rather than deleting the already
/// scheduled `ServiceStart`/`ServiceEnd` from the queue; the engine
/// silently discards popped events whose token no longer matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceToken(u64);

impl ServiceToken {
    /// Wrap a raw u64 into a `ServiceToken`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        ServiceToken(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

// ── Event kind ────────────────────────────────────────────────────────

/// The payload of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// An external arrival for a population class. The engine
    /// materializes an entity and schedules the class's next arrival.
    Arrival { population: ClassId },

    /// A server was seized; draw the service requirement and schedule
    /// the matching `ServiceEnd`.
    ServiceStart {
        entity: EntityId,
        station: StationId,
        token: ServiceToken,
    },

    /// Service completion; route the entity onward or record it served.
    ServiceEnd {
        entity: EntityId,
        station: StationId,
        token: ServiceToken,
    },

    /// A dam gate phase boundary.
    GateToggle { station: StationId, open: bool },

    /// Deferred redelivery attempt of a backed-up entity.
    BackupRetry {
        entity: EntityId,
        station: StationId,
    },
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Arrival { population } => write!(f, "Arrival({})", population),
            EventKind::ServiceStart {
                entity, station, ..
            } => write!(f, "Start({} @ {})", entity, station),
            EventKind::ServiceEnd {
                entity, station, ..
            } => write!(f, "End({} @ {})", entity, station),
            EventKind::GateToggle { station, open } => {
                write!(f, "Gate({}, {})", station, if *open { "open" } else { "closed" })
            }
            EventKind::BackupRetry { entity, station } => {
                write!(f, "Retry({} @ {})", entity, station)
            }
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A single simulation event.
///
/// Events are the atomic unit of execution. The queue orders them by
/// `(at, id)` to guarantee deterministic processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// Unique identifier (monotonically increasing).
    pub id: EventId,

    /// The virtual time at which this event fires.
    pub at: SimTime,

    /// The event payload.
    pub kind: EventKind,
}

impl Event {
    /// Convenience constructor.
    pub fn new(id: EventId, at: SimTime, kind: EventKind) -> Self {
        Event { id, at, kind }
    }
}

/// Ordering: smallest `(at, id)` first.
///
/// Rust's `BinaryHeap` is a *max*-heap, so the natural ordering is
/// reversed here to turn it into a min-heap.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
