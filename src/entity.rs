//! Entities and population classes.
//!
//! An entity models one student submission flowing through the pipeline.
//! It is created when its arrival event fires, mutated exclusively by the
//! engine as it advances along its route, and archived into the stats
//! collector once it reaches a terminal status.

use crate::station::StationId;
use crate::time::SimTime;

// ── Identifiers ───────────────────────────────────────────────────────

/// A unique, strictly-increasing entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(u64);

impl EntityId {
    /// Wrap a raw u64 into an `EntityId`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        EntityId(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Index into the engine's entity table.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "J#{}", self.0)
    }
}

/// Index of a population class (e.g. ING, PREPA) within a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassId(usize);

impl ClassId {
    /// Wrap a raw index into a `ClassId`.
    #[inline]
    pub fn new(raw: usize) -> Self {
        ClassId(raw)
    }

    /// Return the raw index.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P#{}", self.0)
    }
}

// ── Status ────────────────────────────────────────────────────────────

/// Why an entity was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum RejectCause {
    /// The target station's waiting buffer was full.
    BufferFull,
    /// A dam gate was closed for the entity's class.
    GateClosed,
}

/// Lifecycle status of an entity.
///
/// `Rejected` and `Served` are terminal. `BackedUp` is terminal only if
/// the run ends before the backup sink redelivers the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityStatus {
    /// Waiting or in service somewhere along the route.
    InTransit,
    /// Completed service at the last station of its route.
    Served,
    /// Turned away, with the cause recorded.
    Rejected(RejectCause),
    /// Held in a backup sink awaiting redelivery.
    BackedUp,
}

// ── Entity ────────────────────────────────────────────────────────────

/// One job flowing through the station network.
///
/// Service requirements are drawn once, at arrival, from the
/// per-(station, class) streams — one draw per route hop. A preempted
/// entity carries its unfinished remainder in `remaining`, which takes
/// precedence over the hop draw when service next starts
/// (work-conserving preemption).
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub class: ClassId,
    /// Priority level; lower value = higher priority.
    pub priority: u8,
    pub arrival: SimTime,
    /// Ordered station ids this entity visits.
    pub route: Vec<StationId>,
    /// Index of the current hop within `route`.
    pub hop: usize,
    /// Service requirement per hop, drawn at arrival.
    pub service_draws: Vec<f64>,
    /// Unfinished service remainder after a preemption.
    pub remaining: Option<f64>,
    pub status: EntityStatus,
}

impl Entity {
    /// Create a fresh entity at its arrival instant.
    pub fn new(
        id: EntityId,
        class: ClassId,
        priority: u8,
        arrival: SimTime,
        route: Vec<StationId>,
        service_draws: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(route.len(), service_draws.len());
        Entity {
            id,
            class,
            priority,
            arrival,
            route,
            hop: 0,
            service_draws,
            remaining: None,
            status: EntityStatus::InTransit,
        }
    }

    /// The station the entity currently targets.
    #[inline]
    pub fn current_station(&self) -> StationId {
        self.route[self.hop]
    }

    /// The next station on the route, if any.
    #[inline]
    pub fn next_station(&self) -> Option<StationId> {
        self.route.get(self.hop + 1).copied()
    }

    /// Service requirement for the current hop, honoring a preempted
    /// remainder if one is pending.
    #[inline]
    pub fn take_service_requirement(&mut self) -> f64 {
        self.remaining.take().unwrap_or(self.service_draws[self.hop])
    }

    /// Whether the entity has reached a final status for a drained run.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self.status, EntityStatus::InTransit)
    }
}
