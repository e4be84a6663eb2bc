/// Virtual time for the deterministic simulation.
///
/// Represents a continuous logical timestamp with no dependency on
/// `std::time`. Time advances only when the engine pops events — never
/// from wall-clock observation. Interarrival and service durations are
/// real-valued, so the clock wraps an `f64` with a total ordering.

use std::cmp::Ordering;

/// A point in simulation time, in abstract time units.
///
/// Ordering uses `f64::total_cmp`, which makes `SimTime` usable as a
/// priority-queue key. Scenario code never produces NaN timestamps;
/// `total_cmp` keeps the ordering well-defined regardless.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SimTime(f64);

impl SimTime {
    /// The zero-point of simulation time.
    pub const ZERO: SimTime = SimTime(0.0);

    /// Create a new `SimTime` from a raw value.
    #[inline]
    pub fn new(value: f64) -> Self {
        SimTime(value)
    }

    /// Return the raw value.
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Compute the absolute time that is `delay` units after `self`.
    #[inline]
    pub fn plus(self, delay: f64) -> SimTime {
        SimTime(self.0 + delay)
    }

    /// Returns `true` if `self` is strictly before `other`.
    #[inline]
    pub fn is_before(self, other: SimTime) -> bool {
        self < other
    }

    /// Returns the duration between two points in time.
    ///
    /// Negative when `earlier` is in fact later — callers that care
    /// assert on the sign.
    #[inline]
    pub fn duration_since(self, earlier: SimTime) -> f64 {
        self.0 - earlier.0
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={:.3}", self.0)
    }
}
