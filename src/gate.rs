//! Dam gates: periodic hard admission control.
//!
//! A gate is attached to one station's admission path and cycles with a
//! fixed period: open for `open_fraction` of each period, closed for the
//! rest. While closed, every admission attempt at that station by a
//! gated population class is rejected outright — never queued. This is
//! distinct from buffer-full rejection and is counted separately.

use crate::entity::ClassId;

/// Periodic admission gate for a set of population classes.
///
/// The engine drives phase changes with chained `GateToggle` events;
/// the gate itself only holds the schedule parameters and the current
/// phase. Each period starts with the open phase.
#[derive(Debug, Clone)]
pub struct DamGate {
    period: f64,
    open_fraction: f64,
    classes: Vec<ClassId>,
    open: bool,
}

impl DamGate {
    /// Create a gate. `open_fraction` 0 never opens; 1 never closes.
    pub fn new(period: f64, open_fraction: f64, classes: Vec<ClassId>) -> Self {
        debug_assert!(period > 0.0);
        debug_assert!((0.0..=1.0).contains(&open_fraction));
        DamGate {
            period,
            open_fraction,
            classes,
            open: open_fraction > 0.0,
        }
    }

    /// Whether the gate currently lets gated classes through.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Whether this gate applies to `class` at all.
    pub fn gates(&self, class: ClassId) -> bool {
        self.classes.contains(&class)
    }

    /// Hard admission check: `true` when `class` must be rejected now.
    pub fn blocks(&self, class: ClassId) -> bool {
        !self.open && self.gates(class)
    }

    /// Apply a phase change.
    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Length of the open phase within one period.
    pub fn open_duration(&self) -> f64 {
        self.period * self.open_fraction
    }

    /// Length of the closed phase within one period.
    pub fn closed_duration(&self) -> f64 {
        self.period * (1.0 - self.open_fraction)
    }

    /// Whether the gate ever changes phase. A gate that is always open
    /// or always closed needs no toggle events.
    pub fn toggles(&self) -> bool {
        self.open_fraction > 0.0 && self.open_fraction < 1.0
    }

    /// Time until the next phase boundary, measured from the start of
    /// the current phase.
    pub fn current_phase_duration(&self) -> f64 {
        if self.open {
            self.open_duration()
        } else {
            self.closed_duration()
        }
    }
}
