//! Structured error types for the simulator.
//!
//! All fallible public APIs return `Result<T, SimError>`. Configuration
//! problems are surfaced at scenario setup, never mid-run. Overflow
//! conditions (buffer full, dam closed) are modeled outcomes recorded in
//! statistics, not errors.

use thiserror::Error;

/// The top-level error type for the simulation crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    // ── Configuration errors ──────────────────────────────

    /// A rate, period, horizon or similar quantity must be strictly positive.
    #[error("{what} must be strictly positive, got {value}")]
    NonPositive { what: &'static str, value: f64 },

    /// A station was configured with zero servers.
    #[error("station `{station}`: server count must be at least 1")]
    NoServers { station: String },

    /// A dam gate's open fraction falls outside [0, 1].
    #[error("gate open fraction must be within [0, 1], got {value}")]
    OpenFractionOutOfRange { value: f64 },

    /// A population has no route.
    #[error("population `{population}`: route is empty")]
    EmptyRoute { population: String },

    /// A route references a station index that does not exist.
    #[error("population `{population}`: route references unknown station index {index}")]
    UnknownStation { population: String, index: usize },

    /// A gate references a population class index that does not exist.
    #[error("station `{station}`: gate references unknown population index {index}")]
    UnknownClass { station: String, index: usize },

    /// A uniform distribution with inverted bounds.
    #[error("uniform distribution requires low <= high, got [{low}, {high}]")]
    UniformBounds { low: f64, high: f64 },

    /// A deterministic duration below zero.
    #[error("deterministic duration must be non-negative, got {value}")]
    NegativeDuration { value: f64 },

    // ── Run errors ────────────────────────────────────────

    /// Attempted to step a simulation whose event queue is exhausted.
    #[error("simulation has no pending events")]
    EmptyQueue,
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;
