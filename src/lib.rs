//! # Moulinette — Deterministic Grading-Pipeline Simulator
//!
//! A discrete-event simulator for multi-stage queueing networks modeling
//! an automatic-grading pipeline: finite-capacity multi-server stations,
//! FIFO and priority disciplines (with optional preemption), periodic
//! dam gates, and backup sinks that absorb buffer overflow. No async,
//! no threads, no wall-clock time — the whole run is a pure function of
//! the scenario and its seed.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────┐
//! │          Engine           │ ← dispatch loop, single mutator
//! │  ┌─────────────────────┐  │
//! │  │     EventQueue      │  │ ← deterministic min-heap
//! │  └─────────────────────┘  │
//! │  ┌─────────────────────┐  │
//! │  │       Network       │  │ ← stations, routing
//! │  │  ┌───────┐ ┌──────┐ │  │
//! │  │  │ Gates │ │Backup│ │  │ ← admission control, overflow
//! │  │  └───────┘ └──────┘ │  │
//! │  └─────────────────────┘  │
//! │  ┌─────────────────────┐  │
//! │  │   RandomProcesses   │  │ ← seeded per-(station, class)
//! │  └─────────────────────┘  │
//! │  ┌─────────────────────┐  │
//! │  │   StatsCollector    │  │ ← time-weighted aggregates
//! │  └─────────────────────┘  │
//! └───────────────────────────┘
//! ```

pub mod backup;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod event;
pub mod gate;
pub mod network;
pub mod queue;
pub mod random;
pub mod station;
pub mod stats;
pub mod time;
pub mod trace;

// Re-exports for convenience.
pub use backup::{BackupPolicy, BackupSink};
pub use config::{
    BackupConfig, GateConfig, PopulationConfig, ScenarioBuilder, ScenarioConfig,
    StationConfig,
};
pub use engine::Engine;
pub use entity::{ClassId, Entity, EntityId, EntityStatus, RejectCause};
pub use error::{SimError, SimResult};
pub use event::{Event, EventId, EventIdGen, EventKind, ServiceToken};
pub use gate::DamGate;
pub use network::Network;
pub use queue::EventQueue;
pub use random::{DurationDistribution, RandomProcess};
pub use station::{AdmitOutcome, Discipline, Station, StationId};
pub use stats::{ClassSummary, SimulationSummary, StationSummary, StatsCollector};
pub use time::SimTime;
pub use trace::EventTrace;
