//! Scenario configuration: the declarative description of one run.
//!
//! A scenario names its populations and stations by index — routes refer
//! to station indices, gates refer to population indices. Everything is
//! checked once by `ScenarioConfig::validate`; the engine assumes a
//! validated configuration and never re-checks mid-run.

use std::collections::BTreeMap;

use crate::backup::BackupPolicy;
use crate::error::{SimError, SimResult};
use crate::random::DurationDistribution;
use crate::station::Discipline;

// ── Population ────────────────────────────────────────────────────────

/// One arrival class: an interarrival process, a priority level, and a
/// fixed route through the stations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PopulationConfig {
    pub name: String,
    pub interarrival: DurationDistribution,
    /// Lower value = higher priority. Only meaningful at priority
    /// stations.
    pub priority: u8,
    /// Station indices visited in order. Must be non-empty.
    pub route: Vec<usize>,
}

impl PopulationConfig {
    pub fn new(
        name: impl Into<String>,
        interarrival: DurationDistribution,
        route: Vec<usize>,
    ) -> Self {
        PopulationConfig {
            name: name.into(),
            interarrival,
            priority: 0,
            route,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }
}

// ── Station attachments ───────────────────────────────────────────────

/// Dam gate parameters for one station.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GateConfig {
    pub period: f64,
    /// Fraction of each period the gate is open, in [0, 1].
    pub open_fraction: f64,
    /// Population indices the gate applies to.
    pub classes: Vec<usize>,
}

/// Backup sink parameters for one station.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct BackupConfig {
    pub policy: BackupPolicy,
}

// ── Station ───────────────────────────────────────────────────────────

/// One service station: servers, buffer, discipline, service times, and
/// optional gate/backup attachments.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StationConfig {
    pub name: String,
    pub servers: usize,
    /// Waiting-room size; `None` = unbounded, `Some(0)` = no waiting.
    pub buffer: Option<usize>,
    pub discipline: Discipline,
    /// Default service duration for every class.
    pub service: DurationDistribution,
    /// Per-class overrides of the default, keyed by population index.
    pub class_service: BTreeMap<usize, DurationDistribution>,
    pub gate: Option<GateConfig>,
    pub backup: Option<BackupConfig>,
}

impl StationConfig {
    pub fn new(
        name: impl Into<String>,
        servers: usize,
        service: DurationDistribution,
    ) -> Self {
        StationConfig {
            name: name.into(),
            servers,
            buffer: None,
            discipline: Discipline::Fifo,
            service,
            class_service: BTreeMap::new(),
            gate: None,
            backup: None,
        }
    }

    pub fn with_buffer(mut self, limit: usize) -> Self {
        self.buffer = Some(limit);
        self
    }

    pub fn with_discipline(mut self, discipline: Discipline) -> Self {
        self.discipline = discipline;
        self
    }

    /// Override the service duration for one population class.
    pub fn with_class_service(
        mut self,
        class: usize,
        service: DurationDistribution,
    ) -> Self {
        self.class_service.insert(class, service);
        self
    }

    pub fn with_gate(
        mut self,
        period: f64,
        open_fraction: f64,
        classes: Vec<usize>,
    ) -> Self {
        self.gate = Some(GateConfig {
            period,
            open_fraction,
            classes,
        });
        self
    }

    pub fn with_backup(mut self, policy: BackupPolicy) -> Self {
        self.backup = Some(BackupConfig { policy });
        self
    }

    /// The service distribution used for `class` at this station.
    pub fn service_for(&self, class: usize) -> DurationDistribution {
        self.class_service
            .get(&class)
            .copied()
            .unwrap_or(self.service)
    }
}

// ── Scenario ──────────────────────────────────────────────────────────

/// The complete, declarative description of one run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioConfig {
    /// Master seed; every random stream is carved out of it.
    pub seed: u64,
    /// Arrival cutoff: no external arrival is generated past this time.
    /// Entities already admitted drain to completion afterwards.
    pub horizon: f64,
    /// Safety valve for runaway scenarios; `None` = unlimited.
    pub max_events: Option<u64>,
    /// Record every dispatched event for replay verification.
    pub trace: bool,
    pub populations: Vec<PopulationConfig>,
    pub stations: Vec<StationConfig>,
}

impl ScenarioConfig {
    /// Check every cross-reference and parameter once, up front.
    pub fn validate(&self) -> SimResult<()> {
        if self.horizon <= 0.0 || !self.horizon.is_finite() {
            return Err(SimError::NonPositive {
                what: "horizon",
                value: self.horizon,
            });
        }

        for station in &self.stations {
            if station.servers == 0 {
                return Err(SimError::NoServers {
                    station: station.name.clone(),
                });
            }
            station.service.validate("service duration")?;
            for (&class, dist) in &station.class_service {
                if class >= self.populations.len() {
                    return Err(SimError::UnknownClass {
                        station: station.name.clone(),
                        index: class,
                    });
                }
                dist.validate("service duration")?;
            }
            if let Some(gate) = &station.gate {
                if gate.period <= 0.0 || !gate.period.is_finite() {
                    return Err(SimError::NonPositive {
                        what: "gate period",
                        value: gate.period,
                    });
                }
                if !(0.0..=1.0).contains(&gate.open_fraction) {
                    return Err(SimError::OpenFractionOutOfRange {
                        value: gate.open_fraction,
                    });
                }
                for &class in &gate.classes {
                    if class >= self.populations.len() {
                        return Err(SimError::UnknownClass {
                            station: station.name.clone(),
                            index: class,
                        });
                    }
                }
            }
            if let Some(backup) = &station.backup {
                if let BackupPolicy::FixedDelay(delay) = backup.policy {
                    if delay <= 0.0 || !delay.is_finite() {
                        return Err(SimError::NonPositive {
                            what: "backup retry delay",
                            value: delay,
                        });
                    }
                }
            }
        }

        for population in &self.populations {
            population.interarrival.validate("interarrival duration")?;
            if population.route.is_empty() {
                return Err(SimError::EmptyRoute {
                    population: population.name.clone(),
                });
            }
            for &index in &population.route {
                if index >= self.stations.len() {
                    return Err(SimError::UnknownStation {
                        population: population.name.clone(),
                        index,
                    });
                }
            }
        }

        Ok(())
    }
}

// ── Builder ───────────────────────────────────────────────────────────

/// Fluent builder for a validated `ScenarioConfig`.
///
/// # Example
/// ```rust
/// use moulinette::config::{PopulationConfig, ScenarioBuilder, StationConfig};
/// use moulinette::random::DurationDistribution;
///
/// let scenario = ScenarioBuilder::new(42, 10_000.0)
///     .station(StationConfig::new(
///         "execution",
///         2,
///         DurationDistribution::Exponential { rate: 1.0 },
///     ))
///     .population(PopulationConfig::new(
///         "ING",
///         DurationDistribution::Exponential { rate: 0.8 },
///         vec![0],
///     ))
///     .build()
///     .unwrap();
/// assert_eq!(scenario.stations.len(), 1);
/// ```
pub struct ScenarioBuilder {
    config: ScenarioConfig,
}

impl ScenarioBuilder {
    /// Start a scenario with a master seed and an arrival horizon.
    pub fn new(seed: u64, horizon: f64) -> Self {
        ScenarioBuilder {
            config: ScenarioConfig {
                seed,
                horizon,
                max_events: None,
                trace: false,
                populations: Vec::new(),
                stations: Vec::new(),
            },
        }
    }

    /// Cap the total number of dispatched events.
    pub fn max_events(mut self, limit: u64) -> Self {
        self.config.max_events = Some(limit);
        self
    }

    /// Enable dispatch tracing for replay verification.
    pub fn with_trace(mut self) -> Self {
        self.config.trace = true;
        self
    }

    /// Append a station; its index is its position in insertion order.
    pub fn station(mut self, station: StationConfig) -> Self {
        self.config.stations.push(station);
        self
    }

    /// Append a population; its index is its position in insertion order.
    pub fn population(mut self, population: PopulationConfig) -> Self {
        self.config.populations.push(population);
        self
    }

    /// Validate and return the finished configuration.
    pub fn build(self) -> SimResult<ScenarioConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
