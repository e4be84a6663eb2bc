//! Run statistics: per-population and per-station aggregates.
//!
//! The collector is owned exclusively by the engine, written append-only
//! during the run, and read through the `summary()` snapshot after the
//! run completes — station and engine logic never consult it mid-run.
//!
//! Queue lengths are time-weighted: occupancy is sampled at every state
//! change and each level is weighted by the interval it persisted.
//! The reported "queue length" counts waiting plus in-service entities.

use crate::entity::{ClassId, RejectCause};
use crate::station::StationId;
use crate::time::SimTime;

// ── Per-class accumulation ────────────────────────────────────────────

#[derive(Debug, Clone)]
struct ClassStats {
    name: String,
    arrivals: u64,
    served: u64,
    rejected_buffer_full: u64,
    rejected_gate_closed: u64,
    backup_diverted: u64,
    backed_up_terminal: u64,
    sojourn_count: u64,
    sojourn_sum: f64,
    sojourn_sq: f64,
}

impl ClassStats {
    fn new(name: String) -> Self {
        ClassStats {
            name,
            arrivals: 0,
            served: 0,
            rejected_buffer_full: 0,
            rejected_gate_closed: 0,
            backup_diverted: 0,
            backed_up_terminal: 0,
            sojourn_count: 0,
            sojourn_sum: 0.0,
            sojourn_sq: 0.0,
        }
    }
}

// ── Per-station accumulation ──────────────────────────────────────────

#[derive(Debug, Clone)]
struct StationStats {
    name: String,
    servers: usize,
    last_change: SimTime,
    level_queue: f64,
    level_busy: f64,
    area_queue: f64,
    area_busy: f64,
}

impl StationStats {
    fn new(name: String, servers: usize) -> Self {
        StationStats {
            name,
            servers,
            last_change: SimTime::ZERO,
            level_queue: 0.0,
            level_busy: 0.0,
            area_queue: 0.0,
            area_busy: 0.0,
        }
    }

    fn advance_to(&mut self, now: SimTime) {
        let dt = now.duration_since(self.last_change);
        debug_assert!(dt >= 0.0);
        self.area_queue += self.level_queue * dt;
        self.area_busy += self.level_busy * dt;
        self.last_change = now;
    }
}

// ── Collector ─────────────────────────────────────────────────────────

/// Append-only statistics accumulator, one per engine instance.
#[derive(Debug, Clone)]
pub struct StatsCollector {
    classes: Vec<ClassStats>,
    stations: Vec<StationStats>,
    end: SimTime,
}

impl StatsCollector {
    /// Create a collector for the given class and station names.
    pub fn new(class_names: Vec<String>, stations: Vec<(String, usize)>) -> Self {
        StatsCollector {
            classes: class_names.into_iter().map(ClassStats::new).collect(),
            stations: stations
                .into_iter()
                .map(|(name, servers)| StationStats::new(name, servers))
                .collect(),
            end: SimTime::ZERO,
        }
    }

    // ── Recording ─────────────────────────────────────────────────

    pub fn record_arrival(&mut self, class: ClassId) {
        self.classes[class.index()].arrivals += 1;
    }

    pub fn record_served(&mut self, class: ClassId, sojourn: f64) {
        debug_assert!(sojourn >= 0.0);
        let c = &mut self.classes[class.index()];
        c.served += 1;
        c.sojourn_count += 1;
        c.sojourn_sum += sojourn;
        c.sojourn_sq += sojourn * sojourn;
    }

    pub fn record_rejected(&mut self, class: ClassId, cause: RejectCause) {
        let c = &mut self.classes[class.index()];
        match cause {
            RejectCause::BufferFull => c.rejected_buffer_full += 1,
            RejectCause::GateClosed => c.rejected_gate_closed += 1,
        }
    }

    pub fn record_backup_diverted(&mut self, class: ClassId) {
        self.classes[class.index()].backup_diverted += 1;
    }

    pub fn record_terminal_backed_up(&mut self, class: ClassId) {
        self.classes[class.index()].backed_up_terminal += 1;
    }

    /// Sample a station's occupancy after a state change at `now`.
    pub fn observe_station(
        &mut self,
        station: StationId,
        now: SimTime,
        occupancy: usize,
        busy: usize,
    ) {
        let s = &mut self.stations[station.index()];
        s.advance_to(now);
        s.level_queue = occupancy as f64;
        s.level_busy = busy as f64;
    }

    /// Close all time-weighted integrals at the end of the run.
    pub fn finalize(&mut self, end: SimTime) {
        self.end = end;
        for s in &mut self.stations {
            s.advance_to(end);
        }
    }

    // ── Summaries ─────────────────────────────────────────────────

    /// Snapshot the accumulated statistics. Call after `finalize`.
    pub fn summary(&self) -> SimulationSummary {
        let duration = self.end.value();
        let classes: Vec<ClassSummary> = self
            .classes
            .iter()
            .map(|c| {
                let (mean, variance) = mean_var(c.sojourn_count, c.sojourn_sum, c.sojourn_sq);
                ClassSummary {
                    name: c.name.clone(),
                    arrivals: c.arrivals,
                    served: c.served,
                    rejected_buffer_full: c.rejected_buffer_full,
                    rejected_gate_closed: c.rejected_gate_closed,
                    backup_diverted: c.backup_diverted,
                    backed_up: c.backed_up_terminal,
                    mean_sojourn: mean,
                    var_sojourn: variance,
                }
            })
            .collect();

        let stations: Vec<StationSummary> = self
            .stations
            .iter()
            .map(|s| StationSummary {
                name: s.name.clone(),
                avg_queue_length: if duration > 0.0 {
                    s.area_queue / duration
                } else {
                    0.0
                },
                utilization: if duration > 0.0 {
                    s.area_busy / (duration * s.servers as f64)
                } else {
                    0.0
                },
            })
            .collect();

        let total_count: u64 = self.classes.iter().map(|c| c.sojourn_count).sum();
        let total_sum: f64 = self.classes.iter().map(|c| c.sojourn_sum).sum();
        let total_sq: f64 = self.classes.iter().map(|c| c.sojourn_sq).sum();
        let (mean_sojourn, var_sojourn) = mean_var(total_count, total_sum, total_sq);

        SimulationSummary {
            duration,
            total_arrivals: self.classes.iter().map(|c| c.arrivals).sum(),
            total_served: self.classes.iter().map(|c| c.served).sum(),
            total_rejected_buffer_full: self
                .classes
                .iter()
                .map(|c| c.rejected_buffer_full)
                .sum(),
            total_rejected_gate_closed: self
                .classes
                .iter()
                .map(|c| c.rejected_gate_closed)
                .sum(),
            mean_sojourn,
            var_sojourn,
            classes,
            stations,
        }
    }
}

fn mean_var(count: u64, sum: f64, sq: f64) -> (Option<f64>, Option<f64>) {
    if count == 0 {
        return (None, None);
    }
    let n = count as f64;
    let mean = sum / n;
    // Population variance from the running sum of squares.
    let variance = (sq / n - mean * mean).max(0.0);
    (Some(mean), Some(variance))
}

// ── Summary types ─────────────────────────────────────────────────────

/// Read-only per-class results, exposed after the run completes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassSummary {
    pub name: String,
    pub arrivals: u64,
    pub served: u64,
    /// Rejections caused by a full waiting buffer.
    pub rejected_buffer_full: u64,
    /// Rejections caused by a closed dam gate.
    pub rejected_gate_closed: u64,
    /// Diversions into a backup sink (the entity may still be served).
    pub backup_diverted: u64,
    /// Entities still held by a backup sink when the run ended.
    pub backed_up: u64,
    pub mean_sojourn: Option<f64>,
    pub var_sojourn: Option<f64>,
}

/// Read-only per-station results.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StationSummary {
    pub name: String,
    /// Time-weighted average of waiting + in-service entities.
    pub avg_queue_length: f64,
    /// Busy server-time divided by `K × elapsed`.
    pub utilization: f64,
}

/// Full run summary, the collaborator-facing output of a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationSummary {
    pub duration: f64,
    pub total_arrivals: u64,
    pub total_served: u64,
    pub total_rejected_buffer_full: u64,
    pub total_rejected_gate_closed: u64,
    pub mean_sojourn: Option<f64>,
    pub var_sojourn: Option<f64>,
    pub classes: Vec<ClassSummary>,
    pub stations: Vec<StationSummary>,
}

impl SimulationSummary {
    /// Per-class lookup by scenario order.
    pub fn class(&self, class: ClassId) -> &ClassSummary {
        &self.classes[class.index()]
    }

    /// Per-station lookup by scenario order.
    pub fn station(&self, station: StationId) -> &StationSummary {
        &self.stations[station.index()]
    }
}
