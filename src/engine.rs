//! The simulation engine: the single owner and mutator of all run state.
//!
//! The engine pops events off the deterministic queue one at a time and
//! dispatches them to handlers. Every state change — admissions,
//! preemptions, promotions, gate phases, backup redeliveries — happens
//! inside a handler, so two runs with the same scenario and seed replay
//! the exact same trajectory.
//!
//! The horizon is an arrival cutoff, not a hard stop: no external
//! arrival is generated past it, and the run then drains until every
//! admitted entity reaches a terminal status. Gate toggle chains also
//! stop at the horizon, freezing each gate in its current phase for the
//! drain.
//!
//! Preemption bookkeeping uses generation tokens rather than queue
//! surgery: suspending a job invalidates its in-service entry, and the
//! already-scheduled `ServiceStart`/`ServiceEnd` events are discarded
//! silently when popped with a stale token.

use tracing::{debug, info, trace, warn};

use crate::backup::{BackupSink, Diverted};
use crate::config::ScenarioConfig;
use crate::entity::{ClassId, Entity, EntityId, EntityStatus, RejectCause};
use crate::error::{SimError, SimResult};
use crate::event::{EventKind, ServiceToken};
use crate::gate::DamGate;
use crate::network::Network;
use crate::queue::EventQueue;
use crate::random::RandomProcess;
use crate::station::{AdmitOutcome, Station, StationId};
use crate::stats::{SimulationSummary, StatsCollector};
use crate::time::SimTime;
use crate::trace::EventTrace;

/// Discrete-event engine for one scenario.
pub struct Engine {
    config: ScenarioConfig,
    queue: EventQueue,
    clock: SimTime,
    network: Network,
    /// Per-station dam gate, indexed like the network.
    gates: Vec<Option<DamGate>>,
    /// Per-station backup sink, indexed like the network.
    backups: Vec<Option<BackupSink>>,
    /// Entity table; `EntityId` is an index into it.
    entities: Vec<Entity>,
    /// One interarrival process per population.
    arrivals: Vec<RandomProcess>,
    /// One service process per (station, class) pair, station-major.
    services: Vec<RandomProcess>,
    stats: StatsCollector,
    trace: Option<EventTrace>,
    events_processed: u64,
}

impl Engine {
    /// Validate the scenario, carve out the random streams, and prime
    /// the queue with first arrivals and gate toggle chains.
    pub fn new(config: ScenarioConfig) -> SimResult<Self> {
        config.validate()?;

        let populations = config.populations.len();
        let mut queue = EventQueue::new();

        let stations: Vec<Station> = config
            .stations
            .iter()
            .enumerate()
            .map(|(i, sc)| {
                Station::new(
                    StationId::new(i),
                    sc.name.clone(),
                    sc.servers,
                    sc.buffer,
                    sc.discipline,
                )
            })
            .collect();
        let network = Network::new(stations);

        let mut gates = Vec::with_capacity(config.stations.len());
        let mut backups = Vec::with_capacity(config.stations.len());
        for (i, sc) in config.stations.iter().enumerate() {
            match &sc.gate {
                Some(gc) => {
                    let gate = DamGate::new(
                        gc.period,
                        gc.open_fraction,
                        gc.classes.iter().map(|&c| ClassId::new(c)).collect(),
                    );
                    if gate.toggles() {
                        let first_close = SimTime::new(gate.open_duration());
                        if first_close.value() <= config.horizon {
                            queue.schedule(
                                first_close,
                                EventKind::GateToggle {
                                    station: StationId::new(i),
                                    open: false,
                                },
                            );
                        }
                    }
                    gates.push(Some(gate));
                }
                None => gates.push(None),
            }
            backups.push(sc.backup.as_ref().map(|bc| BackupSink::new(bc.policy)));
        }

        // Stream layout: populations claim streams [0, P); service
        // processes follow, station-major.
        let mut arrivals = Vec::with_capacity(populations);
        for (p, pc) in config.populations.iter().enumerate() {
            arrivals.push(RandomProcess::new(
                pc.interarrival,
                config.seed,
                p as u64,
            )?);
        }
        let mut services = Vec::with_capacity(config.stations.len() * populations);
        for (s, sc) in config.stations.iter().enumerate() {
            for p in 0..populations {
                services.push(RandomProcess::new(
                    sc.service_for(p),
                    config.seed,
                    (populations + s * populations + p) as u64,
                )?);
            }
        }

        let stats = StatsCollector::new(
            config.populations.iter().map(|p| p.name.clone()).collect(),
            config
                .stations
                .iter()
                .map(|s| (s.name.clone(), s.servers))
                .collect(),
        );

        let mut engine = Engine {
            trace: config.trace.then(EventTrace::new),
            queue,
            clock: SimTime::ZERO,
            network,
            gates,
            backups,
            entities: Vec::new(),
            arrivals,
            services,
            stats,
            events_processed: 0,
            config,
        };

        for p in 0..populations {
            engine.schedule_next_arrival(ClassId::new(p));
        }

        info!(
            stations = engine.config.stations.len(),
            populations,
            seed = engine.config.seed,
            horizon = engine.config.horizon,
            "scenario initialized"
        );
        Ok(engine)
    }

    // ── Accessors ─────────────────────────────────────────────────

    /// Current virtual time.
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    /// Number of events dispatched so far.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// The dispatch trace, if tracing was enabled for the scenario.
    pub fn trace(&self) -> Option<&EventTrace> {
        self.trace.as_ref()
    }

    /// The network, read-only (useful for inspecting final state).
    pub fn network(&self) -> &Network {
        &self.network
    }

    // ── Run loop ──────────────────────────────────────────────────

    /// Dispatch a single event. Errors when the queue is exhausted.
    pub fn step(&mut self) -> SimResult<()> {
        let event = self.queue.pop_next().ok_or(SimError::EmptyQueue)?;
        debug_assert!(!event.at.is_before(self.clock));
        self.clock = event.at;
        self.events_processed += 1;
        if let Some(t) = &mut self.trace {
            t.record(event.clone());
        }
        trace!(id = %event.id, at = %event.at, kind = %event.kind, "dispatch");

        match event.kind {
            EventKind::Arrival { population } => self.on_arrival(population),
            EventKind::ServiceStart {
                entity,
                station,
                token,
            } => self.on_service_start(entity, station, token),
            EventKind::ServiceEnd {
                entity,
                station,
                token,
            } => self.on_service_end(entity, station, token),
            EventKind::GateToggle { station, open } => self.on_gate_toggle(station, open),
            EventKind::BackupRetry { entity, station } => {
                self.on_backup_retry(entity, station)
            }
        }
        Ok(())
    }

    /// Run until the queue drains (or `max_events` trips), then close
    /// the statistics and return the summary.
    pub fn run(&mut self) -> SimResult<SimulationSummary> {
        while !self.queue.is_empty() {
            if let Some(limit) = self.config.max_events {
                if self.events_processed >= limit {
                    warn!(limit, "event limit reached, stopping early");
                    break;
                }
            }
            self.step()?;
        }

        // Entities still held by a sink stay backed-up for good.
        for entity in &self.entities {
            if entity.status == EntityStatus::BackedUp {
                self.stats.record_terminal_backed_up(entity.class);
            }
        }
        self.stats.finalize(self.clock);
        info!(
            events = self.events_processed,
            end = %self.clock,
            entities = self.entities.len(),
            "run complete"
        );
        Ok(self.stats.summary())
    }

    // ── Handlers ──────────────────────────────────────────────────

    fn on_arrival(&mut self, population: ClassId) {
        self.stats.record_arrival(population);
        self.schedule_next_arrival(population);

        let pc = &self.config.populations[population.index()];
        let route: Vec<StationId> = pc.route.iter().map(|&i| StationId::new(i)).collect();
        let priority = pc.priority;
        let draws: Vec<f64> = route
            .iter()
            .map(|s| {
                let idx = s.index() * self.config.populations.len() + population.index();
                self.services[idx].sample()
            })
            .collect();

        let id = EntityId::new(self.entities.len() as u64);
        let first = route[0];
        self.entities.push(Entity::new(
            id,
            population,
            priority,
            self.clock,
            route,
            draws,
        ));
        debug!(entity = %id, class = %population, at = %self.clock, "arrival");

        self.attempt_admission(id, first, true);
    }

    fn on_service_start(&mut self, entity: EntityId, station: StationId, token: ServiceToken) {
        if !self.network.station(station).is_live(entity, token) {
            return; // preempted between seizure and start
        }
        let duration = self.entities[entity.index()].take_service_requirement();
        let end = self.clock.plus(duration);
        let live = self
            .network
            .station_mut(station)
            .set_service_end(entity, token, end);
        debug_assert!(live);
        self.queue.schedule(
            end,
            EventKind::ServiceEnd {
                entity,
                station,
                token,
            },
        );
    }

    fn on_service_end(&mut self, entity: EntityId, station: StationId, token: ServiceToken) {
        if !self.network.station_mut(station).release(entity, token) {
            return; // stale: the job was preempted and will finish later
        }
        self.observe(station);

        match self.network.next_hop(&self.entities[entity.index()]) {
            Some(next) => {
                self.entities[entity.index()].hop += 1;
                self.attempt_admission(entity, next, true);
            }
            None => {
                let e = &mut self.entities[entity.index()];
                e.status = EntityStatus::Served;
                let class = e.class;
                let sojourn = self.clock.duration_since(e.arrival);
                self.stats.record_served(class, sojourn);
                debug!(entity = %entity, sojourn, "served");
            }
        }

        self.promote(station);
        self.drain_backup(station);
    }

    fn on_gate_toggle(&mut self, station: StationId, open: bool) {
        let Some(gate) = self.gates[station.index()].as_mut() else {
            return;
        };
        gate.set_open(open);
        debug!(station = %station, open, at = %self.clock, "gate toggled");

        let next = self.clock.plus(gate.current_phase_duration());
        if next.value() <= self.config.horizon {
            self.queue.schedule(
                next,
                EventKind::GateToggle {
                    station,
                    open: !open,
                },
            );
        }
    }

    /// Deferred redelivery of a backed-up entity. Bypasses the gate:
    /// the entity already paid its admission toll when it first arrived
    /// at the station.
    fn on_backup_retry(&mut self, entity: EntityId, station: StationId) {
        if self.try_enter(entity, station) {
            self.entities[entity.index()].status = EntityStatus::InTransit;
            if let Some(sink) = self.backups[station.index()].as_mut() {
                sink.mark_redelivered();
            }
            debug!(entity = %entity, station = %station, "redelivered from backup");
        } else if let Some(delay) = self.backups[station.index()]
            .as_ref()
            .and_then(|s| s.retry_delay())
        {
            // Still full; defer again without counting a new diversion.
            self.queue.schedule(
                self.clock.plus(delay),
                EventKind::BackupRetry { entity, station },
            );
        }
    }

    // ── Admission ─────────────────────────────────────────────────

    /// One admission attempt at `station`, with the gate check applied
    /// for fresh arrivals and route transfers.
    fn attempt_admission(&mut self, entity: EntityId, station: StationId, check_gate: bool) {
        if check_gate {
            let class = self.entities[entity.index()].class;
            if let Some(gate) = &self.gates[station.index()] {
                if gate.blocks(class) {
                    self.reject(entity, station, RejectCause::GateClosed);
                    return;
                }
            }
        }

        if self.try_enter(entity, station) {
            return;
        }

        // Buffer full: divert to a backup sink when one is attached,
        // otherwise the entity is lost.
        match self.backups[station.index()].as_mut() {
            Some(sink) => {
                let class = self.entities[entity.index()].class;
                self.entities[entity.index()].status = EntityStatus::BackedUp;
                self.stats.record_backup_diverted(class);
                debug!(entity = %entity, station = %station, "diverted to backup");
                match sink.divert(entity) {
                    Diverted::RetryAfter(delay) => {
                        self.queue.schedule(
                            self.clock.plus(delay),
                            EventKind::BackupRetry { entity, station },
                        );
                    }
                    Diverted::Held => {}
                }
            }
            None => self.reject(entity, station, RejectCause::BufferFull),
        }
    }

    /// Raw station entry: seize, preempt, or enqueue. Returns `false`
    /// on buffer-full rejection; the caller decides what happens then.
    fn try_enter(&mut self, entity: EntityId, station: StationId) -> bool {
        let priority = self.entities[entity.index()].priority;
        let now = self.clock;
        let outcome = self.network.station_mut(station).try_admit(entity, priority);
        let entered = match outcome {
            AdmitOutcome::Seized { token } => {
                self.queue.schedule(
                    now,
                    EventKind::ServiceStart {
                        entity,
                        station,
                        token,
                    },
                );
                true
            }
            AdmitOutcome::Preempted {
                token,
                victim,
                victim_end,
                ..
            } => {
                // Work-conserving: the victim keeps its unfinished
                // remainder. `victim_end` is None when the victim's
                // ServiceStart had not fired yet; its requirement is
                // still pending and needs no adjustment.
                if let Some(end) = victim_end {
                    self.entities[victim.index()].remaining =
                        Some(end.duration_since(now));
                }
                debug!(entity = %entity, victim = %victim, station = %station, "preempted");
                self.queue.schedule(
                    now,
                    EventKind::ServiceStart {
                        entity,
                        station,
                        token,
                    },
                );
                true
            }
            AdmitOutcome::Enqueued => true,
            AdmitOutcome::Rejected => false,
        };
        self.observe(station);
        entered
    }

    fn reject(&mut self, entity: EntityId, station: StationId, cause: RejectCause) {
        let e = &mut self.entities[entity.index()];
        e.status = EntityStatus::Rejected(cause);
        self.stats.record_rejected(e.class, cause);
        debug!(entity = %entity, station = %station, ?cause, "rejected");
    }

    /// Move waiting entities into freed servers.
    fn promote(&mut self, station: StationId) {
        while let Some((next, token)) = self.network.station_mut(station).promote_next() {
            self.queue.schedule(
                self.clock,
                EventKind::ServiceStart {
                    entity: next,
                    station,
                    token,
                },
            );
        }
        self.observe(station);
    }

    /// Redeliver held (first-free-slot) backup entities while the
    /// station has room. Redelivery bypasses the gate.
    fn drain_backup(&mut self, station: StationId) {
        loop {
            let has_room = {
                let st = self.network.station(station);
                st.busy() < st.servers() || st.buffer_has_space()
            };
            if !has_room {
                return;
            }
            let Some(sink) = self.backups[station.index()].as_mut() else {
                return;
            };
            let Some(entity) = sink.pop_pending() else {
                return;
            };
            sink.mark_redelivered();
            self.entities[entity.index()].status = EntityStatus::InTransit;
            debug!(entity = %entity, station = %station, "redelivered from backup");
            let entered = self.try_enter(entity, station);
            debug_assert!(entered, "room was checked before the pop");
        }
    }

    // ── Internals ─────────────────────────────────────────────────

    fn schedule_next_arrival(&mut self, population: ClassId) {
        let dt = self.arrivals[population.index()].sample();
        let at = self.clock.plus(dt);
        if at.value() <= self.config.horizon {
            self.queue.schedule(at, EventKind::Arrival { population });
        }
    }

    fn observe(&mut self, station: StationId) {
        let st = self.network.station(station);
        let (occupancy, busy) = (st.occupancy(), st.busy());
        self.stats.observe_station(station, self.clock, occupancy, busy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupPolicy;
    use crate::config::{PopulationConfig, ScenarioBuilder, StationConfig};
    use crate::random::DurationDistribution;
    use crate::station::Discipline;

    fn exp(rate: f64) -> DurationDistribution {
        DurationDistribution::Exponential { rate }
    }

    fn det(value: f64) -> DurationDistribution {
        DurationDistribution::Deterministic { value }
    }

    fn run_scenario(config: ScenarioConfig) -> (SimulationSummary, Option<u64>) {
        let mut engine = Engine::new(config).unwrap();
        let summary = engine.run().unwrap();
        let hash = engine.trace().map(|t| t.trace_hash());
        (summary, hash)
    }

    fn mm1(seed: u64, lambda: f64, mu: f64, horizon: f64) -> ScenarioConfig {
        ScenarioBuilder::new(seed, horizon)
            .station(StationConfig::new("execution", 1, exp(mu)))
            .population(PopulationConfig::new("ING", exp(lambda), vec![0]))
            .build()
            .unwrap()
    }

    // ── Closed-form validation ────────────────────────────────────

    #[test]
    fn test_mm1_sojourn_matches_theory() {
        // M/M/1 with ρ = 0.8: W = 1/(μ−λ) = 5, L = λW = 4, U = ρ.
        let (summary, _) = run_scenario(mm1(42, 0.8, 1.0, 200_000.0));

        let w = summary.mean_sojourn.unwrap();
        assert!(
            (w - 5.0).abs() / 5.0 < 0.1,
            "mean sojourn {} too far from 5.0",
            w
        );

        let u = summary.stations[0].utilization;
        assert!((u - 0.8).abs() < 0.04, "utilization {} too far from 0.8", u);

        let l = summary.stations[0].avg_queue_length;
        assert!(
            (l - 4.0).abs() / 4.0 < 0.1,
            "avg queue length {} too far from 4.0",
            l
        );
    }

    #[test]
    fn test_erlang_loss_blocking_probability() {
        // M/M/1/1 (no waiting room): blocking B = ρ/(1+ρ) = 4/9.
        let config = ScenarioBuilder::new(7, 100_000.0)
            .station(StationConfig::new("execution", 1, exp(1.0)).with_buffer(0))
            .population(PopulationConfig::new("ING", exp(0.8), vec![0]))
            .build()
            .unwrap();
        let (summary, _) = run_scenario(config);

        let cls = &summary.classes[0];
        assert_eq!(cls.served + cls.rejected_buffer_full, cls.arrivals);
        let blocking = cls.rejected_buffer_full as f64 / cls.arrivals as f64;
        let expected = 0.8 / 1.8;
        assert!(
            (blocking - expected).abs() / expected < 0.05,
            "blocking {} too far from {}",
            blocking,
            expected
        );
    }

    #[test]
    fn test_unbounded_stable_queue_never_rejects() {
        let (summary, _) = run_scenario(mm1(11, 0.5, 1.0, 5_000.0));
        assert_eq!(summary.total_rejected_buffer_full, 0);
        assert_eq!(summary.total_rejected_gate_closed, 0);
        // Drained run: every arrival completed service.
        assert_eq!(summary.total_served, summary.total_arrivals);
    }

    // ── Determinism ───────────────────────────────────────────────

    fn mixed_scenario(seed: u64) -> ScenarioConfig {
        ScenarioBuilder::new(seed, 2_000.0)
            .with_trace()
            .station(
                StationConfig::new("execution", 2, exp(1.5))
                    .with_discipline(Discipline::Priority { preemptive: true })
                    .with_gate(50.0, 0.6, vec![0]),
            )
            .station(
                StationConfig::new("delivery", 1, exp(2.0))
                    .with_buffer(2)
                    .with_backup(BackupPolicy::FixedDelay(3.0)),
            )
            .population(
                PopulationConfig::new("ING", exp(0.6), vec![0, 1]).with_priority(2),
            )
            .population(
                PopulationConfig::new("PREPA", exp(0.3), vec![0, 1]).with_priority(1),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_same_seed_reproduces_run() {
        let (s1, h1) = run_scenario(mixed_scenario(42));
        let (s2, h2) = run_scenario(mixed_scenario(42));
        assert_eq!(s1, s2);
        assert_eq!(h1.unwrap(), h2.unwrap());
    }

    #[test]
    fn test_every_entity_reaches_terminal_status() {
        // Drained run: nothing is left in transit.
        let (summary, _) = run_scenario(mixed_scenario(8));
        for cls in &summary.classes {
            assert_eq!(
                cls.served + cls.rejected_buffer_full + cls.rejected_gate_closed + cls.backed_up,
                cls.arrivals,
                "class {} lost entities",
                cls.name
            );
        }
    }

    #[test]
    fn test_different_seed_diverges() {
        let (_, h1) = run_scenario(mixed_scenario(42));
        let (_, h2) = run_scenario(mixed_scenario(43));
        assert_ne!(h1.unwrap(), h2.unwrap());
    }

    // ── Dam gates ─────────────────────────────────────────────────

    #[test]
    fn test_closed_dam_rejects_every_gated_arrival() {
        // open_fraction = 0: the gate never opens for ING.
        let config = ScenarioBuilder::new(3, 100.0)
            .station(StationConfig::new("execution", 1, exp(5.0)).with_gate(
                10.0,
                0.0,
                vec![0],
            ))
            .population(PopulationConfig::new("ING", exp(1.0), vec![0]))
            .population(PopulationConfig::new("PREPA", exp(1.0), vec![0]))
            .build()
            .unwrap();
        let (summary, _) = run_scenario(config);

        let ing = &summary.classes[0];
        assert!(ing.arrivals > 0);
        assert_eq!(ing.rejected_gate_closed, ing.arrivals);
        assert_eq!(ing.served, 0);

        let prepa = &summary.classes[1];
        assert_eq!(prepa.rejected_gate_closed, 0, "ungated class passes freely");
        assert_eq!(prepa.served, prepa.arrivals);
    }

    #[test]
    fn test_dam_window_admits_only_open_phase() {
        // Deterministic arrivals at t = 4, 8, 12, 16, 20, 24, 28 with a
        // period-10 gate open on [0,5), [10,15), [20,25): admitted at
        // 4, 12, 20, 24; rejected at 8, 16, 28.
        let config = ScenarioBuilder::new(1, 28.0)
            .station(StationConfig::new("execution", 1, det(0.5)).with_gate(
                10.0,
                0.5,
                vec![0],
            ))
            .population(PopulationConfig::new("ING", det(4.0), vec![0]))
            .build()
            .unwrap();
        let (summary, _) = run_scenario(config);

        let ing = &summary.classes[0];
        assert_eq!(ing.arrivals, 7);
        assert_eq!(ing.served, 4);
        assert_eq!(ing.rejected_gate_closed, 3);
    }

    // ── Priority and preemption ───────────────────────────────────

    #[test]
    fn test_priority_discipline_favors_high_priority() {
        fn shared_station(discipline: Discipline) -> ScenarioConfig {
            ScenarioBuilder::new(5, 20_000.0)
                .station(
                    StationConfig::new("execution", 1, exp(1.0))
                        .with_discipline(discipline),
                )
                .population(
                    PopulationConfig::new("ING", exp(0.5), vec![0]).with_priority(1),
                )
                .population(
                    PopulationConfig::new("PREPA", exp(0.2), vec![0]).with_priority(0),
                )
                .build()
                .unwrap()
        }

        let (fifo, _) = run_scenario(shared_station(Discipline::Fifo));
        let (prio, _) =
            run_scenario(shared_station(Discipline::Priority { preemptive: false }));

        let prepa_prio = prio.classes[1].mean_sojourn.unwrap();
        let ing_prio = prio.classes[0].mean_sojourn.unwrap();
        assert!(
            prepa_prio < ing_prio,
            "priority class should wait less: {} vs {}",
            prepa_prio,
            ing_prio
        );

        let prepa_fifo = fifo.classes[1].mean_sojourn.unwrap();
        assert!(
            prepa_prio < prepa_fifo,
            "priority should improve PREPA over FIFO: {} vs {}",
            prepa_prio,
            prepa_fifo
        );

        // The low-priority class pays for it, but boundedly so.
        let ing_fifo = fifo.classes[0].mean_sojourn.unwrap();
        assert!(
            ing_prio < 3.0 * ing_fifo,
            "ING degradation should stay bounded: {} vs {}",
            ing_prio,
            ing_fifo
        );
    }

    #[test]
    fn test_preemptive_resume_is_work_conserving() {
        // One low-priority job arrives at t=100 (service 10), one
        // high-priority job at t=102 (service 3).
        fn two_jobs(preemptive: bool) -> ScenarioConfig {
            ScenarioBuilder::new(1, 150.0)
                .station(
                    StationConfig::new("execution", 1, det(1.0))
                        .with_discipline(Discipline::Priority { preemptive })
                        .with_class_service(0, det(10.0))
                        .with_class_service(1, det(3.0)),
                )
                .population(
                    PopulationConfig::new("ING", det(100.0), vec![0]).with_priority(5),
                )
                .population(
                    PopulationConfig::new("PREPA", det(102.0), vec![0]).with_priority(1),
                )
                .build()
                .unwrap()
        }

        // Preemptive: PREPA runs 102→105, ING finishes 105→113.
        let (preemptive, _) = run_scenario(two_jobs(true));
        assert_eq!(preemptive.classes[0].mean_sojourn, Some(13.0));
        assert_eq!(preemptive.classes[1].mean_sojourn, Some(3.0));

        // Non-preemptive: ING finishes at 110, PREPA runs 110→113.
        let (nonpreemptive, _) = run_scenario(two_jobs(false));
        assert_eq!(nonpreemptive.classes[0].mean_sojourn, Some(10.0));
        assert_eq!(nonpreemptive.classes[1].mean_sojourn, Some(11.0));
    }

    // ── Backup sinks ──────────────────────────────────────────────

    fn overloaded_delivery(backup: Option<BackupPolicy>) -> ScenarioConfig {
        // Deterministic arrivals every 1.0, service 2.0, no waiting
        // room: every other arrival overflows.
        let mut station = StationConfig::new("delivery", 1, det(2.0)).with_buffer(0);
        if let Some(policy) = backup {
            station = station.with_backup(policy);
        }
        ScenarioBuilder::new(1, 10.0)
            .station(station)
            .population(PopulationConfig::new("ING", det(1.0), vec![0]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_overflow_without_backup_loses_entities() {
        let (summary, _) = run_scenario(overloaded_delivery(None));
        let cls = &summary.classes[0];
        assert!(cls.rejected_buffer_full > 0);
        assert_eq!(cls.served + cls.rejected_buffer_full, cls.arrivals);
    }

    #[test]
    fn test_fixed_delay_backup_recovers_overflow() {
        let (summary, _) =
            run_scenario(overloaded_delivery(Some(BackupPolicy::FixedDelay(0.5))));
        let cls = &summary.classes[0];
        assert_eq!(cls.rejected_buffer_full, 0);
        assert!(cls.backup_diverted > 0);
        // The drain redelivers everyone eventually.
        assert_eq!(cls.served, cls.arrivals);
        assert_eq!(cls.backed_up, 0);
    }

    #[test]
    fn test_first_free_slot_backup_recovers_overflow() {
        let (summary, _) =
            run_scenario(overloaded_delivery(Some(BackupPolicy::FirstFreeSlot)));
        let cls = &summary.classes[0];
        assert_eq!(cls.rejected_buffer_full, 0);
        assert!(cls.backup_diverted > 0);
        assert_eq!(cls.served, cls.arrivals);
        assert_eq!(cls.backed_up, 0);
    }

    #[test]
    fn test_backup_delay_extends_sojourn() {
        let (without, _) = run_scenario(overloaded_delivery(None));
        let (with, _) =
            run_scenario(overloaded_delivery(Some(BackupPolicy::FixedDelay(0.5))));
        // Redelivered entities pay their deferred wait.
        assert!(
            with.mean_sojourn.unwrap() >= without.mean_sojourn.unwrap(),
            "backup cannot shorten sojourns"
        );
    }

    // ── Multi-stage routing ───────────────────────────────────────

    #[test]
    fn test_route_traverses_all_stations() {
        let config = ScenarioBuilder::new(9, 1_000.0)
            .station(StationConfig::new("reception", 2, exp(4.0)))
            .station(StationConfig::new("execution", 2, exp(2.0)))
            .station(StationConfig::new("delivery", 1, exp(3.0)))
            .population(PopulationConfig::new("ING", exp(0.8), vec![0, 1, 2]))
            .build()
            .unwrap();
        let (summary, _) = run_scenario(config);

        assert_eq!(summary.total_served, summary.total_arrivals);
        // Every station saw traffic.
        for station in &summary.stations {
            assert!(
                station.utilization > 0.0,
                "station {} never served",
                station.name
            );
        }
    }

    // ── Guard rails ───────────────────────────────────────────────

    #[test]
    fn test_max_events_stops_early() {
        let config = ScenarioBuilder::new(2, 100_000.0)
            .max_events(50)
            .station(StationConfig::new("execution", 1, exp(1.0)))
            .population(PopulationConfig::new("ING", exp(0.8), vec![0]))
            .build()
            .unwrap();
        let mut engine = Engine::new(config).unwrap();
        engine.run().unwrap();
        assert_eq!(engine.events_processed(), 50);
    }

    #[test]
    fn test_step_on_drained_queue_errors() {
        let mut engine = Engine::new(mm1(1, 0.5, 1.0, 10.0)).unwrap();
        engine.run().unwrap();
        assert_eq!(engine.step(), Err(SimError::EmptyQueue));
    }

    #[test]
    fn test_clock_is_monotonic() {
        let mut engine = Engine::new(mm1(4, 0.9, 1.0, 500.0)).unwrap();
        let mut last = SimTime::ZERO;
        while engine.step().is_ok() {
            assert!(!engine.clock().is_before(last));
            last = engine.clock();
        }
    }
}
