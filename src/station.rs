//! Service stations: K parallel servers, a bounded waiting buffer, and a
//! scheduling discipline.
//!
//! A station is a pure state machine — it decides admissions, promotions
//! and preemptions, and the engine turns the outcomes into scheduled
//! events and statistics records.
//!
//! **Buffer convention** (fixed once, enforced everywhere): the buffer
//! limit counts *waiting* entities only; in-service slots are excluded.
//! `buffer = Some(0)` is therefore the Erlang-B no-waiting-room case:
//! an arrival finding all K servers busy is turned away.

use std::collections::VecDeque;

use crate::entity::EntityId;
use crate::event::ServiceToken;
use crate::time::SimTime;

// ── Station ID ────────────────────────────────────────────────────────

/// Index of a station within the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StationId(usize);

impl StationId {
    /// Wrap a raw index into a `StationId`.
    #[inline]
    pub fn new(raw: usize) -> Self {
        StationId(raw)
    }

    /// Return the raw index.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for StationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S#{}", self.0)
    }
}

// ── Discipline ────────────────────────────────────────────────────────

/// Scheduling discipline, chosen at station construction.
///
/// Priority levels compare numerically: lower value = higher priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Discipline {
    /// Strict arrival order.
    Fifo,
    /// Waiting set ordered by (priority level, arrival order).
    ///
    /// Non-preemptive by default: a running lower-priority job finishes
    /// before a higher-priority arrival can take its server. The
    /// preemptive variant suspends the running job and resumes its
    /// remaining service time later (work-conserving).
    Priority { preemptive: bool },
}

// ── Outcomes ──────────────────────────────────────────────────────────

/// Result of an admission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// A free server was seized; service may start now.
    Seized { token: ServiceToken },
    /// A running lower-priority job was suspended to make room.
    ///
    /// `victim_end` is the victim's scheduled completion, if its service
    /// had already started; the engine computes the remaining time and
    /// stores it on the victim entity. The victim is already re-queued
    /// in the waiting set.
    Preempted {
        token: ServiceToken,
        victim: EntityId,
        victim_token: ServiceToken,
        victim_end: Option<SimTime>,
    },
    /// Placed in the waiting buffer.
    Enqueued,
    /// Buffer full — turned away.
    Rejected,
}

// ── Internal records ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct InService {
    entity: EntityId,
    token: ServiceToken,
    priority: u8,
    /// Original enqueue order, preserved across preemptions so equal
    /// priorities resume in arrival order.
    seq: u64,
    /// Absolute completion time, set when `ServiceStart` fires.
    end: Option<SimTime>,
}

#[derive(Debug, Clone)]
struct Waiting {
    entity: EntityId,
    priority: u8,
    seq: u64,
}

// ── Station ───────────────────────────────────────────────────────────

/// A service node with `servers` parallel servers and an optional
/// bounded waiting buffer.
#[derive(Debug, Clone)]
pub struct Station {
    id: StationId,
    name: String,
    servers: usize,
    /// Waiting-room size; `None` = unbounded.
    buffer: Option<usize>,
    discipline: Discipline,
    in_service: Vec<InService>,
    waiting: VecDeque<Waiting>,
    token_gen: u64,
    seq_gen: u64,
}

impl Station {
    /// Create an idle station. `servers` must be >= 1 (validated by the
    /// scenario configuration).
    pub fn new(
        id: StationId,
        name: impl Into<String>,
        servers: usize,
        buffer: Option<usize>,
        discipline: Discipline,
    ) -> Self {
        debug_assert!(servers >= 1);
        Station {
            id,
            name: name.into(),
            servers,
            buffer,
            discipline,
            in_service: Vec::with_capacity(servers),
            waiting: VecDeque::new(),
            token_gen: 0,
            seq_gen: 0,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────

    pub fn id(&self) -> StationId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn servers(&self) -> usize {
        self.servers
    }

    pub fn buffer(&self) -> Option<usize> {
        self.buffer
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    /// Number of busy servers.
    pub fn busy(&self) -> usize {
        self.in_service.len()
    }

    /// Number of waiting entities.
    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    /// Waiting plus in service — the "queue length" reported by stats.
    pub fn occupancy(&self) -> usize {
        self.busy() + self.waiting_len()
    }

    /// Whether the waiting buffer can hold one more entity.
    pub fn buffer_has_space(&self) -> bool {
        match self.buffer {
            Some(limit) => self.waiting.len() < limit,
            None => true,
        }
    }

    /// Whether a scheduled service event is still live.
    pub fn is_live(&self, entity: EntityId, token: ServiceToken) -> bool {
        self.in_service
            .iter()
            .any(|s| s.entity == entity && s.token == token)
    }

    // ── Admission ─────────────────────────────────────────────────

    /// Attempt to admit an entity.
    ///
    /// Free server → seize. Otherwise, under preemptive priority, a
    /// strictly lower-priority running job may be suspended (only if the
    /// buffer can absorb it). Otherwise the entity waits if the buffer
    /// has room, and is rejected if not.
    pub fn try_admit(&mut self, entity: EntityId, priority: u8) -> AdmitOutcome {
        let seq = self.next_seq();

        if self.in_service.len() < self.servers {
            let token = self.seize(entity, priority, seq);
            return AdmitOutcome::Seized { token };
        }

        if let Discipline::Priority { preemptive: true } = self.discipline {
            // The victim takes a waiting slot, so preemption needs room.
            if self.buffer_has_space() {
                if let Some(idx) = self.preemption_victim(priority) {
                    let victim = self.in_service.swap_remove(idx);
                    self.insert_waiting(Waiting {
                        entity: victim.entity,
                        priority: victim.priority,
                        seq: victim.seq,
                    });
                    let token = self.seize(entity, priority, seq);
                    return AdmitOutcome::Preempted {
                        token,
                        victim: victim.entity,
                        victim_token: victim.token,
                        victim_end: victim.end,
                    };
                }
            }
        }

        if self.buffer_has_space() {
            self.insert_waiting(Waiting {
                entity,
                priority,
                seq,
            });
            debug_assert!(self
                .buffer
                .map_or(true, |limit| self.waiting.len() <= limit));
            return AdmitOutcome::Enqueued;
        }

        AdmitOutcome::Rejected
    }

    /// Record the absolute completion time once service actually starts.
    ///
    /// Returns `false` if the token is stale (the entry was preempted
    /// between seizure and the `ServiceStart` event).
    pub fn set_service_end(
        &mut self,
        entity: EntityId,
        token: ServiceToken,
        end: SimTime,
    ) -> bool {
        for s in &mut self.in_service {
            if s.entity == entity && s.token == token {
                s.end = Some(end);
                return true;
            }
        }
        false
    }

    /// Free the server held by `(entity, token)`.
    ///
    /// Returns `false` if the token is stale, in which case the popped
    /// `ServiceEnd` must be discarded silently.
    pub fn release(&mut self, entity: EntityId, token: ServiceToken) -> bool {
        if let Some(idx) = self
            .in_service
            .iter()
            .position(|s| s.entity == entity && s.token == token)
        {
            self.in_service.swap_remove(idx);
            true
        } else {
            false
        }
    }

    /// Promote the next waiting entity (by discipline) into service.
    ///
    /// Returns the promoted entity and its fresh token, or `None` if no
    /// one is waiting or no server is free.
    pub fn promote_next(&mut self) -> Option<(EntityId, ServiceToken)> {
        if self.in_service.len() >= self.servers {
            return None;
        }
        let next = self.waiting.pop_front()?;
        let token = self.seize(next.entity, next.priority, next.seq);
        Some((next.entity, token))
    }

    // ── Internals ─────────────────────────────────────────────────

    fn next_seq(&mut self) -> u64 {
        let seq = self.seq_gen;
        self.seq_gen += 1;
        seq
    }

    fn seize(&mut self, entity: EntityId, priority: u8, seq: u64) -> ServiceToken {
        debug_assert!(self.in_service.len() < self.servers);
        let token = ServiceToken::new(self.token_gen);
        self.token_gen += 1;
        self.in_service.push(InService {
            entity,
            token,
            priority,
            seq,
            end: None,
        });
        token
    }

    /// Index of the job to suspend for an arrival at `priority`, if any:
    /// the running job with the numerically greatest (i.e. weakest)
    /// priority strictly below the arrival's, latest arrival breaking
    /// ties.
    fn preemption_victim(&self, priority: u8) -> Option<usize> {
        self.in_service
            .iter()
            .enumerate()
            .filter(|(_, s)| s.priority > priority)
            .max_by_key(|(_, s)| (s.priority, s.seq))
            .map(|(idx, _)| idx)
    }

    fn insert_waiting(&mut self, item: Waiting) {
        match self.discipline {
            Discipline::Fifo => self.waiting.push_back(item),
            Discipline::Priority { .. } => {
                // Keep the deque sorted by (priority, seq); seq restores
                // arrival order within a level, including for preempted
                // jobs re-entering with their original seq.
                let pos = self
                    .waiting
                    .iter()
                    .position(|w| (w.priority, w.seq) > (item.priority, item.seq))
                    .unwrap_or(self.waiting.len());
                self.waiting.insert(pos, item);
            }
        }
    }
}
