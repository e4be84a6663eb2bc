//! Backup sinks: overflow absorbers for buffer-full rejections.
//!
//! A sink is attached to one station. It activates only when the station
//! rejects due to a full buffer (never on dam closure): the entity is
//! marked backed-up and redelivered later instead of being discarded.
//! With backup enabled no entity is permanently lost to buffer overflow
//! at that station; the deferred interval is part of the entity's
//! sojourn time.

use std::collections::VecDeque;

use crate::entity::EntityId;

/// How a backed-up entity gets redelivered.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum BackupPolicy {
    /// Retry admission after a fixed delay; still full → defer again.
    FixedDelay(f64),
    /// Hold in FIFO order and redeliver as soon as the station frees a
    /// slot.
    FirstFreeSlot,
}

/// Outcome of diverting an entity into a sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Diverted {
    /// Schedule a `BackupRetry` after this delay.
    RetryAfter(f64),
    /// The sink holds the entity until the station has room.
    Held,
}

/// Per-station overflow absorber.
#[derive(Debug, Clone)]
pub struct BackupSink {
    policy: BackupPolicy,
    /// Entities held under `FirstFreeSlot`, in diversion order.
    pending: VecDeque<EntityId>,
    diverted: u64,
    redelivered: u64,
}

impl BackupSink {
    /// Create an empty sink with the given redelivery policy.
    pub fn new(policy: BackupPolicy) -> Self {
        BackupSink {
            policy,
            pending: VecDeque::new(),
            diverted: 0,
            redelivered: 0,
        }
    }

    pub fn policy(&self) -> BackupPolicy {
        self.policy
    }

    /// Accept an entity rejected for buffer-full.
    pub fn divert(&mut self, entity: EntityId) -> Diverted {
        self.diverted += 1;
        match self.policy {
            BackupPolicy::FixedDelay(delay) => Diverted::RetryAfter(delay),
            BackupPolicy::FirstFreeSlot => {
                self.pending.push_back(entity);
                Diverted::Held
            }
        }
    }

    /// Re-defer an entity whose retry found the buffer still full.
    ///
    /// Not counted as a new diversion.
    pub fn retry_delay(&self) -> Option<f64> {
        match self.policy {
            BackupPolicy::FixedDelay(delay) => Some(delay),
            BackupPolicy::FirstFreeSlot => None,
        }
    }

    /// Next held entity to redeliver, if any.
    pub fn pop_pending(&mut self) -> Option<EntityId> {
        self.pending.pop_front()
    }

    /// Number of entities currently held.
    pub fn held(&self) -> usize {
        self.pending.len()
    }

    /// Record a successful redelivery into the station.
    pub fn mark_redelivered(&mut self) {
        self.redelivered += 1;
    }

    /// Total diversions accepted.
    pub fn diverted(&self) -> u64 {
        self.diverted
    }

    /// Total successful redeliveries.
    pub fn redelivered(&self) -> u64 {
        self.redelivered
    }
}
