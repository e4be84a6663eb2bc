//! The station network: an ordered collection of stations plus static,
//! per-entity routing.
//!
//! Routing is fixed per scenario — each population carries an ordered
//! list of station ids, and on `ServiceEnd` at hop *i* the engine looks
//! up hop *i + 1*. No dynamic load-based rerouting.

use crate::entity::Entity;
use crate::station::{Station, StationId};

/// Directed network of service stations.
///
/// Owned by the engine; all mutation goes through it.
#[derive(Debug, Clone)]
pub struct Network {
    stations: Vec<Station>,
}

impl Network {
    /// Build a network from pre-constructed stations, indexed by id.
    pub fn new(stations: Vec<Station>) -> Self {
        debug_assert!(stations
            .iter()
            .enumerate()
            .all(|(i, s)| s.id().index() == i));
        Network { stations }
    }

    /// Number of stations.
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Whether the network has no stations.
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Shared access to a station.
    pub fn station(&self, id: StationId) -> &Station {
        &self.stations[id.index()]
    }

    /// Exclusive access to a station.
    pub fn station_mut(&mut self, id: StationId) -> &mut Station {
        &mut self.stations[id.index()]
    }

    /// Iterate stations in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.iter()
    }

    /// The station an entity visits after its current hop; `None` when
    /// the current hop is terminal.
    pub fn next_hop(&self, entity: &Entity) -> Option<StationId> {
        entity.next_station()
    }
}
