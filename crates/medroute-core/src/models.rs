//! Core data models for dispatch planning.

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::GeometryError;

/// A point in coordinate space. Longitude is the x axis, latitude the y axis.
///
/// Equality is exact value comparison, not geodesic proximity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lng: f64,
    pub lat: f64,
}

impl Position {
    /// Create a position, rejecting coordinates outside the geographic range.
    pub fn new(lng: f64, lat: f64) -> Result<Self, GeometryError> {
        let position = Self { lng, lat };
        position.validate()?;
        Ok(position)
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        let lng_ok = self.lng.is_finite() && (-180.0..=180.0).contains(&self.lng);
        let lat_ok = self.lat.is_finite() && (-90.0..=90.0).contains(&self.lat);
        if lng_ok && lat_ok {
            Ok(())
        } else {
            Err(GeometryError::InvalidPosition {
                lng: self.lng,
                lat: self.lat,
            })
        }
    }

    /// Bit pattern of both coordinates, with `-0.0` folded into `0.0` so
    /// equal bits agree with `f64` equality.
    pub(crate) fn canonical_bits(&self) -> (u64, u64) {
        (canonical_bits(self.lng), canonical_bits(self.lat))
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0_f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// A named polygon given as a closed ring (first vertex == last vertex).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub vertices: Vec<Position>,
}

impl Region {
    pub fn new(name: impl Into<String>, vertices: Vec<Position>) -> Self {
        Self {
            name: name.into(),
            vertices,
        }
    }

    /// Check the ring invariants: at least 3 distinct vertices plus the
    /// closing duplicate, and every vertex in range.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let invalid = |reason: &'static str| GeometryError::InvalidRegion {
            name: self.name.clone(),
            reason,
        };

        if self.vertices.len() < 4 {
            return Err(invalid("ring needs at least 4 vertices including the closing one"));
        }
        let (Some(first), Some(last)) = (self.vertices.first(), self.vertices.last()) else {
            return Err(invalid("ring is empty"));
        };
        if first != last {
            return Err(invalid("ring is not closed"));
        }
        for vertex in &self.vertices {
            vertex.validate()?;
        }

        let distinct: HashSet<(u64, u64)> = self.vertices[..self.vertices.len() - 1]
            .iter()
            .map(Position::canonical_bits)
            .collect();
        if distinct.len() < 3 {
            return Err(invalid("ring needs at least 3 distinct vertices"));
        }
        Ok(())
    }
}

/// Fixed capabilities and cost terms of a drone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    #[serde(default)]
    pub cooling: bool,
    #[serde(default)]
    pub heating: bool,
    pub capacity: f64,
    pub max_moves: u32,
    pub cost_per_move: f64,
    pub cost_initial: f64,
    pub cost_final: f64,
}

impl Capability {
    /// Total cost of a trip of `moves` steps.
    pub fn trip_cost(&self, moves: u32) -> f64 {
        self.cost_initial + self.cost_final + f64::from(moves) * self.cost_per_move
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drone {
    pub id: String,
    pub name: String,
    pub capability: Capability,
}

/// A base from which drones depart and to which they return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePoint {
    pub id: u64,
    pub name: String,
    pub location: Position,
}

/// A weekly time slot in which a drone may fly from its service point.
/// Both ends are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityWindow {
    pub day_of_week: Weekday,
    pub from: NaiveTime,
    pub until: NaiveTime,
}

impl AvailabilityWindow {
    pub fn covers(&self, date: NaiveDate, time: NaiveTime) -> bool {
        use chrono::Datelike;
        self.day_of_week == date.weekday() && time >= self.from && time <= self.until
    }
}

/// Availability of one drone at the service point that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneAvailability {
    pub id: String,
    #[serde(default)]
    pub availability: Vec<AvailabilityWindow>,
}

/// All drones stationed at one service point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePointDrones {
    pub service_point_id: u64,
    #[serde(default)]
    pub drones: Vec<DroneAvailability>,
}

/// Constraints a drone must satisfy to carry a dispatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirements {
    #[serde(default)]
    pub capacity: f64,
    #[serde(default)]
    pub cooling: bool,
    #[serde(default)]
    pub heating: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cost: Option<f64>,
}

/// A single delivery request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub id: u64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(default)]
    pub requirements: Requirements,
    pub delivery: Position,
}

/// Flight path flown to serve one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub delivery_id: u64,
    pub flight_path: Vec<Position>,
}

/// One drone outing serving one or more dispatches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub drone_id: String,
    pub service_point: ServicePoint,
    pub deliveries: Vec<Delivery>,
    pub total_cost: f64,
    pub total_moves: u32,
}

/// Result of one planning call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub total_cost: f64,
    pub total_moves: u32,
    pub trips: Vec<Trip>,
    /// Dispatches no drone could serve, even on its own.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unserviceable: Vec<u64>,
}

impl PlanResult {
    pub(crate) fn record(&mut self, trip: Trip) {
        self.total_cost += trip.total_cost;
        self.total_moves += trip.total_moves;
        self.trips.push(trip);
    }
}
