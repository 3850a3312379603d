//! GeoJSON rendering of a planned flight.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::PlanError;
use crate::models::{DispatchRequest, PlanResult, Position};
use crate::planner::TripPlanner;

/// A GeoJSON `LineString` geometry with `[lng, lat]` coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineString {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<[f64; 2]>,
}

impl LineString {
    pub fn from_path(path: &[Position]) -> Self {
        Self {
            kind: "LineString".to_string(),
            coordinates: path.iter().map(|p| [p.lng, p.lat]).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::from_path(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

/// One continuous line through every delivery of a single-drone plan.
///
/// Consecutive deliveries share a joint point, which is written once.
/// Plans with no trips, or with trips by more than one drone, render as an
/// empty line.
pub fn plan_line_string(plan: &PlanResult) -> LineString {
    let drones: HashSet<&str> = plan.trips.iter().map(|t| t.drone_id.as_str()).collect();
    if drones.len() != 1 {
        return LineString::empty();
    }

    let mut line: Vec<Position> = Vec::new();
    for delivery in plan.trips.iter().flat_map(|trip| &trip.deliveries) {
        let skip = usize::from(!line.is_empty());
        line.extend(delivery.flight_path.iter().skip(skip).copied());
    }
    LineString::from_path(&line)
}

/// Plan `dispatches` and render the result as a single line.
///
/// Dispatches spanning more than one date render as an empty line without
/// planning.
pub fn plan_as_geojson(
    planner: &TripPlanner<'_>,
    dispatches: &[DispatchRequest],
) -> Result<LineString, PlanError> {
    let dates: HashSet<_> = dispatches.iter().map(|d| d.date).collect();
    if dates.len() > 1 {
        tracing::debug!(dates = dates.len(), "dispatches span several dates");
        return Ok(LineString::empty());
    }
    let plan = planner.plan(dispatches)?;
    Ok(plan_line_string(&plan))
}
