//! Error types for geometry validation and planning.

use thiserror::Error;

/// Invalid input reaching the geometry layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("angle {angle} is not one of the 16 compass directions")]
    InvalidAngle { angle: f64 },

    #[error("region '{name}' is invalid: {reason}")]
    InvalidRegion { name: String, reason: &'static str },

    #[error("position (lng {lng}, lat {lat}) is outside the valid coordinate range")]
    InvalidPosition { lng: f64, lat: f64 },
}

/// Failures that abort a whole planning call.
///
/// Constraint violations (capacity, cost, moves, unreachable points) are not
/// errors; they surface as "no trip produced".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Availability data names a service point missing from the catalog.
    #[error("availability references unknown service point {service_point_id}")]
    UnknownServicePoint { service_point_id: u64 },

    /// Availability data, or a caller, names a drone missing from the catalog.
    #[error("unknown drone '{drone_id}'")]
    UnknownDrone { drone_id: String },

    #[error("drone '{drone_id}' is assigned to more than one service point")]
    DuplicateAssignment { drone_id: String },
}
