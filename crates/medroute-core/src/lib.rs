pub mod cache;
pub mod catalog;
pub mod error;
pub mod feasibility;
pub mod geojson;
pub mod models;
pub mod pathfinder;
pub mod planner;
pub mod spatial;

pub use cache::PathCache;
pub use catalog::{CatalogSnapshot, QueryCriterion, QueryOperator};
pub use error::{GeometryError, PlanError};
pub use feasibility::{estimated_moves, FeasibilityMatcher};
pub use geojson::{plan_as_geojson, plan_line_string, LineString};
pub use models::{
    AvailabilityWindow, Capability, Delivery, DispatchRequest, Drone, DroneAvailability,
    PlanResult, Position, Region, Requirements, ServicePoint, ServicePointDrones, Trip,
};
pub use pathfinder::{find_path, LatticePoint, PathSearchResult, Pathfinder, SearchConfig};
pub use planner::{order_by_proximity, TripPlanner};
pub use spatial::{
    contains, crosses_region, distance, is_close, segments_intersect, step, RestrictedZones,
    EPSILON, STEP,
};
