//! Which drones can serve an entire batch of dispatches.

use crate::catalog::CatalogSnapshot;
use crate::error::PlanError;
use crate::models::{Capability, DispatchRequest, DroneAvailability, Position};
use crate::spatial::{distance, STEP};

/// Why a drone was turned down for a dispatch. Only used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Capacity,
    Cooling,
    Heating,
    Unavailable,
    Cost,
}

/// Straight-line move estimate from a base to a delivery point.
pub fn estimated_moves(base: Position, delivery: Position) -> u32 {
    (distance(base, delivery) / STEP).ceil() as u32
}

/// Filters the catalog's stationed drones by batch requirements.
#[derive(Debug, Clone, Copy)]
pub struct FeasibilityMatcher<'a> {
    catalog: &'a CatalogSnapshot,
}

impl<'a> FeasibilityMatcher<'a> {
    pub fn new(catalog: &'a CatalogSnapshot) -> Self {
        Self { catalog }
    }

    /// Ids of drones that can serve every dispatch of `batch`, in catalog
    /// order (service point group order, then drone order within a group).
    ///
    /// The cost check uses a per-dispatch share of an estimated trip cost:
    /// `(costInitial + costFinal + moves * costPerMove) / batch.len()`, with
    /// `moves` the straight-line estimate from the drone's base.
    pub fn available_drones(&self, batch: &[DispatchRequest]) -> Result<Vec<String>, PlanError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut available = Vec::new();
        for group in &self.catalog.drones_for_service_points {
            let base = self
                .catalog
                .service_point(group.service_point_id)
                .ok_or(PlanError::UnknownServicePoint {
                    service_point_id: group.service_point_id,
                })?;

            for entry in &group.drones {
                let drone = self
                    .catalog
                    .drone(&entry.id)
                    .ok_or_else(|| PlanError::UnknownDrone {
                        drone_id: entry.id.clone(),
                    })?;

                let rejected = batch.iter().find_map(|dispatch| {
                    check_dispatch(&drone.capability, entry, base.location, dispatch, batch.len())
                        .err()
                        .map(|reason| (dispatch.id, reason))
                });
                match rejected {
                    Some((dispatch_id, reason)) => {
                        tracing::trace!(drone_id = %drone.id, dispatch_id, ?reason, "drone rejected");
                    }
                    None => available.push(drone.id.clone()),
                }
            }
        }

        tracing::debug!(
            batch_size = batch.len(),
            candidates = available.len(),
            "matched drones for batch"
        );
        Ok(available)
    }
}

fn check_dispatch(
    capability: &Capability,
    stationed: &DroneAvailability,
    base: Position,
    dispatch: &DispatchRequest,
    batch_size: usize,
) -> Result<(), Rejection> {
    let needs = &dispatch.requirements;
    if capability.capacity < needs.capacity {
        return Err(Rejection::Capacity);
    }
    if needs.cooling && !capability.cooling {
        return Err(Rejection::Cooling);
    }
    if needs.heating && !capability.heating {
        return Err(Rejection::Heating);
    }
    if !stationed
        .availability
        .iter()
        .any(|window| window.covers(dispatch.date, dispatch.time))
    {
        return Err(Rejection::Unavailable);
    }
    if let Some(max_cost) = needs.max_cost {
        let estimate = capability.trip_cost(estimated_moves(base, dispatch.delivery));
        if estimate / batch_size as f64 > max_cost {
            return Err(Rejection::Cost);
        }
    }
    Ok(())
}
