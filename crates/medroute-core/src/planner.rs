//! Greedy per-date trip planning.
//!
//! For each date the planner repeatedly tries the largest prefix of the
//! pending dispatches that one drone can serve in a single outing, falling
//! back to single-dispatch trips when no batch of two or more works.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

use crate::cache::PathCache;
use crate::catalog::CatalogSnapshot;
use crate::error::PlanError;
use crate::feasibility::FeasibilityMatcher;
use crate::models::{Delivery, DispatchRequest, Drone, PlanResult, Position, ServicePoint, Trip};
use crate::pathfinder::{Pathfinder, SearchConfig};
use crate::spatial::{distance, RestrictedZones};

/// Plans trips against one catalog snapshot.
///
/// The planner itself is immutable; every [`TripPlanner::plan`] call owns
/// its own path cache and pending lists.
#[derive(Debug, Clone)]
pub struct TripPlanner<'a> {
    catalog: &'a CatalogSnapshot,
    zones: RestrictedZones,
    config: SearchConfig,
}

impl<'a> TripPlanner<'a> {
    /// Validate the snapshot and its restricted areas.
    pub fn new(catalog: &'a CatalogSnapshot, config: SearchConfig) -> Result<Self, PlanError> {
        catalog.validate()?;
        let zones = RestrictedZones::new(&catalog.restricted_areas)?;
        Ok(Self {
            catalog,
            zones,
            config,
        })
    }

    /// Plan every dispatch. Dates are planned independently, in ascending
    /// order.
    pub fn plan(&self, dispatches: &[DispatchRequest]) -> Result<PlanResult, PlanError> {
        for dispatch in dispatches {
            dispatch.delivery.validate()?;
        }

        let mut by_date: BTreeMap<NaiveDate, Vec<DispatchRequest>> = BTreeMap::new();
        for dispatch in dispatches {
            by_date.entry(dispatch.date).or_default().push(dispatch.clone());
        }

        let matcher = FeasibilityMatcher::new(self.catalog);
        let mut cache = PathCache::new();
        let mut result = PlanResult::default();

        for (date, mut pending) in by_date {
            tracing::debug!(%date, dispatches = pending.len(), "planning date");

            while !pending.is_empty() {
                if let Some(trip) = self.plan_best_batch(&mut cache, &matcher, &pending)? {
                    let served: HashSet<u64> =
                        trip.deliveries.iter().map(|d| d.delivery_id).collect();
                    pending.retain(|dispatch| !served.contains(&dispatch.id));
                    log_trip(&trip);
                    result.record(trip);
                    continue;
                }

                let dispatch = pending.remove(0);
                let candidates = matcher.available_drones(std::slice::from_ref(&dispatch))?;
                let trip = match candidates.first() {
                    Some(drone_id) => self.plan_single_trip(&mut cache, drone_id, &dispatch)?,
                    None => None,
                };
                match trip {
                    Some(trip) => {
                        log_trip(&trip);
                        result.record(trip);
                    }
                    None => {
                        tracing::warn!(
                            dispatch_id = dispatch.id,
                            %date,
                            candidates = candidates.len(),
                            "dispatch cannot be served and was dropped"
                        );
                        result.unserviceable.push(dispatch.id);
                    }
                }
            }
        }

        tracing::debug!(
            trips = result.trips.len(),
            cached_paths = cache.len(),
            cache_hits = cache.hits(),
            cache_misses = cache.misses(),
            "planning finished"
        );
        Ok(result)
    }

    /// Largest leading batch (at least two dispatches) some drone can fly.
    fn plan_best_batch(
        &self,
        cache: &mut PathCache,
        matcher: &FeasibilityMatcher<'_>,
        pending: &[DispatchRequest],
    ) -> Result<Option<Trip>, PlanError> {
        for count in (2..=pending.len()).rev() {
            let batch = &pending[..count];
            let candidates = matcher.available_drones(batch)?;
            let Some(drone_id) = candidates.first() else {
                continue;
            };
            if let Some(trip) = self.plan_multi_stop_trip(cache, drone_id, batch)? {
                return Ok(Some(trip));
            }
            tracing::debug!(drone_id = %drone_id, count, "batch trip rejected");
        }
        Ok(None)
    }

    /// Out-and-back trip serving one dispatch with `drone_id`.
    ///
    /// Returns `Ok(None)` when a leg is unreachable, the trip exceeds the
    /// drone's move budget, or it costs more than the dispatch allows.
    pub fn plan_single_trip(
        &self,
        cache: &mut PathCache,
        drone_id: &str,
        dispatch: &DispatchRequest,
    ) -> Result<Option<Trip>, PlanError> {
        let Some((drone, base)) = self.resolve(drone_id)? else {
            return Ok(None);
        };
        let finder = self.pathfinder();
        let home = base.location;

        let outbound = leg(cache, &finder, home, dispatch.delivery);
        let Some(&delivery_point) = outbound.last() else {
            return Ok(None);
        };
        let inbound = leg(cache, &finder, delivery_point, home);
        if inbound.is_empty() {
            return Ok(None);
        }

        let mut flight_path = outbound;
        flight_path.push(delivery_point);
        flight_path.extend(inbound.iter().skip(1).copied());
        close_loop(&mut flight_path, home);

        let moves = move_count(&flight_path);
        if moves > drone.capability.max_moves {
            return Ok(None);
        }
        let cost = drone.capability.trip_cost(moves);
        if dispatch.requirements.max_cost.is_some_and(|max| cost > max) {
            return Ok(None);
        }

        Ok(Some(Trip {
            drone_id: drone.id.clone(),
            service_point: base.clone(),
            deliveries: vec![Delivery {
                delivery_id: dispatch.id,
                flight_path,
            }],
            total_cost: cost,
            total_moves: moves,
        }))
    }

    /// One outing visiting every dispatch of `batch`, nearest stop first.
    ///
    /// The trip cost is split evenly over the batch; every dispatch with a
    /// `max_cost` must accept its share.
    pub fn plan_multi_stop_trip(
        &self,
        cache: &mut PathCache,
        drone_id: &str,
        batch: &[DispatchRequest],
    ) -> Result<Option<Trip>, PlanError> {
        if batch.is_empty() {
            return Ok(None);
        }
        let Some((drone, base)) = self.resolve(drone_id)? else {
            return Ok(None);
        };
        let finder = self.pathfinder();
        let home = base.location;

        let stops = order_by_proximity(home, batch);
        let last_stop = stops.len() - 1;
        let mut deliveries = Vec::with_capacity(stops.len());
        let mut current = home;
        let mut total_moves = 0u32;

        for (idx, dispatch) in stops.into_iter().enumerate() {
            let approach = leg(cache, &finder, current, dispatch.delivery);
            let Some(&target) = approach.last() else {
                return Ok(None);
            };

            let mut flight_path = approach;
            flight_path.push(target);
            if idx == last_stop {
                let inbound = leg(cache, &finder, target, home);
                if inbound.is_empty() {
                    return Ok(None);
                }
                flight_path.extend(inbound.iter().skip(1).copied());
                close_loop(&mut flight_path, home);
            }

            total_moves += move_count(&flight_path);
            deliveries.push(Delivery {
                delivery_id: dispatch.id,
                flight_path,
            });
            current = target;
        }

        if total_moves > drone.capability.max_moves {
            return Ok(None);
        }
        let total_cost = drone.capability.trip_cost(total_moves);
        let share = total_cost / batch.len() as f64;
        if batch
            .iter()
            .any(|d| d.requirements.max_cost.is_some_and(|max| share > max))
        {
            return Ok(None);
        }

        Ok(Some(Trip {
            drone_id: drone.id.clone(),
            service_point: base.clone(),
            deliveries,
            total_cost,
            total_moves,
        }))
    }

    fn pathfinder(&self) -> Pathfinder<'_> {
        Pathfinder::new(&self.zones, self.config.clone())
    }

    /// The drone and its base. An unknown drone is an error; a drone that
    /// is not stationed anywhere simply cannot fly.
    fn resolve(&self, drone_id: &str) -> Result<Option<(&'a Drone, &'a ServicePoint)>, PlanError> {
        let catalog: &'a CatalogSnapshot = self.catalog;
        let drone = catalog
            .drone(drone_id)
            .ok_or_else(|| PlanError::UnknownDrone {
                drone_id: drone_id.to_string(),
            })?;
        match catalog.base_for(drone_id)? {
            Some(base) => Ok(Some((drone, base))),
            None => {
                tracing::debug!(drone_id, "drone has no service point");
                Ok(None)
            }
        }
    }
}

fn leg(cache: &mut PathCache, finder: &Pathfinder<'_>, from: Position, to: Position) -> Vec<Position> {
    cache.get_or_compute(from, to, |start, goal| finder.find_path(start, goal))
}

fn close_loop(path: &mut Vec<Position>, home: Position) {
    if path.last() != Some(&home) {
        path.push(home);
    }
}

fn move_count(path: &[Position]) -> u32 {
    path.len().saturating_sub(1) as u32
}

/// Nearest-unvisited-neighbour order starting from `start`. Ties go to the
/// dispatch listed first.
pub fn order_by_proximity(start: Position, batch: &[DispatchRequest]) -> Vec<&DispatchRequest> {
    let mut remaining: Vec<&DispatchRequest> = batch.iter().collect();
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut current = start;

    while !remaining.is_empty() {
        let mut nearest = 0;
        for (idx, candidate) in remaining.iter().enumerate().skip(1) {
            if distance(current, candidate.delivery) < distance(current, remaining[nearest].delivery) {
                nearest = idx;
            }
        }
        let next = remaining.remove(nearest);
        current = next.delivery;
        ordered.push(next);
    }
    ordered
}

fn log_trip(trip: &Trip) {
    tracing::info!(
        drone_id = %trip.drone_id,
        service_point = trip.service_point.id,
        deliveries = trip.deliveries.len(),
        moves = trip.total_moves,
        cost = trip.total_cost,
        "trip planned"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AvailabilityWindow, Capability, DroneAvailability, Requirements, ServicePointDrones,
    };
    use chrono::{NaiveTime, Weekday};

    fn pos(lng: f64, lat: f64) -> Position {
        Position { lng, lat }
    }

    fn dispatch(id: u64, delivery: Position) -> DispatchRequest {
        DispatchRequest {
            id,
            date: NaiveDate::from_ymd_opt(2025, 12, 22).unwrap(),
            time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            requirements: Requirements::default(),
            delivery,
        }
    }

    fn catalog() -> CatalogSnapshot {
        CatalogSnapshot {
            drones: vec![
                Drone {
                    id: "d1".to_string(),
                    name: "Stationed".to_string(),
                    capability: Capability {
                        cooling: false,
                        heating: false,
                        capacity: 4.0,
                        max_moves: 500,
                        cost_per_move: 0.01,
                        cost_initial: 1.0,
                        cost_final: 1.0,
                    },
                },
                Drone {
                    id: "spare".to_string(),
                    name: "Unstationed".to_string(),
                    capability: Capability {
                        cooling: false,
                        heating: false,
                        capacity: 4.0,
                        max_moves: 500,
                        cost_per_move: 0.01,
                        cost_initial: 1.0,
                        cost_final: 1.0,
                    },
                },
            ],
            service_points: vec![ServicePoint {
                id: 1,
                name: "Base".to_string(),
                location: pos(0.0, 0.0),
            }],
            drones_for_service_points: vec![ServicePointDrones {
                service_point_id: 1,
                drones: vec![DroneAvailability {
                    id: "d1".to_string(),
                    availability: vec![AvailabilityWindow {
                        day_of_week: Weekday::Mon,
                        from: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                        until: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
                    }],
                }],
            }],
            restricted_areas: Vec::new(),
        }
    }

    #[test]
    fn proximity_order_is_greedy_from_start() {
        let batch = vec![
            dispatch(1, pos(0.010, 0.0)),
            dispatch(2, pos(0.002, 0.0)),
            dispatch(3, pos(0.006, 0.0)),
        ];
        let order: Vec<u64> = order_by_proximity(pos(0.0, 0.0), &batch)
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn proximity_ties_keep_input_order() {
        let batch = vec![dispatch(1, pos(0.0, 0.002)), dispatch(2, pos(0.0, -0.002))];
        let order: Vec<u64> = order_by_proximity(pos(0.0, 0.0), &batch)
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn single_trip_leaves_and_returns_to_base() {
        let catalog = catalog();
        let planner = TripPlanner::new(&catalog, SearchConfig::default()).unwrap();
        let mut cache = PathCache::new();
        let trip = planner
            .plan_single_trip(&mut cache, "d1", &dispatch(9, pos(0.002_95, 0.0)))
            .unwrap()
            .unwrap();

        let path = &trip.deliveries[0].flight_path;
        assert_eq!(path.first(), Some(&pos(0.0, 0.0)));
        assert_eq!(path.last(), Some(&pos(0.0, 0.0)));
        // Outbound is 20 points; the delivery point is then repeated.
        assert_eq!(path[19], path[20]);
        assert_eq!(trip.total_moves as usize, path.len() - 1);
        assert_eq!(trip.total_cost, 2.0 + f64::from(trip.total_moves) * 0.01);
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn single_trip_respects_max_cost_and_moves() {
        let catalog = catalog();
        let planner = TripPlanner::new(&catalog, SearchConfig::default()).unwrap();
        let mut cache = PathCache::new();

        let mut pricey = dispatch(1, pos(0.002_95, 0.0));
        pricey.requirements.max_cost = Some(2.1);
        assert_eq!(
            planner.plan_single_trip(&mut cache, "d1", &pricey).unwrap(),
            None
        );

        // About 530 moves out and back exceeds the 500 move budget.
        let far = dispatch(2, pos(0.04, 0.0));
        assert_eq!(planner.plan_single_trip(&mut cache, "d1", &far).unwrap(), None);
    }

    #[test]
    fn unknown_and_unstationed_drones() {
        let catalog = catalog();
        let planner = TripPlanner::new(&catalog, SearchConfig::default()).unwrap();
        let mut cache = PathCache::new();
        let job = dispatch(1, pos(0.001, 0.0));

        assert_eq!(
            planner.plan_single_trip(&mut cache, "ghost", &job),
            Err(PlanError::UnknownDrone {
                drone_id: "ghost".to_string()
            })
        );
        assert_eq!(planner.plan_single_trip(&mut cache, "spare", &job), Ok(None));
    }

    #[test]
    fn multi_stop_trip_returns_only_from_last_stop() {
        let catalog = catalog();
        let planner = TripPlanner::new(&catalog, SearchConfig::default()).unwrap();
        let mut cache = PathCache::new();
        let batch = vec![dispatch(1, pos(0.003, 0.001)), dispatch(2, pos(0.001, 0.0))];

        let trip = planner
            .plan_multi_stop_trip(&mut cache, "d1", &batch)
            .unwrap()
            .unwrap();

        let ids: Vec<u64> = trip.deliveries.iter().map(|d| d.delivery_id).collect();
        assert_eq!(ids, vec![2, 1]);

        let first = &trip.deliveries[0].flight_path;
        let second = &trip.deliveries[1].flight_path;
        assert_eq!(first.first(), Some(&pos(0.0, 0.0)));
        assert_ne!(first.last(), Some(&pos(0.0, 0.0)));
        assert_eq!(second.first(), first.last());
        assert_eq!(second.last(), Some(&pos(0.0, 0.0)));

        let summed = (first.len() - 1 + second.len() - 1) as u32;
        assert_eq!(trip.total_moves, summed);
    }

    #[test]
    fn single_stop_batch_matches_single_trip() {
        let catalog = catalog();
        let planner = TripPlanner::new(&catalog, SearchConfig::default()).unwrap();
        let mut cache = PathCache::new();
        let job = dispatch(4, pos(0.002_95, 0.001));

        let single = planner
            .plan_single_trip(&mut cache, "d1", &job)
            .unwrap()
            .unwrap();
        let batched = planner
            .plan_multi_stop_trip(&mut cache, "d1", std::slice::from_ref(&job))
            .unwrap()
            .unwrap();

        assert_eq!(batched, single);
        let path = &batched.deliveries[0].flight_path;
        assert_eq!(path.first(), Some(&pos(0.0, 0.0)));
        assert_eq!(path.last(), Some(&pos(0.0, 0.0)));
    }

    #[test]
    fn multi_stop_trip_over_move_budget_is_rejected() {
        let catalog = catalog();
        let planner = TripPlanner::new(&catalog, SearchConfig::default()).unwrap();
        let mut cache = PathCache::new();
        let east = dispatch(1, pos(0.02, 0.0));
        let west = dispatch(2, pos(-0.02, 0.0));

        // Each stop alone is about 270 moves; both together need about 535.
        for job in [&east, &west] {
            let trip = planner
                .plan_single_trip(&mut cache, "d1", job)
                .unwrap()
                .unwrap();
            assert!(trip.total_moves <= 500);
        }
        assert_eq!(
            planner.plan_multi_stop_trip(&mut cache, "d1", &[east, west]),
            Ok(None)
        );
    }

    #[test]
    fn multi_stop_trip_checks_each_cost_share() {
        let catalog = catalog();
        let planner = TripPlanner::new(&catalog, SearchConfig::default()).unwrap();
        let mut cache = PathCache::new();
        let mut near = dispatch(1, pos(0.001, 0.0));
        let mut further = dispatch(2, pos(0.002, 0.0));

        // The trip costs about 2.3, so each share is about 1.15.
        near.requirements.max_cost = Some(2.0);
        further.requirements.max_cost = Some(2.0);
        assert_eq!(planner.plan_single_trip(&mut cache, "d1", &near), Ok(None));
        let trip = planner
            .plan_multi_stop_trip(&mut cache, "d1", &[near.clone(), further.clone()])
            .unwrap()
            .unwrap();
        assert!(trip.total_cost / 2.0 <= 2.0);

        further.requirements.max_cost = Some(1.0);
        assert_eq!(
            planner.plan_multi_stop_trip(&mut cache, "d1", &[near, further]),
            Ok(None)
        );
    }

    #[test]
    fn invalid_delivery_position_fails_the_call() {
        let catalog = catalog();
        let planner = TripPlanner::new(&catalog, SearchConfig::default()).unwrap();
        let result = planner.plan(&[dispatch(1, pos(200.0, 0.0))]);
        assert!(matches!(result, Err(PlanError::Geometry(_))));
    }
}
