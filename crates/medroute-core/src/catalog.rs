//! Read-only catalog snapshot consumed by a planning call.
//!
//! The snapshot is fetched by the caller before planning starts; nothing in
//! here performs I/O.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::PlanError;
use crate::models::{Drone, Region, ServicePoint, ServicePointDrones};

/// Tolerance for numeric attribute equality in catalog queries.
const QUERY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub drones: Vec<Drone>,
    #[serde(default)]
    pub service_points: Vec<ServicePoint>,
    /// Which drones are stationed where, with their availability.
    #[serde(default)]
    pub drones_for_service_points: Vec<ServicePointDrones>,
    #[serde(default)]
    pub restricted_areas: Vec<Region>,
}

impl CatalogSnapshot {
    /// Check cross references between the catalog lists.
    ///
    /// Any failure here is an upstream data contract violation and aborts
    /// planning.
    pub fn validate(&self) -> Result<(), PlanError> {
        for point in &self.service_points {
            point.location.validate()?;
        }
        for region in &self.restricted_areas {
            region.validate()?;
        }

        let mut assigned: HashSet<&str> = HashSet::new();
        for group in &self.drones_for_service_points {
            if self.service_point(group.service_point_id).is_none() {
                return Err(PlanError::UnknownServicePoint {
                    service_point_id: group.service_point_id,
                });
            }
            for entry in &group.drones {
                if self.drone(&entry.id).is_none() {
                    return Err(PlanError::UnknownDrone {
                        drone_id: entry.id.clone(),
                    });
                }
                if !assigned.insert(entry.id.as_str()) {
                    return Err(PlanError::DuplicateAssignment {
                        drone_id: entry.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn drone(&self, id: &str) -> Option<&Drone> {
        self.drones.iter().find(|drone| drone.id == id)
    }

    pub fn service_point(&self, id: u64) -> Option<&ServicePoint> {
        self.service_points.iter().find(|point| point.id == id)
    }

    /// The service point a drone is stationed at, if it is stationed at all.
    pub fn base_for(&self, drone_id: &str) -> Result<Option<&ServicePoint>, PlanError> {
        let Some(group) = self
            .drones_for_service_points
            .iter()
            .find(|group| group.drones.iter().any(|d| d.id == drone_id))
        else {
            return Ok(None);
        };
        self.service_point(group.service_point_id)
            .map(Some)
            .ok_or(PlanError::UnknownServicePoint {
                service_point_id: group.service_point_id,
            })
    }

    /// Ids of drones whose cooling flag equals `state`.
    pub fn drones_with_cooling(&self, state: bool) -> Vec<String> {
        self.drones
            .iter()
            .filter(|drone| drone.capability.cooling == state)
            .map(|drone| drone.id.clone())
            .collect()
    }

    /// Ids of drones whose `attribute` equals `value`.
    ///
    /// Numbers compare within a small tolerance, booleans are parsed and
    /// text compares case-insensitively. Unknown attributes match nothing.
    pub fn query_attribute(&self, attribute: &str, value: &str) -> Vec<String> {
        let criterion = QueryCriterion {
            attribute: attribute.to_string(),
            operator: QueryOperator::Eq,
            value: value.to_string(),
        };
        self.query(std::slice::from_ref(&criterion))
    }

    /// Ids of drones matching every criterion.
    pub fn query(&self, criteria: &[QueryCriterion]) -> Vec<String> {
        self.drones
            .iter()
            .filter(|drone| criteria.iter().all(|criterion| criterion.matches(drone)))
            .map(|drone| drone.id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
}

/// One `{attribute, operator, value}` filter on the drone catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCriterion {
    pub attribute: String,
    pub operator: QueryOperator,
    pub value: String,
}

enum AttributeValue<'a> {
    Number(f64),
    Flag(bool),
    Text(&'a str),
}

fn attribute<'a>(drone: &'a Drone, name: &str) -> Option<AttributeValue<'a>> {
    let capability = &drone.capability;
    let value = match name {
        "id" => AttributeValue::Text(&drone.id),
        "name" => AttributeValue::Text(&drone.name),
        "cooling" => AttributeValue::Flag(capability.cooling),
        "heating" => AttributeValue::Flag(capability.heating),
        "capacity" => AttributeValue::Number(capability.capacity),
        "maxMoves" => AttributeValue::Number(f64::from(capability.max_moves)),
        "costPerMove" => AttributeValue::Number(capability.cost_per_move),
        "costInitial" => AttributeValue::Number(capability.cost_initial),
        "costFinal" => AttributeValue::Number(capability.cost_final),
        _ => return None,
    };
    Some(value)
}

impl QueryCriterion {
    pub fn matches(&self, drone: &Drone) -> bool {
        let Some(found) = attribute(drone, &self.attribute) else {
            return false;
        };
        match found {
            AttributeValue::Number(actual) => {
                let Ok(expected) = self.value.trim().parse::<f64>() else {
                    return false;
                };
                match self.operator {
                    QueryOperator::Eq => (actual - expected).abs() < QUERY_EPSILON,
                    QueryOperator::Ne => (actual - expected).abs() >= QUERY_EPSILON,
                    QueryOperator::Lt => actual < expected,
                    QueryOperator::Gt => actual > expected,
                }
            }
            AttributeValue::Flag(actual) => {
                self.operator == QueryOperator::Eq
                    && actual == self.value.trim().eq_ignore_ascii_case("true")
            }
            AttributeValue::Text(actual) => {
                self.operator == QueryOperator::Eq && actual.eq_ignore_ascii_case(self.value.trim())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Capability, DroneAvailability, Position};

    fn drone(id: &str, cooling: bool, capacity: f64) -> Drone {
        Drone {
            id: id.to_string(),
            name: format!("Drone {id}"),
            capability: Capability {
                cooling,
                heating: !cooling,
                capacity,
                max_moves: 1000,
                cost_per_move: 0.01,
                cost_initial: 1.0,
                cost_final: 1.0,
            },
        }
    }

    fn catalog() -> CatalogSnapshot {
        CatalogSnapshot {
            drones: vec![drone("1", true, 4.0), drone("2", false, 8.0), drone("3", true, 12.0)],
            service_points: vec![ServicePoint {
                id: 1,
                name: "Appleton Tower".to_string(),
                location: Position {
                    lng: -3.186_358,
                    lat: 55.944_680,
                },
            }],
            drones_for_service_points: vec![ServicePointDrones {
                service_point_id: 1,
                drones: vec![
                    DroneAvailability {
                        id: "1".to_string(),
                        availability: Vec::new(),
                    },
                    DroneAvailability {
                        id: "2".to_string(),
                        availability: Vec::new(),
                    },
                ],
            }],
            restricted_areas: Vec::new(),
        }
    }

    #[test]
    fn validate_accepts_consistent_snapshot() {
        assert_eq!(catalog().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_unknown_service_point() {
        let mut snapshot = catalog();
        snapshot.drones_for_service_points[0].service_point_id = 99;
        assert_eq!(
            snapshot.validate(),
            Err(PlanError::UnknownServicePoint {
                service_point_id: 99
            })
        );
    }

    #[test]
    fn validate_rejects_unknown_and_duplicate_drones() {
        let mut snapshot = catalog();
        snapshot.drones_for_service_points[0]
            .drones
            .push(DroneAvailability {
                id: "ghost".to_string(),
                availability: Vec::new(),
            });
        assert!(matches!(
            snapshot.validate(),
            Err(PlanError::UnknownDrone { .. })
        ));

        let mut snapshot = catalog();
        let repeated = snapshot.drones_for_service_points[0].drones[0].clone();
        snapshot.drones_for_service_points[0].drones.push(repeated);
        assert!(matches!(
            snapshot.validate(),
            Err(PlanError::DuplicateAssignment { .. })
        ));
    }

    #[test]
    fn base_for_finds_owning_service_point() {
        let snapshot = catalog();
        assert_eq!(snapshot.base_for("1").unwrap().map(|sp| sp.id), Some(1));
        assert_eq!(snapshot.base_for("3").unwrap(), None);
    }

    #[test]
    fn cooling_filter() {
        let snapshot = catalog();
        assert_eq!(snapshot.drones_with_cooling(true), vec!["1", "3"]);
        assert_eq!(snapshot.drones_with_cooling(false), vec!["2"]);
    }

    #[test]
    fn attribute_queries() {
        let snapshot = catalog();
        assert_eq!(snapshot.query_attribute("capacity", "8"), vec!["2"]);
        assert_eq!(snapshot.query_attribute("cooling", "TRUE"), vec!["1", "3"]);
        assert_eq!(snapshot.query_attribute("name", "drone 3"), vec!["3"]);
        assert!(snapshot.query_attribute("wingspan", "3").is_empty());
        assert!(snapshot.query_attribute("capacity", "lots").is_empty());
    }

    #[test]
    fn combined_criteria() {
        let snapshot = catalog();
        let criteria: Vec<QueryCriterion> = serde_json::from_str(
            r#"[
                {"attribute": "capacity", "operator": ">", "value": "5"},
                {"attribute": "cooling", "operator": "=", "value": "true"}
            ]"#,
        )
        .unwrap();
        assert_eq!(snapshot.query(&criteria), vec!["3"]);

        let not_eight = QueryCriterion {
            attribute: "capacity".to_string(),
            operator: QueryOperator::Ne,
            value: "8".to_string(),
        };
        assert_eq!(snapshot.query(&[not_eight]), vec!["1", "3"]);

        let flag_lt = QueryCriterion {
            attribute: "cooling".to_string(),
            operator: QueryOperator::Lt,
            value: "true".to_string(),
        };
        assert!(snapshot.query(&[flag_lt]).is_empty());
    }
}
