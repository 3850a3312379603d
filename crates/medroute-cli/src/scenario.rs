//! Reproducible random planning scenarios around central Edinburgh.

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate, NaiveTime, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use medroute_core::{
    AvailabilityWindow, CatalogSnapshot, Capability, DispatchRequest, Drone, DroneAvailability,
    Position, Region, Requirements, RestrictedZones, ServicePoint, ServicePointDrones,
};

/// Appleton Tower
const HUB: Position = Position {
    lng: -3.186_874,
    lat: 55.944_494,
};

/// Ocean Terminal
const NORTH_BASE: Position = Position {
    lng: -3.177_3,
    lat: 55.981_9,
};

/// Max delivery offset from the hub, in degrees.
const RADIUS_DEG: f64 = 0.01;

const DRONE_COUNT: usize = 6;
const CAPACITIES: [f64; 3] = [4.0, 8.0, 12.0];
const WORKING_DAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// A catalog snapshot plus dispatches to plan against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub catalog: CatalogSnapshot,
    pub dispatches: Vec<DispatchRequest>,
}

/// Generate a scenario with `dispatch_count` dispatches. The same seed
/// always gives the same scenario.
pub fn generate_scenario(seed: u64, dispatch_count: usize) -> Result<Scenario> {
    let mut rng = StdRng::seed_from_u64(seed);
    let catalog = generate_catalog(&mut rng)?;
    let zones = RestrictedZones::new(&catalog.restricted_areas)?;

    // 2025-12-22 is a Monday.
    let first_day = NaiveDate::from_ymd_opt(2025, 12, 22).context("scenario start date")?;
    let mut dispatches = Vec::with_capacity(dispatch_count);
    for id in 1..=dispatch_count as u64 {
        let date = first_day
            .checked_add_days(Days::new(rng.random_range(0..3)))
            .context("scenario date out of range")?;
        let minutes: u32 = rng.random_range(0..480);
        let time = NaiveTime::from_hms_opt(9 + minutes / 60, minutes % 60, 0)
            .context("scenario time out of range")?;

        dispatches.push(DispatchRequest {
            id,
            date,
            time,
            requirements: Requirements {
                capacity: round2(rng.random_range(0.5..4.0)),
                cooling: rng.random_bool(0.3),
                heating: rng.random_bool(0.2),
                max_cost: rng
                    .random_bool(0.5)
                    .then(|| round2(rng.random_range(10.0..40.0))),
            },
            delivery: random_delivery(&mut rng, &zones),
        });
    }

    Ok(Scenario {
        catalog,
        dispatches,
    })
}

fn generate_catalog(rng: &mut StdRng) -> Result<CatalogSnapshot> {
    let service_points = vec![
        ServicePoint {
            id: 1,
            name: "Appleton Tower".to_string(),
            location: HUB,
        },
        ServicePoint {
            id: 2,
            name: "Ocean Terminal".to_string(),
            location: NORTH_BASE,
        },
    ];

    let open = NaiveTime::from_hms_opt(8, 0, 0).context("opening time")?;
    let close = NaiveTime::from_hms_opt(18, 0, 0).context("closing time")?;
    let availability: Vec<AvailabilityWindow> = WORKING_DAYS
        .iter()
        .map(|&day_of_week| AvailabilityWindow {
            day_of_week,
            from: open,
            until: close,
        })
        .collect();

    let mut drones = Vec::with_capacity(DRONE_COUNT);
    let mut groups: Vec<ServicePointDrones> = service_points
        .iter()
        .map(|sp| ServicePointDrones {
            service_point_id: sp.id,
            drones: Vec::new(),
        })
        .collect();

    for index in 0..DRONE_COUNT {
        let id = (index + 1).to_string();
        drones.push(Drone {
            id: id.clone(),
            name: format!("Drone {id}"),
            capability: Capability {
                cooling: rng.random_bool(0.5),
                heating: rng.random_bool(0.5),
                capacity: CAPACITIES[rng.random_range(0..CAPACITIES.len())],
                max_moves: rng.random_range(1500..2500),
                cost_per_move: round2(rng.random_range(0.01..0.05)),
                cost_initial: round2(rng.random_range(1.0..5.0)),
                cost_final: round2(rng.random_range(1.0..7.0)),
            },
        });
        let slot = index % groups.len();
        groups[slot].drones.push(DroneAvailability {
            id,
            availability: availability.clone(),
        });
    }

    Ok(CatalogSnapshot {
        drones,
        service_points,
        drones_for_service_points: groups,
        restricted_areas: vec![george_square()],
    })
}

fn george_square() -> Region {
    let corner = |d_lng: f64, d_lat: f64| Position {
        lng: HUB.lng + d_lng,
        lat: HUB.lat + d_lat,
    };
    Region::new(
        "George Square Area",
        vec![
            corner(0.001, 0.001),
            corner(0.003, 0.001),
            corner(0.003, 0.002_5),
            corner(0.001, 0.002_5),
            corner(0.001, 0.001),
        ],
    )
}

fn random_delivery(rng: &mut StdRng, zones: &RestrictedZones) -> Position {
    loop {
        let candidate = Position {
            lng: HUB.lng + rng.random_range(-RADIUS_DEG..RADIUS_DEG),
            lat: HUB.lat + rng.random_range(-RADIUS_DEG..RADIUS_DEG),
        };
        if !zones.blocks_point(candidate) {
            return candidate;
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
