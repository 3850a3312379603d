//! Planar geometry in coordinate space: distances, compass moves, polygon
//! containment and segment intersection.
//!
//! Every function works on raw (lng, lat) degrees as a flat plane. This is
//! not geodesic; it matches how the dispatch registry measures moves.

use crate::error::GeometryError;
use crate::models::{Position, Region};

/// Length of one move in coordinate units.
pub const STEP: f64 = 0.00015;

/// Shared tolerance for collinearity and on-boundary tests.
pub const EPSILON: f64 = 1e-9;

/// Angle between neighbouring compass directions, in degrees.
pub const COMPASS_INCREMENT_DEG: f64 = 22.5;

/// Number of compass directions a drone may move along.
pub const DIRECTION_COUNT: usize = 16;

/// Euclidean distance between two positions.
pub fn distance(a: Position, b: Position) -> f64 {
    let d_lng = b.lng - a.lng;
    let d_lat = b.lat - a.lat;
    (d_lat * d_lat + d_lng * d_lng).sqrt()
}

/// True when the two positions are less than one move apart.
pub fn is_close(a: Position, b: Position) -> bool {
    distance(a, b) < STEP
}

/// Map an angle in degrees to its compass direction index (0 = east,
/// counting anticlockwise in 22.5° increments).
pub fn compass_index(angle_deg: f64) -> Result<usize, GeometryError> {
    let invalid = GeometryError::InvalidAngle { angle: angle_deg };
    if !angle_deg.is_finite() {
        return Err(invalid);
    }
    let quotient = angle_deg.rem_euclid(360.0) / COMPASS_INCREMENT_DEG;
    let rounded = quotient.round();
    if (quotient - rounded).abs() > EPSILON {
        return Err(invalid);
    }
    Ok(rounded as usize % DIRECTION_COUNT)
}

/// Unit vector `(d_lng, d_lat)` of compass direction `index`.
pub fn direction_vector(index: usize) -> (f64, f64) {
    let radians = (index as f64 * COMPASS_INCREMENT_DEG).to_radians();
    (radians.cos(), radians.sin())
}

/// Position reached by moving exactly one `STEP` along `angle_deg`.
pub fn step(start: Position, angle_deg: f64) -> Result<Position, GeometryError> {
    compass_index(angle_deg)?;
    let radians = angle_deg.to_radians();
    Ok(Position {
        lng: start.lng + STEP * radians.cos(),
        lat: start.lat + STEP * radians.sin(),
    })
}

/// True if `point` lies inside `region` or on its boundary.
pub fn contains(point: Position, region: &Region) -> Result<bool, GeometryError> {
    region.validate()?;
    Ok(ring_contains(point, &region.vertices))
}

/// True if the travel segment `from`-`to` touches or crosses any edge of
/// `region`.
pub fn crosses_region(from: Position, to: Position, region: &Region) -> Result<bool, GeometryError> {
    region.validate()?;
    Ok(ring_crossed_by(from, to, &region.vertices))
}

/// True if segment `a1`-`a2` and segment `b1`-`b2` share at least one point.
///
/// Proper crossings, collinear overlaps and endpoint touches all count.
pub fn segments_intersect(a1: Position, a2: Position, b1: Position, b2: Position) -> bool {
    let o1 = orient(a1, a2, b1);
    let o2 = orient(a1, a2, b2);
    let o3 = orient(b1, b2, a1);
    let o4 = orient(b1, b2, a2);

    if o1.abs() <= EPSILON && within_box(a1, a2, b1) {
        return true;
    }
    if o2.abs() <= EPSILON && within_box(a1, a2, b2) {
        return true;
    }
    if o3.abs() <= EPSILON && within_box(b1, b2, a1) {
        return true;
    }
    if o4.abs() <= EPSILON && within_box(b1, b2, a2) {
        return true;
    }

    let a_crosses = (o1 > EPSILON && o2 < -EPSILON) || (o1 < -EPSILON && o2 > EPSILON);
    let b_crosses = (o3 > EPSILON && o4 < -EPSILON) || (o3 < -EPSILON && o4 > EPSILON);
    a_crosses && b_crosses
}

/// True if `point` lies on segment `a`-`b` within `EPSILON`.
pub fn on_segment(point: Position, a: Position, b: Position) -> bool {
    orient(a, b, point).abs() <= EPSILON && within_box(a, b, point)
}

/// True if `point` lies on any edge of a closed ring.
pub fn on_boundary(point: Position, ring: &[Position]) -> bool {
    ring.windows(2).any(|edge| on_segment(point, edge[0], edge[1]))
}

/// Containment on a ring already known to be closed.
pub(crate) fn ring_contains(point: Position, ring: &[Position]) -> bool {
    if on_boundary(point, ring) {
        return true;
    }

    // Ray cast towards +lng. The closing duplicate makes `windows(2)` visit
    // every edge exactly once.
    let mut inside = false;
    for edge in ring.windows(2) {
        let (a, b) = (edge[0], edge[1]);
        if (a.lat > point.lat) != (b.lat > point.lat) {
            let lng_at = (b.lng - a.lng) * (point.lat - a.lat) / (b.lat - a.lat) + a.lng;
            if point.lng < lng_at {
                inside = !inside;
            }
        }
    }
    inside
}

pub(crate) fn ring_crossed_by(from: Position, to: Position, ring: &[Position]) -> bool {
    ring.windows(2)
        .any(|edge| segments_intersect(from, to, edge[0], edge[1]))
}

fn orient(p: Position, q: Position, r: Position) -> f64 {
    (q.lng - p.lng) * (r.lat - p.lat) - (q.lat - p.lat) * (r.lng - p.lng)
}

fn within(a: f64, b: f64, value: f64) -> bool {
    let min = a.min(b) - EPSILON;
    let max = a.max(b) + EPSILON;
    value >= min && value <= max
}

fn within_box(a: Position, b: Position, r: Position) -> bool {
    within(a.lng, b.lng, r.lng) && within(a.lat, b.lat, r.lat)
}

/// Axis-aligned bounds of a ring, padded by `EPSILON`.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_lng: f64,
    max_lng: f64,
    min_lat: f64,
    max_lat: f64,
}

impl Bounds {
    fn of(points: &[Position]) -> Self {
        let mut bounds = Self {
            min_lng: f64::INFINITY,
            max_lng: f64::NEG_INFINITY,
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
        };
        for p in points {
            bounds.min_lng = bounds.min_lng.min(p.lng - EPSILON);
            bounds.max_lng = bounds.max_lng.max(p.lng + EPSILON);
            bounds.min_lat = bounds.min_lat.min(p.lat - EPSILON);
            bounds.max_lat = bounds.max_lat.max(p.lat + EPSILON);
        }
        bounds
    }

    fn overlaps_segment(&self, a: Position, b: Position) -> bool {
        a.lng.max(b.lng) >= self.min_lng
            && a.lng.min(b.lng) <= self.max_lng
            && a.lat.max(b.lat) >= self.min_lat
            && a.lat.min(b.lat) <= self.max_lat
    }
}

#[derive(Debug, Clone)]
struct Zone {
    region: Region,
    bounds: Bounds,
}

/// A validated set of no-fly regions, ready for repeated move checks.
#[derive(Debug, Clone, Default)]
pub struct RestrictedZones {
    zones: Vec<Zone>,
}

impl RestrictedZones {
    /// Validate every region once so later checks cannot fail.
    pub fn new(regions: &[Region]) -> Result<Self, GeometryError> {
        let mut zones = Vec::with_capacity(regions.len());
        for region in regions {
            region.validate()?;
            zones.push(Zone {
                region: region.clone(),
                bounds: Bounds::of(&region.vertices),
            });
        }
        Ok(Self { zones })
    }

    /// True if `point` lies inside or on the boundary of any zone.
    pub fn blocks_point(&self, point: Position) -> bool {
        self.zones.iter().any(|zone| {
            zone.bounds.overlaps_segment(point, point)
                && ring_contains(point, &zone.region.vertices)
        })
    }

    /// True if moving from `from` to `to` ends inside a zone or touches
    /// any zone edge on the way.
    pub fn blocks_move(&self, from: Position, to: Position) -> bool {
        self.zones.iter().any(|zone| {
            zone.bounds.overlaps_segment(from, to)
                && (ring_contains(to, &zone.region.vertices)
                    || ring_crossed_by(from, to, &zone.region.vertices))
        })
    }
}
