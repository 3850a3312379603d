//! Obstacle-aware best-first search over the 16-direction move graph.
//!
//! Nodes are the positions reachable from the start by whole compass moves.
//! A node is keyed by its [`LatticePoint`], the net number of moves taken
//! along each of the eight direction axes. The 16th roots of unity
//! `ζ^0..ζ^7` are linearly independent over the rationals, so two move
//! sequences end at the same point exactly when their net counts agree;
//! the key is exact and never depends on floating-point rounding.

use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use crate::error::GeometryError;
use crate::models::{Position, Region};
use crate::spatial::{direction_vector, distance, is_close, RestrictedZones, DIRECTION_COUNT, STEP};

const AXIS_COUNT: usize = DIRECTION_COUNT / 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    /// Weight applied to the straight-line distance estimate. Values above
    /// 1.0 make the search greedier and no longer shortest-path optimal.
    pub heuristic_multiplier: f64,
    /// Node expansions allowed before the search gives up.
    pub max_expansions: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            heuristic_multiplier: 1.5,
            max_expansions: 50_000,
        }
    }
}

/// Outcome of a single search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSearchResult {
    /// Start through to a point close to the goal; empty if unreachable.
    pub path: Vec<Position>,
    pub nodes_expanded: usize,
    /// True if the search stopped on the expansion limit.
    pub hit_expansion_limit: bool,
}

/// Net move counts along the eight direction axes `0°, 22.5°, .., 157.5°`.
/// A move along direction `k + 8` counts as `-1` on axis `k`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LatticePoint([i32; AXIS_COUNT]);

impl LatticePoint {
    pub fn neighbor(self, direction: usize) -> Self {
        let mut counts = self.0;
        let axis = direction % AXIS_COUNT;
        if direction < AXIS_COUNT {
            counts[axis] += 1;
        } else {
            counts[axis] -= 1;
        }
        Self(counts)
    }

    /// Canonical position of this lattice point relative to `origin`.
    pub fn to_position(self, origin: Position, axes: &[(f64, f64); AXIS_COUNT]) -> Position {
        let mut d_lng = 0.0;
        let mut d_lat = 0.0;
        for (count, (axis_lng, axis_lat)) in self.0.iter().zip(axes.iter()) {
            let count = f64::from(*count);
            d_lng += count * axis_lng;
            d_lat += count * axis_lat;
        }
        Position {
            lng: origin.lng + STEP * d_lng,
            lat: origin.lat + STEP * d_lat,
        }
    }
}

fn axis_vectors() -> [(f64, f64); AXIS_COUNT] {
    let mut axes = [(0.0, 0.0); AXIS_COUNT];
    for (index, axis) in axes.iter_mut().enumerate() {
        *axis = direction_vector(index);
    }
    axes
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug)]
struct Node {
    key: LatticePoint,
    position: Position,
    steps: u32,
    h_score: f64,
    parent: Option<usize>,
    closed: bool,
}

/// Heap entry. Entries are never updated in place; a relaxed node gets a
/// fresh entry and the old one is skipped when popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenEntry {
    f_score: FloatOrd,
    sequence: u64,
    node: usize,
    steps: u32,
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// Path search against a fixed set of restricted zones.
#[derive(Debug, Clone)]
pub struct Pathfinder<'z> {
    zones: &'z RestrictedZones,
    config: SearchConfig,
    axes: [(f64, f64); AXIS_COUNT],
}

impl<'z> Pathfinder<'z> {
    pub fn new(zones: &'z RestrictedZones, config: SearchConfig) -> Self {
        Self {
            zones,
            config,
            axes: axis_vectors(),
        }
    }

    /// Path from `start` to a point within one move of `goal`, or an empty
    /// path if none was found.
    pub fn find_path(&self, start: Position, goal: Position) -> Vec<Position> {
        self.search(start, goal).path
    }

    pub fn search(&self, start: Position, goal: Position) -> PathSearchResult {
        if self.zones.blocks_point(start) || self.zones.blocks_point(goal) {
            tracing::debug!(?start, ?goal, "start or goal lies in a restricted zone");
            return PathSearchResult {
                path: Vec::new(),
                nodes_expanded: 0,
                hit_expansion_limit: false,
            };
        }

        let multiplier = self.config.heuristic_multiplier;
        let mut nodes: Vec<Node> = Vec::new();
        let mut index: HashMap<LatticePoint, usize> = HashMap::new();
        let mut open_set: BinaryHeap<Reverse<OpenEntry>> = BinaryHeap::new();
        let mut sequence = 0u64;

        let start_h = distance(start, goal) * multiplier;
        nodes.push(Node {
            key: LatticePoint::default(),
            position: start,
            steps: 0,
            h_score: start_h,
            parent: None,
            closed: false,
        });
        index.insert(LatticePoint::default(), 0);
        open_set.push(Reverse(OpenEntry {
            f_score: FloatOrd(start_h),
            sequence,
            node: 0,
            steps: 0,
        }));

        let mut nodes_expanded = 0usize;
        while let Some(Reverse(entry)) = open_set.pop() {
            let current = &nodes[entry.node];
            if current.closed || entry.steps != current.steps {
                continue;
            }
            if nodes_expanded >= self.config.max_expansions {
                tracing::debug!(nodes_expanded, "path search hit expansion limit");
                return PathSearchResult {
                    path: Vec::new(),
                    nodes_expanded,
                    hit_expansion_limit: true,
                };
            }
            nodes_expanded += 1;

            if is_close(current.position, goal) {
                return PathSearchResult {
                    path: rebuild_path(&nodes, entry.node),
                    nodes_expanded,
                    hit_expansion_limit: false,
                };
            }

            let current_key = current.key;
            let current_position = current.position;
            let tentative_steps = current.steps + 1;
            nodes[entry.node].closed = true;

            for direction in 0..DIRECTION_COUNT {
                let next_key = current_key.neighbor(direction);
                let existing = index.get(&next_key).copied();
                if existing.is_some_and(|i| nodes[i].closed) {
                    continue;
                }

                let next_position = next_key.to_position(start, &self.axes);
                if self.zones.blocks_move(current_position, next_position) {
                    continue;
                }

                let node_idx = match existing {
                    None => {
                        nodes.push(Node {
                            key: next_key,
                            position: next_position,
                            steps: tentative_steps,
                            h_score: distance(next_position, goal) * multiplier,
                            parent: Some(entry.node),
                            closed: false,
                        });
                        let idx = nodes.len() - 1;
                        index.insert(next_key, idx);
                        idx
                    }
                    Some(idx) if tentative_steps < nodes[idx].steps => {
                        nodes[idx].steps = tentative_steps;
                        nodes[idx].parent = Some(entry.node);
                        idx
                    }
                    Some(_) => continue,
                };

                sequence += 1;
                let node = &nodes[node_idx];
                open_set.push(Reverse(OpenEntry {
                    f_score: FloatOrd(f64::from(node.steps) * STEP + node.h_score),
                    sequence,
                    node: node_idx,
                    steps: node.steps,
                }));
            }
        }

        tracing::debug!(nodes_expanded, "open set exhausted without reaching goal");
        PathSearchResult {
            path: Vec::new(),
            nodes_expanded,
            hit_expansion_limit: false,
        }
    }
}

fn rebuild_path(nodes: &[Node], target: usize) -> Vec<Position> {
    let mut path = Vec::new();
    let mut current = Some(target);
    while let Some(idx) = current {
        path.push(nodes[idx].position);
        current = nodes[idx].parent;
    }
    path.reverse();
    path
}

/// One-off search with the default configuration.
pub fn find_path(
    start: Position,
    goal: Position,
    restricted: &[Region],
) -> Result<Vec<Position>, GeometryError> {
    let zones = RestrictedZones::new(restricted)?;
    Ok(Pathfinder::new(&zones, SearchConfig::default()).find_path(start, goal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(lng: f64, lat: f64) -> Position {
        Position { lng, lat }
    }

    #[test]
    fn opposite_moves_cancel_exactly() {
        let origin = LatticePoint::default();
        for direction in 0..AXIS_COUNT {
            let back = origin.neighbor(direction).neighbor(direction + AXIS_COUNT);
            assert_eq!(back, origin);
        }
    }

    #[test]
    fn move_order_does_not_change_the_key() {
        let a = LatticePoint::default().neighbor(1).neighbor(3).neighbor(14);
        let b = LatticePoint::default().neighbor(14).neighbor(1).neighbor(3);
        assert_eq!(a, b);
    }

    #[test]
    fn lattice_position_matches_single_step() {
        let axes = axis_vectors();
        let origin = pos(-3.1869, 55.9445);
        for direction in 0..DIRECTION_COUNT {
            let via_lattice = LatticePoint::default()
                .neighbor(direction)
                .to_position(origin, &axes);
            let via_step =
                crate::spatial::step(origin, direction as f64 * 22.5).unwrap();
            assert!(distance(via_lattice, via_step) < 1e-12, "direction {direction}");
        }
    }

    #[test]
    fn start_already_close_to_goal_returns_single_point() {
        let zones = RestrictedZones::default();
        let finder = Pathfinder::new(&zones, SearchConfig::default());
        let start = pos(0.0, 0.0);
        let path = finder.find_path(start, pos(0.0001, 0.0));
        assert_eq!(path, vec![start]);
    }

    #[test]
    fn open_space_path_heads_for_the_goal() {
        let zones = RestrictedZones::default();
        let finder = Pathfinder::new(&zones, SearchConfig::default());
        let start = pos(0.0, 0.0);
        let goal = pos(0.002_95, 0.0);
        let result = finder.search(start, goal);
        assert_eq!(result.path.first(), Some(&start));
        assert!(is_close(*result.path.last().unwrap(), goal));
        // Straight east: 19 moves.
        assert_eq!(result.path.len(), 20);
        assert!(!result.hit_expansion_limit);
    }

    #[test]
    fn expansion_limit_yields_empty_path() {
        let zones = RestrictedZones::default();
        let config = SearchConfig {
            heuristic_multiplier: 1.5,
            max_expansions: 5,
        };
        let finder = Pathfinder::new(&zones, config);
        let result = finder.search(pos(0.0, 0.0), pos(0.01, 0.01));
        assert!(result.path.is_empty());
        assert!(result.hit_expansion_limit);
        assert_eq!(result.nodes_expanded, 5);
    }
}
