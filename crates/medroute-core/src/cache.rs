//! Per-call memoization of point-to-point paths.

use std::collections::HashMap;

use crate::models::Position;

/// Bit-exact key for a position, see [`Position::canonical_bits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PositionKey(u64, u64);

impl From<Position> for PositionKey {
    fn from(position: Position) -> Self {
        let (lng, lat) = position.canonical_bits();
        Self(lng, lat)
    }
}

/// Paths computed against one fixed set of restricted zones.
///
/// A cache belongs to exactly one planning call; build a fresh one per call
/// since a different zone set would make the stored paths wrong.
#[derive(Debug, Default)]
pub struct PathCache {
    entries: HashMap<(PositionKey, PositionKey), Vec<Position>>,
    hits: usize,
    misses: usize,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached path for `(start, end)`, computing it with
    /// `compute` on a miss. Empty (unreachable) results are cached too.
    pub fn get_or_compute<F>(&mut self, start: Position, end: Position, compute: F) -> Vec<Position>
    where
        F: FnOnce(Position, Position) -> Vec<Position>,
    {
        let key = (PositionKey::from(start), PositionKey::from(end));
        if let Some(path) = self.entries.get(&key) {
            self.hits += 1;
            return path.clone();
        }
        self.misses += 1;
        let path = compute(start, end);
        self.entries.insert(key, path.clone());
        path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}
