//! medroute CLI - command line tools for drone dispatch planning.
//!
//! The `medroute` binary reads catalog snapshots and dispatch lists from JSON
//! files, runs the planner and prints results as JSON on stdout.

pub mod config;
pub mod scenario;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

use medroute_core::Position;

pub use config::Config;
pub use scenario::{generate_scenario, Scenario};

/// Read and deserialize a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Parse a `lng,lat` pair.
pub fn parse_position(value: &str) -> std::result::Result<Position, String> {
    let (lng, lat) = value
        .split_once(',')
        .ok_or_else(|| format!("expected 'lng,lat', got '{value}'"))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{lng}'"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{lat}'"))?;
    Position::new(lng, lat).map_err(|e| e.to_string())
}
