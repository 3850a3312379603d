//! medroute - plan drone dispatch trips from catalog snapshots.
//!
//! Usage:
//!   medroute scenario --seed 7 --dispatches 12 --out-dir ./demo
//!   medroute plan --catalog ./demo/catalog.json --dispatches ./demo/dispatches.json

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use medroute_cli::{generate_scenario, load_json, parse_position, Config};
use medroute_core::{
    contains, distance, is_close, plan_as_geojson, step, CatalogSnapshot, DispatchRequest,
    FeasibilityMatcher, Position, QueryCriterion, Region, TripPlanner,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Drone dispatch trip planning tools")]
struct Cli {
    /// Node expansion limit per path search (overrides MEDROUTE_MAX_EXPANSIONS)
    #[arg(long, global = true)]
    max_expansions: Option<usize>,

    /// Heuristic weight (overrides MEDROUTE_HEURISTIC_MULTIPLIER)
    #[arg(long, global = true)]
    heuristic_multiplier: Option<f64>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan trips for a list of dispatches
    Plan {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        dispatches: PathBuf,
        /// Print a GeoJSON LineString instead of the full plan
        #[arg(long)]
        geojson: bool,
    },
    /// List drones able to serve every dispatch in the file
    Available {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        dispatches: PathBuf,
    },
    /// Distance between two `lng,lat` positions
    Distance {
        #[arg(long, value_parser = parse_position, allow_hyphen_values = true)]
        from: Position,
        #[arg(long, value_parser = parse_position, allow_hyphen_values = true)]
        to: Position,
    },
    /// Whether two positions are within one move of each other
    IsClose {
        #[arg(long, value_parser = parse_position, allow_hyphen_values = true)]
        from: Position,
        #[arg(long, value_parser = parse_position, allow_hyphen_values = true)]
        to: Position,
    },
    /// Position after one move along a compass angle
    Step {
        #[arg(long, value_parser = parse_position, allow_hyphen_values = true)]
        start: Position,
        #[arg(long, allow_hyphen_values = true)]
        angle: f64,
    },
    /// Whether a position lies inside a region given as JSON
    Contains {
        #[arg(long, value_parser = parse_position, allow_hyphen_values = true)]
        point: Position,
        #[arg(long)]
        region: PathBuf,
    },
    /// Query the drone catalog
    Query {
        #[arg(long)]
        catalog: PathBuf,
        /// Drones whose cooling flag matches
        #[arg(long)]
        cooling: Option<bool>,
        /// Attribute name for an equality query
        #[arg(long, requires = "value")]
        attribute: Option<String>,
        #[arg(long)]
        value: Option<String>,
        /// JSON file with a list of {attribute, operator, value} criteria
        #[arg(long)]
        criteria: Option<PathBuf>,
    },
    /// Generate a reproducible random scenario
    Scenario {
        #[arg(long, default_value_t = 1)]
        seed: u64,
        #[arg(long, default_value_t = 10)]
        dispatches: usize,
        /// Write catalog.json and dispatches.json here instead of stdout
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().with_overrides(
        cli.max_expansions,
        cli.heuristic_multiplier,
        cli.log_json,
    );
    init_tracing(&config)?;

    match cli.command {
        Command::Plan {
            catalog,
            dispatches,
            geojson,
        } => {
            let catalog: CatalogSnapshot = load_json(&catalog)?;
            let dispatches: Vec<DispatchRequest> = load_json(&dispatches)?;
            let planner = TripPlanner::new(&catalog, config.search.clone())
                .context("catalog snapshot is inconsistent")?;

            if geojson {
                print_json(&plan_as_geojson(&planner, &dispatches)?)?;
            } else {
                let plan = planner.plan(&dispatches)?;
                tracing::info!(
                    trips = plan.trips.len(),
                    total_moves = plan.total_moves,
                    total_cost = plan.total_cost,
                    unserviceable = plan.unserviceable.len(),
                    "plan complete"
                );
                print_json(&plan)?;
            }
        }
        Command::Available {
            catalog,
            dispatches,
        } => {
            let catalog: CatalogSnapshot = load_json(&catalog)?;
            let dispatches: Vec<DispatchRequest> = load_json(&dispatches)?;
            catalog
                .validate()
                .context("catalog snapshot is inconsistent")?;
            let drones = FeasibilityMatcher::new(&catalog).available_drones(&dispatches)?;
            print_json(&drones)?;
        }
        Command::Distance { from, to } => print_json(&distance(from, to))?,
        Command::IsClose { from, to } => print_json(&is_close(from, to))?,
        Command::Step { start, angle } => print_json(&step(start, angle)?)?,
        Command::Contains { point, region } => {
            let region: Region = load_json(&region)?;
            print_json(&contains(point, &region)?)?;
        }
        Command::Query {
            catalog,
            cooling,
            attribute,
            value,
            criteria,
        } => {
            let catalog: CatalogSnapshot = load_json(&catalog)?;
            let ids = if let Some(path) = criteria {
                let criteria: Vec<QueryCriterion> = load_json(&path)?;
                catalog.query(&criteria)
            } else if let Some(state) = cooling {
                catalog.drones_with_cooling(state)
            } else if let (Some(attribute), Some(value)) = (attribute, value) {
                catalog.query_attribute(&attribute, &value)
            } else {
                bail!("query needs --criteria, --cooling or --attribute with --value");
            };
            print_json(&ids)?;
        }
        Command::Scenario {
            seed,
            dispatches,
            out_dir,
        } => {
            let scenario = generate_scenario(seed, dispatches)?;
            match out_dir {
                Some(dir) => {
                    std::fs::create_dir_all(&dir)
                        .with_context(|| format!("failed to create {}", dir.display()))?;
                    write_json(&dir.join("catalog.json"), &scenario.catalog)?;
                    write_json(&dir.join("dispatches.json"), &scenario.dispatches)?;
                    tracing::info!(seed, dispatches, dir = %dir.display(), "scenario written");
                }
                None => print_json(&scenario)?,
            }
        }
    }

    Ok(())
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .with_context(|| format!("invalid log filter '{}'", config.log_filter))?;
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}
