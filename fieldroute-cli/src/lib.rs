//! Command-line interface for Fieldroute's planning tooling.
#![forbid(unsafe_code)]

use clap::{Args, Parser, Subcommand};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;

use fieldroute_client::{
    ClientBuildError, GeocodeRunner, HttpCandidateFeed, HttpCandidateFeedConfig, HttpRouteSolver,
    HttpRouteSolverConfig,
};
use fieldroute_core::{
    BuildRequestError, CancelFlag, CandidateFeed, DepotChoice, FeedError, GeometryError,
    PlanRouteError, PlanningSession, Region, RouteId, RouteStore, SqliteRouteStore, StopId,
    StoreError,
};

const DEFAULT_DB: &str = "fieldroute.db";

const ARG_DB: &str = "db";
const ARG_SOLVER_URL: &str = "solver-url";
const ARG_FEED_URL: &str = "feed-url";
const ARG_AGENT: &str = "agent";
const ENV_PLAN_SOLVER_URL: &str = "FIELDROUTE_CMDS_PLAN_SOLVER_URL";
const ENV_PLAN_FEED_URL: &str = "FIELDROUTE_CMDS_PLAN_FEED_URL";
const ENV_PLAN_AGENT: &str = "FIELDROUTE_CMDS_PLAN_AGENT";
const ENV_GEOCODE_FEED_URL: &str = "FIELDROUTE_CMDS_GEOCODE_FEED_URL";

/// Run the Fieldroute CLI with the current process arguments and environment.
///
/// # Errors
/// Returns a [`CliError`] when argument parsing, configuration merging, or
/// the dispatched subcommand fails.
pub fn run() -> Result<(), CliError> {
    init_logging();
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Plan(args) => run_plan(args),
        Command::Routes(args) => run_routes(args),
        Command::Visit(args) => run_visit(args),
        Command::Reorder(args) => run_reorder(args),
        Command::RemoveStop(args) => run_remove_stop(args),
        Command::DeleteRoute(args) => run_delete_route(args),
        Command::Geocode(args) => run_geocode(args),
    }
}

/// Route library logs to stderr. `FIELDROUTE_LOG` overrides the filter.
fn init_logging() {
    let env = env_logger::Env::default().filter_or("FIELDROUTE_LOG", "info");
    // A second initialisation is a no-op.
    let _ = env_logger::Builder::from_env(env)
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .try_init();
}

#[derive(Debug, Parser)]
#[command(
    name = "fieldroute",
    about = "Plan and manage field-visit routes for the lead tracker",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Plan a route from the current candidate pool.
    Plan(PlanArgs),
    /// List active routes and their stops.
    Routes(RoutesArgs),
    /// Record or retract a field visit on a stop.
    Visit(VisitArgs),
    /// Move a stop to a new position within its route.
    Reorder(ReorderArgs),
    /// Remove a stop from a route.
    RemoveStop(RemoveStopArgs),
    /// Delete a route and its stops.
    DeleteRoute(DeleteRouteArgs),
    /// Geocode ungeocoded property records in batches.
    Geocode(GeocodeArgs),
}

/// CLI arguments for the `plan` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Fetch the candidate pool, assemble a route request, and \
                 persist the optimiser's answer. Service endpoints can come \
                 from CLI flags, configuration files, or environment \
                 variables.",
    about = "Plan a route from the current candidate pool"
)]
#[ortho_config(prefix = "FIELDROUTE")]
struct PlanArgs {
    /// Path to the route database.
    #[arg(long = ARG_DB, value_name = "path")]
    #[serde(default)]
    db: Option<PathBuf>,
    /// Base URL of the route optimiser service.
    #[arg(long = ARG_SOLVER_URL, value_name = "url")]
    #[serde(default)]
    solver_url: Option<String>,
    /// Base URL of the lead application's API.
    #[arg(long = ARG_FEED_URL, value_name = "url")]
    #[serde(default)]
    feed_url: Option<String>,
    /// Field agent the planned routes belong to.
    #[arg(long = ARG_AGENT, value_name = "name")]
    #[serde(default)]
    agent: Option<String>,
    /// Tag stamped onto the planned routes.
    #[arg(long, value_name = "tag")]
    #[serde(default)]
    route_tag: Option<String>,
    /// Candidate id to route; repeat for each pick.
    #[arg(long, value_name = "id")]
    #[serde(default)]
    select: Vec<u64>,
    /// Rectangular area as north,south,east,west degrees; overrides --select.
    #[arg(long, value_name = "n,s,e,w")]
    #[serde(default)]
    bbox: Option<String>,
    /// Candidate id to start and end the route at.
    #[arg(long, value_name = "id")]
    #[serde(default)]
    depot: Option<u64>,
    /// HTTP timeout for both services in seconds.
    #[arg(long, value_name = "secs")]
    #[serde(default)]
    timeout_secs: Option<u64>,
}

impl PlanArgs {
    fn into_config(self) -> Result<PlanConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        PlanConfig::try_from(merged)
    }
}

/// Fully resolved inputs for the `plan` subcommand.
#[derive(Debug, Clone)]
struct PlanConfig {
    db: PathBuf,
    solver_url: String,
    feed_url: String,
    agent: String,
    route_tag: Option<String>,
    select: Vec<u64>,
    region: Option<Region>,
    depot: Option<u64>,
    timeout: Option<Duration>,
}

impl TryFrom<PlanArgs> for PlanConfig {
    type Error = CliError;

    fn try_from(args: PlanArgs) -> Result<Self, Self::Error> {
        let solver_url = args.solver_url.ok_or(CliError::MissingArgument {
            field: ARG_SOLVER_URL,
            env: ENV_PLAN_SOLVER_URL,
        })?;
        let feed_url = args.feed_url.ok_or(CliError::MissingArgument {
            field: ARG_FEED_URL,
            env: ENV_PLAN_FEED_URL,
        })?;
        let agent = args.agent.ok_or(CliError::MissingArgument {
            field: ARG_AGENT,
            env: ENV_PLAN_AGENT,
        })?;
        let region = args.bbox.as_deref().map(parse_bbox).transpose()?;
        Ok(Self {
            db: args.db.unwrap_or_else(|| PathBuf::from(DEFAULT_DB)),
            solver_url,
            feed_url,
            agent,
            route_tag: args.route_tag,
            select: args.select,
            region,
            depot: args.depot,
            timeout: args.timeout_secs.map(Duration::from_secs),
        })
    }
}

fn run_plan(args: PlanArgs) -> Result<(), CliError> {
    let config = args.into_config()?;

    let feed = HttpCandidateFeed::with_config(feed_config(&config.feed_url, config.timeout))?;
    let pool = feed.candidates()?;

    let store = SqliteRouteStore::open(&config.db)?;
    let mut session = match &config.route_tag {
        Some(tag) => PlanningSession::with_route_tag(store, tag.clone()),
        None => PlanningSession::new(store),
    }?;
    for id in &config.select {
        session.selection_mut().toggle(*id);
    }

    let mut builder = session.request_builder(&pool);
    if let Some(region) = &config.region {
        builder = builder.with_area_result(region.filter(&pool)?);
    }
    if let Some(depot) = config.depot {
        builder = builder.with_depot(DepotChoice::Candidate(depot));
    }
    let request = builder.build()?;

    let solver = HttpRouteSolver::with_config(solver_config(&config.solver_url, config.timeout))?;
    let created = session.plan_route(&solver, &request, &config.agent)?;

    println!("Planned {} route(s) for {}.", created.len(), config.agent);
    for route in &created {
        println!(
            "  route {}: {} stops to visit",
            route.id,
            route.remaining_stops()
        );
    }
    Ok(())
}

/// CLI arguments for the `geocode` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Walk the lead application's batch geocoding endpoint until \
                 every property record has coordinates. The feed endpoint can \
                 come from CLI flags, configuration files, or environment \
                 variables.",
    about = "Geocode ungeocoded property records in batches"
)]
#[ortho_config(prefix = "FIELDROUTE")]
struct GeocodeArgs {
    /// Base URL of the lead application's API.
    #[arg(long = ARG_FEED_URL, value_name = "url")]
    #[serde(default)]
    feed_url: Option<String>,
    /// Records requested per batch call.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    batch_size: Option<u32>,
    /// HTTP timeout per call in seconds.
    #[arg(long, value_name = "secs")]
    #[serde(default)]
    timeout_secs: Option<u64>,
}

impl GeocodeArgs {
    fn into_config(self) -> Result<GeocodeConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        GeocodeConfig::try_from(merged)
    }
}

/// Fully resolved inputs for the `geocode` subcommand.
#[derive(Debug, Clone)]
struct GeocodeConfig {
    feed_url: String,
    batch_size: Option<u32>,
    timeout: Option<Duration>,
}

impl TryFrom<GeocodeArgs> for GeocodeConfig {
    type Error = CliError;

    fn try_from(args: GeocodeArgs) -> Result<Self, Self::Error> {
        let feed_url = args.feed_url.ok_or(CliError::MissingArgument {
            field: ARG_FEED_URL,
            env: ENV_GEOCODE_FEED_URL,
        })?;
        Ok(Self {
            feed_url,
            batch_size: args.batch_size,
            timeout: args.timeout_secs.map(Duration::from_secs),
        })
    }
}

fn run_geocode(args: GeocodeArgs) -> Result<(), CliError> {
    let config = args.into_config()?;

    let feed = HttpCandidateFeed::with_config(feed_config(&config.feed_url, config.timeout))?;
    let mut runner = GeocodeRunner::new();
    if let Some(batch_size) = config.batch_size {
        runner = runner.with_batch_size(batch_size);
    }
    let report = runner.run(&feed, &CancelFlag::new())?;

    println!(
        "Geocoded {} of {} processed records across {} batches ({} errors, {} skipped){}.",
        report.successful,
        report.processed,
        report.batches,
        report.errors,
        report.skipped,
        if report.cancelled { ", cancelled" } else { "" },
    );
    Ok(())
}

/// Route database location shared by the store subcommands.
#[derive(Debug, Clone, Args)]
struct StoreArgs {
    /// Path to the route database.
    #[arg(long = ARG_DB, value_name = "path", default_value = DEFAULT_DB)]
    db: PathBuf,
}

/// CLI arguments for the `routes` subcommand.
#[derive(Debug, Clone, Parser)]
#[command(about = "List active routes and their stops")]
struct RoutesArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Only list routes planned under this tag.
    #[arg(long, value_name = "tag")]
    route_tag: Option<String>,
    /// Emit the routes as JSON instead of a listing.
    #[arg(long)]
    json: bool,
}

fn run_routes(args: RoutesArgs) -> Result<(), CliError> {
    let store = open_store(&args.store.db)?;
    let routes = store.list_active(args.route_tag.as_deref())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&routes)?);
        return Ok(());
    }
    if routes.is_empty() {
        println!("No active routes.");
        return Ok(());
    }
    for route in &routes {
        println!(
            "route {} [{}] agent={} stops={} remaining={}",
            route.id,
            route.route_tag,
            route.agent,
            route.stops.len(),
            route.remaining_stops()
        );
        for stop in route.ordered_stops() {
            let state = if stop.is_depot {
                "depot"
            } else if stop.visited {
                "visited"
            } else {
                "pending"
            };
            println!(
                "  {:>3}. candidate {:<8} {state}",
                stop.order_index, stop.candidate_id
            );
        }
    }
    Ok(())
}

/// CLI arguments for the `visit` subcommand.
#[derive(Debug, Clone, Parser)]
#[command(about = "Record or retract a field visit on a stop")]
struct VisitArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Route holding the stop.
    #[arg(long, value_name = "id")]
    route: RouteId,
    /// Stop to mark.
    #[arg(long, value_name = "id")]
    stop: StopId,
    /// Agent recording the visit.
    #[arg(long = ARG_AGENT, value_name = "name")]
    agent: String,
    /// Retract the visit instead of recording one.
    #[arg(long)]
    undo: bool,
}

fn run_visit(args: VisitArgs) -> Result<(), CliError> {
    let mut store = open_store(&args.store.db)?;
    store.mark_stop_visited(args.route, args.stop, &args.agent, !args.undo)?;
    if args.undo {
        println!("Cleared the visit on stop {} of route {}.", args.stop, args.route);
    } else {
        println!(
            "Recorded a visit on stop {} of route {} by {}.",
            args.stop, args.route, args.agent
        );
    }
    Ok(())
}

/// CLI arguments for the `reorder` subcommand.
#[derive(Debug, Clone, Parser)]
#[command(about = "Move a stop to a new position within its route")]
struct ReorderArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Route to rearrange.
    #[arg(long, value_name = "id")]
    route: RouteId,
    /// Candidate whose stop moves.
    #[arg(long, value_name = "id")]
    candidate: u64,
    /// Zero-based position among the route's non-depot stops.
    #[arg(long, value_name = "index")]
    index: u32,
}

fn run_reorder(args: ReorderArgs) -> Result<(), CliError> {
    let mut store = open_store(&args.store.db)?;
    store.reorder_stop(args.route, args.candidate, args.index)?;
    println!(
        "Moved candidate {} to position {} on route {}.",
        args.candidate, args.index, args.route
    );
    Ok(())
}

/// CLI arguments for the `remove-stop` subcommand.
#[derive(Debug, Clone, Parser)]
#[command(about = "Remove a stop from a route")]
struct RemoveStopArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Route holding the stop.
    #[arg(long, value_name = "id")]
    route: RouteId,
    /// Stop to remove.
    #[arg(long, value_name = "id")]
    stop: StopId,
}

fn run_remove_stop(args: RemoveStopArgs) -> Result<(), CliError> {
    let mut store = open_store(&args.store.db)?;
    store.remove_stop(args.route, args.stop)?;
    println!("Removed stop {} from route {}.", args.stop, args.route);
    Ok(())
}

/// CLI arguments for the `delete-route` subcommand.
#[derive(Debug, Clone, Parser)]
#[command(about = "Delete a route and its stops")]
struct DeleteRouteArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Route to delete.
    #[arg(long, value_name = "id")]
    route: RouteId,
}

fn run_delete_route(args: DeleteRouteArgs) -> Result<(), CliError> {
    let mut store = open_store(&args.store.db)?;
    store.delete_route(args.route)?;
    println!("Deleted route {}.", args.route);
    Ok(())
}

/// Open the route database, creating it on first use.
fn open_store(path: &Path) -> Result<SqliteRouteStore, CliError> {
    SqliteRouteStore::open(path).map_err(CliError::Store)
}

fn feed_config(feed_url: &str, timeout: Option<Duration>) -> HttpCandidateFeedConfig {
    let config = HttpCandidateFeedConfig::new(feed_url);
    match timeout {
        Some(timeout) => config.with_timeout(timeout),
        None => config,
    }
}

fn solver_config(solver_url: &str, timeout: Option<Duration>) -> HttpRouteSolverConfig {
    let config = HttpRouteSolverConfig::new(solver_url);
    match timeout {
        Some(timeout) => config.with_timeout(timeout),
        None => config,
    }
}

/// Parse a rectangular region given as `north,south,east,west` degrees.
fn parse_bbox(raw: &str) -> Result<Region, CliError> {
    let invalid = || CliError::InvalidBoundingBox {
        value: raw.to_owned(),
    };
    let bounds: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid())?;
    match bounds.as_slice() {
        &[north, south, east, west] => Ok(Region::BoundingBox {
            north,
            south,
            east,
            west,
        }),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
pub(crate) fn plan_config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<PlanConfig, CliError> {
    let merged = PlanArgs::merge_from_layers(layers).map_err(CliError::from)?;
    PlanConfig::try_from(merged)
}

/// Errors emitted by the Fieldroute CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A bounding box was not four comma-separated numbers.
    #[error("invalid bounding box {value:?} (expected north,south,east,west)")]
    InvalidBoundingBox {
        value: String,
    },
    /// An HTTP adapter could not be constructed.
    #[error(transparent)]
    ClientBuild(#[from] ClientBuildError),
    /// The operator-drawn region was rejected.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// The candidate feed failed.
    #[error(transparent)]
    Feed(#[from] FeedError),
    /// No routable request could be assembled.
    #[error(transparent)]
    Request(#[from] BuildRequestError),
    /// Planning failed at the solver or while persisting routes.
    #[error(transparent)]
    Plan(#[from] PlanRouteError),
    /// A route store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Route listings could not be rendered as JSON.
    #[error("failed to render routes: {0}")]
    Render(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests;
