pub mod types;
pub mod error;
pub mod config;
pub mod groups;
pub mod round_robin;
pub mod standings;
pub mod knockout;
pub mod advance;
pub mod results;
pub mod ranking;
pub mod tournament;
pub mod store;
pub mod sim;

pub use advance::{advance, lock_reason, repair_rounds, reverse_winner};
pub use error::{EngineError, LockReason, Violation};
pub use groups::{form_groups, representative_tags};
pub use knockout::{build_knockout_bracket, seed_first_round};
pub use ranking::{adjusted_seed, base_seed, finalize_rankings, plan_commit, seed_delta};
pub use results::record_result;
pub use round_robin::{add_late_entrant, generate_group_matches};
pub use standings::{compute_standings, group_standings, qualified_entrants};
pub use store::{JsonFileStore, MemoryStore, TournamentStore};
pub use tournament::Tournament;
pub use types::*;

use chrono::Utc;
use config::*;
use serde_json::{json, Value};
use sim::CupSimulator;
use std::fs;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Generate (or reuse) a roster, play one simulated cup, commit it and
/// return a summary of the result.
pub fn run_demo(config: &EngineConfig) -> Result<Value, EngineError> {
    let mut store = JsonFileStore::new(data_dir(config));
    let mut sim = CupSimulator::new(demo_rng_seed(config));

    let mut roster = store.load_roster()?;
    if roster.is_empty() {
        roster = sim.dummy_entrants(demo_entrant_count(config), &config.demo.tag_pool);
        store.save_roster(&roster)?;
        info!(players = roster.len(), "seeded demo roster");
    }

    let id = format!("cup-{}", Utc::now().format("%Y%m%d-%H%M%S"));
    let mut cup = Tournament::create(id, "Demo Cup", roster.clone())?;
    store.save_tournament(&cup)?;
    sim.run(&mut cup)?;
    store.save_tournament(&cup)?;

    let plan = cup.plan_commit(&roster, merge_policy(config))?;
    store.commit(&plan)?;

    let rankings = plan
        .rankings
        .iter()
        .map(|r| {
            json!({
                "rank": r.rank,
                "name": r.entrant.name,
                "points": r.points,
                "previousSeed": r.entrant.seed(),
                "adjustedSeed": r.adjusted_seed,
                "placement": r.placement,
            })
        })
        .collect::<Vec<_>>();
    Ok(json!({
        "tournamentId": plan.tournament_id,
        "champion": cup.champion().map(|e| e.name.clone()),
        "rankings": rankings,
        "displayOrder": plan.display_order,
        "seedUpdates": plan.seed_updates.len(),
        "dataDir": store.root().display().to_string(),
    }))
}

// ── Entry point ────────────────────────────────────────────────────────

pub fn run() {
    load_env_file();
    let loaded = load_config_inner();
    let config = loaded.clone().unwrap_or_default();

    let logs_dir = logs_dir(&config);
    fs::create_dir_all(&logs_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "engine.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    info!("knockout cup starting");
    if let Err(err) = loaded {
        error!("{err}, falling back to default config");
    }
    log_env_warnings(&config);

    match run_demo(&config) {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{text}"),
            Err(err) => error!("encode summary: {err}"),
        },
        Err(err) => {
            error!("demo cup failed: {err}");
            eprintln!("demo cup failed: {err}");
            drop(guard);
            std::process::exit(1);
        }
    }
}
