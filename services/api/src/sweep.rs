use crate::infra::{build_notifier, parse_timestamp, InMemoryShelterStore};
use chrono::{Local, NaiveDateTime};
use clap::Args;
use shelter_bot::config::AppConfig;
use shelter_bot::error::AppError;
use shelter_bot::probation::{
    DeadlineMode, NotifyError, OwnerStore, PollingUnit, ProbationEngine, ShelterSeed, Species,
    SweepConfig, SweepSummary,
};
use shelter_bot::telemetry;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct SweepArgs {
    /// JSON file with owners and reports to sweep
    #[arg(long)]
    pub(crate) seed: PathBuf,
    /// Evaluate as of this local time (YYYY-MM-DDTHH:MM:SS). Defaults to now.
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) at: Option<NaiveDateTime>,
    /// Override the deadline unit (minute, hour, day)
    #[arg(long, value_parser = parse_unit)]
    pub(crate) unit: Option<PollingUnit>,
    /// Override the deadline mode (window, catch-up)
    #[arg(long, value_parser = parse_mode)]
    pub(crate) mode: Option<DeadlineMode>,
    /// Deliver through the Bot API when a token is configured instead of only logging
    #[arg(long)]
    pub(crate) deliver: bool,
}

fn parse_unit(value: &str) -> Result<PollingUnit, String> {
    PollingUnit::parse(value).ok_or_else(|| format!("unknown deadline unit '{value}'"))
}

fn parse_mode(value: &str) -> Result<DeadlineMode, String> {
    DeadlineMode::parse(value).ok_or_else(|| format!("unknown deadline mode '{value}'"))
}

pub(crate) async fn run_sweep_command(args: SweepArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let seed = ShelterSeed::from_path(&args.seed)?;
    let store = InMemoryShelterStore::from_seed(seed);
    let mut sweep_config = config.scheduler.sweep_config();
    if let Some(unit) = args.unit {
        sweep_config.deadline_unit = unit;
    }
    if let Some(mode) = args.mode {
        sweep_config.deadline_mode = mode;
    }
    let at = args.at.unwrap_or_else(|| Local::now().naive_local());
    let telegram = config.telegram.clone();
    let deliver = args.deliver;

    let outcome = tokio::task::spawn_blocking(move || {
        let notifier = build_notifier(&telegram, deliver)?;
        let engine = ProbationEngine::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            notifier,
            sweep_config,
        );
        Ok::<_, NotifyError>((engine.run_sweep_at(at), store))
    })
    .await
    .map_err(std::io::Error::from)?;
    let (summary, store) = outcome?;

    render_summary(&summary, &sweep_config, &store);
    Ok(())
}

fn render_summary(summary: &SweepSummary, config: &SweepConfig, store: &InMemoryShelterStore) {
    println!("Probation sweep at {}", summary.started_at);
    println!(
        "Deadline policy: {:?} unit, {:?} mode, volunteer chat {}",
        config.deadline_unit, config.deadline_mode, config.volunteer_chat_id
    );
    println!(
        "- scanned {} owners and {} reports",
        summary.owners_scanned, summary.reports_scanned
    );
    println!(
        "- {} notifications sent | {} failures | {} orphan reports",
        summary.notifications_sent,
        summary.failures(),
        summary.orphan_reports
    );

    if !summary.transitions.is_empty() {
        println!("Status changes:");
        for transition in &summary.transitions {
            println!(
                "  - {} owner {}: {} -> {} ({:?})",
                transition.species,
                transition.owner_id,
                transition.from,
                transition.to,
                transition.rule
            );
        }
    }

    if !summary.deadline_notices.is_empty() {
        println!("Deadline notices:");
        for notice in &summary.deadline_notices {
            println!(
                "  - {} owner {}: {:?} -> chat {}",
                notice.species, notice.owner_id, notice.action, notice.destination
            );
        }
    }

    println!("Owners after sweep:");
    for species in Species::ALL {
        match store.list_owners(species) {
            Ok(owners) => {
                for owner in owners {
                    println!(
                        "  - {} #{} {}: {}",
                        species, owner.id, owner.name, owner.probationary_status
                    );
                }
            }
            Err(err) => println!("  - {} owners unavailable: {}", species, err),
        }
    }

    match serde_json::to_string_pretty(summary) {
        Ok(json) => println!("Summary payload:\n{}", json),
        Err(err) => println!("Summary payload unavailable: {}", err),
    }
}
