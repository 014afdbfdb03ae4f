use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryShelterStore, SweepBoard};
use crate::routes::router;
use crate::scheduler;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use shelter_bot::config::AppConfig;
use shelter_bot::error::AppError;
use shelter_bot::probation::ShelterSeed;
use shelter_bot::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(seed) = args.seed.take() {
        config.scheduler.seed_path = Some(seed);
    }

    telemetry::init(&config.telemetry)?;

    let store = match &config.scheduler.seed_path {
        Some(path) => {
            let seed = ShelterSeed::from_path(path)?;
            info!(
                path = %path.display(),
                owners = seed.owners.len(),
                reports = seed.reports.len(),
                "shelter seed loaded"
            );
            InMemoryShelterStore::from_seed(seed)
        }
        None => {
            warn!("no seed configured; starting with an empty shelter store");
            InMemoryShelterStore::default()
        }
    };

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let sweeps = Arc::new(SweepBoard::default());
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        sweeps: sweeps.clone(),
    };

    let app = router()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let scheduler = scheduler::spawn(
        store,
        config.scheduler.clone(),
        config.telegram.clone(),
        sweeps,
    );
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "shelter probation service ready");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    readiness_flag.store(false, Ordering::Release);
    scheduler.shutdown().await;

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
