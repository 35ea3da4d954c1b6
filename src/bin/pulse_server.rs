use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use enrollment_pulse::{
    AggregateState, Classifier, IngestionLoop, PulseError, StateStore, StatsService,
    api::{self, AppState},
    config::ServerConfig,
    metrics,
    simulator::EventSimulator,
    store::BaselineConfig,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run(ServerConfig::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Fatal");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), PulseError> {
    config.validate()?;
    info!("Starting enrollment pulse server");
    metrics::init();

    let mut simulator = EventSimulator::new(config.simulator());

    let initial = if config.no_baseline {
        AggregateState::default()
    } else {
        AggregateState::seeded(
            &BaselineConfig::default(),
            chrono::Local::now().date_naive(),
            simulator.rng(),
        )
    };
    info!(
        total_records = initial.total_records,
        "Aggregate state initialized."
    );
    let store = Arc::new(StateStore::new(initial));

    let classifier = Arc::new(Classifier::load(&config.model));

    let ingestion = IngestionLoop::new(store.clone(), classifier, simulator)
        .spawn(config.tick_period())?;

    let app = api::router(AppState {
        stats: StatsService::new(store),
    });

    let addr = config.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(source) => {
            ingestion.shutdown();
            return Err(PulseError::Bind { addr, source });
        }
    };

    info!(addr = %addr, "Pulse server listening.");
    info!("Endpoints:");
    info!("  GET  /api/stats - Live statistics snapshot");
    info!("  GET  /metrics   - Prometheus metrics");
    info!("  GET  /health    - Health check");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to install Ctrl-C handler");
                std::future::pending::<()>().await;
            }
            info!("Shutting down... (waiting for in-flight requests)");
        })
        .await;

    let ticks = ingestion.shutdown();
    info!(ticks, "Ingestion stopped. Goodbye.");

    served.map_err(PulseError::Serve)
}
