//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::{CollectMode, DaemonConfig};
use crate::error::{DaemonError, DaemonResult};
use crate::scheduler::Scheduler;
use mongodb::options::ClientOptions;
use mongostat_collector::{Cycle, MetricsRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// mongostat exporter server
pub struct Server {
    config: DaemonConfig,
    cycle: Arc<Cycle>,
}

impl Server {
    /// Connect the MongoDB client and register every instrument
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        config.validate()?;

        let mut options = ClientOptions::parse(&config.mongodb.uri).await?;
        options.app_name = Some(config.mongodb.app_name.clone());
        let client = mongodb::Client::with_options(options)?;

        let metrics = Arc::new(MetricsRegistry::with_namespace(&config.collector.namespace)?);
        let cycle = Arc::new(Cycle::new(Arc::new(client), metrics, config.cycle_config()));

        Ok(Self::with_cycle(config, cycle))
    }

    /// Build a server around an existing cycle
    pub fn with_cycle(config: DaemonConfig, cycle: Arc<Cycle>) -> Self {
        Self { config, cycle }
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let state = AppState::new(self.cycle.clone(), self.config.collector.mode);
        let app = create_router(state);

        let listener = TcpListener::bind(addr).await?;

        tracing::info!("mongostat listening on {}", addr);
        tracing::info!(
            database = %self.config.mongodb.database,
            collections = ?self.config.mongodb.collections,
            mode = ?self.config.collector.mode,
            "Collecting"
        );

        // Start scheduler in background
        let scheduler = match self.config.collector.mode {
            CollectMode::Interval => {
                let scheduler = Scheduler::new(
                    self.cycle.clone(),
                    Duration::from_secs(self.config.collector.interval_secs),
                );
                tokio::spawn(scheduler.clone().start());
                Some(scheduler)
            }
            CollectMode::OnScrape => None,
        };

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("mongostat shutting down");

        if let Some(scheduler) = scheduler {
            scheduler.stop();
        }

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
