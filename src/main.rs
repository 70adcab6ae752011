use anyhow::Context;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use smartsplit::config::{Config, DatabaseConfig};
use smartsplit::logging;
use smartsplit::modules::{IdentityModule, WebModule, WorkoutModule};
use smartsplit::monolith::{Application, Module};
use std::process::ExitCode;
use std::time::Duration;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("smartsplit: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;
    logging::init(&config.log).context("initializing logging")?;

    let logger = logging::instance_span();
    tracing::info!(
        parent: &logger,
        env = %config.app.env,
        port = config.app.port,
        "configuration loaded"
    );

    let db = connect(&config.database).await?;
    tracing::info!(parent: &logger, "database connection pool established");

    let limiter = &config.app.limiter;
    if limiter.enabled {
        tracing::warn!(
            parent: &logger,
            rps = limiter.rps,
            burst = limiter.burst,
            "rate limiter configured but not attached to any route"
        );
    }

    let modules: Vec<Box<dyn Module>> = vec![
        Box::new(IdentityModule::new()),
        Box::new(WorkoutModule::new()),
        Box::new(WebModule::new()),
    ];
    let mut app = Application::new(db, config, logger.clone(), modules)?;

    if let Err(err) = app.setup_modules().await {
        tracing::error!(parent: &logger, error = %err, "module setup failed");
        app.shutdown_modules().await;
        return Err(err.into());
    }
    if let Err(err) = app.post_setup_modules().await {
        tracing::error!(parent: &logger, error = %err, "module post setup failed");
        app.shutdown_modules().await;
        return Err(err.into());
    }

    let served = app.serve().await;
    if let Err(err) = &served {
        tracing::error!(parent: &logger, error = %err, "server stopped with error");
    }

    let report = app.shutdown_modules().await;
    tracing::info!(
        parent: &logger,
        stopped = ?report.stopped,
        failed = ?report.failed,
        "modules shut down"
    );

    served.context("serving requests")
}

async fn connect(settings: &DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(settings.url.clone());
    options
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .context("connecting to database")?;
    db.ping().await.context("pinging database")?;
    Ok(db)
}
