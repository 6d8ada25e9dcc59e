//! Account Transfer Service
//!
//! ```text
//! ┌──────────┐    ┌──────────────┐    ┌──────────────┐    ┌────────────┐
//! │   HTTP   │───▶│   Transfer   │───▶│     Lock     │───▶│   Redis    │
//! │ Gateway  │    │ Orchestrator │    │ Coordinator  │    │ (SET NX)   │
//! └──────────┘    └──────┬───────┘    └──────────────┘    └────────────┘
//!                        │
//!                        ▼
//!                 ┌──────────────┐
//!                 │  PostgreSQL  │
//!                 │  (accounts)  │
//!                 └──────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use account_transfer::account::{AccountStore, MemoryAccountStore, PgAccountRepository};
use account_transfer::config::AppConfig;
use account_transfer::db::Database;
use account_transfer::gateway::{self, AppState};
use account_transfer::lock::{
    LockCoordinator, LockPolicy, LockStore, MemoryLockStore, RedisLockStore,
};
use account_transfer::logging::init_logging;
use account_transfer::transfer::TransferOrchestrator;

/// Account balances and lock-ordered transfers
#[derive(Parser)]
#[command(name = "account_transfer", version = env!("GIT_HASH"), about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// Config file (default: config/{env}.yaml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Environment name used to locate the config file
    #[arg(short, long, default_value = "dev")]
    env: String,
}

impl ConfigArgs {
    fn load(&self) -> Result<AppConfig> {
        let config = match &self.config {
            Some(path) => AppConfig::load_from(path)?,
            None => AppConfig::load(&self.env)?,
        };
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Api {
        #[command(flatten)]
        config: ConfigArgs,
        /// Override server.port
        #[arg(long)]
        port: Option<u16>,
        /// Use in-process stores instead of PostgreSQL/Redis (single instance only)
        #[arg(long)]
        in_memory: bool,
    },

    /// Create the accounts schema
    Migrate {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Api {
            config,
            port,
            in_memory,
        } => {
            let mut app_config = config.load()?;
            if let Some(port) = port {
                app_config.server.port = port;
            }
            let _log_guard = init_logging(&app_config.log);
            run_api(app_config, in_memory).await
        }
        Commands::Migrate { config } => {
            let app_config = config.load()?;
            let _log_guard = init_logging(&app_config.log);
            run_migrate(&app_config).await
        }
    }
}

async fn connect_postgres(config: &AppConfig) -> Result<Database> {
    let url = config
        .postgres_url
        .as_deref()
        .context("postgres_url is not configured (set it or TRANSFER_POSTGRES_URL)")?;
    Database::connect(url, config.server.db_max_connections)
        .await
        .context("failed to connect to PostgreSQL")
}

async fn run_migrate(config: &AppConfig) -> Result<()> {
    let db = connect_postgres(config).await?;
    PgAccountRepository::new(db.pool().clone())
        .migrate()
        .await
        .context("migration failed")?;
    db.close().await;
    Ok(())
}

async fn run_api(config: AppConfig, in_memory: bool) -> Result<()> {
    info!(version = env!("GIT_HASH"), in_memory, "starting account transfer service");

    let mut database = None;
    let (account_store, lock_store): (Arc<dyn AccountStore>, Arc<dyn LockStore>) = if in_memory {
        warn!("in-memory stores: locks are not shared across instances, data is lost on exit");
        (
            Arc::new(MemoryAccountStore::new()),
            Arc::new(MemoryLockStore::new()),
        )
    } else {
        let db = connect_postgres(&config).await?;
        let repo = PgAccountRepository::new(db.pool().clone());
        repo.migrate().await.context("migration failed")?;
        database = Some(db);

        let redis_url = config
            .redis
            .url
            .as_deref()
            .context("redis.url is not configured (set it or TRANSFER_REDIS_URL)")?;
        let redis = RedisLockStore::connect(redis_url)
            .await
            .context("failed to connect to Redis")?;
        (Arc::new(repo), Arc::new(redis))
    };

    let policy = LockPolicy::from(&config.lock);
    info!(
        poll_interval_ms = config.lock.poll_interval_ms,
        acquire_timeout_ms = config.lock.acquire_timeout_ms,
        lock_ttl_ms = config.lock.lock_ttl_ms,
        "lock policy"
    );
    let coordinator = LockCoordinator::new(lock_store.clone(), policy);
    let orchestrator = TransferOrchestrator::new(account_store.clone(), coordinator);

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    let state = AppState::new(account_store, lock_store, orchestrator, shutdown.clone());
    let result = gateway::run_server(&config.server, state, shutdown).await;

    if let Some(db) = database {
        db.close().await;
    }
    result
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
    shutdown.cancel();
}
