//! pokequiz-server - Pokémon stats quiz service
//!
//! Startup order:
//! 1. Parse CLI arguments and load the TOML config
//! 2. Initialize tracing
//! 3. Resolve the token secret and root folder (fatal when unusable)
//! 4. Open the progress database (fatal on failure)
//! 5. Load the dataset from cache, rebuilding from the provider when needed
//! 6. Serve HTTP until Ctrl+C / SIGTERM

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use pokequiz_common::auth::TokenSigner;
use pokequiz_common::config::{
    load_toml_config, resolve_token_secret, RootFolderInitializer, RootFolderResolver,
};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pokequiz_server::dataset::{
    Classifier, DatasetBuilder, DatasetCache, DatasetHandle, DatasetLoader, FileBlobStore,
    VARIANT_ID_OFFSET,
};
use pokequiz_server::db::progress::ProgressStore;
use pokequiz_server::progress::ProgressTracker;
use pokequiz_server::provider::{PokeApiClient, SpeciesProvider};
use pokequiz_server::{AppState, QuizService};

/// Command-line arguments for pokequiz-server
#[derive(Parser, Debug)]
#[command(name = "pokequiz-server")]
#[command(about = "Pokémon stats quiz service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "POKEQUIZ_PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "POKEQUIZ_BIND")]
    bind: String,

    /// Root folder holding pokequiz.db and pokemon.json
    /// (POKEQUIZ_ROOT_FOLDER is honored by the resolver)
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(long, env = "POKEQUIZ_CONFIG")]
    config: Option<PathBuf>,

    /// Secret for verifying user tokens
    #[arg(long, env = "POKEQUIZ_TOKEN_SECRET", hide_env_values = true)]
    token_secret: Option<String>,

    /// Ignore the dataset cache and rebuild from the provider
    #[arg(long)]
    rebuild_dataset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_toml_config(args.config.as_deref()).context("Failed to load config")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "pokequiz_server={0},pokequiz_common={0},tower_http={0}",
                    config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        built = env!("BUILD_TIMESTAMP"),
        profile = env!("BUILD_PROFILE"),
        "Starting pokequiz-server"
    );

    let token_secret = resolve_token_secret(args.token_secret.as_deref(), &config)
        .context("Token secret is required")?;

    if config.provider.max_item_id >= VARIANT_ID_OFFSET {
        bail!(
            "provider.max_item_id ({}) must be below {}",
            config.provider.max_item_id,
            VARIANT_ID_OFFSET
        );
    }

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = pokequiz_server::db::init_database_pool(&db_path)
        .await
        .context("Failed to open progress database")?;
    info!("Database connection established");

    let client = PokeApiClient::new(
        config.provider.base_url.clone(),
        Duration::from_secs(config.provider.timeout_secs),
    )
    .context("Failed to create provider client")?;
    info!("Species provider: {}", client.base_url());
    let provider: Arc<dyn SpeciesProvider> = Arc::new(client);

    let loader = DatasetLoader::new(
        DatasetCache::new(Arc::new(FileBlobStore::new(initializer.dataset_cache_path()))),
        DatasetBuilder::new(provider.clone(), config.languages.clone())
            .with_max_item_id(config.provider.max_item_id)
            .with_type_count(config.provider.type_count),
        Classifier::new(provider),
    );

    let service = Arc::new(QuizService::new(
        DatasetHandle::default(),
        ProgressTracker::new(
            ProgressStore::new(db_pool)
                .with_max_lock_wait_ms(config.database.max_lock_wait_ms),
        ),
        loader,
    ));

    let records = if args.rebuild_dataset {
        service.rebuild_dataset().await
    } else {
        service.load_dataset().await
    };
    if records == 0 {
        warn!("Dataset is empty; quiz requests will return not found");
    }

    let state = AppState::new(service, TokenSigner::new(token_secret));
    let app = pokequiz_server::build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.bind, args.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
