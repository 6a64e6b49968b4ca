pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod services;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use config::Config;
use db::Store;
use state::SharedState;

#[derive(Parser)]
#[command(name = "kurate", version, about = "Review aggregation API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the API server (default)
    Serve,

    /// Load fixture CSV files into an empty database
    Import {
        /// Directory holding users.csv, category.csv, genre.csv, titles.csv,
        /// review.csv and comments.csv
        data_dir: PathBuf,
    },

    /// Create an administrator account and print its confirmation code
    CreateAdmin { username: String, email: String },

    /// Write a default config.toml next to the binary
    Init,
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    config.validate()?;

    init_tracing(&config);

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
        Command::Import { data_dir } => cmd_import(config, &data_dir).await,
        Command::CreateAdmin { username, email } => cmd_create_admin(config, &username, &email).await,
        Command::Init => {
            if Config::create_default_if_missing()? {
                println!("Wrote default config.toml");
            } else {
                println!("config.toml already exists, leaving it alone");
            }
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    info!("Kurate v{} starting...", env!("CARGO_PKG_VERSION"));

    let port = config.server.port;
    let shared = Arc::new(SharedState::new(config).await?);
    let app_state = api::AppState::new(shared);

    let app = api::router(app_state).await;
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn cmd_import(config: Config, data_dir: &std::path::Path) -> anyhow::Result<()> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let report = services::import::run(&store, data_dir).await?;

    println!(
        "Imported {} users, {} categories, {} genres, {} titles, {} reviews, {} comments",
        report.users,
        report.categories,
        report.genres,
        report.titles,
        report.reviews,
        report.comments
    );
    Ok(())
}

async fn cmd_create_admin(config: Config, username: &str, email: &str) -> anyhow::Result<()> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let user = store
        .create_admin_user(username, email)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create admin: {e}"))?;

    println!("Created admin '{}'", user.username);
    println!("Confirmation code: {}", user.confirmation_code);
    println!("Exchange it for a token via POST /api/v1/auth/token");
    Ok(())
}
