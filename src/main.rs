use std::fs;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use filegate::auth::SessionKeys;
use filegate::cli::{self, AdminCommands, UserCommands};
use filegate::config::ServerConfig;
use filegate::server::{AppState, create_router};
use filegate::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "filegate")]
#[command(about = "A subscription-gated file distribution server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "3001")]
        port: u16,

        /// Data directory for the database and uploads
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Session signing secret (defaults to the secret written by `admin init`)
        #[arg(long, env = "FILEGATE_SESSION_SECRET", hide_env_values = true)]
        session_secret: Option<String>,

        /// Session lifetime in hours (sessions never expire when omitted)
        #[arg(long)]
        session_ttl_hours: Option<u64>,
    },
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
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
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    if !config.db_path().exists() {
        bail!("Server not initialized. Run 'filegate admin init' first to create the database and admin user.");
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    if !store.has_admin()? {
        bail!("Server not initialized. Run 'filegate admin init' first to create the database and admin user.");
    }

    let secret = config.resolve_session_secret()?;
    let sessions = SessionKeys::new(secret.as_bytes(), config.session_ttl())?;
    if config.session_ttl().is_none() {
        warn!("Sessions are issued without expiry; pass --session-ttl-hours to limit them");
    }

    fs::create_dir_all(config.uploads_dir())?;

    let state = Arc::new(AppState::new(
        Arc::new(store),
        sessions,
        &config.data_dir,
        config.max_upload_bytes,
    ));

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("filegate=info".parse()?))
        .init();

    let args = Cli::parse();

    match args.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                admin_password,
                non_interactive,
            } => cli::run_init(data_dir, admin_password, non_interactive)?,
            AdminCommands::User { command } => match command {
                UserCommands::Add {
                    data_dir,
                    username,
                    password,
                    admin,
                    non_interactive,
                } => cli::run_user_add(data_dir, username, password, admin, non_interactive)?,
            },
            AdminCommands::Grant {
                data_dir,
                username,
                subscription_type,
                days,
            } => cli::run_grant(data_dir, username, subscription_type, days)?,
            AdminCommands::Info { data_dir, json } => cli::run_info(data_dir, json)?,
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            session_secret,
            session_ttl_hours,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                session_secret,
                session_ttl_hours,
                ..ServerConfig::default()
            };
            run_serve(config).await?;
        }
    }

    Ok(())
}
