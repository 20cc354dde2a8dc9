use crate::server::{ServerState, auth::AuthConfig};
use postboard_common::{
    snowflake::{ProcessId, WorkerId},
    util::{NonPositiveDurationError, PositiveDuration},
};
use postboard_db::client::{DbClient, DbError};
use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};
use thiserror::Error;
use time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("TOKEN_LIFETIME_SECONDS must be positive: {0}")]
    TokenLifetime(#[from] NonPositiveDurationError),
    #[error("Error setting up the database: {0}")]
    Database(#[from] DbError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    #[serde(default = "default_database_max_connections")]
    database_max_connections: u32,
    #[serde(default = "default_run_migrations")]
    run_migrations: bool,
    #[serde(default)]
    worker_id: WorkerId,
    #[serde(default)]
    process_id: ProcessId,
    #[serde(default = "default_token_lifetime_seconds")]
    token_lifetime_seconds: i64,
    #[serde(default)]
    admin_emails: Vec<String>,
    static_dir: Option<PathBuf>,
}

fn default_database_max_connections() -> u32 {
    5
}

fn default_run_migrations() -> bool {
    true
}

fn default_token_lifetime_seconds() -> i64 {
    Duration::days(7).whole_seconds()
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "postboard_api=debug,\
                postboard_common=debug,\
                postboard_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

async fn shutdown_on_ctrl_c(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "Could not listen for ctrl-c, shutting down");
    } else {
        info!("Received ctrl-c, shutting down");
    }

    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let token_lifetime = PositiveDuration::try_from(Duration::seconds(env.token_lifetime_seconds))?;

    let db_client = DbClient::connect(
        &env.database_url,
        env.database_max_connections,
        env.worker_id,
        env.process_id,
    )
    .await?;

    if env.run_migrations {
        db_client.migrate().await?;
        info!("Database migrations applied");
    }

    let state = ServerState {
        db_client: Arc::new(db_client),
        auth_config: Arc::new(AuthConfig::new(Some(token_lifetime), &env.admin_emails)),
    };
    let app = server::app(state, env.static_dir.as_deref());

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_on_ctrl_c(shutdown.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
