mod auth;
mod calendar;
mod config;
mod database;
mod entities;
mod error;
mod identity;
mod media;
mod migrate_images;
mod router;
mod routes;
mod tenant;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum_login::tower_sessions::ExpiredDeletion;
use clap::{Parser, Subcommand};
use config::{AuthConfig, Config};
use database::setup_database;
use media::{ObjectStore, S3Store};
use oauth2::basic::BasicClient;
use router::{create_router, shutdown_signal};
use tokio::net::TcpListener;
use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "parish-rs", about = "Parish administration backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Copy images still hosted by the legacy provider into the bucket.
    MigrateImages {
        /// Substring identifying legacy URLs.
        #[arg(long, default_value = "supabase.co")]
        marker: String,
        /// Pause between two rows, in milliseconds.
        #[arg(long, default_value_t = 100)]
        delay_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (db, pool) = setup_database(&config.database_url).await?;
    let storage: Arc<dyn ObjectStore> =
        Arc::new(S3Store::new(&config.storage).context("Cannot configure object storage")?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, db, pool, storage).await,
        Command::MigrateImages { marker, delay_ms } => {
            let report = migrate_images::run(
                &db,
                storage.as_ref(),
                &marker,
                Duration::from_millis(delay_ms),
            )
            .await?;
            for (target, summary) in report {
                info!(
                    table = target.table(),
                    column = target.column(),
                    migrated = summary.migrated,
                    failed = summary.failed,
                    "summary"
                );
            }
            Ok(())
        }
    }
}

async fn serve(
    config: Config,
    db: sea_orm::DatabaseConnection,
    pool: sea_orm::sqlx::PgPool,
    storage: Arc<dyn ObjectStore>,
) -> anyhow::Result<()> {
    let auth = AuthConfig::from_env()?;

    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    let deletion_task = tokio::task::spawn(
        session_store
            .clone()
            .continuously_delete_expired(tokio::time::Duration::from_secs(60)),
    );

    let client = BasicClient::new(auth.client_id)
        .set_client_secret(auth.client_secret)
        .set_auth_uri(auth.auth_url)
        .set_token_uri(auth.token_url)
        .set_redirect_uri(auth.redirect_url);

    let app = create_router(
        db,
        client,
        auth.userinfo_url,
        storage,
        session_store,
        config.upload_max_bytes,
    )
    .await?;

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Cannot bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(deletion_task.abort_handle()))
        .await?;

    match deletion_task.await {
        Ok(result) => result?,
        Err(err) if err.is_cancelled() => {}
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
