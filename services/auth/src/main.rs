use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use sea_orm::Database;
use tracing::info;

use deer_auth::config::AuthConfig;
use deer_auth::router::{build_router, route_policy};
use deer_auth::state::AppState;
use deer_auth::tasks::{spawn_code_sweeper, spawn_outbox_relay};
use deer_auth_migration::{Migrator, MigratorTrait};
use deer_auth_types::token::TokenService;
use deer_core::config::Config;
use deer_core::tracing::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AuthConfig::from_env().context("load auth config")?;
    init_tracing(config.log_format);

    let db = Database::connect(&config.database_url)
        .await
        .context("connect to database")?;

    if config.run_migrations {
        Migrator::up(&db, None).await.context("run migrations")?;
        info!("migrations applied");
    }

    let state = AppState {
        db,
        tokens: Arc::new(TokenService::new(&config.jwt_secret, config.jwt_ttl_secs)),
        policy: Arc::new(route_policy()),
        mail_from: config.mail_from.clone(),
    };

    spawn_code_sweeper(
        state.clone(),
        Duration::from_secs(config.code_sweep_interval_secs.max(1)),
    );
    spawn_outbox_relay(
        state.clone(),
        Duration::from_secs(config.outbox_poll_interval_secs.max(1)),
    );

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.auth_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    info!("auth service listening on {addr}");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
