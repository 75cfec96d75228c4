#![warn(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::single_match_else)]

use crate::{
    auth::postgres_store::PostgresSessionStore, config::RuntimeConfiguration, routes::router,
    state::SatchelState,
};
use axum_login::tower_sessions::ExpiredDeletion;
use sqlx::postgres::PgPoolOptions;
use tokio::{net::TcpListener, signal};
use tower_sessions::MemoryStore;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[macro_use]
extern crate tracing;

mod auth;
mod config;
mod data;
mod error;
mod flash;
mod forms;
mod maud_conveniences;
mod routes;
mod state;

async fn shutdown_signal(state: SatchelState) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    warn!("signal received, starting graceful shutdown");
    state.sensible_shutdown().await;
}

#[tokio::main]
async fn main() {
    let dotenv_result = dotenvy::dotenv();

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .finish(),
    )
    .expect("unable to set tracing subscriber");

    info!("`tracing` online");
    if let Err(e) = dotenv_result {
        warn!(?e, "Not loading .env file");
    }

    let options = PgPoolOptions::new().max_connections(15);
    let config = RuntimeConfiguration::new().expect("unable to create config");
    let state = SatchelState::new(options, config.clone())
        .await
        .expect("unable to create state");

    let app = match state.pool() {
        Some(pool) => {
            let session_store = PostgresSessionStore::new(pool.clone());
            if let Err(e) = session_store.delete_expired().await {
                warn!(?e, "Unable to clear out expired sessions");
            }
            router(state.clone(), session_store)
        }
        None => router(state.clone(), MemoryStore::default()),
    };

    let server_ip = config.server_ip();
    let listener = TcpListener::bind(server_ip)
        .await
        .expect("unable to listen on server ip");

    info!(?server_ip, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .expect("unable to serve app");
}
