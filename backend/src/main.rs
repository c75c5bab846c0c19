use actix_web::{web, App, HttpServer};
use std::io;
use tokio::signal;

mod api_error;
mod auth;
mod config;
mod db;
mod http;
mod middleware;
mod models;
mod service;
mod telemetry;

use crate::auth::{JwtConfig, JwtService};
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::http::{configure_routes, AppState};
use crate::middleware::{cors_middleware, json_config, query_config};
use crate::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> io::Result<()> {
    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    init_telemetry(&config.server.rust_log);

    let db_pool = create_pool(&config)
        .await
        .expect("Failed to create database pool");

    run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(JwtConfig {
        secret_key: config.auth.jwt_secret.clone(),
        audience: config.auth.jwt_audience.clone(),
        leeway_seconds: 30,
    });

    let state = web::Data::new(AppState::new(db_pool, &config.import));
    let max_csv_bytes = state.imports.max_bytes();

    tracing::info!(
        "Starting PokerLedger backend on {}:{}",
        config.server.host,
        config.server.port
    );

    let server = HttpServer::new(move || {
        let jwt_service = jwt_service.clone();
        App::new()
            .app_data(state.clone())
            .app_data(json_config())
            .app_data(query_config())
            .app_data(web::PayloadConfig::new(max_csv_bytes))
            .wrap(cors_middleware())
            .wrap(actix_web::middleware::Logger::default())
            .configure(move |cfg| configure_routes(cfg, jwt_service))
    })
    .bind((config.server.host.clone(), config.server.port))?
    .run();

    // Graceful shutdown
    let server_handle = server.handle();
    tokio::spawn(async move {
        signal::ctrl_c().await.expect("Failed to listen for shutdown signal");
        tracing::info!("Shutdown signal received, stopping server...");
        server_handle.stop(true).await;
    });

    server.await
}
