#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod config;
mod cors;
mod db;
mod env;
mod error;
mod filter;
mod models;
mod pagination;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use rocket::figment::Figment;
use rocket::fs::{FileServer, Options};
use rocket::{Build, Rocket};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use thiserror::Error;
use tracing::{error, info};

use api::*;
use auth::{
    bad_request, default_catcher, forbidden_api, internal_error, not_found_api, payload_too_large,
    unauthorized_api, unprocessable,
};
use config::AppConfig;
use cors::{CorsFairing, cors_preflight};
use db::{clean_expired_sessions, ensure_admin};
use env::load_environment;
use error::AppError;
use telemetry::{OtelGuard, TelemetryFairing, init_tracing};

pub static TELEMETRY_GUARD: Lazy<Mutex<Option<OtelGuard>>> = Lazy::new(|| Mutex::new(None));

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Figment(rocket::figment::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("{0}")]
    Rocket(Box<rocket::Error>),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

impl From<rocket::figment::Error> for Error {
    fn from(value: rocket::figment::Error) -> Self {
        Error::Figment(value)
    }
}

impl From<rocket::Error> for Error {
    fn from(value: rocket::Error) -> Self {
        Error::Rocket(Box::new(value))
    }
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    let env_loaded = load_environment().map_err(|e| anyhow::anyhow!(e.to_string()));

    if let Some(guard) = init_tracing() {
        if let Ok(mut slot) = TELEMETRY_GUARD.lock() {
            *slot = Some(guard);
        }
    }
    env_loaded?;

    let rocket = build().await?;
    let _ = rocket.launch().await?;

    Ok(())
}

async fn build() -> Result<Rocket<Build>, Error> {
    let figment = AppConfig::figment();
    let config = AppConfig::from_figment(&figment)?;

    std::fs::create_dir_all(Path::new(&config.upload_dir).join(PROFILE_PIC_DIR))
        .map_err(AppError::from)?;

    let pool = SqlitePoolOptions::new().connect(&config.database_url).await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(AppError::from)?;
    info!("Migrations completed successfully");

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        if ensure_admin(&pool, email, password).await? {
            info!(email = %email, "Admin account created");
        }
    }

    let pool_clone = pool.clone();

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool_clone).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(3600)).await;
        }
    });

    Ok(init_rocket(pool, config, figment).await)
}

pub async fn init_rocket(pool: SqlitePool, config: AppConfig, figment: Figment) -> Rocket<Build> {
    info!("Starting InternHub");

    let uploads = FileServer::new(&config.upload_dir, Options::Missing);
    let cors = CorsFairing::new(&config.cors_origins);

    rocket::custom(figment)
        .manage(pool)
        .manage(config)
        .mount("/", routes![index, cors_preflight])
        .mount("/uploads", uploads)
        .mount(
            "/api/auth",
            routes![api_register, api_login, api_logout, api_profile],
        )
        .mount(
            "/api/users",
            routes![
                api_update_profile,
                api_update_password,
                api_update_profile_picture,
            ],
        )
        .mount(
            "/api",
            routes![
                api_list_internships,
                api_get_internship,
                api_create_internship,
                api_update_internship,
                api_delete_internship,
                api_apply,
                api_my_applications,
                api_internship_applications,
                api_update_application_status,
                api_analytics_summary,
                api_domain_stats,
                api_platform_growth,
                api_popular_internships,
                api_application_status,
                api_filter_options,
                health,
            ],
        )
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized_api,
                forbidden_api,
                not_found_api,
                payload_too_large,
                unprocessable,
                internal_error,
                default_catcher,
            ],
        )
        .attach(TelemetryFairing)
        .attach(cors)
}
