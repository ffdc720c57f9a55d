use rocket::State;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

use crate::db::{FilterOptions, get_filter_options};
use crate::error::AppError;

pub mod analytics;
pub mod applications;
pub mod auth;
pub mod internships;
pub mod users;

pub use analytics::*;
pub use applications::*;
pub use auth::*;
pub use internships::*;
pub use users::*;

#[derive(Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[get("/filter-options")]
pub async fn api_filter_options(db: &State<Pool<Sqlite>>) -> Result<Json<FilterOptions>, AppError> {
    Ok(Json(get_filter_options(db).await?))
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

#[get("/")]
pub fn index() -> &'static str {
    "InternHub API is running"
}
