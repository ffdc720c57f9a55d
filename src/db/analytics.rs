use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::ApplicationStatus;

pub const DEFAULT_GROWTH_DAYS: i64 = 30;
pub const MAX_GROWTH_DAYS: i64 = 3650;
const TOP_DOMAINS: i64 = 10;
const TOP_INTERNSHIPS: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSummary {
    pub total_internships: i64,
    pub total_applications: i64,
    pub total_users: i64,
    pub unique_companies: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct DomainCount {
    pub domain: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserGrowthPoint {
    pub date: String,
    pub user_signups: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InternshipGrowthPoint {
    pub date: String,
    pub internships_posted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformGrowth {
    pub user_growth: Vec<UserGrowthPoint>,
    pub internship_growth: Vec<InternshipGrowthPoint>,
    pub days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PopularInternship {
    pub internship_id: i64,
    pub title: String,
    pub company_name: String,
    pub application_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct StatusCount {
    pub status: ApplicationStatus,
    pub count: i64,
}

/// `None`, unparsable and non-positive values all mean the default window.
/// Larger windows are capped at ten years.
pub fn growth_days(raw: Option<&str>) -> i64 {
    raw.and_then(|d| d.trim().parse::<i64>().ok())
        .filter(|d| *d > 0)
        .map(|d| d.min(MAX_GROWTH_DAYS))
        .unwrap_or(DEFAULT_GROWTH_DAYS)
}

#[instrument(skip(pool))]
pub async fn get_platform_summary(pool: &Pool<Sqlite>) -> Result<PlatformSummary, AppError> {
    info!("Computing platform summary");

    let (total_internships, unique_companies): (i64, i64) =
        sqlx::query_as("SELECT COUNT(*), COUNT(DISTINCT company_name) FROM internships")
            .fetch_one(pool)
            .await?;
    let total_applications: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applications")
        .fetch_one(pool)
        .await?;
    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    Ok(PlatformSummary {
        total_internships,
        total_applications,
        total_users,
        unique_companies,
    })
}

/// An internship with several domain tags counts once per tag.
#[instrument(skip(pool))]
pub async fn get_domain_stats(pool: &Pool<Sqlite>) -> Result<Vec<DomainCount>, AppError> {
    info!("Computing domain stats");

    let rows = sqlx::query_as::<_, DomainCount>(
        "SELECT tag.value AS domain, COUNT(*) AS count
         FROM internships, json_each(internships.domain) AS tag
         GROUP BY tag.value
         ORDER BY count DESC, domain ASC
         LIMIT ?",
    )
    .bind(TOP_DOMAINS)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[instrument(skip(pool))]
pub async fn get_platform_growth(pool: &Pool<Sqlite>, days: i64) -> Result<PlatformGrowth, AppError> {
    info!("Computing platform growth");

    let days = days.clamp(1, MAX_GROWTH_DAYS);
    let since = Utc::now() - Duration::days(days);

    let user_growth = sqlx::query_as::<_, UserGrowthPoint>(
        "SELECT substr(created_at, 1, 10) AS date, COUNT(*) AS user_signups
         FROM users WHERE created_at >= ?
         GROUP BY date ORDER BY date ASC",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    let internship_growth = sqlx::query_as::<_, InternshipGrowthPoint>(
        "SELECT substr(created_at, 1, 10) AS date, COUNT(*) AS internships_posted
         FROM internships WHERE created_at >= ?
         GROUP BY date ORDER BY date ASC",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(PlatformGrowth {
        user_growth,
        internship_growth,
        days,
    })
}

#[instrument(skip(pool))]
pub async fn get_popular_internships(
    pool: &Pool<Sqlite>,
) -> Result<Vec<PopularInternship>, AppError> {
    info!("Computing popular internships");

    let rows = sqlx::query_as::<_, PopularInternship>(
        "SELECT i.id AS internship_id, i.title, i.company_name, COUNT(a.id) AS application_count
         FROM applications a
         JOIN internships i ON i.id = a.internship_id
         GROUP BY i.id
         ORDER BY application_count DESC, i.id ASC
         LIMIT ?",
    )
    .bind(TOP_INTERNSHIPS)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[instrument(skip(pool))]
pub async fn get_application_status_breakdown(
    pool: &Pool<Sqlite>,
) -> Result<Vec<StatusCount>, AppError> {
    info!("Computing application status breakdown");

    let rows = sqlx::query_as::<_, StatusCount>(
        "SELECT status, COUNT(*) AS count
         FROM applications
         GROUP BY status
         ORDER BY count DESC, status ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
