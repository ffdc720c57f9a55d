use rocket::State;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use crate::auth::{Permission, User};
use crate::db::{
    DomainCount, PlatformGrowth, PlatformSummary, PopularInternship, StatusCount,
    get_application_status_breakdown, get_domain_stats, get_platform_growth,
    get_platform_summary, get_popular_internships, growth_days,
};
use crate::error::AppError;

#[get("/analytics/summary")]
pub async fn api_analytics_summary(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<PlatformSummary>, AppError> {
    user.require_permission(Permission::ViewAnalytics)?;
    Ok(Json(get_platform_summary(db).await?))
}

#[get("/analytics/domain-stats")]
pub async fn api_domain_stats(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<DomainCount>>, AppError> {
    user.require_permission(Permission::ViewAnalytics)?;
    Ok(Json(get_domain_stats(db).await?))
}

#[get("/analytics/platform-growth?<days>")]
pub async fn api_platform_growth(
    days: Option<String>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<PlatformGrowth>, AppError> {
    user.require_permission(Permission::ViewAnalytics)?;
    Ok(Json(get_platform_growth(db, growth_days(days.as_deref())).await?))
}

#[get("/analytics/popular-internships")]
pub async fn api_popular_internships(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<PopularInternship>>, AppError> {
    user.require_permission(Permission::ViewAnalytics)?;
    Ok(Json(get_popular_internships(db).await?))
}

#[get("/analytics/application-status")]
pub async fn api_application_status(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<StatusCount>>, AppError> {
    user.require_permission(Permission::ViewAnalytics)?;
    Ok(Json(get_application_status_breakdown(db).await?))
}
