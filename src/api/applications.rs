use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::auth::{Permission, User};
use crate::db::{
    get_internship_applications, get_student_applications, submit_application,
    update_application_status,
};
use crate::error::AppError;
use crate::models::{ApplicationDetail, ApplicationStatus, InternshipApplication, StudentApplication};
use crate::validation::non_blank;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    internship_id: Option<i64>,
    resume_url: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct StatusUpdateRequest {
    status: Option<String>,
}

#[post("/applications", data = "<apply>")]
pub async fn api_apply(
    apply: Json<ApplyRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<StudentApplication>>, AppError> {
    user.require_permission(Permission::ApplyToInternships)?;

    let apply = apply.into_inner();
    let Some(internship_id) = apply.internship_id else {
        return Err(AppError::Validation("Internship ID is required.".to_string()));
    };

    let resume_url = non_blank(apply.resume_url.as_deref());
    let application = submit_application(db, user.id, internship_id, resume_url).await?;
    info!(application_id = %application.application.id, "Application submitted");

    Ok(Custom(Status::Created, Json(application)))
}

#[get("/applications/my")]
pub async fn api_my_applications(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<StudentApplication>>, AppError> {
    user.require_permission(Permission::ViewOwnApplications)?;
    Ok(Json(get_student_applications(db, user.id).await?))
}

#[get("/applications/internship/<id>")]
pub async fn api_internship_applications(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<InternshipApplication>>, AppError> {
    user.require_permission(Permission::ViewApplicants)?;
    Ok(Json(get_internship_applications(db, id).await?))
}

#[patch("/applications/<id>/status", data = "<update>")]
pub async fn api_update_application_status(
    id: i64,
    update: Json<StatusUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ApplicationDetail>, AppError> {
    user.require_permission(Permission::UpdateApplicationStatus)?;

    let status = non_blank(update.status.as_deref())
        .ok_or_else(|| AppError::Validation("Status is required.".to_string()))?
        .parse::<ApplicationStatus>()
        .map_err(AppError::Validation)?;

    let application = update_application_status(db, id, status).await?;
    info!(application_id = %id, status = %status, "Application status changed");

    Ok(Json(application))
}
