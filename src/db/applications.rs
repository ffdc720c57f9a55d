use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite};
use tracing::{info, instrument};

use crate::db::get_internship;
use crate::error::AppError;
use crate::models::{
    ApplicationDetail, ApplicationStatus, DbApplicationRow, InternshipApplication,
    StudentApplication,
};

const APPLICATION_ROW_SELECT: &str = "SELECT a.id, a.student_id, a.internship_id, a.status, \
    a.resume_url, a.applied_at, \
    i.title AS internship_title, i.company_name AS internship_company_name, \
    i.domain AS internship_domain, i.location AS internship_location, \
    i.deadline AS internship_deadline, \
    u.name AS student_name, u.email AS student_email, u.branch AS student_branch, \
    u.profile_pic AS student_profile_pic \
    FROM applications a \
    JOIN internships i ON i.id = a.internship_id \
    JOIN users u ON u.id = a.student_id";

enum RowScope {
    Application(i64),
    Student(i64),
    Internship(i64),
}

async fn fetch_application_rows(
    pool: &Pool<Sqlite>,
    scope: RowScope,
) -> Result<Vec<DbApplicationRow>, AppError> {
    let mut builder = QueryBuilder::<Sqlite>::new(APPLICATION_ROW_SELECT);
    match scope {
        RowScope::Application(id) => builder.push(" WHERE a.id = ").push_bind(id),
        RowScope::Student(id) => builder.push(" WHERE a.student_id = ").push_bind(id),
        RowScope::Internship(id) => builder.push(" WHERE a.internship_id = ").push_bind(id),
    };
    builder.push(" ORDER BY a.applied_at DESC, a.id DESC");

    Ok(builder
        .build_query_as::<DbApplicationRow>()
        .fetch_all(pool)
        .await?)
}

#[instrument(skip(pool))]
pub async fn get_application_detail(
    pool: &Pool<Sqlite>,
    id: i64,
) -> Result<ApplicationDetail, AppError> {
    fetch_application_rows(pool, RowScope::Application(id))
        .await?
        .into_iter()
        .next()
        .map(ApplicationDetail::from)
        .ok_or_else(|| AppError::NotFound("Application not found.".to_string()))
}

/// Checks run in order: internship exists, deadline, duplicate. The UNIQUE
/// constraint settles any race between the duplicate check and the insert.
#[instrument(skip(pool, resume_url))]
pub async fn submit_application(
    pool: &Pool<Sqlite>,
    student_id: i64,
    internship_id: i64,
    resume_url: Option<&str>,
) -> Result<StudentApplication, AppError> {
    info!("Submitting application");

    let internship = get_internship(pool, internship_id).await?;
    let now = Utc::now();

    if internship.deadline < now {
        return Err(AppError::DeadlinePassed(
            "Application deadline has passed.".to_string(),
        ));
    }

    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM applications WHERE student_id = ? AND internship_id = ?",
    )
    .bind(student_id)
    .bind(internship_id)
    .fetch_optional(pool)
    .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(
            "You have already applied to this internship.".to_string(),
        ));
    }

    let res = sqlx::query(
        "INSERT INTO applications (student_id, internship_id, status, resume_url, applied_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(student_id)
    .bind(internship_id)
    .bind(ApplicationStatus::Applied)
    .bind(resume_url)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| {
        AppError::conflict_on_unique(e, "You have already applied to this internship.")
    })?;

    let detail = get_application_detail(pool, res.last_insert_rowid()).await?;
    Ok(StudentApplication {
        application: detail.application,
        internship: detail.internship,
    })
}

#[instrument(skip(pool))]
pub async fn get_student_applications(
    pool: &Pool<Sqlite>,
    student_id: i64,
) -> Result<Vec<StudentApplication>, AppError> {
    info!("Fetching applications for student");
    let rows = fetch_application_rows(pool, RowScope::Student(student_id)).await?;
    Ok(rows.into_iter().map(StudentApplication::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_internship_applications(
    pool: &Pool<Sqlite>,
    internship_id: i64,
) -> Result<Vec<InternshipApplication>, AppError> {
    info!("Fetching applications for internship");
    let rows = fetch_application_rows(pool, RowScope::Internship(internship_id)).await?;
    Ok(rows.into_iter().map(InternshipApplication::from).collect())
}

/// Any status may move to any other status.
#[instrument(skip(pool))]
pub async fn update_application_status(
    pool: &Pool<Sqlite>,
    id: i64,
    status: ApplicationStatus,
) -> Result<ApplicationDetail, AppError> {
    info!(status = %status, "Updating application status");

    let res = sqlx::query("UPDATE applications SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("Application not found.".to_string()));
    }

    get_application_detail(pool, id).await
}
