use chrono::Utc;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{Pool, QueryBuilder, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::filter::InternshipFilter;
use crate::models::{DbInternship, INTERNSHIP_COLUMNS, Internship, InternshipDraft};
use crate::pagination::{Page, PageRequest};

#[instrument(skip(pool))]
pub async fn get_internship(pool: &Pool<Sqlite>, id: i64) -> Result<Internship, AppError> {
    info!("Fetching internship by ID");
    let row = sqlx::query_as::<_, DbInternship>(&format!(
        "SELECT {INTERNSHIP_COLUMNS} FROM internships WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(internship) => Ok(Internship::from(internship)),
        _ => Err(AppError::NotFound("Internship not found".to_string())),
    }
}

/// Counts and fetches one page from the same snapshot.
#[instrument(skip(pool))]
pub async fn list_internships(
    pool: &Pool<Sqlite>,
    filter: &InternshipFilter,
    page: PageRequest,
) -> Result<Page<Internship>, AppError> {
    info!(clauses = filter.clauses().len(), "Listing internships");

    let mut tx = pool.begin().await?;

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM internships");
    filter.push_where(&mut count);
    let total_items = count.build_query_scalar::<i64>().fetch_one(&mut *tx).await?;

    let mut select =
        QueryBuilder::<Sqlite>::new(format!("SELECT {INTERNSHIP_COLUMNS} FROM internships"));
    filter.push_where(&mut select);
    select
        .push(" ORDER BY internships.created_at DESC, internships.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows = select
        .build_query_as::<DbInternship>()
        .fetch_all(&mut *tx)
        .await?;

    tx.commit().await?;

    let internships = rows.into_iter().map(Internship::from).collect();
    Ok(Page::new(internships, page, total_items))
}

#[instrument(skip(pool, draft), fields(title = %draft.title))]
pub async fn create_internship(
    pool: &Pool<Sqlite>,
    draft: &InternshipDraft,
    posted_by: i64,
) -> Result<Internship, AppError> {
    info!("Creating internship");
    let now = Utc::now();

    let res = sqlx::query(
        "INSERT INTO internships (title, company_name, description, location, internship_type,
            salary, cgpa_cutoff, deadline, domain, skills, branch, internship_period,
            company_logo_url, responsibilities, about_company, posted_by, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&draft.title)
    .bind(&draft.company_name)
    .bind(&draft.description)
    .bind(&draft.location)
    .bind(draft.internship_type)
    .bind(&draft.salary)
    .bind(draft.cgpa_cutoff)
    .bind(draft.deadline)
    .bind(Json(&draft.domain))
    .bind(Json(&draft.skills))
    .bind(Json(&draft.branch))
    .bind(&draft.internship_period)
    .bind(&draft.company_logo_url)
    .bind(&draft.responsibilities)
    .bind(&draft.about_company)
    .bind(posted_by)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get_internship(pool, res.last_insert_rowid()).await
}

#[instrument(skip(pool, draft))]
pub async fn update_internship(
    pool: &Pool<Sqlite>,
    id: i64,
    draft: &InternshipDraft,
) -> Result<Internship, AppError> {
    info!("Updating internship");

    let res = sqlx::query(
        "UPDATE internships SET title = ?, company_name = ?, description = ?, location = ?,
            internship_type = ?, salary = ?, cgpa_cutoff = ?, deadline = ?, domain = ?, skills = ?,
            branch = ?, internship_period = ?, company_logo_url = ?, responsibilities = ?,
            about_company = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&draft.title)
    .bind(&draft.company_name)
    .bind(&draft.description)
    .bind(&draft.location)
    .bind(draft.internship_type)
    .bind(&draft.salary)
    .bind(draft.cgpa_cutoff)
    .bind(draft.deadline)
    .bind(Json(&draft.domain))
    .bind(Json(&draft.skills))
    .bind(Json(&draft.branch))
    .bind(&draft.internship_period)
    .bind(&draft.company_logo_url)
    .bind(&draft.responsibilities)
    .bind(&draft.about_company)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("Internship not found".to_string()));
    }

    get_internship(pool, id).await
}

/// Deletes an internship together with its applications in one transaction.
/// Returns the number of applications removed.
#[instrument(skip(pool))]
pub async fn delete_internship(pool: &Pool<Sqlite>, id: i64) -> Result<u64, AppError> {
    info!("Deleting internship and its applications");

    let mut tx = pool.begin().await?;

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM internships WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

    if exists.is_none() {
        return Err(AppError::NotFound("Internship not found".to_string()));
    }

    let applications = sqlx::query("DELETE FROM applications WHERE internship_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM internships WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(applications_removed = applications, "Internship deleted");
    Ok(applications)
}

#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub domains: Vec<String>,
    pub locations: Vec<String>,
    pub company_names: Vec<String>,
    pub cgpa_cutoffs: Vec<f64>,
}

#[instrument(skip(pool))]
pub async fn get_filter_options(pool: &Pool<Sqlite>) -> Result<FilterOptions, AppError> {
    info!("Collecting filter options");

    let domains: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT tag.value FROM internships, json_each(internships.domain) AS tag
         WHERE trim(tag.value) != '' ORDER BY tag.value",
    )
    .fetch_all(pool)
    .await?;

    let locations: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT location FROM internships WHERE trim(location) != '' ORDER BY location",
    )
    .fetch_all(pool)
    .await?;

    let company_names: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT company_name FROM internships WHERE trim(company_name) != ''
         ORDER BY company_name",
    )
    .fetch_all(pool)
    .await?;

    let cgpa_cutoffs: Vec<f64> = sqlx::query_scalar(
        "SELECT DISTINCT cgpa_cutoff FROM internships WHERE cgpa_cutoff IS NOT NULL
         ORDER BY cgpa_cutoff",
    )
    .fetch_all(pool)
    .await?;

    Ok(FilterOptions {
        domains,
        locations,
        company_names,
        cgpa_cutoffs,
    })
}
