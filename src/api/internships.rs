use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::info;
use validator::Validate;

use crate::auth::{Permission, User};
use crate::config::AppConfig;
use crate::db::{create_internship, delete_internship, get_internship, list_internships, update_internship};
use crate::error::AppError;
use crate::filter::{InternshipFilter, InternshipQuery};
use crate::models::{BRANCHES, Internship, InternshipDraft, InternshipType, parse_deadline};
use crate::pagination::PageRequest;
use crate::validation::{JsonValidateExt, non_blank};

use super::MessageResponse;

/// Body for both create and partial update. Absent fields keep their value on update.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InternshipRequest {
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub internship_type: Option<InternshipType>,
    pub salary: Option<String>,
    /// `Some(None)` is an explicit `null`, which clears the cutoff on update.
    #[serde(default, deserialize_with = "nullable")]
    pub cgpa_cutoff: Option<Option<f64>>,
    pub deadline: Option<String>,
    pub domain: Option<Vec<String>>,
    pub skills: Option<Vec<String>>,
    pub branch: Option<Vec<String>>,
    pub internship_period: Option<String>,
    pub company_logo_url: Option<String>,
    pub responsibilities: Option<String>,
    pub about_company: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InternshipPage {
    pub internships: Vec<Internship>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct InternshipResponse {
    pub message: String,
    pub internship: Internship,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn cgpa(value: Option<f64>) -> Result<Option<f64>, AppError> {
    match value {
        Some(cutoff) if !(0.0..=10.0).contains(&cutoff) => Err(AppError::Validation(
            "CGPA cutoff must be between 0 and 10".to_string(),
        )),
        _ => Ok(value),
    }
}

fn required(field: &str, value: Option<&str>) -> Result<String, AppError> {
    non_blank(value)
        .map(String::from)
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

/// A present field must not be blank.
fn replace_required(field: &str, value: Option<String>, current: String) -> Result<String, AppError> {
    match value {
        Some(value) => required(field, Some(&value)),
        None => Ok(current),
    }
}

fn tags(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn branches(values: Vec<String>) -> Result<Vec<String>, AppError> {
    let values = tags(values);
    if let Some(unknown) = values.iter().find(|b| !BRANCHES.contains(&b.as_str())) {
        return Err(AppError::Validation(format!(
            "Unknown branch '{unknown}'. Must be one of: {}",
            BRANCHES.join(", ")
        )));
    }
    Ok(values)
}

fn deadline(raw: &str) -> Result<chrono::DateTime<chrono::Utc>, AppError> {
    parse_deadline(raw).ok_or_else(|| AppError::Validation("Deadline must be a valid date".to_string()))
}

fn optional_text(value: Option<String>) -> Option<String> {
    non_blank(value.as_deref()).map(String::from)
}

impl InternshipRequest {
    pub fn into_draft(self) -> Result<InternshipDraft, AppError> {
        let deadline = deadline(&required("Deadline", self.deadline.as_deref())?)?;

        Ok(InternshipDraft {
            title: required("Title", self.title.as_deref())?,
            company_name: required("Company name", self.company_name.as_deref())?,
            description: required("Description", self.description.as_deref())?,
            location: required("Location", self.location.as_deref())?,
            internship_type: self.internship_type.unwrap_or_default(),
            salary: optional_text(self.salary),
            cgpa_cutoff: cgpa(self.cgpa_cutoff.flatten())?,
            deadline,
            domain: tags(self.domain.unwrap_or_default()),
            skills: tags(self.skills.unwrap_or_default()),
            branch: branches(self.branch.unwrap_or_default())?,
            internship_period: optional_text(self.internship_period),
            company_logo_url: self.company_logo_url.unwrap_or_default().trim().to_string(),
            responsibilities: self.responsibilities.unwrap_or_default(),
            about_company: self.about_company.unwrap_or_default(),
        })
    }

    pub fn merge_into(self, current: InternshipDraft) -> Result<InternshipDraft, AppError> {
        let deadline = match self.deadline {
            Some(raw) => deadline(&raw)?,
            None => current.deadline,
        };

        Ok(InternshipDraft {
            title: replace_required("Title", self.title, current.title)?,
            company_name: replace_required("Company name", self.company_name, current.company_name)?,
            description: replace_required("Description", self.description, current.description)?,
            location: replace_required("Location", self.location, current.location)?,
            internship_type: self.internship_type.unwrap_or(current.internship_type),
            salary: match self.salary {
                Some(salary) => optional_text(Some(salary)),
                None => current.salary,
            },
            cgpa_cutoff: match self.cgpa_cutoff {
                Some(cutoff) => cgpa(cutoff)?,
                None => current.cgpa_cutoff,
            },
            deadline,
            domain: self.domain.map(tags).unwrap_or(current.domain),
            skills: self.skills.map(tags).unwrap_or(current.skills),
            branch: match self.branch {
                Some(branch) => branches(branch)?,
                None => current.branch,
            },
            internship_period: match self.internship_period {
                Some(period) => optional_text(Some(period)),
                None => current.internship_period,
            },
            company_logo_url: self
                .company_logo_url
                .map(|url| url.trim().to_string())
                .unwrap_or(current.company_logo_url),
            responsibilities: self.responsibilities.unwrap_or(current.responsibilities),
            about_company: self.about_company.unwrap_or(current.about_company),
        })
    }
}

#[get("/internships?<query..>")]
pub async fn api_list_internships(
    query: InternshipQuery,
    user: Option<User>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<InternshipPage>, AppError> {
    let filter = InternshipFilter::new(&query, user.as_ref());
    let request = PageRequest::from_params(query.page.as_deref(), query.limit.as_deref(), config);

    let page = list_internships(db, &filter, request).await?;

    Ok(Json(InternshipPage {
        internships: page.items,
        current_page: page.current_page,
        total_pages: page.total_pages,
        total_items: page.total_items,
    }))
}

#[get("/internships/<id>")]
pub async fn api_get_internship(id: i64, db: &State<Pool<Sqlite>>) -> Result<Json<Internship>, AppError> {
    Ok(Json(get_internship(db, id).await?))
}

#[post("/internships", data = "<internship>")]
pub async fn api_create_internship(
    internship: Json<InternshipRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<InternshipResponse>>, AppError> {
    user.require_permission(Permission::ManageInternships)?;

    let draft = internship.validate_custom()?.into_draft()?;
    let internship = create_internship(db, &draft, user.id).await?;
    info!(internship_id = %internship.id, user_id = %user.id, "Internship posted");

    Ok(Custom(
        Status::Created,
        Json(InternshipResponse {
            message: "Internship created successfully".to_string(),
            internship,
        }),
    ))
}

#[put("/internships/<id>", data = "<internship>")]
pub async fn api_update_internship(
    id: i64,
    internship: Json<InternshipRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<InternshipResponse>, AppError> {
    user.require_permission(Permission::ManageInternships)?;

    let changes = internship.validate_custom()?;
    let current = InternshipDraft::from(get_internship(db, id).await?);
    let draft = changes.merge_into(current)?;

    let internship = update_internship(db, id, &draft).await?;

    Ok(Json(InternshipResponse {
        message: "Internship updated successfully".to_string(),
        internship,
    }))
}

#[delete("/internships/<id>")]
pub async fn api_delete_internship(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<MessageResponse>, AppError> {
    user.require_permission(Permission::ManageInternships)?;

    let removed = delete_internship(db, id).await?;
    info!(internship_id = %id, applications_removed = removed, "Internship removed");

    Ok(Json(MessageResponse::new("Internship deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_request() -> InternshipRequest {
        InternshipRequest {
            title: Some("Backend Intern".to_string()),
            company_name: Some("Acme".to_string()),
            description: Some("Build services".to_string()),
            location: Some("Bangalore".to_string()),
            deadline: Some("2030-01-31".to_string()),
            domain: Some(vec![" Web ".to_string(), "".to_string()]),
            branch: Some(vec!["CSE".to_string()]),
            ..Default::default()
        }
    }

    #[test]
    fn test_into_draft_applies_defaults() {
        let draft = complete_request().into_draft().unwrap();
        assert_eq!(draft.internship_type, InternshipType::FullTime);
        assert_eq!(draft.domain, vec!["Web".to_string()]);
        assert!(draft.skills.is_empty());
        assert_eq!(draft.company_logo_url, "");
    }

    #[test]
    fn test_into_draft_requires_fields() {
        let mut request = complete_request();
        request.title = Some("   ".to_string());
        let err = request.into_draft().unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "Title is required"));

        let mut request = complete_request();
        request.deadline = None;
        assert!(request.into_draft().is_err());

        let mut request = complete_request();
        request.deadline = Some("someday".to_string());
        assert!(request.into_draft().is_err());
    }

    #[test]
    fn test_unknown_branch_rejected() {
        let mut request = complete_request();
        request.branch = Some(vec!["Astrology".to_string()]);
        assert!(request.into_draft().is_err());
    }

    #[test]
    fn test_cgpa_range_validated() {
        let mut request = complete_request();
        request.cgpa_cutoff = Some(Some(10.5));
        assert!(request.into_draft().is_err());

        let mut request = complete_request();
        request.cgpa_cutoff = Some(Some(7.5));
        assert_eq!(request.into_draft().unwrap().cgpa_cutoff, Some(7.5));
    }

    #[test]
    fn test_cgpa_null_and_absent_are_distinct() {
        let absent: InternshipRequest = serde_json::from_str(r#"{"title": "t"}"#).unwrap();
        assert_eq!(absent.cgpa_cutoff, None);

        let cleared: InternshipRequest = serde_json::from_str(r#"{"cgpaCutoff": null}"#).unwrap();
        assert_eq!(cleared.cgpa_cutoff, Some(None));

        let set: InternshipRequest = serde_json::from_str(r#"{"cgpaCutoff": 6.5}"#).unwrap();
        assert_eq!(set.cgpa_cutoff, Some(Some(6.5)));
    }

    #[test]
    fn test_merge_clears_cgpa_on_null() {
        let mut request = complete_request();
        request.cgpa_cutoff = Some(Some(8.0));
        let current = request.into_draft().unwrap();

        let keep = InternshipRequest::default().merge_into(current.clone()).unwrap();
        assert_eq!(keep.cgpa_cutoff, Some(8.0));

        let changes = InternshipRequest {
            cgpa_cutoff: Some(None),
            ..Default::default()
        };
        assert_eq!(changes.merge_into(current.clone()).unwrap().cgpa_cutoff, None);

        let changes = InternshipRequest {
            cgpa_cutoff: Some(Some(11.0)),
            ..Default::default()
        };
        assert!(changes.merge_into(current).is_err());
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let current = complete_request().into_draft().unwrap();
        let changes = InternshipRequest {
            location: Some("Remote".to_string()),
            cgpa_cutoff: Some(Some(8.0)),
            ..Default::default()
        };

        let merged = changes.merge_into(current.clone()).unwrap();
        assert_eq!(merged.title, current.title);
        assert_eq!(merged.location, "Remote");
        assert_eq!(merged.cgpa_cutoff, Some(8.0));
        assert_eq!(merged.branch, current.branch);
        assert_eq!(merged.deadline, current.deadline);
    }

    #[test]
    fn test_merge_rejects_blank_required_field() {
        let current = complete_request().into_draft().unwrap();
        let changes = InternshipRequest {
            company_name: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(changes.merge_into(current).is_err());
    }
}
