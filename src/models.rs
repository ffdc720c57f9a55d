use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::auth::Role;

pub const BRANCHES: [&str; 8] = [
    "CSE",
    "ECE",
    "EEE",
    "Mathematics & Computing",
    "Mechanical",
    "Civil",
    "Chemical",
    "Biotechnology",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum InternshipType {
    #[default]
    FullTime,
    PartTime,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ApplicationStatus {
    Applied,
    #[serde(rename = "Under Review")]
    #[sqlx(rename = "Under Review")]
    UnderReview,
    Shortlisted,
    Interviewing,
    Offered,
    #[serde(rename = "Not Selected")]
    #[sqlx(rename = "Not Selected")]
    NotSelected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 7] = [
        ApplicationStatus::Applied,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Interviewing,
        ApplicationStatus::Offered,
        ApplicationStatus::NotSelected,
        ApplicationStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::UnderReview => "Under Review",
            ApplicationStatus::Shortlisted => "Shortlisted",
            ApplicationStatus::Interviewing => "Interviewing",
            ApplicationStatus::Offered => "Offered",
            ApplicationStatus::NotSelected => "Not Selected",
            ApplicationStatus::Withdrawn => "Withdrawn",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<&str> = ApplicationStatus::ALL.iter().map(|s| s.as_str()).collect();
                format!("Invalid status. Must be one of: {}", allowed.join(", "))
            })
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Internship {
    pub id: i64,
    pub title: String,
    pub company_name: String,
    pub description: String,
    pub location: String,
    #[serde(rename = "type")]
    pub internship_type: InternshipType,
    pub salary: Option<String>,
    pub cgpa_cutoff: Option<f64>,
    pub deadline: DateTime<Utc>,
    pub domain: Vec<String>,
    pub skills: Vec<String>,
    pub branch: Vec<String>,
    pub internship_period: Option<String>,
    pub company_logo_url: String,
    pub responsibilities: String,
    pub about_company: String,
    pub posted_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
pub struct DbInternship {
    pub id: i64,
    pub title: String,
    pub company_name: String,
    pub description: String,
    pub location: String,
    pub internship_type: InternshipType,
    pub salary: Option<String>,
    pub cgpa_cutoff: Option<f64>,
    pub deadline: DateTime<Utc>,
    pub domain: Json<Vec<String>>,
    pub skills: Json<Vec<String>>,
    pub branch: Json<Vec<String>>,
    pub internship_period: Option<String>,
    pub company_logo_url: String,
    pub responsibilities: String,
    pub about_company: String,
    pub posted_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const INTERNSHIP_COLUMNS: &str = "id, title, company_name, description, location, \
    internship_type, salary, cgpa_cutoff, deadline, domain, skills, branch, internship_period, \
    company_logo_url, responsibilities, about_company, posted_by, created_at, updated_at";

impl From<DbInternship> for Internship {
    fn from(db: DbInternship) -> Self {
        Self {
            id: db.id,
            title: db.title,
            company_name: db.company_name,
            description: db.description,
            location: db.location,
            internship_type: db.internship_type,
            salary: db.salary,
            cgpa_cutoff: db.cgpa_cutoff,
            deadline: db.deadline,
            domain: db.domain.0,
            skills: db.skills.0,
            branch: db.branch.0,
            internship_period: db.internship_period,
            company_logo_url: db.company_logo_url,
            responsibilities: db.responsibilities,
            about_company: db.about_company,
            posted_by: db.posted_by,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Every field an internship is written with, after defaults are resolved.
#[derive(Debug, Clone)]
pub struct InternshipDraft {
    pub title: String,
    pub company_name: String,
    pub description: String,
    pub location: String,
    pub internship_type: InternshipType,
    pub salary: Option<String>,
    pub cgpa_cutoff: Option<f64>,
    pub deadline: DateTime<Utc>,
    pub domain: Vec<String>,
    pub skills: Vec<String>,
    pub branch: Vec<String>,
    pub internship_period: Option<String>,
    pub company_logo_url: String,
    pub responsibilities: String,
    pub about_company: String,
}

impl From<Internship> for InternshipDraft {
    fn from(internship: Internship) -> Self {
        Self {
            title: internship.title,
            company_name: internship.company_name,
            description: internship.description,
            location: internship.location,
            internship_type: internship.internship_type,
            salary: internship.salary,
            cgpa_cutoff: internship.cgpa_cutoff,
            deadline: internship.deadline,
            domain: internship.domain,
            skills: internship.skills,
            branch: internship.branch,
            internship_period: internship.internship_period,
            company_logo_url: internship.company_logo_url,
            responsibilities: internship.responsibilities,
            about_company: internship.about_company,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternshipSummary {
    pub id: i64,
    pub title: String,
    pub company_name: String,
    pub domain: Vec<String>,
    pub location: String,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub branch: Option<String>,
    pub profile_pic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub student_id: i64,
    pub internship_id: i64,
    pub status: ApplicationStatus,
    pub resume_url: Option<String>,
    pub applied_at: DateTime<Utc>,
}

/// An application seen by the student who submitted it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentApplication {
    #[serde(flatten)]
    pub application: Application,
    pub internship: InternshipSummary,
}

/// An application seen by placement staff reviewing one posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternshipApplication {
    #[serde(flatten)]
    pub application: Application,
    pub student: Applicant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: Application,
    pub internship: InternshipSummary,
    pub student: Applicant,
}

/// One row of the applications ⋈ internships ⋈ users join.
#[derive(sqlx::FromRow)]
pub struct DbApplicationRow {
    pub id: i64,
    pub student_id: i64,
    pub internship_id: i64,
    pub status: ApplicationStatus,
    pub resume_url: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub internship_title: String,
    pub internship_company_name: String,
    pub internship_domain: Json<Vec<String>>,
    pub internship_location: String,
    pub internship_deadline: DateTime<Utc>,
    pub student_name: String,
    pub student_email: String,
    pub student_branch: Option<String>,
    pub student_profile_pic: String,
}

impl DbApplicationRow {
    fn application(&self) -> Application {
        Application {
            id: self.id,
            student_id: self.student_id,
            internship_id: self.internship_id,
            status: self.status,
            resume_url: self.resume_url.clone(),
            applied_at: self.applied_at,
        }
    }

    fn internship(&self) -> InternshipSummary {
        InternshipSummary {
            id: self.internship_id,
            title: self.internship_title.clone(),
            company_name: self.internship_company_name.clone(),
            domain: self.internship_domain.0.clone(),
            location: self.internship_location.clone(),
            deadline: self.internship_deadline,
        }
    }

    fn student(&self) -> Applicant {
        Applicant {
            id: self.student_id,
            name: self.student_name.clone(),
            email: self.student_email.clone(),
            branch: self.student_branch.clone(),
            profile_pic: self.student_profile_pic.clone(),
        }
    }
}

impl From<DbApplicationRow> for StudentApplication {
    fn from(row: DbApplicationRow) -> Self {
        Self {
            application: row.application(),
            internship: row.internship(),
        }
    }
}

impl From<DbApplicationRow> for InternshipApplication {
    fn from(row: DbApplicationRow) -> Self {
        Self {
            application: row.application(),
            student: row.student(),
        }
    }
}

impl From<DbApplicationRow> for ApplicationDetail {
    fn from(row: DbApplicationRow) -> Self {
        Self {
            application: row.application(),
            internship: row.internship(),
            student: row.student(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub branch: Option<String>,
}
