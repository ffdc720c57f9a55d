use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::{Permission, Role};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub profile_pic: String,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub branch: Option<String>,
    pub profile_pic: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(user: DbUser) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            branch: user.branch.filter(|b| !b.trim().is_empty()),
            profile_pic: user.profile_pic,
            created_at: user.created_at,
        }
    }
}

impl User {
    pub fn require_permission(&self, permission: Permission) -> Result<(), AppError> {
        if self.role.has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.id,
                role = %self.role.as_str(),
                permission = ?permission,
                "Permission denied"
            );
            Err(AppError::Authorization(denial_message(permission).to_string()))
        }
    }

    /// Branch used to restrict internship listings, if any.
    pub fn eligibility_branch(&self) -> Option<&str> {
        match self.role {
            Role::Student => self.branch.as_deref(),
            _ => None,
        }
    }
}

fn denial_message(permission: Permission) -> &'static str {
    match permission {
        Permission::ApplyToInternships => "Only students can apply.",
        Permission::ViewOwnApplications => "Only students can view their applications.",
        Permission::ViewAnalytics => "Only CCPD and Admin users can view analytics.",
        Permission::ManageInternships => "Only CCPD or Admin can manage internships.",
        Permission::ViewApplicants | Permission::UpdateApplicationStatus => "Access restricted.",
        Permission::ViewOwnProfile | Permission::EditOwnProfile => "Access restricted.",
    }
}
