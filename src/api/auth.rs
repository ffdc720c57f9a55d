use chrono::{Duration, Utc};
use rocket::State;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{Permission, Role, SESSION_COOKIE, SessionToken, User, UserSession};
use crate::config::AppConfig;
use crate::db::{authenticate_user, create_user, create_user_session, get_user, invalidate_session};
use crate::error::AppError;
use crate::models::{BRANCHES, NewUser};
use crate::validation::{JsonValidateExt, non_blank};

use super::MessageResponse;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    name: String,
    #[serde(default)]
    #[validate(email(message = "A valid email is required"))]
    email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    password: String,
    role: Option<String>,
    branch: Option<String>,
    ccpd_code: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email is required"))]
    email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Persists a fresh session and mirrors its token into the private cookie.
async fn start_session(
    db: &Pool<Sqlite>,
    config: &AppConfig,
    cookies: &CookieJar<'_>,
    user_id: i64,
) -> Result<String, AppError> {
    let token = UserSession::generate_token();
    let expires_at = Utc::now() + Duration::hours(config.session_hours);

    create_user_session(db, user_id, &token, expires_at).await?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .same_site(SameSite::Lax)
        .http_only(true)
        .max_age(rocket::time::Duration::hours(config.session_hours));
    cookies.add_private(cookie);

    Ok(token)
}

fn resolve_role(raw: Option<&str>, ccpd_code: Option<&str>, config: &AppConfig) -> Result<Role, AppError> {
    let role = match non_blank(raw) {
        Some(raw) => Role::from_str(&raw.to_lowercase())
            .map_err(|_| AppError::Validation("Role must be one of: student, ccpd".to_string()))?,
        None => Role::Student,
    };

    match role {
        Role::Admin => Err(AppError::Authorization(
            "Admin accounts cannot be self-registered.".to_string(),
        )),
        Role::Ccpd if non_blank(ccpd_code) != Some(config.ccpd_code.as_str()) => {
            warn!("Rejected CCPD registration with a wrong access code");
            Err(AppError::Authorization("Invalid CCPD access code.".to_string()))
        }
        role => Ok(role),
    }
}

#[post("/register", data = "<registration>")]
pub async fn api_register(
    registration: Json<RegisterRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Custom<Json<AuthResponse>>, AppError> {
    let mut registration = registration.into_inner();
    registration.email = registration.email.trim().to_string();
    registration.validate()?;

    let name = registration.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    let role = resolve_role(
        registration.role.as_deref(),
        registration.ccpd_code.as_deref(),
        config,
    )?;

    let branch = non_blank(registration.branch.as_deref()).map(String::from);
    if role == Role::Student {
        match branch.as_deref() {
            None => {
                return Err(AppError::Validation("Branch is required for students".to_string()));
            }
            Some(b) if !BRANCHES.contains(&b) => {
                return Err(AppError::Validation(format!(
                    "Unknown branch '{b}'. Must be one of: {}",
                    BRANCHES.join(", ")
                )));
            }
            Some(_) => {}
        }
    }

    let user_id = create_user(
        db,
        &NewUser {
            name: name.to_string(),
            email: registration.email,
            password: registration.password,
            role,
            branch,
        },
    )
    .await?;

    let token = start_session(db, config, cookies, user_id).await?;
    let user = get_user(db, user_id).await?;
    info!(user_id = %user.id, role = %user.role, "User registered");

    Ok(Custom(Status::Created, Json(AuthResponse { token, user })))
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<AuthResponse>, AppError> {
    let login = login.validate_custom()?;

    let Some(user) = authenticate_user(db, &login.email, &login.password).await? else {
        return Err(AppError::Authentication("Invalid email or password".to_string()));
    };

    let token = start_session(db, config, cookies, user.id).await?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse { token, user }))
}

#[post("/logout")]
pub async fn api_logout(
    user: User,
    token: SessionToken,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<MessageResponse>, AppError> {
    invalidate_session(db, &token.0).await?;
    cookies.remove_private(Cookie::from(SESSION_COOKIE));
    info!(user_id = %user.id, "User logged out");

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

#[get("/profile")]
pub async fn api_profile(user: User) -> Result<Json<User>, AppError> {
    user.require_permission(Permission::ViewOwnProfile)?;
    Ok(Json(user))
}
