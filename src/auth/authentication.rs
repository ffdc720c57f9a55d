use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::SqlitePool;

use crate::db::{get_session_by_token, get_user};
use crate::validation::ErrorResponse;

use super::User;

pub const SESSION_COOKIE: &str = "session_token";

/// Bearer header first, then the private session cookie.
pub fn request_token(request: &Request<'_>) -> Option<String> {
    let bearer = request
        .headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from);

    bearer.or_else(|| {
        request
            .cookies()
            .get_private(SESSION_COOKIE)
            .map(|c| c.value().to_string())
    })
}

/// The raw credential presented with the request, unverified.
pub struct SessionToken(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionToken {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request_token(request) {
            Some(token) => Outcome::Success(SessionToken(token)),
            None => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_span = tracing::info_span!("user_auth_guard");
        let _guard = auth_span.enter();

        let Some(token) = request_token(request) else {
            return Outcome::Error((Status::Unauthorized, ()));
        };

        let db = match request.rocket().state::<SqlitePool>() {
            Some(pool) => pool,
            _ => {
                tracing::error!("Database pool not found in managed state");
                return Outcome::Error((Status::InternalServerError, ()));
            }
        };

        let session = match get_session_by_token(db, &token).await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = ?err, "Invalid session token");
                return Outcome::Error((Status::Unauthorized, ()));
            }
        };

        if !session.is_valid() {
            tracing::warn!(session_id = %session.id, "Session token expired");
            return Outcome::Error((Status::Unauthorized, ()));
        }

        match get_user(db, session.user_id).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, role = %user.role.as_str(), "User authenticated via session token");
                Outcome::Success(user)
            }
            Err(err) => {
                tracing::error!(user_id = %session.user_id, error = ?err, "Failed to fetch user for valid session");
                Outcome::Error((Status::Unauthorized, ()))
            }
        }
    }
}

fn error_json(status: Status, message: &str) -> Custom<Json<ErrorResponse>> {
    Custom(status, Json(ErrorResponse::new(message)))
}

#[catch(400)]
pub fn bad_request(_req: &Request) -> Custom<Json<ErrorResponse>> {
    error_json(Status::BadRequest, "Bad request")
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<ErrorResponse>> {
    tracing::warn!("Unauthorized access attempt");
    error_json(Status::Unauthorized, "Authentication required")
}

#[catch(403)]
pub fn forbidden_api(_req: &Request) -> Custom<Json<ErrorResponse>> {
    tracing::warn!("Forbidden access attempt");
    error_json(Status::Forbidden, "You don't have permission to perform this action")
}

#[catch(404)]
pub fn not_found_api(_req: &Request) -> Custom<Json<ErrorResponse>> {
    error_json(Status::NotFound, "Resource not found")
}

#[catch(413)]
pub fn payload_too_large(_req: &Request) -> Custom<Json<ErrorResponse>> {
    error_json(Status::PayloadTooLarge, "Upload too large")
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> Custom<Json<ErrorResponse>> {
    error_json(Status::UnprocessableEntity, "Malformed request body")
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Custom<Json<ErrorResponse>> {
    error_json(Status::InternalServerError, "Server error")
}

#[catch(default)]
pub fn default_catcher(status: Status, _req: &Request) -> Custom<Json<ErrorResponse>> {
    error_json(status, status.reason().unwrap_or("An error occurred"))
}
