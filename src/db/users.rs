use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::auth::{DbUser, Role, User};
use crate::error::AppError;
use crate::models::NewUser;

const USER_COLUMNS: &str = "id, name, email, role, branch, profile_pic, created_at";

// Cheap hashes keep the test suite fast; production uses the bcrypt default.
#[cfg(test)]
const HASH_COST: u32 = 4;
#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[instrument]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let row = sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound("User not found".to_string())),
    }
}

#[instrument]
pub async fn find_user_by_email(pool: &Pool<Sqlite>, email: &str) -> Result<Option<User>, AppError> {
    info!("Finding user by email");
    let row = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
    ))
    .bind(normalize_email(email))
    .fetch_optional(pool)
    .await?;

    Ok(row.map(User::from))
}

#[instrument(skip(pool, new_user), fields(email = %new_user.email, role = %new_user.role))]
pub async fn create_user(pool: &Pool<Sqlite>, new_user: &NewUser) -> Result<i64, AppError> {
    info!("Creating user");

    let hashed_password = bcrypt::hash(&new_user.password, HASH_COST)?;
    let branch = match new_user.role {
        Role::Student => new_user.branch.clone(),
        _ => None,
    };
    let now = Utc::now();

    let res = sqlx::query(
        "INSERT INTO users (name, email, password, role, branch, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(new_user.name.trim())
    .bind(normalize_email(&new_user.email))
    .bind(hashed_password)
    .bind(new_user.role)
    .bind(branch)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "Email already registered."))?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, password))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");

    let row: Option<(i64, String)> =
        sqlx::query_as("SELECT id, password FROM users WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await?;

    let Some((id, hash)) = row else {
        return Ok(None);
    };

    if bcrypt::verify(password, &hash)? {
        Ok(Some(get_user(pool, id).await?))
    } else {
        Ok(None)
    }
}

#[instrument]
pub async fn update_user_name(pool: &Pool<Sqlite>, user_id: i64, name: &str) -> Result<User, AppError> {
    info!("Updating user name");
    let res = sqlx::query("UPDATE users SET name = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    get_user(pool, user_id).await
}

#[instrument(skip_all, fields(user_id))]
pub async fn update_user_password(
    pool: &Pool<Sqlite>,
    user_id: i64,
    new_password: &str,
) -> Result<(), AppError> {
    info!("Updating user password");
    let hashed_password = bcrypt::hash(new_password, HASH_COST)?;

    sqlx::query("UPDATE users SET password = ?, updated_at = ? WHERE id = ?")
        .bind(hashed_password)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument]
pub async fn update_profile_pic(
    pool: &Pool<Sqlite>,
    user_id: i64,
    profile_pic: &str,
) -> Result<User, AppError> {
    info!("Updating profile picture");
    sqlx::query("UPDATE users SET profile_pic = ?, updated_at = ? WHERE id = ?")
        .bind(profile_pic)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;

    get_user(pool, user_id).await
}

/// Creates the configured admin account unless that email is already taken.
#[instrument(skip(pool, password))]
pub async fn ensure_admin(pool: &Pool<Sqlite>, email: &str, password: &str) -> Result<bool, AppError> {
    if find_user_by_email(pool, email).await?.is_some() {
        return Ok(false);
    }

    info!("Bootstrapping admin account");
    create_user(
        pool,
        &NewUser {
            name: "Administrator".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: Role::Admin,
            branch: None,
        },
    )
    .await?;

    Ok(true)
}
