use actix_web::{dev::ServiceRequest, error::ErrorUnauthorized, web, Error, HttpMessage};
use actix_web_httpauth::extractors::basic::BasicAuth;
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use uuid::Uuid;

use crate::{models::UserRow, models::ROLE_ADMIN, state::AppState};

/// Authenticated identity attached to the request once Basic auth passes.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub display_name: String,
    pub role: String,
}

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Looks up an active account and checks the password against its stored
/// argon2 hash. Unknown username and wrong password are indistinguishable
/// to the caller.
pub async fn authenticate_credentials(
    state: &AppState,
    username: &str,
    password: &str,
) -> Option<AuthUser> {
    let user: UserRow = sqlx::query_as(
        "SELECT id, username, display_name, role, password_hash, active, created_at
         FROM users WHERE username = ? AND active = 1 LIMIT 1",
    )
    .bind(username)
    .fetch_optional(&state.db)
    .await
    .ok()
    .flatten()?;

    verify_password(password, &user.password_hash).then(|| AuthUser {
        id: user.id,
        display_name: user.display_name,
        role: user.role,
    })
}

/// Validator for the `/admin` scope and the admin event stream: Basic
/// credentials must belong to an active admin account. The verified user is
/// attached as a request extension for handlers that show the display name.
pub async fn admin_validator(
    req: ServiceRequest,
    credentials: BasicAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
        return Err((ErrorUnauthorized("Unauthorized"), req));
    };
    let password = credentials.password().unwrap_or_default();
    match authenticate_credentials(state, credentials.user_id(), password).await {
        Some(user) if user.role == ROLE_ADMIN => {
            req.extensions_mut().insert(user);
            Ok(req)
        }
        Some(_) => Err((ErrorUnauthorized("Admin access required"), req)),
        None => Err((ErrorUnauthorized("Unauthorized"), req)),
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
