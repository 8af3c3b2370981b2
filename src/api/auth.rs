//! Registration, email verification and login.
//!
//! A registration is held in [`PendingRegistrations`](crate::pending::PendingRegistrations)
//! until the emailed link is followed; only then is the account written to
//! `users`, already verified.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiQuery};
use super::validation::{validate_email, validate_role, validate_text};
use crate::db::{
    non_blank, DraftUser, LoginRequest, MessageResponse, RegisterRequest,
    ResendVerificationRequest, User, UserResponse, VerifyEmailQuery,
};
use crate::notifications::{verification_email, verification_url};
use crate::AppState;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn email_taken(state: &AppState, email: &str) -> Result<bool, ApiError> {
    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT user_id FROM users WHERE email = ? COLLATE NOCASE")
            .bind(email)
            .fetch_optional(&state.db)
            .await?;
    Ok(existing.is_some())
}

/// Start a registration and email the verification link.
///
/// Responds 202 before the mail is delivered; delivery failures are logged.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    let first_name = non_blank(&req.first_name);
    let last_name = non_blank(&req.last_name);
    let email = non_blank(&req.email).map(normalize_email);
    let password = req.password.as_deref().filter(|p| !p.is_empty());
    let role = non_blank(&req.role);

    match first_name {
        Some(name) => {
            errors.check("firstName", validate_text(name, "First name"));
        }
        None => {
            errors.add("firstName", "First name is required");
        }
    }
    match last_name {
        Some(name) => {
            errors.check("lastName", validate_text(name, "Last name"));
        }
        None => {
            errors.add("lastName", "Last name is required");
        }
    }
    match &email {
        Some(email) => {
            errors.check(
                "email",
                validate_email(email, &state.config.auth.email_domain_suffix),
            );
        }
        None => {
            errors.add("email", "Email is required");
        }
    }
    if password.is_none() {
        errors.add("password", "Password is required");
    }
    let role = match role.map(validate_role) {
        Some(Ok(role)) => Some(role),
        Some(Err(e)) => {
            errors.add("role", e);
            None
        }
        None => {
            errors.add("role", "Role is required");
            None
        }
    };
    errors.finish()?;

    let (Some(first_name), Some(last_name), Some(email), Some(password), Some(role)) =
        (first_name, last_name, email, password, role)
    else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    if email_taken(&state, &email).await? {
        return Err(ApiError::validation_field(
            "email",
            "An account with this email already exists",
        ));
    }

    let password_hash = hash_password(password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to process registration")
    })?;

    let draft = DraftUser {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.clone(),
        password_hash,
        role,
    };
    let token = state.pending.insert(draft);
    tracing::info!(email = %email, role = %role, "Registration pending verification");

    let verify_url = verification_url(&state.config.server.public_url, &token);
    let message = verification_email(&email, first_name, &verify_url);
    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer.send(message).await {
            tracing::error!(to = %email, error = %e, "Failed to send verification email");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(
            "Verification email is being sent. Please check your email.",
        )),
    ))
}

/// Turn a pending registration into a verified account
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<VerifyEmailQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = non_blank(&query.token)
        .ok_or_else(|| ApiError::bad_request("Verification token is required"))?;

    let draft = state
        .pending
        .get(token)
        .ok_or_else(|| ApiError::bad_request("Invalid or expired verification token"))?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (first_name, last_name, email, password_hash, role, verified, verify_token)
        VALUES (?, ?, ?, ?, ?, 1, NULL)
        "#,
    )
    .bind(&draft.first_name)
    .bind(&draft.last_name)
    .bind(&draft.email)
    .bind(&draft.password_hash)
    .bind(draft.role.as_str())
    .execute(&state.db)
    .await;

    match result {
        Ok(done) => {
            state.pending.remove(token);
            tracing::info!(
                user_id = done.last_insert_rowid(),
                email = %draft.email,
                "Email verified, account created"
            );
            Ok(Json(MessageResponse::new(
                "Email verified successfully. You can now log in.",
            )))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => {
            state.pending.remove(token);
            Err(ApiError::bad_request(
                "An account with this email already exists",
            ))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create verified user");
            Err(ApiError::database("Server error during verification"))
        }
    }
}

/// Email a fresh link for a registration that is still pending
pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ResendVerificationRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = non_blank(&req.email)
        .map(normalize_email)
        .ok_or_else(|| ApiError::bad_request("Email is required"))?;

    let (token, draft) = state
        .pending
        .reissue(&email)
        .ok_or_else(|| ApiError::bad_request("No unverified account found with this email"))?;

    let verify_url = verification_url(&state.config.server.public_url, &token);
    let message = verification_email(&draft.email, &draft.first_name, &verify_url);

    state.mailer.send(message).await.map_err(|e| {
        tracing::error!(to = %draft.email, error = %e, "Failed to resend verification email");
        ApiError::mail("Failed to send verification email")
    })?;

    Ok(Json(MessageResponse::new("Verification email sent")))
}

/// Check credentials and return the account
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let (Some(email), Some(password)) = (
        non_blank(&req.email).map(normalize_email),
        req.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ? COLLATE NOCASE")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?;

    let Some(user) = user else {
        // Registered but never clicked the link: tell the client so it can offer a resend.
        if let Some(draft) = state.pending.find_by_email(&email) {
            if verify_password(password, &draft.password_hash) {
                return Err(ApiError::unauthorized("Email not verified")
                    .with_extra("needsVerification", true));
            }
        }
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    if !verify_password(password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    if !user.verified {
        return Err(ApiError::unauthorized("Email not verified").with_extra("needsVerification", true));
    }

    tracing::debug!(user_id = user.user_id, "User logged in");
    Ok(Json(UserResponse::from(user)))
}
