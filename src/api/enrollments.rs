//! Enrollments linking users to courses.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::validation::normalize_join_code;
use crate::db::{
    non_blank, CreateEnrollmentRequest, Enrollment, EnrollmentCreated, EnrollmentQuery,
    JoinCourseRequest, MessageResponse, DEFAULT_ENROLLMENT_STATUS,
};
use crate::AppState;

/// List enrollments for a course, or for a user when no course is given
pub async fn list_enrollments(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<EnrollmentQuery>,
) -> Result<Json<Vec<Enrollment>>, ApiError> {
    let enrollments = if let Some(course_id) = query.course_id {
        sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE course_id = ? ORDER BY enrollment_id",
        )
        .bind(course_id)
        .fetch_all(&state.db)
        .await?
    } else if let Some(user_id) = query.user_id {
        sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE user_id = ? ORDER BY enrollment_id",
        )
        .bind(user_id)
        .fetch_all(&state.db)
        .await?
    } else {
        sqlx::query_as::<_, Enrollment>("SELECT * FROM enrollments ORDER BY enrollment_id")
            .fetch_all(&state.db)
            .await?
    };

    Ok(Json(enrollments))
}

async fn enroll(
    state: &AppState,
    user_id: i64,
    course_id: i64,
    status: &str,
) -> Result<i64, ApiError> {
    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT enrollment_id FROM enrollments WHERE user_id = ? AND course_id = ?")
            .bind(user_id)
            .bind(course_id)
            .fetch_optional(&state.db)
            .await?;
    if existing.is_some() {
        return Err(ApiError::bad_request("User is already enrolled in this course"));
    }

    let result =
        sqlx::query("INSERT INTO enrollments (user_id, course_id, status) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(course_id)
            .bind(status)
            .execute(&state.db)
            .await?;

    let enrollment_id = result.last_insert_rowid();
    tracing::info!(enrollment_id, user_id, course_id, "User enrolled");
    Ok(enrollment_id)
}

pub async fn create_enrollment(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateEnrollmentRequest>,
) -> Result<(StatusCode, Json<EnrollmentCreated>), ApiError> {
    let (Some(user_id), Some(course_id)) = (req.user_id, req.course_id) else {
        return Err(ApiError::bad_request("userId and courseId are required"));
    };
    let status = non_blank(&req.status).unwrap_or(DEFAULT_ENROLLMENT_STATUS);

    let enrollment_id = enroll(&state, user_id, course_id, status).await?;
    Ok((StatusCode::CREATED, Json(EnrollmentCreated { enrollment_id })))
}

/// Enroll a student using the code their instructor shared
pub async fn join_course(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<JoinCourseRequest>,
) -> Result<(StatusCode, Json<EnrollmentCreated>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if req.user_id.is_none() {
        errors.add("userId", "User ID is required");
    }
    let join_code = match non_blank(&req.join_code).map(normalize_join_code) {
        Some(Ok(code)) => Some(code),
        Some(Err(e)) => {
            errors.add("joinCode", e);
            None
        }
        None => {
            errors.add("joinCode", "Join code is required");
            None
        }
    };
    errors.finish()?;

    let (Some(user_id), Some(join_code)) = (req.user_id, join_code) else {
        return Err(ApiError::bad_request("userId and joinCode are required"));
    };

    let (course_id,): (i64,) = sqlx::query_as("SELECT course_id FROM courses WHERE join_code = ?")
        .bind(&join_code)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("No course matches this join code"))?;

    let enrollment_id = enroll(&state, user_id, course_id, DEFAULT_ENROLLMENT_STATUS).await?;
    Ok((StatusCode::CREATED, Json(EnrollmentCreated { enrollment_id })))
}

pub async fn delete_enrollment(
    State(state): State<Arc<AppState>>,
    ApiPath(enrollment_id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM enrollments WHERE enrollment_id = ?")
        .bind(enrollment_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Enrollment not found"));
    }

    Ok(Json(MessageResponse::new("Enrollment deleted")))
}
