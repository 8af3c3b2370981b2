//! Assessments (named surveys) belonging to a course.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::validation::{validate_date, validate_text};
use crate::db::{
    non_blank, Assessment, AssessmentCreated, AssessmentQuery, CreateAssessmentRequest,
    MessageResponse, UpdateAssessmentRequest,
};
use crate::AppState;

fn check_dates(
    errors: &mut ValidationErrorBuilder,
    start_date: &Option<String>,
    end_date: &Option<String>,
) {
    errors.check("startDate", validate_date(start_date));
    errors.check("endDate", validate_date(end_date));
}

pub async fn list_assessments(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<AssessmentQuery>,
) -> Result<Json<Vec<Assessment>>, ApiError> {
    let course_id = query
        .course_id
        .ok_or_else(|| ApiError::bad_request("Missing courseId"))?;

    let assessments = sqlx::query_as::<_, Assessment>(
        "SELECT * FROM assessments WHERE course_id = ? ORDER BY assessment_id",
    )
    .bind(course_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(assessments))
}

pub async fn get_assessment(
    State(state): State<Arc<AppState>>,
    ApiPath(assessment_id): ApiPath<i64>,
) -> Result<Json<Assessment>, ApiError> {
    let assessment =
        sqlx::query_as::<_, Assessment>("SELECT * FROM assessments WHERE assessment_id = ?")
            .bind(assessment_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Assessment not found"))?;

    Ok(Json(assessment))
}

pub async fn create_assessment(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateAssessmentRequest>,
) -> Result<(StatusCode, Json<AssessmentCreated>), ApiError> {
    let (Some(course_id), Some(name), Some(created_by)) =
        (req.course_id, non_blank(&req.name), req.created_by)
    else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    let mut errors = ValidationErrorBuilder::new();
    errors.check("name", validate_text(name, "Assessment name"));
    check_dates(&mut errors, &req.start_date, &req.end_date);
    errors.finish()?;

    let result = sqlx::query(
        r#"
        INSERT INTO assessments (course_id, name, description, start_date, end_date, created_by)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(course_id)
    .bind(name)
    .bind(non_blank(&req.description))
    .bind(non_blank(&req.start_date))
    .bind(non_blank(&req.end_date))
    .bind(created_by)
    .execute(&state.db)
    .await?;

    let assessment_id = result.last_insert_rowid();
    tracing::info!(assessment_id, course_id, "Assessment created");

    Ok((StatusCode::CREATED, Json(AssessmentCreated { assessment_id })))
}

pub async fn update_assessment(
    State(state): State<Arc<AppState>>,
    ApiPath(assessment_id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateAssessmentRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(name) = &req.name {
        errors.check("name", validate_text(name, "Assessment name"));
    }
    check_dates(&mut errors, &req.start_date, &req.end_date);
    errors.finish()?;

    let result = sqlx::query(
        r#"
        UPDATE assessments SET
            name = COALESCE(?, name),
            description = COALESCE(?, description),
            start_date = COALESCE(?, start_date),
            end_date = COALESCE(?, end_date)
        WHERE assessment_id = ?
        "#,
    )
    .bind(non_blank(&req.name))
    .bind(req.description.as_deref())
    .bind(non_blank(&req.start_date))
    .bind(non_blank(&req.end_date))
    .bind(assessment_id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Assessment not found"));
    }

    Ok(Json(MessageResponse::new("Assessment updated")))
}

pub async fn delete_assessment(
    State(state): State<Arc<AppState>>,
    ApiPath(assessment_id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM assessments WHERE assessment_id = ?")
        .bind(assessment_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Assessment not found"));
    }

    Ok(Json(MessageResponse::new("Assessment deleted")))
}
