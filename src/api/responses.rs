//! Answers submitted by reviewers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::db::{
    AssessmentResponse, CreateResponseRequest, MessageResponse, ResponseCreated, ResponseQuery,
};
use crate::AppState;

/// One reviewer's answers for one assessment
pub async fn list_responses(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ResponseQuery>,
) -> Result<Json<Vec<AssessmentResponse>>, ApiError> {
    let (Some(assessment_id), Some(reviewer_id)) = (query.assessment_id, query.reviewer_id) else {
        return Err(ApiError::bad_request("Missing assessmentId or reviewerId"));
    };

    let responses = sqlx::query_as::<_, AssessmentResponse>(
        r#"
        SELECT * FROM assessment_responses
        WHERE assessment_id = ? AND reviewer_id = ?
        ORDER BY response_id
        "#,
    )
    .bind(assessment_id)
    .bind(reviewer_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(responses))
}

pub async fn create_response(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateResponseRequest>,
) -> Result<(StatusCode, Json<ResponseCreated>), ApiError> {
    let (Some(assessment_id), Some(question_id), Some(reviewer_id), Some(reviewee_id), Some(text)) = (
        req.assessment_id,
        req.question_id,
        req.reviewer_id,
        req.reviewee_id,
        req.response_text.as_deref(),
    ) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    let result = sqlx::query(
        r#"
        INSERT INTO assessment_responses (assessment_id, question_id, reviewer_id, reviewee_id, response_text)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(assessment_id)
    .bind(question_id)
    .bind(reviewer_id)
    .bind(reviewee_id)
    .bind(text)
    .execute(&state.db)
    .await?;

    let response_id = result.last_insert_rowid();
    tracing::debug!(response_id, assessment_id, reviewer_id, reviewee_id, "Response recorded");

    Ok((StatusCode::CREATED, Json(ResponseCreated { response_id })))
}

pub async fn delete_response(
    State(state): State<Arc<AppState>>,
    ApiPath(response_id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM assessment_responses WHERE response_id = ?")
        .bind(response_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Response not found"));
    }

    Ok(Json(MessageResponse::new("Response deleted")))
}
