//! Per-reviewer answers to assessment questions.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResponse {
    pub response_id: i64,
    pub assessment_id: i64,
    pub question_id: i64,
    pub reviewer_id: i64,
    pub reviewee_id: i64,
    pub response_text: String,
    pub created_at: String,
}

/// Both filters are required
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseQuery {
    pub assessment_id: Option<i64>,
    pub reviewer_id: Option<i64>,
}

/// An empty `responseText` is a valid answer; only a missing one is rejected
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponseRequest {
    pub assessment_id: Option<i64>,
    pub question_id: Option<i64>,
    pub reviewer_id: Option<i64>,
    pub reviewee_id: Option<i64>,
    pub response_text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseCreated {
    pub response_id: i64,
}
