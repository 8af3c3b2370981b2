//! Course models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub course_id: i64,
    pub course_name: String,
    pub course_code: String,
    pub instructor_id: i64,
    pub term: String,
    pub join_code: Option<String>,
    /// Cover image: a web link or an inline data URL
    pub image_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseQuery {
    pub instructor_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    pub course_name: Option<String>,
    pub course_code: Option<String>,
    pub instructor_id: Option<i64>,
    pub term: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    pub course_name: Option<String>,
    pub course_code: Option<String>,
    pub term: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCreated {
    pub course_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCodeResponse {
    pub course_id: i64,
    pub join_code: String,
}
