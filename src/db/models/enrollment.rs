//! Enrollment models linking users to courses.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_ENROLLMENT_STATUS: &str = "enrolled";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub enrollment_id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub status: String,
    pub created_at: String,
}

/// Filter for listing; `course_id` wins when both are given
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentQuery {
    pub course_id: Option<i64>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnrollmentRequest {
    pub user_id: Option<i64>,
    pub course_id: Option<i64>,
    pub status: Option<String>,
}

/// A student joining a course with the code the instructor shared
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCourseRequest {
    pub user_id: Option<i64>,
    pub join_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentCreated {
    pub enrollment_id: i64,
}
