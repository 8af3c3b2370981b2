//! Per-course workspace: the roster, teams, and review assignments of one course.
//!
//! A workspace is kept as a single JSON document (`CourseData`). Team membership
//! is stored as indices into `students`, so every operation that reorders or
//! shrinks the roster must renumber those indices; see [`roster`].

pub mod roster;
pub mod store;

use serde::{Deserialize, Serialize};

pub use roster::{AutoAssignOutcome, RosterError};
pub use store::{WorkspaceError, WorkspaceStore};

/// The JSON document for one course
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseData {
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Student {
    /// Institution-issued student number, unique within the course
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub name: String,
    /// Indices into `CourseData::students`
    #[serde(default)]
    pub members: Vec<usize>,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewStatus {
    Assigned,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewStatus::Assigned => write!(f, "Assigned"),
            ReviewStatus::InProgress => write!(f, "In Progress"),
            ReviewStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// A peer review handed out to the whole course or to one team
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub name: String,
    pub template_id: i64,
    /// `None` means every team
    pub team_index: Option<usize>,
    pub date_assigned: String,
    pub status: ReviewStatus,
    #[serde(default)]
    pub anonymous_feedback: bool,
    #[serde(default)]
    pub responses: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORED: &str = r#"{"students":[{"id":"S1","name":"Ana","email":"ana@uni.edu"},{"id":"S2","name":"Ben","email":"ben@uni.edu"}],"teams":[{"name":"Red","members":[1]},{"name":"Blue","members":[]}],"reviews":[{"name":"Sprint 1","templateId":3,"teamIndex":null,"dateAssigned":"2024-03-01T10:00:00+00:00","status":"In Progress","anonymousFeedback":true,"responses":[{"grade":"A"}]}]}"#;

    #[test]
    fn test_course_data_round_trips_unchanged() {
        let data: CourseData = serde_json::from_str(STORED).unwrap();
        assert_eq!(data.reviews[0].status, ReviewStatus::InProgress);
        assert_eq!(serde_json::to_string(&data).unwrap(), STORED);
    }

    #[test]
    fn test_missing_reviews_defaults_to_empty() {
        let data: CourseData = serde_json::from_str(r#"{"students":[],"teams":[]}"#).unwrap();
        assert!(data.reviews.is_empty());
    }

    #[test]
    fn test_empty_document_shape() {
        let json = serde_json::to_string(&CourseData::default()).unwrap();
        assert_eq!(json, r#"{"students":[],"teams":[],"reviews":[]}"#);
    }
}
