//! Course workspace endpoints: roster, teams and review assignments.
//!
//! Every mutation runs under the course lock in [`WorkspaceStore`] and
//! answers with the full updated document, which is what the client renders.
//!
//! [`WorkspaceStore`]: crate::workspace::WorkspaceStore

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath};
use crate::workspace::roster::{ReviewAssignment, StudentInput};
use crate::workspace::{AutoAssignOutcome, CourseData, Review, Student};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TeamNameRequest {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub student_index: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AutoAssignRequest {
    /// Fill the smallest team first; defaults to true
    pub balance: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignReviewRequest {
    pub name: Option<String>,
    pub template_id: Option<i64>,
    /// Omitted or null targets every team
    pub team_index: Option<usize>,
    #[serde(default)]
    pub anonymous_feedback: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoAssignResponse {
    pub assigned: usize,
    pub message: String,
    pub data: CourseData,
}

#[derive(Debug, Serialize)]
pub struct IndexedStudent {
    pub index: usize,
    #[serde(flatten)]
    pub student: Student,
}

#[derive(Debug, Serialize)]
pub struct IndexedReview {
    pub index: usize,
    #[serde(flatten)]
    pub review: Review,
}

pub async fn get_workspace(
    State(state): State<Arc<AppState>>,
    ApiPath(course_id): ApiPath<i64>,
) -> Result<Json<CourseData>, ApiError> {
    Ok(Json(state.workspaces.load(course_id).await?))
}

/// Replace the whole document after checking ids, membership and review targets
pub async fn replace_workspace(
    State(state): State<Arc<AppState>>,
    ApiPath(course_id): ApiPath<i64>,
    ApiJson(data): ApiJson<CourseData>,
) -> Result<Json<CourseData>, ApiError> {
    let data = state.workspaces.replace(course_id, data).await?;
    tracing::info!(
        course_id,
        students = data.students.len(),
        teams = data.teams.len(),
        "Course workspace replaced"
    );
    Ok(Json(data))
}

pub async fn add_student(
    State(state): State<Arc<AppState>>,
    ApiPath(course_id): ApiPath<i64>,
    ApiJson(input): ApiJson<StudentInput>,
) -> Result<Json<CourseData>, ApiError> {
    let (data, _) = state
        .workspaces
        .update(course_id, |data| data.add_student(input))
        .await?;
    Ok(Json(data))
}

pub async fn edit_student(
    State(state): State<Arc<AppState>>,
    ApiPath((course_id, index)): ApiPath<(i64, usize)>,
    ApiJson(input): ApiJson<StudentInput>,
) -> Result<Json<CourseData>, ApiError> {
    let (data, _) = state
        .workspaces
        .update(course_id, |data| data.edit_student(index, input))
        .await?;
    Ok(Json(data))
}

pub async fn remove_student(
    State(state): State<Arc<AppState>>,
    ApiPath((course_id, index)): ApiPath<(i64, usize)>,
) -> Result<Json<CourseData>, ApiError> {
    let (data, removed) = state
        .workspaces
        .update(course_id, |data| data.remove_student(index))
        .await?;
    tracing::info!(course_id, index, student_id = %removed.id, "Student removed from course");
    Ok(Json(data))
}

pub async fn remove_student_from_team(
    State(state): State<Arc<AppState>>,
    ApiPath((course_id, index)): ApiPath<(i64, usize)>,
) -> Result<Json<CourseData>, ApiError> {
    let (data, _) = state
        .workspaces
        .update(course_id, |data| data.remove_from_team(index))
        .await?;
    Ok(Json(data))
}

/// Students without a team, with their roster index
pub async fn list_unassigned(
    State(state): State<Arc<AppState>>,
    ApiPath(course_id): ApiPath<i64>,
) -> Result<Json<Vec<IndexedStudent>>, ApiError> {
    let data = state.workspaces.load(course_id).await?;
    let unassigned = data
        .unassigned_students()
        .into_iter()
        .map(|index| IndexedStudent {
            index,
            student: data.students[index].clone(),
        })
        .collect();
    Ok(Json(unassigned))
}

pub async fn create_team(
    State(state): State<Arc<AppState>>,
    ApiPath(course_id): ApiPath<i64>,
    ApiJson(req): ApiJson<TeamNameRequest>,
) -> Result<Json<CourseData>, ApiError> {
    let name = req.name.unwrap_or_default();
    let (data, _) = state
        .workspaces
        .update(course_id, |data| data.create_team(&name))
        .await?;
    Ok(Json(data))
}

pub async fn rename_team(
    State(state): State<Arc<AppState>>,
    ApiPath((course_id, index)): ApiPath<(i64, usize)>,
    ApiJson(req): ApiJson<TeamNameRequest>,
) -> Result<Json<CourseData>, ApiError> {
    let name = req.name.unwrap_or_default();
    let (data, _) = state
        .workspaces
        .update(course_id, |data| data.rename_team(index, &name))
        .await?;
    Ok(Json(data))
}

pub async fn delete_team(
    State(state): State<Arc<AppState>>,
    ApiPath((course_id, index)): ApiPath<(i64, usize)>,
) -> Result<Json<CourseData>, ApiError> {
    let (data, _) = state
        .workspaces
        .update(course_id, |data| data.delete_team(index))
        .await?;
    Ok(Json(data))
}

pub async fn add_team_member(
    State(state): State<Arc<AppState>>,
    ApiPath((course_id, index)): ApiPath<(i64, usize)>,
    ApiJson(req): ApiJson<AddMemberRequest>,
) -> Result<Json<CourseData>, ApiError> {
    let student = req
        .student_index
        .ok_or_else(|| ApiError::validation_field("studentIndex", "studentIndex is required"))?;

    let (data, _) = state
        .workspaces
        .update(course_id, |data| data.add_to_team(index, student))
        .await?;
    Ok(Json(data))
}

/// Randomly place every unassigned student into a team
pub async fn auto_assign(
    State(state): State<Arc<AppState>>,
    ApiPath(course_id): ApiPath<i64>,
    ApiJson(req): ApiJson<AutoAssignRequest>,
) -> Result<Json<AutoAssignResponse>, ApiError> {
    let balance = req.balance.unwrap_or(true);

    let (data, outcome) = state
        .workspaces
        .update(course_id, |data| data.auto_assign(balance, &mut rand::rng()))
        .await?;

    let (assigned, message) = match outcome {
        AutoAssignOutcome::NothingToAssign => {
            (0, "All students are already assigned to teams.".to_string())
        }
        AutoAssignOutcome::Assigned { count } => {
            tracing::info!(course_id, count, balance, "Students auto-assigned to teams");
            (count, format!("{} students have been assigned to teams.", count))
        }
    };

    Ok(Json(AutoAssignResponse {
        assigned,
        message,
        data,
    }))
}

/// Reviews newest first, each with its stored index for deletion
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    ApiPath(course_id): ApiPath<i64>,
) -> Result<Json<Vec<IndexedReview>>, ApiError> {
    let data = state.workspaces.load(course_id).await?;
    let reviews = data
        .reviews_newest_first()
        .into_iter()
        .map(|(index, review)| IndexedReview {
            index,
            review: review.clone(),
        })
        .collect();
    Ok(Json(reviews))
}

pub async fn assign_review(
    State(state): State<Arc<AppState>>,
    ApiPath(course_id): ApiPath<i64>,
    ApiJson(req): ApiJson<AssignReviewRequest>,
) -> Result<Json<CourseData>, ApiError> {
    let template_id = req
        .template_id
        .ok_or_else(|| ApiError::validation_field("templateId", "Please select a review template"))?;

    let template: Option<(i64,)> =
        sqlx::query_as("SELECT template_id FROM review_templates WHERE template_id = ?")
            .bind(template_id)
            .fetch_optional(&state.db)
            .await?;
    if template.is_none() {
        return Err(ApiError::validation_field(
            "templateId",
            "Review template not found",
        ));
    }

    let assignment = ReviewAssignment {
        name: req.name.unwrap_or_default(),
        template_id,
        team_index: req.team_index,
        anonymous_feedback: req.anonymous_feedback,
    };
    let date_assigned = chrono::Utc::now().to_rfc3339();

    let (data, index) = state
        .workspaces
        .update(course_id, |data| data.assign_review(assignment, date_assigned))
        .await?;
    tracing::info!(course_id, index, template_id, "Review assigned");
    Ok(Json(data))
}

pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    ApiPath((course_id, index)): ApiPath<(i64, usize)>,
) -> Result<Json<CourseData>, ApiError> {
    let (data, _) = state
        .workspaces
        .update(course_id, |data| data.delete_review(index))
        .await?;
    Ok(Json(data))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{seed_course, seed_template, seed_user, send, test_app, TestApp};
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    async fn course_app() -> (TestApp, String) {
        let app = test_app().await;
        let instructor = seed_user(&app.state, "grace@college.edu", "instructor").await;
        let course_id = seed_course(&app.state, instructor).await;
        (app, format!("/courses/{}/workspace", course_id))
    }

    async fn add_students(app: &TestApp, base: &str, ids: &[&str]) -> Value {
        let mut last = Value::Null;
        for id in ids {
            let (status, body) = send(
                &app.router,
                Method::POST,
                &format!("{}/students", base),
                Some(json!({"id": id, "name": format!("Student {}", id), "email": format!("{}@uni.edu", id)})),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{}", body);
            last = body;
        }
        last
    }

    fn members(data: &Value, team: usize) -> Vec<u64> {
        data["teams"][team]["members"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m.as_u64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_new_workspace_is_empty() {
        let (app, base) = course_app().await;
        let (status, body) = send(&app.router, Method::GET, &base, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"students": [], "teams": [], "reviews": []}));
    }

    #[tokio::test]
    async fn test_unknown_course_is_404() {
        let app = test_app().await;
        let (status, body) = send(&app.router, Method::GET, "/courses/99/workspace", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Course not found");
    }

    #[tokio::test]
    async fn test_remove_student_renumbers_team_members() {
        let (app, base) = course_app().await;
        add_students(&app, &base, &["A", "B", "C", "D"]).await;
        send(&app.router, Method::POST, &format!("{}/teams", base), Some(json!({"name": "Red"}))).await;
        for student in [0, 2, 3] {
            let (status, _) = send(
                &app.router,
                Method::POST,
                &format!("{}/teams/0/members", base),
                Some(json!({"studentIndex": student})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(&app.router, Method::DELETE, &format!("{}/students/2", base), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(members(&body, 0), vec![0, 2]);
        assert_eq!(body["students"][2]["id"], "D");

        let (status, body) = send(&app.router, Method::DELETE, &format!("{}/students/9", base), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No student at index 9");
    }

    #[tokio::test]
    async fn test_auto_assign_balanced_and_noop() {
        let (app, base) = course_app().await;
        add_students(&app, &base, &["A", "B", "C", "D"]).await;

        let (status, body) = send(
            &app.router,
            Method::POST,
            &format!("{}/auto-assign", base),
            Some(json!({"balance": true})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Please create at least one team first");

        for name in ["T1", "T2"] {
            send(&app.router, Method::POST, &format!("{}/teams", base), Some(json!({"name": name}))).await;
        }

        let (status, body) = send(
            &app.router,
            Method::POST,
            &format!("{}/auto-assign", base),
            Some(json!({"balance": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["assigned"], 4);
        assert_eq!(members(&body["data"], 0).len(), 2);
        assert_eq!(members(&body["data"], 1).len(), 2);

        let (status, body) = send(&app.router, Method::POST, &format!("{}/auto-assign", base), Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["assigned"], 0);
        assert_eq!(body["message"], "All students are already assigned to teams.");

        let (_, body) = send(&app.router, Method::GET, &format!("{}/unassigned", base), None).await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_team_lifecycle() {
        let (app, base) = course_app().await;
        add_students(&app, &base, &["A", "B"]).await;

        let (status, _) = send(&app.router, Method::POST, &format!("{}/teams", base), Some(json!({"name": "Red"}))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app.router, Method::POST, &format!("{}/teams", base), Some(json!({"name": "Red"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "A team with this name already exists");

        let (status, body) = send(
            &app.router,
            Method::PUT,
            &format!("{}/teams/0", base),
            Some(json!({"name": "Crimson"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["teams"][0]["name"], "Crimson");

        send(
            &app.router,
            Method::POST,
            &format!("{}/teams/0/members", base),
            Some(json!({"studentIndex": 1})),
        )
        .await;
        let (_, body) = send(&app.router, Method::GET, &format!("{}/unassigned", base), None).await;
        assert_eq!(body, json!([{"index": 0, "id": "A", "name": "Student A", "email": "A@uni.edu"}]));

        let (status, body) = send(&app.router, Method::DELETE, &format!("{}/students/1/team", base), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(members(&body, 0).is_empty());

        let (status, _) = send(&app.router, Method::DELETE, &format!("{}/students/1/team", base), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app.router, Method::DELETE, &format!("{}/teams/0", base), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["teams"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_student_and_duplicate_ids() {
        let (app, base) = course_app().await;
        add_students(&app, &base, &["A", "B"]).await;

        let (status, body) = send(
            &app.router,
            Method::PUT,
            &format!("{}/students/1", base),
            Some(json!({"id": "A", "name": "Dup", "email": "dup@uni.edu"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "A student with this ID already exists");

        let (status, body) = send(
            &app.router,
            Method::PUT,
            &format!("{}/students/1", base),
            Some(json!({"id": "B", "name": "Beatrice", "email": "b@uni.edu"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["students"][1]["name"], "Beatrice");
    }

    #[tokio::test]
    async fn test_review_assignment_requires_known_template() {
        let (app, base) = course_app().await;
        let instructor = seed_user(&app.state, "alan@college.edu", "instructor").await;
        let template_id = seed_template(&app.state, instructor).await;

        let (status, body) = send(
            &app.router,
            Method::POST,
            &format!("{}/reviews", base),
            Some(json!({"name": "Sprint 1", "templateId": 999})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Review template not found");

        for name in ["Sprint 1", "Sprint 2"] {
            let (status, body) = send(
                &app.router,
                Method::POST,
                &format!("{}/reviews", base),
                Some(json!({"name": name, "templateId": template_id, "anonymousFeedback": true})),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{}", body);
        }

        let (_, body) = send(&app.router, Method::GET, &format!("{}/reviews", base), None).await;
        let reviews = body.as_array().unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0]["status"], "Assigned");
        assert_eq!(reviews[0]["teamIndex"], Value::Null);
        assert!(reviews.iter().all(|r| r["index"].is_u64()));

        let (status, body) = send(&app.router, Method::DELETE, &format!("{}/reviews/0", base), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reviews"][0]["name"], "Sprint 2");

        let (status, _) = send(&app.router, Method::DELETE, &format!("{}/reviews/5", base), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_replace_workspace_validates_membership() {
        let (app, base) = course_app().await;
        let doc = json!({
            "students": [{"id": "A", "name": "Ana", "email": "a@uni.edu"}],
            "teams": [{"name": "Red", "members": [0]}]
        });

        let (status, body) = send(&app.router, Method::PUT, &base, Some(doc)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reviews"], json!([]));

        let (status, _) = send(
            &app.router,
            Method::PUT,
            &base,
            Some(json!({"students": [], "teams": [{"name": "Red", "members": [3]}]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&app.router, Method::GET, &base, None).await;
        assert_eq!(body["teams"][0]["members"], json!([0]));
    }

    #[tokio::test]
    async fn test_replace_workspace_rejects_bad_ids_and_review_targets() {
        let (app, base) = course_app().await;

        let (status, body) = send(
            &app.router,
            Method::PUT,
            &base,
            Some(json!({
                "students": [
                    {"id": "A", "name": "Ana", "email": "a@uni.edu"},
                    {"id": "A", "name": "Abe", "email": "abe@uni.edu"}
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "A student with this ID already exists");

        let (status, body) = send(
            &app.router,
            Method::PUT,
            &base,
            Some(json!({
                "students": [{"id": "A", "name": "Ana", "email": "a@uni.edu"}],
                "teams": [],
                "reviews": [{
                    "name": "Sprint 1",
                    "templateId": 1,
                    "teamIndex": 7,
                    "dateAssigned": "2024-03-01T00:00:00+00:00",
                    "status": "Assigned"
                }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Review 0 targets team 7, which does not exist");

        let (_, body) = send(&app.router, Method::GET, &base, None).await;
        assert_eq!(body["students"], json!([]));
    }
}
