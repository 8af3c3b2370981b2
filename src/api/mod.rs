mod assessments;
pub mod auth;
mod courses;
mod enrollments;
pub mod error;
mod extract;
mod groups;
mod questions;
mod responses;
mod review_templates;
mod users;
mod validation;
mod workspaces;

use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::MessageResponse;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Account lifecycle (public)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/verify-email", get(auth::verify_email))
        .route("/resend-verification", post(auth::resend_verification))
        .route("/login", post(auth::login));

    // Relational course data
    let course_routes = Router::new()
        // Users
        .route("/users", get(users::list_users))
        .route("/users/:id", delete(users::delete_user))
        // Courses
        .route("/courses", get(courses::list_courses))
        .route("/courses", post(courses::create_course))
        .route("/courses/:id", get(courses::get_course))
        .route("/courses/:id", put(courses::update_course))
        .route("/courses/:id", delete(courses::delete_course))
        .route("/courses/:id/join-code", post(courses::regenerate_join_code))
        // Enrollments
        .route("/enrollments", get(enrollments::list_enrollments))
        .route("/enrollments", post(enrollments::create_enrollment))
        .route("/enrollments/join", post(enrollments::join_course))
        .route("/enrollments/:id", delete(enrollments::delete_enrollment))
        // Groups
        .route("/groups", get(groups::list_groups))
        .route("/groups", post(groups::create_group))
        .route("/groups/:id", delete(groups::delete_group))
        .route("/group-members", get(groups::list_group_members))
        .route("/group-members", post(groups::add_group_member))
        .route("/group-members", delete(groups::remove_group_member))
        // Assessments
        .route("/assessments", get(assessments::list_assessments))
        .route("/assessments", post(assessments::create_assessment))
        .route("/assessments/:id", get(assessments::get_assessment))
        .route("/assessments/:id", put(assessments::update_assessment))
        .route("/assessments/:id", delete(assessments::delete_assessment))
        .route("/questions", get(questions::list_questions))
        .route("/questions", post(questions::create_question))
        .route("/questions/:id", delete(questions::delete_question))
        .route("/responses", get(responses::list_responses))
        .route("/responses", post(responses::create_response))
        .route("/responses/:id", delete(responses::delete_response))
        // Review templates
        .route("/review-templates", get(review_templates::list_templates))
        .route("/review-templates", post(review_templates::create_template))
        .route("/review-templates/:id", get(review_templates::get_template))
        .route("/review-templates/:id", put(review_templates::update_template))
        .route("/review-templates/:id", delete(review_templates::delete_template));

    // Roster, teams and review assignments of one course
    let workspace_routes = Router::new()
        .route("/", get(workspaces::get_workspace))
        .route("/", put(workspaces::replace_workspace))
        .route("/students", post(workspaces::add_student))
        .route("/students/:index", put(workspaces::edit_student))
        .route("/students/:index", delete(workspaces::remove_student))
        .route("/students/:index/team", delete(workspaces::remove_student_from_team))
        .route("/unassigned", get(workspaces::list_unassigned))
        .route("/teams", post(workspaces::create_team))
        .route("/teams/:index", put(workspaces::rename_team))
        .route("/teams/:index", delete(workspaces::delete_team))
        .route("/teams/:index/members", post(workspaces::add_team_member))
        .route("/auto-assign", post(workspaces::auto_assign))
        .route("/reviews", get(workspaces::list_reviews))
        .route("/reviews", post(workspaces::assign_review))
        .route("/reviews/:index", delete(workspaces::delete_review));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(course_routes)
        .nest("/courses/:id/workspace", workspace_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("Backend is running"))
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::notifications::email::{LogMailer, RecordingMailer};
    use crate::notifications::Mailer;
    use crate::AppState;

    pub struct TestApp {
        pub router: Router,
        pub state: Arc<AppState>,
    }

    async fn build(mailer: Arc<dyn Mailer>) -> TestApp {
        let db = crate::db::init_memory().await.unwrap();
        let state = Arc::new(AppState::new(Config::default(), db, mailer));
        TestApp {
            router: super::create_router(state.clone()),
            state,
        }
    }

    pub async fn test_app() -> TestApp {
        build(Arc::new(LogMailer)).await
    }

    pub async fn test_app_with_mailer(mailer: Arc<RecordingMailer>) -> TestApp {
        build(mailer).await
    }

    /// Send one request; the body comes back as JSON, a string, or null when empty
    pub async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        let request = match body {
            Some(json) => request.body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    /// Insert a verified user named "Test User"
    pub async fn seed_user(state: &AppState, email: &str, role: &str) -> i64 {
        let hash = crate::api::auth::hash_password("password123").unwrap();
        sqlx::query(
            r#"
            INSERT INTO users (first_name, last_name, email, password_hash, role, verified)
            VALUES ('Test', 'User', ?, ?, ?, 1)
            "#,
        )
        .bind(email)
        .bind(hash)
        .bind(role)
        .execute(&state.db)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    pub async fn seed_course(state: &AppState, instructor: i64) -> i64 {
        let join_code = crate::api::courses::generate_join_code();
        sqlx::query(
            r#"
            INSERT INTO courses (course_name, course_code, instructor_id, term, join_code)
            VALUES ('Software Engineering', 'CS 3300', ?, 'Fall 2024', ?)
            "#,
        )
        .bind(instructor)
        .bind(join_code)
        .execute(&state.db)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    pub async fn seed_assessment(state: &AppState, course_id: i64, instructor: i64) -> i64 {
        sqlx::query("INSERT INTO assessments (course_id, name, created_by) VALUES (?, 'Sprint review', ?)")
            .bind(course_id)
            .bind(instructor)
            .execute(&state.db)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    pub async fn seed_template(state: &AppState, instructor: i64) -> i64 {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO review_templates (instructor_id, name, questions, created_at, updated_at)
            VALUES (?, 'Teamwork', '[{"type":"short","text":"How did it go?"}]', ?, ?)
            "#,
        )
        .bind(instructor)
        .bind(&now)
        .bind(&now)
        .execute(&state.db)
        .await
        .unwrap()
        .last_insert_rowid()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_root_and_health() {
        let app = test_app().await;

        let (status, body) = send(&app.router, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Backend is running"}));

        let (status, body) = send(&app.router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = test_app().await;
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/courses")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();

        let response = tower::ServiceExt::oneshot(app.router.clone(), request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
