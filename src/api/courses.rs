//! Course CRUD and join codes.

use axum::{extract::State, http::StatusCode, Json};
use rand::Rng;
use std::sync::Arc;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::validation::{validate_image_url, validate_text};
use crate::db::{
    non_blank, Course, CourseCreated, CourseQuery, CreateCourseRequest, JoinCodeResponse,
    MessageResponse, UpdateCourseRequest,
};
use crate::AppState;

const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const JOIN_CODE_ATTEMPTS: usize = 5;

/// Random code in the `XXX-XXX-XXX` form students type in
pub fn generate_join_code() -> String {
    let mut rng = rand::rng();
    let chars: Vec<char> = (0..9)
        .map(|_| JOIN_CODE_ALPHABET[rng.random_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect();

    chars
        .chunks(3)
        .map(|group| group.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}

fn validate_create_request(req: &CreateCourseRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    for (field, label, value) in [
        ("courseName", "Course name", &req.course_name),
        ("courseCode", "Course code", &req.course_code),
        ("term", "Term", &req.term),
    ] {
        match value {
            Some(v) => errors.check(field, validate_text(v, label)),
            None => errors.add(field, format!("{} is required", label)),
        };
    }
    if req.instructor_id.is_none() {
        errors.add("instructorId", "Instructor ID is required");
    }
    if let Some(url) = non_blank(&req.image_url) {
        errors.check("imageUrl", validate_image_url(url));
    }

    errors.finish()
}

fn validate_update_request(req: &UpdateCourseRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    for (field, label, value) in [
        ("courseName", "Course name", &req.course_name),
        ("courseCode", "Course code", &req.course_code),
        ("term", "Term", &req.term),
    ] {
        if let Some(v) = value {
            errors.check(field, validate_text(v, label));
        }
    }
    if let Some(url) = non_blank(&req.image_url) {
        errors.check("imageUrl", validate_image_url(url));
    }

    errors.finish()
}

/// List courses, optionally only those taught by one instructor
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<CourseQuery>,
) -> Result<Json<Vec<Course>>, ApiError> {
    let courses = match query.instructor_id {
        Some(instructor_id) => {
            sqlx::query_as::<_, Course>(
                "SELECT * FROM courses WHERE instructor_id = ? ORDER BY course_id",
            )
            .bind(instructor_id)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Course>("SELECT * FROM courses ORDER BY course_id")
                .fetch_all(&state.db)
                .await?
        }
    };

    Ok(Json(courses))
}

pub async fn get_course(
    State(state): State<Arc<AppState>>,
    ApiPath(course_id): ApiPath<i64>,
) -> Result<Json<Course>, ApiError> {
    let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE course_id = ?")
        .bind(course_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;

    Ok(Json(course))
}

pub async fn create_course(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateCourseRequest>,
) -> Result<(StatusCode, Json<CourseCreated>), ApiError> {
    validate_create_request(&req)?;

    let (Some(course_name), Some(course_code), Some(term), Some(instructor_id)) = (
        non_blank(&req.course_name),
        non_blank(&req.course_code),
        non_blank(&req.term),
        req.instructor_id,
    ) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    let result = sqlx::query(
        "INSERT INTO courses (course_name, course_code, instructor_id, term, image_url) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(course_name)
    .bind(course_code)
    .bind(instructor_id)
    .bind(term)
    .bind(non_blank(&req.image_url))
    .execute(&state.db)
    .await?;

    let course_id = result.last_insert_rowid();
    tracing::info!(course_id, instructor_id, course_code, "Course created");

    Ok((StatusCode::CREATED, Json(CourseCreated { course_id })))
}

/// Update the given fields; omitted fields keep their value
pub async fn update_course(
    State(state): State<Arc<AppState>>,
    ApiPath(course_id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateCourseRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate_update_request(&req)?;

    let result = sqlx::query(
        r#"
        UPDATE courses SET
            course_name = COALESCE(?, course_name),
            course_code = COALESCE(?, course_code),
            term = COALESCE(?, term),
            image_url = COALESCE(?, image_url)
        WHERE course_id = ?
        "#,
    )
    .bind(non_blank(&req.course_name))
    .bind(non_blank(&req.course_code))
    .bind(non_blank(&req.term))
    .bind(non_blank(&req.image_url))
    .bind(course_id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Course not found"));
    }

    Ok(Json(MessageResponse::new("Course updated")))
}

pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    ApiPath(course_id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM courses WHERE course_id = ?")
        .bind(course_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Course not found"));
    }

    state.workspaces.forget(course_id);
    tracing::info!(course_id, "Course deleted");
    Ok(Json(MessageResponse::new("Course deleted")))
}

/// Issue a new join code for a course, replacing any previous one
pub async fn regenerate_join_code(
    State(state): State<Arc<AppState>>,
    ApiPath(course_id): ApiPath<i64>,
) -> Result<Json<JoinCodeResponse>, ApiError> {
    for _ in 0..JOIN_CODE_ATTEMPTS {
        let join_code = generate_join_code();
        let result = sqlx::query("UPDATE courses SET join_code = ? WHERE course_id = ?")
            .bind(&join_code)
            .bind(course_id)
            .execute(&state.db)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                return Err(ApiError::not_found("Course not found"));
            }
            Ok(_) => {
                tracing::info!(course_id, "Join code issued");
                return Ok(Json(JoinCodeResponse {
                    course_id,
                    join_code,
                }));
            }
            Err(sqlx::Error::Database(e)) if e.message().contains("UNIQUE") => {
                tracing::debug!(course_id, "Join code collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::internal("Could not generate a unique join code"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{seed_user, send, test_app};
    use crate::api::validation::normalize_join_code;
    use axum::http::Method;
    use serde_json::json;

    #[test]
    fn test_generated_join_codes_are_well_formed() {
        for _ in 0..20 {
            let code = generate_join_code();
            assert_eq!(normalize_join_code(&code), Ok(code.clone()));
        }
    }

    #[tokio::test]
    async fn test_course_crud() {
        let app = test_app().await;
        let instructor = seed_user(&app.state, "grace@college.edu", "instructor").await;

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/courses",
            Some(json!({
                "courseName": "Compilers",
                "courseCode": "CS 401",
                "instructorId": instructor,
                "term": "Fall 2024"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let course_id = body["courseId"].as_i64().unwrap();

        let (status, body) = send(
            &app.router,
            Method::GET,
            &format!("/courses?instructorId={}", instructor),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["courseCode"], "CS 401");

        let (status, body) = send(&app.router, Method::GET, "/courses?instructorId=999", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().is_empty());

        let (status, _) = send(
            &app.router,
            Method::PUT,
            &format!("/courses/{}", course_id),
            Some(json!({"term": "Spring 2025"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app.router, Method::GET, &format!("/courses/{}", course_id), None).await;
        assert_eq!(body["term"], "Spring 2025");
        assert_eq!(body["courseName"], "Compilers");

        let (status, _) = send(&app.router, Method::DELETE, &format!("/courses/{}", course_id), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app.router, Method::GET, &format!("/courses/{}", course_id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Course not found");
    }

    #[tokio::test]
    async fn test_create_course_validation() {
        let app = test_app().await;

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/courses",
            Some(json!({"courseName": "Compilers"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["fields"]["courseCode"][0], "Course code is required");
        assert_eq!(body["fields"]["instructorId"][0], "Instructor ID is required");

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/courses",
            Some(json!({
                "courseName": "Compilers",
                "courseCode": "CS 401",
                "instructorId": 42,
                "term": "Fall"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Referenced record does not exist");
    }

    #[tokio::test]
    async fn test_course_cover_image() {
        let app = test_app().await;
        let instructor = seed_user(&app.state, "grace@college.edu", "instructor").await;
        let course_id = crate::api::test_support::seed_course(&app.state, instructor).await;
        let uri = format!("/courses/{}", course_id);

        let (_, body) = send(&app.router, Method::GET, &uri, None).await;
        assert_eq!(body["imageUrl"], serde_json::Value::Null);

        let (status, body) = send(
            &app.router,
            Method::PUT,
            &uri,
            Some(json!({"imageUrl": "javascript:alert(1)"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["imageUrl"].is_array());

        let (status, _) = send(
            &app.router,
            Method::PUT,
            &uri,
            Some(json!({"imageUrl": " https://cdn.uni.edu/cs3300.png "})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app.router, Method::PUT, &uri, Some(json!({"term": "Winter"}))).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app.router, Method::GET, &uri, None).await;
        assert_eq!(body["imageUrl"], "https://cdn.uni.edu/cs3300.png");
        assert_eq!(body["term"], "Winter");
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_course() {
        let app = test_app().await;

        let (status, _) = send(&app.router, Method::PUT, "/courses/77", Some(json!({"term": "Fall"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app.router, Method::DELETE, "/courses/77", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app.router, Method::POST, "/courses/77/join-code", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_join_code_is_replaced_on_regeneration() {
        let app = test_app().await;
        let instructor = seed_user(&app.state, "grace@college.edu", "instructor").await;
        let course_id = crate::api::test_support::seed_course(&app.state, instructor).await;

        let (status, first) = send(
            &app.router,
            Method::POST,
            &format!("/courses/{}/join-code", course_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["courseId"], course_id);

        let (_, second) = send(
            &app.router,
            Method::POST,
            &format!("/courses/{}/join-code", course_id),
            None,
        )
        .await;
        let (_, course) = send(&app.router, Method::GET, &format!("/courses/{}", course_id), None).await;
        assert_eq!(course["joinCode"], second["joinCode"]);
    }
}
