//! Questions of an assessment, kept in insertion order.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::db::{
    non_blank, CreateQuestionRequest, MessageResponse, Question, QuestionCreated, QuestionQuery,
};
use crate::AppState;

/// `optionsJson` is stored verbatim but must at least parse
fn validate_options_json(options: Option<&str>) -> Result<(), String> {
    match options {
        Some(raw) => serde_json::from_str::<serde_json::Value>(raw)
            .map(|_| ())
            .map_err(|e| format!("optionsJson is not valid JSON: {}", e)),
        None => Ok(()),
    }
}

pub async fn list_questions(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<QuestionQuery>,
) -> Result<Json<Vec<Question>>, ApiError> {
    let assessment_id = query
        .assessment_id
        .ok_or_else(|| ApiError::bad_request("Missing assessmentId"))?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM assessment_questions WHERE assessment_id = ? ORDER BY question_id",
    )
    .bind(assessment_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(questions))
}

pub async fn create_question(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<QuestionCreated>), ApiError> {
    let (Some(assessment_id), Some(question_text), Some(question_type)) = (
        req.assessment_id,
        non_blank(&req.question_text),
        non_blank(&req.question_type),
    ) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    let options_json = non_blank(&req.options_json);
    validate_options_json(options_json).map_err(|e| ApiError::validation_field("optionsJson", e))?;

    let result = sqlx::query(
        r#"
        INSERT INTO assessment_questions (assessment_id, question_text, question_type, options_json)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(assessment_id)
    .bind(question_text)
    .bind(question_type)
    .bind(options_json)
    .execute(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(QuestionCreated {
            question_id: result.last_insert_rowid(),
        }),
    ))
}

pub async fn delete_question(
    State(state): State<Arc<AppState>>,
    ApiPath(question_id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM assessment_questions WHERE question_id = ?")
        .bind(question_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Question not found"));
    }

    Ok(Json(MessageResponse::new("Question deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{seed_assessment, seed_course, seed_user, send, test_app};
    use axum::http::Method;
    use serde_json::json;

    #[test]
    fn test_validate_options_json() {
        assert!(validate_options_json(None).is_ok());
        assert!(validate_options_json(Some(r#"["Yes","No"]"#)).is_ok());
        assert!(validate_options_json(Some("[Yes")).is_err());
    }

    #[tokio::test]
    async fn test_questions_keep_insertion_order() {
        let app = test_app().await;
        let instructor = seed_user(&app.state, "grace@college.edu", "instructor").await;
        let course_id = seed_course(&app.state, instructor).await;
        let assessment_id = seed_assessment(&app.state, course_id, instructor).await;

        let mut ids = Vec::new();
        for text in ["Contribution", "Communication", "Comments"] {
            let (status, body) = send(
                &app.router,
                Method::POST,
                "/questions",
                Some(json!({
                    "assessmentId": assessment_id,
                    "questionText": text,
                    "questionType": "likert",
                    "optionsJson": "[1,2,3,4,5]"
                })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            ids.push(body["questionId"].as_i64().unwrap());
        }

        let (_, body) = send(
            &app.router,
            Method::GET,
            &format!("/questions?assessmentId={}", assessment_id),
            None,
        )
        .await;
        let texts: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|q| q["questionText"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["Contribution", "Communication", "Comments"]);

        let (status, _) = send(&app.router, Method::DELETE, &format!("/questions/{}", ids[1]), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app.router, Method::DELETE, &format!("/questions/{}", ids[1]), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Question not found");
    }

    #[tokio::test]
    async fn test_question_validation() {
        let app = test_app().await;

        let (status, body) = send(&app.router, Method::GET, "/questions", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing assessmentId");

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/questions",
            Some(json!({"assessmentId": 1, "questionText": "Effort"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields");
    }
}
