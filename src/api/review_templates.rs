//! Review templates: reusable question sets an instructor assigns as reviews.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::validation::validate_text;
use crate::db::{
    non_blank, MessageResponse, ReviewTemplate, ReviewTemplateRow, SaveTemplateRequest,
    TemplateQuery, TemplateQuestion,
};
use crate::AppState;

/// Trim and check questions; questions with blank text are dropped
fn clean_questions(questions: Vec<TemplateQuestion>) -> Result<Vec<TemplateQuestion>, String> {
    let mut cleaned = Vec::with_capacity(questions.len());

    for question in questions {
        if question.text().trim().is_empty() {
            continue;
        }
        let position = cleaned.len() + 1;

        let question = match question {
            TemplateQuestion::Likert {
                text,
                min,
                max,
                low_label,
                high_label,
            } => {
                if min >= max {
                    return Err(format!(
                        "Question {}: scale minimum must be below its maximum",
                        position
                    ));
                }
                TemplateQuestion::Likert {
                    text: text.trim().to_string(),
                    min,
                    max,
                    low_label: low_label.trim().to_string(),
                    high_label: high_label.trim().to_string(),
                }
            }
            TemplateQuestion::Multiple { text, options } => {
                let options: Vec<String> = options
                    .iter()
                    .map(|o| o.trim())
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect();
                if options.len() < 2 {
                    return Err(format!(
                        "Question {}: multiple choice needs at least two options",
                        position
                    ));
                }
                TemplateQuestion::Multiple {
                    text: text.trim().to_string(),
                    options,
                }
            }
            TemplateQuestion::Short { text, answer_type } => TemplateQuestion::Short {
                text: text.trim().to_string(),
                answer_type,
            },
        };
        cleaned.push(question);
    }

    if cleaned.is_empty() {
        return Err("Add at least one question".to_string());
    }
    Ok(cleaned)
}

/// Validate a save request; returns the trimmed name and cleaned questions
fn validate_save_request(
    req: SaveTemplateRequest,
) -> Result<(String, String, Vec<TemplateQuestion>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    let name = non_blank(&req.name).map(str::to_string);
    match &name {
        Some(name) => {
            errors.check("name", validate_text(name, "Template name"));
        }
        None => {
            errors.add("name", "Template name is required");
        }
    }

    let description = req.description.as_deref().unwrap_or_default().trim().to_string();
    let questions = match clean_questions(req.questions) {
        Ok(questions) => questions,
        Err(e) => {
            errors.add("questions", e);
            Vec::new()
        }
    };
    errors.finish()?;

    let name = name.ok_or_else(|| ApiError::validation_field("name", "Template name is required"))?;
    Ok((name, description, questions))
}

fn questions_json(questions: &[TemplateQuestion]) -> Result<String, ApiError> {
    serde_json::to_string(questions).map_err(|e| {
        tracing::error!("Failed to serialize template questions: {}", e);
        ApiError::internal("Failed to save template")
    })
}

async fn fetch_template(state: &AppState, template_id: i64) -> Result<ReviewTemplate, ApiError> {
    let row = sqlx::query_as::<_, ReviewTemplateRow>(
        "SELECT * FROM review_templates WHERE template_id = ?",
    )
    .bind(template_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Review template not found"))?;

    Ok(row.into_template())
}

pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TemplateQuery>,
) -> Result<Json<Vec<ReviewTemplate>>, ApiError> {
    let rows = match query.instructor_id {
        Some(instructor_id) => {
            sqlx::query_as::<_, ReviewTemplateRow>(
                "SELECT * FROM review_templates WHERE instructor_id = ? ORDER BY template_id",
            )
            .bind(instructor_id)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, ReviewTemplateRow>(
                "SELECT * FROM review_templates ORDER BY template_id",
            )
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(Json(rows.into_iter().map(ReviewTemplateRow::into_template).collect()))
}

pub async fn get_template(
    State(state): State<Arc<AppState>>,
    ApiPath(template_id): ApiPath<i64>,
) -> Result<Json<ReviewTemplate>, ApiError> {
    Ok(Json(fetch_template(&state, template_id).await?))
}

pub async fn create_template(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SaveTemplateRequest>,
) -> Result<(StatusCode, Json<ReviewTemplate>), ApiError> {
    let instructor_id = req
        .instructor_id
        .ok_or_else(|| ApiError::validation_field("instructorId", "Instructor ID is required"))?;
    let (name, description, questions) = validate_save_request(req)?;

    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        INSERT INTO review_templates (instructor_id, name, description, questions, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(instructor_id)
    .bind(&name)
    .bind(&description)
    .bind(questions_json(&questions)?)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let template_id = result.last_insert_rowid();
    tracing::info!(template_id, instructor_id, questions = questions.len(), "Review template created");

    Ok((
        StatusCode::CREATED,
        Json(ReviewTemplate {
            template_id,
            instructor_id,
            name,
            description,
            questions,
            created_at: now.clone(),
            updated_at: now,
        }),
    ))
}

/// Replace a template's name, description and questions
pub async fn update_template(
    State(state): State<Arc<AppState>>,
    ApiPath(template_id): ApiPath<i64>,
    ApiJson(req): ApiJson<SaveTemplateRequest>,
) -> Result<Json<ReviewTemplate>, ApiError> {
    let (name, description, questions) = validate_save_request(req)?;

    let result = sqlx::query(
        r#"
        UPDATE review_templates
        SET name = ?, description = ?, questions = ?, updated_at = ?
        WHERE template_id = ?
        "#,
    )
    .bind(&name)
    .bind(&description)
    .bind(questions_json(&questions)?)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(template_id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Review template not found"));
    }

    Ok(Json(fetch_template(&state, template_id).await?))
}

pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    ApiPath(template_id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM review_templates WHERE template_id = ?")
        .bind(template_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Review template not found"));
    }

    Ok(Json(MessageResponse::new("Review template deleted")))
}
