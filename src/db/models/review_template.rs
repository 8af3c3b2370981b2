//! Review templates: an instructor's reusable list of typed questions.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stored row; `questions` holds a JSON array of [`TemplateQuestion`]
#[derive(Debug, Clone, FromRow)]
pub struct ReviewTemplateRow {
    pub template_id: i64,
    pub instructor_id: i64,
    pub name: String,
    pub description: String,
    pub questions: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ReviewTemplateRow {
    pub fn into_template(self) -> ReviewTemplate {
        let questions = serde_json::from_str(&self.questions).unwrap_or_else(|e| {
            tracing::warn!(
                template_id = self.template_id,
                error = %e,
                "Stored template questions are not valid JSON"
            );
            Vec::new()
        });

        ReviewTemplate {
            template_id: self.template_id,
            instructor_id: self.instructor_id,
            name: self.name,
            description: self.description,
            questions,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewTemplate {
    pub template_id: i64,
    pub instructor_id: i64,
    pub name: String,
    pub description: String,
    pub questions: Vec<TemplateQuestion>,
    pub created_at: String,
    pub updated_at: String,
}

pub const DEFAULT_LIKERT_MIN: i32 = 1;
pub const DEFAULT_LIKERT_MAX: i32 = 5;

fn default_likert_min() -> i32 {
    DEFAULT_LIKERT_MIN
}

fn default_likert_max() -> i32 {
    DEFAULT_LIKERT_MAX
}

fn default_answer_type() -> String {
    "text".to_string()
}

/// A question inside a review template, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum TemplateQuestion {
    /// Rating on a numeric scale
    Likert {
        text: String,
        #[serde(default = "default_likert_min")]
        min: i32,
        #[serde(default = "default_likert_max")]
        max: i32,
        #[serde(default)]
        low_label: String,
        #[serde(default)]
        high_label: String,
    },
    /// Pick one of several options
    Multiple {
        text: String,
        #[serde(default)]
        options: Vec<String>,
    },
    /// Free-form answer
    Short {
        text: String,
        #[serde(default = "default_answer_type")]
        answer_type: String,
    },
}

impl TemplateQuestion {
    pub fn text(&self) -> &str {
        match self {
            TemplateQuestion::Likert { text, .. }
            | TemplateQuestion::Multiple { text, .. }
            | TemplateQuestion::Short { text, .. } => text,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateQuery {
    pub instructor_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTemplateRequest {
    /// Required on create, ignored on update
    pub instructor_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<TemplateQuestion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_defaults_apply() {
        let questions: Vec<TemplateQuestion> = serde_json::from_str(
            r#"[
                {"type": "likert", "text": "Contribution"},
                {"type": "short", "text": "Comments"},
                {"type": "multiple", "text": "Best trait", "options": ["Reliable", "Creative"]}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            questions[0],
            TemplateQuestion::Likert {
                text: "Contribution".to_string(),
                min: 1,
                max: 5,
                low_label: String::new(),
                high_label: String::new(),
            }
        );
        assert_eq!(
            questions[1],
            TemplateQuestion::Short {
                text: "Comments".to_string(),
                answer_type: "text".to_string(),
            }
        );
        assert_eq!(questions[2].text(), "Best trait");
    }

    #[test]
    fn test_likert_labels_are_camel_case() {
        let q = TemplateQuestion::Likert {
            text: "Effort".to_string(),
            min: 1,
            max: 7,
            low_label: "Poor".to_string(),
            high_label: "Great".to_string(),
        };
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["type"], "likert");
        assert_eq!(json["lowLabel"], "Poor");
        assert_eq!(json["highLabel"], "Great");
    }

    #[test]
    fn test_corrupt_questions_column_yields_empty_list() {
        let row = ReviewTemplateRow {
            template_id: 1,
            instructor_id: 2,
            name: "Midterm".to_string(),
            description: String::new(),
            questions: "not json".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(row.into_template().questions.is_empty());
    }
}
