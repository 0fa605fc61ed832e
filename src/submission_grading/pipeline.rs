/// Submission grading pipeline
///
/// Grading never fails from the caller's point of view: any model, timeout or
/// parsing problem yields the zero-score placeholder with `failed = true`.
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::course::{Grade, GradeType, StudentSubmission};
use crate::course_generation::pipeline::generate_json;
use crate::error_recovery::RetryExecutor;
use crate::gemini_adapter::{GenerationRequest, GenerativeModel};
use crate::json_validator::Stage;
use crate::models::AppError;
use crate::utils::{fill_template, safe_truncate};

use super::types::{
    CriterionScore, GradingRequest, GradingResult, DEFAULT_MAX_SCORE, GRADE_PROMPT_TEMPLATE,
    GRADE_RESPONSE_SCHEMA,
};

/// Upper bound on the theory text quoted in the prompt
const MAX_CONTEXT_CHARS: usize = 6000;

pub struct SubmissionGrader {
    model: Arc<dyn GenerativeModel>,
    timeout: Duration,
}

impl SubmissionGrader {
    pub fn new(model: Arc<dyn GenerativeModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Run the grading pipeline
    pub async fn grade(&self, request: &GradingRequest) -> GradingResult {
        let max_score = default_max_score(request);
        info!(
            "[Grading] grading '{}' / '{}' ({} criteria, max {})",
            request.lesson_title,
            request.activity_title,
            request.rubric.len(),
            max_score
        );

        let prompt = match build_prompt(request, max_score) {
            Ok(p) => p,
            Err(e) => {
                warn!("[Grading] prompt build failed: {}", e);
                return GradingResult::failure(max_score);
            }
        };
        let generation = GenerationRequest::text(prompt).with_schema(GRADE_RESPONSE_SCHEMA.clone());

        let model = self.model.clone();
        let outcome = RetryExecutor::single_attempt(self.timeout)
            .execute_async("grading", || {
                let model = model.clone();
                let generation = generation.clone();
                async move { generate_json(model.as_ref(), generation, Stage::Grading).await }
            })
            .await;

        match outcome.into_result() {
            Ok(raw) => {
                let result = parse_grading_result(&raw, max_score);
                info!(
                    "[Grading] done: {}/{} (authenticity {})",
                    result.score, result.max_score, result.authenticity_score
                );
                result
            }
            Err(e) => {
                warn!("[Grading] grading failed, returning placeholder: {}", e);
                GradingResult::failure(max_score)
            }
        }
    }
}

fn default_max_score(request: &GradingRequest) -> f64 {
    let total = request.rubric_total();
    if total > 0.0 {
        total
    } else {
        DEFAULT_MAX_SCORE
    }
}

pub(crate) fn build_prompt(request: &GradingRequest, max_score: f64) -> Result<String, AppError> {
    let rubric = serde_json::to_string(&request.rubric)?;
    let context = safe_truncate(&request.context, MAX_CONTEXT_CHARS);
    let max_score = max_score.to_string();
    // student text may itself contain `{slot}` markers
    Ok(fill_template(
        GRADE_PROMPT_TEMPLATE,
        "{",
        "}",
        &[
            ("lesson_title", request.lesson_title.as_str()),
            ("activity_title", request.activity_title.as_str()),
            ("context", context.as_str()),
            ("submission", request.submission.as_str()),
            ("reflection", request.reflection.as_str()),
            ("rubric", rubric.as_str()),
            ("max_score", max_score.as_str()),
        ],
    ))
}

/// Lenient read of the model's verdict with scores clamped into range.
pub(crate) fn parse_grading_result(raw: &Value, fallback_max: f64) -> GradingResult {
    let max_score = number(raw, "maxScore")
        .filter(|m| *m > 0.0)
        .unwrap_or(fallback_max);
    let score = number(raw, "score").unwrap_or(0.0).clamp(0.0, max_score);
    let authenticity_score = number(raw, "authenticityScore")
        .unwrap_or(100.0)
        .clamp(0.0, 100.0);

    let breakdown = raw
        .get("breakdown")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| CriterionScore {
                    criterion: text(item, "criterion"),
                    score: number(item, "score").unwrap_or(0.0).max(0.0),
                    feedback: text(item, "feedback"),
                })
                .collect()
        })
        .unwrap_or_default();

    GradingResult {
        score,
        max_score,
        authenticity_score,
        general_feedback: text(raw, "generalFeedback"),
        strengths: strings(raw, "strengths"),
        improvement_areas: strings(raw, "improvementAreas"),
        detection_rationale: text(raw, "detectionRationale"),
        breakdown,
        failed: false,
    }
}

/// Copy score, feedback and authenticity onto the submission.
pub fn apply_to_submission(result: &GradingResult, submission: &mut StudentSubmission) {
    submission.ai_score = result.score;
    submission.ai_feedback = result.general_feedback.clone();
    submission.authenticity_score = (!result.failed).then_some(result.authenticity_score);
}

/// Gradebook entry for a graded practice.
pub fn to_grade(result: &GradingResult, lesson_id: &str, date_ms: i64) -> Grade {
    Grade {
        lesson_id: lesson_id.to_string(),
        grade_type: GradeType::Practice,
        score: result.score,
        max_score: result.max_score,
        feedback: Some(result.general_feedback.clone()).filter(|f| !f.is_empty()),
        date: date_ms,
    }
}

fn number(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn strings(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
