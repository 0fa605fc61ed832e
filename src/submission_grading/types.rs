/// Submission grading - types and prompt template
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

use crate::course::{Course, LessonBlock, RubricCriterion, StudentSubmission};
use crate::models::AppError;

/// Feedback carried by the zero-score result of a failed grading call
pub const GRADING_FAILURE_FEEDBACK: &str = "Error de conexión con el sínodo evaluador.";

/// Scale used when the rubric carries no points
pub const DEFAULT_MAX_SCORE: f64 = 100.0;

// ============================================================================
// Request / result
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingRequest {
    pub lesson_title: String,
    pub activity_title: String,
    /// Theory the activity builds on
    pub context: String,
    pub submission: String,
    /// The student's own account of how they worked
    pub reflection: String,
    pub rubric: Vec<RubricCriterion>,
}

impl GradingRequest {
    /// Locate the lesson and activity a submission refers to and gather its
    /// rubric plus the lesson's theory as context.
    pub fn for_submission(course: &Course, submission: &StudentSubmission) -> Result<Self, AppError> {
        let lesson = course
            .units
            .iter()
            .flat_map(|u| u.lessons.iter())
            .find(|l| l.title.trim() == submission.lesson_title.trim())
            .ok_or_else(|| {
                AppError::not_found(format!("Lección no encontrada: {}", submission.lesson_title))
            })?;

        let activity = lesson.blocks.iter().find_map(|b| match b {
            LessonBlock::Activity(a) if a.title.trim() == submission.activity_title.trim() => Some(a),
            _ => None,
        });
        // fall back to the lesson's only activity when titles drifted
        let activity = activity.or_else(|| {
            let mut all = lesson.blocks.iter().filter_map(|b| match b {
                LessonBlock::Activity(a) => Some(a),
                _ => None,
            });
            match (all.next(), all.next()) {
                (Some(only), None) => Some(only),
                _ => None,
            }
        });
        let activity = activity.ok_or_else(|| {
            AppError::not_found(format!("Actividad no encontrada: {}", submission.activity_title))
        })?;

        let context = lesson
            .blocks
            .iter()
            .filter(|b| matches!(b, LessonBlock::Theory(_)))
            .map(|b| b.content())
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(Self {
            lesson_title: lesson.title.clone(),
            activity_title: activity.title.clone(),
            context,
            submission: submission.content.clone(),
            reflection: submission.reflection.clone(),
            rubric: activity.rubric.clone(),
        })
    }

    pub fn rubric_total(&self) -> f64 {
        self.rubric.iter().map(|c| c.points).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionScore {
    pub criterion: String,
    pub score: f64,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    pub score: f64,
    pub max_score: f64,
    /// 0-100, how likely the submission is the student's own work
    pub authenticity_score: f64,
    pub general_feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvement_areas: Vec<String>,
    #[serde(default)]
    pub detection_rationale: String,
    #[serde(default)]
    pub breakdown: Vec<CriterionScore>,
    /// Set on the placeholder returned when grading could not run
    #[serde(default)]
    pub failed: bool,
}

impl GradingResult {
    pub fn failure(max_score: f64) -> Self {
        Self {
            score: 0.0,
            max_score,
            authenticity_score: 0.0,
            general_feedback: GRADING_FAILURE_FEEDBACK.to_string(),
            strengths: Vec::new(),
            improvement_areas: Vec::new(),
            detection_rationale: String::new(),
            breakdown: Vec::new(),
            failed: true,
        }
    }

    /// Score as a percentage of the maximum
    pub fn percentage(&self) -> f64 {
        if self.max_score <= 0.0 {
            0.0
        } else {
            self.score / self.max_score * 100.0
        }
    }
}

// ============================================================================
// Gemini response schema
// ============================================================================

pub static GRADE_RESPONSE_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "score": { "type": "NUMBER" },
            "maxScore": { "type": "NUMBER" },
            "authenticityScore": { "type": "NUMBER" },
            "generalFeedback": { "type": "STRING" },
            "strengths": { "type": "ARRAY", "items": { "type": "STRING" } },
            "improvementAreas": { "type": "ARRAY", "items": { "type": "STRING" } },
            "detectionRationale": { "type": "STRING" },
            "breakdown": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "criterion": { "type": "STRING" },
                        "score": { "type": "NUMBER" },
                        "feedback": { "type": "STRING" }
                    }
                }
            }
        },
        "required": ["score", "generalFeedback"]
    })
});

// ============================================================================
// Prompt template
// ============================================================================

/// Slots: {lesson_title}, {activity_title}, {context}, {submission}, {reflection}, {rubric}, {max_score}
pub const GRADE_PROMPT_TEMPLATE: &str = r#"Actúa como un Sínodo Evaluador de Ingeniería del TecNM.
Tu objetivo es revisar la entrega del alumno de forma crítica y pedagógica.

CONTEXTO DE LA LECCIÓN: "{lesson_title}"
ACTIVIDAD: "{activity_title}"
CONTENIDO TEÓRICO: "{context}"
ENTREGA DEL ALUMNO: "{submission}"
REFLEXIÓN DEL ALUMNO SOBRE SU PROCESO: "{reflection}"
RÚBRICA: {rubric}

INSTRUCCIONES DE EVALUACIÓN:
1. Analiza si la respuesta demuestra comprensión profunda.
2. Asigna puntaje criterio por criterio según la rúbrica; el máximo es {max_score}.
3. Detecta errores técnicos.
4. Autenticidad: compara el estilo de redacción de la entrega con el de la reflexión.
   Un contraste marcado (entrega pulida y genérica frente a reflexión informal) sugiere
   texto no propio. Asigna "authenticityScore" de 0 a 100 y explica en "detectionRationale".

RESPONDE ÚNICAMENTE UN JSON con score, maxScore, authenticityScore, generalFeedback,
strengths, improvementAreas, detectionRationale y breakdown."#;
