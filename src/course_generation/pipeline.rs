/// Course generation pipeline
///
/// skeleton: validate input -> one model call (no retry) -> recover -> validate -> normalize
/// unit:     model call under timeout with bounded retries -> recover -> validate -> normalize
///           -> placeholder or error once attempts run out
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::UnitFailurePolicy;
use crate::course::{Course, Unit, UserPreferences};
use crate::error_recovery::{RetryConfig, RetryExecutor, RetryStrategy};
use crate::gemini_adapter::{GenerationRequest, GenerativeModel, ImagePart};
use crate::json_recovery::recover_json;
use crate::json_validator::{self, Stage};
use crate::models::{AppError, AppErrorType};

use super::normalizer::{normalize_lessons, normalize_skeleton, placeholder_lesson, Normalized};
use super::prompts::{
    build_skeleton_prompt, build_unit_content_prompt, SKELETON_RESPONSE_SCHEMA,
    UNIT_CONTENT_RESPONSE_SCHEMA,
};
use super::types::{GenerationSettings, UnitBuild, MAX_SYLLABUS_PAGES};

pub struct CourseGenerator {
    model: Arc<dyn GenerativeModel>,
    settings: GenerationSettings,
}

impl CourseGenerator {
    pub fn new(model: Arc<dyn GenerativeModel>, settings: GenerationSettings) -> Self {
        Self { model, settings }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Turn the instructor's preferences into a course with unbuilt units.
    pub async fn generate_course_skeleton(
        &self,
        prefs: &UserPreferences,
    ) -> Result<Normalized<Course>, AppError> {
        // 1. Input validation, before any network traffic
        if prefs.topic.trim().is_empty() && prefs.syllabus_images.is_empty() {
            return Err(AppError::validation("Introduce un tema o carga el temario."));
        }
        let images = collect_syllabus_images(&prefs.syllabus_images)?;

        // 2. Prompt
        info!(
            "[CourseGeneration] skeleton: topic='{}', level={}, pages={}",
            prefs.topic.trim(),
            prefs.level,
            images.len()
        );
        let request = GenerationRequest::text(build_skeleton_prompt(prefs, images.len()))
            .with_schema(SKELETON_RESPONSE_SCHEMA.clone())
            .with_images(images);

        // 3. Single attempt under the skeleton deadline
        let executor = RetryExecutor::single_attempt(self.settings.skeleton_timeout);
        let model = self.model.clone();
        let outcome = executor
            .execute_async("skeleton", || {
                let model = model.clone();
                let request = request.clone();
                async move { generate_json(model.as_ref(), request, Stage::Skeleton).await }
            })
            .await;
        let raw = outcome
            .into_result()
            .map_err(|e| e.prefixed("Error generando temario: "))?;

        // 4. Normalization
        let course = normalize_skeleton(&raw, prefs, chrono::Utc::now().timestamp_millis())?;
        info!(
            "[CourseGeneration] skeleton ready: '{}' with {} units ({} defaulted fields)",
            course.value.title,
            course.value.units.len(),
            course.defaults.len()
        );
        Ok(course)
    }

    /// Generate the lessons of one unit.
    ///
    /// Configuration errors always surface as `Err`. Other failures become a
    /// placeholder lesson or an error depending on the failure policy.
    pub async fn generate_unit_content(&self, unit: &Unit, level: &str) -> Result<UnitBuild, AppError> {
        info!("[CourseGeneration] building unit '{}' (level {})", unit.title, level);
        let request = GenerationRequest::text(build_unit_content_prompt(unit, level))
            .with_schema(UNIT_CONTENT_RESPONSE_SCHEMA.clone());

        let executor = RetryExecutor::new(
            RetryConfig {
                max_retries: self.settings.unit_max_retries,
                attempt_timeout: Some(self.settings.unit_timeout),
            },
            RetryStrategy::Fixed(self.settings.retry_delay),
        );
        let model = self.model.clone();
        let outcome = executor
            .execute_async("unit content", || {
                let model = model.clone();
                let request = request.clone();
                async move {
                    let raw = generate_json(model.as_ref(), request, Stage::UnitContent).await?;
                    normalize_lessons(&raw)
                }
            })
            .await;
        let attempts = outcome.attempts;

        match outcome.into_result() {
            Ok(lessons) => {
                info!(
                    "[CourseGeneration] unit '{}' built: {} lessons after {} attempt(s)",
                    unit.title,
                    lessons.value.len(),
                    attempts
                );
                if !lessons.is_clean() {
                    warn!("[CourseGeneration] unit '{}' defaults: {:?}", unit.title, lessons.defaults);
                }
                Ok(UnitBuild::Generated(lessons.value))
            }
            Err(err) if err.error_type == AppErrorType::Configuration => Err(err),
            Err(err) => match self.settings.unit_failure_policy {
                UnitFailurePolicy::Placeholder => {
                    warn!(
                        "[CourseGeneration] unit '{}' failed after {} attempt(s), using placeholder: {}",
                        unit.title, attempts, err
                    );
                    Ok(UnitBuild::Placeholder(placeholder_lesson(&err.message), err.message))
                }
                UnitFailurePolicy::Error => Err(err.prefixed("Error generando contenido de unidad: ")),
            },
        }
    }

    /// Build unit `index` of `course` in place. The unit's lessons are replaced
    /// in one assignment, or left untouched when an error is returned.
    pub async fn build_unit(
        &self,
        course: &mut Course,
        index: usize,
        level: &str,
    ) -> Result<UnitBuild, AppError> {
        let unit = course
            .unit(index)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("La unidad {} no existe en el curso.", index + 1)))?;

        let build = self.generate_unit_content(&unit, level).await?;
        if let Some(target) = course.unit_mut(index) {
            target.lessons = build.lessons().to_vec();
        }
        Ok(build)
    }
}

/// One model call turned into a validated JSON document.
pub(crate) async fn generate_json(
    model: &dyn GenerativeModel,
    request: GenerationRequest,
    stage: Stage,
) -> Result<Value, AppError> {
    let text = model.generate(request).await?;
    let value = recover_json(&text)
        .ok_or_else(|| AppError::malformed("La IA no devolvió un JSON válido."))?;
    json_validator::validate(stage, &value).map_err(|errors| {
        AppError::with_details(
            AppErrorType::MalformedResponse,
            "La IA no devolvió una estructura válida.",
            serde_json::json!({ "stage": format!("{:?}", stage), "errors": errors }),
        )
    })?;
    Ok(value)
}

fn collect_syllabus_images(raw: &[String]) -> Result<Vec<ImagePart>, AppError> {
    if raw.len() > MAX_SYLLABUS_PAGES {
        warn!(
            "[CourseGeneration] {} syllabus pages supplied, only the first {} are sent",
            raw.len(),
            MAX_SYLLABUS_PAGES
        );
    }
    raw.iter()
        .take(MAX_SYLLABUS_PAGES)
        .map(|img| ImagePart::from_data_url(img))
        .collect()
}
