//! Coercion of loosely shaped model JSON into typed course documents
//!
//! Each `normalize_*` function rejects only what cannot be repaired (a missing
//! top-level array) and otherwise fills gaps with fixed placeholders, listing
//! every defaulted field path in [`Normalized::defaults`].

use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::course::{
    parse_student_list, ActivityBlock, AnalysisByUnit, BlockKind, CalendarEntry, Course,
    EvaluationEntry, Instrumentation, Lesson, LessonBlock, Question, RubricCriterion, TestBlock,
    TextBlock, Unit, UserPreferences,
};
use crate::models::AppError;

pub const DEFAULT_DURATION: &str = "64 horas";
pub const DEFAULT_SUBJECT_CODE: &str = "TEC-GEN";
pub const DEFAULT_UNIT_SUMMARY: &str = "Contenido pendiente.";
pub const DEFAULT_BLOCK_TITLE: &str = "Tema";
pub const DEFAULT_BLOCK_CONTENT: &str = "Sin contenido.";
pub const PLACEHOLDER_LESSON_TITLE: &str = "Error de Generación";

/// Points shared by all activities of a unit
pub const ACTIVITY_POINTS: f64 = 90.0;
/// Points shared by all tests of a unit
pub const TEST_POINTS: f64 = 10.0;

/// A coerced value plus the paths that had to be defaulted
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    pub defaults: Vec<String>,
}

impl<T> Normalized<T> {
    pub fn is_clean(&self) -> bool {
        self.defaults.is_empty()
    }

    pub fn was_defaulted(&self, path: &str) -> bool {
        self.defaults.iter().any(|d| d == path)
    }
}

pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

// ============================================================================
// Skeleton
// ============================================================================

pub fn normalize_skeleton(
    raw: &Value,
    prefs: &UserPreferences,
    now_ms: i64,
) -> Result<Normalized<Course>, AppError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| AppError::malformed("La IA no devolvió una estructura válida."))?;
    let raw_units = obj
        .get("units")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::malformed("La IA no devolvió una estructura válida."))?;

    let mut defaults = Vec::new();

    let title = text_field(obj, "title").unwrap_or_else(|| {
        defaults.push("title".to_string());
        let topic = prefs.topic.trim();
        if topic.is_empty() {
            "Curso sin título".to_string()
        } else {
            topic.to_string()
        }
    });
    let subject_code = text_field(obj, "subjectCode").unwrap_or_else(|| {
        defaults.push("subjectCode".to_string());
        DEFAULT_SUBJECT_CODE.to_string()
    });
    let description = text_field(obj, "description").unwrap_or_else(|| {
        defaults.push("description".to_string());
        String::new()
    });

    let units = raw_units
        .iter()
        .enumerate()
        .map(|(i, raw_unit)| {
            let empty = Map::new();
            let unit = raw_unit.as_object().unwrap_or(&empty);
            Unit {
                id: new_id("unit"),
                title: text_field(unit, "title").unwrap_or_else(|| {
                    defaults.push(format!("units[{}].title", i));
                    format!("Unidad {}", i + 1)
                }),
                summary: text_field(unit, "summary").unwrap_or_else(|| {
                    defaults.push(format!("units[{}].summary", i));
                    DEFAULT_UNIT_SUMMARY.to_string()
                }),
                lessons: Vec::new(),
            }
        })
        .collect();

    let instrumentation = match obj.get("instrumentation") {
        Some(Value::Object(inst)) => Some(normalize_instrumentation(inst)),
        _ => {
            defaults.push("instrumentation".to_string());
            None
        }
    };

    if !defaults.is_empty() {
        debug!("[CourseGeneration] skeleton defaults: {:?}", defaults);
    }

    Ok(Normalized {
        value: Course {
            id: new_id("course"),
            created_at: now_ms,
            title,
            duration: DEFAULT_DURATION.to_string(),
            subject_code,
            description,
            units,
            instrumentation,
            final_projects: Vec::new(),
            student_list: parse_student_list(&prefs.student_list_raw),
            grades: Vec::new(),
        },
        defaults,
    })
}

fn normalize_instrumentation(obj: &Map<String, Value>) -> Instrumentation {
    Instrumentation {
        characterization: text_field(obj, "characterization").unwrap_or_default(),
        didactic_intent: text_field(obj, "didacticIntent").unwrap_or_default(),
        subject_competency: text_field(obj, "subjectCompetency").unwrap_or_default(),
        analysis_by_unit: objects(obj, "analysisByUnit")
            .map(|a| AnalysisByUnit {
                unit_title: text_field(a, "unitTitle").unwrap_or_default(),
                competency_description: text_field(a, "competencyDescription").unwrap_or_default(),
                indicators_of_reach: text_field(a, "indicatorsOfReach").unwrap_or_default(),
                hours: text_field(a, "hours").unwrap_or_default(),
            })
            .collect(),
        evaluation_matrix: objects(obj, "evaluationMatrix")
            .map(|e| EvaluationEntry {
                evidence: text_field(e, "evidence").unwrap_or_default(),
                percentage: number_field(e, "percentage").unwrap_or(0.0),
                indicators: text_field(e, "indicators").unwrap_or_default(),
                evaluation_type: text_field(e, "evaluationType").unwrap_or_default(),
            })
            .collect(),
        calendar: objects(obj, "calendar")
            .enumerate()
            .map(|(i, c)| CalendarEntry {
                week: number_field(c, "week")
                    .filter(|w| *w >= 0.0)
                    .map(|w| w as u32)
                    .unwrap_or(i as u32 + 1),
                planned: text_field(c, "planned").unwrap_or_default(),
            })
            .collect(),
    }
}

// ============================================================================
// Unit content
// ============================================================================

/// Lessons of one unit with fresh ids and derived weights.
pub fn normalize_lessons(raw: &Value) -> Result<Normalized<Vec<Lesson>>, AppError> {
    let raw_lessons = raw
        .get("lessons")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::malformed("Respuesta de lecciones vacía."))?;
    if raw_lessons.is_empty() {
        return Err(AppError::malformed("Respuesta de lecciones vacía."));
    }

    let mut defaults = Vec::new();
    let empty = Map::new();

    let mut lessons: Vec<Lesson> = raw_lessons
        .iter()
        .enumerate()
        .map(|(li, raw_lesson)| {
            let lesson = raw_lesson.as_object().unwrap_or(&empty);
            let title = text_field(lesson, "title").unwrap_or_else(|| {
                defaults.push(format!("lessons[{}].title", li));
                format!("Lección {}", li + 1)
            });
            let blocks = match lesson.get("blocks").and_then(Value::as_array) {
                Some(raw_blocks) => raw_blocks
                    .iter()
                    .enumerate()
                    .map(|(bi, b)| {
                        let path = format!("lessons[{}].blocks[{}]", li, bi);
                        normalize_block(b.as_object().unwrap_or(&empty), &path, &mut defaults)
                    })
                    .collect(),
                None => {
                    defaults.push(format!("lessons[{}].blocks", li));
                    Vec::new()
                }
            };
            Lesson {
                id: new_id("lesson"),
                title,
                blocks,
            }
        })
        .collect();

    apply_derived_weights(&mut lessons);

    Ok(Normalized {
        value: lessons,
        defaults,
    })
}

fn normalize_block(obj: &Map<String, Value>, path: &str, defaults: &mut Vec<String>) -> LessonBlock {
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(BlockKind::parse)
        .unwrap_or_else(|| {
            defaults.push(format!("{}.type", path));
            BlockKind::Theory
        });
    let title = text_field(obj, "title").unwrap_or_else(|| {
        defaults.push(format!("{}.title", path));
        DEFAULT_BLOCK_TITLE.to_string()
    });
    let content = content_field(obj).unwrap_or_else(|| {
        defaults.push(format!("{}.content", path));
        DEFAULT_BLOCK_CONTENT.to_string()
    });

    match kind {
        BlockKind::Theory => LessonBlock::Theory(TextBlock { title, content }),
        BlockKind::Example => LessonBlock::Example(TextBlock { title, content }),
        BlockKind::Activity => {
            let rubric = match obj.get("rubric").and_then(Value::as_array) {
                Some(items) => items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|c| RubricCriterion {
                        criterion: text_field(c, "criterion").unwrap_or_else(|| "Criterio".to_string()),
                        points: number_field(c, "points").unwrap_or(0.0).max(0.0),
                        description: text_field(c, "description").unwrap_or_default(),
                    })
                    .collect(),
                None => {
                    defaults.push(format!("{}.rubric", path));
                    Vec::new()
                }
            };
            LessonBlock::Activity(ActivityBlock {
                title,
                content,
                competency: text_field(obj, "competency").unwrap_or_default(),
                weight: 0.0,
                rubric,
            })
        }
        BlockKind::Test => {
            let test_questions = match obj.get("testQuestions").and_then(Value::as_array) {
                Some(items) => items
                    .iter()
                    .filter_map(Value::as_object)
                    .enumerate()
                    .map(|(qi, q)| normalize_question(q, &format!("{}.testQuestions[{}]", path, qi), defaults))
                    .collect(),
                None => {
                    defaults.push(format!("{}.testQuestions", path));
                    Vec::new()
                }
            };
            LessonBlock::Test(TestBlock {
                title,
                content,
                weight: 0.0,
                test_questions,
            })
        }
    }
}

fn normalize_question(obj: &Map<String, Value>, path: &str, defaults: &mut Vec<String>) -> Question {
    let options: Vec<String> = obj
        .get("options")
        .and_then(Value::as_array)
        .map(|opts| opts.iter().filter_map(scalar_to_string).collect())
        .unwrap_or_default();
    let index = number_field(obj, "correctAnswerIndex")
        .filter(|i| *i >= 0.0 && (*i as usize) < options.len())
        .map(|i| i as usize)
        .unwrap_or_else(|| {
            defaults.push(format!("{}.correctAnswerIndex", path));
            0
        });
    Question {
        question: text_field(obj, "question").unwrap_or_default(),
        options,
        correct_answer_index: index,
        feedback: text_field(obj, "feedback").unwrap_or_default(),
    }
}

/// Spread 90 points over a unit's activities and 10 over its tests.
pub fn apply_derived_weights(lessons: &mut [Lesson]) {
    let blocks = || lessons.iter().flat_map(|l| l.blocks.iter());
    let activities = blocks().filter(|b| b.kind() == BlockKind::Activity).count();
    let tests = blocks().filter(|b| b.kind() == BlockKind::Test).count();
    let activity_weight = derived_weight(ACTIVITY_POINTS, activities);
    let test_weight = derived_weight(TEST_POINTS, tests);

    for block in lessons.iter_mut().flat_map(|l| l.blocks.iter_mut()) {
        match block {
            LessonBlock::Activity(a) => a.weight = activity_weight,
            LessonBlock::Test(t) => t.weight = test_weight,
            _ => {}
        }
    }
}

/// `total / count` rounded to one decimal; zero when there is nothing to share.
pub fn derived_weight(total: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (total / count as f64 * 10.0).round() / 10.0
}

/// Stand-in lesson for a unit whose generation failed for good.
pub fn placeholder_lesson(reason: &str) -> Lesson {
    Lesson {
        id: new_id("lesson"),
        title: PLACEHOLDER_LESSON_TITLE.to_string(),
        blocks: vec![LessonBlock::Theory(TextBlock {
            title: "Contenido no disponible".to_string(),
            content: format!(
                "No fue posible generar el contenido de esta unidad ({}). \
                 Vuelve a construir la unidad para intentarlo de nuevo.",
                reason
            ),
        })],
    }
}

// ============================================================================
// Lenient field access
// ============================================================================

/// Trimmed, non-empty text; numbers and booleans are stringified.
fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(scalar_to_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Block content, also accepting a list of paragraphs.
fn content_field(obj: &Map<String, Value>) -> Option<String> {
    match obj.get("content") {
        Some(Value::Array(parts)) => {
            let joined = parts
                .iter()
                .filter_map(scalar_to_string)
                .collect::<Vec<_>>()
                .join("\n\n");
            Some(joined).filter(|s| !s.trim().is_empty())
        }
        _ => text_field(obj, "content"),
    }
}

fn number_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn objects<'a>(obj: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Map<String, Value>> {
    obj.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}
