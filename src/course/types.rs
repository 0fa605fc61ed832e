/// Course document types
///
/// Interchange JSON is camelCase so backups written by earlier releases of the
/// classroom tooling import unchanged.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Course structure
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    /// Epoch milliseconds
    pub created_at: i64,
    pub title: String,
    pub duration: String,
    #[serde(default)]
    pub subject_code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrumentation: Option<Instrumentation>,
    #[serde(default)]
    pub final_projects: Vec<String>,
    #[serde(default)]
    pub student_list: Vec<AuthorizedStudent>,
    #[serde(default)]
    pub grades: Vec<Grade>,
}

impl Course {
    pub fn unit(&self, index: usize) -> Option<&Unit> {
        self.units.get(index)
    }

    pub fn unit_mut(&mut self, index: usize) -> Option<&mut Unit> {
        self.units.get_mut(index)
    }

    /// Units whose lessons have been generated
    pub fn built_units(&self) -> usize {
        self.units.iter().filter(|u| u.is_built()).count()
    }

    pub fn find_lesson(&self, lesson_id: &str) -> Option<&Lesson> {
        self.units
            .iter()
            .flat_map(|u| u.lessons.iter())
            .find(|l| l.id == lesson_id)
    }

    /// Roster lookup used by the classroom login
    pub fn authorize(&self, student_id: &str, pin: &str) -> Option<&AuthorizedStudent> {
        self.student_list
            .iter()
            .find(|s| s.id == student_id.trim() && s.pin == pin.trim())
    }

    pub fn record_grade(&mut self, grade: Grade) {
        self.grades.push(grade);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Empty until the unit is built, then replaced wholesale
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Unit {
    pub fn is_built(&self) -> bool {
        !self.lessons.is_empty()
    }

    /// Graded activities of the unit paired with the lesson that holds them
    pub fn activities(&self) -> Vec<(&Lesson, &ActivityBlock)> {
        self.lessons
            .iter()
            .flat_map(|lesson| {
                lesson.blocks.iter().filter_map(move |block| match block {
                    LessonBlock::Activity(activity) => Some((lesson, activity)),
                    _ => None,
                })
            })
            .collect()
    }

    pub fn tests(&self) -> Vec<(&Lesson, &TestBlock)> {
        self.lessons
            .iter()
            .flat_map(|lesson| {
                lesson.blocks.iter().filter_map(move |block| match block {
                    LessonBlock::Test(test) => Some((lesson, test)),
                    _ => None,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub blocks: Vec<LessonBlock>,
}

// ============================================================================
// Lesson blocks
// ============================================================================

/// One block of a lesson, tagged on `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LessonBlock {
    Theory(TextBlock),
    Example(TextBlock),
    Activity(ActivityBlock),
    Test(TestBlock),
}

impl LessonBlock {
    pub fn kind(&self) -> BlockKind {
        match self {
            LessonBlock::Theory(_) => BlockKind::Theory,
            LessonBlock::Example(_) => BlockKind::Example,
            LessonBlock::Activity(_) => BlockKind::Activity,
            LessonBlock::Test(_) => BlockKind::Test,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            LessonBlock::Theory(b) | LessonBlock::Example(b) => &b.title,
            LessonBlock::Activity(b) => &b.title,
            LessonBlock::Test(b) => &b.title,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            LessonBlock::Theory(b) | LessonBlock::Example(b) => &b.content,
            LessonBlock::Activity(b) => &b.content,
            LessonBlock::Test(b) => &b.content,
        }
    }
}

/// Block discriminant without the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Theory,
    Example,
    Activity,
    Test,
}

impl BlockKind {
    /// Parse a model-provided type; case-insensitive, unknown values are `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "theory" => Some(BlockKind::Theory),
            "example" => Some(BlockKind::Example),
            "activity" => Some(BlockKind::Activity),
            "test" => Some(BlockKind::Test),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Theory => "theory",
            BlockKind::Example => "example",
            BlockKind::Activity => "activity",
            BlockKind::Test => "test",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityBlock {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub competency: String,
    /// Points out of the unit's 90 activity points
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub rubric: Vec<RubricCriterion>,
}

impl ActivityBlock {
    pub fn rubric_total(&self) -> f64 {
        self.rubric.iter().map(|c| c.points).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestBlock {
    pub title: String,
    pub content: String,
    /// Points out of the unit's 10 test points
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub test_questions: Vec<Question>,
}

impl TestBlock {
    /// `(correct, total)` for the given answer indices; unanswered questions
    /// count as wrong.
    pub fn score(&self, answers: &[usize]) -> (usize, usize) {
        let correct = self
            .test_questions
            .iter()
            .enumerate()
            .filter(|(i, q)| answers.get(*i).is_some_and(|a| q.is_correct(*a)))
            .count();
        (correct, self.test_questions.len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricCriterion {
    pub criterion: String,
    pub points: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
    #[serde(default)]
    pub feedback: String,
}

impl Question {
    pub fn is_correct(&self, answer: usize) -> bool {
        answer == self.correct_answer_index
    }
}

// ============================================================================
// Instrumentation (official didactic planning)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instrumentation {
    pub characterization: String,
    pub didactic_intent: String,
    pub subject_competency: String,
    pub analysis_by_unit: Vec<AnalysisByUnit>,
    pub evaluation_matrix: Vec<EvaluationEntry>,
    pub calendar: Vec<CalendarEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisByUnit {
    pub unit_title: String,
    pub competency_description: String,
    pub indicators_of_reach: String,
    pub hours: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationEntry {
    pub evidence: String,
    pub percentage: f64,
    pub indicators: String,
    pub evaluation_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalendarEntry {
    pub week: u32,
    pub planned: String,
}

// ============================================================================
// Roster, grades and submissions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizedStudent {
    pub id: String,
    pub name: String,
    /// 4-digit access code
    pub pin: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeType {
    Practice,
    Test,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub lesson_id: String,
    #[serde(rename = "type")]
    pub grade_type: GradeType,
    pub score: f64,
    pub max_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Epoch milliseconds
    pub date: i64,
}

/// What a student hands in from the classroom bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSubmission {
    pub student_name: String,
    pub student_id: String,
    pub lesson_title: String,
    pub activity_title: String,
    pub content: String,
    #[serde(default)]
    pub reflection: String,
    pub timestamp: i64,
    #[serde(default)]
    pub ai_score: f64,
    #[serde(default)]
    pub ai_feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticity_score: Option<f64>,
}

// ============================================================================
// Teacher and generation preferences
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherProfile {
    /// Uppercased, trimmed teacher id
    pub id: String,
    pub name: String,
    pub role: String,
    pub joined_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CourseLevel {
    Principiante,
    #[default]
    Intermedio,
    Avanzado,
}

impl CourseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseLevel::Principiante => "Principiante",
            CourseLevel::Intermedio => "Intermedio",
            CourseLevel::Avanzado => "Avanzado",
        }
    }
}

impl fmt::Display for CourseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "principiante" => Ok(CourseLevel::Principiante),
            "intermedio" => Ok(CourseLevel::Intermedio),
            "avanzado" => Ok(CourseLevel::Avanzado),
            other => Err(format!("Nivel desconocido: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CourseFormat {
    #[serde(rename = "Lecturas breves")]
    LecturasBreves,
    #[serde(rename = "Lecturas + ejercicios")]
    LecturasEjercicios,
    #[serde(rename = "Esquemas + problemas")]
    EsquemasProblemas,
    #[default]
    #[serde(rename = "Mixto")]
    Mixto,
}

impl CourseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseFormat::LecturasBreves => "Lecturas breves",
            CourseFormat::LecturasEjercicios => "Lecturas + ejercicios",
            CourseFormat::EsquemasProblemas => "Esquemas + problemas",
            CourseFormat::Mixto => "Mixto",
        }
    }
}

impl fmt::Display for CourseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseFormat {
    type Err = String;

    /// Accepts the display label or a one-word alias (`breves`, `ejercicios`,
    /// `esquemas`, `mixto`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lecturas breves" | "breves" => Ok(CourseFormat::LecturasBreves),
            "lecturas + ejercicios" | "ejercicios" => Ok(CourseFormat::LecturasEjercicios),
            "esquemas + problemas" | "esquemas" => Ok(CourseFormat::EsquemasProblemas),
            "mixto" => Ok(CourseFormat::Mixto),
            other => Err(format!("Formato desconocido: {}", other)),
        }
    }
}

/// Everything the instructor fills in before asking for a skeleton
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub topic: String,
    pub level: CourseLevel,
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub time: String,
    pub format: CourseFormat,
    /// Data URLs or bare base64 page images
    #[serde(default)]
    pub syllabus_images: Vec<String>,
    #[serde(default)]
    pub student_list_raw: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quiz() -> TestBlock {
        TestBlock {
            title: "Evaluación".into(),
            content: String::new(),
            weight: 10.0,
            test_questions: vec![
                Question {
                    question: "¿2+2?".into(),
                    options: vec!["3".into(), "4".into()],
                    correct_answer_index: 1,
                    feedback: String::new(),
                },
                Question {
                    question: "¿Capa 3?".into(),
                    options: vec!["Red".into(), "Enlace".into()],
                    correct_answer_index: 0,
                    feedback: String::new(),
                },
            ],
        }
    }

    #[test]
    fn blocks_serialize_with_type_tag() {
        let block = LessonBlock::Activity(ActivityBlock {
            title: "Práctica".into(),
            content: "Configura la red".into(),
            competency: "CE1".into(),
            weight: 45.0,
            rubric: vec![],
        });
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "activity");
        assert_eq!(value["weight"], json!(45.0));
        let back: LessonBlock = serde_json::from_value(value).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn quiz_scoring_counts_missing_answers_as_wrong() {
        let test = quiz();
        assert_eq!(test.score(&[1, 0]), (2, 2));
        assert_eq!(test.score(&[0, 0]), (1, 2));
        assert_eq!(test.score(&[1]), (1, 2));
    }

    #[test]
    fn enums_parse_loosely_and_serialize_as_labels() {
        assert_eq!("avanzado".parse::<CourseLevel>().unwrap(), CourseLevel::Avanzado);
        assert_eq!("esquemas".parse::<CourseFormat>().unwrap(), CourseFormat::EsquemasProblemas);
        assert!("experto".parse::<CourseLevel>().is_err());
        assert_eq!(
            serde_json::to_value(CourseFormat::LecturasEjercicios).unwrap(),
            json!("Lecturas + ejercicios")
        );
    }

    #[test]
    fn unit_lists_activities_with_their_lesson() {
        let unit = Unit {
            id: "u1".into(),
            title: "Unidad 1".into(),
            summary: String::new(),
            lessons: vec![Lesson {
                id: "l1".into(),
                title: "Lección 1".into(),
                blocks: vec![
                    LessonBlock::Theory(TextBlock { title: "T".into(), content: "c".into() }),
                    LessonBlock::Activity(ActivityBlock {
                        title: "A".into(),
                        content: "c".into(),
                        competency: String::new(),
                        weight: 90.0,
                        rubric: vec![],
                    }),
                    LessonBlock::Test(quiz()),
                ],
            }],
        };
        let activities = unit.activities();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].0.title, "Lección 1");
        assert_eq!(unit.tests().len(), 1);
        assert!(unit.is_built());
    }
}
