//! Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use profesoria_lib::course::{
    ActivityBlock, Course, Lesson, LessonBlock, RubricCriterion, TextBlock, Unit,
};
use profesoria_lib::gemini_adapter::{GenerationRequest, GenerativeModel};
use profesoria_lib::AppError;

/// What the scripted model does on one call
pub enum Step {
    Reply(String),
    Fail(AppError),
    /// Sleeps longer than any configured deadline
    Hang,
}

/// A model that plays back a script and records every request it sees.
/// Running past the end of the script is an LLM error.
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(value: &Value) -> Self {
        Self::new(vec![Step::Reply(value.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, request: GenerationRequest) -> Result<String, AppError> {
        self.requests.lock().unwrap().push(request);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(text)) => Ok(text),
            Some(Step::Fail(err)) => Err(err),
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(AppError::llm("hung call finished"))
            }
            None => Err(AppError::llm("script exhausted")),
        }
    }
}

pub fn skeleton_json() -> Value {
    json!({
        "title": "Estructuras de Datos",
        "duration": "60 horas",
        "subjectCode": "AED-1026",
        "description": "Listas, pilas, colas y árboles.",
        "units": [
            { "title": "Introducción", "summary": "Tipos abstractos de datos" },
            { "title": "Estructuras lineales" }
        ]
    })
}

pub fn lessons_json() -> Value {
    json!({
        "lessons": [
            {
                "title": "Pilas",
                "blocks": [
                    { "type": "theory", "title": "Concepto", "content": "LIFO" },
                    {
                        "type": "activity",
                        "title": "Implementa una pila",
                        "content": "Usa un arreglo.",
                        "rubric": [
                            { "criterion": "Correctitud", "points": 60 },
                            { "criterion": "Estilo", "points": 40 }
                        ]
                    },
                    {
                        "type": "test",
                        "title": "Repaso",
                        "content": "",
                        "testQuestions": [
                            { "question": "¿Orden de salida?", "options": ["LIFO", "FIFO"], "correctAnswerIndex": 0 }
                        ]
                    }
                ]
            }
        ]
    })
}

pub fn sample_unit(title: &str) -> Unit {
    Unit {
        id: format!("unit_{}", title.len()),
        title: title.to_string(),
        summary: "Resumen".to_string(),
        lessons: Vec::new(),
    }
}

/// A course with one built unit holding a single graded activity.
pub fn sample_course(title: &str) -> Course {
    let lesson = Lesson {
        id: "lesson_pilas".to_string(),
        title: "Pilas".to_string(),
        blocks: vec![
            LessonBlock::Theory(TextBlock {
                title: "Concepto".to_string(),
                content: "Una pila es LIFO.".to_string(),
            }),
            LessonBlock::Activity(ActivityBlock {
                title: "Implementa una pila".to_string(),
                content: "Usa un arreglo.".to_string(),
                competency: String::new(),
                weight: 90.0,
                rubric: vec![RubricCriterion {
                    criterion: "Correctitud".to_string(),
                    points: 100.0,
                    description: String::new(),
                }],
            }),
        ],
    };
    let mut built = sample_unit("Estructuras lineales");
    built.lessons.push(lesson);
    Course {
        id: "course_sample".to_string(),
        created_at: 1_700_000_000_000,
        title: title.to_string(),
        duration: "64 horas".to_string(),
        subject_code: "AED-1026".to_string(),
        description: "Curso de prueba".to_string(),
        units: vec![built, sample_unit("Árboles")],
        instrumentation: None,
        final_projects: Vec::new(),
        student_list: Vec::new(),
        grades: Vec::new(),
    }
}
