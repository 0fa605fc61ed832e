//! Library backup files
//!
//! Export writes every course as a pretty JSON array. Import takes either one
//! course object or an array of them and gives each course a fresh id, so a
//! re-imported backup never collides with the course it came from.

use serde_json::Value;

use crate::course::Course;
use crate::course_generation::normalizer::new_id;
use crate::models::AppError;

pub fn backup_file_name(teacher_id: &str) -> String {
    format!("Biblioteca_TecNM_{}.json", teacher_id)
}

pub fn export_courses(courses: &[Course]) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(courses)?)
}

pub fn parse_import(text: &str) -> Result<Vec<Course>, AppError> {
    let value: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
        .map_err(|e| AppError::validation(format!("Archivo inválido: {}", e)))?;

    let mut courses: Vec<Course> = match value {
        Value::Array(_) => serde_json::from_value(value)
            .map_err(|e| AppError::validation(format!("Archivo inválido: {}", e)))?,
        Value::Object(_) => vec![serde_json::from_value(value)
            .map_err(|e| AppError::validation(format!("Archivo inválido: {}", e)))?],
        _ => return Err(AppError::validation("Archivo inválido: se esperaba un curso o una lista de cursos.")),
    };

    for course in &mut courses {
        course.id = new_id("course");
    }
    Ok(courses)
}
