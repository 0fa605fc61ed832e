//! Offline classroom bundle
//!
//! A single HTML file with the course embedded as `COURSE_DATA`, rendered by a
//! small vanilla-JS player. The student's work leaves the bundle as a
//! downloaded `Entrega_<control>.json`, which `grade` consumes.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::course::Course;
use crate::models::AppError;
use crate::utils::{escape_html, escape_json_for_script, fill_template, underscore_whitespace};

pub const TEMPLATE_VERSION: &str = "3.0";

const CLASSROOM_TEMPLATE: &str = include_str!("../templates/classroom.html");

pub fn export_file_name(course: &Course) -> String {
    format!("Aula_{}.html", underscore_whitespace(&course.title))
}

/// What the student bundle is allowed to see: no gradebook, no roster PINs.
pub fn classroom_payload(course: &Course) -> Result<Value, AppError> {
    let mut value = serde_json::to_value(course)?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("grades");
        if let Some(Value::Array(students)) = obj.get_mut("studentList") {
            for student in students.iter_mut().filter_map(Value::as_object_mut) {
                student.remove("pin");
            }
        }
    }
    Ok(value)
}

pub fn render_classroom(course: &Course) -> Result<String, AppError> {
    let payload = classroom_payload(course)?;
    let json = escape_json_for_script(&serde_json::to_string(&payload)?);
    let title = escape_html(&course.title);
    // single pass, so a title holding `{{COURSE_JSON}}` stays literal
    Ok(fill_template(
        CLASSROOM_TEMPLATE,
        "{{",
        "}}",
        &[
            ("COURSE_TITLE", title.as_str()),
            ("COURSE_JSON", json.as_str()),
            ("TEMPLATE_VERSION", TEMPLATE_VERSION),
        ],
    ))
}

/// Render into `dir` and return the written path.
pub fn write_classroom(course: &Course, dir: &Path) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(course));
    std::fs::write(&path, render_classroom(course)?)?;
    info!("[ClassroomExport] wrote {:?}", path);
    Ok(path)
}
