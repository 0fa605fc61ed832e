/// Per-teacher course library
///
/// - `store`: key-value persistence (SQLite or in-memory)
/// - `session`: the signed-in teacher
/// - `interchange`: backup export/import
/// - `autosave`: debounced background saves
pub mod autosave;
pub mod interchange;
pub mod session;
pub mod store;

use std::sync::Arc;
use tracing::info;

use crate::course::{Course, TeacherProfile};
use crate::models::AppError;

pub use autosave::Autosave;
pub use session::{library_key, Session, SESSION_KEY};
pub use store::{KeyValueStore, MemoryStore, SqliteStore, StoreError};

pub struct Library {
    store: Arc<dyn KeyValueStore>,
    teacher_id: String,
    courses: Vec<Course>,
}

impl Library {
    /// Load the teacher's library; a missing key is an empty library.
    pub fn open(store: Arc<dyn KeyValueStore>, teacher: &TeacherProfile) -> Result<Self, AppError> {
        let courses = match store.load(&library_key(&teacher.id))? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                AppError::storage(format!(
                    "La biblioteca de {} está dañada y no se puede leer: {}",
                    teacher.id, e
                ))
            })?,
            None => Vec::new(),
        };
        Ok(Self {
            store,
            teacher_id: teacher.id.clone(),
            courses,
        })
    }

    pub fn teacher_id(&self) -> &str {
        &self.teacher_id
    }

    pub fn key(&self) -> String {
        library_key(&self.teacher_id)
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn get(&self, id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    /// Position of a course given its id or its 1-based list number.
    pub fn position(&self, selector: &str) -> Option<usize> {
        let selector = selector.trim();
        self.courses
            .iter()
            .position(|c| c.id == selector)
            .or_else(|| {
                selector
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n >= 1 && *n <= self.courses.len())
                    .map(|n| n - 1)
            })
    }

    pub fn resolve(&self, selector: &str) -> Result<&Course, AppError> {
        self.position(selector)
            .map(|i| &self.courses[i])
            .ok_or_else(|| AppError::not_found(format!("Curso no encontrado: {}", selector)))
    }

    /// Newest first.
    pub fn add(&mut self, course: Course) {
        self.courses.insert(0, course);
    }

    pub fn update(&mut self, course: Course) -> Result<(), AppError> {
        let slot = self
            .courses
            .iter_mut()
            .find(|c| c.id == course.id)
            .ok_or_else(|| AppError::not_found(format!("Curso no encontrado: {}", course.id)))?;
        *slot = course;
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<Course, AppError> {
        let index = self
            .courses
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| AppError::not_found(format!("Curso no encontrado: {}", id)))?;
        Ok(self.courses.remove(index))
    }

    pub fn save(&self) -> Result<(), AppError> {
        let json = serde_json::to_string(&self.courses)?;
        self.store.save(&self.key(), &json)?;
        info!("[Library] saved {} courses for {}", self.courses.len(), self.teacher_id);
        Ok(())
    }

    /// Import a backup; imported courses go in front with fresh ids.
    pub fn import(&mut self, text: &str) -> Result<Vec<String>, AppError> {
        let imported = interchange::parse_import(text)?;
        let ids = imported.iter().map(|c| c.id.clone()).collect();
        info!("[Library] importing {} courses", imported.len());
        self.courses.splice(0..0, imported);
        Ok(ids)
    }

    pub fn export(&self) -> Result<String, AppError> {
        interchange::export_courses(&self.courses)
    }

    pub fn backup_file_name(&self) -> String {
        interchange::backup_file_name(&self.teacher_id)
    }
}
