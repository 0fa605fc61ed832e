//! Teacher session
//!
//! The teacher id is free text; it is only used to scope the library key.

use std::sync::Arc;
use tracing::{info, warn};

use super::store::KeyValueStore;
use crate::course::TeacherProfile;
use crate::models::AppError;

pub const SESSION_KEY: &str = "profesoria_teacher_session";
const LIBRARY_KEY_PREFIX: &str = "profesoria_library_";

/// Storage key of a teacher's course library
pub fn library_key(teacher_id: &str) -> String {
    format!("{}{}", LIBRARY_KEY_PREFIX, teacher_id)
}

pub fn normalize_teacher_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub struct Session {
    store: Arc<dyn KeyValueStore>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The signed-in teacher; an unreadable session counts as signed out.
    pub fn current(&self) -> Result<Option<TeacherProfile>, AppError> {
        let Some(raw) = self.store.load(SESSION_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                warn!("[Library] discarding unreadable session: {}", e);
                Ok(None)
            }
        }
    }

    pub fn require(&self) -> Result<TeacherProfile, AppError> {
        self.current()?
            .ok_or_else(|| AppError::validation("No hay sesión activa. Inicia sesión con tu ID de docente."))
    }

    pub fn login(&self, raw_id: &str) -> Result<TeacherProfile, AppError> {
        let id = normalize_teacher_id(raw_id);
        if id.is_empty() {
            return Err(AppError::validation("El ID de docente no puede estar vacío."));
        }
        let profile = TeacherProfile {
            id,
            name: raw_id.trim().to_string(),
            role: "teacher".to_string(),
            joined_at: chrono::Utc::now().timestamp_millis(),
        };
        self.store.save(SESSION_KEY, &serde_json::to_string(&profile)?)?;
        info!("[Library] teacher {} signed in", profile.id);
        Ok(profile)
    }

    /// Ends the session; the teacher's library stays in the store.
    pub fn logout(&self) -> Result<(), AppError> {
        self.store.remove(SESSION_KEY)?;
        info!("[Library] signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::store::MemoryStore;

    #[test]
    fn login_uppercases_and_trims() {
        let session = Session::new(Arc::new(MemoryStore::new()));
        let profile = session.login("  doc-ana ").unwrap();
        assert_eq!(profile.id, "DOC-ANA");
        assert_eq!(profile.name, "doc-ana");
        assert_eq!(session.current().unwrap().unwrap().id, "DOC-ANA");
        assert_eq!(library_key(&profile.id), "profesoria_library_DOC-ANA");
    }

    #[test]
    fn blank_id_is_rejected() {
        let session = Session::new(Arc::new(MemoryStore::new()));
        assert!(session.login("   ").is_err());
        assert!(session.current().unwrap().is_none());
    }

    #[test]
    fn logout_clears_session_only() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(store.clone());
        session.login("t1").unwrap();
        store.save(&library_key("T1"), "[]").unwrap();
        session.logout().unwrap();
        assert!(session.current().unwrap().is_none());
        assert!(session.require().is_err());
        assert_eq!(store.load(&library_key("T1")).unwrap().as_deref(), Some("[]"));
    }
}
