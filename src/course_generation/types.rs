/// Course generation - types
use std::time::Duration;

use crate::config::{AppConfig, UnitFailurePolicy};
use crate::course::Lesson;

/// Level used for unit content when the caller does not choose one
pub const DEFAULT_UNIT_LEVEL: &str = "Ingeniería Superior";

/// Syllabus pages sent with a skeleton request; extra pages are dropped
pub const MAX_SYLLABUS_PAGES: usize = 10;

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub skeleton_timeout: Duration,
    pub unit_timeout: Duration,
    pub unit_max_retries: u32,
    pub unit_failure_policy: UnitFailurePolicy,
    /// Pause before a unit retry
    pub retry_delay: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl GenerationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            skeleton_timeout: config.skeleton_timeout(),
            unit_timeout: config.unit_timeout(),
            unit_max_retries: config.unit_max_retries,
            unit_failure_policy: config.unit_failure_policy,
            retry_delay: Duration::from_millis(500),
        }
    }
}

// ============================================================================
// Unit build outcome
// ============================================================================

/// Lessons that replace a unit's content
#[derive(Debug, Clone, PartialEq)]
pub enum UnitBuild {
    /// Model output, normalized
    Generated(Vec<Lesson>),
    /// Every attempt failed; a single stand-in lesson and the last error
    Placeholder(Lesson, String),
}

impl UnitBuild {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, UnitBuild::Placeholder(..))
    }

    pub fn lessons(&self) -> &[Lesson] {
        match self {
            UnitBuild::Generated(lessons) => lessons,
            UnitBuild::Placeholder(lesson, _) => std::slice::from_ref(lesson),
        }
    }

    pub fn into_lessons(self) -> Vec<Lesson> {
        match self {
            UnitBuild::Generated(lessons) => lessons,
            UnitBuild::Placeholder(lesson, _) => vec![lesson],
        }
    }
}
