/// Course generation: syllabus skeletons and per-unit lesson content
///
/// - `prompts`: prompt templates and Gemini response schemas
/// - `normalizer`: model JSON to typed course documents, with defaults
/// - `pipeline`: model calls under timeout/retry, recovery and validation
pub mod normalizer;
pub mod pipeline;
pub mod prompts;
pub mod types;

pub use normalizer::{placeholder_lesson, Normalized};
pub use pipeline::CourseGenerator;
pub use types::{GenerationSettings, UnitBuild, DEFAULT_UNIT_LEVEL};
