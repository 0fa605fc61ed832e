/// Submission grading: rubric scoring plus an authenticity estimate
///
/// - `types`: request/result types, Gemini schema and prompt template
/// - `pipeline`: model call under timeout; failures become a zero-score result
pub mod pipeline;
pub mod types;

pub use pipeline::{apply_to_submission, to_grade, SubmissionGrader};
pub use types::{CriterionScore, GradingRequest, GradingResult, GRADING_FAILURE_FEEDBACK};
