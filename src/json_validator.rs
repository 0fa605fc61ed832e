// Per-stage JSON validation of recovered model output
use serde_json::Value;
use std::ops::Deref;
use std::sync::LazyLock;

/// Which model answer is being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Skeleton,    // course outline (units, optional instrumentation)
    UnitContent, // lessons of one unit
    Grading,     // rubric evaluation of a submission
}

// Skeleton: a `units` array is mandatory, everything else is defaulted later
static SKELETON_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    serde_json::json!({
        "type": "object",
        "properties": {
            "title": { "type": ["string", "null"] },
            "subjectCode": { "type": ["string", "null"] },
            "description": { "type": ["string", "null"] },
            "units": {
                "type": "array",
                "items": { "type": "object" }
            },
            "instrumentation": { "type": ["object", "null"] }
        },
        "required": ["units"],
        "additionalProperties": true
    })
});

// UnitContent: only the `lessons` array has to be there
static UNIT_CONTENT_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    serde_json::json!({
        "type": "object",
        "properties": {
            "lessons": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "blocks": { "type": ["array", "null"] }
                    },
                    "additionalProperties": true
                }
            }
        },
        "required": ["lessons"],
        "additionalProperties": true
    })
});

// Grading: any object, but a present score must be numeric
static GRADING_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    serde_json::json!({
        "type": "object",
        "properties": {
            "score": { "type": "number" },
            "maxScore": { "type": ["number", "null"] },
            "authenticityScore": { "type": ["number", "null"] },
            "breakdown": { "type": ["array", "null"] }
        },
        "required": [],
        "additionalProperties": true
    })
});

/// Validate a recovered document for the given stage
pub fn validate(stage: Stage, data: &Value) -> Result<(), Vec<String>> {
    let schema = match stage {
        Stage::Skeleton => SKELETON_SCHEMA.deref(),
        Stage::UnitContent => UNIT_CONTENT_SCHEMA.deref(),
        Stage::Grading => GRADING_SCHEMA.deref(),
    };
    let validator = jsonschema::validator_for(schema).map_err(|e| vec![e.to_string()])?;
    let msgs: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();
    if msgs.is_empty() {
        Ok(())
    } else {
        Err(msgs)
    }
}
