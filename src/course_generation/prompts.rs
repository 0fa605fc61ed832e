/// Prompt templates and Gemini response schemas for course generation
use serde_json::Value;
use std::sync::LazyLock;

use crate::course::{Unit, UserPreferences};

// ============================================================================
// Response schemas (Gemini OpenAPI subset, upper-case type names)
// ============================================================================

pub static SKELETON_RESPONSE_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "subjectCode": { "type": "STRING" },
            "description": { "type": "STRING" },
            "instrumentation": {
                "type": "OBJECT",
                "properties": {
                    "characterization": { "type": "STRING" },
                    "didacticIntent": { "type": "STRING" },
                    "subjectCompetency": { "type": "STRING" },
                    "analysisByUnit": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "unitTitle": { "type": "STRING" },
                                "competencyDescription": { "type": "STRING" },
                                "indicatorsOfReach": { "type": "STRING" },
                                "hours": { "type": "STRING" }
                            }
                        }
                    },
                    "evaluationMatrix": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "evidence": { "type": "STRING" },
                                "percentage": { "type": "NUMBER" },
                                "indicators": { "type": "STRING" },
                                "evaluationType": { "type": "STRING" }
                            }
                        }
                    },
                    "calendar": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "week": { "type": "NUMBER" },
                                "planned": { "type": "STRING" }
                            }
                        }
                    }
                }
            },
            "units": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "summary": { "type": "STRING" }
                    }
                }
            }
        },
        "required": ["title", "units"]
    })
});

pub static UNIT_CONTENT_RESPONSE_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "lessons": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "blocks": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "type": {
                                        "type": "STRING",
                                        "enum": ["theory", "example", "activity", "test"]
                                    },
                                    "title": { "type": "STRING" },
                                    "content": { "type": "STRING" },
                                    "competency": { "type": "STRING" },
                                    "weight": { "type": "NUMBER" },
                                    "rubric": {
                                        "type": "ARRAY",
                                        "items": {
                                            "type": "OBJECT",
                                            "properties": {
                                                "criterion": { "type": "STRING" },
                                                "points": { "type": "NUMBER" },
                                                "description": { "type": "STRING" }
                                            }
                                        }
                                    },
                                    "testQuestions": {
                                        "type": "ARRAY",
                                        "items": {
                                            "type": "OBJECT",
                                            "properties": {
                                                "question": { "type": "STRING" },
                                                "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                                                "correctAnswerIndex": { "type": "INTEGER" },
                                                "feedback": { "type": "STRING" }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        },
        "required": ["lessons"]
    })
});

// ============================================================================
// Prompt templates
// ============================================================================

pub fn build_skeleton_prompt(prefs: &UserPreferences, image_count: usize) -> String {
    let topic = if prefs.topic.trim().is_empty() {
        "(ver temario adjunto)"
    } else {
        prefs.topic.trim()
    };
    let source_rule = if image_count > 0 {
        format!(
            "4. DETECCIÓN DE TABLA DE CONTENIDO: Se adjuntan {} página(s) del temario oficial. \
             Identifica la lista de unidades y refléjala sin omisiones.",
            image_count
        )
    } else {
        "4. Sin temario adjunto: usa el programa estándar vigente del TecNM para esta materia."
            .to_string()
    };

    format!(
        r#"Actúa como un Auditor de Programas Académicos del TecNM.
Tu misión es TRANSCRIBIR con exactitud absoluta el temario de la materia: "{topic}".

REGLAS DE RIGOR INSTITUCIONAL:
1. UNIDADES INDEPENDIENTES: si el programa define 6 unidades, genera 6 unidades. No combines unidades.
2. ORDEN NUMÉRICO ESTRICTO: sigue la secuencia 1, 2, 3... del temario original.
3. TÍTULOS LITERALES: los nombres de las unidades deben ser idénticos a los del documento.
{source_rule}

CONTEXTO DEL CURSO:
- Nivel: {level}
- Carrera / perfil del alumno: {profile}
- Meta del curso: {goal}
- Tiempo disponible: {time}
- Formato preferido: {format}
- Objetivo institucional: cumplir con la instrumentación didáctica oficial (caracterización,
  intención didáctica, competencia de la asignatura, análisis por unidad, matriz de evaluación
  y calendarización).

Para cada unidad entrega "title" y un "summary" de una o dos oraciones.

SALIDA: JSON puro, sin texto adicional."#,
        topic = topic,
        source_rule = source_rule,
        level = prefs.level,
        profile = or_dash(&prefs.profile),
        goal = or_dash(&prefs.goal),
        time = or_dash(&prefs.time),
        format = prefs.format,
    )
}

pub fn build_unit_content_prompt(unit: &Unit, level: &str) -> String {
    format!(
        r#"Experto en Ingeniería TecNM. Desarrolla el contenido técnico de la unidad: "{title}".
Resumen de la unidad: {summary}

REQUISITOS DE CONTENIDO:
1. Nivel de profundidad: {level}.
2. Genera exactamente 2 lecciones para esta unidad.
3. Cada lección incluye, en este orden, bloques con "type":
   - "theory": explicación técnica exhaustiva.
   - "example": ejercicio resuelto paso a paso.
   - "activity": actividad práctica con "competency" y una "rubric" detallada
     (criterion, points, description).
   - "test": evaluación rápida con "testQuestions" de opción múltiple
     (question, options, correctAnswerIndex, feedback).
4. Cada lección termina con su bloque "test".

No utilices lenguaje genérico. Usa terminología propia de la asignatura.
SALIDA: JSON puro con la forma {{"lessons": [...]}}."#,
        title = unit.title,
        summary = or_dash(&unit.summary),
        level = level,
    )
}

fn or_dash(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "-"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{CourseLevel, CourseFormat};

    #[test]
    fn skeleton_prompt_embeds_preferences() {
        let prefs = UserPreferences {
            topic: "Redes de Computadoras".into(),
            level: CourseLevel::Avanzado,
            profile: "Ingeniería en Sistemas".into(),
            goal: "Configurar una LAN".into(),
            time: "4 horas por semana".into(),
            format: CourseFormat::EsquemasProblemas,
            ..Default::default()
        };
        let prompt = build_skeleton_prompt(&prefs, 0);
        for needle in [
            "Redes de Computadoras",
            "Avanzado",
            "Ingeniería en Sistemas",
            "Configurar una LAN",
            "4 horas por semana",
            "Esquemas + problemas",
            "programa estándar vigente",
        ] {
            assert!(prompt.contains(needle), "missing {needle}");
        }
        assert!(build_skeleton_prompt(&prefs, 3).contains("3 página(s)"));
    }

    #[test]
    fn unit_prompt_asks_for_two_lessons() {
        let unit = Unit {
            id: "u1".into(),
            title: "Modelo OSI".into(),
            summary: String::new(),
            lessons: vec![],
        };
        let prompt = build_unit_content_prompt(&unit, "Intermedio");
        assert!(prompt.contains("\"Modelo OSI\""));
        assert!(prompt.contains("exactamente 2 lecciones"));
        assert!(prompt.contains("{\"lessons\": [...]}"));
    }

    #[test]
    fn schemas_require_top_level_arrays() {
        assert_eq!(SKELETON_RESPONSE_SCHEMA["required"][1], "units");
        assert_eq!(UNIT_CONTENT_RESPONSE_SCHEMA["required"][0], "lessons");
    }
}
