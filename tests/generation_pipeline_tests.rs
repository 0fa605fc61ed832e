//! Course generation against a scripted model: timeouts, retries, failure
//! policies and input validation.

mod common;

use assert_matches::assert_matches;
use std::sync::Arc;
use std::time::Duration;

use common::{lessons_json, sample_course, sample_unit, skeleton_json, ScriptedModel, Step};
use profesoria_lib::config::UnitFailurePolicy;
use profesoria_lib::course::{CourseLevel, LessonBlock, UserPreferences};
use profesoria_lib::course_generation::normalizer::PLACEHOLDER_LESSON_TITLE;
use profesoria_lib::course_generation::{CourseGenerator, GenerationSettings, UnitBuild};
use profesoria_lib::{AppError, AppErrorType};

fn settings(policy: UnitFailurePolicy) -> GenerationSettings {
    GenerationSettings {
        skeleton_timeout: Duration::from_secs(120),
        unit_timeout: Duration::from_secs(90),
        unit_max_retries: 1,
        unit_failure_policy: policy,
        retry_delay: Duration::from_millis(500),
    }
}

fn generator(model: &Arc<ScriptedModel>, policy: UnitFailurePolicy) -> CourseGenerator {
    CourseGenerator::new(model.clone(), settings(policy))
}

fn prefs(topic: &str) -> UserPreferences {
    UserPreferences {
        topic: topic.to_string(),
        level: CourseLevel::Intermedio,
        student_list_raw: "21010001 Ana López\n21010002 Luis Pérez".to_string(),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn unit_recovers_after_one_timeout() {
    let model = Arc::new(ScriptedModel::new(vec![
        Step::Hang,
        Step::Reply(lessons_json().to_string()),
    ]));
    let build = generator(&model, UnitFailurePolicy::Placeholder)
        .generate_unit_content(&sample_unit("Pilas y colas"), "Licenciatura")
        .await
        .unwrap();

    assert_eq!(model.calls(), 2);
    assert_matches!(&build, UnitBuild::Generated(lessons) if lessons.len() == 1);
    let lesson = &build.lessons()[0];
    assert!(lesson.id.starts_with("lesson_"));
    assert_matches!(&lesson.blocks[1], LessonBlock::Activity(a) if a.weight == 90.0);
    assert_matches!(&lesson.blocks[2], LessonBlock::Test(t) if t.weight == 10.0);
}

#[tokio::test(start_paused = true)]
async fn unit_falls_back_to_placeholder_after_two_timeouts() {
    let model = Arc::new(ScriptedModel::new(vec![Step::Hang, Step::Hang]));
    let build = generator(&model, UnitFailurePolicy::Placeholder)
        .generate_unit_content(&sample_unit("Pilas y colas"), "Licenciatura")
        .await
        .unwrap();

    assert_eq!(model.calls(), 2);
    assert!(build.is_placeholder());
    assert_eq!(build.lessons().len(), 1);
    assert_eq!(build.lessons()[0].title, PLACEHOLDER_LESSON_TITLE);
}

#[tokio::test(start_paused = true)]
async fn error_policy_leaves_the_unit_untouched() {
    let model = Arc::new(ScriptedModel::new(vec![Step::Hang, Step::Hang]));
    let mut course = sample_course("Estructuras");
    let before = course.units[1].clone();

    let err = generator(&model, UnitFailurePolicy::Error)
        .build_unit(&mut course, 1, "Licenciatura")
        .await
        .unwrap_err();

    assert_eq!(err.error_type, AppErrorType::Timeout);
    assert_eq!(course.units[1], before);
    assert!(!course.units[1].is_built());
}

#[tokio::test]
async fn build_unit_replaces_lessons_wholesale() {
    let model = Arc::new(ScriptedModel::replying(&lessons_json()));
    let mut course = sample_course("Estructuras");
    let old_lesson_id = course.units[0].lessons[0].id.clone();

    generator(&model, UnitFailurePolicy::Placeholder)
        .build_unit(&mut course, 0, "Licenciatura")
        .await
        .unwrap();

    assert_eq!(course.units[0].lessons.len(), 1);
    assert_ne!(course.units[0].lessons[0].id, old_lesson_id);
}

#[tokio::test]
async fn missing_unit_is_not_found() {
    let model = Arc::new(ScriptedModel::new(vec![]));
    let mut course = sample_course("Estructuras");
    let err = generator(&model, UnitFailurePolicy::Placeholder)
        .build_unit(&mut course, 7, "Licenciatura")
        .await
        .unwrap_err();
    assert_eq!(err.error_type, AppErrorType::NotFound);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn configuration_errors_are_not_retried() {
    let model = Arc::new(ScriptedModel::new(vec![
        Step::Fail(AppError::configuration("API_KEY no detectada.")),
        Step::Reply(lessons_json().to_string()),
    ]));
    let err = generator(&model, UnitFailurePolicy::Placeholder)
        .generate_unit_content(&sample_unit("Pilas"), "Licenciatura")
        .await
        .unwrap_err();

    assert_eq!(err.error_type, AppErrorType::Configuration);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn malformed_answer_is_retried() {
    let model = Arc::new(ScriptedModel::new(vec![
        Step::Reply("lo siento, no puedo".to_string()),
        Step::Reply(format!("```json\n{}\n```", lessons_json())),
    ]));
    let build = generator(&model, UnitFailurePolicy::Error)
        .generate_unit_content(&sample_unit("Pilas"), "Licenciatura")
        .await
        .unwrap();
    assert!(!build.is_placeholder());
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn empty_topic_without_pages_makes_no_call() {
    let model = Arc::new(ScriptedModel::new(vec![]));
    let err = generator(&model, UnitFailurePolicy::Placeholder)
        .generate_course_skeleton(&prefs("   "))
        .await
        .unwrap_err();

    assert_eq!(err.error_type, AppErrorType::Validation);
    assert_eq!(err.message, "Introduce un tema o carga el temario.");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn skeleton_from_topic_only() {
    let model = Arc::new(ScriptedModel::replying(&skeleton_json()));
    let course = generator(&model, UnitFailurePolicy::Placeholder)
        .generate_course_skeleton(&prefs("Estructuras de datos"))
        .await
        .unwrap();

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].images.is_empty());
    assert!(requests[0].response_schema.is_some());

    let course = course.value;
    assert!(course.id.starts_with("course_"));
    assert_eq!(course.units.len(), 2);
    assert!(course.units.iter().all(|u| !u.is_built()));
    assert_eq!(course.units[1].summary, "Contenido pendiente.");
    assert_eq!(course.student_list.len(), 2);
    assert!(course
        .student_list
        .iter()
        .all(|s| s.pin.len() == 4 && s.pin.chars().all(|c| c.is_ascii_digit())));
}

#[tokio::test]
async fn syllabus_pages_are_sent_as_inline_images() {
    let model = Arc::new(ScriptedModel::replying(&skeleton_json()));
    let mut p = prefs("");
    p.syllabus_images = vec![
        "data:image/png;base64,aGVsbG8=".to_string(),
        "aGVsbG8=".to_string(),
    ];
    generator(&model, UnitFailurePolicy::Placeholder)
        .generate_course_skeleton(&p)
        .await
        .unwrap();

    let images = &model.requests()[0].images;
    assert_eq!(images.len(), 2);
    assert_eq!(images[0].mime_type, "image/png");
    assert_eq!(images[1].mime_type, "image/jpeg");
}

#[tokio::test(start_paused = true)]
async fn skeleton_is_attempted_once() {
    let model = Arc::new(ScriptedModel::new(vec![
        Step::Hang,
        Step::Reply(skeleton_json().to_string()),
    ]));
    let err = generator(&model, UnitFailurePolicy::Placeholder)
        .generate_course_skeleton(&prefs("Redes"))
        .await
        .unwrap_err();

    assert_eq!(model.calls(), 1);
    assert_eq!(err.error_type, AppErrorType::Timeout);
    assert!(err.message.starts_with("Error generando temario: "));
}
