mod common;

use serde_json::Value;

use common::sample_course;
use profesoria_lib::classroom_export::{
    classroom_payload, export_file_name, render_classroom, write_classroom, TEMPLATE_VERSION,
};
use profesoria_lib::course::{AuthorizedStudent, Grade, GradeType, LessonBlock, TextBlock};

/// The JSON literal assigned to `COURSE_DATA`, unescaped.
fn embedded_course(html: &str) -> Value {
    let start = html.find("const COURSE_DATA = ").unwrap() + "const COURSE_DATA = ".len();
    let end = start + html[start..].find(";\n").unwrap();
    serde_json::from_str(&html[start..end]).unwrap()
}

#[test]
fn embedded_json_matches_the_payload() {
    let mut course = sample_course("Programación");
    course.student_list.push(AuthorizedStudent {
        id: "21010001".to_string(),
        name: "Ana López".to_string(),
        pin: "4821".to_string(),
    });
    course.grades.push(Grade {
        lesson_id: "lesson_pilas".to_string(),
        grade_type: GradeType::Practice,
        score: 80.0,
        max_score: 100.0,
        feedback: None,
        date: 0,
    });

    let html = render_classroom(&course).unwrap();
    let embedded = embedded_course(&html);
    assert_eq!(embedded, classroom_payload(&course).unwrap());

    assert!(embedded.get("grades").is_none());
    assert_eq!(embedded["studentList"][0]["id"], "21010001");
    assert!(embedded["studentList"][0].get("pin").is_none());
    assert!(!html.contains("4821"));
    assert!(html.contains(TEMPLATE_VERSION));
}

#[test]
fn hostile_title_is_escaped() {
    let mut course = sample_course("</script><script>alert(1)</script>");
    course.units[0].lessons[0].title = "a </script> b".to_string();
    let html = render_classroom(&course).unwrap();

    assert_eq!(html.matches("</script>").count(), 1);
    assert!(html.contains("&lt;/script&gt;&lt;script&gt;alert(1)&lt;/script&gt;"));
    let embedded = embedded_course(&html);
    assert_eq!(embedded["title"], "</script><script>alert(1)</script>");
    assert_eq!(embedded["units"][0]["lessons"][0]["title"], "a </script> b");
}

#[test]
fn comment_opener_in_content_cannot_swallow_the_script() {
    let mut course = sample_course("Comentarios HTML");
    course.units[0].lessons[0].blocks.push(LessonBlock::Example(TextBlock {
        title: "Ejemplo".to_string(),
        content: "<!--<script>".to_string(),
    }));
    let html = render_classroom(&course).unwrap();

    assert!(!html.contains("<!--<script>"));
    assert_eq!(html.matches("</script>").count(), 1);
    let embedded = embedded_course(&html);
    assert_eq!(embedded["units"][0]["lessons"][0]["blocks"][2]["content"], "<!--<script>");
}

#[test]
fn file_name_replaces_whitespace() {
    let course = sample_course("Estructuras de  Datos\tI");
    assert_eq!(export_file_name(&course), "Aula_Estructuras_de_Datos_I.html");
}

#[test]
fn bundle_is_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let course = sample_course("Redes I");
    let path = write_classroom(&course, &dir.path().join("aulas")).unwrap();
    assert!(path.ends_with("Aula_Redes_I.html"));
    let html = std::fs::read_to_string(path).unwrap();
    assert_eq!(embedded_course(&html)["title"], "Redes I");
}
