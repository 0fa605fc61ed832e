//! Recovery and normalization benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use profesoria_lib::course_generation::normalizer::normalize_lessons;
use profesoria_lib::json_recovery::recover_json;
use serde_json::json;

fn unit_answer(lessons: usize) -> String {
    let lesson = json!({
        "title": "Listas enlazadas",
        "blocks": [
            { "type": "theory", "title": "Nodos", "content": "Cada nodo guarda `next`." },
            {
                "type": "activity",
                "title": "Inserta al final",
                "content": "Implementa `push_back`.",
                "rubric": [{ "criterion": "Correctitud", "points": 70 }, { "criterion": "Pruebas", "points": 30 }]
            },
            {
                "type": "test",
                "title": "Repaso",
                "content": "",
                "testQuestions": [{ "question": "¿Costo de insertar?", "options": ["O(1)", "O(n)"], "correctAnswerIndex": 1 }]
            }
        ]
    });
    json!({ "lessons": vec![lesson; lessons] }).to_string()
}

fn benchmark_recovery(c: &mut Criterion) {
    let clean = unit_answer(6);
    let fenced = format!("Aquí está el contenido:\n```json\n{}\n```", clean);
    let trailing = clean.replace("}]", "},]");

    c.bench_function("recover_clean_json", |b| {
        b.iter(|| black_box(recover_json(black_box(&clean))))
    });

    c.bench_function("recover_fenced_json", |b| {
        b.iter(|| black_box(recover_json(black_box(&fenced))))
    });

    c.bench_function("recover_trailing_commas", |b| {
        b.iter(|| black_box(recover_json(black_box(&trailing))))
    });

    c.bench_function("recover_garbage", |b| {
        b.iter(|| black_box(recover_json(black_box("lo siento, no puedo ayudar con eso"))))
    });
}

fn benchmark_normalization(c: &mut Criterion) {
    let raw = recover_json(&unit_answer(12)).unwrap_or_default();

    c.bench_function("normalize_unit_lessons", |b| {
        b.iter(|| black_box(normalize_lessons(black_box(&raw))))
    });
}

criterion_group!(benches, benchmark_recovery, benchmark_normalization);
criterion_main!(benches);
