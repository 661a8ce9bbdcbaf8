//! Benchmarks for rule condition matching.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hireflow::core::{Condition, ConditionOperator, FactSet, FactValue};

fn condition_benchmark(c: &mut Criterion) {
    let condition = Condition::number("score", ConditionOperator::Gte, 80.0);
    let facts = FactSet::new()
        .with_fact("score", FactValue::Number(85.0))
        .with_fact("checklist_completo", FactValue::Bool(true))
        .with_fact("dias_na_etapa", FactValue::Number(3.0));

    c.bench_function("condition_match", |b| {
        b.iter(|| black_box(condition.matches(black_box(&facts))))
    });
}

criterion_group!(benches, condition_benchmark);
criterion_main!(benches);
