// benches/benchmarks.rs — Performance benchmarks (criterion)
//
// Hot paths of one controller iteration that do not involve the oracle:
//   1. Source denylist scan over generated code
//   2. Decision parsing from noisy oracle replies
//   3. Memory store read-modify-write cycle

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use skillforge::core::decision::parse_decision;
use skillforge::memory::{Failure, MemoryStore};
use skillforge::security::SafetyEnforcer;
use skillforge::util::strip_code_fences;

// ─── Helpers ────────────────────────────────────────────────────────────────

/// A plausible generated program of roughly `lines` lines.
fn build_program(lines: usize) -> String {
    let mut src = String::from("import sys\nimport json\n\n");
    for i in 0..lines {
        src.push_str(&format!(
            "def step_{i}(values):\n    return [v * {i} for v in values if v % 3 != {m}]\n\n",
            m = i % 3
        ));
    }
    src.push_str("if __name__ == '__main__':\n    print(json.dumps(step_1([1, 2, 3])))\n");
    src
}

// ─── Benchmarks ─────────────────────────────────────────────────────────────

fn bench_safety(c: &mut Criterion) {
    let safety = SafetyEnforcer::new(&[]).expect("default patterns compile");
    let small = build_program(10);
    let large = build_program(500);
    let denied = format!("{}\nos.system('ls')\n", build_program(200));

    let mut group = c.benchmark_group("check_source");

    group.bench_function("clean_small", |b| {
        b.iter(|| black_box(safety.check_source(black_box(&small))))
    });

    group.bench_function("clean_large", |b| {
        b.iter(|| black_box(safety.check_source(black_box(&large))))
    });

    group.bench_function("denied_at_end", |b| {
        b.iter(|| black_box(safety.check_source(black_box(&denied))))
    });

    group.finish();
}

fn bench_decisions(c: &mut Criterion) {
    let clean = r#"{"action": "tool", "tool": "execute", "params": {"path": "skills/adder.py"}}"#;
    let noisy = format!(
        "Let me think about this. The code was persisted, so the next step is to run it.\n\n```json\n{}\n```\nThat should tell us whether {{it}} works.",
        clean
    );
    let fenced_code = format!("```python\n{}```", build_program(50));

    let mut group = c.benchmark_group("oracle_replies");

    group.bench_function("parse_decision_clean", |b| {
        b.iter(|| black_box(parse_decision(black_box(clean))))
    });

    group.bench_function("parse_decision_noisy", |b| {
        b.iter(|| black_box(parse_decision(black_box(&noisy))))
    });

    group.bench_function("strip_code_fences", |b| {
        b.iter(|| black_box(strip_code_fences(black_box(&fenced_code))))
    });

    group.finish();
}

fn bench_memory(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = MemoryStore::open(dir.path().join("memory.json")).expect("open store");
    for i in 0..200 {
        store
            .append_failure(Failure::new(
                format!("skill_{}", i % 10),
                "Traceback: NameError",
                "print(x)",
            ))
            .expect("seed failure");
    }

    let mut group = c.benchmark_group("memory");
    group.sample_size(30);

    group.bench_function("read_200_failures", |b| {
        b.iter(|| black_box(store.read().expect("read")))
    });

    group.bench_function("relevant_failures", |b| {
        b.iter(|| black_box(store.relevant_failures("skill_3", 5).expect("query")))
    });

    group.bench_function("append_failure", |b| {
        b.iter(|| {
            store
                .append_failure(Failure::new("bench", "exit code 1", ""))
                .expect("append")
        })
    });

    group.finish();
}

criterion_group!(benches, bench_safety, bench_decisions, bench_memory);
criterion_main!(benches);
