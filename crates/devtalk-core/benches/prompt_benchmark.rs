//! Prompt Assembly Benchmarks
//!
//! Measures performance of the per-submit hot path:
//! - Windowing and prompt building
//! - Response sanitization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use devtalk_core::{Session, SessionConfig, Turn, build_prompt, sanitize_response};

fn session_with_turns(count: usize) -> Session {
    let mut session = Session::from_config(&SessionConfig::default());
    for i in 0..count {
        if i % 2 == 0 {
            session.push_turn(Turn::user(format!("Question number {} about Rust lifetimes?", i)));
        } else {
            session.push_turn(Turn::assistant(format!(
                "Answer number {}: borrow checker details, explained plainly.",
                i
            )));
        }
    }
    session
}

/// Benchmark prompt building over growing histories
fn bench_build_prompt(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_prompt");

    for history_len in [0usize, 6, 100, 1000] {
        let session = session_with_turns(history_len);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("window_6", history_len),
            &session,
            |b, session| {
                b.iter(|| {
                    let prompt = build_prompt(session.persona(), session.last_turns(6));
                    black_box(prompt)
                })
            },
        );
    }

    group.finish();
}

/// Benchmark sanitization of raw model output
fn bench_sanitize(c: &mut Criterion) {
    let mut group = c.benchmark_group("sanitize_response");

    let clean = "A plain answer without any template tags. ".repeat(20);
    let tagged = format!("<|assistant|>\n{}<|end|>\n<|user|>\n", clean);

    group.bench_function("clean", |b| b.iter(|| black_box(sanitize_response(&clean))));
    group.bench_function("tagged", |b| b.iter(|| black_box(sanitize_response(&tagged))));

    group.finish();
}

criterion_group!(benches, bench_build_prompt, bench_sanitize);
criterion_main!(benches);
