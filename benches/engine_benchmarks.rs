//! Performance benchmarks for the Cloth engine
//!
//! Frame building and hit-testing run on every frame and every pointer
//! motion, so they are the paths worth guarding against regressions.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use cloth::backend::headless::HeadlessBackend;
use cloth::backend::{BackendEvent, SurfaceRole};
use cloth::event_loop::pump_headless;
use cloth::renderer::RecordingRenderer;
use cloth::{ClothConfig, Desktop, OutputId, WorkspaceId};

/// A desktop with one 1920x1080 output and `count` mapped views
fn desktop_with_views(count: usize) -> (Desktop, HeadlessBackend, RecordingRenderer) {
    let backend = HeadlessBackend::new();
    let renderer = RecordingRenderer::new();
    let mut desktop = Desktop::new(
        ClothConfig::default(),
        Box::new(backend.clone()),
        Box::new(renderer.clone()),
    );
    for event in backend.announce_globals() {
        desktop.dispatch(&event);
    }
    desktop.dispatch(&backend.new_output("HEADLESS-1", 1920, 1080, 60_000));

    for i in 0..count {
        let surface = backend.alloc_handle();
        desktop.dispatch(&BackendEvent::NewSurface {
            surface,
            role: SurfaceRole::XdgToplevel {
                title: format!("window {}", i),
                app_id: "bench".into(),
            },
        });
        desktop.dispatch(&BackendEvent::SurfaceCommit {
            surface,
            width: 300,
            height: 200,
        });
        desktop.dispatch(&BackendEvent::SurfaceMove {
            surface,
            x: (i as i32 * 37) % 1600,
            y: (i as i32 * 23) % 880,
        });
    }
    pump_headless(&backend, &mut desktop);
    renderer.clear();
    (desktop, backend, renderer)
}

/// Benchmark building frames while a workspace transition runs
fn bench_render_transition(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");

    for view_count in [10, 100, 500].iter() {
        group.bench_function(format!("transition_{}_views", view_count), |b| {
            b.iter_batched(
                || {
                    let (mut desktop, backend, renderer) = desktop_with_views(*view_count);
                    desktop
                        .switch_workspace(OutputId(1), WorkspaceId(1))
                        .expect("switch");
                    (desktop, backend, renderer)
                },
                |(mut desktop, backend, renderer)| {
                    for _ in 0..10 {
                        black_box(pump_headless(&backend, &mut desktop));
                    }
                    renderer.clear();
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark hit-testing against a stack of overlapping views
fn bench_surface_at(c: &mut Criterion) {
    let mut group = c.benchmark_group("surface_at");

    for view_count in [10, 100, 500].iter() {
        let (desktop, _backend, _renderer) = desktop_with_views(*view_count);
        group.bench_function(format!("{}_views", view_count), |b| {
            b.iter(|| {
                black_box(desktop.surface_at(black_box(960.0), black_box(540.0)));
                black_box(desktop.surface_at(black_box(1919.0), black_box(1079.0)));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_render_transition, bench_surface_at);
criterion_main!(benches);
