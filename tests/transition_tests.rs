//! Workspace transition tests
//!
//! Drive a desktop through the headless backend and check the render batches
//! the renderer receives while an output pages between workspaces.

use anyhow::Result;
use cloth::backend::headless::HeadlessBackend;
use cloth::backend::{BackendEvent, Handle, SurfaceRole};
use cloth::event_loop::pump_headless;
use cloth::renderer::{RecordingRenderer, RenderBatch, RenderData};
use cloth::{ClothConfig, Desktop, EngineError, OutputId, ViewId, WorkspaceId};

struct Setup {
    desktop: Desktop,
    backend: HeadlessBackend,
    renderer: RecordingRenderer,
    output: OutputId,
}

fn setup() -> Setup {
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
    desktop.dispatch(&backend.new_output("HEADLESS-1", 1000, 800, 60_000));
    pump_headless(&backend, &mut desktop);
    let output = desktop.outputs()[0].id;
    Setup {
        desktop,
        backend,
        renderer,
        output,
    }
}

impl Setup {
    fn map_view(&mut self, x: i32, y: i32) -> (ViewId, Handle) {
        let surface = self.backend.alloc_handle();
        for event in [
            BackendEvent::NewSurface {
                surface,
                role: SurfaceRole::WlShell {
                    title: "legacy".into(),
                },
            },
            BackendEvent::SurfaceCommit {
                surface,
                width: 100,
                height: 100,
            },
            BackendEvent::SurfaceMove { surface, x, y },
        ] {
            self.desktop.dispatch(&event);
        }
        let id = self
            .desktop
            .view_for_surface(surface)
            .map(|v| v.id)
            .expect("view mapped");
        (id, surface)
    }

    fn frame(&mut self) -> Option<RenderBatch> {
        pump_headless(&self.backend, &mut self.desktop);
        self.renderer.last_batch(self.output)
    }

    fn settle(&mut self) {
        while self
            .desktop
            .output(self.output)
            .map_or(false, |o| o.in_transition())
        {
            self.frame();
        }
        self.frame();
    }
}

fn entry(batch: &RenderBatch, view: ViewId) -> &RenderData {
    batch
        .views
        .iter()
        .find(|d| d.view == view)
        .expect("view in batch")
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn test_switch_to_lower_index_slides_right() -> Result<()> {
    let mut s = setup();
    let (first, _) = s.map_view(100, 100);
    s.desktop.switch_workspace(s.output, WorkspaceId(2))?;
    s.settle();
    let (third, _) = s.map_view(200, 100);

    s.desktop.switch_workspace(s.output, WorkspaceId(0))?;
    s.frame();
    s.frame();
    let batch = s.frame().expect("third frame");

    let prev = entry(&batch, third);
    assert!(approx(prev.x, 200.0 + 300.0), "prev x = {}", prev.x);
    assert!((prev.alpha - 0.7).abs() < 1e-4);

    let new = entry(&batch, first);
    assert!(approx(new.x, 100.0 - 700.0), "new x = {}", new.x);
    assert!((new.alpha - 0.3).abs() < 1e-4);
    assert_eq!(batch.views.len(), 2);
    Ok(())
}

#[test]
fn test_completed_transition_shows_only_new_workspace() -> Result<()> {
    let mut s = setup();
    let (first, _) = s.map_view(100, 100);
    s.desktop.switch_workspace(s.output, WorkspaceId(1))?;

    let mut frames = 0;
    let mut last = None;
    while s.desktop.output(s.output).map_or(false, |o| o.in_transition()) {
        last = s.frame();
        frames += 1;
        let output = s.desktop.output(s.output).expect("output");
        assert!((0.0..=1.0).contains(&output.ws_alpha()));
        assert!(output.prev_workspace().is_none() || output.ws_alpha() < 1.0);
    }
    assert_eq!(frames, 10);
    let last = last.expect("final frame");
    assert!(last.views.iter().all(|d| d.view != first));

    // Back to the first workspace, then let it finish
    s.desktop.switch_workspace(s.output, WorkspaceId(0))?;
    s.settle();
    let batch = s.renderer.last_batch(s.output).expect("batch");
    let data = entry(&batch, first);
    assert!(approx(data.x, 100.0));
    assert_eq!(data.alpha, 1.0);
    Ok(())
}

#[test]
fn test_overlapping_switch_rejected_until_done() -> Result<()> {
    let mut s = setup();
    s.desktop.switch_workspace(s.output, WorkspaceId(1))?;
    s.frame();

    assert_eq!(
        s.desktop.switch_workspace(s.output, WorkspaceId(2)),
        Err(EngineError::TransitionInFlight(s.output))
    );
    assert_eq!(s.desktop.output(s.output).map(|o| o.workspace()), Some(WorkspaceId(1)));

    s.settle();
    s.desktop.switch_workspace(s.output, WorkspaceId(2))?;
    assert_eq!(
        s.desktop.output(s.output).and_then(|o| o.prev_workspace()),
        Some(WorkspaceId(1))
    );
    Ok(())
}

#[test]
fn test_fullscreen_frame_has_only_that_view() -> Result<()> {
    let mut s = setup();
    let (video, surface) = s.map_view(300, 300);
    s.map_view(0, 0);
    s.settle();

    s.desktop.dispatch(&BackendEvent::SurfaceFullscreen {
        surface,
        fullscreen: true,
    });
    let batch = s.frame().expect("frame");
    assert_eq!(batch.fullscreen, Some(video));
    assert_eq!(batch.views.len(), 1);
    assert_eq!((batch.views[0].x, batch.views[0].y), (0.0, 0.0));

    // A transition away from a fullscreen workspace still blends both sides
    s.desktop.switch_workspace(s.output, WorkspaceId(1))?;
    let batch = s.frame().expect("frame");
    assert_eq!(batch.fullscreen, None);
    assert_eq!(batch.views.len(), 1);
    assert!((batch.views[0].alpha - 0.9).abs() < 1e-4);
    Ok(())
}

#[test]
fn test_destroyed_view_never_rendered() -> Result<()> {
    let mut s = setup();
    let (gone, surface) = s.map_view(0, 0);
    let (kept, _) = s.map_view(500, 0);
    s.settle();

    s.desktop.dispatch(&BackendEvent::SurfaceDestroy { surface });
    let batch = s.frame().expect("frame after destroy");
    assert!(batch.views.iter().all(|d| d.view != gone));
    assert!(batch.views.iter().any(|d| d.view == kept));
    Ok(())
}
