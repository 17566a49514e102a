//! Renderer boundary
//!
//! The engine never touches pixels. Each frame it hands the renderer a
//! [`RenderBatch`]: ordered `{view, position, size, rotation, opacity}`
//! entries in output-local coordinates, plus the damage that prompted the
//! frame. What the renderer does with them (GL, Vulkan, nothing) is its own
//! business.

use log::trace;
use std::cell::RefCell;
use std::rc::Rc;
use wayland_server::protocol::wl_output::Transform;

use crate::output::OutputId;
use crate::view::{Rectangle, View, ViewId};

/// Draw parameters for one view in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct RenderData {
    pub view: ViewId,
    /// Output-local position
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub alpha: f32,
}

impl RenderData {
    /// Render data for `view` relative to an output whose layout origin is `origin`.
    pub fn for_view(view: &View, origin: (i32, i32)) -> Self {
        Self {
            view: view.id,
            x: view.x - origin.0 as f64,
            y: view.y - origin.1 as f64,
            width: view.width as f64,
            height: view.height as f64,
            rotation: view.rotation,
            alpha: view.alpha,
        }
    }
}

/// Everything to draw on one output for one frame, back to front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderBatch {
    /// Background and bottom layer surfaces
    pub layers_below: Vec<RenderData>,
    /// Workspace views (both workspaces while a transition runs)
    pub views: Vec<RenderData>,
    /// Top and overlay layer surfaces
    pub layers_above: Vec<RenderData>,
    /// Set when the frame shows a single fullscreen view
    pub fullscreen: Option<ViewId>,
}

impl RenderBatch {
    pub fn clear(&mut self) {
        self.layers_below.clear();
        self.views.clear();
        self.layers_above.clear();
        self.fullscreen = None;
    }

    pub fn len(&self) -> usize {
        self.layers_below.len() + self.views.len() + self.layers_above.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in draw order
    pub fn iter(&self) -> impl Iterator<Item = &RenderData> {
        self.layers_below
            .iter()
            .chain(self.views.iter())
            .chain(self.layers_above.iter())
    }
}

/// Per-frame output parameters
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInfo {
    pub output: OutputId,
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub scale: f64,
    pub transform: Transform,
    /// Output-local regions that need repainting
    pub damage: Vec<Rectangle>,
}

/// Draws a batch. Called synchronously from the output's frame handler.
#[cfg_attr(test, mockall::automock)]
pub trait Renderer {
    fn render(&mut self, frame: &FrameInfo, batch: &RenderBatch);
}

/// Renderer that only logs what it would draw.
#[derive(Debug, Default)]
pub struct LogRenderer {
    frames: u64,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, frame: &FrameInfo, batch: &RenderBatch) {
        self.frames += 1;
        trace!(
            "🎨 Frame {} on {}: {} entries, {} damage rects",
            self.frames,
            frame.name,
            batch.len(),
            frame.damage.len()
        );
    }
}

/// Renderer that keeps every frame it was given; clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    frames: Rc<RefCell<Vec<(FrameInfo, RenderBatch)>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<(FrameInfo, RenderBatch)> {
        self.frames.borrow().clone()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Most recent batch drawn on `output`
    pub fn last_batch(&self, output: OutputId) -> Option<RenderBatch> {
        self.frames
            .borrow()
            .iter()
            .rev()
            .find(|(f, _)| f.output == output)
            .map(|(_, b)| b.clone())
    }

    pub fn clear(&self) {
        self.frames.borrow_mut().clear();
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, frame: &FrameInfo, batch: &RenderBatch) {
        self.frames.borrow_mut().push((frame.clone(), batch.clone()));
    }
}
