//! Layer-shell surface manager
//!
//! Layer surfaces (panels, backgrounds, notifications) are anchored to output
//! edges and may reserve an exclusive zone. Each one is backed by a regular
//! [`View`] so rendering and hit-testing treat them like any other surface,
//! but they live here rather than in a workspace.
//!
//! [`arrange_layers`] recomputes an output's usable area and places every
//! layer surface on it. It has to run again whenever a layer surface comes,
//! goes or changes its anchors, size or exclusive zone, and whenever the
//! output's mode or transform changes.

use log::{debug, warn};
use wayland_protocols_wlr::layer_shell::v1::server::zwlr_layer_shell_v1;
use wayland_protocols_wlr::layer_shell::v1::server::zwlr_layer_surface_v1::Anchor;

use crate::backend::{Backend, Handle};
use crate::output::{Output, OutputId};
use crate::view::{Rectangle, View, ViewId, ViewKind};

/// Stacking layer, bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Layer {
    #[default]
    Background,
    Bottom,
    Top,
    Overlay,
}

impl Layer {
    /// All layers in ascending z-order
    pub const ALL: [Layer; 4] = [Layer::Background, Layer::Bottom, Layer::Top, Layer::Overlay];
}

impl From<zwlr_layer_shell_v1::Layer> for Layer {
    fn from(layer: zwlr_layer_shell_v1::Layer) -> Self {
        match u32::from(layer) {
            0 => Layer::Background,
            1 => Layer::Bottom,
            3 => Layer::Overlay,
            _ => Layer::Top,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Margins {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

/// Double-buffered state a client commits on its layer surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerSurfaceState {
    pub layer: Layer,
    /// `zwlr_layer_surface_v1::Anchor` bits
    pub anchor: u32,
    /// Requested size; 0 on an axis means "stretch between the anchored edges"
    pub size: (u32, u32),
    pub margin: Margins,
    /// Pixels reserved from the anchored edge; -1 ignores other zones
    pub exclusive_zone: i32,
}

#[derive(Debug, Clone, Copy)]
struct Anchors {
    top: bool,
    bottom: bool,
    left: bool,
    right: bool,
}

impl Anchors {
    fn from_bits(bits: u32) -> Self {
        Self {
            top: bits & u32::from(Anchor::Top) != 0,
            bottom: bits & u32::from(Anchor::Bottom) != 0,
            left: bits & u32::from(Anchor::Left) != 0,
            right: bits & u32::from(Anchor::Right) != 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayerSurface {
    /// Layer views never join a workspace
    pub view: View,
    pub output: OutputId,
    pub state: LayerSurfaceState,
    /// Output-local box from the last arrangement
    pub geometry: Rectangle,
    /// Whether the client has committed content
    pub mapped: bool,
    configured: Option<(u32, u32)>,
    last_serial: u32,
}

impl LayerSurface {
    pub fn new(id: ViewId, surface: Handle, output: OutputId, layer: Layer, namespace: &str) -> Self {
        let view = View::new(
            id,
            surface,
            ViewKind::Layer {
                namespace: namespace.to_string(),
            },
        );
        Self {
            view,
            output,
            state: LayerSurfaceState {
                layer,
                ..Default::default()
            },
            geometry: Rectangle::default(),
            mapped: false,
            configured: None,
            last_serial: 0,
        }
    }

    pub fn id(&self) -> ViewId {
        self.view.id
    }

    pub fn layer(&self) -> Layer {
        self.state.layer
    }

    pub fn is_visible(&self) -> bool {
        self.mapped && self.view.is_mapped()
    }

    /// Serial of the last configure sent, 0 if none
    pub fn last_serial(&self) -> u32 {
        self.last_serial
    }
}

/// All layer surfaces, in creation order.
#[derive(Debug, Default)]
pub struct LayerShell {
    surfaces: Vec<LayerSurface>,
    next_serial: u32,
}

impl LayerShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, surface: LayerSurface) {
        debug!(
            "🧱 Layer surface {} ({:?}) on {}",
            surface.id(),
            surface.layer(),
            surface.output
        );
        self.surfaces.push(surface);
    }

    /// Idempotent: removing a surface twice returns `None` the second time.
    pub fn remove(&mut self, id: ViewId) -> Option<LayerSurface> {
        let pos = self.surfaces.iter().position(|s| s.id() == id)?;
        Some(self.surfaces.remove(pos))
    }

    pub fn get(&self, id: ViewId) -> Option<&LayerSurface> {
        self.surfaces.iter().find(|s| s.id() == id)
    }

    pub fn get_mut(&mut self, id: ViewId) -> Option<&mut LayerSurface> {
        self.surfaces.iter_mut().find(|s| s.id() == id)
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.get(id).is_some()
    }

    /// Surfaces on `output` in `layer`, back to front.
    pub fn on_output(
        &self,
        output: OutputId,
        layer: Layer,
    ) -> impl DoubleEndedIterator<Item = &LayerSurface> {
        self.surfaces
            .iter()
            .filter(move |s| s.output == output && s.layer() == layer)
    }

    /// Ids of every surface on `output`
    pub fn ids_on_output(&self, output: OutputId) -> Vec<ViewId> {
        self.surfaces
            .iter()
            .filter(|s| s.output == output)
            .map(LayerSurface::id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerSurface> {
        self.surfaces.iter()
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    fn next_serial(&mut self) -> u32 {
        self.next_serial = self.next_serial.wrapping_add(1).max(1);
        self.next_serial
    }
}

/// Place one surface inside `bounds`. Returns `None` if the box would be negative.
fn layer_box(state: &LayerSurfaceState, bounds: Rectangle) -> Option<Rectangle> {
    let anchors = Anchors::from_bits(state.anchor);
    let m = state.margin;
    let (bw, bh) = (bounds.width as i32, bounds.height as i32);
    let (mut w, mut h) = (state.size.0 as i32, state.size.1 as i32);

    let mut x = if w == 0 || (anchors.left && !anchors.right) {
        bounds.x
    } else if anchors.right && !anchors.left {
        bounds.x + (bw - w)
    } else {
        bounds.x + (bw / 2 - w / 2)
    };
    let mut y = if h == 0 || (anchors.top && !anchors.bottom) {
        bounds.y
    } else if anchors.bottom && !anchors.top {
        bounds.y + (bh - h)
    } else {
        bounds.y + (bh / 2 - h / 2)
    };

    if anchors.left && anchors.right && w == 0 {
        x += m.left;
        w = bw - (m.left + m.right);
    } else if anchors.left {
        x += m.left;
    } else if anchors.right {
        x -= m.right;
    }
    if anchors.top && anchors.bottom && h == 0 {
        y += m.top;
        h = bh - (m.top + m.bottom);
    } else if anchors.top {
        y += m.top;
    } else if anchors.bottom {
        y -= m.bottom;
    }

    if w < 0 || h < 0 {
        return None;
    }
    Some(Rectangle::new(x, y, w as u32, h as u32))
}

/// Shrink `usable` by a surface's exclusive zone.
///
/// Only a surface anchored to one edge, or to one edge and both of its
/// neighbours, reserves anything.
fn apply_exclusive(usable: &mut Rectangle, state: &LayerSurfaceState) {
    if state.exclusive_zone <= 0 {
        return;
    }
    let zone = state.exclusive_zone;
    let m = state.margin;
    let a = Anchors::from_bits(state.anchor);
    let only = |top, bottom, left, right| {
        a.top == top && a.bottom == bottom && a.left == left && a.right == right
    };

    let (mut x, mut y) = (usable.x, usable.y);
    let (mut w, mut h) = (usable.width as i32, usable.height as i32);

    if only(true, false, false, false) || only(true, false, true, true) {
        y += zone + m.top;
        h -= zone + m.top;
    } else if only(false, true, false, false) || only(false, true, true, true) {
        h -= zone + m.bottom;
    } else if only(false, false, true, false) || only(true, true, true, false) {
        x += zone + m.left;
        w -= zone + m.left;
    } else if only(false, false, false, true) || only(true, true, false, true) {
        w -= zone + m.right;
    }

    *usable = Rectangle::new(x, y, w.max(0) as u32, h.max(0) as u32);
}

/// Recompute `output.usable_area` and place its layer surfaces.
///
/// Exclusive surfaces are arranged first, in ascending layer order, each one
/// shrinking the usable area seen by the next. Surfaces that have not
/// committed their initial state yet are skipped. Surfaces whose box cannot
/// fit are closed; their ids are returned so the caller can drop them.
pub fn arrange_layers(
    output: &mut Output,
    origin: (i32, i32),
    shell: &mut LayerShell,
    backend: &mut dyn Backend,
) -> Vec<ViewId> {
    let full = output.full_area();
    let mut usable = full;
    let mut closed = Vec::new();

    for exclusive in [true, false] {
        for layer in Layer::ALL {
            for i in 0..shell.surfaces.len() {
                let surface = &shell.surfaces[i];
                if !surface.mapped
                    || surface.output != output.id
                    || surface.layer() != layer
                    || (surface.state.exclusive_zone > 0) != exclusive
                    || closed.contains(&surface.id())
                {
                    continue;
                }

                let state = surface.state;
                let bounds = if state.exclusive_zone == -1 { full } else { usable };
                let Some(geometry) = layer_box(&state, bounds) else {
                    warn!(
                        "Layer surface {} does not fit on {}, closing",
                        surface.id(),
                        output.name
                    );
                    backend.close_layer_surface(surface.view.surface);
                    closed.push(surface.id());
                    continue;
                };
                apply_exclusive(&mut usable, &state);

                let size = (geometry.width, geometry.height);
                let needs_configure = surface.configured != Some(size);
                let serial = if needs_configure { shell.next_serial() } else { 0 };

                let surface = &mut shell.surfaces[i];
                surface.geometry = geometry;
                surface.view.x = (origin.0 + geometry.x) as f64;
                surface.view.y = (origin.1 + geometry.y) as f64;
                surface.view.width = geometry.width;
                surface.view.height = geometry.height;
                if needs_configure {
                    backend.configure_layer_surface(
                        surface.view.surface,
                        serial,
                        geometry.width,
                        geometry.height,
                    );
                    surface.configured = Some(size);
                    surface.last_serial = serial;
                }
            }
        }
    }

    if usable != output.usable_area {
        debug!("{}: usable area {:?}", output.name, usable);
    }
    output.usable_area = usable;
    closed
}
