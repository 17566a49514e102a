//! Outputs: physical display sinks
//!
//! An output negotiates its display mode, accumulates damage, and renders the
//! workspace it shows. While a workspace switch is animating it also renders
//! the previous workspace, sliding and fading the two against each other.
//!
//! Outputs hold workspaces by id only; the desktop owns both.

use log::{debug, trace};
use std::collections::HashMap;
use std::fmt;
use wayland_server::protocol::wl_output::Transform;

use crate::backend::{Backend, Handle, Mode, OutputInfo};
use crate::error::{EngineError, EngineResult};
use crate::layer_shell::{Layer, LayerShell};
use crate::renderer::{FrameInfo, RenderBatch, RenderData, Renderer};
use crate::view::{Rectangle, View, ViewId};
use crate::workspace::{Workspace, WorkspaceId};

pub mod damage;

use damage::Damage;

/// Blend advance per rendered frame during a workspace switch
pub const TRANSITION_STEP: f64 = 0.1;

// Ten float steps of 0.1 land just under 1.0.
const ALPHA_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputId(pub u64);

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output-{}", self.0)
    }
}

/// Only enabled outputs render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Disabled,
    Enabled,
}

/// Outcome of matching a configured mode against what a sink advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChoice {
    /// Nothing advertised; ask for a custom mode
    Custom,
    Advertised(Mode),
    /// No advertised mode has the requested size
    Unavailable,
}

/// Pick the advertised mode for `width`x`height`@`refresh_mhz`.
///
/// An exact refresh match wins; otherwise the last size match is taken.
pub fn negotiate_mode(advertised: &[Mode], width: i32, height: i32, refresh_mhz: i32) -> ModeChoice {
    if advertised.is_empty() {
        return ModeChoice::Custom;
    }
    let mut best = None;
    for mode in advertised
        .iter()
        .filter(|m| m.width == width && m.height == height)
    {
        best = Some(*mode);
        if mode.refresh_mhz == refresh_mhz {
            break;
        }
    }
    best.map_or(ModeChoice::Unavailable, ModeChoice::Advertised)
}

/// Size of a `width`x`height` buffer after applying `transform`.
pub fn transformed_size(width: i32, height: i32, transform: Transform) -> (i32, i32) {
    if matches!(
        transform,
        Transform::_90 | Transform::_270 | Transform::Flipped90 | Transform::Flipped270
    ) {
        (height, width)
    } else {
        (width, height)
    }
}

/// Mode an output starts with: the preferred one, else the last advertised.
pub fn initial_mode(modes: &[Mode]) -> Option<Mode> {
    modes
        .iter()
        .find(|m| m.preferred)
        .or_else(|| modes.last())
        .copied()
}

/// Borrowed engine state a frame is built from.
pub struct RenderContext<'a> {
    /// Layout position of the output
    pub origin: (i32, i32),
    pub views: &'a HashMap<ViewId, View>,
    pub workspaces: &'a [Workspace],
    pub layers: &'a LayerShell,
    pub renderer: &'a mut dyn Renderer,
    pub backend: &'a mut dyn Backend,
}

#[derive(Debug)]
pub struct Output {
    pub id: OutputId,
    pub handle: Handle,
    /// Damage tracker handle; its destruction removes the output too
    pub damage_handle: Handle,
    pub name: String,
    pub make: String,
    pub model: String,
    pub serial: String,
    pub is_drm: bool,

    /// Advertised modes plus any custom DRM modes installed from config
    pub modes: Vec<Mode>,
    pub mode: Option<Mode>,
    pub scale: f64,
    pub transform: Transform,
    pub state: OutputState,
    /// Output-local area left after exclusive layer zones
    pub usable_area: Rectangle,

    workspace: WorkspaceId,
    prev_workspace: Option<WorkspaceId>,
    ws_alpha: f64,

    damage: Damage,
    frame_pending: bool,
    batch: RenderBatch,
}

impl Output {
    pub fn new(id: OutputId, info: &OutputInfo, workspace: WorkspaceId) -> Self {
        let mode = initial_mode(&info.modes);
        let mut output = Self {
            id,
            handle: info.handle,
            damage_handle: info.damage,
            name: info.name.clone(),
            make: info.make.clone(),
            model: info.model.clone(),
            serial: info.serial.clone(),
            is_drm: info.is_drm,
            modes: info.modes.clone(),
            mode,
            scale: 1.0,
            transform: Transform::Normal,
            state: OutputState::Enabled,
            usable_area: Rectangle::default(),
            workspace,
            prev_workspace: None,
            ws_alpha: 1.0,
            damage: Damage::new(0, 0),
            frame_pending: false,
            batch: RenderBatch::default(),
        };
        output.resize_to_mode();
        debug!(
            "Output '{}' added: '{} {} {}' {}mm x {}mm",
            output.name, info.make, info.model, info.serial, info.phys_width_mm, info.phys_height_mm
        );
        output
    }

    pub fn is_enabled(&self) -> bool {
        self.state == OutputState::Enabled
    }

    pub fn workspace(&self) -> WorkspaceId {
        self.workspace
    }

    pub fn prev_workspace(&self) -> Option<WorkspaceId> {
        self.prev_workspace
    }

    pub fn ws_alpha(&self) -> f64 {
        self.ws_alpha
    }

    pub fn in_transition(&self) -> bool {
        self.prev_workspace.is_some() || self.ws_alpha < 1.0
    }

    /// Whether `workspace` contributes to this output's frames.
    pub fn shows(&self, workspace: WorkspaceId) -> bool {
        self.workspace == workspace || self.prev_workspace == Some(workspace)
    }

    /// Logical size: the current mode, transformed, divided by scale.
    pub fn effective_size(&self) -> (i32, i32) {
        let Some(mode) = self.mode else {
            return (0, 0);
        };
        let (w, h) = transformed_size(mode.width, mode.height, self.transform);
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        ((w as f64 / scale).round() as i32, (h as f64 / scale).round() as i32)
    }

    /// Output-local rectangle covering the whole output
    pub fn full_area(&self) -> Rectangle {
        let (w, h) = self.effective_size();
        Rectangle::new(0, 0, w.max(0) as u32, h.max(0) as u32)
    }

    fn resize_to_mode(&mut self) {
        let area = self.full_area();
        self.damage.resize(area.width, area.height);
        self.usable_area = area;
    }

    /// Record a mode the backend reports as applied.
    pub fn mode_changed(&mut self, mode: Mode) {
        debug!("{}: mode is now {}", self.name, mode);
        self.mode = Some(mode);
        self.resize_to_mode();
    }

    pub fn transform_changed(&mut self, transform: Transform) {
        debug!("{}: transform is now {:?}", self.name, transform);
        self.transform = transform;
        self.resize_to_mode();
    }

    pub fn scale_changed(&mut self, scale: f64) {
        self.scale = scale;
        self.resize_to_mode();
    }

    /// Apply a configured mode.
    ///
    /// Fails with [`EngineError::ModeUnavailable`] when no advertised mode has
    /// the requested size; the output then keeps its current mode.
    pub fn set_mode(
        &mut self,
        backend: &mut dyn Backend,
        width: i32,
        height: i32,
        refresh_hz: f64,
    ) -> EngineResult<Mode> {
        let mhz = (refresh_hz * 1000.0).round() as i32;
        match negotiate_mode(&self.modes, width, height, mhz) {
            ModeChoice::Custom => {
                debug!("{} advertises no modes, trying a custom one", self.name);
                backend.set_custom_mode(self.handle, width, height, mhz);
                let mode = Mode::new(width, height, mhz);
                self.mode_changed(mode);
                Ok(mode)
            }
            ModeChoice::Advertised(mode) => {
                debug!("Assigning configured mode {} to {}", mode, self.name);
                backend.set_mode(self.handle, mode);
                self.mode_changed(mode);
                Ok(mode)
            }
            ModeChoice::Unavailable => Err(EngineError::ModeUnavailable {
                output: self.name.clone(),
                width,
                height,
            }),
        }
    }

    pub fn set_enabled(&mut self, backend: &mut dyn Backend, enabled: bool) {
        backend.enable_output(self.handle, enabled);
        self.state = if enabled {
            OutputState::Enabled
        } else {
            OutputState::Disabled
        };
    }

    /// Start sliding from the shown workspace to `target`.
    ///
    /// Rejected while a previous switch is still animating.
    pub fn switch_workspace(
        &mut self,
        target: WorkspaceId,
        backend: &mut dyn Backend,
    ) -> EngineResult<()> {
        if target == self.workspace {
            return Err(EngineError::AlreadyActive(target));
        }
        if self.in_transition() {
            return Err(EngineError::TransitionInFlight(self.id));
        }
        debug!(
            "{}: switching workspace {} -> {}",
            self.name, self.workspace.0, target.0
        );
        self.prev_workspace = Some(self.workspace);
        self.workspace = target;
        self.ws_alpha = 0.0;
        self.damage_whole(backend);
        Ok(())
    }

    /// Point the output at `workspace` without animating.
    pub fn show_workspace(&mut self, workspace: WorkspaceId) {
        self.workspace = workspace;
        self.prev_workspace = None;
        self.ws_alpha = 1.0;
    }

    pub fn add_damage(&mut self, region: Rectangle, backend: &mut dyn Backend) {
        self.damage.add(region);
        self.schedule_frame(backend);
    }

    pub fn damage_whole(&mut self, backend: &mut dyn Backend) {
        self.damage.add_whole();
        self.schedule_frame(backend);
    }

    pub fn has_damage(&self) -> bool {
        !self.damage.is_empty()
    }

    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    fn schedule_frame(&mut self, backend: &mut dyn Backend) {
        if self.is_enabled() && !self.frame_pending && !self.damage.is_empty() {
            backend.schedule_frame(self.handle);
            self.frame_pending = true;
        }
    }

    /// Batch built by the most recent frame
    pub fn last_batch(&self) -> &RenderBatch {
        &self.batch
    }

    /// Build and draw one frame.
    pub fn render(&mut self, ctx: RenderContext<'_>) {
        self.frame_pending = false;
        if !self.is_enabled() {
            return;
        }

        let RenderContext {
            origin,
            views,
            workspaces,
            layers,
            renderer,
            backend,
        } = ctx;
        let (width, height) = self.effective_size();
        self.batch.clear();

        let current = workspaces.get(self.workspace.0);
        let fullscreen = current.and_then(|ws| ws.fullscreen_view());
        let settled = self.prev_workspace.map_or(true, |p| p == self.workspace);

        if let (true, Some(fs)) = (settled, fullscreen) {
            if let Some(view) = views.get(&fs) {
                self.batch.views.push(RenderData::for_view(view, origin));
            }
            self.batch.fullscreen = Some(fs);
            self.batch
                .layers_above
                .extend(layer_data(layers, self.id, Layer::Overlay, origin));
        } else {
            self.ws_alpha = (self.ws_alpha + TRANSITION_STEP).min(1.0);
            if self.ws_alpha >= 1.0 - ALPHA_EPSILON {
                self.ws_alpha = 1.0;
            }
            let alpha = self.ws_alpha;

            let previous = self.prev_workspace.and_then(|p| workspaces.get(p.0));
            let sign = match (current, previous) {
                (Some(cur), Some(prev)) if cur.index < prev.index => -1.0,
                _ => 1.0,
            };

            if let Some(prev) = previous {
                let prev_alpha = 1.0 - alpha;
                if prev_alpha > 0.0 {
                    let dx = -(width as f64 * alpha) * sign;
                    self.push_workspace(prev, views, origin, prev_alpha, dx);
                }
            }

            if alpha >= 1.0 {
                self.prev_workspace = None;
            }

            if let Some(cur) = current {
                if alpha > 0.0 {
                    let dx = width as f64 * (1.0 - alpha) * sign;
                    self.push_workspace(cur, views, origin, alpha, dx);
                }
            }

            for layer in [Layer::Background, Layer::Bottom] {
                self.batch
                    .layers_below
                    .extend(layer_data(layers, self.id, layer, origin));
            }
            for layer in [Layer::Top, Layer::Overlay] {
                self.batch
                    .layers_above
                    .extend(layer_data(layers, self.id, layer, origin));
            }
        }

        let frame = FrameInfo {
            output: self.id,
            name: self.name.clone(),
            width,
            height,
            scale: self.scale,
            transform: self.transform,
            damage: self.damage.take(),
        };
        trace!(
            "{}: rendering {} entries at ws_alpha {:.2}",
            self.name,
            self.batch.len(),
            self.ws_alpha
        );
        renderer.render(&frame, &self.batch);

        if self.ws_alpha < 1.0 {
            self.damage_whole(backend);
        }
    }

    fn push_workspace(
        &mut self,
        workspace: &Workspace,
        views: &HashMap<ViewId, View>,
        origin: (i32, i32),
        opacity: f64,
        dx: f64,
    ) {
        for id in workspace.visible_views() {
            let Some(view) = views.get(&id).filter(|v| v.is_mapped()) else {
                continue;
            };
            let mut data = RenderData::for_view(view, origin);
            data.alpha = (data.alpha as f64 * opacity) as f32;
            data.x += dx;
            self.batch.views.push(data);
        }
    }
}

fn layer_data(
    layers: &LayerShell,
    output: OutputId,
    layer: Layer,
    origin: (i32, i32),
) -> impl Iterator<Item = RenderData> + '_ {
    layers
        .on_output(output, layer)
        .filter(|s| s.is_visible())
        .map(move |s| RenderData::for_view(&s.view, origin))
}
