//! Desktop: the aggregate root of the engine
//!
//! The desktop owns every output, view, workspace and layer surface, plus the
//! output layout and the listener table that routes backend events to them.
//! Backend lifecycle notifications arrive through [`Desktop::dispatch`]; each
//! one runs to completion before the next is delivered.
//!
//! Ownership is one-directional. Workspaces and outputs refer to views and
//! workspaces by id, so removing a view or output never leaves a dangling
//! reference behind: destroy handlers detach ids synchronously, and a repeated
//! destroy finds nothing left to do.

use log::{debug, error, info, trace, warn};
use std::collections::HashMap;
use std::rc::Rc;
use wayland_server::protocol::wl_output::Transform;

use crate::backend::{Backend, BackendEvent, Handle, Mode, OutputInfo, Signal, SurfaceRole};
use crate::config::ClothConfig;
use crate::error::{EngineError, EngineResult};
use crate::layer_shell::{arrange_layers, Layer, LayerShell, LayerSurface, LayerSurfaceState};
use crate::listener::{self, HasListeners, ListenerTable};
use crate::output::{Output, OutputId, RenderContext};
use crate::renderer::Renderer;
use crate::view::stack::ViewStack;
use crate::view::{Rectangle, View, ViewId, ViewKind};
use crate::workspace::{Workspace, WorkspaceId};

pub mod globals;
pub mod layout;

use globals::GlobalRegistry;
use layout::OutputLayout;

/// Who registered a subscription; removing the subscriber drops all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscriber {
    Desktop,
    Output(OutputId),
    View(ViewId),
}

/// Result of a successful hit-test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub surface: Handle,
    /// Surface-local coordinates of the query point
    pub local_x: f64,
    pub local_y: f64,
    pub view: ViewId,
}

pub struct Desktop {
    config: Rc<ClothConfig>,
    backend: Box<dyn Backend>,
    renderer: Box<dyn Renderer>,
    globals: GlobalRegistry,

    /// Discovery order
    outputs: Vec<Output>,
    views: HashMap<ViewId, View>,
    /// Z-order of workspace views, back to front
    stack: ViewStack,
    workspaces: Vec<Workspace>,
    layers: LayerShell,
    layout: OutputLayout,

    listeners: ListenerTable<Desktop, BackendEvent, Subscriber>,
    current_workspace: WorkspaceId,
    next_output_id: u64,
    next_view_id: u64,
}

impl HasListeners<BackendEvent> for Desktop {
    type Subscriber = Subscriber;

    fn listeners(&mut self) -> &mut ListenerTable<Self, BackendEvent, Subscriber> {
        &mut self.listeners
    }
}

impl Desktop {
    pub fn new(config: ClothConfig, backend: Box<dyn Backend>, renderer: Box<dyn Renderer>) -> Self {
        let workspaces = (0..config.workspaces.count.max(1))
            .map(|i| Workspace::new(i, config.workspaces.name(i)))
            .collect();

        let mut desktop = Self {
            config: Rc::new(config),
            backend,
            renderer,
            globals: GlobalRegistry::new(),
            outputs: Vec::new(),
            views: HashMap::new(),
            stack: ViewStack::new(),
            workspaces,
            layers: LayerShell::new(),
            layout: OutputLayout::new(),
            listeners: ListenerTable::new(),
            current_workspace: WorkspaceId(0),
            next_output_id: 1,
            next_view_id: 1,
        };
        desktop.subscribe_root();
        desktop
    }

    fn subscribe_root(&mut self) {
        let root = Handle::ROOT;
        let me = Subscriber::Desktop;
        self.listeners.subscribe(root, Signal::Global, me, |d, e| {
            if let BackendEvent::Global {
                name,
                interface,
                version,
            } = e
            {
                d.globals
                    .announce(*name, interface, *version, d.backend.as_mut());
            }
        });
        self.listeners.subscribe(root, Signal::GlobalRemove, me, |d, e| {
            if let BackendEvent::GlobalRemove { name } = e {
                d.globals.remove(*name);
            }
        });
        self.listeners.subscribe(root, Signal::NewOutput, me, |d, e| {
            if let BackendEvent::NewOutput(info) = e {
                d.add_output(info);
            }
        });
        self.listeners.subscribe(root, Signal::NewSurface, me, |d, e| {
            if let BackendEvent::NewSurface { surface, role } = e {
                d.add_view(*surface, role.clone());
            }
        });
        self.listeners.subscribe(root, Signal::NewLayerSurface, me, |d, e| {
            if let BackendEvent::NewLayerSurface {
                surface,
                output,
                layer,
                namespace,
            } = e
            {
                d.add_layer_surface(*surface, *output, *layer, namespace);
            }
        });
    }

    /// Deliver one backend event. Returns how many handlers ran.
    pub fn dispatch(&mut self, event: &BackendEvent) -> usize {
        let delivered = listener::emit(self, event);
        if delivered == 0 {
            trace!("No listener for {:?}", event);
        }
        delivered
    }

    /// Startup check: fails if a required global was never announced.
    pub fn check_required_globals(&self) -> EngineResult<()> {
        self.globals.check_required()
    }

    pub fn config(&self) -> &ClothConfig {
        &self.config
    }

    pub fn globals(&self) -> &GlobalRegistry {
        &self.globals
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.iter().find(|o| o.id == id)
    }

    fn output_index(&self, id: OutputId) -> Option<usize> {
        self.outputs.iter().position(|o| o.id == id)
    }

    /// Look up an output by its backend handle. Absence is normal during teardown.
    pub fn output_from_backend_handle(&self, handle: Handle) -> Option<&Output> {
        self.outputs.iter().find(|o| o.handle == handle)
    }

    pub fn views(&self) -> &HashMap<ViewId, View> {
        &self.views
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    pub fn view_for_surface(&self, surface: Handle) -> Option<&View> {
        self.views
            .values()
            .find(|v| v.surface == surface)
            .or_else(|| self.layers.iter().map(|s| &s.view).find(|v| v.surface == surface))
    }

    /// Workspace views, back to front
    pub fn stacking_order(&self) -> &[ViewId] {
        self.stack.render_order()
    }

    pub fn workspaces(&self) -> &[Workspace] {
        &self.workspaces
    }

    pub fn workspace(&self, id: WorkspaceId) -> Option<&Workspace> {
        self.workspaces.get(id.0)
    }

    /// Workspace new views are placed on
    pub fn current_workspace(&self) -> WorkspaceId {
        self.current_workspace
    }

    pub fn layers(&self) -> &LayerShell {
        &self.layers
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Live subscriptions held by `subscriber`
    pub fn subscription_count(&self, subscriber: Subscriber) -> usize {
        self.listeners.count_for(subscriber)
    }

    fn output_origin(&self, id: OutputId) -> (i32, i32) {
        self.layout
            .output_box(id)
            .map_or((0, 0), |b| (b.x, b.y))
    }

    // Outputs

    fn add_output(&mut self, info: &OutputInfo) {
        if self.output_from_backend_handle(info.handle).is_some() {
            debug!("Output {} already known, ignoring", info.handle);
            return;
        }
        let id = OutputId(self.next_output_id);
        self.next_output_id += 1;
        let mut output = Output::new(id, info, self.current_workspace);

        let me = Subscriber::Output(id);
        self.listeners
            .subscribe(info.handle, Signal::Destroy, me, move |d, _| d.remove_output(id));
        self.listeners.subscribe(info.handle, Signal::Mode, me, move |d, e| {
            if let BackendEvent::OutputMode { mode, .. } = e {
                d.output_mode(id, *mode);
            }
        });
        self.listeners.subscribe(info.handle, Signal::Transform, me, move |d, e| {
            if let BackendEvent::OutputTransform { transform, .. } = e {
                d.output_transform(id, *transform);
            }
        });
        self.listeners
            .subscribe(info.damage, Signal::Frame, me, move |d, _| d.render_output(id));
        self.listeners
            .subscribe(info.damage, Signal::Destroy, me, move |d, _| d.remove_output(id));

        self.configure_output(&mut output);
        info!(
            "🖥️ Output {} ({}) added, showing workspace {}",
            output.name, id, output.workspace().0
        );
        self.outputs.push(output);
        self.arrange_output(id);
    }

    /// Apply per-output config before the first frame.
    fn configure_output(&mut self, output: &mut Output) {
        let config = Rc::clone(&self.config);
        let backend = self.backend.as_mut();

        match config.get_output(&output.name) {
            Some(oc) if oc.enable => {
                if output.is_drm {
                    for mode in &oc.modes {
                        let mode = mode.to_mode();
                        backend.add_drm_mode(output.handle, mode);
                        output.modes.push(mode);
                    }
                } else if !oc.modes.is_empty() {
                    error!("Can only add modes for DRM backend ({})", output.name);
                }

                let mut mode_set = false;
                if oc.mode.is_set() {
                    match output.set_mode(backend, oc.mode.width, oc.mode.height, oc.mode.refresh_rate)
                    {
                        Ok(_) => mode_set = true,
                        Err(e) => error!("{}", e),
                    }
                }
                if !mode_set {
                    apply_current_mode(output, backend);
                }

                backend.set_scale(output.handle, oc.scale);
                output.scale_changed(oc.scale);
                let transform = Transform::from(oc.transform);
                backend.set_transform(output.handle, transform);
                output.transform_changed(transform);

                let area = output.full_area();
                self.layout.add(output.id, oc.x, oc.y, area.width, area.height);
            }
            Some(_) => {
                debug!("Output {} disabled by config", output.name);
                output.set_enabled(backend, false);
            }
            None => {
                apply_current_mode(output, backend);
                let area = output.full_area();
                self.layout.add_auto(output.id, area.width, area.height);
            }
        }
    }

    fn output_mode(&mut self, id: OutputId, mode: Mode) {
        let Some(idx) = self.output_index(id) else {
            return;
        };
        self.outputs[idx].mode_changed(mode);
        let area = self.outputs[idx].full_area();
        self.layout.resize(id, area.width, area.height);
        self.arrange_output(id);
    }

    fn output_transform(&mut self, id: OutputId, transform: Transform) {
        let Some(idx) = self.output_index(id) else {
            return;
        };
        self.outputs[idx].transform_changed(transform);
        let area = self.outputs[idx].full_area();
        self.layout.resize(id, area.width, area.height);
        self.arrange_output(id);
    }

    /// Re-fit the layer surfaces of `id` and repaint it.
    pub fn arrange_output(&mut self, id: OutputId) {
        let Some(idx) = self.output_index(id) else {
            return;
        };
        let origin = self.output_origin(id);
        let output = &mut self.outputs[idx];
        let closed = arrange_layers(output, origin, &mut self.layers, self.backend.as_mut());
        output.damage_whole(self.backend.as_mut());
        for view in closed {
            self.drop_layer_surface(view);
        }
    }

    fn render_output(&mut self, id: OutputId) {
        let Some(idx) = self.output_index(id) else {
            trace!("Frame for removed output {}", id);
            return;
        };
        let origin = self.output_origin(id);
        let Desktop {
            outputs,
            views,
            workspaces,
            layers,
            renderer,
            backend,
            ..
        } = self;
        outputs[idx].render(RenderContext {
            origin,
            views: &*views,
            workspaces: workspaces.as_slice(),
            layers: &*layers,
            renderer: renderer.as_mut(),
            backend: backend.as_mut(),
        });
    }

    /// Forget an output. Safe to call again for an output already gone.
    pub fn remove_output(&mut self, id: OutputId) {
        let Some(idx) = self.output_index(id) else {
            debug!("Output {} already removed", id);
            return;
        };
        let output = self.outputs.remove(idx);
        self.listeners.remove_subscriber(Subscriber::Output(id));
        self.listeners.remove_emitter(output.handle);
        self.listeners.remove_emitter(output.damage_handle);
        self.layout.remove(id);

        for view in self.layers.ids_on_output(id) {
            if let Some(surface) = self.layers.get(view).map(|s| s.view.surface) {
                self.backend.close_layer_surface(surface);
            }
            self.drop_layer_surface(view);
        }
        info!("🖥️ Output {} ({}) removed", output.name, id);
    }

    /// Start animating `output` over to `workspace`.
    pub fn switch_workspace(&mut self, output: OutputId, workspace: WorkspaceId) -> EngineResult<()> {
        if self.workspace(workspace).is_none() {
            return Err(EngineError::UnknownWorkspace(workspace));
        }
        let idx = self
            .output_index(output)
            .ok_or(EngineError::UnknownOutput(output))?;
        self.outputs[idx].switch_workspace(workspace, self.backend.as_mut())?;
        self.current_workspace = workspace;
        info!("🔀 {} switching to workspace {}", output, self.workspaces[workspace.0].name);
        Ok(())
    }

    // Damage

    /// Damage a layout-space region on every output it touches.
    fn damage_region(&mut self, region: Rectangle) {
        if region.is_empty() {
            return;
        }
        for output in &mut self.outputs {
            let Some(area) = self.layout.output_box(output.id) else {
                continue;
            };
            if let Some(hit) = area.intersection(&region) {
                let local = Rectangle::new(hit.x - area.x, hit.y - area.y, hit.width, hit.height);
                output.add_damage(local, self.backend.as_mut());
            }
        }
    }

    fn damage_workspace(&mut self, workspace: WorkspaceId) {
        for output in &mut self.outputs {
            if output.shows(workspace) {
                output.damage_whole(self.backend.as_mut());
            }
        }
    }

    // Views

    fn add_view(&mut self, surface: Handle, role: SurfaceRole) {
        if self.view_for_surface(surface).is_some() {
            debug!("Surface {} already has a view", surface);
            return;
        }
        let id = ViewId(self.next_view_id);
        self.next_view_id += 1;

        let requested = match &role {
            SurfaceRole::Xwayland { x, y, .. } => Some((*x as f64, *y as f64)),
            _ => None,
        };
        let workspace = self.current_workspace;
        let mut view = View::new(id, surface, ViewKind::from(role));
        view.workspace = Some(workspace);
        if let Some((x, y)) = requested {
            view.x = x;
            view.y = y;
            view.positioned = true;
        }
        debug!("🪟 New {} '{}' for surface {}", id, view.kind.title(), surface);

        self.workspaces[workspace.0].add_view(id);
        self.stack.push(id);
        self.views.insert(id, view);

        let me = Subscriber::View(id);
        self.listeners.subscribe(surface, Signal::Commit, me, move |d, e| {
            if let BackendEvent::SurfaceCommit { width, height, .. } = e {
                d.view_commit(id, *width, *height);
            }
        });
        self.listeners.subscribe(surface, Signal::Move, me, move |d, e| {
            if let BackendEvent::SurfaceMove { x, y, .. } = e {
                d.move_view(id, *x as f64, *y as f64);
            }
        });
        self.listeners.subscribe(surface, Signal::Fullscreen, me, move |d, e| {
            if let BackendEvent::SurfaceFullscreen { fullscreen, .. } = e {
                d.set_fullscreen(id, *fullscreen);
            }
        });
        self.listeners
            .subscribe(surface, Signal::Destroy, me, move |d, _| d.destroy_view(id));
    }

    fn view_commit(&mut self, id: ViewId, width: u32, height: u32) {
        let Some(view) = self.views.get(&id) else {
            return;
        };
        let before = view.bounds();
        let first_map = !view.is_mapped() && width > 0 && height > 0;
        let center = if first_map && !view.positioned {
            view.workspace.and_then(|ws| self.center_in_usable_area(ws, width, height))
        } else {
            None
        };

        let Some(view) = self.views.get_mut(&id) else {
            return;
        };
        view.width = width;
        view.height = height;
        if let Some((x, y)) = center {
            view.x = x;
            view.y = y;
        }
        let after = view.bounds();
        if first_map {
            debug!("🪟 {} mapped at {:?}", id, after);
        }
        self.damage_region(before);
        self.damage_region(after);
    }

    /// Position that centers a `width`x`height` box in the usable area of the
    /// output showing `workspace`, or the first output.
    fn center_in_usable_area(&self, workspace: WorkspaceId, width: u32, height: u32) -> Option<(f64, f64)> {
        let output = self
            .outputs
            .iter()
            .find(|o| o.workspace() == workspace)
            .or_else(|| self.first_enabled_output())?;
        let (ox, oy) = self.output_origin(output.id);
        let usable = output.usable_area;
        let x = ox + usable.x + (usable.width as i32 - width as i32) / 2;
        let y = oy + usable.y + (usable.height as i32 - height as i32) / 2;
        Some((x as f64, y as f64))
    }

    pub fn move_view(&mut self, id: ViewId, x: f64, y: f64) {
        let Some(view) = self.views.get_mut(&id) else {
            return;
        };
        let before = view.bounds();
        view.x = x;
        view.y = y;
        view.positioned = true;
        let after = view.bounds();
        self.damage_region(before);
        self.damage_region(after);
    }

    /// Raise a view to the top of the stacking order.
    pub fn raise_view(&mut self, id: ViewId) -> bool {
        let raised = self.stack.raise_to_top(id);
        if raised {
            let Some(view) = self.views.get(&id) else {
                return raised;
            };
            let bounds = view.bounds();
            if let Some(workspace) = view.workspace {
                self.workspaces[workspace.0].raise_view(id);
            }
            self.damage_region(bounds);
        }
        raised
    }

    /// Enter or leave fullscreen on the output showing the view's workspace.
    pub fn set_fullscreen(&mut self, id: ViewId, fullscreen: bool) {
        let Some(workspace) = self.views.get(&id).and_then(|v| v.workspace) else {
            return;
        };

        if fullscreen {
            let target = self
                .outputs
                .iter()
                .find(|o| o.workspace() == workspace)
                .or_else(|| self.first_enabled_output())
                .and_then(|o| self.layout.output_box(o.id));
            if let Some(previous) = self.workspaces[workspace.0].fullscreen_view() {
                if previous != id {
                    self.restore_geometry(previous);
                }
            }
            if let Some(view) = self.views.get_mut(&id) {
                if view.saved.is_none() {
                    view.saved = Some((view.x, view.y));
                }
                if let Some(area) = target {
                    view.x = area.x as f64;
                    view.y = area.y as f64;
                }
            }
            self.workspaces[workspace.0].set_fullscreen(Some(id));
            debug!("{} is fullscreen on workspace {}", id, workspace.0);
        } else {
            if self.workspaces[workspace.0].fullscreen_view() == Some(id) {
                self.workspaces[workspace.0].set_fullscreen(None);
            }
            self.restore_geometry(id);
        }
        self.damage_workspace(workspace);
    }

    fn restore_geometry(&mut self, id: ViewId) {
        if let Some(view) = self.views.get_mut(&id) {
            if let Some((x, y)) = view.saved.take() {
                view.x = x;
                view.y = y;
            }
        }
    }

    /// Detach and drop a view. Safe to call again for a view already gone.
    pub fn destroy_view(&mut self, id: ViewId) {
        let Some(view) = self.views.remove(&id) else {
            debug!("{} already destroyed", id);
            return;
        };
        if let Some(ws) = view.workspace.and_then(|ws| self.workspaces.get_mut(ws.0)) {
            ws.remove_view(id);
        }
        self.stack.remove(id);
        self.listeners.remove_subscriber(Subscriber::View(id));
        self.listeners.remove_emitter(view.surface);
        self.damage_region(view.bounds());
        debug!("🗑️ {} destroyed", id);
    }

    // Layer surfaces

    fn add_layer_surface(&mut self, surface: Handle, output: Option<Handle>, layer: Layer, namespace: &str) {
        let target = match output {
            Some(handle) => self.output_from_backend_handle(handle).map(|o| o.id),
            None => self.first_enabled_output().map(|o| o.id),
        };
        let Some(output) = target else {
            warn!("No output for layer surface '{}', closing it", namespace);
            self.backend.close_layer_surface(surface);
            return;
        };

        let id = ViewId(self.next_view_id);
        self.next_view_id += 1;
        self.layers
            .insert(LayerSurface::new(id, surface, output, layer, namespace));

        let me = Subscriber::View(id);
        self.listeners.subscribe(surface, Signal::Commit, me, move |d, e| {
            if let BackendEvent::LayerSurfaceCommit { state, .. } = e {
                d.layer_commit(id, *state);
            }
        });
        self.listeners
            .subscribe(surface, Signal::Destroy, me, move |d, _| d.destroy_layer_surface(id));

        self.arrange_output(output);
    }

    fn layer_commit(&mut self, id: ViewId, state: LayerSurfaceState) {
        let Some(surface) = self.layers.get_mut(id) else {
            return;
        };
        let changed = surface.state != state || !surface.mapped;
        surface.state = state;
        surface.mapped = true;
        let output = surface.output;
        if changed {
            self.arrange_output(output);
        }
    }

    /// Remove a layer surface and re-fit its output. Idempotent.
    pub fn destroy_layer_surface(&mut self, id: ViewId) {
        let Some(output) = self.layers.get(id).map(|s| s.output) else {
            debug!("Layer surface {} already gone", id);
            return;
        };
        self.drop_layer_surface(id);
        self.arrange_output(output);
    }

    fn drop_layer_surface(&mut self, id: ViewId) {
        if let Some(surface) = self.layers.remove(id) {
            self.listeners.remove_subscriber(Subscriber::View(id));
            self.listeners.remove_emitter(surface.view.surface);
            debug!("🧱 Layer surface {} removed", id);
        }
    }

    // Hit-testing

    fn first_enabled_output(&self) -> Option<&Output> {
        self.outputs.iter().find(|o| o.is_enabled())
    }

    /// Shown as the current workspace of an enabled output. A workspace
    /// sliding out of view does not count.
    fn workspace_active(&self, workspace: WorkspaceId) -> bool {
        self.outputs
            .iter()
            .any(|o| o.is_enabled() && o.workspace() == workspace)
    }

    fn hit_layers(&self, output: Option<OutputId>, layers: [Layer; 2], x: f64, y: f64) -> Option<SurfaceHit> {
        let output = output?;
        for layer in layers {
            for surface in self.layers.on_output(output, layer).rev() {
                if !surface.is_visible() {
                    continue;
                }
                if let Some((local_x, local_y)) = surface.view.hit(x, y) {
                    return Some(SurfaceHit {
                        surface: surface.view.surface,
                        local_x,
                        local_y,
                        view: surface.id(),
                    });
                }
            }
        }
        None
    }

    /// Top-most surface under a layout-space point.
    ///
    /// Overlay and top layer surfaces come first, then workspace views from
    /// the top of the stack down, then bottom and background layers. Views
    /// hidden behind a fullscreen view and views of workspaces no output is
    /// showing are skipped.
    ///
    /// During a workspace slide only the incoming workspace is hit, at its
    /// resting positions rather than where the current frame draws it.
    pub fn surface_at(&self, x: f64, y: f64) -> Option<SurfaceHit> {
        let output = self.layout.output_at(x, y);
        if let Some(hit) = self.hit_layers(output, [Layer::Overlay, Layer::Top], x, y) {
            return Some(hit);
        }

        for id in self.stack.iter_top_down() {
            let Some(view) = self.views.get(&id) else {
                continue;
            };
            let Some(workspace) = view.workspace else {
                continue;
            };
            if !self.workspace_active(workspace) {
                continue;
            }
            let hidden = self.workspaces[workspace.0]
                .fullscreen_view()
                .map_or(false, |fs| fs != id);
            if hidden {
                continue;
            }
            if let Some((local_x, local_y)) = view.hit(x, y) {
                return Some(SurfaceHit {
                    surface: view.surface,
                    local_x,
                    local_y,
                    view: id,
                });
            }
        }

        self.hit_layers(output, [Layer::Bottom, Layer::Background], x, y)
    }
}

/// Tell the backend to use the mode the output already settled on.
fn apply_current_mode(output: &Output, backend: &mut dyn Backend) {
    if let Some(mode) = output.mode {
        backend.set_mode(output.handle, mode);
    }
}
