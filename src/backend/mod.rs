//! Windowing backend boundary
//!
//! The engine never talks to display hardware or client connections directly.
//! A backend announces protocol globals, physical outputs and client surfaces
//! as [`BackendEvent`]s, and carries out the engine's requests through the
//! [`Backend`] trait. Backend objects are identified by opaque [`Handle`]s;
//! the engine holds handles, never the objects themselves.

use std::fmt;
use wayland_server::protocol::wl_output::Transform;

use crate::layer_shell::{Layer, LayerSurfaceState};
use crate::listener;

pub mod headless;

/// Opaque identity of a backend object (output, damage tracker, surface).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(pub u64);

impl Handle {
    /// Emitter of global announcements and new-object notifications.
    pub const ROOT: Handle = Handle(0);
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A display mode advertised by (or requested from) an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    pub width: i32,
    pub height: i32,
    /// Refresh rate in millihertz
    pub refresh_mhz: i32,
    /// Whether the sink reports this as its preferred mode
    pub preferred: bool,
}

impl Mode {
    pub fn new(width: i32, height: i32, refresh_mhz: i32) -> Self {
        Self {
            width,
            height,
            refresh_mhz,
            preferred: false,
        }
    }

    pub fn preferred(mut self) -> Self {
        self.preferred = true;
        self
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}@{:.3}",
            self.width,
            self.height,
            self.refresh_mhz as f64 / 1000.0
        )
    }
}

/// Everything the backend reports about a newly attached sink.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputInfo {
    pub handle: Handle,
    /// Handle of the damage tracker attached to this output
    pub damage: Handle,
    pub name: String,
    pub make: String,
    pub model: String,
    pub serial: String,
    pub phys_width_mm: i32,
    pub phys_height_mm: i32,
    pub modes: Vec<Mode>,
    /// DRM connectors accept custom modes; other backends don't
    pub is_drm: bool,
}

/// Which surface grammar produced a client surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceRole {
    XdgToplevel { title: String, app_id: String },
    WlShell { title: String },
    Xwayland {
        title: String,
        x: i32,
        y: i32,
        override_redirect: bool,
    },
}

/// Notifications delivered by the backend, one at a time, on the dispatch loop.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Global {
        name: u32,
        interface: String,
        version: u32,
    },
    GlobalRemove {
        name: u32,
    },
    NewOutput(OutputInfo),
    OutputMode {
        output: Handle,
        mode: Mode,
    },
    OutputTransform {
        output: Handle,
        transform: Transform,
    },
    OutputDestroy {
        output: Handle,
    },
    DamageFrame {
        damage: Handle,
    },
    DamageDestroy {
        damage: Handle,
    },
    NewSurface {
        surface: Handle,
        role: SurfaceRole,
    },
    NewLayerSurface {
        surface: Handle,
        output: Option<Handle>,
        layer: Layer,
        namespace: String,
    },
    SurfaceCommit {
        surface: Handle,
        width: u32,
        height: u32,
    },
    SurfaceMove {
        surface: Handle,
        x: i32,
        y: i32,
    },
    SurfaceFullscreen {
        surface: Handle,
        fullscreen: bool,
    },
    LayerSurfaceCommit {
        surface: Handle,
        state: LayerSurfaceState,
    },
    SurfaceDestroy {
        surface: Handle,
    },
}

/// Event discriminant used to route [`BackendEvent`]s through the listener table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Global,
    GlobalRemove,
    NewOutput,
    NewSurface,
    NewLayerSurface,
    Mode,
    Transform,
    Frame,
    Commit,
    Move,
    Fullscreen,
    Destroy,
}

impl listener::Event for BackendEvent {
    type Emitter = Handle;
    type Signal = Signal;

    fn emitter(&self) -> Handle {
        match self {
            BackendEvent::Global { .. }
            | BackendEvent::GlobalRemove { .. }
            | BackendEvent::NewOutput(_)
            | BackendEvent::NewSurface { .. }
            | BackendEvent::NewLayerSurface { .. } => Handle::ROOT,
            BackendEvent::OutputMode { output, .. }
            | BackendEvent::OutputTransform { output, .. }
            | BackendEvent::OutputDestroy { output } => *output,
            BackendEvent::DamageFrame { damage } | BackendEvent::DamageDestroy { damage } => {
                *damage
            }
            BackendEvent::SurfaceCommit { surface, .. }
            | BackendEvent::SurfaceMove { surface, .. }
            | BackendEvent::SurfaceFullscreen { surface, .. }
            | BackendEvent::LayerSurfaceCommit { surface, .. }
            | BackendEvent::SurfaceDestroy { surface } => *surface,
        }
    }

    fn signal(&self) -> Signal {
        match self {
            BackendEvent::Global { .. } => Signal::Global,
            BackendEvent::GlobalRemove { .. } => Signal::GlobalRemove,
            BackendEvent::NewOutput(_) => Signal::NewOutput,
            BackendEvent::NewSurface { .. } => Signal::NewSurface,
            BackendEvent::NewLayerSurface { .. } => Signal::NewLayerSurface,
            BackendEvent::OutputMode { .. } => Signal::Mode,
            BackendEvent::OutputTransform { .. } => Signal::Transform,
            BackendEvent::DamageFrame { .. } => Signal::Frame,
            BackendEvent::SurfaceCommit { .. } | BackendEvent::LayerSurfaceCommit { .. } => {
                Signal::Commit
            }
            BackendEvent::SurfaceMove { .. } => Signal::Move,
            BackendEvent::SurfaceFullscreen { .. } => Signal::Fullscreen,
            BackendEvent::OutputDestroy { .. }
            | BackendEvent::DamageDestroy { .. }
            | BackendEvent::SurfaceDestroy { .. } => Signal::Destroy,
        }
    }
}

/// Requests the engine makes of the backend.
///
/// Implementations must not call back into the engine synchronously; any
/// resulting state change comes back later as a [`BackendEvent`].
pub trait Backend {
    /// Bind the global `name` advertised as `interface` at `version`.
    fn bind_global(&mut self, name: u32, interface: &str, version: u32);

    fn set_mode(&mut self, output: Handle, mode: Mode);

    /// Ask for a mode the sink did not advertise.
    fn set_custom_mode(&mut self, output: Handle, width: i32, height: i32, refresh_mhz: i32);

    /// Install a custom mode on a DRM connector.
    fn add_drm_mode(&mut self, output: Handle, mode: Mode);

    fn enable_output(&mut self, output: Handle, enabled: bool);

    fn set_scale(&mut self, output: Handle, scale: f64);

    fn set_transform(&mut self, output: Handle, transform: Transform);

    /// Request a `DamageFrame` event for the output's damage tracker.
    fn schedule_frame(&mut self, output: Handle);

    fn configure_layer_surface(&mut self, surface: Handle, serial: u32, width: u32, height: u32);

    /// Send the `closed` event to a layer surface.
    fn close_layer_surface(&mut self, surface: Handle);
}
