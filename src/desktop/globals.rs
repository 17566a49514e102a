//! Protocol global binding
//!
//! The backend announces globals by (name, interface, version). The engine
//! binds at most one instance of each interface it knows, at the lower of its
//! own and the advertised version. Repeated announcements of an interface that
//! is already bound are ignored.

use log::{debug, info};
use std::collections::HashMap;
use wayland_protocols::xdg::shell::server::xdg_wm_base::XdgWmBase;
use wayland_protocols_wlr::layer_shell::v1::server::zwlr_layer_shell_v1::ZwlrLayerShellV1;
use wayland_protocols_wlr::output_management::v1::server::zwlr_output_manager_v1::ZwlrOutputManagerV1;
use wayland_server::protocol::{wl_compositor::WlCompositor, wl_seat::WlSeat, wl_shell::WlShell};
use wayland_server::Resource;

use crate::backend::Backend;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalKind {
    Compositor,
    XdgShell,
    WlShell,
    LayerShell,
    OutputManager,
    Seat,
}

#[derive(Debug, Clone, Copy)]
pub struct GlobalSpec {
    pub kind: GlobalKind,
    /// Highest version this engine implements
    pub version: u32,
    /// Startup fails without it
    pub required: bool,
}

impl GlobalSpec {
    pub fn interface(&self) -> &'static str {
        match self.kind {
            GlobalKind::Compositor => WlCompositor::interface().name,
            GlobalKind::XdgShell => XdgWmBase::interface().name,
            GlobalKind::WlShell => WlShell::interface().name,
            GlobalKind::LayerShell => ZwlrLayerShellV1::interface().name,
            GlobalKind::OutputManager => ZwlrOutputManagerV1::interface().name,
            GlobalKind::Seat => WlSeat::interface().name,
        }
    }
}

pub const KNOWN_GLOBALS: [GlobalSpec; 6] = [
    GlobalSpec {
        kind: GlobalKind::Compositor,
        version: 4,
        required: true,
    },
    GlobalSpec {
        kind: GlobalKind::XdgShell,
        version: 3,
        required: false,
    },
    GlobalSpec {
        kind: GlobalKind::WlShell,
        version: 1,
        required: false,
    },
    GlobalSpec {
        kind: GlobalKind::LayerShell,
        version: 4,
        required: true,
    },
    GlobalSpec {
        kind: GlobalKind::OutputManager,
        version: 4,
        required: false,
    },
    GlobalSpec {
        kind: GlobalKind::Seat,
        version: 7,
        required: true,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundGlobal {
    pub name: u32,
    pub version: u32,
}

/// Tracks which globals have been bound.
#[derive(Debug, Default)]
pub struct GlobalRegistry {
    bound: HashMap<GlobalKind, BoundGlobal>,
}

impl GlobalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a global announcement. Returns the kind if it was bound now.
    pub fn announce(
        &mut self,
        name: u32,
        interface: &str,
        version: u32,
        backend: &mut dyn Backend,
    ) -> Option<GlobalKind> {
        let Some(spec) = KNOWN_GLOBALS.iter().find(|g| g.interface() == interface) else {
            debug!("Ignoring unknown global {} ({} v{})", name, interface, version);
            return None;
        };
        if let Some(existing) = self.bound.get(&spec.kind) {
            debug!(
                "Global {} already bound as name {}, ignoring name {}",
                interface, existing.name, name
            );
            return None;
        }

        let version = spec.version.min(version);
        backend.bind_global(name, interface, version);
        self.bound.insert(spec.kind, BoundGlobal { name, version });
        info!("🔗 Bound {} v{}", interface, version);
        Some(spec.kind)
    }

    /// Forget a global the backend withdrew.
    pub fn remove(&mut self, name: u32) -> Option<GlobalKind> {
        let kind = self
            .bound
            .iter()
            .find(|(_, b)| b.name == name)
            .map(|(kind, _)| *kind)?;
        self.bound.remove(&kind);
        debug!("Global {:?} (name {}) removed", kind, name);
        Some(kind)
    }

    pub fn get(&self, kind: GlobalKind) -> Option<BoundGlobal> {
        self.bound.get(&kind).copied()
    }

    pub fn is_bound(&self, kind: GlobalKind) -> bool {
        self.bound.contains_key(&kind)
    }

    /// Fails with the first required global that is still missing.
    pub fn check_required(&self) -> EngineResult<()> {
        for spec in KNOWN_GLOBALS.iter().filter(|g| g.required) {
            if !self.is_bound(spec.kind) {
                return Err(EngineError::MissingGlobal(spec.interface()));
            }
        }
        Ok(())
    }
}
