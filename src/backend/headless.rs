//! In-process headless backend
//!
//! Announces the usual globals and a set of virtual outputs, records every
//! request the engine makes, and turns scheduled frames into `DamageFrame`
//! events when the event loop asks for them. Used by the binary when no real
//! display is available, and by tests to observe engine requests.

use log::debug;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use wayland_server::protocol::wl_output::Transform;

use super::{Backend, BackendEvent, Handle, Mode, OutputInfo};
use crate::desktop::globals::KNOWN_GLOBALS;

/// A request recorded by the headless backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendRequest {
    BindGlobal {
        name: u32,
        interface: String,
        version: u32,
    },
    SetMode {
        output: Handle,
        mode: Mode,
    },
    SetCustomMode {
        output: Handle,
        width: i32,
        height: i32,
        refresh_mhz: i32,
    },
    AddDrmMode {
        output: Handle,
        mode: Mode,
    },
    EnableOutput {
        output: Handle,
        enabled: bool,
    },
    SetScale {
        output: Handle,
        scale: f64,
    },
    SetTransform {
        output: Handle,
        transform: Transform,
    },
    ScheduleFrame {
        output: Handle,
    },
    ConfigureLayerSurface {
        surface: Handle,
        serial: u32,
        width: u32,
        height: u32,
    },
    CloseLayerSurface {
        surface: Handle,
    },
}

#[derive(Debug, Default)]
struct HeadlessState {
    next_handle: u64,
    requests: Vec<BackendRequest>,
    /// (output, damage) pairs for outputs this backend created
    outputs: Vec<(Handle, Handle)>,
    scheduled: Vec<Handle>,
    pending: VecDeque<BackendEvent>,
}

impl HeadlessState {
    fn alloc(&mut self) -> Handle {
        self.next_handle += 1;
        Handle(self.next_handle)
    }
}

/// Cloneable handle to a headless backend; clones share state.
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh backend object handle.
    pub fn alloc_handle(&self) -> Handle {
        self.state.borrow_mut().alloc()
    }

    /// Global announcements for every interface the engine knows about.
    pub fn announce_globals(&self) -> Vec<BackendEvent> {
        KNOWN_GLOBALS
            .iter()
            .enumerate()
            .map(|(i, global)| BackendEvent::Global {
                name: i as u32 + 1,
                interface: global.interface().to_string(),
                version: global.version,
            })
            .collect()
    }

    /// Create a virtual output advertising a single preferred mode.
    pub fn new_output(&self, name: &str, width: i32, height: i32, refresh_mhz: i32) -> BackendEvent {
        self.new_output_with_modes(name, vec![Mode::new(width, height, refresh_mhz).preferred()])
    }

    pub fn new_output_with_modes(&self, name: &str, modes: Vec<Mode>) -> BackendEvent {
        let mut state = self.state.borrow_mut();
        let handle = state.alloc();
        let damage = state.alloc();
        state.outputs.push((handle, damage));
        debug!("headless: created output {} ({})", name, handle);
        BackendEvent::NewOutput(OutputInfo {
            handle,
            damage,
            name: name.to_string(),
            make: "Cloth".to_string(),
            model: "Headless".to_string(),
            serial: format!("{}", handle.0),
            phys_width_mm: 0,
            phys_height_mm: 0,
            modes,
            is_drm: false,
        })
    }

    /// Damage handle belonging to `output`, if this backend created it.
    pub fn damage_of(&self, output: Handle) -> Option<Handle> {
        self.state
            .borrow()
            .outputs
            .iter()
            .find(|(o, _)| *o == output)
            .map(|(_, d)| *d)
    }

    /// Drain scheduled frames into `DamageFrame` events.
    pub fn frame_events(&self) -> Vec<BackendEvent> {
        let mut state = self.state.borrow_mut();
        let scheduled = std::mem::take(&mut state.scheduled);
        scheduled
            .into_iter()
            .filter_map(|output| {
                state
                    .outputs
                    .iter()
                    .find(|(o, _)| *o == output)
                    .map(|(_, damage)| BackendEvent::DamageFrame { damage: *damage })
            })
            .collect()
    }

    /// Drain events produced in response to engine requests (mode and
    /// transform changes).
    pub fn take_events(&self) -> Vec<BackendEvent> {
        self.state.borrow_mut().pending.drain(..).collect()
    }

    pub fn requests(&self) -> Vec<BackendRequest> {
        self.state.borrow().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.state.borrow_mut().requests.clear();
    }

    pub fn has_scheduled_frames(&self) -> bool {
        !self.state.borrow().scheduled.is_empty()
    }

    fn record(&self, request: BackendRequest) {
        self.state.borrow_mut().requests.push(request);
    }
}

impl Backend for HeadlessBackend {
    fn bind_global(&mut self, name: u32, interface: &str, version: u32) {
        self.record(BackendRequest::BindGlobal {
            name,
            interface: interface.to_string(),
            version,
        });
    }

    fn set_mode(&mut self, output: Handle, mode: Mode) {
        self.record(BackendRequest::SetMode { output, mode });
        self.state
            .borrow_mut()
            .pending
            .push_back(BackendEvent::OutputMode { output, mode });
    }

    fn set_custom_mode(&mut self, output: Handle, width: i32, height: i32, refresh_mhz: i32) {
        self.record(BackendRequest::SetCustomMode {
            output,
            width,
            height,
            refresh_mhz,
        });
        self.state.borrow_mut().pending.push_back(BackendEvent::OutputMode {
            output,
            mode: Mode::new(width, height, refresh_mhz),
        });
    }

    fn add_drm_mode(&mut self, output: Handle, mode: Mode) {
        self.record(BackendRequest::AddDrmMode { output, mode });
    }

    fn enable_output(&mut self, output: Handle, enabled: bool) {
        self.record(BackendRequest::EnableOutput { output, enabled });
    }

    fn set_scale(&mut self, output: Handle, scale: f64) {
        self.record(BackendRequest::SetScale { output, scale });
    }

    fn set_transform(&mut self, output: Handle, transform: Transform) {
        self.record(BackendRequest::SetTransform { output, transform });
        self.state
            .borrow_mut()
            .pending
            .push_back(BackendEvent::OutputTransform { output, transform });
    }

    fn schedule_frame(&mut self, output: Handle) {
        self.record(BackendRequest::ScheduleFrame { output });
        let mut state = self.state.borrow_mut();
        if !state.scheduled.contains(&output) {
            state.scheduled.push(output);
        }
    }

    fn configure_layer_surface(&mut self, surface: Handle, serial: u32, width: u32, height: u32) {
        self.record(BackendRequest::ConfigureLayerSurface {
            surface,
            serial,
            width,
            height,
        });
    }

    fn close_layer_surface(&mut self, surface: Handle) {
        self.record(BackendRequest::CloseLayerSurface { surface });
    }
}
