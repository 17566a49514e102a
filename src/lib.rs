//! # Cloth Desktop Engine
//!
//! The core of a Wayland compositor's desktop: outputs, views, workspaces and
//! layer-shell surfaces, driven by lifecycle events from a windowing backend.
//!
//! ## Architecture
//!
//! - `listener`: typed subscription table routing backend events to handlers
//! - `backend`: the backend boundary (handles, events, requests) and a headless backend
//! - `desktop`: the aggregate root; global binding, output layout, hit-testing
//! - `output`: mode negotiation, damage and the per-frame render pipeline
//! - `view` / `workspace`: client windows and their workspace membership
//! - `layer_shell`: layer surfaces and usable-area arrangement
//! - `renderer`: the draw boundary
//! - `event_loop`: the calloop dispatch loop
//! - `config`: TOML configuration
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cloth::backend::headless::HeadlessBackend;
//! use cloth::renderer::LogRenderer;
//! use cloth::{ClothConfig, Compositor, Desktop};
//!
//! fn main() -> anyhow::Result<()> {
//!     let backend = HeadlessBackend::new();
//!     let desktop = Desktop::new(
//!         ClothConfig::default(),
//!         Box::new(backend.clone()),
//!         Box::new(LogRenderer::new()),
//!     );
//!     let mut compositor = Compositor::new(desktop)?;
//!     compositor.start_headless(&backend, 1)?;
//!     compositor.drive_headless(backend)?;
//!     compositor.run()
//! }
//! ```

pub mod backend;
pub mod config;
pub mod desktop;
pub mod error;
pub mod event_loop;
pub mod layer_shell;
pub mod listener;
pub mod output;
pub mod renderer;
pub mod view;
pub mod workspace;

// Re-export main types for easy access
pub use backend::{Backend, BackendEvent, Handle, Mode};
pub use config::ClothConfig;
pub use desktop::{Desktop, SurfaceHit};
pub use error::{EngineError, EngineResult};
pub use event_loop::{Compositor, DeferredSender, EventSender};
pub use output::{Output, OutputId};
pub use renderer::Renderer;
pub use view::{View, ViewId};
pub use workspace::{Workspace, WorkspaceId};

/// Version information for Cloth
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
