//! Views: the engine's single abstraction over compositable surfaces
//!
//! A view is created for every client surface regardless of the protocol
//! grammar that produced it (xdg toplevel, legacy wl_shell, xwayland, or a
//! layer-shell surface). Views carry only what composition needs: position,
//! size, rotation, opacity and the workspace they belong to.

use std::fmt;

use crate::backend::{Handle, SurfaceRole};
use crate::workspace::WorkspaceId;

pub mod stack;

/// Stable identity of a view, unchanged across mode or transform changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(pub u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

/// Axis-aligned rectangle in integer pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x as f64 && x < self.right() as f64 && y >= self.y as f64 && y < self.bottom() as f64
    }

    /// Two rectangles intersect if they share any pixels.
    pub fn intersects(&self, other: &Rectangle) -> bool {
        !(self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }

    pub fn intersection(&self, other: &Rectangle) -> Option<Rectangle> {
        if !self.intersects(other) {
            return None;
        }
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        Some(Rectangle::new(x1, y1, (x2 - x1) as u32, (y2 - y1) as u32))
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.right().max(other.right());
        let y2 = self.bottom().max(other.bottom());
        Rectangle::new(x1, y1, (x2 - x1) as u32, (y2 - y1) as u32)
    }

    pub fn contains_rect(&self, other: &Rectangle) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Which protocol produced the view. Closed set; one variant per grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewKind {
    XdgToplevel { title: String, app_id: String },
    WlShell { title: String },
    Xwayland { title: String, override_redirect: bool },
    Layer { namespace: String },
}

impl ViewKind {
    pub fn title(&self) -> &str {
        match self {
            ViewKind::XdgToplevel { title, .. }
            | ViewKind::WlShell { title }
            | ViewKind::Xwayland { title, .. } => title,
            ViewKind::Layer { namespace } => namespace,
        }
    }
}

impl From<SurfaceRole> for ViewKind {
    fn from(role: SurfaceRole) -> Self {
        match role {
            SurfaceRole::XdgToplevel { title, app_id } => ViewKind::XdgToplevel { title, app_id },
            SurfaceRole::WlShell { title } => ViewKind::WlShell { title },
            SurfaceRole::Xwayland {
                title,
                override_redirect,
                ..
            } => ViewKind::Xwayland {
                title,
                override_redirect,
            },
        }
    }
}

/// One compositable surface
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub id: ViewId,
    /// Backing surface
    pub surface: Handle,
    pub kind: ViewKind,

    /// Layout-space position
    pub x: f64,
    pub y: f64,
    pub width: u32,
    pub height: u32,
    /// Rotation in radians around the view center
    pub rotation: f64,
    /// Opacity (0.0 - 1.0)
    pub alpha: f32,

    /// Owning workspace; `None` only for layer-shell views
    pub workspace: Option<WorkspaceId>,
    /// Whether the client asked for a specific position
    pub positioned: bool,
    /// Geometry to restore when leaving fullscreen
    pub saved: Option<(f64, f64)>,
}

impl View {
    pub fn new(id: ViewId, surface: Handle, kind: ViewKind) -> Self {
        Self {
            id,
            surface,
            kind,
            x: 0.0,
            y: 0.0,
            width: 0,
            height: 0,
            rotation: 0.0,
            alpha: 1.0,
            workspace: None,
            positioned: false,
            saved: None,
        }
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(self.x as i32, self.y as i32, self.width, self.height)
    }

    pub fn is_mapped(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Map a layout-space point into surface-local coordinates, undoing the
    /// view's rotation around its center.
    pub fn to_local(&self, lx: f64, ly: f64) -> (f64, f64) {
        let mut sx = lx - self.x;
        let mut sy = ly - self.y;
        if self.rotation != 0.0 {
            let cx = self.width as f64 / 2.0;
            let cy = self.height as f64 / 2.0;
            let (sin, cos) = (-self.rotation).sin_cos();
            let (dx, dy) = (sx - cx, sy - cy);
            sx = dx * cos - dy * sin + cx;
            sy = dx * sin + dy * cos + cy;
        }
        (sx, sy)
    }

    /// Hit-test a layout-space point. Returns surface-local coordinates on a hit.
    pub fn hit(&self, lx: f64, ly: f64) -> Option<(f64, f64)> {
        if !self.is_mapped() {
            return None;
        }
        let (sx, sy) = self.to_local(lx, ly);
        let local = Rectangle::new(0, 0, self.width, self.height);
        local.contains(sx, sy).then_some((sx, sy))
    }
}
