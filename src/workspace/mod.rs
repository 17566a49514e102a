//! Workspaces: named, ordered groups of views
//!
//! A workspace holds non-owning references to views (the desktop owns the
//! views themselves). Its index orders workspaces for the paging animation:
//! switching to a lower index slides content the other way.

use log::debug;

use crate::view::ViewId;

/// Index of a workspace in the desktop's workspace list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkspaceId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    pub id: WorkspaceId,
    /// Position in paging order
    pub index: usize,
    pub name: String,
    /// Back-to-front
    views: Vec<ViewId>,
    fullscreen: Option<ViewId>,
}

impl Workspace {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            id: WorkspaceId(index),
            index,
            name: name.into(),
            views: Vec::new(),
            fullscreen: None,
        }
    }

    /// Append a view on top. Adding a view twice keeps the first position.
    pub fn add_view(&mut self, view: ViewId) {
        if !self.views.contains(&view) {
            self.views.push(view);
            debug!("🪟 Added {} to workspace {}", view, self.name);
        }
    }

    /// Detach a view, clearing fullscreen if it was the fullscreen view.
    pub fn remove_view(&mut self, view: ViewId) -> bool {
        let Some(pos) = self.views.iter().position(|&v| v == view) else {
            return false;
        };
        self.views.remove(pos);
        if self.fullscreen == Some(view) {
            self.fullscreen = None;
        }
        debug!("🗑️ Removed {} from workspace {}", view, self.name);
        true
    }

    /// Move a member view to the front of the drawing order.
    pub fn raise_view(&mut self, view: ViewId) -> bool {
        let Some(pos) = self.views.iter().position(|&v| v == view) else {
            return false;
        };
        let id = self.views.remove(pos);
        self.views.push(id);
        true
    }

    pub fn contains(&self, view: ViewId) -> bool {
        self.views.contains(&view)
    }

    pub fn views(&self) -> &[ViewId] {
        &self.views
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn fullscreen_view(&self) -> Option<ViewId> {
        self.fullscreen
    }

    /// Set or clear the fullscreen view. Only member views can go fullscreen.
    pub fn set_fullscreen(&mut self, view: Option<ViewId>) -> bool {
        match view {
            Some(v) if !self.contains(v) => false,
            _ => {
                self.fullscreen = view;
                true
            }
        }
    }

    /// Views that should be drawn, back-to-front.
    ///
    /// A fullscreen view hides everything else. The iterator borrows the
    /// workspace and can be cloned to walk the sequence again.
    pub fn visible_views(&self) -> VisibleViews<'_> {
        VisibleViews {
            inner: self.views.iter(),
            fullscreen: self.fullscreen,
        }
    }
}

/// Lazy, restartable sequence of visible views.
#[derive(Debug, Clone)]
pub struct VisibleViews<'a> {
    inner: std::slice::Iter<'a, ViewId>,
    fullscreen: Option<ViewId>,
}

impl<'a> Iterator for VisibleViews<'a> {
    type Item = ViewId;

    fn next(&mut self) -> Option<ViewId> {
        let fullscreen = self.fullscreen;
        self.inner
            .by_ref()
            .copied()
            .find(|v| fullscreen.map_or(true, |fs| fs == *v))
    }
}

impl DoubleEndedIterator for VisibleViews<'_> {
    fn next_back(&mut self) -> Option<ViewId> {
        let fullscreen = self.fullscreen;
        self.inner
            .by_ref()
            .rev()
            .copied()
            .find(|v| fullscreen.map_or(true, |fs| fs == *v))
    }
}

#[cfg(test)]
mod tests;
