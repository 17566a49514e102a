//! Global z-order of views
//!
//! Views are kept bottom to top: index 0 is drawn first, the last entry is the
//! top-most view and the first candidate for hit-testing.
//!
//! ```
//! use cloth::view::{stack::ViewStack, ViewId};
//!
//! let mut stack = ViewStack::new();
//! stack.push(ViewId(1));
//! stack.push(ViewId(2));
//!
//! assert_eq!(stack.top(), Some(ViewId(2)));
//! ```

use std::collections::HashMap;

use super::ViewId;

#[derive(Debug, Clone, Default)]
pub struct ViewStack {
    /// Bottom to top
    views: Vec<ViewId>,
    /// view -> index in `views`
    positions: HashMap<ViewId, usize>,
}

impl ViewStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a view on top. Returns false if it is already stacked.
    pub fn push(&mut self, view: ViewId) -> bool {
        if self.positions.contains_key(&view) {
            return false;
        }
        self.positions.insert(view, self.views.len());
        self.views.push(view);
        true
    }

    /// Returns the view's former position if it was stacked.
    pub fn remove(&mut self, view: ViewId) -> Option<usize> {
        let pos = self.positions.remove(&view)?;
        self.views.remove(pos);
        self.rebuild_positions();
        Some(pos)
    }

    pub fn raise_to_top(&mut self, view: ViewId) -> bool {
        if self.remove(view).is_some() {
            self.push(view);
            true
        } else {
            false
        }
    }

    pub fn render_order(&self) -> &[ViewId] {
        &self.views
    }

    /// Top-most first
    pub fn iter_top_down(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.views.iter().rev().copied()
    }

    pub fn top(&self) -> Option<ViewId> {
        self.views.last().copied()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn contains(&self, view: ViewId) -> bool {
        self.positions.contains_key(&view)
    }

    pub fn position(&self, view: ViewId) -> Option<usize> {
        self.positions.get(&view).copied()
    }

    fn rebuild_positions(&mut self) {
        self.positions.clear();
        for (i, &view) in self.views.iter().enumerate() {
            self.positions.insert(view, i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_adds_to_top() {
        let mut stack = ViewStack::new();
        assert!(stack.push(ViewId(1)));
        assert!(stack.push(ViewId(2)));
        assert!(!stack.push(ViewId(1)));

        assert_eq!(stack.render_order(), &[ViewId(1), ViewId(2)]);
        assert_eq!(stack.top(), Some(ViewId(2)));
    }

    #[test]
    fn test_remove_and_positions() {
        let mut stack = ViewStack::new();
        for id in 1..=3 {
            stack.push(ViewId(id));
        }

        assert_eq!(stack.remove(ViewId(2)), Some(1));
        assert_eq!(stack.remove(ViewId(2)), None);
        assert_eq!(stack.position(ViewId(3)), Some(1));
        assert_eq!(
            stack.iter_top_down().collect::<Vec<_>>(),
            vec![ViewId(3), ViewId(1)]
        );
    }

    #[test]
    fn test_raise_to_top() {
        let mut stack = ViewStack::new();
        for id in 1..=3 {
            stack.push(ViewId(id));
        }

        assert!(stack.raise_to_top(ViewId(1)));
        assert!(!stack.raise_to_top(ViewId(9)));
        assert_eq!(stack.render_order(), &[ViewId(2), ViewId(3), ViewId(1)]);
    }
}
