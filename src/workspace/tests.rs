//! Unit tests for workspace module
//!
//! Tests view membership, fullscreen filtering, and the visible-views
//! sequence.

use super::*;

#[test]
fn test_workspace_creation() {
    let ws = Workspace::new(3, "web");
    assert_eq!(ws.id, WorkspaceId(3));
    assert_eq!(ws.index, 3);
    assert_eq!(ws.name, "web");
    assert!(ws.is_empty());
    assert_eq!(ws.fullscreen_view(), None);
}

#[test]
fn test_view_addition_keeps_order() {
    let mut ws = Workspace::new(0, "1");
    ws.add_view(ViewId(1));
    ws.add_view(ViewId(2));
    ws.add_view(ViewId(1));
    ws.add_view(ViewId(3));

    assert_eq!(ws.views(), &[ViewId(1), ViewId(2), ViewId(3)]);
}

#[test]
fn test_raise_moves_view_to_front() {
    let mut ws = Workspace::new(0, "1");
    ws.add_view(ViewId(1));
    ws.add_view(ViewId(2));
    ws.add_view(ViewId(3));

    assert!(ws.raise_view(ViewId(1)));
    assert!(!ws.raise_view(ViewId(9)));
    assert_eq!(ws.views(), &[ViewId(2), ViewId(3), ViewId(1)]);
    assert_eq!(ws.visible_views().next_back(), Some(ViewId(1)));
}

#[test]
fn test_view_removal() {
    let mut ws = Workspace::new(0, "1");
    ws.add_view(ViewId(1));
    ws.add_view(ViewId(2));

    assert!(ws.remove_view(ViewId(1)));
    assert!(!ws.remove_view(ViewId(1)));
    assert!(!ws.remove_view(ViewId(99)));
    assert_eq!(ws.views(), &[ViewId(2)]);
}

#[test]
fn test_fullscreen_hides_other_views() {
    let mut ws = Workspace::new(0, "1");
    for id in 1..=3 {
        ws.add_view(ViewId(id));
    }

    assert!(ws.set_fullscreen(Some(ViewId(2))));
    let visible: Vec<_> = ws.visible_views().collect();
    assert_eq!(visible, vec![ViewId(2)]);

    assert!(ws.set_fullscreen(None));
    assert_eq!(ws.visible_views().count(), 3);
}

#[test]
fn test_fullscreen_requires_membership() {
    let mut ws = Workspace::new(0, "1");
    ws.add_view(ViewId(1));
    assert!(!ws.set_fullscreen(Some(ViewId(5))));
    assert_eq!(ws.fullscreen_view(), None);
}

#[test]
fn test_removing_fullscreen_view_clears_it() {
    let mut ws = Workspace::new(0, "1");
    ws.add_view(ViewId(1));
    ws.add_view(ViewId(2));
    ws.set_fullscreen(Some(ViewId(1)));

    ws.remove_view(ViewId(1));

    assert_eq!(ws.fullscreen_view(), None);
    assert_eq!(ws.visible_views().collect::<Vec<_>>(), vec![ViewId(2)]);
}

#[test]
fn test_visible_views_is_restartable() {
    let mut ws = Workspace::new(0, "1");
    ws.add_view(ViewId(1));
    ws.add_view(ViewId(2));

    let seq = ws.visible_views();
    let first: Vec<_> = seq.clone().collect();
    let second: Vec<_> = seq.collect();
    assert_eq!(first, second);

    // Top-most first
    let top_down: Vec<_> = ws.visible_views().rev().collect();
    assert_eq!(top_down, vec![ViewId(2), ViewId(1)]);
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_add_remove_views_consistency(
            ids in prop::collection::vec(1u64..50u64, 1..40),
            removals in prop::collection::vec(1u64..50u64, 0..40),
        ) {
            let mut ws = Workspace::new(0, "1");
            for &id in &ids {
                ws.add_view(ViewId(id));
            }
            for &id in &removals {
                ws.remove_view(ViewId(id));
            }

            // No duplicates survive, and removed views are gone
            let mut seen = std::collections::HashSet::new();
            for v in ws.views() {
                prop_assert!(seen.insert(*v));
                prop_assert!(!removals.contains(&v.0));
            }
            prop_assert_eq!(ws.visible_views().count(), ws.views().len());
        }
    }
}
