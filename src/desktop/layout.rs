//! Spatial stitching of outputs
//!
//! Every enabled output occupies a box in one shared layout coordinate space.
//! Boxes are placed explicitly from config, or automatically to the right of
//! the rightmost output. Queries never fail: a point outside every box simply
//! has no output.

use log::debug;

use crate::output::OutputId;
use crate::view::Rectangle;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    output: OutputId,
    area: Rectangle,
    auto: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OutputLayout {
    entries: Vec<Entry>,
}

impl OutputLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `output` at an explicit position. Re-adding moves it.
    pub fn add(&mut self, output: OutputId, x: i32, y: i32, width: u32, height: u32) {
        self.insert(Entry {
            output,
            area: Rectangle::new(x, y, width, height),
            auto: false,
        });
    }

    /// Place `output` to the right of everything already laid out.
    pub fn add_auto(&mut self, output: OutputId, width: u32, height: u32) {
        let x = self
            .entries
            .iter()
            .filter(|e| e.output != output)
            .map(|e| e.area.right())
            .max()
            .unwrap_or(0);
        self.insert(Entry {
            output,
            area: Rectangle::new(x, 0, width, height),
            auto: true,
        });
    }

    fn insert(&mut self, entry: Entry) {
        debug!("🖥️ {} placed at {:?}", entry.output, entry.area);
        match self.entries.iter_mut().find(|e| e.output == entry.output) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Follow an output size change, keeping its position.
    pub fn resize(&mut self, output: OutputId, width: u32, height: u32) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.output == output) {
            entry.area.width = width;
            entry.area.height = height;
        }
    }

    pub fn remove(&mut self, output: OutputId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.output != output);
        before != self.entries.len()
    }

    pub fn output_box(&self, output: OutputId) -> Option<Rectangle> {
        self.entries
            .iter()
            .find(|e| e.output == output)
            .map(|e| e.area)
    }

    pub fn is_auto(&self, output: OutputId) -> bool {
        self.entries.iter().any(|e| e.output == output && e.auto)
    }

    /// Output whose box contains the layout point, first placed wins.
    pub fn output_at(&self, x: f64, y: f64) -> Option<OutputId> {
        self.entries
            .iter()
            .find(|e| e.area.contains(x, y))
            .map(|e| e.output)
    }

    /// Bounding box of every output
    pub fn extents(&self) -> Option<Rectangle> {
        self.entries
            .iter()
            .map(|e| e.area)
            .reduce(|acc, r| acc.union(&r))
    }

    pub fn outputs(&self) -> impl Iterator<Item = OutputId> + '_ {
        self.entries.iter().map(|e| e.output)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_placement_goes_right() {
        let mut layout = OutputLayout::new();
        layout.add_auto(OutputId(1), 1920, 1080);
        layout.add_auto(OutputId(2), 1280, 1024);

        assert_eq!(layout.output_box(OutputId(2)), Some(Rectangle::new(1920, 0, 1280, 1024)));
        assert_eq!(layout.output_at(2000.0, 500.0), Some(OutputId(2)));
        assert_eq!(layout.output_at(100.0, 1050.0), Some(OutputId(1)));
        assert_eq!(layout.output_at(100.0, 1080.0), None);
        assert_eq!(layout.extents(), Some(Rectangle::new(0, 0, 3200, 1080)));
    }

    #[test]
    fn test_explicit_position_and_readd() {
        let mut layout = OutputLayout::new();
        layout.add(OutputId(1), -1920, 0, 1920, 1080);
        layout.add_auto(OutputId(2), 800, 600);
        assert_eq!(layout.output_box(OutputId(2)).map(|r| r.x), Some(0));
        assert!(layout.is_auto(OutputId(2)));

        layout.add(OutputId(1), 0, 1080, 1920, 1080);
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.output_at(10.0, 1100.0), Some(OutputId(1)));
    }

    #[test]
    fn test_resize_and_remove() {
        let mut layout = OutputLayout::new();
        layout.add(OutputId(1), 100, 100, 800, 600);
        layout.resize(OutputId(1), 600, 800);
        assert_eq!(layout.output_box(OutputId(1)), Some(Rectangle::new(100, 100, 600, 800)));

        assert!(layout.remove(OutputId(1)));
        assert!(!layout.remove(OutputId(1)));
        assert_eq!(layout.output_at(150.0, 150.0), None);
        assert_eq!(layout.extents(), None);
    }
}
