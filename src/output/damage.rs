//! Per-output damage accumulation
//!
//! Damage is recorded in output-local coordinates between frames. Once it is
//! non-empty the output asks the backend for a frame; the frame handler drains
//! it and renders.
//!
//! # Example
//!
//! ```
//! use cloth::output::damage::Damage;
//! use cloth::view::Rectangle;
//!
//! let mut damage = Damage::new(1920, 1080);
//! damage.add(Rectangle::new(10, 10, 50, 50));
//! assert!(!damage.is_empty());
//!
//! damage.add_whole();
//! assert_eq!(damage.take(), vec![Rectangle::new(0, 0, 1920, 1080)]);
//! assert!(damage.is_empty());
//! ```

use crate::view::Rectangle;

/// Regions beyond this count collapse into whole-output damage
const MAX_DAMAGE_REGIONS: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct Damage {
    width: u32,
    height: u32,
    regions: Vec<Rectangle>,
    whole: bool,
}

impl Damage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            regions: Vec::new(),
            whole: false,
        }
    }

    fn output_rect(&self) -> Rectangle {
        Rectangle::new(0, 0, self.width, self.height)
    }

    /// Follow an output size change. Pending damage becomes whole-output damage.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.add_whole();
        }
    }

    /// Add a damaged region, clipped to the output.
    pub fn add(&mut self, region: Rectangle) {
        if self.whole {
            return;
        }
        let Some(clipped) = region.intersection(&self.output_rect()) else {
            return;
        };
        if self.regions.iter().any(|r| r.contains_rect(&clipped)) {
            return;
        }
        self.regions.push(clipped);
        if self.regions.len() > MAX_DAMAGE_REGIONS {
            self.add_whole();
        }
    }

    pub fn add_whole(&mut self) {
        self.whole = true;
        self.regions.clear();
    }

    pub fn is_whole(&self) -> bool {
        self.whole
    }

    pub fn is_empty(&self) -> bool {
        !self.whole && self.regions.is_empty()
    }

    /// Drain the accumulated damage, merging overlapping regions.
    pub fn take(&mut self) -> Vec<Rectangle> {
        if std::mem::take(&mut self.whole) {
            self.regions.clear();
            if self.width == 0 || self.height == 0 {
                return Vec::new();
            }
            return vec![self.output_rect()];
        }

        let mut regions = std::mem::take(&mut self.regions);
        if regions.len() <= 1 {
            return regions;
        }
        regions.sort_by_key(|r| (r.y, r.x));
        let mut merged: Vec<Rectangle> = Vec::with_capacity(regions.len());
        for r in regions {
            let mut current = r;
            // A grown union can reach rectangles merged earlier
            while let Some(pos) = merged.iter().position(|m| m.intersects(&current)) {
                current = current.union(&merged.swap_remove(pos));
            }
            merged.push(current);
        }
        merged.sort_by_key(|r| (r.y, r.x));
        merged
    }
}
