//! Viewport rectangle.

use serde::{Deserialize, Serialize};

/// A rectangle in pixels. `x`/`y` are offsets, never derived from inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Width and height as a pair.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Replace width and height, keeping the offsets.
    ///
    /// Returns whether anything changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }
}
