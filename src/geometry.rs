//! Capture geometry resolution.
//!
//! Turns a rectangle dragged on a selection surface into the desktop offset and
//! even-aligned size the encoder is invoked with. Without a usable selection the
//! whole display is captured.

use std::fmt;

/// An axis-aligned rectangle. Offsets may be negative on multi-monitor desktops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a normalized rectangle from the press and release points of a drag.
    ///
    /// The corners may come in any order; the size is the distance between them.
    pub fn from_corners(start: (i32, i32), end: (i32, i32)) -> Self {
        let (x1, x2) = (start.0.min(end.0), start.0.max(end.0));
        let (y1, y2) = (start.1.min(end.1), start.1.max(end.1));
        Self {
            x: x1,
            y: y1,
            width: x1.abs_diff(x2),
            height: y1.abs_diff(y2),
        }
    }

    /// A click without a drag yields a zero-area rectangle.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// A rectangle selected by dragging, in both coordinate frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedRegion {
    /// Relative to the selection surface (one surface per monitor)
    pub local: Rect,
    /// Relative to the whole desktop
    pub global: Rect,
}

impl SelectedRegion {
    /// Region from a desktop-global drag, deriving the local frame from the
    /// display the selection surface covered.
    pub fn from_global(global: Rect, display: &Display) -> Self {
        let local = Rect {
            x: global.x.saturating_sub(display.x),
            y: global.y.saturating_sub(display.y),
            ..global
        };
        Self { local, global }
    }
}

/// Read-only descriptor of a connected display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Display {
    pub index: usize,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Display {
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

impl fmt::Display for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Screen {} ({}x{} at {},{})",
            self.index + 1,
            self.width,
            self.height,
            self.x,
            self.y
        )
    }
}

/// Offset and size handed to the encoder, in desktop coordinates.
///
/// `width` and `height` are always even.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureGeometry {
    pub offset_x: i32,
    pub offset_y: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureGeometry {
    /// The `WxH` form used for `-video_size`.
    pub fn video_size(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    fn from_rect(rect: Rect) -> Self {
        Self {
            offset_x: rect.x,
            offset_y: rect.y,
            width: make_even(rect.width),
            height: make_even(rect.height),
        }
    }
}

/// Round an odd dimension up to the next even value, or down at `u32::MAX`.
pub fn make_even(n: u32) -> u32 {
    if n % 2 == 0 {
        n
    } else {
        n.checked_add(1).unwrap_or(n - 1)
    }
}

/// Resolve what to capture.
///
/// A usable region wins and its global rectangle is used. Otherwise (no region, or
/// a zero-area click) the full display is captured.
pub fn resolve(region: Option<&SelectedRegion>, display: &Display) -> CaptureGeometry {
    match region {
        Some(region) if !region.global.is_degenerate() => {
            log::debug!(
                "Selected region local={} global={}",
                region.local,
                region.global
            );
            CaptureGeometry::from_rect(region.global)
        }
        Some(region) => {
            log::debug!(
                "Ignoring zero-area selection {}, capturing {}",
                region.global,
                display
            );
            CaptureGeometry::from_rect(display.bounds())
        }
        None => CaptureGeometry::from_rect(display.bounds()),
    }
}
