//! The working canvas and the four primitive mask operations.

use image::{Rgba, RgbaImage};
use tracing::trace;

use crate::{
    algorithms::{ColorGate, Footprint, MaskBuffer, circle_footprint, polygon_footprint, rect_footprint, rgb_of},
    source::RasterPair,
    types::{BrushMode, CanvasPoint, CanvasRect},
};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Polarity plus an optional color constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operation {
    pub mode: BrushMode,
    pub gate: Option<ColorGate>,
}

impl Operation {
    pub fn new(mode: BrushMode) -> Self {
        Self { mode, gate: None }
    }

    pub fn restore() -> Self {
        Self::new(BrushMode::Restore)
    }

    pub fn erase() -> Self {
        Self::new(BrushMode::Erase)
    }

    pub fn gated(mut self, gate: Option<ColorGate>) -> Self {
        self.gate = gate;
        self
    }
}

/// Owns the working canvas; the only component allowed to write to it.
#[derive(Debug, Clone)]
pub struct MaskCompositor {
    sources: RasterPair,
    canvas: RgbaImage,
}

impl MaskCompositor {
    /// Seed the canvas from the processed image.
    pub fn new(sources: RasterPair) -> Self {
        let canvas = sources.processed().clone();
        Self { sources, canvas }
    }

    pub fn sources(&self) -> &RasterPair {
        &self.sources
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    /// Replace the whole canvas, used when stepping through history.
    pub(crate) fn restore_snapshot(&mut self, snapshot: &RgbaImage) {
        self.canvas.clone_from(snapshot);
    }

    /// Binary brush dab. Returns the number of pixels written, or `None`
    /// when the geometry is degenerate.
    pub fn apply_circle(&mut self, center: CanvasPoint, radius: f32, op: Operation) -> Option<usize> {
        let Footprint { mask, origin } = circle_footprint(center, radius, self.canvas.dimensions())?;
        self.apply_mask_buffer(&mask, origin, op)
    }

    pub fn apply_rect(&mut self, rect: CanvasRect, op: Operation) -> Option<usize> {
        let Footprint { mask, origin } = rect_footprint(&rect, self.canvas.dimensions())?;
        self.apply_mask_buffer(&mask, origin, op)
    }

    /// Lasso fill. Fewer than three points or a self-intersecting outline is a no-op.
    pub fn apply_polygon(&mut self, points: &[CanvasPoint], op: Operation) -> Option<usize> {
        let Footprint { mask, origin } = polygon_footprint(points, self.canvas.dimensions())?;
        self.apply_mask_buffer(&mask, origin, op)
    }

    /// Stamp an arbitrary mask whose top-left pixel sits at canvas `origin`.
    pub fn apply_mask_buffer(&mut self, mask: &MaskBuffer, origin: (i64, i64), op: Operation) -> Option<usize> {
        if mask.width() == 0 || mask.height() == 0 {
            return None;
        }
        let (cw, ch) = self.canvas.dimensions();

        // Clip the mask to the canvas once instead of per pixel.
        let mx0 = (-origin.0).max(0) as u32;
        let my0 = (-origin.1).max(0) as u32;
        let mx1 = (cw as i64 - origin.0).clamp(0, mask.width() as i64) as u32;
        let my1 = (ch as i64 - origin.1).clamp(0, mask.height() as i64) as u32;

        let mut written = 0usize;
        for my in my0..my1 {
            for mx in mx0..mx1 {
                if mask.get_pixel(mx, my)[0] == 0 {
                    continue;
                }
                let x = (origin.0 + mx as i64) as u32;
                let y = (origin.1 + my as i64) as u32;
                if self.write_pixel(x, y, &op) {
                    written += 1;
                }
            }
        }

        trace!("{:?} wrote {} pixels at {:?}", op.mode, written, origin);
        Some(written)
    }

    /// Restore replaces color and alpha outright so semi-transparent
    /// leftovers are overwritten rather than blended.
    fn write_pixel(&mut self, x: u32, y: u32, op: &Operation) -> bool {
        let source = self.sources.original_at(x, y);
        if let Some(gate) = &op.gate {
            if !gate.admits(rgb_of(source)) {
                return false;
            }
        }
        let value = match op.mode {
            BrushMode::Restore => source,
            BrushMode::Erase => TRANSPARENT,
        };
        self.canvas.put_pixel(x, y, value);
        true
    }
}
