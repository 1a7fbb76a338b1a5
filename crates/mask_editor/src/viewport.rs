//! Pan/zoom display transform, independent of raster content.
//!
//! `screen = offset + canvas * display_ratio * scale`, where `display_ratio`
//! compensates for a rendered element whose size differs from the canvas'
//! intrinsic resolution.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    config::ViewportConfig,
    types::{CanvasPoint, Modifiers, ScreenPoint},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ViewportState {
    pub scale: f32,
    pub offset: ScreenPoint,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self { scale: 1.0, offset: ScreenPoint::default() }
    }
}

/// A wheel/trackpad scroll.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct WheelEvent {
    pub dx: f32,
    pub dy: f32,
    /// Cursor position in screen pixels
    pub position: ScreenPoint,
    #[serde(default)]
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy)]
struct PanDrag {
    /// Pointer position minus offset at drag start
    grab: ScreenPoint,
}

#[derive(Debug, Clone, Copy)]
struct Pinch {
    midpoint: ScreenPoint,
    distance: f32,
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    state: ViewportState,
    config: ViewportConfig,
    display_ratio: f32,
    pan: Option<PanDrag>,
    pinch: Option<Pinch>,
}

impl ViewportController {
    pub fn new(config: ViewportConfig) -> Self {
        let display_ratio = config.display_ratio;
        Self {
            state: ViewportState::default(),
            config,
            display_ratio,
            pan: None,
            pinch: None,
        }
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn scale(&self) -> f32 {
        self.state.scale
    }

    pub fn offset(&self) -> ScreenPoint {
        self.state.offset
    }

    pub fn display_ratio(&self) -> f32 {
        self.display_ratio
    }

    /// Record the rendered element width against the canvas' intrinsic width.
    pub fn set_display_size(&mut self, rendered_width: f32, intrinsic_width: u32) {
        if rendered_width > 0.0 && intrinsic_width > 0 {
            self.display_ratio = rendered_width / intrinsic_width as f32;
        }
    }

    fn pixels_per_canvas_pixel(&self) -> f32 {
        self.display_ratio * self.state.scale
    }

    pub fn screen_to_canvas(&self, screen: ScreenPoint) -> CanvasPoint {
        let k = self.pixels_per_canvas_pixel();
        CanvasPoint {
            x: (screen.x - self.state.offset.x) / k,
            y: (screen.y - self.state.offset.y) / k,
        }
    }

    pub fn canvas_to_screen(&self, canvas: CanvasPoint) -> ScreenPoint {
        let k = self.pixels_per_canvas_pixel();
        ScreenPoint {
            x: canvas.x * k + self.state.offset.x,
            y: canvas.y * k + self.state.offset.y,
        }
    }

    pub fn clamp_scale(&self, scale: f32) -> f32 {
        scale.max(self.config.min_scale).min(self.config.max_scale)
    }

    /// Zoom to `scale` keeping the content under `anchor` stationary.
    pub fn zoom_at(&mut self, anchor: ScreenPoint, scale: f32) {
        let new_scale = self.clamp_scale(scale);
        let ratio = new_scale / self.state.scale;
        let offset = self.state.offset;
        self.state.offset = ScreenPoint {
            x: offset.x - (anchor.x - offset.x) * (ratio - 1.0),
            y: offset.y - (anchor.y - offset.y) * (ratio - 1.0),
        };
        self.state.scale = new_scale;
        trace!("Zoom to {:.3} around {:?}", new_scale, anchor);
    }

    pub fn zoom_by(&mut self, factor: f32, anchor: ScreenPoint) {
        self.zoom_at(anchor, self.state.scale * factor);
    }

    pub fn zoom_in(&mut self, anchor: ScreenPoint) {
        self.zoom_by(self.config.zoom_step, anchor);
    }

    pub fn zoom_out(&mut self, anchor: ScreenPoint) {
        self.zoom_by(1.0 / self.config.zoom_step, anchor);
    }

    pub fn reset(&mut self) {
        self.state = ViewportState::default();
        self.pan = None;
        self.pinch = None;
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.state.offset.x += dx;
        self.state.offset.y += dy;
    }

    /// Scroll pans by default; zooming needs the command modifier.
    /// Shift turns vertical scrolling into horizontal panning.
    pub fn wheel(&mut self, event: &WheelEvent) {
        if event.modifiers.command {
            let factor = (-event.dy * self.config.wheel_zoom_speed).exp();
            self.zoom_by(factor, event.position);
        } else if event.modifiers.shift && event.dx == 0.0 {
            self.pan_by(-event.dy, 0.0);
        } else {
            self.pan_by(-event.dx, -event.dy);
        }
    }

    pub fn is_panning(&self) -> bool {
        self.pan.is_some()
    }

    pub fn is_pinching(&self) -> bool {
        self.pinch.is_some()
    }

    pub fn begin_pan(&mut self, pointer: ScreenPoint) {
        let offset = self.state.offset;
        self.pan = Some(PanDrag {
            grab: ScreenPoint { x: pointer.x - offset.x, y: pointer.y - offset.y },
        });
    }

    pub fn update_pan(&mut self, pointer: ScreenPoint) {
        if let Some(PanDrag { grab }) = self.pan {
            self.state.offset = ScreenPoint { x: pointer.x - grab.x, y: pointer.y - grab.y };
        }
    }

    pub fn end_pan(&mut self) {
        self.pan = None;
    }

    /// Two-finger gesture: the midpoint pans, the spread zooms around it.
    pub fn begin_pinch(&mut self, a: ScreenPoint, b: ScreenPoint) {
        self.pan = None;
        self.pinch = Some(Pinch { midpoint: a.midpoint(&b), distance: a.distance(&b) });
    }

    pub fn update_pinch(&mut self, a: ScreenPoint, b: ScreenPoint) {
        let Some(previous) = self.pinch else {
            return;
        };
        let midpoint = a.midpoint(&b);
        let distance = a.distance(&b);

        self.pan_by(midpoint.x - previous.midpoint.x, midpoint.y - previous.midpoint.y);
        if previous.distance > 0.0 && distance > 0.0 {
            self.zoom_by(distance / previous.distance, midpoint);
        }
        self.pinch = Some(Pinch { midpoint, distance });
    }

    pub fn end_pinch(&mut self) {
        self.pinch = None;
    }
}
