use super::{Overlay, ToolContext, ToolResponse, ToolSettings};
use crate::{
    algorithms::ColorGate,
    traits::Tool,
    types::{CanvasPoint, CanvasRect},
};

#[derive(Debug, Clone)]
struct Drag {
    anchor: CanvasPoint,
    current: CanvasPoint,
    gate: Option<ColorGate>,
}

impl Drag {
    fn rect(&self) -> CanvasRect {
        CanvasRect::from_corners(self.anchor, self.current)
    }
}

/// Rectangle marquee: drag out a box, commit on release.
///
/// The rectangle is expressed in canvas pixels; the compositor maps each
/// pixel into the original when the two resolutions differ.
#[derive(Debug, Default)]
pub struct MarqueeTool {
    drag: Option<Drag>,
}

impl MarqueeTool {
    pub fn current_rect(&self) -> Option<CanvasRect> {
        self.drag.as_ref().map(Drag::rect)
    }
}

impl Tool for MarqueeTool {
    fn on_start(&mut self, point: CanvasPoint, ctx: &mut ToolContext<'_>) -> ToolResponse {
        self.drag = Some(Drag { anchor: point, current: point, gate: ctx.lock_gate(point) });
        ToolResponse::InProgress
    }

    fn on_move(&mut self, point: CanvasPoint, _ctx: &mut ToolContext<'_>) {
        if let Some(drag) = self.drag.as_mut() {
            drag.current = point;
        }
    }

    fn on_end(&mut self, ctx: &mut ToolContext<'_>) -> ToolResponse {
        let Some(drag) = self.drag.take() else {
            return ToolResponse::Idle;
        };
        let op = ctx.settings.operation().gated(drag.gate);
        match ctx.compositor.apply_rect(drag.rect(), op) {
            Some(_) => ToolResponse::Commit,
            None => ToolResponse::Idle,
        }
    }

    fn cancel(&mut self) {
        self.drag = None;
    }

    fn overlay(&self, _settings: &ToolSettings) -> Option<Overlay> {
        self.current_rect().map(Overlay::Marquee)
    }
}
