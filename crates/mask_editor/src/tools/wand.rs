use tracing::debug;

use super::{ToolContext, ToolResponse};
use crate::{
    algorithms::{FloodRegion, flood_fill},
    traits::Tool,
    types::CanvasPoint,
};

/// Single-click flood fill over the original image.
#[derive(Debug, Default)]
pub struct WandTool;

impl Tool for WandTool {
    fn on_start(&mut self, point: CanvasPoint, ctx: &mut ToolContext<'_>) -> ToolResponse {
        let Some(FloodRegion { mask, area }) =
            flood_fill(ctx.compositor.sources(), point.pixel(), ctx.settings.threshold)
        else {
            return ToolResponse::Idle;
        };
        debug!("Wand selected {} pixels from {:?}", area, point.pixel());

        let op = ctx.settings.operation().gated(ctx.lock_gate(point));
        match ctx.compositor.apply_mask_buffer(&mask, (0, 0), op) {
            Some(_) => ToolResponse::Commit,
            None => ToolResponse::Idle,
        }
    }

    fn on_move(&mut self, _point: CanvasPoint, _ctx: &mut ToolContext<'_>) {}

    fn on_end(&mut self, _ctx: &mut ToolContext<'_>) -> ToolResponse {
        ToolResponse::Idle
    }
}
