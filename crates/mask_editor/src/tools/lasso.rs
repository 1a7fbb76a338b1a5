use tracing::debug;

use super::{Overlay, ToolContext, ToolResponse, ToolSettings};
use crate::{algorithms::ColorGate, traits::Tool, types::CanvasPoint};

/// Click-to-click polygon selection.
///
/// Each pointer-down adds a vertex. Clicking near the first vertex (or an
/// explicit close) fills the polygon and clears the path.
#[derive(Debug, Default)]
pub struct LassoTool {
    points: Vec<CanvasPoint>,
    gate: Option<ColorGate>,
    cursor: Option<CanvasPoint>,
}

impl LassoTool {
    pub fn points(&self) -> &[CanvasPoint] {
        &self.points
    }

    pub fn is_open(&self) -> bool {
        !self.points.is_empty()
    }

    fn closes_on(&self, point: &CanvasPoint, settings: &ToolSettings) -> bool {
        self.points.len() >= 3
            && self
                .points
                .first()
                .is_some_and(|first| first.distance(point) <= settings.close_radius)
    }

    /// Fill the accumulated polygon and reset. Degenerate outlines are
    /// dropped without touching the canvas.
    pub fn close(&mut self, ctx: &mut ToolContext<'_>) -> ToolResponse {
        let points = std::mem::take(&mut self.points);
        let gate = self.gate.take();
        self.cursor = None;
        if points.is_empty() {
            return ToolResponse::Idle;
        }

        let op = ctx.settings.operation().gated(gate);
        match ctx.compositor.apply_polygon(&points, op) {
            Some(written) => {
                debug!("Lasso closed with {} vertices, {} pixels written", points.len(), written);
                ToolResponse::Commit
            }
            None => {
                debug!("Lasso with {} vertices was degenerate; discarded", points.len());
                ToolResponse::Idle
            }
        }
    }
}

impl Tool for LassoTool {
    fn on_start(&mut self, point: CanvasPoint, ctx: &mut ToolContext<'_>) -> ToolResponse {
        if self.closes_on(&point, ctx.settings) {
            return self.close(ctx);
        }
        if self.points.is_empty() {
            self.gate = ctx.lock_gate(point);
        }
        self.points.push(point);
        self.cursor = Some(point);
        ToolResponse::Idle
    }

    fn on_move(&mut self, point: CanvasPoint, _ctx: &mut ToolContext<'_>) {
        self.cursor = Some(point);
    }

    fn on_end(&mut self, _ctx: &mut ToolContext<'_>) -> ToolResponse {
        ToolResponse::Idle
    }

    fn on_hover(&mut self, point: CanvasPoint) {
        self.cursor = Some(point);
    }

    fn cancel(&mut self) {
        self.points.clear();
        self.gate = None;
        self.cursor = None;
    }

    fn overlay(&self, _settings: &ToolSettings) -> Option<Overlay> {
        if self.points.is_empty() {
            return None;
        }
        Some(Overlay::LassoPath { points: self.points.clone(), preview_to: self.cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compositor::MaskCompositor, source::RasterPair};
    use image::{Rgba, RgbaImage};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn compositor() -> MaskCompositor {
        MaskCompositor::new(RasterPair::new(
            RgbaImage::from_pixel(50, 50, RED),
            RgbaImage::new(50, 50),
        ))
    }

    #[test]
    fn clicking_first_vertex_closes_and_fills() {
        let mut c = compositor();
        let settings = ToolSettings::default();
        let mut lasso = LassoTool::default();
        let mut ctx = ToolContext::new(&mut c, &settings);

        for p in [(10.0, 10.0), (40.0, 10.0), (40.0, 40.0), (10.0, 40.0)] {
            assert_eq!(lasso.on_start(CanvasPoint::new(p.0, p.1), &mut ctx), ToolResponse::Idle);
            lasso.on_end(&mut ctx);
        }
        assert_eq!(lasso.points().len(), 4);
        assert_eq!(lasso.on_start(CanvasPoint::new(12.0, 11.0), &mut ctx), ToolResponse::Commit);
        assert!(!lasso.is_open());

        assert_eq!(*c.canvas().get_pixel(25, 25), RED);
        assert_eq!(c.canvas().get_pixel(5, 5)[3], 0);
    }

    #[test]
    fn near_first_vertex_with_too_few_points_adds_a_vertex() {
        let mut c = compositor();
        let settings = ToolSettings::default();
        let mut lasso = LassoTool::default();
        let mut ctx = ToolContext::new(&mut c, &settings);
        lasso.on_start(CanvasPoint::new(10.0, 10.0), &mut ctx);
        lasso.on_start(CanvasPoint::new(30.0, 10.0), &mut ctx);
        lasso.on_start(CanvasPoint::new(11.0, 11.0), &mut ctx);
        assert_eq!(lasso.points().len(), 3);
    }

    #[test]
    fn self_intersecting_outline_is_discarded() {
        let mut c = compositor();
        let settings = ToolSettings::default();
        let mut lasso = LassoTool::default();
        let mut ctx = ToolContext::new(&mut c, &settings);
        for p in [(0.0, 0.0), (40.0, 40.0), (40.0, 0.0), (0.0, 40.0)] {
            lasso.on_start(CanvasPoint::new(p.0, p.1), &mut ctx);
        }
        assert_eq!(lasso.close(&mut ctx), ToolResponse::Idle);
        assert!(!lasso.is_open());
        assert!(c.canvas().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn overlay_previews_segment_to_cursor() {
        let mut c = compositor();
        let settings = ToolSettings::default();
        let mut lasso = LassoTool::default();
        let mut ctx = ToolContext::new(&mut c, &settings);
        assert!(lasso.overlay(&settings).is_none());

        lasso.on_start(CanvasPoint::new(1.0, 1.0), &mut ctx);
        lasso.on_hover(CanvasPoint::new(8.0, 3.0));
        assert_eq!(
            lasso.overlay(&settings),
            Some(Overlay::LassoPath {
                points: vec![CanvasPoint::new(1.0, 1.0)],
                preview_to: Some(CanvasPoint::new(8.0, 3.0)),
            })
        );

        lasso.cancel();
        assert!(lasso.overlay(&settings).is_none());
    }
}
