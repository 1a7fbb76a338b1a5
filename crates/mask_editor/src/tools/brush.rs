use tracing::trace;

use super::{Overlay, ToolContext, ToolResponse, ToolSettings};
use crate::{
    algorithms::{ColorGate, Footprint, circle_footprint, retain_similar},
    traits::Tool,
    types::CanvasPoint,
};

#[derive(Debug, Clone)]
struct Stroke {
    last: CanvasPoint,
    gate: Option<ColorGate>,
    applied: bool,
}

/// Circular brush. In magic mode each dab is narrowed to pixels whose
/// original color matches the reference locked at pointer-down.
#[derive(Debug, Default)]
pub struct BrushTool {
    stroke: Option<Stroke>,
    hover: Option<CanvasPoint>,
}

impl BrushTool {
    pub fn is_stroking(&self) -> bool {
        self.stroke.is_some()
    }

    fn dab(ctx: &mut ToolContext<'_>, center: CanvasPoint, gate: Option<&ColorGate>) -> bool {
        let radius = ctx.settings.brush_radius();
        let op = ctx.settings.operation();
        match gate {
            None => ctx.compositor.apply_circle(center, radius, op).is_some(),
            Some(gate) => {
                let Some(Footprint { mut mask, origin }) = circle_footprint(center, radius, ctx.compositor.dimensions()) else {
                    return false;
                };
                retain_similar(&mut mask, origin, ctx.compositor.sources(), gate);
                ctx.compositor.apply_mask_buffer(&mask, origin, op).is_some()
            }
        }
    }
}

impl Tool for BrushTool {
    fn on_start(&mut self, point: CanvasPoint, ctx: &mut ToolContext<'_>) -> ToolResponse {
        let gate = ctx.lock_gate(point);
        if let Some(gate) = &gate {
            trace!("Brush locked reference color {:?}", gate.reference);
        }
        let applied = Self::dab(ctx, point, gate.as_ref());
        self.stroke = Some(Stroke { last: point, gate, applied });
        self.hover = Some(point);
        ToolResponse::InProgress
    }

    fn on_move(&mut self, point: CanvasPoint, ctx: &mut ToolContext<'_>) {
        self.hover = Some(point);
        let Some(stroke) = self.stroke.as_mut() else {
            return;
        };

        // Space dabs at half the radius so quick strokes stay continuous.
        let spacing = (ctx.settings.brush_radius() * 0.5).max(1.0);
        let steps = (stroke.last.distance(&point) / spacing).ceil().max(1.0) as usize;
        for step in 1..=steps {
            let at = stroke.last.lerp(&point, step as f32 / steps as f32);
            stroke.applied |= Self::dab(ctx, at, stroke.gate.as_ref());
        }
        stroke.last = point;
    }

    fn on_end(&mut self, _ctx: &mut ToolContext<'_>) -> ToolResponse {
        match self.stroke.take() {
            Some(stroke) if stroke.applied => ToolResponse::Commit,
            _ => ToolResponse::Idle,
        }
    }

    fn on_hover(&mut self, point: CanvasPoint) {
        self.hover = Some(point);
    }

    fn cancel(&mut self) {
        self.stroke = None;
    }

    fn overlay(&self, settings: &ToolSettings) -> Option<Overlay> {
        self.hover.map(|center| Overlay::BrushCursor { center, radius: settings.brush_radius() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compositor::MaskCompositor, source::RasterPair, types::BrushMode};
    use image::{Rgba, RgbaImage};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    fn compositor(original: RgbaImage) -> MaskCompositor {
        let (w, h) = original.dimensions();
        MaskCompositor::new(RasterPair::new(original, RgbaImage::new(w, h)))
    }

    #[test]
    fn stroke_interpolates_between_moves() {
        let mut c = compositor(RgbaImage::from_pixel(100, 20, RED));
        let settings = ToolSettings { brush_size: 6, ..ToolSettings::default() };
        let mut brush = BrushTool::default();
        let mut ctx = ToolContext::new(&mut c, &settings);

        brush.on_start(CanvasPoint::new(10.0, 10.0), &mut ctx);
        brush.on_move(CanvasPoint::new(90.0, 10.0), &mut ctx);
        assert_eq!(brush.on_end(&mut ctx), ToolResponse::Commit);

        for x in 10..=90 {
            assert_eq!(*c.canvas().get_pixel(x, 10), RED, "gap at x={x}");
        }
        assert_eq!(*c.canvas().get_pixel(50, 0), CLEAR);
    }

    #[test]
    fn erase_mode_clears_alpha() {
        let original = RgbaImage::from_pixel(20, 20, RED);
        let mut c = MaskCompositor::new(RasterPair::new(original.clone(), original));
        let settings = ToolSettings { brush_mode: BrushMode::Erase, brush_size: 4, ..ToolSettings::default() };
        let mut brush = BrushTool::default();
        let mut ctx = ToolContext::new(&mut c, &settings);
        brush.on_start(CanvasPoint::new(10.0, 10.0), &mut ctx);
        brush.on_end(&mut ctx);
        assert_eq!(c.canvas().get_pixel(10, 10)[3], 0);
        assert_eq!(c.canvas().get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn magic_brush_with_zero_threshold_only_restores_reference_color() {
        let original = RgbaImage::from_fn(40, 40, |x, _| if x < 20 { RED } else { GREEN });
        let mut c = compositor(original);
        let settings = ToolSettings {
            brush_size: 30,
            magic_enabled: true,
            threshold: 0.0,
            ..ToolSettings::default()
        };
        let mut brush = BrushTool::default();
        let mut ctx = ToolContext::new(&mut c, &settings);

        // Reference sampled well inside the red half.
        brush.on_start(CanvasPoint::new(12.0, 20.0), &mut ctx);
        brush.on_move(CanvasPoint::new(24.0, 20.0), &mut ctx);
        brush.on_end(&mut ctx);

        assert_eq!(*c.canvas().get_pixel(12, 20), RED);
        assert_eq!(*c.canvas().get_pixel(19, 20), RED);
        for x in 20..40 {
            for y in 0..40 {
                assert_eq!(*c.canvas().get_pixel(x, y), CLEAR);
            }
        }
    }

    #[test]
    fn reference_color_stays_locked_across_materials() {
        let original = RgbaImage::from_fn(60, 10, |x, _| if x < 30 { RED } else { GREEN });
        let mut c = compositor(original);
        let settings = ToolSettings { brush_size: 4, magic_enabled: true, threshold: 20.0, ..ToolSettings::default() };
        let mut brush = BrushTool::default();
        let mut ctx = ToolContext::new(&mut c, &settings);

        brush.on_start(CanvasPoint::new(5.0, 5.0), &mut ctx);
        brush.on_move(CanvasPoint::new(55.0, 5.0), &mut ctx);
        brush.on_end(&mut ctx);

        assert_eq!(*c.canvas().get_pixel(25, 5), RED);
        assert_eq!(*c.canvas().get_pixel(45, 5), CLEAR);
    }

    #[test]
    fn zero_size_brush_records_nothing() {
        let mut c = compositor(RgbaImage::from_pixel(10, 10, RED));
        let settings = ToolSettings { brush_size: 0, ..ToolSettings::default() };
        let mut brush = BrushTool::default();
        let mut ctx = ToolContext::new(&mut c, &settings);
        brush.on_start(CanvasPoint::new(5.0, 5.0), &mut ctx);
        brush.on_move(CanvasPoint::new(6.0, 5.0), &mut ctx);
        assert_eq!(brush.on_end(&mut ctx), ToolResponse::Idle);
        assert!(c.canvas().pixels().all(|p| *p == CLEAR));
    }

    #[test]
    fn overlay_follows_hover() {
        let brush = {
            let mut b = BrushTool::default();
            b.on_hover(CanvasPoint::new(3.0, 4.0));
            b
        };
        let settings = ToolSettings { brush_size: 10, ..ToolSettings::default() };
        assert_eq!(
            brush.overlay(&settings),
            Some(Overlay::BrushCursor { center: CanvasPoint::new(3.0, 4.0), radius: 5.0 })
        );
    }
}
