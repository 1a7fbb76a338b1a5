//! Interaction tools. Each one turns pointer gestures into compositor operations.

pub mod brush;
pub mod lasso;
pub mod marquee;
pub mod wand;

pub use brush::BrushTool;
pub use lasso::LassoTool;
pub use marquee::MarqueeTool;
pub use wand::WandTool;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    algorithms::ColorGate,
    compositor::{MaskCompositor, Operation},
    config::EditorConfig,
    traits::Tool,
    types::{BrushMode, CanvasPoint, CanvasRect, ToolKind},
};

/// User-controlled settings shared by all tools, outliving any gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ToolSettings {
    pub brush_mode: BrushMode,
    /// Brush diameter in canvas pixels
    pub brush_size: u32,
    pub magic_enabled: bool,
    pub threshold: f32,
    /// Half-width of the reference color sampling square
    pub sample_radius: u32,
    /// Lasso closing distance in canvas pixels
    pub close_radius: f32,
}

impl ToolSettings {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            brush_mode: BrushMode::default(),
            brush_size: config.brush.default_size,
            magic_enabled: false,
            threshold: config.magic.default_threshold,
            sample_radius: config.magic.sample_radius,
            close_radius: config.lasso.close_radius,
        }
    }

    pub fn brush_radius(&self) -> f32 {
        self.brush_size as f32 / 2.0
    }

    pub fn operation(&self) -> Operation {
        Operation::new(self.brush_mode)
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

/// What a tool hands to the compositor for the duration of one call.
pub struct ToolContext<'a> {
    pub compositor: &'a mut MaskCompositor,
    pub settings: &'a ToolSettings,
}

impl<'a> ToolContext<'a> {
    pub fn new(compositor: &'a mut MaskCompositor, settings: &'a ToolSettings) -> Self {
        Self { compositor, settings }
    }

    /// Reference color sampled from the original at `point`, locked for the
    /// rest of the gesture. `None` when magic mode is off.
    pub fn lock_gate(&self, point: CanvasPoint) -> Option<ColorGate> {
        if !self.settings.magic_enabled {
            return None;
        }
        let reference = self
            .compositor
            .sources()
            .sample_color(point, self.settings.sample_radius);
        Some(ColorGate::new(reference, self.settings.threshold))
    }
}

/// How a tool call affects history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolResponse {
    /// Nothing to record
    Idle,
    /// Gesture continues; canvas may have changed but is not final
    InProgress,
    /// A complete undoable action finished; take a snapshot
    Commit,
}

/// Transient preview drawn over the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    BrushCursor { center: CanvasPoint, radius: f32 },
    LassoPath { points: Vec<CanvasPoint>, preview_to: Option<CanvasPoint> },
    Marquee(CanvasRect),
}

/// One instance of every raster tool.
#[derive(Debug, Default)]
pub struct Toolbox {
    pub brush: BrushTool,
    pub wand: WandTool,
    pub lasso: LassoTool,
    pub marquee: MarqueeTool,
}

impl Toolbox {
    /// The raster tool for `kind`; panning is handled by the viewport.
    pub fn get_mut(&mut self, kind: ToolKind) -> Option<&mut dyn Tool> {
        match kind {
            ToolKind::Brush => Some(&mut self.brush),
            ToolKind::Wand => Some(&mut self.wand),
            ToolKind::Lasso => Some(&mut self.lasso),
            ToolKind::Rectangle => Some(&mut self.marquee),
            ToolKind::Pan => None,
        }
    }

    pub fn get(&self, kind: ToolKind) -> Option<&dyn Tool> {
        match kind {
            ToolKind::Brush => Some(&self.brush),
            ToolKind::Wand => Some(&self.wand),
            ToolKind::Lasso => Some(&self.lasso),
            ToolKind::Rectangle => Some(&self.marquee),
            ToolKind::Pan => None,
        }
    }

    pub fn cancel_all(&mut self) {
        self.brush.cancel();
        self.wand.cancel();
        self.lasso.cancel();
        self.marquee.cancel();
    }
}
