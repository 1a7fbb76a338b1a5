use image::RgbaImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr, VariantNames};
use tracing::{debug, info, warn};

use crate::{
    compositor::MaskCompositor,
    config::EditorConfig,
    error::Result,
    export::{EncodedImage, export_raster},
    history::HistoryManager,
    source::RasterPair,
    tools::{Overlay, ToolContext, ToolResponse, ToolSettings, Toolbox},
    traits::{SaveHandler, Tool},
    types::{BackgroundStyle, BrushMode, CanvasPoint, EditSubject, Modifiers, ScreenPoint, ToolKind},
    viewport::{ViewportController, ViewportState, WheelEvent},
};

/// Closed set of operations accepted by [`MaskEditor::execute`].
#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EditorCommand {
    /// Switch the active tool (ignored mid-gesture)
    SelectTool { tool: ToolKind },
    /// Choose restore or erase polarity
    SetBrushMode { mode: BrushMode },
    /// Brush diameter in canvas pixels
    SetBrushSize { size: u32 },
    /// Toggle color-similarity constraint
    SetMagic { enabled: bool },
    /// Color distance threshold for magic mode and the wand
    SetThreshold { threshold: f32 },
    /// Cosmetic backdrop behind transparent pixels
    SetBackground { background: BackgroundStyle },
    /// Pointer pressed at a screen position
    PointerDown {
        position: ScreenPoint,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Pointer moved, pressed or not
    PointerMove { position: ScreenPoint },
    /// Pointer released
    PointerUp,
    /// Two touch points landed
    PinchStart { a: ScreenPoint, b: ScreenPoint },
    /// Two touch points moved
    PinchMove { a: ScreenPoint, b: ScreenPoint },
    /// Touch points lifted
    PinchEnd,
    /// Scroll wheel or trackpad scroll
    Wheel(WheelEvent),
    /// Zoom in around the view center
    ZoomIn,
    /// Zoom out around the view center
    ZoomOut,
    /// Back to scale 1 with no offset
    ResetView,
    /// Fill the open lasso polygon
    CloseLasso,
    /// Drop the open lasso polygon
    CancelLasso,
    Undo,
    Redo,
    /// Keyboard shortcut, e.g. `z` with the command modifier
    KeyDown {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
}

impl EditorCommand {
    /// JSON schema for all commands
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(EditorCommand)
    }

    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::SelectTool { .. } => "Switch the active tool",
            Self::SetBrushMode { .. } => "Choose restore or erase polarity",
            Self::SetBrushSize { .. } => "Set the brush diameter in canvas pixels",
            Self::SetMagic { .. } => "Constrain tools to colors similar to the gesture's start point",
            Self::SetThreshold { .. } => "Set the color distance threshold",
            Self::SetBackground { .. } => "Change the backdrop shown behind transparent pixels",
            Self::PointerDown { .. } => "Begin a gesture",
            Self::PointerMove { .. } => "Continue a gesture or move the cursor",
            Self::PointerUp => "Finish a gesture",
            Self::PinchStart { .. } => "Begin a two-finger pan/zoom",
            Self::PinchMove { .. } => "Continue a two-finger pan/zoom",
            Self::PinchEnd => "Finish a two-finger pan/zoom",
            Self::Wheel(_) => "Scroll to pan, or zoom with the command modifier",
            Self::ZoomIn => "Zoom in one step",
            Self::ZoomOut => "Zoom out one step",
            Self::ResetView => "Reset pan and zoom",
            Self::CloseLasso => "Fill the open lasso polygon",
            Self::CancelLasso => "Discard the open lasso polygon",
            Self::Undo => "Step back one action",
            Self::Redo => "Step forward one action",
            Self::KeyDown { .. } => "Keyboard shortcut (mod+Z undo, mod+Shift+Z redo)",
        }
    }
}

/// What a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing changed
    Ignored,
    /// Settings, viewport or transient tool state changed
    Updated,
    /// A gesture finished and a history snapshot was taken
    Committed,
    /// Undo or redo replaced the canvas
    HistoryMoved,
}

impl Outcome {
    pub fn raster_changed(&self) -> bool {
        matches!(self, Outcome::Committed | Outcome::HistoryMoved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Drawing(ToolKind),
    Panning,
    Pinching,
}

/// One editing session over a loaded [`RasterPair`].
#[derive(Debug)]
pub struct MaskEditor {
    config: EditorConfig,
    compositor: MaskCompositor,
    history: HistoryManager,
    viewport: ViewportController,
    settings: ToolSettings,
    active_tool: ToolKind,
    tools: Toolbox,
    gesture: Option<Gesture>,
    background: BackgroundStyle,
    view_size: Option<ScreenPoint>,
}

impl MaskEditor {
    pub fn new(sources: RasterPair, config: EditorConfig) -> Self {
        let compositor = MaskCompositor::new(sources);
        let history = HistoryManager::new(compositor.canvas().clone(), config.history_capacity);
        let viewport = ViewportController::new(config.viewport.clone());
        let settings = ToolSettings::from_config(&config);
        let background = config.display.background;
        info!(
            "Editor ready: {:?} canvas, history capacity {}",
            compositor.dimensions(),
            history.capacity()
        );
        Self {
            config,
            compositor,
            history,
            viewport,
            settings,
            active_tool: ToolKind::default(),
            tools: Toolbox::default(),
            gesture: None,
            background,
            view_size: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn canvas(&self) -> &RgbaImage {
        self.compositor.canvas()
    }

    pub fn sources(&self) -> &RasterPair {
        self.compositor.sources()
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn active_tool(&self) -> ToolKind {
        self.active_tool
    }

    pub fn background(&self) -> BackgroundStyle {
        self.background
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport.state()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// A pointer button or touch is held.
    pub fn is_busy(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn screen_to_canvas(&self, screen: ScreenPoint) -> CanvasPoint {
        self.viewport.screen_to_canvas(screen)
    }

    pub fn canvas_to_screen(&self, canvas: CanvasPoint) -> ScreenPoint {
        self.viewport.canvas_to_screen(canvas)
    }

    /// Tell the editor how large the rendered canvas element is, in screen pixels.
    pub fn set_view_size(&mut self, width: f32, height: f32) {
        self.view_size = Some(ScreenPoint::new(width, height));
        self.viewport.set_display_size(width, self.compositor.dimensions().0);
    }

    /// Preview to draw over the canvas for the active tool.
    pub fn overlay(&self) -> Option<Overlay> {
        self.tools.get(self.active_tool)?.overlay(&self.settings)
    }

    pub fn execute(&mut self, command: EditorCommand) -> Outcome {
        debug!("Executing {}", command);
        match command {
            EditorCommand::SelectTool { tool } => self.select_tool(tool),
            EditorCommand::SetBrushMode { mode } => {
                self.settings.brush_mode = mode;
                Outcome::Updated
            }
            EditorCommand::SetBrushSize { size } => {
                self.settings.brush_size = self.config.clamp_brush_size(size);
                Outcome::Updated
            }
            EditorCommand::SetMagic { enabled } => {
                self.settings.magic_enabled = enabled;
                Outcome::Updated
            }
            EditorCommand::SetThreshold { threshold } => {
                self.settings.threshold = self.config.clamp_threshold(threshold);
                Outcome::Updated
            }
            EditorCommand::SetBackground { background } => {
                self.background = background;
                Outcome::Updated
            }
            EditorCommand::PointerDown { position, modifiers } => self.pointer_down(position, modifiers),
            EditorCommand::PointerMove { position } => self.pointer_move(position),
            EditorCommand::PointerUp => self.pointer_up(),
            EditorCommand::PinchStart { a, b } => self.pinch_start(a, b),
            EditorCommand::PinchMove { a, b } => self.pinch_move(a, b),
            EditorCommand::PinchEnd => self.pinch_end(),
            EditorCommand::Wheel(event) => {
                self.viewport.wheel(&event);
                Outcome::Updated
            }
            EditorCommand::ZoomIn => {
                self.viewport.zoom_in(self.view_center());
                Outcome::Updated
            }
            EditorCommand::ZoomOut => {
                self.viewport.zoom_out(self.view_center());
                Outcome::Updated
            }
            EditorCommand::ResetView => {
                self.viewport.reset();
                Outcome::Updated
            }
            EditorCommand::CloseLasso => self.close_lasso(),
            EditorCommand::CancelLasso => {
                if self.gesture.is_some() || !self.tools.lasso.is_open() {
                    return Outcome::Ignored;
                }
                self.tools.lasso.cancel();
                Outcome::Updated
            }
            EditorCommand::Undo => self.undo(),
            EditorCommand::Redo => self.redo(),
            EditorCommand::KeyDown { key, modifiers } => self.key_down(&key, modifiers),
        }
    }

    fn view_center(&self) -> ScreenPoint {
        match self.view_size {
            Some(size) => ScreenPoint::new(size.x / 2.0, size.y / 2.0),
            None => {
                let (w, h) = self.compositor.dimensions();
                self.viewport.canvas_to_screen(CanvasPoint::new(w as f32 / 2.0, h as f32 / 2.0))
            }
        }
    }

    fn select_tool(&mut self, tool: ToolKind) -> Outcome {
        if self.gesture.is_some() {
            debug!("Ignoring tool switch to {} mid-gesture", tool);
            return Outcome::Ignored;
        }
        if tool == self.active_tool {
            return Outcome::Ignored;
        }
        // Abandon click-to-click state left by the previous tool.
        self.tools.cancel_all();
        self.active_tool = tool;
        Outcome::Updated
    }

    fn pointer_down(&mut self, position: ScreenPoint, modifiers: Modifiers) -> Outcome {
        if self.gesture.is_some() {
            return Outcome::Ignored;
        }
        if self.active_tool == ToolKind::Pan || modifiers.space {
            self.viewport.begin_pan(position);
            self.gesture = Some(Gesture::Panning);
            return Outcome::Updated;
        }

        let point = self.viewport.screen_to_canvas(position);
        let kind = self.active_tool;
        self.gesture = Some(Gesture::Drawing(kind));
        debug!("Gesture start: {} at {:?}", kind, point);

        let response = self.with_tool(kind, |tool, ctx| tool.on_start(point, ctx));
        match self.record(response) {
            // The gesture itself is state even when nothing was painted.
            Outcome::Ignored => Outcome::Updated,
            outcome => outcome,
        }
    }

    fn pointer_move(&mut self, position: ScreenPoint) -> Outcome {
        match self.gesture {
            Some(Gesture::Panning) => {
                self.viewport.update_pan(position);
                Outcome::Updated
            }
            Some(Gesture::Pinching) => Outcome::Ignored,
            Some(Gesture::Drawing(kind)) => {
                let point = self.viewport.screen_to_canvas(position);
                self.with_tool(kind, |tool, ctx| {
                    tool.on_move(point, ctx);
                    ToolResponse::InProgress
                });
                Outcome::Updated
            }
            None => {
                let point = self.viewport.screen_to_canvas(position);
                match self.tools.get_mut(self.active_tool) {
                    Some(tool) => {
                        tool.on_hover(point);
                        Outcome::Updated
                    }
                    None => Outcome::Ignored,
                }
            }
        }
    }

    fn pointer_up(&mut self) -> Outcome {
        match self.gesture.take() {
            Some(Gesture::Panning) => {
                self.viewport.end_pan();
                Outcome::Updated
            }
            Some(Gesture::Drawing(kind)) => {
                let response = self.with_tool(kind, |tool, ctx| tool.on_end(ctx));
                debug!("Gesture end: {} -> {:?}", kind, response);
                self.record(response)
            }
            Some(Gesture::Pinching) => {
                self.gesture = Some(Gesture::Pinching);
                Outcome::Ignored
            }
            None => Outcome::Ignored,
        }
    }

    fn pinch_start(&mut self, a: ScreenPoint, b: ScreenPoint) -> Outcome {
        // A second finger landing finishes whatever the first one started.
        let finished = match self.gesture {
            Some(Gesture::Pinching) => return Outcome::Ignored,
            Some(_) => self.pointer_up(),
            None => Outcome::Ignored,
        };
        self.viewport.begin_pinch(a, b);
        self.gesture = Some(Gesture::Pinching);
        if finished == Outcome::Committed { finished } else { Outcome::Updated }
    }

    fn pinch_move(&mut self, a: ScreenPoint, b: ScreenPoint) -> Outcome {
        if self.gesture != Some(Gesture::Pinching) {
            return Outcome::Ignored;
        }
        self.viewport.update_pinch(a, b);
        Outcome::Updated
    }

    fn pinch_end(&mut self) -> Outcome {
        if self.gesture != Some(Gesture::Pinching) {
            return Outcome::Ignored;
        }
        self.viewport.end_pinch();
        self.gesture = None;
        Outcome::Updated
    }

    fn close_lasso(&mut self) -> Outcome {
        if self.gesture.is_some() || !self.tools.lasso.is_open() {
            return Outcome::Ignored;
        }
        let mut ctx = ToolContext::new(&mut self.compositor, &self.settings);
        let response = self.tools.lasso.close(&mut ctx);
        self.record(response)
    }

    fn with_tool<F>(&mut self, kind: ToolKind, f: F) -> ToolResponse
    where
        F: FnOnce(&mut dyn Tool, &mut ToolContext<'_>) -> ToolResponse,
    {
        let Some(tool) = self.tools.get_mut(kind) else {
            return ToolResponse::Idle;
        };
        let mut ctx = ToolContext::new(&mut self.compositor, &self.settings);
        f(tool, &mut ctx)
    }

    fn record(&mut self, response: ToolResponse) -> Outcome {
        match response {
            ToolResponse::Commit => {
                self.history.snapshot(self.compositor.canvas());
                Outcome::Committed
            }
            ToolResponse::InProgress => Outcome::Updated,
            ToolResponse::Idle => Outcome::Ignored,
        }
    }

    pub fn undo(&mut self) -> Outcome {
        if self.is_busy() {
            warn!("Undo ignored while a gesture is in progress");
            return Outcome::Ignored;
        }
        match self.history.undo() {
            Some(snapshot) => {
                self.compositor.restore_snapshot(snapshot);
                Outcome::HistoryMoved
            }
            None => Outcome::Ignored,
        }
    }

    pub fn redo(&mut self) -> Outcome {
        if self.is_busy() {
            warn!("Redo ignored while a gesture is in progress");
            return Outcome::Ignored;
        }
        match self.history.redo() {
            Some(snapshot) => {
                self.compositor.restore_snapshot(snapshot);
                Outcome::HistoryMoved
            }
            None => Outcome::Ignored,
        }
    }

    fn key_down(&mut self, key: &str, modifiers: Modifiers) -> Outcome {
        if !modifiers.command || !key.eq_ignore_ascii_case("z") {
            return Outcome::Ignored;
        }
        if modifiers.shift { self.redo() } else { self.undo() }
    }

    /// Encode the current canvas. Leaves editing state untouched.
    pub fn export(&self) -> Result<EncodedImage> {
        Ok(export_raster(&self.compositor)?)
    }

    /// Export, then hand the image to `handler`. Failures leave the canvas
    /// and history exactly as they were so the user can retry.
    pub async fn save<H: SaveHandler>(&self, handler: &H, subject: &EditSubject) -> Result<()> {
        let image = self.export()?;
        handler.save(image, subject).await?;
        info!("Saved edits for {}", subject.id());
        Ok(())
    }

    /// Discard the session without saving.
    pub fn cancel(self) {
        info!("Editor cancelled; {} history entries discarded", self.history.len());
    }
}
