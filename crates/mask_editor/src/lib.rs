//! # Background Mask Editor
//!
//! Interactive refinement of background-removal results. A working canvas
//! starts as the processed (cut-out) image; tools restore pixels from the
//! original or erase them to transparency, with linear undo/redo and a
//! pan/zoom viewport.
//!
//! ## Core Features
//!
//! - **Dual sources**: original and processed rasters loaded concurrently, with a cross-origin retry
//! - **Tools**: brush, magic wand, click-to-click lasso, rectangle marquee and pan
//! - **Magic mode**: constrain any tool to colors similar to the gesture's start point
//! - **Command interface**: a closed, serializable [`EditorCommand`] set
//! - **Lossless export**: PNG at native resolution, handed to a [`SaveHandler`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mask_editor::{
//!     EditSubject, EditorCommand, EditorConfig, EditorSession, FileFetcher, FileSaveHandler,
//!     Modifiers, ScreenPoint, ToolKind,
//! };
//!
//! # async fn run() -> mask_editor::Result<()> {
//! let subject = EditSubject::Wardrobe { item_id: "jacket-1".into() };
//! let mut session = EditorSession::new(
//!     FileFetcher,
//!     "original.jpg",
//!     "processed.png",
//!     subject,
//!     EditorConfig::default(),
//! );
//!
//! let editor = session.load().await?;
//! editor.execute(EditorCommand::SelectTool { tool: ToolKind::Wand });
//! editor.execute(EditorCommand::PointerDown {
//!     position: ScreenPoint::new(120.0, 80.0),
//!     modifiers: Modifiers::none(),
//! });
//! editor.execute(EditorCommand::PointerUp);
//!
//! session.save(&FileSaveHandler::new("edited.png")).await?;
//! # Ok(())
//! # }
//! ```

pub mod algorithms;
pub mod compositor;
pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod history;
pub mod session;
pub mod source;
pub mod tools;
pub mod traits;
pub mod types;
pub mod viewport;

pub use compositor::{MaskCompositor, Operation};
pub use config::EditorConfig;
pub use editor::{EditorCommand, MaskEditor, Outcome};
pub use error::{EditorError, ExportError, LoadError, Result, SaveError};
pub use export::{EncodedImage, FileSaveHandler, export_raster};
pub use history::HistoryManager;
pub use session::{EditorSession, SessionStatus};
pub use source::{CorsMode, FileFetcher, RasterPair, SourceLoader, UrlFetcher};
#[cfg(feature = "http")]
pub use source::HttpFetcher;
pub use tools::{Overlay, ToolSettings};
pub use traits::*;
pub use types::*;
pub use viewport::{ViewportController, ViewportState, WheelEvent};
