use std::future::Future;

use crate::{
    error::{FetchError, SaveError},
    export::EncodedImage,
    source::CorsMode,
    tools::{Overlay, ToolContext, ToolResponse, ToolSettings},
    types::{CanvasPoint, EditSubject},
};

/// Trait for fetching the raw bytes behind an image URL
pub trait ImageFetcher: Send + Sync {
    /// Fetch `url` under the given cross-origin mode.
    ///
    /// Must return [`FetchError::ReadBackDenied`] when the bytes arrived but
    /// pixel read-back is not permitted for `mode`.
    fn fetch(
        &self,
        url: &str,
        mode: CorsMode,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Trait for persisting an exported image (upload, write to disk, ...)
pub trait SaveHandler: Send + Sync {
    fn save(
        &self,
        image: EncodedImage,
        subject: &EditSubject,
    ) -> impl Future<Output = Result<(), SaveError>> + Send;
}

impl<F, Fut> SaveHandler for F
where
    F: Fn(EncodedImage, EditSubject) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), SaveError>> + Send,
{
    fn save(
        &self,
        image: EncodedImage,
        subject: &EditSubject,
    ) -> impl Future<Output = Result<(), SaveError>> + Send {
        self(image, subject.clone())
    }
}

/// Pointer protocol shared by every raster tool.
///
/// Points are already in canvas pixel space. A gesture is always
/// `on_start`, zero or more `on_move`, then `on_end`.
pub trait Tool: Send + Sync {
    fn on_start(&mut self, point: CanvasPoint, ctx: &mut ToolContext<'_>) -> ToolResponse;

    fn on_move(&mut self, point: CanvasPoint, ctx: &mut ToolContext<'_>);

    fn on_end(&mut self, ctx: &mut ToolContext<'_>) -> ToolResponse;

    /// Pointer movement with no button held.
    fn on_hover(&mut self, _point: CanvasPoint) {}

    /// Drop any pending state without touching the canvas.
    fn cancel(&mut self) {}

    /// Transient preview to draw over the canvas.
    fn overlay(&self, _settings: &ToolSettings) -> Option<Overlay> {
        None
    }
}
