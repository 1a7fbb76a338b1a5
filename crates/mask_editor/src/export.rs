use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::ImageFormat;
use tracing::info;

use crate::{
    compositor::MaskCompositor,
    error::{ExportError, SaveError},
    traits::SaveHandler,
    types::EditSubject,
};

/// A losslessly encoded copy of the working canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime_type: &'static str,
}

impl EncodedImage {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `data:` URL suitable for an `<img src>` or a JSON upload body.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

/// Encode the canvas as PNG at native resolution.
///
/// Fails loudly on a tainted canvas instead of producing a blank image.
pub fn export_raster(compositor: &MaskCompositor) -> Result<EncodedImage, ExportError> {
    if compositor.sources().is_tainted() {
        return Err(ExportError::Tainted);
    }
    let canvas = compositor.canvas();
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return Err(ExportError::EmptyCanvas);
    }

    let mut bytes = Vec::new();
    canvas.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    info!("Exported {}x{} canvas as {} PNG bytes", width, height, bytes.len());

    Ok(EncodedImage { bytes, width, height, mime_type: "image/png" })
}

/// Writes exports to a fixed path.
#[derive(Debug, Clone)]
pub struct FileSaveHandler {
    path: PathBuf,
}

impl FileSaveHandler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SaveHandler for FileSaveHandler {
    async fn save(&self, image: EncodedImage, subject: &EditSubject) -> Result<(), SaveError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, &image.bytes).await?;
        info!("Saved {} ({} bytes) to {}", subject.id(), image.len(), self.path.display());
        Ok(())
    }
}
