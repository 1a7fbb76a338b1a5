//! Loading lifecycle around a [`MaskEditor`].

use tracing::{debug, error, info};

use crate::{
    config::EditorConfig,
    editor::MaskEditor,
    error::{EditorError, Result},
    source::SourceLoader,
    traits::{ImageFetcher, SaveHandler},
    types::EditSubject,
};

#[derive(Debug)]
enum SessionState {
    Loading,
    Ready(Box<MaskEditor>),
    Failed { reason: String },
}

/// Coarse state for a host UI: spinner, editor, or error with retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Ready,
    Failed { reason: String },
}

/// Editing session for one subject. Tools are only reachable once both
/// sources have loaded.
pub struct EditorSession<F: ImageFetcher> {
    loader: SourceLoader<F>,
    original_url: String,
    processed_url: String,
    subject: EditSubject,
    config: EditorConfig,
    state: SessionState,
}

impl<F: ImageFetcher> EditorSession<F> {
    pub fn new(
        fetcher: F,
        original_url: impl Into<String>,
        processed_url: impl Into<String>,
        subject: EditSubject,
        config: EditorConfig,
    ) -> Self {
        Self {
            loader: SourceLoader::new(fetcher),
            original_url: original_url.into(),
            processed_url: processed_url.into(),
            subject,
            config,
            state: SessionState::Loading,
        }
    }

    pub fn subject(&self) -> &EditSubject {
        &self.subject
    }

    pub fn status(&self) -> SessionStatus {
        match &self.state {
            SessionState::Loading => SessionStatus::Loading,
            SessionState::Ready(_) => SessionStatus::Ready,
            SessionState::Failed { reason } => SessionStatus::Failed { reason: reason.clone() },
        }
    }

    /// Fetch and decode both sources. On failure the session stays usable
    /// for [`retry`](Self::retry). A ready session keeps its editor, edits
    /// and history, and nothing is fetched again.
    pub async fn load(&mut self) -> Result<&mut MaskEditor> {
        if let SessionState::Ready(_) = self.state {
            debug!("Sources for {} already loaded", self.subject.id());
            return self.editor_mut();
        }
        self.state = SessionState::Loading;
        info!("Loading sources for {}", self.subject.id());

        match self.loader.load(&self.original_url, &self.processed_url).await {
            Ok(pair) => {
                let editor = MaskEditor::new(pair, self.config.clone());
                self.state = SessionState::Ready(Box::new(editor));
                self.editor_mut()
            }
            Err(err) => {
                error!("Failed to load sources for {}: {}", self.subject.id(), err);
                self.state = SessionState::Failed { reason: err.to_string() };
                Err(err.into())
            }
        }
    }

    /// Reload from the same URLs after a failure. A ready session is left alone.
    pub async fn retry(&mut self) -> Result<&mut MaskEditor> {
        self.load().await
    }

    pub fn editor(&self) -> Result<&MaskEditor> {
        match &self.state {
            SessionState::Ready(editor) => Ok(&**editor),
            _ => Err(EditorError::NotReady),
        }
    }

    pub fn editor_mut(&mut self) -> Result<&mut MaskEditor> {
        match &mut self.state {
            SessionState::Ready(editor) => Ok(&mut **editor),
            _ => Err(EditorError::NotReady),
        }
    }

    /// Export the canvas and hand it to `handler` along with the subject.
    pub async fn save<H: SaveHandler>(&self, handler: &H) -> Result<()> {
        self.editor()?.save(handler, &self.subject).await
    }

    /// Drop the session and everything it loaded.
    pub fn cancel(self) {
        info!("Session for {} cancelled", self.subject.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        editor::EditorCommand,
        error::{FetchError, LoadError},
        source::{CorsMode, tests::{MemoryFetcher, png_bytes}},
        types::{Modifiers, ScreenPoint},
    };
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn subject() -> EditSubject {
        EditSubject::Wardrobe { item_id: "w-42".into() }
    }

    fn fetcher() -> MemoryFetcher {
        MemoryFetcher::default()
            .with("orig.png", &RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255])))
            .with("cut.png", &RgbaImage::new(8, 8))
    }

    /// Fails every fetch until `failures` have been served.
    struct FlakyFetcher {
        failures: AtomicUsize,
        bytes: Vec<u8>,
    }

    impl ImageFetcher for FlakyFetcher {
        async fn fetch(&self, url: &str, _mode: CorsMode) -> std::result::Result<Vec<u8>, FetchError> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(FetchError::Http { url: url.to_string(), status: 503 });
            }
            Ok(self.bytes.clone())
        }
    }

    #[tokio::test]
    async fn tools_unreachable_until_loaded() {
        let mut session = EditorSession::new(fetcher(), "orig.png", "cut.png", subject(), EditorConfig::default());
        assert_eq!(session.status(), SessionStatus::Loading);
        assert!(matches!(session.editor(), Err(EditorError::NotReady)));

        let editor = session.load().await.unwrap();
        editor.execute(EditorCommand::PointerDown { position: ScreenPoint::new(4.0, 4.0), modifiers: Modifiers::none() });
        editor.execute(EditorCommand::PointerUp);
        assert_eq!(session.status(), SessionStatus::Ready);
        assert!(session.editor().unwrap().can_undo());
    }

    #[tokio::test]
    async fn failure_reports_reason_and_retry_recovers() {
        let fetcher = FlakyFetcher {
            failures: AtomicUsize::new(2),
            bytes: png_bytes(&RgbaImage::new(4, 4)),
        };
        let mut session = EditorSession::new(fetcher, "a.png", "b.png", subject(), EditorConfig::default());

        let err = session.load().await.unwrap_err();
        assert!(matches!(err, EditorError::Load(LoadError::Fetch { .. })));
        assert!(matches!(session.status(), SessionStatus::Failed { ref reason } if reason.contains(".png")));
        assert!(session.editor_mut().is_err());

        // The join may have consumed one or both failures; keep retrying.
        let mut attempts = 0;
        while session.retry().await.is_err() {
            attempts += 1;
            assert!(attempts < 3);
        }
        assert_eq!(session.status(), SessionStatus::Ready);
        assert_eq!(session.editor().unwrap().canvas().dimensions(), (4, 4));
    }

    #[tokio::test]
    async fn save_requires_ready_session() {
        let session = EditorSession::new(fetcher(), "orig.png", "cut.png", subject(), EditorConfig::default());
        let handler = |_image: crate::export::EncodedImage, _subject: EditSubject| async {
            Ok::<(), crate::error::SaveError>(())
        };
        assert!(matches!(session.save(&handler).await, Err(EditorError::NotReady)));
    }

    #[tokio::test]
    async fn save_passes_subject_through() {
        let mut session = EditorSession::new(fetcher(), "orig.png", "cut.png", subject(), EditorConfig::default());
        session.load().await.unwrap();
        let seen = std::sync::Mutex::new(Vec::new());
        let handler = |image: crate::export::EncodedImage, subject: EditSubject| {
            seen.lock().unwrap().push((subject, image.mime_type));
            async { Ok::<(), crate::error::SaveError>(()) }
        };
        session.save(&handler).await.unwrap();
        assert_eq!(seen.into_inner().unwrap(), vec![(subject(), "image/png")]);
    }

    #[tokio::test]
    async fn loading_a_ready_session_keeps_edits() {
        let mut session = EditorSession::new(fetcher(), "orig.png", "cut.png", subject(), EditorConfig::default());
        let fetches = |session: &EditorSession<MemoryFetcher>| session.loader.fetcher().calls.lock().unwrap().len();

        let editor = session.load().await.unwrap();
        editor.execute(EditorCommand::PointerDown { position: ScreenPoint::new(4.0, 4.0), modifiers: Modifiers::none() });
        editor.execute(EditorCommand::PointerUp);
        let edited = editor.canvas().clone();
        assert_eq!(fetches(&session), 2);

        let editor = session.load().await.unwrap();
        assert_eq!(editor.canvas().as_raw(), edited.as_raw());
        assert_eq!(editor.history().len(), 2);
        assert!(editor.can_undo());
        assert_eq!(fetches(&session), 2);

        session.retry().await.unwrap();
        assert_eq!(fetches(&session), 2);
        assert_eq!(session.editor().unwrap().canvas().as_raw(), edited.as_raw());
    }
}
