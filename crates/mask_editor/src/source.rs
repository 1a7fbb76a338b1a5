//! Loading and sampling of the two source rasters.
//!
//! The working canvas takes its size from the processed image. When the
//! original differs in resolution every lookup into it is remapped by the
//! ratio of the two sizes.

use image::{Rgb, Rgba, RgbaImage};
use tracing::{debug, info, warn};

use crate::{
    error::{FetchError, LoadError},
    traits::ImageFetcher,
    types::CanvasPoint,
};

/// Cross-origin request mode for image fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorsMode {
    /// Request pixel read-back permission from the server
    Anonymous,
    /// Plain request; pixels may be unreadable for export
    Omit,
}

/// The pre-removal original and the post-removal processed image of one session.
#[derive(Debug, Clone)]
pub struct RasterPair {
    original: RgbaImage,
    processed: RgbaImage,
    tainted: bool,
}

impl RasterPair {
    pub fn new(original: RgbaImage, processed: RgbaImage) -> Self {
        Self { original, processed, tainted: false }
    }

    /// Mark the pair as loaded without read-back permission.
    pub fn with_taint(mut self, tainted: bool) -> Self {
        self.tainted = tainted;
        self
    }

    pub fn original(&self) -> &RgbaImage {
        &self.original
    }

    pub fn processed(&self) -> &RgbaImage {
        &self.processed
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    /// Size of the working canvas seeded from this pair.
    pub fn canvas_dimensions(&self) -> (u32, u32) {
        self.processed.dimensions()
    }

    pub fn same_resolution(&self) -> bool {
        self.original.dimensions() == self.processed.dimensions()
    }

    /// Map a canvas pixel to the corresponding pixel of the original.
    pub fn to_original(&self, x: u32, y: u32) -> (u32, u32) {
        if self.same_resolution() {
            return (x, y);
        }
        let (cw, ch) = self.canvas_dimensions();
        let (ow, oh) = self.original.dimensions();
        let ox = (x as u64 * ow as u64 / cw.max(1) as u64) as u32;
        let oy = (y as u64 * oh as u64 / ch.max(1) as u64) as u32;
        (ox.min(ow.saturating_sub(1)), oy.min(oh.saturating_sub(1)))
    }

    /// Original pixel behind canvas pixel `(x, y)`.
    pub fn original_at(&self, x: u32, y: u32) -> Rgba<u8> {
        let (ox, oy) = self.to_original(x, y);
        *self.original.get_pixel(ox, oy)
    }

    /// Averaged original color around a canvas point.
    pub fn sample_color(&self, point: CanvasPoint, radius: u32) -> Rgb<u8> {
        let (cw, ch) = self.canvas_dimensions();
        let (px, py) = point.pixel();
        let cx = px.clamp(0, cw.saturating_sub(1) as i64) as u32;
        let cy = py.clamp(0, ch.saturating_sub(1) as i64) as u32;
        let (ox, oy) = self.to_original(cx, cy);
        sample_color(&self.original, ox as i64, oy as i64, radius)
    }
}

/// Average RGB over the `(2r+1)²` square centered at `(x, y)`.
///
/// The center is clamped into the image first; neighbors falling outside
/// the image are skipped.
pub fn sample_color(image: &RgbaImage, x: i64, y: i64, radius: u32) -> Rgb<u8> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Rgb([0, 0, 0]);
    }
    let cx = x.clamp(0, w as i64 - 1);
    let cy = y.clamp(0, h as i64 - 1);
    let r = radius as i64;

    let mut sum = [0u64; 3];
    let mut count = 0u64;
    for sy in (cy - r).max(0)..=(cy + r).min(h as i64 - 1) {
        for sx in (cx - r).max(0)..=(cx + r).min(w as i64 - 1) {
            let p = image.get_pixel(sx as u32, sy as u32);
            sum[0] += p[0] as u64;
            sum[1] += p[1] as u64;
            sum[2] += p[2] as u64;
            count += 1;
        }
    }

    let avg = |c: u64| ((c + count / 2) / count) as u8;
    Rgb([avg(sum[0]), avg(sum[1]), avg(sum[2])])
}

struct LoadedImage {
    pixels: RgbaImage,
    tainted: bool,
}

/// Loads a [`RasterPair`] through an [`ImageFetcher`].
pub struct SourceLoader<F: ImageFetcher> {
    fetcher: F,
}

impl<F: ImageFetcher> SourceLoader<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetch and decode both images concurrently; the first failure wins.
    pub async fn load(&self, original_url: &str, processed_url: &str) -> Result<RasterPair, LoadError> {
        info!("Loading sources: original={} processed={}", original_url, processed_url);
        let (original, processed) =
            tokio::try_join!(self.load_one(original_url), self.load_one(processed_url))?;

        let pair = RasterPair::new(original.pixels, processed.pixels)
            .with_taint(original.tainted || processed.tainted);

        if !pair.same_resolution() {
            debug!(
                "Original {:?} and processed {:?} differ in resolution; remapping lookups",
                pair.original().dimensions(),
                pair.processed().dimensions()
            );
        }
        info!(
            "Sources ready: canvas {:?}, tainted={}",
            pair.canvas_dimensions(),
            pair.is_tainted()
        );
        Ok(pair)
    }

    async fn load_one(&self, url: &str) -> Result<LoadedImage, LoadError> {
        match self.fetcher.fetch(url, CorsMode::Anonymous).await {
            Ok(bytes) => decode(url, &bytes, false),
            Err(FetchError::ReadBackDenied { .. }) => {
                warn!("Read-back denied for {}, retrying without cross-origin mode", url);
                match self.fetcher.fetch(url, CorsMode::Omit).await {
                    Ok(bytes) => decode(url, &bytes, true),
                    Err(FetchError::ReadBackDenied { .. }) => {
                        Err(LoadError::CrossOrigin { url: url.to_string() })
                    }
                    Err(source) => Err(LoadError::Fetch { url: url.to_string(), source }),
                }
            }
            Err(source) => Err(LoadError::Fetch { url: url.to_string(), source }),
        }
    }
}

fn decode(url: &str, bytes: &[u8], tainted: bool) -> Result<LoadedImage, LoadError> {
    let pixels = image::load_from_memory(bytes)
        .map_err(|source| LoadError::Decode { url: url.to_string(), source })?
        .to_rgba8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(LoadError::EmptyImage { url: url.to_string() });
    }
    Ok(LoadedImage { pixels, tainted })
}

/// Reads local paths and `file://` URLs. Local files never deny read-back.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher;

impl ImageFetcher for FileFetcher {
    async fn fetch(&self, url: &str, _mode: CorsMode) -> Result<Vec<u8>, FetchError> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        Ok(tokio::fs::read(path).await?)
    }
}

/// HTTP(S) fetcher emulating browser cross-origin read-back rules.
///
/// With an `origin` configured, [`CorsMode::Anonymous`] requests carry an
/// `Origin` header and are refused unless the response allows that origin.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
    origin: Option<String>,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Build the GET for `url`. Returns the origin that read-back must be
    /// checked against, if any.
    fn prepare(&self, url: &str, mode: CorsMode) -> (reqwest::RequestBuilder, Option<&str>) {
        let mut request = self.client.get(url);
        let cors_origin = match mode {
            CorsMode::Anonymous => self.origin.as_deref(),
            CorsMode::Omit => None,
        };
        if let Some(origin) = cors_origin {
            request = request.header(reqwest::header::ORIGIN, origin);
        }
        (request, cors_origin)
    }

    fn allows_read_back(headers: &reqwest::header::HeaderMap, origin: &str) -> bool {
        headers
            .get(reqwest::header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|allowed| allowed == "*" || allowed == origin)
    }
}

#[cfg(feature = "http")]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, mode: CorsMode) -> Result<Vec<u8>, FetchError> {
        let (request, cors_origin) = self.prepare(url, mode);
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http { url: url.to_string(), status: status.as_u16() });
        }
        if let Some(origin) = cors_origin {
            if !Self::allows_read_back(response.headers(), origin) {
                return Err(FetchError::ReadBackDenied { url: url.to_string() });
            }
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Dispatches `http(s)://` URLs to [`HttpFetcher`] and everything else to [`FileFetcher`].
#[derive(Debug, Clone, Default)]
pub struct UrlFetcher {
    files: FileFetcher,
    #[cfg(feature = "http")]
    http: HttpFetcher,
}

impl UrlFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(feature = "http")]
    pub fn with_http(mut self, http: HttpFetcher) -> Self {
        self.http = http;
        self
    }
}

impl ImageFetcher for UrlFetcher {
    async fn fetch(&self, url: &str, mode: CorsMode) -> Result<Vec<u8>, FetchError> {
        #[cfg(feature = "http")]
        {
            if url.starts_with("http://") || url.starts_with("https://") {
                return self.http.fetch(url, mode).await;
            }
        }
        self.files.fetch(url, mode).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Mutex;

    pub(crate) fn png_bytes(image: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode fixture");
        bytes
    }

    /// In-memory fetcher; URLs listed in `deny_anonymous` refuse read-back
    /// in anonymous mode, URLs in `deny_always` refuse it in every mode.
    #[derive(Default)]
    pub(crate) struct MemoryFetcher {
        pub files: HashMap<String, Vec<u8>>,
        pub deny_anonymous: Vec<String>,
        pub deny_always: Vec<String>,
        pub calls: Mutex<Vec<(String, CorsMode)>>,
    }

    impl MemoryFetcher {
        pub fn with(mut self, url: &str, image: &RgbaImage) -> Self {
            self.files.insert(url.to_string(), png_bytes(image));
            self
        }
    }

    impl ImageFetcher for MemoryFetcher {
        async fn fetch(&self, url: &str, mode: CorsMode) -> Result<Vec<u8>, FetchError> {
            self.calls.lock().unwrap().push((url.to_string(), mode));
            let denied = self.deny_always.iter().any(|u| u == url)
                || (mode == CorsMode::Anonymous && self.deny_anonymous.iter().any(|u| u == url));
            if denied {
                return Err(FetchError::ReadBackDenied { url: url.to_string() });
            }
            self.files
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Http { url: url.to_string(), status: 404 })
        }
    }

    fn solid(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(color))
    }

    #[test]
    fn sample_color_averages_neighborhood() {
        let mut img = solid(3, 3, [0, 0, 0, 255]);
        img.put_pixel(1, 1, Rgba([90, 180, 9, 255]));
        let color = sample_color(&img, 1, 1, 1);
        assert_eq!(color, Rgb([10, 20, 1]));
    }

    #[test]
    fn sample_color_clamps_out_of_bounds_center() {
        let mut img = solid(4, 4, [0, 0, 0, 255]);
        img.put_pixel(3, 3, Rgba([200, 100, 40, 255]));
        // Clamped to (3, 3); only the 2x2 corner neighborhood is in bounds.
        let color = sample_color(&img, 50, 50, 1);
        assert_eq!(color, Rgb([50, 25, 10]));
        let single = sample_color(&img, 50, 50, 0);
        assert_eq!(single, Rgb([200, 100, 40]));
    }

    #[test]
    fn remaps_when_resolutions_differ() {
        let original = solid(200, 100, [255, 0, 0, 255]);
        let processed = solid(100, 50, [0, 0, 0, 0]);
        let pair = RasterPair::new(original, processed);
        assert!(!pair.same_resolution());
        assert_eq!(pair.canvas_dimensions(), (100, 50));
        assert_eq!(pair.to_original(0, 0), (0, 0));
        assert_eq!(pair.to_original(50, 25), (100, 50));
        assert_eq!(pair.to_original(99, 49), (198, 98));
    }

    #[tokio::test]
    async fn loads_both_images() {
        let fetcher = MemoryFetcher::default()
            .with("orig.png", &solid(8, 8, [255, 0, 0, 255]))
            .with("proc.png", &solid(8, 8, [0, 0, 0, 0]));
        let pair = SourceLoader::new(fetcher).load("orig.png", "proc.png").await.unwrap();
        assert!(!pair.is_tainted());
        assert_eq!(pair.original().get_pixel(4, 4), &Rgba([255, 0, 0, 255]));
        assert_eq!(pair.processed().get_pixel(4, 4), &Rgba([0, 0, 0, 0]));
    }

    #[tokio::test]
    async fn missing_source_fails_the_whole_load() {
        let fetcher = MemoryFetcher::default().with("orig.png", &solid(8, 8, [255, 0, 0, 255]));
        let err = SourceLoader::new(fetcher).load("orig.png", "missing.png").await.unwrap_err();
        assert!(matches!(err, LoadError::Fetch { ref url, .. } if url == "missing.png"));
        assert!(!err.is_cross_origin());
    }

    #[tokio::test]
    async fn undecodable_bytes_are_a_decode_error() {
        let mut fetcher = MemoryFetcher::default().with("orig.png", &solid(8, 8, [255, 0, 0, 255]));
        fetcher.files.insert("proc.png".into(), b"not an image".to_vec());
        let err = SourceLoader::new(fetcher).load("orig.png", "proc.png").await.unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[tokio::test]
    async fn denied_read_back_retries_without_cors_and_taints() {
        let mut fetcher = MemoryFetcher::default()
            .with("orig.png", &solid(8, 8, [255, 0, 0, 255]))
            .with("proc.png", &solid(8, 8, [0, 0, 0, 0]));
        fetcher.deny_anonymous.push("orig.png".into());
        let loader = SourceLoader::new(fetcher);
        let pair = loader.load("orig.png", "proc.png").await.unwrap();
        assert!(pair.is_tainted());

        let calls = loader.fetcher().calls.lock().unwrap().clone();
        assert!(calls.contains(&("orig.png".to_string(), CorsMode::Omit)));
        assert!(!calls.contains(&("proc.png".to_string(), CorsMode::Omit)));
    }

    #[tokio::test]
    async fn unrecoverable_denial_is_distinguished() {
        let mut fetcher = MemoryFetcher::default()
            .with("orig.png", &solid(8, 8, [255, 0, 0, 255]))
            .with("proc.png", &solid(8, 8, [0, 0, 0, 0]));
        fetcher.deny_always.push("proc.png".into());
        let err = SourceLoader::new(fetcher).load("orig.png", "proc.png").await.unwrap_err();
        assert!(matches!(err, LoadError::CrossOrigin { .. }));
        assert!(err.is_cross_origin());
    }

    #[tokio::test]
    async fn file_fetcher_reports_missing_files() {
        let err = FileFetcher
            .fetch("file:///definitely/not/here.png", CorsMode::Anonymous)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Io(_)));
    }

    #[cfg(feature = "http")]
    fn allow_origin(value: &str) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCESS_CONTROL_ALLOW_ORIGIN,
            reqwest::header::HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[cfg(feature = "http")]
    #[test]
    fn read_back_follows_allow_origin_header() {
        let origin = "https://studio.example";
        assert!(HttpFetcher::allows_read_back(&allow_origin("*"), origin));
        assert!(HttpFetcher::allows_read_back(&allow_origin(origin), origin));
        assert!(!HttpFetcher::allows_read_back(&allow_origin("https://cdn.example"), origin));
        assert!(!HttpFetcher::allows_read_back(&reqwest::header::HeaderMap::new(), origin));
    }

    #[cfg(feature = "http")]
    #[test]
    fn read_back_rejects_near_miss_origins() {
        let origin = "https://studio.example";
        assert!(!HttpFetcher::allows_read_back(&allow_origin("https://studio.example:8443"), origin));
        assert!(!HttpFetcher::allows_read_back(&allow_origin("http://studio.example"), origin));
        assert!(!HttpFetcher::allows_read_back(&allow_origin(""), origin));
    }

    #[cfg(feature = "http")]
    #[test]
    fn origin_header_is_sent_only_in_anonymous_mode() {
        let url = "https://cdn.example/item.png";
        let fetcher = HttpFetcher::new().with_origin("https://studio.example");

        let (request, check) = fetcher.prepare(url, CorsMode::Anonymous);
        let request = request.build().unwrap();
        assert_eq!(request.headers()[reqwest::header::ORIGIN], "https://studio.example");
        assert_eq!(check, Some("https://studio.example"));

        let (request, check) = fetcher.prepare(url, CorsMode::Omit);
        assert!(request.build().unwrap().headers().get(reqwest::header::ORIGIN).is_none());
        assert_eq!(check, None);

        let default_fetcher = HttpFetcher::new();
        let (request, check) = default_fetcher.prepare(url, CorsMode::Anonymous);
        assert!(request.build().unwrap().headers().get(reqwest::header::ORIGIN).is_none());
        assert_eq!(check, None);
    }
}
