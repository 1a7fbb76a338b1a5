use thiserror::Error;

/// Failure while fetching the raw bytes of a source image.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Pixel read-back refused for {url}")]
    ReadBackDenied { url: String },

    #[error("HTTP {status} while fetching {url}")]
    Http { url: String, status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "http")]
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}

/// Failure while loading the original/processed pair.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Cross-origin read-back denied for {url}, even without credentials")]
    CrossOrigin { url: String },

    #[error("Image at {url} has no pixels")]
    EmptyImage { url: String },
}

impl LoadError {
    /// True when the failure came from cross-origin policy rather than the network or decoder.
    pub fn is_cross_origin(&self) -> bool {
        matches!(
            self,
            LoadError::CrossOrigin { .. }
                | LoadError::Fetch {
                    source: FetchError::ReadBackDenied { .. },
                    ..
                }
        )
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Canvas is tainted by a cross-origin source; pixels cannot be exported")]
    Tainted,

    #[error("Canvas has no pixels")]
    EmptyCanvas,

    #[error("Failed to encode canvas: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Save rejected: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Editor is not ready; sources are still loading or failed to load")]
    NotReady,
}

pub type Result<T> = std::result::Result<T, EditorError>;
