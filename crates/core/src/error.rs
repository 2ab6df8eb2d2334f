use std::path::PathBuf;
use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("No URL found in the provided text")]
    NoUrl,

    #[error("Failed to parse short video link: {message}")]
    Upstream { message: String },

    #[error("Could not find video stream. Please check if the link is valid.")]
    NoMediaReference,

    #[error("Failed to fetch {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid resolution response: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to load video for capture ({url}): {reason}")]
    LoadFailed { url: String, reason: String },

    #[error("Video has no decodable picture ({url})")]
    NoVideoStream { url: String },
}

/// Why a single tag produced no frame. Never fails the whole pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    #[error("no frame available at the current position")]
    NoFrame,

    #[error("draw failed: {0}")]
    Draw(String),

    #[error("encode failed: {0}")]
    Encode(String),
}

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Frame at {timestamp}s is not a base64 data URI")]
    InvalidFrameData { timestamp: f64 },

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("No frames to send")]
    NoFrames,

    #[error("Access denied (403). Make sure your API key can use model {model}")]
    PermissionDenied { model: String },

    #[error("API request failed with HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Model returned no usable content")]
    EmptyResponse,

    #[error("Invalid API response: {reason}")]
    InvalidResponse { reason: String },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum StoryframeError {
    #[error("Timestamp must be a finite number of seconds >= 0, got {0}")]
    InvalidTimestamp(f64),

    #[error("Invalid timestamp {input:?}: expected SS, MM:SS or HH:MM:SS")]
    UnparsableTimestamp { input: String },

    #[error("Config error in {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoryframeError>;
