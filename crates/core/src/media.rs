use async_trait::async_trait;

use crate::error::{CaptureError, SkipReason};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaMetadata {
    pub width: u32,
    pub height: u32,
    pub duration: Option<f64>,
}

/// A single decode context plus the raster it draws into.
///
/// One source is owned by one capture pass; seeking is serial on it.
#[async_trait]
pub trait MediaSource: Send {
    /// Load enough of the media to know its picture size. Failure aborts the pass.
    async fn load_metadata(&mut self) -> Result<MediaMetadata, CaptureError>;

    /// Completes when the seek has landed. The caller races this against a timeout
    /// and may drop the future before it resolves.
    async fn seek_to(&mut self, seconds: f64);

    /// Encode the current picture as JPEG at `quality` (1-100).
    async fn current_frame_as_image(&mut self, quality: u8) -> Result<Vec<u8>, SkipReason>;
}

/// Opens media sources for a capture pass.
pub trait MediaBackend: Send + Sync {
    type Source: MediaSource;

    fn open(&self, url: &str) -> Self::Source;
}
