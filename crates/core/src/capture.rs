//! Frame capture pass: one decode context, tags visited in playback order.

use tracing::{debug, info, warn};

use crate::{
    config::{CaptureConfig, ResolverConfig, url_host_matches},
    error::{CaptureError, SkipReason},
    media::{MediaBackend, MediaSource},
    proxy::Proxy,
    types::{CapturedFrame, FrameOutcome, Tag},
};

pub struct FrameCapturer<B: MediaBackend> {
    backend: B,
    config: CaptureConfig,
    proxy: Proxy,
    proxied_media_domains: Vec<String>,
}

impl<B: MediaBackend> FrameCapturer<B> {
    pub fn new(backend: B, config: CaptureConfig, resolver: &ResolverConfig) -> Self {
        Self {
            backend,
            config,
            proxy: Proxy::new(resolver.proxy_base.clone()),
            proxied_media_domains: resolver.proxied_media_domains.clone(),
        }
    }

    /// Wrap media from hosts without permissive CORS in the proxy, once.
    pub fn prepare_media_url(&self, media_url: &str) -> String {
        if !self.proxy.is_wrapped(media_url)
            && url_host_matches(media_url, &self.proxied_media_domains)
        {
            return self.proxy.wrap(media_url);
        }
        media_url.to_string()
    }

    /// Capture every tag and keep only the frames that succeeded.
    pub async fn capture_frames(
        &self,
        media_url: &str,
        tags: &[Tag],
        on_progress: impl FnMut(usize, usize),
    ) -> Result<Vec<CapturedFrame>, CaptureError> {
        let outcomes = self.capture_outcomes(media_url, tags, on_progress).await?;
        Ok(outcomes
            .into_iter()
            .filter_map(|outcome| outcome.result.ok())
            .collect())
    }

    /// Capture every tag, ascending by timestamp, reporting each tag's outcome.
    ///
    /// `on_progress(done, total)` fires before each seek, so it counts attempts
    /// started, not successes.
    pub async fn capture_outcomes(
        &self,
        media_url: &str,
        tags: &[Tag],
        mut on_progress: impl FnMut(usize, usize),
    ) -> Result<Vec<FrameOutcome>, CaptureError> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.prepare_media_url(media_url);
        let mut source = self.backend.open(&url);
        let meta = source.load_metadata().await?;
        info!(
            tags = tags.len(),
            width = meta.width,
            height = meta.height,
            "Starting capture pass"
        );

        let mut sorted: Vec<&Tag> = tags.iter().collect();
        sorted.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let total = sorted.len();
        let mut outcomes = Vec::with_capacity(total);

        for (i, tag) in sorted.into_iter().enumerate() {
            on_progress(i + 1, total);

            let result = self.capture_one(&mut source, tag).await;
            if let Err(reason) = &result {
                warn!(timestamp = tag.timestamp, tag_id = %tag.id, %reason, "Frame capture failed, skipping");
            }

            outcomes.push(FrameOutcome {
                tag_id: tag.id.clone(),
                timestamp: tag.timestamp,
                result,
            });
        }

        let captured = outcomes.iter().filter(|o| o.result.is_ok()).count();
        info!(captured, total, "Capture pass finished");

        Ok(outcomes)
    }

    async fn capture_one(
        &self,
        source: &mut B::Source,
        tag: &Tag,
    ) -> Result<CapturedFrame, SkipReason> {
        // Either the seek lands or the timeout fires; both proceed to capture.
        if tokio::time::timeout(self.config.seek_timeout, source.seek_to(tag.timestamp))
            .await
            .is_err()
        {
            warn!(
                timestamp = tag.timestamp,
                timeout = ?self.config.seek_timeout,
                "Seek did not complete in time, capturing current frame"
            );
        }

        let jpeg = source
            .current_frame_as_image(self.config.jpeg_quality)
            .await?;
        debug!(timestamp = tag.timestamp, bytes = jpeg.len(), "Frame captured");

        Ok(CapturedFrame::from_jpeg(tag, &jpeg))
    }
}
