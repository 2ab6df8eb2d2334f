//! `MediaSource` backed by the ffmpeg/ffprobe binaries.
//!
//! Metadata comes from `ffprobe -of json`. A seek decodes exactly one RGB24
//! frame at the target into an in-memory raster at native resolution, and
//! the raster is JPEG-encoded on demand with the `image` crate.

use async_trait::async_trait;
use image::{RgbImage, codecs::jpeg::JpegEncoder};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{
    error::{CaptureError, SkipReason},
    media::{MediaBackend, MediaMetadata, MediaSource},
};

#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl MediaBackend for FfmpegBackend {
    type Source = FfmpegSource;

    fn open(&self, url: &str) -> FfmpegSource {
        FfmpegSource {
            url: url.to_string(),
            ffmpeg: self.ffmpeg.clone(),
            ffprobe: self.ffprobe.clone(),
            metadata: None,
            frame: None,
        }
    }
}

pub struct FfmpegSource {
    url: String,
    ffmpeg: String,
    ffprobe: String,
    metadata: Option<MediaMetadata>,
    frame: Option<RgbImage>,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -show_entries stream=width,height:format=duration -of json` output.
pub fn parse_probe_output(json: &str, url: &str) -> Result<MediaMetadata, CaptureError> {
    let probe: ProbeOutput =
        serde_json::from_str(json).map_err(|e| CaptureError::LoadFailed {
            url: url.to_string(),
            reason: format!("unreadable ffprobe output: {}", e),
        })?;

    let (width, height) = probe
        .streams
        .iter()
        .find_map(|s| match (s.width, s.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        })
        .ok_or_else(|| CaptureError::NoVideoStream {
            url: url.to_string(),
        })?;

    let duration = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    Ok(MediaMetadata {
        width,
        height,
        duration,
    })
}

/// `ffprobe` arguments for the first video stream's size and the container duration.
pub fn probe_args(url: &str) -> Vec<String> {
    [
        "-v",
        "error",
        "-select_streams",
        "v:0",
        "-show_entries",
        "stream=width,height:format=duration",
        "-of",
        "json",
        "-i",
        url,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// `ffmpeg` arguments that write exactly one rgb24 frame at `seconds` to stdout.
pub fn decode_args(url: &str, seconds: f64) -> Vec<String> {
    let seek = format!("{:.3}", seconds);
    [
        "-v",
        "error",
        "-noautorotate",
        "-ss",
        seek.as_str(),
        "-i",
        url,
        "-frames:v",
        "1",
        "-an",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>, SkipReason> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(frame)
        .map_err(|e| SkipReason::Encode(e.to_string()))?;
    Ok(buf)
}

impl FfmpegSource {
    async fn decode_frame(&self, seconds: f64, meta: MediaMetadata) -> Result<RgbImage, String> {
        let output = Command::new(&self.ffmpeg)
            .args(decode_args(&self.url, seconds))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| e.to_string())?;

        if !output.status.success() {
            return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
        }

        let received = output.stdout.len();
        RgbImage::from_raw(meta.width, meta.height, output.stdout).ok_or_else(|| {
            format!(
                "expected {}x{} rgb24 frame, got {} bytes",
                meta.width, meta.height, received
            )
        })
    }
}

#[async_trait]
impl MediaSource for FfmpegSource {
    async fn load_metadata(&mut self) -> Result<MediaMetadata, CaptureError> {
        let output = Command::new(&self.ffprobe)
            .args(probe_args(&self.url))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CaptureError::LoadFailed {
                url: self.url.clone(),
                reason: format!("could not run {}: {}", self.ffprobe, e),
            })?;

        if !output.status.success() {
            return Err(CaptureError::LoadFailed {
                url: self.url.clone(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let meta = parse_probe_output(&String::from_utf8_lossy(&output.stdout), &self.url)?;
        debug!(width = meta.width, height = meta.height, duration = ?meta.duration, "Media metadata loaded");
        self.metadata = Some(meta);
        Ok(meta)
    }

    async fn seek_to(&mut self, seconds: f64) {
        // A seek that times out or fails must not leave the previous picture behind.
        self.frame = None;

        let Some(meta) = self.metadata else {
            warn!("Seek requested before metadata was loaded");
            return;
        };

        match self.decode_frame(seconds, meta).await {
            Ok(frame) => self.frame = Some(frame),
            Err(reason) => debug!(seconds, %reason, "Frame decode failed"),
        }
    }

    async fn current_frame_as_image(&mut self, quality: u8) -> Result<Vec<u8>, SkipReason> {
        let frame = self.frame.clone().ok_or(SkipReason::NoFrame)?;
        tokio::task::spawn_blocking(move || encode_jpeg(&frame, quality))
            .await
            .map_err(|e| SkipReason::Encode(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_are_always_passed_as_inputs() {
        let probe = probe_args("-clip.mp4");
        assert_eq!(probe[probe.len() - 2], "-i");
        assert_eq!(probe[probe.len() - 1], "-clip.mp4");

        let decode = decode_args("-clip.mp4", 12.5);
        let input = decode.iter().position(|a| a == "-i").unwrap();
        assert_eq!(decode[input + 1], "-clip.mp4");
        assert_eq!(decode[input - 1], "12.500");
        assert_eq!(decode.last().map(String::as_str), Some("-"));
    }

    #[test]
    fn probe_output_yields_size_and_duration() {
        let json = r#"{
            "programs": [],
            "streams": [{"width": 1280, "height": 720}],
            "format": {"duration": "93.466000"}
        }"#;

        let meta = parse_probe_output(json, "v.mp4").unwrap();
        assert_eq!(meta.width, 1280);
        assert_eq!(meta.height, 720);
        assert_eq!(meta.duration, Some(93.466));
    }

    #[test]
    fn live_streams_have_no_duration() {
        let json = r#"{"streams": [{"width": 640, "height": 360}], "format": {"duration": "N/A"}}"#;
        assert_eq!(parse_probe_output(json, "live").unwrap().duration, None);
    }

    #[test]
    fn audio_only_media_is_a_load_error() {
        let json = r#"{"streams": [], "format": {"duration": "10.0"}}"#;
        assert!(matches!(
            parse_probe_output(json, "a.mp3"),
            Err(CaptureError::NoVideoStream { .. })
        ));
    }

    #[test]
    fn encodes_raster_as_jpeg() {
        let frame = RgbImage::from_pixel(16, 8, image::Rgb([200, 30, 30]));
        let jpeg = encode_jpeg(&frame, 85).unwrap();
        assert_eq!(&jpeg[..2], &[0xff, 0xd8]);
    }

    #[tokio::test]
    async fn frame_is_unavailable_before_any_seek() {
        let mut source = FfmpegBackend::default().open("unused.mp4");
        assert_eq!(
            source.current_frame_as_image(85).await,
            Err(SkipReason::NoFrame)
        );
    }
}
