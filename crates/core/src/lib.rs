pub mod capture;
pub mod config;
pub mod data_uri;
pub mod error;
pub mod export;
pub mod ffmpeg;
pub mod format;
pub mod generation;
pub mod media;
pub mod provider;
pub mod proxy;
pub mod resolver;
pub mod session;
pub mod types;

pub use capture::FrameCapturer;
pub use config::{CaptureConfig, Config, ResolverConfig};
pub use error::{
    CaptureError, GenerationError, PackageError, ResolutionError, Result, SkipReason,
    StoryframeError,
};
pub use export::{frame_file_name, package_frames, write_archive};
pub use ffmpeg::FfmpegBackend;
pub use format::{format_time, parse_timestamp};
pub use generation::{generate_captions, generate_cover, generate_storyboard};
pub use media::{MediaBackend, MediaMetadata, MediaSource};
pub use provider::{Provider, ProviderConfig, ProviderSettings};
pub use resolver::{LinkResolver, extract_url};
pub use session::Session;
pub use types::{Caption, CapturedFrame, FrameOutcome, GeneratedArt, ResolvedSource, Tag};
