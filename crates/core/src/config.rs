use std::{path::Path, time::Duration};

use serde::Deserialize;
use tokio::fs;

use crate::error::{Result, StoryframeError};

pub const DEFAULT_PROXY_BASE: &str = "https://corsproxy.io/?";
pub const DEFAULT_SHORT_VIDEO_API: &str = "https://api.mir6.com/api/bzjiexi";
pub const DEFAULT_SEEK_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub resolver: ResolverConfig,
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Forwarding proxy, invoked as `<proxy_base><url-encoded target>`.
    pub proxy_base: String,
    pub short_video_api: String,
    /// Hosts resolved through the short-video API instead of page scraping.
    pub short_video_domains: Vec<String>,
    /// Media hosts without permissive CORS; their streams are proxied for capture.
    pub proxied_media_domains: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            proxy_base: DEFAULT_PROXY_BASE.to_string(),
            short_video_api: DEFAULT_SHORT_VIDEO_API.to_string(),
            short_video_domains: vec!["bilibili.com".into(), "b23.tv".into()],
            proxied_media_domains: vec!["bilivideo.com".into(), "hdslb.com".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    #[serde(rename = "seek_timeout_secs", deserialize_with = "deserialize_secs")]
    pub seek_timeout: Duration,
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            seek_timeout: DEFAULT_SEEK_TIMEOUT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

fn deserialize_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

impl Config {
    pub async fn load(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).await?;
        Self::from_json(&content).map_err(|e| StoryframeError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn from_json(content: &str) -> serde_json::Result<Config> {
        serde_json::from_str(content)
    }
}

/// True when `host` is `domain` or a subdomain of it.
pub fn host_matches(host: &str, domains: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    domains.iter().any(|domain| {
        let domain = domain.trim_start_matches('.').to_ascii_lowercase();
        host == domain || host.ends_with(&format!(".{}", domain))
    })
}

/// Host-based check for a full URL; unparsable URLs never match.
pub fn url_host_matches(url: &str, domains: &[String]) -> bool {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| host_matches(h, domains)))
        .unwrap_or(false)
}
