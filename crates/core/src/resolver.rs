//! Turns arbitrary pasted text into a directly playable media URL.
//!
//! Hosts expose their media through incompatible mechanisms, so resolution
//! branches on the host: short-video platform links go through a dedicated
//! parsing API, everything else is fetched through the proxy and scraped for
//! an embedded media reference.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::{
    config::{ResolverConfig, url_host_matches},
    error::ResolutionError,
    proxy::Proxy,
    types::ResolvedSource,
};

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[a-zA-Z0-9\-._~:/?#\[\]@!$&'()*+,;=%]+"#).expect("valid url regex")
});

static OG_VIDEO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta (?:name|property)="og:video" content="([^"]+)""#)
        .expect("valid og:video regex")
});

static MASTER_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""masterUrl":"([^"]+)""#).expect("valid masterUrl regex"));

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', ')'];

/// Find the first URL in `input`, minus sentence punctuation glued to its end.
pub fn extract_url(input: &str) -> Result<String, ResolutionError> {
    let found = URL_RE.find(input).ok_or(ResolutionError::NoUrl)?;
    let url = found.as_str().trim_end_matches(TRAILING_PUNCTUATION);
    if url.ends_with("://") {
        return Err(ResolutionError::NoUrl);
    }
    Ok(url.to_string())
}

/// Interpret the short-video API envelope `{ code, msg?, data?: [{ video_url, duration? }] }`.
pub fn parse_short_video_response(body: &str) -> Result<ResolvedSource, ResolutionError> {
    let json: serde_json::Value = serde_json::from_str(body)?;

    let first = json["data"].as_array().and_then(|items| items.first());
    let item = match (json["code"].as_i64(), first) {
        (Some(200), Some(item)) => item,
        _ => {
            return Err(ResolutionError::Upstream {
                message: json["msg"]
                    .as_str()
                    .filter(|m| !m.is_empty())
                    .unwrap_or("short video API parsing failed")
                    .to_string(),
            });
        }
    };

    let video_url = item["video_url"]
        .as_str()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ResolutionError::Upstream {
            message: "API returned success but no video URL found.".to_string(),
        })?;

    let url = match video_url.strip_prefix("http:") {
        Some(rest) => format!("https:{}", rest),
        None => video_url.to_string(),
    };

    Ok(ResolvedSource {
        url,
        duration: item["duration"].as_f64(),
    })
}

/// Search page HTML for an Open-Graph video tag, then for an escaped `masterUrl` field.
pub fn scrape_media_url(html: &str) -> Result<String, ResolutionError> {
    if let Some(caps) = OG_VIDEO_RE.captures(html) {
        return Ok(caps[1].to_string());
    }

    if let Some(caps) = MASTER_URL_RE.captures(html) {
        let cleaned = caps[1].replace("\\u002F", "/").replace('\\', "");
        return Ok(cleaned);
    }

    Err(ResolutionError::NoMediaReference)
}

pub struct LinkResolver {
    client: reqwest::Client,
    config: ResolverConfig,
    proxy: Proxy,
}

impl LinkResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: ResolverConfig) -> Self {
        let proxy = Proxy::new(config.proxy_base.clone());
        Self {
            client,
            config,
            proxy,
        }
    }

    /// Resolve pasted text to a playable source. No retries; the first failure is returned.
    pub async fn resolve(&self, input: &str) -> Result<ResolvedSource, ResolutionError> {
        let target = extract_url(input)?;

        if url_host_matches(&target, &self.config.short_video_domains) {
            info!(url = %target, "Resolving through short video API");
            return self.resolve_short_video(&target).await;
        }

        info!(url = %target, "Scraping page for media URL");
        let html = self.fetch_text(&target).await?;
        let url = scrape_media_url(&html)?;
        debug!(media_url = %url, "Found media reference in page");

        Ok(ResolvedSource {
            url,
            duration: None,
        })
    }

    async fn resolve_short_video(&self, target: &str) -> Result<ResolvedSource, ResolutionError> {
        let api_url = format!(
            "{}?url={}&type=json",
            self.config.short_video_api,
            urlencoding::encode(target)
        );

        // Only the metadata call is proxied; the media host itself serves permissive CORS.
        let body = self.fetch_text(&api_url).await?;
        let source = parse_short_video_response(&body)?;
        debug!(media_url = %source.url, duration = ?source.duration, "Short video resolved");

        Ok(source)
    }

    async fn fetch_text(&self, url: &str) -> Result<String, ResolutionError> {
        let response = self.client.get(self.proxy.wrap(url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}
