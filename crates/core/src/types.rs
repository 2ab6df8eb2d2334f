use serde::{Deserialize, Serialize};

use crate::{data_uri::DataUri, error::SkipReason};

/// A user-marked timestamp of interest in a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub created_at: i64,
}

/// A still image captured at a tag's timestamp.
///
/// `tag_id` refers to the tag, it does not own it. `data` is an encoded image
/// carried as a `data:` URI so it can be handed to the generation calls as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedFrame {
    pub tag_id: String,
    pub timestamp: f64,
    pub data: String,
}

impl CapturedFrame {
    pub fn from_jpeg(tag: &Tag, jpeg: &[u8]) -> Self {
        Self {
            tag_id: tag.id.clone(),
            timestamp: tag.timestamp,
            data: DataUri::encode("image/jpeg", jpeg),
        }
    }

    pub fn image(&self) -> Option<DataUri> {
        DataUri::parse(&self.data)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSource {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Result of capturing one tag. Kept separate from the filtered frame list so
/// skips stay observable.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub tag_id: String,
    pub timestamp: f64,
    pub result: std::result::Result<CapturedFrame, SkipReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedArt {
    Image { mime_type: String, data: Vec<u8> },
    Text(String),
}

impl GeneratedArt {
    /// File extension matching the image mime type.
    pub fn extension(&self) -> &'static str {
        match self {
            GeneratedArt::Image { mime_type, .. } => match mime_type.as_str() {
                "image/jpeg" | "image/jpg" => "jpg",
                "image/webp" => "webp",
                _ => "png",
            },
            GeneratedArt::Text(_) => "txt",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_serializes_with_camel_case_fields() {
        let tag = Tag {
            id: "a1".into(),
            timestamp: 1.5,
            label: None,
            created_at: 1_700_000_000_000,
        };

        let value = serde_json::to_value(&tag).unwrap();
        assert_eq!(value["createdAt"], 1_700_000_000_000i64);
        assert!(value.get("label").is_none());
    }

    #[test]
    fn captured_frame_keeps_tag_identity() {
        let tag = Tag {
            id: "tag-7".into(),
            timestamp: 12.25,
            label: Some("intro".into()),
            created_at: 0,
        };

        let frame = CapturedFrame::from_jpeg(&tag, &[0xff, 0xd8, 0xff]);
        assert_eq!(frame.tag_id, "tag-7");
        assert_eq!(frame.timestamp, 12.25);
        assert!(frame.data.starts_with("data:image/jpeg;base64,"));
        assert_eq!(frame.image().unwrap().data, vec![0xff, 0xd8, 0xff]);
    }
}
