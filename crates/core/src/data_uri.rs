use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

/// A decoded `data:<mime>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl DataUri {
    pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
        format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
    }

    /// Splits a data URI into its mime type and raw base64 payload without decoding.
    pub fn split(uri: &str) -> Option<(&str, &str)> {
        let rest = uri.strip_prefix("data:")?;
        let (meta, payload) = rest.split_once(',')?;
        let mime_type = meta.strip_suffix(";base64")?;
        Some((mime_type, payload))
    }

    pub fn parse(uri: &str) -> Option<Self> {
        let (mime_type, payload) = Self::split(uri)?;
        let data = BASE64.decode(payload).ok()?;
        Some(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }
}
