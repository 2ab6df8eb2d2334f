//! Storyboard art, caption and cover generation from captured frames.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::{
    data_uri::DataUri,
    error::GenerationError,
    provider::{Provider, ProviderSettings},
    types::{Caption, CapturedFrame, GeneratedArt},
};

pub const DEFAULT_STORYBOARD_INSTRUCTION: &str = "Redraw these frames as one cute hand-drawn \
storyboard that walks through the whole process. Keep the shapes of the main subjects recognizable. \
Number every step and give it a short caption; apart from essential ingredients and actions, add no \
other text. Keep each step panel self-contained, separated from the others by clear white space.";

fn captions_prompt(lang: &str, platform: &str) -> String {
    format!(
        r#"Based on the given images, write 3 promotional captions for {platform} in 3 different styles.

IMPORTANT: Write ALL text in {lang} language.

Styles:
1. Emotional / story-driven (warm, comforting).
2. Practical tutorial (clear, step by step).
3. Short and punchy (with emoji, eye-catching).

Return ONLY a JSON array, no markdown code fences, in exactly this shape:
[
  {{ "title": "Title 1", "content": "Caption 1..." }},
  {{ "title": "Title 2", "content": "Caption 2..." }},
  {{ "title": "Title 3", "content": "Caption 3..." }}
]"#
    )
}

struct FrameImage<'a> {
    mime_type: &'a str,
    base64: &'a str,
    data_uri: &'a str,
}

fn frame_images(frames: &[CapturedFrame]) -> Result<Vec<FrameImage<'_>>, GenerationError> {
    let images: Vec<FrameImage<'_>> = frames
        .iter()
        .filter_map(|frame| match DataUri::split(&frame.data) {
            Some((mime_type, base64)) => Some(FrameImage {
                mime_type,
                base64,
                data_uri: &frame.data,
            }),
            None => {
                warn!(tag_id = %frame.tag_id, "Frame has no image payload, leaving it out");
                None
            }
        })
        .collect();

    if images.is_empty() {
        return Err(GenerationError::NoFrames);
    }
    Ok(images)
}

fn gemini_body(prompt: &str, images: &[FrameImage<'_>], mut generation_config: Value) -> Value {
    let mut parts = vec![json!({ "text": prompt })];
    parts.extend(images.iter().map(|img| {
        json!({ "inline_data": { "mime_type": img.mime_type, "data": img.base64 } })
    }));

    if generation_config.is_null() {
        generation_config = json!({});
    }

    json!({
        "contents": [{ "parts": parts }],
        "generationConfig": generation_config,
    })
}

fn openai_body(model: &str, prompt: &str, images: &[FrameImage<'_>], use_thinking: bool) -> Value {
    let mut content = vec![json!({ "type": "input_text", "text": prompt })];
    content.extend(
        images
            .iter()
            .map(|img| json!({ "type": "input_image", "image_url": img.data_uri })),
    );

    let mut body = json!({
        "model": model,
        "input": [{ "role": "user", "content": content }],
    });
    if use_thinking {
        body["reasoning"] = json!({ "effort": "high" });
    }
    body
}

async fn post_json(
    request: reqwest::RequestBuilder,
    body: &Value,
    model: &str,
) -> Result<Value, GenerationError> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await?;

    let status = response.status();
    if status == reqwest::StatusCode::FORBIDDEN {
        return Err(GenerationError::PermissionDenied {
            model: model.to_string(),
        });
    }
    if !status.is_success() {
        return Err(GenerationError::Api {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    Ok(response.json::<Value>().await?)
}

async fn call(
    settings: &ProviderSettings,
    model: &str,
    body: Value,
) -> Result<Value, GenerationError> {
    let api_key = settings.api_key()?;
    let client = reqwest::Client::new();
    let base = settings.base_url();

    let request = match settings.provider {
        Provider::Gemini => client
            .post(format!("{}/models/{}:generateContent", base, model))
            .header("x-goog-api-key", api_key),
        Provider::Openai => client
            .post(format!("{}/responses", base))
            .header("Authorization", format!("Bearer {}", api_key)),
    };

    post_json(request, &body, model).await
}

/// Picture layout requested from the image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArtShape {
    /// Wide storyboard sheet.
    Landscape,
    /// Feed-style cover.
    Portrait,
}

impl ArtShape {
    fn gemini_aspect_ratio(self) -> &'static str {
        match self {
            ArtShape::Landscape => "16:9",
            ArtShape::Portrait => "3:4",
        }
    }

    fn openai_size(self) -> &'static str {
        match self {
            ArtShape::Landscape => "1536x1024",
            ArtShape::Portrait => "1024x1536",
        }
    }
}

fn cover_prompt(caption: &Caption) -> String {
    format!(
        r#"Design an eye-catching cover image for a short video post, based on these frames.

The post is titled "{title}". Put that title on the cover in large, bold, legible lettering.
Use the following caption only as context for the mood; do not write it on the image:

{content}

Keep the main subject from the frames recognizable and make it fill most of the picture."#,
        title = caption.title,
        content = caption.content,
    )
}

fn art_request(
    settings: &ProviderSettings,
    model: &str,
    prompt: &str,
    images: &[FrameImage<'_>],
    shape: ArtShape,
) -> Value {
    match settings.provider {
        Provider::Gemini => {
            let mut config = json!({
                "responseModalities": ["TEXT", "IMAGE"],
                "imageConfig": { "aspectRatio": shape.gemini_aspect_ratio(), "imageSize": "2K" },
            });
            if settings.use_thinking {
                config["thinkingConfig"] = json!({ "includeThoughts": true });
            }
            gemini_body(prompt, images, config)
        }
        Provider::Openai => {
            let mut body = openai_body(model, prompt, images, settings.use_thinking);
            body["tools"] = json!([{ "type": "image_generation", "size": shape.openai_size() }]);
            body
        }
    }
}

async fn generate_art(
    settings: &ProviderSettings,
    images: &[FrameImage<'_>],
    prompt: &str,
    shape: ArtShape,
) -> Result<GeneratedArt, GenerationError> {
    let model = settings.provider.config().image_model;
    let body = art_request(settings, model, prompt, images, shape);
    let response = call(settings, model, body).await?;

    match settings.provider {
        Provider::Gemini => parse_gemini_art(&response),
        Provider::Openai => parse_openai_art(&response),
    }
}

/// Ask the image model to turn the frames into one storyboard picture.
///
/// Models sometimes answer with prose instead of a picture; that comes back as
/// `GeneratedArt::Text`.
pub async fn generate_storyboard(
    settings: &ProviderSettings,
    frames: &[CapturedFrame],
    instruction: Option<&str>,
) -> Result<GeneratedArt, GenerationError> {
    let images = frame_images(frames)?;
    let prompt = instruction.unwrap_or(DEFAULT_STORYBOARD_INSTRUCTION);

    info!(
        provider = settings.provider.name(),
        model = settings.provider.config().image_model,
        frames = images.len(),
        "Generating storyboard"
    );

    generate_art(settings, &images, prompt, ArtShape::Landscape).await
}

/// Ask the image model for a portrait cover titled after the chosen caption.
pub async fn generate_cover(
    settings: &ProviderSettings,
    frames: &[CapturedFrame],
    caption: &Caption,
) -> Result<GeneratedArt, GenerationError> {
    let images = frame_images(frames)?;

    info!(
        provider = settings.provider.name(),
        model = settings.provider.config().image_model,
        title = %caption.title,
        "Generating cover"
    );

    generate_art(settings, &images, &cover_prompt(caption), ArtShape::Portrait).await
}

/// Ask the text model for three social-media captions in `lang`.
pub async fn generate_captions(
    settings: &ProviderSettings,
    frames: &[CapturedFrame],
    lang: &str,
    platform: &str,
) -> Result<Vec<Caption>, GenerationError> {
    let images = frame_images(frames)?;
    let prompt = captions_prompt(lang, platform);
    let model = settings.provider.config().text_model;

    info!(provider = settings.provider.name(), model, lang, "Generating captions");

    let text = match settings.provider {
        Provider::Gemini => {
            let mut config = json!({ "responseMimeType": "application/json" });
            if settings.use_thinking {
                config["thinkingConfig"] = json!({ "includeThoughts": true });
            }
            let response = call(settings, model, gemini_body(&prompt, &images, config)).await?;
            gemini_text(&response)
        }
        Provider::Openai => {
            let body = openai_body(model, &prompt, &images, settings.use_thinking);
            let response = call(settings, model, body).await?;
            openai_text(&response)
        }
    };

    let text = text
        .filter(|t| !t.trim().is_empty())
        .ok_or(GenerationError::EmptyResponse)?;
    debug!(chars = text.len(), "Caption response received");

    Ok(parse_captions(&text))
}

fn gemini_parts(response: &Value) -> &[Value] {
    response["candidates"][0]["content"]["parts"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Concatenated answer text, thought summaries excluded.
pub fn gemini_text(response: &Value) -> Option<String> {
    let text: String = gemini_parts(response)
        .iter()
        .filter(|p| p["thought"] != Value::Bool(true))
        .filter_map(|p| p["text"].as_str())
        .collect();
    (!text.is_empty()).then_some(text)
}

pub fn parse_gemini_art(response: &Value) -> Result<GeneratedArt, GenerationError> {
    for part in gemini_parts(response) {
        let inline = if part["inlineData"].is_object() {
            &part["inlineData"]
        } else {
            &part["inline_data"]
        };

        if let Some(data) = inline["data"].as_str() {
            let mime_type = inline["mimeType"]
                .as_str()
                .or_else(|| inline["mime_type"].as_str())
                .unwrap_or("image/png");
            return decode_image(mime_type, data);
        }
    }

    gemini_text(response)
        .map(GeneratedArt::Text)
        .ok_or(GenerationError::EmptyResponse)
}

/// Text of the last `message` item in a `/v1/responses` payload.
pub fn openai_text(response: &Value) -> Option<String> {
    response["output"]
        .as_array()
        .and_then(|arr| arr.iter().rev().find(|item| item["type"] == "message"))
        .and_then(|msg| msg["content"][0]["text"].as_str())
        .map(str::to_string)
}

pub fn parse_openai_art(response: &Value) -> Result<GeneratedArt, GenerationError> {
    let image = response["output"].as_array().and_then(|arr| {
        arr.iter()
            .filter(|item| item["type"] == "image_generation_call")
            .find_map(|item| item["result"].as_str())
    });

    if let Some(data) = image {
        return decode_image("image/png", data);
    }

    openai_text(response)
        .map(GeneratedArt::Text)
        .ok_or(GenerationError::EmptyResponse)
}

fn decode_image(mime_type: &str, data: &str) -> Result<GeneratedArt, GenerationError> {
    let data = BASE64
        .decode(data)
        .map_err(|e| GenerationError::InvalidResponse {
            reason: format!("image payload is not base64: {}", e),
        })?;
    Ok(GeneratedArt::Image {
        mime_type: mime_type.to_string(),
        data,
    })
}

/// Parse the caption array; a reply that is not a JSON array becomes one caption
/// holding the raw text.
pub fn parse_captions(text: &str) -> Vec<Caption> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    match serde_json::from_str::<Vec<Caption>>(unfenced) {
        Ok(captions) => captions,
        Err(e) => {
            warn!(error = %e, "Caption reply is not a JSON array, keeping raw text");
            vec![Caption {
                title: "Result".to_string(),
                content: trimmed.to_string(),
            }]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames() -> Vec<CapturedFrame> {
        vec![CapturedFrame {
            tag_id: "t1".into(),
            timestamp: 1.0,
            data: DataUri::encode("image/jpeg", b"jpg"),
        }]
    }

    fn caption() -> Caption {
        Caption {
            title: "Five minute noodles".into(),
            content: "Quick, cosy and cheap.".into(),
        }
    }

    #[test]
    fn cover_prompt_uses_the_caption() {
        let prompt = cover_prompt(&caption());
        assert!(prompt.contains(r#"titled "Five minute noodles""#));
        assert!(prompt.contains("Quick, cosy and cheap."));
    }

    #[test]
    fn cover_requests_are_portrait() {
        let frames = frames();
        let images = frame_images(&frames).unwrap();

        let gemini = ProviderSettings::new(Provider::Gemini);
        let body = art_request(&gemini, "m", "p", &images, ArtShape::Portrait);
        assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "3:4");
        assert_eq!(body["generationConfig"]["responseModalities"][1], "IMAGE");

        let openai = ProviderSettings::new(Provider::Openai);
        let body = art_request(&openai, "gpt-5.1", "p", &images, ArtShape::Portrait);
        assert_eq!(body["tools"][0]["size"], "1024x1536");
        assert!(body.get("reasoning").is_none());
    }

    #[test]
    fn storyboard_requests_are_landscape() {
        let frames = frames();
        let images = frame_images(&frames).unwrap();
        let settings = ProviderSettings {
            use_thinking: true,
            ..ProviderSettings::new(Provider::Gemini)
        };

        let body = art_request(&settings, "m", "p", &images, ArtShape::Landscape);
        let config = &body["generationConfig"];
        assert_eq!(config["imageConfig"]["aspectRatio"], "16:9");
        assert_eq!(config["thinkingConfig"]["includeThoughts"], true);
    }

    #[tokio::test]
    async fn cover_without_frames_is_rejected_before_any_request() {
        let settings = ProviderSettings::new(Provider::Gemini);
        let result = generate_cover(&settings, &[], &caption()).await;
        assert!(matches!(result, Err(GenerationError::NoFrames)));
    }

    #[test]
    fn cover_reply_with_only_inline_image_snake_case_is_decoded() {
        let response = json!({
            "candidates": [{ "content": { "parts": [
                { "inline_data": { "mime_type": "image/png", "data": "Y292ZXI=" } }
            ]}}]
        });
        let art = parse_gemini_art(&response).unwrap();
        assert_eq!(
            art,
            GeneratedArt::Image {
                mime_type: "image/png".into(),
                data: b"cover".to_vec()
            }
        );
        assert_eq!(art.extension(), "png");
    }

    #[test]
    fn openai_text_only_reply_is_reported_as_text() {
        let response = json!({
            "output": [
                { "type": "message", "content": [{ "type": "output_text", "text": "No image today." }] }
            ]
        });
        assert_eq!(
            parse_openai_art(&response).unwrap(),
            GeneratedArt::Text("No image today.".into())
        );
    }

    #[test]
    fn gemini_body_inlines_every_frame() {
        let frames = frames();
        let images = frame_images(&frames).unwrap();
        let body = gemini_body("draw", &images, Value::Null);

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], "draw");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], "anBn");
        assert!(body["generationConfig"].is_object());
    }

    #[test]
    fn openai_body_sends_data_uris() {
        let frames = frames();
        let images = frame_images(&frames).unwrap();
        let body = openai_body("gpt-5.1", "draw", &images, true);

        let content = body["input"][0]["content"].as_array().unwrap();
        assert_eq!(content[1]["type"], "input_image");
        assert_eq!(content[1]["image_url"], frames[0].data.as_str());
        assert_eq!(body["reasoning"]["effort"], "high");
    }

    #[test]
    fn frames_without_payload_are_not_sent() {
        let frames = vec![CapturedFrame {
            tag_id: "t".into(),
            timestamp: 0.0,
            data: "broken".into(),
        }];
        assert!(matches!(frame_images(&frames), Err(GenerationError::NoFrames)));
    }

    #[test]
    fn gemini_image_part_wins() {
        let response = json!({
            "candidates": [{ "content": { "parts": [
                { "text": "thinking...", "thought": true },
                { "text": "Here you go" },
                { "inlineData": { "mimeType": "image/jpeg", "data": "aW1n" } }
            ]}}]
        });

        let art = parse_gemini_art(&response).unwrap();
        assert_eq!(
            art,
            GeneratedArt::Image {
                mime_type: "image/jpeg".into(),
                data: b"img".to_vec()
            }
        );
        assert_eq!(art.extension(), "jpg");
    }

    #[test]
    fn gemini_text_only_reply_is_reported_as_text() {
        let response = json!({
            "candidates": [{ "content": { "parts": [
                { "text": "plan", "thought": true },
                { "text": "I cannot draw that." }
            ]}}]
        });
        assert_eq!(
            parse_gemini_art(&response).unwrap(),
            GeneratedArt::Text("I cannot draw that.".into())
        );
    }

    #[test]
    fn empty_gemini_reply_is_an_error() {
        assert!(matches!(
            parse_gemini_art(&json!({ "candidates": [] })),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[test]
    fn openai_image_generation_call_is_decoded() {
        let response = json!({
            "output": [
                { "type": "reasoning", "summary": [] },
                { "type": "image_generation_call", "result": "cG5n" },
                { "type": "message", "content": [{ "type": "output_text", "text": "done" }] }
            ]
        });
        assert_eq!(
            parse_openai_art(&response).unwrap(),
            GeneratedArt::Image {
                mime_type: "image/png".into(),
                data: b"png".to_vec()
            }
        );
        assert_eq!(openai_text(&response).as_deref(), Some("done"));
    }

    #[test]
    fn captions_parse_from_fenced_json() {
        let text = "```json\n[{\"title\": \"A\", \"content\": \"one\"}, {\"title\": \"B\", \"content\": \"two\"}]\n```";
        let captions = parse_captions(text);
        assert_eq!(captions.len(), 2);
        assert_eq!(captions[1].title, "B");
    }

    #[test]
    fn unparsable_captions_fall_back_to_raw_text() {
        let captions = parse_captions("  Just a plain caption  ");
        assert_eq!(
            captions,
            vec![Caption {
                title: "Result".into(),
                content: "Just a plain caption".into()
            }]
        );

        let captions = parse_captions(r#"{"title": "x", "content": "y"}"#);
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].title, "Result");
    }

    #[test]
    fn captions_prompt_names_language_and_platform() {
        let prompt = captions_prompt("zh-CN", "Xiaohongshu");
        assert!(prompt.contains("zh-CN"));
        assert!(prompt.contains("Xiaohongshu"));
        assert!(prompt.contains(r#"{ "title": "Title 1""#));
    }
}
