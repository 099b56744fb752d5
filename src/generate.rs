use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use ureq::Agent;

use crate::error::GenerationError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Kore";

// Inline images and PCM narration are returned base64-encoded in the JSON body.
const MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

/// The generative service that turns a scene's script into assets.
///
/// Implementations are called from worker threads and must be shareable.
pub trait AssetGenerator: Send + Sync {
    /// Returns an image URL: `http(s)://…` or a `data:<mime>;base64,…` URL.
    fn generate_image(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Returns the raw narration bytes for `text`.
    fn generate_narration(&self, text: &str) -> Result<Vec<u8>, GenerationError>;
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub api_base: String,
    pub image_model: String,
    pub tts_model: String,
    pub voice: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

impl GenerateContentResponse {
    fn first_inline_data(self) -> Option<InlineData> {
        self.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.inline_data)
    }
}

pub struct GeminiClient {
    agent: Agent,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(settings.timeout))
            .http_status_as_error(false)
            .build()
            .into();
        GeminiClient { agent, settings }
    }

    fn generate_content(
        &self,
        model: &str,
        body: serde_json::Value,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.settings.api_base, model);
        debug!("POST {url}");

        let mut response = self
            .agent
            .post(&url)
            .header("x-goog-api-key", self.settings.api_key.as_str())
            .header("Content-Type", "application/json")
            .send(body.to_string())?;

        let status = response.status();
        let text = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_string()?;

        if !status.is_success() {
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// Pull `error.message` out of an API error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error")?.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn data_url(inline: &InlineData) -> String {
    format!("data:{};base64,{}", inline.mime_type, inline.data)
}

impl AssetGenerator for GeminiClient {
    fn generate_image(&self, prompt: &str) -> Result<String, GenerationError> {
        info!("Generating image ({} chars of prompt)", prompt.len());
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": { "aspectRatio": "16:9" }
            }
        });
        let inline = self
            .generate_content(&self.settings.image_model, body)?
            .first_inline_data()
            .ok_or(GenerationError::MissingPayload("image"))?;
        Ok(data_url(&inline))
    }

    fn generate_narration(&self, text: &str) -> Result<Vec<u8>, GenerationError> {
        info!("Generating narration ({} chars)", text.len());
        let body = json!({
            "contents": [{ "parts": [{ "text": format!("Say warmly and clearly: {text}") }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": self.settings.voice }
                    }
                }
            }
        });
        let inline = self
            .generate_content(&self.settings.tts_model, body)?
            .first_inline_data()
            .ok_or(GenerationError::MissingPayload("audio"))?;
        let bytes = BASE64.decode(inline.data.as_bytes())?;
        debug!("Narration payload: {} bytes ({})", bytes.len(), inline.mime_type);
        Ok(bytes)
    }
}

/// Split a `data:` URL into its mime type and decoded bytes.
pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let bytes = BASE64.decode(payload.as_bytes()).ok()?;
    Some((mime.to_string(), bytes))
}
