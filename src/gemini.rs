//! Client for the Gemini `generateContent` endpoint.
//!
//! Docs: <https://ai.google.dev/gemini-api/docs/image-generation>

use base64::Engine;
use base64::engine::general_purpose;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

use crate::constants::X_GOOG_API_KEY;
use crate::error::ImagegenError;
use crate::store::generate_filename;

/// Decoded image returned by the API, not yet written anywhere.
#[derive(Clone, Debug)]
pub struct GeneratedImage {
    /// Name the image will be stored under
    pub filename: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// Mime type reported by the API
    pub mime_type: String,
}

/// Thin wrapper around one model's `generateContent` URL.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl GeminiClient {
    /// Builds a client for `model` under `api_base`.
    pub fn new(api_base: &str, model: &str) -> Result<Self, ImagegenError> {
        let mut base = Url::parse(api_base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(&format!("v1beta/models/{model}:generateContent"))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    /// The URL requests are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends `prompt` to the model and returns the first inline image.
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    pub async fn generate(
        &self,
        prompt: &str,
        api_key: &str,
    ) -> Result<GeneratedImage, ImagegenError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(X_GOOG_API_KEY, api_key)
            .json(&GenerateContentRequest::for_prompt(prompt))
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        debug!("Gemini answered {} with {} bytes", status, bytes.len());

        if !status.is_success() {
            let detail = match serde_json::from_slice::<Value>(&bytes).map(GeminiReply::from_value)
            {
                Ok(GeminiReply::Error(err)) => err.to_string(),
                _ => String::from_utf8_lossy(&bytes).into_owned(),
            };
            return Err(ImagegenError::Upstream(format!("{status}: {detail}")));
        }

        let raw: Value =
            serde_json::from_slice(&bytes).map_err(|err| ImagegenError::UnexpectedResponse {
                message: format!("Response was not valid JSON: {err}"),
                raw: Value::String(String::from_utf8_lossy(&bytes).into_owned()),
            })?;

        match GeminiReply::from_value(raw.clone()) {
            GeminiReply::Image(inline) => {
                let bytes = general_purpose::STANDARD
                    .decode(inline.data.as_bytes())
                    .map_err(|err| ImagegenError::UnexpectedResponse {
                        message: format!("Failed to base64-decode image: {err}"),
                        raw,
                    })?;
                let filename = generate_filename(Local::now());
                info!("Received {} bytes of {} as {}", bytes.len(), inline.mime_type, filename);
                Ok(GeneratedImage {
                    filename,
                    bytes,
                    mime_type: inline.mime_type,
                })
            }
            GeminiReply::NoImage => Err(ImagegenError::UnexpectedResponse {
                message: "No image data found in the response".to_string(),
                raw,
            }),
            GeminiReply::Error(err) => Err(ImagegenError::UnexpectedResponse {
                message: format!("API returned an error: {err}"),
                raw,
            }),
        }
    }
}

// -----------------------------
// Wire types
// -----------------------------

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn for_prompt(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    // parsed one at a time so a malformed part doesn't hide the others
    #[serde(default)]
    parts: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default, alias = "inline_data")]
    inline_data: Option<WireInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInlineData {
    #[serde(default, alias = "mime_type")]
    mime_type: Option<String>,
    #[serde(default)]
    data: Option<String>,
}

impl ResponsePart {
    /// The part's image, if it carries one with a non-empty payload.
    fn from_value(part: Value) -> Option<InlineData> {
        let inline = serde_json::from_value::<Self>(part).ok()?.inline_data?;
        let data = inline.data.filter(|data| !data.is_empty())?;
        Some(InlineData {
            mime_type: inline.mime_type.unwrap_or_else(default_mime_type),
            data,
        })
    }
}

/// Base64 payload of one image part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineData {
    /// Mime type, `image/png` when the API leaves it out
    pub mime_type: String,
    /// Base64 encoded bytes
    pub data: String,
}

fn default_mime_type() -> String {
    "image/png".to_string()
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

/// Google's `{"error": {...}}` body.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP-ish status code
    #[serde(default)]
    pub code: Option<u16>,
    /// Human readable message
    #[serde(default)]
    pub message: String,
    /// Canonical status, eg `PERMISSION_DENIED`
    #[serde(default)]
    pub status: Option<String>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.status, self.code) {
            (Some(status), Some(code)) => write!(f, "{status} ({code}): {}", self.message),
            (Some(status), None) => write!(f, "{status}: {}", self.message),
            (None, Some(code)) => write!(f, "{code}: {}", self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

/// The three shapes a `generateContent` reply can take.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeminiReply {
    /// First candidate carried an inline image
    Image(InlineData),
    /// Well-formed reply, but no inline image in the first candidate
    NoImage,
    /// Error body
    Error(ApiError),
}

impl GeminiReply {
    /// Classifies a decoded JSON reply.
    pub fn from_value(raw: Value) -> Self {
        if raw.get("error").is_some() {
            return match serde_json::from_value::<ErrorEnvelope>(raw) {
                Ok(envelope) => Self::Error(envelope.error),
                Err(err) => Self::Error(ApiError {
                    code: None,
                    message: format!("unparseable error body: {err}"),
                    status: None,
                }),
            };
        }

        let Ok(response) = serde_json::from_value::<GenerateContentResponse>(raw) else {
            return Self::NoImage;
        };
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().find_map(ResponsePart::from_value))
            .map_or(Self::NoImage, Self::Image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_MODEL;
    use crate::test_support::{gemini_image_reply, stub_gemini, tiny_png};
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn request_body_wraps_prompt() {
        let body = serde_json::to_value(GenerateContentRequest::for_prompt("a cat")).unwrap();
        assert_eq!(body, json!({"contents": [{"parts": [{"text": "a cat"}]}]}));
    }

    #[test]
    fn endpoint_includes_model() {
        let client = GeminiClient::new("https://example.org", DEFAULT_MODEL).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://example.org/v1beta/models/gemini-2.5-flash-image-preview:generateContent"
        );
        assert!(GeminiClient::new("not a url", DEFAULT_MODEL).is_err());
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let expected =
            "https://proxy.example/gemini/v1beta/models/gemini-2.5-flash-image-preview:generateContent";
        for base in ["https://proxy.example/gemini", "https://proxy.example/gemini/"] {
            let client = GeminiClient::new(base, DEFAULT_MODEL).unwrap();
            assert_eq!(client.endpoint().as_str(), expected, "{base}");
        }
    }

    #[test]
    fn reply_picks_first_inline_image() {
        let reply = json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here you go"},
                    {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
                    {"inlineData": {"mimeType": "image/jpeg", "data": "BBBB"}}
                ]},
                "finishReason": "STOP"
            }]
        });
        assert_eq!(
            GeminiReply::from_value(reply),
            GeminiReply::Image(InlineData {
                mime_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            })
        );
    }

    #[test]
    fn reply_skips_parts_without_data() {
        let reply = json!({
            "candidates": [{
                "content": {"parts": [
                    {"inlineData": {"mimeType": "image/png"}},
                    {"inlineData": "garbage"},
                    {"inlineData": {"mimeType": "image/png", "data": ""}},
                    {"inlineData": {"mimeType": null, "data": "AAAA"}}
                ]}
            }]
        });
        assert_eq!(
            GeminiReply::from_value(reply),
            GeminiReply::Image(InlineData {
                mime_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            })
        );

        let data_less = json!({"candidates": [{"content": {"parts": [
            {"inlineData": {"mimeType": "image/png"}}
        ]}}]});
        assert_eq!(GeminiReply::from_value(data_less), GeminiReply::NoImage);
    }

    #[test]
    fn reply_without_image_is_no_image() {
        let text_only = json!({"candidates": [{"content": {"parts": [{"text": "no"}]}}]});
        assert_eq!(GeminiReply::from_value(text_only), GeminiReply::NoImage);
        assert_eq!(GeminiReply::from_value(json!({})), GeminiReply::NoImage);
        assert_eq!(
            GeminiReply::from_value(json!({"candidates": []})),
            GeminiReply::NoImage
        );
        assert_eq!(GeminiReply::from_value(json!([1, 2])), GeminiReply::NoImage);
    }

    #[test]
    fn reply_error_shape() {
        let reply = json!({
            "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
        });
        let GeminiReply::Error(err) = GeminiReply::from_value(reply) else {
            panic!("expected error variant");
        };
        assert_eq!(err.code, Some(400));
        assert_eq!(err.to_string(), "INVALID_ARGUMENT (400): API key not valid");
    }

    #[tokio::test]
    async fn generate_decodes_image() {
        let png = tiny_png(4, 3);
        let stub = stub_gemini(StatusCode::OK, gemini_image_reply(&png)).await;
        let client = GeminiClient::new(&stub.base_url, DEFAULT_MODEL).unwrap();

        let image = client.generate("a cat", "secret").await.unwrap();
        assert_eq!(image.bytes, png);
        assert_eq!(image.mime_type, "image/png");
        assert!(image.filename.starts_with("gemini_generated_"));
        assert_eq!(stub.hits(), 1);
        assert_eq!(stub.last_api_key().as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn generate_reports_missing_image_with_raw_response() {
        let reply = json!({"candidates": [{"content": {"parts": [{"text": "no"}]}}]});
        let stub = stub_gemini(StatusCode::OK, reply.clone()).await;
        let client = GeminiClient::new(&stub.base_url, DEFAULT_MODEL).unwrap();

        match client.generate("a cat", "secret").await {
            Err(ImagegenError::UnexpectedResponse { raw, .. }) => assert_eq!(raw, reply),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn generate_reports_http_errors() {
        let stub = stub_gemini(
            StatusCode::FORBIDDEN,
            json!({"error": {"code": 403, "message": "denied", "status": "PERMISSION_DENIED"}}),
        )
        .await;
        let client = GeminiClient::new(&stub.base_url, DEFAULT_MODEL).unwrap();

        match client.generate("a cat", "secret").await {
            Err(ImagegenError::Upstream(message)) => {
                assert!(message.contains("403"), "{message}");
                assert!(message.contains("denied"), "{message}");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn generate_rejects_bad_base64() {
        let reply = json!({"candidates": [{"content": {"parts": [
            {"inlineData": {"mimeType": "image/png", "data": "!!not base64!!"}}
        ]}}]});
        let stub = stub_gemini(StatusCode::OK, reply).await;
        let client = GeminiClient::new(&stub.base_url, DEFAULT_MODEL).unwrap();

        assert!(matches!(
            client.generate("a cat", "secret").await,
            Err(ImagegenError::UnexpectedResponse { .. })
        ));
    }
}
