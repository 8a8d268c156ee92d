//! HTTP client for a Replicate-style hosted inference platform.
//!
//! Both pipeline stages run as synchronous predictions against published
//! model containers: `POST /v1/models/{model}/predictions` with
//! `Prefer: wait`, so each call blocks until the model finishes.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::engine::{
    check_alignment, ExtractionEngine, InferError, OcrEngine, OcrInput, OcrOutput, Stage,
};
use crate::receipt::ReceiptResult;
use crate::region::{BoundingBox, Word};

pub const TOKEN_ENV: &str = "REPLICATE_API_TOKEN";

const DEFAULT_BASE_URL: &str = "https://api.replicate.com";
const DEFAULT_OCR_MODEL: &str = "whidge/deepseekocr";
const DEFAULT_EXTRACTION_MODEL: &str = "whidge/layoutlmv3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings for the hosted platform. Built once at process start
/// and passed by reference; `from_env` is the only place the environment is
/// read.
#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_token: String,
    pub ocr_model: String,
    pub extraction_model: String,
    pub base_url: String,
}

impl ReplicateConfig {
    /// Reads the process environment. The auth token is required; model
    /// refs and the API base fall back to the published defaults.
    pub fn from_env() -> Result<Self, InferError> {
        let api_token = env::var(TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                InferError::Config(format!("{TOKEN_ENV} environment variable not set"))
            })?;
        Ok(Self {
            api_token,
            ocr_model: env::var("RSCAN_OCR_MODEL")
                .unwrap_or_else(|_| DEFAULT_OCR_MODEL.to_string()),
            extraction_model: env::var("RSCAN_EXTRACTION_MODEL")
                .unwrap_or_else(|_| DEFAULT_EXTRACTION_MODEL.to_string()),
            base_url: env::var("RSCAN_API_BASE")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        })
    }
}

#[derive(Deserialize)]
struct PredictionResponse {
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for both hosted models. Implements both engine traits so one
/// instance serves the whole pipeline.
pub struct ReplicateClient {
    http: Client,
    config: ReplicateConfig,
}

impl ReplicateClient {
    pub fn new(mut config: ReplicateConfig) -> Result<Self, InferError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InferError::Config(format!("failed to build HTTP client: {e}")))?;

        config.base_url = config.base_url.trim_end_matches('/').to_string();
        info!(
            "replicate client configured: ocr={}, extraction={}",
            config.ocr_model, config.extraction_model
        );
        Ok(Self { http, config })
    }

    async fn run_model(
        &self,
        stage: Stage,
        model: &str,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, InferError> {
        let url = format!("{}/v1/models/{}/predictions", self.config.base_url, model);
        debug!("running {stage} model {model}");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .header("Prefer", "wait")
            .json(&serde_json::json!({ "input": input }))
            .send()
            .await
            .map_err(|e| remote(stage, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(remote(stage, format!("{status}: {body}")));
        }

        let prediction: PredictionResponse = response
            .json()
            .await
            .map_err(|e| remote(stage, format!("malformed response: {e}")))?;

        if prediction.status != "succeeded" {
            let reason = prediction
                .error
                .unwrap_or_else(|| format!("prediction status {}", prediction.status));
            return Err(remote(stage, reason));
        }
        prediction
            .output
            .ok_or_else(|| remote(stage, "prediction output missing".to_string()))
    }

    /// Encodes the input image as a base64 data URL, the form the platform
    /// accepts for file inputs.
    async fn data_url(&self, input: &OcrInput) -> Result<String, InferError> {
        let bytes = match input {
            OcrInput::FilePath(path) => tokio::fs::read(path).await.map_err(|e| {
                InferError::Config(format!("cannot read image {}: {e}", path.display()))
            })?,
            OcrInput::Bytes(data) => data.clone(),
        };
        Ok(format!(
            "data:image/{};base64,{}",
            image_format(&bytes),
            BASE64.encode(bytes)
        ))
    }
}

fn remote(stage: Stage, reason: String) -> InferError {
    InferError::Remote { stage, reason }
}

/// Sniffs the image container from magic bytes; PNG is the fallback.
fn image_format(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8]) {
        "jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "webp"
    } else {
        "png"
    }
}

/// The OCR backend returns either a bare string or an object with a `text`
/// field, optionally alongside aligned `words`/`boxes` arrays.
fn parse_ocr_output(output: &serde_json::Value) -> Result<OcrOutput, InferError> {
    let text = match output {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => map
            .get("text")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| remote(Stage::Ocr, "output missing text field".to_string()))?,
        other => {
            return Err(remote(Stage::Ocr, format!("unexpected output shape: {other}")));
        }
    };

    if let Some(words) = parse_backend_words(output) {
        return Ok(OcrOutput { text, words });
    }

    let words = text.split_whitespace().map(Word::unboxed).collect();
    Ok(OcrOutput { text, words })
}

fn parse_backend_words(output: &serde_json::Value) -> Option<Vec<Word>> {
    let map = output.as_object()?;
    let words = map.get("words")?.as_array()?;
    let boxes = map.get("boxes")?.as_array()?;
    if words.len() != boxes.len() {
        return None;
    }

    let mut out = Vec::with_capacity(words.len());
    for (word, bounds) in words.iter().zip(boxes) {
        let text = word.as_str()?;
        let coords = bounds.as_array()?;
        if coords.len() != 4 {
            return None;
        }
        let mut corners = [0u32; 4];
        for (slot, value) in corners.iter_mut().zip(coords) {
            *slot = u32::try_from(value.as_u64()?).ok()?;
        }
        out.push(Word::with_box(text, BoundingBox::from_array(corners)));
    }
    Some(out)
}

#[async_trait]
impl OcrEngine for ReplicateClient {
    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput, InferError> {
        let image = self.data_url(input).await?;
        let output = self
            .run_model(
                Stage::Ocr,
                &self.config.ocr_model,
                serde_json::json!({ "image": image }),
            )
            .await?;
        parse_ocr_output(&output)
    }
}

#[async_trait]
impl ExtractionEngine for ReplicateClient {
    async fn extract(
        &self,
        input: &OcrInput,
        words: &[String],
        boxes: &[BoundingBox],
    ) -> Result<ReceiptResult, InferError> {
        check_alignment(words, boxes)?;
        let image = self.data_url(input).await?;
        let boxes: Vec<[u32; 4]> = boxes.iter().map(|b| b.to_array()).collect();
        let output = self
            .run_model(
                Stage::Extraction,
                &self.config.extraction_model,
                serde_json::json!({
                    "image": image,
                    "words": words,
                    "boxes": boxes,
                }),
            )
            .await?;
        serde_json::from_value(output)
            .map_err(|e| remote(Stage::Extraction, format!("malformed output: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ReplicateConfig {
        ReplicateConfig {
            api_token: "test-token".to_string(),
            ocr_model: DEFAULT_OCR_MODEL.to_string(),
            extraction_model: DEFAULT_EXTRACTION_MODEL.to_string(),
            // Unroutable on purpose: no test here may touch the network.
            base_url: "http://127.0.0.1:1".to_string(),
        }
    }

    #[test]
    fn test_client_normalizes_base_url() {
        let mut config = test_config();
        config.base_url = "http://127.0.0.1:1/".to_string();
        let client = ReplicateClient::new(config).unwrap();
        assert_eq!(client.config.base_url, "http://127.0.0.1:1");
    }

    #[tokio::test]
    async fn test_extract_rejects_shape_mismatch_before_any_request() {
        let client = ReplicateClient::new(test_config()).unwrap();
        let words = vec!["TOTAL".to_string()];
        let err = client
            .extract(&OcrInput::Bytes(vec![0u8; 4]), &words, &[])
            .await
            .unwrap_err();
        // A Remote error here would mean a request was attempted.
        assert!(matches!(err, InferError::ShapeMismatch { words: 1, boxes: 0 }));
    }

    #[test]
    fn test_parse_ocr_output_bare_string() {
        let output = serde_json::json!("TOTAL $12.50");
        let parsed = parse_ocr_output(&output).unwrap();
        assert_eq!(parsed.text, "TOTAL $12.50");
        assert_eq!(parsed.words.len(), 2);
        assert!(parsed.words.iter().all(|w| w.bounding_box.is_none()));
    }

    #[test]
    fn test_parse_ocr_output_text_field() {
        let output = serde_json::json!({ "text": "CAFE 88\nTOTAL $12.50" });
        let parsed = parse_ocr_output(&output).unwrap();
        assert_eq!(parsed.words.len(), 4);
        assert_eq!(parsed.words[0].text, "CAFE");
    }

    #[test]
    fn test_parse_ocr_output_missing_text_is_malformed() {
        let output = serde_json::json!({ "tokens": [] });
        let err = parse_ocr_output(&output).unwrap_err();
        assert!(matches!(err, InferError::Remote { stage: Stage::Ocr, .. }));
    }

    #[test]
    fn test_parse_ocr_output_backend_boxes() {
        let output = serde_json::json!({
            "text": "TOTAL $12.50",
            "words": ["TOTAL", "$12.50"],
            "boxes": [[0, 0, 50, 10], [60, 0, 120, 10]],
        });
        let parsed = parse_ocr_output(&output).unwrap();
        assert_eq!(parsed.words.len(), 2);
        assert_eq!(
            parsed.words[1].bounding_box,
            Some(BoundingBox::new(60, 0, 120, 10))
        );
    }

    #[test]
    fn test_parse_ocr_output_misaligned_backend_boxes_fall_back() {
        let output = serde_json::json!({
            "text": "TOTAL $12.50",
            "words": ["TOTAL", "$12.50"],
            "boxes": [[0, 0, 50, 10]],
        });
        let parsed = parse_ocr_output(&output).unwrap();
        assert_eq!(parsed.words.len(), 2);
        assert!(parsed.words.iter().all(|w| w.bounding_box.is_none()));
    }

    #[test]
    fn test_image_format_sniffing() {
        assert_eq!(image_format(&[0x89, b'P', b'N', b'G']), "png");
        assert_eq!(image_format(&[0xFF, 0xD8, 0xFF]), "jpeg");
        assert_eq!(image_format(b"GIF89a"), "gif");
        assert_eq!(image_format(b"RIFF\x00\x00\x00\x00WEBP"), "webp");
        assert_eq!(image_format(b""), "png");
    }
}
