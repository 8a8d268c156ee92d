use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::receipt::ReceiptResult;
use crate::region::{BoundingBox, Word};

#[derive(Debug, Clone)]
pub enum OcrInput {
    FilePath(PathBuf),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct OcrOutput {
    pub text: String,
    pub words: Vec<Word>,
}

impl OcrOutput {
    /// True when every word carries a backend-supplied box, in which case
    /// box estimation is skipped entirely.
    pub fn fully_boxed(&self) -> bool {
        self.words.iter().all(|w| w.bounding_box.is_some())
    }
}

/// Which of the two remote stages an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ocr,
    Extraction,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Ocr => write!(f, "OCR"),
            Stage::Extraction => write!(f, "extraction"),
        }
    }
}

#[derive(Debug, Error)]
pub enum InferError {
    /// Missing or invalid credentials or invocation arguments; raised
    /// before any remote call is attempted.
    #[error("configuration error: {0}")]
    Config(String),
    /// Any failure from a remote stage: network error, non-2xx status,
    /// timeout, model-reported failure, or a malformed payload.
    #[error("{stage} stage failed: {reason}")]
    Remote { stage: Stage, reason: String },
    /// Word and box sequences of different lengths; the extraction model
    /// requires positional alignment, so this is caught locally.
    #[error("words ({words}) and boxes ({boxes}) count mismatch")]
    ShapeMismatch { words: usize, boxes: usize },
}

/// Checks the one-to-one alignment the extraction model requires.
pub fn check_alignment(words: &[String], boxes: &[BoundingBox]) -> Result<(), InferError> {
    if words.len() != boxes.len() {
        return Err(InferError::ShapeMismatch {
            words: words.len(),
            boxes: boxes.len(),
        });
    }
    Ok(())
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput, InferError>;
}

#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    async fn extract(
        &self,
        input: &OcrInput,
        words: &[String],
        boxes: &[BoundingBox],
    ) -> Result<ReceiptResult, InferError>;
}
