//! Sequential two-stage coordinator: remote OCR, local box fallback,
//! remote entity extraction. Each invocation blocks on one stage at a time
//! and either yields a complete [`ReceiptResult`] or exactly one error.

use rscan_infer::{
    check_alignment, BoundingBox, EntityMap, ExtractionEngine, InferError, OcrEngine, OcrInput,
    ReceiptResult, Stage,
};
use tracing::debug;

use crate::box_estimator::estimate_boxes;

const NO_TEXT_MESSAGE: &str = "No text detected in image.";

/// Where an invocation currently stands. `Failed` records which stage the
/// error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    OcrInFlight,
    BoxEstimation,
    ExtractionInFlight,
    Done,
    Failed(Stage),
}

pub struct Pipeline<'a> {
    ocr: &'a dyn OcrEngine,
    extraction: &'a dyn ExtractionEngine,
    state: PipelineState,
}

impl<'a> Pipeline<'a> {
    pub fn new(ocr: &'a dyn OcrEngine, extraction: &'a dyn ExtractionEngine) -> Self {
        Self {
            ocr,
            extraction,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs both stages to completion. Image dimensions feed the box
    /// estimator when the OCR backend returned text without geometry.
    pub async fn run(
        &mut self,
        input: &OcrInput,
        (image_width, image_height): (u32, u32),
    ) -> Result<ReceiptResult, InferError> {
        self.state = PipelineState::OcrInFlight;
        let ocr_output = match self.ocr.recognize(input).await {
            Ok(output) => output,
            Err(e) => {
                self.state = PipelineState::Failed(Stage::Ocr);
                return Err(e);
            }
        };
        debug!("OCR returned {} words", ocr_output.words.len());

        if ocr_output.words.is_empty() {
            // Nothing for the extraction model to label; skip stage two.
            self.state = PipelineState::Done;
            return Ok(ReceiptResult {
                entities: EntityMap::new(),
                formatted_text: NO_TEXT_MESSAGE.to_string(),
            });
        }

        let boxes: Vec<BoundingBox> = if ocr_output.fully_boxed() {
            ocr_output.words.iter().filter_map(|w| w.bounding_box).collect()
        } else {
            self.state = PipelineState::BoxEstimation;
            debug!("estimating boxes for {}x{} image", image_width, image_height);
            estimate_boxes(&ocr_output.words, image_width, image_height)
        };
        let words: Vec<String> = ocr_output.words.iter().map(|w| w.text.clone()).collect();

        if let Err(e) = check_alignment(&words, &boxes) {
            self.state = PipelineState::Failed(Stage::Extraction);
            return Err(e);
        }

        self.state = PipelineState::ExtractionInFlight;
        match self.extraction.extract(input, &words, &boxes).await {
            Ok(result) => {
                self.state = PipelineState::Done;
                Ok(result)
            }
            Err(e) => {
                self.state = PipelineState::Failed(Stage::Extraction);
                Err(e)
            }
        }
    }
}

/// Pixel dimensions of the input image, needed by the box estimator. An
/// unreadable image fails here, before any remote call.
pub fn image_size(input: &OcrInput) -> Result<(u32, u32), InferError> {
    match input {
        OcrInput::FilePath(path) => image::image_dimensions(path).map_err(|e| {
            InferError::Config(format!("cannot read image {}: {e}", path.display()))
        }),
        OcrInput::Bytes(data) => {
            let img = image::load_from_memory(data)
                .map_err(|e| InferError::Config(format!("cannot decode image: {e}")))?;
            Ok((img.width(), img.height()))
        }
    }
}
