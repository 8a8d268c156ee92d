//! # rscan-rs
//!
//! A library for chaining two hosted inference models — an OCR model and a
//! receipt entity-extraction model — into a single scan, plus the bounded
//! retry wrapper used when pushing the model containers.
//!
//! ## Features
//!
//! - **Two-stage pipeline**: remote OCR, then remote entity extraction, with
//!   stage identity attached to every failure
//! - **Box estimation**: grid-layout fallback for OCR backends that return
//!   text without word geometry
//! - **Stub-friendly**: the coordinator works against the `rscan_infer`
//!   engine traits, so it tests without a network
//! - **Deployment retries**: fixed-delay bounded retry around `cog push`
//!
//! ## Quick Start
//!
//! ```ignore
//! use rscan_infer::{OcrInput, ReplicateClient, ReplicateConfig};
//! use rscan_rs::pipeline::{image_size, Pipeline};
//!
//! let client = ReplicateClient::new(ReplicateConfig::from_env()?)?;
//! let input = OcrInput::FilePath("receipt.png".into());
//! let dimensions = image_size(&input)?;
//!
//! let mut pipeline = Pipeline::new(&client, &client);
//! let result = pipeline.run(&input, dimensions).await?;
//! println!("{}", result.formatted_text);
//! ```

pub mod box_estimator;
pub mod deploy;
pub mod pipeline;

// Re-export commonly used types at the root level
pub use box_estimator::estimate_boxes;
pub use deploy::{cog_push, push_with_retry, DeployError, RetryPolicy, DEFAULT_ATTEMPTS, DEFAULT_DELAY};
pub use pipeline::{image_size, Pipeline, PipelineState};

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```ignore
/// use rscan_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        cog_push, estimate_boxes, image_size, push_with_retry, DeployError, Pipeline,
        PipelineState, RetryPolicy,
    };
    pub use rscan_infer::{
        BoundingBox, EntityLabel, EntityMap, ExtractionEngine, InferError, OcrEngine, OcrInput,
        OcrOutput, ReceiptResult, ReplicateClient, ReplicateConfig, Stage, Word,
    };
}
