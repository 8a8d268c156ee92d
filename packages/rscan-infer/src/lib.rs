pub mod engine;
pub mod receipt;
pub mod region;
pub mod replicate;

pub use engine::{
    check_alignment, ExtractionEngine, InferError, OcrEngine, OcrInput, OcrOutput, Stage,
};
pub use receipt::{EntityLabel, EntityMap, ReceiptResult};
pub use region::{BoundingBox, Word};
pub use replicate::{ReplicateClient, ReplicateConfig, TOKEN_ENV};
