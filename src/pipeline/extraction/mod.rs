//! ExtractionClient: one multipart POST of the cropped artifact to the OCR
//! service, interpreted into raw fields or a failure signal.

pub mod client;
pub mod types;

pub use client::*;
pub use types::*;

use thiserror::Error;

/// Why an OCR submission produced no fields. Both variants leave the crop
/// view active so the user can resubmit without re-capturing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// Transport failure, non-success status, or a body of the wrong shape.
    #[error("OCR service unavailable: {0}")]
    Unavailable(String),

    /// The service answered but reported `success: false`.
    #[error("OCR service could not recognize the document")]
    RecognitionFailed,
}
