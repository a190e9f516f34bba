//! Core library for cheque field extraction.
//!
//! This crate provides:
//! - A token layout model for OCR output (text, polygon, confidence)
//! - Fuzzy anchor matching and spatial location of field values
//! - Normalization of numeric and written amounts, dates and cheque numbers
//! - Cross-validation of the two amount representations with calibrated
//!   per-field and overall confidence

pub mod error;
pub mod layout;
pub mod models;
pub mod cheque;

pub use error::{ChequeError, FormatError, LayoutError, Result};
pub use layout::{Rect, Token, TokenLayout};
pub use models::cheque::{
    AmountExtractionResult, ChequeExtractionResult, ChequeRecord, ExtractionFlag, ExtractionMethod,
    FieldExtractionResult, FieldName, FieldStatus, FieldValue, FlagKind, Verdict,
};
pub use models::config::ChequeConfig;
pub use cheque::{ChequeExtractor, ChequeParser};
