//! Error types for the cheq-core library.

use thiserror::Error;

/// Main error type for the cheq library.
///
/// Only a broken input contract aborts the extraction of a document. Every
/// field-level problem is folded into the result instead.
#[derive(Error, Debug)]
pub enum ChequeError {
    /// The token layout violates the input contract.
    #[error("invalid token layout: {0}")]
    InvalidLayout(#[from] LayoutError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Violations of the token layout contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// The layout has no tokens.
    #[error("layout contains no tokens")]
    Empty,

    /// Image dimensions are zero.
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// A polygon coordinate is NaN or infinite.
    #[error("token {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },

    /// A recognition confidence outside [0, 1].
    #[error("token {index} has confidence {confidence} outside [0, 1]")]
    InvalidConfidence { index: usize, confidence: f32 },

    /// A token lies outside the image bounds.
    #[error("token {index} lies outside the {width}x{height} image")]
    TokenOutOfBounds { index: usize, width: u32, height: u32 },
}

/// Errors raised while normalizing a located value.
///
/// These never abort a document; they become a `FormatError` flag and a
/// zero-confidence field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The numeric amount could not be parsed.
    #[error("not a valid amount: '{0}'")]
    InvalidAmount(String),

    /// A word outside the number vocabulary.
    #[error("unrecognized word '{0}'")]
    UnrecognizedWord(String),

    /// A magnitude word (hundred, thousand, ...) with nothing to multiply.
    #[error("magnitude '{0}' has no preceding value")]
    MagnitudeWithoutValue(String),

    /// A hundred applied to a value that already has hundreds.
    #[error("magnitude '{0}' out of place")]
    MisplacedMagnitude(String),

    /// A fractional cents suffix that is not NN/100.
    #[error("invalid fractional cents '{0}'")]
    InvalidFraction(String),

    /// No number words in the written amount.
    #[error("no number words found")]
    NoNumberWords,

    /// The written amount overflows the decimal range.
    #[error("amount too large")]
    Overflow,

    /// The text does not look like any supported date grammar.
    #[error("unrecognized date format: '{0}'")]
    UnrecognizedDate(String),

    /// Month outside 1..=12.
    #[error("month {0} out of range")]
    MonthOutOfRange(u32),

    /// Day outside the month.
    #[error("day {day} out of range for {year}-{month:02}")]
    DayOutOfRange { day: u32, month: u32, year: i32 },

    /// Year outside the plausible window.
    #[error("year {year} outside plausible window {min}..={max}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    /// The cheque number contains no digits.
    #[error("no digits in '{0}'")]
    NoDigits(String),
}

/// Result type for the cheq library.
pub type Result<T> = std::result::Result<T, ChequeError>;
