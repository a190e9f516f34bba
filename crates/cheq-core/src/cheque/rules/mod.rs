//! Rule-based normalizers turning located text into typed values.

pub mod amounts;
pub mod cheque_number;
pub mod dates;
pub mod patterns;
pub mod words;

pub use amounts::{correct_digit_confusions, format_amount, parse_numeric_amount, NumericAmountParser};
pub use cheque_number::{looks_like_serial, ChecksumRule, ChequeNumber, ChequeNumberRule};
pub use dates::{month_number, DateNormalizer, DateOrder, NormalizedDate};
pub use words::{amount_to_words, is_amount_word, is_number_word, parse_written_amount, WrittenAmountParser};

use crate::error::FormatError;

/// Trait for field normalizers.
pub trait FieldNormalizer {
    /// The type of value this normalizer produces.
    type Output;

    /// Normalize located raw text.
    fn normalize(&self, raw: &str) -> Result<Self::Output, FormatError>;
}
