//! Cheque extraction result models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cheque::rules::DateOrder;

/// Fields extracted from a cheque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Payee,
    AmountNumeric,
    AmountWritten,
    Date,
    ChequeNumber,
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldName::Payee => "payee",
            FieldName::AmountNumeric => "amount_numeric",
            FieldName::AmountWritten => "amount_written",
            FieldName::Date => "date",
            FieldName::ChequeNumber => "cheque_number",
        };
        f.write_str(name)
    }
}

/// A normalized field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Amount(Decimal),
    Date(NaiveDate),
    Text(String),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Amount(a) => write!(f, "{:.2}", a),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Text(t) => f.write_str(t),
        }
    }
}

/// How a field's span was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Next to a matched label.
    Anchor,
    /// Inside a fixed region of the cheque.
    Region,
    /// Layout-free heuristic.
    Fallback,
}

/// Outcome of extracting one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Extracted,
    Missing,
    /// Located but failed to normalize.
    FormatError(String),
}

/// One extracted field.
///
/// Confidence is zero unless the status is `Extracted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldExtractionResult {
    pub field: FieldName,

    /// Text of the located span, kept for audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,

    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,

    /// Token indices of the located span.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub span: Vec<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ExtractionMethod>,

    pub status: FieldStatus,
}

impl FieldExtractionResult {
    pub fn missing(field: FieldName) -> Self {
        Self {
            field,
            raw_text: None,
            value: None,
            confidence: 0.0,
            span: Vec::new(),
            method: None,
            status: FieldStatus::Missing,
        }
    }

    pub fn format_error(
        field: FieldName,
        raw_text: impl Into<String>,
        span: Vec<usize>,
        method: ExtractionMethod,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            field,
            raw_text: Some(raw_text.into()),
            value: None,
            confidence: 0.0,
            span,
            method: Some(method),
            status: FieldStatus::FormatError(reason.into()),
        }
    }

    pub fn extracted(
        field: FieldName,
        raw_text: impl Into<String>,
        value: FieldValue,
        confidence: f32,
        span: Vec<usize>,
        method: ExtractionMethod,
    ) -> Self {
        Self {
            field,
            raw_text: Some(raw_text.into()),
            value: Some(value),
            confidence: confidence.clamp(0.0, 1.0),
            span,
            method: Some(method),
            status: FieldStatus::Extracted,
        }
    }

    pub fn is_extracted(&self) -> bool {
        self.status == FieldStatus::Extracted
    }

    pub fn amount(&self) -> Option<Decimal> {
        match self.value {
            Some(FieldValue::Amount(a)) => Some(a),
            _ => None,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self.value {
            Some(FieldValue::Date(d)) => Some(d),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.value {
            Some(FieldValue::Text(t)) => Some(t),
            _ => None,
        }
    }
}

/// The amount with both of its representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountExtractionResult {
    pub numeric: FieldExtractionResult,
    pub written: FieldExtractionResult,

    /// Reconciled amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,

    /// Reconciled confidence (0.0 - 1.0).
    pub confidence: f32,

    /// Whether both representations agree; `None` unless both were extracted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent: Option<bool>,
}

impl AmountExtractionResult {
    pub fn written_amount(&self) -> Option<Decimal> {
        self.written.amount()
    }
}

/// Category of a flag, for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    MissingField,
    FormatError,
    ConsistencyError,
    AmbiguousFormat,
}

/// A problem recorded while extracting a cheque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionFlag {
    MissingField {
        field: FieldName,
    },
    FormatError {
        field: FieldName,
        reason: String,
    },
    /// Numeric and written amounts disagree.
    AmountMismatch {
        numeric: Decimal,
        written: Decimal,
    },
    /// A day/month date read under the default order.
    AmbiguousDateFormat {
        raw: String,
        assumed: DateOrder,
    },
    ChequeNumberLength {
        digits: usize,
        min: usize,
        max: usize,
    },
    ChequeNumberChecksum {
        value: String,
    },
}

impl ExtractionFlag {
    pub fn kind(&self) -> FlagKind {
        match self {
            ExtractionFlag::MissingField { .. } => FlagKind::MissingField,
            ExtractionFlag::FormatError { .. } => FlagKind::FormatError,
            ExtractionFlag::AmountMismatch { .. } => FlagKind::ConsistencyError,
            ExtractionFlag::AmbiguousDateFormat { .. }
            | ExtractionFlag::ChequeNumberLength { .. }
            | ExtractionFlag::ChequeNumberChecksum { .. } => FlagKind::AmbiguousFormat,
        }
    }
}

impl std::fmt::Display for ExtractionFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionFlag::MissingField { field } => write!(f, "missing {}", field),
            ExtractionFlag::FormatError { field, reason } => write!(f, "{}: {}", field, reason),
            ExtractionFlag::AmountMismatch { numeric, written } => {
                write!(f, "amount mismatch: numeric {:.2} vs written {:.2}", numeric, written)
            }
            ExtractionFlag::AmbiguousDateFormat { raw, assumed } => {
                write!(f, "ambiguous date '{}' read as {}", raw, assumed)
            }
            ExtractionFlag::ChequeNumberLength { digits, min, max } => {
                write!(f, "cheque number has {} digits, expected {}-{}", digits, min, max)
            }
            ExtractionFlag::ChequeNumberChecksum { value } => {
                write!(f, "cheque number '{}' fails checksum", value)
            }
        }
    }
}

/// Overall decision for a cheque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// All fields extracted, consistent and confident.
    Valid,
    /// Usable but a human should look at it.
    NeedsReview,
    /// The amount is missing, unreadable or contradictory.
    Invalid,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Valid => "valid",
            Verdict::NeedsReview => "needs_review",
            Verdict::Invalid => "invalid",
        };
        f.write_str(s)
    }
}

/// Metadata about one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Tokens in the input layout.
    pub token_count: usize,

    /// Tokens ignored for low recognition confidence.
    pub skipped_tokens: usize,

    /// Processing time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}

/// Everything extracted from one cheque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChequeExtractionResult {
    pub payee: FieldExtractionResult,
    pub amount: AmountExtractionResult,
    pub date: FieldExtractionResult,
    pub cheque_number: FieldExtractionResult,

    /// Overall confidence (0.0 - 1.0).
    pub overall_confidence: f32,

    #[serde(default)]
    pub flags: Vec<ExtractionFlag>,

    pub verdict: Verdict,

    #[serde(default)]
    pub metadata: ExtractionMetadata,
}

impl ChequeExtractionResult {
    /// All five field results.
    pub fn fields(&self) -> [&FieldExtractionResult; 5] {
        [
            &self.payee,
            &self.amount.numeric,
            &self.amount.written,
            &self.date,
            &self.cheque_number,
        ]
    }

    pub fn has_flag(&self, kind: FlagKind) -> bool {
        self.flags.iter().any(|f| f.kind() == kind)
    }

    pub fn has_consistency_error(&self) -> bool {
        self.has_flag(FlagKind::ConsistencyError)
    }

    pub fn needs_review(&self) -> bool {
        self.verdict != Verdict::Valid
    }

    /// Flatten into a single row for tabular export.
    pub fn to_record(&self, source: impl Into<String>) -> ChequeRecord {
        let value = |f: &FieldExtractionResult| f.value.as_ref().map(|v| v.to_string());
        ChequeRecord {
            source: source.into(),
            payee: value(&self.payee),
            payee_confidence: self.payee.confidence,
            amount: self.amount.value.map(|a| format!("{:.2}", a)),
            amount_numeric: value(&self.amount.numeric),
            amount_written: value(&self.amount.written),
            amount_consistent: self.amount.consistent,
            amount_confidence: self.amount.confidence,
            date: value(&self.date),
            date_confidence: self.date.confidence,
            cheque_number: value(&self.cheque_number),
            cheque_number_confidence: self.cheque_number.confidence,
            overall_confidence: self.overall_confidence,
            verdict: self.verdict.to_string(),
            flags: self
                .flags
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

/// Flat row of a cheque result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChequeRecord {
    pub source: String,
    pub payee: Option<String>,
    pub payee_confidence: f32,
    pub amount: Option<String>,
    pub amount_numeric: Option<String>,
    pub amount_written: Option<String>,
    pub amount_consistent: Option<bool>,
    pub amount_confidence: f32,
    pub date: Option<String>,
    pub date_confidence: f32,
    pub cheque_number: Option<String>,
    pub cheque_number_confidence: f32,
    pub overall_confidence: f32,
    pub verdict: String,
    pub flags: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_missing_and_format_error_have_zero_confidence() {
        let missing = FieldExtractionResult::missing(FieldName::Payee);
        assert_eq!(missing.confidence, 0.0);
        assert_eq!(missing.status, FieldStatus::Missing);

        let bad = FieldExtractionResult::format_error(
            FieldName::Date,
            "31/31/2025",
            vec![3],
            ExtractionMethod::Anchor,
            "month 31 out of range",
        );
        assert_eq!(bad.confidence, 0.0);
        assert_eq!(bad.raw_text.as_deref(), Some("31/31/2025"));
    }

    #[test]
    fn test_extracted_confidence_clamped() {
        let field = FieldExtractionResult::extracted(
            FieldName::Payee,
            "JOHN DOE",
            FieldValue::Text("JOHN DOE".into()),
            1.4,
            vec![1],
            ExtractionMethod::Anchor,
        );
        assert_eq!(field.confidence, 1.0);
        assert_eq!(field.text(), Some("JOHN DOE"));
        assert_eq!(field.amount(), None);
    }

    #[test]
    fn test_flag_kinds() {
        let mismatch = ExtractionFlag::AmountMismatch {
            numeric: Decimal::from(1500),
            written: Decimal::from(1400),
        };
        assert_eq!(mismatch.kind(), FlagKind::ConsistencyError);
        assert_eq!(
            ExtractionFlag::MissingField { field: FieldName::Date }.kind(),
            FlagKind::MissingField
        );
        assert_eq!(mismatch.to_string(), "amount mismatch: numeric 1500.00 vs written 1400.00");
    }

    #[test]
    fn test_flag_serialization() {
        let flag = ExtractionFlag::AmbiguousDateFormat {
            raw: "01/09/2025".into(),
            assumed: DateOrder::MonthFirst,
        };
        let json = serde_json::to_value(&flag).unwrap();
        assert_eq!(json["kind"], "ambiguous_date_format");
        assert_eq!(json["assumed"], "month_first");
    }

    #[test]
    fn test_field_value_display() {
        let amount = FieldValue::Amount(Decimal::from_str("1500").unwrap());
        assert_eq!(amount.to_string(), "1500.00");
        let date = FieldValue::Date(NaiveDate::from_ymd_opt(2025, 1, 9).unwrap());
        assert_eq!(date.to_string(), "2025-01-09");
    }
}
