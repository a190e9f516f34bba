//! Cross-validation of the two amount representations and confidence
//! aggregation.

use tracing::warn;

use super::locator::Located;
use crate::models::config::ConfidenceConfig;
use crate::models::{
    AmountExtractionResult, ExtractionFlag, ExtractionMethod, FieldExtractionResult, FlagKind, Verdict,
};

/// Scores fields and reconciles them into a document verdict.
#[derive(Debug, Clone, Copy)]
pub struct CrossValidator<'a> {
    config: &'a ConfidenceConfig,
}

impl<'a> CrossValidator<'a> {
    pub fn new(config: &'a ConfidenceConfig) -> Self {
        Self { config }
    }

    /// How much the locating method itself is trusted.
    pub fn method_score(&self, located: &Located) -> f32 {
        match located.method {
            ExtractionMethod::Anchor => located.anchor_score.unwrap_or(1.0),
            ExtractionMethod::Region => self.config.region_score,
            ExtractionMethod::Fallback => self.config.fallback_score,
        }
    }

    /// Format factor for a clean parse by the given method.
    pub fn method_factor(&self, method: ExtractionMethod) -> f32 {
        match method {
            ExtractionMethod::Fallback => self.config.fallback_factor,
            ExtractionMethod::Anchor | ExtractionMethod::Region => 1.0,
        }
    }

    /// Weighted mean of method score and OCR confidence, times the format
    /// factor.
    pub fn field_confidence(&self, method_score: f32, ocr_confidence: f32, format_factor: f32) -> f32 {
        let wa = self.config.anchor_weight.max(0.0);
        let wo = self.config.ocr_weight.max(0.0);
        let base = if wa + wo > 0.0 {
            (wa * method_score + wo * ocr_confidence) / (wa + wo)
        } else {
            ocr_confidence
        };
        (base * format_factor).clamp(0.0, 1.0)
    }

    /// Reconcile the numeric and written amounts.
    pub fn reconcile_amount(
        &self,
        numeric: FieldExtractionResult,
        written: FieldExtractionResult,
        flags: &mut Vec<ExtractionFlag>,
    ) -> AmountExtractionResult {
        let a = numeric.amount().filter(|_| numeric.is_extracted());
        let b = written.amount().filter(|_| written.is_extracted());
        let (ca, cb) = (numeric.confidence, written.confidence);

        let (value, confidence, consistent) = match (a, b) {
            (Some(x), Some(y)) if x == y => (Some(x), 1.0 - (1.0 - ca) * (1.0 - cb), Some(true)),
            (Some(x), Some(y)) => {
                warn!("Amount mismatch: numeric {} vs written {}", x, y);
                flags.push(ExtractionFlag::AmountMismatch {
                    numeric: x,
                    written: y,
                });
                (Some(x), ca.min(cb), Some(false))
            }
            (Some(x), None) => (Some(x), ca, None),
            (None, Some(y)) => (Some(y), cb, None),
            (None, None) => (None, 0.0, None),
        };

        AmountExtractionResult {
            numeric,
            written,
            value,
            confidence: confidence.clamp(0.0, 1.0),
            consistent,
        }
    }

    /// Weighted mean of the per-field confidences, capped on a consistency
    /// error.
    pub fn overall_confidence(
        &self,
        payee: &FieldExtractionResult,
        amount: &AmountExtractionResult,
        date: &FieldExtractionResult,
        cheque_number: &FieldExtractionResult,
    ) -> f32 {
        let w = &self.config.weights;
        let parts = [
            (w.payee, payee.confidence),
            (w.amount, amount.confidence),
            (w.date, date.confidence),
            (w.cheque_number, cheque_number.confidence),
        ];

        let total_weight: f32 = parts.iter().map(|(w, _)| w.max(0.0)).sum();
        let mut overall = if total_weight > 0.0 {
            parts.iter().map(|(w, c)| w.max(0.0) * c).sum::<f32>() / total_weight
        } else {
            0.0
        };

        if amount.consistent == Some(false) {
            overall = overall
                .min(self.config.consistency_ceiling)
                .min(amount.numeric.confidence)
                .min(amount.written.confidence);
        }

        overall.clamp(0.0, 1.0)
    }

    pub fn verdict(&self, amount: &AmountExtractionResult, overall: f32, flags: &[ExtractionFlag]) -> Verdict {
        if amount.value.is_none() || flags.iter().any(|f| f.kind() == FlagKind::ConsistencyError) {
            Verdict::Invalid
        } else if !flags.is_empty() || overall < self.config.review_threshold {
            Verdict::NeedsReview
        } else {
            Verdict::Valid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldName, FieldValue};
    use rust_decimal::Decimal;

    fn amount_field(field: FieldName, value: i64, confidence: f32) -> FieldExtractionResult {
        FieldExtractionResult::extracted(
            field,
            value.to_string(),
            FieldValue::Amount(Decimal::from(value)),
            confidence,
            vec![0],
            ExtractionMethod::Anchor,
        )
    }

    fn text_field(field: FieldName, confidence: f32) -> FieldExtractionResult {
        FieldExtractionResult::extracted(
            field,
            "x",
            FieldValue::Text("x".into()),
            confidence,
            vec![1],
            ExtractionMethod::Anchor,
        )
    }

    #[test]
    fn test_field_confidence_weighting() {
        let config = ConfidenceConfig::default();
        let v = CrossValidator::new(&config);

        let c = v.field_confidence(1.0, 0.9, 1.0);
        assert!((c - 0.94).abs() < 1e-5);
        assert_eq!(v.field_confidence(1.0, 0.9, 0.0), 0.0);
        assert!(v.field_confidence(1.0, 0.9, 0.85) < c);
    }

    #[test]
    fn test_consistent_amounts_combine() {
        let config = ConfidenceConfig::default();
        let v = CrossValidator::new(&config);
        let mut flags = Vec::new();

        let amount = v.reconcile_amount(
            amount_field(FieldName::AmountNumeric, 1500, 0.9),
            amount_field(FieldName::AmountWritten, 1500, 0.8),
            &mut flags,
        );
        assert_eq!(amount.consistent, Some(true));
        assert_eq!(amount.value, Some(Decimal::from(1500)));
        assert!((amount.confidence - 0.98).abs() < 1e-5);
        assert!(flags.is_empty());
    }

    #[test]
    fn test_mismatch_flags_and_caps() {
        let config = ConfidenceConfig::default();
        let v = CrossValidator::new(&config);
        let mut flags = Vec::new();

        let amount = v.reconcile_amount(
            amount_field(FieldName::AmountNumeric, 1500, 0.9),
            amount_field(FieldName::AmountWritten, 1400, 0.8),
            &mut flags,
        );
        assert_eq!(amount.consistent, Some(false));
        assert_eq!(amount.value, Some(Decimal::from(1500)));
        assert_eq!(amount.confidence, 0.8);
        assert!(matches!(flags[0], ExtractionFlag::AmountMismatch { .. }));

        let payee = text_field(FieldName::Payee, 1.0);
        let date = text_field(FieldName::Date, 1.0);
        let number = text_field(FieldName::ChequeNumber, 1.0);
        let overall = v.overall_confidence(&payee, &amount, &date, &number);
        assert!(overall <= config.consistency_ceiling);

        assert_eq!(v.verdict(&amount, overall, &flags), Verdict::Invalid);
    }

    #[test]
    fn test_single_source_amount() {
        let config = ConfidenceConfig::default();
        let v = CrossValidator::new(&config);
        let mut flags = Vec::new();

        let amount = v.reconcile_amount(
            FieldExtractionResult::missing(FieldName::AmountNumeric),
            amount_field(FieldName::AmountWritten, 250, 0.7),
            &mut flags,
        );
        assert_eq!(amount.value, Some(Decimal::from(250)));
        assert_eq!(amount.confidence, 0.7);
        assert_eq!(amount.consistent, None);
    }

    #[test]
    fn test_verdicts() {
        let config = ConfidenceConfig::default();
        let v = CrossValidator::new(&config);
        let mut flags = Vec::new();
        let amount = v.reconcile_amount(
            amount_field(FieldName::AmountNumeric, 100, 0.9),
            amount_field(FieldName::AmountWritten, 100, 0.9),
            &mut flags,
        );

        assert_eq!(v.verdict(&amount, 0.9, &flags), Verdict::Valid);
        assert_eq!(v.verdict(&amount, 0.5, &flags), Verdict::NeedsReview);

        let missing = [ExtractionFlag::MissingField { field: FieldName::Payee }];
        assert_eq!(v.verdict(&amount, 0.9, &missing), Verdict::NeedsReview);

        let none = v.reconcile_amount(
            FieldExtractionResult::missing(FieldName::AmountNumeric),
            FieldExtractionResult::missing(FieldName::AmountWritten),
            &mut flags,
        );
        assert_eq!(v.verdict(&none, 0.9, &[]), Verdict::Invalid);
    }
}
