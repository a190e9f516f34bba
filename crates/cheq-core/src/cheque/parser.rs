//! Cheque parser driving anchors, location, normalization and validation.

use std::collections::HashSet;
use std::time::Instant;

use chrono::Datelike;
use tracing::{debug, info, warn};

use crate::error::{ChequeError, FormatError, Result};
use crate::layout::TokenLayout;
use crate::models::config::ChequeConfig;
use crate::models::*;

use super::anchors::{AnchorIndex, AnchorKind};
use super::context::LayoutContext;
use super::fallback::Heuristic;
use super::locator::{FieldLocator, Located, Relation, SpanRequest, Strategy, TokenSpan};
use super::rules::patterns::MONTH_WORD;
use super::rules::{
    is_number_word, looks_like_serial, ChequeNumberRule, DateNormalizer, FieldNormalizer,
    NumericAmountParser, WrittenAmountParser,
};
use super::validator::CrossValidator;

/// Trait for cheque field extractors.
pub trait ChequeExtractor {
    /// Extract all fields from one token layout.
    ///
    /// Only an invalid layout is an error; missing or malformed fields are
    /// reported in the result.
    fn extract(&self, layout: &TokenLayout) -> Result<ChequeExtractionResult>;
}

const NUMERIC_AMOUNT: &[Strategy] = &[
    Strategy::Anchor {
        kind: AnchorKind::AmountNumericBox,
        relation: Relation::RightOf,
    },
    Strategy::Fallback(Heuristic::LargestAmount),
];

const WRITTEN_AMOUNT: &[Strategy] = &[
    Strategy::Anchor {
        kind: AnchorKind::AmountWordsLabel,
        relation: Relation::RightOf,
    },
    Strategy::Anchor {
        kind: AnchorKind::PayeeLabel,
        relation: Relation::Below,
    },
    Strategy::Fallback(Heuristic::AmountWords),
];

const DATE: &[Strategy] = &[
    Strategy::Anchor {
        kind: AnchorKind::DateLabel,
        relation: Relation::RightOf,
    },
    Strategy::Anchor {
        kind: AnchorKind::DateLabel,
        relation: Relation::Below,
    },
    Strategy::Fallback(Heuristic::DatePattern),
];

const PAYEE: &[Strategy] = &[Strategy::Anchor {
    kind: AnchorKind::PayeeLabel,
    relation: Relation::RightOf,
}];

const PAYEE_WITH_NAME_FALLBACK: &[Strategy] = &[
    Strategy::Anchor {
        kind: AnchorKind::PayeeLabel,
        relation: Relation::RightOf,
    },
    Strategy::Fallback(Heuristic::ProperName),
];

fn has_digit(span: &TokenSpan) -> bool {
    span.text.chars().any(|c| c.is_ascii_digit())
}

fn has_number_word(span: &TokenSpan) -> bool {
    span.text
        .split(|c: char| c.is_whitespace() || c == '-')
        .any(is_number_word)
}

fn looks_like_date(span: &TokenSpan) -> bool {
    has_digit(span) || MONTH_WORD.is_match(&span.text.to_uppercase())
}

fn is_serial(span: &TokenSpan) -> bool {
    looks_like_serial(&span.text)
}

fn has_letter(span: &TokenSpan) -> bool {
    span.text.chars().any(char::is_alphabetic)
}

/// Rule-based cheque parser.
///
/// Holds only read-only configuration, so one instance can be shared across
/// threads.
#[derive(Debug, Clone)]
pub struct ChequeParser {
    config: ChequeConfig,
    /// Year two-digit years and the plausibility window are resolved against.
    reference_year: i32,
}

impl ChequeParser {
    /// Create a parser. An unset reference year means the current year.
    pub fn new(config: ChequeConfig) -> Self {
        let reference_year = config
            .date
            .reference_year
            .unwrap_or_else(|| chrono::Utc::now().year());
        Self {
            config,
            reference_year,
        }
    }

    /// Create a parser after validating the configuration.
    pub fn try_new(config: ChequeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Pin the reference year.
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = year;
        self
    }

    pub fn config(&self) -> &ChequeConfig {
        &self.config
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    fn date_normalizer(&self) -> DateNormalizer {
        DateNormalizer::new(self.reference_year)
            .with_default_order(self.config.date.default_order)
            .with_plausible_years(self.config.date.plausible_years)
    }

    fn cheque_number_rule(&self) -> ChequeNumberRule {
        ChequeNumberRule::new(self.config.cheque_number.min_digits, self.config.cheque_number.max_digits)
            .with_checksum(self.config.cheque_number.checksum)
            .with_auto_correct(self.config.extraction.auto_correct)
    }
}

impl Default for ChequeParser {
    fn default() -> Self {
        Self::new(ChequeConfig::default())
    }
}

/// Per-document state: tokens claimed so far and flags raised.
struct Run<'r, 'a> {
    ctx: &'r LayoutContext<'a>,
    locator: FieldLocator<'r>,
    validator: CrossValidator<'r>,
    consumed: HashSet<usize>,
    flags: Vec<ExtractionFlag>,
}

impl Run<'_, '_> {
    fn locate(
        &mut self,
        field: FieldName,
        strategies: &[Strategy],
        max_span: usize,
        accept: &dyn Fn(&TokenSpan) -> bool,
    ) -> Option<Located> {
        let request = SpanRequest {
            max_span,
            blocked: &self.consumed,
            accept,
        };
        let located = self.locator.locate(strategies, &request);

        match &located {
            Some(l) => {
                debug!("Located {} '{}' via {:?}", field, l.span.text, l.method);
                self.consumed.extend(l.span.tokens.iter().copied());
            }
            None => {
                debug!("No span found for {}", field);
                self.flags.push(ExtractionFlag::MissingField { field });
            }
        }
        located
    }

    fn confidence(&self, located: &Located, factor: f32) -> f32 {
        self.validator.field_confidence(
            self.validator.method_score(located),
            self.ctx.mean_confidence(&located.span.tokens),
            factor * self.validator.method_factor(located.method),
        )
    }

    fn format_error(&mut self, field: FieldName, located: Located, error: FormatError) -> FieldExtractionResult {
        debug!("Format error in {} '{}': {}", field, located.span.text, error);
        let reason = error.to_string();
        self.flags.push(ExtractionFlag::FormatError {
            field,
            reason: reason.clone(),
        });
        FieldExtractionResult::format_error(field, located.span.text, located.span.tokens, located.method, reason)
    }

    fn amount(
        &mut self,
        field: FieldName,
        strategies: &[Strategy],
        max_span: usize,
        accept: &dyn Fn(&TokenSpan) -> bool,
        normalizer: &dyn FieldNormalizer<Output = rust_decimal::Decimal>,
    ) -> FieldExtractionResult {
        let Some(located) = self.locate(field, strategies, max_span, accept) else {
            return FieldExtractionResult::missing(field);
        };

        match normalizer.normalize(&located.span.text) {
            Ok(value) => {
                let confidence = self.confidence(&located, 1.0);
                FieldExtractionResult::extracted(
                    field,
                    located.span.text,
                    FieldValue::Amount(value),
                    confidence,
                    located.span.tokens,
                    located.method,
                )
            }
            Err(e) => self.format_error(field, located, e),
        }
    }

    fn date(&mut self, max_span: usize, normalizer: &DateNormalizer, ambiguity_factor: f32) -> FieldExtractionResult {
        let field = FieldName::Date;
        let Some(located) = self.locate(field, DATE, max_span, &looks_like_date) else {
            return FieldExtractionResult::missing(field);
        };

        match normalizer.parse(&located.span.text) {
            Ok(parsed) => {
                let factor = if parsed.ambiguous {
                    self.flags.push(ExtractionFlag::AmbiguousDateFormat {
                        raw: located.span.text.clone(),
                        assumed: parsed.order,
                    });
                    ambiguity_factor
                } else {
                    1.0
                };
                let confidence = self.confidence(&located, factor);
                FieldExtractionResult::extracted(
                    field,
                    located.span.text,
                    FieldValue::Date(parsed.date),
                    confidence,
                    located.span.tokens,
                    located.method,
                )
            }
            Err(e) => self.format_error(field, located, e),
        }
    }

    fn cheque_number(
        &mut self,
        strategies: &[Strategy],
        max_span: usize,
        rule: &ChequeNumberRule,
        out_of_range_factor: f32,
    ) -> FieldExtractionResult {
        let field = FieldName::ChequeNumber;
        let Some(located) = self.locate(field, strategies, max_span, &is_serial) else {
            return FieldExtractionResult::missing(field);
        };

        match rule.normalize(&located.span.text) {
            Ok(number) => {
                let mut factor = 1.0;
                if !number.length_ok {
                    self.flags.push(ExtractionFlag::ChequeNumberLength {
                        digits: number.digits.len(),
                        min: rule.min_digits(),
                        max: rule.max_digits(),
                    });
                    factor *= out_of_range_factor;
                }
                if !number.checksum_ok {
                    self.flags.push(ExtractionFlag::ChequeNumberChecksum {
                        value: number.digits.clone(),
                    });
                    factor *= out_of_range_factor;
                }
                let confidence = self.confidence(&located, factor);
                FieldExtractionResult::extracted(
                    field,
                    located.span.text,
                    FieldValue::Text(number.digits),
                    confidence,
                    located.span.tokens,
                    located.method,
                )
            }
            Err(e) => self.format_error(field, located, e),
        }
    }

    fn payee(&mut self, strategies: &[Strategy], max_span: usize) -> FieldExtractionResult {
        let field = FieldName::Payee;
        let Some(located) = self.locate(field, strategies, max_span, &has_letter) else {
            return FieldExtractionResult::missing(field);
        };

        let name = located
            .span
            .text
            .replace('*', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let confidence = self.confidence(&located, 1.0);
        FieldExtractionResult::extracted(
            field,
            located.span.text,
            FieldValue::Text(name),
            confidence,
            located.span.tokens,
            located.method,
        )
    }
}

impl ChequeExtractor for ChequeParser {
    fn extract(&self, layout: &TokenLayout) -> Result<ChequeExtractionResult> {
        let start = Instant::now();

        if let Err(e) = layout.validate() {
            warn!("Rejected token layout: {}", e);
            return Err(ChequeError::InvalidLayout(e));
        }

        info!(
            "Extracting cheque fields from {} tokens ({}x{})",
            layout.len(),
            layout.width(),
            layout.height()
        );

        let config = &self.config;
        let ctx = LayoutContext::new(layout, config.extraction.min_token_confidence);
        let anchors = AnchorIndex::build(&ctx, &config.anchors, config.extraction.max_anchor_window);
        let mut run = Run {
            ctx: &ctx,
            locator: FieldLocator::new(&ctx, &anchors, &config.spatial),
            validator: CrossValidator::new(&config.confidence),
            consumed: HashSet::new(),
            flags: Vec::new(),
        };

        let auto_correct = config.extraction.auto_correct;
        let limits = &config.spatial.max_span;

        // Amounts and the date claim their tokens before the cheque number
        // falls back to the longest digit run.
        let numeric = run.amount(
            FieldName::AmountNumeric,
            NUMERIC_AMOUNT,
            limits.amount_numeric,
            &has_digit,
            &NumericAmountParser::new().with_auto_correct(auto_correct),
        );
        let written = run.amount(
            FieldName::AmountWritten,
            WRITTEN_AMOUNT,
            limits.amount_written,
            &has_number_word,
            &WrittenAmountParser::new().with_auto_correct(auto_correct),
        );
        let date = run.date(limits.date, &self.date_normalizer(), config.confidence.ambiguity_factor);

        let number_strategies = [
            Strategy::Anchor {
                kind: AnchorKind::ChequeNumberLabel,
                relation: Relation::RightOf,
            },
            Strategy::Region(config.spatial.cheque_number_region),
            Strategy::Fallback(Heuristic::LongestDigits),
        ];
        let cheque_number = run.cheque_number(
            &number_strategies,
            limits.cheque_number,
            &self.cheque_number_rule(),
            config.cheque_number.out_of_range_factor,
        );

        let payee_strategies = if config.extraction.payee_name_fallback {
            PAYEE_WITH_NAME_FALLBACK
        } else {
            PAYEE
        };
        let payee = run.payee(payee_strategies, limits.payee);

        let validator = run.validator;
        let mut flags = run.flags;
        let amount = validator.reconcile_amount(numeric, written, &mut flags);
        let overall_confidence = validator.overall_confidence(&payee, &amount, &date, &cheque_number);
        let verdict = validator.verdict(&amount, overall_confidence, &flags);

        let skipped_tokens = (0..layout.len()).filter(|&t| !ctx.is_usable(t)).count();
        let processing_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "Extraction finished: verdict {}, confidence {:.2}, {} flags in {}ms",
            verdict,
            overall_confidence,
            flags.len(),
            processing_time_ms
        );

        Ok(ChequeExtractionResult {
            payee,
            amount,
            date,
            cheque_number,
            overall_confidence,
            flags,
            verdict,
            metadata: ExtractionMetadata {
                token_count: layout.len(),
                skipped_tokens,
                processing_time_ms: Some(processing_time_ms),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cheque::rules::ChecksumRule;
    use crate::layout::Token;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn parser() -> ChequeParser {
        ChequeParser::default().with_reference_year(2026)
    }

    fn layout(tokens: Vec<Token>) -> TokenLayout {
        TokenLayout::new(tokens, 1000, 450)
    }

    #[test]
    fn test_parser_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChequeParser>();
    }

    #[test]
    fn test_labelled_date_is_unambiguous() {
        let layout = layout(vec![
            Token::from_rect("DATE", 650.0, 60.0, 60.0, 22.0, 0.95),
            Token::from_rect("25/12/2025", 720.0, 60.0, 130.0, 22.0, 0.93),
        ]);
        let result = parser().extract(&layout).unwrap();

        assert_eq!(result.date.date(), NaiveDate::from_ymd_opt(2025, 12, 25));
        assert_eq!(result.date.method, Some(ExtractionMethod::Anchor));
        assert!(!result.has_flag(FlagKind::AmbiguousFormat));
    }

    #[test]
    fn test_bad_date_is_format_error() {
        let layout = layout(vec![
            Token::from_rect("DATE", 650.0, 60.0, 60.0, 22.0, 0.95),
            Token::from_rect("31/31/2025", 720.0, 60.0, 130.0, 22.0, 0.93),
        ]);
        let result = parser().extract(&layout).unwrap();

        assert_eq!(result.date.confidence, 0.0);
        assert!(matches!(result.date.status, FieldStatus::FormatError(_)));
        assert!(result.has_flag(FlagKind::FormatError));
    }

    #[test]
    fn test_long_cheque_number_is_flagged() {
        let layout = layout(vec![Token::from_rect("No. 12345678", 820.0, 20.0, 150.0, 22.0, 0.9)]);
        let result = parser().extract(&layout).unwrap();

        assert_eq!(result.cheque_number.text(), Some("12345678"));
        assert!(result.cheque_number.confidence > 0.0);
        assert!(result
            .flags
            .iter()
            .any(|f| matches!(f, ExtractionFlag::ChequeNumberLength { digits: 8, .. })));
    }

    #[test]
    fn test_written_amount_only() {
        let layout = layout(vec![
            Token::from_rect("RUPEES", 40.0, 200.0, 90.0, 22.0, 0.95),
            Token::from_rect("TWO THOUSAND FIVE HUNDRED ONLY", 140.0, 200.0, 380.0, 22.0, 0.9),
        ]);
        let result = parser().extract(&layout).unwrap();

        assert_eq!(result.amount.value, Some(Decimal::from(2500)));
        assert_eq!(result.amount.consistent, None);
        assert_eq!(result.amount.numeric.status, FieldStatus::Missing);
    }

    #[test]
    fn test_payee_name_fallback_is_opt_in() {
        let tokens = vec![
            Token::from_rect("Jane Smith", 120.0, 150.0, 160.0, 24.0, 0.92),
            Token::from_rect("$ 75.00", 800.0, 150.0, 100.0, 24.0, 0.92),
        ];

        let result = parser().extract(&layout(tokens.clone())).unwrap();
        assert_eq!(result.payee.status, FieldStatus::Missing);

        let mut config = ChequeConfig::default();
        config.extraction.payee_name_fallback = true;
        let result = ChequeParser::new(config)
            .with_reference_year(2026)
            .extract(&layout(tokens))
            .unwrap();
        assert_eq!(result.payee.text(), Some("Jane Smith"));
        assert_eq!(result.payee.method, Some(ExtractionMethod::Fallback));
    }

    #[test]
    fn test_low_confidence_tokens_are_skipped() {
        let layout = layout(vec![
            Token::from_rect("PAY", 40.0, 150.0, 50.0, 24.0, 0.95),
            Token::from_rect("JOHN", 100.0, 150.0, 60.0, 24.0, 0.1),
        ]);
        let result = parser().extract(&layout).unwrap();

        assert_eq!(result.metadata.token_count, 2);
        assert_eq!(result.metadata.skipped_tokens, 1);
        assert_eq!(result.payee.status, FieldStatus::Missing);
    }

    #[test]
    fn test_word_split_payee_label() {
        let mut tokens: Vec<Token> = ["PAY", "TO", "THE", "ORDER", "OF"]
            .iter()
            .enumerate()
            .map(|(i, w)| Token::from_rect(*w, 40.0 + i as f32 * 70.0, 150.0, 60.0, 24.0, 0.95))
            .collect();
        tokens.push(Token::from_rect("JOHN DOE", 400.0, 150.0, 120.0, 24.0, 0.93));
        tokens.push(Token::from_rect("$1,500.00", 780.0, 150.0, 110.0, 24.0, 0.94));

        let result = parser().extract(&layout(tokens)).unwrap();

        assert_eq!(result.payee.text(), Some("JOHN DOE"));
        assert_eq!(result.payee.method, Some(ExtractionMethod::Anchor));
        assert_eq!(result.payee.span, vec![5]);
        assert_eq!(result.amount.value, Some(Decimal::new(150000, 2)));
    }

    #[test]
    fn test_date_below_label() {
        let layout = layout(vec![
            Token::from_rect("DATE", 650.0, 60.0, 60.0, 22.0, 0.95),
            Token::from_rect("25/12/2025", 650.0, 90.0, 130.0, 22.0, 0.93),
        ]);
        let result = parser().extract(&layout).unwrap();

        assert_eq!(result.date.date(), NaiveDate::from_ymd_opt(2025, 12, 25));
        assert_eq!(result.date.method, Some(ExtractionMethod::Anchor));
        assert_eq!(result.date.span, vec![1]);
    }

    #[test]
    fn test_failed_checksum_is_flagged() {
        let tokens = vec![Token::from_rect("1234", 880.0, 20.0, 80.0, 24.0, 0.95)];

        let plain = parser().extract(&layout(tokens.clone())).unwrap();
        assert_eq!(plain.cheque_number.text(), Some("1234"));
        assert!(!plain.has_flag(FlagKind::AmbiguousFormat));

        let mut config = ChequeConfig::default();
        config.cheque_number.checksum = ChecksumRule::Mod11;
        let factor = config.cheque_number.out_of_range_factor;
        let checked = ChequeParser::new(config)
            .with_reference_year(2026)
            .extract(&layout(tokens))
            .unwrap();

        assert_eq!(checked.cheque_number.text(), Some("1234"));
        assert!(checked
            .flags
            .iter()
            .any(|f| matches!(f, ExtractionFlag::ChequeNumberChecksum { value } if value == "1234")));
        assert!(checked.cheque_number.confidence < plain.cheque_number.confidence);
        assert!((checked.cheque_number.confidence - plain.cheque_number.confidence * factor).abs() < 1e-4);
    }
}
