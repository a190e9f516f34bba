use std::path::Path;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

use cheq_core::cheque::rules::{amount_to_words, parse_written_amount, DateNormalizer};
use cheq_core::{
    ChequeConfig, ChequeError, ChequeExtractor, ChequeParser, ExtractionFlag, ExtractionMethod, FieldName,
    FieldStatus, FlagKind, LayoutError, Token, TokenLayout, Verdict,
};

fn fixture(name: &str) -> TokenLayout {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    let content = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn parser() -> ChequeParser {
    ChequeParser::new(ChequeConfig::default()).with_reference_year(2026)
}

#[test]
fn test_standard_cheque() {
    let result = parser().extract(&fixture("cheque.json")).unwrap();

    assert_eq!(result.payee.text(), Some("JOHN DOE"));
    assert_eq!(result.payee.method, Some(ExtractionMethod::Anchor));

    assert_eq!(result.amount.value, Some(Decimal::new(150000, 2)));
    assert_eq!(result.amount.consistent, Some(true));
    assert_eq!(result.amount.numeric.raw_text.as_deref(), Some("1,500.00"));

    assert_eq!(result.date.date(), NaiveDate::from_ymd_opt(2025, 1, 9));
    assert_eq!(result.cheque_number.text(), Some("1234"));
    assert_eq!(result.cheque_number.method, Some(ExtractionMethod::Region));

    assert!(result.overall_confidence > 0.8, "overall {}", result.overall_confidence);
    assert!(!result.has_consistency_error());

    // 01/09 reads either way, so the month-first reading is flagged.
    assert_eq!(
        result.flags,
        vec![ExtractionFlag::AmbiguousDateFormat {
            raw: "01/09/2025".to_string(),
            assumed: cheq_core::cheque::rules::DateOrder::MonthFirst,
        }]
    );
    assert_eq!(result.verdict, Verdict::NeedsReview);
    assert_eq!(result.metadata.token_count, 6);
    assert_eq!(result.metadata.skipped_tokens, 0);
}

#[test]
fn test_amount_mismatch() {
    let result = parser().extract(&fixture("mismatch.json")).unwrap();

    assert_eq!(result.amount.consistent, Some(false));
    assert_eq!(result.amount.value, Some(Decimal::new(150000, 2)));
    assert_eq!(result.amount.written_amount(), Some(Decimal::new(140000, 2)));
    assert!(result.has_flag(FlagKind::ConsistencyError));

    let cap = ChequeConfig::default().confidence.consistency_ceiling;
    assert!(result.overall_confidence <= cap);
    assert!(result.overall_confidence <= result.amount.numeric.confidence);
    assert!(result.overall_confidence <= result.amount.written.confidence);
    assert_eq!(result.verdict, Verdict::Invalid);
}

#[test]
fn test_missing_payee_label() {
    let mut layout = fixture("cheque.json");
    let tokens: Vec<Token> = layout
        .tokens()
        .iter()
        .filter(|t| !t.text.starts_with("PAY"))
        .cloned()
        .collect();
    layout = TokenLayout::new(tokens, layout.width(), layout.height());

    let result = parser().extract(&layout).unwrap();

    assert_eq!(result.payee.status, FieldStatus::Missing);
    assert_eq!(result.payee.confidence, 0.0);
    assert_eq!(result.payee.value, None);
    assert!(result
        .flags
        .contains(&ExtractionFlag::MissingField { field: FieldName::Payee }));

    // The written amount is still found without the label above it.
    assert_eq!(result.amount.consistent, Some(true));
    assert_eq!(result.amount.written.method, Some(ExtractionMethod::Fallback));
}

#[test]
fn test_paddle_layout_matches_native_layout() {
    #[derive(serde::Deserialize)]
    struct Paddle {
        rec_texts: Vec<String>,
        rec_scores: Vec<f32>,
        rec_polys: Vec<[[f32; 2]; 4]>,
    }

    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/paddle.json");
    let paddle: Paddle = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    let layout = TokenLayout::from_paddle(&paddle.rec_texts, &paddle.rec_scores, &paddle.rec_polys, 1000, 450);

    assert_eq!(layout, fixture("cheque.json"));
}

#[test]
fn test_invalid_layouts_are_rejected() {
    let empty = TokenLayout::new(Vec::new(), 1000, 450);
    assert!(matches!(
        parser().extract(&empty),
        Err(ChequeError::InvalidLayout(LayoutError::Empty))
    ));

    let outside = TokenLayout::new(vec![Token::from_rect("1234", 1200.0, 20.0, 70.0, 24.0, 0.9)], 1000, 450);
    assert!(matches!(
        parser().extract(&outside),
        Err(ChequeError::InvalidLayout(LayoutError::TokenOutOfBounds { index: 0, .. }))
    ));
}

#[test]
fn test_shared_across_threads() {
    let parser = std::sync::Arc::new(parser());
    let layout = std::sync::Arc::new(fixture("cheque.json"));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let parser = parser.clone();
            let layout = layout.clone();
            std::thread::spawn(move || parser.extract(&layout).unwrap().amount.value)
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(Decimal::new(150000, 2)));
    }
}

#[test]
fn test_written_amount_round_trip() {
    for cents in [12345_i64, 100000, 75050] {
        let amount = Decimal::new(cents, 2);
        let words = amount_to_words(amount).unwrap();
        assert_eq!(parse_written_amount(&words, false).unwrap(), amount, "{}", words);
    }
}

#[test]
fn test_date_normalization_is_idempotent() {
    let normalizer = DateNormalizer::new(2026);
    for raw in ["01/09/2025", "25.12.2025", "March 3rd, 2024", "9 Jan 25"] {
        let once = normalizer.parse(raw).unwrap().date;
        let twice = normalizer.parse(&once.format("%Y-%m-%d").to_string()).unwrap().date;
        assert_eq!(once, twice, "{}", raw);
    }
}
