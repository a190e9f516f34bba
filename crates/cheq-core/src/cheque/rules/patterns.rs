//! Common regex patterns for cheque field normalization.
//!
//! Patterns expect uppercased input.

use lazy_static::lazy_static;
use regex::Regex;

/// Month names by their first three letters, full names allowed.
const MONTH: &str = r"(JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)[A-Z]*\.?";

lazy_static! {
    // Numeric dates: 01/09/2025, 9-1-25, 2025.01.09
    pub static ref DATE_NUMERIC: Regex = Regex::new(
        r"^(\d{1,4})\s*[./\-]\s*(\d{1,2})\s*[./\-]\s*(\d{1,4})$"
    ).unwrap();

    // Boxed digit dates read as one run: 09012025
    pub static ref DATE_COMPACT: Regex = Regex::new(
        r"^(\d{2})(\d{2})(\d{4})$"
    ).unwrap();

    // JANUARY 9, 2025 / JAN. 9TH 2025
    pub static ref DATE_WRITTEN_MDY: Regex = Regex::new(&format!(
        r"^{MONTH}[\s./\-]+(\d{{1,2}})(?:ST|ND|RD|TH)?,?[\s./\-]+(\d{{2,4}})$"
    )).unwrap();

    // 9 JANUARY 2025 / 9TH OF JAN, 2025 / 09-JAN-25
    pub static ref DATE_WRITTEN_DMY: Regex = Regex::new(&format!(
        r"^(\d{{1,2}})(?:ST|ND|RD|TH)?[\s./\-]+(?:OF\s+)?{MONTH},?[\s./\-]+(\d{{2,4}})$"
    )).unwrap();

    // Unanchored forms used when scanning for an unlabeled date
    pub static ref DATE_NUMERIC_SEARCH: Regex = Regex::new(
        r"\b\d{1,4}[./\-]\d{1,2}[./\-]\d{2,4}\b"
    ).unwrap();

    pub static ref DATE_WRITTEN_SEARCH: Regex = Regex::new(&format!(
        r"\b(?:\d{{1,2}}(?:ST|ND|RD|TH)?[\s./\-]+(?:OF\s+)?{MONTH},?[\s./\-]+\d{{2,4}}|{MONTH}[\s./\-]+\d{{1,2}}(?:ST|ND|RD|TH)?,?[\s./\-]+\d{{2,4}})\b"
    )).unwrap();

    pub static ref MONTH_WORD: Regex = Regex::new(&format!(r"\b{MONTH}")).unwrap();

    // Cents fraction of a written amount: 45/100, NO/100, XX/100
    pub static ref AMOUNT_FRACTION: Regex = Regex::new(
        r"^(\d{1,2}|NO|XX|00)/100$"
    ).unwrap();

    // Text shaped like money rather than a serial: symbol, cents or grouping
    pub static ref MONEY_SHAPE: Regex = Regex::new(
        r"[$£€₹]|\d[.,]\d{1,2}(?:/-|/=)?$|\d[,.]\d{3}\b"
    ).unwrap();

    // Currency codes printed around a numeric amount
    pub static ref CURRENCY_CODE: Regex = Regex::new(
        r"^(?:USD|US|CAD|AUD|RS|INR|EUR|GBP)\.?\s*|\s*\b(?:USD|CAD|AUD|INR|EUR|GBP)$"
    ).unwrap();

    // Trailing "only" marks used on Indian cheques: 2,500/- and 2,500/=
    pub static ref AMOUNT_TERMINATOR: Regex = Regex::new(
        r"\s*(?:/-|/=|-+|=+)\s*$"
    ).unwrap();

    // Prefixes printed before a cheque serial: #, NO., N°
    pub static ref CHEQUE_NUMBER_PREFIX: Regex = Regex::new(
        r"^(?:#|N[O0°]\.?|(?:CHEQUE|CHECK|CHQ)\s*(?:NO|NUMBER)?\.?)\s*:?\s*#?\s*"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_patterns() {
        assert!(DATE_NUMERIC.is_match("01/09/2025"));
        assert!(DATE_NUMERIC.is_match("2025-01-09"));
        assert!(DATE_NUMERIC.is_match("9 . 1 . 25"));
        assert!(!DATE_NUMERIC.is_match("1500.00"));

        assert!(DATE_WRITTEN_MDY.is_match("JANUARY 9, 2025"));
        assert!(DATE_WRITTEN_MDY.is_match("JAN. 9TH 2025"));
        assert!(DATE_WRITTEN_DMY.is_match("9TH OF JANUARY, 2025"));
        assert!(DATE_WRITTEN_DMY.is_match("09-JAN-25"));

        assert!(DATE_NUMERIC_SEARCH.is_match("DATE 01/09/2025"));
        assert!(DATE_WRITTEN_SEARCH.is_match("ISSUED JANUARY 9, 2025"));
    }

    #[test]
    fn test_amount_patterns() {
        assert!(AMOUNT_FRACTION.is_match("45/100"));
        assert!(AMOUNT_FRACTION.is_match("NO/100"));
        assert!(!AMOUNT_FRACTION.is_match("450/100"));

        assert_eq!(CURRENCY_CODE.replace_all("RS. 2,500", ""), "2,500");
        assert_eq!(CURRENCY_CODE.replace_all("1,500.00 USD", ""), "1,500.00");
        assert_eq!(AMOUNT_TERMINATOR.replace("2,500/-", ""), "2,500");

        assert!(MONEY_SHAPE.is_match("$1500"));
        assert!(MONEY_SHAPE.is_match("1,500"));
        assert!(MONEY_SHAPE.is_match("250.00"));
        assert!(!MONEY_SHAPE.is_match("001234"));
    }

    #[test]
    fn test_cheque_number_prefix() {
        assert_eq!(CHEQUE_NUMBER_PREFIX.replace("#001234", ""), "001234");
        assert_eq!(CHEQUE_NUMBER_PREFIX.replace("NO. 1234", ""), "1234");
        assert_eq!(CHEQUE_NUMBER_PREFIX.replace("CHQ NO: 1234", ""), "1234");
        assert_eq!(CHEQUE_NUMBER_PREFIX.replace("1234", ""), "1234");
    }
}
