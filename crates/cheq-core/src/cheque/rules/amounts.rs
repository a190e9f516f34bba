//! Numeric amount parsing for the courtesy amount box.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::FieldNormalizer;
use super::patterns::{AMOUNT_TERMINATOR, CURRENCY_CODE};
use crate::cheque::anchors::CURRENCY_SYMBOLS;
use crate::error::FormatError;

/// Parser for amounts written with digits ("$1,500.00", "Rs. 2,500/-").
#[derive(Debug, Clone)]
pub struct NumericAmountParser {
    auto_correct: bool,
}

impl NumericAmountParser {
    pub fn new() -> Self {
        Self { auto_correct: true }
    }

    /// Map OCR letter confusions (O, I, S, B, Z) to digits before parsing.
    pub fn with_auto_correct(mut self, enabled: bool) -> Self {
        self.auto_correct = enabled;
        self
    }
}

impl Default for NumericAmountParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldNormalizer for NumericAmountParser {
    type Output = Decimal;

    fn normalize(&self, raw: &str) -> Result<Decimal, FormatError> {
        parse_numeric_amount(raw, self.auto_correct)
    }
}

/// Replace letters OCR commonly confuses with digits.
///
/// Only applied to text that already contains a digit.
pub fn correct_digit_confusions(text: &str) -> String {
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return text.to_string();
    }
    text.chars()
        .map(|c| match c {
            'O' | 'o' | 'Q' | 'D' => '0',
            'I' | 'l' | 'L' | '|' => '1',
            'S' | 's' => '5',
            'B' => '8',
            'Z' | 'z' => '2',
            other => other,
        })
        .collect()
}

/// Strip currency marks and decoration around a numeric amount.
fn strip_decoration(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    let no_symbols: String = upper
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != '*')
        .collect();
    let no_codes = CURRENCY_CODE.replace_all(no_symbols.trim(), "");
    let no_terminator = AMOUNT_TERMINATOR.replace(&no_codes, "");
    no_terminator
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'')
        .collect()
}

/// Check thousands groups: the first 1-3 digits, the last exactly 3,
/// middle groups 2-3 (Indian lakh grouping).
fn valid_groups(groups: &[&str]) -> bool {
    let n = groups.len();
    groups.iter().enumerate().all(|(i, g)| {
        let len = g.len();
        len > 0
            && g.chars().all(|c| c.is_ascii_digit())
            && match i {
                0 => len <= 3,
                i if i == n - 1 => len == 3,
                _ => len == 2 || len == 3,
            }
    })
}

/// Parse a numeric cheque amount.
///
/// A final separator followed by two digits is the decimal point, as is a
/// lone separator followed by one digit; followed by three digits it is a
/// thousands separator. Any other separators must form valid thousands groups.
pub fn parse_numeric_amount(raw: &str, auto_correct: bool) -> Result<Decimal, FormatError> {
    let invalid = || FormatError::InvalidAmount(raw.trim().to_string());

    let mut text = strip_decoration(raw);
    if auto_correct {
        text = correct_digit_confusions(&text);
    }
    let text = text.trim_end_matches(['.', ',']);

    if text.is_empty()
        || !text.chars().any(|c| c.is_ascii_digit())
        || !text.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.')
    {
        return Err(invalid());
    }

    let (integer, fraction) = match text.rfind([',', '.']) {
        None => (text.to_string(), String::new()),
        Some(pos) => {
            let sep = &text[pos..pos + 1];
            let after = &text[pos + 1..];
            let before = &text[..pos];

            let grouped = before.contains([',', '.']);
            if after.len() == 2 || (after.len() == 1 && !grouped) {
                // Grouping separators must differ from the decimal mark.
                if before.contains(sep) {
                    return Err(invalid());
                }
                let groups: Vec<&str> = before.split([',', '.']).collect();
                if groups.len() > 1 && !valid_groups(&groups) {
                    return Err(invalid());
                }
                (groups.concat(), after.to_string())
            } else if after.len() == 3 {
                let groups: Vec<&str> = text.split([',', '.']).collect();
                let mixed = text.contains(',') && text.contains('.');
                if mixed || !valid_groups(&groups) {
                    return Err(invalid());
                }
                (groups.concat(), String::new())
            } else {
                return Err(invalid());
            }
        }
    };

    if integer.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }

    let integer = if integer.is_empty() { "0" } else { integer.as_str() };
    let literal = if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{}.{}", integer, fraction)
    };

    let mut value = Decimal::from_str(&literal).map_err(|_| invalid())?;
    value.rescale(2);
    Ok(value)
}

/// Format an amount with comma thousands separators and two decimals.
pub fn format_amount(amount: Decimal) -> String {
    let s = format!("{:.2}", amount.abs());
    let (integer, decimal) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, decimal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn parse(s: &str) -> Result<Decimal, FormatError> {
        parse_numeric_amount(s, true)
    }

    #[test]
    fn test_parse_us_format() {
        assert_eq!(parse("$1,500.00").unwrap(), dec("1500.00"));
        assert_eq!(parse("1500").unwrap(), dec("1500"));
        assert_eq!(parse("USD 12.5").unwrap(), dec("12.50"));
        assert_eq!(parse("1,234,567.89").unwrap(), dec("1234567.89"));
        assert_eq!(parse("$ 1,500").unwrap(), dec("1500"));
    }

    #[test]
    fn test_parse_european_and_indian_formats() {
        assert_eq!(parse("1.500,00").unwrap(), dec("1500"));
        assert_eq!(parse("1,50,000.00").unwrap(), dec("150000"));
        assert_eq!(parse("Rs. 2,500/-").unwrap(), dec("2500"));
        assert_eq!(parse("₹75,000/=").unwrap(), dec("75000"));
    }

    #[test]
    fn test_parse_scale_is_two_places() {
        assert_eq!(parse("1500").unwrap().to_string(), "1500.00");
        assert_eq!(parse("**1500.5**").unwrap().to_string(), "1500.50");
    }

    #[test]
    fn test_single_decimal_digit_needs_lone_separator() {
        assert!(matches!(parse_numeric_amount("1,500.5", false), Err(FormatError::InvalidAmount(_))));
        assert!(parse("**1,500.5**").is_err());
        assert_eq!(parse("1500,5").unwrap(), dec("1500.50"));
    }

    #[test]
    fn test_auto_correct_confusions() {
        assert_eq!(parse("l,5OO.OO").unwrap(), dec("1500"));
        assert_eq!(parse("$1,5OO.OO").unwrap(), dec("1500"));
        assert!(parse_numeric_amount("l,5OO.OO", false).is_err());
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(parse("ABC"), Err(FormatError::InvalidAmount(_))));
        assert!(parse("").is_err());
        assert!(parse("1,2345.00").is_err());
        assert!(parse("12,34,5").is_err());
        assert!(parse("1.500.00").is_err());
        assert!(parse("1,000.000").is_err());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec("1500")), "1,500.00");
        assert_eq!(format_amount(dec("123.4")), "123.40");
        assert_eq!(format_amount(dec("1234567.891")), "1,234,567.89");
        assert_eq!(format_amount(Decimal::ZERO), "0.00");
    }
}
