//! Cheque serial number normalization.

use serde::{Deserialize, Serialize};

use super::FieldNormalizer;
use super::amounts::correct_digit_confusions;
use super::patterns::CHEQUE_NUMBER_PREFIX;
use crate::error::FormatError;

/// Check-digit scheme applied to the serial, when the issuer uses one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumRule {
    #[default]
    None,
    Luhn,
    /// Weights 2..=7 from the right, check digit `(11 - sum % 11) % 11`.
    Mod11,
}

impl ChecksumRule {
    /// Verify the trailing check digit of an all-digit string.
    pub fn verify(&self, digits: &str) -> bool {
        let values: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
        if values.len() != digits.len() {
            return false;
        }

        match self {
            ChecksumRule::None => true,
            ChecksumRule::Luhn => {
                if values.len() < 2 {
                    return false;
                }
                let sum: u32 = values
                    .iter()
                    .rev()
                    .enumerate()
                    .map(|(i, &d)| {
                        if i % 2 == 1 {
                            let doubled = d * 2;
                            if doubled > 9 { doubled - 9 } else { doubled }
                        } else {
                            d
                        }
                    })
                    .sum();
                sum % 10 == 0
            }
            ChecksumRule::Mod11 => {
                let Some((&check, payload)) = values.split_last() else {
                    return false;
                };
                if payload.is_empty() {
                    return false;
                }
                let sum: u32 = payload
                    .iter()
                    .rev()
                    .enumerate()
                    .map(|(i, &d)| d * (2 + (i as u32 % 6)))
                    .sum();
                let expected = (11 - sum % 11) % 11;
                expected < 10 && expected == check
            }
        }
    }
}

/// A normalized cheque number and its plausibility checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChequeNumber {
    /// Digits with leading zeros preserved.
    pub digits: String,
    pub length_ok: bool,
    pub checksum_ok: bool,
}

/// Normalizes the cheque serial to a digit string.
#[derive(Debug, Clone)]
pub struct ChequeNumberRule {
    min_digits: usize,
    max_digits: usize,
    checksum: ChecksumRule,
    auto_correct: bool,
}

impl ChequeNumberRule {
    pub fn new(min_digits: usize, max_digits: usize) -> Self {
        Self {
            min_digits,
            max_digits,
            checksum: ChecksumRule::None,
            auto_correct: true,
        }
    }

    pub fn with_checksum(mut self, checksum: ChecksumRule) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn with_auto_correct(mut self, enabled: bool) -> Self {
        self.auto_correct = enabled;
        self
    }

    pub fn min_digits(&self) -> usize {
        self.min_digits
    }

    pub fn max_digits(&self) -> usize {
        self.max_digits
    }
}

impl Default for ChequeNumberRule {
    fn default() -> Self {
        Self::new(3, 6)
    }
}

impl FieldNormalizer for ChequeNumberRule {
    type Output = ChequeNumber;

    fn normalize(&self, raw: &str) -> Result<ChequeNumber, FormatError> {
        let upper = raw.trim().to_uppercase();
        let stripped = CHEQUE_NUMBER_PREFIX.replace(&upper, "");
        let mut text: String = stripped
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        if self.auto_correct {
            text = correct_digit_confusions(&text);
        }

        if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
            return Err(FormatError::NoDigits(raw.trim().to_string()));
        }

        let len = text.len();
        Ok(ChequeNumber {
            length_ok: (self.min_digits..=self.max_digits).contains(&len),
            checksum_ok: self.checksum.verify(&text),
            digits: text,
        })
    }
}

/// Whether a token looks like a bare serial (digits with optional prefix).
pub fn looks_like_serial(text: &str) -> bool {
    let upper = text.trim().to_uppercase();
    let stripped = CHEQUE_NUMBER_PREFIX.replace(&upper, "");
    !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_prefixes_and_keeps_zeros() {
        let rule = ChequeNumberRule::default();
        let n = rule.normalize("#001234").unwrap();
        assert_eq!(n.digits, "001234");
        assert!(n.length_ok);

        assert_eq!(rule.normalize("No. 1234").unwrap().digits, "1234");
        assert_eq!(rule.normalize("12 34").unwrap().digits, "1234");
    }

    #[test]
    fn test_length_range() {
        let rule = ChequeNumberRule::new(3, 6);
        assert!(!rule.normalize("12").unwrap().length_ok);
        assert!(!rule.normalize("1234567").unwrap().length_ok);
        assert!(rule.normalize("123").unwrap().length_ok);
    }

    #[test]
    fn test_auto_correct() {
        let rule = ChequeNumberRule::default();
        assert_eq!(rule.normalize("1O34").unwrap().digits, "1034");
        assert!(rule.clone().with_auto_correct(false).normalize("1O34").is_err());
    }

    #[test]
    fn test_rejects_non_digits() {
        let rule = ChequeNumberRule::default();
        assert_eq!(rule.normalize("MEMO"), Err(FormatError::NoDigits("MEMO".into())));
        assert!(rule.normalize("").is_err());
    }

    #[test]
    fn test_luhn() {
        assert!(ChecksumRule::Luhn.verify("79927398713"));
        assert!(!ChecksumRule::Luhn.verify("79927398710"));
        assert!(ChecksumRule::None.verify("1234"));
    }

    #[test]
    fn test_mod11() {
        // 1234: sum = 3*2 + 2*3 + 1*4 = 16, check = (11 - 5) % 11 = 6
        assert!(ChecksumRule::Mod11.verify("1236"));
        assert!(!ChecksumRule::Mod11.verify("1234"));

        let rule = ChequeNumberRule::default().with_checksum(ChecksumRule::Mod11);
        assert!(!rule.normalize("1234").unwrap().checksum_ok);
    }

    #[test]
    fn test_looks_like_serial() {
        assert!(looks_like_serial("1234"));
        assert!(looks_like_serial("#001234"));
        assert!(!looks_like_serial("1,500.00"));
        assert!(!looks_like_serial("JOHN"));
    }
}
