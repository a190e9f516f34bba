//! Written (legal) amount parsing and rendering.
//!
//! Accepts the English cardinal grammar printed on cheques, including Indian
//! lakh/crore scales, "and" connectors, currency words, a trailing "ONLY" and
//! a cents part given either as `NN/100` or as `<words> CENTS`.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use super::FieldNormalizer;
use super::patterns::AMOUNT_FRACTION;
use crate::cheque::anchors::similarity;
use crate::error::FormatError;

const ONES: [&str; 20] = [
    "ZERO", "ONE", "TWO", "THREE", "FOUR", "FIVE", "SIX", "SEVEN", "EIGHT", "NINE", "TEN",
    "ELEVEN", "TWELVE", "THIRTEEN", "FOURTEEN", "FIFTEEN", "SIXTEEN", "SEVENTEEN", "EIGHTEEN",
    "NINETEEN",
];

const TENS: [&str; 10] = [
    "", "", "TWENTY", "THIRTY", "FORTY", "FIFTY", "SIXTY", "SEVENTY", "EIGHTY", "NINETY",
];

const SCALES: &[(&str, u64)] = &[
    ("THOUSAND", 1_000),
    ("LAKH", 100_000),
    ("LAKHS", 100_000),
    ("LAC", 100_000),
    ("MILLION", 1_000_000),
    ("CRORE", 10_000_000),
    ("CRORES", 10_000_000),
    ("BILLION", 1_000_000_000),
];

const CURRENCY_WORDS: &[&str] = &[
    "DOLLAR", "DOLLARS", "RUPEE", "RUPEES", "POUND", "POUNDS", "EURO", "EUROS", "USD", "INR",
];

const MINOR_UNITS: &[&str] = &["CENT", "CENTS", "PAISA", "PAISE", "PENCE"];

const FILLERS: &[&str] = &["AND", "&", "ONLY"];

/// Scales used when rendering, largest first.
const RENDER_SCALES: &[(&str, u64)] = &[
    ("BILLION", 1_000_000_000),
    ("MILLION", 1_000_000),
    ("THOUSAND", 1_000),
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Word {
    Small(u64),
    Hundred,
    Scale(u64),
    Currency,
    Minor,
    Fraction(u64),
    Filler,
}

fn classify(word: &str) -> Option<Word> {
    if let Some(caps) = AMOUNT_FRACTION.captures(word) {
        return Some(Word::Fraction(caps[1].parse().unwrap_or(0)));
    }
    if let Some(v) = ONES.iter().position(|w| *w == word) {
        return Some(Word::Small(v as u64));
    }
    if let Some(v) = TENS.iter().position(|w| !w.is_empty() && *w == word) {
        return Some(Word::Small(v as u64 * 10));
    }
    match word {
        "A" => return Some(Word::Small(1)),
        "FOURTY" => return Some(Word::Small(40)),
        "HUNDRED" => return Some(Word::Hundred),
        _ => {}
    }
    if let Some((_, s)) = SCALES.iter().find(|(w, _)| *w == word) {
        return Some(Word::Scale(*s));
    }
    if CURRENCY_WORDS.contains(&word) {
        return Some(Word::Currency);
    }
    if MINOR_UNITS.contains(&word) {
        return Some(Word::Minor);
    }
    if FILLERS.contains(&word) {
        return Some(Word::Filler);
    }
    None
}

/// Closest vocabulary word for an OCR-damaged one.
fn fuzzy_classify(word: &str) -> Option<Word> {
    if word.chars().count() < 4 {
        return None;
    }

    let vocabulary = ONES
        .iter()
        .chain(TENS.iter().filter(|w| !w.is_empty()))
        .chain(std::iter::once(&"HUNDRED"))
        .chain(SCALES.iter().map(|(w, _)| w))
        .chain(CURRENCY_WORDS.iter())
        .chain(MINOR_UNITS.iter())
        .chain(std::iter::once(&"ONLY"));

    let (best, score) = vocabulary
        .map(|w| (*w, similarity(word, w)))
        .fold(("", 0.0f32), |acc, cur| if cur.1 > acc.1 { cur } else { acc });

    if score >= 0.8 {
        debug!("Corrected amount word '{}' to '{}'", word, best);
        classify(best)
    } else {
        None
    }
}

fn clean_word(word: &str) -> String {
    word.trim_matches(|c: char| matches!(c, '.' | ',' | ':' | ';' | '(' | ')'))
        .to_uppercase()
}

fn split_words(text: &str) -> Vec<String> {
    text.replace(['-', '*', ','], " ")
        .split_whitespace()
        .map(clean_word)
        .filter(|w| !w.is_empty())
        .collect()
}

/// Whether a word denotes a numeric value (ones, tens, scales, fractions).
pub fn is_number_word(word: &str) -> bool {
    let w = clean_word(word);
    w != "A"
        && matches!(
            classify(&w),
            Some(Word::Small(_) | Word::Hundred | Word::Scale(_) | Word::Fraction(_))
        )
}

/// Whether a word can appear in a written amount.
pub fn is_amount_word(word: &str) -> bool {
    classify(&clean_word(word)).is_some()
}

/// Parser for the written (legal) amount line.
#[derive(Debug, Clone)]
pub struct WrittenAmountParser {
    auto_correct: bool,
}

impl WrittenAmountParser {
    pub fn new() -> Self {
        Self { auto_correct: true }
    }

    /// Repair near-miss spellings ("THOUSANO") against the number vocabulary.
    pub fn with_auto_correct(mut self, enabled: bool) -> Self {
        self.auto_correct = enabled;
        self
    }
}

impl Default for WrittenAmountParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldNormalizer for WrittenAmountParser {
    type Output = Decimal;

    fn normalize(&self, raw: &str) -> Result<Decimal, FormatError> {
        parse_written_amount(raw, self.auto_correct)
    }
}

/// Parse a written amount into a decimal.
pub fn parse_written_amount(raw: &str, auto_correct: bool) -> Result<Decimal, FormatError> {
    let mut total: u64 = 0;
    let mut current: u64 = 0;
    let mut pending = false;
    let mut main: Option<u64> = None;
    let mut cents: Option<u64> = None;

    for word in split_words(raw) {
        let class = classify(&word)
            .or_else(|| if auto_correct { fuzzy_classify(&word) } else { None })
            .ok_or_else(|| FormatError::UnrecognizedWord(word.clone()))?;

        match class {
            Word::Small(v) => {
                current = current.checked_add(v).ok_or(FormatError::Overflow)?;
                pending = true;
            }
            Word::Hundred => {
                if current == 0 {
                    return Err(FormatError::MagnitudeWithoutValue(word));
                }
                if current >= 100 {
                    return Err(FormatError::MisplacedMagnitude(word));
                }
                current = current.checked_mul(100).ok_or(FormatError::Overflow)?;
            }
            Word::Scale(scale) => {
                if current == 0 {
                    return Err(FormatError::MagnitudeWithoutValue(word));
                }
                let part = current.checked_mul(scale).ok_or(FormatError::Overflow)?;
                total = total.checked_add(part).ok_or(FormatError::Overflow)?;
                current = 0;
            }
            Word::Currency => {
                if pending && main.is_none() {
                    main = Some(total.checked_add(current).ok_or(FormatError::Overflow)?);
                    total = 0;
                    current = 0;
                    pending = false;
                }
            }
            Word::Minor => {
                let value = total.checked_add(current).ok_or(FormatError::Overflow)?;
                if !pending || value >= 100 || cents.is_some() {
                    return Err(FormatError::InvalidFraction(word));
                }
                cents = Some(value);
                total = 0;
                current = 0;
                pending = false;
            }
            Word::Fraction(value) => {
                if cents.is_some() {
                    return Err(FormatError::InvalidFraction(word));
                }
                cents = Some(value);
            }
            Word::Filler => {}
        }
    }

    if pending {
        let value = total.checked_add(current).ok_or(FormatError::Overflow)?;
        match main {
            None => main = Some(value),
            // "ONE HUNDRED DOLLARS AND FIFTY": trailing words are cents.
            Some(_) if cents.is_none() && value < 100 => cents = Some(value),
            Some(_) => return Err(FormatError::InvalidFraction(value.to_string())),
        }
    }

    if main.is_none() && cents.is_none() {
        return Err(FormatError::NoNumberWords);
    }

    let mut amount = Decimal::from(main.unwrap_or(0)) + Decimal::new(cents.unwrap_or(0) as i64, 2);
    amount.rescale(2);
    Ok(amount)
}

fn below_thousand(n: u64, out: &mut Vec<String>) {
    let hundreds = n / 100;
    let rest = n % 100;

    if hundreds > 0 {
        out.push(ONES[hundreds as usize].to_string());
        out.push("HUNDRED".to_string());
    }
    if rest >= 20 {
        let (tens, ones) = (rest / 10, rest % 10);
        if ones > 0 {
            out.push(format!("{}-{}", TENS[tens as usize], ONES[ones as usize]));
        } else {
            out.push(TENS[tens as usize].to_string());
        }
    } else if rest > 0 {
        out.push(ONES[rest as usize].to_string());
    }
}

/// Render an amount in the canonical cheque form, e.g.
/// `ONE HUNDRED TWENTY-THREE DOLLARS AND 45/100`.
pub fn amount_to_words(amount: Decimal) -> Result<String, FormatError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(FormatError::InvalidAmount(amount.to_string()));
    }

    let rounded = amount.round_dp(2);
    let whole = rounded.trunc();
    let mut integer = whole.to_u64().ok_or(FormatError::Overflow)?;
    let cents = ((rounded - whole) * Decimal::ONE_HUNDRED)
        .to_u64()
        .ok_or(FormatError::Overflow)?;

    if integer >= 1_000_000_000_000 {
        return Err(FormatError::Overflow);
    }

    let mut words = Vec::new();
    if integer == 0 {
        words.push(ONES[0].to_string());
    }
    for (name, scale) in RENDER_SCALES {
        let chunk = integer / scale;
        if chunk > 0 {
            below_thousand(chunk, &mut words);
            words.push(name.to_string());
            integer %= scale;
        }
    }
    below_thousand(integer, &mut words);

    Ok(format!("{} DOLLARS AND {:02}/100", words.join(" "), cents))
}
