//! Date normalization.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::FieldNormalizer;
use super::patterns::{DATE_COMPACT, DATE_NUMERIC, DATE_WRITTEN_DMY, DATE_WRITTEN_MDY};
use crate::error::FormatError;

/// Component order of a numeric date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// MM/DD/YYYY.
    #[default]
    MonthFirst,
    /// DD/MM/YYYY.
    DayFirst,
    /// YYYY/MM/DD.
    YearFirst,
}

impl std::fmt::Display for DateOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateOrder::MonthFirst => write!(f, "M/D/Y"),
            DateOrder::DayFirst => write!(f, "D/M/Y"),
            DateOrder::YearFirst => write!(f, "Y/M/D"),
        }
    }
}

/// A parsed date and how it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedDate {
    pub date: NaiveDate,
    /// The order assumed when reading the components.
    pub order: DateOrder,
    /// Both day/month readings were valid and differed.
    pub ambiguous: bool,
}

/// Normalizes cheque dates to calendar dates.
#[derive(Debug, Clone)]
pub struct DateNormalizer {
    default_order: DateOrder,
    reference_year: i32,
    plausible_years: i32,
}

impl DateNormalizer {
    pub fn new(reference_year: i32) -> Self {
        Self {
            default_order: DateOrder::MonthFirst,
            reference_year,
            plausible_years: 10,
        }
    }

    /// Order assumed for ambiguous day/month dates.
    pub fn with_default_order(mut self, order: DateOrder) -> Self {
        self.default_order = order;
        self
    }

    /// Accepted distance, in years, from the reference year.
    pub fn with_plausible_years(mut self, years: u32) -> Self {
        self.plausible_years = i32::try_from(years).unwrap_or(i32::MAX);
        self
    }

    fn year_window(&self) -> (i32, i32) {
        (
            self.reference_year.saturating_sub(self.plausible_years),
            self.reference_year.saturating_add(self.plausible_years),
        )
    }

    /// Expand a two-digit year to the century closest to the reference year.
    pub fn resolve_year(&self, text: &str) -> Result<i32, FormatError> {
        let value: i32 = text
            .parse()
            .map_err(|_| FormatError::UnrecognizedDate(text.to_string()))?;

        match text.len() {
            4 => Ok(value),
            2 => {
                let century = self.reference_year.div_euclid(100) * 100;
                let year = [century - 100, century, century + 100]
                    .into_iter()
                    .map(|c| c + value)
                    .min_by_key(|y| (y - self.reference_year).abs())
                    .unwrap_or(century + value);
                Ok(year)
            }
            _ => Err(FormatError::UnrecognizedDate(text.to_string())),
        }
    }

    fn build(&self, year: i32, month: u32, day: u32) -> Result<NaiveDate, FormatError> {
        if !(1..=12).contains(&month) {
            return Err(FormatError::MonthOutOfRange(month));
        }
        let (min, max) = self.year_window();
        if year < min || year > max {
            return Err(FormatError::YearOutOfRange { year, min, max });
        }
        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(FormatError::DayOutOfRange { day, month, year })
    }

    /// Resolve `a/b/year` where either `a` or `b` may be the month.
    fn day_month(&self, a: u32, b: u32, year: i32) -> Result<NormalizedDate, FormatError> {
        let month_first = self.build(year, a, b);
        let day_first = self.build(year, b, a);

        match (month_first, day_first) {
            (Ok(m), Ok(d)) => {
                let order = self.default_order;
                let date = if order == DateOrder::DayFirst { d } else { m };
                Ok(NormalizedDate {
                    date,
                    order,
                    ambiguous: m != d,
                })
            }
            (Ok(m), Err(_)) => Ok(NormalizedDate {
                date: m,
                order: DateOrder::MonthFirst,
                ambiguous: false,
            }),
            (Err(_), Ok(d)) => Ok(NormalizedDate {
                date: d,
                order: DateOrder::DayFirst,
                ambiguous: false,
            }),
            // Report the reading the default order asked for.
            (Err(m), Err(d)) => Err(if self.default_order == DateOrder::DayFirst { d } else { m }),
        }
    }

    fn year_first(&self, year: &str, month: u32, day: u32) -> Result<NormalizedDate, FormatError> {
        let year = self.resolve_year(year)?;
        Ok(NormalizedDate {
            date: self.build(year, month, day)?,
            order: DateOrder::YearFirst,
            ambiguous: false,
        })
    }

    /// Parse a date in any supported notation.
    pub fn parse(&self, raw: &str) -> Result<NormalizedDate, FormatError> {
        let text = raw.trim().to_uppercase().replace('*', "");
        let text = text.trim();
        let unrecognized = || FormatError::UnrecognizedDate(raw.trim().to_string());
        let num = |s: &str| s.parse::<u32>().map_err(|_| unrecognized());

        if let Some(caps) = DATE_NUMERIC.captures(text) {
            let (a, b, c) = (&caps[1], &caps[2], &caps[3]);
            if a.len() == 4 {
                return self.year_first(a, num(b)?, num(c)?);
            }
            if a.len() > 2 {
                return Err(unrecognized());
            }
            let year = self.resolve_year(c)?;
            return self.day_month(num(a)?, num(b)?, year);
        }

        if let Some(caps) = DATE_COMPACT.captures(text) {
            let (a, b, c) = (&caps[1], &caps[2], &caps[3]);
            let year = self.resolve_year(c)?;
            return self.day_month(num(a)?, num(b)?, year).or_else(|err| {
                // YYYYMMDD
                self.year_first(&text[..4], num(&text[4..6])?, num(&text[6..])?)
                    .map_err(|_| err)
            });
        }

        if let Some(caps) = DATE_WRITTEN_MDY.captures(text) {
            let month = month_number(&caps[1]).ok_or_else(unrecognized)?;
            let year = self.resolve_year(&caps[3])?;
            return Ok(NormalizedDate {
                date: self.build(year, month, num(&caps[2])?)?,
                order: DateOrder::MonthFirst,
                ambiguous: false,
            });
        }

        if let Some(caps) = DATE_WRITTEN_DMY.captures(text) {
            let month = month_number(&caps[2]).ok_or_else(unrecognized)?;
            let year = self.resolve_year(&caps[3])?;
            return Ok(NormalizedDate {
                date: self.build(year, month, num(&caps[1])?)?,
                order: DateOrder::DayFirst,
                ambiguous: false,
            });
        }

        Err(unrecognized())
    }
}

impl FieldNormalizer for DateNormalizer {
    type Output = NormalizedDate;

    fn normalize(&self, raw: &str) -> Result<NormalizedDate, FormatError> {
        self.parse(raw)
    }
}

/// Month number from an English month name or abbreviation.
pub fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.trim().to_uppercase().chars().take(3).collect();
    let month = match prefix.as_str() {
        "JAN" => 1,
        "FEB" => 2,
        "MAR" => 3,
        "APR" => 4,
        "MAY" => 5,
        "JUN" => 6,
        "JUL" => 7,
        "AUG" => 8,
        "SEP" => 9,
        "OCT" => 10,
        "NOV" => 11,
        "DEC" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn normalizer() -> DateNormalizer {
        DateNormalizer::new(2026)
    }

    #[test]
    fn test_ambiguous_uses_default_order() {
        let parsed = normalizer().parse("01/09/2025").unwrap();
        assert_eq!(parsed.date, ymd(2025, 1, 9));
        assert_eq!(parsed.order, DateOrder::MonthFirst);
        assert!(parsed.ambiguous);

        let parsed = normalizer()
            .with_default_order(DateOrder::DayFirst)
            .parse("01/09/2025")
            .unwrap();
        assert_eq!(parsed.date, ymd(2025, 9, 1));
        assert_eq!(parsed.order, DateOrder::DayFirst);
        assert!(parsed.ambiguous);
    }

    #[test]
    fn test_unambiguous_day_first() {
        let parsed = normalizer().parse("25/12/2025").unwrap();
        assert_eq!(parsed.date, ymd(2025, 12, 25));
        assert_eq!(parsed.order, DateOrder::DayFirst);
        assert!(!parsed.ambiguous);
    }

    #[test]
    fn test_equal_day_and_month_not_ambiguous() {
        let parsed = normalizer().parse("05-05-2025").unwrap();
        assert_eq!(parsed.date, ymd(2025, 5, 5));
        assert!(!parsed.ambiguous);
    }

    #[test]
    fn test_two_digit_year_nearest_century() {
        let n = normalizer();
        assert_eq!(n.resolve_year("25").unwrap(), 2025);
        assert_eq!(n.resolve_year("99").unwrap(), 1999);
        assert_eq!(n.parse("1/9/25").unwrap().date, ymd(2025, 1, 9));
    }

    #[test]
    fn test_year_first_and_compact() {
        let n = normalizer();
        assert_eq!(n.parse("2025-01-09").unwrap().order, DateOrder::YearFirst);
        assert_eq!(n.parse("2025.01.09").unwrap().date, ymd(2025, 1, 9));
        assert_eq!(n.parse("25122025").unwrap().date, ymd(2025, 12, 25));
        assert_eq!(n.parse("20251225").unwrap().date, ymd(2025, 12, 25));
    }

    #[test]
    fn test_written_dates() {
        let n = normalizer();
        assert_eq!(n.parse("January 9, 2025").unwrap().date, ymd(2025, 1, 9));
        assert_eq!(n.parse("9th of January, 2025").unwrap().date, ymd(2025, 1, 9));
        assert_eq!(n.parse("09-Jan-25").unwrap().date, ymd(2025, 1, 9));
        assert!(!n.parse("Sept. 3rd 2024").unwrap().ambiguous);
    }

    #[test]
    fn test_idempotent_on_iso_output() {
        let n = normalizer();
        for raw in ["01/09/2025", "25/12/2025", "January 9, 2025", "09-Jan-25"] {
            let first = n.parse(raw).unwrap().date;
            let again = n.parse(&first.format("%Y-%m-%d").to_string()).unwrap().date;
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_rejects_invalid_dates() {
        let n = normalizer();
        assert!(matches!(n.parse("13/13/2025"), Err(FormatError::MonthOutOfRange(13))));
        assert!(matches!(n.parse("02/30/2025"), Err(FormatError::DayOutOfRange { .. })));
        assert!(matches!(n.parse("01/09/1950"), Err(FormatError::YearOutOfRange { .. })));
        assert!(matches!(n.parse("2025-13-01"), Err(FormatError::MonthOutOfRange(13))));
        assert!(matches!(n.parse("tomorrow"), Err(FormatError::UnrecognizedDate(_))));
    }

    #[test]
    fn test_wide_plausible_window_saturates() {
        let n = normalizer().with_plausible_years(u32::MAX);
        assert_eq!(n.parse("01/09/1950").unwrap().date, ymd(1950, 1, 9));
    }
}
