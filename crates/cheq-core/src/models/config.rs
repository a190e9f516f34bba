//! Configuration structures for the extraction engine.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cheque::anchors::{Anchor, AnchorKind};
use crate::cheque::locator::Region;
use crate::cheque::rules::cheque_number::ChecksumRule;
use crate::cheque::rules::dates::DateOrder;
use crate::error::ChequeError;

/// Prefix of environment variables that override configuration values.
pub const ENV_PREFIX: &str = "CHEQ_";

/// Main configuration for the cheq engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChequeConfig {
    /// General extraction settings.
    pub extraction: ExtractionConfig,

    /// Field label anchors.
    pub anchors: Vec<Anchor>,

    /// Spatial relation parameters.
    pub spatial: SpatialConfig,

    /// Date normalization.
    pub date: DateConfig,

    /// Cheque number rule.
    pub cheque_number: ChequeNumberConfig,

    /// Confidence weighting coefficients.
    pub confidence: ConfidenceConfig,

    /// Logging defaults for the CLI.
    pub logging: LoggingConfig,
}

impl Default for ChequeConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig::default(),
            anchors: Anchor::default_set(),
            spatial: SpatialConfig::default(),
            date: DateConfig::default(),
            cheque_number: ChequeNumberConfig::default(),
            confidence: ConfidenceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// General extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Tokens recognized below this confidence are ignored when locating fields.
    pub min_token_confidence: f32,

    /// Correct common letter/digit OCR confusions in numeric fields.
    pub auto_correct: bool,

    /// Maximum number of consecutive tokens merged when matching an anchor.
    pub max_anchor_window: usize,

    /// Guess the payee from name-shaped text when no payee label is found.
    pub payee_name_fallback: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_token_confidence: 0.3,
            auto_correct: true,
            max_anchor_window: 4,
            payee_name_fallback: false,
        }
    }
}

/// Spatial relation parameters. Distances are fractions of the image size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Maximum gap between an anchor and the first value token (of width).
    pub max_horizontal_gap: f32,

    /// Maximum gap between two merged tokens of one span (of width).
    pub merge_gap: f32,

    /// Maximum gap between an anchor line and the line below it (of height).
    pub max_vertical_gap: f32,

    /// Region searched for the cheque number.
    pub cheque_number_region: Region,

    /// Maximum tokens merged into one span, per field.
    pub max_span: SpanLimits,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            max_horizontal_gap: 0.25,
            merge_gap: 0.06,
            max_vertical_gap: 0.12,
            cheque_number_region: Region::new(0.8, 0.0, 1.0, 0.15),
            max_span: SpanLimits::default(),
        }
    }
}

/// Maximum span length in tokens, per field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanLimits {
    pub payee: usize,
    pub amount_numeric: usize,
    pub amount_written: usize,
    pub date: usize,
    pub cheque_number: usize,
}

impl Default for SpanLimits {
    fn default() -> Self {
        Self {
            payee: 6,
            amount_numeric: 3,
            amount_written: 16,
            date: 4,
            cheque_number: 1,
        }
    }
}

/// Date normalization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    /// Order assumed when day and month are both <= 12.
    pub default_order: DateOrder,

    /// Accepted distance in years from the reference year.
    pub plausible_years: u32,

    /// Reference year; `None` means the current year.
    pub reference_year: Option<i32>,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            default_order: DateOrder::MonthFirst,
            plausible_years: 10,
            reference_year: None,
        }
    }
}

/// Cheque number rule settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChequeNumberConfig {
    pub min_digits: usize,
    pub max_digits: usize,

    /// Optional bank-specific checksum.
    pub checksum: ChecksumRule,

    /// Format factor applied when the digit count or checksum is off.
    pub out_of_range_factor: f32,
}

impl Default for ChequeNumberConfig {
    fn default() -> Self {
        Self {
            min_digits: 3,
            max_digits: 6,
            checksum: ChecksumRule::None,
            out_of_range_factor: 0.5,
        }
    }
}

/// Confidence weighting coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Weight of the method score (anchor match quality) in a field confidence.
    pub anchor_weight: f32,

    /// Weight of the mean OCR confidence in a field confidence.
    pub ocr_weight: f32,

    /// Method score of a span found in a configured region.
    pub region_score: f32,

    /// Method score of a span found by a fallback heuristic.
    pub fallback_score: f32,

    /// Format factor of fallback-derived fields.
    pub fallback_factor: f32,

    /// Format factor of a date parsed under an assumed day/month order.
    pub ambiguity_factor: f32,

    /// Cap on overall confidence when a consistency check fails.
    pub consistency_ceiling: f32,

    /// Overall confidence below which a result needs review.
    pub review_threshold: f32,

    /// Per-field weights of the overall confidence.
    pub weights: FieldWeights,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            anchor_weight: 0.4,
            ocr_weight: 0.6,
            region_score: 0.85,
            fallback_score: 0.6,
            fallback_factor: 0.85,
            ambiguity_factor: 0.9,
            consistency_ceiling: 0.5,
            review_threshold: 0.7,
            weights: FieldWeights::default(),
        }
    }
}

/// Per-field weights of the overall confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldWeights {
    pub payee: f32,
    pub amount: f32,
    pub date: f32,
    pub cheque_number: f32,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            payee: 0.25,
            amount: 0.4,
            date: 0.2,
            cheque_number: 0.15,
        }
    }
}

/// Logging defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when no `-v` flag is given (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl ChequeConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ChequeError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), ChequeError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Anchor definition for a kind.
    pub fn anchor(&self, kind: AnchorKind) -> Option<&Anchor> {
        self.anchors.iter().find(|a| a.kind == kind)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ChequeError> {
        let unit = |name: &str, v: f32| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(ChequeError::Config(format!("{name} must be between 0 and 1, got {v}")))
            }
        };

        unit("extraction.min_token_confidence", self.extraction.min_token_confidence)?;
        if self.extraction.max_anchor_window == 0 {
            return Err(ChequeError::Config(
                "extraction.max_anchor_window must be at least 1".to_string(),
            ));
        }

        for (i, anchor) in self.anchors.iter().enumerate() {
            if self.anchors[..i].iter().any(|a| a.kind == anchor.kind) {
                return Err(ChequeError::Config(format!(
                    "anchor {:?} is defined more than once",
                    anchor.kind
                )));
            }
            unit(&format!("threshold of {:?}", anchor.kind), anchor.threshold)?;
            if anchor.variants.iter().all(|v| v.trim().is_empty()) {
                return Err(ChequeError::Config(format!(
                    "anchor {:?} has no variants",
                    anchor.kind
                )));
            }
        }

        unit("spatial.max_horizontal_gap", self.spatial.max_horizontal_gap)?;
        unit("spatial.merge_gap", self.spatial.merge_gap)?;
        unit("spatial.max_vertical_gap", self.spatial.max_vertical_gap)?;
        if !self.spatial.cheque_number_region.is_valid() {
            return Err(ChequeError::Config(
                "spatial.cheque_number_region must lie inside the unit square".to_string(),
            ));
        }

        if self.date.plausible_years > 100 {
            return Err(ChequeError::Config(format!(
                "date.plausible_years must be at most 100, got {}",
                self.date.plausible_years
            )));
        }
        if let Some(year) = self.date.reference_year {
            if !(1000..=9999).contains(&year) {
                return Err(ChequeError::Config(format!(
                    "date.reference_year must be a four-digit year, got {year}"
                )));
            }
        }

        let cn = &self.cheque_number;
        if cn.min_digits == 0 || cn.min_digits > cn.max_digits {
            return Err(ChequeError::Config(format!(
                "cheque_number digit range {}..={} is empty",
                cn.min_digits, cn.max_digits
            )));
        }
        unit("cheque_number.out_of_range_factor", cn.out_of_range_factor)?;

        let c = &self.confidence;
        for (name, v) in [
            ("confidence.region_score", c.region_score),
            ("confidence.fallback_score", c.fallback_score),
            ("confidence.fallback_factor", c.fallback_factor),
            ("confidence.ambiguity_factor", c.ambiguity_factor),
            ("confidence.consistency_ceiling", c.consistency_ceiling),
            ("confidence.review_threshold", c.review_threshold),
        ] {
            unit(name, v)?;
        }
        if c.anchor_weight < 0.0 || c.ocr_weight < 0.0 || c.anchor_weight + c.ocr_weight <= 0.0 {
            return Err(ChequeError::Config(
                "confidence.anchor_weight and ocr_weight must be non-negative and not both zero"
                    .to_string(),
            ));
        }
        let w = &c.weights;
        if [w.payee, w.amount, w.date, w.cheque_number].iter().any(|v| *v < 0.0)
            || w.payee + w.amount + w.date + w.cheque_number <= 0.0
        {
            return Err(ChequeError::Config(
                "confidence.weights must be non-negative with a positive sum".to_string(),
            ));
        }

        Ok(())
    }

    /// Set a value by dotted key path (e.g. `date.default_order`).
    ///
    /// The value is parsed as JSON, falling back to a plain string.
    pub fn set_path(&mut self, key: &str, value: &str) -> Result<(), ChequeError> {
        let parsed: serde_json::Value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));

        let mut json = serde_json::to_value(&*self)?;
        let parts: Vec<&str> = key.split('.').collect();
        let mut current = &mut json;

        for (i, part) in parts.iter().enumerate() {
            let obj = current
                .as_object_mut()
                .ok_or_else(|| ChequeError::Config(format!("cannot set value at {key}")))?;
            if !obj.contains_key(*part) {
                return Err(ChequeError::Config(format!("configuration key not found: {key}")));
            }
            if i == parts.len() - 1 {
                obj.insert((*part).to_string(), parsed);
                break;
            }
            current = obj
                .get_mut(*part)
                .ok_or_else(|| ChequeError::Config(format!("configuration key not found: {key}")))?;
        }

        *self = serde_json::from_value(json)?;
        Ok(())
    }

    /// Apply `CHEQ_<SECTION>__<KEY>` overrides from an iterator of variables.
    ///
    /// Path segments are separated by a double underscore and lowercased, so
    /// `CHEQ_DATE__PLAUSIBLE_YEARS=5` sets `date.plausible_years`. Unknown keys
    /// are errors.
    pub fn apply_overrides<I, K, V>(&mut self, vars: I) -> Result<usize, ChequeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut applied = 0;
        for (name, value) in vars {
            let Some(rest) = name.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let key = rest.to_lowercase().replace("__", ".");
            self.set_path(&key, value.as_ref())?;
            tracing::debug!("Applied config override {} = {}", key, value.as_ref());
            applied += 1;
        }
        Ok(applied)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<usize, ChequeError> {
        self.apply_overrides(std::env::vars())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ChequeConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.anchor(AnchorKind::PayeeLabel).is_some());
        assert!(config.confidence.weights.amount > config.confidence.weights.payee);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ChequeConfig =
            serde_json::from_str(r#"{"date": {"default_order": "day_first"}}"#).unwrap();
        assert_eq!(config.date.default_order, DateOrder::DayFirst);
        assert_eq!(config.date.plausible_years, 10);
        assert_eq!(config.cheque_number.min_digits, 3);
        assert!(!config.anchors.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let mut config = ChequeConfig::default();
        config.cheque_number.min_digits = 7;
        assert!(matches!(config.validate(), Err(ChequeError::Config(_))));

        let mut config = ChequeConfig::default();
        config.confidence.consistency_ceiling = 1.5;
        assert!(config.validate().is_err());

        let mut config = ChequeConfig::default();
        config.spatial.cheque_number_region = Region::new(0.9, 0.0, 0.8, 0.2);
        assert!(config.validate().is_err());

        let mut config = ChequeConfig::default();
        config.anchors.push(Anchor::new(AnchorKind::DateLabel, &["DT"], 0.9));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_date_window() {
        let mut config = ChequeConfig::default();
        config.date.plausible_years = u32::MAX;
        assert!(matches!(config.validate(), Err(ChequeError::Config(_))));

        let mut config = ChequeConfig::default();
        config.date.plausible_years = 100;
        config.date.reference_year = Some(2026);
        assert!(config.validate().is_ok());

        config.date.reference_year = Some(i32::MAX);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_set_path() {
        let mut config = ChequeConfig::default();
        config.set_path("cheque_number.max_digits", "8").unwrap();
        assert_eq!(config.cheque_number.max_digits, 8);

        config.set_path("date.default_order", "day_first").unwrap();
        assert_eq!(config.date.default_order, DateOrder::DayFirst);

        assert!(config.set_path("date.no_such_key", "1").is_err());
        assert!(config.set_path("cheque_number.max_digits", "\"many\"").is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = ChequeConfig::default();
        let vars = vec![
            ("CHEQ_DATE__PLAUSIBLE_YEARS", "5"),
            ("CHEQ_CONFIDENCE__WEIGHTS__AMOUNT", "0.5"),
            ("HOME", "/root"),
        ];

        let applied = config.apply_overrides(vars).unwrap();
        assert_eq!(applied, 2);
        assert_eq!(config.date.plausible_years, 5);
        assert_eq!(config.confidence.weights.amount, 0.5);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = ChequeConfig::default();
        config.cheque_number.checksum = ChecksumRule::Luhn;
        config.save(&path).unwrap();

        let loaded = ChequeConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
