// In: src/config.rs

//! The single source of truth for comparison configuration.
//!
//! `CompareConfig` is created once at the application boundary (from a JSON
//! document or in code) and handed to the orchestration layer. The comparison
//! stages themselves never read it: they receive the already-resolved mode and
//! threshold as plain parameters.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::LevelFilter;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::NucdiffError;
use crate::types::QuantitySelection;

//==================================================================================
// I. Core Configuration Enums
//==================================================================================

/// How the discrepancy between a reference and a comparison value is measured.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub enum DeviationMode {
    /// **Default:** `|ref - cmp| / (1 + min(ref, cmp))`.
    #[default]
    Relative,

    /// `|ref - cmp|`.
    Absolute,
}

impl DeviationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviationMode::Relative => "relative",
            DeviationMode::Absolute => "absolute",
        }
    }
}

impl FromStr for DeviationMode {
    type Err = NucdiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "relative" => Ok(DeviationMode::Relative),
            "absolute" => Ok(DeviationMode::Absolute),
            _ => Err(NucdiffError::InvalidDeviationMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for DeviationMode {
    type Error = NucdiffError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviationMode> for String {
    fn from(mode: DeviationMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for DeviationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The significance threshold used when none is configured: `1e-12`.
pub fn default_threshold() -> Decimal {
    Decimal::new(1, 12)
}

/// Parses a decimal written either plainly (`0.000001`) or in scientific
/// notation (`1.0E-12`).
pub fn parse_decimal(s: &str) -> Result<Decimal, NucdiffError> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|e| NucdiffError::ConfigError(format!("Invalid decimal '{}': {}", s, e)))
}

//==================================================================================
// II. Sub-Configurations
//==================================================================================

/// Physical quantities as written in a config file: `"all"`, a single name, or
/// a list of names.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum QuantitiesSetting {
    One(String),
    Many(Vec<String>),
}

impl Default for QuantitiesSetting {
    fn default() -> Self {
        QuantitiesSetting::One("isotope".to_string())
    }
}

impl QuantitiesSetting {
    pub fn to_selection(&self) -> QuantitySelection {
        match self {
            QuantitiesSetting::One(name) if name.eq_ignore_ascii_case("all") => {
                QuantitySelection::All
            }
            QuantitiesSetting::One(name) => QuantitySelection::ByNames(vec![name.clone()]),
            QuantitiesSetting::Many(names) => QuantitySelection::ByNames(names.clone()),
        }
    }
}

/// Defines settings for the `log`/`env_logger` backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// If set, log records are appended to this file instead of stderr.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_file: None,
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<LevelFilter, NucdiffError> {
        LevelFilter::from_str(&self.level).map_err(|_| {
            NucdiffError::ConfigError(format!("Unknown log level '{}'", self.level))
        })
    }
}

//==================================================================================
// III. The Unified CompareConfig
//==================================================================================

/// The single, unified configuration for one reference-vs-comparison run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct CompareConfig {
    /// Name of the baseline file.
    pub reference_file: String,

    /// Name of the file checked against the baseline.
    pub comparison_file: String,

    #[serde(default)]
    pub physical_quantities: QuantitiesSetting,

    #[serde(default)]
    pub deviation_mode: DeviationMode,

    /// Rows whose deviation never strictly exceeds this value are dropped.
    #[serde(
        default = "default_threshold",
        serialize_with = "serialize_decimal",
        deserialize_with = "deserialize_decimal"
    )]
    pub threshold: Decimal,

    /// If true, every intermediate step column is fetched and compared, not
    /// only the final step. Also selects the `all_step_` report file name.
    #[serde(default)]
    pub is_all_step: bool,

    /// If true, columns that are missing in every surviving row are kept in
    /// the merged report.
    #[serde(default)]
    pub keep_all_missing_columns: bool,

    /// If set, only these nuclide names are compared.
    #[serde(default)]
    pub nuclides: Option<Vec<String>>,

    /// Directory reports are written under (one sub-directory per reference file).
    #[serde(default = "default_result_dir")]
    pub result_dir: PathBuf,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CompareConfig {
    /// Creates a config with defaults for everything except the two file names.
    pub fn new(reference_file: impl Into<String>, comparison_file: impl Into<String>) -> Self {
        Self {
            reference_file: reference_file.into(),
            comparison_file: comparison_file.into(),
            physical_quantities: QuantitiesSetting::default(),
            deviation_mode: DeviationMode::default(),
            threshold: default_threshold(),
            is_all_step: false,
            keep_all_missing_columns: false,
            nuclides: None,
            result_dir: default_result_dir(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, NucdiffError> {
        let config: CompareConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, NucdiffError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<(), NucdiffError> {
        if self.reference_file.trim().is_empty() || self.comparison_file.trim().is_empty() {
            return Err(NucdiffError::ConfigError(
                "reference_file and comparison_file must be non-empty".to_string(),
            ));
        }
        if self.threshold.is_sign_negative() {
            return Err(NucdiffError::ConfigError(format!(
                "threshold must not be negative, got {}",
                self.threshold
            )));
        }
        self.logging.level_filter()?;
        Ok(())
    }
}

/// Helper for `serde` to provide a default for `logging.level`.
fn default_log_level() -> String {
    "info".to_string()
}

/// Helper for `serde` to provide a default for `result_dir`.
fn default_result_dir() -> PathBuf {
    PathBuf::from("result")
}

fn serialize_decimal<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn deserialize_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_decimal(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config =
            CompareConfig::from_json_str(r#"{"reference_file": "001", "comparison_file": "002"}"#)
                .unwrap();
        assert_eq!(config, CompareConfig::new("001", "002"));
        assert_eq!(config.threshold, Decimal::from_str("0.000000000001").unwrap());
        assert_eq!(
            config.physical_quantities.to_selection(),
            QuantitySelection::ByNames(vec!["isotope".to_string()])
        );
    }

    #[test]
    fn test_full_json() {
        let config = CompareConfig::from_json_str(
            r#"{
                "reference_file": "001",
                "comparison_file": "002",
                "physical_quantities": "all",
                "deviation_mode": "absolute",
                "threshold": "1.0E-9",
                "is_all_step": true,
                "nuclides": ["U235", "Pu239"],
                "result_dir": "/tmp/reports",
                "logging": {"level": "debug"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.deviation_mode, DeviationMode::Absolute);
        assert_eq!(config.threshold, Decimal::new(1, 9));
        assert_eq!(config.physical_quantities.to_selection(), QuantitySelection::All);
        assert!(config.is_all_step);
        assert_eq!(config.nuclides.as_deref().map(<[String]>::len), Some(2));
        assert_eq!(config.logging.level_filter().unwrap(), LevelFilter::Debug);
    }

    #[test]
    fn test_wrong_deviation_mode_is_a_config_error() {
        assert!(matches!(
            "squared".parse::<DeviationMode>(),
            Err(NucdiffError::InvalidDeviationMode(_))
        ));

        let err = CompareConfig::from_json_str(
            r#"{"reference_file": "a", "comparison_file": "b", "deviation_mode": "squared"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Wrong deviation mode"));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let err = CompareConfig::from_json_str(
            r#"{"reference_file": "a", "comparison_file": "b", "threshold": "-1"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, NucdiffError::ConfigError(_)));
    }

    #[test]
    fn test_config_serializes_back_to_json() {
        let mut config = CompareConfig::new("001", "002");
        config.physical_quantities = QuantitiesSetting::Many(vec!["isotope".into(), "flux".into()]);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""deviation_mode":"relative""#));
        assert_eq!(CompareConfig::from_json_str(&json).unwrap(), config);
    }
}
