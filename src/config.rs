//! Configuration for seeq.
//!
//! Two layers live here: [`AggregationConfig`], the validated, immutable
//! settings for a single aggregation run, and [`Config`], the persisted
//! defaults the CLI starts from.

use crate::extractor::{ExtractorConfig, DEFAULT_SEARCH_PREFIX};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Calendar unit used to bucket events, or `Raw` for one entry per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Raw,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 6] = [
        Granularity::Raw,
        Granularity::Hour,
        Granularity::Day,
        Granularity::Week,
        Granularity::Month,
        Granularity::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Raw => "raw",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| ConfigError::Invalid {
                field: "granularity",
                value: s.to_string(),
            })
    }
}

/// How a query's text is split into counted tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tokenization {
    /// The whole query is one token
    Full,
    /// Split on single spaces
    Words,
}

impl Tokenization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tokenization::Full => "full",
            Tokenization::Words => "words",
        }
    }
}

impl fmt::Display for Tokenization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tokenization {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Tokenization::Full),
            "words" => Ok(Tokenization::Words),
            other => Err(ConfigError::Invalid {
                field: "search_string",
                value: other.to_string(),
            }),
        }
    }
}

/// Parse an IANA timezone name.
pub fn parse_timezone(s: &str) -> Result<Tz, ConfigError> {
    s.parse::<Tz>().map_err(|_| ConfigError::Invalid {
        field: "timezone",
        value: s.to_string(),
    })
}

/// Settings for one aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationConfig {
    pub granularity: Granularity,
    pub tokenization: Tokenization,
    /// Zone used for calendar flooring and window keys
    pub timezone: Tz,
}

impl AggregationConfig {
    pub fn new(granularity: Granularity, tokenization: Tokenization) -> Self {
        Self {
            granularity,
            tokenization,
            timezone: Tz::UTC,
        }
    }

    /// Validate raw option strings, as received from a form or command line.
    pub fn parse(granularity: &str, tokenization: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(granularity.parse()?, tokenization.parse()?))
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self::new(Granularity::Hour, Tokenization::Words)
    }
}

/// Persisted defaults for the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default bucketing unit
    pub granularity: Granularity,

    /// Default tokenization
    pub search_string: Tokenization,

    /// Zone for calendar windows
    #[serde(with = "tz_serde")]
    pub timezone: Tz,

    /// Archive entry prefix holding search activity
    pub search_prefix: String,

    /// Directory for output documents
    pub export_path: PathBuf,

    /// Directory for the transparency log
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("seeq");

        Self {
            granularity: Granularity::Hour,
            search_string: Tokenization::Words,
            timezone: Tz::UTC,
            search_prefix: DEFAULT_SEARCH_PREFIX.to_string(),
            export_path: data_dir.join("exports"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `config_path`.
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// read or holds an unknown option is an error.
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("seeq")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Aggregation settings derived from these defaults.
    pub fn aggregation(&self) -> AggregationConfig {
        AggregationConfig::new(self.granularity, self.search_string).with_timezone(self.timezone)
    }

    /// Extractor settings derived from these defaults.
    pub fn extractor(&self) -> ExtractorConfig {
        ExtractorConfig {
            search_prefix: self.search_prefix.clone(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: unknown {field} {value:?}")]
    Invalid { field: &'static str, value: String },
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
}

/// Serde support for timezones as IANA names.
mod tz_serde {
    use chrono_tz::Tz;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(tz: &Tz, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(tz.name())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Tz, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse::<Tz>()
            .map_err(|_| D::Error::custom(format!("unknown timezone {name:?}")))
    }
}
