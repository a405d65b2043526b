//! Configuration schema (schemadelta.toml)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::diagnostic::{DiagnosticCode, Severity};
use crate::object::ObjectType;

/// Database dialect the snapshots were captured from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectConfig {
    Postgres,
    MySql,
    Oracle,
    MsSql,
    Sqlite,

    /// Generic ANSI SQL
    #[default]
    Ansi,
}

impl DialectConfig {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Oracle => "oracle",
            Self::MsSql => "mssql",
            Self::Sqlite => "sqlite",
            Self::Ansi => "ansi",
        }
    }
}

/// Severity threshold overrides for specific diagnostic codes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityThreshold {
    /// Map of diagnostic code to severity override
    #[serde(default)]
    pub overrides: HashMap<String, Severity>,
}

impl SeverityThreshold {
    /// Get severity for a diagnostic code, or its default
    pub fn get_severity(&self, code: DiagnosticCode) -> Severity {
        self.overrides
            .get(code.as_str())
            .copied()
            .unwrap_or_else(|| code.default_severity())
    }

    /// Set severity override for a code
    pub fn set_override(&mut self, code: DiagnosticCode, severity: Severity) {
        self.overrides.insert(code.as_str().to_string(), severity);
    }
}

/// One side of a schema mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaLocation {
    #[serde(default)]
    pub catalog: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,
}

/// Declares a reference schema equivalent to a comparison schema
/// (e.g. `dev` on one side is `prod` on the other)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMapping {
    pub reference: SchemaLocation,
    pub comparison: SchemaLocation,
}

/// Objects to leave out of a diff
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectFilters {
    /// Object type identifiers, e.g. "sequence"
    #[serde(default)]
    pub skip_types: Vec<String>,

    /// Object name patterns (glob, any number of `*` wildcards)
    #[serde(default)]
    pub skip_objects: Vec<String>,
}

impl ObjectFilters {
    /// Check if a whole object type is skipped
    pub fn is_type_skipped(&self, object_type: &ObjectType) -> bool {
        self.skip_types
            .iter()
            .any(|t| ObjectType::parse(t) == *object_type)
    }

    /// Check if an object name matches any skip pattern
    pub fn is_object_skipped(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.skip_objects.iter().any(|pattern| {
            let pattern = pattern.to_lowercase();
            if pattern.contains('*') {
                glob_match(&pattern, &name)
            } else {
                pattern == name
            }
        })
    }
}

fn default_max_depth() -> usize {
    8
}

fn default_probe_timeout_ms() -> u64 {
    250
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Dialect of both snapshots
    #[serde(default)]
    pub dialect: DialectConfig,

    /// Compare object names case-sensitively
    #[serde(default)]
    pub case_sensitive_names: bool,

    /// Recursion cap for comparator delegation
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Upper bound for a single dialect probe call
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Use the offline type-family probe to settle data type differences
    #[serde(default)]
    pub use_type_probe: bool,

    /// Schema equivalences across the two sides
    #[serde(default)]
    pub schema_mappings: Vec<SchemaMapping>,

    /// Severity thresholds
    #[serde(default)]
    pub severity: SeverityThreshold,

    /// Objects excluded from diffs
    #[serde(default)]
    pub filters: ObjectFilters,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: DialectConfig::default(),
            case_sensitive_names: false,
            max_depth: default_max_depth(),
            probe_timeout_ms: default_probe_timeout_ms(),
            use_type_probe: false,
            schema_mappings: Vec::new(),
            severity: SeverityThreshold::default(),
            filters: ObjectFilters::default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config.max_depth == 0 {
            return Err(ConfigError::InvalidValue("max_depth must be at least 1".to_string()));
        }

        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }
}

/// Simple glob matching; each `*` matches any run of characters
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let middle: Vec<&str> = parts.collect();
    let Some((last, middle)) = middle.split_last() else {
        // No wildcard at all
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
