//! Diagnostic codes for schema differences
//!
//! Diagnostic codes are part of the report format.
//! Never rename or remove codes; add new ones instead.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    /// Object exists in the reference snapshot only
    ObjectMissing,

    /// Object exists in the comparison snapshot only
    ObjectUnexpected,

    /// Object exists on both sides with differing attributes
    ObjectChanged,

    /// No comparator is registered for an object type
    UnsupportedObjectType,

    /// General informational message
    Info,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ObjectMissing => "OBJECT_MISSING",
            Self::ObjectUnexpected => "OBJECT_UNEXPECTED",
            Self::ObjectChanged => "OBJECT_CHANGED",
            Self::UnsupportedObjectType => "UNSUPPORTED_OBJECT_TYPE",
            Self::Info => "INFO",
        }
    }

    /// Severity used when the configuration has no override
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::ObjectMissing | Self::UnsupportedObjectType => Severity::Error,
            Self::ObjectUnexpected | Self::ObjectChanged => Severity::Warn,
            Self::Info => Severity::Info,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warn,

    /// Error - blocking issue that should fail CI
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One differing attribute, rendered for humans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub attribute: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub compared: Option<String>,
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Object type identifier (e.g. "unique_constraint")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,

    /// Dotted object path (e.g. "public.users.uq_email")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    /// Attribute-level changes for changed objects
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<AttributeChange>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            object_type: None,
            object: None,
            changes: Vec::new(),
        }
    }

    /// Set the object this diagnostic is about
    pub fn with_object(mut self, object_type: impl Into<String>, path: impl Into<String>) -> Self {
        self.object_type = Some(object_type.into());
        self.object = Some(path.into());
        self
    }

    /// Set attribute-level changes
    pub fn with_changes(mut self, changes: Vec<AttributeChange>) -> Self {
        self.changes = changes;
        self
    }
}
