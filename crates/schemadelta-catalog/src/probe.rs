//! Dialect probe trait

use schemadelta_core::DialectConfig;
use std::fmt;
use std::time::Duration;

/// Identifies the column a probe is asked about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub dialect: DialectConfig,

    /// Owning table or view, if known
    pub relation: Option<String>,

    pub column: String,

    /// Declared type as captured in the snapshot
    pub data_type: String,
}

impl ProbeRequest {
    /// Create a new probe request
    pub fn new(
        dialect: DialectConfig,
        relation: Option<&str>,
        column: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            dialect,
            relation: relation.map(str::to_string),
            column: column.into(),
            data_type: data_type.into(),
        }
    }
}

impl fmt::Display for ProbeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.relation {
            Some(relation) => write!(f, "{}.{} {} ({})", relation, self.column, self.data_type, self.dialect.as_str()),
            None => write!(f, "{} {} ({})", self.column, self.data_type, self.dialect.as_str()),
        }
    }
}

/// Storage family of a declared column type
///
/// Two differently written types are interchangeable only when both fall in
/// the same large-object family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    /// Character data (CLOB, NCLOB, TEXT, ...)
    CharacterLargeObject,

    /// Binary data (BLOB, BYTEA, IMAGE, ...)
    BinaryLargeObject,

    Other,
}

impl TypeFamily {
    pub fn is_large_object(&self) -> bool {
        !matches!(self, Self::Other)
    }

    /// Whether two types in these families hold the same kind of data
    pub fn interchangeable_with(&self, other: &TypeFamily) -> bool {
        self.is_large_object() && self == other
    }
}

/// Errors a probe may report
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("Probe unavailable: {0}")]
    Unavailable(String),

    #[error("Probe query failed: {0}")]
    QueryError(String),
}

/// Optional, dialect-specific source of structural evidence
///
/// Implementations must be cheap to share across threads; the comparison
/// context holds one behind an `Arc` for the whole diff session.
pub trait DialectProbe: Send + Sync {
    /// Get the probe name (e.g. "type-family", "Mock")
    fn name(&self) -> &'static str;

    /// Storage family of the column's declared type on the dialect
    fn type_family(&self, request: &ProbeRequest) -> Result<TypeFamily, ProbeError>;
}
