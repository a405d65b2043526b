//! Offline probe that classifies type names by dialect

use crate::probe::{DialectProbe, ProbeError, ProbeRequest, TypeFamily};
use schemadelta_core::DialectConfig;

/// Classifies declared type names into character and binary large-object
/// families
///
/// Needs no database connection, so it never fails or blocks.
#[derive(Debug, Clone, Default)]
pub struct TypeFamilyProbe;

impl TypeFamilyProbe {
    pub fn new() -> Self {
        Self
    }

    fn character_types(dialect: DialectConfig) -> &'static [&'static str] {
        match dialect {
            DialectConfig::Postgres => &["text"],
            DialectConfig::MySql => &["tinytext", "text", "mediumtext", "longtext"],
            DialectConfig::Oracle => &["clob", "nclob", "long"],
            DialectConfig::MsSql => &["varchar(max)", "nvarchar(max)", "text", "ntext"],
            DialectConfig::Sqlite => &["text", "clob"],
            DialectConfig::Ansi => &["clob", "nclob", "text", "characterlargeobject"],
        }
    }

    fn binary_types(dialect: DialectConfig) -> &'static [&'static str] {
        match dialect {
            DialectConfig::Postgres => &["bytea", "oid"],
            DialectConfig::MySql => &["tinyblob", "blob", "mediumblob", "longblob"],
            DialectConfig::Oracle => &["blob", "longraw"],
            DialectConfig::MsSql => &["varbinary(max)", "image"],
            DialectConfig::Sqlite => &["blob"],
            DialectConfig::Ansi => &["blob", "binarylargeobject"],
        }
    }

    /// Classify a declared type without going through a request
    pub fn classify(dialect: DialectConfig, data_type: &str) -> TypeFamily {
        let normalized = normalize_type(data_type);
        if Self::character_types(dialect).contains(&normalized.as_str()) {
            TypeFamily::CharacterLargeObject
        } else if Self::binary_types(dialect).contains(&normalized.as_str()) {
            TypeFamily::BinaryLargeObject
        } else {
            TypeFamily::Other
        }
    }
}

/// Lowercase and strip whitespace, so "VARCHAR (MAX)" reads as "varchar(max)"
pub(crate) fn normalize_type(data_type: &str) -> String {
    data_type
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

impl DialectProbe for TypeFamilyProbe {
    fn name(&self) -> &'static str {
        "type-family"
    }

    fn type_family(&self, request: &ProbeRequest) -> Result<TypeFamily, ProbeError> {
        Ok(Self::classify(request.dialect, &request.data_type))
    }
}
