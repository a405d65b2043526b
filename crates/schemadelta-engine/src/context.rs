//! Schema comparison context
//!
//! Built once per diff session and shared read-only by every comparator.

use schemadelta_catalog::{BoundedProbe, DialectProbe, ProbeError, TypeFamilyProbe};
use schemadelta_core::{Config, DialectConfig, ObjectKind, ObjectRef, SchemaLocation};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Catalog and schema name pair identifying one schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    pub catalog: Option<String>,
    pub schema: Option<String>,
}

impl SchemaKey {
    pub fn new(catalog: Option<&str>, schema: Option<&str>) -> Self {
        Self {
            catalog: catalog.map(str::to_string),
            schema: schema.map(str::to_string),
        }
    }

    /// Key of a schema object; other object types give an empty key
    pub fn of(object: &ObjectRef<'_>) -> Self {
        match &object.object.kind {
            ObjectKind::Schema(def) => Self {
                catalog: def.catalog.clone(),
                schema: object.object.name.clone(),
            },
            _ => Self::default(),
        }
    }
}

impl From<&SchemaLocation> for SchemaKey {
    fn from(location: &SchemaLocation) -> Self {
        Self {
            catalog: location.catalog.clone(),
            schema: location.schema.clone(),
        }
    }
}

impl fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let catalog = self.catalog.as_deref().unwrap_or("<default>");
        let schema = self.schema.as_deref().unwrap_or("<default>");
        write!(f, "{}.{}", catalog, schema)
    }
}

/// A reference schema declared equivalent to a comparison schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaComparison {
    pub reference: SchemaKey,
    pub comparison: SchemaKey,
}

/// Session-scoped settings threaded through every comparator call
#[derive(Clone, Default)]
pub struct CompareContext {
    schema_comparisons: Vec<SchemaComparison>,
    case_sensitive_names: bool,
    dialect: DialectConfig,
    probe: Option<Arc<dyn DialectProbe>>,
}

impl CompareContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the session context described by a configuration
    pub fn from_config(config: &Config) -> Self {
        let mut context = Self::new()
            .with_dialect(config.dialect)
            .with_case_sensitive_names(config.case_sensitive_names);

        for mapping in &config.schema_mappings {
            context = context.with_schema_comparison(
                SchemaKey::from(&mapping.reference),
                SchemaKey::from(&mapping.comparison),
            );
        }

        if config.use_type_probe {
            context = context.with_probe(Arc::new(TypeFamilyProbe::new()));
        }

        context
    }

    /// Like [`CompareContext::from_config`], with a live probe bounded by
    /// `probe_timeout_ms`
    pub fn from_config_with_live_probe(config: &Config, probe: Arc<dyn DialectProbe>) -> Result<Self, ProbeError> {
        Self::from_config(config).with_bounded_probe(probe, Duration::from_millis(config.probe_timeout_ms))
    }

    /// Declare `reference` on one side equivalent to `comparison` on the other
    pub fn with_schema_comparison(mut self, reference: SchemaKey, comparison: SchemaKey) -> Self {
        self.schema_comparisons.push(SchemaComparison { reference, comparison });
        self
    }

    pub fn with_case_sensitive_names(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive_names = case_sensitive;
        self
    }

    pub fn with_dialect(mut self, dialect: DialectConfig) -> Self {
        self.dialect = dialect;
        self
    }

    /// Use a probe that answers without blocking
    pub fn with_probe(mut self, probe: Arc<dyn DialectProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Use a probe that may block, run on a bounded worker thread
    pub fn with_bounded_probe(self, probe: Arc<dyn DialectProbe>, timeout: Duration) -> Result<Self, ProbeError> {
        let bounded = BoundedProbe::new(probe, timeout)?;
        Ok(self.with_probe(Arc::new(bounded)))
    }

    pub fn schema_comparisons(&self) -> &[SchemaComparison] {
        &self.schema_comparisons
    }

    pub fn dialect(&self) -> DialectConfig {
        self.dialect
    }

    pub fn probe(&self) -> Option<&dyn DialectProbe> {
        self.probe.as_deref()
    }

    /// Name-matching rule: trimmed, case-insensitive unless configured
    /// otherwise. Two absent names match; one absent name does not.
    pub fn names_match(&self, a: Option<&str>, b: Option<&str>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                let (a, b) = (a.trim(), b.trim());
                if self.case_sensitive_names {
                    a == b
                } else {
                    a.to_lowercase() == b.to_lowercase()
                }
            }
            _ => false,
        }
    }

    /// Absent components stand for the connection default and match anything
    fn components_match(&self, a: Option<&str>, b: Option<&str>) -> bool {
        match (a, b) {
            (Some(_), Some(_)) => self.names_match(a, b),
            _ => true,
        }
    }

    fn keys_equal(&self, a: &SchemaKey, b: &SchemaKey) -> bool {
        self.names_match(a.catalog.as_deref(), b.catalog.as_deref())
            && self.names_match(a.schema.as_deref(), b.schema.as_deref())
    }

    /// Whether schema `a` on one side is the same schema as `b` on the other
    ///
    /// Declared comparisons hold in both directions and are added on top of
    /// plain name matching.
    pub fn is_equivalent_schema(&self, a: &SchemaKey, b: &SchemaKey) -> bool {
        let mapped = self.schema_comparisons.iter().any(|m| {
            (self.keys_equal(&m.reference, a) && self.keys_equal(&m.comparison, b))
                || (self.keys_equal(&m.reference, b) && self.keys_equal(&m.comparison, a))
        });

        mapped
            || (self.components_match(a.catalog.as_deref(), b.catalog.as_deref())
                && self.components_match(a.schema.as_deref(), b.schema.as_deref()))
    }
}

impl fmt::Debug for CompareContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompareContext")
            .field("schema_comparisons", &self.schema_comparisons)
            .field("case_sensitive_names", &self.case_sensitive_names)
            .field("dialect", &self.dialect)
            .field("probe", &self.probe.as_ref().map(|p| p.name()))
            .finish()
    }
}
