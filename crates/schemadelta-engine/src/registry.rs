//! Comparator registry
//!
//! The registry is built once, then only read. For every object type it
//! keeps the applicable comparators ordered by priority, most specific
//! first, and drives them through a [`Chain`]. Chains for built-in types and
//! declared custom types are ordered at build time; any other custom type is
//! ordered on first use and remembered.

use crate::chain::Chain;
use crate::comparators::{
    ColumnComparator, DefaultComparator, ForeignKeyComparator, IndexComparator, ObjectComparator, ObjectHash,
    PrimaryKeyComparator, Priority, RelationComparator, SchemaComparator, UniqueConstraintComparator,
};
use crate::context::CompareContext;
use crate::differences::{Difference, ObjectDifferences};
use crate::error::CompareError;
use schemadelta_core::{AttributeValue, ObjectRef, ObjectType};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock};

/// Default recursion cap for comparator delegation
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Collects comparators before the registry is frozen
pub struct RegistryBuilder {
    comparators: Vec<Arc<dyn ObjectComparator>>,
    max_depth: usize,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            comparators: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Add a comparator; among equal priorities, earlier registrations run first
    pub fn register(self, comparator: impl ObjectComparator + 'static) -> Self {
        self.register_arc(Arc::new(comparator))
    }

    pub fn register_arc(mut self, comparator: Arc<dyn ObjectComparator>) -> Self {
        self.comparators.push(comparator);
        self
    }

    /// Cap on nested registry calls; deeper calls answer "not the same"
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn build(self) -> Registry {
        let custom = self.comparators.iter().flat_map(|c| c.custom_types());
        let chains: HashMap<ObjectType, Vec<Arc<dyn ObjectComparator>>> = ObjectType::BUILT_IN
            .iter()
            .cloned()
            .chain(custom)
            .map(|t| {
                let links = order_chain(&self.comparators, &t);
                (t, links)
            })
            .collect();

        tracing::debug!(
            comparators = self.comparators.len(),
            chains = chains.len(),
            max_depth = self.max_depth,
            "comparator registry built"
        );

        Registry {
            comparators: self.comparators,
            chains,
            discovered: RwLock::new(HashMap::new()),
            max_depth: self.max_depth,
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Applicable comparators for a type, highest priority first
///
/// The sort is stable, so ties keep registration order.
fn order_chain(comparators: &[Arc<dyn ObjectComparator>], object_type: &ObjectType) -> Vec<Arc<dyn ObjectComparator>> {
    let mut applicable: Vec<(Priority, &Arc<dyn ObjectComparator>)> = comparators
        .iter()
        .map(|c| (c.priority(object_type), c))
        .filter(|(priority, _)| *priority != Priority::NONE)
        .collect();

    applicable.sort_by(|a, b| b.0.cmp(&a.0));
    applicable.into_iter().map(|(_, c)| Arc::clone(c)).collect()
}

/// Immutable, thread-safe comparator registry
pub struct Registry {
    comparators: Vec<Arc<dyn ObjectComparator>>,
    chains: HashMap<ObjectType, Vec<Arc<dyn ObjectComparator>>>,

    /// Chains of undeclared custom types, ordered on first use
    discovered: RwLock<HashMap<ObjectType, Arc<[Arc<dyn ObjectComparator>]>>>,
    max_depth: usize,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Builder preloaded with the built-in comparators, for adding
    /// dialect-specific or custom-type comparators on top
    pub fn standard_builder() -> RegistryBuilder {
        RegistryBuilder::new()
            .register(DefaultComparator)
            .register(SchemaComparator)
            .register(RelationComparator)
            .register(ColumnComparator)
            .register(IndexComparator)
            .register(PrimaryKeyComparator)
            .register(UniqueConstraintComparator)
            .register(ForeignKeyComparator)
    }

    /// Registry with the built-in comparators
    pub fn standard() -> Self {
        Self::standard_builder().build()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Ordered comparator chain for a type
    pub fn chain_for(&self, object_type: &ObjectType) -> Result<Vec<Arc<dyn ObjectComparator>>, CompareError> {
        self.with_links(object_type, |links| Ok(links.to_vec()))
    }

    /// Comparator names in chain order, for diagnostics
    pub fn chain_names(&self, object_type: &ObjectType) -> Result<Vec<&'static str>, CompareError> {
        self.with_links(object_type, |links| Ok(links.iter().map(|c| c.name()).collect()))
    }

    /// Bucketing hash of an object
    pub fn hash(&self, object: ObjectRef<'_>, context: &CompareContext) -> Result<ObjectHash, CompareError> {
        self.hash_at(object, context, 0)
    }

    /// Whether two objects from different snapshots are the same logical object
    pub fn is_same_object(
        &self,
        a: ObjectRef<'_>,
        b: ObjectRef<'_>,
        context: &CompareContext,
    ) -> Result<bool, CompareError> {
        self.is_same_at(a, b, context, 0)
    }

    /// Attribute-level differences between two matched objects
    pub fn find_differences(
        &self,
        a: ObjectRef<'_>,
        b: ObjectRef<'_>,
        context: &CompareContext,
    ) -> Result<ObjectDifferences, CompareError> {
        self.differences_at(a, b, context, 0)
    }

    /// Chain of a custom type no comparator declared
    fn discovered_chain(&self, object_type: &ObjectType) -> Arc<[Arc<dyn ObjectComparator>]> {
        let known = self
            .discovered
            .read()
            .ok()
            .and_then(|discovered| discovered.get(object_type).cloned());
        if let Some(links) = known {
            return links;
        }

        let links: Arc<[Arc<dyn ObjectComparator>]> = order_chain(&self.comparators, object_type).into();
        tracing::debug!(object_type = %object_type, links = links.len(), "comparator chain ordered");
        match self.discovered.write() {
            Ok(mut discovered) => Arc::clone(discovered.entry(object_type.clone()).or_insert(links)),
            Err(_) => links,
        }
    }

    /// Run `f` over the chain for a type
    fn with_links<T>(
        &self,
        object_type: &ObjectType,
        f: impl FnOnce(&[Arc<dyn ObjectComparator>]) -> Result<T, CompareError>,
    ) -> Result<T, CompareError> {
        let discovered;
        let links = match self.chains.get(object_type) {
            Some(links) => links.as_slice(),
            None => {
                discovered = self.discovered_chain(object_type);
                &discovered[..]
            }
        };

        if links.is_empty() {
            return Err(CompareError::UnsupportedType(object_type.clone()));
        }
        f(links)
    }

    fn too_deep(&self, depth: usize, operation: &str, object_type: &ObjectType) -> bool {
        let exceeded = depth > self.max_depth;
        if exceeded {
            tracing::debug!(
                depth,
                max_depth = self.max_depth,
                operation,
                object_type = %object_type,
                "comparator recursion capped"
            );
        }
        exceeded
    }

    pub(crate) fn hash_at(
        &self,
        object: ObjectRef<'_>,
        context: &CompareContext,
        depth: usize,
    ) -> Result<ObjectHash, CompareError> {
        let object_type = object.object_type();
        self.with_links(&object_type, |links| {
            if self.too_deep(depth, "hash", &object_type) {
                return Ok(ObjectHash::partial());
            }
            Chain::new(self, context, links, depth).hash(object)
        })
    }

    pub(crate) fn is_same_at(
        &self,
        a: ObjectRef<'_>,
        b: ObjectRef<'_>,
        context: &CompareContext,
        depth: usize,
    ) -> Result<bool, CompareError> {
        let object_type = a.object_type();
        self.with_links(&object_type, |links| {
            if b.object_type() != object_type || self.too_deep(depth, "is_same_object", &object_type) {
                return Ok(false);
            }
            Chain::new(self, context, links, depth).is_same_object(a, b)
        })
    }

    pub(crate) fn differences_at(
        &self,
        a: ObjectRef<'_>,
        b: ObjectRef<'_>,
        context: &CompareContext,
        depth: usize,
    ) -> Result<ObjectDifferences, CompareError> {
        let object_type = a.object_type();
        self.with_links(&object_type, |links| {
            let compared_type = b.object_type();
            if compared_type != object_type {
                let mut differences = ObjectDifferences::default();
                differences.add(Difference {
                    attribute: "type".to_string(),
                    reference: Some(AttributeValue::Text(object_type.to_string())),
                    compared: Some(AttributeValue::Text(compared_type.to_string())),
                });
                return Ok(differences);
            }
            if self.too_deep(depth, "find_differences", &object_type) {
                return Ok(ObjectDifferences::default());
            }

            let mut exclude = BTreeSet::new();
            Chain::new(self, context, links, depth).find_differences(a, b, &mut exclude)
        })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.comparators.iter().map(|c| c.name()).collect();
        f.debug_struct("Registry")
            .field("comparators", &names)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}
