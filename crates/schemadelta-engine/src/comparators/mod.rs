//! Comparator strategies
//!
//! Each strategy declares a priority per object type and may implement any
//! of the three operations. Whatever it does not implement falls through to
//! the next, more generic strategy in the chain.

mod column;
mod default;
mod foreign_key;
mod index;
mod primary_key;
mod relation;
mod schema;
mod unique_constraint;

pub use column::ColumnComparator;
pub use default::DefaultComparator;
pub use foreign_key::ForeignKeyComparator;
pub use index::IndexComparator;
pub use primary_key::PrimaryKeyComparator;
pub use relation::RelationComparator;
pub use schema::SchemaComparator;
pub use unique_constraint::UniqueConstraintComparator;

use crate::chain::Chain;
use crate::differences::{NameEquality, ObjectDifferences};
use crate::error::CompareError;
use schemadelta_core::{ObjectRef, ObjectType};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// How specific a strategy is for a type; higher runs first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Priority(pub u32);

impl Priority {
    /// Not applicable to the type
    pub const NONE: Priority = Priority(0);

    /// Generic fallback for any type
    pub const DEFAULT: Priority = Priority(1);

    /// Written for this type specifically
    pub const TYPE: Priority = Priority(5);

    /// Dialect or extension overrides that must outrank the built-ins
    pub const fn custom(value: u32) -> Self {
        Priority(value)
    }
}

/// Bucketing hash: ordered, normalised tokens
///
/// A partial hash means an identity component was missing, so the object
/// may match candidates from any bucket of its type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObjectHash {
    pub tokens: Vec<String>,
    pub partial: bool,
}

impl ObjectHash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash that places the object in the wildcard bucket
    pub fn partial() -> Self {
        Self {
            tokens: Vec::new(),
            partial: true,
        }
    }

    pub fn push(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into());
    }

    /// Add an identity-bearing name; an absent name makes the hash partial
    pub fn push_name(&mut self, name: Option<&str>) {
        match name {
            Some(name) => self.push(normalize_token(name)),
            None => self.partial = true,
        }
    }

    /// Add a name that narrows the hash but does not carry identity
    pub fn push_optional(&mut self, name: Option<&str>) {
        if let Some(name) = name {
            self.push(normalize_token(name));
        }
    }

    /// Append another hash's tokens; partiality is left to the caller
    pub fn extend(&mut self, other: &ObjectHash) {
        self.tokens.extend(other.tokens.iter().cloned());
    }

    pub fn mark_partial(&mut self) {
        self.partial = true;
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Bucket key, or `None` when the object belongs in the wildcard bucket
    pub fn primary(&self) -> Option<&str> {
        if self.partial {
            return None;
        }
        self.tokens.first().map(String::as_str)
    }
}

impl fmt::Display for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.tokens.join(", "))?;
        if self.partial {
            write!(f, " (partial)")?;
        }
        Ok(())
    }
}

fn normalize_token(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A comparison strategy
///
/// `chain` is positioned after this strategy. Default method bodies pass
/// the call on unchanged.
pub trait ObjectComparator: Send + Sync {
    /// Short name used in diagnostics
    fn name(&self) -> &'static str;

    fn priority(&self, object_type: &ObjectType) -> Priority;

    /// Custom object types this strategy handles, so the registry can order
    /// their chains when it is built
    fn custom_types(&self) -> Vec<ObjectType> {
        Vec::new()
    }

    fn hash(&self, object: ObjectRef<'_>, chain: &Chain<'_>) -> Result<ObjectHash, CompareError> {
        chain.hash(object)
    }

    fn is_same_object(&self, a: ObjectRef<'_>, b: ObjectRef<'_>, chain: &Chain<'_>) -> Result<bool, CompareError> {
        chain.is_same_object(a, b)
    }

    /// Add attributes settled here to `exclude` before calling the chain,
    /// then compare them with their own equality function
    fn find_differences(
        &self,
        a: ObjectRef<'_>,
        b: ObjectRef<'_>,
        chain: &Chain<'_>,
        exclude: &mut BTreeSet<String>,
    ) -> Result<ObjectDifferences, CompareError> {
        chain.find_differences(a, b, exclude)
    }
}

/// Report a rename of a constraint-like object
///
/// Only declared names are compared. A name missing on one side is unknown
/// rather than changed, and identity already fell back to structure.
pub(crate) fn compare_declared_names(
    differences: &mut ObjectDifferences,
    a: ObjectRef<'_>,
    b: ObjectRef<'_>,
    chain: &Chain<'_>,
) -> Result<(), CompareError> {
    if a.name().is_some() && b.name().is_some() {
        differences.compare_with("name", a, b, &NameEquality::new(chain.context()))?;
    }
    Ok(())
}

/// Hash of an object owned by a relation: the relation's tokens, then the
/// object's own name
///
/// Without a relation the object can only be found by name, which the
/// relation-keyed buckets of its peers do not reflect, so the hash is partial.
pub(crate) fn relation_keyed_hash(object: ObjectRef<'_>, chain: &Chain<'_>) -> Result<ObjectHash, CompareError> {
    let Some(relation) = object.relation() else {
        let mut hash = ObjectHash::partial();
        hash.push_optional(object.name());
        return Ok(hash);
    };

    let relation_hash = chain.related_hash(relation)?;
    let mut hash = ObjectHash::new();
    hash.extend(&relation_hash);
    if relation_hash.is_partial() {
        hash.mark_partial();
    }
    hash.push_optional(object.name());
    Ok(hash)
}

/// Pairwise, positional identity of two ordered column lists
///
/// Each column is viewed as belonging to `relation_a` / `relation_b`
/// before the registry compares it.
pub(crate) fn columns_match_by_position(
    columns_a: &[ObjectRef<'_>],
    relation_a: Option<ObjectRef<'_>>,
    columns_b: &[ObjectRef<'_>],
    relation_b: Option<ObjectRef<'_>>,
    chain: &Chain<'_>,
) -> Result<bool, CompareError> {
    if columns_a.len() != columns_b.len() {
        return Ok(false);
    }

    let bind_a = relation_a.map(|r| r.id);
    let bind_b = relation_b.map(|r| r.id);
    for (a, b) in columns_a.iter().zip(columns_b) {
        if !chain.related_is_same(a.bound_to(bind_a), b.bound_to(bind_b))? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order() {
        assert!(Priority::TYPE > Priority::DEFAULT);
        assert!(Priority::DEFAULT > Priority::NONE);
        assert!(Priority::custom(10) > Priority::TYPE);
    }

    #[test]
    fn hash_tokens() {
        let mut hash = ObjectHash::new();
        hash.push_name(Some(" Users "));
        hash.push_optional(None);
        hash.push_optional(Some("PUBLIC"));
        assert_eq!(hash.tokens, vec!["users", "public"]);
        assert_eq!(hash.primary(), Some("users"));
        assert_eq!(hash.to_string(), "[users, public]");

        let mut unnamed = ObjectHash::new();
        unnamed.push_name(None);
        assert!(unnamed.is_partial());
        assert_eq!(unnamed.primary(), None);
        assert_eq!(ObjectHash::new().primary(), None);
    }
}
