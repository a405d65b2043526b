use super::{ObjectComparator, ObjectHash, Priority};
use crate::chain::Chain;
use crate::context::SchemaKey;
use crate::differences::ObjectDifferences;
use crate::error::CompareError;
use schemadelta_core::{ObjectRef, ObjectType};
use std::collections::BTreeSet;

/// Schemas are identified through the session's schema equivalence
///
/// Declared mappings can pair schemas whose names share nothing, so every
/// schema hashes into the wildcard bucket.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaComparator;

impl ObjectComparator for SchemaComparator {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn priority(&self, object_type: &ObjectType) -> Priority {
        match object_type {
            ObjectType::Schema => Priority::TYPE,
            _ => Priority::NONE,
        }
    }

    fn hash(&self, object: ObjectRef<'_>, _chain: &Chain<'_>) -> Result<ObjectHash, CompareError> {
        let mut hash = ObjectHash::partial();
        hash.push_optional(object.name());
        Ok(hash)
    }

    fn is_same_object(&self, a: ObjectRef<'_>, b: ObjectRef<'_>, chain: &Chain<'_>) -> Result<bool, CompareError> {
        Ok(chain
            .context()
            .is_equivalent_schema(&SchemaKey::of(&a), &SchemaKey::of(&b)))
    }

    fn find_differences(
        &self,
        a: ObjectRef<'_>,
        b: ObjectRef<'_>,
        chain: &Chain<'_>,
        exclude: &mut BTreeSet<String>,
    ) -> Result<ObjectDifferences, CompareError> {
        exclude.insert("name".to_string());
        exclude.insert("catalog".to_string());
        chain.find_differences(a, b, exclude)
    }
}
