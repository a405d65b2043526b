use super::{ObjectComparator, ObjectHash, Priority};
use crate::chain::Chain;
use crate::differences::{NameEquality, NormalizedTextEquality, ObjectDifferences, SameObjectEquality};
use crate::error::CompareError;
use schemadelta_core::{ObjectRef, ObjectType};
use std::collections::BTreeSet;

/// Tables and views: name within an equivalent schema
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationComparator;

impl ObjectComparator for RelationComparator {
    fn name(&self) -> &'static str {
        "relation"
    }

    fn priority(&self, object_type: &ObjectType) -> Priority {
        if object_type.is_relation() {
            Priority::TYPE
        } else {
            Priority::NONE
        }
    }

    fn hash(&self, object: ObjectRef<'_>, _chain: &Chain<'_>) -> Result<ObjectHash, CompareError> {
        let mut hash = ObjectHash::new();
        hash.push_name(object.name());
        Ok(hash)
    }

    fn is_same_object(&self, a: ObjectRef<'_>, b: ObjectRef<'_>, chain: &Chain<'_>) -> Result<bool, CompareError> {
        if !chain.context().names_match(a.name(), b.name()) {
            return Ok(false);
        }
        match (a.schema(), b.schema()) {
            (Some(schema_a), Some(schema_b)) => chain.related_is_same(schema_a, schema_b),
            _ => Ok(true),
        }
    }

    fn find_differences(
        &self,
        a: ObjectRef<'_>,
        b: ObjectRef<'_>,
        chain: &Chain<'_>,
        exclude: &mut BTreeSet<String>,
    ) -> Result<ObjectDifferences, CompareError> {
        exclude.insert("name".to_string());
        exclude.insert("schema".to_string());
        exclude.insert("definition".to_string());
        let mut differences = chain.find_differences(a, b, exclude)?;

        differences.compare_with("name", a, b, &NameEquality::new(chain.context()))?;
        // A schema present on one side only is the connection default
        if a.schema().is_some() && b.schema().is_some() {
            differences.compare_with("schema", a, b, &SameObjectEquality::new(*chain))?;
        }
        differences.compare_with("definition", a, b, &NormalizedTextEquality)?;
        Ok(differences)
    }
}
