use super::unique_constraint::same_table_constraint;
use super::{compare_declared_names, relation_keyed_hash, ObjectComparator, ObjectHash, Priority};
use crate::chain::Chain;
use crate::differences::{ObjectDifferences, OrderedNameEquality};
use crate::error::CompareError;
use schemadelta_core::{ObjectRef, ObjectType};
use std::collections::BTreeSet;

/// Indexes share the unique constraint's identity rules
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexComparator;

impl ObjectComparator for IndexComparator {
    fn name(&self) -> &'static str {
        "index"
    }

    fn priority(&self, object_type: &ObjectType) -> Priority {
        match object_type {
            ObjectType::Index => Priority::TYPE,
            _ => Priority::NONE,
        }
    }

    fn hash(&self, object: ObjectRef<'_>, chain: &Chain<'_>) -> Result<ObjectHash, CompareError> {
        relation_keyed_hash(object, chain)
    }

    fn is_same_object(&self, a: ObjectRef<'_>, b: ObjectRef<'_>, chain: &Chain<'_>) -> Result<bool, CompareError> {
        same_table_constraint(a, b, chain)
    }

    fn find_differences(
        &self,
        a: ObjectRef<'_>,
        b: ObjectRef<'_>,
        chain: &Chain<'_>,
        exclude: &mut BTreeSet<String>,
    ) -> Result<ObjectDifferences, CompareError> {
        exclude.insert("name".to_string());
        exclude.insert("columns".to_string());
        let mut differences = chain.find_differences(a, b, exclude)?;

        compare_declared_names(&mut differences, a, b, chain)?;
        differences.compare_with("columns", a, b, &OrderedNameEquality)?;
        Ok(differences)
    }
}
