use super::{compare_declared_names, relation_keyed_hash, ObjectComparator, ObjectHash, Priority};
use crate::chain::Chain;
use crate::differences::{ObjectDifferences, OrderedNameEquality, SameObjectEquality};
use crate::error::CompareError;
use schemadelta_core::{ObjectRef, ObjectType};
use std::collections::BTreeSet;

/// Primary keys: a table has at most one, so the table decides
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryKeyComparator;

impl ObjectComparator for PrimaryKeyComparator {
    fn name(&self) -> &'static str {
        "primary-key"
    }

    fn priority(&self, object_type: &ObjectType) -> Priority {
        match object_type {
            ObjectType::PrimaryKey => Priority::TYPE,
            _ => Priority::NONE,
        }
    }

    fn hash(&self, object: ObjectRef<'_>, chain: &Chain<'_>) -> Result<ObjectHash, CompareError> {
        relation_keyed_hash(object, chain)
    }

    fn is_same_object(&self, a: ObjectRef<'_>, b: ObjectRef<'_>, chain: &Chain<'_>) -> Result<bool, CompareError> {
        if let (Some(table_a), Some(table_b)) = (a.relation(), b.relation()) {
            return chain.related_is_same(table_a, table_b);
        }

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
        exclude.insert("columns".to_string());
        exclude.insert("backing_index".to_string());
        let mut differences = chain.find_differences(a, b, exclude)?;

        compare_declared_names(&mut differences, a, b, chain)?;
        differences.compare_with("columns", a, b, &OrderedNameEquality)?;
        differences.compare_with("backing_index", a, b, &SameObjectEquality::new(*chain))?;
        Ok(differences)
    }
}
