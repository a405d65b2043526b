use super::{ObjectComparator, ObjectHash, Priority};
use crate::chain::Chain;
use crate::differences::{DataTypeEquality, NameEquality, ObjectDifferences, SameObjectEquality};
use crate::error::CompareError;
use schemadelta_core::{ObjectRef, ObjectType};
use std::collections::BTreeSet;

/// Columns: name within the same relation
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnComparator;

impl ObjectComparator for ColumnComparator {
    fn name(&self) -> &'static str {
        "column"
    }

    fn priority(&self, object_type: &ObjectType) -> Priority {
        match object_type {
            ObjectType::Column => Priority::TYPE,
            _ => Priority::NONE,
        }
    }

    fn hash(&self, object: ObjectRef<'_>, chain: &Chain<'_>) -> Result<ObjectHash, CompareError> {
        let mut hash = ObjectHash::new();
        hash.push_name(object.name());
        if let Some(relation) = object.relation() {
            hash.extend(&chain.related_hash(relation)?);
        }
        Ok(hash)
    }

    fn is_same_object(&self, a: ObjectRef<'_>, b: ObjectRef<'_>, chain: &Chain<'_>) -> Result<bool, CompareError> {
        if let (Some(relation_a), Some(relation_b)) = (a.relation(), b.relation()) {
            if !chain.related_is_same(relation_a, relation_b)? {
                return Ok(false);
            }
        }
        Ok(chain.context().names_match(a.name(), b.name()))
    }

    fn find_differences(
        &self,
        a: ObjectRef<'_>,
        b: ObjectRef<'_>,
        chain: &Chain<'_>,
        exclude: &mut BTreeSet<String>,
    ) -> Result<ObjectDifferences, CompareError> {
        exclude.insert("name".to_string());
        exclude.insert("relation".to_string());
        exclude.insert("data_type".to_string());
        let mut differences = chain.find_differences(a, b, exclude)?;

        differences.compare_with("name", a, b, &NameEquality::new(chain.context()))?;
        differences.compare_with("relation", a, b, &SameObjectEquality::new(*chain))?;
        differences.compare_with("data_type", a, b, &DataTypeEquality::new(chain.context()))?;
        Ok(differences)
    }
}
