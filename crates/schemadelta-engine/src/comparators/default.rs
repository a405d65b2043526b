//! Generic fallback strategy for every object type

use super::{ObjectComparator, ObjectHash, Priority};
use crate::chain::Chain;
use crate::differences::{NameEquality, ObjectDifferences};
use crate::error::CompareError;
use schemadelta_core::{ObjectRef, ObjectType};
use std::collections::BTreeSet;

/// Name and schema identity, attribute-by-attribute differences
///
/// Ends every chain, so it never calls further down.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComparator;

impl ObjectComparator for DefaultComparator {
    fn name(&self) -> &'static str {
        "default"
    }

    fn priority(&self, _object_type: &ObjectType) -> Priority {
        Priority::DEFAULT
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
        let mut differences = ObjectDifferences::new(exclude.clone());

        let mut attributes: BTreeSet<String> = a.object.attributes().into_keys().collect();
        attributes.extend(b.object.attributes().into_keys());

        for attribute in attributes.iter().filter(|attr| !exclude.contains(*attr)) {
            if attribute == "name" {
                differences.compare_with(attribute, a, b, &NameEquality::new(chain.context()))?;
            } else {
                differences.compare(attribute, a, b, chain)?;
            }
        }

        Ok(differences)
    }
}

#[cfg(test)]
mod tests {
    use crate::context::CompareContext;
    use crate::registry::Registry;
    use schemadelta_core::{ObjectId, SequenceDef, Snapshot};

    fn sequences(increment: i64) -> Snapshot {
        let mut snapshot = Snapshot::new("seq");
        let schema = snapshot.add_schema(None, "public");
        snapshot.add_sequence(
            Some(schema),
            "Order_Seq",
            SequenceDef {
                start_value: Some(1),
                increment_by: Some(increment),
                ..SequenceDef::default()
            },
        );
        snapshot
    }

    #[test]
    fn sequences_compare_attribute_by_attribute() {
        let registry = Registry::standard();
        let context = CompareContext::new();
        let (reference, compared) = (sequences(1), sequences(10));
        let seq_a = reference.object_ref(ObjectId(1)).unwrap();
        let seq_b = compared.object_ref(ObjectId(1)).unwrap();

        assert!(registry.is_same_object(seq_a, seq_b, &context).unwrap());

        let differences = registry.find_differences(seq_a, seq_b, &context).unwrap();
        assert_eq!(differences.attributes(), vec!["increment_by"]);
    }

    #[test]
    fn name_case_is_not_a_difference() {
        let registry = Registry::standard();
        let context = CompareContext::new();
        let reference = sequences(1);
        let mut compared = sequences(1);
        compared
            .get_mut(ObjectId(1))
            .unwrap()
            .name = Some("ORDER_SEQ".into());

        let seq_a = reference.object_ref(ObjectId(1)).unwrap();
        let seq_b = compared.object_ref(ObjectId(1)).unwrap();
        assert!(registry.find_differences(seq_a, seq_b, &context).unwrap().is_empty());

        let strict = CompareContext::new().with_case_sensitive_names(true);
        assert!(!registry.is_same_object(seq_a, seq_b, &strict).unwrap());
    }
}
