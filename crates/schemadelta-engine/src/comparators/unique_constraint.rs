use super::{compare_declared_names, columns_match_by_position, relation_keyed_hash, ObjectComparator, ObjectHash, Priority};
use crate::chain::Chain;
use crate::differences::{ObjectDifferences, OrderedNameEquality, SameObjectEquality};
use crate::error::CompareError;
use schemadelta_core::{ObjectRef, ObjectType};
use std::collections::BTreeSet;

/// Unique constraints: owning table, then name, then ordered columns
#[derive(Debug, Clone, Copy, Default)]
pub struct UniqueConstraintComparator;

impl ObjectComparator for UniqueConstraintComparator {
    fn name(&self) -> &'static str {
        "unique-constraint"
    }

    fn priority(&self, object_type: &ObjectType) -> Priority {
        match object_type {
            ObjectType::UniqueConstraint => Priority::TYPE,
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
        exclude.insert("backing_index".to_string());
        let mut differences = chain.find_differences(a, b, exclude)?;

        compare_declared_names(&mut differences, a, b, chain)?;
        differences.compare_with("columns", a, b, &OrderedNameEquality)?;
        differences.compare_with("backing_index", a, b, &SameObjectEquality::new(*chain))?;
        Ok(differences)
    }
}

/// Identity of a constraint-like object bound to a table and an ordered
/// column list
///
/// With a table on both sides the tables (and schemas, when both are
/// known) must match first. Two present, matching names then settle it.
/// Failing that, an empty column list on either side falls back to name
/// matching, unequal counts differ, and equal counts are compared column
/// by column in order, each column seen as part of its constraint's table.
///
/// Without a table on both sides only counts, names and schemas are
/// checked.
pub(crate) fn same_table_constraint(
    a: ObjectRef<'_>,
    b: ObjectRef<'_>,
    chain: &Chain<'_>,
) -> Result<bool, CompareError> {
    let context = chain.context();
    let size_a = a.object.columns().len();
    let size_b = b.object.columns().len();

    let (Some(table_a), Some(table_b)) = (a.relation(), b.relation()) else {
        if size_a > 0 && size_b > 0 && size_a != size_b {
            return Ok(false);
        }
        if !context.names_match(a.name(), b.name()) {
            return Ok(false);
        }
        return match (a.schema(), b.schema()) {
            (Some(schema_a), Some(schema_b)) => chain.related_is_same(schema_a, schema_b),
            _ => Ok(true),
        };
    };

    if !chain.related_is_same(table_a, table_b)? {
        return Ok(false);
    }
    if let (Some(schema_a), Some(schema_b)) = (a.schema(), b.schema()) {
        if !chain.related_is_same(schema_a, schema_b)? {
            return Ok(false);
        }
    }

    if a.name().is_some() && b.name().is_some() && context.names_match(a.name(), b.name()) {
        return Ok(true);
    }

    // Heuristic: a missing column list may be incomplete metadata rather
    // than a genuinely empty constraint
    if size_a == 0 || size_b == 0 {
        return Ok(context.names_match(a.name(), b.name()));
    }
    if size_a != size_b {
        return Ok(false);
    }

    columns_match_by_position(&a.columns(), Some(table_a), &b.columns(), Some(table_b), chain)
}
