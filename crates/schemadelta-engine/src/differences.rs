//! Difference container and attribute equality functions

use crate::chain::Chain;
use crate::context::CompareContext;
use crate::error::CompareError;
use schemadelta_catalog::{ProbeRequest, TypeFamily};
use schemadelta_core::{AttributeChange, AttributeValue, ObjectId, ObjectRef, Snapshot};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One attribute whose values disagree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Difference {
    pub attribute: String,
    pub reference: Option<AttributeValue>,
    pub compared: Option<AttributeValue>,
}

/// One side of an attribute comparison: the value plus the object it was
/// read from, so handles can be resolved in the right snapshot
#[derive(Debug, Clone)]
pub struct AttributeSide<'a> {
    pub owner: ObjectRef<'a>,
    pub value: Option<AttributeValue>,
}

impl<'a> AttributeSide<'a> {
    pub fn of(owner: ObjectRef<'a>, attribute: &str) -> Self {
        Self {
            value: owner.object.attribute(attribute),
            owner,
        }
    }

    fn resolve(&self, id: ObjectId) -> Option<ObjectRef<'a>> {
        self.owner.follow(id)
    }

    fn resolve_all(&self, ids: &[ObjectId]) -> Vec<Option<ObjectRef<'a>>> {
        ids.iter().map(|id| self.resolve(*id)).collect()
    }
}

/// Attribute-specific equality
///
/// Only called when both sides have a value; one absent value is always a
/// difference and two absent values never are.
pub trait CompareFunction {
    fn are_equal(&self, reference: &AttributeSide<'_>, compared: &AttributeSide<'_>) -> Result<bool, CompareError>;
}

/// Working diff for one matched pair of objects
///
/// The exclusion set names attributes already settled by identity; the
/// generic attribute walker skips them. Comparators still compare excluded
/// attributes explicitly with their own [`CompareFunction`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectDifferences {
    differences: BTreeMap<String, Difference>,
    excluded: BTreeSet<String>,
}

impl ObjectDifferences {
    pub fn new(excluded: BTreeSet<String>) -> Self {
        Self {
            differences: BTreeMap::new(),
            excluded,
        }
    }

    pub fn exclude(&mut self, attribute: &str) {
        self.excluded.insert(attribute.to_string());
    }

    pub fn is_excluded(&self, attribute: &str) -> bool {
        self.excluded.contains(attribute)
    }

    pub fn excluded(&self) -> &BTreeSet<String> {
        &self.excluded
    }

    /// Compare an attribute with default value equality
    pub fn compare(
        &mut self,
        attribute: &str,
        a: ObjectRef<'_>,
        b: ObjectRef<'_>,
        chain: &Chain<'_>,
    ) -> Result<(), CompareError> {
        self.compare_with(attribute, a, b, &ValueEquality::new(*chain))
    }

    /// Compare an attribute with an explicit equality function
    pub fn compare_with(
        &mut self,
        attribute: &str,
        a: ObjectRef<'_>,
        b: ObjectRef<'_>,
        function: &dyn CompareFunction,
    ) -> Result<(), CompareError> {
        self.compare_sides(attribute, AttributeSide::of(a, attribute), AttributeSide::of(b, attribute), function)
    }

    /// Compare two already extracted values
    pub fn compare_sides(
        &mut self,
        attribute: &str,
        reference: AttributeSide<'_>,
        compared: AttributeSide<'_>,
        function: &dyn CompareFunction,
    ) -> Result<(), CompareError> {
        let equal = match (&reference.value, &compared.value) {
            (None, None) => true,
            (Some(_), Some(_)) => function.are_equal(&reference, &compared)?,
            _ => false,
        };

        if !equal {
            self.add(Difference {
                attribute: attribute.to_string(),
                reference: reference.value,
                compared: compared.value,
            });
        }
        Ok(())
    }

    /// Record a difference; a later record for the same attribute wins
    pub fn add(&mut self, difference: Difference) {
        self.differences.insert(difference.attribute.clone(), difference);
    }

    pub fn get(&self, attribute: &str) -> Option<&Difference> {
        self.differences.get(attribute)
    }

    pub fn has_differences(&self) -> bool {
        !self.differences.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }

    pub fn len(&self) -> usize {
        self.differences.len()
    }

    /// Differences ordered by attribute name
    pub fn iter(&self) -> impl Iterator<Item = &Difference> {
        self.differences.values()
    }

    /// Names of the differing attributes
    pub fn attributes(&self) -> Vec<&str> {
        self.differences.keys().map(String::as_str).collect()
    }

    /// Fold another container into this one
    pub fn merge(&mut self, other: ObjectDifferences) {
        self.excluded.extend(other.excluded);
        self.differences.extend(other.differences);
    }

    /// Render values for reports; handles become names or dotted paths
    pub fn render(&self, reference: &Snapshot, compared: &Snapshot) -> Vec<AttributeChange> {
        self.iter()
            .map(|d| AttributeChange {
                attribute: d.attribute.clone(),
                reference: d.reference.as_ref().map(|v| render_value(v, reference)),
                compared: d.compared.as_ref().map(|v| render_value(v, compared)),
            })
            .collect()
    }
}

fn render_value(value: &AttributeValue, snapshot: &Snapshot) -> String {
    match value {
        AttributeValue::Object(id) => snapshot.display_path(*id),
        AttributeValue::Objects(ids) => {
            let names: Vec<String> = ids
                .iter()
                .map(|id| {
                    snapshot
                        .get(*id)
                        .and_then(|o| o.name.clone())
                        .unwrap_or_else(|| id.to_string())
                })
                .collect();
            format!("[{}]", names.join(", "))
        }
        other => other.to_string(),
    }
}

/// Default equality: scalars by value, handles by same-object delegation
///
/// Handles from two snapshots index different arenas, so they are never
/// compared numerically.
#[derive(Debug, Clone, Copy)]
pub struct ValueEquality<'c> {
    chain: Chain<'c>,
}

impl<'c> ValueEquality<'c> {
    pub fn new(chain: Chain<'c>) -> Self {
        Self { chain }
    }
}

impl CompareFunction for ValueEquality<'_> {
    fn are_equal(&self, reference: &AttributeSide<'_>, compared: &AttributeSide<'_>) -> Result<bool, CompareError> {
        match (&reference.value, &compared.value) {
            (Some(AttributeValue::Object(_)), Some(AttributeValue::Object(_)))
            | (Some(AttributeValue::Objects(_)), Some(AttributeValue::Objects(_))) => {
                SameObjectEquality::new(self.chain).are_equal(reference, compared)
            }
            (a, b) => Ok(a == b),
        }
    }
}

/// Linked objects are equal when the registry judges them the same object;
/// lists are compared pairwise by position
#[derive(Debug, Clone, Copy)]
pub struct SameObjectEquality<'c> {
    chain: Chain<'c>,
}

impl<'c> SameObjectEquality<'c> {
    pub fn new(chain: Chain<'c>) -> Self {
        Self { chain }
    }

    fn same(&self, a: Option<ObjectRef<'_>>, b: Option<ObjectRef<'_>>) -> Result<bool, CompareError> {
        match (a, b) {
            (Some(a), Some(b)) => self.chain.related_is_same(a, b),
            _ => Ok(false),
        }
    }
}

impl CompareFunction for SameObjectEquality<'_> {
    fn are_equal(&self, reference: &AttributeSide<'_>, compared: &AttributeSide<'_>) -> Result<bool, CompareError> {
        match (&reference.value, &compared.value) {
            (Some(AttributeValue::Object(a)), Some(AttributeValue::Object(b))) => {
                self.same(reference.resolve(*a), compared.resolve(*b))
            }
            (Some(AttributeValue::Objects(a)), Some(AttributeValue::Objects(b))) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                let pairs = reference.resolve_all(a).into_iter().zip(compared.resolve_all(b));
                for (a, b) in pairs {
                    if !self.same(a, b)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (a, b) => Ok(a == b),
        }
    }
}

/// Ordered list equality over element names (trimmed, case-insensitive)
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderedNameEquality;

impl OrderedNameEquality {
    fn names<'a>(side: &AttributeSide<'a>, ids: &[ObjectId]) -> Vec<String> {
        side.resolve_all(ids)
            .into_iter()
            .map(|o| {
                o.and_then(|o| o.name())
                    .unwrap_or_default()
                    .trim()
                    .to_lowercase()
            })
            .collect()
    }
}

impl CompareFunction for OrderedNameEquality {
    fn are_equal(&self, reference: &AttributeSide<'_>, compared: &AttributeSide<'_>) -> Result<bool, CompareError> {
        match (&reference.value, &compared.value) {
            (Some(AttributeValue::Objects(a)), Some(AttributeValue::Objects(b))) => {
                Ok(Self::names(reference, a) == Self::names(compared, b))
            }
            (a, b) => Ok(a == b),
        }
    }
}

/// Text compared under the session's name-matching rule
#[derive(Debug, Clone, Copy)]
pub struct NameEquality<'c> {
    context: &'c CompareContext,
}

impl<'c> NameEquality<'c> {
    pub fn new(context: &'c CompareContext) -> Self {
        Self { context }
    }
}

impl CompareFunction for NameEquality<'_> {
    fn are_equal(&self, reference: &AttributeSide<'_>, compared: &AttributeSide<'_>) -> Result<bool, CompareError> {
        match (&reference.value, &compared.value) {
            (Some(AttributeValue::Text(a)), Some(AttributeValue::Text(b))) => {
                Ok(self.context.names_match(Some(a), Some(b)))
            }
            (a, b) => Ok(a == b),
        }
    }
}

/// SQL text compared with whitespace collapsed, case folded, and any
/// trailing semicolon dropped
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedTextEquality;

pub(crate) fn normalize_sql(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_end_matches(';').trim_end().to_lowercase()
}

impl CompareFunction for NormalizedTextEquality {
    fn are_equal(&self, reference: &AttributeSide<'_>, compared: &AttributeSide<'_>) -> Result<bool, CompareError> {
        match (&reference.value, &compared.value) {
            (Some(AttributeValue::Text(a)), Some(AttributeValue::Text(b))) => Ok(normalize_sql(a) == normalize_sql(b)),
            (a, b) => Ok(a == b),
        }
    }
}

/// Column data type equality
///
/// Type text is compared after normalisation. When the text differs the
/// session's dialect probe may still show both are spellings of the same
/// large-object family (Oracle `CLOB` and `NCLOB`). Character and binary
/// large objects never match. A failing probe counts as no evidence.
#[derive(Debug, Clone, Copy)]
pub struct DataTypeEquality<'c> {
    context: &'c CompareContext,
}

impl<'c> DataTypeEquality<'c> {
    pub fn new(context: &'c CompareContext) -> Self {
        Self { context }
    }

    fn probe_family(&self, side: &AttributeSide<'_>, data_type: &str) -> Option<TypeFamily> {
        let probe = self.context.probe()?;
        let relation = side.owner.relation();
        let request = ProbeRequest::new(
            self.context.dialect(),
            relation.as_ref().and_then(|r| r.name()),
            side.owner.name().unwrap_or_default(),
            data_type,
        );

        match probe.type_family(&request) {
            Ok(family) => Some(family),
            Err(e) => {
                tracing::warn!(probe = probe.name(), request = %request, error = %e, "dialect probe failed, ignoring");
                None
            }
        }
    }
}

impl CompareFunction for DataTypeEquality<'_> {
    fn are_equal(&self, reference: &AttributeSide<'_>, compared: &AttributeSide<'_>) -> Result<bool, CompareError> {
        let (Some(AttributeValue::Text(a)), Some(AttributeValue::Text(b))) = (&reference.value, &compared.value) else {
            return Ok(reference.value == compared.value);
        };

        if normalize_sql(a) == normalize_sql(b) {
            return Ok(true);
        }

        // No second call once the first side gives no usable evidence
        let Some(family) = self.probe_family(reference, a).filter(TypeFamily::is_large_object) else {
            return Ok(false);
        };
        Ok(self
            .probe_family(compared, b)
            .is_some_and(|other| family.interchangeable_with(&other)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemadelta_core::Snapshot;

    fn pair() -> (Snapshot, Snapshot) {
        let mut reference = Snapshot::new("reference");
        let users = reference.add_table(None, "users");
        let a = reference.add_column(users, "A", "int");
        let b = reference.add_column(users, "b", "int");
        reference.add_unique_constraint(users, Some("uq"), &[a, b]);

        let mut compared = Snapshot::new("compared");
        let users = compared.add_table(None, "USERS");
        let a = compared.add_column(users, " a", "int");
        let b = compared.add_column(users, "B", "int");
        let c = compared.add_column(users, "c", "int");
        compared.add_unique_constraint(users, Some("uq"), &[a, b]);
        compared.add_unique_constraint(users, Some("uq2"), &[b, a]);
        compared.add_unique_constraint(users, Some("uq3"), &[a, b, c]);

        (reference, compared)
    }

    fn side<'a>(snapshot: &'a Snapshot, id: usize, attribute: &str) -> AttributeSide<'a> {
        AttributeSide::of(snapshot.object_ref(ObjectId(id)).unwrap(), attribute)
    }

    #[test]
    fn ordered_names_ignore_case_but_not_order() {
        let (reference, compared) = pair();
        let uq = side(&reference, 3, "columns");

        assert!(OrderedNameEquality.are_equal(&uq, &side(&compared, 4, "columns")).unwrap());
        assert!(!OrderedNameEquality.are_equal(&uq, &side(&compared, 5, "columns")).unwrap());
        assert!(!OrderedNameEquality.are_equal(&uq, &side(&compared, 6, "columns")).unwrap());
    }

    #[test]
    fn absent_values() {
        let (reference, compared) = pair();
        let mut differences = ObjectDifferences::default();

        // Neither table has remarks
        differences
            .compare_sides("remarks", side(&reference, 0, "remarks"), side(&compared, 0, "remarks"), &OrderedNameEquality)
            .unwrap();
        assert!(differences.is_empty());

        // Only the column has a relation
        differences
            .compare_sides("relation", side(&reference, 1, "relation"), side(&compared, 0, "relation"), &OrderedNameEquality)
            .unwrap();
        assert_eq!(differences.attributes(), vec!["relation"]);
    }

    #[test]
    fn normalized_sql() {
        assert_eq!(normalize_sql("SELECT  id\n FROM users;"), "select id from users");
        assert_eq!(normalize_sql(" VARCHAR (255) "), "varchar (255)");
    }

    #[test]
    fn merge_and_render() {
        let (reference, compared) = pair();
        let mut left = ObjectDifferences::new(BTreeSet::from(["name".to_string()]));
        left.add(Difference {
            attribute: "columns".to_string(),
            reference: reference.get(ObjectId(3)).and_then(|o| o.attribute("columns")),
            compared: compared.get(ObjectId(5)).and_then(|o| o.attribute("columns")),
        });

        let mut right = ObjectDifferences::new(BTreeSet::from(["columns".to_string()]));
        right.add(Difference {
            attribute: "disabled".to_string(),
            reference: Some(AttributeValue::Bool(false)),
            compared: Some(AttributeValue::Bool(true)),
        });

        left.merge(right);
        assert_eq!(left.len(), 2);
        assert!(left.is_excluded("name") && left.is_excluded("columns"));

        let rendered = left.render(&reference, &compared);
        assert_eq!(rendered[0].attribute, "columns");
        assert_eq!(rendered[0].reference.as_deref(), Some("[A, b]"));
        assert_eq!(rendered[0].compared.as_deref(), Some("[B,  a]"));
        assert_eq!(rendered[1].compared.as_deref(), Some("true"));
    }
}
