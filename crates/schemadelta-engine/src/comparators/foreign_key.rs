use super::{compare_declared_names, columns_match_by_position, relation_keyed_hash, ObjectComparator, ObjectHash, Priority};
use crate::chain::Chain;
use crate::differences::{ObjectDifferences, OrderedNameEquality};
use crate::error::CompareError;
use schemadelta_core::{ObjectKind, ObjectRef, ObjectType};
use std::collections::BTreeSet;

/// Foreign keys: base table, then name, then the referenced table and both
/// column lists by position
#[derive(Debug, Clone, Copy, Default)]
pub struct ForeignKeyComparator;

/// Referenced table and resolved referenced columns
fn referenced<'a>(object: ObjectRef<'a>) -> (Option<ObjectRef<'a>>, Vec<ObjectRef<'a>>) {
    match &object.object.kind {
        ObjectKind::ForeignKey(def) => (
            def.referenced_table.and_then(|id| object.follow(id)),
            def.referenced_columns
                .iter()
                .filter_map(|id| object.follow(*id))
                .collect(),
        ),
        _ => (None, Vec::new()),
    }
}

impl ObjectComparator for ForeignKeyComparator {
    fn name(&self) -> &'static str {
        "foreign-key"
    }

    fn priority(&self, object_type: &ObjectType) -> Priority {
        match object_type {
            ObjectType::ForeignKey => Priority::TYPE,
            _ => Priority::NONE,
        }
    }

    fn hash(&self, object: ObjectRef<'_>, chain: &Chain<'_>) -> Result<ObjectHash, CompareError> {
        relation_keyed_hash(object, chain)
    }

    fn is_same_object(&self, a: ObjectRef<'_>, b: ObjectRef<'_>, chain: &Chain<'_>) -> Result<bool, CompareError> {
        let context = chain.context();

        let (Some(table_a), Some(table_b)) = (a.relation(), b.relation()) else {
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
        if a.name().is_some() && b.name().is_some() && context.names_match(a.name(), b.name()) {
            return Ok(true);
        }

        let (referenced_table_a, referenced_columns_a) = referenced(a);
        let (referenced_table_b, referenced_columns_b) = referenced(b);
        let (Some(referenced_table_a), Some(referenced_table_b)) = (referenced_table_a, referenced_table_b) else {
            return Ok(context.names_match(a.name(), b.name()));
        };
        if !chain.related_is_same(referenced_table_a, referenced_table_b)? {
            return Ok(false);
        }

        let (columns_a, columns_b) = (a.columns(), b.columns());
        if columns_a.is_empty() || columns_b.is_empty() {
            return Ok(context.names_match(a.name(), b.name()));
        }

        Ok(
            columns_match_by_position(&columns_a, Some(table_a), &columns_b, Some(table_b), chain)?
                && columns_match_by_position(
                    &referenced_columns_a,
                    Some(referenced_table_a),
                    &referenced_columns_b,
                    Some(referenced_table_b),
                    chain,
                )?,
        )
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
        exclude.insert("referenced_columns".to_string());
        let mut differences = chain.find_differences(a, b, exclude)?;

        compare_declared_names(&mut differences, a, b, chain)?;
        differences.compare_with("columns", a, b, &OrderedNameEquality)?;
        differences.compare_with("referenced_columns", a, b, &OrderedNameEquality)?;
        Ok(differences)
    }
}

#[cfg(test)]
mod tests {
    use crate::context::CompareContext;
    use crate::registry::Registry;
    use pretty_assertions::assert_eq;
    use schemadelta_core::{ObjectId, Snapshot};

    /// `orders.user_id -> <target>.id`; the foreign key is the last object
    fn orders_to(target: &str, name: Option<&str>, on_delete: Option<&str>) -> (Snapshot, ObjectId) {
        let mut snapshot = Snapshot::new("fk");
        let users = snapshot.add_table(None, target);
        let id = snapshot.add_column(users, "id", "bigint");
        let orders = snapshot.add_table(None, "orders");
        let user_id = snapshot.add_column(orders, "user_id", "bigint");
        let fk = snapshot.add_foreign_key(orders, name, &[user_id], users, &[id]);
        if let Some(schemadelta_core::ObjectKind::ForeignKey(def)) = snapshot.get_mut(fk).map(|o| &mut o.kind) {
            def.on_delete = on_delete.map(str::to_string);
        }
        (snapshot, fk)
    }

    #[test]
    fn unnamed_foreign_keys_match_structurally() {
        let registry = Registry::standard();
        let context = CompareContext::new();
        let (reference, fk_a) = orders_to("users", Some("fk_orders_users"), None);
        let (same_target, fk_b) = orders_to("USERS", None, Some("cascade"));
        let (other_target, fk_c) = orders_to("accounts", None, None);
        let fk_a = reference.object_ref(fk_a).unwrap();
        let fk_b = same_target.object_ref(fk_b).unwrap();
        let fk_c = other_target.object_ref(fk_c).unwrap();

        assert!(registry.is_same_object(fk_a, fk_b, &context).unwrap());
        assert!(registry.is_same_object(fk_b, fk_a, &context).unwrap());
        assert!(!registry.is_same_object(fk_a, fk_c, &context).unwrap());

        let differences = registry.find_differences(fk_a, fk_b, &context).unwrap();
        assert_eq!(differences.attributes(), vec!["on_delete"]);
    }
}
