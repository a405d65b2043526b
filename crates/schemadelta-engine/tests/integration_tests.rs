//! Integration tests for the comparator framework
//!
//! These tests drive the registry the way a diff orchestrator does: whole
//! snapshots, the standard comparator set, and session contexts built from
//! configuration. They check the identity and differencing properties every
//! comparator must keep.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p schemadelta-engine --test integration_tests
//! ```

mod fixtures;

use fixtures::{find, shop, shop_in_schema, users_with_unique};
use pretty_assertions::assert_eq;
use schemadelta_catalog::MockProbe;
use schemadelta_core::{
    AttributeValue, Config, CustomDef, ObjectId, ObjectKind, ObjectRef, ObjectType, SchemaObject, Snapshot,
};
use schemadelta_engine::{
    Chain, CompareContext, CompareError, ObjectComparator, ObjectDifferences, Priority, Registry, SnapshotDiffer,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn is_same(registry: &Registry, a: ObjectRef<'_>, b: ObjectRef<'_>) -> bool {
    registry.is_same_object(a, b, &CompareContext::new()).unwrap()
}

fn constraint(fixture: &fixtures::UsersFixture) -> ObjectRef<'_> {
    fixture.snapshot.object_ref(fixture.constraint).unwrap()
}

/// A spread of unique constraints on `users` for pairwise property checks
fn constraint_zoo() -> Vec<fixtures::UsersFixture> {
    vec![
        users_with_unique("a", "users", Some("UQ1"), &["email", "name"]),
        users_with_unique("b", "USERS", None, &["EMAIL", "NAME"]),
        users_with_unique("c", "users", None, &["name", "email"]),
        users_with_unique("d", "users", Some("uq1"), &["tenant_id", "email", "name"]),
        users_with_unique("e", "users", Some("uq_other"), &["email", "name"]),
        users_with_unique("f", "users", None, &[]),
        users_with_unique("g", "accounts", Some("UQ1"), &["email", "name"]),
        users_with_unique("h", "users", Some(" uq1 "), &[]),
    ]
}

// =============================================================================
// Identity properties
// =============================================================================

#[test]
fn test_is_same_object_is_symmetric() {
    let registry = Registry::standard();
    let zoo = constraint_zoo();

    for a in &zoo {
        for b in &zoo {
            assert_eq!(
                is_same(&registry, constraint(a), constraint(b)),
                is_same(&registry, constraint(b), constraint(a)),
                "asymmetric verdict for {} vs {}",
                a.snapshot.label,
                b.snapshot.label
            );
        }
    }
}

#[test]
fn test_every_object_is_itself_without_differences() {
    let registry = Registry::standard();
    let context = CompareContext::new();
    let snapshot = shop("dev");

    for object in snapshot.iter() {
        assert!(
            registry.is_same_object(object, object, &context).unwrap(),
            "{} is not itself",
            object.display_path()
        );
        let differences = registry.find_differences(object, object, &context).unwrap();
        assert!(differences.is_empty(), "{} differs from itself", object.display_path());
    }
}

#[test]
fn test_name_is_authoritative_over_columns() {
    let registry = Registry::standard();
    let narrow = users_with_unique("narrow", "users", Some("uq1"), &["email"]);
    let wide = users_with_unique("wide", "Users", Some("UQ1 "), &["tenant_id", "email", "name"]);

    assert!(is_same(&registry, constraint(&narrow), constraint(&wide)));
}

#[test]
fn test_columns_match_by_position() {
    let registry = Registry::standard();
    let lower = users_with_unique("lower", "users", None, &["email", "name"]);
    let upper = users_with_unique("upper", "users", None, &["EMAIL", "NAME"]);
    let swapped = users_with_unique("swapped", "users", None, &["name", "email"]);

    assert!(is_same(&registry, constraint(&lower), constraint(&upper)));
    assert!(!is_same(&registry, constraint(&lower), constraint(&swapped)));
}

#[test]
fn test_column_count_mismatch_short_circuits() {
    let registry = Registry::standard();
    let two = users_with_unique("two", "users", Some("uq_a"), &["email", "name"]);
    let three = users_with_unique("three", "users", Some("uq_b"), &["email", "name", "tenant_id"]);
    let unnamed = users_with_unique("unnamed", "users", None, &["email", "name", "tenant_id"]);

    assert!(!is_same(&registry, constraint(&two), constraint(&three)));
    assert!(!is_same(&registry, constraint(&two), constraint(&unnamed)));
}

#[test]
fn test_scenario_named_vs_unnamed_constraint() {
    let registry = Registry::standard();
    let named = users_with_unique("named", "T", Some("UQ1"), &["EMAIL", "NAME"]);
    let unnamed = users_with_unique("unnamed", "T", None, &["email", "name"]);

    assert!(is_same(&registry, constraint(&named), constraint(&unnamed)));
}

#[test]
fn test_scenario_same_name_on_different_tables() {
    let registry = Registry::standard();
    let on_t1 = users_with_unique("t1", "T1", Some("UQ1"), &["email"]);
    let on_t2 = users_with_unique("t2", "T2", Some("UQ1"), &["email"]);

    assert!(!is_same(&registry, constraint(&on_t1), constraint(&on_t2)));
}

#[test]
fn test_empty_column_list_falls_back_to_names() {
    // Heuristic kept on purpose: an empty list may be missing metadata.
    // It lets two unnamed constraints on one table match whatever their
    // columns, which can hide a real difference.
    let registry = Registry::standard();
    let empty = users_with_unique("empty", "users", None, &[]);
    let full = users_with_unique("full", "users", None, &["email", "name"]);
    let named_empty = users_with_unique("named", "users", Some("uq1"), &[]);

    assert!(is_same(&registry, constraint(&empty), constraint(&full)));
    assert!(!is_same(&registry, constraint(&named_empty), constraint(&full)));
}

#[test]
fn test_constraint_without_table_uses_names() {
    let registry = Registry::standard();
    let mut detached = users_with_unique("detached", "users", Some("uq1"), &["email"]);
    if let Some(ObjectKind::UniqueConstraint(def)) = detached
        .snapshot
        .get_mut(detached.constraint)
        .map(|o| &mut o.kind)
    {
        def.table = None;
    }
    let attached = users_with_unique("attached", "users", Some("UQ1"), &["email", "name"]);
    let other = users_with_unique("other", "users", Some("uq2"), &["email"]);

    assert!(!is_same(&registry, constraint(&detached), constraint(&attached)));
    assert!(!is_same(&registry, constraint(&detached), constraint(&other)));

    let same_size = users_with_unique("same", "orders", Some("uq1"), &["name"]);
    assert!(is_same(&registry, constraint(&detached), constraint(&same_size)));
}

// =============================================================================
// Differences
// =============================================================================

#[test]
fn test_identity_attributes_are_not_naive_differences() {
    let registry = Registry::standard();
    let context = CompareContext::new();
    let reference = users_with_unique("reference", "users", Some("uq1"), &["email", "name"]);
    let compared = users_with_unique("compared", "users", None, &["EMAIL", "NAME"]);

    let differences = registry
        .find_differences(constraint(&reference), constraint(&compared), &context)
        .unwrap();
    assert!(differences.get("name").is_none());
    assert!(differences.get("columns").is_none());
    assert!(differences.get("backing_index").is_none());
    assert!(differences.is_empty());
}

#[test]
fn test_linked_objects_compare_by_identity() {
    let registry = Registry::standard();
    let context = CompareContext::new();

    let mut reference = users_with_unique("reference", "users", Some("uq1"), &["email"]);
    let index = reference
        .snapshot
        .add_index(reference.table, Some("uq1_idx"), &[reference.columns[1]], true);
    set_backing_index(&mut reference.snapshot, reference.constraint, index);

    let mut compared = users_with_unique("compared", "users", Some("uq1"), &["email"]);
    let index = compared
        .snapshot
        .add_index(compared.table, Some("UQ1_IDX"), &[compared.columns[1]], true);
    set_backing_index(&mut compared.snapshot, compared.constraint, index);

    let differences = registry
        .find_differences(constraint(&reference), constraint(&compared), &context)
        .unwrap();
    assert!(differences.is_empty());

    let mut other = users_with_unique("other", "users", Some("uq1"), &["email"]);
    let index = other
        .snapshot
        .add_index(other.table, Some("some_other_idx"), &[other.columns[0]], true);
    set_backing_index(&mut other.snapshot, other.constraint, index);

    let differences = registry
        .find_differences(constraint(&reference), constraint(&other), &context)
        .unwrap();
    assert_eq!(differences.attributes(), vec!["backing_index"]);
}

fn set_backing_index(snapshot: &mut Snapshot, constraint: ObjectId, index: ObjectId) {
    if let Some(ObjectKind::UniqueConstraint(def)) = snapshot.get_mut(constraint).map(|o| &mut o.kind) {
        def.backing_index = Some(index);
    }
}

#[test]
fn test_attribute_differences_are_rendered() {
    let registry = Registry::standard();
    let context = CompareContext::new();
    let reference = users_with_unique("reference", "users", Some("uq1"), &["email", "name"]);
    let mut compared = users_with_unique("compared", "users", Some("uq1"), &["name", "email"]);
    if let Some(ObjectKind::UniqueConstraint(def)) = compared.snapshot.get_mut(compared.constraint).map(|o| &mut o.kind) {
        def.deferrable = true;
    }

    let differences = registry
        .find_differences(constraint(&reference), constraint(&compared), &context)
        .unwrap();
    assert_eq!(differences.attributes(), vec!["columns", "deferrable"]);

    let rendered = differences.render(&reference.snapshot, &compared.snapshot);
    assert_eq!(rendered[0].reference.as_deref(), Some("[email, name]"));
    assert_eq!(rendered[0].compared.as_deref(), Some("[name, email]"));
    assert_eq!(rendered[1].compared.as_deref(), Some("true"));
}

// =============================================================================
// Hashing and bucketing
// =============================================================================

#[test]
fn test_matched_pairs_share_a_bucket() {
    let registry = Registry::standard();
    let context = CompareContext::new();
    let zoo = constraint_zoo();

    for a in &zoo {
        for b in &zoo {
            let (a, b) = (constraint(a), constraint(b));
            if !registry.is_same_object(a, b, &context).unwrap() {
                continue;
            }
            let (hash_a, hash_b) = (registry.hash(a, &context).unwrap(), registry.hash(b, &context).unwrap());
            if let (Some(key_a), Some(key_b)) = (hash_a.primary(), hash_b.primary()) {
                assert_eq!(key_a, key_b);
            }
        }
    }
}

#[test]
fn test_hash_tolerates_missing_names() {
    let registry = Registry::standard();
    let context = CompareContext::new();
    let mut snapshot = Snapshot::new("partial");
    snapshot.add(SchemaObject::new(None, ObjectKind::Table(Default::default())));
    let table = snapshot.object_ref(ObjectId(0)).unwrap();

    let hash = registry.hash(table, &context).unwrap();
    assert!(hash.is_partial());
    assert!(hash.tokens.is_empty());
}

// =============================================================================
// Snapshot diffs
// =============================================================================

#[test]
fn test_diff_of_renamed_schema_needs_mapping() {
    let registry = Registry::standard();
    let dev = shop_in_schema("dev", "dev");
    let prod = shop_in_schema("prod", "prod");

    let unmapped = CompareContext::new();
    let diff = SnapshotDiffer::new(&registry, &unmapped).diff(&dev, &prod);
    assert!(diff.has_changes());
    assert_eq!(diff.missing.len(), dev.len());

    let config = Config::from_toml(
        r#"
        [[schema_mappings]]
        reference = { schema = "dev" }
        comparison = { schema = "prod" }
        "#,
    )
    .unwrap();
    let mapped = CompareContext::from_config(&config);
    let diff = SnapshotDiffer::new(&registry, &mapped).diff(&dev, &prod);
    assert!(!diff.has_changes(), "unexpected changes: {:?}", diff);
    assert_eq!(diff.matched, dev.len());
}

#[test]
fn test_diff_matches_constraint_that_lost_its_name() {
    let registry = Registry::standard();
    let context = CompareContext::new();
    let reference = shop("desired");
    let mut comparison = shop("live");
    let key = find(&comparison, "public.users.users_email_key");
    if let Some(object) = comparison.get_mut(key) {
        object.name = None;
    }

    let diff = SnapshotDiffer::new(&registry, &context).diff(&reference, &comparison);
    assert!(diff.missing.is_empty());
    assert!(diff.unexpected.is_empty());
    assert!(diff.changed.is_empty());
}

#[test]
fn test_diff_reports_renamed_constraint() {
    let registry = Registry::standard();
    let context = CompareContext::new();
    let reference = shop("desired");
    let mut comparison = shop("live");
    let key = find(&comparison, "public.users.users_email_key");
    if let Some(object) = comparison.get_mut(key) {
        object.name = Some("uq_users_email".to_string());
    }

    let diff = SnapshotDiffer::new(&registry, &context).diff(&reference, &comparison);
    assert!(diff.missing.is_empty());
    assert!(diff.unexpected.is_empty());
    assert_eq!(diff.changed.len(), 1);
    assert_eq!(diff.changed[0].compared_path, "public.users.uq_users_email");

    let change = &diff.changed[0].differences[0];
    assert_eq!(change.attribute, "name");
    assert_eq!(change.reference.as_deref(), Some("users_email_key"));
    assert_eq!(change.compared.as_deref(), Some("uq_users_email"));
}

#[test]
fn test_concurrent_diffs_share_registry() {
    let registry = Registry::standard();
    let context = CompareContext::new();
    let reference = shop("desired");
    let comparison = shop_in_schema("live", "PUBLIC");

    let diffs: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| SnapshotDiffer::new(&registry, &context).diff(&reference, &comparison)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for diff in &diffs {
        assert_eq!(diff, &diffs[0]);
        assert!(!diff.has_changes());
    }
}

// =============================================================================
// Extension points
// =============================================================================

/// Dialect override that ignores table remarks
struct IgnoreRemarks;

impl ObjectComparator for IgnoreRemarks {
    fn name(&self) -> &'static str {
        "ignore-remarks"
    }

    fn priority(&self, object_type: &ObjectType) -> Priority {
        match object_type {
            ObjectType::Table => Priority::custom(10),
            _ => Priority::NONE,
        }
    }

    fn find_differences(
        &self,
        a: ObjectRef<'_>,
        b: ObjectRef<'_>,
        chain: &Chain<'_>,
        exclude: &mut BTreeSet<String>,
    ) -> Result<ObjectDifferences, CompareError> {
        exclude.insert("remarks".to_string());
        chain.find_differences(a, b, exclude)
    }
}

#[test]
fn test_override_runs_before_builtins() {
    let registry = Registry::standard_builder().register(IgnoreRemarks).build();
    assert_eq!(
        registry.chain_names(&ObjectType::Table).unwrap(),
        vec!["ignore-remarks", "relation", "default"]
    );

    let reference = shop("desired");
    let mut comparison = shop("live");
    let users = find(&comparison, "public.users");
    if let Some(ObjectKind::Table(def)) = comparison.get_mut(users).map(|o| &mut o.kind) {
        def.remarks = Some("customer accounts".to_string());
    }

    let context = CompareContext::new();
    let diff = SnapshotDiffer::new(&registry, &context).diff(&reference, &comparison);
    assert!(!diff.has_changes());

    let diff = SnapshotDiffer::new(&Registry::standard(), &context).diff(&reference, &comparison);
    assert_eq!(diff.changed.len(), 1);
    assert_eq!(diff.changed[0].differences[0].attribute, "remarks");
}

/// Custom type whose identity follows a `parent` link
struct NodeComparator {
    deepest: AtomicUsize,
}

fn parent<'a>(object: ObjectRef<'a>) -> Option<ObjectRef<'a>> {
    object
        .object
        .attribute("parent")
        .and_then(|value| value.as_object())
        .and_then(|id| object.follow(id))
}

impl ObjectComparator for NodeComparator {
    fn name(&self) -> &'static str {
        "node"
    }

    fn priority(&self, object_type: &ObjectType) -> Priority {
        match object_type {
            ObjectType::Custom(name) if name == "node" => Priority::TYPE,
            _ => Priority::NONE,
        }
    }

    fn is_same_object(&self, a: ObjectRef<'_>, b: ObjectRef<'_>, chain: &Chain<'_>) -> Result<bool, CompareError> {
        self.deepest.fetch_max(chain.depth(), Ordering::SeqCst);
        match (parent(a), parent(b)) {
            (Some(parent_a), Some(parent_b)) => chain.related_is_same(parent_a, parent_b),
            _ => Ok(chain.context().names_match(a.name(), b.name())),
        }
    }
}

fn node(name: &str, parent: Option<ObjectId>) -> SchemaObject {
    let mut attributes = BTreeMap::new();
    if let Some(parent) = parent {
        attributes.insert("parent".to_string(), AttributeValue::Object(parent));
    }
    SchemaObject::new(
        Some(name),
        ObjectKind::Custom(CustomDef {
            type_name: "node".to_string(),
            attributes,
        }),
    )
}

#[test]
fn test_cyclic_references_hit_the_depth_cap() {
    let comparator = Arc::new(NodeComparator {
        deepest: AtomicUsize::new(0),
    });
    let registry = Registry::standard_builder()
        .register_arc(comparator.clone())
        .max_depth(3)
        .build();

    // Each node is its own parent
    let mut snapshot = Snapshot::new("cyclic");
    snapshot.add(node("loop", Some(ObjectId(0))));
    let looped = snapshot.object_ref(ObjectId(0)).unwrap();

    assert!(!registry.is_same_object(looped, looped, &CompareContext::new()).unwrap());
    assert_eq!(comparator.deepest.load(Ordering::SeqCst), 3);

    // A finite chain of parents resolves normally
    let mut tree = Snapshot::new("tree");
    let root = tree.add(node("root", None));
    let child = tree.add(node("child", Some(root)));
    let child = tree.object_ref(child).unwrap();
    assert!(registry.is_same_object(child, child, &CompareContext::new()).unwrap());
}

#[test]
fn test_unsupported_type_is_reported() {
    let registry = Registry::standard_builder().build();
    let mut snapshot = Snapshot::new("custom");
    snapshot.add(node("n", None));
    let custom = snapshot.object_ref(ObjectId(0)).unwrap();

    // The default comparator covers every type, so custom types work out of the box
    assert!(is_same(&registry, custom, custom));

    let bare = Registry::builder().build();
    assert_eq!(
        bare.is_same_object(custom, custom, &CompareContext::new()),
        Err(CompareError::UnsupportedType(ObjectType::Custom("node".to_string())))
    );
}

#[test]
fn test_probe_failure_is_not_an_error() {
    let registry = Registry::standard();
    let probe = MockProbe::new().with_failure();
    let context = CompareContext::new().with_probe(Arc::new(probe.clone()));

    let reference = shop("desired");
    let mut comparison = shop("live");
    let email = find(&comparison, "public.users.email");
    if let Some(ObjectKind::Column(def)) = comparison.get_mut(email).map(|o| &mut o.kind) {
        def.data_type = Some("text".to_string());
    }

    let diff = SnapshotDiffer::new(&registry, &context).diff(&reference, &comparison);
    assert_eq!(diff.changed.len(), 1);
    assert_eq!(diff.changed[0].reference_path, "public.users.email");
    assert!(probe.call_count() > 0);
}
