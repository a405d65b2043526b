//! Snapshot arena and borrowed object views

use crate::object::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Immutable collection of schema objects captured from one database side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Human-readable label (e.g. "dev", "prod", "desired")
    #[serde(default)]
    pub label: String,

    objects: Vec<SchemaObject>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            objects: Vec::new(),
        }
    }

    /// Add an object and return its handle
    pub fn add(&mut self, object: SchemaObject) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    pub fn add_schema(&mut self, catalog: Option<&str>, name: &str) -> ObjectId {
        self.add(SchemaObject::new(
            Some(name),
            ObjectKind::Schema(SchemaDef {
                catalog: catalog.map(str::to_string),
                is_default: false,
            }),
        ))
    }

    pub fn add_table(&mut self, schema: Option<ObjectId>, name: &str) -> ObjectId {
        self.add(SchemaObject::new(Some(name), ObjectKind::Table(TableDef::default())).with_schema(schema))
    }

    pub fn add_view(&mut self, schema: Option<ObjectId>, name: &str, definition: Option<&str>) -> ObjectId {
        self.add(
            SchemaObject::new(
                Some(name),
                ObjectKind::View(ViewDef {
                    definition: definition.map(str::to_string),
                    remarks: None,
                }),
            )
            .with_schema(schema),
        )
    }

    /// Add a column to a table or view; the column inherits the relation's schema
    pub fn add_column(&mut self, relation: ObjectId, name: &str, data_type: &str) -> ObjectId {
        let schema = self.get(relation).and_then(|r| r.schema);
        self.add(
            SchemaObject::new(
                Some(name),
                ObjectKind::Column(ColumnDef {
                    relation: Some(relation),
                    data_type: Some(data_type.to_string()),
                    ..ColumnDef::default()
                }),
            )
            .with_schema(schema),
        )
    }

    pub fn add_index(&mut self, table: ObjectId, name: Option<&str>, columns: &[ObjectId], unique: bool) -> ObjectId {
        let schema = self.get(table).and_then(|t| t.schema);
        self.add(
            SchemaObject::new(
                name,
                ObjectKind::Index(IndexDef {
                    table: Some(table),
                    columns: columns.to_vec(),
                    unique: Some(unique),
                }),
            )
            .with_schema(schema),
        )
    }

    pub fn add_primary_key(&mut self, table: ObjectId, name: Option<&str>, columns: &[ObjectId]) -> ObjectId {
        let schema = self.get(table).and_then(|t| t.schema);
        self.add(
            SchemaObject::new(
                name,
                ObjectKind::PrimaryKey(PrimaryKeyDef {
                    table: Some(table),
                    columns: columns.to_vec(),
                    backing_index: None,
                }),
            )
            .with_schema(schema),
        )
    }

    pub fn add_unique_constraint(&mut self, table: ObjectId, name: Option<&str>, columns: &[ObjectId]) -> ObjectId {
        let schema = self.get(table).and_then(|t| t.schema);
        self.add(
            SchemaObject::new(
                name,
                ObjectKind::UniqueConstraint(UniqueConstraintDef {
                    table: Some(table),
                    columns: columns.to_vec(),
                    ..UniqueConstraintDef::default()
                }),
            )
            .with_schema(schema),
        )
    }

    pub fn add_foreign_key(
        &mut self,
        table: ObjectId,
        name: Option<&str>,
        columns: &[ObjectId],
        referenced_table: ObjectId,
        referenced_columns: &[ObjectId],
    ) -> ObjectId {
        let schema = self.get(table).and_then(|t| t.schema);
        self.add(
            SchemaObject::new(
                name,
                ObjectKind::ForeignKey(ForeignKeyDef {
                    table: Some(table),
                    columns: columns.to_vec(),
                    referenced_table: Some(referenced_table),
                    referenced_columns: referenced_columns.to_vec(),
                    ..ForeignKeyDef::default()
                }),
            )
            .with_schema(schema),
        )
    }

    pub fn add_sequence(&mut self, schema: Option<ObjectId>, name: &str, def: SequenceDef) -> ObjectId {
        self.add(SchemaObject::new(Some(name), ObjectKind::Sequence(def)).with_schema(schema))
    }

    /// Mutable access for builders and fixtures
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SchemaObject> {
        self.objects.get_mut(id.0)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SchemaObject> {
        self.objects.get(id.0)
    }

    /// Borrowed view of one object, or `None` for a dangling handle
    pub fn object_ref(&self, id: ObjectId) -> Option<ObjectRef<'_>> {
        self.get(id).map(|object| ObjectRef {
            snapshot: self,
            id,
            object,
            bound_relation: None,
        })
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjectRef<'_>> {
        self.objects.iter().enumerate().map(move |(i, object)| ObjectRef {
            snapshot: self,
            id: ObjectId(i),
            object,
            bound_relation: None,
        })
    }

    /// All objects of one type, in insertion order
    pub fn of_type<'a>(&'a self, object_type: &'a ObjectType) -> impl Iterator<Item = ObjectRef<'a>> + 'a {
        self.iter().filter(move |o| &o.object_type() == object_type)
    }

    /// Every type present in the snapshot, built-ins first
    pub fn object_types(&self) -> Vec<ObjectType> {
        let mut types: Vec<ObjectType> = self.objects.iter().map(SchemaObject::object_type).collect();
        types.sort_by_key(|t| {
            let rank = ObjectType::BUILT_IN.iter().position(|b| b == t).unwrap_or(usize::MAX);
            (rank, t.clone())
        });
        types.dedup();
        types
    }

    /// Columns whose relation is the given table or view
    pub fn columns_of(&self, relation: ObjectId) -> Vec<ObjectRef<'_>> {
        self.of_type(&ObjectType::Column)
            .filter(|c| c.object.relation() == Some(relation))
            .collect()
    }

    /// Dotted path used in reports, e.g. `public.users.email`
    pub fn display_path(&self, id: ObjectId) -> String {
        let Some(object) = self.get(id) else {
            return id.to_string();
        };

        let mut parts = Vec::new();
        let owner = object.relation().or(object.schema);
        // Columns and constraints print through their relation, which prints its schema
        if let Some(owner) = owner.filter(|o| *o != id) {
            if let Some(parent) = self.get(owner) {
                if let Some(schema) = parent.schema.filter(|_| parent.object_type().is_relation()) {
                    parts.push(self.plain_name(schema));
                }
            }
            parts.push(self.plain_name(owner));
        }
        parts.push(object.name.clone().unwrap_or_else(|| format!("<unnamed {}>", object.object_type())));
        parts.join(".")
    }

    fn plain_name(&self, id: ObjectId) -> String {
        self.get(id)
            .and_then(|o| o.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Check that every handle resolves to an object of a sensible type
    pub fn validate(&self) -> Result<(), SnapshotError> {
        for (index, object) in self.objects.iter().enumerate() {
            let from = ObjectId(index);
            for (attribute, to) in object.references() {
                let target = self
                    .get(to)
                    .ok_or(SnapshotError::DanglingReference { from, to })?;

                let target_type = target.object_type();
                let expected = match attribute.as_str() {
                    "schema" => Some((target_type == ObjectType::Schema, "schema")),
                    "relation" => Some((target_type.is_relation(), "table or view")),
                    "table" | "referenced_table" => Some((target_type.is_relation(), "table or view")),
                    "columns" | "referenced_columns" => Some((target_type == ObjectType::Column, "column")),
                    "backing_index" => Some((target_type == ObjectType::Index, "index")),
                    _ => None,
                };

                if let Some((false, expected)) = expected {
                    return Err(SnapshotError::WrongReferenceType {
                        from,
                        attribute,
                        expected: expected.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Parse and validate a snapshot from JSON
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot =
            serde_json::from_str(json).map_err(|e| SnapshotError::Parse(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Load a snapshot JSON file
    pub fn from_file(path: &Path) -> Result<Self, SnapshotError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SnapshotError::Io(format!("{}: {}", path.display(), e)))?;

        let mut snapshot = Self::from_json(&contents)?;
        if snapshot.label.is_empty() {
            snapshot.label = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(|e| SnapshotError::Parse(e.to_string()))
    }

    /// SHA-256 of the object list, hex encoded
    ///
    /// The label is not part of the checksum, so two captures of an
    /// identical schema hash the same.
    pub fn checksum(&self) -> String {
        let canonical = serde_json::to_vec(&self.objects).unwrap_or_default();
        hex::encode(Sha256::digest(&canonical))
    }
}

/// Borrowed view of one object inside its snapshot
///
/// Cross references are resolved with [`ObjectRef::follow`], which is a
/// lookup in the arena rather than an owning pointer.
#[derive(Debug, Clone, Copy)]
pub struct ObjectRef<'a> {
    pub snapshot: &'a Snapshot,
    pub id: ObjectId,
    pub object: &'a SchemaObject,
    bound_relation: Option<ObjectId>,
}

impl<'a> ObjectRef<'a> {
    pub fn object_type(&self) -> ObjectType {
        self.object.object_type()
    }

    pub fn name(&self) -> Option<&'a str> {
        self.object.name()
    }

    /// Resolve another handle in the same snapshot
    pub fn follow(&self, id: ObjectId) -> Option<ObjectRef<'a>> {
        self.snapshot.object_ref(id)
    }

    /// The owning schema, if recorded
    pub fn schema(&self) -> Option<ObjectRef<'a>> {
        self.object.schema.and_then(|id| self.follow(id))
    }

    /// The owning relation, honouring a binding made with [`ObjectRef::bound_to`]
    pub fn relation(&self) -> Option<ObjectRef<'a>> {
        self.bound_relation
            .or_else(|| self.object.relation())
            .and_then(|id| self.follow(id))
    }

    /// View this object as if its relation were `relation`
    ///
    /// Used when a constraint compares its columns in the context of its own
    /// table; the snapshot itself is never modified.
    pub fn bound_to(self, relation: Option<ObjectId>) -> Self {
        Self {
            bound_relation: relation.or(self.bound_relation),
            ..self
        }
    }

    /// Resolved ordered column list; dangling handles are skipped
    pub fn columns(&self) -> Vec<ObjectRef<'a>> {
        self.object
            .columns()
            .iter()
            .filter_map(|id| self.follow(*id))
            .collect()
    }

    pub fn display_path(&self) -> String {
        self.snapshot.display_path(self.id)
    }
}

/// Snapshot loading errors
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Object {from} references missing object {to}")]
    DanglingReference { from: ObjectId, to: ObjectId },

    #[error("Object {from} attribute '{attribute}' must reference a {expected}")]
    WrongReferenceType {
        from: ObjectId,
        attribute: String,
        expected: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn users_snapshot() -> (Snapshot, ObjectId, ObjectId, ObjectId) {
        let mut snapshot = Snapshot::new("dev");
        let public = snapshot.add_schema(None, "public");
        let users = snapshot.add_table(Some(public), "users");
        let email = snapshot.add_column(users, "email", "varchar(255)");
        (snapshot, public, users, email)
    }

    #[test]
    fn builders_link_back_references() {
        let (snapshot, public, users, email) = users_snapshot();

        let column = snapshot.object_ref(email).unwrap();
        assert_eq!(column.relation().map(|r| r.id), Some(users));
        assert_eq!(column.schema().map(|s| s.id), Some(public));
        assert_eq!(snapshot.columns_of(users).len(), 1);
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn display_paths() {
        let (mut snapshot, _, users, email) = users_snapshot();
        let uq = snapshot.add_unique_constraint(users, None, &[email]);

        assert_eq!(snapshot.display_path(users), "public.users");
        assert_eq!(snapshot.display_path(email), "public.users.email");
        assert_eq!(snapshot.display_path(uq), "public.users.<unnamed unique_constraint>");
    }

    #[test]
    fn bound_relation_overrides_lookup() {
        let (mut snapshot, public, _, email) = users_snapshot();
        let accounts = snapshot.add_table(Some(public), "accounts");

        let column = snapshot.object_ref(email).unwrap().bound_to(Some(accounts));
        assert_eq!(column.relation().and_then(|r| r.name()), Some("accounts"));
        assert_eq!(snapshot.object_ref(email).unwrap().relation().and_then(|r| r.name()), Some("users"));
    }

    #[test]
    fn validate_rejects_dangling_handles() {
        let (mut snapshot, _, users, _) = users_snapshot();
        snapshot.add_unique_constraint(users, Some("uq"), &[ObjectId(99)]);

        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::DanglingReference { to: ObjectId(99), .. })
        ));
    }

    #[test]
    fn validate_rejects_wrong_reference_type() {
        let (mut snapshot, public, _, _) = users_snapshot();
        snapshot.add_column(public, "oops", "int");

        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::WrongReferenceType { .. })
        ));
    }

    #[test]
    fn json_roundtrip_keeps_checksum() {
        let (snapshot, _, _, _) = users_snapshot();
        let json = snapshot.to_json().unwrap();
        let parsed = Snapshot::from_json(&json).unwrap();

        assert_eq!(parsed, snapshot);
        assert_eq!(parsed.checksum(), snapshot.checksum());
        assert_eq!(snapshot.checksum().len(), 64);
    }

    #[test]
    fn checksum_ignores_label() {
        let (mut snapshot, _, _, _) = users_snapshot();
        let before = snapshot.checksum();
        snapshot.label = "prod".to_string();
        assert_eq!(snapshot.checksum(), before);
    }

    #[test]
    fn object_types_are_ordered() {
        let (mut snapshot, _, users, email) = users_snapshot();
        snapshot.add_index(users, Some("ix_email"), &[email], false);

        assert_eq!(
            snapshot.object_types(),
            vec![ObjectType::Schema, ObjectType::Table, ObjectType::Column, ObjectType::Index]
        );
    }

    #[test]
    fn from_file_defaults_label_to_file_stem() {
        let (mut snapshot, _, _, _) = users_snapshot();
        snapshot.label.clear();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staging.json");
        std::fs::write(&path, snapshot.to_json().unwrap()).unwrap();

        let loaded = Snapshot::from_file(&path).unwrap();
        assert_eq!(loaded.label, "staging");
    }
}
