//! Schema object model
//!
//! Objects live in a [`Snapshot`](crate::Snapshot) arena and refer to each
//! other through [`ObjectId`] handles. A column points at its relation, a
//! constraint points at its table and columns, and nothing owns anything else.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque handle to an object inside one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub usize);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type tag of a schema object
///
/// `Custom` keeps the type space open: a new object type only needs a
/// registered comparator, not a new variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Schema,
    Table,
    View,
    Column,
    Index,
    PrimaryKey,
    UniqueConstraint,
    ForeignKey,
    Sequence,
    Custom(String),
}

impl ObjectType {
    /// Built-in types, in the order a diff walks them
    pub const BUILT_IN: [ObjectType; 9] = [
        ObjectType::Schema,
        ObjectType::Table,
        ObjectType::View,
        ObjectType::Column,
        ObjectType::Index,
        ObjectType::PrimaryKey,
        ObjectType::UniqueConstraint,
        ObjectType::ForeignKey,
        ObjectType::Sequence,
    ];

    /// Stable lowercase identifier
    pub fn as_str(&self) -> &str {
        match self {
            Self::Schema => "schema",
            Self::Table => "table",
            Self::View => "view",
            Self::Column => "column",
            Self::Index => "index",
            Self::PrimaryKey => "primary_key",
            Self::UniqueConstraint => "unique_constraint",
            Self::ForeignKey => "foreign_key",
            Self::Sequence => "sequence",
            Self::Custom(name) => name,
        }
    }

    /// Parse an identifier produced by [`ObjectType::as_str`]
    ///
    /// Unknown identifiers become `Custom` types.
    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_lowercase();
        Self::BUILT_IN
            .iter()
            .find(|t| t.as_str() == normalized)
            .cloned()
            .unwrap_or(Self::Custom(normalized))
    }

    /// Tables and views both own columns
    pub fn is_relation(&self) -> bool {
        matches!(self, Self::Table | Self::View)
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value of a single object attribute, as seen by the generic comparator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Object(ObjectId),
    Objects(Vec<ObjectId>),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Self::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_objects(&self) -> Option<&[ObjectId]> {
        match self {
            Self::Objects(ids) => Some(ids),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{}", value),
            Self::Int(value) => write!(f, "{}", value),
            Self::Text(value) => write!(f, "{}", value),
            Self::Object(id) => write!(f, "{}", id),
            Self::Objects(ids) => {
                let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", ids.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    #[serde(default)]
    pub catalog: Option<String>,

    /// Whether this is the connection's default schema
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    #[serde(default)]
    pub remarks: Option<String>,

    #[serde(default)]
    pub tablespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewDef {
    #[serde(default)]
    pub definition: Option<String>,

    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Owning table or view
    #[serde(default)]
    pub relation: Option<ObjectId>,

    #[serde(default)]
    pub data_type: Option<String>,

    #[serde(default)]
    pub nullable: Option<bool>,

    #[serde(default)]
    pub default_value: Option<String>,

    #[serde(default)]
    pub auto_increment: bool,

    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    #[serde(default)]
    pub table: Option<ObjectId>,

    #[serde(default)]
    pub columns: Vec<ObjectId>,

    #[serde(default)]
    pub unique: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeyDef {
    #[serde(default)]
    pub table: Option<ObjectId>,

    #[serde(default)]
    pub columns: Vec<ObjectId>,

    #[serde(default)]
    pub backing_index: Option<ObjectId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniqueConstraintDef {
    #[serde(default)]
    pub table: Option<ObjectId>,

    /// Constrained columns, in declaration order
    #[serde(default)]
    pub columns: Vec<ObjectId>,

    #[serde(default)]
    pub backing_index: Option<ObjectId>,

    #[serde(default)]
    pub deferrable: bool,

    #[serde(default)]
    pub initially_deferred: bool,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default)]
    pub clustered: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    #[serde(default)]
    pub table: Option<ObjectId>,

    #[serde(default)]
    pub columns: Vec<ObjectId>,

    #[serde(default)]
    pub referenced_table: Option<ObjectId>,

    #[serde(default)]
    pub referenced_columns: Vec<ObjectId>,

    #[serde(default)]
    pub on_delete: Option<String>,

    #[serde(default)]
    pub on_update: Option<String>,

    #[serde(default)]
    pub deferrable: bool,

    #[serde(default)]
    pub initially_deferred: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceDef {
    #[serde(default)]
    pub start_value: Option<i64>,

    #[serde(default)]
    pub increment_by: Option<i64>,

    #[serde(default)]
    pub min_value: Option<i64>,

    #[serde(default)]
    pub max_value: Option<i64>,

    #[serde(default)]
    pub cycle: Option<bool>,
}

/// Object of a type the model has no typed definition for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomDef {
    pub type_name: String,

    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

/// Variant-specific part of a schema object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectKind {
    Schema(SchemaDef),
    Table(TableDef),
    View(ViewDef),
    Column(ColumnDef),
    Index(IndexDef),
    PrimaryKey(PrimaryKeyDef),
    UniqueConstraint(UniqueConstraintDef),
    ForeignKey(ForeignKeyDef),
    Sequence(SequenceDef),
    Custom(CustomDef),
}

/// A named or unnamed relational schema element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaObject {
    #[serde(default)]
    pub name: Option<String>,

    /// Owning schema
    #[serde(default)]
    pub schema: Option<ObjectId>,

    #[serde(flatten)]
    pub kind: ObjectKind,
}

impl SchemaObject {
    /// Create an object with no schema
    pub fn new(name: Option<&str>, kind: ObjectKind) -> Self {
        Self {
            name: name.map(str::to_string),
            schema: None,
            kind,
        }
    }

    /// Set the owning schema
    pub fn with_schema(mut self, schema: Option<ObjectId>) -> Self {
        self.schema = schema;
        self
    }

    pub fn object_type(&self) -> ObjectType {
        match &self.kind {
            ObjectKind::Schema(_) => ObjectType::Schema,
            ObjectKind::Table(_) => ObjectType::Table,
            ObjectKind::View(_) => ObjectType::View,
            ObjectKind::Column(_) => ObjectType::Column,
            ObjectKind::Index(_) => ObjectType::Index,
            ObjectKind::PrimaryKey(_) => ObjectType::PrimaryKey,
            ObjectKind::UniqueConstraint(_) => ObjectType::UniqueConstraint,
            ObjectKind::ForeignKey(_) => ObjectType::ForeignKey,
            ObjectKind::Sequence(_) => ObjectType::Sequence,
            ObjectKind::Custom(def) => ObjectType::Custom(def.type_name.to_lowercase()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Relation this object hangs off: a column's table or view, a
    /// constraint's or index's table
    pub fn relation(&self) -> Option<ObjectId> {
        match &self.kind {
            ObjectKind::Column(def) => def.relation,
            ObjectKind::Index(def) => def.table,
            ObjectKind::PrimaryKey(def) => def.table,
            ObjectKind::UniqueConstraint(def) => def.table,
            ObjectKind::ForeignKey(def) => def.table,
            _ => None,
        }
    }

    /// Ordered column list of index-like and constraint objects
    pub fn columns(&self) -> &[ObjectId] {
        match &self.kind {
            ObjectKind::Index(def) => &def.columns,
            ObjectKind::PrimaryKey(def) => &def.columns,
            ObjectKind::UniqueConstraint(def) => &def.columns,
            ObjectKind::ForeignKey(def) => &def.columns,
            _ => &[],
        }
    }

    /// Every attribute the generic comparator may look at
    ///
    /// Absent optional values are left out of the map.
    pub fn attributes(&self) -> BTreeMap<String, AttributeValue> {
        let mut attrs = AttributeMap::default();
        attrs.text("name", &self.name);
        attrs.object("schema", self.schema);

        match &self.kind {
            ObjectKind::Schema(def) => {
                attrs.text("catalog", &def.catalog);
                attrs.bool("is_default", def.is_default);
            }
            ObjectKind::Table(def) => {
                attrs.text("remarks", &def.remarks);
                attrs.text("tablespace", &def.tablespace);
            }
            ObjectKind::View(def) => {
                attrs.text("definition", &def.definition);
                attrs.text("remarks", &def.remarks);
            }
            ObjectKind::Column(def) => {
                attrs.object("relation", def.relation);
                attrs.text("data_type", &def.data_type);
                attrs.opt_bool("nullable", def.nullable);
                attrs.text("default_value", &def.default_value);
                attrs.bool("auto_increment", def.auto_increment);
                attrs.text("remarks", &def.remarks);
            }
            ObjectKind::Index(def) => {
                attrs.object("table", def.table);
                attrs.objects("columns", &def.columns);
                attrs.opt_bool("unique", def.unique);
            }
            ObjectKind::PrimaryKey(def) => {
                attrs.object("table", def.table);
                attrs.objects("columns", &def.columns);
                attrs.object("backing_index", def.backing_index);
            }
            ObjectKind::UniqueConstraint(def) => {
                attrs.object("table", def.table);
                attrs.objects("columns", &def.columns);
                attrs.object("backing_index", def.backing_index);
                attrs.bool("deferrable", def.deferrable);
                attrs.bool("initially_deferred", def.initially_deferred);
                attrs.bool("disabled", def.disabled);
                attrs.bool("clustered", def.clustered);
            }
            ObjectKind::ForeignKey(def) => {
                attrs.object("table", def.table);
                attrs.objects("columns", &def.columns);
                attrs.object("referenced_table", def.referenced_table);
                attrs.objects("referenced_columns", &def.referenced_columns);
                attrs.text("on_delete", &def.on_delete);
                attrs.text("on_update", &def.on_update);
                attrs.bool("deferrable", def.deferrable);
                attrs.bool("initially_deferred", def.initially_deferred);
            }
            ObjectKind::Sequence(def) => {
                attrs.int("start_value", def.start_value);
                attrs.int("increment_by", def.increment_by);
                attrs.int("min_value", def.min_value);
                attrs.int("max_value", def.max_value);
                attrs.opt_bool("cycle", def.cycle);
            }
            ObjectKind::Custom(def) => {
                for (key, value) in &def.attributes {
                    attrs.0.insert(key.clone(), value.clone());
                }
            }
        }

        attrs.0
    }

    /// Look up a single attribute
    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        self.attributes().remove(name)
    }

    /// Every handle this object holds, paired with the attribute holding it
    pub fn references(&self) -> Vec<(String, ObjectId)> {
        let mut refs = Vec::new();
        for (key, value) in self.attributes() {
            match value {
                AttributeValue::Object(id) => refs.push((key, id)),
                AttributeValue::Objects(ids) => {
                    refs.extend(ids.into_iter().map(|id| (key.clone(), id)))
                }
                _ => {}
            }
        }
        refs
    }
}

#[derive(Default)]
struct AttributeMap(BTreeMap<String, AttributeValue>);

impl AttributeMap {
    fn text(&mut self, key: &str, value: &Option<String>) {
        if let Some(value) = value {
            self.0.insert(key.to_string(), AttributeValue::Text(value.clone()));
        }
    }

    fn object(&mut self, key: &str, value: Option<ObjectId>) {
        if let Some(id) = value {
            self.0.insert(key.to_string(), AttributeValue::Object(id));
        }
    }

    fn objects(&mut self, key: &str, ids: &[ObjectId]) {
        self.0.insert(key.to_string(), AttributeValue::Objects(ids.to_vec()));
    }

    fn bool(&mut self, key: &str, value: bool) {
        self.0.insert(key.to_string(), AttributeValue::Bool(value));
    }

    fn opt_bool(&mut self, key: &str, value: Option<bool>) {
        if let Some(value) = value {
            self.bool(key, value);
        }
    }

    fn int(&mut self, key: &str, value: Option<i64>) {
        if let Some(value) = value {
            self.0.insert(key.to_string(), AttributeValue::Int(value));
        }
    }
}
