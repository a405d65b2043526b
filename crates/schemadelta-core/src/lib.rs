//! SchemaDelta Core
//!
//! Schema object model, snapshots, and the stable report types.
//! Never rename diagnostic codes - they are part of the report format.

pub mod object;
pub mod snapshot;
pub mod diagnostic;
pub mod report;
pub mod config;

pub use object::{
    AttributeValue, ColumnDef, CustomDef, ForeignKeyDef, IndexDef, ObjectId, ObjectKind, ObjectType,
    PrimaryKeyDef, SchemaDef, SchemaObject, SequenceDef, TableDef, UniqueConstraintDef, ViewDef,
};
pub use snapshot::{ObjectRef, Snapshot, SnapshotError};
pub use diagnostic::{AttributeChange, Diagnostic, DiagnosticCode, Severity};
pub use report::{Report, ReportSummary, ReportVersion, SnapshotInfo};
pub use config::{Config, ConfigError, DialectConfig, ObjectFilters, SchemaLocation, SchemaMapping, SeverityThreshold};
