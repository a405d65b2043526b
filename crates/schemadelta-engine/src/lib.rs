//! SchemaDelta engine - schema object comparison
//!
//! This crate decides which objects in two snapshots are the same logical
//! object and what differs between them:
//! - Comparator registry and chains
//! - Built-in comparators per object type
//! - Difference container and attribute equality functions
//! - Snapshot diff driver

pub mod chain;
pub mod comparators;
pub mod context;
pub mod differences;
pub mod error;
pub mod registry;
pub mod snapshot_diff;

pub use chain::Chain;
pub use comparators::{ObjectComparator, ObjectHash, Priority};
pub use context::{CompareContext, SchemaComparison, SchemaKey};
pub use differences::{
    AttributeSide, CompareFunction, DataTypeEquality, Difference, NameEquality, NormalizedTextEquality,
    ObjectDifferences, OrderedNameEquality, SameObjectEquality, ValueEquality,
};
pub use error::CompareError;
pub use registry::{Registry, RegistryBuilder, DEFAULT_MAX_DEPTH};
pub use snapshot_diff::{ObjectChange, ObjectEntry, SnapshotDiff, SnapshotDiffer};
