//! Comparator errors

use schemadelta_core::ObjectType;

/// Errors surfaced by the comparator registry
///
/// Missing or partial metadata is never an error; comparators resolve it
/// through their fallback rules. Only gaps in comparator coverage are
/// reported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    #[error("No comparator registered for object type '{0}'")]
    UnsupportedType(ObjectType),
}
