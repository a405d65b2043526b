//! Snapshot diff driver
//!
//! Pairs up the objects of two snapshots type by type and collects what is
//! missing, unexpected, or changed. Candidates are bucketed by the first
//! token of their hash; partial hashes go into a wildcard bucket that every
//! object is checked against, so bucketing never hides a match.

use crate::context::CompareContext;
use crate::error::CompareError;
use crate::registry::Registry;
use schemadelta_core::{
    AttributeChange, Config, Diagnostic, DiagnosticCode, ObjectFilters, ObjectRef, ObjectType, Report,
    Snapshot, SnapshotInfo,
};
use serde::Serialize;
use std::collections::HashMap;

/// An object present on one side only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectEntry {
    pub object_type: String,
    pub path: String,
}

/// A matched pair whose attributes differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectChange {
    pub object_type: String,
    pub reference_path: String,
    pub compared_path: String,
    pub differences: Vec<AttributeChange>,
}

/// Result of diffing two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotDiff {
    pub reference_label: String,
    pub comparison_label: String,

    /// In the reference snapshot only
    pub missing: Vec<ObjectEntry>,

    /// In the comparison snapshot only
    pub unexpected: Vec<ObjectEntry>,

    pub changed: Vec<ObjectChange>,

    /// Matched pairs, changed or not
    pub matched: usize,

    /// Types no comparator handles; their objects were not compared
    pub unsupported: Vec<String>,
}

impl SnapshotDiff {
    pub fn has_changes(&self) -> bool {
        !self.missing.is_empty() || !self.unexpected.is_empty() || !self.changed.is_empty()
    }

    /// Convert to a report, applying the configured severities
    pub fn to_report(&self, config: &Config, reference: &Snapshot, comparison: &Snapshot) -> Report {
        let severity = |code: DiagnosticCode| config.severity.get_severity(code);
        let mut report = Report::new().with_snapshots(snapshot_info(reference), snapshot_info(comparison));

        for object_type in &self.unsupported {
            let code = DiagnosticCode::UnsupportedObjectType;
            report.add_diagnostic(Diagnostic::new(
                code,
                severity(code),
                format!("No comparator registered for object type '{}'", object_type),
            ));
        }

        for entry in &self.missing {
            let code = DiagnosticCode::ObjectMissing;
            report.add_diagnostic(
                Diagnostic::new(
                    code,
                    severity(code),
                    format!("{} '{}' is missing from '{}'", entry.object_type, entry.path, self.comparison_label),
                )
                .with_object(&entry.object_type, &entry.path),
            );
        }

        for entry in &self.unexpected {
            let code = DiagnosticCode::ObjectUnexpected;
            report.add_diagnostic(
                Diagnostic::new(
                    code,
                    severity(code),
                    format!("{} '{}' is not in '{}'", entry.object_type, entry.path, self.reference_label),
                )
                .with_object(&entry.object_type, &entry.path),
            );
        }

        for change in &self.changed {
            let code = DiagnosticCode::ObjectChanged;
            let attributes: Vec<&str> = change.differences.iter().map(|d| d.attribute.as_str()).collect();
            report.add_diagnostic(
                Diagnostic::new(
                    code,
                    severity(code),
                    format!(
                        "{} '{}' differs: {}",
                        change.object_type,
                        change.reference_path,
                        attributes.join(", ")
                    ),
                )
                .with_object(&change.object_type, &change.reference_path)
                .with_changes(change.differences.clone()),
            );
        }

        report.summary.objects_matched = self.matched;
        report
    }
}

fn snapshot_info(snapshot: &Snapshot) -> SnapshotInfo {
    SnapshotInfo {
        label: snapshot.label.clone(),
        checksum: snapshot.checksum(),
        objects: snapshot.len(),
    }
}

/// Drives the registry over two whole snapshots
#[derive(Debug)]
pub struct SnapshotDiffer<'r> {
    registry: &'r Registry,
    context: &'r CompareContext,
    filters: ObjectFilters,
}

impl<'r> SnapshotDiffer<'r> {
    pub fn new(registry: &'r Registry, context: &'r CompareContext) -> Self {
        Self {
            registry,
            context,
            filters: ObjectFilters::default(),
        }
    }

    pub fn with_filters(mut self, filters: ObjectFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Diff `comparison` against `reference`
    pub fn diff(&self, reference: &Snapshot, comparison: &Snapshot) -> SnapshotDiff {
        let mut diff = SnapshotDiff {
            reference_label: reference.label.clone(),
            comparison_label: comparison.label.clone(),
            ..SnapshotDiff::default()
        };

        let mut object_types = reference.object_types();
        object_types.extend(comparison.object_types());
        object_types.sort_by_key(|t| {
            let rank = ObjectType::BUILT_IN.iter().position(|b| b == t).unwrap_or(usize::MAX);
            (rank, t.clone())
        });
        object_types.dedup();

        for object_type in object_types {
            if self.filters.is_type_skipped(&object_type) {
                tracing::debug!(object_type = %object_type, "object type skipped by filter");
                continue;
            }

            let reference_objects = self.candidates(reference, &object_type);
            let comparison_objects = self.candidates(comparison, &object_type);

            match self.diff_type(&reference_objects, &comparison_objects) {
                Ok(type_diff) => {
                    tracing::debug!(
                        object_type = %object_type,
                        matched = type_diff.matched,
                        missing = type_diff.missing.len(),
                        unexpected = type_diff.unexpected.len(),
                        "object type compared"
                    );
                    diff.matched += type_diff.matched;
                    diff.missing.extend(type_diff.missing);
                    diff.unexpected.extend(type_diff.unexpected);
                    diff.changed.extend(type_diff.changed);
                }
                Err(CompareError::UnsupportedType(unsupported)) => {
                    tracing::warn!(
                        object_type = %object_type,
                        unsupported = %unsupported,
                        "no comparator registered, objects not compared"
                    );
                    let name = unsupported.to_string();
                    if !diff.unsupported.contains(&name) {
                        diff.unsupported.push(name);
                    }
                }
            }
        }

        tracing::info!(
            reference = %diff.reference_label,
            comparison = %diff.comparison_label,
            matched = diff.matched,
            missing = diff.missing.len(),
            unexpected = diff.unexpected.len(),
            changed = diff.changed.len(),
            "snapshot diff complete"
        );

        diff
    }

    fn candidates<'s>(&self, snapshot: &'s Snapshot, object_type: &ObjectType) -> Vec<ObjectRef<'s>> {
        snapshot
            .iter()
            .filter(|o| &o.object_type() == object_type)
            .filter(|o| {
                let skipped = o.name().is_some_and(|n| self.filters.is_object_skipped(n))
                    || self.filters.is_object_skipped(&o.display_path());
                !skipped
            })
            .collect()
    }

    fn diff_type(
        &self,
        reference_objects: &[ObjectRef<'_>],
        comparison_objects: &[ObjectRef<'_>],
    ) -> Result<TypeDiff, CompareError> {
        let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
        let mut wildcard = Vec::new();
        for (index, object) in comparison_objects.iter().enumerate() {
            let hash = self.registry.hash(*object, self.context)?;
            match hash.primary() {
                Some(key) => buckets.entry(key.to_string()).or_default().push(index),
                None => wildcard.push(index),
            }
        }

        let mut claimed = vec![false; comparison_objects.len()];
        let mut type_diff = TypeDiff::default();

        for reference_object in reference_objects {
            let hash = self.registry.hash(*reference_object, self.context)?;
            let mut candidates: Vec<usize> = match hash.primary() {
                Some(key) => buckets
                    .get(key)
                    .into_iter()
                    .flatten()
                    .chain(wildcard.iter())
                    .copied()
                    .collect(),
                None => (0..comparison_objects.len()).collect(),
            };
            candidates.sort_unstable();

            let mut matched = None;
            for index in candidates {
                if claimed[index] {
                    continue;
                }
                if self
                    .registry
                    .is_same_object(*reference_object, comparison_objects[index], self.context)?
                {
                    matched = Some(index);
                    break;
                }
            }

            let Some(index) = matched else {
                type_diff.missing.push(entry(reference_object));
                continue;
            };

            claimed[index] = true;
            type_diff.matched += 1;

            let compared_object = comparison_objects[index];
            let differences = self
                .registry
                .find_differences(*reference_object, compared_object, self.context)?;
            if differences.has_differences() {
                type_diff.changed.push(ObjectChange {
                    object_type: reference_object.object_type().to_string(),
                    reference_path: reference_object.display_path(),
                    compared_path: compared_object.display_path(),
                    differences: differences.render(reference_object.snapshot, compared_object.snapshot),
                });
            }
        }

        type_diff.unexpected = comparison_objects
            .iter()
            .zip(&claimed)
            .filter(|(_, claimed)| !**claimed)
            .map(|(object, _)| entry(object))
            .collect();

        Ok(type_diff)
    }
}

#[derive(Debug, Default)]
struct TypeDiff {
    matched: usize,
    missing: Vec<ObjectEntry>,
    unexpected: Vec<ObjectEntry>,
    changed: Vec<ObjectChange>,
}

fn entry(object: &ObjectRef<'_>) -> ObjectEntry {
    ObjectEntry {
        object_type: object.object_type().to_string(),
        path: object.display_path(),
    }
}
