//! Comparator chain cursor
//!
//! A [`Chain`] is the part of an ordered comparator list that has not run
//! yet. A comparator receives the chain positioned after itself: calling
//! `chain.is_same_object(..)` asks the next, more generic comparator for
//! its verdict, while the `related_*` methods go back through the registry
//! for objects of another type (a constraint's table, a column's relation).

use crate::comparators::{ObjectComparator, ObjectHash};
use crate::context::CompareContext;
use crate::differences::ObjectDifferences;
use crate::error::CompareError;
use crate::registry::Registry;
use schemadelta_core::ObjectRef;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy)]
pub struct Chain<'c> {
    registry: &'c Registry,
    context: &'c CompareContext,
    links: &'c [Arc<dyn ObjectComparator>],
    depth: usize,
}

impl<'c> Chain<'c> {
    pub(crate) fn new(
        registry: &'c Registry,
        context: &'c CompareContext,
        links: &'c [Arc<dyn ObjectComparator>],
        depth: usize,
    ) -> Self {
        Self {
            registry,
            context,
            links,
            depth,
        }
    }

    pub fn context(&self) -> &'c CompareContext {
        self.context
    }

    pub fn registry(&self) -> &'c Registry {
        self.registry
    }

    /// Recursion depth of this chain; top-level registry calls start at 0
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of comparators still to run
    pub fn remaining(&self) -> usize {
        self.links.len()
    }

    fn split(&self) -> Option<(&'c Arc<dyn ObjectComparator>, Chain<'c>)> {
        self.links
            .split_first()
            .map(|(head, rest)| (head, Chain { links: rest, ..*self }))
    }

    /// Hash contributed by the rest of the chain; empty at the end
    pub fn hash(&self, object: ObjectRef<'_>) -> Result<ObjectHash, CompareError> {
        match self.split() {
            Some((head, rest)) => head.hash(object, &rest),
            None => Ok(ObjectHash::new()),
        }
    }

    /// Verdict of the rest of the chain; `false` at the end
    pub fn is_same_object(&self, a: ObjectRef<'_>, b: ObjectRef<'_>) -> Result<bool, CompareError> {
        match self.split() {
            Some((head, rest)) => head.is_same_object(a, b, &rest),
            None => Ok(false),
        }
    }

    /// Differences found by the rest of the chain
    ///
    /// At the end of the chain this is an empty container carrying the
    /// accumulated exclusions.
    pub fn find_differences(
        &self,
        a: ObjectRef<'_>,
        b: ObjectRef<'_>,
        exclude: &mut BTreeSet<String>,
    ) -> Result<ObjectDifferences, CompareError> {
        match self.split() {
            Some((head, rest)) => head.find_differences(a, b, &rest, exclude),
            None => Ok(ObjectDifferences::new(exclude.clone())),
        }
    }

    /// Hash of another object, through its own chain
    pub fn related_hash(&self, object: ObjectRef<'_>) -> Result<ObjectHash, CompareError> {
        self.registry.hash_at(object, self.context, self.depth + 1)
    }

    /// Identity of two other objects, through their own chain
    pub fn related_is_same(&self, a: ObjectRef<'_>, b: ObjectRef<'_>) -> Result<bool, CompareError> {
        self.registry.is_same_at(a, b, self.context, self.depth + 1)
    }

    /// Differences between two other objects, through their own chain
    pub fn related_differences(&self, a: ObjectRef<'_>, b: ObjectRef<'_>) -> Result<ObjectDifferences, CompareError> {
        self.registry.differences_at(a, b, self.context, self.depth + 1)
    }
}

impl fmt::Debug for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.links.iter().map(|c| c.name()).collect();
        f.debug_struct("Chain")
            .field("links", &names)
            .field("depth", &self.depth)
            .finish()
    }
}
