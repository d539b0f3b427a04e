//! Subtype selection against the root type.

use crate::resolve::ResolvedClass;

/// Private-name marker for library-private declarations.
const PRIVATE_PREFIX: char = '_';

/// Selects the public, non-mixin subtypes of a root class.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchyFilter {
    /// Treat the root as its own subtype.
    pub include_root: bool,
}

impl HierarchyFilter {
    pub fn new(include_root: bool) -> Self {
        Self { include_root }
    }

    /// Whether `class` belongs in the catalog for `root`.
    pub fn accepts(&self, class: &ResolvedClass, root: &ResolvedClass) -> bool {
        if class.is_mixin || class.name.starts_with(PRIVATE_PREFIX) {
            return false;
        }
        class.supertypes.contains(&root.id) || (self.include_root && class.id == root.id)
    }

    /// Matching classes, in input order.
    pub fn select_subtypes<'c, I>(&self, classes: I, root: &ResolvedClass) -> Vec<&'c ResolvedClass>
    where
        I: IntoIterator<Item = &'c ResolvedClass>,
    {
        classes
            .into_iter()
            .filter(|c| self.accepts(c, root))
            .collect()
    }
}
