//! # Entity Type Schemas
//!
//! The per-record-type slice of a schema: every field descriptor the type
//! was mapped with, grouped by attribute ordinal, plus the type's canonical
//! rank. Ranks are assigned after all types are known, by sorting types
//! into a canonical total order, so they are a pure function of the set of
//! declared types and never of registration order.

use crate::field::FieldInfo;
use crate::types::{Ordinal, OrdinalSet, TypeMark};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

/// All attribute-to-field mappings of one record type.
pub struct EntityTypeSchema {
    mark: TypeMark,
    fields: Vec<FieldInfo>,
    by_attr: BTreeMap<Ordinal, Range<usize>>,
    attrs: OrdinalSet,
    rank: usize,
}

impl EntityTypeSchema {
    pub(crate) fn new(mark: TypeMark, mut fields: Vec<FieldInfo>) -> Self {
        // Stable sort: descriptors of one attribute keep their mapping
        // registration order within the group.
        fields.sort_by_key(FieldInfo::attr);

        let mut by_attr = BTreeMap::new();
        let mut attrs = OrdinalSet::empty();
        let mut index = 0;
        while index < fields.len() {
            let current = fields[index].attr();
            let start = index;
            while index < fields.len() && fields[index].attr() == current {
                index += 1;
            }
            by_attr.insert(current, start..index);
            attrs.insert(current);
        }

        Self {
            mark,
            fields,
            by_attr,
            attrs,
            rank: 0,
        }
    }

    pub(crate) const fn set_rank(&mut self, rank: usize) {
        self.rank = rank;
    }

    /// The mark of the described record type.
    #[must_use]
    pub const fn mark(&self) -> TypeMark {
        self.mark
    }

    /// All field descriptors, ordered by attribute ordinal.
    #[must_use]
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// The descriptors backing one attribute on this type. An attribute may
    /// map to several selectors (many-valued relationships), so this is a
    /// slice; it is empty for attributes the type does not carry.
    #[must_use]
    pub fn fields_for(&self, attr: Ordinal) -> &[FieldInfo] {
        self.by_attr
            .get(&attr)
            .map_or(&[], |range| &self.fields[range.clone()])
    }

    /// The set of attribute ordinals this type carries.
    #[must_use]
    pub const fn attrs(&self) -> OrdinalSet {
        self.attrs
    }

    /// The canonical rank of this type: dense, zero-based, independent of
    /// registration order.
    #[must_use]
    pub const fn rank(&self) -> usize {
        self.rank
    }
}

impl fmt::Debug for EntityTypeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityTypeSchema")
            .field("mark", &self.mark)
            .field("rank", &self.rank)
            .field("fields", &self.fields.len())
            .finish()
    }
}
