//! # The Frozen Schema
//!
//! The immutable aggregate produced by one successful builder run: the
//! attribute table (token ↔ ordinal ↔ declared type), every entity type
//! schema in canonical rank order, the reserved attribute ordinals, and the
//! name-keyed rule table. Read-only and shareable for the life of the
//! process; every lookup and every generated accessor is safe for
//! unbounded concurrent use.

use crate::entity::EntityTypeSchema;
use crate::rules::RuleDef;
use crate::types::{Attr, DeclaredType, Ordinal, OrdinalSet, SchemaError, TypeMark};
use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;

/// An immutable attribute schema over a set of declared record types.
pub struct Schema {
    pub(crate) name: String,
    pub(crate) attrs: Vec<Attr>,
    pub(crate) attr_types: Vec<DeclaredType>,
    pub(crate) ordinals: BTreeMap<Attr, Ordinal>,
    pub(crate) entity_types: Vec<EntityTypeSchema>,
    pub(crate) by_type: BTreeMap<TypeId, usize>,
    pub(crate) self_ordinal: Ordinal,
    pub(crate) type_ordinal: Ordinal,
    pub(crate) text_attrs: OrdinalSet,
    pub(crate) rules: BTreeMap<String, RuleDef>,
}

impl Schema {
    /// The schema's name, used in error messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve an attribute token to its ordinal.
    pub fn ordinal(&self, attr: Attr) -> Result<Ordinal, SchemaError> {
        self.ordinals
            .get(&attr)
            .copied()
            .ok_or_else(|| SchemaError::UnknownAttribute {
                schema: self.name.clone(),
                attr,
            })
    }

    /// The token behind an ordinal. Ordinals are only minted by this
    /// schema, so the lookup is total.
    #[must_use]
    pub fn attr(&self, ordinal: Ordinal) -> Attr {
        self.attrs[ordinal.index()]
    }

    /// The declared type fixed for an attribute at registration.
    #[must_use]
    pub fn declared_type(&self, ordinal: Ordinal) -> &DeclaredType {
        &self.attr_types[ordinal.index()]
    }

    /// Number of registered attributes, reserved ones included.
    #[must_use]
    pub fn attr_count(&self) -> usize {
        self.attrs.len()
    }

    /// Iterate all attributes in ordinal order.
    pub fn attrs(&self) -> impl Iterator<Item = (Ordinal, Attr)> {
        self.attrs
            .iter()
            .enumerate()
            .map(|(index, attr)| (Ordinal::new(index as u8), *attr))
    }

    /// Ordinal of the reserved `Self` attribute.
    #[must_use]
    pub const fn self_ordinal(&self) -> Ordinal {
        self.self_ordinal
    }

    /// Ordinal of the reserved `Type` attribute.
    #[must_use]
    pub const fn type_ordinal(&self) -> Ordinal {
        self.type_ordinal
    }

    /// The ordinals of text-kinded attributes, as mapped by any type.
    #[must_use]
    pub const fn text_attrs(&self) -> OrdinalSet {
        self.text_attrs
    }

    /// The entity type schema for record type `T`.
    pub fn entity_type<T: 'static>(&self) -> Result<&EntityTypeSchema, SchemaError> {
        self.entity_type_lookup(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// The entity type schema behind a runtime type mark.
    pub fn entity_type_for(&self, mark: TypeMark) -> Result<&EntityTypeSchema, SchemaError> {
        self.entity_type_lookup(mark.id(), mark.name())
    }

    fn entity_type_lookup(
        &self,
        id: TypeId,
        name: &'static str,
    ) -> Result<&EntityTypeSchema, SchemaError> {
        self.by_type
            .get(&id)
            .map(|&index| &self.entity_types[index])
            .ok_or_else(|| SchemaError::UnknownEntityType {
                schema: self.name.clone(),
                name,
            })
    }

    /// All entity type schemas, in canonical rank order (`rank == index`).
    #[must_use]
    pub fn entity_types(&self) -> &[EntityTypeSchema] {
        &self.entity_types
    }

    /// Look up a rule definition by name.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&RuleDef> {
        self.rules.get(name)
    }

    /// Iterate all rule definitions, ordered by name.
    pub fn rules(&self) -> impl Iterator<Item = &RuleDef> {
        self.rules.values()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("attrs", &self.attrs.len())
            .field("entity_types", &self.entity_types.len())
            .field("rules", &self.rules.len())
            .finish()
    }
}
