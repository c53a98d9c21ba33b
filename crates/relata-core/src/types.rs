//! # Core Type Definitions
//!
//! Tokens and identity types for the Relata schema substrate:
//! - Attribute tokens (`Attr`) and their dense ordinals (`Ordinal`, `OrdinalSet`)
//! - Runtime record type descriptors (`TypeMark`)
//! - Declared attribute types (`DeclaredType`, `Capability`)
//! - Error types (`SchemaError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Carry no interior mutability; everything is value-like and `Send + Sync`

use std::any::TypeId;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// =============================================================================
// ATTRIBUTES
// =============================================================================

/// Maximum number of distinct attributes a schema may hold, including the
/// two reserved attributes. Bounds `Ordinal` so that `OrdinalSet` fits in a
/// single 64-bit word.
pub const MAX_ATTRIBUTES: usize = 64;

/// An attribute token: a named semantic property shared across unrelated
/// record types.
///
/// Callers mint their own tokens as constants, e.g.
/// `const NAME: Attr = Attr::Named("name");`. Two reserved attributes exist
/// in every schema and are registered after all caller attributes:
/// [`Attr::Self_`] (the identity of the record itself) and [`Attr::Type`]
/// (the record's runtime type descriptor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attr {
    /// Caller-defined attribute, identified by a static name.
    Named(&'static str),
    /// The entity itself. Declared type is unconstrained.
    Self_,
    /// The entity's runtime type descriptor.
    Type,
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Self_ => write!(f, "Self"),
            Self::Type => write!(f, "Type"),
        }
    }
}

// =============================================================================
// ORDINALS
// =============================================================================

/// Dense, zero-based integer identifier assigned to an attribute at first
/// registration, in registration order.
///
/// Ordinals are only minted by schema construction; a successfully built
/// schema assigns exactly `0..attr_count()` with no gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ordinal(u8);

impl Ordinal {
    pub(crate) const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// The ordinal as a dense index, usable against ordinal-indexed tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A set of attribute ordinals, packed into one 64-bit word.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OrdinalSet(u64);

impl OrdinalSet {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    pub(crate) const fn insert(&mut self, ordinal: Ordinal) {
        self.0 |= 1 << ordinal.index();
    }

    /// Check membership.
    #[must_use]
    pub const fn contains(self, ordinal: Ordinal) -> bool {
        self.0 & (1 << ordinal.index()) != 0
    }

    /// Number of ordinals in the set.
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Check emptiness.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the member ordinals in ascending order.
    pub fn iter(self) -> impl Iterator<Item = Ordinal> {
        (0..MAX_ATTRIBUTES as u8)
            .map(Ordinal::new)
            .filter(move |ordinal| self.contains(*ordinal))
    }
}

// =============================================================================
// TYPE DESCRIPTORS
// =============================================================================

/// Runtime descriptor for one of the caller's declared record types.
///
/// Pairs the `TypeId` (identity) with the fully qualified type name (used
/// for the canonical entity type ordering and for diagnostics). The schema
/// stores marks and field metadata only; it never owns or copies instances
/// of the described type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeMark {
    id: TypeId,
    name: &'static str,
}

impl TypeMark {
    /// The mark of a concrete type.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Type identity.
    #[must_use]
    pub const fn id(self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// =============================================================================
// DECLARED ATTRIBUTE TYPES
// =============================================================================

/// A named conformance set: the Relata rendition of an interface bound.
///
/// A capability is declared once, with its implementors registered
/// explicitly. An attribute declared with a capability type accepts any
/// field whose concrete type is a registered implementor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    name: &'static str,
    members: BTreeSet<TypeId>,
}

impl Capability {
    /// A capability with no implementors yet.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            members: BTreeSet::new(),
        }
    }

    /// Register `T` as an implementor.
    #[must_use]
    pub fn implemented_by<T: Send + Sync + 'static>(mut self) -> Self {
        self.members.insert(TypeId::of::<T>());
        self
    }

    /// Whether the marked type is a registered implementor.
    #[must_use]
    pub fn allows(&self, mark: TypeMark) -> bool {
        self.members.contains(&mark.id())
    }

    /// Capability name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// The declared type of an attribute, fixed at its first registration.
///
/// Every later use of the attribute must either match an `Exact` type
/// exactly or satisfy a `Capability`. `Any` accepts every supported field
/// type and is the declared type of the reserved `Self` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType {
    /// The field's concrete type must be exactly this type.
    Exact(TypeMark),
    /// The field's concrete type must be a registered implementor.
    Capability(Capability),
    /// Unconstrained.
    Any,
}

impl DeclaredType {
    /// Shorthand for `Exact(TypeMark::of::<T>())`.
    #[must_use]
    pub fn exact<T: 'static>() -> Self {
        Self::Exact(TypeMark::of::<T>())
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(mark) => write!(f, "{mark}"),
            Self::Capability(capability) => write!(f, "capability {}", capability.name()),
            Self::Any => write!(f, "any"),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised during schema construction.
///
/// Every variant aborts the entire build; no partially constructed schema
/// is ever observable. The owning process is expected to treat any of these
/// as a startup-fatal configuration bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The schema would exceed the fixed attribute maximum.
    #[error("schema {schema}: attribute limit exceeded (max {max}, including Self and Type)")]
    AttributeSpaceExhausted { schema: String, max: usize },

    /// An attribute token was looked up that the schema never registered.
    #[error("unknown attribute {attr} in schema {schema}")]
    UnknownAttribute { schema: String, attr: Attr },

    /// A selector segment does not name a field of the current struct shape.
    #[error("selector {selector:?} of {entity}: {segment:?} is not a field")]
    InvalidSelector {
        entity: TypeMark,
        selector: String,
        segment: String,
    },

    /// A selector tried to traverse through a field that is not a directly
    /// embedded struct member.
    #[error("selector {selector:?} of {entity}: {segment:?} is not an embedded struct member")]
    NotEmbedded {
        entity: TypeMark,
        selector: String,
        segment: String,
    },

    /// The selector resolved to a field whose storage kind the schema does
    /// not support.
    #[error("selector {selector:?} of {entity} has unsupported type {found}")]
    UnsupportedField {
        entity: TypeMark,
        selector: String,
        found: String,
    },

    /// A field's concrete type conflicts with the attribute's fixed type.
    #[error("type mismatch for {attr}: {found} is not {expected}")]
    TypeMismatch {
        attr: Attr,
        expected: String,
        found: String,
    },

    /// A field's concrete type is not a registered implementor of the
    /// attribute's declared capability.
    #[error("type mismatch for {attr}: {found} does not satisfy capability {capability}")]
    CapabilityNotSatisfied {
        attr: Attr,
        capability: &'static str,
        found: String,
    },

    /// The same record type was mapped more than once.
    #[error("duplicate entity type mapping for {entity}")]
    DuplicateEntityType { entity: TypeMark },

    /// A record type was looked up that the schema never registered.
    #[error("unknown entity type {name} in schema {schema}")]
    UnknownEntityType { schema: String, name: &'static str },

    /// Two rules were registered under the same name.
    #[error("duplicate rule {name:?}")]
    DuplicateRule { name: String },
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_display() {
        assert_eq!(Attr::Named("parent-id").to_string(), "parent-id");
        assert_eq!(Attr::Self_.to_string(), "Self");
        assert_eq!(Attr::Type.to_string(), "Type");
    }

    #[test]
    fn ordinal_set_insert_and_contains() {
        let mut set = OrdinalSet::empty();
        assert!(set.is_empty());

        set.insert(Ordinal::new(0));
        set.insert(Ordinal::new(63));

        assert!(set.contains(Ordinal::new(0)));
        assert!(set.contains(Ordinal::new(63)));
        assert!(!set.contains(Ordinal::new(5)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn ordinal_set_iterates_ascending() {
        let mut set = OrdinalSet::empty();
        set.insert(Ordinal::new(7));
        set.insert(Ordinal::new(2));
        set.insert(Ordinal::new(40));

        let members: Vec<usize> = set.iter().map(Ordinal::index).collect();
        assert_eq!(members, vec![2, 7, 40]);
    }

    #[test]
    fn type_mark_identity() {
        assert_eq!(TypeMark::of::<u64>(), TypeMark::of::<u64>());
        assert_ne!(TypeMark::of::<u64>(), TypeMark::of::<i64>());
        assert_eq!(TypeMark::of::<String>().name(), "alloc::string::String");
    }

    #[test]
    fn capability_membership() {
        struct Column;
        struct Index;

        let capability = Capability::new("element")
            .implemented_by::<Column>()
            .implemented_by::<Index>();

        assert!(capability.allows(TypeMark::of::<Column>()));
        assert!(capability.allows(TypeMark::of::<Index>()));
        assert!(!capability.allows(TypeMark::of::<String>()));
    }
}
