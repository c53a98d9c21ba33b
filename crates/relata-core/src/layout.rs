//! # Record Layout Tables
//!
//! Each record type participating in a schema supplies its own field
//! accessor table, once, at declaration. A [`StructLayout`] lists the
//! type's fields by name; every leaf field carries one erased reader bound
//! to a typed projection supplied by the caller, and every embedded struct
//! member carries a projection that selector paths can descend through.
//!
//! This table is the schema's only view of a record type. There is no
//! reflection and no offset arithmetic: if a field is not declared here it
//! does not exist as far as schema construction is concerned.

use crate::types::TypeMark;
use crate::value::EntityRef;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

// =============================================================================
// ERASED READER FORMS
// =============================================================================

pub(crate) type ProjectFn = Arc<dyn for<'a> Fn(&'a dyn Any) -> &'a (dyn Any) + Send + Sync>;
pub(crate) type SignedReadFn = Arc<dyn Fn(&dyn Any) -> Option<i64> + Send + Sync>;
pub(crate) type UnsignedReadFn = Arc<dyn Fn(&dyn Any) -> Option<u64> + Send + Sync>;
pub(crate) type TextReadFn = Arc<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a str> + Send + Sync>;
pub(crate) type RefReadFn = Arc<dyn Fn(&dyn Any) -> Option<EntityRef> + Send + Sync>;

fn expect_owner<O: Any>(owner: &dyn Any) -> &O {
    owner
        .downcast_ref::<O>()
        .expect("field reader invoked on a mismatched record type")
}

// =============================================================================
// WIDENING
// =============================================================================

/// Signed integer field types, widened to `i64` at read time.
pub trait SignedField: Copy + Send + Sync + 'static {
    fn widen(self) -> i64;
}

impl SignedField for i8 {
    fn widen(self) -> i64 {
        i64::from(self)
    }
}

impl SignedField for i16 {
    fn widen(self) -> i64 {
        i64::from(self)
    }
}

impl SignedField for i32 {
    fn widen(self) -> i64 {
        i64::from(self)
    }
}

impl SignedField for i64 {
    fn widen(self) -> i64 {
        self
    }
}

/// Unsigned integer field types, widened to `u64` at read time.
pub trait UnsignedField: Copy + Send + Sync + 'static {
    fn widen(self) -> u64;
}

impl UnsignedField for u8 {
    fn widen(self) -> u64 {
        u64::from(self)
    }
}

impl UnsignedField for u16 {
    fn widen(self) -> u64 {
        u64::from(self)
    }
}

impl UnsignedField for u32 {
    fn widen(self) -> u64 {
        u64::from(self)
    }
}

impl UnsignedField for u64 {
    fn widen(self) -> u64 {
        self
    }
}

// =============================================================================
// LAYOUT NODES
// =============================================================================

/// A record type that can participate in a schema.
///
/// Implementations return a process-lifetime layout table, typically a
/// `LazyLock` static built with [`StructLayout::of`].
pub trait Reflect: Any + Send + Sync {
    fn layout() -> &'static StructLayout;
}

pub(crate) struct FieldSpec {
    pub(crate) name: &'static str,
    pub(crate) shape: FieldShape,
}

#[derive(Clone)]
pub(crate) enum FieldShape {
    /// Terminal field: a supported scalar, text, or reference, or an
    /// `Opaque` placeholder that rejects mapping.
    Leaf(LeafSpec),
    /// Directly embedded struct member; selector paths descend through it.
    Embedded(EmbeddedSpec),
}

#[derive(Clone)]
pub(crate) struct LeafSpec {
    /// Concrete unwrapped type of the field, for declared-type validation.
    pub(crate) concrete: TypeMark,
    pub(crate) kind: LeafKind,
}

#[derive(Clone)]
pub(crate) enum LeafKind {
    Signed { optional: bool, read: SignedReadFn },
    Unsigned { optional: bool, read: UnsignedReadFn },
    Text { optional: bool, read: TextReadFn },
    Reference { read: RefReadFn },
    Opaque,
}

#[derive(Clone)]
pub(crate) struct EmbeddedSpec {
    pub(crate) project: ProjectFn,
    pub(crate) layout: fn() -> &'static StructLayout,
}

/// The declared field table of one struct shape.
pub struct StructLayout {
    mark: TypeMark,
    fields: Vec<FieldSpec>,
}

impl StructLayout {
    /// Start declaring the layout of `O`.
    #[must_use]
    pub fn of<O: Send + Sync + 'static>() -> LayoutBuilder<O> {
        LayoutBuilder {
            mark: TypeMark::of::<O>(),
            fields: Vec::new(),
            _owner: PhantomData,
        }
    }

    /// The mark of the described type.
    #[must_use]
    pub const fn mark(&self) -> TypeMark {
        self.mark
    }

    pub(crate) fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub(crate) fn field_names(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().map(|field| field.name)
    }
}

// =============================================================================
// LAYOUT BUILDER
// =============================================================================

/// Typed declaration API for the layout of record type `O`.
///
/// Every method binds one erased reader over a caller-supplied projection.
/// Readers are pure, retain nothing, and are safe for unbounded concurrent
/// use once the layout is finished.
pub struct LayoutBuilder<O> {
    mark: TypeMark,
    fields: Vec<FieldSpec>,
    _owner: PhantomData<fn(&O)>,
}

impl<O: Send + Sync + 'static> LayoutBuilder<O> {
    fn push(mut self, name: &'static str, shape: FieldShape) -> Self {
        debug_assert!(
            self.fields.iter().all(|field| field.name != name),
            "duplicate field {name:?} in layout for {}",
            self.mark,
        );
        self.fields.push(FieldSpec { name, shape });
        self
    }

    /// A signed integer field.
    #[must_use]
    pub fn signed<T, F>(self, name: &'static str, get: F) -> Self
    where
        T: SignedField,
        F: Fn(&O) -> T + Send + Sync + 'static,
    {
        let read: SignedReadFn = Arc::new(move |owner| Some(get(expect_owner::<O>(owner)).widen()));
        self.leaf::<T>(name, LeafKind::Signed {
            optional: false,
            read,
        })
    }

    /// An optional signed integer field.
    #[must_use]
    pub fn signed_opt<T, F>(self, name: &'static str, get: F) -> Self
    where
        T: SignedField,
        F: Fn(&O) -> Option<T> + Send + Sync + 'static,
    {
        let read: SignedReadFn = Arc::new(move |owner| get(expect_owner::<O>(owner)).map(T::widen));
        self.leaf::<T>(name, LeafKind::Signed {
            optional: true,
            read,
        })
    }

    /// An unsigned integer field.
    #[must_use]
    pub fn unsigned<T, F>(self, name: &'static str, get: F) -> Self
    where
        T: UnsignedField,
        F: Fn(&O) -> T + Send + Sync + 'static,
    {
        let read: UnsignedReadFn =
            Arc::new(move |owner| Some(get(expect_owner::<O>(owner)).widen()));
        self.leaf::<T>(name, LeafKind::Unsigned {
            optional: false,
            read,
        })
    }

    /// An optional unsigned integer field.
    #[must_use]
    pub fn unsigned_opt<T, F>(self, name: &'static str, get: F) -> Self
    where
        T: UnsignedField,
        F: Fn(&O) -> Option<T> + Send + Sync + 'static,
    {
        let read: UnsignedReadFn =
            Arc::new(move |owner| get(expect_owner::<O>(owner)).map(T::widen));
        self.leaf::<T>(name, LeafKind::Unsigned {
            optional: true,
            read,
        })
    }

    /// A text field. Text fields unify on `String` for declared-type checks.
    #[must_use]
    pub fn text<F>(self, name: &'static str, get: F) -> Self
    where
        F: for<'a> Fn(&'a O) -> &'a str + Send + Sync + 'static,
    {
        let read: TextReadFn = Arc::new(move |owner| Some(get(expect_owner::<O>(owner))));
        self.leaf::<String>(name, LeafKind::Text {
            optional: false,
            read,
        })
    }

    /// An optional text field.
    #[must_use]
    pub fn text_opt<F>(self, name: &'static str, get: F) -> Self
    where
        F: for<'a> Fn(&'a O) -> Option<&'a str> + Send + Sync + 'static,
    {
        let read: TextReadFn = Arc::new(move |owner| get(expect_owner::<O>(owner)));
        self.leaf::<String>(name, LeafKind::Text {
            optional: true,
            read,
        })
    }

    /// A reference to another record. References are always behind a shared
    /// pointer wrapper: the schema reads entity memory, it never copies it.
    #[must_use]
    pub fn reference<T, F>(self, name: &'static str, get: F) -> Self
    where
        T: Send + Sync + 'static,
        F: for<'a> Fn(&'a O) -> Option<&'a Arc<T>> + Send + Sync + 'static,
    {
        let read: RefReadFn = Arc::new(move |owner| {
            get(expect_owner::<O>(owner)).map(|target| EntityRef::new(Arc::clone(target)))
        });
        self.leaf::<T>(name, LeafKind::Reference { read })
    }

    /// A directly embedded struct member. Selector paths may descend into
    /// its own layout; it is not itself mappable as a terminal field.
    #[must_use]
    pub fn embedded<C, F>(self, name: &'static str, get: F) -> Self
    where
        C: Reflect,
        F: for<'a> Fn(&'a O) -> &'a C + Send + Sync + 'static,
    {
        let project: ProjectFn =
            Arc::new(move |owner| get(expect_owner::<O>(owner)) as &dyn Any);
        self.push(
            name,
            FieldShape::Embedded(EmbeddedSpec {
                project,
                layout: C::layout,
            }),
        )
    }

    /// A declared but unsupported field (bool, float, collection, ...).
    /// Mapping an attribute to it fails schema construction.
    #[must_use]
    pub fn opaque<T: 'static>(self, name: &'static str) -> Self {
        self.leaf::<T>(name, LeafKind::Opaque)
    }

    fn leaf<T: 'static>(self, name: &'static str, kind: LeafKind) -> Self {
        self.push(
            name,
            FieldShape::Leaf(LeafSpec {
                concrete: TypeMark::of::<T>(),
                kind,
            }),
        )
    }

    /// Finish the declaration.
    #[must_use]
    pub fn finish(self) -> StructLayout {
        StructLayout {
            mark: self.mark,
            fields: self.fields,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Inner {
        label: String,
    }

    impl Reflect for Inner {
        fn layout() -> &'static StructLayout {
            static LAYOUT: std::sync::LazyLock<StructLayout> = std::sync::LazyLock::new(|| {
                StructLayout::of::<Inner>()
                    .text("label", |inner: &Inner| &inner.label)
                    .finish()
            });
            &LAYOUT
        }
    }

    struct Outer {
        id: u64,
        count: Option<i32>,
        inner: Inner,
        active: bool,
    }

    fn outer_layout() -> StructLayout {
        StructLayout::of::<Outer>()
            .unsigned("id", |outer: &Outer| outer.id)
            .signed_opt("count", |outer: &Outer| outer.count)
            .embedded("inner", |outer: &Outer| &outer.inner)
            .opaque::<bool>("active")
            .finish()
    }

    #[test]
    fn layout_field_lookup() {
        let layout = outer_layout();
        assert!(layout.field("id").is_some());
        assert!(layout.field("inner").is_some());
        assert!(layout.field("missing").is_none());
        assert_eq!(layout.mark(), TypeMark::of::<Outer>());
    }

    #[test]
    fn layout_field_names_in_declaration_order() {
        let layout = outer_layout();
        let names: Vec<&str> = layout.field_names().collect();
        assert_eq!(names, vec!["id", "count", "inner", "active"]);
    }

    #[test]
    fn leaf_reader_reads_through_erasure() {
        let layout = outer_layout();
        let outer = Outer {
            id: 9,
            count: None,
            inner: Inner {
                label: "x".to_owned(),
            },
            active: true,
        };

        let value = match layout.field("id").map(|spec| &spec.shape) {
            Some(FieldShape::Leaf(LeafSpec {
                kind: LeafKind::Unsigned { read, .. },
                ..
            })) => read(&outer),
            _ => None,
        };
        assert_eq!(value, Some(9));

        // Opaque fields stay plain struct members; the layout never reads them.
        assert!(outer.active);
    }
}
