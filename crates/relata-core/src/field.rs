//! # Field Classification and Accessors
//!
//! Classifies a resolved field into one of the fixed storage kinds and
//! binds the three accessor forms the rule evaluator extracts facts with:
//!
//! - `value`: the field's value in dynamically typed form, or absent
//! - `comparable_value`: a canonicalized key form for equality and
//!   indexing joins
//! - `inline`: the integer fast path, widened to `u64`, avoiding any
//!   boxing when the evaluator builds dense indexes over id-like attributes
//!
//! All three are composed once, at schema construction, from the selector's
//! projection chain and the leaf reader bound at layout declaration. They
//! are pure reads over caller-owned memory and safe for unbounded
//! concurrent use.

use crate::layout::{FieldShape, LeafKind, ProjectFn};
use crate::selector::ResolvedField;
use crate::types::{Ordinal, SchemaError, TypeMark};
use crate::value::{ComparableValue, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// STORAGE KINDS
// =============================================================================

/// The storage kind of a mapped field. Anything that does not classify into
/// one of these is rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Signed,
    Unsigned,
    Text,
    Reference,
}

type ValueFn = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
type CompareFn = Arc<dyn Fn(&dyn Any) -> Option<ComparableValue> + Send + Sync>;
type InlineFn = Arc<dyn Fn(&dyn Any) -> Option<u64> + Send + Sync>;

// =============================================================================
// FIELD DESCRIPTORS
// =============================================================================

/// One (attribute, selector) mapping on one record type: classification
/// metadata plus the three generated accessors.
pub struct FieldInfo {
    attr: Ordinal,
    path: String,
    concrete: TypeMark,
    kind: StorageKind,
    optional: bool,
    value: ValueFn,
    comparable: CompareFn,
    inline: InlineFn,
}

impl FieldInfo {
    /// The ordinal of the attribute this field backs.
    #[must_use]
    pub const fn attr(&self) -> Ordinal {
        self.attr
    }

    /// The selector path this field was mapped from.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Concrete unwrapped type of the field.
    #[must_use]
    pub const fn concrete_type(&self) -> TypeMark {
        self.concrete
    }

    /// Storage kind.
    #[must_use]
    pub const fn kind(&self) -> StorageKind {
        self.kind
    }

    /// Whether absence is representable (optional scalars and references).
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    /// Read the field's value out of a live record instance.
    ///
    /// The instance must be of the exact record type this descriptor was
    /// generated for; passing anything else is a caller contract violation.
    #[must_use]
    pub fn value(&self, instance: &dyn Any) -> Option<Value> {
        (self.value)(instance)
    }

    /// Read the field's canonicalized comparable form.
    #[must_use]
    pub fn comparable_value(&self, instance: &dyn Any) -> Option<ComparableValue> {
        (self.comparable)(instance)
    }

    /// Read the field as a widened integer, if it is integer-kinded and
    /// present. Text and reference fields always return `None`.
    #[must_use]
    pub fn inline(&self, instance: &dyn Any) -> Option<u64> {
        (self.inline)(instance)
    }

    pub(crate) fn generate(
        entity: TypeMark,
        selector: &str,
        resolved: ResolvedField,
        register: impl FnOnce(TypeMark, StorageKind) -> Result<Ordinal, SchemaError>,
    ) -> Result<Self, SchemaError> {
        let leaf = match resolved.terminal {
            FieldShape::Leaf(leaf) => leaf,
            FieldShape::Embedded(embedded) => {
                // A terminal embedded member would be accessed by value;
                // struct-valued attributes are only supported by reference.
                return Err(unsupported(entity, selector, (embedded.layout)().mark()));
            }
        };
        let kind = match &leaf.kind {
            LeafKind::Signed { .. } => StorageKind::Signed,
            LeafKind::Unsigned { .. } => StorageKind::Unsigned,
            LeafKind::Text { .. } => StorageKind::Text,
            LeafKind::Reference { .. } => StorageKind::Reference,
            LeafKind::Opaque => return Err(unsupported(entity, selector, leaf.concrete)),
        };
        let attr = register(leaf.concrete, kind)?;
        let steps: Arc<[ProjectFn]> = resolved.steps.into();

        let (optional, value, comparable, inline) = match leaf.kind {
            LeafKind::Signed { optional, read } => {
                let value: ValueFn = {
                    let steps = Arc::clone(&steps);
                    let read = Arc::clone(&read);
                    Arc::new(move |instance| read(navigate(&steps, instance)).map(Value::Int))
                };
                let comparable: CompareFn = {
                    let steps = Arc::clone(&steps);
                    let read = Arc::clone(&read);
                    Arc::new(move |instance| {
                        read(navigate(&steps, instance)).map(ComparableValue::Int)
                    })
                };
                let inline: InlineFn = {
                    let steps = Arc::clone(&steps);
                    Arc::new(move |instance| {
                        read(navigate(&steps, instance)).map(|raw| raw as u64)
                    })
                };
                (optional, value, comparable, inline)
            }
            LeafKind::Unsigned { optional, read } => {
                let value: ValueFn = {
                    let steps = Arc::clone(&steps);
                    let read = Arc::clone(&read);
                    Arc::new(move |instance| read(navigate(&steps, instance)).map(Value::Uint))
                };
                let comparable: CompareFn = {
                    let steps = Arc::clone(&steps);
                    let read = Arc::clone(&read);
                    Arc::new(move |instance| {
                        read(navigate(&steps, instance)).map(ComparableValue::Uint)
                    })
                };
                let inline: InlineFn = {
                    let steps = Arc::clone(&steps);
                    Arc::new(move |instance| read(navigate(&steps, instance)))
                };
                (optional, value, comparable, inline)
            }
            LeafKind::Text { optional, read } => {
                let value: ValueFn = {
                    let steps = Arc::clone(&steps);
                    let read = Arc::clone(&read);
                    Arc::new(move |instance| {
                        read(navigate(&steps, instance)).map(|text| Value::Text(text.to_owned()))
                    })
                };
                let comparable: CompareFn = {
                    let steps = Arc::clone(&steps);
                    Arc::new(move |instance| {
                        read(navigate(&steps, instance))
                            .map(|text| ComparableValue::Text(text.to_owned()))
                    })
                };
                let inline: InlineFn = Arc::new(|_| None);
                (optional, value, comparable, inline)
            }
            LeafKind::Reference { read } => {
                let value: ValueFn = {
                    let steps = Arc::clone(&steps);
                    let read = Arc::clone(&read);
                    Arc::new(move |instance| read(navigate(&steps, instance)).map(Value::Entity))
                };
                let comparable: CompareFn = {
                    let steps = Arc::clone(&steps);
                    Arc::new(move |instance| {
                        read(navigate(&steps, instance)).map(ComparableValue::Ref)
                    })
                };
                let inline: InlineFn = Arc::new(|_| None);
                (true, value, comparable, inline)
            }
            LeafKind::Opaque => return Err(unsupported(entity, selector, leaf.concrete)),
        };

        Ok(Self {
            attr,
            path: selector.to_owned(),
            concrete: leaf.concrete,
            kind,
            optional,
            value,
            comparable,
            inline,
        })
    }
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("attr", &self.attr)
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("concrete", &self.concrete)
            .field("optional", &self.optional)
            .finish()
    }
}

fn unsupported(entity: TypeMark, selector: &str, found: TypeMark) -> SchemaError {
    SchemaError::UnsupportedField {
        entity,
        selector: selector.to_owned(),
        found: found.to_string(),
    }
}

fn navigate<'a>(steps: &[ProjectFn], instance: &'a dyn Any) -> &'a dyn Any {
    let mut current = instance;
    for step in steps {
        current = step(current);
    }
    current
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Reflect, StructLayout};
    use crate::selector::resolve;
    use std::sync::LazyLock;

    struct Gauge {
        reading: Option<i32>,
        serial: String,
    }

    impl Reflect for Gauge {
        fn layout() -> &'static StructLayout {
            static LAYOUT: LazyLock<StructLayout> = LazyLock::new(|| {
                StructLayout::of::<Gauge>()
                    .signed_opt("reading", |gauge: &Gauge| gauge.reading)
                    .text("serial", |gauge: &Gauge| &gauge.serial)
                    .finish()
            });
            &LAYOUT
        }
    }

    fn field_for(selector: &str) -> FieldInfo {
        let mark = TypeMark::of::<Gauge>();
        let resolved = resolve(mark, Gauge::layout(), selector).expect("resolve");
        FieldInfo::generate(mark, selector, resolved, |_, _| Ok(Ordinal::new(0)))
            .expect("generate")
    }

    #[test]
    fn optional_signed_absent_and_present() {
        let field = field_for("reading");

        let unset = Gauge {
            reading: None,
            serial: String::new(),
        };
        assert_eq!(field.value(&unset), None);
        assert_eq!(field.inline(&unset), None);

        let set = Gauge {
            reading: Some(7),
            serial: String::new(),
        };
        assert_eq!(field.value(&set), Some(Value::Int(7)));
        assert_eq!(field.inline(&set), Some(7));
        assert!(field.is_optional());
    }

    #[test]
    fn text_field_has_no_inline_form() {
        let field = field_for("serial");
        let gauge = Gauge {
            reading: None,
            serial: "g-01".to_owned(),
        };

        assert_eq!(field.value(&gauge), Some(Value::Text("g-01".to_owned())));
        assert_eq!(
            field.comparable_value(&gauge),
            Some(ComparableValue::Text("g-01".to_owned()))
        );
        assert_eq!(field.inline(&gauge), None);
        assert_eq!(field.kind(), StorageKind::Text);
    }
}
