//! # Selector Resolution
//!
//! Walks a dotted field path against a record type's layout table. Every
//! non-terminal segment must name an embedded struct member (its projection
//! is composed into the access chain); the terminal segment names the field
//! the attribute maps to. Traversal never crosses a reference: selector
//! paths stay within directly nested value-typed struct members.

use crate::layout::{FieldShape, ProjectFn, StructLayout};
use crate::types::{SchemaError, TypeMark};

/// A resolved selector: the projection chain down to the terminal field's
/// owner, plus the terminal field's declared shape.
pub(crate) struct ResolvedField {
    pub(crate) steps: Vec<ProjectFn>,
    pub(crate) terminal: FieldShape,
}

pub(crate) fn resolve(
    entity: TypeMark,
    layout: &'static StructLayout,
    selector: &str,
) -> Result<ResolvedField, SchemaError> {
    let segments: Vec<&str> = selector.split('.').collect();
    let mut steps = Vec::new();
    let mut current = layout;

    for (index, segment) in segments.iter().copied().enumerate() {
        let Some(spec) = current.field(segment) else {
            return Err(SchemaError::InvalidSelector {
                entity,
                selector: selector.to_owned(),
                segment: segment.to_owned(),
            });
        };
        if index + 1 == segments.len() {
            return Ok(ResolvedField {
                steps,
                terminal: spec.shape.clone(),
            });
        }
        match &spec.shape {
            FieldShape::Embedded(embedded) => {
                steps.push(embedded.project.clone());
                current = (embedded.layout)();
            }
            FieldShape::Leaf(_) => {
                return Err(SchemaError::NotEmbedded {
                    entity,
                    selector: selector.to_owned(),
                    segment: segment.to_owned(),
                });
            }
        }
    }

    // split('.') always yields at least one segment, so the loop returns.
    Err(SchemaError::InvalidSelector {
        entity,
        selector: selector.to_owned(),
        segment: String::new(),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Reflect;
    use std::sync::LazyLock;

    struct Header {
        name: String,
        version: u32,
    }

    impl Reflect for Header {
        fn layout() -> &'static StructLayout {
            static LAYOUT: LazyLock<StructLayout> = LazyLock::new(|| {
                StructLayout::of::<Header>()
                    .text("name", |header: &Header| &header.name)
                    .unsigned("version", |header: &Header| header.version)
                    .finish()
            });
            &LAYOUT
        }
    }

    struct Record {
        id: u64,
        header: Header,
    }

    impl Reflect for Record {
        fn layout() -> &'static StructLayout {
            static LAYOUT: LazyLock<StructLayout> = LazyLock::new(|| {
                StructLayout::of::<Record>()
                    .unsigned("id", |record: &Record| record.id)
                    .embedded("header", |record: &Record| &record.header)
                    .finish()
            });
            &LAYOUT
        }
    }

    fn mark() -> TypeMark {
        TypeMark::of::<Record>()
    }

    #[test]
    fn resolves_top_level_field() {
        let resolved = resolve(mark(), Record::layout(), "id").expect("resolve");
        assert!(resolved.steps.is_empty());
    }

    #[test]
    fn resolves_nested_field_with_one_step() {
        let resolved = resolve(mark(), Record::layout(), "header.name").expect("resolve");
        assert_eq!(resolved.steps.len(), 1);
    }

    #[test]
    fn missing_segment_is_invalid() {
        let err = resolve(mark(), Record::layout(), "header.missing");
        assert!(matches!(
            err,
            Err(SchemaError::InvalidSelector { ref segment, .. }) if segment == "missing"
        ));
    }

    #[test]
    fn traversal_through_leaf_is_rejected() {
        let err = resolve(mark(), Record::layout(), "id.anything");
        assert!(matches!(
            err,
            Err(SchemaError::NotEmbedded { ref segment, .. }) if segment == "id"
        ));
    }

    #[test]
    fn empty_selector_is_invalid() {
        let err = resolve(mark(), Record::layout(), "");
        assert!(matches!(err, Err(SchemaError::InvalidSelector { .. })));
    }
}
