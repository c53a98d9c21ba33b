//! # Schema Construction
//!
//! The explicit, consumed-once builder that turns configuration into a
//! frozen [`Schema`]. Construction is single-threaded and fail-fast: any
//! invariant violation aborts the whole build and no partially constructed
//! schema is observable.
//!
//! Registration order of attributes:
//! 1. explicit declarations, in call order (authoritative for later uses)
//! 2. implicit first uses from entity mappings, in mapping order
//! 3. the reserved `Self` and `Type` attributes, which therefore always
//!    take the highest ordinals
//!
//! Entity types are then sorted into a canonical order and re-ranked, so
//! ranks depend only on the set of declared types, never on the order the
//! configuration happened to register them in.

use crate::entity::EntityTypeSchema;
use crate::field::{FieldInfo, StorageKind};
use crate::layout::{Reflect, StructLayout};
use crate::rules::RuleDef;
use crate::schema::Schema;
use crate::selector;
use crate::types::{Attr, DeclaredType, MAX_ATTRIBUTES, Ordinal, OrdinalSet, SchemaError, TypeMark};
use std::any::Any;
use std::collections::BTreeMap;

// =============================================================================
// CONFIGURATION SURFACE
// =============================================================================

/// The attribute-to-selector mappings of one record type.
///
/// Registering the same attribute against several selectors is allowed and
/// groups all of them under that attribute's ordinal.
#[derive(Default)]
pub struct EntityMapping {
    pairs: Vec<(Attr, String)>,
}

impl EntityMapping {
    /// An empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `attr` to one selector path.
    #[must_use]
    pub fn field(mut self, attr: Attr, selector: &str) -> Self {
        self.pairs.push((attr, selector.to_owned()));
        self
    }

    /// Map `attr` to several selector paths at once.
    #[must_use]
    pub fn fields(mut self, attr: Attr, selectors: &[&str]) -> Self {
        for selector in selectors {
            self.pairs.push((attr, (*selector).to_owned()));
        }
        self
    }
}

struct TypeMapping {
    mark: TypeMark,
    layout: &'static StructLayout,
    pairs: Vec<(Attr, String)>,
}

/// Builder for a [`Schema`]. Thread it through configuration, then consume
/// it exactly once with [`SchemaBuilder::build`].
pub struct SchemaBuilder {
    name: String,
    declared: Vec<(Attr, DeclaredType)>,
    mappings: Vec<TypeMapping>,
    rules: Vec<RuleDef>,
}

impl SchemaBuilder {
    /// Start a schema. The name only appears in error messages.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared: Vec::new(),
            mappings: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Declare an attribute's type explicitly. Declarations are applied
    /// before any entity mapping, regardless of call interleaving, so a
    /// declared type is always authoritative for later uses.
    #[must_use]
    pub fn attr(mut self, attr: Attr, declared: DeclaredType) -> Self {
        self.declared.push((attr, declared));
        self
    }

    /// Register the attribute mappings of record type `T`.
    #[must_use]
    pub fn entity<T: Reflect>(mut self, mapping: EntityMapping) -> Self {
        self.mappings.push(TypeMapping {
            mark: TypeMark::of::<T>(),
            layout: T::layout(),
            pairs: mapping.pairs,
        });
        self
    }

    /// Attach a named rule definition. Content is opaque to the schema.
    #[must_use]
    pub fn rule(mut self, name: impl Into<String>, payload: impl Any + Send + Sync) -> Self {
        self.rules.push(RuleDef::new(name, payload));
        self
    }

    /// Build the schema, or report the first configuration error.
    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut assembler = Assembler::new(self.name);

        for (attr, declared) in self.declared {
            assembler.register_attr(attr, declared)?;
        }
        for mapping in self.mappings {
            assembler.register_entity(mapping)?;
        }

        let self_ordinal = assembler.register_attr(Attr::Self_, DeclaredType::Any)?;
        let type_ordinal = assembler.register_attr(Attr::Type, DeclaredType::exact::<TypeMark>())?;

        assembler.assign_canonical_ranks();

        let mut rules = BTreeMap::new();
        for rule in self.rules {
            if rules.contains_key(rule.name()) {
                return Err(SchemaError::DuplicateRule {
                    name: rule.name().to_owned(),
                });
            }
            rules.insert(rule.name().to_owned(), rule);
        }

        Ok(assembler.freeze(self_ordinal, type_ordinal, rules))
    }

    /// Build the schema, treating any configuration error as fatal. For
    /// callers that run construction once at startup and cannot proceed
    /// without it.
    #[must_use]
    pub fn must_build(self) -> Schema {
        self.build().expect("schema construction failed")
    }
}

// =============================================================================
// ASSEMBLY
// =============================================================================

struct Assembler {
    name: String,
    attrs: Vec<Attr>,
    attr_types: Vec<DeclaredType>,
    ordinals: BTreeMap<Attr, Ordinal>,
    text_attrs: OrdinalSet,
    entities: Vec<(EntityTypeSchema, &'static StructLayout)>,
}

impl Assembler {
    fn new(name: String) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            attr_types: Vec::new(),
            ordinals: BTreeMap::new(),
            text_attrs: OrdinalSet::empty(),
            entities: Vec::new(),
        }
    }

    /// Register an attribute with an explicit declared type, or validate a
    /// redeclaration against the fixed one.
    fn register_attr(&mut self, attr: Attr, declared: DeclaredType) -> Result<Ordinal, SchemaError> {
        if let Some(&ordinal) = self.ordinals.get(&attr) {
            let fixed = &self.attr_types[ordinal.index()];
            if *fixed != declared {
                return Err(SchemaError::TypeMismatch {
                    attr,
                    expected: fixed.to_string(),
                    found: declared.to_string(),
                });
            }
            return Ok(ordinal);
        }
        self.mint(attr, declared)
    }

    /// Register a use of an attribute by a concrete field. The first use
    /// fixes the attribute's type; later uses must match it exactly or
    /// satisfy its capability.
    fn register_use(
        &mut self,
        attr: Attr,
        concrete: TypeMark,
        kind: StorageKind,
    ) -> Result<Ordinal, SchemaError> {
        let ordinal = match self.ordinals.get(&attr) {
            Some(&ordinal) => {
                match &self.attr_types[ordinal.index()] {
                    DeclaredType::Any => {}
                    DeclaredType::Exact(fixed) if *fixed == concrete => {}
                    DeclaredType::Exact(fixed) => {
                        return Err(SchemaError::TypeMismatch {
                            attr,
                            expected: fixed.to_string(),
                            found: concrete.to_string(),
                        });
                    }
                    DeclaredType::Capability(capability) if capability.allows(concrete) => {}
                    DeclaredType::Capability(capability) => {
                        return Err(SchemaError::CapabilityNotSatisfied {
                            attr,
                            capability: capability.name(),
                            found: concrete.to_string(),
                        });
                    }
                }
                ordinal
            }
            None => self.mint(attr, DeclaredType::Exact(concrete))?,
        };
        if kind == StorageKind::Text {
            self.text_attrs.insert(ordinal);
        }
        Ok(ordinal)
    }

    fn mint(&mut self, attr: Attr, declared: DeclaredType) -> Result<Ordinal, SchemaError> {
        if self.attrs.len() >= MAX_ATTRIBUTES {
            return Err(SchemaError::AttributeSpaceExhausted {
                schema: self.name.clone(),
                max: MAX_ATTRIBUTES,
            });
        }
        let ordinal = Ordinal::new(self.attrs.len() as u8);
        self.attrs.push(attr);
        self.attr_types.push(declared);
        self.ordinals.insert(attr, ordinal);
        Ok(ordinal)
    }

    fn register_entity(&mut self, mapping: TypeMapping) -> Result<(), SchemaError> {
        if self
            .entities
            .iter()
            .any(|(existing, _)| existing.mark().id() == mapping.mark.id())
        {
            return Err(SchemaError::DuplicateEntityType {
                entity: mapping.mark,
            });
        }

        let mut fields = Vec::with_capacity(mapping.pairs.len());
        for (attr, path) in &mapping.pairs {
            let resolved = selector::resolve(mapping.mark, mapping.layout, path)?;
            let info = FieldInfo::generate(mapping.mark, path, resolved, |concrete, kind| {
                self.register_use(*attr, concrete, kind)
            })?;
            fields.push(info);
        }

        self.entities
            .push((EntityTypeSchema::new(mapping.mark, fields), mapping.layout));
        Ok(())
    }

    /// Sort entity types into the canonical total order and reassign dense
    /// ranks. Primary key: fully qualified type name. Tiebreak: the
    /// layout's field-name sequence. Residual ties keep registration order
    /// (stable sort).
    fn assign_canonical_ranks(&mut self) {
        self.entities.sort_by(|(a, a_layout), (b, b_layout)| {
            a.mark()
                .name()
                .cmp(b.mark().name())
                .then_with(|| a_layout.field_names().cmp(b_layout.field_names()))
        });
        for (rank, (entity, _)) in self.entities.iter_mut().enumerate() {
            entity.set_rank(rank);
        }
    }

    fn freeze(
        self,
        self_ordinal: Ordinal,
        type_ordinal: Ordinal,
        rules: BTreeMap<String, RuleDef>,
    ) -> Schema {
        let entity_types: Vec<EntityTypeSchema> = self
            .entities
            .into_iter()
            .map(|(entity, _)| entity)
            .collect();
        let by_type = entity_types
            .iter()
            .enumerate()
            .map(|(index, entity)| (entity.mark().id(), index))
            .collect();

        Schema {
            name: self.name,
            attrs: self.attrs,
            attr_types: self.attr_types,
            ordinals: self.ordinals,
            entity_types,
            by_type,
            self_ordinal,
            type_ordinal,
            text_attrs: self.text_attrs,
            rules,
        }
    }
}
