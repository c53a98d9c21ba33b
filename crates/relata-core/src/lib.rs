//! # relata-core
//!
//! The attribute schema and structural fact-extraction core for Relata -
//! THE SCHEMA.
//!
//! This crate turns a set of statically declared record types and a
//! declared mapping from named attributes to fields on those types into
//! one immutable [`Schema`]:
//!
//! - every attribute gets a dense integer ordinal
//! - every mapped field gets three generated accessors (value, comparable
//!   value, inline integer) bound once at construction
//! - every entity type gets a canonical rank that is a pure function of
//!   the *set* of declared types, independent of registration order
//!
//! The schema is the foundation consumed by a separate rule evaluator that
//! performs dependency analysis for schema-change planning. That evaluator,
//! and the rules it runs, are external collaborators: rule definitions are
//! stored here as opaque named payloads only.
//!
//! ## Architectural Constraints
//!
//! The CORE of the schema layer:
//! - Builds once, early, through an explicit [`SchemaBuilder`] - there is
//!   no global registry and no init-time side effects
//! - Either fully succeeds or fails with a [`SchemaError`]; no partially
//!   built schema is observable
//! - Is immutable after construction and safe for unbounded concurrent
//!   reads; accessors are pure, never block, and perform no I/O
//! - Never owns or copies entity memory; accessors read through
//!   caller-supplied references only
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod builder;
pub mod entity;
pub mod field;
pub mod layout;
pub mod rules;
pub mod schema;
mod selector;
pub mod types;
pub mod value;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Attr, Capability, DeclaredType, MAX_ATTRIBUTES, Ordinal, OrdinalSet, SchemaError, TypeMark,
};

// =============================================================================
// RE-EXPORTS: Schema Construction
// =============================================================================

pub use builder::{EntityMapping, SchemaBuilder};
pub use layout::{LayoutBuilder, Reflect, SignedField, StructLayout, UnsignedField};

// =============================================================================
// RE-EXPORTS: The Frozen Schema
// =============================================================================

pub use entity::EntityTypeSchema;
pub use field::{FieldInfo, StorageKind};
pub use rules::RuleDef;
pub use schema::Schema;
pub use value::{ComparableValue, EntityRef, Value};
