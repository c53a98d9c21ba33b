//! # Rule Registry
//!
//! Named rule definitions attached to a schema at configuration time. Rule
//! content is opaque to this crate: the registry stores and retrieves it,
//! the external rule evaluator interprets it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A named rule definition with an opaque payload.
#[derive(Clone)]
pub struct RuleDef {
    name: String,
    payload: Arc<dyn Any + Send + Sync>,
}

impl RuleDef {
    /// Wrap a payload under a rule name.
    #[must_use]
    pub fn new(name: impl Into<String>, payload: impl Any + Send + Sync) -> Self {
        Self {
            name: name.into(),
            payload: Arc::new(payload),
        }
    }

    /// The rule's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The payload, if it is a `T`.
    #[must_use]
    pub fn payload<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for RuleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDef").field("name", &self.name).finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_roundtrip_by_type() {
        let rule = RuleDef::new("column-depends-on-index", vec![1u32, 2, 3]);

        assert_eq!(rule.name(), "column-depends-on-index");
        assert_eq!(rule.payload::<Vec<u32>>(), Some(&vec![1, 2, 3]));
        assert_eq!(rule.payload::<String>(), None);
    }
}
