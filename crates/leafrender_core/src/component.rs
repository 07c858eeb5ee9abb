//! Component registration entries.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// A named schema registered with the module independently of template
/// compilation.
///
/// The schema document is opaque to the host; the module uses it to validate
/// render contexts for templates that reference the identifier in their
/// `components` list. Entries persist inside the module instance until it is
/// discarded; there is no unregister operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentEntry {
    /// Component identifier, referenced by name from template descriptors
    pub id: String,
    /// Opaque structured schema document
    pub schema: serde_json::Value,
}

impl ComponentEntry {
    /// Create a new component entry
    #[must_use]
    pub fn new(id: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            schema,
        }
    }

    /// Validate the entry before registration
    ///
    /// # Errors
    ///
    /// Returns error if the identifier is empty
    pub fn validate(&self) -> CoreResult<()> {
        if self.id.is_empty() {
            return Err(CoreError::EmptyComponentId);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_component_entry_new() {
        let entry = ComponentEntry::new("user:profile", json!({"type": "object"}));
        assert_eq!(entry.id, "user:profile");
        assert_eq!(entry.schema, json!({"type": "object"}));
    }

    #[test]
    fn test_component_entry_validate_ok() {
        let entry = ComponentEntry::new("c", json!({}));
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_component_entry_validate_empty_id() {
        let entry = ComponentEntry::new("", json!({}));
        assert_eq!(entry.validate(), Err(CoreError::EmptyComponentId));
    }

    #[test]
    fn test_component_entry_roundtrip() {
        let entry = ComponentEntry::new("c", json!({"fields": ["name"]}));
        let json = serde_json::to_string(&entry).unwrap();
        let back: ComponentEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
