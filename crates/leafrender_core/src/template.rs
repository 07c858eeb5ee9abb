//! Template source descriptors submitted for compilation.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A named template body submitted to the module for compilation.
///
/// Identity is `name`; the `components` list names schemas the template's
/// render contexts should be validated against, registered separately via
/// the component side channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSource {
    /// Unique key within one compile batch
    pub name: String,
    /// Template body text
    pub source: String,
    /// Referenced component identifiers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
}

impl TemplateSource {
    /// Create a descriptor with no component references
    #[must_use]
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            components: Vec::new(),
        }
    }

    /// Add a component reference
    #[must_use]
    pub fn with_component(mut self, id: impl Into<String>) -> Self {
        self.components.push(id.into());
        self
    }

    /// Set all component references
    #[must_use]
    pub fn with_components(mut self, ids: Vec<String>) -> Self {
        self.components = ids;
        self
    }
}

/// Validate a compile batch before it crosses the boundary.
///
/// Every name must be non-empty and unique within the batch; the module
/// contract gives no meaning to a batch that violates either.
///
/// # Errors
///
/// Returns error on an empty or repeated template name.
pub fn validate_batch(batch: &[TemplateSource]) -> CoreResult<()> {
    let mut seen = HashSet::with_capacity(batch.len());
    for template in batch {
        if template.name.is_empty() {
            return Err(CoreError::EmptyTemplateName);
        }
        if !seen.insert(template.name.as_str()) {
            return Err(CoreError::DuplicateTemplate {
                name: template.name.clone(),
            });
        }
    }
    Ok(())
}
