//! Tagged outcomes returned by the module's compile and render entry points.
//!
//! These are first-class return values, not host-side failures: a module
//! that reports a syntax error or an unknown template name does so through
//! these shapes, on the success path of the boundary call that carried them.

use serde::{Deserialize, Serialize};

/// Discriminator for a template syntax failure
pub const COMPILE_ERROR: &str = "CompileError";

/// Discriminator for an unresolved template/component reference
pub const MISSING_DEPENDENCY: &str = "MissingDependency";

/// Discriminator for rendering a name that was never compiled
pub const PARSE_ERROR: &str = "ParseError";

/// Module-reported compile failure detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileFault {
    /// Error discriminator (`CompileError`, `MissingDependency`, ...)
    pub error_type: String,
    /// Human-readable message
    pub message: String,
    /// Names that failed to resolve, when the discriminator is
    /// `MissingDependency`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_dependencies: Option<Vec<String>>,
}

impl CompileFault {
    /// True if this fault reports a syntax failure
    #[must_use]
    pub fn is_compile_error(&self) -> bool {
        self.error_type == COMPILE_ERROR
    }

    /// True if this fault reports unresolved references
    #[must_use]
    pub fn is_missing_dependency(&self) -> bool {
        self.error_type == MISSING_DEPENDENCY
    }

    /// The unresolved names, empty when none were reported
    #[must_use]
    pub fn missing(&self) -> &[String] {
        self.missing_dependencies.as_deref().unwrap_or(&[])
    }
}

/// Outcome of one compile call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CompileOutcome {
    /// Every template in the batch compiled; all are callable by name
    Success,
    /// The batch failed; no template from it may be assumed renderable
    Error {
        /// Failure detail
        error: CompileFault,
    },
}

impl CompileOutcome {
    /// True for the `Success` variant
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The failure detail, if any
    #[must_use]
    pub fn fault(&self) -> Option<&CompileFault> {
        match self {
            Self::Success => None,
            Self::Error { error } => Some(error),
        }
    }
}

/// Module-reported render failure detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderFault {
    /// Error discriminator (`ParseError`, ...)
    pub error_type: String,
    /// Human-readable message
    pub message: String,
}

impl RenderFault {
    /// True if this fault reports an unknown or never-compiled template name
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        self.error_type == PARSE_ERROR
    }
}

/// Outcome of one render call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RenderOutcome {
    /// The template rendered
    Success {
        /// Rendered output text
        result: String,
    },
    /// The module reported a render failure
    Error {
        /// Failure detail
        error: RenderFault,
    },
}

impl RenderOutcome {
    /// True for the `Success` variant
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The rendered text, if any
    #[must_use]
    pub fn result(&self) -> Option<&str> {
        match self {
            Self::Success { result } => Some(result),
            Self::Error { .. } => None,
        }
    }

    /// The failure detail, if any
    #[must_use]
    pub fn fault(&self) -> Option<&RenderFault> {
        match self {
            Self::Success { .. } => None,
            Self::Error { error } => Some(error),
        }
    }
}
