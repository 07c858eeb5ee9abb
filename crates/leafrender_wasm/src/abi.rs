//! The boundary ABI: entry points the template module must export.
//!
//! Every entry point takes pointer/length pairs for its inputs; the two
//! operations that produce structured output also take a pointer/capacity
//! pair for the output region and return the number of valid bytes written
//! into it.

use serde::{Deserialize, Serialize};

/// Name of the guest memory export
pub const EXPORT_MEMORY: &str = "memory";

/// Compile entry point: `(in_ptr, in_len, out_ptr, out_cap) -> written`
pub const EXPORT_COMPILE: &str = "compile_templates";

/// Render entry point:
/// `(name_ptr, name_len, ctx_ptr, ctx_len, out_ptr, out_cap) -> written`
pub const EXPORT_RENDER: &str = "render_template";

/// Optional registration side channel:
/// `(id_ptr, id_len, schema_ptr, schema_len) -> status`
pub const EXPORT_REGISTER: &str = "register_component";

/// What an entry point returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnKind {
    /// Number of valid bytes written into the output region
    WrittenLength,
    /// Zero on success, nonzero on failure; no output region
    Status,
}

/// One entry point in the boundary ABI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Export name
    pub name: String,
    /// Number of i32 parameters
    pub params: u32,
    /// Meaning of the i32 return value
    pub returns: ReturnKind,
    /// Whether an instance without this export is usable at all
    pub required: bool,
}

/// The full export surface the host calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryAbi {
    /// ABI version
    pub version: semver::Version,
    /// Entry points, required ones first
    pub entry_points: Vec<EntryPoint>,
}

impl BoundaryAbi {
    /// The current boundary ABI
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: semver::Version::new(0, 1, 0),
            entry_points: vec![
                EntryPoint {
                    name: EXPORT_COMPILE.to_string(),
                    params: 4,
                    returns: ReturnKind::WrittenLength,
                    required: true,
                },
                EntryPoint {
                    name: EXPORT_RENDER.to_string(),
                    params: 6,
                    returns: ReturnKind::WrittenLength,
                    required: true,
                },
                EntryPoint {
                    name: EXPORT_REGISTER.to_string(),
                    params: 4,
                    returns: ReturnKind::Status,
                    required: false,
                },
            ],
        }
    }

    /// Look up an entry point by export name
    #[must_use]
    pub fn entry_point(&self, name: &str) -> Option<&EntryPoint> {
        self.entry_points.iter().find(|e| e.name == name)
    }

    /// Names of the exports an instance cannot do without
    #[must_use]
    pub fn required_exports(&self) -> Vec<&str> {
        self.entry_points
            .iter()
            .filter(|e| e.required)
            .map(|e| e.name.as_str())
            .collect()
    }
}

impl Default for BoundaryAbi {
    fn default() -> Self {
        Self::new()
    }
}

/// ABI errors raised while resolving the module's export surface
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    /// The module does not export a linear memory named `memory`
    #[error("Module does not export '{EXPORT_MEMORY}'")]
    MissingMemory,

    /// A required entry point is absent
    #[error("Module does not export '{0}'")]
    MissingExport(String),

    /// An entry point exists but with the wrong type
    #[error("Export '{name}' has the wrong signature: {cause}")]
    BadSignature {
        /// Export name
        name: String,
        /// Type mismatch detail
        cause: String,
    },
}
