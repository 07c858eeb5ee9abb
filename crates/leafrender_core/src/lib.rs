//! LEAFRENDER Core Types
//!
//! This crate contains pure types and logic with no I/O: the template
//! descriptors, component entries, and tagged call outcomes that cross the
//! host/module boundary as JSON.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod component;
pub mod error;
pub mod outcome;
pub mod template;

// Re-exports
pub use component::ComponentEntry;
pub use error::{CoreError, CoreResult};
pub use outcome::{
    CompileFault, CompileOutcome, RenderFault, RenderOutcome, COMPILE_ERROR, MISSING_DEPENDENCY,
    PARSE_ERROR,
};
pub use template::{validate_batch, TemplateSource};
