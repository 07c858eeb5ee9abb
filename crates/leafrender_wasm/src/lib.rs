//! LEAFRENDER WASM Host Boundary
//!
//! Host-side calling convention for a sandboxed template module: linear
//! memory allocation, string/JSON marshalling, and the compile/render call
//! facade. The template engine itself lives inside the module and is opaque;
//! only the boundary protocol is implemented here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abi;
pub mod host;
pub mod marshal;
pub mod memory;
pub mod renderer;
pub mod runtime;

pub use abi::{AbiError, BoundaryAbi, EntryPoint, ReturnKind};
pub use host::{build_linker, HostState};
pub use marshal::MarshalError;
pub use memory::{BumpAlloc, GuestPtr, MemoryError, HEAP_BASE, PAGE_SIZE};
pub use renderer::{HostError, Renderer};
pub use runtime::{CompiledModule, Runtime, RuntimeConfig, RuntimeError};
