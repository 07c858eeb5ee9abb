//! The call facade: compile, render, and the registration side channel.
//!
//! A [`Renderer`] owns one module instance, its exported memory, and the
//! bump allocator over that memory. Every operation takes `&mut self`, so
//! at most one boundary call can be in flight per instance; dropping the
//! renderer discards the instance and its registry state.

use crate::abi::{
    AbiError, BoundaryAbi, EXPORT_COMPILE, EXPORT_MEMORY, EXPORT_REGISTER, EXPORT_RENDER,
};
use crate::host::{build_linker, HostState};
use crate::marshal::{self, MarshalError};
use crate::memory::{BumpAlloc, GuestPtr, MemoryError};
use crate::runtime::{CompiledModule, Runtime};
use leafrender_core::{
    validate_batch, CompileOutcome, ComponentEntry, CoreError, RenderOutcome, TemplateSource,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasmtime::{Instance, Memory, Store, TypedFunc};

/// Boundary-call failures.
///
/// These are disjoint from module-reported `Error` outcomes: a
/// [`CompileOutcome`] or [`RenderOutcome`] carrying an error is a legitimate
/// return value, while a `HostError` means the call itself could not be
/// completed (bad input, marshalling defect, linkage problem, or a trap).
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Input rejected before anything crossed the boundary
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] CoreError),

    /// Allocation or growth failure
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// Encode/decode failure, including undersized output regions
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// The module's export surface does not match the boundary ABI
    #[error(transparent)]
    Abi(#[from] AbiError),

    /// Module instantiation failed
    #[error("Failed to instantiate module '{module}': {cause}")]
    Instantiate {
        /// Module name
        module: String,
        /// Underlying failure
        cause: String,
    },

    /// The module trapped mid-call; the instance remains usable
    #[error("Module trap in '{entry_point}': {cause}")]
    Trap {
        /// Entry point that trapped
        entry_point: String,
        /// Trap detail
        cause: String,
    },

    /// The registration side channel reported a nonzero status
    #[error("Component registration failed with status {status}")]
    RegisterFailed {
        /// Status code the module returned
        status: i32,
    },
}

/// Handle to one live template-module instance.
///
/// Construction instantiates the module and resolves its export surface;
/// after that the instance is ready and stays ready across any number of
/// calls. A trap fails its own call only.
pub struct Renderer {
    abi: BoundaryAbi,
    store: Store<HostState>,
    memory: Memory,
    alloc: BumpAlloc,
    compile_fn: TypedFunc<(u32, u32, u32, u32), u32>,
    render_fn: TypedFunc<(u32, u32, u32, u32, u32, u32), u32>,
    register_fn: Option<TypedFunc<(u32, u32, u32, u32), i32>>,
    output_capacity: u32,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("abi", &self.abi)
            .field("alloc", &self.alloc)
            .field("has_register_fn", &self.register_fn.is_some())
            .field("output_capacity", &self.output_capacity)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Instantiate a loaded module and resolve the boundary entry points.
    ///
    /// # Errors
    ///
    /// Returns error if instantiation fails or a required export is missing
    /// or ill-typed.
    pub fn new(runtime: &Runtime, module: &CompiledModule) -> Result<Self, HostError> {
        let linker = build_linker(runtime.engine()).map_err(|e| HostError::Instantiate {
            module: module.name().to_string(),
            cause: e.to_string(),
        })?;

        let mut store = Store::new(runtime.engine(), HostState::new(module.name()));
        let instance =
            linker
                .instantiate(&mut store, module.module())
                .map_err(|e| HostError::Instantiate {
                    module: module.name().to_string(),
                    cause: e.to_string(),
                })?;

        let memory = instance
            .get_memory(&mut store, EXPORT_MEMORY)
            .ok_or(AbiError::MissingMemory)?;

        let abi = BoundaryAbi::new();
        for name in abi.required_exports() {
            if instance.get_func(&mut store, name).is_none() {
                return Err(AbiError::MissingExport(name.to_string()).into());
            }
        }

        let compile_fn = resolve_typed(&instance, &mut store, EXPORT_COMPILE)?;
        let render_fn = resolve_typed(&instance, &mut store, EXPORT_RENDER)?;
        let register_fn = match instance.get_func(&mut store, EXPORT_REGISTER) {
            Some(_) => Some(resolve_typed(&instance, &mut store, EXPORT_REGISTER)?),
            None => None,
        };

        tracing::debug!(
            module = module.name(),
            hash = module.hash(),
            abi_version = %abi.version,
            has_register = register_fn.is_some(),
            "template module instantiated"
        );

        Ok(Self {
            abi,
            store,
            memory,
            alloc: BumpAlloc::new(runtime.config().max_memory_pages),
            compile_fn,
            render_fn,
            register_fn,
            output_capacity: runtime.config().output_capacity,
        })
    }

    /// The boundary ABI this renderer resolved its exports against
    #[must_use]
    pub fn abi(&self) -> &BoundaryAbi {
        &self.abi
    }

    /// Capacity of the output region allocated for each call
    #[must_use]
    pub fn output_capacity(&self) -> u32 {
        self.output_capacity
    }

    /// True if the module exposes the registration side channel
    #[must_use]
    pub fn supports_components(&self) -> bool {
        self.register_fn.is_some()
    }

    /// Submit a batch of templates for compilation.
    ///
    /// On `Success` every template in the batch is callable by name. On an
    /// `Error` outcome, no template from the batch may be assumed
    /// renderable; whether independently valid templates survived is module
    /// behavior this boundary does not define.
    ///
    /// # Errors
    ///
    /// Returns error on invalid batches and boundary failures; module-level
    /// compile failures come back as the `Error` outcome, not as `Err`.
    pub fn compile_templates(
        &mut self,
        batch: &[TemplateSource],
    ) -> Result<CompileOutcome, HostError> {
        validate_batch(batch)?;

        let input = marshal::write_json(&mut self.store, &self.memory, &mut self.alloc, &batch)?;
        let out = self.alloc_output()?;

        let written = self
            .compile_fn
            .call(
                &mut self.store,
                (input.offset, input.len, out.offset, out.len),
            )
            .map_err(|e| trap(EXPORT_COMPILE, &e))?;

        self.read_outcome(out, written)
    }

    /// Render a compiled template against a JSON-serializable context.
    ///
    /// Rendering a name that never compiled successfully yields the
    /// module's typed `ParseError` outcome, never a trap.
    ///
    /// # Errors
    ///
    /// Returns error on boundary failures only.
    pub fn render_template<C: Serialize>(
        &mut self,
        name: &str,
        context: &C,
    ) -> Result<RenderOutcome, HostError> {
        let name_ptr = marshal::write_str(&mut self.store, &self.memory, &mut self.alloc, name)?;
        let ctx_ptr = marshal::write_json(&mut self.store, &self.memory, &mut self.alloc, context)?;
        let out = self.alloc_output()?;

        let written = self
            .render_fn
            .call(
                &mut self.store,
                (
                    name_ptr.offset,
                    name_ptr.len,
                    ctx_ptr.offset,
                    ctx_ptr.len,
                    out.offset,
                    out.len,
                ),
            )
            .map_err(|e| trap(EXPORT_RENDER, &e))?;

        self.read_outcome(out, written)
    }

    /// Register a named schema with the module.
    ///
    /// Must precede any compile call whose templates reference the
    /// identifier, or that compile reports `MissingDependency`. Entries
    /// persist until the renderer is dropped; there is no unregister.
    ///
    /// # Errors
    ///
    /// Returns error if the module lacks the side channel, the entry is
    /// invalid, or the module reports a nonzero status.
    pub fn register_component(&mut self, entry: &ComponentEntry) -> Result<(), HostError> {
        entry.validate()?;

        let register_fn = self
            .register_fn
            .clone()
            .ok_or_else(|| AbiError::MissingExport(EXPORT_REGISTER.to_string()))?;

        let id_ptr =
            marshal::write_str(&mut self.store, &self.memory, &mut self.alloc, &entry.id)?;
        let schema_ptr =
            marshal::write_json(&mut self.store, &self.memory, &mut self.alloc, &entry.schema)?;

        let status = register_fn
            .call(
                &mut self.store,
                (id_ptr.offset, id_ptr.len, schema_ptr.offset, schema_ptr.len),
            )
            .map_err(|e| trap(EXPORT_REGISTER, &e))?;

        if status != 0 {
            return Err(HostError::RegisterFailed { status });
        }
        Ok(())
    }

    /// Allocate a fresh fixed-capacity output region for one call
    fn alloc_output(&mut self) -> Result<GuestPtr, HostError> {
        let offset = self
            .alloc
            .alloc(&mut self.store, &self.memory, self.output_capacity)?;
        Ok(GuestPtr::new(offset, self.output_capacity))
    }

    /// Interpret the returned length and decode the output region
    fn read_outcome<T: DeserializeOwned>(
        &mut self,
        out: GuestPtr,
        written: u32,
    ) -> Result<T, HostError> {
        if written > out.len {
            return Err(MarshalError::OutputOverflow {
                written,
                capacity: out.len,
            }
            .into());
        }
        let outcome = marshal::read_json(
            &self.store,
            &self.memory,
            GuestPtr::new(out.offset, written),
        )?;
        Ok(outcome)
    }
}

/// Map a wasmtime call failure into a per-entry-point trap error
fn trap(entry_point: &str, err: &wasmtime::Error) -> HostError {
    HostError::Trap {
        entry_point: entry_point.to_string(),
        cause: format!("{err:#}"),
    }
}

/// Resolve an export as a typed function.
///
/// Presence has already been checked against the ABI table, so any failure
/// here is a signature mismatch.
fn resolve_typed<P, R>(
    instance: &Instance,
    store: &mut Store<HostState>,
    name: &str,
) -> Result<TypedFunc<P, R>, AbiError>
where
    P: wasmtime::WasmParams,
    R: wasmtime::WasmResults,
{
    instance
        .get_typed_func(&mut *store, name)
        .map_err(|e| AbiError::BadSignature {
            name: name.to_string(),
            cause: e.to_string(),
        })
}
