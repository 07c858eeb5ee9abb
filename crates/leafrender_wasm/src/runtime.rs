//! Engine configuration and module loading.

use std::hash::{Hash, Hasher};
use wasmtime::{Config, Engine, Module, Strategy};

/// Default maximum memory pages (64 KiB per page)
const DEFAULT_MAX_MEMORY_PAGES: u64 = 1024; // 64 MiB

/// Default output-region capacity for one call, in bytes.
///
/// Every call allocates a fresh output region of this size before invoking
/// the module; a reported result longer than this is a boundary failure.
const DEFAULT_OUTPUT_CAPACITY: u32 = 4096;

/// Configuration for the host runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum pages guest memory may grow to
    pub max_memory_pages: u64,
    /// Capacity of the per-call output region in bytes
    pub output_capacity: u32,
    /// Enable debug info in compiled modules
    pub debug_info: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_memory_pages: DEFAULT_MAX_MEMORY_PAGES,
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
            debug_info: false,
        }
    }
}

impl RuntimeConfig {
    /// Set the guest memory page budget
    #[must_use]
    pub fn with_max_memory_pages(mut self, pages: u64) -> Self {
        self.max_memory_pages = pages;
        self
    }

    /// Set the per-call output capacity
    #[must_use]
    pub fn with_output_capacity(mut self, bytes: u32) -> Self {
        self.output_capacity = bytes;
        self
    }

    /// Enable or disable debug info
    #[must_use]
    pub fn with_debug_info(mut self, enabled: bool) -> Self {
        self.debug_info = enabled;
        self
    }

    /// Create a Wasmtime config from this configuration
    fn to_wasmtime_config(&self) -> Config {
        let mut config = Config::new();
        config.debug_info(self.debug_info);
        config.strategy(Strategy::Cranelift);
        config
    }
}

/// Runtime errors raised while building the engine or loading modules
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// Engine construction failed
    #[error("Failed to create WASM engine: {0}")]
    Engine(String),

    /// Module bytes were rejected
    #[error("Failed to load module '{module}': {cause}")]
    Load {
        /// Module name
        module: String,
        /// Underlying failure
        cause: String,
    },
}

/// A loaded module ready for instantiation
#[derive(Debug)]
pub struct CompiledModule {
    /// The compiled Wasmtime module
    module: Module,
    /// Name given at load time
    name: String,
    /// Content hash of the original bytes
    hash: u64,
}

impl CompiledModule {
    /// The underlying Wasmtime module
    #[must_use]
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Name given at load time
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Content hash of the original bytes
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.hash
    }
}

/// Host runtime holding the Wasmtime engine
pub struct Runtime {
    /// The Wasmtime engine (thread-safe, shareable)
    engine: Engine,
    /// Configuration for this runtime
    config: RuntimeConfig,
}

impl Runtime {
    /// Create a runtime with the given configuration
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot be built
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        let engine = Engine::new(&config.to_wasmtime_config())
            .map_err(|e| RuntimeError::Engine(e.to_string()))?;
        Ok(Self { engine, config })
    }

    /// Create a runtime with default configuration
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot be built
    pub fn with_defaults() -> Result<Self, RuntimeError> {
        Self::new(RuntimeConfig::default())
    }

    /// The Wasmtime engine
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The runtime configuration
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Compile wasm bytes into a module
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a valid module
    pub fn load(&self, name: &str, wasm_bytes: &[u8]) -> Result<CompiledModule, RuntimeError> {
        let module = Module::new(&self.engine, wasm_bytes).map_err(|e| RuntimeError::Load {
            module: name.to_string(),
            cause: e.to_string(),
        })?;

        Ok(CompiledModule {
            module,
            name: name.to_string(),
            hash: hash_bytes(wasm_bytes),
        })
    }
}

/// Content hash for module identity (not cryptographic)
fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}
