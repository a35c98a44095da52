//! Runtime core: engine configuration and module compilation.

use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};
use wasmtime::{Config, Engine, Module, ResourceLimiter};

use crate::error::{HostError, HostResult};
use crate::instance::PluginInstance;

/// Hard ceilings applied to every guest instance through wasmtime's
/// resource limiter, so a runaway guest allocation fails its own call
/// instead of exhausting the host.
#[derive(Debug, Clone, Copy)]
pub struct MemoryLimits {
    /// Maximum linear memory in bytes.
    pub max_memory_bytes: usize,
    /// Maximum table elements.
    pub max_table_elements: usize,
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self {
            max_memory_bytes: 16 * 1024 * 1024, // 16MB
            max_table_elements: 10_000,
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Per-instance resource ceilings.
    pub limits: MemoryLimits,
    /// Attempt `memory.grow` when an encoded argument does not fit in the
    /// guest's current memory. Off by default: growth is a mitigation the
    /// protocol permits, not something it requires.
    pub grow_memory_on_demand: bool,
    /// Emit wasm debug info.
    pub debug_info: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            limits: MemoryLimits::default(),
            grow_memory_on_demand: false,
            debug_info: false,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, limits: MemoryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_memory_growth(mut self, grow: bool) -> Self {
        self.grow_memory_on_demand = grow;
        self
    }

    fn to_wasmtime_config(&self) -> Config {
        let mut config = Config::new();
        config.debug_info(self.debug_info);
        config
    }
}

/// Store data carried by every instance's wasmtime store.
#[derive(Debug)]
pub(crate) struct StoreData {
    pub(crate) limiter: StoreLimiter,
}

impl StoreData {
    pub(crate) fn new(limits: MemoryLimits) -> Self {
        Self {
            limiter: StoreLimiter { limits },
        }
    }
}

#[derive(Debug)]
pub(crate) struct StoreLimiter {
    limits: MemoryLimits,
}

impl ResourceLimiter for StoreLimiter {
    fn memory_growing(
        &mut self,
        _current: usize,
        desired: usize,
        maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        let cap = maximum.map_or(self.limits.max_memory_bytes, |max| {
            max.min(self.limits.max_memory_bytes)
        });
        Ok(desired <= cap)
    }

    fn table_growing(
        &mut self,
        _current: usize,
        desired: usize,
        maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        let cap = maximum.map_or(self.limits.max_table_elements, |max| {
            max.min(self.limits.max_table_elements)
        });
        Ok(desired <= cap)
    }
}

/// A compiled guest module plus its inferred name.
#[derive(Debug)]
pub struct PluginModule {
    pub(crate) name: String,
    pub(crate) module: Module,
}

impl PluginModule {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The host runtime: one wasmtime engine and the configuration every
/// instance created from it inherits.
pub struct WasmRuntime {
    engine: Engine,
    config: RuntimeConfig,
}

impl WasmRuntime {
    pub fn new(config: RuntimeConfig) -> HostResult<Self> {
        let engine = Engine::new(&config.to_wasmtime_config())
            .map_err(|e| HostError::Internal(format!("failed to create engine: {e}")))?;
        info!("wasm runtime created");
        Ok(Self { engine, config })
    }

    /// Runtime with default configuration.
    pub fn default_runtime() -> HostResult<Self> {
        Self::new(RuntimeConfig::default())
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Compiles a guest module from raw bytes (binary wasm or WAT text).
    pub fn load_module(&self, name: &str, bytes: &[u8]) -> HostResult<PluginModule> {
        let start = Instant::now();
        let module = Module::new(&self.engine, bytes).map_err(|e| HostError::Compile {
            module: name.to_string(),
            reason: e.to_string(),
        })?;
        debug!(
            module = name,
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "compiled plugin module"
        );
        Ok(PluginModule {
            name: name.to_string(),
            module,
        })
    }

    /// Compiles a guest module from WAT text.
    pub fn load_wat(&self, name: &str, wat: &str) -> HostResult<PluginModule> {
        self.load_module(name, wat.as_bytes())
    }

    /// Compiles a guest module from a file, naming it after the file stem.
    pub fn load_file(&self, path: &Path) -> HostResult<PluginModule> {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let bytes = std::fs::read(path).map_err(|e| HostError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.load_module(&name, &bytes)
    }

    /// Instantiates a compiled module, ready for `invoke`.
    pub fn instantiate(&self, module: &PluginModule) -> HostResult<PluginInstance> {
        PluginInstance::new(self, module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_config_builder() {
        let config = RuntimeConfig::new()
            .with_limits(MemoryLimits {
                max_memory_bytes: 1024 * 1024,
                max_table_elements: 100,
            })
            .with_memory_growth(true);
        assert!(config.grow_memory_on_demand);
        assert_eq!(config.limits.max_memory_bytes, 1024 * 1024);
    }

    #[test]
    fn compiles_wat() {
        let runtime = WasmRuntime::default_runtime().unwrap();
        let module = runtime
            .load_wat(
                "answer",
                r#"(module (func (export "answer") (result i32) i32.const 42))"#,
            )
            .unwrap();
        assert_eq!(module.name(), "answer");
    }

    #[test]
    fn malformed_bytes_fail_to_compile() {
        let runtime = WasmRuntime::default_runtime().unwrap();
        let err = runtime.load_module("junk", b"\x00asm not a module").unwrap_err();
        assert!(matches!(err, HostError::Compile { .. }), "{err:?}");
    }

    #[test]
    fn limiter_caps_memory() {
        let mut limiter = StoreLimiter {
            limits: MemoryLimits {
                max_memory_bytes: 65536,
                max_table_elements: 10,
            },
        };
        assert!(limiter.memory_growing(0, 65536, None).unwrap());
        assert!(!limiter.memory_growing(0, 65537, None).unwrap());
        assert!(!limiter.table_growing(0, 11, None).unwrap());
    }
}
