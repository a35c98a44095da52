//! One instantiated guest module and the full invocation cycle against it.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wasmtime::{Instance, Linker, Memory, Store};

use crate::error::{HostError, HostResult};
use crate::memory::MemoryView;
use crate::runtime::{PluginModule, StoreData, WasmRuntime};
use wasmfold_codec::header;

const WASM_PAGE_SIZE: usize = 65536;

/// Per-instance execution metrics.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PluginMetrics {
    pub call_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub total_execution_time_ns: u64,
    pub avg_execution_time_ns: u64,
}

impl PluginMetrics {
    fn record(&mut self, elapsed: Duration, success: bool) {
        self.call_count += 1;
        if success {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }
        self.total_execution_time_ns += elapsed.as_nanos() as u64;
        self.avg_execution_time_ns = self.total_execution_time_ns / self.call_count;
    }
}

/// An instantiated guest module.
///
/// One logical caller at a time: `invoke` takes `&mut self` because the
/// memory-write, call, memory-read sequence shares one Length Slot and one
/// payload region and cannot be interleaved with another call on the same
/// instance. Callers that need parallelism instantiate the module more than
/// once.
#[derive(Debug)]
pub struct PluginInstance {
    name: String,
    store: Store<StoreData>,
    instance: Instance,
    memory: Memory,
    grow_on_demand: bool,
    metrics: PluginMetrics,
}

impl PluginInstance {
    pub(crate) fn new(runtime: &WasmRuntime, module: &PluginModule) -> HostResult<Self> {
        let mut store = Store::new(
            runtime.engine(),
            StoreData::new(runtime.config().limits),
        );
        store.limiter(|data| &mut data.limiter);

        let linker: Linker<StoreData> = Linker::new(runtime.engine());
        let instance =
            linker
                .instantiate(&mut store, &module.module)
                .map_err(|e| HostError::Instantiation {
                    module: module.name.clone(),
                    reason: e.to_string(),
                })?;

        let memory =
            instance
                .get_memory(&mut store, "memory")
                .ok_or_else(|| HostError::MissingMemory {
                    module: module.name.clone(),
                })?;

        debug!(module = %module.name, "instantiated plugin module");
        Ok(Self {
            name: module.name.clone(),
            store,
            instance,
            memory,
            grow_on_demand: runtime.config().grow_memory_on_demand,
            metrics: PluginMetrics::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &PluginMetrics {
        &self.metrics
    }

    /// Drives one full call cycle: encode the argument, stage it in guest
    /// memory, call the exported shim for `export` (its name prefixed with
    /// an underscore, per convention), then read the Length Slot and the
    /// result bytes from a fresh view and decode them.
    ///
    /// Failures are call-scoped: an error leaves the instance usable for
    /// subsequent, unrelated calls.
    pub fn invoke<A, R>(&mut self, export: &str, argument: &A) -> HostResult<R>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let started = Instant::now();
        let result = self.invoke_inner(export, argument);
        if let Err(err) = &result {
            warn!(module = %self.name, export, error = %err, "plugin call failed");
        }
        self.metrics.record(started.elapsed(), result.is_ok());
        result
    }

    fn invoke_inner<A, R>(&mut self, export: &str, argument: &A) -> HostResult<R>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let symbol = format!("_{export}");

        // Export shape is checked first: a missing or mis-typed export must
        // fail before any guest memory is touched.
        let func = self
            .instance
            .get_typed_func::<(i32, u32), i32>(&mut self.store, &symbol)
            .map_err(|e| HostError::ExportShape {
                module: self.name.clone(),
                export: symbol.clone(),
                reason: e.to_string(),
            })?;

        let encoded = wasmfold_codec::encode(argument).map_err(|e| HostError::EncodeArgument {
            module: self.name.clone(),
            export: symbol.clone(),
            source: e,
        })?;

        self.ensure_capacity(header::PAYLOAD_OFFSET + encoded.len())?;

        // Memory setup completes fully before the call: zero the Length
        // Slot, then write the whole argument into the payload region.
        {
            let mut view = MemoryView::new(&self.memory, &mut self.store);
            view.zero_len_slot()?;
            view.write(header::PAYLOAD_OFFSET, &encoded)?;
        }

        let start = func
            .call(
                &mut self.store,
                (header::PAYLOAD_OFFSET as i32, encoded.len() as u32),
            )
            .map_err(|e| HostError::Trap {
                module: self.name.clone(),
                export: symbol.clone(),
                reason: e.to_string(),
            })? as u32 as usize;

        // The guest may have grown its memory during the call, so the
        // pre-call view is stale. Length Slot and result bytes are read
        // from one fresh view so both describe the same memory.
        let view = MemoryView::new(&self.memory, &mut self.store);
        let result_len = view.read_header().result_len as usize;
        let bytes = view.read(start, result_len)?;
        wasmfold_codec::decode(bytes).map_err(|e| HostError::DecodeResult {
            module: self.name.clone(),
            export: symbol,
            source: e,
        })
    }

    /// Fails with a capacity error when the staged argument would not fit,
    /// growing the guest memory first if the runtime allows it.
    fn ensure_capacity(&mut self, needed: usize) -> HostResult<()> {
        let available = self.memory.data_size(&self.store);
        if needed <= available {
            return Ok(());
        }
        if !self.grow_on_demand {
            return Err(HostError::Capacity {
                module: self.name.clone(),
                needed,
                available,
            });
        }
        let delta_pages = (needed - available).div_ceil(WASM_PAGE_SIZE) as u64;
        self.memory
            .grow(&mut self.store, delta_pages)
            .map_err(|_| HostError::Capacity {
                module: self.name.clone(),
                needed,
                available,
            })?;
        debug!(
            module = %self.name,
            delta_pages,
            "grew guest memory for oversized argument"
        );
        Ok(())
    }
}
