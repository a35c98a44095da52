//! Plugin discovery and the sequential transformation fold.
//!
//! Discovery produces an explicit ordered manifest; execution is a fold of
//! each module's transformation over an accumulating value. The two are
//! deliberately decoupled: callers can run a scanned directory, or hand the
//! fold an ordered list of module bytes from anywhere else.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{HostError, HostResult};
use crate::runtime::WasmRuntime;

/// File extension marking a compiled guest module.
pub const WASM_EXTENSION: &str = "wasm";

/// Conventional name of the transformation a plugin exports (invoked as
/// `_transform`).
pub const DEFAULT_EXPORT: &str = "transform";

/// One guest module file available to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Name inferred from the file stem.
    pub name: String,
    pub path: PathBuf,
}

impl ManifestEntry {
    /// Reads the module's raw bytes; a module that cannot be fully read is
    /// never partially applied.
    pub fn read_bytes(&self) -> HostResult<Vec<u8>> {
        fs::read(&self.path).map_err(|e| HostError::Io {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// Enumerates candidate guest modules in `dir`, filtered by extension and
/// sorted by file name. Sorting makes the manifest a deterministic contract
/// instead of whatever order the filesystem happens to iterate in.
pub fn scan_plugin_dir(dir: &Path) -> HostResult<Vec<ManifestEntry>> {
    let read_dir = fs::read_dir(dir).map_err(|e| HostError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| HostError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == WASM_EXTENSION) {
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            entries.push(ManifestEntry { name, path });
        }
    }
    entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

    debug!(dir = %dir.display(), count = entries.len(), "scanned plugin directory");
    Ok(entries)
}

/// What to do when one module in the fold fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the fold and surface the error (default).
    #[default]
    Halt,
    /// Log the failure and continue with the accumulator unchanged, so
    /// independent modules downstream still run.
    Skip,
}

/// An ordered plugin pipeline: each module's transformation is applied to
/// the accumulating value in sequence, one fresh instance per module.
pub struct PluginPipeline<'rt> {
    runtime: &'rt WasmRuntime,
    export: String,
    policy: ErrorPolicy,
}

impl<'rt> PluginPipeline<'rt> {
    pub fn new(runtime: &'rt WasmRuntime) -> Self {
        Self {
            runtime,
            export: DEFAULT_EXPORT.to_string(),
            policy: ErrorPolicy::default(),
        }
    }

    /// Overrides the exported transformation name.
    pub fn with_export(mut self, export: &str) -> Self {
        self.export = export.to_string();
        self
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Folds the given modules over `initial` in order: module 2 receives
    /// the output of module 1, and so on.
    pub fn apply<T>(&self, initial: T, modules: &[(String, Vec<u8>)]) -> HostResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut value = initial;
        for (name, bytes) in modules {
            match self.apply_one(name, bytes, &value) {
                Ok(next) => value = next,
                Err(err) => self.handle_failure(name, err)?,
            }
        }
        Ok(value)
    }

    /// Scans `dir` and folds every discovered module over `initial` in
    /// manifest order. Read failures are reported per entry and handled by
    /// the same policy as call failures.
    pub fn run_dir<T>(&self, dir: &Path, initial: T) -> HostResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let entries = scan_plugin_dir(dir)?;
        info!(dir = %dir.display(), modules = entries.len(), "running plugin pipeline");

        let mut value = initial;
        for entry in &entries {
            let step = entry
                .read_bytes()
                .and_then(|bytes| self.apply_one(&entry.name, &bytes, &value));
            match step {
                Ok(next) => value = next,
                Err(err) => self.handle_failure(&entry.name, err)?,
            }
        }
        Ok(value)
    }

    fn apply_one<T>(&self, name: &str, bytes: &[u8], value: &T) -> HostResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let module = self.runtime.load_module(name, bytes)?;
        let mut instance = self.runtime.instantiate(&module)?;
        instance.invoke(&self.export, value)
    }

    fn handle_failure(&self, name: &str, err: HostError) -> HostResult<()> {
        match self.policy {
            ErrorPolicy::Halt => Err(err),
            ErrorPolicy::Skip => {
                warn!(module = name, error = %err, "skipping failed plugin");
                Ok(())
            }
        }
    }
}

/// Applies an ordered list of already-loaded module byte buffers to
/// `initial` with the default conventions. This is the single operation the
/// surrounding document-processing host consumes.
pub fn apply_plugins<T>(
    runtime: &WasmRuntime,
    initial: T,
    modules: &[(String, Vec<u8>)],
) -> HostResult<T>
where
    T: Serialize + DeserializeOwned,
{
    PluginPipeline::new(runtime).apply(initial, modules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name))
            .unwrap()
            .write_all(b"stub")
            .unwrap();
    }

    #[test]
    fn scan_filters_by_extension_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.wasm");
        touch(dir.path(), "a.wasm");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "c.wat");

        let entries = scan_plugin_dir(dir.path()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn scan_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "second.wasm");
        touch(dir.path(), "first.wasm");

        let once = scan_plugin_dir(dir.path()).unwrap();
        let twice = scan_plugin_dir(dir.path()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn scan_of_missing_directory_reports_the_path() {
        let err = scan_plugin_dir(Path::new("/nonexistent/plugins")).unwrap_err();
        match err {
            HostError::Io { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/plugins"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unreadable_entry_reports_its_own_path() {
        let entry = ManifestEntry {
            name: "ghost".to_string(),
            path: PathBuf::from("/nonexistent/ghost.wasm"),
        };
        let err = entry.read_bytes().unwrap_err();
        assert!(matches!(err, HostError::Io { .. }), "{err:?}");
    }
}
