use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Mutex, OnceLock};

use anyhow::Context as _;

use crate::foundation::error::{ReelError, ReelResult};

/// Transcoding engine: a flat virtual filesystem plus a command executor.
///
/// Implementations are shared across runs, so every method takes `&self`.
pub trait ConversionEngine: Send + Sync {
    /// One-time cold start. Later calls are no-ops.
    fn initialize(&self) -> ReelResult<()>;
    fn is_initialized(&self) -> bool;
    fn write_file(&self, name: &str, bytes: &[u8]) -> ReelResult<()>;
    fn read_file(&self, name: &str) -> ReelResult<Vec<u8>>;
    fn delete_file(&self, name: &str) -> ReelResult<()>;
    /// Run one command. Failures carry the engine's own diagnostic text.
    fn execute(&self, argv: &[String]) -> ReelResult<()>;
}

/// Reject names that would escape the flat virtual filesystem.
pub fn validate_vfs_name(name: &str) -> ReelResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(ReelError::engine(format!(
            "invalid virtual file name '{name}'"
        )));
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked.
pub fn is_ffmpeg_available(ffmpeg: &Path) -> bool {
    Command::new(ffmpeg)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Engine backed by a system `ffmpeg` executable and a private scratch directory.
#[derive(Debug)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    scratch: OnceLock<tempfile::TempDir>,
    init_lock: Mutex<()>,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegEngine {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            scratch: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }

    fn path_of(&self, name: &str) -> ReelResult<PathBuf> {
        validate_vfs_name(name)?;
        let dir = self
            .scratch
            .get()
            .ok_or_else(|| ReelError::engine("engine is not initialized"))?;
        Ok(dir.path().join(name))
    }
}

impl ConversionEngine for FfmpegEngine {
    fn initialize(&self) -> ReelResult<()> {
        let _guard = self.init_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.scratch.get().is_some() {
            return Ok(());
        }
        if !is_ffmpeg_available(&self.ffmpeg) {
            return Err(ReelError::engine(format!(
                "ffmpeg is required for MP4 encoding, but '{}' could not be run",
                self.ffmpeg.display()
            )));
        }
        let dir = tempfile::Builder::new()
            .prefix("stillreel-")
            .tempdir()
            .context("failed to create engine scratch directory")?;
        tracing::debug!(dir = %dir.path().display(), "engine scratch directory ready");
        let _ = self.scratch.set(dir);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.scratch.get().is_some()
    }

    fn write_file(&self, name: &str, bytes: &[u8]) -> ReelResult<()> {
        let path = self.path_of(name)?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        Ok(())
    }

    fn read_file(&self, name: &str) -> ReelResult<Vec<u8>> {
        let path = self.path_of(name)?;
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        Ok(bytes)
    }

    fn delete_file(&self, name: &str) -> ReelResult<()> {
        let path = self.path_of(name)?;
        std::fs::remove_file(&path)
            .with_context(|| format!("failed to delete '{}'", path.display()))?;
        Ok(())
    }

    fn execute(&self, argv: &[String]) -> ReelResult<()> {
        let dir = self
            .scratch
            .get()
            .ok_or_else(|| ReelError::engine("engine is not initialized"))?;

        tracing::debug!(args = %argv.join(" "), "running ffmpeg");
        let out = Command::new(&self.ffmpeg)
            .args(argv)
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                ReelError::engine(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(ReelError::engine(stderr.trim().to_string()));
        }
        Ok(())
    }
}

/// Scripted failure for [`MemoryEngine`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MemoryEngineFault {
    #[default]
    None,
    /// `initialize` fails with this message.
    Initialize(String),
    /// `execute` fails with this message (may be empty).
    Execute(String),
}

#[derive(Debug, Default)]
struct MemoryEngineState {
    initialized: bool,
    init_calls: usize,
    files: BTreeMap<String, Vec<u8>>,
    written: Vec<String>,
    deleted: Vec<String>,
    executed: Vec<Vec<String>>,
}

/// In-memory engine for tests and dry runs.
///
/// `execute` records the argv and, unless a fault is scripted, writes a small synthetic file
/// under the argv's last element (the output name).
#[derive(Debug, Default)]
pub struct MemoryEngine {
    fault: Mutex<MemoryEngineFault>,
    state: Mutex<MemoryEngineState>,
}

/// Bytes produced by a successful [`MemoryEngine::execute`].
pub const MEMORY_ENGINE_OUTPUT: &[u8] = b"\0\0\0\x18ftypisom-stillreel";

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault(fault: MemoryEngineFault) -> Self {
        let engine = Self::default();
        engine.set_fault(fault);
        engine
    }

    pub fn set_fault(&self, fault: MemoryEngineFault) {
        *self.fault.lock().unwrap_or_else(|e| e.into_inner()) = fault;
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryEngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Names currently present in the virtual filesystem.
    pub fn file_names(&self) -> Vec<String> {
        self.state().files.keys().cloned().collect()
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.state().files.get(name).cloned()
    }

    /// Every name ever written, in write order.
    pub fn written(&self) -> Vec<String> {
        self.state().written.clone()
    }

    /// Every name deleted, in delete order.
    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    pub fn executed(&self) -> Vec<Vec<String>> {
        self.state().executed.clone()
    }

    pub fn init_calls(&self) -> usize {
        self.state().init_calls
    }
}

impl ConversionEngine for MemoryEngine {
    fn initialize(&self) -> ReelResult<()> {
        let fault = self.fault.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let mut state = self.state();
        state.init_calls += 1;
        if state.initialized {
            return Ok(());
        }
        if let MemoryEngineFault::Initialize(msg) = fault {
            return Err(ReelError::engine(msg));
        }
        state.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    fn write_file(&self, name: &str, bytes: &[u8]) -> ReelResult<()> {
        validate_vfs_name(name)?;
        let mut state = self.state();
        state.written.push(name.to_string());
        state.files.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read_file(&self, name: &str) -> ReelResult<Vec<u8>> {
        self.state()
            .files
            .get(name)
            .cloned()
            .ok_or_else(|| ReelError::engine(format!("{name}: No such file or directory")))
    }

    fn delete_file(&self, name: &str) -> ReelResult<()> {
        let mut state = self.state();
        state.deleted.push(name.to_string());
        state
            .files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ReelError::engine(format!("{name}: No such file or directory")))
    }

    fn execute(&self, argv: &[String]) -> ReelResult<()> {
        let fault = self.fault.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let mut state = self.state();
        if !state.initialized {
            return Err(ReelError::engine("engine is not initialized"));
        }
        state.executed.push(argv.to_vec());
        if let MemoryEngineFault::Execute(msg) = fault {
            return Err(ReelError::engine(msg));
        }
        if let Some(output) = argv.last() {
            state.written.push(output.clone());
            state
                .files
                .insert(output.clone(), MEMORY_ENGINE_OUTPUT.to_vec());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/engine.rs"]
mod tests;
