use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::convert::phase::{CancelToken, ConversionPhase};
use crate::encode::{ConversionEngine, EncodeCommand, Playlist};
use crate::foundation::core::{Dimensions, SourceBlob, format_size};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::handles::{DisplayHandle, HandleKind, HandleRegistry};
use crate::graph::filter::{OverlayPlacement, build_filter_graph};
use crate::graph::resolve::resolve;
use crate::ingest::sequence::FrameItem;
use crate::settings::ConversionSettings;
use crate::settings::overlay::OverlayConfig;

/// Shown when a run fails without a usable engine diagnostic.
pub const GENERIC_FAILURE_HINT: &str =
    "Conversion failed. Try fewer images, a lower resolution, or a lower frame rate.";
/// Shown when the engine cannot be loaded.
pub const ENGINE_LOAD_FAILURE: &str = "Failed to load the conversion engine. Please try again.";
pub const CANCELLED_MESSAGE: &str = "conversion cancelled";

/// A finished video.
#[derive(Clone, Debug)]
pub struct OutputArtifact {
    pub handle: DisplayHandle,
    pub bytes: Arc<Vec<u8>>,
    pub resolution: Dimensions,
    pub fps: u32,
}

impl OutputArtifact {
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn size_label(&self) -> String {
        format_size(self.size_bytes())
    }

    pub fn resolution_label(&self) -> String {
        self.resolution.label()
    }
}

type PhaseObserver = Box<dyn Fn(ConversionPhase) + Send + Sync>;

#[derive(Debug, Default)]
struct RunState {
    phase: ConversionPhase,
    last_error: Option<String>,
    output: Option<OutputArtifact>,
}

/// Why a run stopped early.
enum Abort {
    Cancelled,
    Failed(ReelError),
}

impl From<ReelError> for Abort {
    fn from(err: ReelError) -> Self {
        Self::Failed(err)
    }
}

/// Names written into the engine filesystem during one run.
#[derive(Debug, Default)]
struct Staged {
    names: Vec<String>,
}

/// Drives one conversion at a time through the engine.
///
/// `Converter` owns the phase, the last failure message and the current output handle.
/// Callers share it behind an `Arc`; a second `convert` while one is running gets
/// [`ReelError::Busy`].
pub struct Converter {
    engine: Arc<dyn ConversionEngine>,
    handles: Arc<HandleRegistry>,
    observer: Option<PhaseObserver>,
    busy: AtomicBool,
    runs: AtomicU64,
    state: Mutex<RunState>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("busy", &self.busy.load(Ordering::SeqCst))
            .field("runs", &self.runs.load(Ordering::SeqCst))
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Converter {
    pub fn new(engine: Arc<dyn ConversionEngine>, handles: Arc<HandleRegistry>) -> Self {
        Self {
            engine,
            handles,
            observer: None,
            busy: AtomicBool::new(false),
            runs: AtomicU64::new(0),
            state: Mutex::new(RunState::default()),
        }
    }

    /// Call `observer` on every phase transition.
    pub fn with_observer(
        mut self,
        observer: impl Fn(ConversionPhase) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn engine(&self) -> &Arc<dyn ConversionEngine> {
        &self.engine
    }

    pub fn phase(&self) -> ConversionPhase {
        self.state().phase
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    pub fn output(&self) -> Option<OutputArtifact> {
        self.state().output.clone()
    }

    /// Back to `idle` and forget the last failure. The current output is kept.
    pub fn reset(&self) -> ReelResult<()> {
        if self.is_busy() {
            return Err(ReelError::Busy);
        }
        {
            let mut state = self.state();
            state.phase = ConversionPhase::Idle;
            state.last_error = None;
        }
        self.notify(ConversionPhase::Idle);
        Ok(())
    }

    /// Release the current output handle, if any.
    pub fn discard_output(&self) -> bool {
        let previous = self.state().output.take();
        previous.is_some_and(|out| self.handles.release(&out.handle))
    }

    pub fn convert(
        &self,
        frames: &[FrameItem],
        settings: &ConversionSettings,
        overlay: &OverlayConfig,
    ) -> ReelResult<OutputArtifact> {
        self.convert_with_cancel(frames, settings, overlay, &CancelToken::new())
    }

    /// Run one conversion over `frames` in their current order.
    ///
    /// Validation failures return before any engine call and leave the phase at `idle`.
    /// Every other failure ends the run in `error` and is returned as
    /// [`ReelError::Conversion`]. Staged engine files are removed in every case.
    #[tracing::instrument(skip_all, fields(frames = frames.len()))]
    pub fn convert_with_cancel(
        &self,
        frames: &[FrameItem],
        settings: &ConversionSettings,
        overlay: &OverlayConfig,
        cancel: &CancelToken,
    ) -> ReelResult<OutputArtifact> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ReelError::Busy);
        }
        let _busy = BusyGuard(&self.busy);

        self.begin_run();
        validate_inputs(frames, settings, overlay)?;
        self.state().last_error = None;

        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        let mut staged = Staged::default();
        let result = self.run_phases(run, frames, settings, overlay, cancel, &mut staged);
        self.cleanup(&staged);

        match result {
            Ok((bytes, resolution)) => {
                Ok(self.succeed(bytes, resolution, settings.effective_fps()))
            }
            Err(abort) => Err(self.fail(abort)),
        }
    }

    fn run_phases(
        &self,
        run: u64,
        frames: &[FrameItem],
        settings: &ConversionSettings,
        overlay: &OverlayConfig,
        cancel: &CancelToken,
        staged: &mut Staged,
    ) -> Result<(Vec<u8>, Dimensions), Abort> {
        checkpoint(cancel)?;
        self.transition(ConversionPhase::LoadingEngine);
        if !self.engine.is_initialized() {
            tracing::info!("loading conversion engine");
        }
        self.engine.initialize()?;

        checkpoint(cancel)?;
        self.transition(ConversionPhase::Preparing);
        let target = resolve(settings, frames.iter().map(|f| &f.source));
        tracing::info!(resolution = %target.label(), "resolved output size");

        let mut timeline: Vec<(String, f64)> = Vec::with_capacity(frames.len());
        for (idx, frame) in frames.iter().enumerate() {
            checkpoint(cancel)?;
            let name = staged_name(run, &format!("frame_{idx:05}"), &frame.source);
            self.stage(staged, &name, &frame.source)?;
            timeline.push((name, frame.duration_secs(settings.image_duration_secs)));
        }
        let playlist = Playlist::from_frames(timeline.iter().map(|(n, d)| (n.as_str(), *d)));
        let playlist_name = format!("r{run}_playlist.txt");
        self.stage_bytes(staged, &playlist_name, playlist.to_string().as_bytes())?;

        let (overlay_name, placement) = match overlay.active_image() {
            Some(image) => {
                let name = staged_name(run, "overlay", image);
                self.stage(staged, &name, image)?;
                (Some(name), Some(OverlayPlacement::for_target(overlay, target)))
            }
            None => (None, None),
        };

        let output_name = format!("r{run}_output.mp4");
        let command = EncodeCommand {
            playlist: playlist_name,
            overlay: overlay_name,
            filter: build_filter_graph(target, settings.fill, placement).render(),
            fps: settings.effective_fps(),
            output: output_name.clone(),
        };

        checkpoint(cancel)?;
        self.transition(ConversionPhase::Encoding);
        staged.names.push(output_name.clone());
        self.engine.execute(&command.to_argv())?;

        checkpoint(cancel)?;
        self.transition(ConversionPhase::Finalizing);
        let bytes = self.engine.read_file(&output_name)?;
        Ok((bytes, target))
    }

    fn stage(&self, staged: &mut Staged, name: &str, blob: &SourceBlob) -> ReelResult<()> {
        self.stage_bytes(staged, name, &blob.bytes)
    }

    fn stage_bytes(&self, staged: &mut Staged, name: &str, bytes: &[u8]) -> ReelResult<()> {
        // Track before writing so a partial write is still cleaned up.
        staged.names.push(name.to_string());
        self.engine.write_file(name, bytes)?;
        tracing::debug!(name, bytes = bytes.len(), "staged");
        Ok(())
    }

    fn cleanup(&self, staged: &Staged) {
        for name in &staged.names {
            if let Err(e) = self.engine.delete_file(name) {
                tracing::debug!(name = %name, error = %e, "cleanup skipped");
            }
        }
    }

    fn succeed(&self, bytes: Vec<u8>, resolution: Dimensions, fps: u32) -> OutputArtifact {
        let previous = self.state().output.take();
        if let Some(previous) = previous {
            self.handles.release(&previous.handle);
        }
        let artifact = OutputArtifact {
            handle: self.handles.create(HandleKind::Output),
            bytes: Arc::new(bytes),
            resolution,
            fps,
        };
        self.state().output = Some(artifact.clone());
        self.transition(ConversionPhase::Success);
        tracing::info!(
            size = %artifact.size_label(),
            resolution = %artifact.resolution_label(),
            "conversion finished"
        );
        artifact
    }

    fn fail(&self, abort: Abort) -> ReelError {
        let phase = self.phase();
        let message = match abort {
            Abort::Cancelled => CANCELLED_MESSAGE.to_string(),
            Abort::Failed(err) => failure_message(phase, &err),
        };
        tracing::warn!(%phase, message = %message, "conversion failed");
        self.state().last_error = Some(message.clone());
        self.transition(ConversionPhase::Error);
        ReelError::conversion(phase, message)
    }

    /// Put the phase back to `idle` so a new run never reports the previous run's phase.
    fn begin_run(&self) {
        let phase = self.phase();
        if !phase.can_start() {
            tracing::warn!(%phase, "previous run ended mid-phase");
        }
        if phase != ConversionPhase::Idle {
            self.transition(ConversionPhase::Idle);
        }
    }

    fn transition(&self, next: ConversionPhase) {
        let previous = {
            let mut state = self.state();
            std::mem::replace(&mut state.phase, next)
        };
        debug_assert!(
            next.ordinal() > previous.ordinal()
                || next == ConversionPhase::Idle
                || previous.is_terminal(),
            "phase moved backwards: {previous} -> {next}"
        );
        tracing::info!(phase = %next, "phase");
        self.notify(next);
    }

    fn notify(&self, phase: ConversionPhase) {
        if let Some(observer) = &self.observer {
            observer(phase);
        }
    }

    fn state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn validate_inputs(
    frames: &[FrameItem],
    settings: &ConversionSettings,
    overlay: &OverlayConfig,
) -> ReelResult<()> {
    if frames.is_empty() {
        return Err(ReelError::validation("add at least one image before converting"));
    }
    settings.validate()?;
    if overlay.active_image().is_some() {
        overlay.validate()?;
    }
    Ok(())
}

fn checkpoint(cancel: &CancelToken) -> Result<(), Abort> {
    if cancel.is_cancelled() {
        return Err(Abort::Cancelled);
    }
    Ok(())
}

/// `r{run}_{stem}.{ext}`; the run prefix keeps names unique across runs on a shared engine.
fn staged_name(run: u64, stem: &str, blob: &SourceBlob) -> String {
    let ext = blob.extension().unwrap_or_else(|| "png".to_string());
    format!("r{run}_{stem}.{ext}")
}

fn failure_message(phase: ConversionPhase, err: &ReelError) -> String {
    let diagnostic = match err {
        ReelError::Engine(msg) | ReelError::Decode(msg) | ReelError::Ingest(msg) => {
            msg.trim().to_string()
        }
        other => other.to_string(),
    };
    if phase == ConversionPhase::LoadingEngine {
        return if diagnostic.is_empty() {
            ENGINE_LOAD_FAILURE.to_string()
        } else {
            format!("{ENGINE_LOAD_FAILURE} ({diagnostic})")
        };
    }
    if diagnostic.is_empty() {
        GENERIC_FAILURE_HINT.to_string()
    } else {
        diagnostic
    }
}

#[cfg(test)]
#[path = "../../tests/unit/convert/orchestrator.rs"]
mod tests;
