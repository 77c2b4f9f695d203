use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stage of a conversion run. Advances strictly forward within one run.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionPhase {
    #[default]
    Idle,
    LoadingEngine,
    Preparing,
    Encoding,
    Finalizing,
    Success,
    Error,
}

impl ConversionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LoadingEngine => "loading engine",
            Self::Preparing => "preparing",
            Self::Encoding => "encoding",
            Self::Finalizing => "finalizing",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// `true` for the phases a run ends in.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// A new run may start from idle or from the end of a previous run.
    pub fn can_start(self) -> bool {
        self == Self::Idle || self.is_terminal()
    }

    /// Position in the run order; terminal phases share the last slot.
    pub(crate) fn ordinal(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::LoadingEngine => 1,
            Self::Preparing => 2,
            Self::Encoding => 3,
            Self::Finalizing => 4,
            Self::Success | Self::Error => 5,
        }
    }
}

impl fmt::Display for ConversionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cooperative cancellation flag shared between a caller and a running conversion.
///
/// The run polls it between phases and between frame writes. An engine command that has
/// already started is not interrupted.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
