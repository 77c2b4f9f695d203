//! Immutable conversion settings and the built-in presets.
//!
//! Every edit produces a new [`ConversionSettings`] value. Preset tracking is explicit
//! ([`PresetSelection`]) rather than inferred from the current field values.

/// Overlay (watermark) configuration.
pub mod overlay;

use crate::foundation::core::Dimensions;
use crate::foundation::error::{ReelError, ReelResult};

/// The 16:9 fallback size, also used when auto-detection measures nothing.
pub const RESOLUTION_720P: Dimensions = Dimensions {
    width: 1280,
    height: 720,
};
pub const RESOLUTION_1080P: Dimensions = Dimensions {
    width: 1920,
    height: 1080,
};

/// Output rate used by `fps = auto` unless frames are shorter than one such tick.
pub const AUTO_FPS: u32 = 30;
pub const MAX_AUTO_FPS: u32 = 60;
pub const MAX_FPS: u32 = 120;
pub const DEFAULT_IMAGE_DURATION_SECS: f64 = 3.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ResolutionMode {
    /// Largest width and height found across the frames.
    #[default]
    Auto,
    Fixed {
        width: u32,
        height: u32,
    },
}

impl ResolutionMode {
    pub fn fixed(dims: Dimensions) -> Self {
        Self::Fixed {
            width: dims.width,
            height: dims.height,
        }
    }
}

impl std::str::FromStr for ResolutionMode {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "720p" => Ok(Self::fixed(RESOLUTION_720P)),
            "1080p" => Ok(Self::fixed(RESOLUTION_1080P)),
            other => Ok(Self::fixed(other.parse()?)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FpsMode {
    #[default]
    Auto,
    Fixed(u32),
}

impl std::str::FromStr for FpsMode {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        let fps = s
            .parse::<u32>()
            .map_err(|e| ReelError::validation(format!("invalid fps '{s}': {e}")))?;
        Ok(Self::Fixed(fps))
    }
}

/// Border color used when padding frames to the output size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillColor {
    #[default]
    Black,
    White,
}

impl FillColor {
    /// Color name as understood by ffmpeg's `pad` filter.
    pub fn as_ffmpeg(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::White => "white",
        }
    }
}

impl std::str::FromStr for FillColor {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "black" => Ok(Self::Black),
            "white" => Ok(Self::White),
            other => Err(ReelError::validation(format!(
                "fill color must be 'black' or 'white', got '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresetId {
    Slideshow,
    Quick,
    StopMotion,
    Timelapse,
}

/// Named fps + duration pair applied atomically.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Preset {
    pub id: PresetId,
    pub label: &'static str,
    pub fps: u32,
    pub image_duration_secs: f64,
}

pub const PRESETS: [Preset; 4] = [
    Preset {
        id: PresetId::Slideshow,
        label: "slideshow",
        fps: 30,
        image_duration_secs: 3.0,
    },
    Preset {
        id: PresetId::Quick,
        label: "quick",
        fps: 30,
        image_duration_secs: 1.0,
    },
    Preset {
        id: PresetId::StopMotion,
        label: "stop-motion",
        fps: 12,
        image_duration_secs: 1.0 / 12.0,
    },
    Preset {
        id: PresetId::Timelapse,
        label: "timelapse",
        fps: 30,
        image_duration_secs: 1.0 / 30.0,
    },
];

impl PresetId {
    pub fn preset(self) -> Preset {
        PRESETS
            .into_iter()
            .find(|p| p.id == self)
            .unwrap_or(PRESETS[0])
    }
}

impl std::str::FromStr for PresetId {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        PRESETS
            .iter()
            .find(|p| p.label == s)
            .map(|p| p.id)
            .ok_or_else(|| {
                let known: Vec<_> = PRESETS.iter().map(|p| p.label).collect();
                ReelError::validation(format!(
                    "unknown preset '{s}' (expected one of: {})",
                    known.join(", ")
                ))
            })
    }
}

/// Which preset, if any, the current settings correspond to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetSelection {
    /// fps and duration still equal this preset's values.
    Exact(PresetId),
    /// A preset was applied, then fps or duration diverged from it.
    Custom,
    #[default]
    None,
}

/// User-tunable conversion settings. Treat as a value: the `with_*` methods return a new one.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    pub resolution: ResolutionMode,
    pub fps: FpsMode,
    pub image_duration_secs: f64,
    pub fill: FillColor,
    pub preset: PresetSelection,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            resolution: ResolutionMode::Auto,
            fps: FpsMode::Auto,
            image_duration_secs: DEFAULT_IMAGE_DURATION_SECS,
            fill: FillColor::Black,
            preset: PresetSelection::None,
        }
    }
}

impl ConversionSettings {
    /// Check the value invariants. Deserialized settings should pass through here.
    pub fn validate(&self) -> ReelResult<()> {
        if !self.image_duration_secs.is_finite() || self.image_duration_secs <= 0.0 {
            return Err(ReelError::validation(
                "per-image duration must be finite and > 0",
            ));
        }
        if let FpsMode::Fixed(fps) = self.fps
            && !(1..=MAX_FPS).contains(&fps)
        {
            return Err(ReelError::validation(format!(
                "fps must be between 1 and {MAX_FPS}"
            )));
        }
        if let ResolutionMode::Fixed { width, height } = self.resolution {
            Dimensions::new(width, height)?;
        }
        Ok(())
    }

    pub fn with_preset(self, id: PresetId) -> Self {
        let p = id.preset();
        Self {
            fps: FpsMode::Fixed(p.fps),
            image_duration_secs: p.image_duration_secs,
            preset: PresetSelection::Exact(id),
            ..self
        }
    }

    pub fn with_fps(self, fps: FpsMode) -> ReelResult<Self> {
        let next = Self { fps, ..self };
        next.validate()?;
        Ok(next.retrack_preset())
    }

    pub fn with_image_duration(self, secs: f64) -> ReelResult<Self> {
        let next = Self {
            image_duration_secs: secs,
            ..self
        };
        next.validate()?;
        Ok(next.retrack_preset())
    }

    /// Resolution is not part of any preset; the selection is left as is.
    pub fn with_resolution(self, resolution: ResolutionMode) -> ReelResult<Self> {
        let next = Self { resolution, ..self };
        next.validate()?;
        Ok(next)
    }

    /// Fill color is not part of any preset; the selection is left as is.
    pub fn with_fill(self, fill: FillColor) -> Self {
        Self { fill, ..self }
    }

    /// Output frame rate after resolving `auto`.
    pub fn effective_fps(&self) -> u32 {
        match self.fps {
            FpsMode::Fixed(fps) => fps,
            FpsMode::Auto => {
                let needed = (1.0 / self.image_duration_secs).ceil();
                if needed.is_finite() && needed > f64::from(AUTO_FPS) {
                    (needed as u32).min(MAX_AUTO_FPS)
                } else {
                    AUTO_FPS
                }
            }
        }
    }

    fn retrack_preset(self) -> Self {
        let current = match self.preset {
            PresetSelection::Exact(id) => Some(id),
            PresetSelection::Custom | PresetSelection::None => None,
        };
        let preset = match current {
            Some(id) if self.matches_preset(id) => PresetSelection::Exact(id),
            Some(_) => PresetSelection::Custom,
            None => self.preset,
        };
        Self { preset, ..self }
    }

    fn matches_preset(&self, id: PresetId) -> bool {
        let p = id.preset();
        self.fps == FpsMode::Fixed(p.fps)
            && (self.image_duration_secs - p.image_duration_secs).abs() < 1e-9
    }
}

#[cfg(test)]
#[path = "../../tests/unit/settings/settings.rs"]
mod tests;
