use crate::foundation::core::SourceBlob;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::handles::DisplayHandle;
use crate::ingest::normalize::is_legacy_format;

/// Corner (or center) the overlay image is anchored to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl std::str::FromStr for OverlayPosition {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top-left" => Ok(Self::TopLeft),
            "top-right" => Ok(Self::TopRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom-right" => Ok(Self::BottomRight),
            "center" => Ok(Self::Center),
            other => Err(ReelError::validation(format!(
                "unknown overlay position '{other}'"
            ))),
        }
    }
}

/// Image composited on top of every frame.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayConfig {
    pub enabled: bool,
    pub image: Option<SourceBlob>,
    pub position: OverlayPosition,
    /// Overlay width as a fraction of the output width, in `(0, 1]`.
    pub scale: f64,
    /// `0.0` is invisible, `1.0` is opaque.
    pub opacity: f64,
    pub preview: Option<DisplayHandle>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            image: None,
            position: OverlayPosition::BottomRight,
            scale: 0.2,
            opacity: 1.0,
            preview: None,
        }
    }
}

impl OverlayConfig {
    /// Enabled overlay using `image` with default placement.
    pub fn with_image(image: SourceBlob) -> Self {
        Self {
            enabled: true,
            image: Some(image),
            ..Self::default()
        }
    }

    /// The overlay takes part in filter synthesis only when enabled and an image is present.
    pub fn active_image(&self) -> Option<&SourceBlob> {
        if self.enabled {
            self.image.as_ref()
        } else {
            None
        }
    }

    /// Check placement ranges. A HEIC/HEIF image must be normalized before it is set here.
    pub fn validate(&self) -> ReelResult<()> {
        if let Some(image) = &self.image
            && is_legacy_format(&image.name, image.mime.as_deref())
        {
            return Err(ReelError::validation(format!(
                "overlay '{}' must be converted to PNG first",
                image.name
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 || self.scale > 1.0 {
            return Err(ReelError::validation("overlay scale must be in (0, 1]"));
        }
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(ReelError::validation("overlay opacity must be in [0, 1]"));
        }
        Ok(())
    }
}
