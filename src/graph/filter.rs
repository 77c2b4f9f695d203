use std::fmt;

use crate::foundation::core::{Dimensions, round_up_even};
use crate::settings::FillColor;
use crate::settings::overlay::{OverlayConfig, OverlayPosition};

/// Gap between the overlay and the frame edge, as a fraction of the shorter output side.
pub const OVERLAY_MARGIN_FRACTION: f64 = 0.03;

/// Named stream in a filter graph (`[base]`, `[0:v]`, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamLabel(String);

impl StreamLabel {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Video stream of input `idx`.
    pub fn input_video(idx: usize) -> Self {
        Self(format!("{idx}:v"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// The filters this crate emits.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// Scale to fit inside `width` x `height`, keeping aspect ratio.
    ScaleToFit { width: u32, height: u32 },
    /// Scale to `width`, height follows the aspect ratio (kept even).
    ScaleToWidth { width: u32 },
    /// Pad to exactly `width` x `height`, centering the input.
    PadCentered {
        width: u32,
        height: u32,
        color: FillColor,
    },
    /// Convert to a pixel format.
    Format(&'static str),
    /// Multiply the alpha channel.
    Opacity(f64),
    /// Composite the second input onto the first.
    Overlay { x: String, y: String },
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScaleToFit { width, height } => write!(
                f,
                "scale={width}:{height}:force_original_aspect_ratio=decrease"
            ),
            Self::ScaleToWidth { width } => write!(f, "scale={width}:-2"),
            Self::PadCentered {
                width,
                height,
                color,
            } => write!(
                f,
                "pad={width}:{height}:(ow-iw)/2:(oh-ih)/2:color={}",
                color.as_ffmpeg()
            ),
            Self::Format(pix_fmt) => write!(f, "format={pix_fmt}"),
            Self::Opacity(alpha) => write!(f, "colorchannelmixer=aa={}", format_ratio(*alpha)),
            Self::Overlay { x, y } => write!(f, "overlay={x}:{y}"),
        }
    }
}

fn format_ratio(v: f64) -> String {
    let s = format!("{:.3}", v.clamp(0.0, 1.0));
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() { "0".to_string() } else { s.to_string() }
}

/// One `[in]...filter,filter...[out]` segment of a graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    pub inputs: Vec<StreamLabel>,
    pub filters: Vec<Filter>,
    pub outputs: Vec<StreamLabel>,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for input in &self.inputs {
            write!(f, "{input}")?;
        }
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
        }
        for output in &self.outputs {
            write!(f, "{output}")?;
        }
        Ok(())
    }
}

/// Rendered filter arguments for the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterArgs {
    /// Single-input chain for `-vf`.
    Simple(String),
    /// Multi-input graph for `-filter_complex`, with the stream to `-map`.
    Complex { graph: String, map: String },
}

/// Ordered list of stages; rendered to ffmpeg syntax only at the end.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterGraph {
    stages: Vec<Stage>,
}

impl FilterGraph {
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    /// A single stage without labels is a simple filter; anything else is a complex graph whose
    /// last stage's first output is the mapped stream.
    pub fn render(&self) -> FilterArgs {
        if let [only] = self.stages.as_slice()
            && only.inputs.is_empty()
            && only.outputs.is_empty()
        {
            return FilterArgs::Simple(only.to_string());
        }
        let graph = self
            .stages
            .iter()
            .map(Stage::to_string)
            .collect::<Vec<_>>()
            .join(";");
        let map = self
            .stages
            .last()
            .and_then(|s| s.outputs.first())
            .map(StreamLabel::to_string)
            .unwrap_or_default();
        FilterArgs::Complex { graph, map }
    }
}

/// Overlay parameters resolved against a concrete output size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayPlacement {
    pub position: OverlayPosition,
    /// Overlay width in pixels, even.
    pub width: u32,
    pub margin: u32,
    pub opacity: f64,
}

impl OverlayPlacement {
    pub fn for_target(cfg: &OverlayConfig, target: Dimensions) -> Self {
        let width = (f64::from(target.width) * cfg.scale.clamp(0.0, 1.0)).round() as u32;
        let width = round_up_even(width.max(2)).min(target.width);
        let margin = (f64::from(target.width.min(target.height)) * OVERLAY_MARGIN_FRACTION)
            .round() as u32;
        Self {
            position: cfg.position,
            width,
            margin,
            opacity: cfg.opacity,
        }
    }

    fn xy(&self) -> (String, String) {
        let m = self.margin;
        let (x, y) = match self.position {
            OverlayPosition::TopLeft => (format!("{m}"), format!("{m}")),
            OverlayPosition::TopRight => (format!("W-w-{m}"), format!("{m}")),
            OverlayPosition::BottomLeft => (format!("{m}"), format!("H-h-{m}")),
            OverlayPosition::BottomRight => (format!("W-w-{m}"), format!("H-h-{m}")),
            OverlayPosition::Center => ("(W-w)/2".to_string(), "(H-h)/2".to_string()),
        };
        (x, y)
    }
}

pub const BASE_LABEL: &str = "base";
pub const OVERLAY_LABEL: &str = "ovl";
pub const OUTPUT_LABEL: &str = "vout";

/// Fit-and-pad chain for the frames, plus the overlay composite when `overlay` is given.
///
/// Without an overlay the result is one unlabeled stage. With one, the padded frames are named
/// `[base]` so the composite reads the scaled output rather than input 0 directly, and the
/// overlay image is expected as input 1.
pub fn build_filter_graph(
    target: Dimensions,
    fill: FillColor,
    overlay: Option<OverlayPlacement>,
) -> FilterGraph {
    let base_filters = vec![
        Filter::ScaleToFit {
            width: target.width,
            height: target.height,
        },
        Filter::PadCentered {
            width: target.width,
            height: target.height,
            color: fill,
        },
    ];

    let mut graph = FilterGraph::default();
    let Some(overlay) = overlay else {
        graph.push(Stage {
            inputs: Vec::new(),
            filters: base_filters,
            outputs: Vec::new(),
        });
        return graph;
    };

    graph.push(Stage {
        inputs: vec![StreamLabel::input_video(0)],
        filters: base_filters,
        outputs: vec![StreamLabel::new(BASE_LABEL)],
    });
    graph.push(Stage {
        inputs: vec![StreamLabel::input_video(1)],
        filters: vec![
            Filter::ScaleToWidth {
                width: overlay.width,
            },
            Filter::Format("rgba"),
            Filter::Opacity(overlay.opacity),
        ],
        outputs: vec![StreamLabel::new(OVERLAY_LABEL)],
    });
    let (x, y) = overlay.xy();
    graph.push(Stage {
        inputs: vec![StreamLabel::new(BASE_LABEL), StreamLabel::new(OVERLAY_LABEL)],
        filters: vec![Filter::Overlay { x, y }],
        outputs: vec![StreamLabel::new(OUTPUT_LABEL)],
    });
    graph
}

#[cfg(test)]
#[path = "../../tests/unit/graph/filter.rs"]
mod tests;
