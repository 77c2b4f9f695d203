use std::io::Cursor;

use crate::foundation::core::{Dimensions, SourceBlob};
use crate::settings::{ConversionSettings, RESOLUTION_720P, ResolutionMode};

/// Read an image's pixel size from its header.
///
/// Only the header is parsed; no pixel buffer is allocated. Returns `None` for unknown or
/// corrupt data and for zero-sized images.
pub fn probe_dimensions(blob: &SourceBlob) -> Option<Dimensions> {
    let reader = image::ImageReader::new(Cursor::new(blob.bytes.as_slice()))
        .with_guessed_format()
        .ok()?;
    match reader.into_dimensions() {
        Ok((width, height)) => Dimensions::clamped(width, height),
        Err(e) => {
            tracing::debug!(name = %blob.name, error = %e, "could not measure image");
            None
        }
    }
}

/// Output size for a run. Both sides of the result are always even and at most
/// [`MAX_DIMENSION`](crate::foundation::core::MAX_DIMENSION).
///
/// `Fixed` returns its literal size without looking at the frames. `Auto` takes the largest
/// width and the largest height over every measurable frame, falling back to 1280x720 when
/// none can be measured.
pub fn resolve<'a>(
    settings: &ConversionSettings,
    frames: impl IntoIterator<Item = &'a SourceBlob>,
) -> Dimensions {
    let dims = match settings.resolution {
        ResolutionMode::Fixed { width, height } => {
            Dimensions::clamped(width, height).unwrap_or(RESOLUTION_720P)
        }
        ResolutionMode::Auto => frames
            .into_iter()
            .filter_map(probe_dimensions)
            .reduce(Dimensions::max)
            .unwrap_or(RESOLUTION_720P),
    };
    dims.round_up_even()
}

#[cfg(test)]
#[path = "../../tests/unit/graph/resolve.rs"]
mod tests;
