use crate::graph::filter::FilterArgs;

/// Everything needed to assemble one encode invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeCommand {
    /// Concat playlist, input 0.
    pub playlist: String,
    /// Overlay image, input 1 when present.
    pub overlay: Option<String>,
    pub filter: FilterArgs,
    pub fps: u32,
    /// Output file; always the last argv element.
    pub output: String,
}

impl EncodeCommand {
    /// Render the argv passed to [`ConversionEngine::execute`](crate::encode::ConversionEngine::execute).
    pub fn to_argv(&self) -> Vec<String> {
        let mut argv: Vec<String> = Vec::with_capacity(32);
        let mut push = |args: &[&str]| argv.extend(args.iter().map(|a| a.to_string()));

        push(&["-y", "-hide_banner", "-loglevel", "error"]);
        push(&["-f", "concat", "-safe", "0", "-i", self.playlist.as_str()]);
        if let Some(overlay) = &self.overlay {
            push(&["-i", overlay.as_str()]);
        }

        match &self.filter {
            FilterArgs::Simple(chain) => push(&["-vf", chain.as_str()]),
            FilterArgs::Complex { graph, map } => {
                push(&["-filter_complex", graph.as_str(), "-map", map.as_str()])
            }
        }

        let fps = self.fps.to_string();
        push(&["-r", fps.as_str(), "-fps_mode", "vfr"]);
        push(&[
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]);
        push(&[self.output.as_str()]);
        argv
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/command.rs"]
mod tests;
