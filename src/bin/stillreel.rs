use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stillreel::{
    ConversionSettings, Converter, DecoderCache, DropEntry, FfmpegEngine, FillColor,
    FormatNormalizer, FpsMode, FrameSequence, HandleRegistry, IngestReport, OverlayConfig,
    OverlayPosition, PresetId, ResolutionMode, SourceBlob, mime_for_extension,
};

#[derive(Parser, Debug)]
#[command(name = "stillreel", version, about = "Turn still images into an MP4")]
struct Cli {
    /// Log debug detail (overrides RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the images a selection resolves to, in frame order.
    Scan(ScanArgs),
    /// Encode a selection into an MP4 (requires `ffmpeg`).
    Convert(ConvertArgs),
}

#[derive(Parser, Debug)]
struct ScanArgs {
    /// Files or folders; folders are searched recursively.
    #[arg(long = "in", required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// ffmpeg executable, used to decode HEIC/HEIF.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Files or folders; folders are searched recursively.
    #[arg(long = "in", required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// JSON settings document; the flags below override its fields.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// slideshow, quick, stop-motion or timelapse.
    #[arg(long)]
    preset: Option<PresetId>,

    /// auto, 720p, 1080p or WxH.
    #[arg(long)]
    resolution: Option<ResolutionMode>,

    /// auto or frames per second.
    #[arg(long)]
    fps: Option<FpsMode>,

    /// Seconds each image stays on screen.
    #[arg(long)]
    duration: Option<f64>,

    /// Border color: black or white.
    #[arg(long)]
    fill: Option<FillColor>,

    /// Image composited over every frame.
    #[arg(long)]
    overlay: Option<PathBuf>,

    #[arg(long)]
    overlay_position: Option<OverlayPosition>,

    /// Overlay width as a fraction of the output width.
    #[arg(long)]
    overlay_scale: Option<f64>,

    #[arg(long)]
    overlay_opacity: Option<f64>,

    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Scan(args) => cmd_scan(args),
        Command::Convert(args) => cmd_convert(args),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn heic_normalizer(ffmpeg: &Path) -> FormatNormalizer {
    FormatNormalizer::new(Arc::new(DecoderCache::ffmpeg(ffmpeg)))
}

fn ingest_paths(
    inputs: &[PathBuf],
    normalizer: &FormatNormalizer,
) -> anyhow::Result<IngestReport> {
    let entries = inputs
        .iter()
        .map(DropEntry::from_path)
        .collect::<Result<Vec<_>, _>>()?;
    let report = stillreel::ingest(entries, normalizer);
    for failure in &report.errors {
        tracing::warn!(name = %failure.name, error = %failure.message, "skipped");
    }
    Ok(report)
}

fn cmd_scan(args: ScanArgs) -> anyhow::Result<()> {
    let report = ingest_paths(&args.inputs, &heic_normalizer(&args.ffmpeg))?;
    for (idx, file) in report.ordered_files.iter().enumerate() {
        let size = stillreel::format_size(file.len() as u64);
        println!("{:>5}  {}  ({size})", idx + 1, file.name);
    }
    println!(
        "{} images, {} folders, {} ignored, {} converted, {} failed",
        report.ordered_files.len(),
        report.folder_count,
        report.ignored_count,
        report.normalized_count,
        report.errors.len()
    );
    if let Some(warning) = &report.warning {
        eprintln!("{warning}");
    }
    Ok(())
}

fn cmd_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let settings = load_settings(&args)?;
    let normalizer = heic_normalizer(&args.ffmpeg);
    let overlay = load_overlay(&args, &normalizer)?;

    let report = ingest_paths(&args.inputs, &normalizer)?;
    if let Some(warning) = &report.warning {
        anyhow::bail!("{warning}");
    }

    let handles = Arc::new(HandleRegistry::new());
    let mut frames = FrameSequence::new(handles.clone());
    frames.extend_from_blobs(report.ordered_files);

    let engine = Arc::new(FfmpegEngine::new(&args.ffmpeg));
    let converter = Converter::new(engine, handles);
    let artifact = converter.convert(frames.items(), &settings, &overlay)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, artifact.bytes.as_slice())
        .with_context(|| format!("write mp4 '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}, {}, {} frames)",
        args.out.display(),
        artifact.size_label(),
        artifact.resolution_label(),
        frames.len()
    );
    Ok(())
}

fn load_settings(args: &ConvertArgs) -> anyhow::Result<ConversionSettings> {
    let mut settings = match &args.settings {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read settings '{}'", path.display()))?;
            let parsed: ConversionSettings = serde_json::from_str(&text)
                .with_context(|| format!("parse settings '{}'", path.display()))?;
            parsed.validate()?;
            parsed
        }
        None => ConversionSettings::default(),
    };

    if let Some(preset) = args.preset {
        settings = settings.with_preset(preset);
    }
    if let Some(fps) = args.fps {
        settings = settings.with_fps(fps)?;
    }
    if let Some(duration) = args.duration {
        settings = settings.with_image_duration(duration)?;
    }
    if let Some(resolution) = args.resolution {
        settings = settings.with_resolution(resolution)?;
    }
    if let Some(fill) = args.fill {
        settings = settings.with_fill(fill);
    }
    Ok(settings)
}

fn load_overlay(
    args: &ConvertArgs,
    normalizer: &FormatNormalizer,
) -> anyhow::Result<OverlayConfig> {
    let Some(path) = &args.overlay else {
        return Ok(OverlayConfig::default());
    };
    let bytes =
        std::fs::read(path).with_context(|| format!("read overlay '{}'", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "overlay.png".to_string());
    let mime = path
        .extension()
        .and_then(|e| mime_for_extension(&e.to_string_lossy().to_ascii_lowercase()))
        .map(str::to_string);

    let mut outcome = normalizer.normalize_batch(vec![SourceBlob::new(name, mime, bytes)]);
    if let Some(failure) = outcome.errors.first() {
        anyhow::bail!("overlay '{}': {}", path.display(), failure.message);
    }
    let image = outcome
        .files
        .pop()
        .with_context(|| format!("overlay '{}' could not be read", path.display()))?;

    let mut overlay = OverlayConfig::with_image(image);
    if let Some(position) = args.overlay_position {
        overlay.position = position;
    }
    if let Some(scale) = args.overlay_scale {
        overlay.scale = scale;
    }
    if let Some(opacity) = args.overlay_opacity {
        overlay.opacity = opacity;
    }
    overlay.validate()?;
    Ok(overlay)
}
