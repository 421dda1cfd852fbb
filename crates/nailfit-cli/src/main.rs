//! nailfit CLI: measure nails from card-calibrated photos and fit designs.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use nailfit::{
    synthesize_fallback, FingerMeasurement, FingerPhoto, FingerPosition, FitMode,
    FsSessionStorage, HttpImageGenerator, ImageGenerator, NailFitter, OfflineGenerator, Photo,
    PipelineConfig, PixelMeasurements, ReplayOracle, Services, SessionId, SessionInput,
    ShapeCategory, SourceKind, StylePreferences, ThreadSleeper,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "nailfit")]
#[command(about = "Measure fingernails against a reference card and fit print-ready designs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full session: calibrate, measure, complete, design, fit.
    Analyze(CliAnalyzeArgs),

    /// Print the measurements and artifacts stored for a session.
    Show {
        /// Session storage root.
        #[arg(long)]
        out_dir: PathBuf,

        /// Session id.
        #[arg(long)]
        session: SessionId,
    },

    /// Render the fallback design for one finger without a session.
    FallbackPreview(CliFallbackArgs),

    /// Print the effective configuration as JSON.
    ConfigDump {
        /// Optional config file to load before printing.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
struct CliAnalyzeArgs {
    /// Photo containing the reference card.
    #[arg(long)]
    reference: PathBuf,

    /// Finger photo as `<position>=<path>`, e.g. `left_index=li.jpg` (repeatable).
    #[arg(long = "finger", value_parser = parse_finger_arg)]
    fingers: Vec<(FingerPosition, PathBuf)>,

    /// Recorded vision-oracle responses (`nailfit.oracle.v1`).
    #[arg(long)]
    oracle: PathBuf,

    /// Session id; outputs go to `<out-dir>/<session>/`.
    #[arg(long)]
    session: SessionId,

    /// Session storage root.
    #[arg(long)]
    out_dir: PathBuf,

    /// Pipeline config file (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print resolution override.
    #[arg(long)]
    dpi: Option<f64>,

    /// Fit mode override.
    #[arg(long, value_enum)]
    fit_mode: Option<FitModeArg>,

    /// Delay after each successful generation call, in milliseconds.
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Skip the generation service and use fallback art for every finger.
    #[arg(long)]
    offline: bool,

    /// Style keyword (e.g. "minimalist").
    #[arg(long)]
    style: Option<String>,

    /// Preferred color (repeatable).
    #[arg(long = "color")]
    colors: Vec<String>,

    /// Design theme.
    #[arg(long)]
    theme: Option<String>,

    /// Path to write the session report (JSON).
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliFallbackArgs {
    /// Finger position, e.g. `right_ring`.
    #[arg(long)]
    position: FingerPosition,

    /// Nail width in millimeters.
    #[arg(long)]
    width_mm: f64,

    /// Nail length in millimeters.
    #[arg(long)]
    length_mm: f64,

    /// Nail shape.
    #[arg(long, default_value = "oval")]
    shape: ShapeCategory,

    /// Curvature in [0, 1].
    #[arg(long, default_value = "0.35")]
    curvature: f64,

    /// Path to write the SVG document.
    #[arg(long)]
    out_svg: Option<PathBuf>,

    /// Path to write the raster (PNG).
    #[arg(long)]
    out_png: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FitModeArg {
    Stretch,
    Contain,
    Cover,
}

impl FitModeArg {
    fn to_core(self) -> FitMode {
        match self {
            Self::Stretch => FitMode::Stretch,
            Self::Contain => FitMode::Contain,
            Self::Cover => FitMode::Cover,
        }
    }
}

fn parse_finger_arg(raw: &str) -> Result<(FingerPosition, PathBuf), String> {
    let (position, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <position>=<path>, got '{raw}'"))?;
    if path.is_empty() {
        return Err(format!("missing photo path for '{position}'"));
    }
    Ok((position.parse()?, PathBuf::from(path)))
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => run_analyze(&args),
        Commands::Show { out_dir, session } => run_show(&out_dir, &session),
        Commands::FallbackPreview(args) => run_fallback_preview(&args),
        Commands::ConfigDump { config } => run_config_dump(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<PipelineConfig> {
    match path {
        Some(p) => {
            tracing::info!("Loading config: {}", p.display());
            Ok(PipelineConfig::from_json_file(p)?)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn open_photo(path: &Path) -> CliResult<Photo> {
    Photo::open(path)
        .map_err(|e| -> CliError { format!("Failed to open image {}: {}", path.display(), e).into() })
}

// ── analyze ────────────────────────────────────────────────────────────

fn run_analyze(args: &CliAnalyzeArgs) -> CliResult<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(dpi) = args.dpi {
        config.compositor.dpi = dpi;
    }
    if let Some(mode) = args.fit_mode {
        config.compositor.fit_mode = mode.to_core();
    }
    if let Some(ms) = args.delay_ms {
        config.rate_limit.delay_between_calls_ms = ms;
    }
    config.validate()?;

    let style = if args.style.is_some() || !args.colors.is_empty() || args.theme.is_some() {
        let base = config.style.clone();
        Some(StylePreferences {
            style: args.style.clone().unwrap_or(base.style),
            colors: if args.colors.is_empty() {
                base.colors
            } else {
                args.colors.clone()
            },
            theme: args.theme.clone().or(base.theme),
            ..base
        })
    } else {
        None
    };

    let oracle = ReplayOracle::from_json_file(&args.oracle)?;
    tracing::info!("Loaded oracle recordings for {} photos", oracle.len());

    let reference = open_photo(&args.reference)?;
    let mut fingers = Vec::with_capacity(args.fingers.len());
    for (position, path) in &args.fingers {
        fingers.push(FingerPhoto {
            position: *position,
            photo: open_photo(path)?,
        });
    }

    let http = if args.offline {
        None
    } else {
        match HttpImageGenerator::new(config.generation.clone()) {
            Ok(g) => Some(g),
            Err(e) => {
                tracing::warn!("Generation service unavailable ({e}); using fallback designs");
                None
            }
        }
    };
    let generator: &dyn ImageGenerator = match &http {
        Some(g) => g,
        None => &OfflineGenerator,
    };

    let storage = FsSessionStorage::new(&args.out_dir);
    let services = Services {
        oracle: &oracle,
        generator,
        storage: &storage,
        sleeper: &ThreadSleeper,
    };
    let input = SessionInput {
        reference,
        fingers,
        style,
    };

    let fitter = NailFitter::with_config(config);
    let report = fitter.analyze(&args.session, &input, &services)?;

    tracing::info!(
        "Session {}: overall confidence {:.2}, {} generated, {} fallback",
        report.session_id,
        report.measurements.overall_confidence(),
        report.generated_count(),
        report.fallback_count(),
    );
    for rec in report.measurements.recommendations() {
        tracing::info!("Recommendation: {rec}");
    }
    tracing::info!(
        "Outputs written to {}",
        storage.session_dir(&args.session).display()
    );

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, &json)?;
        tracing::info!("Report written to {}", path.display());
    }
    Ok(())
}

// ── show ───────────────────────────────────────────────────────────────

fn run_show(out_dir: &Path, session: &SessionId) -> CliResult<()> {
    let storage = FsSessionStorage::new(out_dir);
    let calibration = nailfit::get_calibration(&storage, session)?;
    let set = nailfit::get_measurement_set(&storage, session)?;
    let artifacts = nailfit::get_artifacts(&storage, session)?;

    println!("session {session}");
    println!(
        "scale: {:.4} px/mm (reference confidence {:.2})",
        calibration.pixels_per_mm, calibration.detection_confidence
    );
    println!("overall confidence: {:.2}", set.overall_confidence());
    println!();
    println!(
        "{:<13} {:>8} {:>8} {:<7} {:>5} {:<23} {:<9} {:>11}",
        "finger", "w (mm)", "l (mm)", "shape", "conf", "source", "design", "print (px)"
    );
    let mut any_estimated = false;
    for (m, a) in set.records().iter().zip(&artifacts) {
        let estimated = m.source_kind().is_estimated();
        any_estimated |= estimated;
        println!(
            "{:<13} {:>8.2} {:>8.2} {:<7} {:>5.2} {:<23} {:<9} {:>11}",
            m.position().label(),
            m.nail_width_mm(),
            m.nail_length_mm(),
            m.shape_category().as_str(),
            m.confidence(),
            format!("{:?}{}", m.source_kind(), if estimated { " *" } else { "" }),
            a.origin.as_str(),
            format!("{}x{}", a.pixel_size[0], a.pixel_size[1]),
        );
    }
    if any_estimated {
        println!("* estimated: no usable photo of this finger");
    }
    if !set.recommendations().is_empty() {
        println!();
        for rec in set.recommendations() {
            println!("- {rec}");
        }
    }
    Ok(())
}

// ── fallback-preview ───────────────────────────────────────────────────

fn run_fallback_preview(args: &CliFallbackArgs) -> CliResult<()> {
    if args.out_svg.is_none() && args.out_png.is_none() {
        return Err("nothing to write: pass --out-svg and/or --out-png".into());
    }
    // Unit scale: pixel and millimeter values coincide.
    let measurement = FingerMeasurement::from_pixels(
        args.position,
        PixelMeasurements {
            nail_width_px: args.width_mm,
            nail_length_px: args.length_mm,
            ..PixelMeasurements::default()
        },
        1.0,
        args.shape,
        args.curvature,
        1.0,
        SourceKind::Measured,
    );
    let art = synthesize_fallback(&measurement, args.position.index());
    tracing::info!("{} ({:?})", art.description, art.complexity);

    if let Some(path) = &args.out_svg {
        std::fs::write(path, art.svg.as_bytes())?;
        tracing::info!("SVG written to {}", path.display());
    }
    if let Some(path) = &args.out_png {
        art.raster.save(path)?;
        tracing::info!(
            "Raster {}x{} written to {}",
            art.raster.width(),
            art.raster.height(),
            path.display()
        );
    }
    Ok(())
}

// ── config-dump ────────────────────────────────────────────────────────

fn run_config_dump(path: Option<&Path>) -> CliResult<()> {
    let config = load_config(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
