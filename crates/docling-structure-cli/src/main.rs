#![allow(
    clippy::needless_pass_by_value, // clap requires owned args
    clippy::must_use_candidate,     // CLI functions don't need must_use
)]

//! docling-structure CLI - layout detection post-processing
//!
//! Reads a run input file (per-page raw detections, page geometry and optional
//! precomputed OCR strings), runs the structuring pipeline and writes the JSON
//! artifact plus its CSV projection.

mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use config::FileConfig;
use docling_structure::{
    PageInput, PrecomputedTextExtractor, SkipTextExtractor, StructureConfigBuilder,
    StructurePipeline, TextExtractor,
};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "docling-structure",
    version,
    about = "Structure layout detections into a reading-ordered heading hierarchy",
    long_about = "Structure layout detections into a reading-ordered heading hierarchy.\n\
                  \n\
                  INPUT is a JSON array of pages, or an object with a \"pages\" array.\n\
                  Each page carries pageNumber, width, height, optional scale and imagePath,\n\
                  detections as [xmin, ymin, xmax, ymax, score, classId] tuples, and optional\n\
                  precomputed OCR texts keyed by detection index.\n\
                  \n\
                  Defaults can be set via .docling-structure.toml configuration file."
)]
struct Args {
    /// Run input JSON file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// JSON output path (default: <INPUT stem>.structure.json)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// CSV output path (default: <INPUT stem>.structure.csv)
    #[arg(long, value_name = "CSV")]
    csv: Option<PathBuf>,

    /// Minimum detector score to keep a detection (default: 0.5, or from config)
    #[arg(short, long, value_name = "SCORE")]
    threshold: Option<f64>,

    /// Vertical pixel distance within which boxes share a row (default: 20, or from config)
    #[arg(long, value_name = "PIXELS")]
    row_tolerance: Option<f64>,

    /// Configuration file (replaces ~/.docling-structure.toml and ./.docling-structure.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ignore precomputed OCR texts and mark every region as skipped
    #[arg(long)]
    no_text: bool,

    /// Compact JSON output (no pretty-printing)
    #[arg(long)]
    compact: bool,

    /// Print a Markdown outline of the structure to stdout
    #[arg(long)]
    outline: bool,

    /// Show detailed processing information
    #[arg(short, long)]
    verbose: bool,
}

/// Run input: a bare page array or `{"pages": [...]}`
fn parse_pages(content: &str) -> Result<Vec<PageInput>> {
    let value: serde_json::Value =
        serde_json::from_str(content).context("Input is not valid JSON")?;
    let pages = match value {
        serde_json::Value::Array(pages) => serde_json::Value::Array(pages),
        serde_json::Value::Object(mut object) => match object.remove("pages") {
            Some(pages) => pages,
            None => bail!("Input object has no \"pages\" array"),
        },
        _ => bail!("Input must be a JSON array of pages or an object with a \"pages\" array"),
    };
    serde_json::from_value(pages).context("Invalid page input")
}

/// `report.json` → `report.structure.<extension>`
fn default_output(input: &Path, extension: &str) -> PathBuf {
    input.with_extension(format!("structure.{extension}"))
}

/// `out.json` → `out.json.tmp`, next to the destination
fn staging_path(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_owned();
    staged.push(".tmp");
    PathBuf::from(staged)
}

/// Write every output or none of them
///
/// Each file is staged beside its destination and renamed into place only
/// once all staging writes have succeeded.
fn write_outputs(outputs: &[(&Path, &str)]) -> Result<()> {
    let staged: Vec<PathBuf> = outputs.iter().map(|(path, _)| staging_path(path)).collect();
    let discard = |paths: &[PathBuf]| {
        for path in paths {
            // Missing staging files are expected here
            let _ = fs::remove_file(path);
        }
    };

    for (index, ((path, content), tmp)) in outputs.iter().zip(&staged).enumerate() {
        if let Err(err) = fs::write(tmp, content) {
            discard(&staged[..=index]);
            return Err(err).with_context(|| format!("Failed to write output: {}", path.display()));
        }
    }
    for (index, ((path, _), tmp)) in outputs.iter().zip(&staged).enumerate() {
        if let Err(err) = fs::rename(tmp, path) {
            discard(&staged[index..]);
            return Err(err).with_context(|| format!("Failed to write output: {}", path.display()));
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();
}

fn run(args: Args) -> Result<()> {
    let file_config = match &args.config {
        Some(path) => FileConfig::load_from_file(path)?,
        None => FileConfig::discover(),
    };
    debug!("File configuration: {file_config:?}");

    let mut builder = file_config.apply(StructureConfigBuilder::new())?;
    if let Some(threshold) = args.threshold {
        builder = builder.confidence_threshold(threshold);
    }
    if let Some(tolerance) = args.row_tolerance {
        builder = builder.row_tolerance(tolerance);
    }
    let config = builder.build().context("Invalid configuration")?;

    let content = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input: {}", args.input.display()))?;
    let pages = parse_pages(&content)
        .with_context(|| format!("Failed to parse input: {}", args.input.display()))?;
    info!(
        "Loaded {} pages from {}",
        pages.len(),
        args.input.display()
    );

    let precomputed;
    let extractor: &dyn TextExtractor = if args.no_text {
        &SkipTextExtractor
    } else {
        precomputed = PrecomputedTextExtractor::from_pages(&pages);
        &precomputed
    };

    let output = StructurePipeline::new(config)
        .run(&pages, extractor)
        .context("Structuring failed")?;

    // Render everything before touching the filesystem
    let json = output.to_json(!args.compact)?;
    let csv = output.to_csv()?;

    let json_path = args
        .output
        .unwrap_or_else(|| default_output(&args.input, "json"));
    let csv_path = args
        .csv
        .unwrap_or_else(|| default_output(&args.input, "csv"));

    write_outputs(&[(json_path.as_path(), json.as_str()), (csv_path.as_path(), csv.as_str())])?;
    info!("Wrote {} and {}", json_path.display(), csv_path.display());

    if args.outline {
        print!("{}", output.outline());
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(args)
}
