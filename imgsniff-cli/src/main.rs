use anyhow::{Context, Result};
use clap::Parser;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

use imgsniff::{
    sniff, AlphaInfo, Bitmap, ByteOrder, DecoderConfig, FormatAwareDecoder, ImageKind,
    PixelLayout, TargetSize,
};

#[derive(Parser)]
#[command(name = "imgsniff")]
#[command(about = "Sniff image formats and decode them into bitmaps", long_about = None)]
#[command(version)]
struct Args {
    /// Image files, or directories to scan recursively
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Downscale WebP images narrower than this (requires --height)
    #[arg(long, value_name = "PIXELS", requires = "height")]
    width: Option<u32>,

    /// Downscale WebP images shorter than this (requires --width)
    #[arg(long, value_name = "PIXELS", requires = "width")]
    height: Option<u32>,

    /// Keep straight alpha instead of premultiplying WebP color
    #[arg(long, default_value_t)]
    straight_alpha: bool,

    /// Print a JSON array instead of one line per image
    #[arg(long, default_value_t)]
    json: bool,

    /// Verbose output
    #[arg(short, long, default_value_t)]
    verbose: bool,

    /// Quiet mode (minimal output)
    #[arg(short, long, default_value_t)]
    quiet: bool,
}

impl Args {
    fn target_size(&self) -> TargetSize {
        match (self.width, self.height) {
            (Some(width), Some(height)) => TargetSize::new(width, height),
            _ => TargetSize::NONE,
        }
    }
}

#[derive(Debug, Serialize)]
struct Report {
    path: PathBuf,
    kind: ImageKind,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Outcome {
    Decoded {
        width: u32,
        height: u32,
        bytes_per_row: usize,
        layout: PixelLayout,
        byte_order: ByteOrder,
        alpha: AlphaInfo,
    },
    Failed {
        reason: String,
    },
}

impl Outcome {
    fn from_bitmap(bitmap: &Bitmap) -> Self {
        Outcome::Decoded {
            width: bitmap.width(),
            height: bitmap.height(),
            bytes_per_row: bitmap.bytes_per_row(),
            layout: bitmap.layout(),
            byte_order: bitmap.byte_order(),
            alpha: bitmap.alpha_info(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(args.verbose, args.quiet);

    let files = collect_files(&args.inputs)?;
    log::debug!("Found {} files", files.len());

    let decoder = FormatAwareDecoder::new().with_config(DecoderConfig {
        premultiply_alpha: !args.straight_alpha,
    });
    let target = args.target_size();

    let reports: Vec<Report> = files
        .par_iter()
        .map(|path| inspect(&decoder, path, target))
        .collect();

    let failed = reports
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::Failed { .. }))
        .count();

    if args.json {
        let json = serde_json::to_string_pretty(&reports).context("Failed to serialize report")?;
        println!("{json}");
    } else if !args.quiet {
        for report in &reports {
            println!("{}", format_line(report));
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} images failed to decode", reports.len());
    }

    Ok(())
}

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn collect_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if !input.exists() {
            anyhow::bail!("Input does not exist: {}", input.display());
        }

        if input.is_dir() {
            for entry in WalkDir::new(input).sort_by_file_name() {
                let entry = entry.with_context(|| format!("Failed to walk {}", input.display()))?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(input.clone());
        }
    }

    Ok(files)
}

fn inspect(decoder: &FormatAwareDecoder, path: &Path, target: TargetSize) -> Report {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("Failed to read {}: {}", path.display(), e);
            return Report {
                path: path.to_path_buf(),
                kind: ImageKind::Unknown,
                outcome: Outcome::Failed {
                    reason: e.to_string(),
                },
            };
        }
    };

    let kind = sniff(&data);
    let outcome = match decoder.try_decode(&data, target) {
        Ok(bitmap) => Outcome::from_bitmap(&bitmap),
        Err(e) => {
            log::warn!("Failed to decode {}: {}", path.display(), e);
            Outcome::Failed {
                reason: e.to_string(),
            }
        }
    };

    Report {
        path: path.to_path_buf(),
        kind,
        outcome,
    }
}

fn format_line(report: &Report) -> String {
    let path = report.path.display();
    match &report.outcome {
        Outcome::Decoded {
            width,
            height,
            layout,
            alpha,
            ..
        } => format!(
            "{path}: {} {width}x{height} {layout:?} alpha={alpha:?}",
            report.kind
        ),
        Outcome::Failed { reason } => format!("{path}: {} failed ({reason})", report.kind),
    }
}
