//! subconv CLI
//!
//! Convert SAMI and SubRip subtitle files in place (the output lands next to
//! the input with the other extension).

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use subconv::{is_subtitle_file, Charset, ConvertOptions, Converter, Format, LineDelimiter};
use walkdir::WalkDir;

const AUTO_CHARSET: &str = "auto";

#[derive(Parser, Debug)]
#[command(name = "subconv")]
#[command(version)]
#[command(about = "Convert subtitles between SAMI (.smi) and SubRip (.srt)")]
struct Cli {
    /// Subtitle files and directories to convert
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Target format, smi or srt (default: the opposite of each input)
    #[arg(short = 't', long = "to")]
    target: Option<Format>,

    /// Input charset, or "auto" to detect it
    #[arg(short = 'i', long, default_value = AUTO_CHARSET)]
    input_charset: String,

    /// Output charset
    #[arg(short = 'o', long, default_value = "UTF-8")]
    output_charset: Charset,

    /// Line delimiter of written files: unix or windows
    #[arg(short = 'l', long, default_value = "windows")]
    line_ending: LineDelimiter,

    /// Sync offset in milliseconds; negative shows captions earlier
    #[arg(short = 's', long, default_value_t = 0, allow_negative_numbers = true)]
    sync: i64,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let input_charset = if cli.input_charset.eq_ignore_ascii_case(AUTO_CHARSET) {
        None
    } else {
        Some(Charset::for_label(&cli.input_charset)?)
    };

    let options = ConvertOptions::default()
        .with_input_charset(input_charset)
        .with_output_charset(cli.output_charset)
        .with_line_delimiter(cli.line_ending)
        .with_sync(cli.sync);

    let files = collect_inputs(&cli.inputs, cli.recursive)?;
    if files.is_empty() {
        anyhow::bail!("No subtitle files found");
    }

    let results = convert_all(&files, cli.target, &options);

    let mut failures = 0;
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(output) => println!("{} -> {}", file_name(file), file_name(&output)),
            Err(e) => {
                eprintln!("{:#}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} files failed", failures, files.len());
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Expand directories into the subtitle files they hold
fn collect_inputs(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let max_depth = if recursive { usize::MAX } else { 1 };
            for entry in WalkDir::new(input).max_depth(max_depth).sort_by_file_name() {
                let entry = entry.with_context(|| format!("Failed to read: {}", input.display()))?;
                if entry.file_type().is_file() && is_subtitle_file(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else if !input.is_file() {
            warn!("Skipped (not found): {}", input.display());
        } else if is_subtitle_file(input) {
            files.push(input.clone());
        } else {
            warn!("Skipped (not .smi or .srt): {}", input.display());
        }
    }

    debug!("{} files to convert", files.len());
    Ok(files)
}

/// Convert files in parallel, one converter per file.
/// Results come back in input order.
fn convert_all(files: &[PathBuf], target: Option<Format>, options: &ConvertOptions) -> Vec<Result<PathBuf>> {
    files.par_iter().map(|file| convert(file, target, options)).collect()
}

fn convert(file: &Path, target: Option<Format>, options: &ConvertOptions) -> Result<PathBuf> {
    Converter::new(file)
        .with_options(options.clone())
        .write(target)
        .with_context(|| format!("Failed to convert: {}", file.display()))
}
