// ============================================================================
// PhotoFE CLI — headless batch editing via command-line arguments
// ============================================================================
//
// Usage examples:
//   photofe -i photo.png -e rotate=90 -e gray -o result.png
//   photofe -i photo.jpg -e blur=2 -e undo -e sharpen=0.5 -o out.png
//   photofe -i *.jpg -e saturate=20 --output-dir processed/ --format png
//   photofe -i shot.png -e crop=640,480,0,0 --upload
//   photofe --shell                                       (interactive editing)
//
// Each input gets its own history, so `undo`/`redo` steps act per file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::error::Result;
use crate::io::SaveFormat;
use crate::ops::{EditStep, parse_steps};
use crate::project::{Project, StepOutcome};
use crate::settings::Settings;
use crate::upload::ImgurHost;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PhotoFE image editor.
///
/// Apply edit steps to image files, or start an interactive editing shell.
#[derive(Parser, Debug)]
#[command(
    name = "photofe",
    version,
    about = "PhotoFE batch image editor",
    long_about = "Apply a sequence of edits to image files without an interactive session.\n\
                  Steps run in order against a bounded undo history, so `undo` and `redo`\n\
                  may appear between edits.\n\n\
                  Steps: rotate=DEG, crop=W,H,X,Y, saturate=N, brighten=N, hue=N,\n\
                  contrast=N, lighten=N, gray, tint=N, temperature=N, blur=SIGMA,\n\
                  sharpen=AMOUNT, color=R,G,B,ALPHA, blend=FILE,ALPHA,\n\
                  perspective=X0,Y0,X1,Y1,X2,Y2,X3,Y3, undo, redo\n\n\
                  Example:\n  \
                  photofe -i photo.png -e rotate=90 -e gray -o result.png\n  \
                  photofe -i *.jpg -e contrast=30 --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, num_args = 1..)]
    pub input: Vec<String>,

    /// Edit step, repeatable; applied in the order given.
    #[arg(short, long = "edit", value_name = "STEP")]
    pub edits: Vec<String>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, webp, bmp, tga, tiff.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1-100). Defaults to the configured value.
    #[arg(short, long, value_name = "1-100", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Number of versions kept in the undo history, the original included.
    #[arg(long, value_name = "N")]
    pub history: Option<usize>,

    /// Upload each result to Imgur and print its link.
    #[arg(long)]
    pub upload: bool,

    /// Start the interactive editing shell.
    #[arg(long)]
    pub shell: bool,

    /// Print per-step progress and mirror the log to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// No inputs, or `--shell`: run interactively.
    pub fn wants_shell(&self) -> bool {
        self.shell || self.input.is_empty()
    }
}

/// Per-run options shared by every input.
struct BatchOptions<'a> {
    steps: &'a [EditStep],
    format: SaveFormat,
    quality: u8,
    capacity: usize,
    upload: bool,
    verbose: bool,
    settings: &'a Settings,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all batch processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs, settings: &Settings) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let format = match resolve_format(args.format.as_deref(), args.output.as_deref()) {
        Some(f) => f,
        None => {
            eprintln!("error: unknown output format '{}'.", args.format.as_deref().unwrap_or_default());
            return ExitCode::FAILURE;
        }
    };

    if let Some(warning) = quality_warning(format, args.quality) {
        crate::log_warn!("{}", warning);
        eprintln!("warning: {}", warning);
    }

    let steps = match parse_steps(args.edits.iter().map(String::as_str)) {
        Ok(steps) => steps,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let options = BatchOptions {
        steps: &steps,
        format,
        quality: args.quality.unwrap_or(settings.jpeg_quality),
        capacity: args.history.unwrap_or(settings.history_capacity),
        upload: args.upload,
        verbose: args.verbose,
        settings,
    };

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let Some(output_path) =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref(), format)
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &options) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                crate::log_err!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(input: &Path, output: &Path, options: &BatchOptions<'_>) -> Result<()> {
    let mut project = Project::new(options.capacity);
    project.open(input)?;

    for step in options.steps {
        match project.run_step(step)? {
            StepOutcome::Applied(label) if options.verbose => println!("  {}", label),
            StepOutcome::Undone if options.verbose => println!("  undo"),
            StepOutcome::Redone if options.verbose => println!("  redo"),
            StepOutcome::NothingToUndo => {
                crate::log_warn!("{}: undo skipped, nothing to undo", input.display());
                eprintln!("  warning: nothing to undo, step skipped");
            }
            StepOutcome::NothingToRedo => {
                crate::log_warn!("{}: redo skipped, nothing to redo", input.display());
                eprintln!("  warning: nothing to redo, step skipped");
            }
            _ => {}
        }
    }

    project.save(output, Some(options.format), options.quality)?;

    if options.upload {
        let host = ImgurHost::from_settings(options.settings)?;
        let response = project.upload(host)?.wait()?;
        println!("  uploaded: {}", response.link);
        println!("  delete:   {}", response.delete_url());
    }

    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the [`SaveFormat`] from `--format`, else from the output file
/// extension, else PNG. `None` only for an unrecognised `--format`.
fn resolve_format(format_arg: Option<&str>, output: Option<&Path>) -> Option<SaveFormat> {
    if let Some(f) = format_arg {
        return SaveFormat::from_name(f);
    }
    Some(output.and_then(SaveFormat::from_path).unwrap_or_default())
}

/// `--quality` only affects lossy formats; say so when it would be ignored.
fn quality_warning(format: SaveFormat, quality: Option<u8>) -> Option<String> {
    let quality = quality?;
    if format.supports_quality() {
        return None;
    }
    Some(format!("--quality {} has no effect on {} output", quality, format.extension()))
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}
