//! hwol-oema: fills the OEMA HWOL template from a lab results workbook.
//!
//! Default: TUI form | --headless: one colored run | --preview: print the
//! mapped table instead of writing a workbook.

mod adjust;
mod determinands;
mod emit;
mod error;
mod excel;
mod extract;
mod layout;
mod mapper;
mod normalize;
mod pipeline;
mod preview;
mod tui;
mod types;
mod writer;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use crate::layout::Variant;
use crate::pipeline::{GenerationRequest, GenerationResult, Stage, Upload};
use crate::preview::PreviewFormat;

// ─────────────────────────────────────────────────────────────────────────────
// CLI
// ─────────────────────────────────────────────────────────────────────────────

/// CLI arguments for hwol-oema.
#[derive(Parser)]
#[command(name = "hwol-oema")]
#[command(about = "Fills the OEMA HWOL template from a laboratory results workbook")]
#[command(version)]
struct Cli {
    /// Lab results workbook (.xlsx).
    #[arg(long)]
    lab: Option<PathBuf>,

    /// Sample column to read, starting at 1.
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    column: u64,

    /// Lab report format.
    #[arg(long, value_enum, default_value_t = Variant::Standard)]
    variant: Variant,

    /// Template workbook (defaults to the variant's template).
    #[arg(long)]
    template: Option<PathBuf>,

    /// Directory the generated workbook is saved to.
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Custom determinand set (YAML) instead of the built-in one.
    #[arg(long)]
    determinands: Option<PathBuf>,

    /// Run once without the TUI (colored output).
    #[arg(long)]
    headless: bool,

    /// Print the mapped table instead of writing a workbook.
    #[arg(long, value_enum)]
    preview: Option<PreviewFormat>,

    /// Debug logging in headless mode.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn column(&self) -> usize {
        usize::try_from(self.column).unwrap_or(usize::MAX)
    }

    fn request(&self) -> anyhow::Result<GenerationRequest> {
        let upload = self.lab.as_deref().map(Upload::from_path).transpose()?;
        let mut request = GenerationRequest::new(upload, self.column(), self.variant);
        request.template.clone_from(&self.template);
        request.determinands.clone_from(&self.determinands);
        Ok(request)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.headless || cli.preview.is_some() {
        init_logging(cli.verbose);
    }

    if let Some(format) = cli.preview {
        return run_preview_mode(&cli, format);
    }
    if cli.headless {
        return run_headless_mode(&cli);
    }
    run_tui_mode(&cli)
}

/// Logs to stderr; `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "hwol_oema=debug" } else { "hwol_oema=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Run Modes
// ─────────────────────────────────────────────────────────────────────────────

/// Runs one request with colored step lines.
fn run_headless_mode(cli: &Cli) -> ExitCode {
    println!();
    println!("{}", "═".repeat(70).cyan());
    println!("{}", "  hwol-oema: HWOL OEMA generator".cyan().bold());
    println!("{}", "═".repeat(70).cyan());

    let request = match cli.request() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{} {e}", "ERROR:".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let upload = request.upload.as_ref().map_or("(none)", |u| u.name.as_str());
    println!("  {} {}", "Lab:".cyan().bold(), upload.white());
    println!(
        "  {} {} | {} {}",
        "Variant:".cyan().bold(),
        request.variant.label(),
        "Column:".cyan().bold(),
        request.column_selector
    );
    println!(
        "  {} {}",
        "Template:".cyan().bold(),
        request.template_path().display()
    );
    println!();

    let start = Instant::now();
    let result = pipeline::generate(&request, print_stage);
    let elapsed = start.elapsed();

    match result {
        GenerationResult::Ready(report) => {
            let table = &report.table;
            println!();
            println!(
                "  {} {}/{} determinands matched",
                "Matched:".cyan().bold(),
                table.matched_count().to_string().green(),
                table.determinand_count()
            );
            if !table.unmatched.is_empty() {
                println!(
                    "  {} {}",
                    "Unmatched:".yellow().bold(),
                    table.unmatched.join(", ").yellow()
                );
            }
            match report.artifact.save(&cli.output) {
                Ok(path) => {
                    print_final(
                        true,
                        &format!("Saved {} ({:.2}s)", path.display(), elapsed.as_secs_f64()),
                    );
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    print_final(false, &format!("Failed to save: {e}"));
                    ExitCode::FAILURE
                }
            }
        }
        GenerationResult::Failed(message) | GenerationResult::Rejected(message) => {
            print_final(false, &message);
            ExitCode::FAILURE
        }
    }
}

fn print_stage(stage: Stage) {
    match stage {
        Stage::Ready => println!("  {} {}", "✓".green().bold(), stage.label().green()),
        Stage::Failed => println!("  {} {}", "✗".red().bold(), stage.label().red()),
        _ => println!("  {} {}", "→".cyan(), stage.label().white()),
    }
}

fn print_final(success: bool, message: &str) {
    println!();
    println!("{}", "═".repeat(70).cyan());
    if success {
        println!("  {} {}", "SUCCESS:".green().bold(), message.green());
    } else {
        println!("  {} {}", "FAILED:".red().bold(), message.red());
    }
    println!("{}", "═".repeat(70).cyan());
    println!();
}

/// Prints the mapped table to stdout.
fn run_preview_mode(cli: &Cli, format: PreviewFormat) -> ExitCode {
    let outcome = cli.request().and_then(|request| {
        let table = pipeline::preview(&request, &mut |_| {})?;
        preview::write_preview(format, &table, request.variant, std::io::stdout().lock())
    });
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "ERROR:".red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Runs in TUI mode.
fn run_tui_mode(cli: &Cli) -> ExitCode {
    let settings = tui::Settings {
        lab: cli.lab.clone(),
        column: cli.column(),
        variant: cli.variant,
        template: cli.template.clone(),
        determinands: cli.determinands.clone(),
        output_dir: cli.output.clone(),
    };
    match tui::run(settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} TUI error: {e}", "ERROR:".red().bold());
            ExitCode::FAILURE
        }
    }
}
