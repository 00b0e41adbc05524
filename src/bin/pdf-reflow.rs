//! PDF Reflow CLI tool
//!
//! A command-line tool for replacing a PDF's text font and re-flowing its lines.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::process;

use pdf_reflow::{
    parse_page_selection, reflow_file, ReflowConfig, ReflowOptions, ReplacementFont,
};

/// PDF Reflow - Replace fonts and re-flow text lines to fix missing glyphs
#[derive(Parser)]
#[command(name = "pdf-reflow")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
#[command(after_help = "EXAMPLES:
    # Fix manual-zh.pdf into manual-fixed.pdf
    pdf-reflow --font NotoSansSC-Regular.otf

    # Fix pages 1 and 3 to 5 only, with smaller text
    pdf-reflow input.pdf -o output.pdf --font FiraGO-Regular.ttf --pages 1,3-5 --base-size 12

    # Take the font and layout settings from a file
    pdf-reflow input.pdf -o output.pdf --config reflow.toml

    # Show information about a PDF
    pdf-reflow info input.pdf")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    reflow: ReflowArgs,

    /// Increase log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

#[derive(Args)]
struct ReflowArgs {
    /// Input PDF file
    #[arg(default_value = "manual-zh.pdf")]
    input: PathBuf,

    /// Output PDF file path
    #[arg(short, long, default_value = "manual-fixed.pdf")]
    output: PathBuf,

    /// Replacement font (TrueType or OpenType); overrides font_path in the config
    #[arg(long)]
    font: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Font size for every line before overlap adjustment
    #[arg(long)]
    base_size: Option<f32>,

    /// Smallest font size overlap adjustment may shrink to
    #[arg(long)]
    min_size: Option<f32>,

    /// Line height as a multiple of the font size
    #[arg(long)]
    line_spacing: Option<f32>,

    /// Pages to process, e.g. "1,3-5" (default: all)
    #[arg(long)]
    pages: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Info { input }) => cmd_info(input),
        None => cmd_reflow(cli.reflow),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Reflow a PDF with a replacement font
fn cmd_reflow(args: ReflowArgs) -> anyhow::Result<()> {
    if !args.input.exists() {
        bail!("Input file not found: {}", args.input.display());
    }

    let mut config = match &args.config {
        Some(path) => ReflowConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ReflowConfig::default(),
    };

    if let Some(size) = args.base_size {
        config.base_font_size = size;
    }
    if let Some(size) = args.min_size {
        config.min_font_size = size;
    }
    if let Some(spacing) = args.line_spacing {
        config.line_spacing = spacing;
    }
    if let Some(font) = args.font {
        config.font_path = Some(font);
    }
    config.validate()?;

    let Some(font_path) = config.font_path.clone() else {
        bail!("No replacement font given; use --font or set font_path in the config");
    };
    let font = ReplacementFont::from_file(&font_path)
        .with_context(|| format!("Failed to load font {}", font_path.display()))?;
    info!("Using font {}", font.name());

    let pages = args.pages.as_deref().map(parse_page_selection).transpose()?;

    let options = ReflowOptions {
        input_path: args.input,
        output_path: args.output.clone(),
        pages,
    };

    let report = reflow_file(&options, &font, &config)
        .with_context(|| format!("Failed to reflow {}", options.input_path.display()))?;

    eprintln!(
        "Wrote {} lines on {} pages to: {}",
        report.inserted(),
        report.pages.len(),
        args.output.display()
    );
    if report.failed() > 0 {
        eprintln!("{} lines could not be written; see warnings above", report.failed());
    }

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf) -> anyhow::Result<()> {
    if !input.exists() {
        bail!("Input file not found: {}", input.display());
    }

    let metadata = pdf_reflow::pdf::extract_metadata(&input)?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }

    Ok(())
}
