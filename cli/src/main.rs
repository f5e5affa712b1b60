//! pdf-outline CLI - heading outline extraction tool

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdf_outline::batch::{find_pdfs, output_path, run_batch_with_progress, write_atomic};
use pdf_outline::{
    load_model_or_degrade, BatchOptions, DocumentBackend, JsonFormat, LevelStrategy,
    LopdfBackend, OutlineExtractor, OutlineOptions, OutlineStyle, SizeFloor,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "pdf-outline")]
#[command(version)]
#[command(about = "Extract heading outlines from PDF documents", long_about = None)]
struct Cli {
    /// Input PDF file or directory of PDFs
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output file, or output directory for directory input
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Emit the nested outline form
    #[arg(long)]
    nested: bool,

    #[command(flatten)]
    extract: ExtractArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the outline of one PDF
    Outline {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Emit the nested outline form
        #[arg(long)]
        nested: bool,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Extract outlines of every PDF in a directory
    Batch {
        /// Input directory
        #[arg(value_name = "INPUT_DIR")]
        input: PathBuf,

        /// Output directory
        #[arg(value_name = "OUTPUT_DIR")]
        output: PathBuf,

        /// Emit the nested outline form
        #[arg(long)]
        nested: bool,

        /// Process one document at a time
        #[arg(long)]
        sequential: bool,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Dump heading candidates with their feature vectors (JSON lines)
    Features {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Show the normalised lines and font sizes of each page
    Lines {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

/// Options shared by every extracting command.
#[derive(Args, Clone)]
struct ExtractArgs {
    /// Heading model artifact (heuristics only if absent or unreadable)
    #[arg(long, value_name = "PATH", env = "PDF_OUTLINE_MODEL")]
    model: Option<PathBuf>,

    /// Level assignment strategy
    #[arg(long, value_enum, default_value = "rules")]
    strategy: Strategy,

    /// Password for encrypted documents
    #[arg(long, value_name = "PW")]
    password: Option<String>,

    /// Minimum heading font size: "auto" or points
    #[arg(long, value_name = "auto|PT", value_parser = parse_size_floor)]
    min_font_size: Option<SizeFloor>,

    /// Fail on the first unreadable page instead of skipping it
    #[arg(long)]
    strict: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Rank of the heading's font size
    Rank,
    /// Font size and numbering rules, H1..H4
    Rules,
}

impl From<Strategy> for LevelStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Rank => LevelStrategy::RankBySize,
            Strategy::Rules => LevelStrategy::RuleCascade,
        }
    }
}

fn parse_size_floor(s: &str) -> Result<SizeFloor, String> {
    SizeFloor::parse(s).map_err(|e| e.to_string())
}

impl ExtractArgs {
    fn options(&self) -> OutlineOptions {
        let mut options = OutlineOptions::new()
            .with_level_strategy(self.strategy.into())
            .with_size_floor(self.min_font_size.unwrap_or_default());
        // Batch runs should survive a damaged page.
        if !self.strict {
            options = options.lenient();
        }
        if let Some(password) = &self.password {
            options = options.with_password(password.clone());
        }
        options
    }

    fn extractor(&self) -> OutlineExtractor {
        let model = load_model_or_degrade(self.model.as_deref());
        OutlineExtractor::new(self.options()).with_model(model)
    }
}

fn style(nested: bool) -> OutlineStyle {
    if nested {
        OutlineStyle::Nested
    } else {
        OutlineStyle::Flat
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Outline {
            input,
            output,
            nested,
            compact,
            extract,
        }) => cmd_outline(&input, output.as_deref(), nested, compact, &extract),
        Some(Commands::Batch {
            input,
            output,
            nested,
            sequential,
            extract,
        }) => cmd_batch(&input, &output, nested, sequential, &extract),
        Some(Commands::Features {
            input,
            output,
            extract,
        }) => cmd_features(&input, output.as_deref(), &extract),
        Some(Commands::Lines { input, extract }) => cmd_lines(&input, &extract),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => match cli.input {
            Some(input) if input.is_dir() => {
                let output = cli.output.unwrap_or_else(|| PathBuf::from("output"));
                cmd_batch(&input, &output, cli.nested, false, &cli.extract)
            }
            Some(input) => {
                let output = cli
                    .output
                    .map(|out| resolve_file_output(&input, &out));
                cmd_outline(&input, output.as_deref(), cli.nested, false, &cli.extract)
            }
            None => {
                println!("{}", "Usage: pdf-outline <INPUT> [OUTPUT]".yellow());
                println!("       pdf-outline --help for more information");
                Ok(())
            }
        },
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// An existing directory as output means "write `<stem>.json` inside it".
fn resolve_file_output(input: &Path, output: &Path) -> PathBuf {
    if output.is_dir() {
        output_path(input, output)
    } else {
        output.to_path_buf()
    }
}

fn cmd_outline(
    input: &Path,
    output: Option<&Path>,
    nested: bool,
    compact: bool,
    extract: &ExtractArgs,
) -> CliResult {
    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let outline = extract.extractor().extract_file(input)?;
    let json = pdf_outline::render::render(&outline, style(nested), format)?;

    if let Some(path) = output {
        write_atomic(path, &json)?;
        println!(
            "{} {} ({} headings)",
            "Saved to".green(),
            path.display(),
            outline.len()
        );
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_batch(
    input: &Path,
    output: &Path,
    nested: bool,
    sequential: bool,
    extract: &ExtractArgs,
) -> CliResult {
    let total = find_pdfs(input)?.len();
    if total == 0 {
        println!("{} no PDF files in {}", "Nothing to do:".yellow(), input.display());
        return Ok(());
    }

    let extractor = extract.extractor();
    let options = BatchOptions {
        style: style(nested),
        format: JsonFormat::Pretty,
        parallel: !sequential,
    };

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("Extracting outlines...");

    let report = run_batch_with_progress(input, output, &extractor, &options, |_| pb.inc(1))?;
    pb.finish_with_message("Done!");

    println!(
        "\n{} {} of {} documents -> {}",
        "Processed".green().bold(),
        report.written.len(),
        report.total(),
        output.display()
    );
    for failure in &report.failures {
        println!("  {} {}: {}", "✗".red(), failure.input.display(), failure.error);
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(format!("{} documents failed", report.failures.len()).into())
    }
}

fn cmd_features(input: &Path, output: Option<&Path>, extract: &ExtractArgs) -> CliResult {
    let mut backend = LopdfBackend::open(input)?;
    let records = extract.extractor().feature_records(&mut backend)?;

    let mut out = String::new();
    for record in &records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }

    if let Some(path) = output {
        fs::write(path, &out)?;
        println!("{} {} ({} candidates)", "Saved to".green(), path.display(), records.len());
    } else {
        std::io::stdout().write_all(out.as_bytes())?;
    }

    Ok(())
}

fn cmd_lines(input: &Path, extract: &ExtractArgs) -> CliResult {
    let mut backend = LopdfBackend::open(input)?;
    let document = extract.extractor().document_lines(&mut backend)?;

    println!("{}", "Font Sizes".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {:.1}", "Body".bold(), document.stats.body_size());
    println!("{}: {:.1}", "Max".bold(), document.stats.max_size());
    println!("{}: {:.1}", "Min".bold(), document.stats.min_size());
    println!("{}: {:.1}", "P20".bold(), document.stats.percentile(0.2));

    let mut current_page = 0;
    for line in &document.lines {
        if line.page != current_page {
            current_page = line.page;
            println!();
            println!("{}", format!("Page {}", current_page).cyan().bold());
            println!("{}", "─".repeat(40).dimmed());
        }
        let fonts: Vec<&str> = line.fonts.iter().map(String::as_str).collect();
        println!(
            "{} {} {} {}",
            format!("y={:>6.1}", line.y()).dimmed(),
            format!("{:>5.1}pt", line.font_size).yellow(),
            line.text,
            format!("[{}]", fonts.join(", ")).dimmed()
        );
    }

    Ok(())
}

fn cmd_info(input: &Path) -> CliResult {
    let backend = LopdfBackend::open(input)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), backend.version());
    println!("{}: {}", "Pages".bold(), backend.page_count());
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if backend.is_encrypted() { "Yes" } else { "No" }
    );
    if let Some(title) = backend.title() {
        println!("{}: {}", "Title".bold(), title);
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdf-outline".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF heading outline extraction tool");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let into_dir = resolve_file_output(Path::new("in/report.pdf"), dir.path());
        assert_eq!(into_dir, dir.path().join("report.json"));

        let file = dir.path().join("custom.json");
        assert_eq!(resolve_file_output(Path::new("in/report.pdf"), &file), file);
    }

    #[test]
    fn test_extract_args_to_options() {
        let cli = Cli::parse_from([
            "pdf-outline",
            "doc.pdf",
            "--strategy",
            "rank",
            "--min-font-size",
            "auto",
            "--password",
            "pw",
        ]);
        let options = cli.extract.options();
        assert_eq!(options.level_strategy, LevelStrategy::RankBySize);
        assert_eq!(options.size_floor, SizeFloor::Percentile(0.2));
        assert_eq!(options.password.as_deref(), Some("pw"));
        assert_eq!(options.error_mode, pdf_outline::ErrorMode::Lenient);
    }

    #[test]
    fn test_strict_flag() {
        let cli = Cli::parse_from(["pdf-outline", "outline", "doc.pdf", "--strict"]);
        match cli.command {
            Some(Commands::Outline { extract, .. }) => {
                assert_eq!(extract.options().error_mode, pdf_outline::ErrorMode::Strict);
            }
            _ => panic!("expected outline command"),
        }
    }

    #[test]
    fn test_rejects_bad_size_floor() {
        assert!(Cli::try_parse_from(["pdf-outline", "doc.pdf", "--min-font-size", "big"]).is_err());
    }
}
