//! CLI entry point for `mboxconvert`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, CommandFactory, Parser, Subcommand};

use mboxconvert::config::{self, Config};
use mboxconvert::parser::archive;
use mboxconvert::{Conversion, ConvertError, FormatSelection};

#[derive(Parser)]
#[command(
    name = "mboxconvert",
    version,
    about = "Convert MBOX mail archives to Excel, CSV, or TXT"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an MBOX file to the selected formats
    Convert {
        /// MBOX file to convert
        path: PathBuf,
        /// Directory to write the converted files into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        /// Name used to derive output file names (defaults to the input file name)
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        formats: FormatFlags,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the first messages of an MBOX file
    Preview {
        path: PathBuf,
        /// Number of messages to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// Print the effective configuration
    Config {
        /// Also write it to the config file location
        #[arg(long)]
        save: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// Output format switches. None given means the configured default.
#[derive(Args)]
struct FormatFlags {
    /// Produce an Excel workbook (.xlsx)
    #[arg(long)]
    xlsx: bool,
    /// Produce a CSV file (.csv)
    #[arg(long)]
    csv: bool,
    /// Produce a readable text dump (.txt)
    #[arg(long)]
    txt: bool,
}

impl FormatFlags {
    fn selection(&self, default: FormatSelection) -> FormatSelection {
        if !(self.xlsx || self.csv || self.txt) {
            return default;
        }
        FormatSelection {
            csv: self.csv,
            xlsx: self.xlsx,
            txt: self.txt,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Convert {
            path,
            output,
            name,
            formats,
            json,
        } => {
            let selection = formats.selection(config.export.formats);
            cmd_convert(&path, &output, name.as_deref(), selection, json, &config)
        }
        Commands::Preview { path, limit } => cmd_preview(&path, limit, &config),
        Commands::Config { save } => cmd_config(&config, save),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let log_name = config::log_file_path(config)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "mboxconvert.log".into());
        let file_appender = tracing_appender::rolling::never(&log_dir, log_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Convert one archive and write the selected outputs to `output_dir`.
fn cmd_convert(
    path: &Path,
    output_dir: &Path,
    name: Option<&str>,
    selection: FormatSelection,
    json: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let bytes = read_archive(path)?;
    let display_name = match name {
        Some(n) => n.to_string(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let start = Instant::now();
    let conversion = match mboxconvert::convert(
        &bytes,
        &display_name,
        selection,
        &config.convert_options(),
    ) {
        Err(ConvertError::NoConvertibleContent) => {
            anyhow::bail!(
                "No emails found in '{}', or the file could not be processed. \
                 Please ensure it is a valid mbox file.",
                path.display()
            );
        }
        other => other?,
    };
    let elapsed = start.elapsed();

    std::fs::create_dir_all(output_dir)
        .map_err(|e| ConvertError::io(output_dir, e))?;
    let mut written = Vec::with_capacity(conversion.outputs.len());
    for file in &conversion.outputs {
        let target = output_dir.join(&file.file_name);
        std::fs::write(&target, &file.data).map_err(|e| ConvertError::io(&target, e))?;
        written.push(target);
    }

    for warning in &conversion.warnings {
        eprintln!("  warning: {warning}");
    }
    for failure in &conversion.failures {
        eprintln!("  error: {} export failed: {}", failure.format, failure.error);
    }

    if json {
        print_summary_json(&conversion, &written, elapsed)?;
    } else {
        print_summary_table(&conversion, &written, elapsed);
    }

    if !conversion.failures.is_empty() && conversion.outputs.is_empty() {
        anyhow::bail!("All selected exports failed");
    }
    Ok(())
}

/// Print the first `limit` records of an archive.
fn cmd_preview(path: &Path, limit: usize, config: &Config) -> anyhow::Result<()> {
    let bytes = read_archive(path)?;
    let parsed = archive::parse_archive(&bytes, &config.convert_options().parse);
    if parsed.is_empty() {
        anyhow::bail!("No emails found in '{}'", path.display());
    }

    println!();
    println!(
        "  {:<5} {:<30} {:<24} {:<24} {:<25} {:>8}",
        "Index", "Subject", "From", "To", "Date", "Length"
    );
    println!("  {}", "-".repeat(121));

    for record in parsed.records.iter().take(limit) {
        println!(
            "  {:<5} {:<30} {:<24} {:<24} {:<25} {:>8}",
            record.index,
            truncate(&record.subject, 29),
            truncate(&record.from, 23),
            truncate(&record.to, 23),
            truncate(&record.date, 25),
            record.body_length()
        );
    }

    if parsed.records.len() > limit {
        println!();
        println!(
            "  Showing first {} of {} emails",
            limit,
            parsed.records.len()
        );
    }
    println!();
    Ok(())
}

/// Print the effective configuration as TOML, optionally saving it.
fn cmd_config(config: &Config, save: bool) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    if save {
        let path = config::save_config(config)?;
        eprintln!("  Saved to {}", path.display());
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxconvert", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

fn read_archive(path: &Path) -> anyhow::Result<Vec<u8>> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    Ok(std::fs::read(path).map_err(|e| ConvertError::io(path, e))?)
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Print a human-readable conversion summary.
fn print_summary_table(conversion: &Conversion, written: &[PathBuf], elapsed: std::time::Duration) {
    use humansize::{format_size, BINARY};

    println!();
    println!(
        "  Successfully processed {} emails in {:.2?}",
        conversion.records.len(),
        elapsed
    );
    if !conversion.warnings.is_empty() {
        println!("  {:<20} {}", "Skipped", conversion.warnings.len());
    }
    println!();
    for (file, path) in conversion.outputs.iter().zip(written) {
        println!(
            "  {:<6} {:>10}  {}",
            file.format,
            format_size(file.data.len(), BINARY),
            path.display()
        );
    }
    println!();
}

/// Print the conversion summary as JSON.
fn print_summary_json(
    conversion: &Conversion,
    written: &[PathBuf],
    elapsed: std::time::Duration,
) -> anyhow::Result<()> {
    let outputs: Vec<serde_json::Value> = conversion
        .outputs
        .iter()
        .zip(written)
        .map(|(file, path)| {
            serde_json::json!({
                "format": file.format,
                "file_name": file.file_name,
                "media_type": file.media_type,
                "size": file.data.len(),
                "path": path.to_string_lossy(),
            })
        })
        .collect();

    let failures: Vec<serde_json::Value> = conversion
        .failures
        .iter()
        .map(|f| {
            serde_json::json!({
                "format": f.format,
                "error": f.error.to_string(),
            })
        })
        .collect();

    let summary = serde_json::json!({
        "message_count": conversion.records.len(),
        "warnings": conversion.warnings,
        "outputs": outputs,
        "failures": failures,
        "elapsed_ms": elapsed.as_millis(),
    });

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
