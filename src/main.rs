use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use laporan::cli::CommandContext;
use laporan::cli::commands::generate::{GenerateOptions, Input};
use laporan::constants::ingest::DATASET_FOLDERS;
use laporan::ingest::Source;
use laporan::types::{DatasetKind, Verdict};

#[derive(Parser)]
#[command(name = "laporan")]
#[command(
    version,
    about = "Indonesian narrative reports from institutional data, with fact validation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true, help = "Use this config file instead of the layered lookup")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a report from a summary or from record sources
    Generate {
        #[arg(
            long,
            short,
            conflicts_with_all = ["records", "data_dir"],
            required_unless_present_any = ["records", "data_dir"],
            help = "Pre-computed summary JSON"
        )]
        summary: Option<PathBuf>,
        #[arg(
            long,
            short,
            num_args = 1..,
            conflicts_with = "data_dir",
            help = "Record sources: CSV or JSON files, CSV folders, http(s) CSV URLs"
        )]
        records: Vec<String>,
        #[arg(long, help = "Aggregate the dataset folders under this directory")]
        data_dir: Option<PathBuf>,
        #[arg(
            long,
            value_delimiter = ',',
            requires = "data_dir",
            help = "Folders to aggregate (default: students, finance, akreditasi)"
        )]
        folders: Vec<String>,
        #[arg(long, help = "Use the template narrative, never call the provider")]
        offline: bool,
        #[arg(long, short, help = "Output directory for reports")]
        output: Option<PathBuf>,
        #[arg(long, short, help = "Extra instruction for the narrative")]
        prompt: Option<String>,
    },

    /// Check an existing narrative against a summary
    Validate {
        #[arg(long, short, help = "Summary JSON the narrative was written from")]
        summary: PathBuf,
        #[arg(long, short, help = "Narrative text or Markdown file")]
        narrative: PathBuf,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Generate sample student and finance reports
    Demo {
        #[arg(long, help = "Use the template narrative, never call the provider")]
        offline: bool,
    },

    /// List saved reports
    Reports {
        #[arg(long, short, value_parser = parse_kind, help = "Filter: student, finance, unknown")]
        kind: Option<DatasetKind>,
        #[arg(long, short, help = "Reports directory")]
        output: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

fn parse_kind(s: &str) -> Result<DatasetKind, String> {
    s.parse::<DatasetKind>().map_err(|e| e.to_string())
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mLaporan encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Generate {
            summary,
            records,
            data_dir,
            folders,
            offline,
            output,
            prompt,
        } => {
            let input = match (summary, data_dir) {
                (Some(path), _) => Input::Summary(path),
                (None, Some(base)) => Input::Folders {
                    base,
                    folders: if folders.is_empty() {
                        DATASET_FOLDERS.iter().map(|f| f.to_string()).collect()
                    } else {
                        folders
                    },
                },
                (None, None) if !records.is_empty() => Input::Records(
                    records
                        .iter()
                        .map(|input| Source::parse(input))
                        .collect::<laporan::Result<Vec<_>>>()?,
                ),
                (None, None) => {
                    anyhow::bail!("one of --summary, --records or --data-dir is required")
                }
            };
            let ctx = CommandContext::load(config_path, offline)?;
            let rt = Runtime::new()?;
            rt.block_on(laporan::cli::commands::generate::run(
                &ctx,
                GenerateOptions {
                    input,
                    output,
                    prompt,
                },
            ))?;
        }
        Commands::Validate {
            summary,
            narrative,
            format,
        } => {
            let ctx = CommandContext::load(config_path, true)?;
            let verdict = laporan::cli::commands::validate::run(
                &ctx.settings,
                &summary,
                &narrative,
                &format,
            )?;
            if verdict == Verdict::Fail {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Demo { offline } => {
            let ctx = CommandContext::load(config_path, offline)?;
            let rt = Runtime::new()?;
            rt.block_on(laporan::cli::commands::demo::run(&ctx))?;
        }
        Commands::Reports { kind, output } => {
            let dir = match output {
                Some(dir) => dir,
                None => CommandContext::load(config_path, true)?.config.output.dir,
            };
            laporan::cli::commands::reports::run(&dir, kind)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => {
                laporan::cli::commands::config::show(global, &format)?;
            }
            ConfigAction::Path => {
                laporan::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                if global {
                    laporan::cli::commands::config::init_global(force)?;
                } else {
                    laporan::cli::commands::config::init_project(force)?;
                }
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}
