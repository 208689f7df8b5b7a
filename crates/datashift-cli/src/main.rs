//! datashift CLI - extension-based data migration engine.

mod prompt;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use datashift::orchestrator::{parse_setting_override, ConfigOverrides, DEFAULT_SETTINGS_FILE};
use datashift::{
    Direction, ExtensionRegistry, MigrateError, Orchestrator, RunConfig, RunOutcome, RunReport,
    RunSettings,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "datashift")]
#[command(about = "Extension-based data migration engine")]
#[command(version)]
struct Cli {
    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Extension package directory (created if missing)
    #[arg(long, env = "DATASHIFT_EXTENSIONS_PATH")]
    extensions_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the configured transfer operations
    Run {
        /// Source extension name
        #[arg(short = 'f', long, visible_alias = "from")]
        source: Option<String>,

        /// Sink extension name
        #[arg(short = 't', long, visible_alias = "to")]
        sink: Option<String>,

        /// Path to a JSON settings file [default: migration-settings.json if present]
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Source setting override (repeatable)
        #[arg(long = "source-setting", value_name = "KEY=VALUE")]
        source_settings: Vec<String>,

        /// Sink setting override (repeatable)
        #[arg(long = "sink-setting", value_name = "KEY=VALUE")]
        sink_settings: Vec<String>,

        /// Output the run report as JSON to stdout
        #[arg(long)]
        output_json: bool,
    },

    /// List loaded extensions
    List {
        /// Only list sources
        #[arg(long)]
        sources: bool,

        /// Only list sinks
        #[arg(long)]
        sinks: bool,
    },

    /// Write a template settings file
    Init {
        /// Output path for the settings file
        #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
        path: PathBuf,

        /// Include a two-entry Operations skeleton
        #[arg(long)]
        multi: bool,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },

    /// Emit settings metadata for one extension, or the full manifest
    Settings {
        /// Extension display name (omit for the full manifest)
        #[arg(long)]
        extension: Option<String>,

        /// Restrict to source extensions
        #[arg(long)]
        source: bool,

        /// Restrict to sink extensions
        #[arg(long)]
        sink: bool,

        /// Write JSON to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, MigrateError> {
    let cli = Cli::parse();
    setup_logging(&cli.verbosity, &cli.log_format).map_err(MigrateError::Config)?;

    let registry = Arc::new(ExtensionRegistry::discover(cli.extensions_dir.as_deref())?);

    match cli.command {
        Commands::Run {
            source,
            sink,
            settings,
            source_settings,
            sink_settings,
            output_json,
        } => {
            let cancel = setup_signal_handler();

            let file = match settings {
                Some(path) => Some(RunSettings::load(&path)?),
                None => match RunSettings::find_default() {
                    Some(path) => {
                        info!("Using settings file {:?}", path);
                        Some(RunSettings::load(&path)?)
                    }
                    None => None,
                },
            };

            let mut overrides = ConfigOverrides {
                source,
                sink,
                ..Default::default()
            };
            for spec in &source_settings {
                overrides.source_settings.push(parse_setting_override(spec)?);
            }
            for spec in &sink_settings {
                overrides.sink_settings.push(parse_setting_override(spec)?);
            }
            let config = RunConfig::resolve(file, overrides);

            let mut orchestrator = Orchestrator::new(registry, config);
            // The numbered-list fallback needs a terminal to prompt on.
            if std::io::stdin().is_terminal() && std::io::stderr().is_terminal() {
                orchestrator = orchestrator.with_selector(Arc::new(prompt::PromptSelector));
            }

            let report = orchestrator.run(cancel).await?;

            if output_json {
                println!("{}", report.to_json()?);
            } else {
                print_report(&report);
            }

            Ok(match report.outcome {
                RunOutcome::Completed => ExitCode::SUCCESS,
                RunOutcome::Failed => ExitCode::from(1),
                RunOutcome::Cancelled => ExitCode::from(130),
            })
        }

        Commands::List { sources, sinks } => {
            let both = sources == sinks;
            if both || sources {
                println!("Sources:");
                for source in registry.sources() {
                    print_extension_line(source.name(), &source.aliases());
                }
            }
            if both || sinks {
                println!("Sinks:");
                for sink in registry.sinks() {
                    print_extension_line(sink.name(), &sink.aliases());
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Init { path, multi, force } => {
            if path.exists() && !force {
                return Err(MigrateError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            let template = RunSettings::template(multi);
            let mut text = serde_json::to_string_pretty(&template)?;
            text.push('\n');
            std::fs::write(&path, text)?;
            println!("Template settings written to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Settings {
            extension,
            source,
            sink,
            output,
        } => {
            let json = match &extension {
                Some(name) => {
                    let descriptors = if sink && !source {
                        registry.find_sink(name).map(|e| e.settings())
                    } else if source && !sink {
                        registry.find_source(name).map(|e| e.settings())
                    } else {
                        registry
                            .find_source(name)
                            .map(|e| e.settings())
                            .or_else(|| registry.find_sink(name).map(|e| e.settings()))
                    };
                    let descriptors = descriptors.ok_or_else(|| {
                        MigrateError::Config(format!("No extension matches '{}'", name))
                    })?;
                    serde_json::to_string_pretty(&descriptors)?
                }
                None => {
                    let direction = if source && !sink {
                        Some(Direction::Source)
                    } else if sink && !source {
                        Some(Direction::Sink)
                    } else {
                        None
                    };
                    serde_json::to_string_pretty(&registry.build_manifest(direction))?
                }
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, json + "\n")?;
                    println!("Settings written to {}", path.display());
                }
                None => {
                    println!("<<<");
                    println!("{}", json);
                    println!(">>>");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_extension_line(name: &str, aliases: &[&str]) {
    if aliases.is_empty() {
        println!("  {}", name);
    } else {
        println!("  {} (aliases: {})", name, aliases.join(", "));
    }
}

fn print_report(report: &RunReport) {
    let heading = match report.outcome {
        RunOutcome::Completed => "Migration completed!",
        RunOutcome::Failed => "Migration failed",
        RunOutcome::Cancelled => "Migration cancelled",
    };
    println!("\n{}", heading);
    println!("  Operations: {}", report.operations.len());
    println!("  Records: {}", report.total_records);
    println!("  Duration: {:.2}s", report.duration_seconds);
    for op in &report.operations {
        println!(
            "  [{}] {} -> {}: {} read, {} written",
            op.index, op.source, op.sink, op.records_read, op.records_written
        );
        if let Some(error) = &op.error {
            println!("      error: {}", error);
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    let token_int = cancel_token.clone();
    let token_term = cancel_token.clone();

    tokio::spawn(async move {
        let Ok(mut sigint) = signal(SignalKind::interrupt()) else {
            return;
        };
        sigint.recv().await;
        eprintln!("\nReceived SIGINT. Shutting down gracefully...");
        token_int.cancel();
    });

    tokio::spawn(async move {
        let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
            return;
        };
        sigterm.recv().await;
        eprintln!("\nReceived SIGTERM. Shutting down gracefully...");
        token_term.cancel();
    });

    cancel_token
}

/// Setup signal handler for Windows (only SIGINT/Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Shutting down gracefully...");
            token.cancel();
        }
    });

    cancel_token
}
