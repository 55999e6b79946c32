//! data-flow CLI - copy tables between ODBC databases.

use clap::{Parser, Subcommand};
use dataflow::progress::NoProgress;
use dataflow::{
    ConsoleProgress, FlowError, JsonProgress, OdbcConnector, Pipeline, PipelineConfig,
    ProgressSink,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "data-flow")]
#[command(about = "Copy tables between relational databases over ODBC")]
#[command(version)]
struct Cli {
    /// Path to the pipeline configuration (JSON, or YAML by extension)
    #[arg(
        short,
        long,
        env = "DF_CONFIG_FILE",
        default_value = "pipeline-config.json"
    )]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Print progress updates as JSON lines to stderr
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy every configured table, then run post scripts
    Run {
        /// Only print what would be copied, without connecting
        #[arg(long)]
        dry_run: bool,

        /// Restrict the run to these source entries (repeatable)
        #[arg(long = "database", value_name = "NAME")]
        databases: Vec<String>,
    },

    /// Connect to every source and destination and run setup SQL
    HealthCheck {
        /// Restrict the check to these source entries (repeatable)
        #[arg(long = "database", value_name = "NAME")]
        databases: Vec<String>,
    },

    /// Parse and validate the configuration file
    Validate,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), FlowError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = PipelineConfig::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    if let Some(global) = &config.global {
        global.apply_path_supplement()?;
    }

    let pipeline = Pipeline::new(config, Box::new(OdbcConnector::new()));

    match cli.command {
        Commands::Run { dry_run, databases } => {
            if dry_run {
                let plan = pipeline.plan(&databases)?;
                if cli.output_json {
                    println!("{}", serde_json::to_string_pretty(&plan)?);
                } else {
                    println!("Dry run plan:");
                    for db in &plan.databases {
                        println!("  {} -> {}", db.name, db.destination_url);
                        for table in &db.tables {
                            println!(
                                "    {} (fetch {}, batch {}): {}",
                                table.table, table.fetch_size, table.batch_size, table.query
                            );
                        }
                        for label in &db.post_scripts {
                            println!("    post script: {}", label);
                        }
                    }
                }
                return Ok(());
            }

            let progress = progress_sink(cli.progress, cli.output_json);
            let summary = pipeline.run(&databases, progress.as_ref())?;

            if cli.output_json {
                println!("{}", summary.to_json()?);
            } else {
                println!("\nCopy completed!");
                println!("  Run ID: {}", summary.run_id);
                println!("  Duration: {:.2}s", summary.duration_seconds);
                println!("  Databases: {}", summary.databases.len());
                println!("  Rows: {}", summary.rows_transferred);
            }
        }

        Commands::HealthCheck { databases } => {
            let reports = pipeline.health_check(&databases)?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                println!("Health Check Results:");
                for report in &reports {
                    println!("  {}", report.name);
                    println!("    Source: {}", report.source_product);
                    println!("    Destination: {}", report.destination_product);
                }
            }
        }

        Commands::Validate => {
            let config = pipeline.config();
            let tables: usize = config.databases.iter().map(|db| db.imports.len()).sum();
            println!(
                "Configuration is valid: {} database(s), {} table(s)",
                config.databases.len(),
                tables
            );
        }
    }

    Ok(())
}

/// JSON lines on stderr with `--progress`. Console output would interleave
/// with the JSON result on stdout, so `--output-json` alone stays quiet.
fn progress_sink(json_lines: bool, output_json: bool) -> Box<dyn ProgressSink> {
    if json_lines {
        Box::new(JsonProgress::stderr())
    } else if output_json {
        Box::new(NoProgress)
    } else {
        Box::new(ConsoleProgress::stdout())
    }
}

fn setup_logging(verbosity: &str, format: &str) {
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
}
