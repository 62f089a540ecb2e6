use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use ua_compiler::prelude::*;

/// Compile Unified Agenda XML snapshots into flat tables
#[derive(Parser, Debug)]
#[command(name = "ua-compiler")]
#[command(about = "Flatten REGINFO regulatory-agenda XML into tabular outputs")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Args, Debug, Clone)]
struct CommonArgs {
    /// XML documents or directories of documents
    #[arg(num_args = 0..)]
    inputs: Vec<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// YAML config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fail a document on any XML syntax error instead of recovering
    #[arg(long)]
    strict: bool,

    /// Documents parsed in parallel (default: 1, or UA_COMPILER_JOBS env var)
    #[arg(long)]
    jobs: Option<usize>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Csv,
    Jsonl,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One row per entity per snapshot
    Rows {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(long, value_enum, default_value = "csv")]
        format: Format,
    },

    /// Last known state per RIN, backfilled from earlier snapshots
    Last {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(long, value_enum, default_value = "csv")]
        format: Format,

        /// Restrict to snapshots YYYYMM-YYYYMM
        #[arg(long)]
        window: Option<String>,

        /// Do not fill blank fields from earlier snapshots
        #[arg(long)]
        no_backfill: bool,

        /// Field given the audited designation backfill
        #[arg(long)]
        designation_field: Option<String>,

        /// Disable the audited designation backfill
        #[arg(long, conflicts_with = "designation_field")]
        no_designation_backfill: bool,

        /// Write the designation audit log here
        #[arg(long)]
        designation_log: Option<PathBuf>,
    },

    /// One row per timetable event
    Timetables {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Distinct RINs per snapshot
    Counts {
        #[command(flatten)]
        common: CommonArgs,
    },
}

fn print_available_commands() {
    println!("Available commands:");
    println!("  rows        One row per entity per snapshot");
    println!("  last        Last known state per RIN across snapshots");
    println!("  timetables  One row per timetable event");
    println!("  counts      Distinct RINs per snapshot");
}

fn config_builder(common: &CommonArgs) -> anyhow::Result<ConfigBuilder> {
    let mut builder = match &common.config {
        Some(path) => ConfigBuilder::from_file(&ConfigFile::load(path)?)?,
        None => ConfigBuilder::new(vec![]),
    };
    builder = builder.inputs(common.inputs.clone());
    if common.strict {
        builder = builder.parse_mode(ParseMode::Strict);
    }
    if let Some(jobs) = common.jobs {
        builder = builder.jobs(jobs);
    }
    Ok(builder)
}

fn open_output(output: &Option<PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

async fn run_rows_command(common: CommonArgs, format: Format) -> anyhow::Result<()> {
    let config = config_builder(&common)?.build()?;
    let batch = BatchProcessor::new(config).collect().await?;
    let out = open_output(&common.output)?;
    match format {
        Format::Csv => table::entity_table(&batch.records).write_csv(out)?,
        Format::Jsonl => {
            let values: Vec<serde_json::Value> = batch.records.iter().map(to_structured).collect();
            table::write_json_lines(out, &values)?
        }
    }
    Ok(())
}

fn composite_json(composite: &CompositeRecord) -> serde_json::Value {
    let mut value = to_structured(&composite.record);
    if let Some(map) = value.as_object_mut() {
        map.insert("last_pub_ym".to_string(), composite.last_pub_ym().into());
        map.insert(
            "source_xml_of_last".to_string(),
            composite.source_of_last().into(),
        );
        map.insert(
            "backfilled".to_string(),
            serde_json::to_value(&composite.backfilled).unwrap_or_default(),
        );
        map.insert(
            "designation_fill".to_string(),
            serde_json::to_value(&composite.designation_fill).unwrap_or_default(),
        );
    }
    value
}

#[allow(clippy::too_many_arguments)]
async fn run_last_command(
    common: CommonArgs,
    format: Format,
    window: Option<String>,
    no_backfill: bool,
    designation_field: Option<String>,
    no_designation_backfill: bool,
    designation_log: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut builder = config_builder(&common)?;
    if let Some(window) = window {
        builder = builder.window_str(&window)?;
    }
    if no_backfill {
        builder = builder.backfill(false);
    }
    if let Some(field) = designation_field {
        builder = builder.designation_field(field);
    }
    if no_designation_backfill {
        builder = builder.no_designation_backfill();
    }
    let config = builder.build()?;
    let options = config.reduce_options();

    let batch = BatchProcessor::new(config).collect().await?;
    let composites = last_per_identity(&batch.records, &options);
    tracing::info!(identities = composites.len(), "Reduced to last state per RIN");

    let out = open_output(&common.output)?;
    match format {
        Format::Csv => table::last_table(&composites).write_csv(out)?,
        Format::Jsonl => {
            let values: Vec<serde_json::Value> = composites.iter().map(composite_json).collect();
            table::write_json_lines(out, &values)?
        }
    }

    if let Some(path) = designation_log {
        let log = table::designation_log_table(&composites);
        tracing::info!(filled = log.len(), "Writing designation audit log");
        log.write_csv_path(&path)?;
    }
    Ok(())
}

async fn run_timetables_command(common: CommonArgs) -> anyhow::Result<()> {
    let config = config_builder(&common)?.build()?;
    let batch = BatchProcessor::new(config).collect().await?;
    table::timetable_table(&batch.records).write_csv(open_output(&common.output)?)?;
    Ok(())
}

async fn run_counts_command(common: CommonArgs) -> anyhow::Result<()> {
    let config = config_builder(&common)?.build()?;
    let batch = BatchProcessor::new(config).collect().await?;
    table::counts_table(&batch.records).write_csv(open_output(&common.output)?)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Some(Command::Rows { common, format }) => run_rows_command(common, format).await,
        Some(Command::Last {
            common,
            format,
            window,
            no_backfill,
            designation_field,
            no_designation_backfill,
            designation_log,
        }) => {
            run_last_command(
                common,
                format,
                window,
                no_backfill,
                designation_field,
                no_designation_backfill,
                designation_log,
            )
            .await
        }
        Some(Command::Timetables { common }) => run_timetables_command(common).await,
        Some(Command::Counts { common }) => run_counts_command(common).await,
        None => {
            print_available_commands();
            Ok(())
        }
    }
}
