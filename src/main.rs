//! Argus CLI - CI workflow to container-DAG converter

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use walkdir::WalkDir;

use argus::{
    ArgusConfig, ConfigStore, ConversionOutput, ConvertError, Converter, DirStore, Dispatcher,
    EnvironmentResolver, FixSuggestion, JobGraph, MemoryStore, OutputFormat, Ticket, WorkflowSpec,
};

#[derive(Parser)]
#[command(name = "argus")]
#[command(about = "Argus - convert CI workflows into container DAG workflows")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    settings: Settings,
}

/// Overrides applied on top of the config file and ARGUS_* variables
#[derive(Args)]
struct Settings {
    /// Config file (default: ~/.config/argus/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory laid out as <dir>/<namespace>/<label>.yaml
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Namespace of the runner-label entries
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// Image for jobs without a resolved or inline image
    #[arg(long, global = true)]
    default_image: Option<String>,

    /// Number of conversion workers
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Maximum number of queued conversions
    #[arg(long, global = true)]
    queue_capacity: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one workflow file
    Convert {
        /// Path to the CI workflow file
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a workflow file (parse and job graph only)
    Validate {
        /// Path to the CI workflow file
        file: PathBuf,
    },

    /// Convert every .yml/.yaml file under a directory
    Batch {
        /// Input directory
        dir: PathBuf,

        /// Output directory (mirrors the input layout)
        #[arg(long)]
        out_dir: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries the converted workflow
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            file,
            format,
            output,
        } => convert_file(&cli.settings, &file, format, output.as_deref()).await,
        Commands::Validate { file } => validate_file(&file),
        Commands::Batch {
            dir,
            out_dir,
            format,
        } => convert_dir(&cli.settings, &dir, &out_dir, format).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.downcast_ref::<ConvertError>().and_then(|e| e.fix_suggestion()) {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn load_config(settings: &Settings) -> anyhow::Result<ArgusConfig> {
    let config = match &settings.config {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            ArgusConfig::load_from(path)?
        }
        None => ArgusConfig::load()?,
    };
    let mut config = config.with_env()?;

    if let Some(dir) = &settings.store_dir {
        config.store.dir = Some(dir.clone());
    }
    if let Some(namespace) = &settings.namespace {
        config.store.namespace = namespace.clone();
    }
    if let Some(image) = &settings.default_image {
        config.converter.default_image = image.clone();
    }
    if let Some(workers) = settings.workers {
        config.dispatcher.workers = workers;
    }
    if let Some(capacity) = settings.queue_capacity {
        config.dispatcher.queue_capacity = capacity;
    }

    config.validate()?;
    Ok(config)
}

fn start_dispatcher(config: &ArgusConfig, format: OutputFormat) -> anyhow::Result<Dispatcher> {
    let store: Arc<dyn ConfigStore> = match &config.store.dir {
        Some(dir) => Arc::new(DirStore::new(dir)),
        None => Arc::new(MemoryStore::new()),
    };
    let converter = Converter::new(EnvironmentResolver::new(store, &config.store.namespace))
        .with_default_image(config.converter.default_image.as_str())
        .with_shell(config.converter.shell.as_str())
        .with_format(format);

    Ok(Dispatcher::start(config.dispatcher_config(), Arc::new(converter))?)
}

fn print_warnings(source: &Path, output: &ConversionOutput) {
    for warning in &output.warnings {
        eprintln!("{} {}: {}", "warning:".yellow().bold(), source.display(), warning);
    }
}

async fn convert_file(
    settings: &Settings,
    file: &Path,
    format: OutputFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(settings)?;
    let source = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let dispatcher = start_dispatcher(&config, format)?;
    let result = dispatcher.convert(source).await;
    dispatcher.shutdown().await;
    let converted = result?;

    print_warnings(file, &converted);
    match output {
        Some(path) => {
            tokio::fs::write(path, &converted.payload)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{} {} → {}", "✓".green(), file.display(), path.display());
        }
        None => print!("{}", converted.payload),
    }
    Ok(())
}

fn validate_file(file: &Path) -> anyhow::Result<()> {
    let source = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let workflow = WorkflowSpec::from_slice(&source)?;
    let graph = JobGraph::validated(&workflow)?;

    println!("{} Workflow '{}' is valid", "✓".green(), file.display());
    if !workflow.name.is_empty() {
        println!("  Name: {}", workflow.name);
    }
    println!("  Jobs: {}", graph.len());
    for (id, job) in &workflow.jobs {
        let needs = graph.dependencies(id);
        let label = job.target_label().unwrap_or("(none)");
        if needs.is_empty() {
            println!("    {} [{}]", id.cyan(), label);
        } else {
            println!("    {} [{}] ← {}", id.cyan(), label, needs.join(", "));
        }
    }
    Ok(())
}

/// Workflow files under `dir`, sorted for a stable submission order
fn collect_workflows(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        let is_workflow = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yml" || e == "yaml");
        if entry.file_type().is_file() && is_workflow {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Default)]
struct BatchReport {
    converted: usize,
    failed: usize,
}

impl BatchReport {
    fn record(
        &mut self,
        input_root: &Path,
        out_dir: &Path,
        source: &Path,
        result: argus::Result<ConversionOutput>,
    ) -> anyhow::Result<()> {
        match result {
            Ok(output) => {
                print_warnings(source, &output);
                let relative = source.strip_prefix(input_root).unwrap_or(source);
                let target = out_dir.join(relative).with_extension(output.format.extension());
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
                fs::write(&target, &output.payload)
                    .with_context(|| format!("failed to write {}", target.display()))?;
                println!("{} {} → {}", "✓".green(), source.display(), target.display());
                self.converted += 1;
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), source.display(), e);
                self.failed += 1;
            }
        }
        Ok(())
    }
}

async fn convert_dir(
    settings: &Settings,
    dir: &Path,
    out_dir: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let config = load_config(settings)?;
    let inputs = collect_workflows(dir)?;
    let dispatcher = start_dispatcher(&config, format)?;

    let mut report = BatchReport::default();
    let mut pending: VecDeque<(PathBuf, Ticket)> = VecDeque::new();

    for path in inputs {
        let source = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        loop {
            match dispatcher.submit(source.clone()) {
                Ok(ticket) => {
                    pending.push_back((path, ticket));
                    break;
                }
                // Busy: wait for our oldest request, then try again
                Err(ConvertError::QueueFull { .. }) => match pending.pop_front() {
                    Some((done, ticket)) => report.record(dir, out_dir, &done, ticket.await)?,
                    None => tokio::task::yield_now().await,
                },
                Err(e) => return Err(e.into()),
            }
        }
    }
    while let Some((done, ticket)) = pending.pop_front() {
        report.record(dir, out_dir, &done, ticket.await)?;
    }
    dispatcher.shutdown().await;

    println!(
        "{} converted, {} failed",
        report.converted.to_string().green(),
        report.failed.to_string().red()
    );
    if report.failed > 0 {
        bail!("{} workflow(s) failed to convert", report.failed);
    }
    Ok(())
}
