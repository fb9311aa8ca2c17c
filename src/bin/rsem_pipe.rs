use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use rsem_pipeline::app::{App, ProgressSink};
use rsem_pipeline::config::{ConfigLoader, ResolvedConfig};
use rsem_pipeline::dispatch::{DispatchOptions, SelfExecLauncher};
use rsem_pipeline::driver::SampleRequest;
use rsem_pipeline::error::PipelineError;
use rsem_pipeline::layout::{COUNT_MATRIX, SAMPLE_META};
use rsem_pipeline::output::{HumanOutput, JsonOutput, LogSink, OutputMode};
use rsem_pipeline::picard::SystemPicard;
use rsem_pipeline::rsem::SystemRsem;
use rsem_pipeline::subset::{
    DEFAULT_FILTER_COLUMN, DEFAULT_FILTER_VALUE, DEFAULT_SORT_COLUMN, SubsetOptions,
};

#[derive(Parser)]
#[command(name = "rsem-pipe")]
#[command(about = "Paired-end RNA-seq quantification with RSEM and Picard QC")]
#[command(version, author)]
struct Cli {
    /// Config file (default: ./rsem-pipe.json, then the user config dir)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Print machine-readable reports on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Process one read pair: decompress, quantify, QC, recompress")]
    Sample(SampleArgs),
    #[command(about = "Launch one sample process per read pair in a folder")]
    Dispatch(DispatchArgs),
    #[command(about = "Join per-sample results into TPM, count and QC matrices")]
    Collect(CollectArgs),
    #[command(about = "Dispatch a folder, then collect once every sample succeeded")]
    Run(DispatchArgs),
    #[command(about = "Filter and sort sample metadata and subset the count matrix")]
    Subset(SubsetArgs),
    #[command(about = "Show resolved external tools and settings")]
    Tools,
}

#[derive(Args)]
struct SampleArgs {
    output_folder: Utf8PathBuf,
    read_file_1: Utf8PathBuf,
    read_file_2: Utf8PathBuf,

    /// Run Picard QC after quantification
    #[arg(long)]
    qc: bool,
}

#[derive(Args, Clone)]
struct DispatchArgs {
    folder: Utf8PathBuf,

    /// Directory receiving one subdirectory per sample
    #[arg(long, default_value = ".")]
    workdir: Utf8PathBuf,

    /// Concurrent sample processes (default: config, then CPU count)
    #[arg(long)]
    jobs: Option<usize>,

    #[arg(long)]
    no_qc: bool,

    /// Skip samples whose directory already exists
    #[arg(long)]
    skip_existing: bool,
}

#[derive(Args)]
struct CollectArgs {
    #[arg(long, default_value = ".")]
    workdir: Utf8PathBuf,
}

#[derive(Args)]
struct SubsetArgs {
    #[arg(long, default_value = COUNT_MATRIX)]
    counts: Utf8PathBuf,

    #[arg(long, default_value = SAMPLE_META)]
    metadata: Utf8PathBuf,

    #[arg(long, default_value = DEFAULT_FILTER_COLUMN)]
    filter_column: String,

    #[arg(long, default_value = DEFAULT_FILTER_VALUE)]
    filter_value: String,

    #[arg(long, default_value = DEFAULT_SORT_COLUMN)]
    sort_by: String,

    #[arg(long, default_value = ".")]
    out_dir: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<PipelineError>() {
            return ExitCode::from(error.exit_code());
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let app = build_app(config);
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Human => &LogSink,
    };

    match cli.command {
        Commands::Sample(args) => {
            let request = SampleRequest {
                folder: args.output_folder,
                mate1: args.read_file_1,
                mate2: args.read_file_2,
                with_qc: args.qc,
            };
            let report = app.process_sample(&request, &LogSink)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_sample(&report).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_sample(&report),
            }
        }
        Commands::Dispatch(args) => {
            let options = dispatch_options(args, app.config());
            let launcher = SelfExecLauncher::new(cli.config.map(PathBuf::from))?;
            let report = app.dispatch(&options, &launcher, sink)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_dispatch(&report).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_dispatch(&report),
            }
            report.ensure_all_succeeded()?;
        }
        Commands::Collect(args) => {
            let report = app.collect(&args.workdir, sink)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_collect(&report).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_collect(&report),
            }
        }
        Commands::Run(args) => {
            let options = dispatch_options(args, app.config());
            let launcher = SelfExecLauncher::new(cli.config.map(PathBuf::from))?;
            let report = app.run(&options, &launcher, sink)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_run(&report).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_run(&report),
            }
        }
        Commands::Subset(args) => {
            let options = SubsetOptions {
                counts: args.counts,
                metadata: args.metadata,
                filter_column: args.filter_column,
                filter_value: args.filter_value,
                sort_column: args.sort_by,
                out_dir: args.out_dir,
            };
            let report = app.subset(&options, sink)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_subset(&report).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_subset(&report),
            }
        }
        Commands::Tools => {
            let report = app.tools();
            match output_mode {
                OutputMode::Json => JsonOutput::print_tools(&report).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_tools(&report),
            }
        }
    }
    Ok(())
}

fn build_app(config: ResolvedConfig) -> App<SystemRsem, SystemPicard> {
    let rsem = SystemRsem::new(config.rsem.clone());
    let picard = SystemPicard::new(config.picard.clone());
    App::new(config, rsem, picard)
}

fn dispatch_options(args: DispatchArgs, config: &ResolvedConfig) -> DispatchOptions {
    DispatchOptions {
        folder: args.folder,
        workdir: args.workdir,
        jobs: args.jobs.filter(|jobs| *jobs > 0).unwrap_or(config.jobs),
        with_qc: !args.no_qc,
        skip_existing: args.skip_existing,
    }
}
