use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_citegraph::app::App;
use kira_citegraph::config::{ConfigLoader, ResolvedConfig};
use kira_citegraph::domain::CanonicalId;
use kira_citegraph::error::KiraError;
use kira_citegraph::openalex::OpenAlexHttpClient;
use kira_citegraph::output::{JsonOutput, OutputMode, StderrProgress};
use kira_citegraph::progress::ProgressSink;

#[derive(Parser)]
#[command(name = "kira-cg")]
#[command(about = "Bounded citation graphs around a seed publication, ranked from OpenAlex")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Build or hydrate citation graphs")]
    Graph(GraphArgs),
}

#[derive(Args)]
struct GraphArgs {
    #[command(subcommand)]
    command: GraphCommand,
}

#[derive(Subcommand)]
enum GraphCommand {
    #[command(about = "Build a citation graph around a work id, OpenAlex URL or DOI")]
    Build(BuildArgs),
    #[command(about = "Fetch display metadata for a list of work ids")]
    Hydrate(HydrateArgs),
}

#[derive(Args)]
struct BuildArgs {
    source: String,

    #[arg(long)]
    roots: Option<usize>,

    #[arg(long)]
    branches: Option<usize>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    out: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct HydrateArgs {
    #[arg(required = true)]
    ids: Vec<String>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    out: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::InvalidIdentifier(_) | KiraError::SeedUnavailable(_) => 2,
        KiraError::MissingConfig(_) => 2,
        KiraError::OpenAlexHttp(_)
        | KiraError::OpenAlexStatus { .. }
        | KiraError::OpenAlexDecode(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    match cli.command {
        Commands::Graph(args) => match args.command {
            GraphCommand::Build(args) => runtime.block_on(run_build(args, output_mode)),
            GraphCommand::Hydrate(args) => runtime.block_on(run_hydrate(args, output_mode)),
        },
    }
}

fn make_app(config: &ResolvedConfig) -> miette::Result<App<OpenAlexHttpClient>> {
    let client = OpenAlexHttpClient::new(&config.api)?;
    Ok(App::new(client, config.fetch))
}

fn progress_sink(output_mode: OutputMode) -> Box<dyn ProgressSink> {
    match output_mode {
        OutputMode::Interactive => Box::new(StderrProgress::default()),
        OutputMode::NonInteractive => Box::new(JsonOutput),
    }
}

async fn run_build(args: BuildArgs, output_mode: OutputMode) -> miette::Result<()> {
    let BuildArgs {
        source,
        roots,
        branches,
        config,
        out,
    } = args;

    let resolved = ConfigLoader::resolve(config.as_deref())?;
    let mut options = resolved.build.clone();
    if let Some(roots) = roots {
        options.n_roots = roots;
    }
    if let Some(branches) = branches {
        options.n_branches = branches;
    }

    let app = make_app(&resolved)?;
    let sink = progress_sink(output_mode);
    let graph = app.build_graph(&source, &options, sink.as_ref()).await?;

    match out {
        Some(path) => {
            JsonOutput::write_file(&graph, &path)?;
            if matches!(output_mode, OutputMode::Interactive) {
                eprintln!(
                    "wrote {} nodes and {} edges to {path} in {} ms",
                    graph.meta.nodes, graph.meta.edges, graph.meta.duration_ms
                );
            }
        }
        None => JsonOutput::print_graph(&graph).into_diagnostic()?,
    }
    Ok(())
}

async fn run_hydrate(args: HydrateArgs, output_mode: OutputMode) -> miette::Result<()> {
    let HydrateArgs { ids, config, out } = args;

    let ids = ids
        .iter()
        .map(|value| value.parse::<CanonicalId>())
        .collect::<Result<Vec<_>, KiraError>>()?;
    let resolved = ConfigLoader::resolve(config.as_deref())?;
    let app = make_app(&resolved)?;
    let sink = progress_sink(output_mode);
    let metadata = app.hydrate_metadata(&ids, sink.as_ref()).await;

    match out {
        Some(path) => JsonOutput::write_file(&metadata, &path)?,
        None => JsonOutput::print_metadata(&metadata).into_diagnostic()?,
    }
    Ok(())
}
