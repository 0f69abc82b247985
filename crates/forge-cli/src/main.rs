mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    artifact::ArtifactSubcommand, config::ConfigSubcommand, project::ProjectSubcommand,
    quality::QualitySubcommand, stage::StageSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "forge",
    about = "Quality-gated product pipeline: idea → requirements → ux → technical → playbook",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root (default: nearest directory containing .forge/)
    #[arg(long, global = true, env = "FORGE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a forge workspace in the current directory
    Init {
        /// Store backend: file or redb
        #[arg(long, default_value = "file")]
        backend: String,
    },

    /// Create, list and manage projects
    Project {
        #[command(subcommand)]
        subcommand: ProjectSubcommand,
    },

    /// Submit, assess and advance pipeline stages
    Stage {
        #[command(subcommand)]
        subcommand: StageSubcommand,
    },

    /// Quality reports and assessment history
    Quality {
        #[command(subcommand)]
        subcommand: QualitySubcommand,
    },

    /// Run the multi-provider architecture consensus for a project
    Analyze {
        /// Project id
        id: String,
        /// Record the result as a consensus_report artifact
        #[arg(long)]
        record: bool,
    },

    /// Record and inspect project artifacts
    Artifact {
        #[command(subcommand)]
        subcommand: ArtifactSubcommand,
    },

    /// Export stage documents as json, yaml or markdown
    Export {
        /// Project id
        id: String,
        /// Output format: json, yaml or markdown
        #[arg(long, default_value = "markdown")]
        format: String,
        /// Comma-separated stages (default: every stage with content)
        #[arg(long, value_delimiter = ',')]
        stages: Vec<String>,
        /// Directory to write into (default: .forge/exports)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print to stdout instead of writing a file
        #[arg(long, conflicts_with = "out")]
        stdout: bool,
        /// Record the export as an artifact
        #[arg(long)]
        record: bool,
    },

    /// Inspect and validate .forge/config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Analyze { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { backend } => cmd::init::run(&root, &backend),
        Commands::Project { subcommand } => cmd::project::run(&root, subcommand, cli.json),
        Commands::Stage { subcommand } => cmd::stage::run(&root, subcommand, cli.json),
        Commands::Quality { subcommand } => cmd::quality::run(&root, subcommand, cli.json),
        Commands::Analyze { id, record } => cmd::analyze::run(&root, &id, record, cli.json),
        Commands::Artifact { subcommand } => cmd::artifact::run(&root, subcommand, cli.json),
        Commands::Export {
            id,
            format,
            stages,
            out,
            stdout,
            record,
        } => cmd::export::run(
            &root,
            cmd::export::ExportArgs {
                id,
                format,
                stages,
                out,
                stdout,
                record,
            },
            cli.json,
        ),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
