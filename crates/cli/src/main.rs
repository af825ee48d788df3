mod cmd;
mod output;
mod prompts;
mod reporter;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stackwright_lib::consts::DEFAULT_MANIFEST;

use crate::cmd::Context;
use crate::output::{OutputFormat, print_error};

/// stk - build, publish and deploy container stacks
#[derive(Parser)]
#[command(name = "stk")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Engine configuration file (default: $STACKWRIGHT_CONFIG or the user config dir)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Stack manifest
  #[arg(short, long, global = true, default_value = DEFAULT_MANIFEST)]
  file: PathBuf,

  /// Enable verbose output
  #[arg(short, long, global = true, conflicts_with = "quiet")]
  verbose: bool,

  /// Only log warnings and errors
  #[arg(short, long, global = true)]
  quiet: bool,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Check the stack manifest
  Validate,

  /// Print the variables available to component expressions
  Scope,

  /// Build every buildable component, then publish when the worktree is clean
  Build {
    /// Publish even with uncommitted changes
    #[arg(long)]
    publish: bool,

    /// Source root (default: the manifest's directory)
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Maximum concurrent builds
    #[arg(short, long)]
    jobs: Option<usize>,
  },

  /// Deploy the stack to the orchestrator
  Deploy {
    /// Print the job instead of deploying it
    #[arg(long)]
    dry_run: bool,
  },

  /// Remove every deployed resource of the stack
  Destroy {
    /// Skip confirmation prompt
    #[arg(long)]
    force: bool,
  },

  /// Stop the stack's running containers
  Stop,

  /// Show the state of each deployed component
  Status,

  /// Stream container logs
  Logs {
    /// Only this component
    component: Option<String>,
  },

  /// List images built for the stack
  Artifacts,

  /// Store the manifest as a new stack
  Register,

  /// Update a stored stack from the manifest
  Commit,

  /// Show a stored stack
  Get {
    /// Stack id
    id: String,
  },

  /// List stored stacks
  List {
    /// Only ids starting with this prefix
    #[arg(default_value = "")]
    prefix: String,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose {
    "debug"
  } else if cli.quiet {
    "warn"
  } else {
    "info"
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let ctx = Context {
    config: cli.config,
    manifest: cli.file,
    output: cli.output,
    verbose: cli.verbose,
  };

  let result = match cli.command {
    Commands::Validate => cmd::cmd_validate(&ctx),
    Commands::Scope => cmd::cmd_scope(&ctx),
    Commands::Build { publish, workdir, jobs } => cmd::cmd_build(&ctx, publish, workdir.as_deref(), jobs),
    Commands::Deploy { dry_run } => cmd::cmd_deploy(&ctx, dry_run),
    Commands::Destroy { force } => cmd::cmd_destroy(&ctx, force),
    Commands::Stop => cmd::cmd_stop(&ctx),
    Commands::Status => cmd::cmd_status(&ctx),
    Commands::Logs { component } => cmd::cmd_logs(&ctx, component.as_deref()),
    Commands::Artifacts => cmd::cmd_artifacts(&ctx),
    Commands::Register => cmd::cmd_register(&ctx),
    Commands::Commit => cmd::cmd_commit(&ctx),
    Commands::Get { id } => cmd::cmd_get(&ctx, &id),
    Commands::List { prefix } => cmd::cmd_list(&ctx, &prefix),
  };

  if let Err(e) = result {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}
