//! Pipewright CLI - front-end build pipeline.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use pipewright_pipeline::Target;
use pipewright_server::LiveReloadHub;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

use config::Overrides;

#[derive(Parser)]
#[command(name = "pipewright")]
#[command(about = "Lint, bundle, minify and serve a web front-end")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to pipewright.toml config file
    #[arg(short, long, default_value = "pipewright.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Embed a content hash in the converted specification's file name
    #[arg(long, global = true)]
    rev: bool,

    /// Directory the dist/ output directory is created in
    #[arg(long, env = "OUTPUT_PATH", global = true)]
    output_path: Option<PathBuf>,

    /// Directory containing the YAML specification
    #[arg(long, env = "INPUT_PATH", global = true)]
    input_path: Option<PathBuf>,

    /// YAML specification file name
    #[arg(long, env = "INPUT_FILE", global = true)]
    input_file: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove the output directory
    Clean,

    /// Lint first-party scripts
    Lint,

    /// Build the readable and minified script bundles
    Dist,

    /// Compile stylesheets
    Less,

    /// Copy libraries, translations and static assets
    Copy,

    /// Convert the YAML specification to JSON
    YamlToJson,

    /// Clean, bundle, compile styles and copy assets (the default)
    Default,

    /// Default build plus the specification conversion
    Build,

    /// Rebuild when sources change
    Watch,

    /// Serve the output directory with live reload
    Connect(ServerArgs),

    /// Serve with live reload and rebuild on change
    Serve(ServerArgs),
}

#[derive(Args)]
struct ServerArgs {
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Open a browser once listening
    #[arg(long)]
    open: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let file = config::load_config(&cli.config)?;
    let overrides = Overrides {
        output_path: cli.output_path,
        input_path: cli.input_path,
        input_file: cli.input_file,
        rev: cli.rev,
    };
    let target = match cli.command.unwrap_or(Commands::Default) {
        Commands::Clean => Target::Clean,
        Commands::Lint => Target::Lint,
        Commands::Dist => Target::Dist,
        Commands::Less => Target::Less,
        Commands::Copy => Target::Copy,
        Commands::YamlToJson => Target::YamlToJson,
        Commands::Default => Target::Default,
        Commands::Build => Target::Build,
        Commands::Watch => {
            return commands::watch::run(file.build_config(&overrides), None).await;
        }
        Commands::Connect(args) => {
            let server = file.server_config(&overrides, args.port, args.host, args.open);
            return commands::connect::run(server, LiveReloadHub::new()).await;
        }
        Commands::Serve(args) => {
            let server = file.server_config(&overrides, args.port, args.host, args.open);
            return commands::serve::run(file.build_config(&overrides), server).await;
        }
    };

    commands::build::run(file.build_config(&overrides), target)
}
