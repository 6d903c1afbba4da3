use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use upk::commands::{self, Config};

/// upk - universal package front end
///
/// One command surface for finding, installing, and managing packages
/// through pluggable providers. Sources are read from a JSON
/// configuration file; see the sources subcommand.
#[derive(Parser, Debug)]
#[command(author, version = env!("UPK_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Install root directory (overrides defaults; also via UPK_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "UPK_ROOT",
        value_name = "PATH",
        global = true
    )]
    install_root: Option<PathBuf>,

    /// Configuration file (defaults to the user config directory; also via UPK_CONFIG)
    #[arg(long = "config", env = "UPK_CONFIG", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Only use providers matching this name pattern
    #[arg(
        long = "provider",
        value_name = "NAME",
        global = true,
        default_value = ""
    )]
    provider: String,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Find packages available from configured sources
    Find(FindArgs),

    /// Install packages
    Install(InstallArgs),

    /// Uninstall installed packages
    Uninstall(UninstallArgs),

    /// Save packages to a directory without installing them
    Save(SaveArgs),

    /// Publish a package manifest to a source
    Publish(PublishArgs),

    /// List package sources
    Sources,

    /// List registered providers
    Providers,
}

#[derive(clap::Args, Debug)]
struct FindArgs {
    /// Package name patterns (wildcards allowed)
    #[arg(value_name = "NAME", required = true)]
    names: Vec<String>,

    /// Version range (a bare version means that exact version)
    #[arg(long, value_name = "RANGE")]
    version: Option<String>,

    /// Restrict the search to one source
    #[arg(long, value_name = "SOURCE")]
    source: Option<String>,

    /// Include prerelease versions
    #[arg(long)]
    prerelease: bool,
}

#[derive(clap::Args, Debug)]
struct InstallArgs {
    /// Package names
    #[arg(value_name = "NAME", required = true)]
    names: Vec<String>,

    /// Version range (a bare version means that exact version)
    #[arg(long, value_name = "RANGE")]
    version: Option<String>,

    /// Install from one source only
    #[arg(long, value_name = "SOURCE")]
    source: Option<String>,

    /// Include prerelease versions
    #[arg(long)]
    prerelease: bool,

    /// Trust all sources without prompting
    #[arg(long)]
    trust_source: bool,

    /// Emit installed packages to stdout
    #[arg(long)]
    passthru: bool,

    /// Assume yes for confirmation prompts
    #[arg(short = 'y', long)]
    yes: bool,
}

#[derive(clap::Args, Debug)]
struct UninstallArgs {
    /// Package names (no wildcards)
    #[arg(value_name = "NAME", required = true)]
    names: Vec<String>,

    /// Version range of the versions to uninstall
    #[arg(long, value_name = "RANGE")]
    version: Option<String>,

    /// Emit uninstalled packages to stdout
    #[arg(long)]
    passthru: bool,

    /// Assume yes for confirmation prompts
    #[arg(short = 'y', long)]
    yes: bool,
}

#[derive(clap::Args, Debug)]
struct SaveArgs {
    /// Package name
    #[arg(value_name = "NAME")]
    name: String,

    /// Destination directory or file
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Version range (a bare version means that exact version)
    #[arg(long, value_name = "RANGE")]
    version: Option<String>,

    /// Save from one source only
    #[arg(long, value_name = "SOURCE")]
    source: Option<String>,

    /// Include prerelease versions
    #[arg(long)]
    prerelease: bool,

    /// Trust all sources without prompting
    #[arg(long)]
    trust_source: bool,

    /// Emit saved packages to stdout
    #[arg(long)]
    passthru: bool,

    /// Assume yes for confirmation prompts
    #[arg(short = 'y', long)]
    yes: bool,
}

#[derive(clap::Args, Debug)]
struct PublishArgs {
    /// Package manifest to publish
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Publish to this source (defaults to the first configured source)
    #[arg(long, value_name = "SOURCE")]
    source: Option<String>,

    /// Emit published packages to stdout
    #[arg(long)]
    passthru: bool,

    /// Assume yes for confirmation prompts
    #[arg(short = 'y', long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = Config::load(cli.install_root, cli.config)?;

    let errors = match cli.command {
        Commands::Find(args) => {
            commands::find(
                &args.names,
                args.version.as_deref(),
                args.source.as_deref(),
                args.prerelease,
                &cli.provider,
                config,
            )
            .await?
        }
        Commands::Install(args) => {
            commands::install(
                &args.names,
                args.version.as_deref(),
                args.source.as_deref(),
                args.prerelease,
                args.trust_source,
                args.passthru,
                &cli.provider,
                args.yes,
                config,
            )
            .await?
        }
        Commands::Uninstall(args) => {
            commands::uninstall(
                &args.names,
                args.version.as_deref(),
                args.passthru,
                &cli.provider,
                args.yes,
                config,
            )
            .await?
        }
        Commands::Save(args) => {
            commands::save(
                &[args.name.clone()],
                args.path,
                args.version.as_deref(),
                args.source.as_deref(),
                args.prerelease,
                args.trust_source,
                args.passthru,
                &cli.provider,
                args.yes,
                config,
            )
            .await?
        }
        Commands::Publish(args) => {
            commands::publish(
                args.path,
                args.source.as_deref(),
                args.passthru,
                &cli.provider,
                args.yes,
                config,
            )
            .await?
        }
        Commands::Sources => {
            commands::sources(&cli.provider, config)?;
            0
        }
        Commands::Providers => {
            commands::providers(config)?;
            0
        }
    };

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}
