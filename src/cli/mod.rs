use crate::error::Result;
use clap::{Parser, Subcommand};

mod clean;
mod init;
mod install;
mod list;
mod progress;
mod registry_cmds;
mod remove;
mod run;
mod update;

pub use install::cmd_install;
pub use remove::cmd_remove;
pub use update::cmd_update;

#[derive(Parser, Debug)]
#[command(
    name = "pacm",
    version,
    disable_version_flag = true,
    about = "Fast, cache-first JavaScript/TypeScript package manager",
    long_about = "pacm — a cache-first package manager for the npm ecosystem.\n\nExamples:\n  pacm init\n  pacm install lodash@4.17.21\n  pacm install @types/node -D\n  pacm remove lodash\n  pacm clean"
)]
pub struct PacmCli {
    #[command(subcommand)]
    command: Commands,
    /// Print version
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,
    /// Re-extract packages even when they look installed
    #[arg(short = 'f', long = "force", global = true)]
    pub force: bool,
    /// Record explicit installs under devDependencies
    #[arg(short = 'D', long = "dev", global = true)]
    pub dev: bool,
    /// Skip postinstall scripts
    #[arg(long = "ignore-scripts", global = true)]
    pub ignore_scripts: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install packages (or everything from the lockfile/manifest)
    #[command(aliases = ["i", "add"])]
    Install { packages: Vec<String> },
    /// Remove packages and their dependency subtrees
    #[command(aliases = ["rm", "uninstall"])]
    Remove {
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// Re-resolve installed packages at their latest versions
    #[command(aliases = ["up", "upgrade"])]
    Update { packages: Vec<String> },
    /// List direct dependencies from the lockfile
    #[command(alias = "ls")]
    List,
    /// Create a fresh package.json
    Init {
        #[arg(long)]
        name: Option<String>,
        /// Accept all defaults
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
    /// Run a manifest script with node_modules/.bin on PATH
    Run {
        script: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Delete the tarball cache
    Clean,
    /// Publish the project via the ambient npm tooling
    Publish {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Search the registry
    Search { text: String },
    /// Show registry metadata for a package
    Info { name: String },
    /// Check GitHub releases for a newer pacm
    #[command(name = "self-update")]
    SelfUpdate,
    /// Print the pacm version
    Version,
}

impl PacmCli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Install { packages } => {
                install::cmd_install(packages.clone(), self.dev, self.force, self.ignore_scripts)
            }
            Commands::Remove { packages } => remove::cmd_remove(packages.clone()),
            Commands::Update { packages } => {
                update::cmd_update(packages.clone(), self.force, self.ignore_scripts)
            }
            Commands::List => list::cmd_list(),
            Commands::Init { name, yes } => init::cmd_init(name.clone(), *yes),
            Commands::Run { script, args } => run::cmd_run(script.clone(), args.clone()),
            Commands::Clean => clean::cmd_clean(),
            Commands::Publish { args } => registry_cmds::cmd_publish(args.clone()),
            Commands::Search { text } => registry_cmds::cmd_search(text),
            Commands::Info { name } => registry_cmds::cmd_info(name),
            Commands::SelfUpdate => registry_cmds::cmd_self_update(),
            Commands::Version => {
                println!("pacm {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}
