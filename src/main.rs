use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use dunner::config::Configs;
use dunner::docker::DockerCli;
use dunner::dunner::{task_names, TaskRunner};
use dunner::env::HostEnv;
use dunner::settings::{RunSettings, DEFAULT_DOTENV_FILE, DEFAULT_TASK_FILE};

/// Run multi-step build and CI tasks inside ephemeral Docker containers
#[derive(Parser)]
#[command(name = "dunner", version, about, long_about = None)]
struct Cli {
    /// Path of the dunner task file
    #[arg(short = 't', long, default_value = DEFAULT_TASK_FILE, global = true)]
    task_file: PathBuf,

    /// Path of the environment file overriding host variables
    #[arg(short = 'e', long = "env-file", default_value = DEFAULT_DOTENV_FILE, global = true)]
    env_file: PathBuf,

    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a task from the task file
    Run {
        /// Name of the task to execute
        task: String,

        /// Positional arguments substituted for $1, $2, ... in commands
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,

        /// Run all steps of the task concurrently
        #[arg(short = 'A', long = "async")]
        async_mode: bool,

        /// Create and start containers but skip command execution
        #[arg(long)]
        dry_run: bool,

        /// Pull images even when present locally
        #[arg(long)]
        force_pull: bool,

        /// Host directory mounted into every container
        #[arg(short = 'w', long, default_value = "./")]
        working_dir: PathBuf,
    },
    /// Check the task file for errors without executing anything
    Validate,
    /// List the tasks defined in the task file
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "dunner=info",
        1 => "dunner=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let env = HostEnv::with_dotenv(&cli.env_file);

    match cli.command {
        Commands::Run {
            task,
            args,
            async_mode,
            dry_run,
            force_pull,
            working_dir,
        } => {
            let mut verbose = cli.verbose > 0;
            if async_mode && verbose {
                warn!("Silencing verbose in asynchronous mode");
                verbose = false;
            }

            let settings = RunSettings {
                task_file: cli.task_file.clone(),
                dotenv_file: cli.env_file.clone(),
                working_directory: working_dir,
                async_mode,
                verbose,
                dry_run,
                force_pull,
            };

            let configs = load_validated(&cli.task_file, &env)?;
            let runner = TaskRunner::new(
                configs,
                settings,
                Arc::new(DockerCli::production()),
                Arc::new(env),
            );
            runner.exec_task(&task, args).await?;
        }
        Commands::Validate => {
            let configs = Configs::load(&cli.task_file, &env)?;
            let errors = configs.validate(&env);
            if !errors.is_empty() {
                println!("Validation failed with following errors:");
                for error in &errors {
                    println!("{error}");
                }
                std::process::exit(1);
            }
            println!("Validation successful");
        }
        Commands::List => {
            let configs = load_validated(&cli.task_file, &env)?;
            let names = task_names(&configs);
            if names.is_empty() {
                println!("No dunner tasks found");
            } else {
                println!("Available Dunner tasks:");
                for name in names {
                    println!("{name}");
                }
                println!("Run `dunner run <task_name>` to run a dunner task.");
            }
        }
    }
    Ok(())
}

fn load_validated(task_file: &Path, env: &HostEnv) -> anyhow::Result<Configs> {
    let configs = Configs::load(task_file, env)?;
    let errors = configs.validate(env);
    if !errors.is_empty() {
        println!("Validation failed with following errors:");
        for error in &errors {
            println!("{error}");
        }
        std::process::exit(1);
    }
    Ok(configs)
}
