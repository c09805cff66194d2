//! devnest - multi-repository workspaces bound to tmux sessions
//!
//! Run with `devnest dev <WORKDIR>` or `devnest --help` for usage.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use devnest::{
    APP_NAME, LifecycleManager, Mode, Outcome, Overrides, Settings, VERSION,
    git::GitCli,
    lifecycle::{AssumeYes, Confirm, DestroyPlan, run_direct},
    tmux::TmuxExecutor,
};

#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(version = VERSION)]
#[command(about = "Multi-repository development workspaces bound to tmux sessions")]
#[command(long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or resume a workspace and attach to its tmux session
    Dev {
        /// Workspace directory; its name is the session name
        workdir: PathBuf,

        /// Kill the session and delete the workspace
        #[arg(short, long)]
        destroy: bool,

        /// Do not ask for confirmation before destroying
        #[arg(short, long, requires = "destroy")]
        yes: bool,

        /// Prompt typed into the main command (replaces the configured default)
        #[arg(short, long, conflicts_with = "destroy")]
        prompt: Option<String>,

        /// Text appended to the prompt on its own line
        #[arg(short, long, conflicts_with = "destroy")]
        extra: Option<String>,

        /// Path to config file (must exist)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run the main command here instead of in a tmux session
        #[arg(long, conflicts_with = "destroy")]
        no_tmux: bool,
    },

    /// Show the state of a workspace
    Status {
        workdir: PathBuf,

        /// Path to config file (must exist)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config {
        /// Write the defaults to the config file
        #[arg(long)]
        init: bool,

        /// Path to config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Asks on the terminal before a destroy
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, plan: &DestroyPlan) -> bool {
        eprintln!("This will:");
        for line in plan.describe().lines() {
            eprintln!("  - {line}");
        }
        eprint!("Proceed? [y/N] ");
        let _ = std::io::stderr().flush();

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

fn setup_logging(debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else {
        // Use info level for our crate, warn for dependencies
        EnvFilter::new("info")
            .add_directive("gix=warn".parse()?)
            .add_directive("tokio=warn".parse()?)
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();

    Ok(())
}

fn absolute(path: &Path) -> devnest::Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

async fn run(command: Commands) -> devnest::Result<ExitCode> {
    match command {
        Commands::Dev {
            workdir,
            destroy,
            yes,
            prompt,
            extra,
            config,
            no_tmux,
        } => {
            let workdir = absolute(&workdir)?;
            let settings = Settings::load(config.as_deref(), &Overrides { prompt, extra })?;
            let manager = LifecycleManager::new(GitCli::new(), TmuxExecutor::new());

            let mode = if destroy {
                if yes {
                    Mode::Destroy(&AssumeYes)
                } else {
                    Mode::Destroy(&StdinConfirm)
                }
            } else if no_tmux {
                Mode::EnterNoSession
            } else {
                manager.sessions().multiplexer().check_installed().await?;
                Mode::Enter
            };

            match manager.run(&workdir, mode, &settings).await? {
                Outcome::Entered { created_session } => {
                    info!(
                        "Detached from {} (session {})",
                        workdir.display(),
                        if created_session { "created" } else { "resumed" }
                    );
                }
                Outcome::Prepared => {
                    println!("Workspace ready: {}", workdir.display());
                    match run_direct(&workdir, &settings.dev).await? {
                        Some(status) if !status.success() => {
                            let code = status.code().unwrap_or(1).clamp(1, 255);
                            return Ok(ExitCode::from(code as u8));
                        }
                        Some(_) => {}
                        None => println!("No main command configured"),
                    }
                }
                Outcome::Destroyed { .. } => {
                    println!("Workspace destroyed: {}", workdir.display())
                }
                Outcome::Aborted => println!("Cancelled"),
            }
        }

        Commands::Status {
            workdir,
            config,
            json,
        } => {
            let workdir = absolute(&workdir)?;
            let settings = Settings::load(config.as_deref(), &Overrides::default())?;
            let manager = LifecycleManager::new(GitCli::new(), TmuxExecutor::new());
            let status = manager.status(&workdir, &settings).await?;

            if json {
                let text = serde_json::to_string_pretty(&status).map_err(std::io::Error::other)?;
                println!("{text}");
                return Ok(ExitCode::SUCCESS);
            }

            println!("Workspace: {}", status.root.display());
            println!("Session:   {}", status.session);
            println!("State:     {}", status.state);
            if let Some(created_at) = status.created_at {
                println!("Created:   {}", created_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            if !status.attachments.is_empty() {
                println!();
                println!("Repositories:");
                for attachment in &status.attachments {
                    let revision = attachment
                        .revision
                        .as_deref()
                        .map(|r| &r[..r.len().min(8)])
                        .unwrap_or("-");
                    println!("  {:<20} {}  {}", attachment.name, revision, attachment.url);
                }
            }
            for name in &status.missing {
                println!("  {name:<20} (configured, not attached)");
            }
            for name in &status.stale {
                println!("  {name:<20} (attached, no longer configured)");
            }
        }

        Commands::Config { init, config } => {
            let path = match &config {
                Some(path) => path.clone(),
                None => Settings::config_file_path()?,
            };

            if init {
                Settings::default().save_new(&path)?;
                println!("Configuration initialized at {:?}", path);
            } else {
                let settings = Settings::load(config.as_deref(), &Overrides::default())?;
                println!("Configuration:");
                println!("{}", settings.to_toml()?);
                println!("Config file: {:?}", path);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Install color-eyre error hooks
    color_eyre::install()?;

    let cli = Cli::parse();
    setup_logging(cli.debug)?;

    match run(cli.command).await {
        Ok(code) => Ok(code),
        Err(e) => {
            eprintln!("Error [{}]: {}", e.kind(), e);
            Ok(ExitCode::FAILURE)
        }
    }
}
