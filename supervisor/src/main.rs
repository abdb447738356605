//! Main entry point for the `srvctl` binary
//!
//! A thin front end over the supervisor library: start a server in the
//! foreground, report whether one is running, or clear its lock.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use shared::{logging, supervisor_debug, supervisor_warn, Component};
use supervisor::services::output;
use supervisor::{LaunchConfig, Launcher, StartupFailurePolicy, SupervisorError, STOP_COMMAND};

/// Launch and supervise a single server process
#[derive(Parser)]
#[command(name = "srvctl")]
#[command(about = "Launches, guards and gracefully stops a single server process")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// JSON launch configuration; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory the server runs in (and where a relative lock file lives)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Lock file path
    #[arg(long, global = true)]
    lock_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server in the foreground; terminal lines are sent as commands
    Start(StartArgs),
    /// Report whether a server is running
    Status,
    /// Delete the lock file unconditionally
    Unlock,
}

#[derive(clap::Args)]
struct StartArgs {
    /// Server JAR to run
    #[arg(long)]
    jar: Option<String>,

    /// Initial heap size (Java -Xms)
    #[arg(long)]
    xms: Option<String>,

    /// Maximum heap size (Java -Xmx)
    #[arg(long)]
    xmx: Option<String>,

    /// Seconds to wait for the ready line (0 waits until output ends)
    #[arg(long)]
    startup_timeout: Option<u64>,

    /// Seconds to wait after `stop` before signalling the server
    #[arg(long)]
    stop_timeout: Option<u64>,

    /// Delete the lock when the server dies during startup
    #[arg(long)]
    release_lock_on_failure: bool,
}

fn base_config(args: &Args) -> anyhow::Result<LaunchConfig> {
    let mut config = match &args.config {
        Some(path) => LaunchConfig::from_json_file(path)
            .with_context(|| format!("loading launch configuration {}", path.display()))?,
        None => LaunchConfig::default(),
    };
    if let Some(dir) = &args.dir {
        config = config.with_working_dir(dir);
    }
    if let Some(lock_file) = &args.lock_file {
        config = config.with_lock_path(lock_file);
    }
    Ok(config)
}

fn apply_start_args(mut config: LaunchConfig, start: &StartArgs) -> LaunchConfig {
    if start.jar.is_some() || start.xms.is_some() || start.xmx.is_some() {
        let java = LaunchConfig::java_server(
            start.jar.as_deref().unwrap_or("server.jar"),
            start.xms.as_deref().unwrap_or("1024M"),
            start.xmx.as_deref().unwrap_or("1024M"),
        );
        config.program = java.program;
        config.args = java.args;
    }
    if let Some(secs) = start.startup_timeout {
        config = config.with_startup_timeout((secs > 0).then(|| Duration::from_secs(secs)));
    }
    if let Some(secs) = start.stop_timeout {
        config = config.with_stop_timeout((secs > 0).then(|| Duration::from_secs(secs)));
    }
    if start.release_lock_on_failure {
        config = config.with_startup_failure_policy(StartupFailurePolicy::ReleaseLock);
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logging::init_tracing(Some(&args.log_level))?;

    let config = base_config(&args)?;
    match &args.command {
        Commands::Start(start) => run_server(apply_start_args(config, start)).await,
        Commands::Status => {
            let launcher = Launcher::for_config(&config);
            match launcher.registry().check().await? {
                Some(pid) => println!("Server is running (PID {pid})"),
                None => println!("Server is not running"),
            }
            Ok(())
        }
        Commands::Unlock => {
            let launcher = Launcher::for_config(&config);
            launcher.registry().delete().await?;
            println!("Removed {}", launcher.registry().path().display());
            Ok(())
        }
    }
}

async fn run_server(config: LaunchConfig) -> anyhow::Result<()> {
    logging::log_startup(
        Component::Cli,
        &format!("{} {}", config.program, config.args.join(" ")),
    );

    // Ctrl+C while waiting for readiness aborts the launch
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };
    let launched = Launcher::for_config(&config)
        .with_cancellation(cancel)
        .launch(config)
        .await;
    interrupt.abort();

    let mut server = match launched {
        Ok(server) => server,
        Err(SupervisorError::AlreadyRunning { pid, .. }) => {
            bail!("Another instance of the server is already running (PID {pid})")
        }
        Err(SupervisorError::StartupFailed { pid, last_line }) => {
            bail!("Error running server (PID {pid}); last output: {last_line}")
        }
        Err(e) => {
            logging::log_error(Component::Cli, "Launch", &e);
            return Err(e.into());
        }
    };
    println!("Server {} (PID {})", server.status(), server.pid());

    if let Some(mut out) = server.take_output() {
        tokio::spawn(async move {
            while let Ok(Some(line)) = output::next_line(&mut out).await {
                println!("{line}");
            }
        });
    }

    let mut console = BufReader::new(tokio::io::stdin()).lines();
    let mut console_open = true;
    let mut poll = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                logging::log_shutdown(Component::Cli, "Received Ctrl+C signal");
                server.stop().await?;
                break;
            }
            line = console.next_line(), if console_open => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line == STOP_COMMAND {
                        server.stop().await?;
                        break;
                    }
                    if !line.is_empty() {
                        server.send_command(line).await?;
                    }
                }
                Ok(None) | Err(_) => {
                    supervisor_debug!(Component::Cli, "Console closed; Ctrl+C stops the server");
                    console_open = false;
                }
            },
            _ = poll.tick() => {
                if !server.status().is_active() {
                    supervisor_warn!(Component::Cli, "⚠️ Server (PID {}) exited unexpectedly", server.pid());
                    server.cleanup().await?;
                    break;
                }
            }
        }
    }

    let uptime = chrono::Utc::now() - server.started_at();
    logging::log_success(
        Component::Cli,
        &format!("Server stopped after {}s ({})", uptime.num_seconds(), server.status()),
    );
    Ok(())
}
