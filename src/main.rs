//! wstrim - trim or cap the working sets of running processes

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wstrim::core::preflight;
use wstrim::core::units::parse_size;
use wstrim::monitor::{memory_status, render_status, HostStatus};
use wstrim::platform::{create_platform, ForegroundResolver, InputMonitor, Platform, SessionEnumerator};
use wstrim::{open_sink, Mode, OutputFormat, PrivilegeManager, Schedule, Scheduler, TrimConfig, TrimError, TrimPolicy};

#[derive(Parser)]
#[command(name = "wstrim")]
#[command(about = "Trim or cap the working sets of running processes", version, long_about = None)]
struct Cli {
    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Configuration file (default: <config dir>/wstrim/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trim working sets, or report their bounds
    Trim(TrimArgs),

    /// Show memory, idle time, foreground and session information
    Status,

    /// Show the effective configuration
    Config {
        /// Write it to this file instead
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
struct TrimArgs {
    /// Only processes matching this name or regex (repeatable)
    #[arg(short = 'p', long = "include", value_name = "NAME")]
    include: Vec<String>,

    /// Skip processes matching this name or regex (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "NAME")]
    exclude: Vec<String>,

    /// Only processes owned by this user (repeatable)
    #[arg(long = "include-user", value_name = "USER")]
    include_users: Vec<String>,

    /// Skip processes owned by this user (repeatable)
    #[arg(long = "exclude-user", value_name = "USER")]
    exclude_users: Vec<String>,

    /// Only this process id (repeatable)
    #[arg(long = "pid", value_name = "PID")]
    pids: Vec<u32>,

    /// Only processes in the current session
    #[arg(long)]
    this_session: bool,

    /// Only processes in this session (repeatable)
    #[arg(long = "session", value_name = "ID")]
    sessions: Vec<u32>,

    /// Skip processes in this session (repeatable)
    #[arg(long = "not-session", value_name = "ID")]
    not_sessions: Vec<u32>,

    /// Only processes in disconnected sessions
    #[arg(long)]
    disconnected: bool,

    /// Skip the process owning the foreground window
    #[arg(long)]
    not_foreground: bool,

    /// Background pass: ignore the idle gate, always skip the foreground
    #[arg(long)]
    background: bool,

    /// Only processes whose working set is above SIZE
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    above: Option<u64>,

    /// Set the working-set minimum
    #[arg(long = "min-ws", value_name = "SIZE", value_parser = parse_size)]
    min_ws: Option<u64>,

    /// Set the working-set maximum
    #[arg(long = "max-ws", value_name = "SIZE", value_parser = parse_size)]
    max_ws: Option<u64>,

    /// Make the minimum a hard limit
    #[arg(long)]
    hard_min: bool,

    /// Make the maximum a hard limit
    #[arg(long)]
    hard_max: bool,

    /// Only run once the user has been idle this many seconds
    #[arg(long, value_name = "SECS")]
    idle: Option<u64>,

    /// Only processes started after wstrim
    #[arg(long)]
    new_only: bool,

    /// Repeat until interrupted or the target processes exit
    #[arg(long = "loop")]
    repeat: bool,

    /// Seconds between passes
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,

    /// Wait for a process with this name before the first pass (repeatable)
    #[arg(long = "wait-for", value_name = "NAME")]
    wait_for: Vec<String>,

    /// Print current bounds without changing anything
    #[arg(long)]
    report: bool,

    /// Measure memory reclaimed
    #[arg(long)]
    savings: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Append reports to FILE instead of stdout
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

impl TrimArgs {
    /// Command-line flags override the configuration file.
    fn apply(&self, config: &mut TrimConfig) {
        config.include.extend(self.include.iter().cloned());
        config.exclude.extend(self.exclude.iter().cloned());
        config.include_users.extend(self.include_users.iter().cloned());
        config.exclude_users.extend(self.exclude_users.iter().cloned());
        config.pids.extend(&self.pids);
        config.sessions.extend(&self.sessions);
        config.not_sessions.extend(&self.not_sessions);
        config.wait_for.extend(self.wait_for.iter().cloned());

        config.this_session |= self.this_session;
        config.disconnected_only |= self.disconnected;
        config.exclude_foreground |= self.not_foreground;
        config.background |= self.background;
        config.hard_min |= self.hard_min;
        config.hard_max |= self.hard_max;
        config.new_only |= self.new_only;
        config.repeat |= self.repeat;
        config.savings |= self.savings;
        if self.report {
            config.mode = Mode::Report;
        }

        if let Some(above) = self.above {
            config.above_bytes = above;
        }
        if let Some(min) = self.min_ws {
            config.min_working_set = Some(min);
        }
        if let Some(max) = self.max_ws {
            config.max_working_set = Some(max);
        }
        if let Some(idle) = self.idle {
            config.idle_secs = idle;
        }
        if let Some(interval) = self.interval {
            config.interval_secs = interval;
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<TrimConfig, TrimError> {
    match path {
        Some(path) => TrimConfig::load(path),
        None => TrimConfig::load_default(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Trim(args) => trim(&args, config_path).await,
        Commands::Status => {
            status();
            Ok(())
        }
        Commands::Config { save } => show_config(config_path, save.as_deref()),
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            error!("{}", err);
            Ok(ExitCode::from(if err.is_configuration() { 2 } else { 1 }))
        }
    }
}

async fn trim(args: &TrimArgs, config_path: Option<&Path>) -> Result<(), TrimError> {
    let mut config = load_config(config_path)?;
    args.apply(&mut config);

    let policy = TrimPolicy::from_config(&config)?;
    let schedule = Schedule::from_config(&config)?;

    let platform = create_platform();
    preflight(&platform, &policy)?;
    if !platform.is_supported() {
        warn!(
            "Working sets cannot be changed on {}; processes will be listed but not modified",
            platform.platform_name()
        );
    }
    let cross_session = policy.sessions.disconnected_only || !policy.sessions.allow.is_empty();
    PrivilegeManager::new().warn_limitations(policy.has_user_filter(), cross_session);

    let mut sink = open_sink(args.format, args.output.as_deref())?;
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Cannot listen for Ctrl+C; stop the loop by ending the process");
            std::future::pending::<()>().await;
        }
        info!("Interrupted, stopping");
    };

    let mut scheduler = Scheduler::new(&platform, &policy, schedule);
    let report = scheduler.run(&mut *sink, shutdown).await?;
    if config.repeat {
        info!(
            "Stopped ({:?}) after {} passes, {} failed",
            report.stop, report.passes, report.failed_passes
        );
    }
    Ok(())
}

fn status() {
    let platform = create_platform();
    let privileges = PrivilegeManager::new();

    let status = HostStatus {
        platform: platform.platform_name(),
        privilege: privileges.level(),
        memory: memory_status(),
        idle: platform.idle_time().map_err(|e| e.to_string()),
        foreground_pid: platform.foreground_pid().map_err(|e| e.to_string()),
        session_id: platform.current_session_id().map_err(|e| e.to_string()),
        sessions: platform.list_sessions().map_err(|e| e.to_string()),
    };
    print!("{}", render_status(&status));
}

fn show_config(config_path: Option<&Path>, save: Option<&Path>) -> Result<(), TrimError> {
    let config = load_config(config_path)?;
    match save {
        Some(path) => {
            config.save(path)?;
            info!("Configuration saved to {}", path.display());
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}
