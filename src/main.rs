use clap::{Parser, Subcommand};
use hive_lib::commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "hive")]
#[command(about = "Local orchestration layer for long-running coding-assistant drones")]
#[command(version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Hive in the current git repository
    Init,

    /// Launch a drone on plans/<name>.*
    Start {
        name: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        profile: Option<String>,
        /// Run in the current directory instead of a worktree
        #[arg(long)]
        local: bool,
        /// Validate and report what would happen, without spawning
        #[arg(long)]
        dry_run: bool,
    },

    /// Gracefully stop a running drone
    Stop { name: String },

    /// [DEPRECATED] Use 'stop' instead
    #[command(hide = true)]
    Kill { name: String },

    /// Stop, remove worktree, remove drone directory
    Clean {
        name: String,
        #[arg(long)]
        force: bool,
    },

    /// Show drone status
    #[command(alias = "list")]
    Status {
        #[arg(long)]
        interactive: bool,
        #[arg(long)]
        follow: bool,
    },

    /// Read activity.log or a task's attempt log
    Logs {
        name: String,
        #[arg(long)]
        task: Option<usize>,
        #[arg(long)]
        attempt: Option<u32>,
        #[arg(short, long)]
        follow: bool,
        #[arg(long)]
        raw: bool,
    },

    /// Resolve a blocked drone
    Unblock {
        name: String,
        #[arg(long)]
        resolution: Option<String>,
    },

    /// Manage assistant invocation profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Browse captured session transcripts
    Sessions { name: Option<String> },

    /// Emit a status line for embedding in a prompt; reads JSON from stdin
    Statusline,
}

#[derive(Subcommand)]
enum ProfileCommands {
    List,
    Add {
        name: String,
        command: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, num_args = 0..)]
        args: Vec<String>,
    },
    Rm {
        name: String,
    },
    SetDefault {
        name: String,
    },
}

/// Exit codes per the external-interfaces table: 0 ok, 2 plan invalid,
/// 3 already running / blocked without unblock, 4 spawn failed / kill
/// escalation exhausted.
fn start_exit_code(message: &str) -> i32 {
    if message.contains("already running") || message.contains("is blocked") {
        3
    } else if message.contains("escalation exhausted") || message.contains("spawning assistant binary") {
        4
    } else if message.contains("plan '") {
        2
    } else {
        1
    }
}

fn stop_exit_code(message: &str) -> i32 {
    if message.contains("escalation exhausted") {
        4
    } else {
        1
    }
}

fn run_fallible(f: impl FnOnce() -> anyhow::Result<()>, exit_code: impl FnOnce(&str) -> i32) {
    if let Err(e) = f() {
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code(&e.to_string()));
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => run_fallible(commands::init::run, |_| 1),
        Commands::Start {
            name,
            model,
            profile,
            local,
            dry_run,
        } => run_fallible(
            || commands::start::run(name, model, profile, local, dry_run),
            start_exit_code,
        ),
        Commands::Stop { name } => run_fallible(|| commands::stop::run(name), stop_exit_code),
        Commands::Kill { name } => {
            eprintln!("Warning: 'hive kill' is deprecated. Use 'hive stop' instead.");
            run_fallible(|| commands::stop::run(name), stop_exit_code);
        }
        Commands::Clean { name, force } => {
            run_fallible(|| commands::clean::run(name, force), |_| 1)
        }
        Commands::Status { interactive, follow } => {
            run_fallible(|| commands::status::run(interactive, follow), |_| 1)
        }
        Commands::Logs {
            name,
            task,
            attempt,
            follow,
            raw,
        } => run_fallible(|| commands::logs::run(name, task, attempt, follow, raw), |_| 1),
        Commands::Unblock { name, resolution } => {
            run_fallible(|| commands::unblock::run(name, resolution), |_| 1)
        }
        Commands::Profile { command } => match command {
            ProfileCommands::List => run_fallible(commands::profile::list, |_| 1),
            ProfileCommands::Add {
                name,
                command,
                description,
                args,
            } => run_fallible(|| commands::profile::add(name, command, description, args), |_| 1),
            ProfileCommands::Rm { name } => run_fallible(|| commands::profile::remove(name), |_| 1),
            ProfileCommands::SetDefault { name } => {
                run_fallible(|| commands::profile::set_default(name), |_| 1)
            }
        },
        Commands::Sessions { name } => run_fallible(|| commands::sessions::run(name), |_| 1),
        Commands::Statusline => run_fallible(commands::statusline::run, |_| 1),
    }
}
