mod commands;

use clap::{Parser, Subcommand};

use commands::CliContext;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// mergewatch CLI -- move Jira tickets when their GitHub PRs merge.
#[derive(Parser)]
#[command(name = "mw", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Control and inspect the background watcher.
    #[command(subcommand)]
    Watch(WatchCommand),

    /// Manage per-project Jira status mappings.
    #[command(subcommand)]
    Mapping(MappingCommand),
}

#[derive(Subcommand)]
enum WatchCommand {
    /// Run one check cycle in the foreground.
    Check {
        /// Log the transitions that would happen without changing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Start the watcher in the background.
    Start,

    /// Stop the background watcher.
    Stop,

    /// Stop, then start the background watcher.
    Restart,

    /// Show whether the watcher runs, its schedule and recent activity.
    Status,

    /// Register the watcher as an OS service (launchd / systemd --user).
    Install,

    /// Remove the OS service registration.
    Uninstall,

    /// Show the watcher log.
    Log {
        /// Keep printing new lines until interrupted.
        #[arg(short, long)]
        follow: bool,
        /// Number of trailing lines to print first.
        #[arg(short = 'n', long, default_value_t = 50)]
        last: usize,
    },

    /// Show PRs processed recently and their ticket updates.
    History {
        /// Look-back window; defaults to `watch.history_days`.
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Print the data directory, schedule and effective configuration.
    Config,

    /// Start watching a pull request.
    Add {
        /// Repository as OWNER/REPO.
        repo: String,
        /// Pull request number.
        number: u64,
        /// Ticket id to move on merge (repeatable). Detected from the PR
        /// branch and title when omitted.
        #[arg(short, long = "ticket")]
        tickets: Vec<String>,
    },

    /// List watched pull requests.
    List,

    /// Stop watching a pull request.
    Remove {
        /// Pull request number.
        number: u64,
        /// Repository as OWNER/REPO, when the number is ambiguous.
        #[arg(long)]
        repo: Option<String>,
    },
}

#[derive(Subcommand)]
enum MappingCommand {
    /// Create or update the mapping for a project key.
    Set {
        /// Jira project key, e.g. PROJ.
        project: String,
        /// Status for tickets whose PR is open.
        #[arg(long)]
        created: Option<String>,
        /// Status for tickets whose PR merged.
        #[arg(long)]
        merged: Option<String>,
    },

    /// List configured mappings.
    List,

    /// Delete the mapping for a project key.
    Remove { project: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match &cli.command {
        Commands::Watch(WatchCommand::Check { .. }) => "info",
        _ => "warn",
    };
    mw_telemetry::logging::init_logging("mw", level);

    let ctx = CliContext::load()?;

    match cli.command {
        Commands::Watch(cmd) => match cmd {
            WatchCommand::Check { dry_run } => commands::watch::check(&ctx, dry_run).await?,
            WatchCommand::Start => commands::daemon::start(&ctx).await?,
            WatchCommand::Stop => commands::daemon::stop(&ctx).await?,
            WatchCommand::Restart => commands::daemon::restart(&ctx).await?,
            WatchCommand::Status => commands::daemon::status(&ctx)?,
            WatchCommand::Install => commands::daemon::install(&ctx)?,
            WatchCommand::Uninstall => commands::daemon::uninstall(&ctx)?,
            WatchCommand::Log { follow, last } => commands::log::run(&ctx, follow, last).await?,
            WatchCommand::History { days } => commands::history::run(&ctx, days)?,
            WatchCommand::Config => commands::watch::show_config(&ctx)?,
            WatchCommand::Add {
                repo,
                number,
                tickets,
            } => commands::watch::add(&ctx, &repo, number, tickets).await?,
            WatchCommand::List => commands::watch::list(&ctx)?,
            WatchCommand::Remove { number, repo } => {
                commands::watch::remove(&ctx, number, repo.as_deref())?
            }
        },
        Commands::Mapping(cmd) => match cmd {
            MappingCommand::Set {
                project,
                created,
                merged,
            } => commands::mapping::set(&ctx, &project, created, merged)?,
            MappingCommand::List => commands::mapping::list(&ctx)?,
            MappingCommand::Remove { project } => commands::mapping::remove(&ctx, &project)?,
        },
    }

    Ok(())
}
