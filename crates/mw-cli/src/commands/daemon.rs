//! `watch start|stop|restart|status|install|uninstall`.

use std::fs::OpenOptions;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Local;
use mw_core::credentials::write_env_file;
use mw_core::process::{pid_alive, send_terminate, SignalProbe};
use mw_daemon::service::platform_service;
use mw_daemon::status::StatusReport;
use tracing::info;

use super::{daemon_executable, CliContext};

const START_TIMEOUT: Duration = Duration::from_secs(5);
const STOP_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub async fn start(ctx: &CliContext) -> anyhow::Result<()> {
    let ledger = ctx.ledger();
    let meta = ledger.metadata().context("failed to read watch state")?;
    if meta.is_recorded() && pid_alive(meta.pid) {
        println!("Watcher already running (pid {})", meta.pid);
        return Ok(());
    }

    let executable = daemon_executable()?;
    let stderr = OpenOptions::new()
        .create(true)
        .append(true)
        .open(ctx.paths.service_stderr())
        .with_context(|| format!("failed to open {}", ctx.paths.service_stderr().display()))?;

    let mut command = Command::new(&executable);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(stderr));
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group, so a Ctrl-C in this terminal does not reach it.
        command.process_group(0);
    }
    let mut child = command
        .spawn()
        .with_context(|| format!("failed to launch {}", executable.display()))?;
    let pid = child.id();

    let deadline = Instant::now() + START_TIMEOUT;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait()? {
            anyhow::bail!(
                "mw-daemon exited during startup ({status}); see {}",
                ctx.paths.service_stderr().display()
            );
        }
        if ledger.metadata()?.pid == pid {
            println!("Watcher started (pid {pid})");
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    anyhow::bail!("mw-daemon (pid {pid}) did not report ready within {}s; see `mw watch log`", START_TIMEOUT.as_secs())
}

pub async fn stop(ctx: &CliContext) -> anyhow::Result<()> {
    stop_running(ctx).await.map(|_| ())
}

pub async fn restart(ctx: &CliContext) -> anyhow::Result<()> {
    stop_running(ctx).await?;
    start(ctx).await
}

/// Returns whether a live watcher was stopped.
async fn stop_running(ctx: &CliContext) -> anyhow::Result<bool> {
    let ledger = ctx.ledger();
    let meta = ledger.metadata().context("failed to read watch state")?;
    if !meta.is_recorded() {
        println!("Watcher is not running");
        return Ok(false);
    }
    if !pid_alive(meta.pid) {
        ledger.clear_daemon_info().context("failed to clear stale pid")?;
        println!("Watcher is not running (cleared stale pid {})", meta.pid);
        return Ok(false);
    }

    if !send_terminate(meta.pid) {
        anyhow::bail!("failed to signal watcher (pid {})", meta.pid);
    }
    let deadline = Instant::now() + STOP_TIMEOUT;
    while Instant::now() < deadline {
        if !pid_alive(meta.pid) {
            println!("Watcher stopped (pid {})", meta.pid);
            return Ok(true);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    anyhow::bail!("watcher (pid {}) did not exit within {}s", meta.pid, STOP_TIMEOUT.as_secs())
}

pub fn status(ctx: &CliContext) -> anyhow::Result<()> {
    let now = Local::now();
    let report = StatusReport::collect(
        &ctx.ledger(),
        &ctx.registry(),
        &ctx.scheduler(),
        &SignalProbe,
        ctx.config.watch.history_days,
        now,
    )
    .context("failed to read watch state")?;
    print!("{}", report.render(now));

    if let Ok(service) = platform_service(ctx.paths.clone()) {
        let state = if service.is_installed() { "installed" } else { "not installed" };
        println!("OS service:    {state} ({})", service.unit_path().display());
    }
    Ok(())
}

pub fn install(ctx: &CliContext) -> anyhow::Result<()> {
    let missing = missing_prerequisites(ctx)?;
    if !missing.is_empty() {
        anyhow::bail!("cannot install the watcher service:\n  - {}", missing.join("\n  - "));
    }
    let executable = daemon_executable()?;
    stage_credentials(ctx)?;
    let service = platform_service(ctx.paths.clone())?;
    service.install(&executable)?;
    println!("Installed watcher service at {}", service.unit_path().display());
    Ok(())
}

pub fn uninstall(ctx: &CliContext) -> anyhow::Result<()> {
    let service = platform_service(ctx.paths.clone())?;
    if !service.is_installed() {
        println!("Watcher service is not installed");
        return Ok(());
    }
    service.uninstall()?;
    println!("Removed {}", service.unit_path().display());
    Ok(())
}

/// Persist the resolved tokens to `<data_dir>/env`, where the supervised
/// daemon reads them. The supervisor does not inherit this shell's
/// environment.
fn stage_credentials(ctx: &CliContext) -> anyhow::Result<()> {
    let credentials = ctx.credentials()?;
    let github = &ctx.config.github.token_env;
    let jira = &ctx.config.jira.token_env;
    let (Some(github_token), Some(jira_token)) =
        (credentials.github_token(&ctx.config.github), credentials.jira_token(&ctx.config.jira))
    else {
        anyhow::bail!("{github} and {jira} must both be set");
    };
    write_env_file(
        ctx.paths.env_file(),
        &[(github.as_str(), github_token.as_str()), (jira.as_str(), jira_token.as_str())],
    )
    .with_context(|| format!("failed to write {}", ctx.paths.env_file().display()))?;
    info!(path = %ctx.paths.env_file().display(), "wrote daemon credentials");
    Ok(())
}

/// Everything the daemon needs before it can run unattended.
fn missing_prerequisites(ctx: &CliContext) -> anyhow::Result<Vec<String>> {
    let credentials = ctx.credentials()?;
    let mut missing = Vec::new();
    if credentials.github_token(&ctx.config.github).is_none() {
        missing.push(format!("GitHub token ({} is not set)", ctx.config.github.token_env));
    }
    if credentials.jira_token(&ctx.config.jira).is_none() {
        missing.push(format!("Jira API token ({} is not set)", ctx.config.jira.token_env));
    }
    if !ctx.config.jira.is_configured() {
        missing.push(format!("[jira] base_url and email in {}", ctx.paths.config().display()));
    }
    if ctx.mappings().list().context("failed to read status mappings")?.is_empty() {
        missing.push("a status mapping (`mw mapping set <PROJECT> --merged <STATUS>`)".into());
    }
    Ok(missing)
}
