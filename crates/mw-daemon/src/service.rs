//! Registration of `mw-daemon` with the host's service supervisor.

use std::path::{Path, PathBuf};
use std::process::Command;

use mw_core::paths::{DataPaths, HOME_ENV};
use thiserror::Error;
use tracing::{info, warn};

pub const LAUNCHD_LABEL: &str = "com.mergewatch.watch";
pub const SYSTEMD_UNIT: &str = "mergewatch.service";

/// Errors that can occur while installing or removing the OS service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// This platform has no supported supervisor.
    #[error("OS service install is not supported on this platform")]
    Unsupported,

    /// `launchctl` / `systemctl` exited non-zero (stderr captured).
    #[error("{command} failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The user's home or config directory could not be determined.
    #[error("cannot locate {0}")]
    NoHome(&'static str),
}

/// Host service supervisor.
pub trait ServiceManager {
    /// Location of the plist / unit file.
    fn unit_path(&self) -> &Path;

    fn is_installed(&self) -> bool {
        self.unit_path().exists()
    }

    /// Write the unit for `executable` and start it.
    fn install(&self, executable: &Path) -> Result<(), ServiceError>;

    /// Stop the service and remove its unit. Absent units are a no-op.
    fn uninstall(&self) -> Result<(), ServiceError>;
}

fn run(program: &str, args: &[&str]) -> Result<(), ServiceError> {
    let output = Command::new(program).args(args).output()?;
    if !output.status.success() {
        return Err(ServiceError::Command {
            command: format!("{program} {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

fn write_unit(path: &Path, contents: &str) -> Result<(), ServiceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// launchd (macOS)
// ---------------------------------------------------------------------------

pub struct LaunchdService {
    plist: PathBuf,
    data: DataPaths,
}

impl LaunchdService {
    /// `~/Library/LaunchAgents/com.mergewatch.watch.plist`
    pub fn new(data: DataPaths) -> Result<Self, ServiceError> {
        let home = dirs::home_dir().ok_or(ServiceError::NoHome("home directory"))?;
        let plist = home
            .join("Library")
            .join("LaunchAgents")
            .join(format!("{LAUNCHD_LABEL}.plist"));
        Ok(Self::with_unit_path(plist, data))
    }

    pub fn with_unit_path(plist: PathBuf, data: DataPaths) -> Self {
        Self { plist, data }
    }

    /// launchd has no env-file directive; the daemon finds `<data_dir>/env`
    /// through the data-dir variable set here.
    pub fn render(&self, executable: &Path) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{exe}</string>
    </array>
    <key>EnvironmentVariables</key>
    <dict>
        <key>{home_env}</key>
        <string>{home}</string>
    </dict>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <dict>
        <key>SuccessfulExit</key>
        <false/>
    </dict>
    <key>StandardOutPath</key>
    <string>{stdout}</string>
    <key>StandardErrorPath</key>
    <string>{stderr}</string>
</dict>
</plist>
"#,
            label = LAUNCHD_LABEL,
            exe = xml_escape(&executable.display().to_string()),
            home_env = HOME_ENV,
            home = xml_escape(&self.data.root().display().to_string()),
            stdout = xml_escape(&self.data.service_stdout().display().to_string()),
            stderr = xml_escape(&self.data.service_stderr().display().to_string()),
        )
    }

    fn plist_arg(&self) -> String {
        self.plist.display().to_string()
    }
}

impl ServiceManager for LaunchdService {
    fn unit_path(&self) -> &Path {
        &self.plist
    }

    fn install(&self, executable: &Path) -> Result<(), ServiceError> {
        write_unit(&self.plist, &self.render(executable))?;
        run("launchctl", &["load", "-w", &self.plist_arg()])?;
        info!(plist = %self.plist.display(), "installed launchd agent");
        Ok(())
    }

    fn uninstall(&self) -> Result<(), ServiceError> {
        if !self.plist.exists() {
            return Ok(());
        }
        if let Err(e) = run("launchctl", &["unload", "-w", &self.plist_arg()]) {
            warn!(error = %e, "launchctl unload failed, removing plist anyway");
        }
        std::fs::remove_file(&self.plist)?;
        info!(plist = %self.plist.display(), "removed launchd agent");
        Ok(())
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ---------------------------------------------------------------------------
// systemd --user (Linux)
// ---------------------------------------------------------------------------

pub struct SystemdUserService {
    unit: PathBuf,
    data: DataPaths,
}

impl SystemdUserService {
    /// `~/.config/systemd/user/mergewatch.service`
    pub fn new(data: DataPaths) -> Result<Self, ServiceError> {
        let config = dirs::config_dir().ok_or(ServiceError::NoHome("config directory"))?;
        let unit = config.join("systemd").join("user").join(SYSTEMD_UNIT);
        Ok(Self::with_unit_path(unit, data))
    }

    pub fn with_unit_path(unit: PathBuf, data: DataPaths) -> Self {
        Self { unit, data }
    }

    /// The unit reads optional `KEY=value` lines (tokens) from `<data_dir>/env`.
    pub fn render(&self, executable: &Path) -> String {
        format!(
            "[Unit]\n\
             Description=mergewatch PR merge watcher\n\
             After=network-online.target\n\
             \n\
             [Service]\n\
             Type=simple\n\
             ExecStart={exe}\n\
             Environment={home_env}={home}\n\
             EnvironmentFile=-{env_file}\n\
             Restart=on-failure\n\
             RestartSec=30\n\
             \n\
             [Install]\n\
             WantedBy=default.target\n",
            exe = executable.display(),
            home_env = HOME_ENV,
            home = self.data.root().display(),
            env_file = self.data.env_file().display(),
        )
    }
}

impl ServiceManager for SystemdUserService {
    fn unit_path(&self) -> &Path {
        &self.unit
    }

    fn install(&self, executable: &Path) -> Result<(), ServiceError> {
        write_unit(&self.unit, &self.render(executable))?;
        run("systemctl", &["--user", "daemon-reload"])?;
        run("systemctl", &["--user", "enable", "--now", SYSTEMD_UNIT])?;
        info!(unit = %self.unit.display(), "installed systemd user service");
        Ok(())
    }

    fn uninstall(&self) -> Result<(), ServiceError> {
        if !self.unit.exists() {
            return Ok(());
        }
        if let Err(e) = run("systemctl", &["--user", "disable", "--now", SYSTEMD_UNIT]) {
            warn!(error = %e, "systemctl disable failed, removing unit anyway");
        }
        std::fs::remove_file(&self.unit)?;
        if let Err(e) = run("systemctl", &["--user", "daemon-reload"]) {
            warn!(error = %e, "systemctl daemon-reload failed");
        }
        info!(unit = %self.unit.display(), "removed systemd user service");
        Ok(())
    }
}

/// Supervisor for the current OS.
pub fn platform_service(data: DataPaths) -> Result<Box<dyn ServiceManager>, ServiceError> {
    if cfg!(target_os = "macos") {
        Ok(Box::new(LaunchdService::new(data)?))
    } else if cfg!(target_os = "linux") {
        Ok(Box::new(SystemdUserService::new(data)?))
    } else {
        Err(ServiceError::Unsupported)
    }
}
