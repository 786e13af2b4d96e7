use super::{ExportOutput, ExportRequest, TransactionExporter};
use crate::config::WestpacConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

// Credentials are passed through the environment so they never show up in `ps`.
const USERNAME_ENV: &str = "WESTPAC_USERNAME";
const PASSWORD_ENV: &str = "WESTPAC_PASSWORD";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Downloads OFX statements from Westpac online banking.
///
/// Westpac has no statement API, so the browser session is driven by an external
/// helper program. The helper receives the account and date range as flags, writes
/// the statement into `--output-dir` and prints the file path as its last line of
/// output.
pub struct WestpacExporter {
    command: String,
    download_dir: PathBuf,
}

impl WestpacExporter {
    pub fn new(config: &WestpacConfig) -> Result<Self> {
        Ok(Self {
            command: config.exporter_command.clone(),
            download_dir: config.download_dir()?,
        })
    }

    fn args(&self, request: &ExportRequest<'_>) -> Vec<String> {
        let mut args = vec![
            "--account-name".to_string(),
            request.account_name.to_string(),
            "--start-date".to_string(),
            request.start_date.format(DATE_FORMAT).to_string(),
        ];

        if let Some(end_date) = request.end_date {
            args.push("--end-date".to_string());
            args.push(end_date.format(DATE_FORMAT).to_string());
        }

        args.push("--output-dir".to_string());
        args.push(self.download_dir.display().to_string());

        if request.debug {
            args.push("--debug".to_string());
        }

        args
    }
}

#[async_trait]
impl TransactionExporter for WestpacExporter {
    #[instrument(name = "Exporting Westpac statement", skip_all, fields(account = %request.account_name))]
    async fn export(&self, request: &ExportRequest<'_>) -> Result<ExportOutput> {
        let output = Command::new(&self.command)
            .args(self.args(request))
            .env(USERNAME_ENV, request.username)
            .env(PASSWORD_ENV, request.password)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::Export(format!("Failed to run '{}': {}", self.command, e)))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if request.debug {
            for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
                info!("{}: {}", self.command, line);
            }
        }

        if !output.status.success() {
            return Err(AppError::Export(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let file_path = statement_path(&stdout, &self.download_dir).ok_or_else(|| {
            AppError::Export(format!("'{}' did not report a statement file", self.command))
        })?;

        if !file_path.is_file() {
            return Err(AppError::Export(format!(
                "Statement file '{}' does not exist",
                file_path.display()
            )));
        }

        debug!(path = ?file_path, "Statement downloaded");

        Ok(ExportOutput { file_path })
    }
}

/// The last non-empty line of helper output, resolved against the download directory.
fn statement_path(stdout: &str, download_dir: &Path) -> Option<PathBuf> {
    let line = stdout.lines().map(str::trim).rfind(|l| !l.is_empty())?;
    Some(download_dir.join(line))
}
