//! Fetch the latest upstream library into the site's dependency directory.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{info, instrument};

use sitesync_shared::{Result, SiteConfig, SiteSyncError};

/// Brings the upstream package up to date before any other task reads it.
pub trait DependencyUpdater: Send + Sync {
    fn update(&self) -> BoxFuture<'_, Result<()>>;
}

/// Runs an external command (e.g. `npm install mathjs`) in the site root.
#[derive(Debug, Clone)]
pub struct CommandUpdater {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl CommandUpdater {
    /// `None` when `argv` is empty.
    pub fn new(argv: &[String], working_dir: impl Into<PathBuf>) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_dir: working_dir.into(),
        })
    }

    #[instrument(skip_all, fields(program = %self.program, cwd = %self.working_dir.display()))]
    async fn run(&self) -> Result<()> {
        info!(args = ?self.args, "updating dependency");

        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| {
                SiteSyncError::Update(format!(
                    "failed to spawn `{}`: {e}. Is it installed?",
                    self.program
                ))
            })?;

        if !status.success() {
            return Err(SiteSyncError::Update(format!(
                "`{} {}` exited with {status}",
                self.program,
                self.args.join(" ")
            )));
        }

        info!("dependency updated");
        Ok(())
    }
}

impl DependencyUpdater for CommandUpdater {
    fn update(&self) -> BoxFuture<'_, Result<()>> {
        self.run().boxed()
    }
}

/// Leaves the dependency as installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUpdater;

impl DependencyUpdater for NoopUpdater {
    fn update(&self) -> BoxFuture<'_, Result<()>> {
        async {
            info!("no update command configured, skipping dependency update");
            Ok(())
        }
        .boxed()
    }
}

/// The updater selected by the site's `update_command`.
pub fn updater_for(config: &SiteConfig) -> Arc<dyn DependencyUpdater> {
    match CommandUpdater::new(&config.update_command, &config.root) {
        Some(updater) => Arc::new(updater),
        None => Arc::new(NoopUpdater),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_command_has_no_updater() {
        assert!(CommandUpdater::new(&[], "/tmp").is_none());
    }

    #[tokio::test]
    async fn noop_updater_succeeds() {
        NoopUpdater.update().await.unwrap();
    }

    #[tokio::test]
    async fn missing_program_is_update_error() {
        let updater = CommandUpdater::new(
            &argv(&["sitesync-no-such-program-on-path"]),
            std::env::temp_dir(),
        )
        .unwrap();

        let err = updater.update().await.unwrap_err();
        assert!(matches!(err, SiteSyncError::Update(_)));
        assert_eq!(err.kind(), "UpdateError");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_update_error() {
        let updater = CommandUpdater::new(&argv(&["sh", "-c", "exit 3"]), std::env::temp_dir()).unwrap();
        let err = updater.update().await.unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_command_runs_in_working_dir() {
        let dir = std::env::temp_dir().join(format!("sitesync-updater-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();

        let updater = CommandUpdater::new(&argv(&["sh", "-c", "touch updated"]), &dir).unwrap();
        updater.update().await.unwrap();
        assert!(dir.join("updated").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
