//! The site build: task names, the task graph wiring every component, and
//! progress reporting.

use std::sync::Arc;

use tracing::{info, instrument};

use sitesync_artifacts::sync_artifacts;
use sitesync_shared::{Result, SiteConfig};

use crate::changelog::import_changelog;
use crate::docs::import_docs;
use crate::download::update_download;
use crate::examples::ExamplePublisher;
use crate::graph::{RunReport, Task, TaskGraph, TaskOutcome};
use crate::updater::DependencyUpdater;

pub const UPDATE: &str = "update";
pub const LIB: &str = "lib";
pub const DOCS: &str = "docs";
pub const EXAMPLES: &str = "examples";
pub const HISTORY: &str = "history";
pub const VERSION: &str = "version";
pub const DEFAULT: &str = "default";

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when a task's action starts.
    fn task_started(&self, name: &str);
    /// Called when a task finishes, fails, or is skipped.
    fn task_finished(&self, name: &str, outcome: &TaskOutcome);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn task_started(&self, _name: &str) {}
    fn task_finished(&self, _name: &str, _outcome: &TaskOutcome) {}
    fn done(&self, _report: &RunReport) {}
}

/// Build the site's task graph.
///
/// Every task requires `update`; `version` also requires `lib` because it
/// measures the copied artifacts. `default` requires everything.
pub fn site_graph(
    config: Arc<SiteConfig>,
    updater: Arc<dyn DependencyUpdater>,
) -> Result<TaskGraph> {
    let mut graph = TaskGraph::new();

    graph.register(
        Task::new(UPDATE, &[], move || {
            let updater = Arc::clone(&updater);
            async move { updater.update().await }
        })
        .describe("Fetch the latest upstream library"),
    )?;

    let cfg = Arc::clone(&config);
    graph.register(
        Task::new(LIB, &[UPDATE], move || {
            let cfg = Arc::clone(&cfg);
            async move {
                let artifacts = sync_artifacts(&cfg.dist_src, &cfg.lib_dest).await?;
                info!(count = artifacts.len(), "library artifacts synced");
                Ok(())
            }
        })
        .describe("Copy the built library into the asset directory"),
    )?;

    let cfg = Arc::clone(&config);
    graph.register(
        Task::new(DOCS, &[UPDATE], move || {
            let cfg = Arc::clone(&cfg);
            async move { import_docs(&cfg).await.map(|_| ()) }
        })
        .describe("Import the markdown docs with links rewritten to .html"),
    )?;

    let publisher = Arc::new(ExamplePublisher::new(Arc::clone(&config))?);
    graph.register(
        Task::new(EXAMPLES, &[UPDATE], move || {
            let publisher = Arc::clone(&publisher);
            async move { publisher.publish().await.map(|_| ()) }
        })
        .describe("Copy the examples and generate their pages and index"),
    )?;

    let cfg = Arc::clone(&config);
    graph.register(
        Task::new(HISTORY, &[UPDATE], move || {
            let cfg = Arc::clone(&cfg);
            async move { import_changelog(&cfg).await.map(|_| ()) }
        })
        .describe("Import the changelog"),
    )?;

    let cfg = Arc::clone(&config);
    graph.register(
        Task::new(VERSION, &[UPDATE, LIB], move || {
            let cfg = Arc::clone(&cfg);
            async move { update_download(&cfg).await.map(|_| ()) }
        })
        .describe("Inject version and sizes into the download page"),
    )?;

    graph.register(
        Task::aggregate(DEFAULT, &[UPDATE, LIB, DOCS, EXAMPLES, HISTORY, VERSION])
            .describe("Run every task"),
    )?;

    Ok(graph)
}

/// Build the site graph and run `target`.
#[instrument(skip_all, fields(root = %config.root.display(), target = %target))]
pub async fn build_site(
    config: Arc<SiteConfig>,
    updater: Arc<dyn DependencyUpdater>,
    target: &str,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let graph = site_graph(config, updater)?;
    graph.run(target, progress).await
}
