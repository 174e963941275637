//! Named tasks with prerequisites, run concurrently once their
//! prerequisites have succeeded.
//!
//! A run resolves the target's transitive prerequisites, rejects unknown
//! names and cycles, then schedules every task whose prerequisites all
//! succeeded. Independent tasks run at the same time. A task whose
//! prerequisite failed (or was itself skipped) never starts and is recorded
//! as skipped; tasks already running are allowed to finish.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use sitesync_shared::{Result, SiteSyncError};

use crate::pipeline::ProgressReporter;

/// Action executed when a task runs.
pub type TaskAction = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A named unit of work.
#[derive(Clone)]
pub struct Task {
    name: String,
    prerequisites: Vec<String>,
    description: Option<String>,
    action: TaskAction,
}

impl Task {
    /// A task running `action` after every task in `prerequisites` succeeded.
    pub fn new<F, Fut>(name: impl Into<String>, prerequisites: &[&str], action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            prerequisites: prerequisites.iter().map(|p| p.to_string()).collect(),
            description: None,
            action: Arc::new(move || action().boxed()),
        }
    }

    /// A task that only groups its prerequisites.
    pub fn aggregate(name: impl Into<String>, prerequisites: &[&str]) -> Self {
        Self::new(name, prerequisites, || async { Ok(()) })
    }

    /// One-line description shown when listing tasks.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prerequisites(&self) -> &[String] {
        &self.prerequisites
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("prerequisites", &self.prerequisites)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// How a task ended.
#[derive(Debug)]
pub enum TaskOutcome {
    Succeeded,
    /// The action returned an error or panicked.
    Failed(SiteSyncError),
    /// Not started because a prerequisite did not succeed.
    Skipped(SiteSyncError),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Short label for summaries: `ok`, `failed` or `skipped`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "ok",
            Self::Failed(_) => "failed",
            Self::Skipped(_) => "skipped",
        }
    }

    pub fn error(&self) -> Option<&SiteSyncError> {
        match self {
            Self::Succeeded => None,
            Self::Failed(e) | Self::Skipped(e) => Some(e),
        }
    }
}

/// One task's entry in a [`RunReport`].
#[derive(Debug)]
pub struct TaskRecord {
    pub name: String,
    pub outcome: TaskOutcome,
    /// Wall time of the action; zero for skipped tasks.
    pub elapsed: Duration,
}

/// Result of running a target.
#[derive(Debug)]
pub struct RunReport {
    /// Task that was requested.
    pub target: String,
    /// Every task in the target's closure, in completion order.
    pub records: Vec<TaskRecord>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl RunReport {
    /// Outcome of the named task, if it was part of the run.
    pub fn outcome(&self, name: &str) -> Option<&TaskOutcome> {
        self.records
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.outcome)
    }

    /// `true` when every task succeeded.
    pub fn is_success(&self) -> bool {
        self.records.iter().all(|r| r.outcome.is_success())
    }

    /// Convert the first failure (in completion order) into an error.
    pub fn into_result(mut self) -> Result<Self> {
        let Some(index) = self.records.iter().position(|r| !r.outcome.is_success()) else {
            return Ok(self);
        };

        let record = self.records.swap_remove(index);
        match record.outcome {
            TaskOutcome::Failed(source) => Err(SiteSyncError::TaskFailed {
                task: record.name,
                source: Box::new(source),
            }),
            TaskOutcome::Skipped(e) => Err(e),
            TaskOutcome::Succeeded => Ok(self),
        }
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// A registry of tasks.
#[derive(Debug, Default)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. Names must be unique; prerequisites are checked at run time.
    pub fn register(&mut self, task: Task) -> Result<()> {
        if self.index.contains_key(&task.name) {
            return Err(SiteSyncError::validation(format!(
                "task `{}` is registered twice",
                task.name
            )));
        }
        self.index.insert(task.name.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    /// Registered tasks, in registration order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    /// The target and all of its transitive prerequisites, prerequisites first.
    pub fn closure(&self, target: &str) -> Result<Vec<&Task>> {
        let mut marks = HashMap::new();
        let mut path = Vec::new();
        let mut order = Vec::new();
        self.visit(target, &mut marks, &mut path, &mut order)?;
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        name: &str,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
        order: &mut Vec<&'a Task>,
    ) -> Result<()> {
        let task = self
            .get(name)
            .ok_or_else(|| SiteSyncError::UnknownTask(name.to_string()))?;

        match marks.get(task.name()) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|n| *n == task.name()).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(task.name());
                return Err(SiteSyncError::validation(format!(
                    "dependency cycle: {}",
                    cycle.join(" -> ")
                )));
            }
            None => {}
        }

        marks.insert(task.name(), Mark::Visiting);
        path.push(task.name());
        for prerequisite in task.prerequisites() {
            self.visit(prerequisite, marks, path, order)?;
        }
        path.pop();
        marks.insert(task.name(), Mark::Done);
        order.push(task);
        Ok(())
    }

    /// Run `target` and everything it requires.
    ///
    /// Returns `Err` only when the graph itself is invalid; task failures are
    /// reported in the [`RunReport`].
    #[instrument(skip_all, fields(target = %target))]
    pub async fn run(&self, target: &str, progress: &dyn ProgressReporter) -> Result<RunReport> {
        let start = Instant::now();
        let mut pending = self.closure(target)?;
        info!(tasks = pending.len(), "starting run");

        let mut finished: HashMap<String, bool> = HashMap::new();
        let mut records = Vec::with_capacity(pending.len());
        let mut running = JoinSet::new();

        loop {
            // `pending` is in dependency order, so one pass also propagates
            // skips down a chain of dependents.
            let mut waiting = Vec::new();
            for task in pending.drain(..) {
                let blocked = task
                    .prerequisites()
                    .iter()
                    .find(|p| finished.get(p.as_str()) == Some(&false));

                if let Some(prerequisite) = blocked {
                    warn!(task = task.name(), %prerequisite, "skipping task");
                    let outcome = TaskOutcome::Skipped(SiteSyncError::TaskDependency {
                        task: task.name().to_string(),
                        prerequisite: prerequisite.clone(),
                    });
                    progress.task_finished(task.name(), &outcome);
                    finished.insert(task.name().to_string(), false);
                    records.push(TaskRecord {
                        name: task.name().to_string(),
                        outcome,
                        elapsed: Duration::ZERO,
                    });
                    continue;
                }

                let ready = task
                    .prerequisites()
                    .iter()
                    .all(|p| finished.get(p.as_str()) == Some(&true));
                if !ready {
                    waiting.push(task);
                    continue;
                }

                progress.task_started(task.name());
                spawn_task(&mut running, task);
            }
            pending = waiting;

            let Some(joined) = running.join_next().await else {
                break;
            };
            let (name, elapsed, result) =
                joined.map_err(|e| SiteSyncError::Panic(e.to_string()))?;

            let outcome = match result {
                Ok(()) => {
                    debug!(task = %name, ?elapsed, "task succeeded");
                    TaskOutcome::Succeeded
                }
                Err(e) => {
                    warn!(task = %name, error = %e, "task failed");
                    TaskOutcome::Failed(e)
                }
            };
            progress.task_finished(&name, &outcome);
            finished.insert(name.clone(), outcome.is_success());
            records.push(TaskRecord {
                name,
                outcome,
                elapsed,
            });
        }

        let report = RunReport {
            target: target.to_string(),
            records,
            elapsed: start.elapsed(),
        };
        info!(
            success = report.is_success(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "run finished"
        );
        progress.done(&report);
        Ok(report)
    }
}

#[derive(Debug, Clone, Copy)]
enum Mark {
    Visiting,
    Done,
}

type Joined = (String, Duration, Result<()>);

fn spawn_task(running: &mut JoinSet<Joined>, task: &Task) {
    let name = task.name().to_string();
    let action = Arc::clone(&task.action);
    let span = info_span!("task", name = %name);

    running.spawn(
        async move {
            let started = Instant::now();
            let result = AssertUnwindSafe(async move { action().await })
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(SiteSyncError::Panic(panic_message(&*payload))));
            (name, started.elapsed(), result)
        }
        .instrument(span),
    );
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::pipeline::SilentProgress;

    type Log = Arc<Mutex<Vec<String>>>;

    fn logging(name: &'static str, prerequisites: &[&str], log: &Log) -> Task {
        let log = Arc::clone(log);
        Task::new(name, prerequisites, move || {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name.to_string());
                Ok(())
            }
        })
    }

    fn failing(name: &'static str, prerequisites: &[&str]) -> Task {
        Task::new(name, prerequisites, || async {
            Err(SiteSyncError::Update("registry unreachable".into()))
        })
    }

    #[tokio::test]
    async fn prerequisites_run_first() {
        let log = Log::default();
        let mut graph = TaskGraph::new();
        graph.register(logging("update", &[], &log)).unwrap();
        graph.register(logging("lib", &["update"], &log)).unwrap();
        graph.register(logging("version", &["update", "lib"], &log)).unwrap();

        let report = graph.run("version", &SilentProgress).await.unwrap();
        assert!(report.is_success());
        assert_eq!(*log.lock().unwrap(), vec!["update", "lib", "version"]);
    }

    #[tokio::test]
    async fn only_the_targets_closure_runs() {
        let log = Log::default();
        let mut graph = TaskGraph::new();
        graph.register(logging("update", &[], &log)).unwrap();
        graph.register(logging("docs", &["update"], &log)).unwrap();
        graph.register(logging("history", &["update"], &log)).unwrap();

        let report = graph.run("docs", &SilentProgress).await.unwrap();
        assert_eq!(report.records.len(), 2);
        assert!(report.outcome("history").is_none());
        assert!(!log.lock().unwrap().contains(&"history".to_string()));
    }

    #[tokio::test]
    async fn failed_prerequisite_skips_dependents_without_running_them() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);

        let mut graph = TaskGraph::new();
        graph.register(failing("update", &[])).unwrap();
        graph
            .register(Task::new("docs", &["update"], move || {
                let flag = Arc::clone(&flag);
                async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(())
                }
            }))
            .unwrap();
        graph.register(Task::aggregate("default", &["update", "docs"])).unwrap();

        let report = graph.run("default", &SilentProgress).await.unwrap();
        assert!(!called.load(Ordering::SeqCst));
        assert!(matches!(report.outcome("update"), Some(TaskOutcome::Failed(_))));
        assert!(matches!(
            report.outcome("docs"),
            Some(TaskOutcome::Skipped(SiteSyncError::TaskDependency { prerequisite, .. }))
                if prerequisite == "update"
        ));
        assert!(matches!(report.outcome("default"), Some(TaskOutcome::Skipped(_))));

        let err = report.into_result().unwrap_err();
        assert!(matches!(err, SiteSyncError::TaskFailed { ref task, .. } if task == "update"));
        assert_eq!(err.kind(), "UpdateError");
    }

    #[tokio::test]
    async fn independent_siblings_still_run() {
        let log = Log::default();
        let mut graph = TaskGraph::new();
        graph.register(logging("update", &[], &log)).unwrap();
        graph.register(failing("lib", &["update"])).unwrap();
        graph.register(logging("docs", &["update"], &log)).unwrap();
        graph.register(logging("version", &["update", "lib"], &log)).unwrap();
        graph
            .register(Task::aggregate("default", &["update", "lib", "docs", "version"]))
            .unwrap();

        let report = graph.run("default", &SilentProgress).await.unwrap();
        assert!(report.outcome("docs").unwrap().is_success());
        assert!(matches!(report.outcome("lib"), Some(TaskOutcome::Failed(_))));
        assert!(matches!(report.outcome("version"), Some(TaskOutcome::Skipped(_))));
        assert_eq!(report.records.len(), 5);
        assert!(!log.lock().unwrap().contains(&"version".to_string()));
    }

    #[tokio::test]
    async fn panicking_action_is_reported_as_failure() {
        let mut graph = TaskGraph::new();
        graph
            .register(Task::new("boom", &[], || async {
                let artifacts: Vec<u8> = Vec::new();
                let _first = artifacts[0];
                Ok(())
            }))
            .unwrap();

        let report = graph.run("boom", &SilentProgress).await.unwrap();
        match report.outcome("boom") {
            Some(TaskOutcome::Failed(SiteSyncError::Panic(msg))) => {
                assert!(msg.contains("index out of bounds"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_target_is_rejected() {
        let graph = TaskGraph::new();
        let err = graph.run("deploy", &SilentProgress).await.unwrap_err();
        assert!(matches!(err, SiteSyncError::UnknownTask(ref name) if name == "deploy"));
    }

    #[tokio::test]
    async fn unknown_prerequisite_is_rejected_before_running() {
        let log = Log::default();
        let mut graph = TaskGraph::new();
        graph.register(logging("docs", &["fetch"], &log)).unwrap();

        let err = graph.run("docs", &SilentProgress).await.unwrap_err();
        assert!(matches!(err, SiteSyncError::UnknownTask(ref name) if name == "fetch"));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn cycles_are_rejected() {
        let mut graph = TaskGraph::new();
        graph.register(Task::aggregate("a", &["b"])).unwrap();
        graph.register(Task::aggregate("b", &["c"])).unwrap();
        graph.register(Task::aggregate("c", &["a"])).unwrap();

        let err = graph.closure("a").unwrap_err();
        assert_eq!(err.to_string(), "validation error: dependency cycle: a -> b -> c -> a");
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut graph = TaskGraph::new();
        graph.register(Task::aggregate("update", &[])).unwrap();
        let err = graph.register(Task::aggregate("update", &[])).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }

    #[test]
    fn shared_prerequisite_appears_once_in_closure() {
        let mut graph = TaskGraph::new();
        graph.register(Task::aggregate("update", &[])).unwrap();
        graph.register(Task::aggregate("lib", &["update"])).unwrap();
        graph.register(Task::aggregate("version", &["update", "lib"])).unwrap();

        let names: Vec<_> = graph
            .closure("version")
            .unwrap()
            .iter()
            .map(|t| t.name())
            .collect();
        assert_eq!(names, vec!["update", "lib", "version"]);
    }
}
