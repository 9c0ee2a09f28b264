//! Named build targets, their dependency graph and the runner.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::templates::TemplateEngine;
use crate::yaml::YamlError;
use crate::{copy, scripts, styles, yaml};

/// A build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Clean,
    Lint,
    YamlToJson,
    Dist,
    Less,
    Copy,
    Default,
    Build,
}

impl Target {
    pub const ALL: [Target; 8] = [
        Target::Clean,
        Target::Lint,
        Target::YamlToJson,
        Target::Dist,
        Target::Less,
        Target::Copy,
        Target::Default,
        Target::Build,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Target::Clean => "clean",
            Target::Lint => "lint",
            Target::YamlToJson => "yaml-to-json",
            Target::Dist => "dist",
            Target::Less => "less",
            Target::Copy => "copy",
            Target::Default => "default",
            Target::Build => "build",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| GraphError::UnknownTask(s.to_string()))
    }
}

/// Errors in resolving targets against a task graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Task '{0}' is not in this task graph")]
    UnknownTask(String),

    #[error("Dependency cycle through task '{0}'")]
    Cycle(String),
}

/// Explicit dependency list between tasks.
#[derive(Debug, Clone)]
pub struct TaskGraph<K> {
    deps: HashMap<K, Vec<K>>,
}

impl<K> Default for TaskGraph<K> {
    fn default() -> Self {
        Self {
            deps: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash + fmt::Display> TaskGraph<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `task` with its prerequisites, replacing any earlier entry.
    pub fn add(&mut self, task: K, requires: &[K]) -> &mut Self {
        self.deps.insert(task, requires.to_vec());
        self
    }

    /// Execution order for `targets`: prerequisites before dependents,
    /// depth-first in declaration order, each task once.
    pub fn plan(&self, targets: &[K]) -> Result<Vec<K>, GraphError> {
        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut visiting = HashSet::new();

        for target in targets {
            self.visit(*target, &mut visiting, &mut done, &mut order)?;
        }

        Ok(order)
    }

    fn visit(
        &self,
        task: K,
        visiting: &mut HashSet<K>,
        done: &mut HashSet<K>,
        order: &mut Vec<K>,
    ) -> Result<(), GraphError> {
        if done.contains(&task) {
            return Ok(());
        }
        let Some(requires) = self.deps.get(&task) else {
            return Err(GraphError::UnknownTask(task.to_string()));
        };
        if !visiting.insert(task) {
            return Err(GraphError::Cycle(task.to_string()));
        }

        for dep in requires {
            self.visit(*dep, visiting, done, order)?;
        }

        visiting.remove(&task);
        done.insert(task);
        order.push(task);
        Ok(())
    }
}

/// The build targets and their prerequisites.
pub fn standard_graph() -> TaskGraph<Target> {
    let mut graph = TaskGraph::new();
    graph
        .add(Target::Clean, &[])
        .add(Target::Lint, &[])
        .add(Target::YamlToJson, &[])
        .add(Target::Dist, &[Target::Clean, Target::Lint])
        .add(Target::Less, &[Target::Clean])
        .add(Target::Copy, &[Target::Less])
        .add(Target::Default, &[Target::Dist, Target::Copy])
        .add(Target::Build, &[Target::Default, Target::YamlToJson]);
    graph
}

/// Receives a notification after outputs a browser would reload for change.
pub trait ReloadNotifier: Send + Sync {
    /// `changed` names the task that produced new output.
    fn reload(&self, changed: &str);
}

/// Errors that fail a single task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Yaml(#[from] YamlError),

    #[error("{failed} of {total} stylesheets failed to compile")]
    Styles { failed: usize, total: usize },

    #[error("Bundle written with problems: {0}")]
    Dist(String),

    #[error("{0} files failed to copy")]
    Copy(usize),
}

/// Outcome of running a plan.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Tasks in the order they ran
    pub ran: Vec<Target>,

    /// Tasks that failed, with the error message
    pub failed: Vec<(Target, String)>,

    pub duration_ms: u64,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs build targets against a configuration.
pub struct Orchestrator {
    config: BuildConfig,
    graph: TaskGraph<Target>,
    engine: TemplateEngine,
    notifier: Option<Arc<dyn ReloadNotifier>>,
}

impl Orchestrator {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            graph: standard_graph(),
            engine: TemplateEngine::new(),
            notifier: None,
        }
    }

    /// Notify `notifier` after successful `dist` and `less` runs.
    pub fn with_notifier(mut self, notifier: Arc<dyn ReloadNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Run `targets` and their prerequisites sequentially. A failing task is
    /// logged and the remaining tasks still run.
    pub fn run(&self, targets: &[Target]) -> Result<RunSummary, GraphError> {
        let plan = self.graph.plan(targets)?;
        let start = Instant::now();
        let mut summary = RunSummary::default();

        for task in plan {
            let task_start = Instant::now();
            tracing::info!("Starting '{}'...", task);

            match self.run_task(task) {
                Ok(()) => tracing::info!(
                    "Finished '{}' after {} ms",
                    task,
                    task_start.elapsed().as_millis()
                ),
                Err(e) => {
                    tracing::error!(
                        "'{}' errored after {} ms: {}",
                        task,
                        task_start.elapsed().as_millis(),
                        e
                    );
                    summary.failed.push((task, e.to_string()));
                }
            }
            summary.ran.push(task);
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        Ok(summary)
    }

    /// Run one task's own action, without its prerequisites.
    pub fn run_task(&self, task: Target) -> Result<(), TaskError> {
        match task {
            Target::Clean => self.clean(),
            Target::Lint => {
                scripts::lint_sources(&self.config)?;
                Ok(())
            }
            Target::YamlToJson => {
                yaml::run(&self.config)?;
                Ok(())
            }
            Target::Dist => {
                let summary = scripts::dist(&self.config, &self.engine)?;
                if summary.is_success() {
                    self.notify(task);
                    Ok(())
                } else if summary.minified.is_none() {
                    Err(TaskError::Dist("minified bundle was not written".to_string()))
                } else {
                    Err(TaskError::Dist(format!(
                        "files skipped: {}",
                        summary.skipped.join(", ")
                    )))
                }
            }
            Target::Less => {
                let summary = styles::run(&self.config)?;
                if summary.is_success() {
                    self.notify(task);
                    Ok(())
                } else {
                    Err(TaskError::Styles {
                        failed: summary.failed.len(),
                        total: self.config.styles.len(),
                    })
                }
            }
            Target::Copy => {
                let summary = copy::run(&self.config);
                if summary.is_success() {
                    Ok(())
                } else {
                    Err(TaskError::Copy(summary.failed.len()))
                }
            }
            Target::Default | Target::Build => Ok(()),
        }
    }

    fn clean(&self) -> Result<(), TaskError> {
        let output = &self.config.output_dir;
        if output.exists() {
            fs::remove_dir_all(output).map_err(|e| {
                BuildError::WriteError(format!("{}: {}", output.display(), e))
            })?;
        }
        Ok(())
    }

    fn notify(&self, task: Target) {
        if let Some(notifier) = &self.notifier {
            notifier.reload(task.name());
        }
    }
}
