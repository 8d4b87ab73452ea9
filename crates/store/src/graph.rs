// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency graph queries: readiness, validation, transitive pruning.

use crate::store::{StoreError, TaskStore};
use pim_core::{Clock, DependencyMode, Task, TaskId, TaskStatus};
use std::collections::{HashMap, HashSet};

/// Outcome of plan validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl<C: Clock> TaskStore<C> {
    /// Tasks eligible to start in the given dependency mode.
    ///
    /// Milestones never appear; in strict mode every dependency must be done,
    /// in advisory mode dependencies are informational only.
    pub fn ready_tasks(&self, mode: DependencyMode) -> Vec<Task> {
        let tasks = self.all_tasks();
        let done: HashSet<TaskId> =
            tasks.iter().filter(|t| t.status == TaskStatus::Done).map(|t| t.id).collect();
        tasks
            .into_iter()
            .filter(|t| t.status == TaskStatus::Todo && !t.milestone)
            .filter(|t| match mode {
                DependencyMode::Advisory => true,
                DependencyMode::Strict => t.depends_on.iter().all(|d| done.contains(d)),
            })
            .collect()
    }

    /// Validate the dependency graph and plan bookkeeping.
    ///
    /// Errors: dangling `depends_on` ids, self-dependencies, cycles.
    /// Warnings: empty specs, count drift, missing plan spec.
    pub fn validate(&self) -> ValidationReport {
        let tasks = self.all_tasks();
        let ids: HashSet<TaskId> = tasks.iter().map(|t| t.id).collect();
        let mut report = ValidationReport::default();

        for task in &tasks {
            for dep in &task.depends_on {
                if *dep == task.id {
                    report.errors.push(format!("{} depends on itself", task.id));
                } else if !ids.contains(dep) {
                    report.errors.push(format!("{} depends on missing {}", task.id, dep));
                }
            }
        }

        // DFS with an explicit recursion stack for cycle detection
        let deps: HashMap<TaskId, &[TaskId]> =
            tasks.iter().map(|t| (t.id, t.depends_on.as_slice())).collect();
        let mut visited: HashSet<TaskId> = HashSet::new();
        let mut on_stack: HashSet<TaskId> = HashSet::new();
        for task in &tasks {
            if !visited.contains(&task.id)
                && has_cycle(task.id, &deps, &mut visited, &mut on_stack)
            {
                report.errors.push(format!("dependency cycle involving {}", task.id));
            }
        }

        for task in &tasks {
            if self.spec_is_empty(task.id) {
                report.warnings.push(format!("{} has no spec", task.id));
            }
        }

        if let Some(plan) = self.load_plan() {
            let done = tasks.iter().filter(|t| t.status == TaskStatus::Done).count() as u32;
            if plan.task_count != tasks.len() as u32 {
                report.warnings.push(format!(
                    "plan task_count {} != {} task files",
                    plan.task_count,
                    tasks.len()
                ));
            }
            if plan.completed_count != done {
                report.warnings.push(format!(
                    "plan completed_count {} != {} done tasks",
                    plan.completed_count, done
                ));
            }
            if !self.paths().plan_spec_path().exists() {
                report.warnings.push("plan spec missing".to_string());
            }
        }

        report
    }

    /// Drop direct dependencies that are reachable through another direct
    /// dependency. Order of the survivors is preserved. Idempotent.
    pub fn prune_transitive_deps(&self, ids: &[TaskId]) -> Result<(), StoreError> {
        let tasks = self.all_tasks();
        let deps: HashMap<TaskId, Vec<TaskId>> =
            tasks.iter().map(|t| (t.id, t.depends_on.clone())).collect();

        for id in ids {
            let Some(direct) = deps.get(id) else { continue };
            if direct.len() < 2 {
                continue;
            }
            let keep: Vec<TaskId> = direct
                .iter()
                .filter(|candidate| {
                    !direct.iter().any(|other| {
                        other != *candidate && reachable(*other, **candidate, &deps)
                    })
                })
                .copied()
                .collect();
            if keep.len() != direct.len() {
                self.update_task(*id, |t| t.depends_on = keep)?;
            }
        }
        Ok(())
    }
}

fn has_cycle(
    id: TaskId,
    deps: &HashMap<TaskId, &[TaskId]>,
    visited: &mut HashSet<TaskId>,
    on_stack: &mut HashSet<TaskId>,
) -> bool {
    if on_stack.contains(&id) {
        return true;
    }
    if !visited.insert(id) {
        return false;
    }
    on_stack.insert(id);
    let found = deps
        .get(&id)
        .into_iter()
        .flat_map(|d| d.iter())
        .any(|dep| has_cycle(*dep, deps, visited, on_stack));
    on_stack.remove(&id);
    found
}

/// Whether `to` is reachable from `from` through `depends_on` edges.
fn reachable(from: TaskId, to: TaskId, deps: &HashMap<TaskId, Vec<TaskId>>) -> bool {
    let mut seen: HashSet<TaskId> = HashSet::new();
    let mut frontier = vec![from];
    while let Some(current) = frontier.pop() {
        if current == to {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        if let Some(next) = deps.get(&current) {
            frontier.extend(next.iter().copied());
        }
    }
    false
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
