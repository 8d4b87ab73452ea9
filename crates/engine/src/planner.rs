// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planner/reviewer refinement loop.
//!
//! Planning never corrupts the task store: tasks are only materialized after
//! the pass loop produced at least one parseable output, and a pass-1
//! planner failure deletes the plan it just created.

use crate::engine::{Engine, EngineError};
use crate::parse::{self, Verdict};
use crate::prompts;
use pim_core::{Clock, FeedEventKind, PlanningPhase, Severity, TaskId, TaskStatus, PROMPT_SENTINEL};
use pim_runner::AgentSpawner;
use std::collections::HashMap;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// PRD filenames tried in order, at the project root and under `docs/`.
pub const PRD_DISCOVERY: &[&str] = &[
    "PRD.md",
    "prd.md",
    "SPEC.md",
    "spec.md",
    "REQUIREMENTS.md",
    "DESIGN.md",
    "PLAN.md",
];

/// Planning request.
#[derive(Debug, Clone, Default)]
pub struct PlanParams {
    /// Explicit PRD path, relative to the project root or absolute
    pub prd: Option<String>,
    /// Inline spec; also acts as the steering prompt on re-plans
    pub prompt: Option<String>,
    /// Queue autonomous work after success (default true)
    pub auto_work: Option<bool>,
}

/// Result of a successful planning run.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub prd: String,
    pub task_ids: Vec<TaskId>,
    pub passes_run: u32,
    /// Output could not be parsed into tasks; the spec was kept on disk and
    /// the user should create tasks manually.
    pub parse_warning: bool,
}

impl<S: AgentSpawner, C: Clock + 'static> Engine<S, C> {
    /// Run the full planning pipeline.
    pub async fn plan(&self, params: PlanParams) -> Result<PlanOutcome, EngineError> {
        let paths = self.store.paths().clone();
        let tasks = self.store.all_tasks();

        // Preconditions.
        if self.store.has_plan() && !tasks.is_empty() && params.prompt.is_none() {
            return Err(EngineError::PlanExists);
        }
        if self.coordinator.is_planning_active() {
            return Err(EngineError::PlanningActive);
        }
        let replanning = !tasks.is_empty();
        if replanning {
            let any_running = tasks.iter().any(|t| t.status == TaskStatus::InProgress)
                || self.has_live_workers();
            if any_running {
                return Err(EngineError::TasksInProgress);
            }
            // Prompt-driven re-plan: wipe tasks, keep the plan and progress.
            self.store.wipe_tasks()?;
        }

        // Source selection.
        let (prd_path, prd_content) = self.select_source(&params)?;

        // Initialize planning state.
        let plan_prompt = (prd_path == PROMPT_SENTINEL).then(|| prd_content.clone());
        self.store.create_plan(&prd_path, plan_prompt.as_deref())?;
        self.init_progress_file(&params, replanning)?;
        let run = self.coordinator.start_planning_run(&paths, self.config.planning.max_passes);
        self.coordinator.set_planning_phase(&paths, PlanningPhase::ReadPrd, 1);
        self.feed_event(FeedEventKind::PlanStart, Some(&prd_path), None);

        let planner =
            self.roster.planner.clone().ok_or(EngineError::NoPlanner)?;
        let max_passes = self.config.planning.max_passes.max(1);

        // Pass loop.
        let mut last_output: Option<String> = None;
        let mut last_review: Option<String> = None;
        let mut passes_run = 0u32;
        for pass in 1..=max_passes {
            let phase =
                if pass == 1 { PlanningPhase::ScanCode } else { PlanningPhase::GapAnalysis };
            self.coordinator.set_planning_phase(&paths, phase, pass);
            self.feed_event(FeedEventKind::PlanPassStart, Some(&format!("pass-{pass}")), None);

            let prompt = match &last_output {
                None => prompts::planner_first_pass(&prd_path, &prd_content),
                Some(previous) => prompts::planner_refinement(
                    pass,
                    &prd_content,
                    previous,
                    last_review.as_deref(),
                ),
            };
            let invocation = planner.invocation(
                "planner",
                prompt,
                paths.root().to_path_buf(),
                format!("planner-{}", &run.run_id[..8]),
                &self.config,
                None,
            );
            let result = self
                .run_agent(self.spawn_request(invocation, None), CancellationToken::new())
                .await?;

            if self.coordinator.planning_cancelled() {
                self.feed_event(FeedEventKind::PlanCancel, None, None);
                self.coordinator.clear_planning(&paths);
                return Err(EngineError::Cancelled);
            }

            if result.exit_code != 0 {
                if pass == 1 {
                    let message = result
                        .error
                        .unwrap_or_else(|| format!("planner exited with code {}", result.exit_code));
                    self.feed_event(FeedEventKind::PlanFailed, None, Some(&message));
                    self.notifier
                        .notify(Severity::Error, &format!("planning failed: {message}"));
                    self.store.delete_plan()?;
                    self.coordinator.clear_planning(&paths);
                    return Err(EngineError::PlannerFailed(message));
                }
                tracing::warn!(pass, exit_code = result.exit_code, "planner pass failed, keeping previous output");
                self.notifier.notify(
                    Severity::Warning,
                    &format!("planner pass {pass} failed; keeping the previous pass"),
                );
                break;
            }

            passes_run = pass;
            self.append_progress_section(&format!("### Pass {pass}"), &result.output)?;
            last_output = Some(result.output);
            self.coordinator.set_planning_phase(&paths, PlanningPhase::BuildTaskGraph, pass);
            self.feed_event(FeedEventKind::PlanPassDone, Some(&format!("pass-{pass}")), None);

            if pass == max_passes {
                break;
            }
            let Some(reviewer) = self.roster.reviewer.clone() else { break };
            if !self.config.review.enabled || pass > self.config.review.max_iterations {
                break;
            }

            self.coordinator.set_planning_phase(&paths, PlanningPhase::ReviewPass, pass);
            self.feed_event(FeedEventKind::PlanReviewStart, Some(&format!("pass-{pass}")), None);
            let review_prompt = prompts::reviewer_prompt(
                last_output.as_deref().unwrap_or_default(),
                last_review.as_deref(),
            );
            let review_invocation = reviewer.invocation(
                "reviewer",
                review_prompt,
                paths.root().to_path_buf(),
                format!("reviewer-{}", &run.run_id[..8]),
                &self.config,
                None,
            );
            let review = self
                .run_agent(self.spawn_request(review_invocation, None), CancellationToken::new())
                .await?;
            if self.coordinator.planning_cancelled() {
                self.feed_event(FeedEventKind::PlanCancel, None, None);
                self.coordinator.clear_planning(&paths);
                return Err(EngineError::Cancelled);
            }
            if review.exit_code != 0 {
                tracing::warn!(pass, "reviewer failed, accepting current plan");
                break;
            }

            let verdict = parse::parse_verdict(&review.output);
            let verdict_label = verdict.map(|v| v.to_string()).unwrap_or_else(|| "UNKNOWN".into());
            self.append_progress_section(
                &format!("### Review {pass} — {verdict_label}"),
                &review.output,
            )?;
            self.feed_event(
                FeedEventKind::PlanReviewDone,
                Some(&format!("pass-{pass}")),
                Some(&verdict_label),
            );
            last_review = Some(review.output);
            if verdict == Some(Verdict::Ship) {
                break;
            }
        }

        let output = last_output.ok_or(EngineError::ParserFailed)?;

        // Always preserve the planner's final output as the plan spec.
        pim_store::write_atomic(&paths.plan_spec_path(), output.as_bytes())?;
        if let Some(outline) = parse::extract_outline(&output) {
            pim_store::write_atomic(&paths.planning_outline_path(), outline.as_bytes())?;
        }

        let parsed = parse::parse_tasks(&output);
        let task_ids = match parsed {
            Some(parsed_tasks) => self.materialize_tasks(&parsed_tasks)?,
            None => Vec::new(),
        };
        let parse_warning = task_ids.is_empty();
        if parse_warning {
            self.notifier.notify(
                Severity::Warning,
                "planner output kept as the plan spec, but no tasks could be parsed; \
                 create tasks manually",
            );
        }

        // Finalize.
        self.coordinator.set_planning_phase(&paths, PlanningPhase::Finalizing, passes_run);
        self.coordinator.finish_planning_run(&paths);
        self.feed_event(
            FeedEventKind::PlanDone,
            None,
            Some(&format!("{} tasks", task_ids.len())),
        );
        self.coordinator.queue_planning_overlay(&run.run_id);
        if params.auto_work.unwrap_or(true) && !parse_warning {
            self.coordinator.set_pending_auto_work(paths.root());
        }

        Ok(PlanOutcome { prd: prd_path, task_ids, passes_run, parse_warning })
    }

    /// Explicit PRD, discovered PRD, or inline prompt, in that order.
    fn select_source(&self, params: &PlanParams) -> Result<(String, String), EngineError> {
        let root = self.store.paths().root().to_path_buf();
        if let Some(prd) = &params.prd {
            let path = if Path::new(prd).is_absolute() {
                Path::new(prd).to_path_buf()
            } else {
                root.join(prd)
            };
            let content = std::fs::read_to_string(&path)
                .map_err(|_| EngineError::PrdNotFound(prd.clone()))?;
            return Ok((prd.clone(), prompts::truncate_prd(&content)));
        }
        for candidate in PRD_DISCOVERY.iter().map(|n| n.to_string()).chain(
            PRD_DISCOVERY.iter().map(|n| format!("docs/{n}")),
        ) {
            let path = root.join(&candidate);
            if let Ok(content) = std::fs::read_to_string(&path) {
                return Ok((candidate, prompts::truncate_prd(&content)));
            }
        }
        match &params.prompt {
            Some(prompt) => Ok((PROMPT_SENTINEL.to_string(), prompts::truncate_prd(prompt))),
            None => Err(EngineError::NoPrd),
        }
    }

    /// Ensure the progress file exists with its Notes preamble, inject any
    /// steering prompt, and open a new run header.
    fn init_progress_file(&self, params: &PlanParams, replanning: bool) -> Result<(), EngineError> {
        let path = self.store.paths().planning_progress_path();
        let mut content = pim_store::read_string(&path)
            .unwrap_or_else(|| "# Planning Progress\n\n## Notes\n".to_string());
        if replanning {
            if let Some(steering) = &params.prompt {
                // Steering prompts land under Notes so later passes see them.
                if let Some(at) = content.find("## Notes") {
                    let insert_at = content[at..]
                        .find('\n')
                        .map(|n| at + n + 1)
                        .unwrap_or(content.len());
                    content.insert_str(insert_at, &format!("- steering: {steering}\n"));
                } else {
                    content.push_str(&format!("\n## Notes\n- steering: {steering}\n"));
                }
            }
        }
        content.push_str(&format!(
            "\n## Run {}\n",
            self.store.clock().now_iso(),
        ));
        pim_store::write_atomic(&path, content.as_bytes())?;
        Ok(())
    }

    fn append_progress_section(&self, header: &str, body: &str) -> Result<(), EngineError> {
        let path = self.store.paths().planning_progress_path();
        let mut content = pim_store::read_string(&path).unwrap_or_default();
        content.push_str(&format!("\n{header}\n\n{body}\n"));
        pim_store::write_atomic(&path, content.as_bytes())?;
        Ok(())
    }

    /// Create tasks, resolve dependency references through the alias table,
    /// and prune transitive edges.
    fn materialize_tasks(
        &self,
        parsed: &[parse::ParsedTask],
    ) -> Result<Vec<TaskId>, EngineError> {
        let mut ids: Vec<TaskId> = Vec::with_capacity(parsed.len());
        let mut aliases: HashMap<String, TaskId> = HashMap::new();
        for (index, task) in parsed.iter().enumerate() {
            let created = self.store.create_task(&task.title, task.description.as_deref(), &[])?;
            aliases.insert(task.title.trim().to_ascii_lowercase(), created.id);
            aliases.insert(format!("task {}", index + 1), created.id);
            aliases.insert(format!("task-{}", index + 1), created.id);
            ids.push(created.id);
        }
        for (task, id) in parsed.iter().zip(ids.iter()) {
            let resolved: Vec<TaskId> = task
                .depends_on
                .iter()
                .filter_map(|reference| {
                    let key = reference.trim().to_ascii_lowercase();
                    let dep = aliases.get(&key).copied();
                    if dep.is_none() {
                        tracing::warn!(task = %id, reference, "dropping unresolvable dependency");
                    }
                    dep.filter(|dep| dep != id)
                })
                .collect();
            if !resolved.is_empty() {
                self.store.update_task(*id, |t| t.depends_on = resolved)?;
            }
        }
        self.store.prune_transitive_deps(&ids)?;
        Ok(ids)
    }
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
