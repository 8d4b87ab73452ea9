// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Post-completion task review.

use crate::engine::{Engine, EngineError};
use crate::parse;
use pim_core::{Clock, TaskId};
use pim_runner::AgentSpawner;
use tokio_util::sync::CancellationToken;

/// Characters of reviewer output kept on the task record.
const REVIEW_EXCERPT: usize = 2_000;

impl<S: AgentSpawner, C: Clock + 'static> Engine<S, C> {
    /// Spawn the reviewer against a task and record the outcome in
    /// `last_review`.
    pub async fn review_task(&self, task_id: TaskId) -> Result<String, EngineError> {
        let reviewer = self.roster.reviewer.clone().ok_or(EngineError::NoPlanner)?;
        let task = self.store.require_task(task_id)?;
        let spec = self.store.read_spec(task_id).unwrap_or_default();
        let progress = self.store.read_progress(task_id).unwrap_or_default();

        let prompt = format!(
            "Review the completed task {id}: {title}\n\nSpecification:\n{spec}\n\n\
             Completion summary: {summary}\n\nProgress log:\n{progress}\n\n\
             Check the working tree against the specification. End with exactly \
             one verdict token on its own line: SHIP, NEEDS_WORK, or MAJOR_RETHINK.",
            id = task.id,
            title = task.title,
            summary = task.summary.as_deref().unwrap_or("(none)"),
        );
        let invocation = reviewer.invocation(
            "reviewer",
            prompt,
            self.store.paths().root().to_path_buf(),
            format!("reviewer-{task_id}"),
            &self.config,
            None,
        );
        let result = self
            .run_agent(self.spawn_request(invocation, Some(task_id)), CancellationToken::new())
            .await?;
        if result.exit_code != 0 {
            return Err(EngineError::RevisionFailed(format!(
                "reviewer exited with code {}",
                result.exit_code
            )));
        }

        let verdict = parse::parse_verdict(&result.output)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let mut excerpt = result.output.clone();
        let mut end = REVIEW_EXCERPT.min(excerpt.len());
        while !excerpt.is_char_boundary(end) {
            end -= 1;
        }
        excerpt.truncate(end);
        self.store.update_task(task_id, |t| {
            t.last_review = Some(format!("{verdict}: {excerpt}"));
        })?;
        self.store.append_progress(task_id, &self.agent_name, &format!("Reviewed: {verdict}"))?;
        Ok(format!("{verdict}\n\n{}", result.output))
    }
}

#[cfg(test)]
#[path = "review_tests.rs"]
mod tests;
