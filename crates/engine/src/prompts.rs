// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt construction for planner, reviewer, worker, and revise agents.

use pim_core::{DependencyMode, Task};

/// Cap applied to PRD content fed into prompts.
pub const MAX_PRD_SIZE: usize = 100_000;

/// Marker appended when the PRD was cut at [`MAX_PRD_SIZE`].
pub const PRD_TRUNCATION_MARKER: &str = "\n[PRD truncated]";

/// Truncate PRD content to the documented byte cap.
pub fn truncate_prd(content: &str) -> String {
    if content.len() <= MAX_PRD_SIZE {
        return content.to_string();
    }
    let mut end = MAX_PRD_SIZE;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &content[..end], PRD_TRUNCATION_MARKER)
}

const OUTPUT_CONTRACT: &str = "\
Structure your answer as four numbered sections:\n\
## 1. Understanding — what the product requires\n\
## 2. Current state — what already exists in the codebase\n\
## 3. Gaps — what is missing or wrong\n\
## 4. Plan — the build order and why\n\
\n\
Then emit the task list as a fenced block tagged `tasks-json` containing a \
JSON array of {\"title\", \"description\", \"dependsOn\": [titles or task-N ids]}. \
Titles must be short and unique. Use dependsOn only for hard ordering \
constraints.";

/// First planning pass: read the PRD, scan the code, produce the graph.
pub fn planner_first_pass(prd_path: &str, prd_content: &str) -> String {
    format!(
        "You are the planning agent for this project. Read the product \
         requirements below (from {prd_path}), scan the codebase, and break \
         the work into independent tasks a crew of coding agents can execute \
         in parallel waves.\n\n{OUTPUT_CONTRACT}\n\n---\n{prd}\n",
        prd = truncate_prd(prd_content),
    )
}

/// Refinement pass: improve the previous pass, folding in review feedback.
pub fn planner_refinement(
    pass: u32,
    prd_content: &str,
    previous_output: &str,
    review: Option<&str>,
) -> String {
    let review_section = match review {
        Some(review) => format!("\n\nReviewer feedback on the previous pass:\n{review}\n"),
        None => String::new(),
    };
    format!(
        "This is planning pass {pass}. Refine the plan below: close gaps, fix \
         dependency mistakes, split oversized tasks, and drop busywork. Keep \
         what is already right.{review_section}\n\n{OUTPUT_CONTRACT}\n\n\
         Previous pass:\n---\n{previous_output}\n---\n\nRequirements:\n---\n{prd}\n",
        prd = truncate_prd(prd_content),
    )
}

/// Reviewer prompt for one pass. Must end with a verdict token.
pub fn reviewer_prompt(planner_output: &str, prior_review: Option<&str>) -> String {
    let prior = match prior_review {
        Some(prior) => format!("\n\nYour previous review:\n{prior}\n"),
        None => String::new(),
    };
    format!(
        "You are reviewing a task plan produced by another agent. Judge \
         whether the task breakdown is complete, correctly ordered, and \
         right-sized for parallel execution.{prior}\n\nEnd with exactly one \
         verdict token on its own line: SHIP, NEEDS_WORK, or MAJOR_RETHINK.\n\n\
         Plan under review:\n---\n{planner_output}\n",
    )
}

/// Worker prompt for a task in a wave.
pub fn worker_prompt(
    task: &Task,
    spec: &str,
    mode: DependencyMode,
    dependency_summaries: &[(String, String)],
) -> String {
    let mut prompt = format!(
        "You are a crew worker. Your task is {id}: {title}\n\n\
         The task has already been started on your behalf — do NOT call \
         task.start. When done, call task.done with a one-line summary (and \
         evidence if you have it). If you cannot proceed, call task.block \
         with a concrete reason.\n\nSpecification:\n{spec}\n",
        id = task.id,
        title = task.title,
    );
    if !dependency_summaries.is_empty() {
        match mode {
            DependencyMode::Strict => {
                prompt.push_str("\nCompleted dependencies:\n");
            }
            DependencyMode::Advisory => {
                prompt.push_str(
                    "\nDeclared dependencies (advisory — they may still be in flight; \
                     coordinate through the mesh if you overlap):\n",
                );
            }
        }
        for (id, summary) in dependency_summaries {
            prompt.push_str(&format!("- {id}: {summary}\n"));
        }
    }
    prompt
}

/// Single-task revision prompt.
pub fn revise_prompt(
    task: &Task,
    spec: &str,
    progress: Option<&str>,
    block_context: Option<&str>,
    prd_excerpt: Option<&str>,
    instructions: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Revise the specification of {id}: {title}\n\nCurrent spec:\n{spec}\n",
        id = task.id,
        title = task.title,
    );
    if let Some(progress) = progress {
        prompt.push_str(&format!("\nProgress so far:\n{progress}\n"));
    }
    if let Some(block) = block_context {
        prompt.push_str(&format!("\nThe task is blocked:\n{block}\n"));
    }
    if let Some(prd) = prd_excerpt {
        prompt.push_str(&format!("\nProduct context:\n{prd}\n"));
    }
    if let Some(instructions) = instructions {
        prompt.push_str(&format!("\nRevision request:\n{instructions}\n"));
    }
    prompt.push_str(
        "\nEmit the revised task as a fenced block tagged `revised-task` \
         containing JSON {\"title\"?, \"spec\"}. The spec must be complete and \
         self-contained; the title only if it should change.",
    );
    prompt
}

/// Subtree revision prompt for revise-tree.
pub fn revise_tree_prompt(
    subtree: &[(Task, String)],
    instructions: Option<&str>,
) -> String {
    let mut prompt = String::from(
        "Revise the following task subtree. You may update existing tasks \
         (keep their id), and add new tasks (no id).\n\n",
    );
    for (task, spec) in subtree {
        prompt.push_str(&format!(
            "--- {id} [{status}]: {title}\n{spec}\n\n",
            id = task.id,
            status = task.status,
            title = task.title,
        ));
    }
    if let Some(instructions) = instructions {
        prompt.push_str(&format!("Revision request:\n{instructions}\n\n"));
    }
    prompt.push_str(
        "Emit a fenced block tagged `tasks-json` with a JSON array of \
         {\"id\"?, \"title\", \"description\", \"dependsOn\"}. Entries with an \
         id must name tasks from the subtree above; entries without an id are \
         created as new tasks.",
    );
    prompt
}

#[cfg(test)]
#[path = "prompts_tests.rs"]
mod tests;
