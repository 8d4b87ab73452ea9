// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planner/reviewer output parsing.
//!
//! Planners emit four numbered `## N.` sections and a fenced `tasks-json`
//! block. When the fence is missing, a `### Task N:` markdown fallback is
//! tried. Reviewers emit a single verdict token.

use serde::Deserialize;

/// A task parsed from planner output, dependencies still unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParsedTask {
    /// Present only in revise-tree output, naming an existing task
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "dependsOn")]
    pub depends_on: Vec<String>,
}

/// Reviewer verdict token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ship,
    NeedsWork,
    MajorRethink,
}

pim_core::simple_display! {
    Verdict {
        Ship => "SHIP",
        NeedsWork => "NEEDS_WORK",
        MajorRethink => "MAJOR_RETHINK",
    }
}

/// Extract the body of the first fenced block tagged `tag`.
pub fn extract_fenced_block(output: &str, tag: &str) -> Option<String> {
    let mut in_block = false;
    let mut body = String::new();
    for line in output.lines() {
        let trimmed = line.trim();
        if !in_block {
            if trimmed.strip_prefix("```").map(str::trim) == Some(tag) {
                in_block = true;
            }
        } else if trimmed == "```" {
            return Some(body);
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }
    None
}

/// Parse a `tasks-json` fenced block into tasks.
pub fn parse_tasks_json(output: &str) -> Option<Vec<ParsedTask>> {
    let body = extract_fenced_block(output, "tasks-json")?;
    let tasks: Vec<ParsedTask> = serde_json::from_str(&body).ok()?;
    (!tasks.is_empty()).then_some(tasks)
}

fn dependency_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .filter(|d| !matches!(d.to_ascii_lowercase().as_str(), "none" | "n/a" | "-"))
        .map(str::to_string)
        .collect()
}

/// Markdown fallback: `### Task N: title` headers with optional
/// `Dependencies:` lines; the rest of each section is the description.
pub fn parse_tasks_markdown(output: &str) -> Option<Vec<ParsedTask>> {
    let mut tasks: Vec<ParsedTask> = Vec::new();
    let mut current: Option<(String, Vec<String>, Vec<String>)> = None;

    let flush = |current: &mut Option<(String, Vec<String>, Vec<String>)>,
                 tasks: &mut Vec<ParsedTask>| {
        if let Some((title, deps, body)) = current.take() {
            let description = body.join("\n").trim().to_string();
            tasks.push(ParsedTask {
                id: None,
                title,
                description: (!description.is_empty()).then_some(description),
                depends_on: deps,
            });
        }
    };

    for line in output.lines() {
        let trimmed = line.trim();
        if let Some(header) = trimmed.strip_prefix("### Task ") {
            flush(&mut current, &mut tasks);
            let title = header.split_once(':').map(|(_, t)| t.trim()).unwrap_or("").to_string();
            if title.is_empty() {
                current = None;
                continue;
            }
            current = Some((title, Vec::new(), Vec::new()));
        } else if let Some((_, deps, body)) = current.as_mut() {
            if let Some(raw) = trimmed
                .strip_prefix("Dependencies:")
                .or_else(|| trimmed.strip_prefix("**Dependencies:**"))
            {
                *deps = dependency_list(raw);
            } else if trimmed.starts_with("## ") {
                flush(&mut current, &mut tasks);
            } else {
                body.push(line.to_string());
            }
        }
    }
    flush(&mut current, &mut tasks);
    (!tasks.is_empty()).then_some(tasks)
}

/// Parse tasks from planner output: fenced block first, markdown fallback.
pub fn parse_tasks(output: &str) -> Option<Vec<ParsedTask>> {
    parse_tasks_json(output).or_else(|| parse_tasks_markdown(output))
}

/// Extract the four numbered outline sections (`## 1.` through `## 4.`).
///
/// Returns the text from the first `## 1.` header to the end of the fourth
/// section (exclusive of any later fenced task block).
pub fn extract_outline(output: &str) -> Option<String> {
    let mut sections: Vec<String> = Vec::new();
    let mut current: Option<Vec<String>> = None;
    let mut expecting = 1u32;

    for line in output.lines() {
        let trimmed = line.trim();
        let is_numbered_header = trimmed
            .strip_prefix("## ")
            .and_then(|rest| rest.split('.').next())
            .and_then(|n| n.parse::<u32>().ok());
        match is_numbered_header {
            Some(n) if n == expecting => {
                if let Some(body) = current.take() {
                    sections.push(body.join("\n"));
                }
                current = Some(vec![line.to_string()]);
                expecting += 1;
            }
            _ => {
                if trimmed.starts_with("```") {
                    // outline never includes fenced blocks
                    if let Some(body) = current.take() {
                        sections.push(body.join("\n"));
                    }
                } else if let Some(body) = current.as_mut() {
                    body.push(line.to_string());
                }
            }
        }
        if expecting > 4 && current.is_none() {
            break;
        }
    }
    if let Some(body) = current.take() {
        sections.push(body.join("\n"));
    }
    (sections.len() == 4).then(|| sections.join("\n\n").trim().to_string())
}

/// Find the reviewer's verdict token. The last occurrence wins; specific
/// tokens are checked before `SHIP` so "NOT READY TO SHIP" prose cannot
/// produce a false positive when a real token exists later.
pub fn parse_verdict(output: &str) -> Option<Verdict> {
    let mut verdict = None;
    for line in output.lines() {
        let line = line.trim();
        if line.contains("MAJOR_RETHINK") {
            verdict = Some(Verdict::MajorRethink);
        } else if line.contains("NEEDS_WORK") {
            verdict = Some(Verdict::NeedsWork);
        } else if line.contains("SHIP") {
            verdict = Some(Verdict::Ship);
        }
    }
    verdict
}

/// A single-task revision parsed from a `revised-task` fenced block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RevisedTask {
    #[serde(default)]
    pub title: Option<String>,
    pub spec: String,
}

/// Parse the `revised-task` block. `spec` must be non-empty.
pub fn parse_revised_task(output: &str) -> Option<RevisedTask> {
    let body = extract_fenced_block(output, "revised-task")?;
    let revised: RevisedTask = serde_json::from_str(&body).ok()?;
    (!revised.spec.trim().is_empty()).then_some(revised)
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
