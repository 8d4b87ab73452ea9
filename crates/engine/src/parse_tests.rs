// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const PLANNER_OUTPUT: &str = r#"## 1. Understanding
The system needs a parser and an evaluator.

## 2. Current state
Greenfield.

## 3. Gaps
Everything.

## 4. Plan
Three tasks, parser first.

```tasks-json
[
  {"title": "Build parser", "description": "Tokenize and parse", "dependsOn": []},
  {"title": "Build evaluator", "dependsOn": ["Build parser"]},
  {"title": "Wire CLI", "dependsOn": ["task 1", "task-2"]}
]
```
"#;

#[test]
fn fenced_block_extraction() {
    assert_eq!(extract_fenced_block("```foo\nbody\n```", "foo").as_deref(), Some("body\n"));
    assert!(extract_fenced_block("```foo\nnever closed", "foo").is_none());
    assert!(extract_fenced_block("no fences", "foo").is_none());
}

#[test]
fn parses_tasks_json_block() {
    let tasks = parse_tasks(PLANNER_OUTPUT).unwrap();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].title, "Build parser");
    assert_eq!(tasks[0].description.as_deref(), Some("Tokenize and parse"));
    assert_eq!(tasks[1].depends_on, vec!["Build parser"]);
    assert_eq!(tasks[2].depends_on, vec!["task 1", "task-2"]);
}

#[test]
fn empty_tasks_json_falls_back_to_markdown() {
    let output = "```tasks-json\n[]\n```\n### Task 1: Only task\nBody here\n";
    let tasks = parse_tasks(output).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Only task");
}

#[test]
fn markdown_fallback_parses_headers_and_deps() {
    let output = r#"
### Task 1: Build parser
Tokenize the input.

### Task 2: Build evaluator
Dependencies: Build parser
Walk the tree.

### Task 3: Polish
Dependencies: none
"#;
    let tasks = parse_tasks_markdown(output).unwrap();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].description.as_deref(), Some("Tokenize the input."));
    assert_eq!(tasks[1].depends_on, vec!["Build parser"]);
    assert!(tasks[2].depends_on.is_empty());
}

#[yare::parameterized(
    none_word = { "none" },
    na        = { "n/a" },
    dash      = { "-" },
    uppercase = { "NONE" },
)]
fn empty_dependency_markers(marker: &str) {
    let output = format!("### Task 1: T\nDependencies: {marker}\n");
    let tasks = parse_tasks_markdown(&output).unwrap();
    assert!(tasks[0].depends_on.is_empty());
}

#[test]
fn outline_extracts_four_sections() {
    let outline = extract_outline(PLANNER_OUTPUT).unwrap();
    assert!(outline.starts_with("## 1. Understanding"));
    assert!(outline.contains("## 4. Plan"));
    assert!(!outline.contains("tasks-json"));
    assert!(!outline.contains("Build parser\","));
}

#[test]
fn outline_requires_all_four() {
    let partial = "## 1. A\n## 2. B\n## 3. C\n";
    assert!(extract_outline(partial).is_none());
}

#[yare::parameterized(
    ship       = { "Looks great.\n\nSHIP", Some(Verdict::Ship) },
    needs_work = { "NEEDS_WORK: deps are wrong", Some(Verdict::NeedsWork) },
    rethink    = { "verdict: MAJOR_RETHINK", Some(Verdict::MajorRethink) },
    last_wins  = { "NEEDS_WORK earlier\nbut final verdict: SHIP", Some(Verdict::Ship) },
    missing    = { "no verdict here", None },
)]
fn verdict_parsing(output: &str, expected: Option<Verdict>) {
    assert_eq!(parse_verdict(output), expected);
}

#[test]
fn revised_task_requires_spec() {
    let ok = "```revised-task\n{\"title\": \"New title\", \"spec\": \"new spec\"}\n```";
    let revised = parse_revised_task(ok).unwrap();
    assert_eq!(revised.title.as_deref(), Some("New title"));
    assert_eq!(revised.spec, "new spec");

    let empty = "```revised-task\n{\"spec\": \"  \"}\n```";
    assert!(parse_revised_task(empty).is_none());
    assert!(parse_revised_task("nothing fenced").is_none());
}

#[test]
fn revise_tree_entries_may_carry_ids() {
    let output = r#"```tasks-json
[
  {"id": "task-2", "title": "Updated B", "description": "new spec"},
  {"title": "Brand new D", "dependsOn": ["task-2"]}
]
```"#;
    let tasks = parse_tasks_json(output).unwrap();
    assert_eq!(tasks[0].id.as_deref(), Some("task-2"));
    assert!(tasks[1].id.is_none());
}
