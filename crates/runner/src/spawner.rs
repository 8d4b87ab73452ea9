// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess spawning and lifetime ownership.
//!
//! A spawned agent owns four things: the process handle, the JSONL parser
//! over its stdout, the temp directory holding its system-prompt file, and
//! (for lobby workers) a keep-alive file. Every exit path releases all four.

use crate::command::{build_args, AgentInvocation};
use crate::shutdown::{race_timeout, shutdown_message, sigkill, sigterm};
use crate::stream::StreamProgress;
use crate::truncate::truncate_output;
use async_trait::async_trait;
use parking_lot::Mutex;
use pim_core::{TaskId, TruncationLimits};
use pim_mesh::Inbox;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

/// Errors from the subprocess runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("spawn failed: {0}")]
    Spawn(#[from] std::io::Error),
    #[error(transparent)]
    Mesh(#[from] pim_mesh::MeshError),
    #[error(transparent)]
    Store(#[from] pim_store::StoreError),
    #[error(transparent)]
    Write(#[from] pim_store::WriteError),
}

/// One subprocess run.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub invocation: AgentInvocation,
    /// Task this worker is bound to, if any
    pub task_id: Option<TaskId>,
    pub grace_period_ms: u64,
    pub truncation: TruncationLimits,
}

/// Collected outcome of a subprocess run.
#[derive(Debug, Clone, Default)]
pub struct AgentResult {
    pub exit_code: i32,
    pub output: String,
    pub truncated: bool,
    pub progress: StreamProgress,
    pub error: Option<String>,
    pub task_id: Option<TaskId>,
    /// The exit followed our shutdown protocol rather than a crash
    pub was_gracefully_shutdown: bool,
}

/// Live view of a running agent, keyed by mesh name.
#[derive(Debug, Clone, Default)]
pub struct LiveAgent {
    pub pid: u32,
    pub progress: StreamProgress,
}

/// Shared registry of running agents, readable by the pool and the overlay.
#[derive(Clone, Default)]
pub struct LiveAgents(Arc<Mutex<HashMap<String, LiveAgent>>>);

impl LiveAgents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<LiveAgent> {
        self.0.lock().get(name).cloned()
    }

    pub fn tokens(&self, name: &str) -> u64 {
        self.0.lock().get(name).map(|a| a.progress.tokens).unwrap_or(0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.lock().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.0.lock().keys().cloned().collect()
    }

    fn insert(&self, name: &str, pid: u32) {
        self.0.lock().insert(name.to_string(), LiveAgent { pid, progress: StreamProgress::default() });
    }

    fn update_progress(&self, name: &str, progress: &StreamProgress) {
        if let Some(agent) = self.0.lock().get_mut(name) {
            agent.progress = progress.clone();
        }
    }

    fn remove(&self, name: &str) {
        self.0.lock().remove(name);
    }
}

/// Spawns one agent subprocess and collects its result.
#[async_trait]
pub trait AgentSpawner: Send + Sync + 'static {
    async fn run(
        &self,
        request: SpawnRequest,
        cancel: CancellationToken,
    ) -> Result<AgentResult, RunnerError>;
}

/// Spawner for local OS subprocesses.
pub struct LocalSpawner {
    inbox: Inbox,
    live: LiveAgents,
}

impl LocalSpawner {
    pub fn new(inbox: Inbox, live: LiveAgents) -> Self {
        Self { inbox, live }
    }

    pub fn live(&self) -> &LiveAgents {
        &self.live
    }
}

/// Per-spawn scratch directory holding the system-prompt file.
struct SpawnDir {
    path: PathBuf,
}

impl SpawnDir {
    fn create() -> std::io::Result<Self> {
        use std::os::unix::fs::DirBuilderExt;
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let path = std::env::temp_dir().join(format!("pim-spawn-{}-{}", std::process::id(), nanos));
        std::fs::DirBuilder::new().mode(0o700).create(&path)?;
        Ok(Self { path })
    }

    fn write_system_prompt(&self, content: &str) -> std::io::Result<PathBuf> {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let path = self.path.join("system-prompt.md");
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&path)?;
        file.write_all(content.as_bytes())?;
        Ok(path)
    }
}

impl Drop for SpawnDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#[async_trait]
impl AgentSpawner for LocalSpawner {
    async fn run(
        &self,
        request: SpawnRequest,
        cancel: CancellationToken,
    ) -> Result<AgentResult, RunnerError> {
        let invocation = &request.invocation;

        let spawn_dir = SpawnDir::create()?;
        let system_prompt_path = match &invocation.system_prompt {
            Some(content) => Some(spawn_dir.write_system_prompt(content)?),
            None => None,
        };

        let mut command = tokio::process::Command::new(&invocation.program);
        command
            .args(build_args(invocation, system_prompt_path.as_deref()))
            .current_dir(&invocation.cwd)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);
        for (key, value) in &invocation.env {
            command.env(key, value);
        }
        command.env("PI_AGENT_NAME", &invocation.agent_name);
        if invocation.is_worker {
            command.env(pim_mesh::CREW_WORKER_ENV, "1");
        }

        let mut child = command.spawn()?;
        let pid = child.id().unwrap_or(0);
        self.live.insert(&invocation.agent_name, pid);
        tracing::info!(agent = %invocation.agent_name, role = %invocation.role, pid, "agent spawned");

        let stdout = child.stdout.take();
        let mut lines = stdout.map(|s| BufReader::new(s).lines());

        let mut progress = StreamProgress::default();
        let mut output = String::new();
        let mut was_gracefully_shutdown = false;

        loop {
            let next_line = async {
                match &mut lines {
                    Some(lines) => lines.next_line().await,
                    None => Ok(None),
                }
            };
            tokio::select! {
                line = next_line => match line {
                    Ok(Some(line)) => {
                        progress.apply_line(&line);
                        self.live.update_progress(&invocation.agent_name, &progress);
                        output.push_str(&line);
                        output.push('\n');
                    }
                    Ok(None) | Err(_) => break,
                },
                _ = cancel.cancelled(), if !was_gracefully_shutdown => {
                    was_gracefully_shutdown = true;
                    let now = pim_core::Clock::epoch_ms(&pim_core::SystemClock);
                    let _ = self.inbox.send_text(
                        "orchestrator",
                        &invocation.agent_name,
                        &shutdown_message("The run you belong to is shutting down."),
                        now,
                        None,
                    );
                    if !race_timeout(child.wait(), request.grace_period_ms).await {
                        tracing::warn!(agent = %invocation.agent_name, "grace expired, sending SIGTERM");
                        sigterm(pid);
                        if !race_timeout(child.wait(), request.grace_period_ms).await {
                            tracing::warn!(agent = %invocation.agent_name, "still alive, sending SIGKILL");
                            sigkill(pid);
                        }
                    }
                    break;
                }
            }
        }

        let status = child.wait().await?;
        self.live.remove(&invocation.agent_name);

        let exit_code = status.code().unwrap_or(-1);
        let (output, truncated) = truncate_output(&output, request.truncation);
        tracing::info!(
            agent = %invocation.agent_name,
            exit_code,
            tokens = progress.tokens,
            graceful = was_gracefully_shutdown,
            "agent exited"
        );

        Ok(AgentResult {
            exit_code,
            output,
            truncated,
            error: progress.error.clone(),
            progress,
            task_id: request.task_id,
            was_gracefully_shutdown,
        })
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSpawner;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use std::collections::VecDeque;

    type Handler = Box<dyn Fn(&SpawnRequest) -> AgentResult + Send + Sync>;

    /// Scripted spawner for tests: returns queued results, or runs a handler
    /// closure against each request.
    #[derive(Default)]
    pub struct FakeSpawner {
        results: Mutex<VecDeque<AgentResult>>,
        handler: Mutex<Option<Handler>>,
        pub calls: Mutex<Vec<SpawnRequest>>,
        block_until_cancel: std::sync::atomic::AtomicBool,
    }

    impl FakeSpawner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make `run` park until the cancellation token fires, imitating a
        /// long-lived worker.
        pub fn block_until_cancel(&self) {
            self.block_until_cancel.store(true, std::sync::atomic::Ordering::SeqCst);
        }

        /// Queue a result to return (FIFO).
        pub fn push_result(&self, result: AgentResult) {
            self.results.lock().push_back(result);
        }

        /// Compute results from the request instead of a queue.
        pub fn set_handler(
            &self,
            handler: impl Fn(&SpawnRequest) -> AgentResult + Send + Sync + 'static,
        ) {
            *self.handler.lock() = Some(Box::new(handler));
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl AgentSpawner for FakeSpawner {
        async fn run(
            &self,
            request: SpawnRequest,
            cancel: CancellationToken,
        ) -> Result<AgentResult, RunnerError> {
            self.calls.lock().push(request.clone());
            if self.block_until_cancel.load(std::sync::atomic::Ordering::SeqCst) {
                cancel.cancelled().await;
            }
            if let Some(handler) = &*self.handler.lock() {
                let mut result = handler(&request);
                result.task_id = result.task_id.or(request.task_id);
                return Ok(result);
            }
            let mut result = self.results.lock().pop_front().unwrap_or_default();
            result.task_id = result.task_id.or(request.task_id);
            Ok(result)
        }
    }
}

#[cfg(test)]
#[path = "spawner_tests.rs"]
mod tests;
