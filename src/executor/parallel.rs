// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Group fan-out over a bounded pool of host tasks.

use async_trait::async_trait;
use futures::future::join_all;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

use super::host_task::{ExecutionContext, HostTask};
use super::result_types::{FailureReason, GroupSummary, HostOutcome};
use crate::device::{partition_batches, GroupTargets, ResolvedTarget};
use crate::shared::{PersistenceError, TargetResolutionError};

/// Operator confirmation between console batches.
#[async_trait]
pub trait BatchGate: Send + Sync {
    /// `next` is the 1-based index of the batch about to start.
    async fn confirm(&self, next: usize, total: usize, hostnames: &[String]) -> bool;
}

/// Asks on stdin; anything but `y`/`yes` declines.
pub struct StdinGate;

#[async_trait]
impl BatchGate for StdinGate {
    async fn confirm(&self, next: usize, total: usize, hostnames: &[String]) -> bool {
        let question = format!(
            "Swap the console cables and continue with batch {next}/{total} ({})? [y/N] ",
            hostnames.join(", ")
        );
        let answer = tokio::task::spawn_blocking(move || {
            let mut stdout = io::stdout().lock();
            write!(stdout, "{question}").and_then(|_| stdout.flush())?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok::<_, io::Error>(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Ok(Err(e)) => {
                tracing::warn!("Failed to read confirmation: {}", e);
                false
            }
            Err(e) => {
                tracing::warn!("Confirmation prompt task failed: {}", e);
                false
            }
        }
    }
}

/// Confirms every batch.
pub struct AutoConfirm;

#[async_trait]
impl BatchGate for AutoConfirm {
    async fn confirm(&self, _next: usize, _total: usize, _hostnames: &[String]) -> bool {
        true
    }
}

pub struct GroupExecutor {
    context: Arc<ExecutionContext>,
    workers: usize,
}

impl GroupExecutor {
    pub fn new(context: Arc<ExecutionContext>, workers: usize) -> Self {
        Self {
            context,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every resolved member, then report the members that could not be
    /// resolved as failures.
    pub async fn run(&self, group: GroupTargets) -> Result<Vec<HostOutcome>, PersistenceError> {
        self.begin();
        let mut outcomes = self.run_pool(group.targets).await?;
        outcomes.extend(self.unresolved(group.unresolved));
        self.context.display.flush_ordered();
        Ok(outcomes)
    }

    /// Console groups: consecutive batches that reuse the same serial ports,
    /// with `gate` consulted before each batch after the first.
    pub async fn run_batched(
        &self,
        group: GroupTargets,
        batch_size: usize,
        gate: &dyn BatchGate,
    ) -> Result<Vec<HostOutcome>, PersistenceError> {
        self.begin();
        let batches = partition_batches(&group.targets, batch_size);
        let total = batches.len();
        let mut outcomes = Vec::with_capacity(group.targets.len());

        let mut iter = batches.into_iter().enumerate();
        while let Some((index, batch)) = iter.next() {
            if index > 0 {
                let hostnames: Vec<String> = batch.iter().map(|t| t.hostname.clone()).collect();
                if !gate.confirm(index + 1, total, &hostnames).await {
                    self.context
                        .display
                        .warn(&format!("Stopped before batch {}/{}", index + 1, total));
                    let skipped = std::iter::once(batch).chain(iter.by_ref().map(|(_, rest)| rest));
                    outcomes.extend(skipped.flatten().map(|target| {
                        HostOutcome::failure(target.hostname, FailureReason::Skipped)
                    }));
                    break;
                }
            }
            tracing::debug!("Console batch {}/{}: {} hosts", index + 1, total, batch.len());
            outcomes.extend(self.run_pool(batch).await?);
        }

        outcomes.extend(self.unresolved(group.unresolved));
        self.context.display.flush_ordered();
        Ok(outcomes)
    }

    fn begin(&self) {
        if self.context.request.wants_ordering(true) {
            self.context.display.enable_ordering();
        }
    }

    async fn run_pool(
        &self,
        targets: Vec<ResolvedTarget>,
    ) -> Result<Vec<HostOutcome>, PersistenceError> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let hostnames: Vec<String> = targets.iter().map(|t| t.hostname.clone()).collect();

        let tasks: Vec<_> = targets
            .into_iter()
            .map(|target| {
                let context = Arc::clone(&self.context);
                let semaphore = Arc::clone(&semaphore);
                tokio::spawn(async move {
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            return Ok(HostOutcome::failure(
                                target.hostname,
                                FailureReason::Aborted(format!("worker pool closed: {e}")),
                            ))
                        }
                    };
                    HostTask::new(context, target).run().await
                })
            })
            .collect();

        let results = join_all(tasks).await;
        self.collect_results(hostnames, results)
    }

    fn collect_results(
        &self,
        hostnames: Vec<String>,
        results: Vec<Result<Result<HostOutcome, PersistenceError>, JoinError>>,
    ) -> Result<Vec<HostOutcome>, PersistenceError> {
        let mut outcomes = Vec::with_capacity(results.len());
        let mut first_error = None;

        for (hostname, result) in hostnames.into_iter().zip(results) {
            match result {
                Ok(Ok(outcome)) => outcomes.push(outcome),
                Ok(Err(e)) => {
                    tracing::error!("[{}] failed to save log: {}", hostname, e);
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    tracing::error!("Task failed for host {}: {}", hostname, e);
                    self.context
                        .display
                        .error(&format!("unhandled failure on {hostname}: {e}"));
                    outcomes.push(HostOutcome::failure(
                        hostname,
                        FailureReason::Aborted(e.to_string()),
                    ));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(outcomes),
        }
    }

    fn unresolved(
        &self,
        unresolved: Vec<(String, TargetResolutionError)>,
    ) -> Vec<HostOutcome> {
        unresolved
            .into_iter()
            .map(|(key, err)| {
                self.context.display.error(&format!("<NODE: {key}> {err}"));
                HostOutcome::failure(key, FailureReason::from(&err))
            })
            .collect()
    }

    /// Print the closing line of a group run.
    pub fn report(&self, summary: &GroupSummary) {
        let display = &self.context.display;
        if summary.failed.is_empty() {
            display.success(&format!("all {} hosts completed", summary.total()));
            return;
        }
        let mut failed = summary.failed_hostnames();
        failed.sort_unstable();
        display.warn(&format!(
            "{} of {} hosts failed: {}",
            failed.len(),
            summary.total(),
            failed.join(", ")
        ));
    }
}
