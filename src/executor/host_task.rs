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

//! The per-host state machine: pre-check, connect, execute, disconnect,
//! persist and display.

use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::output::ResultDisplay;
use super::result_types::{FailureReason, HostOutcome};
use crate::device::{base_device_kind, ResolvedTarget};
use crate::inventory::ListCatalog;
use crate::parser::OutputParser;
use crate::persist::{LogPersister, LogRequest};
use crate::session::{DeviceSession, SessionProvider, DEFAULT_READ_TIMEOUT};
use crate::shared::{ExecutionError, PersistenceError};
use crate::utils::format_elapsed;

/// What to run on each host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSource {
    Single(String),
    CommandsList(String),
    ConfigList(String),
    /// Open the session, report the prompt and close it again.
    ConnectOnly,
}

impl CommandSource {
    /// Command text or list name, used to name log files.
    pub fn subject(&self) -> &str {
        match self {
            CommandSource::Single(text)
            | CommandSource::CommandsList(text)
            | CommandSource::ConfigList(text) => text,
            CommandSource::ConnectOnly => "connect",
        }
    }

    pub fn list_name(&self) -> Option<&str> {
        match self {
            CommandSource::CommandsList(name) | CommandSource::ConfigList(name) => Some(name),
            _ => None,
        }
    }
}

/// Invocation-wide settings, identical for every host.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub source: CommandSource,
    pub parser: Option<OutputParser>,
    /// `Some` when `--log` was given.
    pub log: Option<LogRequest>,
    pub quiet: bool,
    pub no_output: bool,
    pub force: bool,
    pub ordered: bool,
    /// Parser time limit for hosts without their own read timeout.
    pub read_timeout: Duration,
}

impl ExecutionRequest {
    pub fn new(source: CommandSource) -> Self {
        Self {
            source,
            parser: None,
            log: None,
            quiet: false,
            no_output: false,
            force: false,
            ordered: false,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Ordered emission applies only to visible group output.
    pub fn wants_ordering(&self, group: bool) -> bool {
        group && self.ordered && !self.quiet && !self.no_output
    }
}

/// Everything a host task needs, shared across the group through `Arc`.
pub struct ExecutionContext {
    pub request: ExecutionRequest,
    /// Catalog matching the list kind of `request.source`, if it names one.
    pub lists: Option<ListCatalog>,
    pub provider: Arc<dyn SessionProvider>,
    pub persister: LogPersister,
    pub display: ResultDisplay,
}

/// Result text of one host before it is persisted.
struct Collected {
    raw: String,
    structured: Option<Value>,
}

pub struct HostTask {
    context: Arc<ExecutionContext>,
    target: ResolvedTarget,
}

impl HostTask {
    pub fn new(context: Arc<ExecutionContext>, target: ResolvedTarget) -> Self {
        Self { context, target }
    }

    /// Run the host to completion. Host-level problems end up in the
    /// returned outcome. Only log write failures are returned as errors.
    pub async fn run(self) -> Result<HostOutcome, PersistenceError> {
        let started = Instant::now();
        let display = &self.context.display;
        let hostname = self.target.hostname.clone();

        let lines = match self.precheck() {
            Ok(lines) => lines,
            Err(reason) => {
                display.error(&format!("<NODE: {hostname}> {reason}"));
                return Ok(self.abort(reason, started));
            }
        };

        let mut session = match self
            .context
            .provider
            .connect(&self.target.params, &hostname)
            .await
        {
            Ok(session) => session,
            Err(err) => {
                display.error(&err.to_string());
                return Ok(self.abort(FailureReason::from(&err), started));
            }
        };
        display.success(&format!("<NODE: {hostname}> connected"));

        let result = AssertUnwindSafe(self.execute(session.as_mut(), &lines))
            .catch_unwind()
            .await;

        if let Err(e) = session.close().await {
            tracing::debug!("[{}] disconnect failed: {}", hostname, e);
        }

        let result = match result {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!("[{}] host task panicked: {}", hostname, message);
                display.error(&format!("<NODE: {hostname}> execution error: {message}"));
                return Ok(self.abort(FailureReason::Aborted(message), started));
            }
        };

        let collected = match result {
            Ok(collected) => collected,
            Err(err) => {
                let label = match (&err, &self.context.request.parser) {
                    (ExecutionError::Parse(_), Some(parser)) => {
                        format!("{} parse failed", parser.name())
                    }
                    _ => "execution error".to_string(),
                };
                display.error(&format!("<NODE: {hostname}> {label}: {err}"));
                return Ok(self.abort(FailureReason::from(&err), started));
            }
        };

        let display_text = match &collected.structured {
            Some(value) => serde_json::to_string_pretty(value)?,
            None => collected.raw.clone(),
        };

        let log_path = match &self.context.request.log {
            Some(log) => Some(self.persist(log, &collected).await?),
            None => None,
        };

        if self.context.request.quiet {
            display.info(&format!("<NODE: {hostname}> output hidden by --quiet"));
        } else {
            display.result(&hostname, &display_text);
        }

        let elapsed = started.elapsed();
        display.success(&format!(
            "<NODE: {hostname}> done (elapsed: {})",
            format_elapsed(elapsed)
        ));

        Ok(HostOutcome::Success {
            hostname,
            display_text,
            structured: collected.structured,
            log_path,
            elapsed,
        })
    }

    /// Resolve the lines to run and check the list's device type.
    fn precheck(&self) -> Result<Vec<String>, FailureReason> {
        let source = &self.context.request.source;
        let name = match source {
            CommandSource::Single(command) => return Ok(vec![command.clone()]),
            CommandSource::ConnectOnly => return Ok(Vec::new()),
            CommandSource::CommandsList(name) | CommandSource::ConfigList(name) => name,
        };

        let catalog = self.context.lists.as_ref().ok_or_else(|| {
            FailureReason::Resolution(format!("no list document loaded for '{name}'"))
        })?;
        let list = catalog.get(name).map_err(|e| FailureReason::from(&e))?;

        if let Some(list_kind) = list.device_type.as_deref() {
            let host_kind = self.target.params.device_kind();
            if !same_device_kind(list_kind, host_kind) {
                let reason = FailureReason::DeviceKindMismatch {
                    list_kind: list_kind.to_string(),
                    host_kind: host_kind.to_string(),
                };
                if !self.context.request.force {
                    return Err(reason);
                }
                tracing::warn!("[{}] {} (forced)", self.target.hostname, reason);
                self.context.display.warn(&format!(
                    "<NODE: {}> {reason} (continuing because of --force)",
                    self.target.hostname
                ));
            }
        }

        Ok(list.lines.clone())
    }

    async fn execute(
        &self,
        session: &mut dyn DeviceSession,
        lines: &[String],
    ) -> Result<Collected, ExecutionError> {
        let request = &self.context.request;

        match &request.source {
            CommandSource::ConnectOnly => {
                return Ok(Collected {
                    raw: session.prompt().to_string(),
                    structured: None,
                })
            }
            CommandSource::ConfigList(_) => {
                let output = session.send_config_set(lines).await?;
                return Ok(Collected {
                    raw: format!("{}\n", output.trim_end()),
                    structured: None,
                });
            }
            CommandSource::Single(_) | CommandSource::CommandsList(_) => {}
        }

        let parse_timeout = self
            .target
            .params
            .read_timeout_secs()
            .map(Duration::from_secs)
            .unwrap_or(request.read_timeout);
        let mut raw = String::new();
        let mut values = Vec::new();
        for command in lines {
            let output = session.send_command(command).await?;
            raw.push_str(&format!("{} {}\n{}\n", session.prompt(), command, output));
            if let Some(parser) = &request.parser {
                values.push(
                    parser
                        .parse(
                            self.target.params.device_kind(),
                            command,
                            &output,
                            parse_timeout,
                        )
                        .await?,
                );
            }
        }

        let structured = match (&request.parser, &request.source) {
            (None, _) => None,
            (Some(_), CommandSource::Single(_)) => values.pop(),
            (Some(_), _) => Some(Value::Array(values)),
        };
        Ok(Collected { raw, structured })
    }

    async fn persist(
        &self,
        log: &LogRequest,
        collected: &Collected,
    ) -> Result<std::path::PathBuf, PersistenceError> {
        let hostname = &self.target.hostname;
        let display = &self.context.display;
        display.info(&format!("<NODE: {hostname}> saving log"));
        let path = match &collected.structured {
            Some(value) => self.context.persister.save_json(log, hostname, value).await?,
            None => {
                self.context
                    .persister
                    .save_text(log, hostname, &collected.raw)
                    .await?
            }
        };
        display.success(&format!("<NODE: {hostname}> log saved: {}", path.display()));
        Ok(path)
    }

    fn abort(&self, reason: FailureReason, started: Instant) -> HostOutcome {
        self.context.display.warn(&format!(
            "<NODE: {}> aborted (elapsed: {})",
            self.target.hostname,
            format_elapsed(started.elapsed())
        ));
        HostOutcome::failure(self.target.hostname.clone(), reason)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

/// Device kinds match on their base kind, ignoring case and whitespace.
pub fn same_device_kind(list_kind: &str, host_kind: &str) -> bool {
    base_device_kind(list_kind).eq_ignore_ascii_case(base_device_kind(host_kind))
}
