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

//! Pre-flight checks and the shared run path of `execute` and `configure`.

use std::path::PathBuf;
use std::sync::Arc;

use crate::capability;
use crate::cli::{ConnectionArgs, RunArgs, TargetArgs};
use crate::config::SysConfig;
use crate::device::{Resolution, TargetResolver, TargetSpec, Transport, DEFAULT_SSH_PORT};
use crate::executor::{
    compute_workers, BatchGate, CommandSource, ExecutionContext, ExecutionRequest, GroupExecutor,
    GroupSummary, HostTask, OutputSink, ResultDisplay, StdinGate, StdoutSink,
};
use crate::inventory::{Inventory, ListCatalog};
use crate::parser::OutputParser;
use crate::persist::{LogMode, LogPersister, LogRequest};
use crate::session::{provider_for, SessionOptions, SessionProvider};
use crate::shared::{ListKind, PersistenceError, PreflightError, ValidationError};

/// A fully validated invocation, ready to contact devices.
pub struct RunPlan {
    pub transport: Transport,
    pub resolution: Resolution,
    pub serial_ports: usize,
    pub workers: usize,
    pub request: ExecutionRequest,
    pub lists: Option<ListCatalog>,
    pub log_dir: PathBuf,
}

/// The collaborators a plan runs against.
pub struct RunEnvironment {
    pub provider: Arc<dyn SessionProvider>,
    pub sink: Arc<dyn OutputSink>,
    pub gate: Arc<dyn BatchGate>,
}

impl RunEnvironment {
    /// Real transport, stdout display and stdin confirmation.
    pub fn live(transport: Transport, config: &SysConfig) -> Self {
        Self {
            provider: provider_for(transport, SessionOptions::from_config(config)),
            sink: Arc::new(StdoutSink::new()),
            gate: Arc::new(StdinGate),
        }
    }
}

/// Capability table plus the cross-option rules.
pub(crate) fn check_options(
    command: &str,
    transport: Transport,
    used: &[&'static str],
    target: &TargetArgs,
    run: &RunArgs,
) -> Result<(), PreflightError> {
    capability::guard(command, transport, used)?;

    if run.ordered && target.group.is_none() {
        return Err(prerequisite("ordered", "group"));
    }
    if run.quiet && !run.log {
        return Err(prerequisite("quiet", "log"));
    }
    if run.no_output && !run.log {
        return Err(prerequisite("no-output", "log"));
    }
    if run.memo.is_some() && !run.log {
        return Err(prerequisite("memo", "log"));
    }
    Ok(())
}

/// Telnet pointed at the SSH port is accepted but almost always a mistake.
pub(crate) fn telnet_on_ssh_port(transport: Transport, port: Option<u32>) -> bool {
    transport == Transport::Telnet && port == Some(u32::from(DEFAULT_SSH_PORT))
}

fn prerequisite(option: &'static str, requires: &'static str) -> PreflightError {
    ValidationError::MissingPrerequisite { option, requires }.into()
}

/// Everything `prepare` needs from one subcommand.
pub(crate) struct Invocation<'a> {
    pub command: &'static str,
    pub target: &'a TargetArgs,
    pub connection: &'a ConnectionArgs,
    pub run: &'a RunArgs,
    pub source: CommandSource,
    pub parser: Option<OutputParser>,
}

/// Load documents, resolve targets and size the pool.
pub(crate) async fn prepare(
    invocation: Invocation<'_>,
    config: &SysConfig,
) -> Result<RunPlan, PreflightError> {
    let transport = invocation.connection.via;
    if telnet_on_ssh_port(transport, invocation.connection.port) {
        tracing::warn!("--via telnet with --port 22, telnet usually listens on port 23");
    }
    let spec = match invocation.target.spec() {
        Some(spec) => spec,
        None if transport == Transport::Console => TargetSpec::ManualConsole,
        None => return Err(ValidationError::MissingField("--ip, --host or --group").into()),
    };

    let inventory = match spec {
        TargetSpec::Host(_) | TargetSpec::Group(_) => {
            Some(Inventory::load(&config.paths.inventory()).await?)
        }
        TargetSpec::Ip(_) | TargetSpec::ManualConsole => None,
    };

    let lists = match &invocation.source {
        CommandSource::CommandsList(name) | CommandSource::ConfigList(name) => {
            let (kind, path) = match invocation.source {
                CommandSource::ConfigList(_) => (ListKind::Config, config.paths.config_lists()),
                _ => (ListKind::Commands, config.paths.commands_lists()),
            };
            let catalog = ListCatalog::load(&path, kind).await?;
            // group members check the list per host instead
            if !spec.is_group() {
                catalog.get(name)?;
            }
            Some(catalog)
        }
        CommandSource::Single(_) | CommandSource::ConnectOnly => None,
    };

    let fields = invocation.connection.device_fields();
    let mut resolver = TargetResolver::new(transport, &fields, &invocation.connection.serial);
    if let Some(inventory) = inventory.as_ref() {
        resolver = resolver.with_inventory(inventory);
    }
    let resolution = resolver.resolve(&spec)?;

    let group_size = match &resolution {
        Resolution::Single(_) => 1,
        Resolution::Group(group) => group.len(),
    };
    let workers = compute_workers(
        invocation.run.workers,
        config.executor.default_workers,
        group_size,
    )?;

    let run = invocation.run;
    let log = run.log.then(|| LogRequest {
        mode: LogMode::for_invocation(invocation.command, transport),
        subject: invocation.source.subject().to_string(),
        memo: run.memo.clone(),
        by_console: transport == Transport::Console,
    });

    let request = ExecutionRequest {
        source: invocation.source,
        parser: invocation.parser,
        log,
        quiet: run.quiet,
        no_output: run.no_output,
        force: run.force,
        ordered: run.ordered,
        read_timeout: SessionOptions::from_config(config).read_timeout,
    };

    Ok(RunPlan {
        transport,
        resolution,
        serial_ports: invocation.connection.serial.len(),
        workers,
        request,
        lists,
        log_dir: config.paths.log_dir(),
    })
}

/// Run a plan and summarize it. Only log write failures are errors here.
pub async fn run_plan(
    plan: RunPlan,
    env: &RunEnvironment,
) -> Result<GroupSummary, PersistenceError> {
    let display = ResultDisplay::new(Arc::clone(&env.sink), plan.request.no_output);
    let context = Arc::new(ExecutionContext {
        request: plan.request,
        lists: plan.lists,
        provider: Arc::clone(&env.provider),
        persister: LogPersister::new(plan.log_dir),
        display,
    });

    match plan.resolution {
        Resolution::Single(target) => {
            let outcome = HostTask::new(Arc::clone(&context), target).run().await?;
            if !outcome.is_success() {
                context
                    .display
                    .error(&format!("failed: {}", outcome.hostname()));
            }
            Ok(GroupSummary::from_outcomes(&[outcome]))
        }
        Resolution::Group(group) => {
            let executor = GroupExecutor::new(Arc::clone(&context), plan.workers);
            tracing::debug!(
                "Group '{}': {} hosts, {} workers",
                group.name,
                group.len(),
                executor.workers()
            );
            let outcomes = if plan.transport == Transport::Console {
                executor
                    .run_batched(group, plan.serial_ports, env.gate.as_ref())
                    .await?
            } else {
                executor.run(group).await?
            };
            let summary = GroupSummary::from_outcomes(&outcomes);
            executor.report(&summary);
            Ok(summary)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telnet_on_ssh_port_is_flagged() {
        assert!(telnet_on_ssh_port(Transport::Telnet, Some(22)));
        assert!(!telnet_on_ssh_port(Transport::Telnet, Some(23)));
        assert!(!telnet_on_ssh_port(Transport::Telnet, None));
        assert!(!telnet_on_ssh_port(Transport::Ssh, Some(22)));
    }
}
