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

use anyhow::{Context, Result};

use super::runner::{check_options, prepare, run_plan, Invocation, RunEnvironment, RunPlan};
use crate::capability::EXECUTE;
use crate::cli::ExecuteArgs;
use crate::config::SysConfig;
use crate::executor::CommandSource;
use crate::parser::{OutputParser, ParserKind};
use crate::shared::{PreflightError, ValidationError};

/// Validate an `execute` invocation and resolve its targets.
pub async fn prepare_execute(
    args: &ExecuteArgs,
    config: &SysConfig,
) -> Result<RunPlan, PreflightError> {
    check_options(
        EXECUTE,
        args.connection.via,
        &args.used_options(),
        &args.target,
        &args.run,
    )?;

    let parser = match parser_kind(args)? {
        Some(kind) => Some(OutputParser::prepare(&kind, &config.parsers)?),
        None => None,
    };

    let source = if args.connect_only {
        CommandSource::ConnectOnly
    } else if let Some(command) = &args.command {
        CommandSource::Single(command.clone())
    } else if let Some(name) = &args.commands_list {
        CommandSource::CommandsList(name.clone())
    } else {
        return Err(ValidationError::MissingField("--command or --commands-list").into());
    };

    prepare(
        Invocation {
            command: EXECUTE,
            target: &args.target,
            connection: &args.connection,
            run: &args.run,
            source,
            parser,
        },
        config,
    )
    .await
}

fn parser_kind(args: &ExecuteArgs) -> Result<Option<ParserKind>, ValidationError> {
    let Some(name) = args.parser.as_deref() else {
        return Ok(None);
    };
    match name {
        "genie" => Ok(Some(ParserKind::Genie)),
        _ => {
            if name == "text-fsm" {
                tracing::warn!("--parser text-fsm is deprecated, use --parser textfsm");
            }
            let template = args
                .textfsm_template
                .clone()
                .ok_or(ValidationError::MissingPrerequisite {
                    option: "parser textfsm",
                    requires: "textfsm-template",
                })?;
            Ok(Some(ParserKind::TextFsm { template }))
        }
    }
}

/// Returns the process exit code.
pub async fn execute_command(args: &ExecuteArgs, config: &SysConfig) -> Result<i32> {
    let plan = prepare_execute(args, config).await?;
    let env = RunEnvironment::live(plan.transport, config);
    let summary = run_plan(plan, &env)
        .await
        .context("Failed to save execution results")?;
    Ok(summary.exit_code())
}
