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
use crate::capability::CONFIGURE;
use crate::cli::ConfigureArgs;
use crate::config::SysConfig;
use crate::executor::CommandSource;
use crate::shared::{PreflightError, ValidationError};

/// Validate a `configure` invocation and resolve its targets.
pub async fn prepare_configure(
    args: &ConfigureArgs,
    config: &SysConfig,
) -> Result<RunPlan, PreflightError> {
    check_options(
        CONFIGURE,
        args.connection.via,
        &args.used_options(),
        &args.target,
        &args.run,
    )?;

    let source = match (&args.config_list, args.connect_only) {
        (_, true) => CommandSource::ConnectOnly,
        (Some(name), false) => CommandSource::ConfigList(name.clone()),
        (None, false) => return Err(ValidationError::MissingField("--config-list").into()),
    };

    prepare(
        Invocation {
            command: CONFIGURE,
            target: &args.target,
            connection: &args.connection,
            run: &args.run,
            source,
            parser: None,
        },
        config,
    )
    .await
}

pub async fn configure_command(args: &ConfigureArgs, config: &SysConfig) -> Result<i32> {
    let plan = prepare_configure(args, config).await?;
    let env = RunEnvironment::live(plan.transport, config);
    let summary = run_plan(plan, &env)
        .await
        .context("Failed to save configuration results")?;
    Ok(summary.exit_code())
}
