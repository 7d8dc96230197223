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

//! Command dispatcher for routing CLI commands to their implementations

use anyhow::Result;
use fleetsh::{
    cli::{Cli, Commands},
    commands::{configure::configure_command, execute::execute_command, show::show_command},
    executor::EXIT_SUCCESS,
};

use super::initialization::AppContext;

/// Dispatch commands to their handlers and return the process exit code.
pub async fn dispatch_command(cli: &Cli, ctx: &AppContext) -> Result<i32> {
    match &cli.command {
        Commands::Execute(args) => execute_command(args, &ctx.config).await,
        Commands::Configure(args) => configure_command(args, &ctx.config).await,
        Commands::Show(args) => {
            show_command(args, &ctx.config).await?;
            Ok(EXIT_SUCCESS)
        }
    }
}
