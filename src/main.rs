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

use clap::Parser;
use owo_colors::OwoColorize;

use fleetsh::{
    cli::Cli,
    executor::{should_use_colors, EXIT_HOST_FAILURE, EXIT_PREFLIGHT},
    shared::PersistenceError,
};

mod app;

use app::{dispatcher::dispatch_command, initialization::initialize_app};

/// Log write failures happen after devices were contacted; everything else
/// stops the invocation before that.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<PersistenceError>().is_some() {
        EXIT_HOST_FAILURE
    } else {
        EXIT_PREFLIGHT
    }
}

fn report_error(err: &anyhow::Error) {
    let colors = should_use_colors();
    if colors {
        eprintln!("{} {}", "[ERROR]".bright_red().bold(), err);
    } else {
        eprintln!("[ERROR] {err}");
    }
    for cause in err.chain().skip(1) {
        if colors {
            eprintln!("  {} {}", "caused by:".dimmed(), cause);
        } else {
            eprintln!("  caused by: {cause}");
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match initialize_app(&cli).await {
        Ok(ctx) => dispatch_command(&cli, &ctx).await,
        Err(e) => Err(e),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            report_error(&e);
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}
