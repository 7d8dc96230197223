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

//! Application initialization and configuration loading

use anyhow::{Context, Result};
use fleetsh::{cli::Cli, config::SysConfig, utils::init_logging};
use std::path::Path;

/// Application context after initialization
pub struct AppContext {
    pub config: SysConfig,
}

/// Set up logging, load `sys_config.yaml` and apply CLI path overrides.
pub async fn initialize_app(cli: &Cli) -> Result<AppContext> {
    init_logging(cli.verbose);

    let mut config = SysConfig::load_with_priority(cli.config.as_deref())
        .await
        .context("Failed to load system configuration")?;
    apply_path_overrides(&mut config, cli);

    tracing::debug!(
        "Documents: inventory={:?} commands_lists={:?} config_lists={:?} log_dir={:?}",
        config.paths.inventory(),
        config.paths.commands_lists(),
        config.paths.config_lists(),
        config.paths.log_dir()
    );

    Ok(AppContext { config })
}

fn apply_path_overrides(config: &mut SysConfig, cli: &Cli) {
    let as_string = |path: &Path| path.to_string_lossy().into_owned();
    if let Some(path) = &cli.inventory {
        config.paths.inventory = Some(as_string(path));
    }
    if let Some(path) = &cli.commands_lists {
        config.paths.commands_lists = Some(as_string(path));
    }
    if let Some(path) = &cli.config_lists {
        config.paths.config_lists = Some(as_string(path));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_cli_paths_override_config() {
        let cli = Cli::try_parse_from([
            "fleetsh",
            "--inventory",
            "/srv/fleet/inventory.yaml",
            "show",
            "--hosts",
        ])
        .unwrap();
        let mut config = SysConfig::from_yaml("paths:\n  inventory: other.yaml\n  config_lists: cl.yaml\n").unwrap();
        apply_path_overrides(&mut config, &cli);
        assert_eq!(
            config.paths.inventory(),
            PathBuf::from("/srv/fleet/inventory.yaml")
        );
        assert_eq!(config.paths.config_lists(), PathBuf::from("cl.yaml"));
    }
}
