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

//! System configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::utils::expand_path;

pub const DEFAULT_INVENTORY_PATH: &str = "inventory.yaml";
pub const DEFAULT_COMMANDS_LISTS_PATH: &str = "commands-lists.yaml";
pub const DEFAULT_CONFIG_LISTS_PATH: &str = "config-lists.yaml";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Contents of `sys_config.yaml`.
///
/// Every section is optional; a missing file yields `SysConfig::default()`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct SysConfig {
    #[serde(default)]
    pub executor: ExecutorSettings,

    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub parsers: ParserSettings,
}

/// Worker pool settings.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct ExecutorSettings {
    /// Must be positive; checked when the worker count is computed.
    pub default_workers: Option<i64>,
}

/// Locations of the inventory, list documents and log root.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct PathSettings {
    pub inventory: Option<String>,
    pub commands_lists: Option<String>,
    pub config_lists: Option<String>,
    pub log_dir: Option<String>,
}

impl PathSettings {
    pub fn inventory(&self) -> PathBuf {
        expand_path(self.inventory.as_deref().unwrap_or(DEFAULT_INVENTORY_PATH))
    }

    pub fn commands_lists(&self) -> PathBuf {
        expand_path(
            self.commands_lists
                .as_deref()
                .unwrap_or(DEFAULT_COMMANDS_LISTS_PATH),
        )
    }

    pub fn config_lists(&self) -> PathBuf {
        expand_path(
            self.config_lists
                .as_deref()
                .unwrap_or(DEFAULT_CONFIG_LISTS_PATH),
        )
    }

    pub fn log_dir(&self) -> PathBuf {
        expand_path(self.log_dir.as_deref().unwrap_or(DEFAULT_LOG_DIR))
    }
}

/// Session tuning applied when neither CLI nor inventory set a value.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct SessionSettings {
    /// Seconds to wait for a prompt after each console command.
    pub read_timeout: Option<u64>,

    /// Verify SSH host keys against `~/.ssh/known_hosts`.
    #[serde(default)]
    pub strict_host_keys: bool,
}

/// External structured-output parsers.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct ParserSettings {
    /// Program invoked as `<genie_command> <device_kind> <command>` with the
    /// raw output on stdin; it must print JSON on stdout.
    pub genie_command: Option<String>,
}
