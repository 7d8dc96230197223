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

//! Configuration tests.

use serial_test::serial;
use std::path::{Path, PathBuf};

use super::types::SysConfig;
use super::utils::{expand_env_vars, expand_tilde};

#[test]
#[serial]
fn test_expand_env_vars() {
    std::env::set_var("FLEETSH_TEST_VAR", "test_value");
    std::env::set_var("FLEETSH_TEST_USER", "netops");

    assert_eq!(
        expand_env_vars("Hello ${FLEETSH_TEST_VAR}!"),
        "Hello test_value!"
    );
    assert_eq!(expand_env_vars("$FLEETSH_TEST_USER/logs"), "netops/logs");
    assert_eq!(
        expand_env_vars("${FLEETSH_TEST_USER}:$FLEETSH_TEST_VAR"),
        "netops:test_value"
    );

    // Unknown variables stay as written
    assert_eq!(
        expand_env_vars("${FLEETSH_NONEXISTENT}"),
        "${FLEETSH_NONEXISTENT}"
    );
    assert_eq!(expand_env_vars("$FLEETSH_NONEXISTENT"), "$FLEETSH_NONEXISTENT");
    assert_eq!(expand_env_vars("no variables here"), "no variables here");
}

#[test]
#[serial]
fn test_expand_tilde() {
    let original_home = std::env::var("HOME").ok();
    std::env::set_var("HOME", "/home/netops");

    let expanded = expand_tilde(Path::new("~/fleet/inventory.yaml"));

    if let Some(home) = original_home {
        std::env::set_var("HOME", home);
    } else {
        std::env::remove_var("HOME");
    }

    assert_eq!(expanded, PathBuf::from("/home/netops/fleet/inventory.yaml"));
}

#[test]
fn test_sys_config_parsing() {
    let yaml = r#"
executor:
  default_workers: 8
paths:
  inventory: /etc/fleetsh/inventory.yaml
  log_dir: /var/log/fleetsh
session:
  read_timeout: 45
  strict_host_keys: true
parsers:
  genie_command: genie-parse
"#;

    let config = SysConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.executor.default_workers, Some(8));
    assert_eq!(
        config.paths.inventory(),
        PathBuf::from("/etc/fleetsh/inventory.yaml")
    );
    assert_eq!(config.paths.log_dir(), PathBuf::from("/var/log/fleetsh"));
    assert_eq!(
        config.paths.commands_lists(),
        PathBuf::from("commands-lists.yaml")
    );
    assert_eq!(config.session.read_timeout, Some(45));
    assert!(config.session.strict_host_keys);
    assert_eq!(config.parsers.genie_command.as_deref(), Some("genie-parse"));
}

#[test]
fn test_empty_sys_config_uses_defaults() {
    let config = SysConfig::from_yaml("").unwrap();
    assert!(config.executor.default_workers.is_none());
    assert_eq!(config.paths.inventory(), PathBuf::from("inventory.yaml"));
    assert_eq!(config.paths.log_dir(), PathBuf::from("logs"));
    assert!(!config.session.strict_host_keys);
}

#[test]
fn test_invalid_yaml_is_rejected() {
    assert!(SysConfig::from_yaml("executor: [1, 2").is_err());
    assert!(SysConfig::from_yaml("executor:\n  default_workers: many\n").is_err());
}

#[tokio::test]
async fn test_explicit_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yaml");
    let err = SysConfig::load_with_priority(Some(&missing))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}

#[tokio::test]
async fn test_explicit_config_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sys_config.yaml");
    std::fs::write(&path, "executor:\n  default_workers: 3\n").unwrap();

    let config = SysConfig::load_with_priority(Some(&path)).await.unwrap();
    assert_eq!(config.executor.default_workers, Some(3));
}
