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

//! Shared fixtures: an on-disk fleet and an in-memory session provider.

#![allow(dead_code)]

use async_trait::async_trait;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use fleetsh::cli::{Cli, Commands, ConfigureArgs, ExecuteArgs};
use fleetsh::commands::RunEnvironment;
use fleetsh::config::SysConfig;
use fleetsh::device::DeviceParams;
use fleetsh::executor::{AutoConfirm, BatchGate, MemorySink};
use fleetsh::session::{DeviceSession, SessionProvider};
use fleetsh::shared::{ConnectionError, ExecutionError};

pub const COMMANDS_LISTS: &str = r#"
commands_lists:
  health:
    device_type: cisco_ios
    description: basic health check
    commands_list:
      - show clock
      - show version
  junos-health:
    device_type: juniper_junos
    commands_list:
      - show system uptime
  empty:
    commands_list: []
"#;

pub const CONFIG_LISTS: &str = r#"
config_lists:
  ntp:
    device_type: cisco_ios
    config_list:
      - ntp server 192.0.2.123
      - ntp update-calendar
"#;

/// Inventory with hosts `r1..=rN` (hostnames `R1..=RN`), a group `all`
/// holding every host, `core` holding the first three and `broken` holding
/// a member that is not defined.
pub fn inventory_yaml(hosts: usize) -> String {
    let mut yaml = String::from("all:\n  hosts:\n");
    for i in 1..=hosts {
        yaml.push_str(&format!(
            "    r{i}:\n      hostname: R{i}\n      ip: 192.0.2.{i}\n      device_type: cisco_ios\n      username: admin\n      password: pw{i}\n"
        ));
    }
    yaml.push_str("  groups:\n    all:\n      hosts:\n");
    for i in 1..=hosts {
        yaml.push_str(&format!("        - r{i}\n"));
    }
    yaml.push_str("    core:\n      hosts: [r1, r2, r3]\n");
    yaml.push_str("    broken:\n      hosts: [r1, ghost, r2]\n");
    yaml
}

/// Documents written to a temporary directory plus a config pointing at them.
pub struct Fleet {
    pub dir: TempDir,
    pub config: SysConfig,
}

impl Fleet {
    pub fn new(hosts: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let write = |name: &str, body: &str| -> String {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            path.to_string_lossy().into_owned()
        };

        let mut config = SysConfig::default();
        config.paths.inventory = Some(write("inventory.yaml", &inventory_yaml(hosts)));
        config.paths.commands_lists = Some(write("commands-lists.yaml", COMMANDS_LISTS));
        config.paths.config_lists = Some(write("config-lists.yaml", CONFIG_LISTS));
        config.paths.log_dir = Some(dir.path().join("logs").to_string_lossy().into_owned());
        Self { dir, config }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.dir.path().join("logs")
    }
}

pub fn execute_args(argv: &[&str]) -> ExecuteArgs {
    let mut full = vec!["fleetsh", "execute"];
    full.extend_from_slice(argv);
    match Cli::try_parse_from(full).unwrap().command {
        Commands::Execute(args) => args,
        other => panic!("expected execute, got {other:?}"),
    }
}

pub fn configure_args(argv: &[&str]) -> ConfigureArgs {
    let mut full = vec!["fleetsh", "configure"];
    full.extend_from_slice(argv);
    match Cli::try_parse_from(full).unwrap().command {
        Commands::Configure(args) => args,
        other => panic!("expected configure, got {other:?}"),
    }
}

/// How one mock host behaves.
#[derive(Debug, Clone, Default)]
pub struct HostScript {
    pub reject_login: bool,
    pub unreachable: bool,
    pub delay: Duration,
    pub failing_command: Option<String>,
    pub panic_on_command: bool,
    pub fail_close: bool,
}

#[derive(Debug, Default)]
pub struct MockStats {
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
    /// (hostname, serial port) per connect attempt, in call order.
    pub connects: Mutex<Vec<(String, Option<String>)>>,
    pub closes: AtomicUsize,
    pub config_sets: Mutex<Vec<(String, Vec<String>)>>,
}

impl MockStats {
    pub fn connected_hosts(&self) -> Vec<String> {
        self.connects
            .lock()
            .unwrap()
            .iter()
            .map(|(host, _)| host.clone())
            .collect()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct MockProvider {
    scripts: HashMap<String, HostScript>,
    default_delay: Duration,
    pub stats: Arc<MockStats>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, hostname: &str, script: HostScript) -> Self {
        self.scripts.insert(hostname.to_string(), script);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }
}

#[async_trait]
impl SessionProvider for MockProvider {
    async fn connect(
        &self,
        params: &DeviceParams,
        hostname: &str,
    ) -> Result<Box<dyn DeviceSession>, ConnectionError> {
        self.stats.connects.lock().unwrap().push((
            hostname.to_string(),
            params.serial().map(|s| s.port.clone()),
        ));

        let mut script = self.scripts.get(hostname).cloned().unwrap_or_default();
        if script.delay.is_zero() {
            script.delay = self.default_delay;
        }
        if script.unreachable {
            return Err(ConnectionError::Timeout {
                host: hostname.to_string(),
                timeout: Duration::from_secs(10),
            });
        }
        if script.reject_login {
            return Err(ConnectionError::Authentication {
                host: hostname.to_string(),
                user: params.username().to_string(),
            });
        }

        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(active, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            hostname: hostname.to_string(),
            prompt: format!("{hostname}#"),
            script,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct MockSession {
    hostname: String,
    prompt: String,
    script: HostScript,
    stats: Arc<MockStats>,
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.stats.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DeviceSession for MockSession {
    fn prompt(&self) -> &str {
        &self.prompt
    }

    async fn send_command(&mut self, command: &str) -> Result<String, ExecutionError> {
        tokio::time::sleep(self.script.delay).await;
        if self.script.panic_on_command {
            panic!("session for {} crashed", self.hostname);
        }
        if self.script.failing_command.as_deref() == Some(command) {
            return Err(ExecutionError::Command {
                command: command.to_string(),
                reason: "% Invalid input detected".to_string(),
            });
        }
        Ok(format!("{} output for {}", self.hostname, command))
    }

    async fn send_config_set(&mut self, lines: &[String]) -> Result<String, ExecutionError> {
        self.stats
            .config_sets
            .lock()
            .unwrap()
            .push((self.hostname.clone(), lines.to_vec()));
        Ok(format!("{}(config)# {}", self.hostname, lines.join("\n")))
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_close {
            return Err(ConnectionError::Io {
                host: self.hostname.clone(),
                source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "channel reset"),
            });
        }
        Ok(())
    }
}

/// Records every batch confirmation and answers with `answer`.
pub struct RecordingGate {
    pub answer: bool,
    pub asked: Mutex<Vec<(usize, usize, Vec<String>)>>,
}

impl RecordingGate {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BatchGate for RecordingGate {
    async fn confirm(&self, next: usize, total: usize, hostnames: &[String]) -> bool {
        self.asked
            .lock()
            .unwrap()
            .push((next, total, hostnames.to_vec()));
        self.answer
    }
}

pub fn environment(provider: MockProvider) -> (RunEnvironment, Arc<MockStats>, Arc<MemorySink>) {
    environment_with_gate(provider, Arc::new(AutoConfirm))
}

pub fn environment_with_gate(
    provider: MockProvider,
    gate: Arc<dyn BatchGate>,
) -> (RunEnvironment, Arc<MockStats>, Arc<MemorySink>) {
    let stats = Arc::clone(&provider.stats);
    let sink = Arc::new(MemorySink::new());
    let env = RunEnvironment {
        provider: Arc::new(provider),
        sink: sink.clone(),
        gate,
    };
    (env, stats, sink)
}
