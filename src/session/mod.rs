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

//! Device sessions over SSH, Telnet and serial console.
//!
//! Every transport produces a byte stream that is handed to the shared
//! [`CliDriver`], which owns prompt detection, privilege escalation and
//! paging. The orchestrator only sees the [`SessionProvider`] and
//! [`DeviceSession`] traits, so tests can substitute an in-memory provider.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SysConfig;
use crate::device::{DeviceParams, Transport};
use crate::shared::{ConnectionError, ExecutionError};

pub mod console;
pub mod driver;
pub mod ssh;
pub mod telnet;

pub use console::ConsoleProvider;
pub use driver::{ByteChannel, CliDriver, StreamChannel};
pub use ssh::SshProvider;
pub use telnet::TelnetProvider;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// An open, privileged CLI session on one device.
#[async_trait]
pub trait DeviceSession: Send {
    /// Prompt captured after privilege escalation, e.g. `R1#`.
    fn prompt(&self) -> &str;

    /// Run one command and return its output without echo or prompt.
    async fn send_command(&mut self, command: &str) -> Result<String, ExecutionError>;

    /// Enter configuration mode, apply `lines` in order and leave it again.
    async fn send_config_set(&mut self, lines: &[String]) -> Result<String, ExecutionError>;

    async fn close(&mut self) -> Result<(), ConnectionError>;
}

/// Opens sessions for one transport.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn connect(
        &self,
        params: &DeviceParams,
        hostname: &str,
    ) -> Result<Box<dyn DeviceSession>, ConnectionError>;
}

/// Timeouts and verification policy shared by all providers.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub strict_host_keys: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            strict_host_keys: false,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &SysConfig) -> Self {
        Self {
            read_timeout: config
                .session
                .read_timeout
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_READ_TIMEOUT),
            strict_host_keys: config.session.strict_host_keys,
            ..Self::default()
        }
    }

    /// Prompt wait per command: the host's read timeout, else the configured one.
    pub fn read_timeout_for(&self, params: &DeviceParams) -> Duration {
        params
            .read_timeout_secs()
            .map(Duration::from_secs)
            .unwrap_or(self.read_timeout)
    }
}

/// Select the provider for a transport once per invocation.
pub fn provider_for(transport: Transport, options: SessionOptions) -> Arc<dyn SessionProvider> {
    match transport {
        Transport::Ssh => Arc::new(SshProvider::new(options)),
        Transport::Telnet => Arc::new(TelnetProvider::new(options)),
        Transport::Console => Arc::new(ConsoleProvider::new(options)),
    }
}
