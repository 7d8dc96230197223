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

//! Error taxonomy shared by the resolver, guard, orchestrator and persister.
//!
//! # Error Categories
//!
//! - [`ValidationError`]: bad CLI input or out-of-range field, fatal pre-flight
//! - [`CapabilityError`]: option not supported by a command/transport pair
//! - [`TargetResolutionError`]: unknown host, group or list, unreadable documents
//! - [`ConnectionError`]: connect, authentication or privilege failures (per host)
//! - [`ExecutionError`]: command send or structured parse failures (per host)
//! - [`PersistenceError`]: log write failures, which propagate
//! - [`PreflightError`]: the first three, as returned by command preparation

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Input validation failures raised before any device is contacted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("port {0} is out of range (1-65535)")]
    PortOutOfRange(u32),

    #[error("{field} {value}s is out of range (1-600 seconds)")]
    TimeoutOutOfRange { field: &'static str, value: u64 },

    #[error("baud rate {0} is not supported (allowed: 9600, 19200, 38400, 57600, 115200)")]
    UnsupportedBaudRate(u32),

    #[error("'{0}' is not a valid IPv4 or IPv6 address")]
    InvalidAddress(String),

    #[error("device type must not be empty")]
    EmptyDeviceKind,

    #[error("{0} is required but was not provided")]
    MissingField(&'static str),

    #[error("{source_name} must be a positive integer, got {value}")]
    InvalidWorkerCount {
        source_name: &'static str,
        value: i64,
    },

    #[error("--{option} requires --{requires}")]
    MissingPrerequisite {
        option: &'static str,
        requires: &'static str,
    },

    #[error("TextFSM template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),
}

/// Options rejected by the capability table for one command/transport pair.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "'{command}' via {transport} does not support: {}\nallowed options: {}",
    .rejected.join(", "),
    .allowed.join(", ")
)]
pub struct CapabilityError {
    pub command: String,
    pub transport: String,
    pub rejected: Vec<String>,
    pub allowed: Vec<String>,
}

/// Which named-list document a lookup refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Commands,
    Config,
}

impl ListKind {
    /// Top-level key of the YAML document.
    pub fn root_key(self) -> &'static str {
        match self {
            ListKind::Commands => "commands_lists",
            ListKind::Config => "config_lists",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ListKind::Commands => "commands-list",
            ListKind::Config => "config-list",
        }
    }
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Failures turning a target selector or list name into concrete data.
#[derive(Debug, Error)]
pub enum TargetResolutionError {
    #[error("host '{0}' is not defined in the inventory")]
    UnknownHost(String),

    #[error("group '{0}' is not defined in the inventory")]
    UnknownGroup(String),

    #[error("group '{0}' has no member hosts")]
    EmptyGroup(String),

    #[error("{kind} '{name}' is not defined")]
    UnknownList { kind: ListKind, name: String },

    #[error("{kind} '{name}' has no entries")]
    EmptyList { kind: ListKind, name: String },

    #[error("console mode requires at least one --serial port")]
    MissingSerialPort,

    #[error("--host and --group targets require an inventory")]
    InventoryRequired,

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{}: missing top-level key '{key}'", .path.display())]
    MissingRoot { path: PathBuf, key: &'static str },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Session establishment failures. Always contained at the host boundary.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("[{host}] timed out after {timeout:?}, the device may be offline")]
    Timeout { host: String, timeout: Duration },

    #[error("[{host}] authentication failed for user '{user}'")]
    Authentication { host: String, user: String },

    #[error("[{host}] could not enter privileged mode: {reason}")]
    Privilege { host: String, reason: String },

    #[error("[{host}] connection failed: {reason}")]
    Transport { host: String, reason: String },

    #[error("[{host}] I/O error: {source}")]
    Io {
        host: String,
        #[source]
        source: io::Error,
    },
}

/// Failures while a session is open. Contained like [`ConnectionError`].
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("'{command}' failed: {reason}")]
    Command { command: String, reason: String },

    #[error("no prompt returned within {timeout:?} after '{command}'")]
    PromptTimeout { command: String, timeout: Duration },

    #[error("session closed while running '{0}'")]
    Disconnected(String),

    #[error("structured parse failed: {0}")]
    Parse(String),

    #[error("genie parser is not configured (set parsers.genie_command in sys_config.yaml)")]
    GenieUnavailable,
}

/// Any failure raised before the first device is contacted.
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    #[error(transparent)]
    Resolution(#[from] TargetResolutionError),
}

/// Log write failures. These propagate instead of being contained.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to create log directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write log file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize structured output: {0}")]
    Serialize(#[from] serde_json::Error),
}
