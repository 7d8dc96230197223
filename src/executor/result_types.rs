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

//! Per-host outcomes and the group summary built from them.

use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::shared::{ConnectionError, ExecutionError, TargetResolutionError};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_HOST_FAILURE: i32 = 1;
pub const EXIT_PREFLIGHT: i32 = 2;

/// Why a host did not complete. The message is captured where the error
/// occurred; aggregation only needs the category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Host or list lookup failed for this member.
    Resolution(String),
    DeviceKindMismatch { list_kind: String, host_kind: String },
    Connection(String),
    Execution(String),
    /// Never attempted because the operator stopped a console run.
    Skipped,
    /// The host task panicked or was cancelled.
    Aborted(String),
}

impl FailureReason {
    pub fn category(&self) -> &'static str {
        match self {
            FailureReason::Resolution(_) => "resolution",
            FailureReason::DeviceKindMismatch { .. } => "device-type mismatch",
            FailureReason::Connection(_) => "connection",
            FailureReason::Execution(_) => "execution",
            FailureReason::Skipped => "skipped",
            FailureReason::Aborted(_) => "aborted",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Resolution(msg)
            | FailureReason::Connection(msg)
            | FailureReason::Execution(msg)
            | FailureReason::Aborted(msg) => f.write_str(msg),
            FailureReason::DeviceKindMismatch {
                list_kind,
                host_kind,
            } => write!(f, "list is for '{list_kind}' but host is '{host_kind}'"),
            FailureReason::Skipped => f.write_str("not run"),
        }
    }
}

impl From<&ConnectionError> for FailureReason {
    fn from(err: &ConnectionError) -> Self {
        FailureReason::Connection(err.to_string())
    }
}

impl From<&ExecutionError> for FailureReason {
    fn from(err: &ExecutionError) -> Self {
        FailureReason::Execution(err.to_string())
    }
}

impl From<&TargetResolutionError> for FailureReason {
    fn from(err: &TargetResolutionError) -> Self {
        FailureReason::Resolution(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub enum HostOutcome {
    Success {
        hostname: String,
        display_text: String,
        structured: Option<Value>,
        log_path: Option<PathBuf>,
        elapsed: Duration,
    },
    Failure {
        hostname: String,
        reason: FailureReason,
    },
}

impl HostOutcome {
    pub fn failure(hostname: impl Into<String>, reason: FailureReason) -> Self {
        HostOutcome::Failure {
            hostname: hostname.into(),
            reason,
        }
    }

    pub fn hostname(&self) -> &str {
        match self {
            HostOutcome::Success { hostname, .. } | HostOutcome::Failure { hostname, .. } => {
                hostname
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, HostOutcome::Success { .. })
    }
}

/// Aggregate of one invocation, hosts kept in dispatch order.
#[derive(Debug, Clone, Default)]
pub struct GroupSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, FailureReason)>,
}

impl GroupSummary {
    pub fn from_outcomes(outcomes: &[HostOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                HostOutcome::Success { hostname, .. } => summary.succeeded.push(hostname.clone()),
                HostOutcome::Failure { hostname, reason } => {
                    summary.failed.push((hostname.clone(), reason.clone()))
                }
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn failed_hostnames(&self) -> Vec<&str> {
        self.failed.iter().map(|(host, _)| host.as_str()).collect()
    }

    pub fn exit_code(&self) -> i32 {
        if self.failed.is_empty() {
            EXIT_SUCCESS
        } else {
            EXIT_HOST_FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(host: &str) -> HostOutcome {
        HostOutcome::Success {
            hostname: host.to_string(),
            display_text: String::new(),
            structured: None,
            log_path: None,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_summary_partitions_outcomes() {
        let outcomes = vec![
            success("R1"),
            HostOutcome::failure("R2", FailureReason::Connection("auth".to_string())),
            success("R3"),
        ];
        let summary = GroupSummary::from_outcomes(&outcomes);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.succeeded, vec!["R1", "R3"]);
        assert_eq!(summary.failed_hostnames(), vec!["R2"]);
        assert_eq!(summary.exit_code(), EXIT_HOST_FAILURE);
    }

    #[test]
    fn test_all_success_exit_code() {
        let summary = GroupSummary::from_outcomes(&[success("R1")]);
        assert_eq!(summary.exit_code(), EXIT_SUCCESS);
    }

    #[test]
    fn test_reason_categories() {
        let err = ConnectionError::Authentication {
            host: "R2".to_string(),
            user: "admin".to_string(),
        };
        let reason = FailureReason::from(&err);
        assert_eq!(reason.category(), "connection");
        assert!(reason.to_string().contains("authentication failed"));
        assert_eq!(FailureReason::Skipped.category(), "skipped");
    }
}
