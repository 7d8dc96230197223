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

//! Model-based parsing through an operator-supplied external program.
//!
//! The program is called as `<genie_command...> <device_kind> <command>`,
//! receives the raw output on stdin and must print JSON on stdout.

use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::shared::ExecutionError;

/// Run the parser program, bounded by `timeout`.
pub async fn parse(
    genie_command: &str,
    device_kind: &str,
    command: &str,
    raw: &str,
    timeout: Duration,
) -> Result<Value, ExecutionError> {
    let mut words = genie_command.split_whitespace();
    let program = words.next().ok_or(ExecutionError::GenieUnavailable)?;

    let mut child = Command::new(program)
        .args(words)
        .arg(device_kind)
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ExecutionError::Parse(format!("cannot start '{program}': {e}")))?;

    // stdin is fed from its own task while stdout drains
    let feeder = child.stdin.take().map(|mut stdin| {
        let input = raw.as_bytes().to_vec();
        tokio::spawn(async move {
            let written = stdin.write_all(&input).await;
            drop(stdin);
            written
        })
    });

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| {
            ExecutionError::Parse(format!(
                "'{program}' did not finish within {}s",
                timeout.as_secs()
            ))
        })?
        .map_err(|e| ExecutionError::Parse(e.to_string()))?;

    if let Some(feeder) = feeder {
        match feeder.await {
            Ok(Ok(())) => {}
            // a program may exit without reading all of its input
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => {
                return Err(ExecutionError::Parse(format!("cannot feed '{program}': {e}")))
            }
            Err(e) => return Err(ExecutionError::Parse(e.to_string())),
        }
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExecutionError::Parse(format!(
            "'{program}' exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    serde_json::from_slice(&output.stdout)
        .map_err(|e| ExecutionError::Parse(format!("'{program}' did not print JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn test_stdout_json_is_returned() {
        let value = parse("sh -c cat", "cisco_ios", "show version", r#"{"version": "17.3"}"#, LIMIT)
            .await
            .unwrap();
        assert_eq!(value["version"], "17.3");
    }

    #[tokio::test]
    async fn test_non_json_output_fails() {
        let err = parse("sh -c cat", "cisco_ios", "show version", "plain text", LIMIT)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Parse(msg) if msg.contains("JSON")));
    }

    #[tokio::test]
    async fn test_failing_program() {
        let err = parse("false", "cisco_ios", "show version", "", LIMIT)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Parse(_)));
    }

    #[tokio::test]
    async fn test_blank_command_is_unavailable() {
        let err = parse("   ", "cisco_ios", "show version", "", LIMIT).await.unwrap_err();
        assert!(matches!(err, ExecutionError::GenieUnavailable));
    }

    #[tokio::test]
    async fn test_large_output_streams_through() {
        let rows: Vec<String> = (0..20_000)
            .map(|i| format!(r#"{{"interface": "GigabitEthernet0/{i}", "status": "up"}}"#))
            .collect();
        let raw = format!("[{}]", rows.join(","));
        assert!(raw.len() >= 512 * 1024);

        let value = parse("sh -c cat", "cisco_ios", "show interfaces", &raw, LIMIT)
            .await
            .unwrap();
        assert_eq!(value.as_array().unwrap().len(), 20_000);
    }

    #[tokio::test]
    async fn test_slow_program_times_out() {
        let err = parse(
            "sh -c",
            "sleep 5",
            "show version",
            "",
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExecutionError::Parse(msg) if msg.contains("did not finish")));
    }
}
