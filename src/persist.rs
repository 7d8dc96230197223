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

//! Per-host result files.
//!
//! Layout: `{log_dir}/{mode}/{YYYYmmdd}/{YYYYmmdd-HHMMSS}_{host}_{subject}[_{memo}].{log|json}`.

use chrono::{DateTime, Local};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::capability::CONFIGURE;
use crate::device::Transport;
use crate::shared::PersistenceError;
use crate::utils::sanitize_filename;

/// Top-level log directory for an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Execute,
    Console,
    Configure,
}

impl LogMode {
    pub fn for_invocation(command: &str, transport: Transport) -> Self {
        match (command, transport) {
            (CONFIGURE, _) => LogMode::Configure,
            (_, Transport::Console) => LogMode::Console,
            _ => LogMode::Execute,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogMode::Execute => "execute",
            LogMode::Console => "console",
            LogMode::Configure => "configure",
        }
    }
}

/// Naming inputs shared by every host of one invocation.
#[derive(Debug, Clone)]
pub struct LogRequest {
    pub mode: LogMode,
    /// Command text or list name.
    pub subject: String,
    pub memo: Option<String>,
    pub by_console: bool,
}

impl LogRequest {
    fn file_name(&self, now: &DateTime<Local>, hostname: &str, extension: &str) -> String {
        let subject = if self.by_console {
            format!("{}_by_console", self.subject)
        } else {
            self.subject.clone()
        };
        let mut name = format!(
            "{}_{}_{}",
            now.format("%Y%m%d-%H%M%S"),
            sanitize_filename(hostname),
            sanitize_filename(&subject)
        );
        if let Some(memo) = self.memo.as_deref().filter(|m| !m.trim().is_empty()) {
            name.push('_');
            name.push_str(&sanitize_filename(memo));
        }
        name.push('.');
        name.push_str(extension);
        name
    }
}

#[derive(Debug, Clone)]
pub struct LogPersister {
    log_dir: PathBuf,
}

impl LogPersister {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Path a result would be written to at `now`.
    pub fn path_for(
        &self,
        request: &LogRequest,
        hostname: &str,
        now: &DateTime<Local>,
        extension: &str,
    ) -> PathBuf {
        self.log_dir
            .join(request.mode.as_str())
            .join(now.format("%Y%m%d").to_string())
            .join(request.file_name(now, hostname, extension))
    }

    pub async fn save_text(
        &self,
        request: &LogRequest,
        hostname: &str,
        text: &str,
    ) -> Result<PathBuf, PersistenceError> {
        let path = self.path_for(request, hostname, &Local::now(), "log");
        write_file(&path, text.as_bytes()).await?;
        Ok(path)
    }

    pub async fn save_json(
        &self,
        request: &LogRequest,
        hostname: &str,
        value: &Value,
    ) -> Result<PathBuf, PersistenceError> {
        let body = serde_json::to_string_pretty(value)?;
        let path = self.path_for(request, hostname, &Local::now(), "json");
        write_file(&path, body.as_bytes()).await?;
        Ok(path)
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| PersistenceError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    fs::write(path, contents)
        .await
        .map_err(|source| PersistenceError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!("Wrote {} bytes to {:?}", contents.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn request(memo: Option<&str>, by_console: bool) -> LogRequest {
        LogRequest {
            mode: if by_console {
                LogMode::Console
            } else {
                LogMode::Execute
            },
            subject: "show ip int brief".to_string(),
            memo: memo.map(str::to_string),
            by_console,
        }
    }

    #[test]
    fn test_path_layout() {
        let persister = LogPersister::new("/var/log/fleetsh");
        let now = Local.with_ymd_and_hms(2025, 5, 4, 23, 57, 34).unwrap();
        let path = persister.path_for(&request(None, false), "R0", &now, "log");
        assert_eq!(
            path,
            PathBuf::from("/var/log/fleetsh/execute/20250504/20250504-235734_R0_show-ip-int-brief.log")
        );
    }

    #[test]
    fn test_memo_and_console_suffix() {
        let persister = LogPersister::new("logs");
        let now = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let path = persister.path_for(&request(Some("before change"), true), "R1", &now, "json");
        assert_eq!(
            path,
            PathBuf::from(
                "logs/console/20250102/20250102-030405_R1_show-ip-int-brief_by_console_before-change.json"
            )
        );
    }

    #[test]
    fn test_mode_selection() {
        assert_eq!(LogMode::for_invocation("execute", Transport::Ssh), LogMode::Execute);
        assert_eq!(LogMode::for_invocation("execute", Transport::Console), LogMode::Console);
        assert_eq!(LogMode::for_invocation("configure", Transport::Console), LogMode::Configure);
    }

    #[tokio::test]
    async fn test_save_text_and_json() {
        let dir = TempDir::new().unwrap();
        let persister = LogPersister::new(dir.path());

        let text_path = persister
            .save_text(&request(None, false), "R1", "R1# show clock\n10:00\n")
            .await
            .unwrap();
        assert!(text_path.starts_with(dir.path().join("execute")));
        assert_eq!(
            std::fs::read_to_string(&text_path).unwrap(),
            "R1# show clock\n10:00\n"
        );

        let value = serde_json::json!([{"INTERFACE": "Gi0/0"}]);
        let json_path = persister
            .save_json(&request(None, false), "R1", &value)
            .await
            .unwrap();
        assert_eq!(json_path.extension().unwrap(), "json");
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(written, value);
    }

    #[tokio::test]
    async fn test_unwritable_dir_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let persister = LogPersister::new(&blocker);

        let err = persister
            .save_text(&request(None, false), "R1", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::CreateDir { .. }));
    }
}
