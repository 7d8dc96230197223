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

//! Structured parsing of command output.

use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ParserSettings;
use crate::shared::{ExecutionError, ValidationError};

pub mod genie;
pub mod textfsm;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserKind {
    TextFsm { template: PathBuf },
    Genie,
}

impl ParserKind {
    pub fn name(&self) -> &'static str {
        match self {
            ParserKind::TextFsm { .. } => "textfsm",
            ParserKind::Genie => "genie",
        }
    }
}

/// A parser prepared once per invocation and shared by every host.
#[derive(Debug, Clone)]
pub enum OutputParser {
    TextFsm { template_source: String },
    Genie { command: Option<String> },
}

impl OutputParser {
    pub fn name(&self) -> &'static str {
        match self {
            OutputParser::TextFsm { .. } => "textfsm",
            OutputParser::Genie { .. } => "genie",
        }
    }

    /// Load the TextFSM template up front so a missing file fails pre-flight.
    pub fn prepare(kind: &ParserKind, settings: &ParserSettings) -> Result<Self, ValidationError> {
        match kind {
            ParserKind::TextFsm { template } => {
                let template_source = std::fs::read_to_string(template)
                    .map_err(|_| ValidationError::TemplateNotFound(template.clone()))?;
                Ok(OutputParser::TextFsm { template_source })
            }
            ParserKind::Genie => Ok(OutputParser::Genie {
                command: settings
                    .genie_command
                    .clone()
                    .filter(|c| !c.trim().is_empty()),
            }),
        }
    }

    /// `timeout` bounds the external genie program.
    pub async fn parse(
        &self,
        device_kind: &str,
        command: &str,
        raw: &str,
        timeout: Duration,
    ) -> Result<Value, ExecutionError> {
        match self {
            OutputParser::TextFsm { template_source } => textfsm::parse(template_source, raw),
            OutputParser::Genie { command: None } => Err(ExecutionError::GenieUnavailable),
            OutputParser::Genie {
                command: Some(program),
            } => genie::parse(program, device_kind, command, raw, timeout).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_template_fails_preparation() {
        let kind = ParserKind::TextFsm {
            template: PathBuf::from("/nonexistent/show_version.textfsm"),
        };
        let err = OutputParser::prepare(&kind, &ParserSettings::default()).unwrap_err();
        assert!(matches!(err, ValidationError::TemplateNotFound(_)));
    }

    #[test]
    fn test_template_loaded_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Value VERSION (\\S+)\n\nStart\n  ^Version ${{VERSION}} -> Record").unwrap();
        let kind = ParserKind::TextFsm {
            template: file.path().to_path_buf(),
        };
        let parser = OutputParser::prepare(&kind, &ParserSettings::default()).unwrap();
        assert!(matches!(parser, OutputParser::TextFsm { template_source } if template_source.contains("VERSION")));
        assert_eq!(kind.name(), "textfsm");
    }

    #[tokio::test]
    async fn test_unconfigured_genie() {
        let parser = OutputParser::prepare(&ParserKind::Genie, &ParserSettings::default()).unwrap();
        let err = parser
            .parse("cisco_ios", "show version", "raw", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::GenieUnavailable));
    }
}
