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

use serde_json::Value;
use textfsm_rust::Template;

use crate::shared::ExecutionError;

/// Run `raw` through a TextFSM template, one JSON object per record.
pub fn parse(template_source: &str, raw: &str) -> Result<Value, ExecutionError> {
    let template = Template::parse_str(template_source)
        .map_err(|e| ExecutionError::Parse(format!("invalid TextFSM template: {e}")))?;
    let mut parser = template.parser();
    let records = parser
        .parse_text_to_dicts(raw)
        .map_err(|e| ExecutionError::Parse(e.to_string()))?;
    serde_json::to_value(records).map_err(|e| ExecutionError::Parse(e.to_string()))
}
