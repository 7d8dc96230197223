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

use crate::shared::ValidationError;

/// Upper bound on concurrent hosts regardless of what is requested.
pub const HARD_CAP: usize = 20;

/// Worker count for a group of `group_size` hosts.
///
/// `requested` is `--workers`, `configured` is `executor.default_workers`.
/// Whichever applies must be positive; the result is
/// `max(1, min(value, group_size, HARD_CAP))`.
pub fn compute_workers(
    requested: Option<i64>,
    configured: Option<i64>,
    group_size: usize,
) -> Result<usize, ValidationError> {
    let value = match (requested, configured) {
        (Some(value), _) => positive("--workers", value)?,
        (None, Some(value)) => positive("executor.default_workers", value)?,
        (None, None) => HARD_CAP,
    };
    Ok(value.min(group_size).min(HARD_CAP).max(1))
}

fn positive(source_name: &'static str, value: i64) -> Result<usize, ValidationError> {
    match usize::try_from(value) {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ValidationError::InvalidWorkerCount { source_name, value }),
    }
}
