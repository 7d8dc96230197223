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

//! Execution orchestrator: per-host tasks and bounded group fan-out.

mod host_task;
mod output;
mod parallel;
mod result_types;
mod workers;

pub use host_task::{same_device_kind, CommandSource, ExecutionContext, ExecutionRequest, HostTask};
pub use output::{should_use_colors, MemorySink, OutputSink, ResultDisplay, StdoutSink, Tone};
pub use parallel::{AutoConfirm, BatchGate, GroupExecutor, StdinGate};
pub use result_types::{
    FailureReason, GroupSummary, HostOutcome, EXIT_HOST_FAILURE, EXIT_PREFLIGHT, EXIT_SUCCESS,
};
pub use workers::{compute_workers, HARD_CAP};
