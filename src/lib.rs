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

//! fleetsh: command execution across fleets of network devices.
//!
//! An invocation flows through the [`capability`] guard, the target
//! resolver in [`device`], and the [`executor`], which drives one
//! [`session`] per host and hands results to [`persist`] and the display.

pub mod capability;
pub mod cli;
pub mod commands;
pub mod config;
pub mod device;
pub mod executor;
pub mod inventory;
pub mod parser;
pub mod persist;
pub mod session;
pub mod shared;
pub mod utils;

pub use cli::Cli;
pub use config::SysConfig;
pub use executor::{GroupExecutor, HostOutcome};
