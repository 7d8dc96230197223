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

//! Device parameter sets and target resolution.

pub mod params;
pub mod resolver;

pub use params::{
    base_device_kind, normalize_device_kind, validate_address, DeviceFields, DeviceParams,
    SerialSettings, Transport, DEFAULT_BAUD_RATE, DEFAULT_DEVICE_KIND, DEFAULT_SSH_PORT,
    DEFAULT_TELNET_PORT, SUPPORTED_BAUD_RATES,
};
pub use resolver::{
    partition_batches, GroupTargets, Resolution, ResolvedTarget, TargetResolver, TargetSpec,
};
