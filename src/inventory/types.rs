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

//! Inventory and named-list document types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `inventory.yaml` root: everything lives under `all`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct InventoryDocument {
    #[serde(default)]
    pub all: Inventory,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Inventory {
    #[serde(default)]
    pub hosts: BTreeMap<String, HostRecord>,

    #[serde(default)]
    pub groups: BTreeMap<String, GroupRecord>,
}

/// One device entry keyed by its inventory name.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct HostRecord {
    pub hostname: Option<String>,
    pub ip: Option<String>,
    pub device_type: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub secret: Option<String>,
    pub port: Option<u32>,
    pub timeout: Option<u64>,
    pub baudrate: Option<u32>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Ordered host membership. Order drives group execution and display.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub hosts: Vec<String>,
}

/// An entry of `commands-lists.yaml` or `config-lists.yaml`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct NamedList {
    pub device_type: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(alias = "commands_list", alias = "config_list", default)]
    pub lines: Vec<String>,
}
