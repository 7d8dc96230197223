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

//! Loading and lookup for the inventory and list documents.

use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

use super::types::{GroupRecord, HostRecord, Inventory, InventoryDocument, NamedList};
use crate::shared::{ListKind, TargetResolutionError};

async fn read_document(path: &Path) -> Result<String, TargetResolutionError> {
    fs::read_to_string(path)
        .await
        .map_err(|source| TargetResolutionError::Read {
            path: path.to_path_buf(),
            source,
        })
}

impl Inventory {
    pub async fn load(path: &Path) -> Result<Self, TargetResolutionError> {
        let content = read_document(path).await?;
        Self::from_yaml(&content, path)
    }

    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, TargetResolutionError> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|source| TargetResolutionError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if value.get("all").is_none() {
            return Err(TargetResolutionError::MissingRoot {
                path: path.to_path_buf(),
                key: "all",
            });
        }
        let document: InventoryDocument =
            serde_yaml::from_value(value).map_err(|source| TargetResolutionError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(
            "Loaded inventory {:?}: {} hosts, {} groups",
            path,
            document.all.hosts.len(),
            document.all.groups.len()
        );
        Ok(document.all)
    }

    pub fn host(&self, key: &str) -> Result<&HostRecord, TargetResolutionError> {
        self.hosts
            .get(key)
            .ok_or_else(|| TargetResolutionError::UnknownHost(key.to_string()))
    }

    pub fn group(&self, name: &str) -> Result<&GroupRecord, TargetResolutionError> {
        self.groups
            .get(name)
            .ok_or_else(|| TargetResolutionError::UnknownGroup(name.to_string()))
    }
}

/// Named commands or config lists from one document.
#[derive(Debug, Clone)]
pub struct ListCatalog {
    kind: ListKind,
    entries: BTreeMap<String, NamedList>,
}

impl ListCatalog {
    pub async fn load(path: &Path, kind: ListKind) -> Result<Self, TargetResolutionError> {
        let content = read_document(path).await?;
        Self::from_yaml(&content, path, kind)
    }

    pub fn from_yaml(
        content: &str,
        path: &Path,
        kind: ListKind,
    ) -> Result<Self, TargetResolutionError> {
        let parse_err = |source| TargetResolutionError::Parse {
            path: path.to_path_buf(),
            source,
        };
        let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(parse_err)?;
        let root = value
            .get(kind.root_key())
            .cloned()
            .ok_or(TargetResolutionError::MissingRoot {
                path: path.to_path_buf(),
                key: kind.root_key(),
            })?;
        let entries: BTreeMap<String, NamedList> = if root.is_null() {
            BTreeMap::new()
        } else {
            serde_yaml::from_value(root).map_err(parse_err)?
        };
        Ok(Self { kind, entries })
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    pub fn entries(&self) -> &BTreeMap<String, NamedList> {
        &self.entries
    }

    /// Look up a list that must exist and contain at least one line.
    pub fn get(&self, name: &str) -> Result<&NamedList, TargetResolutionError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| TargetResolutionError::UnknownList {
                kind: self.kind,
                name: name.to_string(),
            })?;
        if entry.lines.iter().all(|line| line.trim().is_empty()) {
            return Err(TargetResolutionError::EmptyList {
                kind: self.kind,
                name: name.to_string(),
            });
        }
        Ok(entry)
    }
}
