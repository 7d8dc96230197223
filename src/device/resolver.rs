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

//! Target resolution: CLI values merged over inventory records.
//!
//! Per field the precedence is explicit CLI value, then inventory record,
//! then the protocol default applied by [`DeviceParams::new`]. The device
//! kind falls back to [`DEFAULT_DEVICE_KIND`].

use super::params::{DeviceFields, DeviceParams, Transport, DEFAULT_DEVICE_KIND};
use crate::inventory::{HostRecord, Inventory};
use crate::shared::TargetResolutionError;

/// Exactly one target selector per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    Ip(String),
    Host(String),
    Group(String),
    /// Console session on a serial port with no inventory record.
    ManualConsole,
}

impl TargetSpec {
    pub fn is_group(&self) -> bool {
        matches!(self, TargetSpec::Group(_))
    }
}

/// One host ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Display name: the inventory hostname, else the inventory key or address.
    pub hostname: String,
    pub params: DeviceParams,
}

/// Group members in inventory-declared order.
#[derive(Debug, Default)]
pub struct GroupTargets {
    pub name: String,
    pub targets: Vec<ResolvedTarget>,
    /// Members listed in the group but absent from `hosts`.
    pub unresolved: Vec<(String, TargetResolutionError)>,
}

impl GroupTargets {
    pub fn hostnames(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.hostname.clone()).collect()
    }

    pub fn params(&self) -> Vec<DeviceParams> {
        self.targets.iter().map(|t| t.params.clone()).collect()
    }

    /// Total member count, resolved or not.
    pub fn len(&self) -> usize {
        self.targets.len() + self.unresolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of resolving a [`TargetSpec`].
#[derive(Debug)]
pub enum Resolution {
    Single(ResolvedTarget),
    Group(GroupTargets),
}

/// Split items into consecutive batches of at most `size`, preserving order.
pub fn partition_batches<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

pub struct TargetResolver<'a> {
    transport: Transport,
    overrides: &'a DeviceFields,
    serial_ports: &'a [String],
    inventory: Option<&'a Inventory>,
}

impl<'a> TargetResolver<'a> {
    /// `overrides` carries the explicit CLI values; `serial_ports` the
    /// console ports in the order they were given.
    pub fn new(transport: Transport, overrides: &'a DeviceFields, serial_ports: &'a [String]) -> Self {
        Self {
            transport,
            overrides,
            serial_ports,
            inventory: None,
        }
    }

    pub fn with_inventory(mut self, inventory: &'a Inventory) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn resolve(&self, spec: &TargetSpec) -> Result<Resolution, TargetResolutionError> {
        if self.transport == Transport::Console && self.serial_ports.is_empty() {
            return Err(TargetResolutionError::MissingSerialPort);
        }

        match spec {
            TargetSpec::Ip(ip) => {
                let mut fields = self.merge(None);
                fields.address = Some(ip.clone());
                let params = self.build(fields, 0)?;
                Ok(Resolution::Single(ResolvedTarget {
                    hostname: ip.clone(),
                    params,
                }))
            }
            TargetSpec::Host(key) => {
                let record = self.inventory()?.host(key)?;
                let params = self.build(self.merge(Some(record)), 0)?;
                Ok(Resolution::Single(ResolvedTarget {
                    hostname: display_hostname(key, record),
                    params,
                }))
            }
            TargetSpec::Group(name) => self.resolve_group(name).map(Resolution::Group),
            TargetSpec::ManualConsole => {
                let params = self.build(self.merge(None), 0)?;
                let hostname = params
                    .serial()
                    .map(|s| s.port.clone())
                    .unwrap_or_default();
                Ok(Resolution::Single(ResolvedTarget { hostname, params }))
            }
        }
    }

    fn resolve_group(&self, name: &str) -> Result<GroupTargets, TargetResolutionError> {
        let inventory = self.inventory()?;
        let group = inventory.group(name)?;
        if group.hosts.is_empty() {
            return Err(TargetResolutionError::EmptyGroup(name.to_string()));
        }

        let mut resolved = GroupTargets {
            name: name.to_string(),
            ..GroupTargets::default()
        };
        for key in &group.hosts {
            match inventory.host(key) {
                Ok(record) => {
                    let index = resolved.targets.len();
                    let params = self.build(self.merge(Some(record)), index)?;
                    resolved.targets.push(ResolvedTarget {
                        hostname: display_hostname(key, record),
                        params,
                    });
                }
                Err(err) => {
                    tracing::warn!("Group '{}' member '{}' is not in the inventory", name, key);
                    resolved.unresolved.push((key.clone(), err));
                }
            }
        }

        tracing::debug!(
            "Resolved group '{}': {} hosts, {} unresolved",
            name,
            resolved.targets.len(),
            resolved.unresolved.len()
        );
        Ok(resolved)
    }

    fn inventory(&self) -> Result<&'a Inventory, TargetResolutionError> {
        self.inventory
            .ok_or(TargetResolutionError::InventoryRequired)
    }

    fn merge(&self, record: Option<&HostRecord>) -> DeviceFields {
        let cli = self.overrides;
        let record = record.cloned().unwrap_or_default();
        DeviceFields {
            device_kind: cli
                .device_kind
                .clone()
                .or(record.device_type)
                .or_else(|| Some(DEFAULT_DEVICE_KIND.to_string())),
            address: cli.address.clone().or(record.ip),
            username: cli.username.clone().or(record.username),
            password: cli.password.clone().or(record.password),
            secret: cli.secret.clone().or(record.secret),
            port: cli.port.or(record.port),
            timeout_secs: cli.timeout_secs.or(record.timeout),
            read_timeout_secs: cli.read_timeout_secs,
            serial_port: None,
            baud_rate: cli.baud_rate.or(record.baudrate),
        }
    }

    /// Host `index` of a console batch uses serial port `index % ports`.
    fn build(&self, mut fields: DeviceFields, index: usize) -> Result<DeviceParams, TargetResolutionError> {
        if self.transport == Transport::Console && !self.serial_ports.is_empty() {
            fields.serial_port = Some(self.serial_ports[index % self.serial_ports.len()].clone());
        }
        Ok(DeviceParams::new(self.transport, fields)?)
    }
}

fn display_hostname(key: &str, record: &HostRecord) -> String {
    record
        .hostname
        .clone()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| key.to_string())
}
