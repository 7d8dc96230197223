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

//! `show`: inventory and list documents as aligned tables.

use owo_colors::OwoColorize;

use crate::cli::ShowArgs;
use crate::config::SysConfig;
use crate::executor::should_use_colors;
use crate::inventory::{HostRecord, Inventory, ListCatalog, NamedList};
use crate::shared::{ListKind, PreflightError};

const MASK: &str = "********";

struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: Vec<&'static str>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn render(&self, colors: bool) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let line = |cells: Vec<String>| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let header = line(self.headers.iter().map(|h| h.to_string()).collect());
        let mut out = if colors {
            header.bold().to_string()
        } else {
            header
        };
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(row.clone()));
            out.push('\n');
        }
        out
    }
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

fn mask(value: &Option<String>) -> String {
    match value {
        Some(v) if !v.is_empty() => MASK.to_string(),
        _ => "-".to_string(),
    }
}

pub fn render_hosts(inventory: &Inventory, colors: bool) -> String {
    let mut table = Table::new(vec!["HOST", "HOSTNAME", "IP", "DEVICE TYPE", "USERNAME", "DESCRIPTION"]);
    for (key, host) in &inventory.hosts {
        table.push(vec![
            key.clone(),
            opt(&host.hostname),
            opt(&host.ip),
            opt(&host.device_type),
            opt(&host.username),
            opt(&host.description),
        ]);
    }
    table.render(colors)
}

pub fn render_host(key: &str, host: &HostRecord, colors: bool) -> String {
    let mut table = Table::new(vec!["FIELD", "VALUE"]);
    let number = |n: Option<u64>| n.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
    let rows = [
        ("host", key.to_string()),
        ("hostname", opt(&host.hostname)),
        ("ip", opt(&host.ip)),
        ("device_type", opt(&host.device_type)),
        ("username", opt(&host.username)),
        ("password", mask(&host.password)),
        ("secret", mask(&host.secret)),
        ("port", number(host.port.map(u64::from))),
        ("timeout", number(host.timeout)),
        ("baudrate", number(host.baudrate.map(u64::from))),
        ("description", opt(&host.description)),
        ("tags", host.tags.join(", ")),
    ];
    for (field, value) in rows {
        table.push(vec![field.to_string(), value]);
    }
    table.render(colors)
}

pub fn render_groups(inventory: &Inventory, colors: bool) -> String {
    let mut table = Table::new(vec!["GROUP", "HOSTS", "DESCRIPTION", "TAGS"]);
    for (name, group) in &inventory.groups {
        table.push(vec![
            name.clone(),
            group.hosts.len().to_string(),
            opt(&group.description),
            group.tags.join(", "),
        ]);
    }
    table.render(colors)
}

pub fn render_group(
    inventory: &Inventory,
    name: &str,
    colors: bool,
) -> Result<String, PreflightError> {
    let group = inventory.group(name)?;
    let mut table = Table::new(vec!["HOST", "HOSTNAME", "IP", "DEVICE TYPE"]);
    for key in &group.hosts {
        match inventory.hosts.get(key) {
            Some(host) => table.push(vec![
                key.clone(),
                opt(&host.hostname),
                opt(&host.ip),
                opt(&host.device_type),
            ]),
            None => table.push(vec![
                key.clone(),
                "(not in inventory)".to_string(),
                "-".to_string(),
                "-".to_string(),
            ]),
        }
    }
    Ok(table.render(colors))
}

pub fn render_lists(catalog: &ListCatalog, colors: bool) -> String {
    let title = match catalog.kind() {
        ListKind::Commands => "COMMANDS LIST",
        ListKind::Config => "CONFIG LIST",
    };
    let mut table = Table::new(vec![title, "DEVICE TYPE", "LINES", "DESCRIPTION"]);
    for (name, list) in catalog.entries() {
        table.push(vec![
            name.clone(),
            opt(&list.device_type),
            list.lines.len().to_string(),
            opt(&list.description),
        ]);
    }
    table.render(colors)
}

pub fn render_list(name: &str, list: &NamedList, colors: bool) -> String {
    let mut out = format!(
        "{name} (device_type: {}, {} lines)\n",
        opt(&list.device_type),
        list.lines.len()
    );
    if let Some(description) = &list.description {
        out.push_str(&format!("{description}\n"));
    }
    let mut table = Table::new(vec!["#", "LINE"]);
    for (index, line) in list.lines.iter().enumerate() {
        table.push(vec![(index + 1).to_string(), line.clone()]);
    }
    out.push_str(&table.render(colors));
    out
}

/// Render whatever `args` selects.
pub async fn render(args: &ShowArgs, config: &SysConfig, colors: bool) -> Result<String, PreflightError> {
    if args.hosts || args.host.is_some() || args.groups || args.group.is_some() {
        let inventory = Inventory::load(&config.paths.inventory()).await?;
        return if let Some(key) = &args.host {
            Ok(render_host(key, inventory.host(key)?, colors))
        } else if let Some(name) = &args.group {
            render_group(&inventory, name, colors)
        } else if args.groups {
            Ok(render_groups(&inventory, colors))
        } else {
            Ok(render_hosts(&inventory, colors))
        };
    }

    let (kind, path, name) = if args.commands_lists || args.commands_list.is_some() {
        (ListKind::Commands, config.paths.commands_lists(), args.commands_list.as_deref())
    } else {
        (ListKind::Config, config.paths.config_lists(), args.config_list.as_deref())
    };
    let catalog = ListCatalog::load(&path, kind).await?;
    match name {
        Some(name) => Ok(render_list(name, catalog.get(name)?, colors)),
        None => Ok(render_lists(&catalog, colors)),
    }
}

pub async fn show_command(args: &ShowArgs, config: &SysConfig) -> Result<(), PreflightError> {
    let text = render(args, config, should_use_colors()).await?;
    print!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const INVENTORY: &str = r#"
all:
  hosts:
    r1:
      hostname: R1
      ip: 192.0.2.1
      device_type: cisco_ios
      username: admin
      password: s3cret
    r2:
      ip: 192.0.2.2
      device_type: cisco_ios
  groups:
    core:
      description: core routers
      hosts: [r1, r9]
"#;

    fn inventory() -> Inventory {
        Inventory::from_yaml(INVENTORY, Path::new("inventory.yaml")).unwrap()
    }

    #[test]
    fn test_hosts_table_is_aligned() {
        let text = render_hosts(&inventory(), false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("HOST  HOSTNAME  IP"));
        assert!(lines[1].starts_with("r1    R1        192.0.2.1"));
        assert!(lines[2].starts_with("r2    -         192.0.2.2"));
    }

    #[test]
    fn test_password_is_masked() {
        let inventory = inventory();
        let text = render_host("r1", inventory.host("r1").unwrap(), false);
        assert!(!text.contains("s3cret"));
        assert!(text.contains(MASK));
    }

    #[test]
    fn test_group_marks_missing_members() {
        let text = render_group(&inventory(), "core", false).unwrap();
        assert!(text.contains("r9    (not in inventory)"));
        assert!(render_group(&inventory(), "edge", false).is_err());
    }
}
