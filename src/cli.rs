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

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::device::{DeviceFields, TargetSpec, Transport};

#[derive(Parser, Debug)]
#[command(
    name = "fleetsh",
    version,
    about = "Run commands and configuration changes across network device fleets",
    long_about = "fleetsh runs show commands and configuration sets against routers and switches\nover SSH, Telnet or serial console. Targets come from a YAML inventory (hosts and\ngroups) or are given directly by IP address. Groups run in parallel with per-host\nfailure isolation.",
    after_help = "EXAMPLES:\n  Single command by IP:        fleetsh execute --ip 192.0.2.1 --command \"show clock\"\n  Group with a commands list:  fleetsh execute --group core --commands-list health --log\n  Ordered group output:        fleetsh execute --group core --command \"show version\" --ordered\n  Console batches:             fleetsh execute --via console --group lab --serial /dev/ttyUSB0,/dev/ttyUSB1 --command \"show clock\"\n  Apply a config list:         fleetsh configure --host r1 --config-list ntp --log\n  Inspect the inventory:       fleetsh show --hosts"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        help = "System configuration file\nLoading priority when omitted:\n  1. ./sys_config.yaml\n  2. $XDG_CONFIG_HOME/fleetsh/sys_config.yaml\n  3. ~/.config/fleetsh/sys_config.yaml"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Inventory file (overrides paths.inventory)")]
    pub inventory: Option<PathBuf>,

    #[arg(
        long = "commands-lists",
        value_name = "FILE",
        help = "Commands-lists file (overrides paths.commands_lists)"
    )]
    pub commands_lists: Option<PathBuf>,

    #[arg(
        long = "config-lists",
        value_name = "FILE",
        help = "Config-lists file (overrides paths.config_lists)"
    )]
    pub config_lists: Option<PathBuf>,

    #[arg(
        short = 'v',
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run show commands on devices",
        long_about = "Runs a single command or a named commands list on one host, an IP address or\nevery host of a group. Group members run concurrently; a failing host does not stop\nthe others.\n\nExit codes: 0 (all succeed), 1 (any host failed), 2 (invalid invocation)"
    )]
    Execute(ExecuteArgs),

    #[command(
        about = "Apply a config list to devices",
        long_about = "Enters configuration mode, applies the lines of a named config list in order and\nleaves configuration mode again.\n\nExit codes: 0 (all succeed), 1 (any host failed), 2 (invalid invocation)"
    )]
    Configure(ConfigureArgs),

    #[command(about = "Show inventory and list documents")]
    Show(ShowArgs),
}

/// Exactly one selector; none at all is only valid for a console port.
#[derive(Args, Debug, Clone, Default)]
#[group(id = "target", multiple = false)]
pub struct TargetArgs {
    #[arg(long, help = "Device IP address (IPv4 or IPv6)")]
    pub ip: Option<String>,

    #[arg(long, help = "Host key from the inventory")]
    pub host: Option<String>,

    #[arg(long, help = "Group name from the inventory")]
    pub group: Option<String>,
}

impl TargetArgs {
    pub fn spec(&self) -> Option<TargetSpec> {
        if let Some(ip) = &self.ip {
            Some(TargetSpec::Ip(ip.clone()))
        } else if let Some(host) = &self.host {
            Some(TargetSpec::Host(host.clone()))
        } else {
            self.group.clone().map(TargetSpec::Group)
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    #[arg(long, value_enum, default_value_t = Transport::Ssh, help = "Transport to use")]
    pub via: Transport,

    #[arg(long, help = "Login username")]
    pub username: Option<String>,

    #[arg(long, help = "Login password")]
    pub password: Option<String>,

    #[arg(long, help = "Enable secret [default: the password]")]
    pub secret: Option<String>,

    #[arg(long = "device-type", help = "Device type, e.g. cisco_ios")]
    pub device_type: Option<String>,

    #[arg(long, help = "TCP port [default: 22 for ssh, 23 for telnet]")]
    pub port: Option<u32>,

    #[arg(long, help = "Connection timeout in seconds (1-600)")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Console baud rate [default: 9600]")]
    pub baudrate: Option<u32>,

    #[arg(
        long,
        value_delimiter = ',',
        help = "Serial port(s), comma-separated\nWith --group, hosts are processed in batches of this many ports"
    )]
    pub serial: Vec<String>,

    #[arg(long = "read-timeout", help = "Seconds to wait for a prompt per command (1-600)")]
    pub read_timeout: Option<u64>,
}

impl ConnectionArgs {
    pub fn device_fields(&self) -> DeviceFields {
        DeviceFields {
            device_kind: self.device_type.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            secret: self.secret.clone(),
            port: self.port,
            timeout_secs: self.timeout,
            read_timeout_secs: self.read_timeout,
            baud_rate: self.baudrate,
            ..DeviceFields::default()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, help = "Suppress command output; progress and errors are still shown (needs --log)")]
    pub quiet: bool,

    #[arg(
        long = "no-output",
        conflicts_with = "quiet",
        help = "Suppress all terminal output (needs --log)"
    )]
    pub no_output: bool,

    #[arg(long, help = "Save each host's result under the log directory")]
    pub log: bool,

    #[arg(long, help = "Suffix added to log file names (needs --log)")]
    pub memo: Option<String>,

    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Concurrent hosts for --group [default: executor.default_workers or 20, max 20]"
    )]
    pub workers: Option<i64>,

    #[arg(long, help = "Print group results sorted by hostname after all hosts finish")]
    pub ordered: bool,

    #[arg(long, help = "Run a list even if its device_type does not match the host")]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExecuteArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long, conflicts_with = "commands_list", help = "Command to run")]
    pub command: Option<String>,

    #[arg(long = "commands-list", help = "Named list from the commands-lists file")]
    pub commands_list: Option<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub run: RunArgs,

    #[arg(
        long,
        value_parser = ["textfsm", "text-fsm", "genie"],
        help = "Parse output into JSON (textfsm needs --textfsm-template)"
    )]
    pub parser: Option<String>,

    #[arg(long = "textfsm-template", help = "TextFSM template file")]
    pub textfsm_template: Option<PathBuf>,

    #[arg(
        long = "connect-only",
        conflicts_with_all = ["command", "commands_list"],
        help = "Connect, print the prompt and disconnect (console)"
    )]
    pub connect_only: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigureArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long = "config-list", help = "Named list from the config-lists file")]
    pub config_list: Option<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub run: RunArgs,

    #[arg(
        long = "connect-only",
        conflicts_with = "config_list",
        help = "Connect, print the prompt and disconnect (console)"
    )]
    pub connect_only: bool,
}

#[derive(Args, Debug, Clone)]
#[group(id = "subject", multiple = false, required = true)]
pub struct ShowArgs {
    #[arg(long, help = "List all hosts")]
    pub hosts: bool,

    #[arg(long, help = "Show one host")]
    pub host: Option<String>,

    #[arg(long, help = "List all groups")]
    pub groups: bool,

    #[arg(long, help = "Show one group and its members")]
    pub group: Option<String>,

    #[arg(long = "commands-lists", help = "List all commands lists")]
    pub commands_lists: bool,

    #[arg(long = "commands-list", help = "Show one commands list")]
    pub commands_list: Option<String>,

    #[arg(long = "config-lists", help = "List all config lists")]
    pub config_lists: bool,

    #[arg(long = "config-list", help = "Show one config list")]
    pub config_list: Option<String>,
}

fn push_if(used: &mut Vec<&'static str>, set: bool, name: &'static str) {
    if set {
        used.push(name);
    }
}

fn collect_common(
    used: &mut Vec<&'static str>,
    target: &TargetArgs,
    connection: &ConnectionArgs,
    run: &RunArgs,
) {
    used.push("via");
    push_if(used, target.ip.is_some(), "ip");
    push_if(used, target.host.is_some(), "host");
    push_if(used, target.group.is_some(), "group");
    push_if(used, connection.username.is_some(), "username");
    push_if(used, connection.password.is_some(), "password");
    push_if(used, connection.secret.is_some(), "secret");
    push_if(used, connection.device_type.is_some(), "device-type");
    push_if(used, connection.port.is_some(), "port");
    push_if(used, connection.timeout.is_some(), "timeout");
    push_if(used, connection.baudrate.is_some(), "baudrate");
    push_if(used, !connection.serial.is_empty(), "serial");
    push_if(used, connection.read_timeout.is_some(), "read-timeout");
    push_if(used, run.quiet, "quiet");
    push_if(used, run.no_output, "no-output");
    push_if(used, run.log, "log");
    push_if(used, run.memo.is_some(), "memo");
    push_if(used, run.workers.is_some(), "workers");
    push_if(used, run.ordered, "ordered");
    push_if(used, run.force, "force");
}

impl ExecuteArgs {
    /// Options given on the command line, by their long names.
    pub fn used_options(&self) -> Vec<&'static str> {
        let mut used = Vec::new();
        collect_common(&mut used, &self.target, &self.connection, &self.run);
        push_if(&mut used, self.command.is_some(), "command");
        push_if(&mut used, self.commands_list.is_some(), "commands-list");
        push_if(&mut used, self.parser.is_some(), "parser");
        push_if(&mut used, self.textfsm_template.is_some(), "textfsm-template");
        push_if(&mut used, self.connect_only, "connect-only");
        used
    }
}

impl ConfigureArgs {
    pub fn used_options(&self) -> Vec<&'static str> {
        let mut used = Vec::new();
        collect_common(&mut used, &self.target, &self.connection, &self.run);
        push_if(&mut used, self.config_list.is_some(), "config-list");
        push_if(&mut used, self.connect_only, "connect-only");
        used
    }
}
