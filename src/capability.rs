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

//! Static per-(command, transport) option allow-lists.
//!
//! The table is look-up only. An unknown command or transport has an empty
//! allow-list, so every option is rejected.

use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap};

use crate::device::Transport;
use crate::shared::CapabilityError;

pub const EXECUTE: &str = "execute";
pub const CONFIGURE: &str = "configure";

const NETWORK_EXECUTE: &[&str] = &[
    "via",
    "ip",
    "host",
    "group",
    "command",
    "commands-list",
    "quiet",
    "no-output",
    "username",
    "password",
    "secret",
    "device-type",
    "port",
    "timeout",
    "log",
    "memo",
    "workers",
    "ordered",
    "parser",
    "textfsm-template",
    "force",
];

const CONSOLE_EXECUTE: &[&str] = &[
    "via",
    "host",
    "group",
    "command",
    "commands-list",
    "connect-only",
    "quiet",
    "no-output",
    "serial",
    "baudrate",
    "username",
    "password",
    "secret",
    "device-type",
    "read-timeout",
    "log",
    "memo",
    "workers",
    "ordered",
    "parser",
    "textfsm-template",
    "force",
];

const SSH_CONFIGURE: &[&str] = &[
    "via",
    "ip",
    "host",
    "group",
    "config-list",
    "quiet",
    "no-output",
    "username",
    "password",
    "secret",
    "device-type",
    "port",
    "timeout",
    "log",
    "memo",
    "workers",
    "ordered",
    "parser",
    "textfsm-template",
    "force",
];

const TELNET_CONFIGURE: &[&str] = &["via"];

const CONSOLE_CONFIGURE: &[&str] = &[
    "via",
    "host",
    "group",
    "config-list",
    "connect-only",
    "quiet",
    "no-output",
    "serial",
    "baudrate",
    "username",
    "password",
    "secret",
    "device-type",
    "read-timeout",
    "log",
    "memo",
    "workers",
    "ordered",
    "parser",
    "textfsm-template",
    "force",
];

type CapabilityMap = HashMap<(&'static str, Transport), BTreeSet<&'static str>>;

static CAPABILITY_MAP: Lazy<CapabilityMap> = Lazy::new(|| {
    let entries: [(&'static str, Transport, &[&'static str]); 6] = [
        (EXECUTE, Transport::Ssh, NETWORK_EXECUTE),
        (EXECUTE, Transport::Telnet, NETWORK_EXECUTE),
        (EXECUTE, Transport::Console, CONSOLE_EXECUTE),
        (CONFIGURE, Transport::Ssh, SSH_CONFIGURE),
        (CONFIGURE, Transport::Telnet, TELNET_CONFIGURE),
        (CONFIGURE, Transport::Console, CONSOLE_CONFIGURE),
    ];
    entries
        .into_iter()
        .map(|(command, transport, options)| {
            ((command, transport), options.iter().copied().collect())
        })
        .collect()
});

/// Collapse CLI spelling variants (`--no_output`, `no-output`) to one form.
pub fn canonicalize(option: &str) -> String {
    option.trim().trim_start_matches('-').replace('_', "-")
}

/// Sorted allow-list for a command/transport pair.
pub fn allowed_options(command: &str, transport: Transport) -> Vec<&'static str> {
    // keys are covariant, so a borrowed command name can probe the table
    let map: &HashMap<(&str, Transport), BTreeSet<&'static str>> = &CAPABILITY_MAP;
    map.get(&(command, transport))
        .map(|options| options.iter().copied().collect())
        .unwrap_or_default()
}

/// Options in `used` that the pair does not allow, canonicalized and sorted.
pub fn validate<S: AsRef<str>>(command: &str, transport: Transport, used: &[S]) -> Vec<String> {
    let allowed: BTreeSet<&str> = allowed_options(command, transport).into_iter().collect();
    let used: BTreeSet<String> = used.iter().map(|o| canonicalize(o.as_ref())).collect();
    used.into_iter()
        .filter(|option| !allowed.contains(option.as_str()))
        .collect()
}

/// Reject the invocation when any used option is outside the allow-list.
pub fn guard<S: AsRef<str>>(
    command: &str,
    transport: Transport,
    used: &[S],
) -> Result<(), CapabilityError> {
    let rejected = validate(command, transport, used);
    if rejected.is_empty() {
        return Ok(());
    }
    Err(CapabilityError {
        command: command.to_string(),
        transport: transport.to_string(),
        rejected,
        allowed: allowed_options(command, transport)
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}
