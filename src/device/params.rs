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

//! Validated per-host connection parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

use crate::shared::ValidationError;

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_TELNET_PORT: u16 = 23;
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_DEVICE_KIND: &str = "cisco_ios";
pub const SUPPORTED_BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];
pub const MAX_TIMEOUT_SECS: u64 = 600;

const TELNET_SUFFIX: &str = "_telnet";
const SERIAL_SUFFIX: &str = "_serial";

/// Connection medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Ssh,
    Telnet,
    Console,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Ssh => "ssh",
            Transport::Telnet => "telnet",
            Transport::Console => "console",
        }
    }

    /// Port used when neither CLI nor inventory give one.
    pub fn default_port(self) -> Option<u16> {
        match self {
            Transport::Ssh => Some(DEFAULT_SSH_PORT),
            Transport::Telnet => Some(DEFAULT_TELNET_PORT),
            Transport::Console => None,
        }
    }

    fn kind_suffix(self) -> Option<&'static str> {
        match self {
            Transport::Ssh => None,
            Transport::Telnet => Some(TELNET_SUFFIX),
            Transport::Console => Some(SERIAL_SUFFIX),
        }
    }

    pub fn is_network(self) -> bool {
        !matches!(self, Transport::Console)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip any transport suffix from a device kind.
pub fn base_device_kind(kind: &str) -> &str {
    let kind = kind.trim();
    kind.strip_suffix(TELNET_SUFFIX)
        .or_else(|| kind.strip_suffix(SERIAL_SUFFIX))
        .unwrap_or(kind)
}

/// Apply the transport suffix exactly once. Idempotent.
pub fn normalize_device_kind(kind: &str, transport: Transport) -> String {
    let base = base_device_kind(kind);
    match transport.kind_suffix() {
        Some(suffix) => format!("{base}{suffix}"),
        None => base.to_string(),
    }
}

/// Accepts IPv4, IPv6 and zone-suffixed link-local IPv6 (`fe80::1%eth0`).
pub fn validate_address(address: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidAddress(address.to_string());

    match address.split_once('%') {
        Some((ip, zone)) => {
            if zone.is_empty() || ip.parse::<Ipv6Addr>().is_err() {
                return Err(invalid());
            }
            Ok(())
        }
        None => address.parse::<IpAddr>().map(|_| ()).map_err(|_| invalid()),
    }
}

pub fn validate_port(port: u32) -> Result<u16, ValidationError> {
    match u16::try_from(port) {
        Ok(p) if p >= 1 => Ok(p),
        _ => Err(ValidationError::PortOutOfRange(port)),
    }
}

pub fn validate_timeout(field: &'static str, secs: u64) -> Result<u64, ValidationError> {
    if (1..=MAX_TIMEOUT_SECS).contains(&secs) {
        Ok(secs)
    } else {
        Err(ValidationError::TimeoutOutOfRange { field, value: secs })
    }
}

pub fn validate_baud_rate(baud: u32) -> Result<u32, ValidationError> {
    if SUPPORTED_BAUD_RATES.contains(&baud) {
        Ok(baud)
    } else {
        Err(ValidationError::UnsupportedBaudRate(baud))
    }
}

/// Serial line settings for console sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
}

/// Raw, already-merged field values awaiting validation.
///
/// The resolver fills this from CLI, inventory and defaults; everything is
/// checked once by [`DeviceParams::new`].
#[derive(Debug, Clone, Default)]
pub struct DeviceFields {
    pub device_kind: Option<String>,
    pub address: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub secret: Option<String>,
    pub port: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub serial_port: Option<String>,
    pub baud_rate: Option<u32>,
}

/// Immutable connection parameters for one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceParams {
    transport: Transport,
    device_kind: String,
    address: String,
    username: String,
    password: String,
    privilege_secret: String,
    port: Option<u16>,
    timeout_secs: Option<u64>,
    read_timeout_secs: Option<u64>,
    serial: Option<SerialSettings>,
}

impl DeviceParams {
    pub fn new(transport: Transport, fields: DeviceFields) -> Result<Self, ValidationError> {
        let device_kind = fields
            .device_kind
            .as_deref()
            .map(str::trim)
            .filter(|kind| !kind.is_empty())
            .ok_or(ValidationError::EmptyDeviceKind)?;
        let device_kind = normalize_device_kind(device_kind, transport);

        let address = fields.address.map(|a| a.trim().to_string()).unwrap_or_default();
        if transport.is_network() {
            if address.is_empty() {
                return Err(ValidationError::MissingField("ip"));
            }
            validate_address(&address)?;
        }

        let username = match fields.username {
            Some(user) if !user.is_empty() => user,
            // telnet and console lines may ask for a password only
            _ if transport == Transport::Ssh => return Err(ValidationError::MissingField("username")),
            _ => String::new(),
        };
        let password = fields.password.unwrap_or_default();
        let privilege_secret = fields
            .secret
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| password.clone());

        let port = match (transport.default_port(), fields.port) {
            (Some(_), Some(port)) => Some(validate_port(port)?),
            (Some(default), None) => Some(default),
            (None, _) => None,
        };

        let timeout_secs = fields
            .timeout_secs
            .map(|t| validate_timeout("timeout", t))
            .transpose()?;
        let read_timeout_secs = fields
            .read_timeout_secs
            .map(|t| validate_timeout("read-timeout", t))
            .transpose()?;

        let serial = match transport {
            Transport::Console => {
                let port = fields
                    .serial_port
                    .filter(|p| !p.trim().is_empty())
                    .ok_or(ValidationError::MissingField("serial"))?;
                let baud_rate = validate_baud_rate(fields.baud_rate.unwrap_or(DEFAULT_BAUD_RATE))?;
                Some(SerialSettings { port, baud_rate })
            }
            _ => None,
        };

        Ok(Self {
            transport,
            device_kind,
            address,
            username,
            password,
            privilege_secret,
            port,
            timeout_secs,
            read_timeout_secs,
            serial,
        })
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn device_kind(&self) -> &str {
        &self.device_kind
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn privilege_secret(&self) -> &str {
        &self.privilege_secret
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn timeout_secs(&self) -> Option<u64> {
        self.timeout_secs
    }

    pub fn read_timeout_secs(&self) -> Option<u64> {
        self.read_timeout_secs
    }

    pub fn serial(&self) -> Option<&SerialSettings> {
        self.serial.as_ref()
    }

    /// Connect timeout, falling back to `default` when unset.
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout_secs.map(Duration::from_secs).unwrap_or(default)
    }

    /// Endpoint used in diagnostics: `ip:port` or the serial device path.
    pub fn endpoint(&self) -> String {
        match (&self.serial, self.port) {
            (Some(serial), _) => format!("{}@{}", serial.port, serial.baud_rate),
            (None, Some(port)) if self.address.contains(':') => {
                format!("[{}]:{port}", self.address)
            }
            (None, Some(port)) => format!("{}:{port}", self.address),
            (None, None) => self.address.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ssh_fields() -> DeviceFields {
        DeviceFields {
            device_kind: Some("cisco_ios".to_string()),
            address: Some("192.0.2.1".to_string()),
            username: Some("admin".to_string()),
            password: Some("pass".to_string()),
            ..DeviceFields::default()
        }
    }

    #[test]
    fn test_secret_defaults_to_password() {
        let params = DeviceParams::new(Transport::Ssh, ssh_fields()).unwrap();
        assert_eq!(params.privilege_secret(), "pass");

        let mut fields = ssh_fields();
        fields.secret = Some("enable".to_string());
        let params = DeviceParams::new(Transport::Ssh, fields).unwrap();
        assert_eq!(params.privilege_secret(), "enable");
    }

    #[test]
    fn test_protocol_default_ports() {
        let ssh = DeviceParams::new(Transport::Ssh, ssh_fields()).unwrap();
        assert_eq!(ssh.port(), Some(22));
        let telnet = DeviceParams::new(Transport::Telnet, ssh_fields()).unwrap();
        assert_eq!(telnet.port(), Some(23));
        assert_eq!(telnet.device_kind(), "cisco_ios_telnet");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for transport in [Transport::Ssh, Transport::Telnet, Transport::Console] {
            for kind in ["cisco_ios", "cisco_ios_telnet", "cisco_ios_serial", " juniper "] {
                let once = normalize_device_kind(kind, transport);
                let twice = normalize_device_kind(&once, transport);
                assert_eq!(once, twice, "{kind} via {transport}");
            }
        }
        assert_eq!(
            normalize_device_kind("cisco_ios_telnet", Transport::Telnet),
            "cisco_ios_telnet"
        );
        assert_eq!(
            normalize_device_kind("cisco_ios_telnet", Transport::Console),
            "cisco_ios_serial"
        );
    }

    #[test]
    fn test_port_range() {
        for bad in [0, 65536, 100_000] {
            let mut fields = ssh_fields();
            fields.port = Some(bad);
            assert_eq!(
                DeviceParams::new(Transport::Ssh, fields),
                Err(ValidationError::PortOutOfRange(bad))
            );
        }
        let mut fields = ssh_fields();
        fields.port = Some(65535);
        assert_eq!(
            DeviceParams::new(Transport::Ssh, fields).unwrap().port(),
            Some(65535)
        );
    }

    #[test]
    fn test_timeout_range() {
        for bad in [0, 601] {
            let mut fields = ssh_fields();
            fields.timeout_secs = Some(bad);
            assert!(matches!(
                DeviceParams::new(Transport::Ssh, fields),
                Err(ValidationError::TimeoutOutOfRange { value, .. }) if value == bad
            ));
        }
    }

    #[test]
    fn test_baud_rate_allow_list() {
        let console = |baud| DeviceFields {
            device_kind: Some("cisco_ios".to_string()),
            serial_port: Some("/dev/ttyUSB0".to_string()),
            baud_rate: baud,
            ..DeviceFields::default()
        };
        let params = DeviceParams::new(Transport::Console, console(None)).unwrap();
        assert_eq!(params.serial().unwrap().baud_rate, 9600);
        assert_eq!(params.device_kind(), "cisco_ios_serial");
        assert!(DeviceParams::new(Transport::Console, console(Some(115200))).is_ok());
        assert_eq!(
            DeviceParams::new(Transport::Console, console(Some(14400))),
            Err(ValidationError::UnsupportedBaudRate(14400))
        );
    }

    #[test]
    fn test_address_validation() {
        for good in ["10.0.0.1", "2001:db8::1", "fe80::1%eth0", "::1"] {
            assert!(validate_address(good).is_ok(), "{good}");
        }
        for bad in ["10.0.0.256", "router1", "fe80::1%", "10.0.0.1%eth0", ""] {
            assert!(validate_address(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_empty_device_kind_rejected() {
        let mut fields = ssh_fields();
        fields.device_kind = Some("  ".to_string());
        assert_eq!(
            DeviceParams::new(Transport::Ssh, fields),
            Err(ValidationError::EmptyDeviceKind)
        );
    }

    #[test]
    fn test_username_required_for_ssh_only() {
        let mut fields = ssh_fields();
        fields.username = None;
        assert_eq!(
            DeviceParams::new(Transport::Ssh, fields.clone()),
            Err(ValidationError::MissingField("username"))
        );

        let params = DeviceParams::new(Transport::Telnet, fields).unwrap();
        assert_eq!(params.username(), "");
        assert_eq!(params.password(), "pass");
    }

    #[test]
    fn test_endpoint_formatting() {
        let mut fields = ssh_fields();
        fields.address = Some("2001:db8::1".to_string());
        let params = DeviceParams::new(Transport::Ssh, fields).unwrap();
        assert_eq!(params.endpoint(), "[2001:db8::1]:22");
    }
}
