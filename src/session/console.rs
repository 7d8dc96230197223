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

//! Serial console transport.
//!
//! The tty is switched to raw mode at the requested baud rate with
//! `VMIN = 0` and `VTIME = 1`, so reads return at least every 100ms.

use async_trait::async_trait;
use nix::fcntl::OFlag;
use nix::sys::termios::{self, BaudRate, ControlFlags, SetArg, SpecialCharacterIndices};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;

use super::driver::{CliDriver, StreamChannel};
use super::{DeviceSession, SessionOptions, SessionProvider};
use crate::device::{DeviceParams, SerialSettings};
use crate::shared::ConnectionError;

fn baud_rate(baud: u32) -> Option<BaudRate> {
    match baud {
        9600 => Some(BaudRate::B9600),
        19200 => Some(BaudRate::B19200),
        38400 => Some(BaudRate::B38400),
        57600 => Some(BaudRate::B57600),
        115200 => Some(BaudRate::B115200),
        _ => None,
    }
}

fn open_serial(settings: &SerialSettings) -> Result<File, String> {
    let speed = baud_rate(settings.baud_rate)
        .ok_or_else(|| format!("unsupported baud rate {}", settings.baud_rate))?;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(OFlag::O_NOCTTY.bits())
        .open(&settings.port)
        .map_err(|e| format!("cannot open {}: {e}", settings.port))?;

    let mut attrs = termios::tcgetattr(&file).map_err(|e| format!("tcgetattr: {e}"))?;
    termios::cfmakeraw(&mut attrs);
    termios::cfsetspeed(&mut attrs, speed).map_err(|e| format!("cfsetspeed: {e}"))?;
    attrs
        .control_flags
        .insert(ControlFlags::CREAD | ControlFlags::CLOCAL);
    attrs.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
    attrs.control_chars[SpecialCharacterIndices::VTIME as usize] = 1;
    termios::tcsetattr(&file, SetArg::TCSANOW, &attrs).map_err(|e| format!("tcsetattr: {e}"))?;

    Ok(file)
}

pub struct ConsoleProvider {
    options: SessionOptions,
}

impl ConsoleProvider {
    pub fn new(options: SessionOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl SessionProvider for ConsoleProvider {
    async fn connect(
        &self,
        params: &DeviceParams,
        hostname: &str,
    ) -> Result<Box<dyn DeviceSession>, ConnectionError> {
        let settings = params
            .serial()
            .cloned()
            .ok_or_else(|| ConnectionError::Transport {
                host: hostname.to_string(),
                reason: "no serial port assigned".to_string(),
            })?;
        tracing::debug!("[{}] opening console {}", hostname, params.endpoint());

        let file = tokio::task::spawn_blocking(move || open_serial(&settings))
            .await
            .map_err(|e| ConnectionError::Transport {
                host: hostname.to_string(),
                reason: e.to_string(),
            })?
            .map_err(|reason| ConnectionError::Transport {
                host: hostname.to_string(),
                reason,
            })?;

        let read_timeout = self.options.read_timeout_for(params);
        let channel = StreamChannel::with_idle_reads(tokio::fs::File::from_std(file));
        let mut driver = CliDriver::new(channel, hostname, read_timeout);
        driver.establish(params, read_timeout).await?;
        Ok(Box::new(driver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SUPPORTED_BAUD_RATES;

    #[test]
    fn test_every_supported_rate_maps() {
        for baud in SUPPORTED_BAUD_RATES {
            assert!(baud_rate(baud).is_some(), "{baud}");
        }
        assert!(baud_rate(14400).is_none());
    }

    #[test]
    fn test_missing_port_is_reported() {
        let err = open_serial(&SerialSettings {
            port: "/nonexistent/ttyFLEET0".to_string(),
            baud_rate: 9600,
        })
        .unwrap_err();
        assert!(err.contains("/nonexistent/ttyFLEET0"));
    }
}
