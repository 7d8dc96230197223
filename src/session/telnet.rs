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

//! Telnet transport: plain TCP with option negotiation refused.

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::driver::{ByteChannel, CliDriver};
use super::{DeviceSession, SessionOptions, SessionProvider};
use crate::device::{DeviceParams, DEFAULT_TELNET_PORT};
use crate::shared::ConnectionError;

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const OPT_ECHO: u8 = 1;
const OPT_SGA: u8 = 3;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    #[default]
    Data,
    Iac,
    Verb(u8),
    Sub,
    SubIac,
}

/// Incremental IAC filter. Sequences may be split across reads.
///
/// Every `DO` is answered with `WONT`. A server `WILL` is accepted only for
/// echo and suppress-go-ahead, everything else gets `DONT`.
#[derive(Debug, Default)]
pub struct TelnetDecoder {
    state: DecodeState,
}

impl TelnetDecoder {
    /// Returns the payload bytes and the negotiation replies to send back.
    pub fn feed(&mut self, input: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut data = Vec::with_capacity(input.len());
        let mut replies = Vec::new();

        for &byte in input {
            self.state = match (self.state, byte) {
                (DecodeState::Data, IAC) => DecodeState::Iac,
                (DecodeState::Data, b) => {
                    data.push(b);
                    DecodeState::Data
                }
                (DecodeState::Iac, IAC) => {
                    data.push(IAC);
                    DecodeState::Data
                }
                (DecodeState::Iac, verb @ (DO | DONT | WILL | WONT)) => DecodeState::Verb(verb),
                (DecodeState::Iac, SB) => DecodeState::Sub,
                (DecodeState::Iac, _) => DecodeState::Data,
                (DecodeState::Verb(verb), option) => {
                    match verb {
                        DO => replies.extend_from_slice(&[IAC, WONT, option]),
                        WILL if matches!(option, OPT_ECHO | OPT_SGA) => {
                            replies.extend_from_slice(&[IAC, DO, option])
                        }
                        WILL => replies.extend_from_slice(&[IAC, DONT, option]),
                        _ => {}
                    }
                    DecodeState::Data
                }
                (DecodeState::Sub, IAC) => DecodeState::SubIac,
                (DecodeState::Sub, _) => DecodeState::Sub,
                (DecodeState::SubIac, SE) => DecodeState::Data,
                (DecodeState::SubIac, _) => DecodeState::Sub,
            };
        }

        (data, replies)
    }
}

/// Escape literal `0xFF` bytes in outgoing data.
fn escape_iac(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        out.push(byte);
        if byte == IAC {
            out.push(IAC);
        }
    }
    out
}

pub struct TelnetChannel {
    stream: TcpStream,
    decoder: TelnetDecoder,
}

impl TelnetChannel {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            decoder: TelnetDecoder::default(),
        }
    }
}

#[async_trait]
impl ByteChannel for TelnetChannel {
    async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let line = escape_iac(data);
        // NVT line ending
        let line = match line.strip_suffix(b"\n") {
            Some(body) => [body, &b"\r\n"[..]].concat(),
            None => line,
        };
        self.stream.write_all(&line).await
    }

    async fn recv(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = [0u8; 4096];
        let n = self.stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        let (data, replies) = self.decoder.feed(&buf[..n]);
        if !replies.is_empty() {
            self.stream.write_all(&replies).await?;
        }
        Ok(Some(data))
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

pub struct TelnetProvider {
    options: SessionOptions,
}

impl TelnetProvider {
    pub fn new(options: SessionOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl SessionProvider for TelnetProvider {
    async fn connect(
        &self,
        params: &DeviceParams,
        hostname: &str,
    ) -> Result<Box<dyn DeviceSession>, ConnectionError> {
        let timeout = params.timeout_or(self.options.connect_timeout);
        let port = params.port().unwrap_or(DEFAULT_TELNET_PORT);
        tracing::debug!("[{}] telnet connect to {}", hostname, params.endpoint());

        let stream = tokio::time::timeout(timeout, TcpStream::connect((params.address(), port)))
            .await
            .map_err(|_| ConnectionError::Timeout {
                host: hostname.to_string(),
                timeout,
            })?
            .map_err(|e| ConnectionError::Transport {
                host: hostname.to_string(),
                reason: e.to_string(),
            })?;

        let mut driver = CliDriver::new(
            TelnetChannel::new(stream),
            hostname,
            self.options.read_timeout_for(params),
        );
        driver.establish(params, timeout).await?;
        Ok(Box::new(driver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refuses_do_and_unknown_will() {
        let mut decoder = TelnetDecoder::default();
        let input = [IAC, DO, 24, b'o', b'k', IAC, WILL, 31];
        let (data, replies) = decoder.feed(&input);
        assert_eq!(data, b"ok");
        assert_eq!(replies, vec![IAC, WONT, 24, IAC, DONT, 31]);
    }

    #[test]
    fn test_accepts_echo_and_sga() {
        let mut decoder = TelnetDecoder::default();
        let (_, replies) = decoder.feed(&[IAC, WILL, OPT_ECHO, IAC, WILL, OPT_SGA]);
        assert_eq!(replies, vec![IAC, DO, OPT_ECHO, IAC, DO, OPT_SGA]);
    }

    #[test]
    fn test_split_sequence_and_subnegotiation() {
        let mut decoder = TelnetDecoder::default();
        let (data, replies) = decoder.feed(&[b'a', IAC]);
        assert_eq!(data, b"a");
        assert!(replies.is_empty());

        let (data, replies) = decoder.feed(&[DO, 1, IAC, SB, 24, 1, IAC, SE, b'b']);
        assert_eq!(data, b"b");
        assert_eq!(replies, vec![IAC, WONT, 1]);
    }

    #[test]
    fn test_escaped_iac_is_data() {
        let mut decoder = TelnetDecoder::default();
        let (data, _) = decoder.feed(&[IAC, IAC, b'x']);
        assert_eq!(data, vec![IAC, b'x']);
        assert_eq!(escape_iac(&[b'a', IAC]), vec![b'a', IAC, IAC]);
    }
}
