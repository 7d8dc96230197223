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

//! SSH transport: password auth and an interactive PTY shell via russh.

use async_trait::async_trait;
use russh::client::{self, Handle, Handler, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use super::driver::{ByteChannel, CliDriver};
use super::{DeviceSession, SessionOptions, SessionProvider};
use crate::device::{DeviceParams, DEFAULT_SSH_PORT};
use crate::shared::ConnectionError;

const TERM_TYPE: &str = "xterm";
const TERM_WIDTH: u32 = 511;
const TERM_HEIGHT: u32 = 24;
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(600);

/// Server key policy for one connection.
#[derive(Debug, Clone)]
struct HostKeyHandler {
    hostname: String,
    address: String,
    port: u16,
    strict: bool,
}

impl Handler for HostKeyHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        if !self.strict {
            tracing::warn!(
                "[{}] accepting host key without verification (session.strict_host_keys is off)",
                self.hostname
            );
            return Ok(true);
        }

        match russh::keys::check_known_hosts(&self.address, self.port, server_public_key) {
            Ok(known) => {
                if !known {
                    tracing::warn!("[{}] host key not found in known_hosts", self.hostname);
                }
                Ok(known)
            }
            Err(e) => {
                tracing::warn!("[{}] host key check failed: {}", self.hostname, e);
                Ok(false)
            }
        }
    }
}

/// PTY shell channel plus the connection it lives on.
pub struct SshChannel {
    handle: Handle<HostKeyHandler>,
    channel: Channel<Msg>,
}

#[async_trait]
impl ByteChannel for SshChannel {
    async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.channel.data(data).await.map_err(io::Error::other)
    }

    async fn recv(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { ref data }) => return Ok(Some(data.to_vec())),
                Some(ChannelMsg::ExtendedData { ref data, .. }) => {
                    return Ok(Some(data.to_vec()))
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => return Ok(None),
                Some(_) => continue,
            }
        }
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        if let Err(e) = self.channel.eof().await {
            tracing::debug!("channel eof failed: {}", e);
        }
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(io::Error::other)
    }
}

pub struct SshProvider {
    options: SessionOptions,
}

impl SshProvider {
    pub fn new(options: SessionOptions) -> Self {
        Self { options }
    }

    async fn open_shell(
        &self,
        params: &DeviceParams,
        hostname: &str,
    ) -> Result<SshChannel, ConnectionError> {
        let port = params.port().unwrap_or(DEFAULT_SSH_PORT);
        let transport_err = |e: russh::Error| ConnectionError::Transport {
            host: hostname.to_string(),
            reason: e.to_string(),
        };

        let config = Arc::new(client::Config {
            inactivity_timeout: Some(INACTIVITY_TIMEOUT),
            ..Default::default()
        });
        let handler = HostKeyHandler {
            hostname: hostname.to_string(),
            address: params.address().to_string(),
            port,
            strict: self.options.strict_host_keys,
        };

        let mut handle = client::connect(config, (params.address(), port), handler)
            .await
            .map_err(transport_err)?;

        let auth = handle
            .authenticate_password(params.username(), params.password())
            .await
            .map_err(transport_err)?;
        if !auth.success() {
            return Err(ConnectionError::Authentication {
                host: hostname.to_string(),
                user: params.username().to_string(),
            });
        }

        let channel = handle
            .channel_open_session()
            .await
            .map_err(transport_err)?;
        channel
            .request_pty(false, TERM_TYPE, TERM_WIDTH, TERM_HEIGHT, 0, 0, &[])
            .await
            .map_err(transport_err)?;
        channel.request_shell(false).await.map_err(transport_err)?;

        Ok(SshChannel { handle, channel })
    }
}

#[async_trait]
impl SessionProvider for SshProvider {
    async fn connect(
        &self,
        params: &DeviceParams,
        hostname: &str,
    ) -> Result<Box<dyn DeviceSession>, ConnectionError> {
        let timeout = params.timeout_or(self.options.connect_timeout);
        tracing::debug!("[{}] ssh connect to {}", hostname, params.endpoint());

        // one deadline for handshake, auth and shell setup
        let channel = tokio::time::timeout(timeout, self.open_shell(params, hostname))
            .await
            .map_err(|_| ConnectionError::Timeout {
                host: hostname.to_string(),
                timeout,
            })??;
        let mut driver = CliDriver::new(channel, hostname, self.options.read_timeout_for(params));
        driver.establish(params, timeout).await?;
        Ok(Box::new(driver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceFields, Transport};
    use std::time::Instant;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_stalled_server_hits_host_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((mut socket, _)) = listener.accept().await {
                // banner, then silence
                let _ = socket.write_all(b"SSH-2.0-stall\r\n").await;
                held.push(socket);
            }
        });

        let params = DeviceParams::new(
            Transport::Ssh,
            DeviceFields {
                device_kind: Some("cisco_ios".to_string()),
                address: Some("127.0.0.1".to_string()),
                username: Some("admin".to_string()),
                password: Some("pw".to_string()),
                port: Some(u32::from(port)),
                timeout_secs: Some(1),
                ..DeviceFields::default()
            },
        )
        .unwrap();

        let provider = SshProvider::new(SessionOptions::default());
        let started = Instant::now();
        let err = match provider.connect(&params, "R1").await {
            Ok(_) => panic!("stalled server must not yield a session"),
            Err(err) => err,
        };
        assert!(matches!(err, ConnectionError::Timeout { .. }), "{err}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
