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

//! Prompt-driven CLI driver shared by every transport.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};

use super::DeviceSession;
use crate::device::{base_device_kind, DeviceParams};
use crate::shared::{ConnectionError, ExecutionError};
use crate::utils::strip_terminal_noise;

const READ_CHUNK: usize = 4096;
const IDLE_POLL: Duration = Duration::from_millis(50);

static GENERIC_PROMPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[>#]\s*$").expect("prompt pattern is valid"));

static LOGIN_PROMPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(user\s?name|login)\s*:\s*$").expect("login pattern is valid")
});

static PASSWORD_PROMPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)password\s*:\s*$").expect("password pattern is valid"));

/// Raw bidirectional byte stream to a device CLI.
#[async_trait]
pub trait ByteChannel: Send {
    async fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Next chunk from the device. `Ok(None)` once the peer has closed; an
    /// empty chunk means nothing arrived yet.
    async fn recv(&mut self) -> io::Result<Option<Vec<u8>>>;

    async fn shutdown(&mut self) -> io::Result<()>;
}

/// [`ByteChannel`] over any tokio stream.
pub struct StreamChannel<S> {
    stream: S,
    idle_reads: bool,
}

impl<S> StreamChannel<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            idle_reads: false,
        }
    }

    /// Treat zero-length reads as "no data yet" instead of end of stream.
    /// Serial lines configured with `VTIME` return empty reads while idle.
    pub fn with_idle_reads(stream: S) -> Self {
        Self {
            stream,
            idle_reads: true,
        }
    }
}

#[async_trait]
impl<S> ByteChannel for StreamChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }

    async fn recv(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; READ_CHUNK];
        let n = self.stream.read(&mut buf).await?;
        if n == 0 {
            if self.idle_reads {
                tokio::time::sleep(IDLE_POLL).await;
                return Ok(Some(Vec::new()));
            }
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Prompt,
    Login,
    Password,
}

#[derive(Debug)]
enum ReadFailure {
    Timeout(Duration),
    Closed,
    Io(io::Error),
}

impl ReadFailure {
    fn into_execution(self, command: &str) -> ExecutionError {
        match self {
            ReadFailure::Timeout(timeout) => ExecutionError::PromptTimeout {
                command: command.to_string(),
                timeout,
            },
            ReadFailure::Closed => ExecutionError::Disconnected(command.to_string()),
            ReadFailure::Io(err) => ExecutionError::Command {
                command: command.to_string(),
                reason: err.to_string(),
            },
        }
    }
}

struct Reply {
    text: String,
    matched: Expect,
}

impl Reply {
    fn last_line(&self) -> &str {
        last_line(&self.text).trim()
    }
}

fn last_line(text: &str) -> &str {
    text.rsplit('\n').next().unwrap_or(text)
}

/// Command output with the echoed command and trailing prompt removed.
pub fn command_output(reply: &str, command: &str) -> String {
    let mut lines: Vec<&str> = reply.lines().collect();
    if lines
        .first()
        .is_some_and(|line| line.trim_end().ends_with(command.trim()))
    {
        lines.remove(0);
    }
    lines.pop();
    lines.join("\n").trim_end_matches('\n').to_string()
}

fn paging_command(device_kind: &str) -> &'static str {
    if base_device_kind(device_kind).starts_with("juniper") {
        "set cli screen-length 0"
    } else {
        "terminal length 0"
    }
}

/// Length of the part of `bytes` that ends neither inside a UTF-8
/// character nor inside a terminal escape sequence.
fn complete_prefix_len(bytes: &[u8]) -> usize {
    let mut end = bytes.len();

    let tail_start = end.saturating_sub(3);
    if let Some(lead) = (tail_start..end).rev().find(|&i| bytes[i] & 0xC0 != 0x80) {
        let width = match bytes[lead] {
            b if b >= 0xF0 => 4,
            b if b >= 0xE0 => 3,
            b if b >= 0xC0 => 2,
            _ => 1,
        };
        if lead + width > end {
            end = lead;
        }
    }

    if let Some(esc) = bytes[..end].iter().rposition(|&b| b == 0x1b) {
        let open = match bytes[esc + 1..end].split_first() {
            None => true,
            Some((b'[', params)) => params
                .iter()
                .all(|b| b.is_ascii_digit() || matches!(b, b';' | b'?')),
            Some((b'(' | b')', rest)) => rest.is_empty(),
            Some(_) => false,
        };
        if open {
            end = esc;
        }
    }

    end
}

/// Drives a device CLI over a [`ByteChannel`].
pub struct CliDriver<C> {
    channel: C,
    host: String,
    read_timeout: Duration,
    prompt: String,
    prompt_pattern: Regex,
    buffer: String,
    /// Received bytes not yet decoded into `buffer`.
    pending: Vec<u8>,
}

impl<C: ByteChannel> CliDriver<C> {
    pub fn new(channel: C, host: impl Into<String>, read_timeout: Duration) -> Self {
        Self {
            channel,
            host: host.into(),
            read_timeout,
            prompt: String::new(),
            prompt_pattern: GENERIC_PROMPT.clone(),
            buffer: String::new(),
            pending: Vec::new(),
        }
    }

    /// Log in if asked, enter privileged mode and disable paging.
    ///
    /// Username and password prompts are optional; SSH sessions usually
    /// land directly on a prompt.
    pub async fn establish(
        &mut self,
        params: &DeviceParams,
        timeout: Duration,
    ) -> Result<(), ConnectionError> {
        self.write_line("").await.map_err(|e| self.io_error(e))?;
        let mut reply = self
            .read_until(&[Expect::Prompt, Expect::Login, Expect::Password], timeout)
            .await
            .map_err(|f| self.connection_error(f))?;

        let mut password_sent = false;
        loop {
            let answer = match reply.matched {
                Expect::Prompt => break,
                _ if password_sent => {
                    return Err(ConnectionError::Authentication {
                        host: self.host.clone(),
                        user: params.username().to_string(),
                    })
                }
                Expect::Login => params.username(),
                Expect::Password => {
                    password_sent = true;
                    params.password()
                }
            };
            self.write_line(answer).await.map_err(|e| self.io_error(e))?;
            reply = self
                .read_until(&[Expect::Prompt, Expect::Login, Expect::Password], timeout)
                .await
                .map_err(|f| self.connection_error(f))?;
        }

        if reply.last_line().ends_with('>') {
            reply = self.enable(params.privilege_secret(), timeout).await?;
            if reply.last_line().ends_with('>') {
                return Err(ConnectionError::Privilege {
                    host: self.host.clone(),
                    reason: "secret rejected, is --secret correct?".to_string(),
                });
            }
        }

        self.set_prompt(reply.last_line())?;
        self.write_line(paging_command(params.device_kind()))
            .await
            .map_err(|e| self.io_error(e))?;
        self.read_until(&[Expect::Prompt], timeout)
            .await
            .map_err(|f| self.connection_error(f))?;

        tracing::debug!("[{}] session ready at prompt {:?}", self.host, self.prompt);
        Ok(())
    }

    async fn enable(&mut self, secret: &str, timeout: Duration) -> Result<Reply, ConnectionError> {
        self.write_line("enable").await.map_err(|e| self.io_error(e))?;
        let reply = self
            .read_until(&[Expect::Prompt, Expect::Password], timeout)
            .await
            .map_err(|f| self.connection_error(f))?;
        if reply.matched != Expect::Password {
            return Ok(reply);
        }

        self.write_line(secret).await.map_err(|e| self.io_error(e))?;
        let reply = self
            .read_until(&[Expect::Prompt, Expect::Password], timeout)
            .await
            .map_err(|f| self.connection_error(f))?;
        if reply.matched == Expect::Password {
            return Err(ConnectionError::Privilege {
                host: self.host.clone(),
                reason: "device asked for the secret again".to_string(),
            });
        }
        Ok(reply)
    }

    fn set_prompt(&mut self, line: &str) -> Result<(), ConnectionError> {
        let base = line.trim_end_matches(['>', '#']);
        let pattern = format!(r"^{}[^\r\n]*[>#]\s*$", regex::escape(base));
        self.prompt_pattern = Regex::new(&pattern).map_err(|e| ConnectionError::Transport {
            host: self.host.clone(),
            reason: format!("unusable prompt {line:?}: {e}"),
        })?;
        self.prompt = line.to_string();
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.buffer.clear();
        self.pending.clear();
        self.channel.send(format!("{line}\n").as_bytes()).await
    }

    fn matches(&self, accept: &[Expect]) -> Option<Expect> {
        let tail = last_line(&self.buffer);
        accept.iter().copied().find(|expect| match expect {
            Expect::Prompt => self.prompt_pattern.is_match(tail),
            Expect::Login => LOGIN_PROMPT.is_match(tail),
            Expect::Password => PASSWORD_PROMPT.is_match(tail),
        })
    }

    async fn read_until(
        &mut self,
        accept: &[Expect],
        timeout: Duration,
    ) -> Result<Reply, ReadFailure> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(matched) = self.matches(accept) {
                return Ok(Reply {
                    text: std::mem::take(&mut self.buffer),
                    matched,
                });
            }
            let chunk = timeout_at(deadline, self.channel.recv())
                .await
                .map_err(|_| ReadFailure::Timeout(timeout))?
                .map_err(ReadFailure::Io)?;
            match chunk {
                Some(bytes) => self.absorb(&bytes),
                None => return Err(ReadFailure::Closed),
            }
        }
    }

    /// Decode what is complete so far and keep the rest for the next chunk.
    fn absorb(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        let ready = complete_prefix_len(&self.pending);
        let text = String::from_utf8_lossy(&self.pending[..ready]);
        self.buffer.push_str(&strip_terminal_noise(&text));
        self.pending.drain(..ready);
    }

    fn connection_error(&self, failure: ReadFailure) -> ConnectionError {
        match failure {
            ReadFailure::Timeout(timeout) => ConnectionError::Timeout {
                host: self.host.clone(),
                timeout,
            },
            ReadFailure::Closed => ConnectionError::Transport {
                host: self.host.clone(),
                reason: "connection closed by the device".to_string(),
            },
            ReadFailure::Io(source) => self.io_error(source),
        }
    }

    fn io_error(&self, source: io::Error) -> ConnectionError {
        ConnectionError::Io {
            host: self.host.clone(),
            source,
        }
    }

    async fn run_line(&mut self, line: &str) -> Result<String, ExecutionError> {
        self.write_line(line)
            .await
            .map_err(|e| ReadFailure::Io(e).into_execution(line))?;
        let read_timeout = self.read_timeout;
        self.read_until(&[Expect::Prompt], read_timeout)
            .await
            .map(|reply| reply.text)
            .map_err(|f| f.into_execution(line))
    }
}

#[async_trait]
impl<C: ByteChannel> DeviceSession for CliDriver<C> {
    fn prompt(&self) -> &str {
        &self.prompt
    }

    async fn send_command(&mut self, command: &str) -> Result<String, ExecutionError> {
        let reply = self.run_line(command).await?;
        Ok(command_output(&reply, command))
    }

    async fn send_config_set(&mut self, lines: &[String]) -> Result<String, ExecutionError> {
        let mut transcript = self.run_line("configure terminal").await?;
        for line in lines.iter().filter(|l| !l.trim().is_empty()) {
            transcript.push_str(&self.run_line(line).await?);
        }
        transcript.push_str(&self.run_line("end").await?);
        Ok(transcript)
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        if let Err(err) = self.write_line("exit").await {
            tracing::debug!("[{}] exit not delivered: {}", self.host, err);
        }
        self.channel.shutdown().await.map_err(|e| self.io_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceFields, Transport};
    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream};

    const PASSWORD: &str = "pass";
    const SECRET: &str = "s3cret";

    /// Minimal IOS-like device: login, enable, paging, show and config mode.
    fn spawn_fake_device(stream: DuplexStream) {
        tokio::spawn(async move {
            let (reader, mut writer) = tokio::io::split(stream);
            let mut lines = BufReader::new(reader).lines();
            let mut state = "login";
            while let Ok(Some(line)) = lines.next_line().await {
                let reply = match (state, line.as_str()) {
                    ("login", "") => "\r\nUsername: ".to_string(),
                    ("login", _) => {
                        state = "password";
                        "\r\nPassword: ".to_string()
                    }
                    ("password", PASSWORD) => {
                        state = "user";
                        "\r\nR1>".to_string()
                    }
                    ("password", _) => {
                        state = "login";
                        "\r\n% Login invalid\r\n\r\nUsername: ".to_string()
                    }
                    ("user", "enable") => {
                        state = "enable";
                        "enable\r\nPassword: ".to_string()
                    }
                    ("enable", SECRET) => {
                        state = "exec";
                        "\r\nR1#".to_string()
                    }
                    ("enable", _) => {
                        state = "user";
                        "\r\n% Access denied\r\n\r\nR1>".to_string()
                    }
                    ("exec", "show version") => {
                        "show version\r\nCisco IOS XE Software\r\nuptime is 1 day\r\nR1#".to_string()
                    }
                    ("exec", "configure terminal") => {
                        state = "config";
                        "configure terminal\r\nR1(config)#".to_string()
                    }
                    ("config", "end") => {
                        state = "exec";
                        "end\r\nR1#".to_string()
                    }
                    ("config", other) => format!("{other}\r\nR1(config)#"),
                    (_, "exit") => break,
                    (_, other) => format!("{other}\r\nR1#"),
                };
                if writer.write_all(reply.as_bytes()).await.is_err() {
                    break;
                }
            }
        });
    }

    fn params(secret: &str) -> DeviceParams {
        DeviceParams::new(
            Transport::Telnet,
            DeviceFields {
                device_kind: Some("cisco_ios".to_string()),
                address: Some("192.0.2.1".to_string()),
                username: Some("admin".to_string()),
                password: Some(PASSWORD.to_string()),
                secret: Some(secret.to_string()),
                ..DeviceFields::default()
            },
        )
        .unwrap()
    }

    fn driver() -> CliDriver<StreamChannel<DuplexStream>> {
        let (client, device) = tokio::io::duplex(4096);
        spawn_fake_device(device);
        CliDriver::new(StreamChannel::new(client), "R1", Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_login_enable_and_command() {
        let mut driver = driver();
        driver
            .establish(&params(SECRET), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(driver.prompt(), "R1#");

        let output = driver.send_command("show version").await.unwrap();
        assert_eq!(output, "Cisco IOS XE Software\nuptime is 1 day");
        driver.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_secret_is_privilege_error() {
        let mut driver = driver();
        let err = driver
            .establish(&params("wrong"), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Privilege { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_wrong_password_is_authentication_error() {
        let (client, device) = tokio::io::duplex(4096);
        spawn_fake_device(device);
        let mut driver = CliDriver::new(StreamChannel::new(client), "R1", Duration::from_secs(2));
        let bad = DeviceFields {
            device_kind: Some("cisco_ios".to_string()),
            address: Some("192.0.2.1".to_string()),
            username: Some("admin".to_string()),
            password: Some("nope".to_string()),
            ..DeviceFields::default()
        };
        let params = DeviceParams::new(Transport::Telnet, bad).unwrap();
        let err = driver
            .establish(&params, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ConnectionError::Authentication { ref user, .. } if user == "admin"),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_config_set_transcript() {
        let mut driver = driver();
        driver
            .establish(&params(SECRET), Duration::from_secs(2))
            .await
            .unwrap();
        let lines = vec![
            "interface Loopback0".to_string(),
            "description mgmt".to_string(),
        ];
        let transcript = driver.send_config_set(&lines).await.unwrap();
        assert!(transcript.contains("R1(config)#"));
        assert!(transcript.contains("description mgmt"));
        assert!(transcript.trim_end().ends_with("R1#"));
    }

    /// Replays fixed chunks, then reports the peer as closed.
    struct ScriptedChannel {
        chunks: std::collections::VecDeque<Vec<u8>>,
    }

    #[async_trait]
    impl ByteChannel for ScriptedChannel {
        async fn send(&mut self, _data: &[u8]) -> io::Result<()> {
            Ok(())
        }

        async fn recv(&mut self) -> io::Result<Option<Vec<u8>>> {
            Ok(self.chunks.pop_front())
        }

        async fn shutdown(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_complete_prefix_holds_back_partial_sequences() {
        assert_eq!(complete_prefix_len(b"plain"), 5);
        assert_eq!(complete_prefix_len(b"caf\xC3"), 3);
        assert_eq!(complete_prefix_len("café".as_bytes()), 5);
        assert_eq!(complete_prefix_len(b"ok\x1b"), 2);
        assert_eq!(complete_prefix_len(b"ok\x1b[1;3"), 2);
        assert_eq!(complete_prefix_len(b"ok\x1b[1m"), 6);
        assert_eq!(complete_prefix_len(b"ok\x1b("), 2);
        assert_eq!(complete_prefix_len(b"ok\x1b(B"), 5);
    }

    #[tokio::test]
    async fn test_sequences_split_across_reads_are_decoded() {
        let chunks: Vec<&[u8]> = vec![b"caf\xC3", b"\xA9 \x1b[", b"1mOK\x1b", b"[0m\r\nR1#"];
        let channel = ScriptedChannel {
            chunks: chunks.into_iter().map(<[u8]>::to_vec).collect(),
        };
        let mut driver = CliDriver::new(channel, "R1", Duration::from_secs(1));

        let reply = driver
            .read_until(&[Expect::Prompt], Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply.text, "café OK\nR1#");
    }

    #[tokio::test]
    async fn test_silent_device_times_out() {
        let (client, _device) = tokio::io::duplex(64);
        let mut driver = CliDriver::new(StreamChannel::new(client), "R9", Duration::from_secs(1));
        let err = driver
            .establish(&params(SECRET), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Timeout { ref host, .. } if host == "R9"));
    }

    #[tokio::test]
    async fn test_closed_stream_during_command() {
        let mut driver = driver();
        driver
            .establish(&params(SECRET), Duration::from_secs(2))
            .await
            .unwrap();
        // "exit" makes the fake device hang up
        let err = driver.send_command("exit").await.unwrap_err();
        assert!(matches!(err, ExecutionError::Disconnected(_)), "{err}");
    }

    #[test]
    fn test_command_output_strips_echo_and_prompt() {
        let reply = "show clock\n*10:00:00.000 UTC Mon Jan 1 2025\nR1#";
        assert_eq!(
            command_output(reply, "show clock"),
            "*10:00:00.000 UTC Mon Jan 1 2025"
        );
        assert_eq!(command_output("R1#", "show nothing"), "");
    }

    #[test]
    fn test_paging_command_by_kind() {
        assert_eq!(paging_command("cisco_ios_telnet"), "terminal length 0");
        assert_eq!(paging_command("juniper_junos"), "set cli screen-length 0");
    }
}
