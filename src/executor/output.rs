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

//! Operator-facing progress and result display.
//!
//! All writes go through one mutex, which also guards the ordered output
//! buffer, so a host's header and body are never interleaved with another
//! host's lines.

use owo_colors::OwoColorize;
use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Error,
    /// Command output, printed as-is.
    Plain,
}

impl Tone {
    fn label(self) -> &'static str {
        match self {
            Tone::Info => "[INFO]",
            Tone::Success => "[SUCCESS]",
            Tone::Warning => "[WARNING]",
            Tone::Error => "[ERROR]",
            Tone::Plain => "",
        }
    }
}

/// Destination for display lines.
pub trait OutputSink: Send + Sync {
    fn write(&self, tone: Tone, text: &str);
}

/// Check if stdout is a terminal and not inside CI.
fn is_tty() -> bool {
    io::stdout().is_terminal()
        && std::env::var("CI").is_err()
        && std::env::var("GITHUB_ACTIONS").is_err()
}

/// Colors are off for pipes, `NO_COLOR` and `TERM=dumb`.
pub fn should_use_colors() -> bool {
    if !is_tty() {
        return false;
    }
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }
    true
}

pub struct StdoutSink {
    colors: bool,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            colors: should_use_colors(),
        }
    }

    fn render(&self, tone: Tone, text: &str) -> String {
        if tone == Tone::Plain {
            return text.to_string();
        }
        let line = format!("{} {}", tone.label(), text);
        if !self.colors {
            return line;
        }
        match tone {
            Tone::Info => line.bright_cyan().to_string(),
            Tone::Success => line.bright_green().to_string(),
            Tone::Warning => line.yellow().to_string(),
            Tone::Error => line.bright_red().bold().to_string(),
            Tone::Plain => line,
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for StdoutSink {
    fn write(&self, tone: Tone, text: &str) {
        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", self.render(tone, text)).and_then(|_| stdout.flush())
        {
            tracing::debug!("stdout write failed: {}", e);
        }
    }
}

/// Records lines in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Tone, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Tone, String)> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Every line joined with newlines, tones dropped.
    pub fn text(&self) -> String {
        self.lines()
            .into_iter()
            .map(|(_, line)| line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputSink for MemorySink {
    fn write(&self, tone: Tone, text: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((tone, text.to_string()));
    }
}

#[derive(Default)]
struct DisplayState {
    /// hostname -> display text, present only while ordering is active.
    ordered: Option<BTreeMap<String, String>>,
}

/// Display shared by every host task of one invocation.
pub struct ResultDisplay {
    sink: Arc<dyn OutputSink>,
    silent: bool,
    state: Mutex<DisplayState>,
}

impl ResultDisplay {
    /// `silent` drops every line (`--no-output`).
    pub fn new(sink: Arc<dyn OutputSink>, silent: bool) -> Self {
        Self {
            sink,
            silent,
            state: Mutex::new(DisplayState::default()),
        }
    }

    /// Buffer host results until [`flush_ordered`](Self::flush_ordered).
    pub fn enable_ordering(&self) {
        self.lock().ordered = Some(BTreeMap::new());
    }

    pub fn is_ordering(&self) -> bool {
        self.lock().ordered.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, DisplayState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, tone: Tone, text: &str) {
        if self.silent {
            return;
        }
        let _guard = self.lock();
        self.sink.write(tone, text);
    }

    pub fn info(&self, text: &str) {
        self.emit(Tone::Info, text);
    }

    pub fn success(&self, text: &str) {
        self.emit(Tone::Success, text);
    }

    pub fn warn(&self, text: &str) {
        self.emit(Tone::Warning, text);
    }

    pub fn error(&self, text: &str) {
        self.emit(Tone::Error, text);
    }

    /// Print a host's result, or hold it when ordering is active.
    pub fn result(&self, hostname: &str, text: &str) {
        if self.silent {
            return;
        }
        let mut state = self.lock();
        match state.ordered.as_mut() {
            Some(buffer) => {
                buffer.insert(hostname.to_string(), text.to_string());
            }
            None => self.write_result(hostname, text),
        }
    }

    /// Print buffered results sorted by hostname and stop ordering.
    pub fn flush_ordered(&self) {
        let mut state = self.lock();
        let Some(buffer) = state.ordered.take() else {
            return;
        };
        if self.silent {
            return;
        }
        for (hostname, text) in &buffer {
            self.write_result(hostname, text);
        }
    }

    fn write_result(&self, hostname: &str, text: &str) {
        self.sink
            .write(Tone::Info, &format!("<NODE: {hostname}> output"));
        self.sink.write(Tone::Plain, text);
    }
}
