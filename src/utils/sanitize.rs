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

use once_cell::sync::Lazy;
use regex::Regex;

static FORBIDDEN_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("filename pattern is valid"));

static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\x1b[()][A-Za-z0-9]|\x1b[=>]")
        .expect("escape pattern is valid")
});

/// Make a string safe to embed in a log file name.
///
/// Spaces become `-` and characters that are invalid on common
/// filesystems (`\ / : * ? " < > |`) become `_`.
pub fn sanitize_filename(name: &str) -> String {
    let spaced = name.trim().replace(' ', "-");
    FORBIDDEN_FILENAME_CHARS
        .replace_all(&spaced, "_")
        .into_owned()
}

/// Strip terminal escape sequences and carriage returns from device output.
pub fn strip_terminal_noise(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").replace('\r', "")
}
