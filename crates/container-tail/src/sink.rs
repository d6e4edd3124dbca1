//! 출력 싱크 -- 서비스 접두어가 붙은 로그 줄과 알림 출력
//!
//! [`LogSink`]는 watcher의 스트리밍 태스크가 줄 단위로 호출하는 출력 경계입니다.
//! 기본 구현인 [`ConsoleSink`]는 표준 에러에 씁니다. 접두어는 서비스가 둘 이상일
//! 때만 붙으며, 가장 긴 서비스 이름 폭에 맞춰 오른쪽 정렬됩니다.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;

use colored::Colorize;
use tailpost_core::types::OutputStream;

use crate::filter::ServiceFilter;

/// 라이프사이클 알림 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// 부트스트랩 시 이미 실행 중인 컨테이너에 붙음
    Watching,
    /// start 이벤트 수신
    Started,
    /// stop/die 이벤트 수신
    Stopped,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Watching => write!(f, "watching"),
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Output boundary for tailed lines and lifecycle notices.
///
/// Implementations must not block for long; they are called from streaming
/// tasks and from the dispatcher.
pub trait LogSink: Send + Sync + 'static {
    /// Writes one complete log line (without trailing newline).
    fn line(&self, service: &str, stream: OutputStream, line: &str);

    /// Writes a lifecycle notice for a container.
    fn notice(&self, service: &str, notice: Notice, container_id: &str);
}

/// Formats the right-aligned service prefix, or an empty string when prefixes
/// are disabled.
pub fn format_prefix(service: &str, width: usize, enabled: bool, color: bool) -> String {
    if !enabled {
        return String::new();
    }
    let padded = format!("{service:>width$}");
    if color {
        format!("{} ", padded.cyan())
    } else {
        format!("{padded} ")
    }
}

/// [`LogSink`] writing to a byte writer, standard error by default.
pub struct ConsoleSink<W: Write + Send + 'static = std::io::Stderr> {
    writer: Mutex<W>,
    prefix_width: usize,
    show_prefix: bool,
    color: bool,
}

impl ConsoleSink {
    /// Creates a sink on standard error laid out for `filter`.
    pub fn stderr(filter: &ServiceFilter, color: bool) -> Self {
        Self::with_writer(std::io::stderr(), filter, color)
    }
}

impl<W: Write + Send + 'static> ConsoleSink<W> {
    /// Creates a sink on an arbitrary writer.
    pub fn with_writer(writer: W, filter: &ServiceFilter, color: bool) -> Self {
        Self {
            writer: Mutex::new(writer),
            prefix_width: filter.prefix_width(),
            show_prefix: filter.shows_prefix(),
            color,
        }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn prefix(&self, service: &str) -> String {
        format_prefix(service, self.prefix_width, self.show_prefix, self.color)
    }

    fn write_raw(&self, text: &str) {
        let mut writer = match self.writer.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        // 출력 대상이 닫혔으면 더 할 수 있는 일이 없음
        let _ = writeln!(writer, "{text}");
    }
}

impl<W: Write + Send + 'static> LogSink for ConsoleSink<W> {
    fn line(&self, service: &str, _stream: OutputStream, line: &str) {
        self.write_raw(&format!("{}{line}", self.prefix(service)));
    }

    fn notice(&self, service: &str, notice: Notice, container_id: &str) {
        let prefix = self.prefix(service);
        let text = if self.color {
            let label = match notice {
                Notice::Watching | Notice::Started => notice.to_string().green(),
                Notice::Stopped => notice.to_string().red(),
            };
            format!("{prefix}{label} {}", container_id.dimmed())
        } else {
            format!("{prefix}{notice} {container_id}")
        };
        self.write_raw(&text);
    }
}

/// Longest line held back while waiting for a newline.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits a chunked byte stream into complete lines.
///
/// Bytes after the last newline are held until the next chunk or
/// [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Appends a chunk and returns every line it completed.
    ///
    /// Unterminated output longer than [`MAX_LINE_BYTES`] is emitted in
    /// pieces of that size.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // pending never holds a newline between calls
        let mut cursor = self.pending.len();
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[cursor..].iter().position(|&b| b == b'\n') {
            let end = cursor + offset;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
            cursor = start;
        }
        while self.pending.len() - start > MAX_LINE_BYTES {
            lines.push(decode_line(&self.pending[start..start + MAX_LINE_BYTES]));
            start += MAX_LINE_BYTES;
        }

        self.pending.drain(..start);
        lines
    }

    /// Returns the trailing partial line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.pending);
        Some(decode_line(&line))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
